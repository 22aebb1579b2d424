//! Recommended-readings retrieval.
//!
//! Scrapes a public bookmarks profile page for recently recommended
//! articles. This is a plain formatting/IO wrapper with no state of
//! its own: fetch the page, pull out the item blocks, keep the recent
//! ones. The window is 6 days rather than 7 on purpose: the note is
//! generated on Sunday evening and a 7-day window would pick up last
//! Sunday's shares twice.

use chrono::{Duration, NaiveDate};
use regex::Regex;
use thiserror::Error;

/// Days of recommendations to keep.
pub const RECOMMENDED_DAYS: i64 = 6;

const PROFILE_BASE: &str = "https://getpocket.com";

/// Error type for readings retrieval.
#[derive(Debug, Error)]
pub enum ReadingsError {
    /// The profile page answered with a non-2xx status.
    #[error("readings fetch rejected by {endpoint}: HTTP {status}")]
    RemoteRejected { endpoint: String, status: u16 },

    /// Transport-level failure fetching the page.
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}

/// One recommended article.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub title: String,
    pub url: String,
    pub comment: String,
    pub recommended_at: NaiveDate,
}

impl Reading {
    /// Markdown bullet for the weeknote readings section.
    pub fn to_markdown(&self) -> String {
        format!("* [{}]({}): {}", self.title, self.url, self.comment)
    }
}

/// Fetch recommendations for a profile, keeping the last
/// [`RECOMMENDED_DAYS`] days.
pub async fn fetch_recommendations(
    username: &str,
    today: NaiveDate,
) -> Result<Vec<Reading>, ReadingsError> {
    fetch_recommendations_from(PROFILE_BASE, username, today).await
}

/// Same as [`fetch_recommendations`] against a custom base URL.
pub async fn fetch_recommendations_from(
    base_url: &str,
    username: &str,
    today: NaiveDate,
) -> Result<Vec<Reading>, ReadingsError> {
    let endpoint = format!("{}/@{}", base_url, username);

    let response = reqwest::get(&endpoint)
        .await
        .map_err(|e| ReadingsError::Transport {
            endpoint: endpoint.clone(),
            source: e,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ReadingsError::RemoteRejected {
            endpoint,
            status: status.as_u16(),
        });
    }

    let html = response.text().await.map_err(|e| ReadingsError::Transport {
        endpoint: endpoint.clone(),
        source: e,
    })?;

    let cutoff = today - Duration::days(RECOMMENDED_DAYS);
    Ok(parse_profile(&html)
        .into_iter()
        .filter(|r| r.recommended_at >= cutoff)
        .collect())
}

/// Pull recommendation items out of a profile page.
///
/// Each item is an `<article>` block containing the shared link, an
/// optional comment div, and a `<time datetime=..>` stamp. Blocks
/// missing the link or the date are skipped; this is a scraper, not a
/// validator.
pub fn parse_profile(html: &str) -> Vec<Reading> {
    // Compiled per call; the page is fetched once per run.
    let item_re = Regex::new(r"(?s)<article[^>]*>(.*?)</article>").expect("valid regex");
    let link_re = Regex::new(r#"(?s)<a[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#).expect("valid regex");
    let comment_re =
        Regex::new(r#"(?s)<div[^>]*class="[^"]*comment[^"]*"[^>]*>(.*?)</div>"#).expect("valid regex");
    let date_re = Regex::new(r#"datetime="(\d{4}-\d{2}-\d{2})"#).expect("valid regex");

    let mut readings = Vec::new();

    for item in item_re.captures_iter(html) {
        let block = &item[1];

        let Some(link) = link_re.captures(block) else {
            continue;
        };
        let url = link[1].trim().to_string();
        let title = strip_tags(&link[2]);

        let Some(recommended_at) = date_re
            .captures(block)
            .and_then(|c| c[1].parse::<NaiveDate>().ok())
        else {
            continue;
        };

        let comment = comment_re
            .captures(block)
            .map(|c| strip_tags(&c[1]))
            .unwrap_or_default();

        readings.push(Reading {
            title,
            url,
            comment,
            recommended_at,
        });
    }

    readings
}

fn strip_tags(fragment: &str) -> String {
    let tag_re = Regex::new(r"<[^>]+>").expect("valid regex");
    tag_re.replace_all(fragment, "").trim().to_string()
}
