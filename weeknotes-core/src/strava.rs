//! Strava activity retrieval.
//!
//! Pages through the activity-listing endpoint in fixed-size pages,
//! accumulating records in the order the API returns them
//! (most-recent-first, never re-sorted here). Pagination stops at a
//! hard scan cap or when a page comes back short.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Fixed page size requested from the listing endpoint.
pub const ACTIVITIES_PER_PAGE: usize = 50;

/// Hard upper bound on records fetched per invocation. Once reached,
/// no further pages are requested even if more data exists.
pub const ACTIVITIES_SCAN_MAX: usize = 100;

const DEFAULT_API_BASE: &str = "https://www.strava.com/api/v3";

/// Error type for activity retrieval.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered with a non-2xx status. Fatal for the run.
    #[error("activity fetch rejected by {endpoint}: HTTP {status}")]
    RemoteRejected { endpoint: String, status: u16 },

    /// The response body did not match the expected record shape.
    #[error("failed to decode activity page {page}: {message}")]
    Decode { page: u32, message: String },

    /// Transport-level failure talking to the API.
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}

/// A single activity as returned by the API.
///
/// Every field is required; a payload missing one fails decoding with
/// an explicit error rather than a lookup failure downstream.
#[derive(Debug, Clone, Deserialize)]
pub struct Activity {
    /// Activity type, e.g. "Run", "Ride", "Hike".
    #[serde(rename = "type")]
    pub activity_type: String,

    /// Distance covered in meters.
    pub distance: f64,

    /// Total elapsed time in seconds.
    pub elapsed_time: i64,

    /// Moving time in seconds.
    pub moving_time: i64,

    /// Maximum speed in meters per second.
    pub max_speed: f64,

    /// Total elevation gain in meters.
    pub total_elevation_gain: f64,

    /// When the activity started.
    pub start_date: DateTime<Utc>,
}

/// Client for the activity-listing endpoint.
pub struct ActivityClient {
    http: reqwest::Client,
    api_base: String,
}

impl ActivityClient {
    /// Client against the real API.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_API_BASE)
    }

    /// Client against a custom base URL (tests, mostly).
    pub fn with_base_url(api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
        }
    }

    /// Fetch activities, optionally only those after `since`.
    ///
    /// Returns records in received order. Stops when the accumulated
    /// count reaches [`ACTIVITIES_SCAN_MAX`] or a page returns fewer
    /// than [`ACTIVITIES_PER_PAGE`] records.
    pub async fn fetch_activities(
        &self,
        access_token: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Activity>, ApiError> {
        let endpoint = format!("{}/activities", self.api_base);
        let mut activities: Vec<Activity> = Vec::new();
        let mut page: u32 = 1;

        loop {
            let mut request = self
                .http
                .get(&endpoint)
                .bearer_auth(access_token)
                .query(&[
                    ("page", page.to_string()),
                    ("per_page", ACTIVITIES_PER_PAGE.to_string()),
                ]);
            if let Some(since) = since {
                request = request.query(&[("after", since.timestamp().to_string())]);
            }

            let response = request.send().await.map_err(|e| ApiError::Transport {
                endpoint: endpoint.clone(),
                source: e,
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(ApiError::RemoteRejected {
                    endpoint: endpoint.clone(),
                    status: status.as_u16(),
                });
            }

            let body = response.text().await.map_err(|e| ApiError::Transport {
                endpoint: endpoint.clone(),
                source: e,
            })?;
            let batch: Vec<Activity> =
                serde_json::from_str(&body).map_err(|e| ApiError::Decode {
                    page,
                    message: e.to_string(),
                })?;

            tracing::debug!("Fetched page {} with {} activities", page, batch.len());

            let batch_len = batch.len();
            activities.extend(batch);

            // Cap check comes first: it is a hard stop.
            if activities.len() >= ACTIVITIES_SCAN_MAX {
                tracing::info!(
                    "Stopping at scan cap of {} activities",
                    ACTIVITIES_SCAN_MAX
                );
                break;
            }
            if batch_len < ACTIVITIES_PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(activities)
    }
}

impl Default for ActivityClient {
    fn default() -> Self {
        Self::new()
    }
}
