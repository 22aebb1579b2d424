//! Weeknote rendering and placement.
//!
//! Renders the markdown document with front matter and writes it to
//! the blog content tree, falling back to the current directory when
//! the expected notes directory does not exist.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::readings::Reading;

/// Error type for note writing.
#[derive(Debug, Error)]
pub enum NoteError {
    #[error("failed to write note to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Render the weeknote markdown for the given date.
pub fn render(date: NaiveDate, activity_report: &str, readings: &[Reading]) -> String {
    let week = date.format("%W").to_string();
    let year = date.format("%Y").to_string();
    let today = date.format("%Y-%m-%d").to_string();

    let readings_list = readings
        .iter()
        .map(Reading::to_markdown)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"---
title: "Notes for Week {week}"
date: "{today}"
lastmod: "{today}"
draft: false
tags: ["weekly-notes"]
summary: "Random notes for week {week} of {year}"
---

## Random

* {activity_report}

## Recommended Readings From This Week

{readings_list}
"#
    )
}

/// Where the note for the given date belongs.
///
/// With no explicit output directory, `content/notes/<year>/` is used
/// when it exists; otherwise the current directory, with a warning.
pub fn note_path(output_dir: Option<&Path>, date: NaiveDate) -> PathBuf {
    let file_name = format!("week-{}.md", date.format("%W"));

    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => {
            let default = PathBuf::from("content/notes").join(date.format("%Y").to_string());
            if default.is_dir() {
                default
            } else {
                tracing::warn!(
                    "Notes directory {:?} doesn't exist, writing to the current directory",
                    default
                );
                PathBuf::from(".")
            }
        }
    };

    dir.join(file_name)
}

/// Render and write the weeknote; returns the path written.
pub fn write_note(
    output_dir: Option<&Path>,
    date: NaiveDate,
    activity_report: &str,
    readings: &[Reading],
) -> Result<PathBuf, NoteError> {
    let path = note_path(output_dir, date);
    let contents = render(date, activity_report, readings);

    std::fs::write(&path, contents).map_err(|source| NoteError::Io {
        path: path.clone(),
        source,
    })?;

    tracing::info!("Wrote weeknote to {:?}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_date() -> NaiveDate {
        // A Sunday in week 10 of 2024.
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn render_fills_front_matter_and_sections() {
        let readings = vec![Reading {
            title: "A Post".to_string(),
            url: "https://example.com/a".to_string(),
            comment: "Neat.".to_string(),
            recommended_at: sample_date(),
        }];

        let note = render(sample_date(), "I relaxed in the past week.", &readings);

        assert!(note.starts_with("---\n"));
        assert!(note.contains("title: \"Notes for Week 10\""));
        assert!(note.contains("date: \"2024-03-10\""));
        assert!(note.contains("summary: \"Random notes for week 10 of 2024\""));
        assert!(note.contains("## Random\n\n* I relaxed in the past week."));
        assert!(note.contains("* [A Post](https://example.com/a): Neat."));
    }

    #[test]
    fn note_path_uses_explicit_output_dir() {
        let path = note_path(Some(Path::new("/tmp/notes")), sample_date());
        assert_eq!(path, PathBuf::from("/tmp/notes/week-10.md"));
    }

    #[test]
    fn write_note_creates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_note(Some(dir.path()), sample_date(), "I relaxed.", &[]).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("Notes for Week 10"));
        assert!(written.contains("* I relaxed."));
    }
}
