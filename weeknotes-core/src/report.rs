//! Weekly activity aggregation.
//!
//! Folds a week of activities into a single human-readable sentence
//! for the weeknote. Activities classify into mutually exclusive
//! buckets by type; anything unrecognized still counts toward the
//! total time and activity count.

use crate::strava::Activity;

// Activity types per bucket (see the Strava ActivityType model).
const WALK_TYPES: &[&str] = &["Hike", "Walk", "Snowshoe"];
const RIDE_TYPES: &[&str] = &["Ride", "VirtualRide"];
const RUN_TYPES: &[&str] = &["Run", "VirtualRun"];
const SWIM_TYPES: &[&str] = &["Swim"];

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    count: usize,
    meters: f64,
}

impl Tally {
    fn add(&mut self, meters: f64) {
        self.count += 1;
        self.meters += meters;
    }

    fn phrase(&self, verb: &str) -> Option<String> {
        if self.count == 0 {
            return None;
        }
        Some(format!("{} {}km", verb, (self.meters / 1000.0).round() as i64))
    }
}

/// Aggregated totals for one week of activities.
#[derive(Debug, Default)]
pub struct WeeklyReport {
    walks: Tally,
    rides: Tally,
    runs: Tally,
    swims: Tally,
    activities: usize,
    elapsed_seconds: i64,
}

impl WeeklyReport {
    /// Aggregate activities into bucket tallies.
    pub fn from_activities(activities: &[Activity]) -> Self {
        let mut report = Self::default();

        for activity in activities {
            report.activities += 1;
            report.elapsed_seconds += activity.elapsed_time;

            let kind = activity.activity_type.as_str();
            if WALK_TYPES.contains(&kind) {
                report.walks.add(activity.distance);
            } else if RIDE_TYPES.contains(&kind) {
                report.rides.add(activity.distance);
            } else if RUN_TYPES.contains(&kind) {
                report.runs.add(activity.distance);
            } else if SWIM_TYPES.contains(&kind) {
                report.swims.add(activity.distance);
            }
        }

        report
    }

    /// Render the report as a weeknote sentence.
    pub fn sentence(&self) -> String {
        let phrases: Vec<String> = [
            self.walks.phrase("walked"),
            self.runs.phrase("ran"),
            self.rides.phrase("rode"),
            self.swims.phrase("swam"),
        ]
        .into_iter()
        .flatten()
        .collect();

        let mut sentence = match phrases.len() {
            0 => "I relaxed in the past week. ".to_string(),
            1 => format!("I {}. ", phrases[0]),
            2 => format!("I {} and {}. ", phrases[0], phrases[1]),
            _ => format!(
                "I {} and {}. ",
                phrases[..phrases.len() - 1].join(", "),
                phrases[phrases.len() - 1]
            ),
        };

        let hours = self.elapsed_seconds as f64 / 3600.0;
        sentence.push_str(&format!(
            "I moved for {:.1} hours during {} activities.",
            hours, self.activities
        ));

        sentence
    }
}
