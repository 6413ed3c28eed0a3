use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const FILENAME_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// A single point returned by the metrics backend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// One row of the report.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub label: String,
}

impl Sample {
    /// The value as a status code: rounded half away from zero, NaN is reported as 0.
    pub fn status(&self) -> i64 {
        self.value.round() as i64
    }

    pub fn format_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Maps the backend points to samples in chronological order.
pub fn to_samples(points: Vec<DataPoint>, label: &str) -> Vec<Sample> {
    let mut samples: Vec<_> = points.into_iter().map(|point| Sample {
        timestamp: point.timestamp,
        value: point.value,
        label: label.to_owned(),
    }).collect();

    samples.sort_by_key(|sample| sample.timestamp);
    samples
}

/// Half-open `[start, end)` interval the report covers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportWindow {
    pub fn last_day(now: DateTime<Utc>) -> ReportWindow {
        ReportWindow {
            start: now - TimeDelta::days(1),
            end: now,
        }
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp < self.end
    }

    pub fn attachment_name(&self) -> String {
        format!("report_{}_{}.csv",
            self.start.format(FILENAME_TIMESTAMP_FORMAT), self.end.format(FILENAME_TIMESTAMP_FORMAT))
    }
}

impl fmt::Display for ReportWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.format(TIMESTAMP_FORMAT), self.end.format(TIMESTAMP_FORMAT))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn time(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn attachment_name() {
        let window = ReportWindow {start: time(1, 0, 0), end: time(2, 0, 0)};
        assert_eq!(window.attachment_name(), "report_2024-01-01T00-00-00_2024-01-02T00-00-00.csv");
    }

    #[test]
    fn last_day() {
        let window = ReportWindow::last_day(time(2, 12, 30));
        assert_eq!(window.start, time(1, 12, 30));
        assert_eq!(window.end, time(2, 12, 30));
        assert!(window.start < window.end);

        assert!(window.contains(window.start));
        assert!(!window.contains(window.end));
    }

    #[test]
    fn status_rounding() {
        let sample = |value| Sample {timestamp: time(1, 0, 0), value, label: String::new()};

        assert_eq!(sample(200.0).status(), 200);
        assert_eq!(sample(502.5).status(), 503);
        assert_eq!(sample(503.4).status(), 503);
        assert_eq!(sample(-0.4).status(), 0);
        assert_eq!(sample(f64::NAN).status(), 0);
    }

    #[test]
    fn samples_ordering() {
        let points = vec![
            DataPoint {timestamp: time(1, 0, 10), value: 200.0},
            DataPoint {timestamp: time(1, 0, 0), value: 503.0},
            DataPoint {timestamp: time(1, 0, 5), value: 404.0},
        ];

        let samples = to_samples(points, "example.com");
        let timestamps: Vec<_> = samples.iter().map(|sample| sample.timestamp).collect();
        assert_eq!(timestamps, [time(1, 0, 0), time(1, 0, 5), time(1, 0, 10)]);
        assert!(samples.iter().all(|sample| sample.label == "example.com"));
    }
}
