//! Statistics types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Which statistic to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatisticsKind {
    /// Bounced messages.
    Bounces,
    /// Delivered messages.
    Deliveries,
    /// Opened messages.
    Opens,
}

impl StatisticsKind {
    /// Path segment for this statistic.
    pub fn as_str(self) -> &'static str {
        match self {
            StatisticsKind::Bounces => "bounces",
            StatisticsKind::Deliveries => "deliveries",
            StatisticsKind::Opens => "opens",
        }
    }
}

/// Time window and filters for a statistics request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsQuery {
    /// Window start.
    pub from: Option<DateTime<Utc>>,
    /// Window end.
    pub to: Option<DateTime<Utc>>,
    /// Only messages with this tag.
    pub tag: Option<String>,
}

impl StatisticsQuery {
    /// Restrict to `[from, to)`.
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            tag: None,
        }
    }

    /// Filter by tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// One day's count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Day.
    pub date: NaiveDate,
    /// Count for that day.
    pub count: u64,
}

/// Aggregated statistic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    /// Total over the window.
    pub total: u64,
    /// Per-day breakdown.
    #[serde(default)]
    pub data: Vec<DataPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_deserialization() {
        let stats: Statistics = serde_json::from_str(
            r#"{"total": 3, "data": [{"date": "2024-03-01", "count": 3}]}"#,
        )
        .unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.data[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        let bare: Statistics = serde_json::from_str(r#"{"total": 0}"#).unwrap();
        assert!(bare.data.is_empty());
    }
}
