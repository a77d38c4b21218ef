// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Statistics Table Card.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

// ============= Statistic Types =============

/// Numeric facet carried by a recorder statistics bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticType {
    Change,
    LastReset,
    Max,
    Mean,
    Min,
    State,
    Sum,
}

impl StatisticType {
    /// Every selectable type, in the order the editor offers them
    pub const ALL: [StatisticType; 7] = [
        Self::Change,
        Self::LastReset,
        Self::Max,
        Self::Mean,
        Self::Min,
        Self::State,
        Self::Sum,
    ];

    /// Columns shown when the configuration does not pick any.
    /// `last_reset` is selectable but deliberately not part of this list.
    pub const DEFAULT_SELECTION: [StatisticType; 6] = [
        Self::Change,
        Self::State,
        Self::Sum,
        Self::Min,
        Self::Max,
        Self::Mean,
    ];

    /// Wire name used by the recorder API and as the column header
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Change => "change",
            Self::LastReset => "last_reset",
            Self::Max => "max",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::State => "state",
            Self::Sum => "sum",
        }
    }

    /// Human-readable label for form options
    pub fn label(&self) -> &'static str {
        match self {
            Self::Change => "Change",
            Self::LastReset => "Last Reset",
            Self::Max => "Max",
            Self::Mean => "Mean",
            Self::Min => "Min",
            Self::State => "State",
            Self::Sum => "Sum",
        }
    }
}

impl fmt::Display for StatisticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============= Period =============

/// Aggregation granularity requested from the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "5minute")]
    FiveMinute,
    #[serde(rename = "hour")]
    Hour,
    #[serde(rename = "day")]
    Day,
    #[default]
    #[serde(rename = "week")]
    Week,
    #[serde(rename = "month")]
    Month,
}

impl Period {
    pub const ALL: [Period; 5] = [
        Self::FiveMinute,
        Self::Hour,
        Self::Day,
        Self::Week,
        Self::Month,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FiveMinute => "5minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FiveMinute => "5 Minute",
            Self::Hour => "Hour",
            Self::Day => "Day",
            Self::Week => "Week",
            Self::Month => "Month",
        }
    }

    /// How often statistics for this period are worth re-fetching.
    /// The recorder compiles 5-minute statistics every 5 minutes and
    /// everything else hourly.
    pub fn refresh_interval(&self) -> Duration {
        match self {
            Self::FiveMinute => Duration::from_secs(5 * 60),
            Self::Hour | Self::Day | Self::Week | Self::Month => Duration::from_secs(60 * 60),
        }
    }

    /// Whether bucket labels carry hour and minute
    pub fn has_time_of_day(&self) -> bool {
        matches!(self, Self::FiveMinute | Self::Hour)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============= Unit Conversion =============

/// Optional unit conversion applied by the recorder before aggregation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsUnitConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
}

// ============= Query Response =============

/// One time-windowed aggregate, covering `[start, end)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticValue {
    #[serde(with = "epoch_millis")]
    pub start: DateTime<Utc>,
    #[serde(with = "epoch_millis")]
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<f64>,
}

impl StatisticValue {
    /// Bucket with no numeric facets set
    pub fn empty(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            change: None,
            last_reset: None,
            max: None,
            mean: None,
            min: None,
            sum: None,
            state: None,
        }
    }

    pub fn value(&self, stat_type: StatisticType) -> Option<f64> {
        match stat_type {
            StatisticType::Change => self.change,
            StatisticType::LastReset => self.last_reset,
            StatisticType::Max => self.max,
            StatisticType::Mean => self.mean,
            StatisticType::Min => self.min,
            StatisticType::State => self.state,
            StatisticType::Sum => self.sum,
        }
    }
}

/// Recorder response: statistic id -> buckets, in response order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    series: Vec<(String, Vec<StatisticValue>)>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a series. A replaced series keeps its position.
    pub fn insert(&mut self, statistic_id: impl Into<String>, values: Vec<StatisticValue>) {
        let statistic_id = statistic_id.into();
        if let Some((_, existing)) = self.series.iter_mut().find(|(id, _)| *id == statistic_id) {
            *existing = values;
        } else {
            self.series.push((statistic_id, values));
        }
    }

    pub fn get(&self, statistic_id: &str) -> Option<&[StatisticValue]> {
        self.series
            .iter()
            .find(|(id, _)| id == statistic_id)
            .map(|(_, values)| values.as_slice())
    }

    /// Number of series (not buckets)
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[StatisticValue])> {
        self.series
            .iter()
            .map(|(id, values)| (id.as_str(), values.as_slice()))
    }

    /// All buckets of all series, flattened in order
    pub fn buckets(&self) -> impl Iterator<Item = &StatisticValue> {
        self.series.iter().flat_map(|(_, values)| values.iter())
    }

    pub fn bucket_count(&self) -> usize {
        self.series.iter().map(|(_, values)| values.len()).sum()
    }
}

impl FromIterator<(String, Vec<StatisticValue>)> for Statistics {
    fn from_iter<I: IntoIterator<Item = (String, Vec<StatisticValue>)>>(iter: I) -> Self {
        let mut statistics = Self::new();
        for (id, values) in iter {
            statistics.insert(id, values);
        }
        statistics
    }
}

impl Serialize for Statistics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.series.len()))?;
        for (id, values) in &self.series {
            map.serialize_entry(id, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Statistics {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StatisticsVisitor;

        impl<'de> Visitor<'de> for StatisticsVisitor {
            type Value = Statistics;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of statistic ids to bucket lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Statistics, A::Error> {
                let mut statistics = Statistics::new();
                while let Some((id, values)) =
                    access.next_entry::<String, Vec<StatisticValue>>()?
                {
                    statistics.insert(id, values);
                }
                Ok(statistics)
            }
        }

        deserializer.deserialize_map(StatisticsVisitor)
    }
}

/// Recorder timestamps are epoch milliseconds, sometimes sent as floats
mod epoch_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.timestamp_millis())
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "epoch milliseconds fit comfortably in i64"
    )]
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let millis = f64::deserialize(deserializer)?;
        if !millis.is_finite() {
            return Err(D::Error::custom("timestamp is not a finite number"));
        }
        DateTime::from_timestamp_millis(millis.round() as i64)
            .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {millis}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_statistics_keep_response_order() {
        let raw = r#"{
            "sensor.zeta": [{"start": 1700000000000, "end": 1700003600000, "sum": 1.0}],
            "sensor.alpha": [{"start": 1700000000000, "end": 1700003600000, "sum": 2.0}]
        }"#;
        let statistics: Statistics = serde_json::from_str(raw).unwrap();

        let ids: Vec<&str> = statistics.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["sensor.zeta", "sensor.alpha"]);
        assert_eq!(statistics.bucket_count(), 2);
    }

    #[test]
    fn test_bucket_accepts_float_timestamps_and_nulls() {
        let value: StatisticValue = serde_json::from_value(json!({
            "start": 1700000000000.0,
            "end": 1700003600000_i64,
            "mean": null,
            "max": 2.5
        }))
        .unwrap();

        assert_eq!(value.start.timestamp(), 1_700_000_000);
        assert_eq!(value.end.timestamp(), 1_700_003_600);
        assert_eq!(value.value(StatisticType::Max), Some(2.5));
        assert_eq!(value.value(StatisticType::Mean), None);
        assert_eq!(value.value(StatisticType::LastReset), None);
    }

    #[test]
    fn test_duplicate_series_replaced_in_place() {
        let start = DateTime::from_timestamp(0, 0).unwrap();
        let end = DateTime::from_timestamp(3600, 0).unwrap();
        let mut statistics = Statistics::new();
        statistics.insert("a", vec![]);
        statistics.insert("b", vec![]);
        statistics.insert("a", vec![StatisticValue::empty(start, end)]);

        let ids: Vec<&str> = statistics.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(statistics.get("a").map(<[_]>::len), Some(1));
    }

    #[test]
    fn test_refresh_interval() {
        assert_eq!(Period::FiveMinute.refresh_interval(), Duration::from_millis(300_000));
        for period in [Period::Hour, Period::Day, Period::Week, Period::Month] {
            assert_eq!(period.refresh_interval(), Duration::from_millis(3_600_000));
        }
    }

    #[test]
    fn test_period_wire_names() {
        assert_eq!(serde_json::to_value(Period::FiveMinute).unwrap(), json!("5minute"));
        let period: Period = serde_json::from_value(json!("month")).unwrap();
        assert_eq!(period, Period::Month);
        assert_eq!(Period::default(), Period::Week);
    }

    #[test]
    fn test_default_selection_skips_last_reset() {
        assert!(!StatisticType::DEFAULT_SELECTION.contains(&StatisticType::LastReset));
        assert!(StatisticType::ALL.contains(&StatisticType::LastReset));
    }
}
