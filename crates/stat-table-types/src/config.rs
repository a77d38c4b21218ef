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

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::recorder::{Period, StatisticType};

/// Card type under which the dashboard stores this card's configuration
pub const CARD_TYPE: &str = "statistics-table-card";

/// Persisted card configuration, as the dashboard stores it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsTableCardConfig {
    /// Usually `custom:statistics-table-card`; written by the dashboard
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub card_type: Option<String>,
    /// Statistic id (e.g. "sensor.grid_import_energy")
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateInput>,
    /// Left unset here; the card falls back to [`Period::default`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics_type: Option<StatisticsTypeSelection>,
    /// Date range is driven by the energy dashboard; disables periodic refresh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_date_selection: Option<bool>,
    /// Layout and visibility keys owned by the dashboard
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StatisticsTableCardConfig {
    /// Config with only the required entity set
    pub fn for_entity(entity: impl Into<String>) -> Self {
        Self {
            card_type: None,
            entity: entity.into(),
            title: None,
            unit: None,
            start_date: None,
            end_date: None,
            period: None,
            statistics_type: None,
            energy_date_selection: None,
            extra: Map::new(),
        }
    }

    pub fn effective_period(&self) -> Period {
        self.period.unwrap_or_default()
    }

    pub fn selected_types(&self) -> Vec<StatisticType> {
        StatisticsTypeSelection::resolve(self.statistics_type.as_ref())
    }

    pub fn uses_energy_date_selection(&self) -> bool {
        self.energy_date_selection.unwrap_or(false)
    }
}

/// `statistics_type` accepts a single type or an ordered list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatisticsTypeSelection {
    One(StatisticType),
    Many(Vec<StatisticType>),
}

impl StatisticsTypeSelection {
    /// Normalize to the ordered list of columns to query and show
    pub fn resolve(selection: Option<&Self>) -> Vec<StatisticType> {
        match selection {
            None => StatisticType::DEFAULT_SELECTION.to_vec(),
            Some(Self::One(stat_type)) => vec![*stat_type],
            Some(Self::Many(types)) => types.clone(),
        }
    }
}

// ============= Dates =============

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date '{input}': expected RFC 3339, YYYY-MM-DD or YYYY-MM-DDTHH:MM[:SS]")]
pub struct DateParseError {
    pub input: String,
}

/// Date as typed by the user or produced by the date picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateInput(pub String);

impl DateInput {
    pub fn new(input: impl Into<String>) -> Self {
        Self(input.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve to an instant.
    ///
    /// Date-only input means UTC midnight; a timestamp without offset is
    /// read as wall-clock time in `tz`.
    pub fn resolve(&self, tz: Tz) -> Result<DateTime<Utc>, DateParseError> {
        let input = self.0.trim();
        let invalid = || DateParseError {
            input: self.0.clone(),
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(dt.with_timezone(&Utc));
        }

        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
        }

        let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
            .ok_or_else(invalid)?;

        tz.from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(invalid)
    }
}

impl From<&str> for DateInput {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_config_defaults() {
        let config: StatisticsTableCardConfig =
            serde_json::from_value(json!({"entity": "sensor.energy"})).unwrap();

        assert_eq!(config.effective_period(), Period::Week);
        assert_eq!(config.selected_types(), StatisticType::DEFAULT_SELECTION.to_vec());
        assert!(!config.uses_energy_date_selection());
        assert!(config.period.is_none());
    }

    #[test]
    fn test_statistics_type_single_or_list() {
        let single: StatisticsTableCardConfig = serde_json::from_value(json!({
            "entity": "sensor.energy",
            "statistics_type": "max"
        }))
        .unwrap();
        assert_eq!(single.selected_types(), vec![StatisticType::Max]);

        let list: StatisticsTableCardConfig = serde_json::from_value(json!({
            "entity": "sensor.energy",
            "statistics_type": ["sum", "last_reset", "min"]
        }))
        .unwrap();
        assert_eq!(
            list.selected_types(),
            vec![StatisticType::Sum, StatisticType::LastReset, StatisticType::Min]
        );
    }

    #[test]
    fn test_unknown_keys_survive_round_trip() {
        let raw = json!({
            "type": "custom:statistics-table-card",
            "entity": "sensor.energy",
            "grid_options": {"columns": 12},
            "period": "day"
        });
        let config: StatisticsTableCardConfig = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(config.card_type.as_deref(), Some("custom:statistics-table-card"));
        assert!(config.extra.contains_key("grid_options"));
        assert_eq!(serde_json::to_value(&config).unwrap(), raw);
    }

    #[test]
    fn test_unknown_statistic_type_rejected() {
        let result = serde_json::from_value::<StatisticsTableCardConfig>(json!({
            "entity": "sensor.energy",
            "statistics_type": "median"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_date_input_formats() {
        let tz: Tz = "Europe/Prague".parse().unwrap();

        let rfc = DateInput::from("2025-01-15T10:00:00+01:00").resolve(tz).unwrap();
        assert_eq!(rfc, Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap());

        let date_only = DateInput::from("2025-01-15").resolve(tz).unwrap();
        assert_eq!(date_only, Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap());

        let local = DateInput::from("2025-07-01T12:30").resolve(tz).unwrap();
        assert_eq!(local, Utc.with_ymd_and_hms(2025, 7, 1, 10, 30, 0).unwrap());

        assert!(DateInput::from("last tuesday").resolve(tz).is_err());
    }
}
