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

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use stat_table_types::{Period, StatisticType, Statistics, StatisticsUnitConfiguration};
use tracing::{debug, trace};

use crate::errors::HaResult;
use crate::traits::HomeAssistant;

/// Websocket command type for recorder statistics
pub const STATISTICS_DURING_PERIOD: &str = "recorder/statistics_during_period";

/// `recorder/statistics_during_period` command body
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsDuringPeriod<'a> {
    #[serde(rename = "type")]
    command: &'static str,
    start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_time: Option<String>,
    statistic_ids: &'a [String],
    period: Period,
    #[serde(skip_serializing_if = "Option::is_none")]
    units: Option<&'a StatisticsUnitConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    types: Option<&'a [StatisticType]>,
}

impl<'a> StatisticsDuringPeriod<'a> {
    pub fn new(
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        statistic_ids: &'a [String],
        period: Period,
    ) -> Self {
        Self {
            command: STATISTICS_DURING_PERIOD,
            start_time: to_iso_string(start_time),
            end_time: end_time.map(to_iso_string),
            statistic_ids,
            period,
            units: None,
            types: None,
        }
    }

    #[must_use]
    pub fn with_units(mut self, units: Option<&'a StatisticsUnitConfiguration>) -> Self {
        self.units = units;
        self
    }

    #[must_use]
    pub fn with_types(mut self, types: Option<&'a [StatisticType]>) -> Self {
        self.types = types;
        self
    }
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2025-01-15T09:00:00.000Z`
fn to_iso_string(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Fetch recorder statistics for the given statistic ids
///
/// # Arguments
/// * `start_time` - Start of the first bucket
/// * `end_time` - End of the range (open-ended when `None`)
/// * `statistic_ids` - Entities or external statistic ids
/// * `period` - Bucket size
/// * `units` - Optional unit conversion
/// * `types` - Restrict the returned facets
pub async fn fetch_statistics(
    hass: &dyn HomeAssistant,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    statistic_ids: &[String],
    period: Period,
    units: Option<&StatisticsUnitConfiguration>,
    types: Option<&[StatisticType]>,
) -> HaResult<Statistics> {
    let command = StatisticsDuringPeriod::new(start_time, end_time, statistic_ids, period)
        .with_units(units)
        .with_types(types);

    debug!(
        "📊 [HA STATS] Fetching {} statistics for {:?}",
        period, statistic_ids
    );
    debug!(
        "   Range: {} to {}",
        command.start_time,
        command.end_time.as_deref().unwrap_or("now")
    );

    let message = serde_json::to_value(&command)?;
    trace!("   Command: {}", message);

    let result = hass.call_ws(message).await?;
    let statistics: Statistics = serde_json::from_value(result)?;

    debug!(
        "✅ [HA STATS] Received {} series, {} buckets",
        statistics.len(),
        statistics.bucket_count()
    );
    Ok(statistics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HaError;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use parking_lot::Mutex;
    use serde_json::{Value, json};

    struct RecordingHass {
        response: Value,
        sent: Mutex<Vec<Value>>,
    }

    impl RecordingHass {
        fn new(response: Value) -> Self {
            Self {
                response,
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HomeAssistant for RecordingHass {
        fn language(&self) -> String {
            "en".to_owned()
        }

        fn time_zone(&self) -> String {
            "UTC".to_owned()
        }

        async fn call_ws(&self, message: Value) -> HaResult<Value> {
            self.sent.lock().push(message);
            Ok(self.response.clone())
        }
    }

    struct DisconnectedHass;

    #[async_trait]
    impl HomeAssistant for DisconnectedHass {
        fn language(&self) -> String {
            "en".to_owned()
        }

        fn time_zone(&self) -> String {
            "UTC".to_owned()
        }

        async fn call_ws(&self, _message: Value) -> HaResult<Value> {
            Err(HaError::ConnectionLost)
        }
    }

    #[tokio::test]
    async fn test_fetch_statistics_sends_full_command() -> anyhow::Result<()> {
        let hass = RecordingHass::new(json!({
            "sensor.energy": [
                {"start": 1736928000000_i64, "end": 1737532800000_i64, "sum": 12.5}
            ]
        }));
        let ids = vec!["sensor.energy".to_owned()];
        let types = [StatisticType::Sum, StatisticType::Max];
        let start = Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 2, 15, 9, 0, 0).unwrap();

        let statistics = fetch_statistics(
            &hass,
            start,
            Some(end),
            &ids,
            Period::Week,
            None,
            Some(&types),
        )
        .await?;

        let sent = hass.sent.lock();
        assert_eq!(
            sent[0],
            json!({
                "type": "recorder/statistics_during_period",
                "start_time": "2025-01-15T09:00:00.000Z",
                "end_time": "2025-02-15T09:00:00.000Z",
                "statistic_ids": ["sensor.energy"],
                "period": "week",
                "types": ["sum", "max"]
            })
        );
        assert_eq!(statistics.bucket_count(), 1);
        assert_eq!(
            statistics.get("sensor.energy").unwrap()[0].value(StatisticType::Sum),
            Some(12.5)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_optional_fields_omitted() -> anyhow::Result<()> {
        let hass = RecordingHass::new(json!({}));
        let ids = vec!["sensor.energy".to_owned()];
        let units = StatisticsUnitConfiguration {
            energy: Some("kWh".to_owned()),
            ..Default::default()
        };
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let statistics =
            fetch_statistics(&hass, start, None, &ids, Period::Hour, Some(&units), None).await?;

        let sent = hass.sent.lock();
        let message = sent[0].as_object().unwrap();
        assert!(!message.contains_key("end_time"));
        assert!(!message.contains_key("types"));
        assert_eq!(message["units"], json!({"energy": "kWh"}));
        assert!(statistics.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_response_is_error() {
        let hass = RecordingHass::new(json!(["not", "a", "map"]));
        let ids = vec!["sensor.energy".to_owned()];
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let result = fetch_statistics(&hass, start, None, &ids, Period::Day, None, None).await;
        assert!(matches!(result, Err(HaError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let ids = vec!["sensor.energy".to_owned()];
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let result =
            fetch_statistics(&DisconnectedHass, start, None, &ids, Period::Day, None, None).await;
        assert!(matches!(result, Err(HaError::ConnectionLost)));
    }
}
