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

use serde::Serialize;
use serde_json::Value;
use stat_table_types::{Period, StatisticType};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace, warn};

/// Custom element name of the editor
pub const EDITOR_ELEMENT: &str = "statistics-table-card-editor";

// ============= Form Schema =============

/// One entry of the host's schema-driven form
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SchemaItem {
    Field(FieldSchema),
    Grid(GridSchema),
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldSchema {
    pub name: &'static str,
    #[serde(skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
    pub selector: Selector,
}

/// Fields laid out side by side
#[derive(Debug, Clone, Serialize)]
pub struct GridSchema {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub schema: &'static [FieldSchema],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Selector {
    Statistic {},
    Text {},
    Date {},
    Select(SelectSelector),
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectSelector {
    pub options: &'static [SelectOption],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'static str>,
    #[serde(skip_serializing_if = "is_false")]
    pub reorder: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub multiple: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
}

#[expect(clippy::trivially_copy_pass_by_ref, reason = "serde skip_serializing_if signature")]
fn is_false(value: &bool) -> bool {
    !*value
}

const fn period_option(period: Period, label: &'static str) -> SelectOption {
    SelectOption {
        value: match period {
            Period::FiveMinute => "5minute",
            Period::Hour => "hour",
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
        },
        label,
    }
}

const fn type_option(stat_type: StatisticType, label: &'static str) -> SelectOption {
    SelectOption {
        value: match stat_type {
            StatisticType::Change => "change",
            StatisticType::LastReset => "last_reset",
            StatisticType::Max => "max",
            StatisticType::Mean => "mean",
            StatisticType::Min => "min",
            StatisticType::State => "state",
            StatisticType::Sum => "sum",
        },
        label,
    }
}

const PERIOD_OPTIONS: &[SelectOption] = &[
    period_option(Period::FiveMinute, "5 Minute"),
    period_option(Period::Hour, "Hour"),
    period_option(Period::Day, "Day"),
    period_option(Period::Week, "Week"),
    period_option(Period::Month, "Month"),
];

const STATISTIC_TYPE_OPTIONS: &[SelectOption] = &[
    type_option(StatisticType::Change, "Change"),
    type_option(StatisticType::LastReset, "Last Reset"),
    type_option(StatisticType::Max, "Max"),
    type_option(StatisticType::Mean, "Mean"),
    type_option(StatisticType::Min, "Min"),
    type_option(StatisticType::State, "State"),
    type_option(StatisticType::Sum, "Sum"),
];

const DATE_RANGE: &[FieldSchema] = &[
    FieldSchema {
        name: "start_date",
        required: false,
        default: None,
        selector: Selector::Date {},
    },
    FieldSchema {
        name: "end_date",
        required: false,
        default: None,
        selector: Selector::Date {},
    },
];

/// Form schema of the editor.
///
/// The period field preselects "hour" while the card itself falls back to
/// "week" when `period` is missing.
pub const EDITOR_SCHEMA: &[SchemaItem] = &[
    SchemaItem::Field(FieldSchema {
        name: "entity",
        required: true,
        default: None,
        selector: Selector::Statistic {},
    }),
    SchemaItem::Field(FieldSchema {
        name: "title",
        required: false,
        default: None,
        selector: Selector::Text {},
    }),
    SchemaItem::Field(FieldSchema {
        name: "unit",
        required: false,
        default: None,
        selector: Selector::Text {},
    }),
    SchemaItem::Grid(GridSchema {
        kind: "grid",
        schema: DATE_RANGE,
    }),
    SchemaItem::Field(FieldSchema {
        name: "period",
        required: false,
        default: Some("hour"),
        selector: Selector::Select(SelectSelector {
            options: PERIOD_OPTIONS,
            mode: Some("dropdown"),
            reorder: false,
            multiple: false,
        }),
    }),
    SchemaItem::Field(FieldSchema {
        name: "statistics_type",
        required: false,
        default: None,
        selector: Selector::Select(SelectSelector {
            options: STATISTIC_TYPE_OPTIONS,
            mode: None,
            reorder: true,
            multiple: true,
        }),
    }),
];

// ============= Editor =============

/// `config-changed` event sent to the host for persistence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigChanged {
    pub config: Value,
}

/// What the host's form component needs to draw the editor
#[derive(Debug, Clone, Serialize)]
pub struct EditorForm {
    pub schema: &'static [SchemaItem],
    pub data: Option<Value>,
}

/// Form editor for the statistics table card
#[derive(Debug)]
pub struct StatisticsTableCardEditor {
    config: Option<Value>,
    events: UnboundedSender<ConfigChanged>,
}

impl StatisticsTableCardEditor {
    pub fn new(events: UnboundedSender<ConfigChanged>) -> Self {
        Self {
            config: None,
            events,
        }
    }

    /// Store the configuration as-is for display
    pub fn set_config(&mut self, config: Value) {
        trace!("Editor config set: {}", config);
        self.config = Some(config);
    }

    pub fn config(&self) -> Option<&Value> {
        self.config.as_ref()
    }

    pub fn render(&self) -> EditorForm {
        EditorForm {
            schema: EDITOR_SCHEMA,
            data: self.config.clone(),
        }
    }

    /// Handle a `value-changed` event from the form carrying the whole new
    /// configuration. Returns whether a `config-changed` event was sent.
    pub fn value_changed(&self, value: Value) -> bool {
        if is_empty(&value) {
            trace!("Ignoring empty form value");
            return false;
        }

        debug!("✏️ [EDITOR] Configuration changed");
        if self.events.send(ConfigChanged { config: value }).is_err() {
            warn!("⚠️ [EDITOR] Host stopped listening for config changes");
            return false;
        }
        true
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Bool(true) | Value::Array(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[test]
    fn test_schema_matches_form_json() {
        let schema = serde_json::to_value(EDITOR_SCHEMA).unwrap();

        assert_eq!(
            schema[0],
            json!({"name": "entity", "required": true, "selector": {"statistic": {}}})
        );
        assert_eq!(schema[1], json!({"name": "title", "selector": {"text": {}}}));
        assert_eq!(
            schema[3],
            json!({
                "type": "grid",
                "schema": [
                    {"name": "start_date", "selector": {"date": {}}},
                    {"name": "end_date", "selector": {"date": {}}}
                ]
            })
        );
        assert_eq!(schema[4]["selector"]["select"]["mode"], "dropdown");
        assert_eq!(schema[4]["default"], "hour");
        assert_eq!(schema[4]["selector"]["select"]["options"][0], json!({"value": "5minute", "label": "5 Minute"}));

        let types = &schema[5]["selector"]["select"];
        assert_eq!(types["multiple"], true);
        assert_eq!(types["reorder"], true);
        let values: Vec<&str> = types["options"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["value"].as_str().unwrap())
            .collect();
        assert_eq!(
            values,
            vec!["change", "last_reset", "max", "mean", "min", "state", "sum"]
        );
    }

    #[test]
    fn test_options_follow_enum_wire_names() {
        for (option, period) in PERIOD_OPTIONS.iter().zip(Period::ALL) {
            assert_eq!(option.value, period.as_str());
            assert_eq!(option.label, period.label());
        }
        for (option, stat_type) in STATISTIC_TYPE_OPTIONS.iter().zip(StatisticType::ALL) {
            assert_eq!(option.value, stat_type.as_str());
            assert_eq!(option.label, stat_type.label());
        }
    }

    #[test]
    fn test_config_stored_verbatim() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut editor = StatisticsTableCardEditor::new(tx);
        // No entity and an unknown period: the editor does not validate
        let config = json!({"period": "fortnight", "title": "Energy"});

        editor.set_config(config.clone());

        assert_eq!(editor.render().data, Some(config));
    }

    #[test]
    fn test_value_changed_emits_whole_config() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut editor = StatisticsTableCardEditor::new(tx);
        editor.set_config(json!({"entity": "sensor.energy"}));

        let updated = json!({"entity": "sensor.energy", "period": "day", "statistics_type": ["max"]});
        assert!(editor.value_changed(updated.clone()));

        assert_eq!(rx.try_recv().unwrap(), ConfigChanged { config: updated });
        // The host re-delivers the config; the editor does not merge on its own
        assert_eq!(editor.config(), Some(&json!({"entity": "sensor.energy"})));
    }

    #[test]
    fn test_empty_values_ignored() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let editor = StatisticsTableCardEditor::new(tx);

        for value in [json!(null), json!(false), json!(""), json!({}), json!(0)] {
            assert!(!editor.value_changed(value));
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_host_channel_is_not_fatal() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let editor = StatisticsTableCardEditor::new(tx);

        assert!(!editor.value_changed(json!({"entity": "sensor.energy"})));
    }
}
