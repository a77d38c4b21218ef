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

use askama::Template;
use stat_table_types::{Period, StatisticType, Statistics};

use crate::format::{DateFormatter, format_value};

/// Card markup
#[derive(Debug, Template)]
#[template(path = "card.html")]
pub struct CardTemplate<'a> {
    pub title: Option<&'a str>,
    pub loading: bool,
    pub table: Option<TableView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    /// First column header: the configured period, empty when unset
    pub period_header: String,
    pub headers: Vec<String>,
    pub rows: Vec<RowView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub label: String,
    pub cells: Vec<String>,
}

impl TableView {
    /// One row per bucket across all series, in response order.
    /// Series are flattened without a series label.
    pub fn build(
        statistics: &Statistics,
        period: Option<Period>,
        types: &[StatisticType],
        unit: &str,
        formatter: &DateFormatter,
    ) -> Self {
        let rows = statistics
            .buckets()
            .map(|bucket| RowView {
                label: formatter.row_label(bucket.start, bucket.end, period),
                cells: types
                    .iter()
                    .map(|t| format_value(bucket.value(*t), unit))
                    .collect(),
            })
            .collect();

        Self {
            period_header: period.map(|p| p.to_string()).unwrap_or_default(),
            headers: types.iter().map(ToString::to_string).collect(),
            rows,
        }
    }
}
