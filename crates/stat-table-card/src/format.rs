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

//! Bucket labels and value cells.
//!
//! Labels follow the conventions of the browser's `Intl.DateTimeFormat` for
//! the handful of field combinations the card uses; month names come from
//! the host language's locale.

use chrono::{DateTime, Datelike, Locale, Utc};
use chrono_tz::Tz;
use stat_table_types::Period;
use tracing::warn;

/// Which date fields a bucket label shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFormatOptions {
    pub year: bool,
    pub long_month: bool,
    pub day: bool,
    pub time: bool,
}

impl DateFormatOptions {
    /// Derive the label fields from the configured period and the query range.
    ///
    /// `period` is the configured value; when it is unset no field is
    /// period-specific (short month and day, no time).
    pub fn for_range(
        period: Option<Period>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tz: Tz,
    ) -> Self {
        let is_month = period == Some(Period::Month);
        Self {
            year: start.with_timezone(&tz).year() != end.with_timezone(&tz).year(),
            long_month: is_month,
            day: !is_month,
            time: period.is_some_and(|p| p.has_time_of_day()),
        }
    }
}

/// Date label conventions of one host language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelLocale {
    pub locale: Locale,
    /// Month before day, as US English writes it
    pub month_first: bool,
    pub twelve_hour: bool,
    /// Written right after the day number (`5. Mai`)
    pub day_suffix: &'static str,
}

impl LabelLocale {
    pub const EN_US: Self = Self {
        locale: Locale::en_US,
        month_first: true,
        twelve_hour: true,
        day_suffix: "",
    };

    /// Map a BCP-47 language tag to its label conventions.
    ///
    /// A bare language uses its usual region (`cs` is `cs_CZ`). Unknown tags
    /// fall back to US English.
    pub fn resolve(language: &str) -> Self {
        let normalized = language.replace('-', "_");
        let mut parts = normalized.split('_');
        let lang = parts.next().unwrap_or_default().to_lowercase();
        let region = parts.next().map(str::to_uppercase);

        let candidate = match region {
            Some(region) => format!("{lang}_{region}"),
            None => DEFAULT_REGIONS
                .iter()
                .find(|(code, _)| *code == lang)
                .map_or_else(
                    || format!("{lang}_{}", lang.to_uppercase()),
                    |(_, name)| (*name).to_owned(),
                ),
        };

        match Locale::try_from(candidate.as_str()) {
            Ok(locale) => {
                let is_us = locale == Locale::en_US;
                Self {
                    locale,
                    month_first: is_us,
                    twelve_hour: is_us,
                    day_suffix: if DOTTED_DAY.contains(&lang.as_str()) {
                        "."
                    } else {
                        ""
                    },
                }
            }
            Err(_) => {
                warn!("⚠️ [FORMAT] Unknown language '{}', using en_US", language);
                Self::EN_US
            }
        }
    }
}

/// Locales for languages whose main country code differs from the language code
const DEFAULT_REGIONS: &[(&str, &str)] = &[
    ("ar", "ar_SA"),
    ("ca", "ca_ES"),
    ("cs", "cs_CZ"),
    ("da", "da_DK"),
    ("el", "el_GR"),
    ("en", "en_US"),
    ("et", "et_EE"),
    ("he", "he_IL"),
    ("hi", "hi_IN"),
    ("ja", "ja_JP"),
    ("ko", "ko_KR"),
    ("nb", "nb_NO"),
    ("nn", "nn_NO"),
    ("sl", "sl_SI"),
    ("sv", "sv_SE"),
    ("uk", "uk_UA"),
    ("vi", "vi_VN"),
    ("zh", "zh_CN"),
];

/// Languages writing an ordinal dot after the day number
const DOTTED_DAY: &[&str] = &["cs", "da", "de", "hr", "nb", "nn", "sk", "sl"];

/// Locale-aware formatter for bucket start/end labels
#[derive(Debug, Clone)]
pub struct DateFormatter {
    pattern: String,
    locale: Locale,
    tz: Tz,
}

impl DateFormatter {
    pub fn new(language: &str, tz: Tz, options: DateFormatOptions) -> Self {
        Self::with_locale(LabelLocale::resolve(language), tz, options)
    }

    pub fn with_locale(labels: LabelLocale, tz: Tz, options: DateFormatOptions) -> Self {
        Self {
            pattern: build_pattern(options, labels),
            locale: labels.locale,
            tz,
        }
    }

    pub fn format(&self, value: DateTime<Utc>) -> String {
        value
            .with_timezone(&self.tz)
            .format_localized(&self.pattern, self.locale)
            .to_string()
    }

    /// Row label: the bucket start, or `start - end` for weekly buckets
    pub fn row_label(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        period: Option<Period>,
    ) -> String {
        if period == Some(Period::Week) {
            format!("{} - {}", self.format(start), self.format(end))
        } else {
            self.format(start)
        }
    }
}

fn build_pattern(options: DateFormatOptions, labels: LabelLocale) -> String {
    let month = if options.long_month { "%B" } else { "%b" };
    let day = format!("%-d{}", labels.day_suffix);

    let mut pattern = match (options.day, labels.month_first) {
        (false, _) => month.to_owned(),
        (true, true) => format!("{month} {day}"),
        (true, false) => format!("{day} {month}"),
    };

    if options.year {
        if options.day && labels.month_first {
            pattern.push_str(", %Y");
        } else {
            pattern.push_str(" %Y");
        }
    }

    if options.time {
        pattern.push_str(if labels.twelve_hour { ", %I:%M %p" } else { ", %H:%M" });
    }

    pattern
}

/// Host time zone, falling back to UTC for unknown names
pub fn parse_time_zone(name: &str) -> Tz {
    name.parse::<Tz>().unwrap_or_else(|_| {
        warn!("⚠️ [FORMAT] Unknown time zone '{}', using UTC", name);
        Tz::UTC
    })
}

/// Value cell: one decimal, a space, then the unit. Missing values show as zero.
///
/// Halves round away from zero (`0.25` is `0.3`).
pub fn format_value(value: Option<f64>, unit: &str) -> String {
    let value = value.filter(|v| !v.is_nan() && *v != 0.0).unwrap_or(0.0);
    let rounded = (value * 10.0).round() / 10.0;
    // -0.04 rounds to -0.0
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded:.1} {unit}")
}
