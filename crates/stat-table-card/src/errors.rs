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

use stat_table_types::DateParseError;
use thiserror::Error;

/// Rejection of a card configuration; the dashboard shows its own error card
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: entity is required")]
    MissingEntity,

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidDate(#[from] DateParseError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
