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

use thiserror::Error;

/// Errors raised while talking to Home Assistant
#[derive(Debug, Error)]
pub enum HaError {
    #[error("Connection to Home Assistant lost")]
    ConnectionLost,

    #[error("Home Assistant returned error {code}: {message}")]
    Remote { code: String, message: String },

    #[error("Invalid response from Home Assistant: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

pub type HaResult<T> = Result<T, HaError>;
