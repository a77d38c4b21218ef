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

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::HaResult;

/// Host context handed to dashboard cards.
///
/// Implemented by whatever owns the websocket connection to Home Assistant;
/// cards never open connections on their own.
#[async_trait]
pub trait HomeAssistant: Send + Sync {
    /// UI language as a BCP-47 tag (e.g. "en", "en-GB", "cs")
    fn language(&self) -> String;

    /// IANA time zone of the Home Assistant instance (e.g. "Europe/Prague")
    fn time_zone(&self) -> String;

    /// Send one websocket command and return its `result` payload.
    /// The implementation assigns the message id.
    async fn call_ws(&self, message: Value) -> HaResult<Value>;
}
