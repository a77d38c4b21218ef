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

pub mod card;
pub mod editor;
pub mod errors;
pub mod format;
pub mod registry;
pub mod render;

pub use card::{CARD_ELEMENT, FetchParams, StatisticsTableCard};
pub use editor::{ConfigChanged, EDITOR_ELEMENT, EditorForm, StatisticsTableCardEditor};
pub use errors::{ConfigError, ConfigResult};
pub use registry::{CustomCardRegistry, register_statistics_table_card};
