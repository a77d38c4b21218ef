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

use stat_table_types::{CARD_TYPE, CustomCardEntry};
use tracing::{debug, info};

/// The dashboard's catalog of custom cards shown in the card picker
#[derive(Debug, Default)]
pub struct CustomCardRegistry {
    entries: Vec<CustomCardEntry>,
}

impl CustomCardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Returns false if the type is already registered.
    pub fn register(&mut self, entry: CustomCardEntry) -> bool {
        if self.get(&entry.card_type).is_some() {
            debug!("Custom card '{}' already registered", entry.card_type);
            return false;
        }
        info!("🃏 [REGISTRY] Registered custom card: {}", entry.card_type);
        self.entries.push(entry);
        true
    }

    pub fn get(&self, card_type: &str) -> Option<&CustomCardEntry> {
        self.entries.iter().find(|e| e.card_type == card_type)
    }

    pub fn entries(&self) -> &[CustomCardEntry] {
        &self.entries
    }
}

/// Catalog entry for the statistics table card
pub fn statistics_table_card_entry() -> CustomCardEntry {
    CustomCardEntry {
        card_type: CARD_TYPE.to_owned(),
        name: "Statistics Table Card".to_owned(),
        description: "A card to display statistics in a table format.".to_owned(),
        preview: false,
        documentation_url: None,
    }
}

/// Startup step run once by the host integration
pub fn register_statistics_table_card(registry: &mut CustomCardRegistry) -> bool {
    registry.register(statistics_table_card_entry())
}
