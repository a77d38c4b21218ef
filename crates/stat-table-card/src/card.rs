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
use chrono::{DateTime, Months, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;
use serde_json::Value;
use stat_table_ha::{HomeAssistant, fetch_statistics};
use stat_table_types::{Period, StatisticType, Statistics, StatisticsTableCardConfig};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc::UnboundedSender, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::editor::{ConfigChanged, StatisticsTableCardEditor};
use crate::errors::{ConfigError, ConfigResult};
use crate::format::{DateFormatOptions, DateFormatter, LabelLocale, parse_time_zone};
use crate::render::{CardTemplate, TableView};

/// Custom element name of the card
pub const CARD_ELEMENT: &str = "statistics-table-card";

/// Query parameters derived when a configuration is applied
#[derive(Debug, Clone, PartialEq)]
pub struct FetchParams {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub period: Period,
    pub statistic_types: Vec<StatisticType>,
}

impl FetchParams {
    fn from_config(
        config: &StatisticsTableCardConfig,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> ConfigResult<Self> {
        let start = match &config.start_date {
            Some(date) => date.resolve(tz)?,
            None => one_month_before(now, tz),
        };
        let end = match &config.end_date {
            Some(date) => date.resolve(tz)?,
            None => now,
        };

        Ok(Self {
            start,
            end,
            period: config.effective_period(),
            statistic_types: config.selected_types(),
        })
    }
}

/// Same wall-clock time one calendar month earlier, clamped to month end
fn one_month_before(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    now.with_timezone(&tz)
        .checked_sub_months(Months::new(1))
        .map_or_else(|| now - chrono::Duration::days(30), |dt| dt.with_timezone(&Utc))
}

/// Host language and time zone, resolved once per host context
#[derive(Debug, Clone, Copy)]
struct HostFormat {
    labels: LabelLocale,
    tz: Tz,
}

impl HostFormat {
    fn resolve(hass: &dyn HomeAssistant) -> Self {
        Self {
            labels: LabelLocale::resolve(&hass.language()),
            tz: parse_time_zone(&hass.time_zone()),
        }
    }
}

#[derive(Default)]
struct CardState {
    hass: Option<Arc<dyn HomeAssistant>>,
    host_format: Option<HostFormat>,
    config: Option<StatisticsTableCardConfig>,
    params: Option<FetchParams>,
    statistics: Option<Statistics>,
    statistics_ready: bool,
    connected: bool,
    /// Bumped whenever the poller is restarted or stopped; fetches started
    /// under an older generation must not touch the state.
    generation: u64,
    poller: Option<JoinHandle<()>>,
}

struct CardInner {
    state: Mutex<CardState>,
    revision: watch::Sender<u64>,
}

impl CardInner {
    /// Tell the host the card needs re-rendering
    fn notify(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }
}

/// Dashboard card showing recorder statistics of one entity as a table.
///
/// Lifecycle mirrors a custom element: the host calls [`set_hass`](Self::set_hass)
/// and [`set_config`](Self::set_config), then
/// [`connected_callback`](Self::connected_callback) when the card is shown and
/// [`disconnected_callback`](Self::disconnected_callback) when it is removed.
/// Polling runs on the Tokio runtime the callbacks are invoked from.
pub struct StatisticsTableCard {
    inner: Arc<CardInner>,
}

impl fmt::Debug for StatisticsTableCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("StatisticsTableCard")
            .field("hass", &state.hass.is_some())
            .field("config", &state.config)
            .field("statistics_ready", &state.statistics_ready)
            .field("connected", &state.connected)
            .field("generation", &state.generation)
            .finish_non_exhaustive()
    }
}

impl StatisticsTableCard {
    pub fn new(hass: Option<Arc<dyn HomeAssistant>>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(CardInner {
                state: Mutex::new(CardState {
                    host_format: hass.as_ref().map(|hass| HostFormat::resolve(hass.as_ref())),
                    hass,
                    ..CardState::default()
                }),
                revision,
            }),
        }
    }

    /// Provide or replace the host context
    pub fn set_hass(&self, hass: Arc<dyn HomeAssistant>) {
        let host_format = HostFormat::resolve(hass.as_ref());
        {
            let mut state = self.inner.state.lock();
            state.hass = Some(hass);
            state.host_format = Some(host_format);
        }
        self.inner.notify();
    }

    /// Async factory for the card's editor, loaded only when the user opens it
    #[expect(
        clippy::unused_async,
        reason = "hosts load card editors through an async factory"
    )]
    pub async fn get_config_element(
        events: UnboundedSender<ConfigChanged>,
    ) -> StatisticsTableCardEditor {
        StatisticsTableCardEditor::new(events)
    }

    /// Revision counter bumped on every state change that affects rendering
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Apply a new configuration.
    ///
    /// Start and end dates are resolved now; changing the clock afterwards does
    /// not move them until the next call.
    pub fn set_config(&self, config: Value) -> ConfigResult<()> {
        match config.get("entity") {
            None | Some(Value::Null) => return Err(ConfigError::MissingEntity),
            Some(Value::String(entity)) if entity.is_empty() => {
                return Err(ConfigError::MissingEntity);
            }
            Some(_) => {}
        }

        let config: StatisticsTableCardConfig = serde_json::from_value(config)?;

        let mut state = self.inner.state.lock();
        let tz = state.host_format.map_or(Tz::UTC, |host| host.tz);
        let params = FetchParams::from_config(&config, tz, Utc::now())?;

        info!(
            "📊 [CARD] Configured for {} ({} buckets, {} to {})",
            config.entity, params.period, params.start, params.end
        );
        debug!("   Statistic types: {:?}", params.statistic_types);

        state.config = Some(config);
        state.params = Some(params);
        if state.connected {
            self.restart_polling(&mut state);
        }
        drop(state);

        self.inner.notify();
        Ok(())
    }

    /// The card became visible
    pub fn connected_callback(&self) {
        let mut state = self.inner.state.lock();
        state.connected = true;
        if state.config.is_some() {
            self.restart_polling(&mut state);
        }
    }

    /// The card was removed; stops polling
    pub fn disconnected_callback(&self) {
        let mut state = self.inner.state.lock();
        state.connected = false;
        state.generation = state.generation.wrapping_add(1);
        if let Some(poller) = state.poller.take() {
            poller.abort();
            info!("💤 [CARD] Statistics polling stopped");
        }
    }

    /// Timer period for the active configuration, `None` when refresh is off
    pub fn refresh_interval(&self) -> Option<Duration> {
        let state = self.inner.state.lock();
        let config = state.config.as_ref()?;
        refresh_interval(config)
    }

    pub fn config(&self) -> Option<StatisticsTableCardConfig> {
        self.inner.state.lock().config.clone()
    }

    pub fn fetch_params(&self) -> Option<FetchParams> {
        self.inner.state.lock().params.clone()
    }

    pub fn statistics(&self) -> Option<Statistics> {
        self.inner.state.lock().statistics.clone()
    }

    /// No fetch has completed yet, or one is in progress
    pub fn is_loading(&self) -> bool {
        !self.inner.state.lock().statistics_ready
    }

    /// Render the card as HTML. Empty until both host context and
    /// configuration are present.
    pub fn render(&self) -> Result<String, askama::Error> {
        let state = self.inner.state.lock();
        let (Some(host), Some(config), Some(params)) =
            (state.host_format, &state.config, &state.params)
        else {
            return Ok(String::new());
        };

        let table = match &state.statistics {
            Some(statistics) if state.statistics_ready && !statistics.is_empty() => {
                let options =
                    DateFormatOptions::for_range(config.period, params.start, params.end, host.tz);
                let formatter = DateFormatter::with_locale(host.labels, host.tz, options);
                Some(TableView::build(
                    statistics,
                    config.period,
                    &params.statistic_types,
                    config.unit.as_deref().unwrap_or_default(),
                    &formatter,
                ))
            }
            Some(_) | None => None,
        };

        CardTemplate {
            title: config.title.as_deref().filter(|t| !t.is_empty()),
            loading: !state.statistics_ready,
            table,
        }
        .render()
    }

    /// Cancel any running poller, then fetch now and arm the refresh timer
    fn restart_polling(&self, state: &mut CardState) {
        if let Some(poller) = state.poller.take() {
            poller.abort();
        }
        state.generation = state.generation.wrapping_add(1);

        let Some(config) = &state.config else {
            return;
        };
        let interval = refresh_interval(config);
        match interval {
            Some(period) => info!(
                "🔄 [CARD] Polling statistics for {} every {}s",
                config.entity,
                period.as_secs()
            ),
            None => info!(
                "🔄 [CARD] Fetching statistics for {} once (energy date selection)",
                config.entity
            ),
        }

        let inner = Arc::clone(&self.inner);
        let generation = state.generation;
        state.poller = Some(tokio::spawn(poll_statistics(inner, generation, interval)));
    }
}

impl Drop for StatisticsTableCard {
    fn drop(&mut self) {
        if let Some(poller) = self.inner.state.lock().poller.take() {
            poller.abort();
        }
    }
}

fn refresh_interval(config: &StatisticsTableCardConfig) -> Option<Duration> {
    (!config.uses_energy_date_selection()).then(|| config.effective_period().refresh_interval())
}

/// Fetch immediately, then on every tick. Fetches run inline, so a tick that
/// fires while one is pending is skipped rather than overlapping it.
async fn poll_statistics(inner: Arc<CardInner>, generation: u64, interval: Option<Duration>) {
    // Armed before the first fetch so ticks stay aligned to activation
    let ticker = interval.map(|period| {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    });

    fetch_once(&inner, generation).await;

    let Some(mut ticker) = ticker else {
        return;
    };
    loop {
        ticker.tick().await;
        fetch_once(&inner, generation).await;
    }
}

async fn fetch_once(inner: &CardInner, generation: u64) {
    let request = {
        let mut state = inner.state.lock();
        if state.generation != generation {
            return;
        }
        let (Some(config), Some(params)) = (&state.config, &state.params) else {
            return;
        };
        let request = (state.hass.clone(), config.entity.clone(), params.clone());
        state.statistics_ready = false;
        request
    };
    inner.notify();

    let (hass, entity, params) = request;
    debug!("📊 [CARD] Fetching statistics for {}", entity);

    let result = match hass {
        Some(hass) => {
            fetch_statistics(
                hass.as_ref(),
                params.start,
                Some(params.end),
                &[entity.clone()],
                params.period,
                None,
                Some(&params.statistic_types),
            )
            .await
        }
        None => Err(stat_table_ha::HaError::ConnectionLost),
    };

    let mut state = inner.state.lock();
    if state.generation != generation {
        debug!("Discarding statistics for {} from a stopped poller", entity);
        return;
    }
    state.statistics_ready = true;
    match result {
        Ok(statistics) => {
            debug!(
                "✅ [CARD] {} buckets for {}",
                statistics.bucket_count(),
                entity
            );
            state.statistics = Some(statistics);
        }
        Err(e) => {
            warn!("⚠️ [CARD] Failed to fetch statistics for {}: {}", entity, e);
            state.statistics = None;
        }
    }
    drop(state);
    inner.notify();
}
