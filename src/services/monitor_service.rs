use std::time::Duration;

use chrono::{DateTime, Utc};
use serenity::model::id::GuildId;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::feed::{FeedConnector, FeedError};
use crate::api::presence::PresenceSink;
use crate::models::{Snapshot, TickReport};
use crate::services::price_service::{evaluate_tick, DisplayFormat};
use crate::utils::{Cancelled, Shutdown};

/// Source of wall-clock time for the daily baseline
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Pauses of the sampling loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorTiming {
    pub sample_interval: Duration,
    pub reconnect_delay: Duration,
    pub push_delay: Duration,
}

impl Default for MonitorTiming {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
            push_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Disconnected,
    Connecting,
    Sampling,
}

/// Why a tick did not complete
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TickError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("Shutdown requested")]
    Cancelled,
}

impl From<Cancelled> for TickError {
    fn from(_: Cancelled) -> Self {
        TickError::Cancelled
    }
}

/// Samples the feed and mirrors the quote into the presence sink.
///
/// Owns the daily baseline. The baseline survives reconnects and is only
/// replaced when a later UTC day starts.
pub struct PriceMonitor<F, S, C = SystemClock> {
    feed: F,
    sink: S,
    clock: C,
    format: DisplayFormat,
    timing: MonitorTiming,
    snapshot: Option<Snapshot>,
    state: MonitorState,
}

impl<F, S> PriceMonitor<F, S, SystemClock>
where
    F: FeedConnector,
    S: PresenceSink,
{
    pub fn new(feed: F, sink: S, format: DisplayFormat, timing: MonitorTiming) -> Self {
        Self::with_clock(feed, sink, SystemClock, format, timing)
    }
}

impl<F, S, C> PriceMonitor<F, S, C>
where
    F: FeedConnector,
    S: PresenceSink,
    C: Clock,
{
    pub fn with_clock(feed: F, sink: S, clock: C, format: DisplayFormat, timing: MonitorTiming) -> Self {
        Self {
            feed,
            sink,
            clock,
            format,
            timing,
            snapshot: None,
            state: MonitorState::Disconnected,
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    fn transition(&mut self, next: MonitorState) {
        if self.state != next {
            debug!("Monitor state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Reconnect supervisor. Returns only once `shutdown` fires.
    pub async fn run(&mut self, mut shutdown: Shutdown) {
        info!("📈 Price monitor started");

        loop {
            self.transition(MonitorState::Connecting);
            let connected = shutdown.run(self.feed.connect()).await;
            let mut conn = match connected {
                Err(Cancelled) => break,
                Ok(Ok(conn)) => conn,
                Ok(Err(e)) => {
                    self.transition(MonitorState::Disconnected);
                    warn!("{}; retrying in {:?}", e, self.timing.reconnect_delay);
                    if shutdown.sleep(self.timing.reconnect_delay).await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            info!("Connected to price feed");
            self.transition(MonitorState::Sampling);
            let stopped = self.sample(&mut conn, &mut shutdown).await;

            self.feed.close(conn).await;
            self.transition(MonitorState::Disconnected);

            match stopped {
                TickError::Cancelled => break,
                TickError::Feed(e) => {
                    warn!("{}; reconnecting in {:?}", e, self.timing.reconnect_delay);
                    if shutdown.sleep(self.timing.reconnect_delay).await.is_err() {
                        break;
                    }
                }
            }
        }

        self.transition(MonitorState::Disconnected);
        info!("Price monitor stopped");
    }

    /// Inner loop: tick on a fixed cadence until a tick fails
    async fn sample(&mut self, conn: &mut F::Connection, shutdown: &mut Shutdown) -> TickError {
        loop {
            if let Err(e) = self.tick(conn, shutdown).await {
                return e;
            }
            if let Err(e) = shutdown.sleep(self.timing.sample_interval).await {
                return e.into();
            }
        }
    }

    /// One fetch, derive, push cycle
    pub async fn tick(
        &mut self,
        conn: &mut F::Connection,
        shutdown: &mut Shutdown,
    ) -> Result<TickReport, TickError> {
        let book = shutdown.run(self.feed.fetch_top_of_book(conn)).await??;
        let now = self.clock.now();
        let (next, report) = evaluate_tick(self.snapshot.as_ref(), &book, now, &self.format);

        match &report {
            TickReport::Skipped => {
                debug!("Order book has an empty side, skipping tick");
            }
            TickReport::Published {
                mid_price,
                display: shown,
                baseline_replaced,
            } => {
                let label = &shown.label;
                debug!(mid = %mid_price, label = %label, "Publishing quote");

                self.push_nicknames(label, shutdown).await?;

                if let Some(change) = shown.change_pct {
                    let status = self.format.status(change);
                    if let Err(e) = self.sink.set_status(&status).await {
                        warn!("Failed to push status '{}': {}", status, e);
                    }
                }

                if *baseline_replaced {
                    info!("New daily baseline at mid {}", mid_price);
                    self.snapshot = next;
                }
            }
        }

        Ok(report)
    }

    /// Rename the bot in every target, pausing between targets.
    /// A failing target is logged and skipped.
    async fn push_nicknames(&self, label: &str, shutdown: &mut Shutdown) -> Result<usize, Cancelled> {
        let targets: Vec<GuildId> = self.sink.targets();
        let mut pushed = 0;

        for (i, target) in targets.iter().enumerate() {
            if i > 0 {
                shutdown.sleep(self.timing.push_delay).await?;
            }
            match self.sink.set_nickname(*target, label).await {
                Ok(()) => pushed += 1,
                Err(e) => warn!("Failed to push nickname to guild {}: {}", target, e),
            }
        }

        Ok(pushed)
    }
}
