//! Live overlay sync: the consumer-side connection state machine.
//!
//! [`LiveOverlaySync`] owns the overlay surface and the connection state.
//! Transport events are fed in through one handler per transition and each
//! handler returns the [`SyncAction`] the driver must perform next, so the
//! whole machine runs against synthetic events without a socket:
//!
//! ```text
//!            start            on_open
//!   Closed ---------> Connecting ------> Open
//!     ^                   |                |
//!     |   on_error /      |                | on_error /
//!     +---- on_close -----+----------------+ on_close
//!     |
//!     +-- on_retry_due (after the reconnect delay, if enabled) --> Connecting
//! ```
//!
//! Entering `Closed` always re-renders the fallback set and schedules at
//! most one reconnect. A close event that follows an error for the same
//! connection finds the machine already `Closed` and does nothing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use heatfeed_types::{ClientMessage, WeightedPoint, background_points};
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_RECONNECT_DELAY, ViewerConfig};
use crate::error::ViewerError;
use crate::overlay::OverlaySurface;
use crate::parse::{MessageShape, parse_update};

/// Connection state, owned by the sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// A connection attempt is in flight.
    Connecting,
    /// The connection is open and messages flow.
    Open,
    /// No connection; the fallback set is shown.
    Closed,
}

/// What the driver must do after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    /// Nothing.
    Idle,
    /// Open a new connection.
    Connect,
    /// Send this message on the open connection.
    Send(ClientMessage),
    /// Wait this long, then call [`LiveOverlaySync::on_retry_due`].
    ScheduleReconnect(Duration),
}

/// Outcome of handling one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// The overlay now shows the message's points.
    Replaced {
        /// Shape the message was recognized as.
        shape: MessageShape,
        /// Number of points rendered.
        points: usize,
    },
    /// The message was logged and discarded; the overlay is unchanged.
    Dropped,
}

/// Fixed-delay reconnect policy. No backoff growth, no attempt cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Wait between a disconnect and the next attempt.
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Shared flag that allows or forbids reconnect attempts.
///
/// Checked when a reconnect is scheduled and again when it comes due, so a
/// caller that disables it mid-delay prevents the attempt. An in-flight
/// attempt is not aborted.
#[derive(Debug, Clone)]
pub struct ReconnectSwitch(Arc<AtomicBool>);

impl ReconnectSwitch {
    /// A switch that starts enabled.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Whether reconnects are currently allowed.
    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Forbid further reconnects.
    pub fn disable(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Allow reconnects again.
    pub fn enable(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl Default for ReconnectSwitch {
    fn default() -> Self {
        Self::new()
    }
}

/// The consumer-side overlay sync.
#[derive(Debug)]
pub struct LiveOverlaySync<S> {
    surface: S,
    state: ConnectionState,
    region: String,
    fallback: Vec<WeightedPoint>,
    policy: ReconnectPolicy,
    switch: ReconnectSwitch,
    reconnect_pending: bool,
}

impl<S: OverlaySurface> LiveOverlaySync<S> {
    /// Create a sync drawing into `surface`.
    ///
    /// Nothing is rendered until [`start`](Self::start).
    pub fn new(surface: S, region: impl Into<String>, switch: ReconnectSwitch) -> Self {
        Self {
            surface,
            state: ConnectionState::Closed,
            region: region.into(),
            fallback: background_points(),
            policy: ReconnectPolicy::default(),
            switch,
            reconnect_pending: false,
        }
    }

    /// Create a sync using the region and reconnect delay from `config`.
    pub fn from_config(surface: S, config: &ViewerConfig, switch: ReconnectSwitch) -> Self {
        Self::new(surface, config.region.clone(), switch)
            .with_reconnect_delay(config.reconnect_delay)
    }

    /// Override the reconnect delay.
    #[must_use]
    pub const fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.policy = ReconnectPolicy { delay };
        self
    }

    /// The active reconnect policy.
    pub const fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    /// Override the fallback set.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Vec<WeightedPoint>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Current connection state.
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether a reconnect has been scheduled and not yet come due.
    pub const fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// The fallback set shown while disconnected.
    pub fn fallback(&self) -> &[WeightedPoint] {
        &self.fallback
    }

    /// The rendering surface.
    pub const fn surface(&self) -> &S {
        &self.surface
    }

    /// Consume the sync and return its surface.
    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Mount the surface, render the fallback set and begin connecting.
    ///
    /// The fallback is drawn before any network activity so the map never
    /// waits on the feed.
    ///
    /// # Errors
    ///
    /// Returns the surface's mount error (typically
    /// [`ViewerError::ContainerMissing`]); the sync stays `Closed`.
    pub fn start(&mut self) -> Result<SyncAction, ViewerError> {
        self.surface.mount()?;
        self.surface.replace_overlay(self.fallback.clone());
        self.state = ConnectionState::Connecting;
        info!(fallback_points = self.fallback.len(), "overlay initialized with fallback data");
        Ok(SyncAction::Connect)
    }

    /// The connection opened: ask for the region's data.
    pub fn on_open(&mut self) -> SyncAction {
        if self.state != ConnectionState::Connecting {
            debug!(state = ?self.state, "ignoring open outside of a connection attempt");
            return SyncAction::Idle;
        }
        self.state = ConnectionState::Open;
        info!(region = self.region, "feed connected, requesting data");
        SyncAction::Send(ClientMessage::request_data(self.region.clone()))
    }

    /// A text message arrived.
    ///
    /// Recognized messages replace the overlay in one assignment; anything
    /// else is logged and dropped. No state transition happens either way.
    pub fn on_message(&mut self, text: &str) -> MessageOutcome {
        match parse_update(text) {
            Ok(update) => {
                let points = update.points.len();
                self.surface.replace_overlay(update.points);
                debug!(shape = ?update.shape, points, "overlay updated from feed");
                MessageOutcome::Replaced {
                    shape: update.shape,
                    points,
                }
            }
            Err(e) => {
                warn!(error = %e, "dropping feed message");
                MessageOutcome::Dropped
            }
        }
    }

    /// The transport reported an error.
    pub fn on_error(&mut self, error: &ViewerError) -> SyncAction {
        self.enter_closed(error)
    }

    /// The connection closed, for any reason.
    pub fn on_close(&mut self) -> SyncAction {
        self.enter_closed(&ViewerError::ConnectionClosed)
    }

    /// The reconnect delay elapsed.
    pub fn on_retry_due(&mut self) -> SyncAction {
        self.reconnect_pending = false;
        if !self.switch.is_enabled() {
            info!("reconnection disabled, staying on fallback data");
            return SyncAction::Idle;
        }
        if self.state != ConnectionState::Closed {
            return SyncAction::Idle;
        }
        self.state = ConnectionState::Connecting;
        info!("reconnecting to feed");
        SyncAction::Connect
    }

    /// The single terminal transition shared by error and close.
    fn enter_closed(&mut self, cause: &ViewerError) -> SyncAction {
        if self.state == ConnectionState::Closed {
            debug!(%cause, "already closed");
            return SyncAction::Idle;
        }
        self.state = ConnectionState::Closed;
        self.surface.replace_overlay(self.fallback.clone());
        warn!(%cause, "feed lost, showing fallback data");

        if !self.switch.is_enabled() {
            return SyncAction::Idle;
        }
        self.reconnect_pending = true;
        info!(delay_ms = self.policy.delay.as_millis(), "reconnect scheduled");
        SyncAction::ScheduleReconnect(self.policy.delay)
    }
}
