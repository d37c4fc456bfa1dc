//! The feed task: owner of all mutable feed state.
//!
//! [`FeedContext`] holds the point-of-interest intensity, the update
//! counter, the gathering flag and the current point set. It is owned by a
//! single task ([`run_feed`]) that interleaves periodic ticks with commands
//! from viewer connections, so every mutation runs to completion before the
//! next one starts and no lock guards the intensity.
//!
//! Connections talk to the task through a cloneable [`FeedHandle`]; ticks
//! fan out to them over a [`broadcast`] channel whose receiver count doubles
//! as the "is anyone watching" check.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use heatfeed_types::{
    BACKGROUND_POINTS, ClientMessage, GeoPoint, ServerMessage, WeightedPoint, clamp_unit,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::cluster::{generate_cluster, jitter_background, next_intensity, within_cluster};
use crate::config::HeatfeedConfig;

/// Capacity of the command channel into the feed task.
const COMMAND_CAPACITY: usize = 64;

/// Errors returned by [`FeedHandle`] operations.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The feed task has stopped.
    #[error("feed task is not running")]
    Closed,
}

/// Producer-owned intensity state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntensityState {
    /// Point-of-interest intensity in `[0, 1]`.
    pub intensity: f64,
    /// Number of ticks processed so far. Never decreases.
    pub update_count: u64,
    /// Whether the simulated gathering is advancing the intensity.
    pub gathering_active: bool,
}

/// Snapshot of the feed reported by `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedStatus {
    /// Point-of-interest intensity in `[0, 1]`.
    pub intensity: f64,
    /// Number of ticks processed so far.
    pub update_count: u64,
    /// Whether the simulated gathering is active.
    pub gathering_active: bool,
    /// Estimated crowd size, `floor(intensity * 1000)`.
    pub crowd_count: u64,
    /// Number of connected viewers.
    pub viewers: usize,
    /// Number of points in the current set.
    pub point_count: usize,
}

/// Estimated crowd size for an intensity: `floor(intensity * 1000)`.
pub fn crowd_count(intensity: f64) -> u64 {
    let scaled = (clamp_unit(intensity) * 1000.0).floor();
    // `scaled` is a whole number in [0, 1000].
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = scaled as u64;
    count
}

/// All mutable feed state plus the generator driving it.
#[derive(Debug)]
pub struct FeedContext<R> {
    center: GeoPoint,
    region: String,
    background: Vec<WeightedPoint>,
    state: IntensityState,
    points: Vec<WeightedPoint>,
    rng: R,
}

impl<R: Rng> FeedContext<R> {
    /// Create a context from configuration.
    ///
    /// Background points that fall inside the cluster box are dropped so
    /// the cluster center is the only point carrying the live intensity.
    pub fn new(config: &HeatfeedConfig, rng: R) -> Self {
        let center = config.point_of_interest.location();
        let background = BACKGROUND_POINTS
            .iter()
            .filter(|p| !within_cluster(center, p))
            .copied()
            .collect();

        let mut ctx = Self {
            center,
            region: config.feed.region.clone(),
            background,
            state: IntensityState {
                intensity: clamp_unit(config.feed.initial_intensity),
                update_count: 0,
                gathering_active: config.feed.gathering_active,
            },
            points: Vec::new(),
            rng,
        };
        let mut points = generate_cluster(ctx.center, ctx.state.intensity, &mut ctx.rng);
        points.extend_from_slice(&ctx.background);
        ctx.points = points;
        ctx
    }

    /// Current intensity state.
    pub const fn state(&self) -> &IntensityState {
        &self.state
    }

    /// The point set most recently generated.
    pub fn points(&self) -> &[WeightedPoint] {
        &self.points
    }

    /// Advance one tick and return the resulting `heatmap_update`.
    ///
    /// The counter always advances. The intensity only moves while the
    /// gathering is active. The cluster and the jittered background are
    /// rebuilt from scratch every time.
    pub fn tick(&mut self, now: DateTime<Utc>) -> ServerMessage {
        self.state.update_count = self.state.update_count.saturating_add(1);
        if self.state.gathering_active {
            self.state.intensity = next_intensity(self.state.update_count, &mut self.rng);
        }

        let mut points = generate_cluster(self.center, self.state.intensity, &mut self.rng);
        points.extend(jitter_background(&self.background, &mut self.rng));
        self.points = points;

        ServerMessage::HeatmapUpdate {
            data: self.points.clone(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            somnath_intensity: format!("{:.2}", self.state.intensity),
            crowd_count: crowd_count(self.state.intensity),
            tick: self.state.update_count,
        }
    }

    /// The current point set as a `full_update`.
    pub fn full_update(&self, message: Option<String>) -> ServerMessage {
        ServerMessage::FullUpdate {
            data: self.points.clone(),
            message,
        }
    }

    /// Override the intensity, clamped to `[0, 1]`. Returns the stored value.
    pub fn set_intensity(&mut self, requested: f64) -> f64 {
        self.state.intensity = clamp_unit(requested);
        self.state.intensity
    }

    /// Turn the simulated gathering on or off.
    pub const fn set_gathering(&mut self, active: bool) {
        self.state.gathering_active = active;
    }

    /// Status snapshot for the given number of viewers.
    pub fn status(&self, viewers: usize) -> FeedStatus {
        FeedStatus {
            intensity: self.state.intensity,
            update_count: self.state.update_count,
            gathering_active: self.state.gathering_active,
            crowd_count: crowd_count(self.state.intensity),
            viewers,
            point_count: self.points.len(),
        }
    }

    /// Region label used in `full_update` notes.
    pub fn region(&self) -> &str {
        &self.region
    }
}

/// A request processed by the feed task.
#[derive(Debug)]
pub enum FeedCommand {
    /// Reply with the current set as a `full_update`.
    Snapshot {
        /// Optional note attached to the reply.
        message: Option<String>,
        /// Where to send the reply.
        reply: oneshot::Sender<ServerMessage>,
    },
    /// Reply with a [`FeedStatus`].
    Status {
        /// Where to send the reply.
        reply: oneshot::Sender<FeedStatus>,
    },
    /// Override the intensity.
    SetIntensity(f64),
    /// Set the gathering flag.
    SetGathering(bool),
}

/// Cloneable handle used by connections to reach the feed task.
#[derive(Debug, Clone)]
pub struct FeedHandle {
    tx: mpsc::Sender<FeedCommand>,
}

impl FeedHandle {
    /// Wrap a command sender.
    pub const fn new(tx: mpsc::Sender<FeedCommand>) -> Self {
        Self { tx }
    }

    async fn send(&self, command: FeedCommand) -> Result<(), FeedError> {
        self.tx.send(command).await.map_err(|_| FeedError::Closed)
    }

    /// Fetch the current point set as a `full_update`.
    pub async fn snapshot(&self, message: Option<String>) -> Result<ServerMessage, FeedError> {
        let (reply, rx) = oneshot::channel();
        self.send(FeedCommand::Snapshot { message, reply }).await?;
        rx.await.map_err(|_| FeedError::Closed)
    }

    /// Fetch the current [`FeedStatus`].
    pub async fn status(&self) -> Result<FeedStatus, FeedError> {
        let (reply, rx) = oneshot::channel();
        self.send(FeedCommand::Status { reply }).await?;
        rx.await.map_err(|_| FeedError::Closed)
    }

    /// Override the intensity. The feed task clamps it to `[0, 1]`.
    pub async fn set_intensity(&self, intensity: f64) -> Result<(), FeedError> {
        self.send(FeedCommand::SetIntensity(intensity)).await
    }

    /// Set the gathering flag.
    pub async fn set_gathering(&self, active: bool) -> Result<(), FeedError> {
        self.send(FeedCommand::SetGathering(active)).await
    }

    /// Apply a viewer message.
    ///
    /// Returns the reply destined for that viewer alone, if any. Commands
    /// from one connection are queued in order, so a `request_data` sent
    /// after an override observes the override.
    pub async fn apply(&self, message: ClientMessage) -> Result<Option<ServerMessage>, FeedError> {
        match message {
            ClientMessage::RequestData { region } => {
                let note = format!("Data for region: {region}");
                self.snapshot(Some(note)).await.map(Some)
            }
            ClientMessage::SetCrowdIntensity { intensity } => {
                self.set_intensity(intensity).await.map(|()| None)
            }
            ClientMessage::ToggleGathering { active } => {
                self.set_gathering(active).await.map(|()| None)
            }
        }
    }
}

/// Run the feed loop until every [`FeedHandle`] is dropped.
///
/// The first tick fires one full `period` after start. Ticks that find no
/// subscribed viewer are skipped entirely: the counter does not advance and
/// nothing is generated.
pub async fn run_feed<R: Rng>(
    mut ctx: FeedContext<R>,
    mut commands: mpsc::Receiver<FeedCommand>,
    tx: broadcast::Sender<ServerMessage>,
    period: Duration,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        period_ms = period.as_millis(),
        intensity = ctx.state().intensity,
        gathering_active = ctx.state().gathering_active,
        "feed loop started"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let viewers = tx.receiver_count();
                if viewers == 0 {
                    continue;
                }
                let update = ctx.tick(Utc::now());
                // send fails only when every viewer left since the check.
                let delivered = tx.send(update).unwrap_or(0);
                debug!(
                    tick = ctx.state().update_count,
                    intensity = ctx.state().intensity,
                    delivered,
                    "heatmap update broadcast"
                );
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                handle_command(&mut ctx, command, &tx);
            }
        }
    }

    info!(ticks = ctx.state().update_count, "feed loop stopped");
}

fn handle_command<R: Rng>(
    ctx: &mut FeedContext<R>,
    command: FeedCommand,
    tx: &broadcast::Sender<ServerMessage>,
) {
    match command {
        FeedCommand::Snapshot { message, reply } => {
            // The requester may have gone away; nothing to do then.
            let _ = reply.send(ctx.full_update(message));
        }
        FeedCommand::Status { reply } => {
            let _ = reply.send(ctx.status(tx.receiver_count()));
        }
        FeedCommand::SetIntensity(requested) => {
            let stored = ctx.set_intensity(requested);
            info!(requested, stored, "crowd intensity overridden");
        }
        FeedCommand::SetGathering(active) => {
            ctx.set_gathering(active);
            info!(active, "gathering toggled");
        }
    }
}

/// Build a [`FeedContext`] from `config` and run it on a background task.
///
/// Uses `feed.seed` when configured, otherwise an OS-seeded generator.
pub fn spawn_feed(
    config: &HeatfeedConfig,
    tx: broadcast::Sender<ServerMessage>,
) -> (FeedHandle, JoinHandle<()>) {
    let rng = config
        .feed
        .seed
        .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
    let ctx = FeedContext::new(config, rng);
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let period = config.feed.tick_interval();
    let handle = tokio::spawn(run_feed(ctx, command_rx, tx, period));
    (FeedHandle::new(command_tx), handle)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use heatfeed_types::SOMNATH;

    use super::*;

    fn context(gathering_active: bool) -> FeedContext<StdRng> {
        let mut config = HeatfeedConfig::default();
        config.feed.gathering_active = gathering_active;
        FeedContext::new(&config, StdRng::seed_from_u64(42))
    }

    #[test]
    fn initial_set_starts_with_center() {
        let ctx = context(true);
        let first = ctx.points().first().copied().unwrap();
        assert_eq!(first, WeightedPoint(SOMNATH.lat, SOMNATH.lng, 0.5));
        // Somnath itself is dropped from the background.
        let at_center = ctx
            .points()
            .iter()
            .filter(|p| p.location() == SOMNATH)
            .count();
        assert_eq!(at_center, 1);
    }

    #[test]
    fn set_intensity_clamps() {
        let mut ctx = context(false);
        assert!((ctx.set_intensity(2.5) - 1.0).abs() < f64::EPSILON);
        assert!(ctx.set_intensity(-3.0).abs() < f64::EPSILON);
        assert!((ctx.set_intensity(0.42) - 0.42).abs() < f64::EPSILON);
    }

    #[test]
    fn inactive_gathering_keeps_intensity() {
        let mut ctx = context(false);
        ctx.set_intensity(0.37);
        for _ in 0..25 {
            let _ = ctx.tick(Utc::now());
            assert!((ctx.state().intensity - 0.37).abs() < f64::EPSILON);
        }
        assert_eq!(ctx.state().update_count, 25);
    }

    #[test]
    fn active_gathering_stays_in_range() {
        let mut ctx = context(true);
        for _ in 0..300 {
            let _ = ctx.tick(Utc::now());
            let intensity = ctx.state().intensity;
            assert!((0.0..=1.0).contains(&intensity));
        }
    }

    #[test]
    fn tick_builds_heatmap_update() {
        let mut ctx = context(false);
        ctx.set_intensity(0.8163);
        let update = ctx.tick(Utc::now());
        match update {
            ServerMessage::HeatmapUpdate {
                data,
                somnath_intensity,
                crowd_count,
                tick,
                ..
            } => {
                assert_eq!(somnath_intensity, "0.82");
                assert_eq!(crowd_count, 816);
                assert_eq!(tick, 1);
                let center = data.first().copied().unwrap();
                assert!((center.intensity() - 0.8163).abs() < f64::EPSILON);
                assert_eq!(data, ctx.points());
            }
            ServerMessage::FullUpdate { .. } => panic!("expected heatmap_update"),
        }
    }

    #[test]
    fn crowd_count_floors() {
        assert_eq!(crowd_count(0.0), 0);
        assert_eq!(crowd_count(0.9999), 999);
        assert_eq!(crowd_count(1.0), 1000);
        assert_eq!(crowd_count(3.0), 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn feed_loop_broadcasts_to_viewers() {
        let mut config = HeatfeedConfig::default();
        config.feed.seed = Some(1);
        let (tx, mut rx) = broadcast::channel(8);
        let (handle, task) = spawn_feed(&config, tx);

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, ServerMessage::HeatmapUpdate { tick: 1, .. }));

        let status = handle.status().await.unwrap();
        assert_eq!(status.update_count, 1);
        assert_eq!(status.viewers, 1);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn feed_loop_idles_without_viewers() {
        let config = HeatfeedConfig::default();
        let (tx, rx) = broadcast::channel(8);
        drop(rx);
        let (handle, _task) = spawn_feed(&config, tx);

        tokio::time::sleep(Duration::from_secs(30)).await;
        let status = handle.status().await.unwrap();
        assert_eq!(status.update_count, 0);
        assert_eq!(status.viewers, 0);
    }

    #[tokio::test]
    async fn commands_apply_in_order() {
        let mut config = HeatfeedConfig::default();
        config.feed.gathering_active = false;
        let (tx, _rx) = broadcast::channel(8);
        let (handle, _task) = spawn_feed(&config, tx);

        handle.set_intensity(2.5).await.unwrap();
        assert!((handle.status().await.unwrap().intensity - 1.0).abs() < f64::EPSILON);

        handle.set_intensity(-3.0).await.unwrap();
        assert!(handle.status().await.unwrap().intensity.abs() < f64::EPSILON);

        handle
            .apply(ClientMessage::ToggleGathering { active: true })
            .await
            .unwrap();
        assert!(handle.status().await.unwrap().gathering_active);

        let reply = handle
            .apply(ClientMessage::request_data("gujarat"))
            .await
            .unwrap();
        assert!(matches!(
            reply,
            Some(ServerMessage::FullUpdate { message: Some(ref m), .. }) if m.contains("gujarat")
        ));
    }
}
