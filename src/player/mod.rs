//! Playback orchestrator
//!
//! A single task owns the queue, the logical playback state and the engine
//! bridge. UI surfaces talk to it through a cloneable [`PlayerHandle`]; every
//! request, stream resolution result and engine callback is applied in the
//! order it reaches the task's channel, so no two mutations ever interleave.
//! The task is organized by responsibility:
//!
//! - `playback`: user-facing transport and queue operations
//! - `engine_events`: binding, reconciliation and engine callbacks
//! - `bridge`: the engine connection and its lifecycle
//! - `resolver`: stream locator lookup
//! - `events`: listener registry and dispatch

mod bridge;
mod commands;
mod engine_events;
mod events;
mod playback;
mod resolver;

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::api::StreamApi;
use crate::config::ModePolicy;
use crate::engine::{ConnectionState, EngineHost};
use crate::model::{PlaybackSnapshot, PlaybackState, Queue, Track, TrackId};

use bridge::EngineBridge;
use commands::{Command, CommandSender};

pub use events::{
    EventCategories, EventCategory, EventHub, EventSubscription, ListenerId, PlayerEvent,
    PlayerListener,
};
pub use resolver::{StreamResolver, select_stream};

/// Knobs for a player instance.
#[derive(Clone, Debug, Default)]
pub struct PlayerOptions {
    pub mode_policy: ModePolicy,
    /// Fixed seed for shuffle; entropy-seeded when `None`.
    pub shuffle_seed: Option<u64>,
}

pub(crate) struct Orchestrator {
    state: PlaybackState,
    queue: Queue,
    bridge: EngineBridge,
    resolver: StreamResolver,
    events: EventHub,
    commands: CommandSender,
    rng: StdRng,
    policy: ModePolicy,
    /// Id of the latest resolution request; earlier completions are stale.
    resolution: u64,
}

impl Orchestrator {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Command>) {
        tracing::info!("Player task started");
        while let Some(command) = inbox.recv().await {
            tracing::trace!(command = command.name(), "Player command");
            if let Command::Shutdown = command {
                break;
            }
            self.handle(command);
        }
        tracing::info!("Player task stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::PlayTrack(track) => self.play_requested(track),
            Command::SetQueue { tracks, start_index } => self.set_queue(tracks, start_index),
            Command::TogglePlayPause => self.toggle_play_pause(),
            Command::Next => self.next(),
            Command::Previous => self.previous(),
            Command::SetShuffle(enabled) => self.set_shuffle(enabled),
            Command::SetRepeat(enabled) => self.set_repeat(enabled),
            Command::Seek(position_ms) => self.seek(position_ms),
            Command::Stop => self.stop(),
            Command::NotifyLikeChanged { track_id, liked } => {
                self.emit(PlayerEvent::LikeChanged { track_id, liked })
            }
            Command::InitializeEngine => {
                self.bridge.begin_bind(&self.commands);
            }
            Command::PollPosition => self.poll_position(),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::StreamResolved { request, track_id, result } => {
                self.stream_resolved(request, track_id, result)
            }
            Command::EngineBound { generation, engine } => self.engine_bound(generation, engine),
            Command::EngineEvent { generation, event } => self.engine_event(generation, event),
            Command::EngineLost { generation, reason } => self.engine_lost(generation, reason),
            Command::Shutdown => {}
        }
    }

    pub(crate) fn emit(&self, event: PlayerEvent) {
        self.events.dispatch(&event);
    }

    fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            current_track: self.state.current_track.clone(),
            current_index: self.state.current_index,
            queue: self.queue.tracks().to_vec(),
            is_playing: self.state.is_playing,
            shuffle_enabled: self.state.shuffle_enabled,
            repeat_enabled: self.state.repeat_enabled,
            phase: self.state.phase,
            position_ms: self.state.timing.current_position_ms(self.state.is_playing),
            duration_ms: self.state.timing.duration_ms,
            connection: self.bridge.state(),
            last_error: self.state.last_error.clone(),
        }
    }
}

/// Cloneable front door to the player task.
///
/// Every method is fire-and-forget except [`PlayerHandle::snapshot`]. Effects
/// show up as [`PlayerEvent`]s on the shared [`EventHub`].
#[derive(Clone)]
pub struct PlayerHandle {
    commands: CommandSender,
    events: EventHub,
    connection: watch::Receiver<ConnectionState>,
}

impl PlayerHandle {
    /// Start the player task and begin binding to the engine.
    pub fn spawn(
        host: Arc<dyn EngineHost>,
        streams: Arc<dyn StreamApi>,
        options: PlayerOptions,
    ) -> (Self, JoinHandle<()>) {
        Self::spawn_with_hub(host, streams, options, EventHub::new())
    }

    /// Like [`PlayerHandle::spawn`], publishing on an existing hub.
    pub fn spawn_with_hub(
        host: Arc<dyn EngineHost>,
        streams: Arc<dyn StreamApi>,
        options: PlayerOptions,
        events: EventHub,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (bridge, connection) = EngineBridge::new(host);
        let rng = match options.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let orchestrator = Orchestrator {
            state: PlaybackState::default(),
            queue: Queue::default(),
            bridge,
            resolver: StreamResolver::new(streams),
            events: events.clone(),
            commands: tx.clone(),
            rng,
            policy: options.mode_policy,
            resolution: 0,
        };

        let handle = PlayerHandle {
            commands: tx,
            events,
            connection,
        };
        handle.initialize_engine();

        let task = tokio::spawn(orchestrator.run(rx));
        (handle, task)
    }

    fn send(&self, command: Command) {
        let name = command.name();
        if self.commands.send(command).is_err() {
            tracing::warn!(command = name, "Player task has stopped, command dropped");
        }
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Play `track` now. The queue is left as is.
    pub fn play_track(&self, track: Track) {
        self.send(Command::PlayTrack(track));
    }

    /// Replace the queue and play `tracks[start_index]`. An index past the
    /// end loads the queue without starting playback.
    pub fn set_queue(&self, tracks: Vec<Track>, start_index: usize) {
        self.send(Command::SetQueue { tracks, start_index });
    }

    pub fn toggle_play_pause(&self) {
        self.send(Command::TogglePlayPause);
    }

    pub fn next(&self) {
        self.send(Command::Next);
    }

    pub fn previous(&self) {
        self.send(Command::Previous);
    }

    pub fn set_shuffle_enabled(&self, enabled: bool) {
        self.send(Command::SetShuffle(enabled));
    }

    pub fn set_repeat_enabled(&self, enabled: bool) {
        self.send(Command::SetRepeat(enabled));
    }

    pub fn seek(&self, position_ms: u64) {
        self.send(Command::Seek(position_ms));
    }

    /// Pause and mark the player stopped, e.g. when the now-playing surface is dismissed.
    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    /// Broadcast a confirmed like-state change to listeners.
    pub fn notify_like_changed(&self, track_id: TrackId, liked: bool) {
        self.send(Command::NotifyLikeChanged { track_id, liked });
    }

    /// Bind to the engine if unbound or disconnected. No-op otherwise.
    pub fn initialize_engine(&self) {
        self.send(Command::InitializeEngine);
    }

    /// Refresh the cached position from the engine.
    pub fn poll_position(&self) {
        self.send(Command::PollPosition);
    }

    /// `None` once the player task has stopped.
    pub async fn snapshot(&self) -> Option<PlaybackSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.commands.send(Command::Snapshot(reply)).ok()?;
        rx.await.ok()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.clone()
    }

    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Poll the engine position every `interval` until the player stops.
pub fn spawn_position_poller(handle: PlayerHandle, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if handle.is_closed() {
                tracing::debug!("Position poller exiting");
                break;
            }
            handle.poll_position();
        }
    })
}
