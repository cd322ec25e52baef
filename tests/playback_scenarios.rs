//! End-to-end scenarios through the public player surface, using the
//! simulated engine host.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{Notify, mpsc, oneshot};

use scplayer::api::{LikeApi, StreamApi};
use scplayer::engine::{ConnectionState, EngineConnection, EngineHost, SimulatedEngineHost};
use scplayer::error::{ApiError, PlayerError};
use scplayer::likes::LikeStateManager;
use scplayer::model::{LikedTracksCache, PlaybackPhase, PlaybackSnapshot, QualityTier, StreamCandidate, Track, TrackId};
use scplayer::player::{EventCategories, EventCategory, PlayerEvent, PlayerHandle, PlayerOptions};
use scplayer::presenter::{NotificationListener, NowPlayingCard, NowPlayingPresenter};

type Gate = oneshot::Receiver<()>;

/// Answers with one progressive stream, optionally held until released.
#[derive(Default)]
struct Streams {
    held: Mutex<HashMap<TrackId, Gate>>,
}

impl Streams {
    fn hold(&self, id: TrackId) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.held.lock().unwrap().insert(id, rx);
        tx
    }
}

#[async_trait]
impl StreamApi for Streams {
    async fn resolve_stream(&self, track_id: TrackId) -> Result<Vec<StreamCandidate>, ApiError> {
        let gate = self.held.lock().unwrap().remove(&track_id);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(vec![StreamCandidate::new(
            QualityTier::HttpMp3_128,
            format!("https://cdn.test/{track_id}.mp3"),
        )])
    }
}

/// Wraps the simulated host so a test can sever the current binding.
struct SeverableHost {
    inner: SimulatedEngineHost,
    sever: Arc<Notify>,
}

#[async_trait]
impl EngineHost for SeverableHost {
    async fn connect(&self) -> Result<EngineConnection> {
        let EngineConnection { engine, mut events } = self.inner.connect().await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let sever = self.sever.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sever.notified() => break,
                    event = events.recv() => match event {
                        Some(event) => {
                            let _ = tx.send(event);
                        }
                        None => break,
                    },
                }
            }
        });
        Ok(EngineConnection { engine, events: rx })
    }
}

struct Setup {
    player: PlayerHandle,
    streams: Arc<Streams>,
    sever: Arc<Notify>,
}

async fn setup(track_length: Duration) -> Setup {
    let sever = Arc::new(Notify::new());
    let host = Arc::new(SeverableHost {
        inner: SimulatedEngineHost::new(track_length).with_handshake_delay(Duration::ZERO),
        sever: sever.clone(),
    });
    let streams = Arc::new(Streams::default());
    let options = PlayerOptions {
        shuffle_seed: Some(7),
        ..PlayerOptions::default()
    };
    let (player, _task) = PlayerHandle::spawn(host, streams.clone(), options);
    wait_for_connection(&player, ConnectionState::Bound).await;
    Setup { player, streams, sever }
}

async fn wait_for_connection(player: &PlayerHandle, state: ConnectionState) {
    let mut connection = player.watch_connection();
    tokio::time::timeout(Duration::from_secs(2), connection.wait_for(|s| *s == state))
        .await
        .expect("connection state not reached")
        .expect("player stopped");
}

async fn wait_until(player: &PlayerHandle, pred: impl Fn(&PlaybackSnapshot) -> bool) -> PlaybackSnapshot {
    tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            let snapshot = player.snapshot().await.unwrap();
            if pred(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached")
}

fn abc() -> Vec<Track> {
    ["A", "B", "C"]
        .iter()
        .enumerate()
        .map(|(i, title)| Track::new(i as u64 + 1, *title, "Artist", 180_000))
        .collect()
}

fn titles(tracks: &[Track]) -> Vec<&str> {
    tracks.iter().map(|t| t.title.as_str()).collect()
}

fn playing_title(snapshot: &PlaybackSnapshot) -> Option<&str> {
    snapshot.current_track.as_ref().map(|t| t.title.as_str())
}

#[tokio::test]
async fn play_track_announces_track_then_play_state_before_resolution() {
    let setup = setup(Duration::from_secs(60)).await;
    let mut events = setup.player.events().subscribe(EventCategories::ALL);
    let track = abc().remove(0);
    let release = setup.streams.hold(track.id);

    setup.player.play_track(track.clone());
    let snapshot = setup.player.snapshot().await.unwrap();

    assert_eq!(snapshot.phase, PlaybackPhase::Resolving);
    assert_eq!(
        events.drain(),
        vec![
            PlayerEvent::TrackChanged { track, index: None },
            PlayerEvent::PlayStateChanged { is_playing: true },
        ]
    );

    release.send(()).unwrap();
    wait_until(&setup.player, |s| s.phase == PlaybackPhase::Playing).await;
}

#[tokio::test]
async fn pausing_while_resolving_reports_a_single_pause() {
    let setup = setup(Duration::from_secs(60)).await;
    let mut play_state = setup.player.events().subscribe(EventCategory::PlayState);
    let track = abc().remove(0);
    let release = setup.streams.hold(track.id);

    setup.player.play_track(track);
    setup.player.toggle_play_pause();
    setup.player.snapshot().await.unwrap();
    release.send(()).unwrap();
    wait_until(&setup.player, |s| s.phase == PlaybackPhase::Paused).await;
    // Give the engine's own state callbacks time to come back.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let snapshot = setup.player.snapshot().await.unwrap();

    assert!(!snapshot.is_playing);
    assert_eq!(snapshot.phase, PlaybackPhase::Paused);
    assert_eq!(
        play_state.drain(),
        vec![
            PlayerEvent::PlayStateChanged { is_playing: true },
            PlayerEvent::PlayStateChanged { is_playing: false },
        ]
    );

    setup.player.toggle_play_pause();
    wait_until(&setup.player, |s| s.phase == PlaybackPhase::Playing).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(play_state.drain(), vec![PlayerEvent::PlayStateChanged { is_playing: true }]);
}

#[tokio::test]
async fn next_wraps_back_to_the_first_track() {
    let setup = setup(Duration::from_secs(60)).await;
    setup.player.set_queue(abc(), 0);

    let mut seen = Vec::new();
    for _ in 0..3 {
        setup.player.next();
        let snapshot = setup.player.snapshot().await.unwrap();
        seen.push(playing_title(&snapshot).unwrap().to_string());
    }

    assert_eq!(seen, vec!["B", "C", "A"]);
}

#[tokio::test]
async fn repeat_holds_the_current_track() {
    let setup = setup(Duration::from_secs(60)).await;
    setup.player.set_queue(abc(), 1);
    setup.player.set_repeat_enabled(true);

    for _ in 0..3 {
        setup.player.next();
        let snapshot = setup.player.snapshot().await.unwrap();
        assert_eq!(playing_title(&snapshot), Some("B"));
        assert_eq!(snapshot.current_index, Some(1));
    }
}

#[tokio::test]
async fn shuffle_keeps_the_current_track_and_unshuffle_restores_order() {
    let setup = setup(Duration::from_secs(60)).await;
    setup.player.set_queue(abc(), 0);
    setup.player.set_shuffle_enabled(true);

    let shuffled = setup.player.snapshot().await.unwrap();
    let mut sorted = titles(&shuffled.queue);
    sorted.sort();
    assert_eq!(sorted, vec!["A", "B", "C"]);
    let index = shuffled.current_index.unwrap();
    assert_eq!(shuffled.queue[index].title, "A");

    setup.player.previous();
    let after = setup.player.snapshot().await.unwrap();
    let expected = (index + shuffled.queue.len() - 1) % shuffled.queue.len();
    assert_eq!(after.current_index, Some(expected));
    assert_eq!(after.current_track.as_ref(), Some(&shuffled.queue[expected]));

    setup.player.set_shuffle_enabled(false);
    let restored = setup.player.snapshot().await.unwrap();
    assert_eq!(titles(&restored.queue), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn shuffle_and_repeat_exclude_each_other() {
    let setup = setup(Duration::from_secs(60)).await;
    let mut modes = setup.player.events().subscribe(EventCategory::ShuffleRepeat);
    setup.player.set_queue(abc(), 0);

    setup.player.set_repeat_enabled(true);
    setup.player.set_shuffle_enabled(true);
    let snapshot = setup.player.snapshot().await.unwrap();
    assert!(snapshot.shuffle_enabled && !snapshot.repeat_enabled);

    setup.player.set_repeat_enabled(true);
    let snapshot = setup.player.snapshot().await.unwrap();
    assert!(snapshot.repeat_enabled && !snapshot.shuffle_enabled);

    assert_eq!(
        modes.drain(),
        vec![
            PlayerEvent::ShuffleRepeatChanged { shuffle: false, repeat: true },
            PlayerEvent::ShuffleRepeatChanged { shuffle: true, repeat: false },
            PlayerEvent::ShuffleRepeatChanged { shuffle: false, repeat: true },
        ]
    );
}

#[tokio::test]
async fn stale_resolution_is_silent() {
    let setup = setup(Duration::from_secs(60)).await;
    let tracks = abc();
    let release_a = setup.streams.hold(tracks[0].id);

    setup.player.play_track(tracks[0].clone());
    setup.player.play_track(tracks[1].clone());
    wait_until(&setup.player, |s| s.phase == PlaybackPhase::Playing).await;

    let mut events = setup.player.events().subscribe(EventCategories::ALL);
    release_a.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let snapshot = setup.player.snapshot().await.unwrap();

    assert!(events.drain().is_empty());
    assert_eq!(playing_title(&snapshot), Some("B"));
    assert!(snapshot.is_playing);
    assert_eq!(snapshot.phase, PlaybackPhase::Playing);
}

#[tokio::test]
async fn lost_engine_reports_once_and_rebinds_on_request() {
    let setup = setup(Duration::from_secs(60)).await;
    setup.player.set_queue(abc(), 0);
    wait_until(&setup.player, |s| s.phase == PlaybackPhase::Playing).await;
    let mut play_state = setup.player.events().subscribe(EventCategory::PlayState);

    setup.sever.notify_one();
    wait_for_connection(&setup.player, ConnectionState::Disconnected).await;
    let snapshot = setup.player.snapshot().await.unwrap();

    assert_eq!(play_state.drain(), vec![PlayerEvent::PlayStateChanged { is_playing: false }]);
    assert!(!snapshot.is_playing);
    assert_eq!(snapshot.last_error, Some(PlayerError::EngineDisconnected));

    setup.player.initialize_engine();
    wait_for_connection(&setup.player, ConnectionState::Bound).await;
}

#[tokio::test]
async fn finished_track_advances_the_queue() {
    let setup = setup(Duration::from_millis(300)).await;
    let mut changes = setup.player.events().subscribe(EventCategory::TrackChanged);
    setup.player.set_queue(abc(), 0);

    let next = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            match changes.recv().await {
                Some(PlayerEvent::TrackChanged { track, index }) if track.title == "B" => return index,
                Some(_) => continue,
                None => panic!("player stopped"),
            }
        }
    })
    .await
    .expect("no auto-advance");

    assert_eq!(next, Some(1));
}

#[derive(Clone, Default)]
struct Surface(Arc<Mutex<Vec<String>>>);

impl NowPlayingPresenter for Surface {
    fn show(&self, card: &NowPlayingCard) {
        self.0.lock().unwrap().push(format!("show {}", card.title));
    }

    fn update(&self, _card: &NowPlayingCard) {}

    fn hide(&self) {
        self.0.lock().unwrap().push("hide".to_string());
    }
}

#[tokio::test]
async fn dismissing_now_playing_stops_playback() {
    let setup = setup(Duration::from_secs(60)).await;
    let surface = Surface::default();
    let notification = Arc::new(NotificationListener::new(surface.clone()));
    notification.attach(setup.player.events());

    setup.player.set_queue(abc(), 2);
    wait_until(&setup.player, |s| s.phase == PlaybackPhase::Playing).await;
    assert!(notification.current_card().unwrap().is_playing);

    notification.dismissed(&setup.player);
    let snapshot = setup.player.snapshot().await.unwrap();

    assert!(!snapshot.is_playing);
    assert_eq!(snapshot.phase, PlaybackPhase::Paused);
    assert_eq!(*surface.0.lock().unwrap(), vec!["show C", "hide"]);
}

#[derive(Default)]
struct Likes(Mutex<HashSet<TrackId>>);

#[async_trait]
impl LikeApi for Likes {
    async fn list_liked(&self, _limit: u32, _offset: u32) -> Result<Vec<Track>, ApiError> {
        Ok(Vec::new())
    }

    async fn like(&self, track_id: TrackId) -> Result<(), ApiError> {
        self.0.lock().unwrap().insert(track_id);
        Ok(())
    }

    async fn unlike(&self, track_id: TrackId) -> Result<(), ApiError> {
        self.0.lock().unwrap().remove(&track_id);
        Ok(())
    }
}

#[tokio::test]
async fn like_toggles_are_broadcast_through_the_player() {
    let setup = setup(Duration::from_secs(60)).await;
    let dir = tempfile::tempdir().unwrap();
    let likes = LikeStateManager::new(Arc::new(Likes::default()), LikedTracksCache::new(dir.path()))
        .with_player(setup.player.clone());
    let mut like_events = setup.player.events().subscribe(EventCategory::Like);
    let track = abc().remove(0);

    let liked = likes.toggle_like(&track, false).await.unwrap();
    let unliked = likes.toggle_like(&track, liked).await.unwrap();
    setup.player.snapshot().await.unwrap();

    assert!(liked && !unliked);
    assert!(!likes.is_liked(track.id).await);
    assert_eq!(
        like_events.drain(),
        vec![
            PlayerEvent::LikeChanged { track_id: track.id, liked: true },
            PlayerEvent::LikeChanged { track_id: track.id, liked: false },
        ]
    );
}
