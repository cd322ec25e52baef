//! Now-playing notification surface
//!
//! A [`NotificationListener`] follows track and play-state events and keeps a
//! [`NowPlayingPresenter`] showing the current track. Dismissing the surface
//! stops playback.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::model::Track;
use crate::player::{EventCategories, EventCategory, EventHub, ListenerId, PlayerEvent, PlayerHandle, PlayerListener};

/// What the now-playing surface shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NowPlayingCard {
    pub title: String,
    pub artist: String,
    pub artwork_url: Option<String>,
    pub is_playing: bool,
}

impl NowPlayingCard {
    fn for_track(track: &Track, is_playing: bool) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.artist.clone(),
            artwork_url: track.high_quality_artwork_url(),
            is_playing,
        }
    }
}

pub trait NowPlayingPresenter: Send + Sync {
    fn show(&self, card: &NowPlayingCard);
    fn update(&self, card: &NowPlayingCard);
    fn hide(&self);
}

/// Writes the now-playing card to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingPresenter;

impl NowPlayingPresenter for TracingPresenter {
    fn show(&self, card: &NowPlayingCard) {
        tracing::info!(title = %card.title, artist = %card.artist, playing = card.is_playing, "Now playing shown");
    }

    fn update(&self, card: &NowPlayingCard) {
        tracing::debug!(title = %card.title, artist = %card.artist, playing = card.is_playing, "Now playing updated");
    }

    fn hide(&self) {
        tracing::info!("Now playing hidden");
    }
}

#[derive(Default)]
struct SurfaceState {
    card: Option<NowPlayingCard>,
    visible: bool,
}

pub struct NotificationListener<P> {
    presenter: P,
    state: Mutex<SurfaceState>,
}

impl<P: NowPlayingPresenter + 'static> NotificationListener<P> {
    pub fn new(presenter: P) -> Self {
        Self {
            presenter,
            state: Mutex::new(SurfaceState::default()),
        }
    }

    /// Register on `hub` for the events the surface renders.
    pub fn attach(self: &Arc<Self>, hub: &EventHub) -> ListenerId {
        let categories = EventCategories::of(&[EventCategory::TrackChanged, EventCategory::PlayState]);
        hub.add_listener(categories, self.clone())
    }

    /// The user swiped the surface away.
    pub fn dismissed(&self, player: &PlayerHandle) {
        tracing::debug!("Now playing surface dismissed, stopping playback");
        player.stop();
        let mut state = self.state();
        if state.visible {
            state.visible = false;
            self.presenter.hide();
        }
    }

    pub fn current_card(&self) -> Option<NowPlayingCard> {
        self.state().card.clone()
    }

    fn state(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<P: NowPlayingPresenter> PlayerListener for NotificationListener<P> {
    fn on_event(&self, event: &PlayerEvent) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match event {
            PlayerEvent::TrackChanged { track, .. } => {
                let is_playing = state.card.as_ref().is_some_and(|c| c.is_playing);
                let card = NowPlayingCard::for_track(track, is_playing);
                if state.visible {
                    self.presenter.update(&card);
                } else {
                    self.presenter.show(&card);
                    state.visible = true;
                }
                state.card = Some(card);
            }
            PlayerEvent::PlayStateChanged { is_playing } => {
                let visible = state.visible;
                if let Some(card) = state.card.as_mut() {
                    card.is_playing = *is_playing;
                    if visible {
                        self.presenter.update(card);
                    }
                }
            }
            _ => {}
        }
    }
}
