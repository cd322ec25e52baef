//! Listener fan-out for player state changes.
//!
//! Every UI surface registers for the categories it renders. Dispatch works on
//! a copy of the registration list taken when the event is published, so a
//! listener may add or remove registrations (its own or others') from inside
//! its callback. A registration removed mid-dispatch still receives the event
//! being delivered; one added mid-dispatch starts with the next event.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::mpsc;

use crate::error::PlayerError;
use crate::model::{Track, TrackId};

/// Everything the player announces to its listeners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerEvent {
    TrackChanged { track: Track, index: Option<usize> },
    PlayStateChanged { is_playing: bool },
    ShuffleRepeatChanged { shuffle: bool, repeat: bool },
    LikeChanged { track_id: TrackId, liked: bool },
    Error(PlayerError),
}

impl PlayerEvent {
    pub fn category(&self) -> EventCategory {
        match self {
            PlayerEvent::TrackChanged { .. } => EventCategory::TrackChanged,
            PlayerEvent::PlayStateChanged { .. } => EventCategory::PlayState,
            PlayerEvent::ShuffleRepeatChanged { .. } => EventCategory::ShuffleRepeat,
            PlayerEvent::LikeChanged { .. } => EventCategory::Like,
            PlayerEvent::Error(_) => EventCategory::Error,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventCategory {
    TrackChanged,
    PlayState,
    ShuffleRepeat,
    Like,
    Error,
}

impl EventCategory {
    fn bit(self) -> u8 {
        match self {
            EventCategory::TrackChanged => 1,
            EventCategory::PlayState => 1 << 1,
            EventCategory::ShuffleRepeat => 1 << 2,
            EventCategory::Like => 1 << 3,
            EventCategory::Error => 1 << 4,
        }
    }
}

/// Set of event categories a listener wants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct EventCategories(u8);

impl EventCategories {
    pub const NONE: EventCategories = EventCategories(0);
    pub const ALL: EventCategories = EventCategories(0b1_1111);

    pub fn of(categories: &[EventCategory]) -> Self {
        categories
            .iter()
            .fold(Self::NONE, |set, category| set.with(*category))
    }

    pub fn with(self, category: EventCategory) -> Self {
        EventCategories(self.0 | category.bit())
    }

    pub fn contains(&self, category: EventCategory) -> bool {
        self.0 & category.bit() != 0
    }
}

impl From<EventCategory> for EventCategories {
    fn from(category: EventCategory) -> Self {
        Self::NONE.with(category)
    }
}

/// A synchronous event callback. Runs on the player task, so keep it short.
pub trait PlayerListener: Send + Sync {
    fn on_event(&self, event: &PlayerEvent);
}

impl<F> PlayerListener for F
where
    F: Fn(&PlayerEvent) + Send + Sync,
{
    fn on_event(&self, event: &PlayerEvent) {
        self(event)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Clone)]
struct Registration {
    id: ListenerId,
    categories: EventCategories,
    listener: Arc<dyn PlayerListener>,
}

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    registrations: Mutex<Vec<Registration>>,
}

impl HubInner {
    fn registrations(&self) -> MutexGuard<'_, Vec<Registration>> {
        self.registrations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remove(&self, id: ListenerId) -> bool {
        let mut registrations = self.registrations();
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        registrations.len() != before
    }
}

/// Registry of listeners plus the dispatch loop.
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(
        &self,
        categories: impl Into<EventCategories>,
        listener: Arc<dyn PlayerListener>,
    ) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.registrations().push(Registration {
            id,
            categories: categories.into(),
            listener,
        });
        tracing::trace!(listener = id.0, "Listener registered");
        id
    }

    /// Returns `false` if the id was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let removed = self.inner.remove(id);
        if removed {
            tracing::trace!(listener = id.0, "Listener removed");
        }
        removed
    }

    /// Channel-backed registration. Dropping the subscription deregisters it.
    pub fn subscribe(&self, categories: impl Into<EventCategories>) -> EventSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let forward = move |event: &PlayerEvent| {
            let _ = tx.send(event.clone());
        };
        let id = self.add_listener(categories, Arc::new(forward));
        EventSubscription {
            id,
            hub: Arc::downgrade(&self.inner),
            receiver: rx,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.registrations().len()
    }

    /// Deliver `event` to every listener registered for its category.
    pub fn dispatch(&self, event: &PlayerEvent) {
        let category = event.category();
        let snapshot: Vec<Registration> = self
            .inner
            .registrations()
            .iter()
            .filter(|r| r.categories.contains(category))
            .cloned()
            .collect();

        tracing::trace!(?category, listeners = snapshot.len(), "Dispatching player event");
        for registration in snapshot {
            registration.listener.on_event(event);
        }
    }
}

/// Receiving end of [`EventHub::subscribe`].
pub struct EventSubscription {
    id: ListenerId,
    hub: Weak<HubInner>,
    receiver: mpsc::UnboundedReceiver<PlayerEvent>,
}

impl EventSubscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// `None` once the hub is gone and the buffer is drained.
    pub async fn recv(&mut self) -> Option<PlayerEvent> {
        self.receiver.recv().await
    }

    /// Everything delivered so far, without waiting.
    pub fn drain(&mut self) -> Vec<PlayerEvent> {
        std::iter::from_fn(|| self.receiver.try_recv().ok()).collect()
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
    }
}
