//! Play queue with reversible shuffle.
//!
//! `items` is the order playback walks through. `original` keeps the order the
//! queue was loaded in so that shuffle can be undone without refetching; both
//! always hold the same multiset of tracks.

use rand::Rng;
use rand::seq::SliceRandom;

use super::track::{Track, TrackId};

#[derive(Clone, Debug, Default)]
pub struct Queue {
    items: Vec<Track>,
    original: Vec<Track>,
}

impl Queue {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            original: tracks.clone(),
            items: tracks,
        }
    }

    /// Replace both the playback order and the original order.
    pub fn replace(&mut self, tracks: Vec<Track>) {
        self.original = tracks.clone();
        self.items = tracks;
    }

    pub fn tracks(&self) -> &[Track] {
        &self.items
    }

    pub fn original_order(&self) -> &[Track] {
        &self.original
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.items.get(index)
    }

    /// Uniformly permute the playback order. The original order is untouched.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.items.shuffle(rng);
    }

    /// Put the playback order back to the order the queue was loaded in.
    pub fn restore_original(&mut self) {
        self.items.clone_from(&self.original);
    }

    /// First position of `id` in the playback order.
    pub fn position_of(&self, id: TrackId) -> Option<usize> {
        self.items.iter().position(|t| t.id == id)
    }

    /// Index reached by advancing from `current`, wrapping to the start.
    pub fn next_index(&self, current: Option<usize>) -> Option<usize> {
        if self.items.is_empty() {
            return None;
        }
        Some(match current {
            Some(i) => (i + 1) % self.items.len(),
            None => 0,
        })
    }

    /// Index reached by stepping back from `current`, wrapping to the end.
    pub fn previous_index(&self, current: Option<usize>) -> Option<usize> {
        if self.items.is_empty() {
            return None;
        }
        Some(match current {
            Some(i) if i > 0 && i <= self.items.len() => i - 1,
            _ => self.items.len() - 1,
        })
    }
}
