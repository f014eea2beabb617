//! Caller-side bookkeeping for in-flight animations
//!
//! Layout passes reposition widgets, and teardown destroys them; any
//! animation still writing to those widgets must be stopped first. The
//! [`AnimationRegistry`] keeps every outstanding [`PlaybackHandle`] so the
//! caller can cancel them all in one call.

use crate::driver::PlaybackHandle;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle to a registered animation
    pub struct AnimationId;
}

/// Owns the playback handles of a caller's in-flight animations
///
/// Finished animations are pruned whenever a new one is inserted, so the
/// registry does not grow without bound even if `cancel_all` is never
/// called.
#[derive(Debug, Default)]
pub struct AnimationRegistry {
    handles: SlotMap<AnimationId, PlaybackHandle>,
}

impl AnimationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a playback handle
    pub fn insert(&mut self, handle: PlaybackHandle) -> AnimationId {
        self.prune();
        self.handles.insert(handle)
    }

    pub fn get(&self, id: AnimationId) -> Option<&PlaybackHandle> {
        self.handles.get(id)
    }

    /// Stop tracking an animation without cancelling it
    pub fn remove(&mut self, id: AnimationId) -> Option<PlaybackHandle> {
        self.handles.remove(id)
    }

    /// Cancel one animation and stop tracking it
    ///
    /// Returns `false` if the id is unknown (already cancelled or pruned).
    pub fn cancel(&mut self, id: AnimationId) -> bool {
        match self.handles.remove(id) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every tracked animation and clear the registry
    ///
    /// Returns the number of handles that were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.handles.len();
        for (id, handle) in self.handles.drain() {
            report_panic(id, &handle);
            handle.cancel();
        }
        if count > 0 {
            tracing::debug!("AnimationRegistry: cancelled {} animations", count);
        }
        count
    }

    /// Drop handles whose playback has already exited
    ///
    /// Returns the number of handles removed.
    pub fn prune(&mut self) -> usize {
        let before = self.handles.len();
        self.handles.retain(|id, handle| {
            report_panic(id, handle);
            handle.is_active()
        });
        before - self.handles.len()
    }

    pub fn contains(&self, id: AnimationId) -> bool {
        self.handles.contains_key(id)
    }

    /// Number of tracked handles, finished or not
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Number of tracked animations still playing
    pub fn active_count(&self) -> usize {
        self.handles.values().filter(|h| h.is_active()).count()
    }

    /// Wait for every tracked animation to exit, then clear the registry
    ///
    /// # Panics
    ///
    /// Re-raises a panic from any animation's callbacks.
    pub async fn join_all(&mut self) {
        for (_, mut handle) in self.handles.drain() {
            handle.finished().await;
        }
    }
}

/// Warn about a handle dropped after its playback panicked
fn report_panic(id: AnimationId, handle: &PlaybackHandle) {
    if handle.is_panicked() {
        tracing::warn!(
            "AnimationRegistry: animation {:?} (playback {}) ended in a callback panic",
            id,
            handle.id()
        );
    }
}
