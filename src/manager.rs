//! Process-wide bookkeeping for progress bars.
//!
//! A [`ProgressManager`] is created once at program start and handed by reference
//! to every bar built through it. It owns two things:
//!
//! * the identifier generator, so every bar gets a unique [`BarId`];
//! * an ordered registry of live bars, in creation order.
//!
//! # Synchronization Strategy
//!
//! Ids come from an atomic counter. The registry sits behind a
//! [`RwLock`](parking_lot::RwLock) that is only taken when a bar starts or ends,
//! never on ticks. Bars writing to the terminal are not serialized by the manager.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use compact_str::CompactString;
use parking_lot::RwLock;

use crate::{ProgressBar, ProgressBarBuilder, error::Result};

/// Unique identifier of a bar within one [`ProgressManager`].
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(
    feature = "rkyv",
    derive(rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "rkyv", rkyv(derive(Debug, Eq, PartialEq)))]
pub struct BarId(pub u64);

impl fmt::Display for BarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    live: RwLock<Vec<(BarId, CompactString)>>,
}

/// Hands out bar identifiers and tracks live bars in creation order.
///
/// Cloning is cheap and every clone refers to the same registry.
#[derive(Clone, Default)]
pub struct ProgressManager {
    inner: Arc<Registry>,
}

impl fmt::Debug for ProgressManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressManager")
            .field("live", &self.len())
            .finish()
    }
}

impl ProgressManager {
    /// Creates a manager with no bars.
    ///
    /// # Examples
    ///
    /// ```
    /// use line_progress::ProgressManager;
    ///
    /// let manager = ProgressManager::new();
    /// assert!(manager.is_empty());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts building a bar owned by this manager.
    #[must_use]
    pub fn builder(&self) -> ProgressBarBuilder {
        ProgressBarBuilder::new(self)
    }

    /// Builds a bar with default settings for `total` units of work.
    pub fn add_bar(&self, total: u64) -> Result<ProgressBar> {
        self.builder().with_total(total).build()
    }

    /// Allocates the next identifier. Identifiers start at zero and never repeat.
    #[must_use]
    pub fn next_id(&self) -> BarId {
        BarId(self.inner.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Ids and titles of live bars, oldest first.
    #[must_use]
    pub fn active(&self) -> Vec<(BarId, CompactString)> {
        self.inner.live.read().clone()
    }

    /// Number of live bars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.live.read().len()
    }

    /// Returns `true` if no bar is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.live.read().is_empty()
    }

    pub(crate) fn register(&self, id: BarId, title: CompactString) {
        self.inner.live.write().push((id, title));
    }

    pub(crate) fn unregister(&self, id: BarId) {
        self.inner.live.write().retain(|(live, _)| *live != id);
    }
}

#[cfg(test)]
mod tests {
    use super::{BarId, ProgressManager};

    /// Identifier Generation
    /// Ids are unique and shared across clones.
    #[test]
    fn test_ids_unique() {
        let manager = ProgressManager::new();
        let clone = manager.clone();

        assert_eq!(manager.next_id(), BarId(0));
        assert_eq!(clone.next_id(), BarId(1));
        assert_eq!(manager.next_id(), BarId(2));
    }

    /// Registry Order
    /// Live bars are listed in registration order and removal keeps the rest ordered.
    #[test]
    fn test_registry_order() {
        let manager = ProgressManager::new();
        manager.register(BarId(0), "a".into());
        manager.register(BarId(1), "b".into());
        manager.register(BarId(2), "c".into());

        manager.unregister(BarId(1));

        let ids: Vec<_> = manager.active().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![BarId(0), BarId(2)]);
        assert_eq!(manager.len(), 2);

        manager.unregister(BarId(1));
        assert_eq!(manager.len(), 2);
    }
}
