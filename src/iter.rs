//! Iterator adapters that tick a bar once per item.
//!
//! The adapter works with either a borrowed bar (`&mut ProgressBar`) or an owned
//! one, through [`BorrowMut`].
//!
//! # Lifecycle
//!
//! * Every yielded item ticks the bar by one.
//! * If the iterator runs dry before the bar completes, the bar is terminated so
//!   the line is finalized and its timers are disarmed.
//!
//! # Example
//!
//! ```
//! use line_progress::{ProgressIteratorExt, ProgressManager};
//!
//! let manager = ProgressManager::new();
//! let mut bar = manager.builder().with_total(3).with_no_render(true).build().unwrap();
//! let sum: u32 = [1, 2, 3].into_iter().progress_with(&mut bar).sum();
//! assert_eq!(sum, 6);
//! assert!(bar.is_finished());
//! ```

use std::borrow::BorrowMut;

use crate::{ConfigError, ProgressBar, ProgressManager, error::Result};

/// An iterator that ticks a [`ProgressBar`] for every item it yields.
pub struct ProgressIter<I, B> {
    iter: I,
    bar: B,
}

impl<I, B: BorrowMut<ProgressBar>> ProgressIter<I, B> {
    /// Wraps `iter`, ticking `bar`.
    ///
    /// Usually constructed via [`ProgressIteratorExt`].
    pub const fn new(iter: I, bar: B) -> Self {
        Self { iter, bar }
    }

    /// The bar being ticked.
    pub fn bar(&self) -> &ProgressBar {
        self.bar.borrow()
    }

    /// Unwraps the adapter, returning the bar.
    pub fn into_bar(self) -> B {
        self.bar
    }
}

impl<I: Iterator, B: BorrowMut<ProgressBar>> Iterator for ProgressIter<I, B> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.iter.next();
        let bar = self.bar.borrow_mut();

        if item.is_some() {
            bar.tick(1);
        } else {
            // No-op if the bar already completed.
            bar.terminate();
        }
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

/// Extension trait attaching a progress bar to any iterator.
pub trait ProgressIteratorExt: Iterator + Sized {
    /// Ticks an existing bar for every item.
    fn progress_with<B: BorrowMut<ProgressBar>>(self, bar: B) -> ProgressIter<Self, B> {
        ProgressIter::new(self, bar)
    }

    /// Builds a default bar in `manager`, sized from the iterator's exact length.
    ///
    /// Fails with [`ConfigError::UnknownLength`] when the length is not known up front.
    fn progress_in(self, manager: &ProgressManager) -> Result<ProgressIter<Self, ProgressBar>> {
        let total = exact_len(&self).ok_or(ConfigError::UnknownLength)?;
        let bar = manager.add_bar(total)?;
        Ok(ProgressIter::new(self, bar))
    }
}

impl<I: Iterator> ProgressIteratorExt for I {}

fn exact_len<I: Iterator>(iter: &I) -> Option<u64> {
    match iter.size_hint() {
        (lower, Some(upper)) if lower == upper => u64::try_from(upper).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::ProgressIteratorExt as _;
    use crate::{BarState, ConfigError, ProgressManager};

    /// Iterator Integration
    /// Each item ticks the bar and the last one completes it.
    #[test]
    fn test_iterator_adapter() {
        let manager = ProgressManager::new();
        let mut bar = manager
            .builder()
            .with_total(5)
            .with_no_render(true)
            .build()
            .unwrap();

        let count = [1, 2, 3, 4, 5].iter().progress_with(&mut bar).count();

        assert_eq!(count, 5);
        assert_eq!(bar.current(), 5);
        assert!(bar.report().is_some());
    }

    /// Early Exhaustion
    /// An iterator shorter than the total terminates the bar without completing it.
    #[test]
    fn test_short_iterator_terminates() {
        let manager = ProgressManager::new();
        let mut bar = manager
            .builder()
            .with_total(10)
            .with_no_render(true)
            .build()
            .unwrap();

        for _ in (0..3).progress_with(&mut bar) {}

        assert_eq!(bar.current(), 3);
        assert_eq!(bar.state(), BarState::Terminated);
        assert!(bar.report().is_none());
    }

    #[test]
    fn test_unknown_length() {
        let manager = ProgressManager::new();
        let result = (0..10).filter(|n| n % 2 == 0).progress_in(&manager);
        assert_eq!(result.err(), Some(ConfigError::UnknownLength));
    }

    #[test]
    fn test_empty_iterator() {
        let manager = ProgressManager::new();
        let result = std::iter::empty::<u8>().progress_in(&manager);
        assert_eq!(result.err(), Some(ConfigError::ZeroTotal));
    }
}
