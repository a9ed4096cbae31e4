//! # `line_progress`
//!
//! Single-line, in-place terminal progress bars for work of known size.
//!
//! A bar turns its state (current count, total, elapsed time, sampled throughput)
//! into one fixed-width line and redraws it in place. It is designed to be:
//!
//! * **Quiet**: a frame is only written when it differs from the last one, and
//!   redraws can be coalesced with a debounce window.
//! * **Stable**: throughput and ETA come from a rolling window of per-second
//!   samples rather than from the latest burst of ticks.
//! * **Harmless**: a broken terminal or a panicking hook never reaches the caller;
//!   progress tracking continues regardless.
//! * **Testable**: time and output are injected ([`Clock`], [`Terminal`]).
//!
//! ```
//! use line_progress::ProgressManager;
//!
//! let manager = ProgressManager::new();
//! let mut bar = manager
//!     .builder()
//!     .with_total(3)
//!     .with_format(":title [:bar] :percent eta :eta")
//!     .with_no_render(true)
//!     .build()
//!     .unwrap();
//!
//! for _ in 0..3 {
//!     bar.tick(1);
//! }
//! assert!(bar.is_finished());
//! assert_eq!(bar.report().unwrap().counted(), 3);
//! ```
//!
//! ## Modules
//!
//! * [`builder`]: Validated construction of a [`ProgressBar`] and its hooks.
//! * [`clock`]: Injected time sources.
//! * [`error`]: Construction errors.
//! * [`format`]: Template substitution and bar layout.
//! * [`io`]: [`std::io::Read`]/[`std::io::Write`] wrappers that tick by bytes.
//! * [`iter`]: Iterator adapters that tick per item.
//! * [`manager`]: Bar identifiers and the registry of live bars.
//! * [`progress`]: The [`ProgressBar`] state machine.
//! * [`report`]: The summary produced on completion.
//! * [`sample`]: Rolling throughput estimation.
//! * [`terminal`]: Output sinks.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod builder;
pub mod clock;
pub mod error;
pub mod format;
pub mod io;
pub mod iter;
pub mod manager;
pub mod progress;
pub mod report;
pub mod sample;
pub mod terminal;

pub use builder::{BarConfig, ProgressBarBuilder};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ConfigError;
pub use iter::{ProgressIter, ProgressIteratorExt};
pub use manager::{BarId, ProgressManager};
pub use progress::{BarState, ProgressBar, ProgressSnapshot};
pub use report::CompletionReport;
pub use terminal::{BufferTerminal, StderrTerminal, Terminal};
