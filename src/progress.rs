//! The progress controller.
//!
//! A [`ProgressBar`] owns the progress state (current/total), the immutable
//! [`BarConfig`], the [`SampleWindow`] and the last frame it drew. It moves
//! through three states:
//!
//! ```text
//! Running --(current >= total)--> Completing --> Terminated
//!    \________________(terminate)_________________/^
//! ```
//!
//! There is no way back from `Terminated`; updates on a finished bar are ignored.
//!
//! # Timers
//!
//! Two cooperative timers exist, both stored as deadlines against the injected
//! [`Clock`]: the one-second sampler (armed at construction) and the optional
//! debounce render (present or absent, never queued). They fire from
//! [`ProgressBar::poll`], which every mutating operation calls first, so a host
//! that only ever calls `tick` still gets sampling. Completion and termination
//! disarm both.
//!
//! # Output
//!
//! A frame is drawn only when it differs from the last drawn one. Terminal errors
//! are logged at `debug` and otherwise ignored: tracking carries on even when
//! nothing can be shown.

use std::{
    fmt, io,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Duration,
};

use compact_str::CompactString;
use web_time::Instant;

use crate::{
    CompletionReport, ProgressBarBuilder, ProgressManager,
    builder::{BarConfig, Hooks, StateHook},
    clock::Clock,
    format::{FrameState, finite_or_zero, format_frame},
    manager::BarId,
    sample::{SAMPLE_INTERVAL, SampleWindow},
    terminal::{DEFAULT_COLUMNS, Terminal},
};

/// Lifecycle state of a [`ProgressBar`].
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    feature = "rkyv",
    derive(rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "rkyv", rkyv(derive(Debug, Eq, PartialEq)))]
pub enum BarState {
    /// Accepting updates.
    #[default]
    Running,
    /// Total reached; final frame, report and hooks in progress.
    Completing,
    /// Finished for good.
    Terminated,
}

#[derive(Clone, Copy)]
enum Event {
    Start,
    Tick,
    Update,
}

impl Event {
    const fn name(self) -> &'static str {
        match self {
            Self::Start => "on_start",
            Self::Tick => "on_tick",
            Self::Update => "on_update",
        }
    }
}

impl Hooks {
    fn state_hook(&mut self, event: Event) -> Option<&mut StateHook> {
        match event {
            Event::Start => self.on_start.as_mut(),
            Event::Tick => self.on_tick.as_mut(),
            Event::Update => self.on_update.as_mut(),
        }
    }
}

/// Runs a hook, swallowing any panic it raises.
fn guarded(event: &str, hook: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(hook)).is_err() {
        log::warn!("progress hook `{event}` panicked; ignored");
    }
}

fn draw(terminal: &mut dyn Terminal, frame: &str) -> io::Result<()> {
    terminal.clear_line()?;
    terminal.cursor_to(0)?;
    terminal.write(frame)?;
    terminal.flush()
}

/// A single-line terminal progress bar for a known amount of work.
///
/// Built through [`ProgressBarBuilder`]; see [`ProgressManager::builder`].
pub struct ProgressBar {
    id: BarId,
    config: BarConfig,
    hooks: Hooks,
    clock: Arc<dyn Clock>,
    terminal: Box<dyn Terminal>,
    manager: ProgressManager,
    registered: bool,

    current: u64,
    total: u64,
    state: BarState,
    start: Instant,
    stopped: Option<Instant>,

    window: SampleWindow,
    next_sample: Option<Instant>,
    pending_render: Option<Instant>,
    last_drawn: Option<String>,
    average_ops_per_sec: f64,
    report: Option<CompletionReport>,
}

impl fmt::Debug for ProgressBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressBar")
            .field("id", &self.id)
            .field("title", &self.config.title)
            .field("current", &self.current)
            .field("total", &self.total)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ProgressBar {
    /// Starts building a bar registered with `manager`.
    #[must_use]
    pub fn builder(manager: &ProgressManager) -> ProgressBarBuilder {
        ProgressBarBuilder::new(manager)
    }

    /// Enters `Running`: allocates the id, registers with the manager, arms the
    /// sampler and fires `on_start`. The builder has already been validated.
    pub(crate) fn start(builder: ProgressBarBuilder, total: u64) -> Self {
        let ProgressBarBuilder {
            manager,
            config,
            hooks,
            clock,
            terminal,
            ..
        } = builder;

        let id = manager.next_id();
        let registered = !config.just_me;
        if registered {
            manager.register(id, config.title.clone());
        }
        let start = clock.now();

        let mut bar = Self {
            id,
            config,
            hooks,
            clock,
            terminal,
            manager,
            registered,
            current: 0,
            total,
            state: BarState::Running,
            start,
            stopped: None,
            window: SampleWindow::default(),
            next_sample: start.checked_add(SAMPLE_INTERVAL),
            pending_render: None,
            last_drawn: None,
            average_ops_per_sec: 0.0,
            report: None,
        };
        log::debug!("progress bar {id} started, total {total}");
        bar.notify(Event::Start);
        bar
    }

    // ========================================================================
    // Updates
    // ========================================================================

    /// Advances progress by `delta` units.
    ///
    /// Ignored unless the bar is running. Reaching the total completes the bar.
    pub fn tick(&mut self, delta: u64) {
        if self.state != BarState::Running {
            log::trace!("progress bar {}: tick after finish ignored", self.id);
            return;
        }
        self.poll();

        self.current = self.current.saturating_add(delta);
        self.window.record(delta);
        self.notify(Event::Tick);
        self.advance();
    }

    /// Sets progress to an absolute `value`.
    ///
    /// Progress never moves backwards: values below the current count are ignored.
    pub fn set_tick(&mut self, value: u64) {
        if self.state != BarState::Running {
            log::trace!("progress bar {}: set_tick after finish ignored", self.id);
            return;
        }
        self.poll();

        let Some(delta) = value.checked_sub(self.current) else {
            log::trace!(
                "progress bar {}: set_tick({value}) below current {} ignored",
                self.id,
                self.current
            );
            return;
        };
        self.current = value;
        self.window.record(delta);
        self.notify(Event::Update);
        self.advance();
    }

    fn advance(&mut self) {
        if self.current >= self.total {
            self.complete();
        } else {
            self.request_render();
        }
    }

    /// Fires due timers: the sampler and a pending debounced render.
    ///
    /// Updates poll on their own. Between updates nothing fires unless the host
    /// calls this, so a debounced bar that stops ticking needs it to show its
    /// final state.
    pub fn poll(&mut self) {
        if self.state != BarState::Running {
            return;
        }
        let now = self.clock.now();
        self.run_sampler(now);

        if let Some(due) = self.pending_render
            && now >= due
        {
            self.pending_render = None;
            self.render_frame(false);
        }
    }

    fn run_sampler(&mut self, now: Instant) {
        let Some(due) = self.next_sample else {
            return;
        };
        if now < due {
            return;
        }

        // Intervals that ended while nobody polled are replayed; only the first
        // carries the tally, the rest are empty. A gap longer than the window
        // would evict the tally anyway, so it leaves only empty samples.
        let missed = now.duration_since(due).as_nanos() / SAMPLE_INTERVAL.as_nanos() + 1;
        let capacity = self.window.capacity() as u128;
        if missed > capacity {
            self.window.discard_tally();
        }
        for _ in 0..missed.min(capacity) {
            self.window.flush();
        }
        let missed = u32::try_from(missed).unwrap_or(u32::MAX);
        self.next_sample = due.checked_add(SAMPLE_INTERVAL * missed);
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    fn request_render(&mut self) {
        match self.config.debounce {
            None => self.render_frame(false),
            Some(interval) => {
                if self.pending_render.is_some() {
                    log::trace!("progress bar {}: render already scheduled", self.id);
                } else {
                    self.pending_render = self.clock.now().checked_add(interval);
                }
            }
        }
    }

    /// Draws the current state now, ignoring any debounce window.
    ///
    /// Nothing is written if the frame equals the last one drawn.
    pub fn render(&mut self) {
        if self.state == BarState::Terminated {
            return;
        }
        self.render_frame(false);
    }

    fn render_frame(&mut self, force: bool) {
        let frame = self.frame();
        if !force && self.last_drawn.as_deref() == Some(frame.as_str()) {
            log::trace!("progress bar {}: frame unchanged", self.id);
            return;
        }
        if !self.config.no_render
            && let Err(err) = draw(self.terminal.as_mut(), &frame)
        {
            log::debug!("progress bar {}: terminal write failed: {err}", self.id);
        }
        self.last_drawn = Some(frame);
    }

    fn frame(&mut self) -> String {
        let elapsed = self.elapsed();
        let eta = self.time_remaining();
        let columns = self.terminal.columns().unwrap_or(DEFAULT_COLUMNS);
        let state = FrameState {
            current: self.current,
            total: self.total,
            elapsed,
            eta,
            ops_per_sec: self.window.average_ops_per_sec(),
            title: &self.config.title,
        };
        format_frame(&state, &self.config.format, &self.config.style, columns)
    }

    /// Writes `message` on its own line above the bar, then redraws the bar.
    pub fn interrupt(&mut self, message: &str) {
        if self.state == BarState::Terminated {
            log::trace!("progress bar {}: interrupt after finish ignored", self.id);
            return;
        }
        self.poll();
        if self.config.no_render {
            return;
        }

        let terminal = self.terminal.as_mut();
        let result = terminal
            .clear_line()
            .and_then(|()| terminal.cursor_to(0))
            .and_then(|()| terminal.write(&format!("{message}\n")))
            .and_then(|()| match &self.last_drawn {
                Some(frame) => terminal.write(frame),
                None => Ok(()),
            })
            .and_then(|()| terminal.flush());
        if let Err(err) = result {
            log::debug!("progress bar {}: interrupt failed: {err}", self.id);
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    fn complete(&mut self) {
        self.state = BarState::Completing;
        self.cancel_timers();
        self.stopped = Some(self.clock.now());

        self.render_frame(true);
        let report = self.build_report();
        self.finalize_line();

        if let Some(hook) = self.hooks.on_complete.as_mut() {
            guarded("on_complete", || hook(&report));
        }
        if self.config.report {
            log::info!("{report}");
        }
        log::debug!("progress bar {} completed", self.id);

        self.report = Some(report);
        self.retire();
    }

    /// Stops the bar without completing it.
    ///
    /// Timers are cancelled and the line is finalized, but no report is built and
    /// `on_complete` is not called. Calling it again does nothing.
    pub fn terminate(&mut self) {
        if self.state == BarState::Terminated {
            return;
        }
        self.cancel_timers();
        self.stopped = Some(self.clock.now());
        self.finalize_line();
        log::debug!("progress bar {} terminated at {}/{}", self.id, self.current, self.total);
        self.retire();
    }

    fn cancel_timers(&mut self) {
        self.next_sample = None;
        self.pending_render = None;
    }

    fn finalize_line(&mut self) {
        if self.config.no_render {
            return;
        }
        let terminal = self.terminal.as_mut();
        let result = if self.config.clear {
            terminal.clear_line().and_then(|()| terminal.cursor_to(0))
        } else {
            terminal.write("\n")
        }
        .and_then(|()| terminal.flush());
        if let Err(err) = result {
            log::debug!("progress bar {}: finalize failed: {err}", self.id);
        }
    }

    fn retire(&mut self) {
        self.state = BarState::Terminated;
        if self.registered {
            self.manager.unregister(self.id);
            self.registered = false;
        }
    }

    fn build_report(&mut self) -> CompletionReport {
        let elapsed = self.elapsed();
        CompletionReport {
            title: self.config.title.clone(),
            id: self.id,
            counted: self.current,
            expected: self.total,
            elapsed,
            sampled_ops_per_sec: self.window.average_ops_per_sec(),
            average_ops_per_sec: self.average_ops_per_sec,
        }
    }

    fn notify(&mut self, event: Event) {
        if self.hooks.state_hook(event).is_none() {
            return;
        }
        let snapshot = self.snapshot();
        if let Some(hook) = self.hooks.state_hook(event) {
            guarded(event.name(), || hook(&snapshot));
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn elapsed_at(&self, now: Instant) -> Duration {
        self.stopped
            .unwrap_or(now)
            .saturating_duration_since(self.start)
    }

    /// Time since construction, frozen once the bar finishes.
    ///
    /// Also recomputes the lifetime average rate returned by
    /// [`average_ops_per_sec`](Self::average_ops_per_sec).
    #[allow(clippy::cast_precision_loss)]
    pub fn elapsed(&mut self) -> Duration {
        let elapsed = self.elapsed_at(self.clock.now());
        let secs = elapsed.as_secs_f64();
        self.average_ops_per_sec = if secs > 0.0 {
            finite_or_zero(self.current as f64 / secs)
        } else {
            0.0
        };
        elapsed
    }

    /// Estimated time to reach the total at the smoothed rate.
    ///
    /// Zero while no rate has been sampled.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn time_remaining(&self) -> Duration {
        let rate = self.window.average_ops_per_sec();
        if rate <= 0.0 {
            return Duration::ZERO;
        }
        let secs = self.total.saturating_sub(self.current) as f64 / rate;
        Duration::try_from_secs_f64(finite_or_zero(secs)).unwrap_or(Duration::ZERO)
    }

    /// The bar identifier.
    #[must_use]
    pub const fn id(&self) -> BarId {
        self.id
    }

    /// Units done.
    #[must_use]
    pub const fn current(&self) -> u64 {
        self.current
    }

    /// Units expected.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> BarState {
        self.state
    }

    /// Returns `true` once the bar has completed or been terminated.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == BarState::Terminated
    }

    /// The settings the bar was built with.
    #[must_use]
    pub const fn config(&self) -> &BarConfig {
        &self.config
    }

    /// The completion report, once the bar has reached its total.
    #[must_use]
    pub const fn report(&self) -> Option<&CompletionReport> {
        self.report.as_ref()
    }

    /// The smoothed rate from the sample window.
    #[must_use]
    pub const fn ops_per_sec(&self) -> f64 {
        self.window.average_ops_per_sec()
    }

    /// The lifetime average rate as of the last [`elapsed`](Self::elapsed) call.
    #[must_use]
    pub const fn average_ops_per_sec(&self) -> f64 {
        self.average_ops_per_sec
    }

    /// The last frame drawn (or that would have been, with rendering disabled).
    #[must_use]
    pub fn last_frame(&self) -> Option<&str> {
        self.last_drawn.as_deref()
    }

    /// Creates an owned snapshot of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.into()
    }
}

impl Drop for ProgressBar {
    fn drop(&mut self) {
        self.cancel_timers();
        if self.registered {
            self.manager.unregister(self.id);
        }
    }
}

/// A plain-data view of a [`ProgressBar`] at one instant, handed to hooks.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "rkyv",
    derive(rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "rkyv", rkyv(derive(Debug)))]
pub struct ProgressSnapshot {
    id: BarId,
    title: CompactString,
    current: u64,
    total: u64,
    state: BarState,
    elapsed: Duration,
    ops_per_sec: f64,
}

impl From<&ProgressBar> for ProgressSnapshot {
    fn from(bar: &ProgressBar) -> Self {
        Self {
            id: bar.id,
            title: bar.config.title.clone(),
            current: bar.current,
            total: bar.total,
            state: bar.state,
            elapsed: bar.elapsed_at(bar.clock.now()),
            ops_per_sec: bar.window.average_ops_per_sec(),
        }
    }
}

impl ProgressSnapshot {
    /// The bar identifier.
    #[must_use]
    pub const fn id(&self) -> BarId {
        self.id
    }

    /// The bar title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Units done.
    #[must_use]
    pub const fn current(&self) -> u64 {
        self.current
    }

    /// Units expected.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Lifecycle state when the snapshot was taken.
    #[must_use]
    pub const fn state(&self) -> BarState {
        self.state
    }

    /// Time since the bar started.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The smoothed rate.
    #[must_use]
    pub const fn ops_per_sec(&self) -> f64 {
        self.ops_per_sec
    }

    /// Completion percentage; exceeds 100 on overshoot.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            finite_or_zero(self.current as f64 / self.total as f64 * 100.0)
        }
    }
}
