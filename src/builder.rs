//! Fluent interface for constructing [`ProgressBar`] instances.
//!
//! Everything about a bar is fixed at construction: the total, the template, the
//! glyphs, the redraw policy, the lifecycle hooks and the injected collaborators
//! (clock and terminal). [`ProgressBarBuilder::build`] validates the lot and either
//! returns a running bar or a [`ConfigError`]; there is no half-built state.
//!
//! # Hooks
//!
//! Hooks run synchronously at state-machine transitions. A hook that panics is
//! caught, logged and ignored; it never unwinds into the caller of `tick`.

use std::{sync::Arc, time::Duration};

use compact_str::CompactString;

use crate::{
    CompletionReport, ProgressBar, ProgressManager, ProgressSnapshot,
    clock::{Clock, SystemClock},
    error::{ConfigError, Result},
    format::BarStyle,
    terminal::{StderrTerminal, Terminal},
};

/// Default template.
pub const DEFAULT_FORMAT: &str = "[:bar] :percent";

/// Default title.
pub const DEFAULT_TITLE: &str = "->";

/// Hook receiving the bar state after a transition.
pub type StateHook = Box<dyn FnMut(&ProgressSnapshot) + Send>;

/// Hook receiving the completion report.
pub type CompleteHook = Box<dyn FnMut(&CompletionReport) + Send>;

/// Immutable settings of a bar.
#[derive(Clone, Debug, PartialEq)]
pub struct BarConfig {
    /// Template, see [`format`](crate::format) for tokens.
    pub format: CompactString,
    /// Bar width and glyphs.
    pub style: BarStyle,
    /// Redraw coalescing window; `None` draws on every update.
    pub debounce: Option<Duration>,
    /// Label substituted for `:title` and carried in the report.
    pub title: CompactString,
    /// Clear the line on finish instead of leaving it followed by a newline.
    pub clear: bool,
    /// Keep the bar out of the manager's live registry.
    pub just_me: bool,
    /// Track state without ever writing to the terminal.
    pub no_render: bool,
    /// Log the completion report at `info` level.
    pub report: bool,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            format: CompactString::const_new(DEFAULT_FORMAT),
            style: BarStyle::default(),
            debounce: None,
            title: CompactString::const_new(DEFAULT_TITLE),
            clear: false,
            just_me: false,
            no_render: false,
            report: false,
        }
    }
}

#[derive(Default)]
pub(crate) struct Hooks {
    pub(crate) on_start: Option<StateHook>,
    pub(crate) on_tick: Option<StateHook>,
    pub(crate) on_update: Option<StateHook>,
    pub(crate) on_complete: Option<CompleteHook>,
}

/// Builder for [`ProgressBar`].
///
/// Obtained from [`ProgressManager::builder`] or [`ProgressBarBuilder::new`].
///
/// ```
/// use line_progress::ProgressManager;
///
/// let manager = ProgressManager::new();
/// let bar = manager
///     .builder()
///     .with_total(10)
///     .with_width(20)
///     .with_format(":title [:bar] :current/:total")
///     .with_no_render(true)
///     .build()
///     .unwrap();
/// assert_eq!(bar.total(), 10);
/// ```
pub struct ProgressBarBuilder {
    pub(crate) manager: ProgressManager,
    pub(crate) total: Option<u64>,
    pub(crate) config: BarConfig,
    pub(crate) hooks: Hooks,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) terminal: Box<dyn Terminal>,
}

impl ProgressBarBuilder {
    /// Starts a builder whose bar will be registered with `manager`.
    #[must_use]
    pub fn new(manager: &ProgressManager) -> Self {
        Self {
            manager: manager.clone(),
            total: None,
            config: BarConfig::default(),
            hooks: Hooks::default(),
            clock: Arc::new(SystemClock),
            terminal: Box::new(StderrTerminal::default()),
        }
    }

    /// Sets the number of units expected. Required.
    #[must_use]
    pub const fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    /// Sets the maximum bar width in glyphs.
    #[must_use]
    pub const fn with_width(mut self, width: usize) -> Self {
        self.config.style.width = width;
        self
    }

    /// Sets the template.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<CompactString>) -> Self {
        self.config.format = format.into();
        self
    }

    /// Sets the glyph for the done part of the bar.
    #[must_use]
    pub fn with_complete_glyph(mut self, glyph: impl Into<CompactString>) -> Self {
        self.config.style.complete = glyph.into();
        self
    }

    /// Sets the glyph for the remaining part of the bar.
    #[must_use]
    pub fn with_incomplete_glyph(mut self, glyph: impl Into<CompactString>) -> Self {
        self.config.style.incomplete = glyph.into();
        self
    }

    /// Sets the glyph marking the leading edge of the done part.
    #[must_use]
    pub fn with_head_glyph(mut self, glyph: impl Into<CompactString>) -> Self {
        self.config.style.head = glyph.into();
        self
    }

    /// Coalesces redraws so at most one happens per `interval`.
    ///
    /// There is no background thread: the coalesced frame is drawn by the next
    /// update or [`ProgressBar::poll`] after the window ends. A host that stops
    /// updating the bar must keep calling `poll`, or the latest state stays
    /// off screen.
    #[must_use]
    pub const fn with_debounce(mut self, interval: Duration) -> Self {
        self.config.debounce = Some(interval);
        self
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<CompactString>) -> Self {
        self.config.title = title.into();
        self
    }

    /// Clears the line on finish instead of leaving it in place.
    #[must_use]
    pub const fn with_clear(mut self, clear: bool) -> Self {
        self.config.clear = clear;
        self
    }

    /// Keeps the bar out of the manager's live registry.
    #[must_use]
    pub const fn with_just_me(mut self, just_me: bool) -> Self {
        self.config.just_me = just_me;
        self
    }

    /// Disables terminal output; state is still tracked.
    #[must_use]
    pub const fn with_no_render(mut self, no_render: bool) -> Self {
        self.config.no_render = no_render;
        self
    }

    /// Logs the completion report once at `info` level.
    #[must_use]
    pub const fn with_report(mut self, report: bool) -> Self {
        self.config.report = report;
        self
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replaces the output terminal.
    #[must_use]
    pub fn with_terminal(mut self, terminal: impl Terminal + 'static) -> Self {
        self.terminal = Box::new(terminal);
        self
    }

    /// Called once, right after construction.
    #[must_use]
    pub fn on_start(mut self, hook: impl FnMut(&ProgressSnapshot) + Send + 'static) -> Self {
        self.hooks.on_start = Some(Box::new(hook));
        self
    }

    /// Called after every accepted [`tick`](ProgressBar::tick).
    #[must_use]
    pub fn on_tick(mut self, hook: impl FnMut(&ProgressSnapshot) + Send + 'static) -> Self {
        self.hooks.on_tick = Some(Box::new(hook));
        self
    }

    /// Called after every accepted [`set_tick`](ProgressBar::set_tick).
    #[must_use]
    pub fn on_update(mut self, hook: impl FnMut(&ProgressSnapshot) + Send + 'static) -> Self {
        self.hooks.on_update = Some(Box::new(hook));
        self
    }

    /// Called once with the report when the bar completes.
    #[must_use]
    pub fn on_complete(mut self, hook: impl FnMut(&CompletionReport) + Send + 'static) -> Self {
        self.hooks.on_complete = Some(Box::new(hook));
        self
    }

    fn validate(&self) -> Result<u64> {
        let total = self.total.ok_or(ConfigError::MissingTotal)?;
        if total == 0 {
            return Err(ConfigError::ZeroTotal);
        }
        let style = &self.config.style;
        if style.width == 0 {
            return Err(ConfigError::ZeroWidth);
        }
        for (which, glyph) in [
            ("complete", &style.complete),
            ("incomplete", &style.incomplete),
            ("head", &style.head),
        ] {
            if glyph.is_empty() {
                return Err(ConfigError::EmptyGlyph { which });
            }
        }
        Ok(total)
    }

    /// Validates the configuration and starts the bar.
    pub fn build(self) -> Result<ProgressBar> {
        let total = self.validate()?;
        Ok(ProgressBar::start(self, total))
    }
}
