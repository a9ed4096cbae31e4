//! Frame rendering.
//!
//! [`format_frame`] is a pure function from progress state, template and available
//! columns to the line that should be on screen. It knows nothing about terminals
//! or clocks; the controller gathers the inputs into a [`FrameState`].
//!
//! # Tokens
//!
//! | token | replaced with |
//! |---|---|
//! | `:bar` | the bar glyphs |
//! | `:current` | units done |
//! | `:total` | units expected |
//! | `:percent` | integer percent (unclamped) followed by `%` |
//! | `:elapsed` | time since start, see [`format_duration`] |
//! | `:eta` | estimated time remaining |
//! | `:opsec` | smoothed ops/sec with one decimal |
//! | `:title` | the bar title |
//! | `:nl` | a line break |
//! | `:cblue` `:cwhite` `:cyellow` `:cred` `:cnone` | ANSI color escapes |
//!
//! The bar is sized last: its width is the configured width, capped by whatever
//! is left of the terminal after every other token has been substituted, so the
//! rendered line never wraps.

use std::{fmt::Write as _, time::Duration};

use compact_str::CompactString;

/// Inputs to a single frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameState<'a> {
    /// Units done.
    pub current: u64,
    /// Units expected; always non-zero for a constructed bar.
    pub total: u64,
    /// Time since start.
    pub elapsed: Duration,
    /// Estimated time remaining.
    pub eta: Duration,
    /// Smoothed ops/sec.
    pub ops_per_sec: f64,
    /// The bar title.
    pub title: &'a str,
}

/// Glyphs and maximum width of the bar.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BarStyle {
    /// Maximum number of glyphs.
    pub width: usize,
    /// Fill for the done part.
    pub complete: CompactString,
    /// Fill for the remaining part.
    pub incomplete: CompactString,
    /// Replaces the last complete glyph.
    pub head: CompactString,
}

impl Default for BarStyle {
    fn default() -> Self {
        Self {
            width: 40,
            complete: CompactString::const_new("█"),
            incomplete: CompactString::const_new("░"),
            head: CompactString::const_new("="),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Token {
    Bar,
    Current,
    Total,
    Percent,
    Elapsed,
    Eta,
    OpSec,
    Title,
    NewLine,
    Color(&'static str),
}

// Longest first so that no token shadows a longer one sharing its prefix.
const TOKENS: &[(&str, Token)] = &[
    (":current", Token::Current),
    (":percent", Token::Percent),
    (":elapsed", Token::Elapsed),
    (":cyellow", Token::Color("\x1b[33m")),
    (":cwhite", Token::Color("\x1b[37m")),
    (":cblue", Token::Color("\x1b[34m")),
    (":cnone", Token::Color("\x1b[0m")),
    (":opsec", Token::OpSec),
    (":title", Token::Title),
    (":total", Token::Total),
    (":cred", Token::Color("\x1b[31m")),
    (":bar", Token::Bar),
    (":eta", Token::Eta),
    (":nl", Token::NewLine),
];

enum Segment<'t> {
    Text(std::borrow::Cow<'t, str>),
    Escape(&'static str),
    Bar,
}

/// Renders one frame of `template` for `state`, fitting the bar into `columns`.
#[must_use]
pub fn format_frame(state: &FrameState<'_>, template: &str, style: &BarStyle, columns: usize) -> String {
    let segments = substitute(state, template);

    let static_len: usize = segments
        .iter()
        .map(|segment| match segment {
            Segment::Text(text) => text.chars().count(),
            Segment::Escape(_) | Segment::Bar => 0,
        })
        .sum();
    let width = style.width.min(columns.saturating_sub(static_len));
    let bar = make_bar(ratio(state), width, style);

    let mut line = String::with_capacity(template.len() + bar.len());
    for segment in &segments {
        match segment {
            Segment::Text(text) => line.push_str(text),
            Segment::Escape(code) => line.push_str(code),
            Segment::Bar => line.push_str(&bar),
        }
    }
    line
}

/// Substitutes every token except `:bar`, which is left as a placeholder.
fn substitute<'t>(state: &FrameState<'_>, template: &'t str) -> Vec<Segment<'t>> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(pos) = rest.find(':') {
        let (literal, tail) = rest.split_at(pos);
        if !literal.is_empty() {
            segments.push(Segment::Text(literal.into()));
        }

        match TOKENS.iter().find(|(name, _)| tail.starts_with(name)) {
            Some(&(name, token)) => {
                segments.push(expand(state, token));
                rest = &tail[name.len()..];
            }
            None => {
                segments.push(Segment::Text(":".into()));
                rest = &tail[1..];
            }
        }
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest.into()));
    }
    segments
}

fn expand<'t>(state: &FrameState<'_>, token: Token) -> Segment<'t> {
    let text = match token {
        Token::Bar => return Segment::Bar,
        Token::Color(code) => return Segment::Escape(code),
        Token::Current => state.current.to_string(),
        Token::Total => state.total.to_string(),
        Token::Percent => format!("{}%", percent(state).floor() as u64),
        Token::Elapsed => format_duration(state.elapsed),
        Token::Eta => format_duration(state.eta),
        Token::OpSec => format!("{:.1}", finite_or_zero(state.ops_per_sec)),
        Token::Title => state.title.to_owned(),
        Token::NewLine => "\n".to_owned(),
    };
    Segment::Text(text.into())
}

#[allow(clippy::cast_precision_loss)]
fn percent(state: &FrameState<'_>) -> f64 {
    finite_or_zero(state.current as f64 / state.total as f64 * 100.0).max(0.0)
}

#[allow(clippy::cast_precision_loss)]
fn ratio(state: &FrameState<'_>) -> f64 {
    finite_or_zero(state.current as f64 / state.total as f64).clamp(0.0, 1.0)
}

/// Builds `width` glyphs: the done run, whose last glyph is the head, followed by
/// the remaining run.
fn make_bar(ratio: f64, width: usize, style: &BarStyle) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let complete = ((width as f64 * ratio).round().max(0.0) as usize).min(width);

    let mut bar = String::with_capacity(width * style.complete.len().max(style.incomplete.len()));
    if complete > 0 {
        for _ in 1..complete {
            bar.push_str(&style.complete);
        }
        bar.push_str(&style.head);
    }
    for _ in complete..width {
        bar.push_str(&style.incomplete);
    }
    bar
}

/// Formats a duration as `1h 2min 3sec`, omitting the hours when zero.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h ");
    }
    let _ = write!(out, "{minutes}min {seconds}sec");
    out
}

/// Replaces `NaN` and infinities with zero.
#[must_use]
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::*;

    fn state(current: u64, total: u64) -> FrameState<'static> {
        FrameState {
            current,
            total,
            title: "->",
            ..FrameState::default()
        }
    }

    fn style(width: usize) -> BarStyle {
        BarStyle {
            width,
            ..BarStyle::default()
        }
    }

    /// Half Done
    /// Five of ten units: five complete glyphs, the last one being the head.
    #[test]
    fn test_half_bar() {
        let line = format_frame(&state(5, 10), "[:bar] :percent", &style(10), 80);
        assert_eq!(line, "[████=░░░░░] 50%");
    }

    #[rstest]
    #[case(0, 10, "░░░░░░░░░░")]
    #[case(1, 10, "=░░░░░░░░░")]
    #[case(9, 10, "████████=░")]
    #[case(10, 10, "█████████=")]
    #[case(25, 10, "█████████=")]
    fn test_bar_fill(#[case] current: u64, #[case] total: u64, #[case] expected: &str) {
        assert_eq!(format_frame(&state(current, total), ":bar", &style(10), 80), expected);
    }

    #[rstest]
    #[case(0, 100, "0%")]
    #[case(50, 100, "50%")]
    #[case(1, 3, "33%")]
    #[case(150, 100, "150%")]
    fn test_percent(#[case] current: u64, #[case] total: u64, #[case] expected: &str) {
        assert_eq!(format_frame(&state(current, total), ":percent", &style(10), 80), expected);
    }

    /// Width Cap
    /// The bar shrinks to the space left by the static text and never goes negative.
    #[rstest]
    #[case(80, 10)]
    #[case(16, 10)]
    #[case(10, 4)]
    #[case(6, 0)]
    #[case(0, 0)]
    fn test_bar_fits_columns(#[case] columns: usize, #[case] expected_width: usize) {
        let line = format_frame(&state(5, 10), "[:bar] :percent", &style(10), columns);
        let bar_len = line.chars().count() - "[] 50%".len();
        assert_eq!(bar_len, expected_width);
        assert!(bar_len <= 10);
    }

    /// Escapes Are Zero-Width
    /// Color codes do not eat into the bar's space.
    #[test]
    fn test_colors() {
        let line = format_frame(&state(10, 10), ":cred:bar:cnone", &style(4), 4);
        assert_eq!(line, "\x1b[31m███=\x1b[0m");
    }

    #[test]
    fn test_all_tokens() {
        let frame = FrameState {
            current: 30,
            total: 120,
            elapsed: Duration::from_secs(75),
            eta: Duration::from_secs(3_725),
            ops_per_sec: 0.4,
            title: "copy",
        };
        let line = format_frame(
            &frame,
            ":title :current/:total :elapsed :eta :opsec:nl",
            &style(10),
            80,
        );
        assert_eq!(line, "copy 30/120 1min 15sec 1h 2min 5sec 0.4\n");
    }

    /// Unknown Tokens
    /// Colons that start no known token are kept literally.
    #[test]
    fn test_literal_colons() {
        let line = format_frame(&state(1, 2), "a:b :x :percent:", &style(10), 80);
        assert_eq!(line, "a:b :x 50%:");
    }

    /// Substituted Values Are Not Re-Scanned
    #[test]
    fn test_title_not_rescanned() {
        let frame = FrameState {
            title: ":percent",
            ..state(1, 2)
        };
        assert_eq!(format_frame(&frame, ":title", &style(10), 80), ":percent");
    }

    #[test]
    fn test_nan_rate() {
        let frame = FrameState {
            ops_per_sec: f64::NAN,
            ..state(1, 2)
        };
        assert_eq!(format_frame(&frame, ":opsec :eta", &style(10), 80), "0.0 0min 0sec");
    }

    #[rstest]
    #[case(0, "0min 0sec")]
    #[case(59, "0min 59sec")]
    #[case(61, "1min 1sec")]
    #[case(3_600, "1h 0min 0sec")]
    #[case(90_061, "25h 1min 1sec")]
    fn test_format_duration(#[case] secs: u64, #[case] expected: &str) {
        assert_eq!(format_duration(Duration::from_secs(secs)), expected);
    }
}
