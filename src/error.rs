//! Errors raised while configuring a [`ProgressBar`](crate::ProgressBar).
//!
//! Only construction can fail. Once a bar exists, every operation on it is
//! infallible: terminal I/O errors are swallowed and operations on a finished
//! bar are no-ops.

/// Result alias for fallible construction.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Invalid configuration detected while building a progress bar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No total was supplied to the builder.
    #[error("progress bar requires a total")]
    MissingTotal,

    /// The total was zero, so no ratio can be computed.
    #[error("progress bar total must be greater than zero")]
    ZeroTotal,

    /// The configured bar width was zero.
    #[error("progress bar width must be greater than zero")]
    ZeroWidth,

    /// One of the bar glyphs was the empty string.
    #[error("{which} glyph must not be empty")]
    EmptyGlyph {
        /// Which glyph was empty (`complete`, `incomplete` or `head`).
        which: &'static str,
    },

    /// An iterator without an exact length was attached to a new bar.
    #[error("iterator length is unknown; supply an explicit total")]
    UnknownLength,
}
