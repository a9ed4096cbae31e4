//! The summary produced when a bar completes.

use std::{fmt, time::Duration};

use compact_str::CompactString;

use crate::{format::format_duration, manager::BarId};

/// An immutable snapshot taken at the moment a bar reaches its total.
///
/// Delivered to the completion hook and, when enabled, logged once at `info`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "rkyv",
    derive(rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "rkyv", rkyv(derive(Debug)))]
pub struct CompletionReport {
    pub(crate) title: CompactString,
    pub(crate) id: BarId,
    pub(crate) counted: u64,
    pub(crate) expected: u64,
    pub(crate) elapsed: Duration,
    pub(crate) sampled_ops_per_sec: f64,
    pub(crate) average_ops_per_sec: f64,
}

impl CompletionReport {
    /// The bar title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The bar identifier.
    #[must_use]
    pub const fn id(&self) -> BarId {
        self.id
    }

    /// Units actually counted, which may exceed [`expected`](Self::expected).
    #[must_use]
    pub const fn counted(&self) -> u64 {
        self.counted
    }

    /// The configured total.
    #[must_use]
    pub const fn expected(&self) -> u64 {
        self.expected
    }

    /// Time from construction to completion.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Elapsed time in whole and fractional seconds.
    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Elapsed time formatted like the `:elapsed` token.
    #[must_use]
    pub fn elapsed_formatted(&self) -> String {
        format_duration(self.elapsed)
    }

    /// The smoothed rate from the sample window at completion.
    #[must_use]
    pub const fn sampled_ops_per_sec(&self) -> f64 {
        self.sampled_ops_per_sec
    }

    /// Counted units divided by elapsed seconds.
    #[must_use]
    pub const fn average_ops_per_sec(&self) -> f64 {
        self.average_ops_per_sec
    }
}

impl fmt::Display for CompletionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}/{} in {} ({:.3}s), {:.1} ops/s sampled, {:.1} ops/s average",
            self.title,
            self.id,
            self.counted,
            self.expected,
            self.elapsed_formatted(),
            self.elapsed_secs(),
            self.sampled_ops_per_sec,
            self.average_ops_per_sec,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::CompletionReport;
    use crate::manager::BarId;

    #[test]
    fn test_display() {
        let report = CompletionReport {
            title: "download".into(),
            id: BarId(3),
            counted: 12,
            expected: 10,
            elapsed: Duration::from_millis(61_500),
            sampled_ops_per_sec: 0.2,
            average_ops_per_sec: 0.195,
        };

        assert_eq!(report.elapsed_formatted(), "1min 1sec");
        assert_eq!(
            report.to_string(),
            "download [#3] 12/10 in 1min 1sec (61.500s), 0.2 ops/s sampled, 0.2 ops/s average"
        );
    }
}
