//! Progress reporting infrastructure

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::{
    borrow::Cow,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// CLI progress report of ongoing pipeline stages
///
/// To avoid corrupted terminal output, you should not write anything to stdout
/// or stderr yourself as long as a report is being displayed. Please use logs
/// for debug messages.
#[derive(Clone, Debug, Default)]
pub struct ProgressReport(MultiProgress);
//
impl ProgressReport {
    /// Prepare to report progress on the cli
    pub fn new() -> Self {
        Self::default()
    }

    /// Report that is never displayed
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self(MultiProgress::with_draw_target(
            indicatif::ProgressDrawTarget::hidden(),
        ))
    }

    /// Prepare to report on a new pipeline stage
    pub fn add(
        &self,
        what: impl Into<Cow<'static, str>>,
        config: ProgressConfig,
    ) -> ProgressTracker {
        let ProgressConfig {
            initial_work,
            can_add_work,
        } = config;
        let style_trailer = match initial_work {
            Work::Steps(_) => "{pos}/{len} ({per_sec})",
            Work::PercentSteps(_) => "{percent:>2}% (~{eta} left)",
        };
        let bar = ProgressBar::new(initial_work.into())
            .with_prefix(what.into())
            .with_style(
                ProgressStyle::with_template(&format!("{{prefix}} {{wide_bar}} {style_trailer}"))
                    .expect("all styles above should be valid indicatif styles"),
            );
        let added = u64::from(initial_work) > 0;
        if added {
            self.0.add(bar.clone());
        }
        ProgressTracker {
            bar,
            report: self.0.clone(),
            added: Arc::new(AtomicBool::new(added)),
            upcoming: Arc::new(AtomicBool::new(can_add_work)),
        }
    }
}

/// Progress bar configuration
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct ProgressConfig {
    /// Initial length of the progress bar
    initial_work: Work,

    /// Can add more work after initial configuration
    can_add_work: bool,
}
//
impl ProgressConfig {
    /// Default configuration, with some initial amount of work
    pub fn new(initial_work: Work) -> Self {
        Self {
            initial_work,
            can_add_work: false,
        }
    }

    /// Enable addition of work after initial configuration
    ///
    /// Use this when the amount of work is not known upfront, as when
    /// streaming through a file.
    pub fn allow_adding_work(self) -> Self {
        Self {
            can_add_work: true,
            ..self
        }
    }
}

/// Work whose progression that can be tracked
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Work {
    /// Steps to be taken, with a precise count display
    Steps(usize),

    /// Steps to be taken, with a percentage-based display
    PercentSteps(usize),
}
//
impl From<Work> for u64 {
    fn from(value: Work) -> Self {
        let inner = match value {
            Work::Steps(s) => s,
            Work::PercentSteps(p) => p,
        };
        inner as u64
    }
}

/// Mechanism to track progress
#[derive(Clone, Debug)]
pub struct ProgressTracker {
    /// Progress bar for this specific stage
    bar: ProgressBar,

    /// Underlying process report
    report: MultiProgress,

    /// Truth that the progress bar has already been added to the report
    added: Arc<AtomicBool>,

    /// Truth that more work can still be added to this progress bar
    upcoming: Arc<AtomicBool>,
}
//
impl ProgressTracker {
    /// Show that a certain amount of progress has been made
    ///
    /// Returns truth that the progress bar has reached its maximum value
    pub fn make_progress(&self, progress: u64) -> bool {
        // Track progress
        self.bar.inc(progress);
        let current = self.bar.position();
        let max = self.bar.length().unwrap_or(0);
        assert!(current <= max, "recorded more progress than expected");

        // Hide progress bar once done
        let finished = current == max && !self.upcoming.load(Ordering::Acquire);
        if finished {
            self.hide();
        }
        finished
    }

    /// Increment the amount of progress that remains to be done
    ///
    /// Note that this operation is disabled by default, and you must enable it
    /// in [`ProgressConfig`]. If you use it, call `done_adding_work()` once you
    /// know no further work will be coming.
    pub fn add_work(&self, remaining: u64) {
        assert!(
            self.upcoming.load(Ordering::Acquire),
            "should not add work after done_adding_work"
        );
        if !self.added.swap(true, Ordering::AcqRel) && remaining > 0 {
            self.report.add(self.bar.clone());
        }
        self.bar.inc_length(remaining);
    }

    /// Promise that add_work will not be called anymore
    ///
    /// This allows for the progress bar to be hidden once full, which may be
    /// right away if all known work has already been done.
    pub fn done_adding_work(&self) {
        assert!(
            self.upcoming.swap(false, Ordering::Release),
            "should only need to freeze remaining work once"
        );
        if self.bar.position() == self.bar.length().unwrap_or(0) {
            self.hide();
        }
    }

    /// Remove the progress bar from the report
    fn hide(&self) {
        self.bar.finish_and_clear();
        self.report.remove(&self.bar);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_ended_work_finishes_on_promise() {
        let report = ProgressReport::hidden();
        let tracker = report.add(
            "Streaming",
            ProgressConfig::new(Work::Steps(0)).allow_adding_work(),
        );
        tracker.add_work(2);
        assert!(!tracker.make_progress(1));
        assert!(!tracker.make_progress(1));
        tracker.done_adding_work();
    }

    #[test]
    fn fixed_work_finishes_on_last_step() {
        let report = ProgressReport::hidden();
        let tracker = report.add("Writing", ProgressConfig::new(Work::PercentSteps(2)));
        assert!(!tracker.make_progress(1));
        assert!(tracker.make_progress(1));
    }
}
