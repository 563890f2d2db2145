use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use rustc_hash::FxHashMap;

use pipgrip_pep508::Requirement;

use crate::printer::Printer;

/// A spinner showing the requirements pip is currently reporting on.
#[derive(Debug)]
pub(crate) struct ResolverReporter {
    progress: ProgressBar,
    state: Mutex<ReportState>,
}

#[derive(Debug, Default)]
struct ReportState {
    /// The requirements of the reports in flight, by ID.
    active: FxHashMap<usize, String>,
    /// A monotonic counter for report IDs.
    id: usize,
}

impl From<Printer> for ResolverReporter {
    fn from(printer: Printer) -> Self {
        let progress = ProgressBar::with_draw_target(None, printer.target());
        progress.enable_steady_tick(Duration::from_millis(200));
        progress.set_style(
            ProgressStyle::with_template("{spinner:.white} {wide_msg:.dim}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        progress.set_message("Resolving dependencies...");
        Self {
            progress,
            state: Mutex::default(),
        }
    }
}

impl pipgrip_resolver::Reporter for ResolverReporter {
    fn on_report_start(&self, requirements: &[Requirement]) -> usize {
        let message = requirements.iter().join(" ");
        self.progress.set_message(message.clone());

        let mut state = self.state.lock().unwrap();
        state.id += 1;
        let id = state.id;
        state.active.insert(id, message);
        id
    }

    fn on_report_complete(&self, id: usize) {
        let mut state = self.state.lock().unwrap();
        state.active.remove(&id);
        // Show one of the reports that are still running.
        if let Some(message) = state.active.values().next() {
            self.progress.set_message(message.clone());
        }
    }

    fn on_complete(&self) {
        self.progress.set_message("");
        self.progress.finish_and_clear();
    }
}
