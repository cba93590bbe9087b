use std::time::Duration;

/// Result line for one case as it appears in the suite report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseEntry {
    pub name: String,
    pub passed: bool,
    /// Failure diagnostic, `None` for passing cases.
    pub diagnostic: Option<String>,
    pub elapsed: Duration,
}

impl CaseEntry {
    pub fn pass(name: String, elapsed: Duration) -> Self {
        CaseEntry {
            name,
            passed: true,
            diagnostic: None,
            elapsed,
        }
    }

    pub fn fail(name: String, diagnostic: String, elapsed: Duration) -> Self {
        CaseEntry {
            name,
            passed: false,
            diagnostic: Some(diagnostic),
            elapsed,
        }
    }
}

/// Tally of a suite run. Values are built up by folding entries in with
/// [`SuiteReport::record`] rather than mutated through shared counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteReport {
    total: usize,
    passing: usize,
    entries: Vec<CaseEntry>,
    elapsed: Duration,
}

impl SuiteReport {
    pub fn record(mut self, entry: CaseEntry) -> Self {
        self.total += 1;
        if entry.passed {
            self.passing += 1;
        }
        self.entries.push(entry);
        self
    }

    pub fn finish(self, elapsed: Duration) -> Self {
        SuiteReport { elapsed, ..self }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn passing(&self) -> usize {
        self.passing
    }

    pub fn failing(&self) -> usize {
        self.total - self.passing
    }

    pub fn entries(&self) -> &[CaseEntry] {
        &self.entries
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn summary(&self) -> String {
        format!("Passing {}/{} tests", self.passing, self.total)
    }
}

impl FromIterator<CaseEntry> for SuiteReport {
    fn from_iter<I: IntoIterator<Item = CaseEntry>>(iter: I) -> Self {
        iter.into_iter()
            .fold(SuiteReport::default(), SuiteReport::record)
    }
}
