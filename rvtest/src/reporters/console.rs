use std::fmt::Debug;
use std::io::Write;

use colored::Colorize;

use crate::errors::Result;
use crate::harness::report::CaseEntry;
use crate::utils::writer::Writer;

const BAR_LABEL: &str = "Running Tests []";
const MAX_LINE_LENGTH: usize = 80;
const HINT: &str = "See logs for more details (use -v for verbose output).";

/// Human-readable progress of a suite run.
pub(crate) trait CaseReporter: Debug {
    fn start(&mut self, writer: &mut Writer, total: usize) -> Result<()>;
    fn case_started(&mut self, writer: &mut Writer, name: &str) -> Result<()>;
    fn case_finished(&mut self, writer: &mut Writer, entry: &CaseEntry) -> Result<()>;
}

/// Prints each case's source path before it runs and its verdict after.
#[derive(Debug, Default)]
pub(crate) struct LineReporter;

impl CaseReporter for LineReporter {
    fn start(&mut self, _writer: &mut Writer, _total: usize) -> Result<()> {
        Ok(())
    }

    fn case_started(&mut self, writer: &mut Writer, name: &str) -> Result<()> {
        writeln!(writer, "{name}")?;
        Ok(writer.flush()?)
    }

    fn case_finished(&mut self, writer: &mut Writer, entry: &CaseEntry) -> Result<()> {
        match &entry.diagnostic {
            None => writeln!(writer, "{}", "\t> Pass".green())?,
            Some(diagnostic) => writeln!(writer, "{}", format!("\t> {diagnostic}").as_str().red())?,
        }
        Ok(())
    }
}

/// Three-line bar redrawn in place after every case, for interactive
/// terminals only.
#[derive(Debug)]
pub(crate) struct ProgressBar {
    width: usize,
    total: usize,
    passed: usize,
    failed: usize,
}

impl Default for ProgressBar {
    fn default() -> Self {
        ProgressBar {
            width: MAX_LINE_LENGTH - BAR_LABEL.len(),
            total: 0,
            passed: 0,
            failed: 0,
        }
    }
}

impl ProgressBar {
    fn share(&self, count: usize) -> usize {
        if count == 0 || self.total == 0 {
            return 0;
        }
        let share = (count as f64 / self.total as f64 * self.width as f64).round() as usize;
        share.max(1)
    }

    fn bar(&self) -> String {
        let passed = self.share(self.passed);
        let failed = self.share(self.failed).min(self.width - passed.min(self.width));
        let empty = self.width.saturating_sub(passed + failed);

        format!(
            "{}{}{}",
            "#".repeat(passed).as_str().green(),
            "#".repeat(failed).as_str().red(),
            " ".repeat(empty)
        )
    }

    fn draw(&self, writer: &mut Writer) -> Result<()> {
        let remaining = self.total.saturating_sub(self.passed + self.failed);
        // back to the first line of the bar
        write!(writer, "\x1b[3A\r")?;
        writeln!(writer, "Running Tests [{}]", self.bar())?;
        writeln!(
            writer,
            "Pass: {:2} | Fail: {:2} | Remaining: {:2} ",
            self.passed, self.failed, remaining
        )?;
        writeln!(writer, "{HINT}")?;
        Ok(writer.flush()?)
    }
}

impl CaseReporter for ProgressBar {
    fn start(&mut self, writer: &mut Writer, total: usize) -> Result<()> {
        self.total = total;
        writeln!(writer, "Running Tests [{}]", " ".repeat(self.width))?;
        writeln!(writer, "Pass: 0 | Fail: 0 | Remaining: {total}")?;
        writeln!(writer, "{HINT}")?;
        self.draw(writer)
    }

    fn case_started(&mut self, _writer: &mut Writer, _name: &str) -> Result<()> {
        Ok(())
    }

    fn case_finished(&mut self, writer: &mut Writer, entry: &CaseEntry) -> Result<()> {
        if entry.passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.draw(writer)
    }
}
