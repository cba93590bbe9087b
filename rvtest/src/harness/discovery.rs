use std::path::{Path, PathBuf};

use log::{debug, trace};
use walkdir::WalkDir;

use crate::errors::{Error, Result};

/// Driver files are named after their subject: `foo_driver.c` tests `foo.c`.
pub const DRIVER_SUFFIX: &str = "_driver.c";
const SOURCE_EXTENSION: &str = ".c";

/// A compiler test: the C source handed to the compiler-under-test and the
/// driver linked against its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    driver: PathBuf,
    source: PathBuf,
}

impl TestCase {
    pub fn from_driver(driver: impl Into<PathBuf>) -> Result<Self> {
        let driver = driver.into();
        let name = driver
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::InvalidTestCase(driver.display().to_string()))?;
        let stem = match name.strip_suffix(DRIVER_SUFFIX) {
            Some(stem) if !stem.is_empty() => stem,
            _ => {
                return Err(Error::InvalidTestCase(format!(
                    "{}, driver files must end with {DRIVER_SUFFIX}",
                    driver.display()
                )))
            }
        };
        let source = driver.with_file_name(format!("{stem}{SOURCE_EXTENSION}"));

        Ok(TestCase { driver, source })
    }

    pub fn driver(&self) -> &Path {
        &self.driver
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Name shared by every artifact of the case, `foo` for `foo.c`.
    pub fn stem(&self) -> String {
        self.source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn ensure_exists(&self) -> Result<()> {
        for path in [&self.driver, &self.source] {
            if !path.is_file() {
                return Err(Error::FileNotFoundError(path.display().to_string()));
            }
        }
        Ok(())
    }
}

/// Recursively collects every `*_driver.c` under `selector`.
///
/// Cases are ordered by their directory name, then file name, with the full
/// path breaking ties, so the same tree always runs in the same order.
pub fn discover(selector: &Path) -> Result<Vec<TestCase>> {
    if !selector.exists() {
        return Err(Error::FileNotFoundError(selector.display().to_string()));
    }

    let mut drivers = Vec::new();
    for entry in WalkDir::new(selector).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_driver = entry
            .file_name()
            .to_str()
            .map_or(false, |name| name.ends_with(DRIVER_SUFFIX) && name != DRIVER_SUFFIX);
        if is_driver {
            trace!("Found driver {}", entry.path().display());
            drivers.push(entry.into_path());
        }
    }

    drivers.sort_by(|first, second| {
        let key = |path: &PathBuf| {
            (
                path.parent().and_then(|parent| parent.file_name()).map(|n| n.to_os_string()),
                path.file_name().map(|n| n.to_os_string()),
            )
        };
        key(first).cmp(&key(second)).then_with(|| first.cmp(second))
    });
    debug!("Discovered {} test cases under {}", drivers.len(), selector.display());

    drivers.into_iter().map(TestCase::from_driver).collect()
}
