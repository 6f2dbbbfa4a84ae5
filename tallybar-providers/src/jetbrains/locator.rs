//! Locates the AI Assistant quota file among installed IDEs.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, trace};

/// Options file the IDEs write the quota into.
pub const QUOTA_FILE_NAME: &str = "AIAssistantQuotaManager2.xml";

/// Vendor directories under the platform config dir that hold IDE configs.
/// Android Studio lives under Google rather than JetBrains.
const VENDOR_DIRS: &[&str] = &["JetBrains", "Google"];

/// A quota file and the IDE config directory it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaFile {
    /// Full path to the XML file.
    pub path: PathBuf,
    /// IDE config directory name (e.g. `IntelliJIdea2025.2`).
    pub ide: String,
}

/// Searches IDE config directories for quota files.
#[derive(Debug, Clone)]
pub struct JetBrainsLocator {
    roots: Vec<PathBuf>,
}

impl JetBrainsLocator {
    /// Searches the platform config directory (`~/.config` on Linux,
    /// `~/Library/Application Support` on macOS, `%APPDATA%` on Windows).
    pub fn new() -> Self {
        let roots = dirs::config_dir()
            .map(|config| VENDOR_DIRS.iter().map(|v| config.join(v)).collect())
            .unwrap_or_default();
        Self { roots }
    }

    /// Searches the given vendor directories instead.
    pub fn with_roots(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Vendor directories searched.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Returns the most recently modified quota file, if any IDE has one.
    pub fn find_newest(&self) -> Option<QuotaFile> {
        let newest = self
            .roots
            .iter()
            .flat_map(|root| candidates(root))
            .max_by_key(|(_, modified)| *modified)
            .map(|(file, _)| file);

        match &newest {
            Some(file) => debug!(ide = %file.ide, path = %file.path.display(), "Found quota file"),
            None => debug!(roots = ?self.roots, "No quota file found"),
        }
        newest
    }
}

impl Default for JetBrainsLocator {
    fn default() -> Self {
        Self::new()
    }
}

fn candidates(root: &Path) -> Vec<(QuotaFile, SystemTime)> {
    let Ok(entries) = fs::read_dir(root) else {
        trace!(root = %root.display(), "Vendor directory not readable");
        return Vec::new();
    };

    entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let path = entry.path().join("options").join(QUOTA_FILE_NAME);
            let modified = fs::metadata(&path)
                .ok()
                .filter(fs::Metadata::is_file)?
                .modified()
                .unwrap_or(SystemTime::UNIX_EPOCH);
            let ide = entry.file_name().to_string_lossy().into_owned();
            Some((QuotaFile { path, ide }, modified))
        })
        .collect()
}
