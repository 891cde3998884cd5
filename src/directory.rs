//! Fleet enumeration
//!
//! Lists candidate worker identifiers from the shared records directory.
//! Every fleet query starts from this list; nothing else scans the
//! filesystem.

use std::fs;
use std::path::PathBuf;
use tracing::warn;

use crate::store::RECORD_EXT;

/// Filenames in the records directory that are never worker records.
const RESERVED_FILES: &[&str] = &["data.json", "settings.json"];

#[derive(Debug, Clone)]
pub struct FleetDirectory {
    records_dir: PathBuf,
}

impl FleetDirectory {
    pub fn new(records_dir: impl Into<PathBuf>) -> Self {
        Self {
            records_dir: records_dir.into(),
        }
    }

    /// All candidate worker identifiers, lexicographically sorted.
    ///
    /// Reserved files, aggregate output artifacts and anything without the
    /// record extension are skipped. A missing or unreadable directory
    /// yields an empty fleet, not an error.
    pub fn list_candidates(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.records_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    dir = %self.records_dir.display(),
                    error = %e,
                    "records directory not readable"
                );
                return Vec::new();
            }
        };

        let suffix = format!(".{RECORD_EXT}");
        let mut pairs: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                if is_reserved(&name) {
                    return None;
                }
                // Anything without the record extension drops out here
                name.strip_suffix(&suffix).map(str::to_string)
            })
            .collect();
        pairs.sort();
        pairs
    }
}

fn is_reserved(name: &str) -> bool {
    RESERVED_FILES.contains(&name) || name.contains("output.json")
}
