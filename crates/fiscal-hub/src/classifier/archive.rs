use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::Local;
use regex::Regex;

use crate::obligations::ClassificationRecord;

/// Mirrors every classification outcome to a JSON file so uploads can be
/// audited and replayed. This is a side artifact, not a primary store; the
/// caller treats failures as non-fatal.
pub struct ClassificationArchive {
    base_dir: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("could not write classification artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not serialize classification artifact: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ClassificationArchive {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            base_dir: data_dir.join("classifications"),
        }
    }

    /// Writes `<timestamp>_<sanitized-stem>.json` under the archive
    /// directory and returns the full path.
    pub fn store(&self, record: &ClassificationRecord) -> Result<PathBuf, ArchiveError> {
        fs::create_dir_all(&self.base_dir)?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let stem = Path::new(&record.result.filename)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "documento".to_string());
        let path = self
            .base_dir
            .join(format!("{stamp}_{}.json", sanitize_stem(&stem)));

        let payload = serde_json::to_string_pretty(record)?;
        fs::write(&path, payload)?;
        Ok(path)
    }
}

fn sanitize_stem(stem: &str) -> String {
    static RX: OnceLock<Regex> = OnceLock::new();
    let rx = RX.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("pattern is valid"));
    let safe = rx.replace_all(stem, "_");
    safe.chars().take(80).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{classify_filename, ReviewStatus};

    #[test]
    fn stores_the_full_outcome_as_json() {
        let dir = tempfile::tempdir().expect("temp dir");
        let archive = ClassificationArchive::new(dir.path());

        let result = classify_filename("02-2026 - DARF PIS - Empresa Alfa.pdf");
        let record = ClassificationRecord {
            task_id: 7,
            actor_id: Some(3),
            status: result.review_status(),
            result,
        };

        let path = archive.store(&record).expect("artifact written");
        assert!(path.exists());

        let raw = std::fs::read_to_string(&path).expect("artifact readable");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
        assert_eq!(value["task_id"], 7);
        assert_eq!(value["status"], "ok");
        assert_eq!(value["tax_code"], "DARF PIS");
        assert_eq!(value["competence"], "202602");
    }

    #[test]
    fn sanitizes_awkward_filenames() {
        let dir = tempfile::tempdir().expect("temp dir");
        let archive = ClassificationArchive::new(dir.path());

        let result = classify_filename("02/2026 * relatório (final)??.pdf");
        let record = ClassificationRecord {
            task_id: 1,
            actor_id: None,
            status: ReviewStatus::NeedsReview,
            result,
        };

        let path = archive.store(&record).expect("artifact written");
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        assert!(!name.contains('*'));
        assert!(!name.contains('?'));
        assert!(!name.contains('('));
    }
}
