//! Block files: the manual-labeling surface and the training input unit.
//!
//! A block file is a JSON array of [`TextBlock`] records, one file per
//! document.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::classify::LabeledDocument;
use crate::detect::find_json_files;
use crate::error::{Error, Result};
use crate::extract::LanguageDetector;
use crate::model::TextBlock;

/// Sub-directory receiving copies of files before they are upgraded.
pub const BACKUP_DIR: &str = "pre_upgrade_backups";

/// Read a block file.
pub fn read_blocks<P: AsRef<Path>>(path: P) -> Result<Vec<TextBlock>> {
    let data = fs::read(path.as_ref())?;
    Ok(serde_json::from_slice(&data)?)
}

/// Write blocks as a pretty JSON array.
pub fn write_blocks<P: AsRef<Path>>(path: P, blocks: &[TextBlock]) -> Result<()> {
    let json = serde_json::to_string_pretty(blocks)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load every `*.json` block file in `dir` as one labeled document.
pub fn load_labeled_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<LabeledDocument>> {
    let dir = dir.as_ref();
    let files = find_json_files(dir)?;
    if files.is_empty() {
        return Err(Error::EmptyTrainingSet(format!(
            "no .json files in {}",
            dir.display()
        )));
    }

    files
        .iter()
        .map(|path| {
            let blocks = read_blocks(path).map_err(|e| match e {
                Error::Json(inner) => Error::Other(format!("{}: {}", path.display(), inner)),
                other => other,
            })?;
            log::debug!("{}: {} blocks", path.display(), blocks.len());
            Ok(LabeledDocument::new(path.display().to_string(), blocks))
        })
        .collect()
}

/// Outcome of upgrading one block file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeStatus {
    /// Rewritten with this many blocks gaining a language
    Upgraded(usize),
    /// Every block already had a language
    Unchanged,
    /// Backup could not be made; the file was not touched
    Skipped(String),
    /// The file could not be read or parsed
    Failed(String),
}

/// Per-file outcomes of [`upgrade_dir`], in file-name order.
#[derive(Debug, Clone, Default)]
pub struct UpgradeReport {
    pub files: Vec<(PathBuf, UpgradeStatus)>,
}

impl UpgradeReport {
    pub fn upgraded(&self) -> usize {
        self.count(|s| matches!(s, UpgradeStatus::Upgraded(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, UpgradeStatus::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, UpgradeStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&UpgradeStatus) -> bool) -> usize {
        self.files.iter().filter(|(_, s)| pred(s)).count()
    }
}

/// Add a `language` key to every block lacking one, in all block files of
/// `dir`.
///
/// Each file is copied into [`BACKUP_DIR`] before it is rewritten. Other
/// keys, including labels, are kept.
pub fn upgrade_dir<P: AsRef<Path>>(dir: P, detector: &dyn LanguageDetector) -> Result<UpgradeReport> {
    let dir = dir.as_ref();
    let backup_dir = dir.join(BACKUP_DIR);
    fs::create_dir_all(&backup_dir)?;

    let mut report = UpgradeReport::default();
    for path in find_json_files(dir)? {
        let status = upgrade_file(&path, &backup_dir, detector);
        match &status {
            UpgradeStatus::Upgraded(n) => log::info!("{}: added language to {} blocks", path.display(), n),
            UpgradeStatus::Unchanged => log::debug!("{}: already up to date", path.display()),
            UpgradeStatus::Skipped(reason) => log::warn!("Skipping {}: {}", path.display(), reason),
            UpgradeStatus::Failed(reason) => log::error!("Failed to upgrade {}: {}", path.display(), reason),
        }
        report.files.push((path, status));
    }
    Ok(report)
}

fn upgrade_file(path: &Path, backup_dir: &Path, detector: &dyn LanguageDetector) -> UpgradeStatus {
    let Some(name) = path.file_name() else {
        return UpgradeStatus::Skipped("no file name".to_string());
    };
    if let Err(e) = fs::copy(path, backup_dir.join(name)) {
        return UpgradeStatus::Skipped(format!("backup failed: {}", e));
    }

    let mut records: Vec<Value> = match fs::read(path)
        .map_err(Error::from)
        .and_then(|data| serde_json::from_slice(&data).map_err(Error::from))
    {
        Ok(records) => records,
        Err(e) => return UpgradeStatus::Failed(e.to_string()),
    };

    let added = add_missing_languages(&mut records, detector);
    if added == 0 {
        return UpgradeStatus::Unchanged;
    }

    let written = serde_json::to_string_pretty(&records)
        .map_err(Error::from)
        .and_then(|json| fs::write(path, json).map_err(Error::from));
    match written {
        Ok(()) => UpgradeStatus::Upgraded(added),
        Err(e) => UpgradeStatus::Failed(e.to_string()),
    }
}

/// Fill in `language` on object records that lack it; returns how many.
fn add_missing_languages(records: &mut [Value], detector: &dyn LanguageDetector) -> usize {
    let mut added = 0;
    for record in records.iter_mut() {
        let Some(obj) = record.as_object_mut() else {
            continue;
        };
        if obj.contains_key("language") {
            continue;
        }
        let text = obj.get("text").and_then(Value::as_str).unwrap_or("");
        let language = detector.language_of(text);
        obj.insert("language".to_string(), Value::String(language));
        added += 1;
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox;

    struct FixedLanguage;

    impl LanguageDetector for FixedLanguage {
        fn detect(&self, _text: &str) -> Option<String> {
            Some("de".to_string())
        }
    }

    #[test]
    fn test_write_and_read_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let mut block = TextBlock::new("Überblick", BBox::new(72.0, 80.0, 200.0, 96.0), 1);
        block.font_size = 16.0;
        write_blocks(&path, &[block.clone()]).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Überblick"));
        assert!(!raw.contains("\"label\""));

        let back = read_blocks(&path).unwrap();
        assert_eq!(back, vec![block]);
    }

    #[test]
    fn test_load_labeled_dir_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let block = TextBlock::new("Intro", BBox::default(), 1);
        write_blocks(dir.path().join("b.json"), &[block.clone()]).unwrap();
        write_blocks(dir.path().join("a.json"), &[block.clone(), block]).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let docs = load_labeled_dir(dir.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].name.ends_with("a.json"));
        assert_eq!(docs[0].blocks.len(), 2);
    }

    #[test]
    fn test_load_labeled_dir_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_labeled_dir(dir.path()),
            Err(Error::EmptyTrainingSet(_))
        ));
    }

    #[test]
    fn test_upgrade_adds_missing_language_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(
            &path,
            r#"[{"text": "Einleitung", "page_number": 1, "label": "H1"},
                {"text": "Body", "page_number": 1, "language": "en"}]"#,
        )
        .unwrap();

        let report = upgrade_dir(dir.path(), &FixedLanguage).unwrap();
        assert_eq!(report.upgraded(), 1);
        assert_eq!(report.files[0].1, UpgradeStatus::Upgraded(1));
        assert!(dir.path().join(BACKUP_DIR).join("doc.json").exists());

        let blocks = read_blocks(&path).unwrap();
        assert_eq!(blocks[0].language.as_deref(), Some("de"));
        assert_eq!(blocks[0].label.as_deref(), Some("H1"));
        assert_eq!(blocks[1].language.as_deref(), Some("en"));

        // Second run has nothing left to do.
        let report = upgrade_dir(dir.path(), &FixedLanguage).unwrap();
        assert_eq!(report.files[0].1, UpgradeStatus::Unchanged);
    }

    #[test]
    fn test_upgrade_reports_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not an array").unwrap();

        let report = upgrade_dir(dir.path(), &FixedLanguage).unwrap();
        assert_eq!(report.failed(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not an array");
    }
}
