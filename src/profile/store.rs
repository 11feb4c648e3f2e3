use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use walkdir::WalkDir;

use super::error::{Diagnostic, ProfileError, ProfileResult};
use super::model::{ProfileDocument, RawRecord};

const PROFILE_EXTENSION: &str = "json";

/// Everything found under a vendor directory.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub records: Vec<RawRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// File-system adapter for profile documents: one pretty-printed JSON file per
/// profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore;

impl ProfileStore {
    pub fn new() -> Self {
        Self
    }

    /// Reads every `*.json` file below `vendor_dir`. Unparseable files become
    /// diagnostics; only a failure to read the tree itself is an error.
    pub fn load_all(&self, vendor_dir: &Path) -> ProfileResult<LoadOutcome> {
        let mut outcome = LoadOutcome::default();
        for entry in WalkDir::new(vendor_dir).sort_by_file_name() {
            let entry = entry.map_err(|err| {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| vendor_dir.to_path_buf());
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                ProfileError::io(path, source)
            })?;
            if !entry.file_type().is_file() || !is_profile_file(entry.path()) {
                continue;
            }
            let path = entry.path().to_path_buf();
            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(err) => {
                    log::warn!("skipping {:?}: {}", path, err);
                    outcome.diagnostics.push(Diagnostic::Unreadable {
                        path,
                        message: err.to_string(),
                    });
                    continue;
                }
            };
            match serde_json::from_str::<Value>(&contents) {
                Ok(Value::Object(map)) => outcome.records.push(RawRecord {
                    attributes: ProfileDocument::from_map(map),
                    file_path: path,
                }),
                Ok(_) => {
                    log::warn!("skipping {:?}: not a json object", path);
                    outcome.diagnostics.push(Diagnostic::NotAnObject { path });
                }
                Err(err) => {
                    log::warn!("skipping {:?}: {}", path, err);
                    outcome.diagnostics.push(Diagnostic::MalformedJson {
                        path,
                        message: err.to_string(),
                    });
                }
            }
        }
        log::debug!(
            "loaded {} profile files from {:?} ({} skipped)",
            outcome.records.len(),
            vendor_dir,
            outcome.diagnostics.len()
        );
        Ok(outcome)
    }

    pub fn read(&self, path: &Path) -> ProfileResult<ProfileDocument> {
        let contents = fs::read_to_string(path).map_err(|err| ProfileError::io(path, err))?;
        serde_json::from_str(&contents).map_err(|err| ProfileError::json(path, err))
    }

    /// Writes the whole document through a sibling temp file and a rename, so a
    /// failed write never leaves a truncated profile behind.
    pub fn write(&self, path: &Path, document: &ProfileDocument) -> ProfileResult<()> {
        let encoded = document
            .to_pretty_json()
            .map_err(|err| ProfileError::json(path, err))?;
        let temp_path = temp_path_for(path);
        fs::write(&temp_path, encoded).map_err(|err| ProfileError::io(&temp_path, err))?;
        if let Err(err) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(ProfileError::io(path, err));
        }
        log::debug!("wrote profile file {:?}", path);
        Ok(())
    }

    pub fn delete(&self, path: &Path) -> ProfileResult<()> {
        fs::remove_file(path).map_err(|err| ProfileError::io(path, err))?;
        log::debug!("removed profile file {:?}", path);
        Ok(())
    }

    /// Top-level directories of a profiles root, one per vendor.
    pub fn list_vendors(&self, profiles_root: &Path) -> ProfileResult<Vec<String>> {
        let mut vendors = Vec::new();
        let entries =
            fs::read_dir(profiles_root).map_err(|err| ProfileError::io(profiles_root, err))?;
        for entry in entries {
            let entry = entry.map_err(|err| ProfileError::io(profiles_root, err))?;
            let file_type = entry
                .file_type()
                .map_err(|err| ProfileError::io(entry.path(), err))?;
            if file_type.is_dir()
                && let Some(name) = entry.file_name().to_str()
            {
                vendors.push(name.to_string());
            }
        }
        vendors.sort();
        Ok(vendors)
    }

    /// Finds the file in `directory` (not recursive) whose `name` attribute is
    /// `name`. Files that fail to parse are ignored.
    pub fn find_by_name(&self, directory: &Path, name: &str) -> ProfileResult<Option<PathBuf>> {
        let entries = fs::read_dir(directory).map_err(|err| ProfileError::io(directory, err))?;
        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| ProfileError::io(directory, err))?;
            let path = entry.path();
            if path.is_file() && is_profile_file(&path) {
                candidates.push(path);
            }
        }
        candidates.sort();
        for path in candidates {
            match self.read(&path) {
                Ok(document) if document.name() == Some(name) => return Ok(Some(path)),
                Ok(_) => {}
                Err(err) => log::debug!("ignoring {:?} during lookup: {}", path, err),
            }
        }
        Ok(None)
    }
}

fn is_profile_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(PROFILE_EXTENSION)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()))
}
