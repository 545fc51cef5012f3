//! Anchor configuration persistence
//!
//! Stores the persisted watch state as JSON in the platform data
//! directory so a restart resumes the identical watch.
//!
//! Storage path: `~/.local/share/ankra/anchor.json`

use ankra_core::PersistedConfig;
use log::{debug, info, warn};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

const CONFIG_FILE: &str = "anchor.json";

/// JSON-on-disk store for the persisted anchor configuration.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Create a store under `data_dir`, or under the platform data
    /// directory when none is given.
    pub fn new(data_dir: Option<PathBuf>) -> Self {
        let dir = data_dir.unwrap_or_else(default_data_dir);
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!("Failed to create data directory {}: {}", dir.display(), e);
        }
        ConfigStore {
            path: dir.join(CONFIG_FILE),
        }
    }

    /// Load the persisted configuration, or `None` if there is none or it
    /// cannot be read. A corrupt file is reported and treated as absent.
    pub fn load(&self) -> Option<PersistedConfig> {
        if !self.path.exists() {
            debug!("No persisted anchor config at {}", self.path.display());
            return None;
        }

        match fs::File::open(&self.path) {
            Ok(file) => match serde_json::from_reader(BufReader::new(file)) {
                Ok(config) => {
                    info!("Loaded anchor config from {}", self.path.display());
                    Some(config)
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}", self.path.display(), e);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to open {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Write the configuration to disk.
    pub fn save(&self, config: &PersistedConfig) -> Result<(), String> {
        let file = fs::File::create(&self.path)
            .map_err(|e| format!("create {}: {}", self.path.display(), e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, config)
            .map_err(|e| format!("write {}: {}", self.path.display(), e))?;
        if let Err(e) = writer.write_all(b"\n") {
            warn!("Failed to write trailing newline: {}", e);
        }
        writer
            .flush()
            .map_err(|e| format!("flush {}: {}", self.path.display(), e))?;

        debug!("Saved anchor config to {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

fn default_data_dir() -> PathBuf {
    match directories::ProjectDirs::from("", "", "ankra") {
        Some(dirs) => dirs.data_dir().to_owned(),
        None => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ankra_core::{AlarmSettings, Position};
    use tempfile::TempDir;

    fn store_in_tempdir() -> (ConfigStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(Some(dir.path().to_path_buf()));
        (store, dir)
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let (store, _dir) = store_in_tempdir();
        let persisted = PersistedConfig {
            on: true,
            config: Some(AlarmSettings::default().config(
                Position::new(59.9, 10.7),
                60.0,
                None,
            )),
        };

        store.save(&persisted).unwrap();
        assert_eq!(store.load(), Some(persisted));
    }

    #[test]
    fn test_load_missing_returns_none() {
        let (store, _dir) = store_in_tempdir();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_corrupt_file_treated_as_absent() {
        let (store, _dir) = store_in_tempdir();
        fs::write(store.path(), "not json {").unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_save_overwrites_previous() {
        let (store, _dir) = store_in_tempdir();
        store
            .save(&PersistedConfig {
                on: true,
                config: Some(AlarmSettings::default().config(
                    Position::new(0.0, 0.0),
                    100.0,
                    None,
                )),
            })
            .unwrap();
        let off = PersistedConfig {
            on: false,
            config: None,
        };
        store.save(&off).unwrap();
        assert_eq!(store.load(), Some(off));
    }
}
