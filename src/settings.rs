use std::{
    env, fs,
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use log::{info, warn};

use crate::error::{HarnessError, HarnessResult};
use crate::models::Config;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Reads and writes the single config file.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the config, returning defaults when no file exists yet.
    ///
    /// Only a file that is not a JSON object at all is an error; individual
    /// fields fall back to their defaults.
    pub fn load(&self) -> HarnessResult<Config> {
        if !self.path.exists() {
            info!(
                "No config at {}; starting from defaults",
                self.path.display()
            );
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(&self.path)
            .map_err(|err| HarnessError::persistence(&self.path, err))?;

        serde_json::from_str(&contents).map_err(|source| HarnessError::MalformedConfig {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes the config in full.
    ///
    /// The new content goes to a sibling temp file first and is renamed over
    /// the old one, so a failed save leaves the previous file intact.
    pub fn save(&self, config: &Config) -> HarnessResult<()> {
        let serialized = serde_json::to_string_pretty(config)
            .map_err(|err| HarnessError::persistence(&self.path, err.into()))?;

        let tmp_path = self.tmp_path();
        let written = fs::File::create(&tmp_path)
            .and_then(|mut file| {
                file.write_all(serialized.as_bytes())?;
                file.sync_all()
            })
            .and_then(|_| fs::rename(&tmp_path, &self.path));

        if let Err(err) = written {
            if tmp_path.exists() {
                if let Err(cleanup) = fs::remove_file(&tmp_path) {
                    warn!("Failed to remove {}: {cleanup}", tmp_path.display());
                }
            }
            return Err(HarnessError::persistence(&self.path, err));
        }

        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Runtime knobs for the harness itself, independent of the persisted config.
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub config_path: PathBuf,
    pub report_dir: PathBuf,
    /// Upper bound on one blocking serial read.
    pub read_timeout: Duration,
    /// Pause between polls while the port has nothing buffered.
    pub idle_poll_interval: Duration,
    /// Trace every raw frame received.
    pub debug: bool,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            report_dir: PathBuf::from("."),
            read_timeout: Duration::from_secs(1),
            idle_poll_interval: Duration::from_millis(10),
            debug: false,
        }
    }
}

impl HarnessOptions {
    /// Defaults overridden by `LOADCELL_CONFIG`, `LOADCELL_REPORT_DIR` and
    /// `LOADCELL_DEBUG`.
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(path) = env::var("LOADCELL_CONFIG") {
            options.config_path = PathBuf::from(path);
        }
        if let Ok(dir) = env::var("LOADCELL_REPORT_DIR") {
            options.report_dir = PathBuf::from(dir);
        }
        options.debug = env::var("LOADCELL_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        options
    }
}
