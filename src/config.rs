/**
 * The learner's settings, kept as `settings.json` in the application directory.
 */
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use super::common::{DrillError, Result};
use super::difficulty::{Thresholds, DEFAULT_LOWER_THRESHOLD, DEFAULT_RAISE_THRESHOLD};
use super::quiz::Difficulty;
use super::repetition::ExhaustionPolicy;


/// Either a fixed difficulty or `adaptive`, which starts from standard and lets recent
/// accuracy move it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DifficultySetting {
    Easy,
    Standard,
    Hard,
    Adaptive,
}


impl DifficultySetting {
    /// The base tier and whether to adapt it.
    pub fn resolve(self) -> (Difficulty, bool) {
        match self {
            DifficultySetting::Easy => (Difficulty::Easy, false),
            DifficultySetting::Standard => (Difficulty::Standard, false),
            DifficultySetting::Hard => (Difficulty::Hard, false),
            DifficultySetting::Adaptive => (Difficulty::Standard, true),
        }
    }
}


#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Json,
    Sqlite,
}


#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Questions per practice session.
    #[serde(deserialize_with = "clamped_count")]
    pub per_quiz: usize,
    /// Questions per exam.
    #[serde(deserialize_with = "clamped_count")]
    pub per_exam: usize,
    /// Questions in the daily challenge.
    #[serde(deserialize_with = "clamped_count")]
    pub per_daily: usize,
    /// Avoid asking the same question twice until every question has been asked.
    pub no_repeats: bool,
    pub difficulty: DifficultySetting,
    /// Number of recent answers that decide the difficulty.
    #[serde(deserialize_with = "clamped_count")]
    pub accuracy_window: usize,
    /// Number of recent answers per area that decide the area's weight.
    #[serde(deserialize_with = "clamped_count")]
    pub weakness_window: usize,
    pub raise_threshold: f64,
    pub lower_threshold: f64,
    pub exhaustion_policy: ExhaustionPolicy,
    pub backend: Backend,
}


impl Default for Settings {
    fn default() -> Self {
        Settings {
            per_quiz: 10,
            per_exam: 20,
            per_daily: 6,
            no_repeats: true,
            difficulty: DifficultySetting::Standard,
            accuracy_window: 10,
            weakness_window: 50,
            raise_threshold: DEFAULT_RAISE_THRESHOLD,
            lower_threshold: DEFAULT_LOWER_THRESHOLD,
            exhaustion_policy: ExhaustionPolicy::Reuse,
            backend: Backend::Json,
        }
    }
}


impl Settings {
    /// Load the settings at `path`, or the defaults if there is no such file.
    pub fn load(path: &Path) -> Result<Settings> {
        match fs::read_to_string(path) {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(_) => Ok(Settings::default()),
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds { raise: self.raise_threshold, lower: self.lower_threshold }
    }
}


/// Counts may be written as any integer; negative ones mean zero.
fn clamped_count<'de, D: Deserializer<'de>>(deserializer: D) -> ::std::result::Result<usize, D::Error> {
    let n = i64::deserialize(deserializer)?;
    Ok(if n < 0 { 0 } else { n as usize })
}


/// Return the path to the directory where settings and progress are kept.
pub fn get_app_dir_path(directory: Option<&Path>) -> PathBuf {
    if let Some(directory) = directory {
        return directory.to_path_buf();
    }
    let mut dirpath = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    dirpath.push("adaptive-drill");
    dirpath
}


/// Create the application directory at `dir` if it does not already exist.
pub fn require_app_dir_path(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|_| DrillError::CannotMakeAppDir(dir.to_path_buf()))?;
    }
    Ok(())
}


pub fn get_settings_path(dir: &Path) -> PathBuf {
    dir.join("settings.json")
}


pub fn get_store_path(dir: &Path, backend: Backend) -> PathBuf {
    match backend {
        Backend::Json => dir.join("store.json"),
        Backend::Sqlite => dir.join("store.sqlite3"),
    }
}
