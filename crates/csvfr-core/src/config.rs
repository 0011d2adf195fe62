//! Run configuration: TOML file, defaults, and first-run bootstrap

use crate::error::{Error, Result};
use crate::pattern::ReportOrder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Placeholder substituted with the work directory inside path settings
pub const WORK_DIR_VAR: &str = "${work_dir}";

/// Name of the config file created inside the work directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Text written when no config file exists yet
pub const DEFAULT_CONFIG: &str = r#"[common]
# Verbosity level: 0 - quiet, 3 - very verbose
verbose = 3

# Match patterns ignoring letter case
case_insensitive = false

# Log throughput every N lines, 0 disables
throughput_every = 0

# Number of samples the throughput average is smoothed over
throughput_window = 10

# Order of the statistics file: "insertion" (find-replace file order) or "length"
report_order = "insertion"

# Create empty input/find-replace files when they are missing
create_missing = true

[file_paths]
# Directory for outputs and this config file
work_dir = "output-csv-bulk-find-and-replace"

# Which file to process
input_file = "input.csv"

# Pairs of find and replace strings: what to search for in the first column,
# what to put instead in the second
find_replace_file = "findreplace.csv"

# Where to save the processed table
output_file = "${work_dir}/output.csv"

# Find-replace pairs with the number of replacements each one made
find_replace_sorted_file = "${work_dir}/findreplace.csv"
"#;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub common: CommonConfig,
    pub file_paths: FilePaths,
}

/// General behavior settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonConfig {
    /// 0 quiet, 1 warnings, 2 progress, 3 debug dumps
    pub verbose: u8,
    pub case_insensitive: bool,
    /// Lines between throughput samples, 0 disables sampling
    pub throughput_every: u64,
    pub throughput_window: usize,
    pub report_order: ReportOrder,
    pub create_missing: bool,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            verbose: 3,
            case_insensitive: false,
            throughput_every: 0,
            throughput_window: 10,
            report_order: ReportOrder::Insertion,
            create_missing: true,
        }
    }
}

/// File locations; any value may contain `${work_dir}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePaths {
    pub work_dir: String,
    pub input_file: String,
    pub find_replace_file: String,
    pub output_file: String,
    pub find_replace_sorted_file: String,
}

impl Default for FilePaths {
    fn default() -> Self {
        Self {
            work_dir: "output-csv-bulk-find-and-replace".to_string(),
            input_file: "input.csv".to_string(),
            find_replace_file: "findreplace.csv".to_string(),
            output_file: format!("{WORK_DIR_VAR}/output.csv"),
            find_replace_sorted_file: format!("{WORK_DIR_VAR}/findreplace.csv"),
        }
    }
}

impl Config {
    /// Parse a config from TOML text; `path` only labels errors
    pub fn from_toml_str<P: AsRef<Path>>(content: &str, path: P) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config {
            path: path.as_ref().to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load a config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Save the config as TOML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| Error::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Expand `${work_dir}` in a path setting
    pub fn resolve(&self, raw: &str) -> PathBuf {
        PathBuf::from(raw.replace(WORK_DIR_VAR, &self.file_paths.work_dir))
    }

    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.file_paths.work_dir)
    }

    pub fn input_path(&self) -> PathBuf {
        self.resolve(&self.file_paths.input_file)
    }

    pub fn find_replace_path(&self) -> PathBuf {
        self.resolve(&self.file_paths.find_replace_file)
    }

    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.file_paths.output_file)
    }

    pub fn stats_path(&self) -> PathBuf {
        self.resolve(&self.file_paths.find_replace_sorted_file)
    }

    /// Where the config file lives when no path is given
    pub fn default_config_path(&self) -> PathBuf {
        self.work_dir().join(CONFIG_FILE_NAME)
    }
}

/// Load the run configuration, creating it on first use
///
/// When `explicit` is `None` the config file is `<work_dir>/config.toml` of
/// the default work directory, which is created if needed. A missing config
/// file is written with [`DEFAULT_CONFIG`] and the defaults are used; an
/// existing one is loaded. Returns the config and the path it came from.
pub fn bootstrap(explicit: Option<&Path>) -> Result<(Config, PathBuf)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let defaults = Config::default();
            create_dir(&defaults.work_dir())?;
            defaults.default_config_path()
        }
    };

    let config = if path.is_file() {
        info!("loading configuration from {}", path.display());
        Config::load(&path)?
    } else {
        fs::write(&path, DEFAULT_CONFIG).map_err(|e| Error::FileWrite {
            path: path.clone(),
            source: e,
        })?;
        info!(
            "created config file {} ({} bytes)",
            path.display(),
            DEFAULT_CONFIG.len()
        );
        Config::from_toml_str(DEFAULT_CONFIG, &path)?
    };

    Ok((config, path))
}

/// Create a directory and its parents
pub(crate) fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::FileWrite {
        path: dir.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_text_matches_defaults() {
        let parsed = Config::from_toml_str(DEFAULT_CONFIG, "default.toml").unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = Config::from_toml_str(
            "[common]\ncase_insensitive = true\n",
            "partial.toml",
        )
        .unwrap();

        assert!(config.common.case_insensitive);
        assert_eq!(config.common.verbose, 3);
        assert_eq!(config.file_paths, FilePaths::default());
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = Config::from_toml_str("", "empty.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_config_reports_path() {
        let err = Config::from_toml_str("[common]\nverbose = \"loud\"\n", "bad.toml").unwrap_err();
        assert!(matches!(err, Error::Config { path, .. } if path == Path::new("bad.toml")));
    }

    #[test]
    fn test_work_dir_substitution() {
        let mut config = Config::default();
        config.file_paths.work_dir = "out".to_string();

        assert_eq!(config.output_path(), PathBuf::from("out/output.csv"));
        assert_eq!(config.stats_path(), PathBuf::from("out/findreplace.csv"));
        assert_eq!(config.input_path(), PathBuf::from("input.csv"));
        assert_eq!(config.default_config_path(), PathBuf::from("out").join("config.toml"));
    }

    #[test]
    fn test_report_order_setting() {
        let config = Config::from_toml_str("[common]\nreport_order = \"length\"\n", "c.toml").unwrap();
        assert_eq!(config.common.report_order, ReportOrder::Length);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");

        let mut config = Config::default();
        config.common.throughput_every = 500;
        config.file_paths.input_file = "data.csv".to_string();
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_bootstrap_creates_then_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");

        let (created, used) = bootstrap(Some(&path)).unwrap();
        assert_eq!(used, path);
        assert_eq!(created, Config::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);

        fs::write(&path, "[common]\nverbose = 1\n").unwrap();
        let (loaded, _) = bootstrap(Some(&path)).unwrap();
        assert_eq!(loaded.common.verbose, 1);
    }
}
