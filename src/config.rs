use crate::error::{Result, RunnerError};
use crate::options::{Mode, OptionValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "repkg-runner.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub tool: ToolConfig,
    pub run: RunConfig,
    pub extract: BTreeMap<String, OptionValue>,
    pub info: BTreeMap<String, OptionValue>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Explicit RePKG executable; defaults to one beside this program.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub log_enabled: bool,
    pub log_file: PathBuf,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub mode: Mode,
    pub output_dir: PathBuf,
    pub extensions: Vec<String>,
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool: ToolConfig::default(),
            run: RunConfig::default(),
            extract: default_extract_options(),
            info: default_info_options(),
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            path: None,
            log_enabled: true,
            log_file: PathBuf::from("logs.txt"),
            poll_interval_ms: 50,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Extract,
            output_dir: PathBuf::from("output"),
            extensions: vec!["pkg".to_string(), "tex".to_string()],
            max_depth: 32,
        }
    }
}

fn default_extract_options() -> BTreeMap<String, OptionValue> {
    let mut options = BTreeMap::new();
    for key in [
        "recursive",
        "tex",
        "singledir",
        "usename",
        "no_tex_convert",
        "overwrite",
        "copyproject",
    ] {
        options.insert(key.to_string(), OptionValue::Flag(false));
    }
    options.insert("exts_only".to_string(), OptionValue::Text(String::new()));
    options.insert("exts_ignore".to_string(), OptionValue::Text(String::new()));
    options
}

fn default_info_options() -> BTreeMap<String, OptionValue> {
    let mut options = BTreeMap::new();
    options.insert("recursive".to_string(), OptionValue::Flag(false));
    options.insert("sortby".to_string(), OptionValue::Text("name".to_string()));
    options.insert("sort".to_string(), OptionValue::Flag(true));
    options.insert("printentries".to_string(), OptionValue::Flag(true));
    options.insert("info_tex".to_string(), OptionValue::Flag(false));
    options.insert("projectinfo".to_string(), OptionValue::Text(String::new()));
    options.insert("title_filter".to_string(), OptionValue::Text(String::new()));
    options
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(RunnerError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| RunnerError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| RunnerError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = [DEFAULT_CONFIG_FILE, ".repkg-runner.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        tracing::debug!(path = default_path, "loading configuration");
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref tool_path) = cli_args.tool_path {
            self.tool.path = Some(tool_path.clone());
        }

        if let Some(mode) = cli_args.mode {
            self.run.mode = mode;
        }

        if let Some(ref output_dir) = cli_args.output_dir {
            self.run.output_dir = output_dir.clone();
        }

        if let Some(ref extensions) = cli_args.extensions {
            self.run.extensions = extensions
                .split(',')
                .map(|s| s.trim().trim_start_matches('.').to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(log_enabled) = cli_args.log_enabled {
            self.tool.log_enabled = log_enabled;
        }

        if let Some(ref log_file) = cli_args.log_file {
            self.tool.log_file = log_file.clone();
        }

        let mode = self.run.mode;
        let options = self.options_for_mut(mode);
        for (key, value) in &cli_args.options {
            options.insert(key.clone(), value.clone());
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| RunnerError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| RunnerError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.run.extensions.is_empty() {
            return Err(RunnerError::Config {
                message: "At least one input file extension must be specified".to_string(),
            });
        }

        if self.tool.poll_interval_ms == 0 {
            return Err(RunnerError::Config {
                message: "Process poll interval must be greater than 0".to_string(),
            });
        }

        if self.run.max_depth == 0 {
            return Err(RunnerError::Config {
                message: "Maximum directory depth must be greater than 0".to_string(),
            });
        }

        if self.run.output_dir.as_os_str().is_empty() {
            return Err(RunnerError::Config {
                message: "Output directory cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn options_for(&self, mode: Mode) -> &BTreeMap<String, OptionValue> {
        match mode {
            Mode::Extract => &self.extract,
            Mode::Info => &self.info,
        }
    }

    pub fn options_for_mut(&mut self, mode: Mode) -> &mut BTreeMap<String, OptionValue> {
        match mode {
            Mode::Extract => &mut self.extract,
            Mode::Info => &mut self.info,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.tool.poll_interval_ms)
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub tool_path: Option<PathBuf>,
    pub mode: Option<Mode>,
    pub output_dir: Option<PathBuf>,
    pub extensions: Option<String>,
    pub log_enabled: Option<bool>,
    pub log_file: Option<PathBuf>,
    pub options: BTreeMap<String, OptionValue>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool_path(mut self, tool_path: Option<PathBuf>) -> Self {
        self.tool_path = tool_path;
        self
    }

    pub fn with_mode(mut self, mode: Option<Mode>) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_extensions(mut self, extensions: Option<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_log_enabled(mut self, log_enabled: Option<bool>) -> Self {
        self.log_enabled = log_enabled;
        self
    }

    pub fn with_log_file(mut self, log_file: Option<PathBuf>) -> Self {
        self.log_file = log_file;
        self
    }

    pub fn with_option<S: Into<String>>(mut self, key: S, value: OptionValue) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

/// File-backed settings with dotted-key access (`run.output_dir`,
/// `extract.overwrite`, ...).
///
/// Changes made through [`ConfigStore::set`] stay in memory until
/// [`ConfigStore::persist`] writes them back.
pub struct ConfigStore {
    path: PathBuf,
    config: Config,
    dirty: bool,
}

impl ConfigStore {
    /// Opens `path`, starting from defaults when the file does not exist yet.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let config = if path.exists() {
            Config::load_from_file(&path)?
        } else {
            Config::default()
        };

        Ok(Self {
            path,
            config,
            dirty: false,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get(&self, key: &str, default: &str) -> String {
        let Ok(root) = toml::Value::try_from(&self.config) else {
            return default.to_string();
        };

        let mut current = &root;
        for segment in key.split('.') {
            match current.get(segment) {
                Some(value) => current = value,
                None => return default.to_string(),
            }
        }

        render_value(current)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (section, field) = key.split_once('.').ok_or_else(|| RunnerError::Config {
            message: format!("Setting keys have the form section.name, got '{}'", key),
        })?;

        let mut root = toml::Value::try_from(&self.config).map_err(|e| RunnerError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        let table = root
            .get_mut(section)
            .and_then(toml::Value::as_table_mut)
            .ok_or_else(|| RunnerError::Config {
                message: format!("Unknown configuration section '{}'", section),
            })?;

        let parsed = match table.get(field) {
            Some(toml::Value::Boolean(_)) => {
                let flag = value.trim().parse::<bool>().map_err(|_| RunnerError::Config {
                    message: format!("'{}' expects true or false, got '{}'", key, value),
                })?;
                toml::Value::Boolean(flag)
            }
            Some(toml::Value::Integer(_)) => {
                let number = value.trim().parse::<i64>().map_err(|_| RunnerError::Config {
                    message: format!("'{}' expects a whole number, got '{}'", key, value),
                })?;
                toml::Value::Integer(number)
            }
            Some(toml::Value::Array(_)) => toml::Value::Array(
                value
                    .split(',')
                    .map(|item| item.trim())
                    .filter(|item| !item.is_empty())
                    .map(|item| toml::Value::String(item.to_string()))
                    .collect(),
            ),
            _ => match OptionValue::parse(value) {
                OptionValue::Flag(flag) => toml::Value::Boolean(flag),
                OptionValue::Text(text) => toml::Value::String(text),
            },
        };

        table.insert(field.to_string(), parsed);

        let config: Config = root.try_into().map_err(|e: toml::de::Error| RunnerError::Config {
            message: format!("Invalid value for '{}': {}", key, e),
        })?;
        config.validate()?;

        self.config = config;
        self.dirty = true;
        Ok(())
    }

    pub fn persist(&mut self) -> Result<()> {
        self.config.save_to_file(&self.path)?;
        self.dirty = false;
        tracing::debug!(path = %self.path.display(), "configuration saved");
        Ok(())
    }
}

fn render_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(text) => text.clone(),
        toml::Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}
