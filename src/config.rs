use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Keys accepted by `config get` / `config set`.
pub const KEYS: [&str; 4] = ["root_dir", "clone.default_options", "git.timeout_secs", "git.jobs"];

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Config {
    pub version: u32,
    pub root_dir: PathBuf,
    #[serde(default)]
    pub clone: CloneConfig,
    #[serde(default)]
    pub git: GitConfig,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CloneConfig {
    /// Extra arguments for every `git clone`, whitespace separated.
    pub default_options: String,
}

#[serde_as]
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct GitConfig {
    /// Kill any single git command running longer than this.
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    #[serde(rename = "timeout_secs", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    /// Maximum concurrent repositories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            root_dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("git-repos"),
            clone: CloneConfig::default(),
            git: GitConfig::default(),
        }
    }
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            default_options: "--recurse-submodules".to_string(),
        }
    }
}

impl CloneConfig {
    pub fn options(&self) -> Vec<String> {
        self.default_options.split_whitespace().map(str::to_string).collect()
    }
}

pub fn get_default_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("", "", "gitfleet")
        .context("Failed to determine project directories")?;

    let config_dir = proj_dirs.config_dir();
    Ok(config_dir.join("gitfleet.toml"))
}

pub fn resolve_path(config_path: Option<PathBuf>) -> Result<PathBuf> {
    match config_path {
        Some(p) => Ok(p),
        None => get_default_config_path(),
    }
}

impl Config {
    /// Read the config file, writing the defaults first if it does not exist.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let path = resolve_path(config_path)?;

        if !path.exists() {
            let default_config = Config::default();
            default_config.save(&path)?;
            return Ok(default_config);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Load the file and apply command-line overrides.
    pub fn from_cli_and_file(root_dir: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::load(config_path)?;

        if let Some(root_dir) = root_dir {
            config.root_dir = root_dir;
        }

        Ok(config)
    }

    /// Value of one dotted key as it would be written on the command line.
    /// Unset optional keys read as an empty string.
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "root_dir" => self.root_dir.display().to_string(),
            "clone.default_options" => self.clone.default_options.clone(),
            "git.timeout_secs" => self
                .git
                .timeout
                .map(|t| t.as_secs().to_string())
                .unwrap_or_default(),
            "git.jobs" => self.git.jobs.map(|j| j.to_string()).unwrap_or_default(),
            _ => bail!("Unknown config key '{key}' (known keys: {})", KEYS.join(", ")),
        };
        Ok(value)
    }

    /// Set one dotted key. An empty value clears optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "root_dir" => {
                if value.trim().is_empty() {
                    bail!("root_dir cannot be empty");
                }
                self.root_dir = PathBuf::from(value);
            }
            "clone.default_options" => self.clone.default_options = value.to_string(),
            "git.timeout_secs" => {
                self.git.timeout = parse_optional::<u64>(key, value)?.map(Duration::from_secs);
            }
            "git.jobs" => {
                let jobs = parse_optional::<usize>(key, value)?;
                if jobs == Some(0) {
                    bail!("git.jobs must be at least 1");
                }
                self.git.jobs = jobs;
            }
            _ => bail!("Unknown config key '{key}' (known keys: {})", KEYS.join(", ")),
        }
        Ok(())
    }
}

fn parse_optional<T: std::str::FromStr>(key: &str, value: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .with_context(|| format!("Invalid value for {key}: '{value}'"))
}
