use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".roadmap-tracker";
const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_KEY_PREFIX: &str = "java-roadmap";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub export_dir: PathBuf,
    pub curriculum_path: Option<PathBuf>,
    pub api_port: u16,
    pub key_prefix: String,
    pub clear_resets_last_activity: bool,
    pub allow_unknown_ids: bool,
}

impl Default for Config {
    fn default() -> Self {
        let root = default_root_dir();

        Self {
            db_path: root.join("db").join("progress.db"),
            export_dir: default_export_dir(),
            curriculum_path: None,
            api_port: 7891,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            clear_resets_last_activity: false,
            allow_unknown_ids: false,
        }
    }
}

impl Config {
    pub fn root_dir() -> Result<PathBuf> {
        Ok(default_root_dir())
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(&config_path)?;

        Ok(())
    }

    pub fn ensure_bootstrap_files(&self) -> Result<()> {
        let root = Self::root_dir()?;
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create root directory: {}", root.display()))?;

        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        fs::create_dir_all(&self.export_dir).with_context(|| {
            format!(
                "Failed to create export directory: {}",
                self.export_dir.display()
            )
        })?;

        Ok(())
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "db_path" => {
                self.db_path = expand_home(value.trim());
            }
            "export_dir" => {
                self.export_dir = expand_home(value.trim());
            }
            "curriculum_path" => {
                let trimmed = value.trim();
                self.curriculum_path = (!trimmed.is_empty()).then(|| expand_home(trimmed));
            }
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            "key_prefix" => {
                let prefix = value.trim();
                if prefix.is_empty() {
                    bail!("key_prefix must not be empty");
                }
                self.key_prefix = prefix.to_string();
            }
            "clear_resets_last_activity" => {
                self.clear_resets_last_activity = value
                    .parse::<bool>()
                    .map_err(|_| anyhow!("clear_resets_last_activity must be true/false"))?;
            }
            "allow_unknown_ids" => {
                self.allow_unknown_ids = value
                    .parse::<bool>()
                    .map_err(|_| anyhow!("allow_unknown_ids must be true/false"))?;
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: db_path|db.path, export_dir|export.dir, curriculum_path|curriculum.path, api_port|api.port, key_prefix|storage.prefix, clear_resets_last_activity|clear.reset_last_activity, allow_unknown_ids|ids.allow_unknown"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "db_path" => Some(self.db_path.display().to_string()),
            "export_dir" => Some(self.export_dir.display().to_string()),
            "curriculum_path" => Some(
                self.curriculum_path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "embedded".to_string()),
            ),
            "api_port" => Some(self.api_port.to_string()),
            "key_prefix" => Some(self.key_prefix.clone()),
            "clear_resets_last_activity" => Some(self.clear_resets_last_activity.to_string()),
            "allow_unknown_ids" => Some(self.allow_unknown_ids.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "db_path" | "db.path" => "db_path",
        "export_dir" | "export.dir" => "export_dir",
        "curriculum_path" | "curriculum.path" => "curriculum_path",
        "api_port" | "api.port" => "api_port",
        "key_prefix" | "storage.prefix" => "key_prefix",
        "clear_resets_last_activity" | "clear.reset_last_activity" => "clear_resets_last_activity",
        "allow_unknown_ids" | "ids.allow_unknown" => "allow_unknown_ids",
        _ => key,
    }
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

pub fn default_export_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("RoadmapTracker")
        .join("exports")
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Config;
    use std::path::PathBuf;

    #[test]
    fn dotted_aliases_reach_the_same_field() {
        let mut config = Config::default();
        config.set_value("api.port", "8088").expect("port accepted");

        assert_eq!(config.api_port, 8088);
        assert_eq!(config.get_value("api_port").as_deref(), Some("8088"));
    }

    #[test]
    fn rejects_invalid_values() {
        let mut config = Config::default();

        assert!(config.set_value("api_port", "not-a-port").is_err());
        assert!(config.set_value("allow_unknown_ids", "maybe").is_err());
        assert!(config.set_value("key_prefix", "   ").is_err());
        assert!(config.set_value("storage.backend", "indexeddb").is_err());
    }

    #[test]
    fn empty_curriculum_path_falls_back_to_embedded() {
        let mut config = Config::default();
        config
            .set_value("curriculum.path", "/tmp/custom.json")
            .expect("path accepted");
        assert_eq!(config.curriculum_path, Some(PathBuf::from("/tmp/custom.json")));

        config.set_value("curriculum_path", "").expect("reset accepted");
        assert_eq!(config.curriculum_path, None);
        assert_eq!(
            config.get_value("curriculum_path").as_deref(),
            Some("embedded")
        );
    }

    #[test]
    fn defaults_keep_last_activity_on_clear() {
        let config: Config = serde_json::from_str("{}").expect("defaults fill every field");

        assert!(!config.clear_resets_last_activity);
        assert!(!config.allow_unknown_ids);
        assert_eq!(config.key_prefix, "java-roadmap");
    }
}
