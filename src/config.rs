use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::cli::ConfigCommand;

const CONFIG_FILE_BASENAME: &str = "config.yaml";
const PROFILES_SUBDIR: [&str; 2] = ["resources", "profiles"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub profiles: ProfilesConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilesConfig {
    /// Checkout of the slicer repository; profiles live under
    /// `resources/profiles` inside it.
    #[serde(default)]
    pub repo_path: Option<PathBuf>,
    #[serde(default)]
    pub default_vendor: Option<String>,
    /// Key definitions file used to normalize values for display.
    #[serde(default)]
    pub definitions_path: Option<PathBuf>,
    /// Command used by `profile open`, e.g. `code --wait`.
    #[serde(default)]
    pub editor: Option<String>,
}

impl ProfilesConfig {
    pub fn profiles_root(&self) -> Option<PathBuf> {
        self.repo_path.as_ref().map(|repo| {
            PROFILES_SUBDIR
                .iter()
                .fold(expand_home(repo), |path, part| path.join(part))
        })
    }

    pub fn definitions_path(&self) -> Option<PathBuf> {
        self.definitions_path.as_deref().map(expand_home)
    }

    /// Program and leading arguments for opening a profile file. Falls back to
    /// `$VISUAL`, then `$EDITOR`, then the platform's default opener.
    pub fn editor_command(&self) -> Vec<String> {
        let configured = self
            .editor
            .clone()
            .or_else(|| env::var("VISUAL").ok())
            .or_else(|| env::var("EDITOR").ok())
            .filter(|editor| !editor.trim().is_empty());
        match configured {
            Some(editor) => split_editor(&editor),
            None => platform_opener(),
        }
    }
}

fn split_editor(editor: &str) -> Vec<String> {
    let mut parts: Vec<String> = editor.split_whitespace().map(str::to_string).collect();
    if let Some(program) = parts.first_mut() {
        *program = expand_home(Path::new(program.as_str()))
            .to_string_lossy()
            .into_owned();
    }
    parts
}

fn platform_opener() -> Vec<String> {
    let parts: &[&str] = if cfg!(target_os = "windows") {
        &["cmd", "/c", "start", ""]
    } else if cfg!(target_os = "macos") {
        &["open"]
    } else {
        &["xdg-open"]
    };
    parts.iter().map(|part| part.to_string()).collect()
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub user_config_dir: PathBuf,
}

impl ConfigPaths {
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.user_config_dir).with_context(|| {
            format!(
                "failed to create user config dir at {:?}",
                self.user_config_dir
            )
        })?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct ConfigManager {
    paths: ConfigPaths,
    file_name: String,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        let project_dirs = ProjectDirs::from("org", "profilegraph", "profilegraph")
            .context("unable to resolve project directories")?;
        Ok(Self::from_dir(project_dirs.config_dir().to_path_buf()))
    }

    pub fn from_dir(user_config_dir: PathBuf) -> Self {
        Self::with_file_name(user_config_dir, CONFIG_FILE_BASENAME)
    }

    pub fn with_file_name(user_config_dir: PathBuf, file_name: &str) -> Self {
        Self {
            paths: ConfigPaths { user_config_dir },
            file_name: file_name.to_string(),
        }
    }

    pub fn load(&self) -> Result<AppConfig> {
        self.paths.ensure()?;
        let path = self.config_path();
        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file at {:?}", path))?;
            let config: AppConfig = if is_toml(&path) {
                toml::from_str(&contents).context("failed to parse TOML config")?
            } else {
                serde_yaml::from_str(&contents).context("failed to parse YAML config")?
            };
            Ok(config)
        } else {
            let config = AppConfig::default();
            self.save(&config)?;
            Ok(config)
        }
    }

    pub fn save(&self, config: &AppConfig) -> Result<()> {
        self.paths.ensure()?;
        let path = self.config_path();
        let encoded = if is_toml(&path) {
            toml::to_string_pretty(config).context("failed to serialize config to TOML")?
        } else {
            serde_yaml::to_string(config).context("failed to serialize config to YAML")?
        };
        let mut file = fs::File::create(&path)
            .with_context(|| format!("failed to open config file at {:?}", path))?;
        file.write_all(encoded.as_bytes())
            .with_context(|| format!("failed to write config file at {:?}", path))?;
        Ok(())
    }

    pub fn reset(&self) -> Result<AppConfig> {
        let config = AppConfig::default();
        self.save(&config)?;
        Ok(config)
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        self.paths.user_config_dir.join(&self.file_name)
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("toml")
}

pub fn handle_config(
    command: ConfigCommand,
    manager: &ConfigManager,
    config: &mut AppConfig,
) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            println!(
                "{}",
                serde_yaml::to_string(config).context("failed to serialize config for display")?
            );
        }
        ConfigCommand::Paths => {
            println!("config: {:?}", manager.config_path());
            match config.profiles.profiles_root() {
                Some(root) => println!("profiles: {:?}", root),
                None => println!("profiles: (repo_path not set)"),
            }
            if let Some(definitions) = config.profiles.definitions_path() {
                println!("definitions: {:?}", definitions);
            }
            println!("editor: {}", config.profiles.editor_command().join(" "));
        }
        ConfigCommand::Reset => {
            *config = manager.reset()?;
            println!("configuration reset to defaults");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_load_writes_defaults() {
        let temp = TempDir::new().expect("temp dir");
        let manager = ConfigManager::from_dir(temp.path().join("cfg"));
        let config = manager.load().expect("load");
        assert!(config.profiles.repo_path.is_none());
        assert!(manager.config_path().exists());
    }

    #[test]
    fn round_trips_toml_config() {
        let temp = TempDir::new().expect("temp dir");
        let manager = ConfigManager::with_file_name(temp.path().to_path_buf(), "config.toml");
        let mut config = AppConfig::default();
        config.profiles.repo_path = Some(PathBuf::from("/src/slicer"));
        config.profiles.default_vendor = Some("Voron".into());
        manager.save(&config).expect("save");

        let loaded = manager.load().expect("load");
        assert_eq!(loaded.profiles.default_vendor.as_deref(), Some("Voron"));
        assert_eq!(
            loaded.profiles.profiles_root(),
            Some(PathBuf::from("/src/slicer/resources/profiles"))
        );
    }

    #[test]
    fn leaves_plain_paths_alone() {
        assert_eq!(expand_home(Path::new("/abs/path")), PathBuf::from("/abs/path"));
        assert_eq!(expand_home(Path::new("rel/~x")), PathBuf::from("rel/~x"));
    }

    #[test]
    fn configured_editor_wins_and_expands_home() {
        let config = ProfilesConfig {
            editor: Some("/usr/bin/nano  -w".into()),
            ..ProfilesConfig::default()
        };
        assert_eq!(config.editor_command(), vec!["/usr/bin/nano", "-w"]);

        if let Some(home) = dirs::home_dir() {
            let config = ProfilesConfig {
                editor: Some("~/bin/edit --wait".into()),
                ..ProfilesConfig::default()
            };
            let command = config.editor_command();
            assert_eq!(PathBuf::from(&command[0]), home.join("bin/edit"));
            assert_eq!(command[1], "--wait");
        }
    }

    #[test]
    fn editor_survives_yaml_round_trip() {
        let temp = TempDir::new().expect("temp dir");
        let manager = ConfigManager::from_dir(temp.path().to_path_buf());
        let mut config = AppConfig::default();
        config.profiles.editor = Some("vim".into());
        manager.save(&config).expect("save");
        let loaded = manager.load().expect("load");
        assert_eq!(loaded.profiles.editor.as_deref(), Some("vim"));
    }
}
