use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::emit::DEFAULT_OUTPUT_DIR;

pub const CONFIG_ENV: &str = "NATIVE_PREP_CONFIG";
pub const PROJECT_CONFIG_FILE: &str = "native-prep.toml";

#[derive(Debug, Default, Deserialize)]
pub struct NativePrepConfig {
    #[serde(default)]
    pub emit: EmitSection,
    #[serde(default)]
    pub validate: ValidateSection,
}

#[derive(Debug, Deserialize)]
pub struct EmitSection {
    /// Directory receiving the native-image metadata files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Optional inventory TOML replacing the built-in BoofCV inventory. A relative path
    /// is resolved against the directory of the config file declaring it.
    #[serde(default)]
    pub inventory: Option<PathBuf>,
}

impl EmitSection {
    fn anchor_to(&mut self, base: &Path) {
        if let Some(inventory) = self.inventory.as_mut()
            && inventory.is_relative()
        {
            *inventory = base.join(&*inventory);
        }
    }
}

impl Default for EmitSection {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            inventory: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidateSection {
    /// Build descriptor that must exist in the project root.
    pub marker: PathBuf,
    /// Build tool invocation prefix (`./mvnw`, `mvn`, `sh ./mvnw`, ...).
    pub build_tool: String,
    /// Extra arguments for the native packaging step.
    pub native_args: String,
    /// Expected native binary, relative to the project root.
    pub artifact: PathBuf,
    pub smoke_timeout_secs: u64,
}

impl Default for ValidateSection {
    fn default() -> Self {
        Self {
            marker: PathBuf::from("pom.xml"),
            build_tool: "./mvnw".to_string(),
            native_args: "-Dnative -DskipTests=true".to_string(),
            artifact: PathBuf::from("target/qrcode-server-1.0-SNAPSHOT-runner"),
            smoke_timeout_secs: 10,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

pub fn load() -> Result<NativePrepConfig> {
    let path_override = std::env::var(CONFIG_ENV).ok();
    load_from(path_override.as_deref())
}

pub fn load_from(path_override: Option<&str>) -> Result<NativePrepConfig> {
    let Some(path) = config_path_override(path_override) else {
        return Ok(NativePrepConfig::default());
    };

    if !path.exists() {
        return Ok(NativePrepConfig::default());
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let mut config: NativePrepConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config at {}", path.display()))?;
    if let Some(base) = path.parent() {
        config.emit.anchor_to(base);
    }
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

fn config_path_override(path_override: Option<&str>) -> Option<PathBuf> {
    if let Some(raw) = path_override {
        return Some(PathBuf::from(raw));
    }
    config_path()
}

pub fn config_path() -> Option<PathBuf> {
    // Project-local file wins over the per-user one.
    let local = PathBuf::from(PROJECT_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir().map(|mut dir| {
        dir.push("native-prep");
        dir.push("config.toml");
        dir
    })
}
