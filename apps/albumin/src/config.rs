//! # Configuration
//!
//! Resolution order (highest priority first):
//! 1. CLI flags (applied via [`AlbuminConfig::apply_overrides`])
//! 2. Environment variables (`ALBUMIN_TIMEZONE`, `ALBUMIN_REPO`)
//! 3. Config file (`--config`, else `albumin.toml` in the repository)
//! 4. Compiled defaults

use albumin_core::primitives::STOP_TIMEOUT;
use albumin_core::{AlbuminError, SessionConfig, Tz};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the repository root.
pub const CONFIG_FILE_NAME: &str = "albumin.toml";

pub const ENV_TIMEZONE: &str = "ALBUMIN_TIMEZONE";
pub const ENV_REPO: &str = "ALBUMIN_REPO";

// =============================================================================
// SECTIONS
// =============================================================================

/// The metadata service process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSection {
    pub command: Vec<String>,
    pub stop_timeout_secs: u64,
}

impl Default for MetadataSection {
    fn default() -> Self {
        Self {
            command: argv(&["git", "annex", "metadata", "--batch", "--json"]),
            stop_timeout_secs: STOP_TIMEOUT.as_secs(),
        }
    }
}

/// The EXIF reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExifSection {
    pub command: Vec<String>,
}

impl Default for ExifSection {
    fn default() -> Self {
        Self {
            command: argv(&["exiftool"]),
        }
    }
}

/// The git-annex front end used for `calckey`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnexSection {
    pub command: Vec<String>,
}

impl Default for AnnexSection {
    fn default() -> Self {
        Self {
            command: argv(&["git", "annex"]),
        }
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| (*p).to_string()).collect()
}

// =============================================================================
// CONFIG
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlbuminConfig {
    pub repository: PathBuf,
    /// IANA zone name used for zoneless evidence.
    pub timezone: Option<String>,
    pub metadata: MetadataSection,
    pub exif: ExifSection,
    pub annex: AnnexSection,
}

impl Default for AlbuminConfig {
    fn default() -> Self {
        Self {
            repository: PathBuf::from("."),
            timezone: None,
            metadata: MetadataSection::default(),
            exif: ExifSection::default(),
            annex: AnnexSection::default(),
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub repository: Option<PathBuf>,
    pub timezone: Option<String>,
}

impl AlbuminConfig {
    /// Resolve the configuration from every layer.
    ///
    /// The repository is settled first (flag, then environment) because the
    /// default config file lives inside it.
    pub fn load(overrides: &Overrides) -> Result<Self, AlbuminError> {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self::load_with(overrides, env)
    }

    /// [`AlbuminConfig::load`] with an injectable environment.
    pub fn load_with(
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AlbuminError> {
        let repository = overrides
            .repository
            .clone()
            .or_else(|| env(ENV_REPO).map(PathBuf::from));

        let file = match &overrides.config {
            Some(path) => Some(path.clone()),
            None => {
                let root = repository.clone().unwrap_or_else(|| PathBuf::from("."));
                Some(root.join(CONFIG_FILE_NAME)).filter(|p| p.is_file())
            }
        };

        let mut config = match file {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        if let Some(tz) = env(ENV_TIMEZONE) {
            config.timezone = Some(tz);
        }
        if let Some(repo) = env(ENV_REPO) {
            config.repository = PathBuf::from(repo);
        }
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, AlbuminError> {
        toml::from_str(text).map_err(|e| AlbuminError::ConfigError(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, AlbuminError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AlbuminError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        toml::from_str(&text)
            .map_err(|e| AlbuminError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(repo) = &overrides.repository {
            self.repository = repo.clone();
        }
        if let Some(tz) = &overrides.timezone {
            self.timezone = Some(tz.clone());
        }
    }

    pub fn validate(&self) -> Result<(), AlbuminError> {
        if let Some(name) = &self.timezone {
            parse_zone(name)?;
        }
        for (section, command) in [
            ("metadata", &self.metadata.command),
            ("exif", &self.exif.command),
            ("annex", &self.annex.command),
        ] {
            if command.is_empty() {
                return Err(AlbuminError::ConfigError(format!(
                    "{section}.command must not be empty"
                )));
            }
        }
        Ok(())
    }

    /// The configured zone.
    ///
    /// Reconciliation needs one; there is no implicit local zone.
    pub fn timezone(&self) -> Result<Tz, AlbuminError> {
        match &self.timezone {
            Some(name) => parse_zone(name),
            None => Err(AlbuminError::ConfigError(format!(
                "no time zone configured; set `timezone` in {CONFIG_FILE_NAME}, \
                 {ENV_TIMEZONE} or --timezone"
            ))),
        }
    }

    /// Session settings for the metadata service, run inside the repository.
    pub fn session(&self) -> Result<SessionConfig, AlbuminError> {
        Ok(SessionConfig::from_argv(&self.metadata.command)?
            .with_working_dir(&self.repository)
            .with_stop_timeout(Duration::from_secs(self.metadata.stop_timeout_secs)))
    }
}

fn parse_zone(name: &str) -> Result<Tz, AlbuminError> {
    name.parse::<Tz>()
        .map_err(|_| AlbuminError::ConfigError(format!("unknown time zone: {name}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_git_annex() {
        let config = AlbuminConfig::default();
        assert_eq!(config.metadata.command[..2], ["git", "annex"]);
        assert_eq!(config.metadata.stop_timeout_secs, 5);
        assert!(config.timezone().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AlbuminConfig::from_toml("timezone = \"Europe/Istanbul\"\n").expect("parse");
        assert_eq!(config.timezone().expect("zone").name(), "Europe/Istanbul");
        assert_eq!(config.exif.command, ["exiftool"]);
    }

    #[test]
    fn unknown_zone_is_rejected() {
        let config = AlbuminConfig::from_toml("timezone = \"Mars/Olympus\"\n").expect("parse");
        assert!(matches!(
            config.validate(),
            Err(AlbuminError::ConfigError(ref m)) if m.contains("Mars/Olympus")
        ));
    }

    #[test]
    fn empty_command_is_rejected() {
        let config = AlbuminConfig::from_toml("[exif]\ncommand = []\n").expect("parse");
        assert!(config.validate().is_err());
    }
}
