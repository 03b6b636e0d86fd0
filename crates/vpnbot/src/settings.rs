//! Bot Settings
//!
//! Loaded from a TOML file. Every table and field is optional:
//!
//! ```toml
//! [provision]
//! subnet = "10.0.0.0/24"
//! server_host = "vpn.example.org"
//! configs_dir = "/etc/wireguard/clients"
//!
//! [backend]
//! keys = "wg"          # or "local"
//! registrar = "wg"     # or "dry-run"
//!
//! [faq]
//! path = "faq.toml"
//!
//! [console]
//! user_id = 1
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vpnbot_faq::FaqTexts;
use vpnbot_provision::ProvisionSettings;

/// Top-level settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub provision: ProvisionSettings,
    pub backend: BackendSettings,
    pub faq: FaqSettings,
    pub texts: BotTexts,
    pub console: ConsoleSettings,
}

impl Settings {
    /// Load from TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self, SettingsError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SettingsError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Load from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        toml::from_str(content).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Load from `path` if given, built-in defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Self::from_toml_file(path),
            None => Ok(Self::default()),
        }
    }
}

/// Where keys come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyBackend {
    /// `wg genkey` / `wg pubkey`
    #[default]
    Wg,
    /// In-process X25519
    Local,
}

/// How peers reach the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistrarBackend {
    /// `wg set`
    #[default]
    Wg,
    /// Log only
    DryRun,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub keys: KeyBackend,
    pub registrar: RegistrarBackend,
}

/// FAQ menu settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaqSettings {
    /// FAQ data file (TOML or JSON); no file means an empty FAQ
    pub path: Option<PathBuf>,
    pub title: String,
    pub back_button: String,
}

impl FaqSettings {
    pub fn texts(&self) -> FaqTexts {
        FaqTexts {
            title: self.title.clone(),
            back_button: self.back_button.clone(),
        }
    }
}

impl Default for FaqSettings {
    fn default() -> Self {
        let texts = FaqTexts::default();
        Self {
            path: None,
            title: texts.title,
            back_button: texts.back_button,
        }
    }
}

/// User-facing bot messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotTexts {
    pub welcome: String,
    pub get_config_button: String,
    pub faq_button: String,
    pub config_ready: String,
    pub no_config: String,
    pub menu_expired: String,
}

impl Default for BotTexts {
    fn default() -> Self {
        Self {
            welcome: "Welcome to the CMC MSU bot for fast and secure VPN connection!".to_string(),
            get_config_button: "Get your config!".to_string(),
            faq_button: "FAQ".to_string(),
            config_ready: "Your config is ready!".to_string(),
            no_config: "No suitable config found. Sorry!".to_string(),
            menu_expired: "This menu is no longer available.".to_string(),
        }
    }
}

/// Identity used by the console transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    pub user_id: i64,
    pub chat_id: i64,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            user_id: 1,
            chat_id: 1,
        }
    }
}

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings = Settings::from_toml("").unwrap();

        assert_eq!(settings.backend.keys, KeyBackend::Wg);
        assert_eq!(settings.backend.registrar, RegistrarBackend::Wg);
        assert_eq!(settings.faq.texts(), FaqTexts::default());
        assert_eq!(settings.console.user_id, 1);
        assert_eq!(settings.provision.interface, "wg0");
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_toml(
            r#"
            [provision]
            server_host = "vpn.example.org"
            server_port = 51821

            [backend]
            keys = "local"
            registrar = "dry-run"

            [texts]
            no_config = "Nope"
            "#,
        )
        .unwrap();

        assert_eq!(settings.provision.endpoint().to_string(), "vpn.example.org:51821");
        assert_eq!(settings.backend.keys, KeyBackend::Local);
        assert_eq!(settings.backend.registrar, RegistrarBackend::DryRun);
        assert_eq!(settings.texts.no_config, "Nope");
        assert_eq!(settings.texts.config_ready, "Your config is ready!");
    }

    #[test]
    fn test_bad_file() {
        assert!(matches!(
            Settings::from_toml("[backend]\nkeys = \"quantum\""),
            Err(SettingsError::Parse(_))
        ));
        assert!(matches!(
            Settings::load(Some(Path::new("/nonexistent/vpnbot.toml"))),
            Err(SettingsError::Io(_))
        ));
        assert!(Settings::load(None).is_ok());
    }
}
