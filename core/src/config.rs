// core/src/config.rs
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::error::{CoachError, Result};

/// Standard filnavn som letes etter i arbeidskatalogen.
pub const DEFAULT_CONFIG_FILE: &str = "cyclecoach.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StravaConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub api_url: String,
    pub auth_url: String,
    pub timeout_secs: u64,
}

impl Default for StravaConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            refresh_token: None,
            api_url: "https://www.strava.com/api/v3".to_string(),
            auth_url: "https://www.strava.com/oauth/token".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o".to_string(),
            temperature: 0.3,
            max_tokens: 2000,
            url: "https://api.openai.com/v1/chat/completions".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Svg,
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Png => "png",
        }
    }
}

/// Oppsett for figurer. Sendes eksplisitt inn ved hvert kall.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub theme: Theme,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            width: 1200,
            height: 1500,
            format: ImageFormat::Svg,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub days: u32,
    pub activity_type: String,
    pub strava: StravaConfig,
    pub openai: OpenAiConfig,
    pub render: RenderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            days: 7,
            activity_type: "Ride".to_string(),
            strava: StravaConfig::default(),
            openai: OpenAiConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl AppConfig {
    /// Les TOML fra `path`, eller `cyclecoach.toml` hvis den finnes, ellers
    /// standardverdier. Miljøvariabler overstyrer filen.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoachError::Config(format!("read {}: {e}", path.display())))?;
        let cfg = Self::from_toml(&content)?;
        debug!("config loaded from {}", path.display());
        Ok(cfg)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overstyr med miljøvariabler. Tomme verdier ignoreres.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("STRAVA_CLIENT_ID") {
            self.strava.client_id = Some(v);
        }
        if let Some(v) = get("STRAVA_CLIENT_SECRET") {
            self.strava.client_secret = Some(v);
        }
        if let Some(v) = get("STRAVA_REFRESH_TOKEN") {
            self.strava.refresh_token = Some(v);
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.openai.api_key = Some(v);
        }
        if let Some(v) = get("CYCLECOACH_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = AppConfig::from_toml("").unwrap();
        assert_eq!(cfg.days, 7);
        assert_eq!(cfg.activity_type, "Ride");
        assert_eq!(cfg.openai.model, "gpt-4o");
        assert_eq!(cfg.openai.max_tokens, 2000);
        assert_eq!(cfg.render.format, ImageFormat::Svg);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
            days = 30
            [render]
            theme = "light"
            format = "png"
            [strava]
            timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.days, 30);
        assert_eq!(cfg.render.theme, Theme::Light);
        assert_eq!(cfg.render.width, 1200);
        assert_eq!(cfg.strava.timeout_secs, 5);
        assert!(cfg.strava.api_url.starts_with("https://www.strava.com"));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = AppConfig::from_toml(
            r#"
            data_dir = "from-file"
            [strava]
            client_id = "file-id"
            "#,
        )
        .unwrap();
        cfg.apply_env(|key| match key {
            "STRAVA_CLIENT_ID" => Some("env-id".to_string()),
            "CYCLECOACH_DATA_DIR" => Some("/tmp/cc".to_string()),
            "OPENAI_API_KEY" => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(cfg.strava.client_id.as_deref(), Some("env-id"));
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/cc"));
        assert!(cfg.openai.api_key.is_none());
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        assert!(matches!(
            AppConfig::from_toml("days = \"many\""),
            Err(CoachError::Config(_))
        ));
    }
}
