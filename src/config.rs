use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

use log::info;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read from '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse toml from '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct Settings {
    #[serde(default)]
    pub weather: WeatherSettings,
    #[serde(default)]
    pub auth_provider: HashMap<String, Provider>,
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeatherProviderKind {
    #[default]
    OpenMeteo,
    Fake,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct WeatherSettings {
    pub provider: WeatherProviderKind,
    pub geocoding_url: String,
    pub forecast_url: String,
    /// Number of hourly readings requested, counted from the current hour.
    pub forecast_hours: u32,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        WeatherSettings {
            provider: WeatherProviderKind::OpenMeteo,
            geocoding_url: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            forecast_hours: 24,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct Provider {
    pub auth_uri: String,
    pub token_uri: String,
    pub redirect_uri: String,
    pub user_uri: String,
    pub display_name_field: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Settings {
    /// Sorted so the login page is stable.
    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.auth_provider.keys().cloned().collect();
        names.sort();
        names
    }
}

pub fn read_settings(path: &Path) -> Result<Settings, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(
                "No settings file at {}, using defaults without login providers",
                path.display()
            );
            return Ok(Settings::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            });
        }
    };
    parse_settings(&contents).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

pub fn parse_settings(contents: &str) -> Result<Settings, toml::de::Error> {
    toml::from_str(contents)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_settings_use_open_meteo() {
        let settings = parse_settings("").unwrap();
        assert_eq!(settings.weather.provider, WeatherProviderKind::OpenMeteo);
        assert_eq!(settings.weather.forecast_hours, 24);
        assert!(settings.auth_provider.is_empty());
    }

    #[test]
    fn providers_and_weather_overrides_are_parsed() {
        let settings = parse_settings(
            r#"
            [weather]
            provider = "fake"
            forecast_hours = 12

            [auth_provider.github]
            auth_uri = "https://github.com/login/oauth/authorize"
            token_uri = "https://github.com/login/oauth/access_token"
            redirect_uri = "http://localhost:3000/auth/authorized"
            user_uri = "https://api.github.com/user"
            display_name_field = "login"
            client_id = "id"
            client_secret = "secret"

            [auth_provider.discord]
            auth_uri = "https://discord.com/oauth2/authorize"
            token_uri = "https://discord.com/api/oauth2/token"
            redirect_uri = "http://localhost:3000/auth/authorized"
            user_uri = "https://discord.com/api/users/@me"
            display_name_field = "username"
            client_id = "id"
            client_secret = "secret"
            scopes = ["identify"]
            "#,
        )
        .unwrap();
        assert_eq!(settings.weather.provider, WeatherProviderKind::Fake);
        assert_eq!(settings.weather.forecast_hours, 12);
        assert_eq!(
            settings.weather.forecast_url,
            "https://api.open-meteo.com/v1/forecast"
        );
        assert_eq!(settings.provider_names(), vec!["discord", "github"]);
        assert_eq!(settings.auth_provider["discord"].scopes, vec!["identify"]);
        assert!(settings.auth_provider["github"].scopes.is_empty());
    }

    #[test]
    fn missing_settings_file_gives_defaults() {
        let settings = read_settings(Path::new("does/not/exist.toml")).unwrap();
        assert!(settings.auth_provider.is_empty());
    }
}
