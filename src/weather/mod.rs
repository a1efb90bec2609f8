use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod fake;
pub mod open_meteo;

/// Weather conditions, mapped from WMO weather codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Conditions {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl Conditions {
    /// See https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1..=2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 | 66 | 67 => Self::Sleet,
            61 | 63 | 80 => Self::Rain,
            65 | 81 | 82 => Self::HeavyRain,
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Clear,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Clear => "☀️",
            Self::PartlyCloudy => "⛅",
            Self::Cloudy => "☁️",
            Self::Fog => "🌫️",
            Self::Drizzle | Self::Rain => "🌦️",
            Self::HeavyRain => "🌧️",
            Self::Snow | Self::Sleet => "🌨️",
            Self::Thunderstorm => "⛈️",
        }
    }

    /// CSS class for the page background.
    pub fn background(&self) -> &'static str {
        match self {
            Self::Clear => "bg-clear",
            Self::PartlyCloudy | Self::Cloudy => "bg-cloudy",
            Self::Fog => "bg-fog",
            Self::Drizzle | Self::Rain | Self::HeavyRain => "bg-rain",
            Self::Snow | Self::Sleet => "bg-snow",
            Self::Thunderstorm => "bg-storm",
        }
    }
}

/// Current conditions. Temperatures are in Celsius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// km/h
    pub wind_speed: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    pub temperature: f64,
    pub heat_index: f64,
    pub conditions: Conditions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub time: NaiveDateTime,
    pub temperature: f64,
    pub conditions: Conditions,
}

/// Result of one retrieval for a place. Replaced as a whole on every new
/// retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub place: String,
    pub snapshot: WeatherSnapshot,
    /// Chronological, the first entry is the current hour.
    pub forecast: Vec<ForecastPoint>,
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Could not find a place named '{0}'")]
    PlaceNotFound(String),
    #[error("Unexpected response: {0}")]
    Parse(String),
}

#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch(&self, place: &str) -> Result<WeatherReport, WeatherError>;
}
