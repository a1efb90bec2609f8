//! Weather retrieval from Open-Meteo. Neither the geocoding nor the forecast
//! endpoint needs an API key.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;

use super::{Conditions, ForecastPoint, WeatherError, WeatherReport, WeatherSnapshot, WeatherSource};
use crate::config::WeatherSettings;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "weatherdash/0.1.0";
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize, Clone)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentValues,
    hourly: HourlyValues,
}

#[derive(Debug, Deserialize)]
struct CurrentValues {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    apparent_temperature: f64,
    wind_speed_10m: f64,
    weather_code: i32,
}

#[derive(Debug, Deserialize)]
struct HourlyValues {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    weather_code: Vec<Option<i32>>,
}

pub struct OpenMeteoClient {
    client: Client,
    settings: WeatherSettings,
}

impl OpenMeteoClient {
    pub fn new(settings: WeatherSettings) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(OpenMeteoClient { client, settings })
    }

    async fn geocode(&self, place: &str) -> Result<GeocodingResult, WeatherError> {
        let response: GeocodingResponse = self
            .client
            .get(&self.settings.geocoding_url)
            .query(&[
                ("name", place),
                ("count", "1"),
                ("language", "en"),
                ("format", "json"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response
            .results
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| WeatherError::PlaceNotFound(place.to_string()))
    }

    async fn forecast(&self, location: &GeocodingResult) -> Result<ForecastResponse, WeatherError> {
        let forecast_hours = self.settings.forecast_hours.to_string();
        let latitude = location.latitude.to_string();
        let longitude = location.longitude.to_string();
        let response = self
            .client
            .get(&self.settings.forecast_url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                (
                    "current",
                    "temperature_2m,relative_humidity_2m,apparent_temperature,wind_speed_10m,weather_code",
                ),
                ("hourly", "temperature_2m,weather_code"),
                ("forecast_hours", forecast_hours.as_str()),
                ("timezone", "auto"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn fetch(&self, place: &str) -> Result<WeatherReport, WeatherError> {
        debug!("Geocoding '{place}'");
        let location = self.geocode(place).await?;
        debug!(
            "Found {} at ({:.4}, {:.4})",
            location.name, location.latitude, location.longitude
        );
        let forecast = self.forecast(&location).await?;
        let report = into_report(&location, forecast)?;
        info!(
            "Retrieved weather for {} with {} forecast points",
            report.place,
            report.forecast.len()
        );
        Ok(report)
    }
}

fn display_name(location: &GeocodingResult) -> String {
    match &location.country {
        Some(country) if !country.is_empty() && country != &location.name => {
            format!("{}, {}", location.name, country)
        }
        _ => location.name.clone(),
    }
}

fn into_report(
    location: &GeocodingResult,
    response: ForecastResponse,
) -> Result<WeatherReport, WeatherError> {
    let current = response.current;
    let snapshot = WeatherSnapshot {
        wind_speed: current.wind_speed_10m,
        humidity: current.relative_humidity_2m,
        temperature: current.temperature_2m,
        heat_index: current.apparent_temperature,
        conditions: Conditions::from_wmo_code(current.weather_code),
    };

    let hourly = response.hourly;
    if hourly.time.len() != hourly.temperature_2m.len()
        || hourly.time.len() != hourly.weather_code.len()
    {
        return Err(WeatherError::Parse(
            "hourly series have different lengths".to_string(),
        ));
    }
    let mut forecast = Vec::with_capacity(hourly.time.len());
    for ((time, temperature), code) in hourly
        .time
        .iter()
        .zip(hourly.temperature_2m)
        .zip(hourly.weather_code)
    {
        // Hours without a temperature are skipped rather than failing the whole report.
        let Some(temperature) = temperature else {
            continue;
        };
        let time = NaiveDateTime::parse_from_str(time, TIME_FORMAT)
            .map_err(|err| WeatherError::Parse(format!("bad timestamp '{time}': {err}")))?;
        forecast.push(ForecastPoint {
            time,
            temperature,
            conditions: Conditions::from_wmo_code(code.unwrap_or_default()),
        });
    }

    Ok(WeatherReport {
        place: display_name(location),
        snapshot,
        forecast,
    })
}
