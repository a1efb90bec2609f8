use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, Timelike};
use rand::Rng;

use super::{Conditions, ForecastPoint, WeatherError, WeatherReport, WeatherSnapshot, WeatherSource};

pub const FAKE_WEATHER_DELAY: Duration = Duration::from_millis(300);
pub const FAKE_WEATHER_HOURS: i64 = 24;
pub const FAKE_WEATHER_NOISE: f64 = 0.5;

/// Offline weather source producing plausible readings for any place name.
pub struct FakeWeatherSource {
    pub delay: Duration,
}

pub fn create() -> FakeWeatherSource {
    FakeWeatherSource {
        delay: FAKE_WEATHER_DELAY,
    }
}

// Same place, same climate.
fn base_temperature(place: &str) -> f64 {
    let seed = place
        .to_lowercase()
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    (seed % 35) as f64 - 5.0
}

fn conditions_for(temperature: f64, hour: u32) -> Conditions {
    match (temperature, hour % 6) {
        (t, 0) if t < 0.0 => Conditions::Snow,
        (_, 0) => Conditions::Rain,
        (_, 1) | (_, 2) => Conditions::PartlyCloudy,
        (_, 3) => Conditions::Cloudy,
        _ => Conditions::Clear,
    }
}

#[async_trait]
impl WeatherSource for FakeWeatherSource {
    async fn fetch(&self, place: &str) -> Result<WeatherReport, WeatherError> {
        tokio::time::sleep(self.delay).await;

        let base = base_temperature(place);
        let now = Local::now().naive_local();
        let start = now
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now);
        let mut rng = rand::rng();

        let forecast: Vec<ForecastPoint> = (0..FAKE_WEATHER_HOURS)
            .map(|offset| {
                let time = start + chrono::Duration::hours(offset);
                // Warmest in the afternoon.
                let diurnal = 4.0 * ((time.hour() as f64 - 9.0) / 24.0 * std::f64::consts::TAU).sin();
                let temperature = base
                    + diurnal
                    + rng.random_range(-FAKE_WEATHER_NOISE..FAKE_WEATHER_NOISE);
                ForecastPoint {
                    time,
                    temperature,
                    conditions: conditions_for(temperature, time.hour()),
                }
            })
            .collect();

        let (temperature, conditions) = forecast
            .first()
            .map(|current| (current.temperature, current.conditions))
            .ok_or_else(|| WeatherError::Parse("no fake hours generated".to_string()))?;
        let humidity: f64 = rng.random_range(40.0..90.0);
        log::info!("Generated fake weather for {place}");
        Ok(WeatherReport {
            place: place.to_string(),
            snapshot: WeatherSnapshot {
                wind_speed: rng.random_range(0.0..30.0),
                humidity,
                temperature,
                heat_index: temperature + (humidity - 50.0) / 25.0,
                conditions,
            },
            forecast,
        })
    }
}
