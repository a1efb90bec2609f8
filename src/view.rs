//! Presentation of a dashboard in one display unit.
//!
//! Everything shown to the user is derived here in a single pass from the
//! location state, the favorites and the selected unit, so all numbers on a
//! rendered page share the same unit.

use log::warn;

use crate::chart::{ChartSeries, render_line_chart};
use crate::models::location::LocationState;
use crate::models::units::{DisplayUnit, to_display};
use crate::weather::{ForecastPoint, WeatherReport};

/// Forecast entries shown as cards: positions 1 through 6.
pub const SHORT_FORECAST_LEN: usize = 6;
/// Forecast entries shown in the chart: positions 0 through 6.
pub const CHART_LEN: usize = 7;

const TIME_LABEL_FORMAT: &str = "%H:%M";

pub fn short_forecast(forecast: &[ForecastPoint]) -> &[ForecastPoint] {
    let end = forecast.len().min(SHORT_FORECAST_LEN + 1);
    forecast.get(1..end).unwrap_or(&[])
}

pub fn chart_window(forecast: &[ForecastPoint]) -> &[ForecastPoint] {
    &forecast[..forecast.len().min(CHART_LEN)]
}

pub fn format_temperature(value: f64) -> String {
    let rounded = value.round();
    // Avoid "-0".
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{rounded:.0}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentCard {
    pub place: String,
    pub temperature: String,
    pub heat_index: String,
    pub wind_speed: String,
    pub humidity: String,
    pub conditions: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastCard {
    pub time: String,
    pub temperature: String,
    pub icon: String,
    pub conditions: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub unit: DisplayUnit,
    pub place: Option<String>,
    pub current: Option<CurrentCard>,
    pub forecast: Vec<ForecastCard>,
    pub chart: Option<ChartSeries>,
    pub favorites: Vec<String>,
    pub background: String,
    pub pending: bool,
    pub error: Option<String>,
}

impl DashboardView {
    pub fn build(location: &LocationState, favorites: &[String], unit: DisplayUnit) -> Self {
        let report = location.report();
        DashboardView {
            unit,
            place: location.place().map(str::to_string),
            current: report.map(|report| current_card(report, unit)),
            forecast: short_forecast(location.forecast())
                .iter()
                .map(|point| forecast_card(point, unit))
                .collect(),
            chart: chart_series(location.forecast(), unit),
            favorites: favorites.to_vec(),
            background: location
                .snapshot()
                .map(|snapshot| snapshot.conditions.background())
                .unwrap_or("bg-default")
                .to_string(),
            pending: location.is_pending(),
            error: location.last_error().map(str::to_string),
        }
    }

    /// The chart as inline SVG. Rendering problems only hide the chart.
    pub fn chart_svg(&self) -> Option<String> {
        let series = self.chart.as_ref()?;
        match render_line_chart(series) {
            Ok(svg) => Some(svg),
            Err(err) => {
                warn!("Not showing forecast chart: {err}");
                None
            }
        }
    }
}

fn current_card(report: &WeatherReport, unit: DisplayUnit) -> CurrentCard {
    let snapshot = &report.snapshot;
    CurrentCard {
        place: report.place.clone(),
        temperature: format_temperature(to_display(snapshot.temperature, unit)),
        heat_index: format_temperature(to_display(snapshot.heat_index, unit)),
        wind_speed: format!("{:.0}", snapshot.wind_speed),
        humidity: format!("{:.0}", snapshot.humidity),
        conditions: snapshot.conditions.label().to_string(),
        icon: snapshot.conditions.icon().to_string(),
    }
}

fn forecast_card(point: &ForecastPoint, unit: DisplayUnit) -> ForecastCard {
    ForecastCard {
        time: point.time.format(TIME_LABEL_FORMAT).to_string(),
        temperature: format_temperature(to_display(point.temperature, unit)),
        icon: point.conditions.icon().to_string(),
        conditions: point.conditions.label().to_string(),
    }
}

fn chart_series(forecast: &[ForecastPoint], unit: DisplayUnit) -> Option<ChartSeries> {
    let window = chart_window(forecast);
    if window.is_empty() {
        return None;
    }
    Some(ChartSeries {
        labels: window
            .iter()
            .map(|point| point.time.format(TIME_LABEL_FORMAT).to_string())
            .collect(),
        values: window
            .iter()
            .map(|point| to_display(point.temperature, unit))
            .collect(),
        y_description: unit.symbol().to_string(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::weather::{Conditions, WeatherSnapshot};
    use chrono::{NaiveDate, NaiveDateTime};

    fn hour(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn points(temperatures: &[f64]) -> Vec<ForecastPoint> {
        temperatures
            .iter()
            .enumerate()
            .map(|(i, &temperature)| ForecastPoint {
                time: hour(i as u32),
                temperature,
                conditions: Conditions::Cloudy,
            })
            .collect()
    }

    fn location_with(place: &str, forecast: Vec<ForecastPoint>) -> LocationState {
        let mut location = LocationState::default();
        let generation = location.set_place(place).unwrap();
        let temperature = forecast.first().map(|p| p.temperature).unwrap_or_default();
        location.complete(
            generation,
            Ok(WeatherReport {
                place: place.to_string(),
                snapshot: WeatherSnapshot {
                    wind_speed: 12.4,
                    humidity: 71.0,
                    temperature,
                    heat_index: temperature - 1.0,
                    conditions: Conditions::Rain,
                },
                forecast,
            }),
        );
        location
    }

    #[test]
    fn short_forecast_of_long_sequence_is_positions_one_to_six() {
        let forecast = points(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let shown: Vec<f64> = short_forecast(&forecast)
            .iter()
            .map(|p| p.temperature)
            .collect();
        assert_eq!(shown, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn short_forecast_of_short_sequence_shows_what_exists() {
        let forecast = points(&[0.0, 1.0, 2.0]);
        assert_eq!(short_forecast(&forecast).len(), 2);
        assert!(short_forecast(&points(&[0.0])).is_empty());
        assert!(short_forecast(&[]).is_empty());
    }

    #[test]
    fn chart_window_is_positions_zero_to_six() {
        let forecast = points(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(chart_window(&forecast).len(), 7);
        assert_eq!(chart_window(&forecast[..3]).len(), 3);
    }

    #[test]
    fn paris_in_fahrenheit() {
        let forecast = points(&[15.0, 16.0, 17.0, 18.0, 20.0, 10.0, 0.0]);
        let location = location_with("Paris", forecast);
        let view = DashboardView::build(&location, &[], DisplayUnit::Fahrenheit);

        let current = view.current.as_ref().unwrap();
        assert_eq!(current.temperature, "59");
        assert_eq!(current.place, "Paris");
        let shown: Vec<&str> = view.forecast.iter().map(|c| c.temperature.as_str()).collect();
        assert_eq!(shown, vec!["61", "63", "64", "68", "50", "32"]);
        assert_eq!(view.forecast[0].time, "01:00");

        let chart = view.chart.as_ref().unwrap();
        assert_eq!(chart.values[0], 59.0);
        assert_eq!(chart.values.len(), 7);
        assert_eq!(chart.y_description, "°F");
        assert_eq!(chart.labels[6], "06:00");
    }

    #[test]
    fn every_number_follows_the_selected_unit() {
        let location = location_with("Oslo", points(&[-3.0, 100.0]));
        let celsius = DashboardView::build(&location, &[], DisplayUnit::Celsius);
        let fahrenheit = DashboardView::build(&location, &[], DisplayUnit::Fahrenheit);

        assert_eq!(celsius.current.as_ref().unwrap().temperature, "-3");
        assert_eq!(celsius.current.as_ref().unwrap().heat_index, "-4");
        assert_eq!(celsius.forecast[0].temperature, "100");
        assert_eq!(fahrenheit.current.as_ref().unwrap().temperature, "27");
        assert_eq!(fahrenheit.current.as_ref().unwrap().heat_index, "25");
        assert_eq!(fahrenheit.forecast[0].temperature, "212");
        // Wind and humidity are not temperatures.
        assert_eq!(
            celsius.current.as_ref().unwrap().wind_speed,
            fahrenheit.current.as_ref().unwrap().wind_speed
        );
    }

    #[test]
    fn view_without_data_is_neutral() {
        let view = DashboardView::build(
            &LocationState::default(),
            &["Paris".to_string()],
            DisplayUnit::Celsius,
        );
        assert!(view.current.is_none());
        assert!(view.forecast.is_empty());
        assert!(view.chart.is_none());
        assert!(view.chart_svg().is_none());
        assert_eq!(view.favorites, vec!["Paris"]);
        assert_eq!(view.background, "bg-default");
        assert!(!view.pending);
    }

    #[test]
    fn temperatures_round_to_whole_degrees() {
        assert_eq!(format_temperature(59.0), "59");
        assert_eq!(format_temperature(12.6), "13");
        assert_eq!(format_temperature(-0.4), "0");
        assert_eq!(format_temperature(-7.5), "-8");
    }
}
