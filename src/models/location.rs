use log::{debug, warn};

use crate::weather::{ForecastPoint, WeatherError, WeatherReport, WeatherSnapshot};

/// The selected place and the most recent weather retrieved for it.
///
/// Each committed place change gets a new generation. Only the result of the
/// latest generation may clear the pending state, and results from older
/// generations are dropped, so a slow response for an earlier search can never
/// overwrite a newer one.
#[derive(Debug, Default)]
pub struct LocationState {
    place: Option<String>,
    report: Option<WeatherReport>,
    requested: u64,
    completed: u64,
    last_error: Option<String>,
}

impl LocationState {
    pub fn place(&self) -> Option<&str> {
        self.place.as_deref()
    }

    pub fn report(&self) -> Option<&WeatherReport> {
        self.report.as_ref()
    }

    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        self.report.as_ref().map(|report| &report.snapshot)
    }

    pub fn forecast(&self) -> &[ForecastPoint] {
        self.report
            .as_ref()
            .map(|report| report.forecast.as_slice())
            .unwrap_or(&[])
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.completed < self.requested
    }

    /// Commit a new place. Returns the generation the caller must retrieve
    /// weather for, or `None` when the input is blank and nothing changed.
    pub fn set_place(&mut self, name: &str) -> Option<u64> {
        let name = name.trim();
        if name.is_empty() {
            debug!("Ignoring blank place");
            return None;
        }
        self.place = Some(name.to_string());
        self.requested += 1;
        self.last_error = None;
        debug!("Place set to '{name}' (generation {})", self.requested);
        Some(self.requested)
    }

    /// Apply the outcome of the retrieval started for `generation`. Returns
    /// whether it was applied.
    pub fn complete(
        &mut self,
        generation: u64,
        result: Result<WeatherReport, WeatherError>,
    ) -> bool {
        if generation != self.requested {
            debug!(
                "Dropping weather for generation {generation}, latest is {}",
                self.requested
            );
            return false;
        }
        self.completed = generation;
        match result {
            Ok(report) => {
                self.report = Some(report);
                self.last_error = None;
            }
            Err(err) => {
                // The previous report, if any, stays visible.
                warn!("Weather retrieval failed: {err}");
                self.last_error = Some(err.to_string());
            }
        }
        true
    }
}
