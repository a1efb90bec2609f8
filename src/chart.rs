use plotters::prelude::*;
use thiserror::Error;

pub const CHART_WIDTH: u32 = 640;
pub const CHART_HEIGHT: u32 = 280;

/// A labeled numeric series, one label per value.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub y_description: String,
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Incorrect input data to chart")]
    IncorrectInputData,
    #[error("Plotter error: {0}")]
    PlotterError(String),
}

fn plotter_error<E: std::fmt::Debug>(err: E) -> ChartError {
    ChartError::PlotterError(format!("{err:?}"))
}

/// Render the series as a line chart and return it as an SVG document.
pub fn render_line_chart(series: &ChartSeries) -> Result<String, ChartError> {
    if series.labels.len() != series.values.len() || series.values.is_empty() {
        return Err(ChartError::IncorrectInputData);
    }
    if series.values.iter().any(|value| !value.is_finite()) {
        return Err(ChartError::IncorrectInputData);
    }

    let y_min = series.values.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let y_max = series.values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    // Keep a flat series visible and give the line some room.
    let padding = ((y_max - y_min) * 0.1).max(1.0);
    let x_max = (series.values.len() - 1).max(1) as f64;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(plotter_error)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(0f64..x_max, (y_min - padding)..(y_max + padding))
            .map_err(plotter_error)?;

        let labels = &series.labels;
        chart
            .configure_mesh()
            .x_labels(labels.len())
            .y_labels(5)
            .x_label_formatter(&|x| {
                let index = x.round();
                if (x - index).abs() > 1e-6 || index < 0.0 {
                    return String::new();
                }
                labels.get(index as usize).cloned().unwrap_or_default()
            })
            .y_label_formatter(&|y| format!("{y:.0}"))
            .y_desc(series.y_description.as_str())
            .axis_desc_style(("sans-serif", 15))
            .draw()
            .map_err(plotter_error)?;

        chart
            .draw_series(LineSeries::new(
                series.values.iter().enumerate().map(|(i, &v)| (i as f64, v)),
                &BLUE,
            ))
            .map_err(plotter_error)?;
        root.present().map_err(plotter_error)?;
    }

    Ok(svg)
}
