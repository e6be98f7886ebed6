use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::Utc;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use tracing::{debug, info, warn};

use crate::models::{Chart, Series, Theme};
use crate::utils::{ChartError, SessionAxis};

const MARGIN: u32 = 15;
const X_LABEL_AREA: u32 = 50;
const Y_LABEL_AREA: u32 = 70;

/// Colours used to paint one theme
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub background: RGBColor,
    pub text: RGBColor,
    pub grid: RGBColor,
    pub line: RGBColor,
    pub gain: RGBColor,
    pub loss: RGBColor,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Palette {
                background: RGBColor(255, 255, 255),
                text: RGBColor(42, 63, 95),
                grid: RGBColor(223, 228, 236),
                line: RGBColor(99, 110, 250),
                gain: RGBColor(38, 166, 154),
                loss: RGBColor(239, 83, 80),
            },
            Theme::Dark => Palette {
                background: RGBColor(17, 17, 17),
                text: RGBColor(242, 245, 250),
                grid: RGBColor(40, 52, 66),
                line: RGBColor(99, 110, 250),
                gain: RGBColor(0, 204, 150),
                loss: RGBColor(239, 85, 59),
            },
        }
    }
}

/// Render `chart` as a PNG at `path` and return the written path
pub fn export(chart: &Chart, path: &Path) -> Result<PathBuf, ChartError> {
    if chart.series.is_empty() {
        return Err(ChartError::Render("chart has no data to draw".to_string()));
    }

    let written = write_via_staging(path, |staging| render(chart, staging))?;
    info!("🖼️ Wrote {} chart to {}", chart.symbol, written.display());
    Ok(written)
}

/// Sibling file the image is drawn into before it replaces `path`
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "chart.png".to_string());
    // keep the .png extension, the bitmap backend picks the encoder from it
    path.with_file_name(format!(".{}.{}.png", name, Utc::now().timestamp_millis()))
}

/// Run `draw` against a staging file, then move it over `path`.
/// An existing file at `path` is only replaced once drawing succeeded.
fn write_via_staging<F>(path: &Path, draw: F) -> Result<PathBuf, ChartError>
where
    F: FnOnce(&Path) -> Result<(), ChartError>,
{
    let staging = staging_path(path);

    // Open the staging file first so unwritable directories fail as I/O errors
    File::create(&staging)?;

    if let Err(e) = draw(&staging) {
        warn!("Rendering {} failed: {}", path.display(), e);
        let _ = fs::remove_file(&staging);
        return Err(e);
    }

    if let Err(e) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(e.into());
    }

    Ok(path.to_path_buf())
}

/// Price axis bounds with 10% headroom, never below zero
pub fn padded_price_range(series: &Series) -> Option<(f64, f64)> {
    let (min_price, max_price) = series.price_bounds()?;
    let price_range = (max_price - min_price).max(1e-8);
    let padding = price_range * 0.1;
    Some(((min_price - padding).max(0.0), max_price + padding))
}

/// Candle body width in pixels for the given plot width
pub fn candle_width(axis: &SessionAxis, plot_width: u32) -> u32 {
    let (x_min, x_max) = axis.range();
    let slots = ((x_max - x_min) / axis.typical_spacing()).max(1.0);
    let px = f64::from(plot_width) / slots * 0.7;
    px.clamp(1.0, 20.0) as u32
}

fn render(chart: &Chart, path: &Path) -> Result<(), ChartError> {
    let palette = Palette::for_theme(chart.theme);
    let axis = SessionAxis::new(chart.series.timestamps(), &chart.range_breaks);
    let intraday = chart.granularity.is_intraday();

    let (x_min, x_max) = axis.range();
    let (y_min, y_max) = padded_price_range(&chart.series)
        .ok_or_else(|| ChartError::Render("chart has no prices".to_string()))?;
    debug!(
        "Rendering {} point(s) for {} ({}x{}, y {:.2}..{:.2})",
        chart.series.len(),
        chart.symbol,
        chart.width,
        chart.height,
        y_min,
        y_max
    );

    let root = BitMapBackend::new(path, (chart.width, chart.height)).into_drawing_area();
    root.fill(&palette.background)
        .map_err(|e| ChartError::Render(format!("Failed to fill canvas: {}", e)))?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(&chart.title, ("sans-serif", 28).into_font().color(&palette.text))
        .margin(MARGIN)
        .x_label_area_size(X_LABEL_AREA)
        .y_label_area_size(Y_LABEL_AREA)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(|e| ChartError::Render(format!("Failed to build chart: {}", e)))?;

    let x_label = |x: &f64| axis.label_at(*x, intraday);
    let y_label = |y: &f64| format!("{:.2}", y);
    ctx.configure_mesh()
        .x_desc(chart.x_title.as_str())
        .y_desc(chart.y_title.as_str())
        .x_labels(8)
        .y_labels(10)
        .x_label_formatter(&x_label)
        .y_label_formatter(&y_label)
        .label_style(("sans-serif", 14).into_font().color(&palette.text))
        .axis_desc_style(("sans-serif", 16).into_font().color(&palette.text))
        .axis_style(palette.text.stroke_width(1))
        .bold_line_style(palette.grid.stroke_width(1))
        .light_line_style(palette.grid.mix(0.3).stroke_width(1))
        .draw()
        .map_err(|e| ChartError::Render(format!("Failed to draw mesh: {}", e)))?;

    let plot_width = chart.width.saturating_sub(2 * MARGIN + Y_LABEL_AREA);
    plot_series(&mut ctx, chart, &axis, &palette, plot_width)?;

    ctx.configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(palette.background.mix(0.8).filled())
        .border_style(palette.grid.stroke_width(1))
        .label_font(("sans-serif", 14).into_font().color(&palette.text))
        .draw()
        .map_err(|e| ChartError::Render(format!("Failed to draw legend: {}", e)))?;

    root.present()
        .map_err(|e| ChartError::Render(format!("Failed to write image: {}", e)))?;

    Ok(())
}

/// Draw the price series and register its legend entry
fn plot_series<DB: DrawingBackend>(
    ctx: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    chart: &Chart,
    axis: &SessionAxis,
    palette: &Palette,
    plot_width: u32,
) -> Result<(), ChartError> {
    let positions = axis.positions();

    match &chart.series {
        Series::Line { close, .. } => {
            let line = palette.line;
            ctx.draw_series(LineSeries::new(
                positions.iter().copied().zip(close.iter().copied()),
                line.stroke_width(2),
            ))
            .map_err(|e| ChartError::Render(format!("Failed to draw line: {}", e)))?
            .label(chart.series.name())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line.stroke_width(2)));
        }
        Series::Candlestick {
            open,
            high,
            low,
            close,
            ..
        } => {
            let body = candle_width(axis, plot_width);
            let (gain, loss) = (palette.gain, palette.loss);
            ctx.draw_series(positions.iter().enumerate().map(|(i, x)| {
                CandleStick::new(
                    *x,
                    open[i],
                    high[i],
                    low[i],
                    close[i],
                    gain.filled(),
                    loss.filled(),
                    body,
                )
            }))
            .map_err(|e| ChartError::Render(format!("Failed to draw candles: {}", e)))?
            .label(chart.series.name())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], gain.filled()));
        }
    }

    Ok(())
}
