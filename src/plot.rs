//! Rendering of aggregated speedups as a log-log error-bar chart.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use plotters::prelude::*;
use tracing::{debug, warn};

use crate::aggregate::GroupStatistic;

/// The path the chart is written to unless configured otherwise.
pub const DEFAULT_OUTPUT: &str = "speedup_full.svg";

/// Tick marks at major ticks are this long, in points.
const MAJOR_TICK_LENGTH: f64 = 3.5;

/// Tick marks at minor ticks are this long, in points.
const MINOR_TICK_LENGTH: f64 = 2.5;

/// Radius of a scatter marker, in pixels.
const MARKER_RADIUS: i32 = 2;

/// An error rendering a chart.
#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    /// No group has a positive, finite mean to place on logarithmic axes.
    #[error("no plottable speedups")]
    NoData,
    /// The chart could not be drawn or written.
    #[error("unable to render {}: {message}", .path.display())]
    Render {
        /// The chart's output path.
        path: PathBuf,
        /// The rendering backend's description of the failure.
        message: String,
    },
}

/// The typeface used for all text in the chart.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Typeface {
    /// Times, a serif face.
    Times,
    /// Helvetica, a sans-serif face.
    #[default]
    Helvetica,
    /// Computer Modern, TeX's default serif face.
    ComputerModern,
}

impl Typeface {
    /// The font stack a renderer resolves this typeface through, most preferred first. Each ends
    /// in a generic family so symbols still render when the named faces are missing.
    pub const fn font_stack(&self) -> &'static str {
        match self {
            Typeface::Times => "Times, 'Times New Roman', 'Nimbus Roman', serif",
            Typeface::Helvetica => "Helvetica, Arial, 'Nimbus Sans', sans-serif",
            Typeface::ComputerModern => "'CMU Serif', 'Latin Modern Roman', cmr10, serif",
        }
    }
}

impl FromStr for Typeface {
    type Err = UnknownTypeface;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "times" => Ok(Typeface::Times),
            "helvetica" => Ok(Typeface::Helvetica),
            "computermodern" | "cm" => Ok(Typeface::ComputerModern),
            _ => Err(UnknownTypeface(s.to_owned())),
        }
    }
}

impl fmt::Display for Typeface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Typeface::Times => "times",
            Typeface::Helvetica => "helvetica",
            Typeface::ComputerModern => "computer-modern",
        })
    }
}

/// A typeface name which isn't one of `times`, `helvetica` or `computer modern`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown typeface {0:?}, expected times, helvetica or computer modern")]
pub struct UnknownTypeface(pub String);

/// Tick spacing for a linear axis: a labelled tick every `major`, an unlabelled one every
/// `minor`.
///
/// Both axes drawn by [`plot`] are logarithmic, so it carries this spacing without applying it.
/// Its labelled ticks sit at powers of the base and its shorter, unlabelled ticks at the integer
/// multiples in between.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AxisTicks {
    /// The distance between labelled ticks.
    pub major: f64,
    /// The distance between unlabelled ticks.
    pub minor: f64,
}

impl AxisTicks {
    /// Labelled ticks every `major`, unlabelled ones every `minor`.
    pub const fn new(major: f64, minor: f64) -> AxisTicks {
        AxisTicks { major, minor }
    }
}

/// Everything about a chart besides its data.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotConfig {
    /// Where the SVG is written.
    pub output: PathBuf,
    /// Width and height in pixels.
    pub size: (u32, u32),
    /// The typeface of all text.
    pub typeface: Typeface,
    /// A caption drawn above the chart, if any.
    pub caption: Option<String>,
    /// The X axis description.
    pub x_desc: String,
    /// The Y axis description.
    pub y_desc: String,
    /// Tick configuration of the problem size axis.
    pub x_ticks: AxisTicks,
    /// Tick configuration of the speedup axis.
    pub y_ticks: AxisTicks,
}

impl Default for PlotConfig {
    fn default() -> Self {
        PlotConfig {
            output: PathBuf::from(DEFAULT_OUTPUT),
            size: (640, 480),
            typeface: Typeface::default(),
            caption: None,
            x_desc: "Number of networks".to_owned(),
            y_desc: "GPU speedup".to_owned(),
            x_ticks: AxisTicks::new(5.0, 1.0),
            y_ticks: AxisTicks::new(2.0, 0.5),
        }
    }
}

/// Draw each group's mean speedup against its problem size, with error bars of one standard
/// deviation, and write the chart to the configured output.
///
/// Groups without measurements are left out. The problem size axis is logarithmic in base 2 and
/// the speedup axis in base 10.
pub fn plot(stats: &[GroupStatistic], config: &PlotConfig) -> Result<(), PlotError> {
    let points: Vec<&GroupStatistic> = stats
        .iter()
        .filter(|s| {
            let plottable = s.size > 0 && s.mean.is_finite() && s.mean > 0.0;
            if !plottable {
                warn!(size = s.size, count = s.count, mean = s.mean, "omitting group from chart");
            }
            plottable
        })
        .collect();
    if points.is_empty() {
        return Err(PlotError::NoData);
    }

    let x_range = bounds(points.iter().map(|s| s.size as f64));
    let x_range = (x_range.0 / 2.0, x_range.1 * 2.0);
    let y_range = bounds(points.iter().flat_map(|s| [s.mean - spread(s), s.mean + spread(s)]));
    let y_range = (y_range.0 / 1.5, y_range.1 * 1.5);
    // error bars can't reach below the bottom of a logarithmic axis
    let y_floor = y_range.0;

    debug!(path = %config.output.display(), groups = points.len(), "rendering chart");

    let root = SVGBackend::new(&config.output, config.size).into_drawing_area();
    root.fill(&WHITE).map_err(|e| render_error(&config.output, e))?;

    let family = config.typeface.font_stack();
    let mut builder = ChartBuilder::on(&root);
    builder.margin(15).x_label_area_size(45).y_label_area_size(55);
    if let Some(caption) = &config.caption {
        builder.caption(caption, (family, 20));
    }
    let mut chart = builder
        .build_cartesian_2d(
            (x_range.0..x_range.1).log_scale().base(2.0),
            (y_range.0..y_range.1).log_scale(),
        )
        .map_err(|e| render_error(&config.output, e))?;

    let (major, minor) = tick_lengths(config.size);
    chart
        .configure_mesh()
        .bold_line_style(BLACK.mix(0.15))
        .light_line_style(BLACK.mix(0.05))
        .x_max_light_lines(0)
        .y_max_light_lines(0)
        .set_all_tick_mark_size(major)
        .x_label_formatter(&|x| format!("{:.0}", x))
        .y_label_formatter(&|y| format!("{}", y))
        .x_desc(&config.x_desc)
        .y_desc(&config.y_desc)
        .label_style((family, 12))
        .axis_desc_style((family, 14))
        .draw()
        .map_err(|e| render_error(&config.output, e))?;

    // plotters draws a single tick length, so the shorter minor ticks point outward from the
    // bottom and left edges of the plotting area
    for x in log_minor_ticks(x_range, 2.0) {
        let (px, py) = chart.backend_coord(&(x, y_range.0));
        root.draw(&PathElement::new(vec![(px, py), (px, py + minor)], BLACK.stroke_width(1)))
            .map_err(|e| render_error(&config.output, e))?;
    }
    for y in log_minor_ticks(y_range, 10.0) {
        let (px, py) = chart.backend_coord(&(x_range.0, y));
        root.draw(&PathElement::new(vec![(px - minor, py), (px, py)], BLACK.stroke_width(1)))
            .map_err(|e| render_error(&config.output, e))?;
    }

    chart
        .draw_series(points.iter().map(|s| {
            ErrorBar::new_vertical(
                s.size as f64,
                (s.mean - spread(s)).max(y_floor),
                s.mean,
                s.mean + spread(s),
                BLACK.stroke_width(1),
                0,
            )
        }))
        .map_err(|e| render_error(&config.output, e))?;

    chart
        .draw_series(points.iter().map(|s| {
            Circle::new((s.size as f64, s.mean), MARKER_RADIUS, BLACK.filled())
        }))
        .map_err(|e| render_error(&config.output, e))?;

    root.present().map_err(|e| render_error(&config.output, e))?;
    Ok(())
}

fn render_error<E: fmt::Display>(path: &Path, e: E) -> PlotError {
    PlotError::Render { path: path.to_path_buf(), message: e.to_string() }
}

fn spread(s: &GroupStatistic) -> f64 {
    if s.stddev.is_finite() {
        s.stddev
    } else {
        0.0
    }
}

fn bounds<I: Iterator<Item = f64>>(values: I) -> (f64, f64) {
    values
        .filter(|v| v.is_finite() && *v > 0.0)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

/// Positions of the unlabelled ticks of a logarithmic axis over `range`: every integer multiple
/// `2..base` of each power of the base. A base of 2 or less has no such multiples, so every power
/// of the base gets one instead.
fn log_minor_ticks(range: (f64, f64), base: f64) -> Vec<f64> {
    let (lo, hi) = range;
    let mut ticks = Vec::new();
    if !(lo > 0.0 && hi > lo && base > 1.0) {
        return ticks;
    }
    let multiples: Vec<f64> =
        if base > 2.0 { (2..base.ceil() as u32).map(f64::from).collect() } else { vec![1.0] };
    let (first, last) = (lo.log(base).floor() as i32, hi.log(base).ceil() as i32);
    for k in first..=last {
        let power = base.powi(k);
        for m in &multiples {
            let tick = m * power;
            if tick >= lo && tick <= hi {
                ticks.push(tick);
            }
        }
    }
    ticks
}

/// Major and minor tick lengths in pixels, assuming the chart is printed 6.4 inches wide.
fn tick_lengths(size: (u32, u32)) -> (i32, i32) {
    let pixels_per_point = f64::from(size.0) / (6.4 * 72.0);
    let major = (MAJOR_TICK_LENGTH * pixels_per_point).round().max(2.0);
    let minor = (MINOR_TICK_LENGTH * pixels_per_point).round().max(1.0).min(major - 1.0);
    (major as i32, minor as i32)
}
