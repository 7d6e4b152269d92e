use std::{
    fs,
    ops::Range,
    path::{Path, PathBuf},
};

use campus_core::{BucketTotal, Campus};
use once_cell::sync::OnceCell;
use plotters::{
    coord::Shift,
    prelude::*,
    style::{register_font, FontStyle},
};
use time::{Date, PrimitiveDateTime};
use tracing::{debug, info, warn};

use super::{ensure_parent, write_error};
use crate::{
    dashboard::Dashboard,
    pipeline::{CombinedTable, PipelineError, Sink},
};

const WIDTH: u32 = 1200;
const HEIGHT: u32 = 1400;
const FONT_FAMILY: &str = "sans-serif";

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static FONT_READY: OnceCell<bool> = OnceCell::new();

/// Registers a sans-serif face for chart text, once per process.
///
/// Returns `false` when no usable font was found; the chart is then drawn
/// without captions or axis labels.
fn ensure_font(configured: Option<&Path>) -> bool {
    *FONT_READY.get_or_init(|| {
        let candidates = configured
            .map(Path::to_path_buf)
            .into_iter()
            .chain(FONT_CANDIDATES.iter().map(PathBuf::from));

        for path in candidates {
            let Ok(bytes) = fs::read(&path) else {
                continue;
            };
            // Registered fonts must outlive every chart drawn by this process.
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            match register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
                Ok(()) => {
                    debug!(path = %path.display(), "chart font registered");
                    return true;
                }
                Err(_) => warn!(path = %path.display(), "unusable chart font"),
            }
        }

        warn!("no chart font found, dashboard is drawn without text");
        false
    })
}

fn julian_label(day: i32) -> String {
    Date::from_julian_day(day)
        .map(|d| d.to_string())
        .unwrap_or_default()
}

/// Fractional day number, so readings within a day spread along the axis.
fn day_number(ts: PrimitiveDateTime) -> f64 {
    let (h, m, s) = ts.time().as_hms();
    let seconds = u32::from(h) * 3600 + u32::from(m) * 60 + u32::from(s);
    f64::from(ts.date().to_julian_day()) + f64::from(seconds) / 86_400.0
}

/// Value axis anchored at zero with a little headroom.
fn value_range<I: Iterator<Item = f64>>(values: I) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = if hi > lo { (hi - lo) * 0.1 } else { 1.0 };
    let bottom = if lo < 0.0 { lo - pad } else { 0.0 };
    bottom..hi + pad
}

fn draw_daily<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    daily: &[BucketTotal],
    labels: bool,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let days = daily.iter().map(|b| b.date.to_julian_day());
    let first = days.clone().min().unwrap_or(0);
    let last = days.max().unwrap_or(0);

    let mut builder = ChartBuilder::on(area);
    builder.margin(12);
    if labels {
        builder
            .caption("Daily Energy Usage", (FONT_FAMILY, 20))
            .x_label_area_size(40)
            .y_label_area_size(60);
    }
    let mut chart = builder.build_cartesian_2d(
        (first - 1)..(last + 1),
        value_range(daily.iter().map(|b| b.kwh)),
    )?;

    if labels {
        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc("kWh")
            .x_labels(8)
            .x_label_formatter(&|day: &i32| julian_label(*day))
            .draw()?;
    }

    chart.draw_series(LineSeries::new(
        daily.iter().map(|b| (b.date.to_julian_day(), b.kwh)),
        &BLUE,
    ))?;
    chart.draw_series(
        daily
            .iter()
            .map(|b| Circle::new((b.date.to_julian_day(), b.kwh), 4, BLUE.filled())),
    )?;
    Ok(())
}

fn draw_averages<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    campus: &Campus,
    labels: bool,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let names: Vec<&str> = campus.buildings().map(|b| b.name()).collect();
    let averages: Vec<f64> = campus.buildings().map(|b| b.average()).collect();
    let slots = names.len().max(1) as u32;

    let mut builder = ChartBuilder::on(area);
    builder.margin(12);
    if labels {
        builder
            .caption("Average Usage per Building", (FONT_FAMILY, 20))
            .x_label_area_size(40)
            .y_label_area_size(60);
    }
    let mut chart = builder.build_cartesian_2d(
        (0u32..slots).into_segmented(),
        value_range(averages.iter().copied()),
    )?;

    if labels {
        chart
            .configure_mesh()
            .disable_x_mesh()
            .y_desc("kWh")
            .x_labels(slots as usize)
            .x_label_formatter(&|v: &SegmentValue<u32>| match v {
                SegmentValue::CenterOf(i) => names
                    .get(*i as usize)
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
                _ => String::new(),
            })
            .draw()?;
    }

    chart.draw_series(averages.iter().enumerate().map(|(i, avg)| {
        let i = i as u32;
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *avg)],
            BLUE.mix(0.7).filled(),
        );
        bar.set_margin(0, 0, 8, 8);
        bar
    }))?;
    Ok(())
}

fn draw_scatter<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    combined: &CombinedTable,
    labels: bool,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let xs = combined.rows().iter().map(|r| day_number(r.reading.ts));
    let first = xs.clone().fold(f64::INFINITY, f64::min);
    let last = xs.fold(f64::NEG_INFINITY, f64::max);
    let x_range = if first.is_finite() && last.is_finite() {
        (first - 0.5)..(last + 0.5)
    } else {
        0.0..1.0
    };

    let mut builder = ChartBuilder::on(area);
    builder.margin(12);
    if labels {
        builder
            .caption("Peak Load Scatter Plot", (FONT_FAMILY, 20))
            .x_label_area_size(40)
            .y_label_area_size(60);
    }
    let mut chart = builder.build_cartesian_2d(
        x_range,
        value_range(combined.rows().iter().map(|r| r.reading.kwh)),
    )?;

    if labels {
        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc("kWh")
            .x_labels(8)
            .x_label_formatter(&|x: &f64| julian_label(x.floor() as i32))
            .draw()?;
    }

    chart.draw_series(combined.rows().iter().map(|r| {
        Circle::new(
            (day_number(r.reading.ts), r.reading.kwh),
            3,
            BLUE.mix(0.6).filled(),
        )
    }))?;
    Ok(())
}

/// Draws the three-panel dashboard into a PNG at `path`.
pub fn render(path: &Path, dashboard: &Dashboard, labels: bool) -> Result<(), PipelineError> {
    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| write_error(path, e))?;

    let panels = if labels {
        root.titled("Campus Energy Dashboard", (FONT_FAMILY, 28))
            .map_err(|e| write_error(path, e))?
            .split_evenly((3, 1))
    } else {
        root.split_evenly((3, 1))
    };

    draw_daily(&panels[0], &dashboard.daily, labels).map_err(|e| write_error(path, e))?;
    draw_averages(&panels[1], &dashboard.campus, labels).map_err(|e| write_error(path, e))?;
    draw_scatter(&panels[2], &dashboard.combined, labels).map_err(|e| write_error(path, e))?;

    root.present().map_err(|e| write_error(path, e))
}

pub struct DashboardChartSink {
    path: PathBuf,
    font: Option<PathBuf>,
}

impl DashboardChartSink {
    pub fn new<P: Into<PathBuf>>(path: P, font: Option<PathBuf>) -> Self {
        Self {
            path: path.into(),
            font,
        }
    }
}

#[async_trait::async_trait]
impl Sink<Dashboard> for DashboardChartSink {
    async fn write(&self, input: &Dashboard) -> Result<(), PipelineError> {
        ensure_parent(&self.path)?;
        let labels = ensure_font(self.font.as_deref());
        render(&self.path, input, labels)?;
        info!(path = %self.path.display(), "saved dashboard chart");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{FileBatch, IngestState};
    use crate::transform::MeterRow;
    use campus_core::Reading;
    use std::env;
    use time::macros::{date, datetime};

    fn batch(name: &str, rows: &[(PrimitiveDateTime, f64)]) -> FileBatch {
        let mut batch = FileBatch::new(name);
        batch.rows = rows
            .iter()
            .map(|(ts, kwh)| MeterRow {
                reading: Reading::new(*ts, *kwh),
                extra: Vec::new(),
            })
            .collect();
        batch
    }

    fn dashboard() -> Dashboard {
        let a = batch(
            "A",
            &[
                (datetime!(2024-01-01 00:00:00), 10.0),
                (datetime!(2024-01-02 06:00:00), 20.0),
            ],
        );
        let b = batch("B", &[(datetime!(2024-01-09 00:00:00), 5.0)]);
        Dashboard::from_state(IngestState::default().ingest(a).ingest(b))
    }

    #[test]
    fn value_range_starts_at_zero_with_headroom() {
        let r = value_range([10.0, 20.0, f64::NAN].into_iter());
        assert_eq!(r.start, 0.0);
        assert!(r.end > 20.0);

        let r = value_range([-5.0, 5.0].into_iter());
        assert!(r.start < -5.0);

        let r = value_range(std::iter::empty());
        assert_eq!(r, 0.0..1.0);
    }

    #[test]
    fn day_number_spreads_within_a_day() {
        let midnight = day_number(datetime!(2024-01-01 00:00:00));
        let noon = day_number(datetime!(2024-01-01 12:00:00));
        assert_eq!(noon - midnight, 0.5);
        assert_eq!(julian_label(midnight as i32), date!(2024-01-01).to_string());
    }

    #[test]
    fn render_writes_png_with_captions_and_labels() {
        // Text needs a registered face; hosts without any known font skip.
        if !ensure_font(None) {
            return;
        }
        let path = env::temp_dir().join(format!("energy_dashboard_{}_chart_labels.png", std::process::id()));
        render(&path, &dashboard(), true).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn render_writes_png_without_text() {
        let path = env::temp_dir().join(format!("energy_dashboard_{}_chart.png", std::process::id()));
        render(&path, &dashboard(), false).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
        fs::remove_file(&path).unwrap();
    }
}
