// core/src/dashboard.rs
//
// Figurer for én aktivitet (dashbord + rutekart) og for aktivitetslisten
// (ukentlig distanse, treningsbelastning). Ingen global tema-tilstand:
// alt styres av `RenderConfig` som sendes inn.
use std::collections::BTreeMap;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use log::info;
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;

use crate::analyzer::DerivedMetrics;
use crate::config::{ImageFormat, RenderConfig, Theme};
use crate::error::Result;
use crate::metrics;
use crate::summary::{DailyLoad, ZoneMinutes};
use crate::types::{ActivityContext, StreamRecord};
use crate::zones::{resolve_max_hr, samples_per_zone, ZONE_LABELS};

const ZONE_COLORS: [RGBColor; 5] = [
    RGBColor(52, 152, 219),
    RGBColor(46, 204, 113),
    RGBColor(241, 196, 15),
    RGBColor(230, 126, 34),
    RGBColor(231, 76, 60),
];

#[derive(Debug, Clone, Copy)]
struct Palette {
    background: RGBColor,
    foreground: RGBColor,
    grid: RGBColor,
    heartrate: RGBColor,
    power: RGBColor,
    speed: RGBColor,
    cadence: RGBColor,
    altitude: RGBColor,
    route: RGBColor,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        let (background, foreground, grid) = match theme {
            Theme::Dark => (RGBColor(17, 17, 17), RGBColor(230, 230, 230), RGBColor(60, 60, 60)),
            Theme::Light => (RGBColor(255, 255, 255), RGBColor(30, 30, 30), RGBColor(215, 215, 215)),
        };
        Self {
            background,
            foreground,
            grid,
            heartrate: RGBColor(231, 76, 60),
            power: RGBColor(52, 152, 219),
            speed: RGBColor(46, 204, 113),
            cadence: RGBColor(155, 89, 182),
            altitude: RGBColor(241, 196, 15),
            route: RGBColor(230, 126, 34),
        }
    }

    fn caption(&self, size: u32) -> TextStyle<'static> {
        ("sans-serif", size).into_font().color(&self.foreground)
    }
}

/// Velg backend etter format, tegn, og skriv filen.
macro_rules! render_to {
    ($cfg:expr, $path:expr, $size:expr, |$root:ident| $body:expr) => {{
        if let Some(parent) = $path.parent() {
            fs::create_dir_all(parent)?;
        }
        match $cfg.format {
            ImageFormat::Svg => {
                let $root = SVGBackend::new($path, $size).into_drawing_area();
                $body?;
                $root.present()?;
            }
            ImageFormat::Png => {
                let $root = BitMapBackend::new($path, $size).into_drawing_area();
                $body?;
                $root.present()?;
            }
        }
    }};
}

/// Kanal for fargelagt rutekart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapChannel {
    Altitude,
    Speed,
}

impl MapChannel {
    pub const ALL: [MapChannel; 2] = [MapChannel::Altitude, MapChannel::Speed];

    pub fn column(self) -> &'static str {
        match self {
            MapChannel::Altitude => "altitude",
            MapChannel::Speed => "velocity_smooth",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MapChannel::Altitude => "Altitude (m)",
            MapChannel::Speed => "Speed (km/h)",
        }
    }

    pub fn multiplier(self) -> f64 {
        match self {
            MapChannel::Altitude => 1.0,
            MapChannel::Speed => 3.6,
        }
    }

    /// Kanaler som kan tegnes: krever rute og selve kanalen.
    pub fn available(rec: &StreamRecord) -> Vec<MapChannel> {
        let caps = rec.capabilities();
        if !caps.route {
            return Vec::new();
        }
        Self::ALL
            .into_iter()
            .filter(|c| match c {
                MapChannel::Altitude => caps.altitude,
                MapChannel::Speed => caps.speed,
            })
            .collect()
    }
}

/// Mappenavn for figurene: `{navn_med_understrek}_{YYYYmmdd_HHMMSS}`.
/// Starttid fra aktiviteten, ellers `now`.
pub fn visualization_folder_name(name: &str, start: Option<NaiveDateTime>, now: NaiveDateTime) -> String {
    let safe: String = name
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    let stamp = start.unwrap_or(now).format("%Y%m%d_%H%M%S");
    format!("{safe}_{stamp}")
}

/// Rader i nøkkeltall-tabellen, i visningsrekkefølge.
pub fn metric_rows(rec: &StreamRecord, m: &DerivedMetrics) -> Vec<(&'static str, f64)> {
    let mut rows = Vec::new();
    if let Some(hr) = rec.heartrate.as_deref() {
        let finite: Vec<f64> = hr.iter().copied().filter(|v| v.is_finite()).collect();
        if let (Some(avg), Some(max)) = (metrics::mean(&finite), metrics::max(&finite)) {
            rows.push(("Avg HR", avg));
            rows.push(("Max HR", max));
        }
    }
    if let Some(p) = &m.power {
        rows.push(("Avg Power", p.average));
        rows.push(("Max Power", p.max));
        rows.push(("NP (est)", p.normalized_power.unwrap_or(0.0)));
    }
    if let Some(s) = &m.speed {
        rows.push(("Avg Speed", s.average * 3.6));
        rows.push(("Max Speed", s.max * 3.6));
    }
    if let Some(c) = &m.cadence {
        rows.push(("Avg Cadence", c.average));
    }
    if let Some(e) = &m.elevation {
        rows.push(("Elevation Gain", e.gain));
    }
    rows
}

/// Skaler `v` til [0, 1] innenfor `[lo, hi]`. Flat serie gir 0.5.
pub fn normalize(v: f64, lo: f64, hi: f64) -> f64 {
    if !(hi > lo) {
        return 0.5;
    }
    ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
}

/// Blå (lav) til rød (høy).
fn ramp(t: f64) -> HSLColor {
    HSLColor(0.66 * (1.0 - t), 0.85, 0.5)
}

fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return 0.0..1.0;
    }
    if hi <= lo {
        return (lo - 1.0)..(hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad)..(hi + pad)
}

fn xy(xs: &[f64], ys: &[f64], scale: f64) -> Vec<(f64, f64)> {
    xs.iter()
        .zip(ys)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y * scale))
        .collect()
}

struct Series {
    label: &'static str,
    points: Vec<(f64, f64)>,
    color: RGBColor,
}

/// Ett panel med én eller to y-akser.
fn draw_panel<DB>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    x_desc: &str,
    series: Vec<Series>,
    pal: &Palette,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let mut it = series.into_iter().filter(|s| !s.points.is_empty());
    let Some(primary) = it.next() else {
        return draw_placeholder(area, title, pal);
    };
    let secondary = it.next();

    let x_range = padded_range(
        primary
            .points
            .iter()
            .chain(secondary.iter().flat_map(|s| s.points.iter()))
            .map(|p| p.0),
    );
    let y_range = padded_range(primary.points.iter().map(|p| p.1));

    let mut builder = ChartBuilder::on(area);
    builder
        .caption(title, pal.caption(18))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(45);

    match secondary {
        None => {
            let mut chart = builder.build_cartesian_2d(x_range, y_range)?;
            chart
                .configure_mesh()
                .x_desc(x_desc)
                .y_desc(primary.label)
                .label_style(pal.caption(12))
                .axis_style(pal.foreground)
                .light_line_style(pal.grid)
                .draw()?;
            let color = primary.color;
            chart.draw_series(LineSeries::new(primary.points, color.stroke_width(2)))?;
        }
        Some(second) => {
            builder.right_y_label_area_size(45);
            let y2_range = padded_range(second.points.iter().map(|p| p.1));
            let mut chart = builder
                .build_cartesian_2d(x_range.clone(), y_range)?
                .set_secondary_coord(x_range, y2_range);
            chart
                .configure_mesh()
                .x_desc(x_desc)
                .y_desc(primary.label)
                .label_style(pal.caption(12))
                .axis_style(pal.foreground)
                .light_line_style(pal.grid)
                .draw()?;
            chart
                .configure_secondary_axes()
                .y_desc(second.label)
                .label_style(pal.caption(12))
                .draw()?;

            let (c1, c2) = (primary.color, second.color);
            chart
                .draw_series(LineSeries::new(primary.points, c1.stroke_width(2)))?
                .label(primary.label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], c1));
            chart
                .draw_secondary_series(LineSeries::new(second.points, c2.stroke_width(2)))?
                .label(second.label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], c2));
            chart
                .configure_series_labels()
                .background_style(pal.background.mix(0.8))
                .border_style(pal.foreground)
                .label_font(pal.caption(12))
                .draw()?;
        }
    }
    Ok(())
}

fn draw_placeholder<DB>(area: &DrawingArea<DB, Shift>, title: &str, pal: &Palette) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let area = area.titled(title, pal.caption(18))?;
    let (w, h) = area.dim_in_pixel();
    area.draw_text("no data", &pal.caption(14), (w as i32 / 2 - 25, h as i32 / 2))?;
    Ok(())
}

fn draw_altitude<DB>(area: &DrawingArea<DB, Shift>, rec: &StreamRecord, pal: &Palette) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let Some(alt) = rec.altitude.as_deref() else {
        return draw_placeholder(area, "Altitude profile", pal);
    };
    let (xs, x_desc): (Vec<f64>, &str) = match rec.distance.as_deref() {
        Some(d) => (d.iter().map(|m| m / 1000.0).collect(), "Distance (km)"),
        None => (minutes(rec), "Time (min)"),
    };
    let points = xy(&xs, alt, 1.0);
    if points.is_empty() {
        return draw_placeholder(area, "Altitude profile", pal);
    }
    let x_range = padded_range(points.iter().map(|p| p.0));
    let y_range = padded_range(points.iter().map(|p| p.1));
    let baseline = y_range.start;

    let mut chart = ChartBuilder::on(area)
        .caption("Altitude profile", pal.caption(18))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(45)
        .build_cartesian_2d(x_range, y_range)?;
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc("Altitude (m)")
        .label_style(pal.caption(12))
        .axis_style(pal.foreground)
        .light_line_style(pal.grid)
        .draw()?;
    chart.draw_series(
        AreaSeries::new(points, baseline, pal.altitude.mix(0.3)).border_style(pal.altitude.stroke_width(2)),
    )?;
    Ok(())
}

fn route_points(rec: &StreamRecord) -> Vec<(usize, f64, f64)> {
    match (rec.latitude.as_deref(), rec.longitude.as_deref()) {
        (Some(lat), Some(lng)) => lat
            .iter()
            .zip(lng)
            .enumerate()
            .filter(|(_, (la, lo))| la.is_finite() && lo.is_finite())
            .map(|(i, (la, lo))| (i, *lo, *la))
            .collect(),
        _ => Vec::new(),
    }
}

fn draw_route<DB>(area: &DrawingArea<DB, Shift>, rec: &StreamRecord, pal: &Palette) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let pts = route_points(rec);
    let (Some(first), Some(last)) = (pts.first(), pts.last()) else {
        return draw_placeholder(area, "Route", pal);
    };
    let mut chart = ChartBuilder::on(area)
        .caption("Route", pal.caption(18))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(45)
        .build_cartesian_2d(
            padded_range(pts.iter().map(|p| p.1)),
            padded_range(pts.iter().map(|p| p.2)),
        )?;
    chart
        .configure_mesh()
        .x_desc("Longitude")
        .y_desc("Latitude")
        .label_style(pal.caption(12))
        .axis_style(pal.foreground)
        .light_line_style(pal.grid)
        .draw()?;
    chart.draw_series(LineSeries::new(
        pts.iter().map(|p| (p.1, p.2)),
        pal.route.stroke_width(2),
    ))?;
    chart.draw_series([
        Circle::new((first.1, first.2), 5, GREEN.filled()),
        Circle::new((last.1, last.2), 5, RED.filled()),
    ])?;
    Ok(())
}

fn draw_zone_pie<DB>(
    area: &DrawingArea<DB, Shift>,
    rec: &StreamRecord,
    ctx: &ActivityContext,
    pal: &Palette,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let counts = rec
        .heartrate
        .as_deref()
        .and_then(|hr| resolve_max_hr(ctx.max_heartrate, hr).map(|m| samples_per_zone(hr, m)));
    let Some(counts) = counts.filter(|c| c.iter().sum::<usize>() > 0) else {
        return draw_placeholder(area, "HR zones", pal);
    };
    let total = counts.iter().sum::<usize>() as f64;

    let mut sizes = Vec::new();
    let mut colors = Vec::new();
    let mut labels = Vec::new();
    for (i, n) in counts.iter().enumerate().filter(|(_, n)| **n > 0) {
        sizes.push(*n as f64);
        colors.push(ZONE_COLORS[i]);
        labels.push(format!("{} {:.0}%", ZONE_LABELS[i], *n as f64 / total * 100.0));
    }

    let area = area.titled("HR zones", pal.caption(18))?;
    let (w, h) = area.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2);
    let radius = f64::from(w.min(h)) * 0.32;
    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.label_style(pal.caption(12));
    area.draw(&pie)?;
    Ok(())
}

fn draw_metrics_table<DB>(
    area: &DrawingArea<DB, Shift>,
    rows: &[(&'static str, f64)],
    pal: &Palette,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let area = area.titled("Metrics", pal.caption(18))?;
    let header = pal.caption(15);
    let cell = pal.caption(14);
    area.draw_text("Metric", &header, (30, 10))?;
    area.draw_text("Value", &header, (230, 10))?;
    for (i, (name, value)) in rows.iter().enumerate() {
        let y = 40 + i as i32 * 24;
        area.draw_text(name, &cell, (30, y))?;
        area.draw_text(&format!("{value:.1}"), &cell, (230, y))?;
    }
    Ok(())
}

fn minutes(rec: &StreamRecord) -> Vec<f64> {
    rec.time.iter().map(|t| f64::from(*t) / 60.0).collect()
}

fn draw_dashboard<DB>(
    root: &DrawingArea<DB, Shift>,
    rec: &StreamRecord,
    m: &DerivedMetrics,
    ctx: &ActivityContext,
    pal: &Palette,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&pal.background)?;
    let title = if ctx.name.is_empty() {
        format!("Activity {}", ctx.id)
    } else {
        ctx.name.clone()
    };
    let body = root.titled(&title, pal.caption(26))?;
    let panels = body.split_evenly((3, 2));
    let mins = minutes(rec);

    let series = |label, col: Option<&[f64]>, scale, color| Series {
        label,
        points: col.map(|c| xy(&mins, c, scale)).unwrap_or_default(),
        color,
    };

    draw_panel(
        &panels[0],
        "Heart rate & power",
        "Time (min)",
        vec![
            series("Heart rate (bpm)", rec.heartrate.as_deref(), 1.0, pal.heartrate),
            series("Power (W)", rec.watts.as_deref(), 1.0, pal.power),
        ],
        pal,
    )?;
    draw_panel(
        &panels[1],
        "Speed & cadence",
        "Time (min)",
        vec![
            series("Speed (km/h)", rec.velocity_smooth.as_deref(), 3.6, pal.speed),
            series("Cadence (rpm)", rec.cadence.as_deref(), 1.0, pal.cadence),
        ],
        pal,
    )?;
    draw_altitude(&panels[2], rec, pal)?;
    draw_route(&panels[3], rec, pal)?;
    draw_zone_pie(&panels[4], rec, ctx, pal)?;
    draw_metrics_table(&panels[5], &metric_rows(rec, m), pal)?;
    Ok(())
}

pub fn render_dashboard(
    rec: &StreamRecord,
    m: &DerivedMetrics,
    ctx: &ActivityContext,
    path: &Path,
    cfg: &RenderConfig,
) -> Result<()> {
    let pal = Palette::for_theme(cfg.theme);
    render_to!(cfg, path, (cfg.width, cfg.height), |root| draw_dashboard(
        &root, rec, m, ctx, &pal
    ));
    info!("Dashboard saved to {}", path.display());
    Ok(())
}

fn draw_route_map<DB>(
    root: &DrawingArea<DB, Shift>,
    rec: &StreamRecord,
    channel: MapChannel,
    pal: &Palette,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&pal.background)?;
    let values = rec.channel(channel.column()).unwrap_or(&[]);
    let pts: Vec<(f64, f64, f64)> = route_points(rec)
        .into_iter()
        .filter_map(|(i, lo, la)| {
            let v = values.get(i).copied()? * channel.multiplier();
            v.is_finite().then_some((lo, la, v))
        })
        .collect();
    if pts.is_empty() {
        return draw_placeholder(root, channel.label(), pal);
    }
    let lo = pts.iter().map(|p| p.2).fold(f64::INFINITY, f64::min);
    let hi = pts.iter().map(|p| p.2).fold(f64::NEG_INFINITY, f64::max);

    let caption = format!("Route coloured by {} ({lo:.1} to {hi:.1})", channel.label());
    let mut chart = ChartBuilder::on(root)
        .caption(caption, pal.caption(20))
        .margin(15)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(
            padded_range(pts.iter().map(|p| p.0)),
            padded_range(pts.iter().map(|p| p.1)),
        )?;
    chart
        .configure_mesh()
        .x_desc("Longitude")
        .y_desc("Latitude")
        .label_style(pal.caption(12))
        .axis_style(pal.foreground)
        .light_line_style(pal.grid)
        .draw()?;
    chart.draw_series(
        pts.iter()
            .map(|(x, y, v)| Circle::new((*x, *y), 3, ramp(normalize(*v, lo, hi)).filled())),
    )?;
    Ok(())
}

/// Rutekart fargelagt etter `channel`. Returnerer `false` uten å skrive noe
/// hvis rute eller kanal mangler.
pub fn render_route_map(rec: &StreamRecord, channel: MapChannel, path: &Path, cfg: &RenderConfig) -> Result<bool> {
    if !MapChannel::available(rec).contains(&channel) {
        return Ok(false);
    }
    let pal = Palette::for_theme(cfg.theme);
    let size = (cfg.width, cfg.width * 3 / 4);
    render_to!(cfg, path, size, |root| draw_route_map(&root, rec, channel, &pal));
    info!("Map saved to {}", path.display());
    Ok(true)
}

/// Dashbord og alle tilgjengelige kart i `dir`. Returnerer skrevne filer.
pub fn render_activity_figures(
    rec: &StreamRecord,
    m: &DerivedMetrics,
    ctx: &ActivityContext,
    dir: &Path,
    cfg: &RenderConfig,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let ext = cfg.format.extension();
    let mut written = Vec::new();

    let dashboard = dir.join(format!("dashboard.{ext}"));
    render_dashboard(rec, m, ctx, &dashboard, cfg)?;
    written.push(dashboard);

    for channel in MapChannel::available(rec) {
        let path = dir.join(format!("map_{}.{ext}", channel.column()));
        if render_route_map(rec, channel, &path, cfg)? {
            written.push(path);
        }
    }
    info!("Visualizations saved to {}", dir.display());
    Ok(written)
}

fn index_label(labels: &[String], v: f64) -> String {
    let i = v.round();
    if (v - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    labels.get(i as usize).cloned().unwrap_or_default()
}

fn draw_weekly<DB>(
    root: &DrawingArea<DB, Shift>,
    weeks: &BTreeMap<NaiveDate, f64>,
    activity_type: &str,
    pal: &Palette,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&pal.background)?;
    let labels: Vec<String> = weeks.keys().map(|d| d.format("%Y-%m-%d").to_string()).collect();
    let y_max = weeks.values().copied().fold(0.0, f64::max).max(1.0) * 1.1;
    let n = weeks.len() as f64;

    let mut chart = ChartBuilder::on(root)
        .caption(format!("Weekly {activity_type} distance"), pal.caption(24))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5..(n - 0.5), 0.0..y_max)?;
    let fmt = |v: &f64| index_label(&labels, *v);
    chart
        .configure_mesh()
        .x_desc("Week ending")
        .y_desc("Distance (km)")
        .x_label_formatter(&fmt)
        .label_style(pal.caption(12))
        .axis_style(pal.foreground)
        .light_line_style(pal.grid)
        .draw()?;
    chart.draw_series(weeks.values().enumerate().map(|(i, km)| {
        let x = i as f64;
        Rectangle::new([(x - 0.4, 0.0), (x + 0.4, *km)], pal.power.filled())
    }))?;
    Ok(())
}

/// Søylediagram: km per uke.
pub fn render_weekly_distance(
    weeks: &BTreeMap<NaiveDate, f64>,
    activity_type: &str,
    path: &Path,
    cfg: &RenderConfig,
) -> Result<bool> {
    if weeks.is_empty() {
        return Ok(false);
    }
    let pal = Palette::for_theme(cfg.theme);
    let size = (cfg.width, cfg.width / 2);
    render_to!(cfg, path, size, |root| draw_weekly(&root, weeks, activity_type, &pal));
    info!("Weekly {activity_type} distance plot saved to {}", path.display());
    Ok(true)
}

fn draw_hr_zones<DB>(root: &DrawingArea<DB, Shift>, zones: &[ZoneMinutes], activity_type: &str, pal: &Palette) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&pal.background)?;
    let labels: Vec<String> = zones.iter().map(|z| z.zone.to_string()).collect();
    let y_max = zones.iter().map(|z| z.minutes).fold(0.0, f64::max).max(1.0) * 1.1;
    let n = zones.len() as f64;

    let mut chart = ChartBuilder::on(root)
        .caption(
            format!("Time spent in heart rate zones ({activity_type})"),
            pal.caption(24),
        )
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5..(n - 0.5), 0.0..y_max)?;
    let fmt = |v: &f64| index_label(&labels, *v);
    chart
        .configure_mesh()
        .x_desc("Heart rate zone")
        .y_desc("Time (minutes)")
        .x_label_formatter(&fmt)
        .label_style(pal.caption(12))
        .axis_style(pal.foreground)
        .light_line_style(pal.grid)
        .draw()?;
    chart.draw_series(zones.iter().enumerate().map(|(i, z)| {
        let x = i as f64;
        let color = ZONE_COLORS[i % ZONE_COLORS.len()];
        Rectangle::new([(x - 0.4, 0.0), (x + 0.4, z.minutes)], color.filled())
    }))?;
    Ok(())
}

/// Søylediagram: bevegelsestid per pulssone over aktivitetslisten.
pub fn render_hr_zones(zones: &[ZoneMinutes], activity_type: &str, path: &Path, cfg: &RenderConfig) -> Result<bool> {
    if zones.is_empty() {
        return Ok(false);
    }
    let pal = Palette::for_theme(cfg.theme);
    let size = (cfg.width, cfg.width / 2);
    render_to!(cfg, path, size, |root| draw_hr_zones(&root, zones, activity_type, &pal));
    info!("Heart rate zones plot saved to {}", path.display());
    Ok(true)
}

fn draw_load<DB>(root: &DrawingArea<DB, Shift>, load: &[DailyLoad], activity_type: &str, pal: &Palette) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&pal.background)?;
    let labels: Vec<String> = load.iter().map(|d| d.date.format("%m-%d").to_string()).collect();
    let y_max = load
        .iter()
        .map(|d| d.load.max(d.rolling_avg.unwrap_or(0.0)))
        .fold(0.0, f64::max)
        .max(1.0)
        * 1.1;
    let n = load.len() as f64;

    let mut chart = ChartBuilder::on(root)
        .caption(format!("{activity_type} training load"), pal.caption(24))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5..(n - 0.5), 0.0..y_max)?;
    let fmt = |v: &f64| index_label(&labels, *v);
    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Training load")
        .x_label_formatter(&fmt)
        .label_style(pal.caption(12))
        .axis_style(pal.foreground)
        .light_line_style(pal.grid)
        .draw()?;

    let bar = pal.power;
    chart
        .draw_series(load.iter().enumerate().map(|(i, d)| {
            let x = i as f64;
            Rectangle::new([(x - 0.4, 0.0), (x + 0.4, d.load)], bar.filled())
        }))?
        .label("Daily load")
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], bar.filled()));

    let line = pal.heartrate;
    chart
        .draw_series(LineSeries::new(
            load.iter()
                .enumerate()
                .filter_map(|(i, d)| d.rolling_avg.map(|a| (i as f64, a))),
            line.stroke_width(3),
        ))?
        .label("7-day average")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line));

    chart
        .configure_series_labels()
        .background_style(pal.background.mix(0.8))
        .border_style(pal.foreground)
        .label_font(pal.caption(12))
        .draw()?;
    Ok(())
}

/// Daglig belastning som søyler pluss 7-dagers snitt som linje.
pub fn render_training_load(load: &[DailyLoad], activity_type: &str, path: &Path, cfg: &RenderConfig) -> Result<bool> {
    if load.is_empty() {
        return Ok(false);
    }
    let pal = Palette::for_theme(cfg.theme);
    let size = (cfg.width, cfg.width / 2);
    render_to!(cfg, path, size, |root| draw_load(&root, load, activity_type, &pal));
    info!("{activity_type} training load plot saved to {}", path.display());
    Ok(true)
}
