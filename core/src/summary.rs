// core/src/summary.rs
use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::metrics;
use crate::types::ActivitySummary;

/// Rullende vindu for treningsbelastning (dager).
pub const LOAD_WINDOW_DAYS: usize = 7;

/// Faste pulsgrenser (bpm) for sonefordeling over aktivitetslisten,
/// halvåpne `[lo, hi)`. Uavhengig av utøverens makspuls.
pub const LIST_HR_ZONE_EDGES: [f64; 6] = [0.0, 120.0, 140.0, 160.0, 180.0, 200.0];
pub const LIST_HR_ZONE_NAMES: [&str; 5] = ["Z1", "Z2", "Z3", "Z4", "Z5"];

/// Nøkkeltall over en liste aktiviteter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total_activities: usize,
    pub activities_past_week: usize,
    pub total_distance_km: f64,
    pub total_elevation_m: f64,
    pub total_moving_time_h: f64,
    pub avg_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub avg_speed_kmh: Option<f64>,
    pub max_speed_kmh: Option<f64>,
    pub avg_watts: Option<f64>,
    pub max_watts: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoneMinutes {
    pub zone: &'static str,
    pub minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyLoad {
    pub date: NaiveDate,
    pub load: f64,
    /// `None` til vi har et fullt 7-dagers vindu.
    pub rolling_avg: Option<f64>,
}

pub fn filter_by_type<'a>(activities: &'a [ActivitySummary], activity_type: &str) -> Vec<&'a ActivitySummary> {
    activities
        .iter()
        .filter(|a| a.activity_type == activity_type)
        .collect()
}

/// Aktiviteter som startet innen `days` dager før `now`.
pub fn filter_recent<'a>(
    activities: &[&'a ActivitySummary],
    days: u32,
    now: NaiveDateTime,
) -> Vec<&'a ActivitySummary> {
    let cutoff = now - Duration::days(i64::from(days));
    activities
        .iter()
        .copied()
        .filter(|a| a.start_local().is_some_and(|t| t >= cutoff))
        .collect()
}

fn collect(activities: &[&ActivitySummary], f: impl Fn(&ActivitySummary) -> Option<f64>) -> Vec<f64> {
    activities
        .iter()
        .filter_map(|a| f(a))
        .filter(|v| v.is_finite())
        .collect()
}

/// `None` for tom liste.
pub fn summary_stats(activities: &[&ActivitySummary], now: NaiveDateTime) -> Option<SummaryStats> {
    if activities.is_empty() {
        return None;
    }
    let sum = |f: fn(&ActivitySummary) -> Option<f64>| collect(activities, f).iter().sum::<f64>();

    Some(SummaryStats {
        total_activities: activities.len(),
        activities_past_week: filter_recent(activities, 7, now).len(),
        total_distance_km: sum(|a| a.distance) / 1000.0,
        total_elevation_m: sum(|a| a.total_elevation_gain),
        total_moving_time_h: sum(|a| a.moving_time) / 3600.0,
        avg_heartrate: metrics::mean(&collect(activities, |a| a.average_heartrate)),
        max_heartrate: metrics::max(&collect(activities, |a| a.max_heartrate)),
        avg_speed_kmh: metrics::mean(&collect(activities, |a| a.average_speed)).map(|v| v * 3.6),
        max_speed_kmh: metrics::max(&collect(activities, |a| a.max_speed)).map(|v| v * 3.6),
        avg_watts: metrics::mean(&collect(activities, |a| a.average_watts)),
        max_watts: metrics::max(&collect(activities, |a| a.max_watts)),
    })
}

/// Søndagen som avslutter uken `date` ligger i.
pub fn week_ending(date: NaiveDate) -> NaiveDate {
    let to_sunday = 6 - i64::from(date.weekday().num_days_from_monday());
    date + Duration::days(to_sunday)
}

/// Kilometer per uke (uker slutter søndag). Uker uten aktivitet mellom
/// første og siste uke tas med som 0.
pub fn weekly_distance(activities: &[&ActivitySummary]) -> BTreeMap<NaiveDate, f64> {
    let mut weeks: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for a in activities {
        if let Some(start) = a.start_local() {
            let km = a.distance.filter(|d| d.is_finite()).unwrap_or(0.0) / 1000.0;
            *weeks.entry(week_ending(start.date())).or_insert(0.0) += km;
        }
    }
    fill_gaps(&mut weeks, 7);
    weeks
}

fn fill_gaps(series: &mut BTreeMap<NaiveDate, f64>, step_days: i64) {
    let (Some(first), Some(last)) = (series.keys().next().copied(), series.keys().next_back().copied()) else {
        return;
    };
    let mut d = first;
    while d < last {
        series.entry(d).or_insert(0.0);
        d += Duration::days(step_days);
    }
}

/// Bevegelsestid (min) per pulssone, der hver aktivitet plasseres etter
/// `average_heartrate`. Alle fem soner returneres, også tomme.
/// `None` når ingen aktivitet har snittpuls.
pub fn hr_zone_minutes(activities: &[&ActivitySummary]) -> Option<Vec<ZoneMinutes>> {
    if !activities.iter().any(|a| a.average_heartrate.is_some_and(f64::is_finite)) {
        return None;
    }
    let mut minutes = [0.0f64; 5];
    for a in activities {
        let Some(hr) = a.average_heartrate else {
            continue;
        };
        let zone = LIST_HR_ZONE_EDGES
            .windows(2)
            .position(|w| hr >= w[0] && hr < w[1]);
        if let Some(z) = zone {
            minutes[z] += a.moving_time.filter(|t| t.is_finite()).unwrap_or(0.0) / 60.0;
        }
    }
    Some(
        LIST_HR_ZONE_NAMES
            .iter()
            .zip(minutes)
            .map(|(zone, minutes)| ZoneMinutes { zone: *zone, minutes })
            .collect(),
    )
}

/// Daglig belastning `moving_time × average_heartrate / 3600`, sammenhengende
/// dager, med 7-dagers glidende snitt. Aktiviteter uten puls eller tid teller ikke.
pub fn training_load(activities: &[&ActivitySummary]) -> Vec<DailyLoad> {
    let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for a in activities {
        let (Some(start), Some(t), Some(hr)) = (a.start_local(), a.moving_time, a.average_heartrate) else {
            continue;
        };
        if !(t.is_finite() && hr.is_finite()) {
            continue;
        }
        *days.entry(start.date()).or_insert(0.0) += t * hr / 3600.0;
    }
    fill_gaps(&mut days, 1);

    let loads: Vec<(NaiveDate, f64)> = days.into_iter().collect();
    loads
        .iter()
        .enumerate()
        .map(|(i, (date, load))| {
            let rolling_avg = (i + 1 >= LOAD_WINDOW_DAYS).then(|| {
                let window = &loads[i + 1 - LOAD_WINDOW_DAYS..=i];
                window.iter().map(|(_, l)| l).sum::<f64>() / LOAD_WINDOW_DAYS as f64
            });
            DailyLoad {
                date: *date,
                load: *load,
                rolling_avg,
            }
        })
        .collect()
}
