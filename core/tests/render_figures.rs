use std::fs;

use cyclecoach_core::dashboard::{
    render_activity_figures, render_hr_zones, render_training_load, render_weekly_distance,
};
use cyclecoach_core::summary::{hr_zone_minutes, training_load, weekly_distance};
use cyclecoach_core::*;

fn ride(n: u32) -> StreamRecord {
    let f = |g: &dyn Fn(f64) -> f64| -> Vec<f64> { (0..n).map(|i| g(f64::from(i))).collect() };
    let mut rec = StreamRecord::new((0..n).collect());
    rec.heartrate = Some(f(&|i| 120.0 + (i / 10.0).sin() * 25.0));
    rec.watts = Some(f(&|i| 200.0 + (i / 7.0).cos() * 60.0));
    rec.cadence = Some(f(&|i| 85.0 + (i / 13.0).sin() * 5.0));
    rec.velocity_smooth = Some(f(&|i| 8.0 + (i / 20.0).sin()));
    rec.altitude = Some(f(&|i| 100.0 + (i / 30.0).sin() * 15.0));
    rec.distance = Some(f(&|i| i * 8.0));
    rec.grade_smooth = Some(f(&|i| (i / 30.0).cos() * 4.0));
    rec.latitude = Some(f(&|i| 59.9 + i * 1e-5));
    rec.longitude = Some(f(&|i| 10.7 + (i / 50.0).sin() * 1e-3));
    rec
}

fn context() -> ActivityContext {
    ActivityContext {
        id: 42,
        name: "Evening Ride".into(),
        max_heartrate: Some(185.0),
        start_date_local: Some("2024-06-01T18:00:00Z".into()),
    }
}

fn is_svg(path: &std::path::Path) -> bool {
    fs::read_to_string(path).is_ok_and(|s| s.contains("<svg"))
}

#[test]
fn full_ride_renders_dashboard_and_maps() {
    let dir = tempfile::tempdir().unwrap();
    let rec = ride(600);
    let metrics = analyze_streams(&rec, &context());

    let files = render_activity_figures(&rec, &metrics, &context(), dir.path(), &RenderConfig::default()).unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["dashboard.svg", "map_altitude.svg", "map_velocity_smooth.svg"]);
    assert!(files.iter().all(|p| is_svg(p)));
}

#[test]
fn single_sample_still_gives_a_dashboard() {
    let dir = tempfile::tempdir().unwrap();
    let mut rec = StreamRecord::new(vec![0]);
    rec.heartrate = Some(vec![130.0]);
    let metrics = analyze_streams(&rec, &ActivityContext::default());

    let files =
        render_activity_figures(&rec, &metrics, &ActivityContext::default(), dir.path(), &RenderConfig::default())
            .unwrap();
    assert_eq!(files.len(), 1, "no route, no maps");
    assert!(is_svg(&dir.path().join("dashboard.svg")));
}

#[test]
fn activity_list_charts() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = RenderConfig::default();
    let acts: Vec<ActivitySummary> = (1..=10)
        .map(|d| ActivitySummary {
            id: d,
            activity_type: "Ride".into(),
            start_date_local: Some(format!("2024-05-{:02}T07:00:00Z", d * 2)),
            distance: Some(30_000.0 + d as f64 * 1000.0),
            moving_time: Some(3600.0),
            average_heartrate: Some(110.0 + d as f64 * 6.0),
            ..Default::default()
        })
        .collect();
    let refs: Vec<&ActivitySummary> = acts.iter().collect();

    let weekly = dir.path().join("weekly_ride_distance.svg");
    assert!(render_weekly_distance(&weekly_distance(&refs), "Ride", &weekly, &cfg).unwrap());
    assert!(is_svg(&weekly));

    let load = dir.path().join("ride_training_load.svg");
    assert!(render_training_load(&training_load(&refs), "Ride", &load, &cfg).unwrap());
    assert!(is_svg(&load));

    let zones = dir.path().join("ride_hr_zones.svg");
    assert!(render_hr_zones(&hr_zone_minutes(&refs).unwrap(), "Ride", &zones, &cfg).unwrap());
    assert!(is_svg(&zones));

    // tomme serier gir ingen fil
    let empty = dir.path().join("empty.svg");
    assert!(!render_training_load(&[], "Ride", &empty, &cfg).unwrap());
    assert!(!empty.exists());
}
