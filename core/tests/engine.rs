use cyclecoach_core::*;
use serde_json::{json, Value};

fn seconds(n: u32) -> Vec<u32> {
    (0..n).collect()
}

#[test]
fn hr_zones_two_blocks() {
    // 40 s på 100 bpm, 40 s på 150 bpm, makspuls 160
    let mut rec = StreamRecord::new(seconds(80));
    let mut hr = vec![100.0; 40];
    hr.extend(vec![150.0; 40]);
    rec.heartrate = Some(hr);

    let ctx = ActivityContext {
        max_heartrate: Some(160.0),
        ..Default::default()
    };
    let m = analyze_streams(&rec, &ctx);
    let zones = m.heart_rate_zones.expect("hr zones");

    assert_eq!(zones.len(), 2, "empty zones are omitted");
    assert_eq!(zones["Z2"].time_seconds, 39);
    assert_eq!(zones["Z5"].time_seconds, 39);
    assert!((zones["Z2"].percentage - 39.0 / 79.0 * 100.0).abs() < 1e-9);
    assert!(m.power.is_none());
    assert!(m.elevation.is_none());
}

#[test]
fn max_hr_falls_back_to_observed_peak() {
    let mut rec = StreamRecord::new(seconds(10));
    rec.heartrate = Some(vec![180.0; 10]);
    let m = analyze_streams(&rec, &ActivityContext::default());
    // 180 == observert maks → Z5 (162..198)
    assert!(m.heart_rate_zones.unwrap().contains_key("Z5"));
}

#[test]
fn ftp_needs_twenty_minutes() {
    let alternating = |n: usize| -> Vec<f64> {
        (0..n).map(|i| if i % 2 == 0 { 200.0 } else { 250.0 }).collect()
    };

    let mut long = StreamRecord::new(seconds(1300));
    long.watts = Some(alternating(1300));
    let p = analyze_streams(&long, &ActivityContext::default()).power.unwrap();
    let ftp = p.ftp_estimate.expect("ftp with 1300 samples");
    assert!((ftp - 0.95 * 225.0).abs() < 1e-9);

    let mut short = StreamRecord::new(seconds(1000));
    short.watts = Some(alternating(1000));
    let m = analyze_streams(&short, &ActivityContext::default());
    assert!(m.power.as_ref().unwrap().ftp_estimate.is_none());

    let v = m.to_json();
    assert_eq!(v["power"]["ftp_estimate"], Value::Null);
}

#[test]
fn np_of_constant_power_is_that_power() {
    let mut rec = StreamRecord::new(seconds(120));
    rec.watts = Some(vec![237.0; 120]);
    let p = analyze_streams(&rec, &ActivityContext::default()).power.unwrap();
    assert_eq!(p.normalized_power, Some(237.0));
    assert_eq!(p.average, 237.0);
}

#[test]
fn power_curve_is_non_increasing_with_a_spike() {
    let mut watts = vec![180.0; 700];
    watts[350] = 900.0;
    let mut rec = StreamRecord::new(seconds(700));
    rec.watts = Some(watts);

    let curve = analyze_streams(&rec, &ActivityContext::default()).power_curve.unwrap();
    let points = cyclecoach_core::metrics::power_curve_points(rec.watts.as_deref().unwrap());
    assert_eq!(curve.len(), 6);
    for w in points.windows(2) {
        assert!(w[0].1 >= w[1].1, "{}s < {}s", w[0].0, w[1].0);
    }
    assert!(!curve.contains_key("1200s"));
}

#[test]
fn elevation_gain_minus_loss_matches_net_change() {
    let alt: Vec<f64> = (0..200).map(|i| 100.0 + 20.0 * (i as f64 / 15.0).sin()).collect();
    let mut rec = StreamRecord::new(seconds(200));
    rec.altitude = Some(alt.clone());
    rec.grade_smooth = Some((0..200).map(|i| (i % 9) as f64 - 4.0).collect());

    let e = analyze_streams(&rec, &ActivityContext::default()).elevation.unwrap();
    assert!(((alt[199] - alt[0]) - (e.gain - e.loss)).abs() < 1e-9);
    assert!(e.max <= 120.0 && e.min >= 80.0);
    assert_eq!(e.gradient_distribution.unwrap().total(), 200);
}

#[test]
fn distributions_count_every_finite_sample() {
    let mut rec = StreamRecord::new(seconds(6));
    rec.cadence = Some(vec![0.0, 82.0, 87.5, f64::NAN, 91.0, 0.0]);
    rec.velocity_smooth = Some(vec![8.2, 9.9, f64::NAN, 10.0, 11.4, 7.0]);

    let m = analyze_streams(&rec, &ActivityContext::default());
    let cadence = m.cadence.unwrap();
    assert_eq!(cadence.distribution.total(), 3, "zero cadence is coasting");
    // bøttene starter på floor(min) = 82
    assert_eq!(cadence.distribution.get("82.0-87.0"), Some(1));
    assert_eq!(cadence.distribution.get("87.0-92.0"), Some(2));
    assert_eq!(cadence.max, 91.0);

    let speed = m.speed.unwrap();
    assert_eq!(speed.distribution.total(), 5);
    assert_eq!(speed.distribution.get("9.0-10.0"), Some(1));
    assert_eq!(speed.distribution.get("10.0-11.0"), Some(1));
}

#[test]
fn missing_channels_give_empty_output() {
    let mut rec = StreamRecord::new(seconds(50));
    rec.watts = Some(vec![0.0; 50]);
    let m = analyze_streams(&rec, &ActivityContext::default());
    assert!(m.is_empty());
    assert_eq!(m.to_json(), json!({}));
}

#[test]
fn json_entry_point_reports_path_on_bad_input() {
    let bad = r#"{"streams": {"time": [0, 1, "x"]}}"#;
    match analyze_streams_json(bad) {
        Err(CoachError::JsonPath { path, .. }) => assert_eq!(path, "streams.time[2]"),
        other => panic!("expected path error, got {other:?}"),
    }

    let misaligned = r#"{"streams": {"time": [0, 1, 2], "hr": [120, 121]}}"#;
    assert!(matches!(
        analyze_streams_json(misaligned),
        Err(CoachError::Misaligned { channel: "heartrate", .. })
    ));
}

#[test]
fn json_entry_point_accepts_aliases() {
    let input = json!({
        "streams": {
            "time": (0..40).collect::<Vec<u32>>(),
            "power": vec![300.0; 40],
            "hr": vec![150.0; 40]
        },
        "activity": {"id": 7, "max_heartrate": 190.0}
    });
    let out: Value = serde_json::from_str(&analyze_streams_json(&input.to_string()).unwrap()).unwrap();
    assert_eq!(out["power"]["normalized_power"], 300.0);
    assert!(out["heart_rate_zones"]["Z3"].is_object());
}
