use std::cell::Cell;

use chrono::{DateTime, Utc};
use cyclecoach_core::pipeline::{fetch_streams, process_batch, PipelineEnv};
use cyclecoach_core::strava_api::DetailedActivity;
use cyclecoach_core::*;
use serde_json::json;

/// Kilde uten nett: aktivitet 13 har strømmer med feil lengde.
struct FakeSource {
    stream_calls: Cell<usize>,
}

impl FakeSource {
    fn new() -> Self {
        Self { stream_calls: Cell::new(0) }
    }
}

impl ActivitySource for FakeSource {
    fn activities(&self, _after: DateTime<Utc>) -> Result<Vec<ActivitySummary>> {
        Ok(Vec::new())
    }

    fn activity(&self, activity_id: u64) -> Result<DetailedActivity> {
        let raw = json!({
            "id": activity_id,
            "name": format!("Ride {activity_id}"),
            "max_heartrate": 180.0,
            "start_date_local": "2024-06-01T09:00:00Z"
        });
        let context = serde_json::from_value(raw.clone())?;
        Ok(DetailedActivity { context, raw })
    }

    fn streams(&self, activity_id: u64) -> Result<StreamRecord> {
        self.stream_calls.set(self.stream_calls.get() + 1);
        let n = 120u32;
        let raw = if activity_id == 13 {
            json!({
                "time": {"data": (0..n).collect::<Vec<_>>()},
                "heartrate": {"data": [140, 141]}
            })
        } else {
            json!({
                "time": {"data": (0..n).collect::<Vec<_>>()},
                "heartrate": {"data": vec![150; n as usize]},
                "watts": {"data": vec![220; n as usize]}
            })
        };
        parse_streams(&raw)
    }
}

fn now() -> chrono::NaiveDateTime {
    cyclecoach_core::types::parse_local_datetime("2024-06-02T12:00:00Z").unwrap()
}

#[test]
fn batch_skips_failures_and_keeps_going() {
    let dir = tempfile::tempdir().unwrap();
    let data = DataDir::new(dir.path());
    data.ensure().unwrap();
    let source = FakeSource::new();
    let store = MemoryStreamStore::new();
    let telemetry = Telemetry::new().unwrap();
    let env = PipelineEnv {
        source: &source,
        store: &store,
        data_dir: &data,
        render: None,
        telemetry: &telemetry,
        now: now(),
    };

    let report = process_batch(&env, &[11, 13, 12]);
    assert_eq!(report.processed.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, 13);
    assert_eq!(telemetry.activities_processed_total().get(), 2);
    assert_eq!(telemetry.activities_failed_total().get(), 1);

    let first = &report.processed[0];
    assert_eq!(first.name, "Ride 11");
    assert!(first.analysis_path.exists());
    assert!(data.detailed_json(11).exists());
    assert_eq!(first.metrics.power.as_ref().unwrap().normalized_power, Some(220.0));
    assert!(first.figures.is_empty() && first.figures_dir.is_none());
}

#[test]
fn streams_come_from_store_on_second_fetch() {
    let source = FakeSource::new();
    let store = MemoryStreamStore::new();
    let telemetry = Telemetry::new().unwrap();

    let a = fetch_streams(&source, &store, 11, &telemetry).unwrap();
    let b = fetch_streams(&source, &store, 11, &telemetry).unwrap();
    assert_eq!(a, b);
    assert_eq!(source.stream_calls.get(), 1);
    assert_eq!(telemetry.stream_store_miss_total().get(), 1);
    assert_eq!(telemetry.stream_store_hit_total().get(), 1);
    assert_eq!(store.len(), 1);
}

#[test]
fn batch_with_rendering_writes_dashboard_per_activity() {
    let dir = tempfile::tempdir().unwrap();
    let data = DataDir::new(dir.path());
    data.ensure().unwrap();
    let source = FakeSource::new();
    let store = MemoryStreamStore::new();
    let telemetry = Telemetry::new().unwrap();
    let render = RenderConfig::default();
    let env = PipelineEnv {
        source: &source,
        store: &store,
        data_dir: &data,
        render: Some(&render),
        telemetry: &telemetry,
        now: now(),
    };

    let report = process_batch(&env, &[21, 22]);
    assert_eq!(report.processed.len(), 2);
    for r in &report.processed {
        let figures_dir = r.figures_dir.as_ref().expect("figures dir");
        assert!(figures_dir.starts_with(data.figures_dir()));
        // ingen rute i testkilden, bare dashbordet
        assert_eq!(r.figures, vec![figures_dir.join("dashboard.svg")]);
        assert!(r.figures[0].exists());
    }
}
