// core/src/pipeline.rs
use std::path::PathBuf;

use chrono::NaiveDateTime;
use log::{debug, info, warn};

use crate::analyzer::{analyze_streams, DerivedMetrics};
use crate::config::RenderConfig;
use crate::dashboard::{render_activity_figures, visualization_folder_name};
use crate::error::Result;
use crate::storage::{save_analysis, save_json, DataDir, StreamStore};
use crate::strava_api::ActivitySource;
use crate::telemetry::Telemetry;
use crate::types::{parse_local_datetime, StreamRecord};

/// Alt en kjøring trenger. Eies av kalleren (CLI eller test).
pub struct PipelineEnv<'a> {
    pub source: &'a dyn ActivitySource,
    pub store: &'a dyn StreamStore,
    pub data_dir: &'a DataDir,
    /// `None` = ingen figurer.
    pub render: Option<&'a RenderConfig>,
    pub telemetry: &'a Telemetry,
    pub now: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct ActivityReport {
    pub id: u64,
    pub name: String,
    pub metrics: DerivedMetrics,
    pub analysis_path: PathBuf,
    pub figures_dir: Option<PathBuf>,
    pub figures: Vec<PathBuf>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: Vec<ActivityReport>,
    pub failed: Vec<(u64, String)>,
}

/// Strømmer fra lageret hvis de finnes, ellers fra API-et (og lagres).
pub fn fetch_streams(
    source: &dyn ActivitySource,
    store: &dyn StreamStore,
    activity_id: u64,
    telemetry: &Telemetry,
) -> Result<StreamRecord> {
    if let Some(rec) = store.load(activity_id)? {
        telemetry.stream_store_hit_total().inc();
        debug!("streams for {activity_id} served from store");
        return Ok(rec);
    }
    telemetry.stream_store_miss_total().inc();
    let rec = source.streams(activity_id)?;
    store.save(activity_id, &rec)?;
    Ok(rec)
}

/// Detaljert aktivitet → strømmer → motor → lagret analyse → figurer.
///
/// Feil i figurer logges og gir tom figurliste; analysen er allerede lagret.
pub fn process_activity(env: &PipelineEnv<'_>, activity_id: u64) -> Result<ActivityReport> {
    let detailed = env.source.activity(activity_id)?;
    save_json(&detailed.raw, &env.data_dir.detailed_json(activity_id))?;
    let ctx = detailed.context;

    let rec = fetch_streams(env.source, env.store, activity_id, env.telemetry)?;
    rec.validate()?;

    let metrics = analyze_streams(&rec, &ctx);
    let analysis_path = env.data_dir.analysis_json(activity_id);
    save_analysis(&metrics, &analysis_path)?;

    let mut figures_dir = None;
    let mut figures = Vec::new();
    if let Some(cfg) = env.render {
        let start = ctx.start_date_local.as_deref().and_then(parse_local_datetime);
        let name = if ctx.name.is_empty() { "Activity" } else { ctx.name.as_str() };
        let dir = env
            .data_dir
            .visualization_dir(&visualization_folder_name(name, start, env.now));
        match render_activity_figures(&rec, &metrics, &ctx, &dir, cfg) {
            Ok(files) => figures = files,
            Err(e) => warn!("figures for activity {activity_id} not rendered: {e}"),
        }
        figures_dir = Some(dir);
    }

    info!("Detailed analysis for activity {activity_id} completed.");
    Ok(ActivityReport {
        id: activity_id,
        name: ctx.name,
        metrics,
        analysis_path,
        figures_dir,
        figures,
    })
}

/// Sekvensiell batch. En feilende aktivitet logges, telles og hoppes over.
pub fn process_batch(env: &PipelineEnv<'_>, activity_ids: &[u64]) -> BatchReport {
    let mut report = BatchReport::default();
    for (i, id) in activity_ids.iter().enumerate() {
        info!("Processing activity {}/{}: {id}", i + 1, activity_ids.len());
        match process_activity(env, *id) {
            Ok(r) => {
                env.telemetry.activities_processed_total().inc();
                report.processed.push(r);
            }
            Err(e) => {
                warn!("skipping activity {id}: {e}");
                env.telemetry.activities_failed_total().inc();
                report.failed.push((*id, e.to_string()));
            }
        }
    }
    report
}
