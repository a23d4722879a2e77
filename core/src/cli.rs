// core/src/cli.rs
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Duration, Local, NaiveDateTime, Utc};
use clap::{Args, Parser, Subcommand};
use log::{debug, info, warn};

use crate::analyzer::analyze_streams;
use crate::coach::{build_messages, build_payload, load_training_plan, save_analysis, CoachClient, PayloadOptions};
use crate::config::AppConfig;
use crate::dashboard::{render_hr_zones, render_training_load, render_weekly_distance, visualization_folder_name};
use crate::pipeline::{process_activity, process_batch, PipelineEnv};
use crate::storage::{load_activities, load_analysis, read_stream_csv, save_activities, DataDir, StreamStore};
use crate::strava_api::{ActivitySource, StravaClient};
use crate::summary::{filter_by_type, filter_recent, hr_zone_minutes, summary_stats, training_load, weekly_distance};
use crate::telemetry::Telemetry;
use crate::types::{ActivityContext, ActivitySummary};

#[derive(Debug, Parser)]
#[command(name = "cyclecoach", version, about = "Strava cycling analysis and coaching")]
pub struct Cli {
    /// TOML-konfig (standard: ./cyclecoach.toml hvis den finnes)
    #[arg(long, global = true, env = "CYCLECOACH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Overstyr datakatalogen
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct Scope {
    /// Antall dager bakover (standard fra konfig)
    #[arg(long)]
    pub days: Option<u32>,

    /// Aktivitetstype, f.eks. Ride
    #[arg(long = "activity-type")]
    pub activity_type: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Hent aktivitetslisten fra Strava
    Fetch(Scope),
    /// Oppsummering og figurer over aktivitetslisten
    Basic(Scope),
    /// Detaljert analyse av én eller alle aktiviteter
    Detailed {
        #[command(flatten)]
        scope: Scope,
        #[arg(long = "activity-id")]
        activity_id: Option<u64>,
        #[arg(long, conflicts_with = "activity_id")]
        all: bool,
    },
    /// Coach-tilbakemelding fra språkmodellen
    Coach {
        #[command(flatten)]
        scope: Scope,
        #[arg(long = "activity-id")]
        activity_id: Option<u64>,
        #[arg(long = "include-timeseries")]
        include_timeseries: bool,
        #[arg(long = "training-plan", default_value = "training_plan.md")]
        training_plan: PathBuf,
    },
    /// fetch + basic + detailed --all
    All(Scope),
    /// Kjør motoren offline på en lagret strøm-CSV og skriv JSON
    Analyze {
        #[arg(long)]
        streams: PathBuf,
        #[arg(long = "max-hr")]
        max_hr: Option<f64>,
    },
}

struct Ctx {
    cfg: AppConfig,
    data: DataDir,
    telemetry: Telemetry,
    now: NaiveDateTime,
}

impl Ctx {
    fn days(&self, scope: &Scope) -> u32 {
        scope.days.unwrap_or(self.cfg.days)
    }

    fn activity_type(&self, scope: &Scope) -> String {
        scope
            .activity_type
            .clone()
            .unwrap_or_else(|| self.cfg.activity_type.clone())
    }
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let mut cfg = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = cli.data_dir {
        cfg.data_dir = dir;
    }
    let data = DataDir::new(cfg.data_dir.clone());
    let ctx = Ctx {
        cfg,
        data,
        telemetry: Telemetry::new().context("registering telemetry counters")?,
        now: Local::now().naive_local(),
    };

    if let Command::Analyze { streams, max_hr } = &cli.command {
        return analyze_file(streams, *max_hr);
    }
    ctx.data
        .ensure()
        .with_context(|| format!("creating data directories under {}", ctx.data.root().display()))?;

    match cli.command {
        Command::Fetch(scope) => fetch(&ctx, &scope)?,
        Command::Basic(scope) => basic(&ctx, &scope)?,
        Command::Detailed { scope, activity_id, all } => detailed(&ctx, &scope, activity_id, all)?,
        Command::Coach {
            scope,
            activity_id,
            include_timeseries,
            training_plan,
        } => coach(&ctx, &scope, activity_id, include_timeseries, &training_plan)?,
        Command::All(scope) => {
            fetch(&ctx, &scope)?;
            basic(&ctx, &scope)?;
            detailed(&ctx, &scope, None, true)?;
        }
        Command::Analyze { .. } => {}
    }

    debug!("telemetry:\n{}", ctx.telemetry.render());
    Ok(())
}

fn analyze_file(path: &Path, max_hr: Option<f64>) -> anyhow::Result<()> {
    let rec = read_stream_csv(path).with_context(|| format!("reading streams from {}", path.display()))?;
    let activity = ActivityContext {
        max_heartrate: max_hr,
        ..Default::default()
    };
    let metrics = analyze_streams(&rec, &activity);
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}

fn recent_activities(client: &StravaClient, days: u32, activity_type: &str) -> anyhow::Result<Vec<ActivitySummary>> {
    let after = Utc::now() - Duration::days(i64::from(days));
    let list = client.activities(after).context("listing activities from Strava")?;
    Ok(list.into_iter().filter(|a| a.activity_type == activity_type).collect())
}

fn fetch(ctx: &Ctx, scope: &Scope) -> anyhow::Result<()> {
    let days = ctx.days(scope);
    let activity_type = ctx.activity_type(scope);
    println!("Fetching {activity_type} activities from the past {days} days...");

    let client = StravaClient::new(ctx.cfg.strava.clone());
    let activities = recent_activities(&client, days, &activity_type)?;
    save_activities(&activities, &ctx.data.activities_csv())?;
    println!("Retrieved {} activities.", activities.len());
    Ok(())
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.1}")).unwrap_or_else(|| "-".to_string())
}

fn basic(ctx: &Ctx, scope: &Scope) -> anyhow::Result<()> {
    let activity_type = ctx.activity_type(scope);
    let all = load_activities(&ctx.data.activities_csv())?;
    let rides = filter_by_type(&all, &activity_type);
    let Some(stats) = summary_stats(&rides, ctx.now) else {
        println!("No {activity_type} activities available for analysis");
        return Ok(());
    };

    println!("\n{activity_type} summary");
    println!("  total activities:     {}", stats.total_activities);
    println!("  past week:            {}", stats.activities_past_week);
    println!("  total distance (km):  {:.1}", stats.total_distance_km);
    println!("  total elevation (m):  {:.0}", stats.total_elevation_m);
    println!("  moving time (h):      {:.1}", stats.total_moving_time_h);
    println!("  avg heart rate:       {}", fmt_opt(stats.avg_heartrate));
    println!("  max heart rate:       {}", fmt_opt(stats.max_heartrate));
    println!("  avg speed (km/h):     {}", fmt_opt(stats.avg_speed_kmh));
    println!("  max speed (km/h):     {}", fmt_opt(stats.max_speed_kmh));
    println!("  avg power (W):        {}", fmt_opt(stats.avg_watts));
    println!("  max power (W):        {}", fmt_opt(stats.max_watts));

    let render = &ctx.cfg.render;
    let ext = render.format.extension();
    let slug = activity_type.to_lowercase();
    let figures = ctx.data.figures_dir();

    let weeks = weekly_distance(&rides);
    let weekly_path = figures.join(format!("weekly_{slug}_distance.{ext}"));
    if let Err(e) = render_weekly_distance(&weeks, &activity_type, &weekly_path, render) {
        warn!("weekly distance plot failed: {e}");
    }

    match hr_zone_minutes(&rides) {
        Some(zones) => {
            let zones_path = figures.join(format!("{slug}_hr_zones.{ext}"));
            if let Err(e) = render_hr_zones(&zones, &activity_type, &zones_path, render) {
                warn!("heart rate zones plot failed: {e}");
            }
        }
        None => println!("No {activity_type} activities with heart rate data found"),
    }

    let load = training_load(&rides);
    if load.is_empty() {
        println!("Heart rate or moving time data not available for training load analysis");
    } else {
        let load_path = figures.join(format!("{slug}_training_load.{ext}"));
        if let Err(e) = render_training_load(&load, &activity_type, &load_path, render) {
            warn!("training load plot failed: {e}");
        }
    }
    Ok(())
}

fn detailed(ctx: &Ctx, scope: &Scope, activity_id: Option<u64>, all: bool) -> anyhow::Result<()> {
    let client = StravaClient::new(ctx.cfg.strava.clone());
    let store = ctx.data.stream_store();
    let env = PipelineEnv {
        source: &client,
        store: &store,
        data_dir: &ctx.data,
        render: Some(&ctx.cfg.render),
        telemetry: &ctx.telemetry,
        now: ctx.now,
    };

    if let Some(id) = activity_id {
        println!("Processing detailed data for activity {id}");
        let report = process_activity(&env, id).with_context(|| format!("processing activity {id}"))?;
        println!("Analysis saved to {}", report.analysis_path.display());
        if let Some(dir) = report.figures_dir {
            println!("Visualizations saved to {}", dir.display());
        }
        return Ok(());
    }

    let activities = recent_activities(&client, ctx.days(scope), &ctx.activity_type(scope))?;
    if activities.is_empty() {
        println!("No activities found.");
        return Ok(());
    }
    if !all {
        println!("Found {} activities:", activities.len());
        for a in &activities {
            println!("  {}  {}  {}", a.id, a.start_date_local.as_deref().unwrap_or("-"), a.name);
        }
        println!("\nTo analyze a specific activity, use: cyclecoach detailed --activity-id <ID>");
        println!("To analyze all activities in range, use: cyclecoach detailed --all");
        return Ok(());
    }

    let ids: Vec<u64> = activities.iter().map(|a| a.id).collect();
    let report = process_batch(&env, &ids);
    println!(
        "Processed {} activities ({} skipped).",
        report.processed.len(),
        report.failed.len()
    );
    for (id, err) in &report.failed {
        println!("  {id}: {err}");
    }
    Ok(())
}

/// Figurfiler for aktiviteten, om mappen finnes.
fn find_visualizations(ctx: &Ctx, a: &ActivitySummary) -> Vec<PathBuf> {
    let Some(start) = a.start_local() else {
        return Vec::new();
    };
    let name = if a.name.is_empty() { "Activity" } else { a.name.as_str() };
    let dir = ctx.data.visualization_dir(&visualization_folder_name(name, Some(start), ctx.now));
    let Ok(entries) = fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| matches!(p.extension().and_then(|e| e.to_str()), Some("svg" | "png")))
        .collect();
    files.sort();
    files
}

fn coach(
    ctx: &Ctx,
    scope: &Scope,
    activity_id: Option<u64>,
    include_timeseries: bool,
    plan_path: &Path,
) -> anyhow::Result<()> {
    let days = ctx.days(scope);
    let activity_type = ctx.activity_type(scope);
    let all = load_activities(&ctx.data.activities_csv())?;
    let typed = filter_by_type(&all, &activity_type);
    let selected: Vec<&ActivitySummary> = filter_recent(&typed, days, ctx.now)
        .into_iter()
        .filter(|a| activity_id.map_or(true, |id| a.id == id))
        .collect();

    if selected.is_empty() {
        println!("No activities found for analysis.");
        return Ok(());
    }

    let opts = PayloadOptions {
        include_timeseries,
        ..Default::default()
    };
    let store = ctx.data.stream_store();
    let mut payloads = Vec::with_capacity(selected.len());
    for a in selected {
        let analysis = match load_analysis(&ctx.data.analysis_json(a.id)) {
            Ok(v) => v,
            Err(e) => {
                warn!("could not load analysis for {}: {e}", a.id);
                None
            }
        };
        let figures = find_visualizations(ctx, a);
        let streams = if include_timeseries { store.load(a.id).ok().flatten() } else { None };
        payloads.push(build_payload(a, analysis.as_ref(), &figures, streams.as_ref(), &opts));
    }
    info!("prepared {} activities for coaching", payloads.len());

    let plan = load_training_plan(plan_path)?;
    let messages = build_messages(&payloads, plan.as_deref(), days)?;
    let client = CoachClient::new(ctx.cfg.openai.clone());
    let text = client.complete(&messages).context("coach request failed")?;
    let path = save_analysis(&text, &ctx.data.analysis_dir(), ctx.now)?;
    println!("{text}\n\nAnalysis saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detailed_with_id() {
        let cli = Cli::try_parse_from(["cyclecoach", "detailed", "--activity-id", "123", "--days", "14"]).unwrap();
        match cli.command {
            Command::Detailed { scope, activity_id, all } => {
                assert_eq!(activity_id, Some(123));
                assert_eq!(scope.days, Some(14));
                assert!(!all);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn id_and_all_conflict() {
        assert!(Cli::try_parse_from(["cyclecoach", "detailed", "--activity-id", "1", "--all"]).is_err());
    }

    #[test]
    fn global_data_dir_after_subcommand() {
        let cli = Cli::try_parse_from(["cyclecoach", "analyze", "--streams", "s.csv", "--data-dir", "/tmp/x"]).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(cli.command, Command::Analyze { max_hr: None, .. }));
    }
}
