// core/src/coach.rs
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDateTime;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use ureq::Agent;

use crate::config::OpenAiConfig;
use crate::error::{CoachError, Result};
use crate::types::{ActivitySummary, StreamRecord};

/// Kanaler som tas med i nedsamplet tidsserie.
pub const TIMESERIES_FIELDS: [&str; 6] = [
    "time",
    "distance",
    "heartrate",
    "altitude",
    "velocity_smooth",
    "grade_smooth",
];

/// Analysegrupper som kopieres inn i payload fra lagret analyse.
const ANALYSIS_KEYS: [&str; 6] = [
    "heart_rate_zones",
    "power",
    "power_curve",
    "cadence",
    "elevation",
    "speed",
];

const SYSTEM_PROMPT: &str = "You are an expert cycling coach with deep knowledge of training methodologies, \
physiology, and performance analysis. Analyze the provided cycling data and training plan \
to give structured, actionable insights and recommendations. Be specific, data-driven, and \
practical in your analysis. The data includes information about activities, including links \
to visualizations that have been generated for each activity.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadOptions {
    pub include_timeseries: bool,
    pub sample_rate: usize,
    pub max_points: usize,
}

impl Default for PayloadOptions {
    fn default() -> Self {
        Self {
            include_timeseries: false,
            sample_rate: 30,
            max_points: 500,
        }
    }
}

/// Én aktivitet slik den sendes til språkmodellen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityPayload {
    pub id: String,
    pub name: String,
    pub date: String,
    pub distance_km: f64,
    pub moving_time_min: f64,
    pub elevation_gain_m: f64,
    pub average_speed_kmh: f64,
    pub max_speed_kmh: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_heartrate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_heartrate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_watts: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_watts: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_power: Option<f64>,
    #[serde(flatten)]
    pub analysis: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub visualizations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeseries: Option<BTreeMap<String, Vec<f64>>>,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

/// Effektivt steg: `sample_rate`, eller grovere hvis serien ellers gir
/// mer enn `max_points` punkter.
pub fn sample_step(len: usize, sample_rate: usize, max_points: usize) -> usize {
    let rate = sample_rate.max(1);
    if max_points > 0 && len > max_points {
        rate.max(len / max_points)
    } else {
        rate
    }
}

/// Hver `step`-te sample av de faste feltene. Manglende verdier blir 0.
pub fn downsample(rec: &StreamRecord, step: usize) -> BTreeMap<String, Vec<f64>> {
    let step = step.max(1);
    let mut out = BTreeMap::new();
    out.insert(
        "time".to_string(),
        rec.time.iter().step_by(step).map(|t| f64::from(*t)).collect(),
    );
    for field in TIMESERIES_FIELDS.iter().skip(1) {
        if let Some(col) = rec.channel(field) {
            let sampled = col
                .iter()
                .step_by(step)
                .map(|v| if v.is_finite() { *v } else { 0.0 })
                .collect();
            out.insert((*field).to_string(), sampled);
        }
    }
    out
}

/// Bygg payload fra listeraden, lagret analyse, figurstier og (valgfritt) strømmer.
///
/// Tidsserien tas bare med når det ikke finnes figurer for aktiviteten.
pub fn build_payload(
    activity: &ActivitySummary,
    analysis: Option<&Value>,
    visualizations: &[PathBuf],
    streams: Option<&StreamRecord>,
    opts: &PayloadOptions,
) -> ActivityPayload {
    let date = activity
        .start_local()
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let num = |v: Option<f64>| finite(v).unwrap_or(0.0);

    let mut groups = Map::new();
    if let Some(Value::Object(obj)) = analysis {
        for key in ANALYSIS_KEYS {
            if let Some(v) = obj.get(key) {
                groups.insert(key.to_string(), v.clone());
            }
        }
    }

    let timeseries = match streams {
        Some(rec) if opts.include_timeseries && visualizations.is_empty() && !rec.is_empty() => {
            let step = sample_step(rec.len(), opts.sample_rate, opts.max_points);
            debug!("timeseries for {} sampled at 1:{step}", activity.id);
            Some(downsample(rec, step))
        }
        _ => None,
    };

    ActivityPayload {
        id: activity.id.to_string(),
        name: activity.name.clone(),
        date,
        distance_km: round2(num(activity.distance) / 1000.0),
        moving_time_min: round2(num(activity.moving_time) / 60.0),
        elevation_gain_m: num(activity.total_elevation_gain),
        average_speed_kmh: round2(num(activity.average_speed) * 3.6),
        max_speed_kmh: round2(num(activity.max_speed) * 3.6),
        average_heartrate: finite(activity.average_heartrate),
        max_heartrate: finite(activity.max_heartrate),
        average_watts: finite(activity.average_watts),
        max_watts: finite(activity.max_watts),
        normalized_power: finite(activity.weighted_average_watts),
        analysis: groups,
        visualizations: visualizations.iter().map(|p| p.display().to_string()).collect(),
        timeseries,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// System- og brukermelding for coach-forespørselen.
pub fn build_messages(payloads: &[ActivityPayload], training_plan: Option<&str>, days: u32) -> Result<Vec<ChatMessage>> {
    let data = serde_json::to_string_pretty(payloads)?;
    let plan = training_plan
        .filter(|p| !p.trim().is_empty())
        .unwrap_or("No training plan provided.");
    let user = format!(
        "# Training Plan\n{plan}\n\n\
         # Activities Data (past {days} days)\n{data}\n\n\
         Please provide a comprehensive analysis with the following structure:\n\n\
         1. High-level summary of the analyzed timeframe\n\
         2. Session-by-session analysis\n\
         3. Detailed analysis of intervals and climbs\n\
         4. Recommendations for upcoming sessions\n\
         5. Suggested modifications to the training plan (if applicable)\n"
    );
    Ok(vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)])
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Chat completions mot OpenAI (blocking, ett forsøk).
pub struct CoachClient {
    agent: Agent,
    cfg: OpenAiConfig,
}

impl CoachClient {
    pub fn new(cfg: OpenAiConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build();
        Self { agent, cfg }
    }

    /// Request-body; egen funksjon så den kan testes uten nett.
    pub fn request_body(&self, messages: &[ChatMessage]) -> Value {
        json!({
            "model": self.cfg.model,
            "messages": messages,
            "temperature": self.cfg.temperature,
            "max_tokens": self.cfg.max_tokens,
        })
    }

    pub fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let key = self
            .cfg
            .api_key
            .as_deref()
            .ok_or(CoachError::MissingCredential("OPENAI_API_KEY"))?;
        let resp = self
            .agent
            .post(&self.cfg.url)
            .set("Authorization", &format!("Bearer {key}"))
            .send_json(self.request_body(messages))?;
        let body = resp.into_string()?;
        let mut de = serde_json::Deserializer::from_str(&body);
        let parsed: ChatResponse = serde_path_to_error::deserialize(&mut de)?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CoachError::InvalidData("completion returned no choices".into()))
    }
}

/// `None` hvis filen ikke finnes.
pub fn load_training_plan(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(fs::read_to_string(path)?))
}

/// Skriver tilbakemeldingen til `dir/analysis_{YYYYmmdd_HHMMSS}.md`.
pub fn save_analysis(text: &str, dir: &Path, now: NaiveDateTime) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("analysis_{}.md", now.format("%Y%m%d_%H%M%S")));
    fs::write(&path, text)?;
    info!("Analysis saved to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> ActivitySummary {
        ActivitySummary {
            id: 42,
            name: "Evening Ride".into(),
            activity_type: "Ride".into(),
            start_date_local: Some("2024-04-02T18:15:00Z".into()),
            distance: Some(42_200.0),
            moving_time: Some(5400.0),
            total_elevation_gain: Some(350.0),
            average_speed: Some(7.8),
            max_speed: Some(15.0),
            average_heartrate: Some(142.0),
            weighted_average_watts: Some(210.0),
            ..Default::default()
        }
    }

    #[test]
    fn step_grows_for_long_series() {
        assert_eq!(sample_step(1000, 30, 500), 30);
        assert_eq!(sample_step(30_000, 30, 500), 60);
        assert_eq!(sample_step(100, 30, 500), 30);
        assert_eq!(sample_step(100, 0, 0), 1);
    }

    #[test]
    fn downsample_keeps_fields_and_zero_fills() {
        let mut rec = StreamRecord::new((0..10).collect());
        rec.heartrate = Some(vec![100.0, f64::NAN, 102.0, 103.0, 104.0, 105.0, 106.0, 107.0, 108.0, 109.0]);
        rec.watts = Some(vec![200.0; 10]);
        let ts = downsample(&rec, 3);
        assert_eq!(ts["time"], vec![0.0, 3.0, 6.0, 9.0]);
        assert_eq!(ts["heartrate"], vec![100.0, 103.0, 106.0, 109.0]);
        assert!(!ts.contains_key("watts"));

        let ts = downsample(&rec, 1);
        assert_eq!(ts["heartrate"][1], 0.0);
    }

    #[test]
    fn payload_converts_units_and_copies_analysis() {
        let analysis = json!({
            "heart_rate_zones": {"Z2": {"time_seconds": 600, "percentage": 50.0}},
            "unrelated": 1
        });
        let p = build_payload(&summary(), Some(&analysis), &[], None, &PayloadOptions::default());
        assert_eq!(p.id, "42");
        assert_eq!(p.date, "2024-04-02 18:15");
        assert_eq!(p.distance_km, 42.2);
        assert_eq!(p.moving_time_min, 90.0);
        assert_eq!(p.average_speed_kmh, 28.08);
        assert_eq!(p.normalized_power, Some(210.0));
        assert!(p.analysis.contains_key("heart_rate_zones"));
        assert!(!p.analysis.contains_key("unrelated"));

        let v = serde_json::to_value(&p).unwrap();
        assert!(v.get("heart_rate_zones").is_some());
        assert!(v.get("max_watts").is_none());
        assert!(v.get("timeseries").is_none());
    }

    #[test]
    fn timeseries_only_without_visualizations() {
        let rec = StreamRecord::new((0..100).collect());
        let opts = PayloadOptions {
            include_timeseries: true,
            ..Default::default()
        };
        let with_fig = build_payload(&summary(), None, &[PathBuf::from("d.svg")], Some(&rec), &opts);
        assert!(with_fig.timeseries.is_none());
        let without = build_payload(&summary(), None, &[], Some(&rec), &opts);
        assert_eq!(without.timeseries.unwrap()["time"].len(), 4);
    }

    #[test]
    fn messages_contain_plan_data_and_structure() {
        let p = build_payload(&summary(), None, &[], None, &PayloadOptions::default());
        let msgs = build_messages(&[p], Some("Week 3: build"), 14).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, "system");
        assert!(msgs[0].content.contains("expert cycling coach"));
        let user = &msgs[1].content;
        assert!(user.contains("Week 3: build"));
        assert!(user.contains("past 14 days"));
        assert!(user.contains("\"name\": \"Evening Ride\""));
        assert!(user.contains("5. Suggested modifications"));

        let none = build_messages(&[], None, 7).unwrap();
        assert!(none[1].content.contains("No training plan provided."));
    }

    #[test]
    fn request_body_uses_configured_model() {
        let client = CoachClient::new(OpenAiConfig::default());
        let body = client.request_body(&[ChatMessage::user("hi")]);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn complete_without_key_fails_fast() {
        let client = CoachClient::new(OpenAiConfig::default());
        assert!(matches!(
            client.complete(&[ChatMessage::user("hi")]),
            Err(CoachError::MissingCredential("OPENAI_API_KEY"))
        ));
    }
}
