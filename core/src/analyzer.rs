use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::distribution::{distribution, Distribution};
use crate::elevation::{elevation_summary, ElevationSummary};
use crate::error::Result;
use crate::metrics::{self, power_curve, power_summary, PowerSummary};
use crate::types::{ActivityContext, Capabilities, StreamRecord};
use crate::zones::{resolve_max_hr, time_in_zones, ZoneTime};

/// Bøttebredde for kadensfordeling (rpm).
pub const CADENCE_BIN: u32 = 5;
/// Bøttebredde for fartsfordeling (m/s).
pub const SPEED_BIN: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSummary {
    pub average: f64,
    pub max: f64,
    pub distribution: Distribution,
}

/// Avledede metrikker for én aktivitet. Grupper som ikke kan beregnes er `None`
/// og utelates fra JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate_zones: Option<BTreeMap<String, ZoneTime>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<PowerSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_curve: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cadence: Option<ChannelSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<ElevationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<ChannelSummary>,
}

impl DerivedMetrics {
    pub fn is_empty(&self) -> bool {
        self.heart_rate_zones.is_none()
            && self.power.is_none()
            && self.power_curve.is_none()
            && self.cadence.is_none()
            && self.elevation.is_none()
            && self.speed.is_none()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Kjør hele motoren over én strøm. Ren funksjon: ingen I/O, ingen mutasjon.
pub fn analyze_streams(rec: &StreamRecord, ctx: &ActivityContext) -> DerivedMetrics {
    let caps = Capabilities::of(rec);
    let mut out = DerivedMetrics::default();

    if caps.heartrate {
        if let Some(hr) = rec.heartrate.as_deref() {
            if let Some(max_hr) = resolve_max_hr(ctx.max_heartrate, hr) {
                out.heart_rate_zones = Some(time_in_zones(&rec.time, hr, max_hr));
            }
        }
    }

    if caps.power {
        if let Some(watts) = rec.watts.as_deref() {
            out.power = power_summary(watts);
            if out.power.is_some() {
                out.power_curve = Some(power_curve(&metrics::positive_power(watts)));
            }
        }
    }

    if caps.cadence {
        out.cadence = rec.cadence.as_deref().and_then(|c| {
            let pedalling: Vec<f64> = c.iter().copied().filter(|v| *v > 0.0).collect();
            channel_summary(&pedalling, CADENCE_BIN)
        });
    }

    if caps.altitude {
        let grade = if caps.gradient { rec.grade_smooth.as_deref() } else { None };
        out.elevation = rec
            .altitude
            .as_deref()
            .and_then(|alt| elevation_summary(alt, grade));
    }

    if caps.speed {
        out.speed = rec
            .velocity_smooth
            .as_deref()
            .and_then(|v| channel_summary(v, SPEED_BIN));
    }

    out
}

fn channel_summary(values: &[f64], bin_size: u32) -> Option<ChannelSummary> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    Some(ChannelSummary {
        average: metrics::mean(&finite)?,
        max: metrics::max(&finite)?,
        distribution: distribution(&finite, bin_size),
    })
}

#[derive(Debug, Deserialize)]
struct AnalyzeIn {
    streams: StreamRecord,
    #[serde(default)]
    activity: ActivityContext,
}

/// JSON inn / JSON ut: `{"streams": {...}, "activity": {...}}`.
/// Parsefeil rapporteres med sti (f.eks. `streams.time[3]`).
pub fn analyze_streams_json(json_in: &str) -> Result<String> {
    let mut de = serde_json::Deserializer::from_str(json_in);
    let parsed: AnalyzeIn = serde_path_to_error::deserialize(&mut de)?;
    parsed.streams.validate()?;
    let out = analyze_streams(&parsed.streams, &parsed.activity);
    Ok(serde_json::to_string(&out)?)
}
