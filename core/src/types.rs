use serde::{Deserialize, Serialize};

use crate::error::{CoachError, Result};

/// Per-sekund tidsserie for én aktivitet, lagret kolonnevis.
///
/// `time` er påkrevd. Alle andre kanaler er valgfrie kolonner: enten
/// mangler de helt (`None`) eller så har de nøyaktig `time.len()` verdier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    /// sekunder fra start, ikke-synkende
    pub time: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<Vec<f64>>, // meter
    #[serde(default, alias = "hr", skip_serializing_if = "Option::is_none")]
    pub heartrate: Option<Vec<f64>>, // bpm
    #[serde(default, alias = "power", alias = "power_w", skip_serializing_if = "Option::is_none")]
    pub watts: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence: Option<Vec<f64>>, // rpm
    #[serde(default, alias = "alt", skip_serializing_if = "Option::is_none")]
    pub altitude: Option<Vec<f64>>, // meter
    #[serde(default, alias = "speed", skip_serializing_if = "Option::is_none")]
    pub velocity_smooth: Option<Vec<f64>>, // m/s
    #[serde(default, alias = "grade", skip_serializing_if = "Option::is_none")]
    pub grade_smooth: Option<Vec<f64>>, // prosent
    #[serde(default, alias = "lat", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Vec<f64>>,
    #[serde(default, alias = "lng", alias = "lon", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Vec<f64>>,
}

impl StreamRecord {
    pub fn new(time: Vec<u32>) -> Self {
        Self {
            time,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Siste tidsstempel (total forløpt tid), 0 for tom serie.
    pub fn elapsed_s(&self) -> u32 {
        self.time.last().copied().unwrap_or(0)
    }

    /// (navn, kolonne) for alle valgfrie kanaler, i fast rekkefølge.
    pub fn channels(&self) -> [(&'static str, Option<&[f64]>); 9] {
        [
            ("distance", self.distance.as_deref()),
            ("heartrate", self.heartrate.as_deref()),
            ("watts", self.watts.as_deref()),
            ("cadence", self.cadence.as_deref()),
            ("altitude", self.altitude.as_deref()),
            ("velocity_smooth", self.velocity_smooth.as_deref()),
            ("grade_smooth", self.grade_smooth.as_deref()),
            ("latitude", self.latitude.as_deref()),
            ("longitude", self.longitude.as_deref()),
        ]
    }

    /// Slå opp en kanal på kolonnenavn (samme navn som Strava bruker).
    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        self.channels()
            .into_iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, col)| col)
    }

    /// Sjekker at `time` er ikke-synkende og at alle kolonner har samme
    /// lengde som `time`.
    pub fn validate(&self) -> Result<()> {
        if let Some(i) = self.time.windows(2).position(|w| w[1] < w[0]) {
            return Err(CoachError::NonMonotonicTime { index: i + 1 });
        }
        let expected = self.time.len();
        for (channel, col) in self.channels() {
            if let Some(col) = col {
                if col.len() != expected {
                    return Err(CoachError::Misaligned {
                        channel,
                        expected,
                        got: col.len(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::of(self)
    }
}

/// Hvilke metrikk-grupper som kan beregnes, avgjort én gang før analysen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub heartrate: bool,
    pub power: bool,
    pub cadence: bool,
    pub altitude: bool,
    pub gradient: bool,
    pub speed: bool,
    pub route: bool,
}

impl Capabilities {
    pub fn of(rec: &StreamRecord) -> Self {
        let non_empty = |c: &Option<Vec<f64>>| c.as_ref().is_some_and(|v| !v.is_empty());
        let any_positive =
            |c: &Option<Vec<f64>>| c.as_ref().is_some_and(|v| v.iter().any(|x| *x > 0.0));

        Self {
            heartrate: non_empty(&rec.heartrate),
            power: any_positive(&rec.watts),
            cadence: any_positive(&rec.cadence),
            altitude: non_empty(&rec.altitude),
            gradient: non_empty(&rec.grade_smooth),
            speed: non_empty(&rec.velocity_smooth),
            route: non_empty(&rec.latitude) && non_empty(&rec.longitude),
        }
    }
}

/// Skalar metadata for én aktivitet. Leses av motoren, endres aldri.
///
/// Deserialiseres direkte fra Strava `GET /activities/{id}`; ukjente felt ignoreres.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityContext {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub max_heartrate: Option<f64>,
    #[serde(default)]
    pub start_date_local: Option<String>,
}

/// Én rad fra aktivitetslisten (`GET /athlete/activities`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub activity_type: String,
    #[serde(default)]
    pub start_date_local: Option<String>,
    #[serde(default)]
    pub distance: Option<f64>, // meter
    #[serde(default)]
    pub moving_time: Option<f64>, // sek
    #[serde(default)]
    pub elapsed_time: Option<f64>, // sek
    #[serde(default)]
    pub total_elevation_gain: Option<f64>,
    #[serde(default)]
    pub average_speed: Option<f64>, // m/s
    #[serde(default)]
    pub max_speed: Option<f64>,
    #[serde(default)]
    pub average_heartrate: Option<f64>,
    #[serde(default)]
    pub max_heartrate: Option<f64>,
    #[serde(default)]
    pub average_watts: Option<f64>,
    #[serde(default)]
    pub weighted_average_watts: Option<f64>,
    #[serde(default)]
    pub max_watts: Option<f64>,
    #[serde(default)]
    pub kilojoules: Option<f64>,
    #[serde(default)]
    pub device_watts: Option<bool>,
    #[serde(default)]
    pub average_cadence: Option<f64>,
    #[serde(default)]
    pub suffer_score: Option<f64>,
    #[serde(default)]
    pub calories: Option<f64>,
}

impl ActivitySummary {
    /// Starttid som naiv lokal tid; `None` hvis feltet mangler eller ikke kan parses.
    pub fn start_local(&self) -> Option<chrono::NaiveDateTime> {
        self.start_date_local.as_deref().and_then(parse_local_datetime)
    }
}

/// Et tidsstempel i sekunder som `u32`. Negative, ikke-finitte og for store
/// verdier gir `None`.
pub fn elapsed_seconds(t: f64) -> Option<u32> {
    (t.is_finite() && t >= 0.0 && t <= f64::from(u32::MAX)).then(|| t as u32)
}

/// Strava sender lokal tid med `Z`-suffiks; vi leser den som naiv lokal tid.
pub fn parse_local_datetime(s: &str) -> Option<chrono::NaiveDateTime> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|d| d.naive_local())
        .ok()
        .or_else(|| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok())
        .or_else(|| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok())
}
