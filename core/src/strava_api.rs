// core/src/strava_api.rs
use chrono::{DateTime, Utc};
use log::{debug, info};
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use ureq::Agent;

use crate::config::StravaConfig;
use crate::error::{CoachError, Result};
use crate::types::{elapsed_seconds, ActivityContext, ActivitySummary, StreamRecord};

/// Kanaler vi ber Strava om.
pub const STREAM_KEYS: &str =
    "time,distance,latlng,altitude,velocity_smooth,heartrate,cadence,watts,temp,moving,grade_smooth";

/// Detaljert aktivitet: typet kontekst + rå JSON for lagring.
#[derive(Debug, Clone)]
pub struct DetailedActivity {
    pub context: ActivityContext,
    pub raw: Value,
}

/// Kilde for aktivitetsdata (prod: StravaClient, test: egne fakes).
pub trait ActivitySource {
    fn activities(&self, after: DateTime<Utc>) -> Result<Vec<ActivitySummary>>;
    fn activity(&self, activity_id: u64) -> Result<DetailedActivity>;
    fn streams(&self, activity_id: u64) -> Result<StreamRecord>;
}

#[derive(Debug, Deserialize)]
struct TokenResp {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
}

/// Strava v3-klient – enkel blocking-versjon (ureq).
///
/// Access-token hentes ved første kall via refresh-token og gjenbrukes
/// resten av prosessens levetid.
pub struct StravaClient {
    agent: Agent,
    cfg: StravaConfig,
    access_token: OnceCell<String>,
}

impl StravaClient {
    pub fn new(cfg: StravaConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build();
        Self {
            agent,
            cfg,
            access_token: OnceCell::new(),
        }
    }

    /// Klient med kjent access-token (ingen refresh).
    pub fn with_access_token(cfg: StravaConfig, token: impl Into<String>) -> Self {
        let client = Self::new(cfg);
        let _ = client.access_token.set(token.into());
        client
    }

    fn refresh_access_token(&self) -> Result<String> {
        let client_id = self
            .cfg
            .client_id
            .as_deref()
            .ok_or(CoachError::MissingCredential("STRAVA_CLIENT_ID"))?;
        let client_secret = self
            .cfg
            .client_secret
            .as_deref()
            .ok_or(CoachError::MissingCredential("STRAVA_CLIENT_SECRET"))?;
        let refresh_token = self
            .cfg
            .refresh_token
            .as_deref()
            .ok_or(CoachError::MissingCredential("STRAVA_REFRESH_TOKEN"))?;

        let resp = self.agent.post(&self.cfg.auth_url).send_form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])?;
        let token: TokenResp = parse_body(resp)?;

        if token.refresh_token.as_deref().is_some_and(|r| r != refresh_token) {
            info!("[Strava] refresh token rotated; update STRAVA_REFRESH_TOKEN in your config");
        }
        debug!("[Strava] access token refreshed (expires_at={:?})", token.expires_at);
        Ok(token.access_token)
    }

    fn token(&self) -> Result<&str> {
        self.access_token
            .get_or_try_init(|| self.refresh_access_token())
            .map(String::as_str)
    }

    fn get(&self, path: &str) -> Result<ureq::Request> {
        let url = format!("{}{}", self.cfg.api_url.trim_end_matches('/'), path);
        let bearer = format!("Bearer {}", self.token()?);
        Ok(self.agent.get(&url).set("Authorization", &bearer))
    }
}

impl ActivitySource for StravaClient {
    fn activities(&self, after: DateTime<Utc>) -> Result<Vec<ActivitySummary>> {
        let resp = self
            .get("/athlete/activities")?
            .query("after", &after.timestamp().to_string())
            .query("per_page", "200")
            .call()?;
        let list: Vec<ActivitySummary> = parse_body(resp)?;
        info!("[Strava] retrieved {} activities since {}", list.len(), after.date_naive());
        Ok(list)
    }

    fn activity(&self, activity_id: u64) -> Result<DetailedActivity> {
        let resp = self
            .get(&format!("/activities/{activity_id}"))?
            .query("include_all_efforts", "true")
            .call()?;
        let raw: Value = parse_body(resp)?;
        let mut de = raw.clone();
        // id kan mangle i enkelte svar; bruk id fra forespørselen
        if let Value::Object(ref mut obj) = de {
            obj.entry("id").or_insert(Value::from(activity_id));
        }
        let context: ActivityContext =
            serde_path_to_error::deserialize(de).map_err(CoachError::from)?;
        Ok(DetailedActivity { context, raw })
    }

    fn streams(&self, activity_id: u64) -> Result<StreamRecord> {
        let resp = self
            .get(&format!("/activities/{activity_id}/streams"))?
            .query("keys", STREAM_KEYS)
            .query("key_by_type", "true")
            .call()?;
        let raw: Value = parse_body(resp)?;
        parse_streams(&raw)
    }
}

fn parse_body<T: DeserializeOwned>(resp: ureq::Response) -> Result<T> {
    let body = resp.into_string()?;
    let mut de = serde_json::Deserializer::from_str(&body);
    Ok(serde_path_to_error::deserialize(&mut de)?)
}

/// Gjør Strava-strømmer om til en validert `StreamRecord`.
///
/// Godtar både `key_by_type=true` (`{"time": {"data": [...]}, ...}`) og
/// listeformen (`[{"type": "time", "data": [...]}, ...]`). `latlng` deles i
/// `latitude`/`longitude`; kanaler vi ikke bruker (temp, moving) ignoreres.
pub fn parse_streams(raw: &Value) -> Result<StreamRecord> {
    let mut entries: Vec<(&str, &Vec<Value>)> = Vec::new();
    match raw {
        Value::Object(map) => {
            for (k, v) in map {
                if let Some(Value::Array(data)) = v.get("data") {
                    entries.push((k.as_str(), data));
                }
            }
        }
        Value::Array(list) => {
            for v in list {
                if let (Some(Value::String(k)), Some(Value::Array(data))) = (v.get("type"), v.get("data")) {
                    entries.push((k.as_str(), data));
                }
            }
        }
        _ => return Err(CoachError::InvalidData("streams payload is not an object or list".into())),
    }

    let find = |name: &str| entries.iter().find(|(k, _)| *k == name).map(|(_, d)| *d);
    let numeric = |name: &str| -> Option<Vec<f64>> {
        find(name).map(|d| d.iter().map(|v| v.as_f64().unwrap_or(f64::NAN)).collect())
    };

    let time_data = find("time").ok_or(CoachError::MissingChannel("time"))?;
    let time = time_data
        .iter()
        .map(|v| {
            v.as_f64()
                .and_then(elapsed_seconds)
                .ok_or_else(|| CoachError::InvalidData(format!("bad time sample {v}")))
        })
        .collect::<Result<Vec<u32>>>()?;

    let (latitude, longitude) = match find("latlng") {
        Some(pairs) => {
            let coord = |p: &Value, i: usize| p.get(i).and_then(Value::as_f64).unwrap_or(f64::NAN);
            (
                Some(pairs.iter().map(|p| coord(p, 0)).collect()),
                Some(pairs.iter().map(|p| coord(p, 1)).collect()),
            )
        }
        None => (None, None),
    };

    let rec = StreamRecord {
        time,
        distance: numeric("distance"),
        heartrate: numeric("heartrate"),
        watts: numeric("watts"),
        cadence: numeric("cadence"),
        altitude: numeric("altitude"),
        velocity_smooth: numeric("velocity_smooth"),
        grade_smooth: numeric("grade_smooth"),
        latitude,
        longitude,
    };
    rec.validate()?;
    Ok(rec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_key_by_type_streams() {
        let raw = json!({
            "time": {"data": [0, 1, 2], "series_type": "distance"},
            "heartrate": {"data": [120, 121, 125]},
            "latlng": {"data": [[59.9, 10.7], [59.91, 10.71], [59.92, 10.72]]},
            "moving": {"data": [true, true, false]}
        });
        let rec = parse_streams(&raw).unwrap();
        assert_eq!(rec.time, vec![0, 1, 2]);
        assert_eq!(rec.heartrate.as_deref(), Some(&[120.0, 121.0, 125.0][..]));
        assert_eq!(rec.longitude.as_ref().unwrap()[2], 10.72);
        assert!(rec.watts.is_none());
    }

    #[test]
    fn parses_list_form() {
        let raw = json!([
            {"type": "time", "data": [0, 1]},
            {"type": "watts", "data": [200, 210]}
        ]);
        let rec = parse_streams(&raw).unwrap();
        assert_eq!(rec.watts.unwrap(), vec![200.0, 210.0]);
    }

    #[test]
    fn missing_time_is_an_error() {
        let raw = json!({"heartrate": {"data": [120]}});
        assert!(matches!(parse_streams(&raw), Err(CoachError::MissingChannel("time"))));
    }

    #[test]
    fn misaligned_channel_is_rejected() {
        let raw = json!({
            "time": {"data": [0, 1, 2]},
            "cadence": {"data": [80, 82]}
        });
        assert!(matches!(
            parse_streams(&raw),
            Err(CoachError::Misaligned { channel: "cadence", .. })
        ));
    }

    #[test]
    fn decreasing_time_is_rejected() {
        let raw = json!({
            "time": {"data": [0, 5, 3]},
            "heartrate": {"data": [120, 121, 122]}
        });
        assert!(matches!(
            parse_streams(&raw),
            Err(CoachError::NonMonotonicTime { index: 2 })
        ));
    }

    #[test]
    fn negative_time_is_invalid() {
        let raw = json!({"time": {"data": [0, -1]}});
        assert!(matches!(parse_streams(&raw), Err(CoachError::InvalidData(_))));
    }

    #[test]
    fn missing_credentials_fail_before_network() {
        let client = StravaClient::new(StravaConfig::default());
        match client.activity(1) {
            Err(CoachError::MissingCredential(name)) => assert_eq!(name, "STRAVA_CLIENT_ID"),
            other => panic!("expected missing credential, got {other:?}"),
        }
    }
}
