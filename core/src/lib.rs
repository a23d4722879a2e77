// core/src/lib.rs
//! CycleCoach-kjernen: Strava-strømmer inn, avledede metrikker, figurer og
//! coach-tilbakemelding ut.

pub mod analyzer;
pub mod cli;
pub mod coach;
pub mod config;
pub mod dashboard;
pub mod distribution;
pub mod elevation;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod storage;
pub mod strava_api;
pub mod summary;
pub mod telemetry;
pub mod types;
pub mod zones;

#[cfg(feature = "python")]
mod py;

pub use analyzer::{analyze_streams, analyze_streams_json, ChannelSummary, DerivedMetrics};
pub use config::{AppConfig, RenderConfig};
pub use distribution::{distribution, Bucket, Distribution};
pub use elevation::{elevation_summary, ElevationSummary};
pub use error::{CoachError, Result};
pub use metrics::{estimate_ftp, normalized_power, power_curve, PowerSummary};
pub use storage::{DataDir, FileStreamStore, MemoryStreamStore, StreamStore};
pub use strava_api::{parse_streams, ActivitySource, DetailedActivity, StravaClient};
pub use telemetry::Telemetry;
pub use types::{ActivityContext, ActivitySummary, Capabilities, StreamRecord};
pub use zones::{time_in_zones, zone_bands, ZoneTime};
