use log::warn;
use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};

use crate::error::Result;

/// Tellere for en batch-kjøring. Eies av kalleren og sendes inn eksplisitt.
#[derive(Clone)]
pub struct Telemetry {
    registry: Registry,
    activities_processed: IntCounter,
    activities_failed: IntCounter,
    store_hit: IntCounter,
    store_miss: IntCounter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter> {
    let c = IntCounter::with_opts(Opts::new(name, help).namespace("cyclecoach"))?;
    registry.register(Box::new(c.clone()))?;
    Ok(c)
}

impl Telemetry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        Ok(Self {
            activities_processed: counter(
                &registry,
                "activities_processed_total",
                "Activities analysed successfully",
            )?,
            activities_failed: counter(
                &registry,
                "activities_failed_total",
                "Activities skipped after an error",
            )?,
            store_hit: counter(
                &registry,
                "stream_store_hit_total",
                "Streams served from the local store",
            )?,
            store_miss: counter(
                &registry,
                "stream_store_miss_total",
                "Streams fetched from the tracking API",
            )?,
            registry,
        })
    }

    pub fn activities_processed_total(&self) -> &IntCounter {
        &self.activities_processed
    }

    pub fn activities_failed_total(&self) -> &IntCounter {
        &self.activities_failed
    }

    pub fn stream_store_hit_total(&self) -> &IntCounter {
        &self.store_hit
    }

    pub fn stream_store_miss_total(&self) -> &IntCounter {
        &self.store_miss
    }

    /// Prometheus tekstformat, for debug-logg.
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            warn!("telemetry not rendered: {e}");
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}
