use log::warn;
use ordered_float::OrderedFloat;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Én bøtte i et histogram: halvåpent intervall `[lower, upper)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
}

impl Bucket {
    pub fn label(&self) -> String {
        format!("{:.1}-{:.1}", self.lower, self.upper)
    }
}

/// Histogram med heltallsbredde. Serialiseres som et JSON-objekt
/// `{"lo-hi": count}` i stigende bøtterekkefølge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    pub buckets: Vec<Bucket>,
}

impl Distribution {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }

    pub fn get(&self, label: &str) -> Option<u64> {
        self.buckets.iter().find(|b| b.label() == label).map(|b| b.count)
    }
}

impl Serialize for Distribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.buckets.len()))?;
        for b in &self.buckets {
            map.serialize_entry(&b.label(), &b.count)?;
        }
        map.end()
    }
}

/// Øvre grense for antall bøtter; et større spenn tyder på korrupte samples.
pub const MAX_BUCKETS: usize = 10_000;

/// Teller verdier i bøtter med bredde `bin_size` fra `floor(min)` til
/// (minst) `floor(max) + 1`. Ikke-finitte verdier hoppes over.
pub fn distribution(values: &[f64], bin_size: u32) -> Distribution {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let (Some(min), Some(max)) = (
        finite.iter().copied().map(OrderedFloat).min(),
        finite.iter().copied().map(OrderedFloat).max(),
    ) else {
        return Distribution::default();
    };

    let width = f64::from(bin_size.max(1));
    let lo = min.0.floor();
    let hi = max.0.floor() + 1.0;
    let span_bins = ((hi - lo) / width).ceil();
    if span_bins > MAX_BUCKETS as f64 {
        warn!("distribution skipped: range {lo}..{hi} needs more than {MAX_BUCKETS} buckets");
        return Distribution::default();
    }
    let n_bins = (span_bins as usize).max(1);

    let mut buckets: Vec<Bucket> = (0..n_bins)
        .map(|i| {
            let lower = lo + i as f64 * width;
            Bucket { lower, upper: lower + width, count: 0 }
        })
        .collect();

    for v in finite {
        let idx = (((v - lo) / width).floor() as usize).min(n_bins - 1);
        buckets[idx].count += 1;
    }

    Distribution { buckets }
}
