use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::Serialize;

/// Pulssoner som andel av makspuls: Z1..Z5.
pub const ZONE_FRACTIONS: [(&str, f64, f64); 5] = [
    ("Z1", 0.0, 0.6),
    ("Z2", 0.6, 0.7),
    ("Z3", 0.7, 0.8),
    ("Z4", 0.8, 0.9),
    ("Z5", 0.9, 1.1),
];

/// Beskrivende navn brukt i dashbordet.
pub const ZONE_LABELS: [&str; 5] = [
    "Z1 (Easy)",
    "Z2 (Endurance)",
    "Z3 (Tempo)",
    "Z4 (Threshold)",
    "Z5 (Max)",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneBand {
    pub name: &'static str,
    /// inklusiv, bpm
    pub lower: f64,
    /// eksklusiv, bpm
    pub upper: f64,
}

impl ZoneBand {
    #[inline]
    pub fn contains(&self, hr: f64) -> bool {
        hr >= self.lower && hr < self.upper
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoneTime {
    pub time_seconds: u32,
    pub percentage: f64,
}

/// Grensene er `floor(max_hr * andel)`.
pub fn zone_bands(max_hr: f64) -> [ZoneBand; 5] {
    ZONE_FRACTIONS.map(|(name, lo, hi)| ZoneBand {
        name,
        lower: (max_hr * lo).floor(),
        upper: (max_hr * hi).floor(),
    })
}

/// Makspuls fra kontekst, ellers høyeste observerte verdi.
pub fn resolve_max_hr(context_max: Option<f64>, heartrate: &[f64]) -> Option<f64> {
    context_max.filter(|m| m.is_finite() && *m > 0.0).or_else(|| {
        heartrate
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .map(OrderedFloat)
            .max()
            .map(|m| m.0)
    })
}

/// Tid i hver pulssone.
///
/// Tid i sone = tid ved siste treff minus tid ved første treff. Dette
/// underteller når en sone besøkes i flere adskilte perioder; det er den
/// observerte oppførselen og beholdes slik. Soner uten treff utelates.
pub fn time_in_zones(time: &[u32], heartrate: &[f64], max_hr: f64) -> BTreeMap<String, ZoneTime> {
    let mut out = BTreeMap::new();
    let n = time.len().min(heartrate.len());
    if n == 0 {
        return out;
    }
    let total = time[n - 1];

    for band in zone_bands(max_hr) {
        let mut hits = (0..n).filter(|&i| band.contains(heartrate[i]));
        let Some(first) = hits.next() else {
            continue;
        };
        let last = hits.last().unwrap_or(first);
        let time_seconds = time[last].saturating_sub(time[first]);
        let percentage = if total > 0 {
            f64::from(time_seconds) / f64::from(total) * 100.0
        } else {
            0.0
        };
        out.insert(
            band.name.to_string(),
            ZoneTime {
                time_seconds,
                percentage,
            },
        );
    }

    out
}

/// Antall samples per sone (minutter ved 1 Hz), brukt av kakediagrammet.
pub fn samples_per_zone(heartrate: &[f64], max_hr: f64) -> [usize; 5] {
    let bands = zone_bands(max_hr);
    let mut counts = [0usize; 5];
    for hr in heartrate {
        if let Some(i) = bands.iter().position(|b| b.contains(*hr)) {
            counts[i] += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_partition_without_gaps() {
        for max_hr in [150.0, 160.0, 183.0, 201.5] {
            let bands = zone_bands(max_hr);
            assert_eq!(bands[0].lower, 0.0);
            for w in bands.windows(2) {
                assert_eq!(w[0].upper, w[1].lower, "gap/overlap at max {max_hr}");
            }
            let top = bands[4].upper as i64;
            for v in 0..top {
                let hits = bands.iter().filter(|b| b.contains(v as f64)).count();
                assert_eq!(hits, 1, "hr {v} at max {max_hr}");
            }
        }
    }

    #[test]
    fn single_matching_sample_reports_zero_seconds() {
        let time = [0, 1, 2];
        let hr = [100.0, 150.0, 100.0];
        let z = time_in_zones(&time, &hr, 160.0);
        assert_eq!(z["Z5"].time_seconds, 0);
        assert_eq!(z["Z2"].time_seconds, 2);
        assert!(!z.contains_key("Z1"));
    }

    #[test]
    fn zero_elapsed_gives_zero_percentage() {
        let z = time_in_zones(&[0], &[120.0], 160.0);
        assert_eq!(z["Z3"].percentage, 0.0);
    }

    #[test]
    fn max_hr_falls_back_to_observed() {
        assert_eq!(resolve_max_hr(None, &[120.0, 171.0, 99.0]), Some(171.0));
        assert_eq!(resolve_max_hr(Some(185.0), &[120.0]), Some(185.0));
        assert_eq!(resolve_max_hr(None, &[]), None);
    }
}
