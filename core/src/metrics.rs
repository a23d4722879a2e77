use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::Serialize;

/// Vindu for Normalized Power (30 s ved 1 Hz).
pub const NP_WINDOW: usize = 30;
/// Vindu for FTP-estimat (20 min ved 1 Hz).
pub const FTP_WINDOW: usize = 1200;
pub const FTP_FACTOR: f64 = 0.95;
/// Varigheter (sek) i effekt-varighetskurven.
pub const CURVE_DURATIONS: [usize; 9] = [5, 10, 30, 60, 300, 600, 1200, 1800, 3600];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerSummary {
    pub average: f64,
    pub max: f64,
    /// `None` (null) når serien er kortere enn 30 samples
    pub normalized_power: Option<f64>,
    /// `None` (null) når serien er kortere enn 1200 samples
    pub ftp_estimate: Option<f64>,
}

/// Nullwatt og negative verdier regnes som manglende, ikke som rulling på 0 W.
pub fn positive_power(watts: &[f64]) -> Vec<f64> {
    watts.iter().copied().filter(|w| *w > 0.0).collect()
}

/// Glidende snitt over bakovervendte vinduer, kun fulle vinduer
/// (lengde `n - window + 1`). Tom hvis serien er kortere enn vinduet.
pub fn rolling_mean(xs: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || xs.len() < window {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(xs.len() - window + 1);
    let mut sum = 0.0f64;

    for i in 0..xs.len() {
        sum += xs[i];
        if i >= window {
            sum -= xs[i - window];
        }
        if i + 1 >= window {
            out.push(sum / window as f64);
        }
    }
    out
}

/// Høyeste snitt over et vindu av gitt lengde.
pub fn best_rolling_mean(xs: &[f64], window: usize) -> Option<f64> {
    rolling_mean(xs, window)
        .into_iter()
        .map(OrderedFloat)
        .max()
        .map(|m| m.0)
}

/// Normalized Power:
/// 1) 30s rullende snitt av kraft
/// 2) ^4-middel
/// 3) fjerderot
pub fn normalized_power(power: &[f64]) -> Option<f64> {
    let smooth = rolling_mean(power, NP_WINDOW);
    if smooth.is_empty() {
        return None;
    }
    // skaler mot største vindu før ^4 så summen ikke mister presisjon
    let reference = smooth.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if reference == 0.0 {
        return Some(0.0);
    }
    let scaled_avg = smooth.iter().map(|v| (v / reference).powi(4)).sum::<f64>() / smooth.len() as f64;
    Some(reference * scaled_avg.sqrt().sqrt())
}

/// FTP ≈ 95 % av beste 20-minutters snitt.
pub fn estimate_ftp(power: &[f64]) -> Option<f64> {
    best_rolling_mean(power, FTP_WINDOW).map(|p| p * FTP_FACTOR)
}

/// Beste snitteffekt per varighet, nøkkel `"{sek}s"`. Varigheter lengre
/// enn serien utelates.
pub fn power_curve(power: &[f64]) -> BTreeMap<String, f64> {
    CURVE_DURATIONS
        .iter()
        .filter_map(|&d| best_rolling_mean(power, d).map(|p| (d, p)))
        .map(|(d, p)| (format!("{d}s"), p))
        .collect()
}

/// Samme kurve som par (varighet, watt), sortert på varighet.
pub fn power_curve_points(power: &[f64]) -> Vec<(usize, f64)> {
    CURVE_DURATIONS
        .iter()
        .filter_map(|&d| best_rolling_mean(power, d).map(|p| (d, p)))
        .collect()
}

pub fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        None
    } else {
        Some(xs.iter().sum::<f64>() / xs.len() as f64)
    }
}

pub fn max(xs: &[f64]) -> Option<f64> {
    xs.iter()
        .copied()
        .filter(|v| v.is_finite())
        .map(OrderedFloat)
        .max()
        .map(|m| m.0)
}

pub fn min(xs: &[f64]) -> Option<f64> {
    xs.iter()
        .copied()
        .filter(|v| v.is_finite())
        .map(OrderedFloat)
        .min()
        .map(|m| m.0)
}

/// Effektsammendrag over filtrert (> 0) effekt. `None` hvis ingen gyldige samples.
pub fn power_summary(watts: &[f64]) -> Option<PowerSummary> {
    let power = positive_power(watts);
    Some(PowerSummary {
        average: mean(&power)?,
        max: max(&power)?,
        normalized_power: normalized_power(&power),
        ftp_estimate: estimate_ftp(&power),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_mean_uses_full_windows_only() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(rolling_mean(&xs, 2), vec![1.5, 2.5, 3.5]);
        assert!(rolling_mean(&xs, 5).is_empty());
    }

    #[test]
    fn np_needs_thirty_samples() {
        assert_eq!(normalized_power(&[250.0; 29]), None);
        assert!(normalized_power(&[250.0; 30]).is_some());
    }

    #[test]
    fn np_of_high_constant_power_is_exact() {
        assert_eq!(normalized_power(&vec![1999.0; 600]), Some(1999.0));
        assert_eq!(normalized_power(&vec![2500.0; 7200]), Some(2500.0));
    }

    #[test]
    fn np_weights_surges_above_average() {
        let mut watts = vec![100.0; 60];
        watts.extend(vec![400.0; 60]);
        let np = normalized_power(&watts).unwrap();
        assert!(np > 250.0 && np < 400.0, "np = {np}");
    }

    #[test]
    fn summary_filters_zero_power() {
        let mut watts = vec![0.0; 10];
        watts.extend([100.0, 300.0]);
        let s = power_summary(&watts).unwrap();
        assert_eq!(s.average, 200.0);
        assert_eq!(s.max, 300.0);
        assert_eq!(s.normalized_power, None);
        assert_eq!(s.ftp_estimate, None);
        assert!(power_summary(&[0.0, -5.0]).is_none());
    }

    #[test]
    fn curve_omits_durations_longer_than_series() {
        let curve = power_curve(&[200.0; 45]);
        let keys: Vec<_> = curve.keys().cloned().collect();
        assert_eq!(curve.len(), 3);
        assert!(keys.contains(&"5s".to_string()));
        assert!(keys.contains(&"30s".to_string()));
        assert!(!keys.contains(&"60s".to_string()));
    }
}
