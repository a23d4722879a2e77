use serde::Serialize;

use crate::distribution::{distribution, Distribution};
use crate::metrics;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElevationSummary {
    pub gain: f64,
    pub loss: f64,
    pub max: f64,
    pub min: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gradient_distribution: Option<Distribution>,
}

/// (stigning, fall) fra påfølgende høydeendringer. Første delta er 0.
pub fn gain_loss(altitude: &[f64]) -> (f64, f64) {
    altitude
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| d.is_finite())
        .fold((0.0, 0.0), |(gain, loss), d| {
            if d > 0.0 {
                (gain + d, loss)
            } else {
                (gain, loss - d)
            }
        })
}

/// Høydesammendrag; gradientfordeling (1 %-bøtter) når `grade_smooth` finnes.
pub fn elevation_summary(altitude: &[f64], grade: Option<&[f64]>) -> Option<ElevationSummary> {
    let max = metrics::max(altitude)?;
    let min = metrics::min(altitude)?;
    let (gain, loss) = gain_loss(altitude);

    Some(ElevationSummary {
        gain,
        loss,
        max,
        min,
        gradient_distribution: grade.map(|g| distribution(g, 1)),
    })
}
