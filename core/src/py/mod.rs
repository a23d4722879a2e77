// Python-binding (bygges kun med `--features python`).
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

use crate::analyzer;
use crate::metrics;

/// JSON inn / JSON ut: `{"streams": {...}, "activity": {...}}` → avledede metrikker.
#[pyfunction]
fn analyze_streams_json(json_in: &str) -> PyResult<String> {
    analyzer::analyze_streams_json(json_in).map_err(|e| PyValueError::new_err(e.to_string()))
}

/// NP for en effektserie; `None` under 30 samples.
#[pyfunction]
fn normalized_power(watts: Vec<f64>) -> Option<f64> {
    metrics::normalized_power(&metrics::positive_power(&watts))
}

/// FTP-estimat (0.95 × beste 20-min snitt); `None` under 1200 samples.
#[pyfunction]
fn estimate_ftp(watts: Vec<f64>) -> Option<f64> {
    metrics::estimate_ftp(&metrics::positive_power(&watts))
}

#[pymodule]
fn cyclecoach_core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(analyze_streams_json, m)?)?;
    m.add_function(wrap_pyfunction!(normalized_power, m)?)?;
    m.add_function(wrap_pyfunction!(estimate_ftp, m)?)?;
    Ok(())
}
