use thiserror::Error;

/// Felles feiltype for hele kjernen.
///
/// Manglende kanaler og for korte serier er IKKE feil her: motoren
/// utelater da gruppen (eller gir `null`). Denne typen dekker I/O mot
/// disk, nett og parsing.
#[derive(Debug, Error)]
pub enum CoachError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("json parse at {path}: {message}")]
    JsonPath { path: String, message: String },

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("config: {0}")]
    Config(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("http transport: {0}")]
    Transport(String),

    #[error("http status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("stream channel `{channel}` has {got} samples, expected {expected}")]
    Misaligned {
        channel: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("stream time decreases at sample {index}")]
    NonMonotonicTime { index: usize },

    #[error("stream is missing required channel `{0}`")]
    MissingChannel(&'static str),

    #[error("metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("chart: {0}")]
    Chart(String),
}

pub type Result<T> = std::result::Result<T, CoachError>;

impl From<ureq::Error> for CoachError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, resp) => {
                let body = resp.into_string().unwrap_or_default();
                CoachError::Status { code, body }
            }
            ureq::Error::Transport(t) => CoachError::Transport(t.to_string()),
        }
    }
}

impl From<toml::de::Error> for CoachError {
    fn from(err: toml::de::Error) -> Self {
        CoachError::Config(err.to_string())
    }
}

impl<E: std::fmt::Display> From<serde_path_to_error::Error<E>> for CoachError {
    fn from(err: serde_path_to_error::Error<E>) -> Self {
        CoachError::JsonPath {
            path: err.path().to_string(),
            message: err.inner().to_string(),
        }
    }
}

impl<E> From<plotters::drawing::DrawingAreaErrorKind<E>> for CoachError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        CoachError::Chart(err.to_string())
    }
}
