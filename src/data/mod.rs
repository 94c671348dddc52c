//! Domain clients and data models
//!
//! One submodule per upstream API: ViaCEP postal codes, REST Countries,
//! OpenWeatherMap (current + forecast) and the IBGE name census. Each client
//! wraps the fetch pipeline in `crate::fetch` and converts its outcomes into
//! domain results or a [`ServiceError`].

pub mod cep;
pub mod country;
pub mod names;
pub mod weather;

pub use cep::CepClient;
pub use country::CountryClient;
pub use names::NamesClient;
pub use weather::WeatherClient;

use thiserror::Error;

/// Terminal error of a domain lookup, mirroring the `{error, status}` pair
/// that callers render
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServiceError {
    /// HTTP-like status class of the failure
    pub status: u16,
    /// Human-readable message, rendered as-is by the caller
    pub message: String,
}

impl ServiceError {
    /// Creates a new error with the given status class and message
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Rounds like JavaScript's `Math.round`: `floor(x + 0.5)`, halfway cases
/// toward positive infinity
pub(crate) fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
