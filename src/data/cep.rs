//! ViaCEP postal-code client and CEP formatting helpers

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::data::ServiceError;
use crate::fetch::{fetch_json, ApiError, DEFAULT_TIMEOUT};

/// Base URL for the ViaCEP API
const VIACEP_BASE_URL: &str = "https://viacep.com.br";

/// Errors produced while validating a CEP before any upstream call
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CepError {
    #[error("Digite um CEP")]
    Missing,

    #[error("CEP inválido, deve conter 8 dígitos")]
    WrongLength,
}

/// Address record as returned by ViaCEP, forwarded unchanged on success
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CepResponse {
    #[serde(default)]
    pub cep: Option<String>,
    #[serde(default)]
    pub logradouro: Option<String>,
    #[serde(default)]
    pub complemento: Option<String>,
    #[serde(default)]
    pub unidade: Option<String>,
    #[serde(default)]
    pub bairro: Option<String>,
    #[serde(default)]
    pub localidade: Option<String>,
    #[serde(default)]
    pub uf: Option<String>,
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(default)]
    pub regiao: Option<String>,
    #[serde(default)]
    pub ibge: Option<String>,
    #[serde(default)]
    pub gini: Option<String>,
    #[serde(default)]
    pub ddd: Option<String>,
    #[serde(default)]
    pub siafi: Option<String>,
    /// Not-found sentinel; ViaCEP has emitted both `true` and `"true"`
    #[serde(default)]
    pub erro: Option<Value>,
}

impl CepResponse {
    /// True when the upstream signalled its "no such CEP" sentinel
    pub fn is_not_found(&self) -> bool {
        match &self.erro {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(text)) => text == "true",
            _ => false,
        }
    }
}

/// Strips every non-digit character
pub fn clean_cep(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Formats 8 bare digits as `XXXXX-XXX`; anything else is returned unchanged
pub fn cep_mask(value: &str) -> String {
    if value.len() == 8 && value.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}", &value[..5], &value[5..])
    } else {
        value.to_string()
    }
}

/// Normalizes free-form input into display form: truncates to 9 characters,
/// strips non-digits and re-applies the mask
pub fn format_cep(value: &str) -> String {
    let truncated: String = value.chars().take(9).collect();
    cep_mask(&clean_cep(&truncated))
}

/// Validates raw input into a clean 8-digit CEP
pub fn validate_cep(value: &str) -> Result<String, CepError> {
    let clean = clean_cep(value);
    if clean.is_empty() {
        return Err(CepError::Missing);
    }
    if clean.len() != 8 {
        return Err(CepError::WrongLength);
    }
    Ok(clean)
}

/// Client for the ViaCEP postal-code registry
#[derive(Debug, Clone)]
pub struct CepClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl Default for CepClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CepClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: VIACEP_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the upstream base URL (used by tests against stub servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Looks up a postal code, honoring a caller-supplied cancellation token.
    ///
    /// Input is validated before any upstream call: non-digits are stripped
    /// and the result must be exactly 8 digits. The upstream `erro` sentinel
    /// maps to a 400 "not found"; timeouts and transport failures keep their
    /// 504/500 classes.
    pub async fn lookup(
        &self,
        cep: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<CepResponse, ServiceError> {
        let clean = validate_cep(cep).map_err(|error| ServiceError::new(400, error.to_string()))?;

        let url = format!("{}/ws/{}/json/", self.base_url, clean);
        let response = fetch_json::<CepResponse>(&self.client, &url, self.timeout, cancel).await;

        match (response.data, response.error) {
            (_, Some(ApiError::Timeout)) => Err(ServiceError::new(504, "Connection Timeout")),
            (_, Some(ApiError::Network)) => Err(ServiceError::new(500, "Connection Error")),
            (_, Some(_)) => Err(ServiceError::new(400, "CEP inválido")),
            (Some(data), None) if data.is_not_found() => {
                Err(ServiceError::new(400, "CEP não encontrado"))
            }
            (Some(data), None) => Ok(data),
            (None, None) => Err(ServiceError::new(500, "Connection Error")),
        }
    }
}
