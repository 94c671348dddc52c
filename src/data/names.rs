//! IBGE name-census client
//!
//! Issues the four census queries for a given first name concurrently and
//! collects every outcome independently: a single failed call becomes a
//! `None` marker instead of failing the whole lookup.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::data::ServiceError;
use crate::fetch::{fetch_json, DEFAULT_TIMEOUT};

/// Base URL for the IBGE name-census API
const IBGE_BASE_URL: &str = "https://servicodados.ibge.gov.br/api/v1/censos/nomes";

/// Defaults applied when the caller omits the filters, matching the
/// upstream query convention
const DEFAULT_SEX: &str = " ";
const DEFAULT_REGION: &str = "0";

/// Basic frequency statistics for a name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameBasic {
    #[serde(default)]
    pub rank: Option<i64>,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub freq: Option<i64>,
    #[serde(default)]
    pub percentual: Option<f64>,
    #[serde(rename = "ufMax", default)]
    pub uf_max: Option<String>,
    #[serde(rename = "ufMaxProp", default)]
    pub uf_max_prop: Option<String>,
    #[serde(default)]
    pub regiao: Option<i64>,
    #[serde(default)]
    pub sexo: Option<String>,
    #[serde(default)]
    pub nomes: Option<String>,
}

/// Per-state frequency entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameMap {
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub uf: Option<i64>,
    #[serde(default)]
    pub freq: Option<i64>,
    #[serde(default)]
    pub populacao: Option<i64>,
    #[serde(default)]
    pub sexo: Option<String>,
    #[serde(default)]
    pub prop: Option<f64>,
}

/// Per-decade frequency entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameRange {
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub freq: Option<i64>,
    #[serde(default)]
    pub regiao: Option<i64>,
    #[serde(default)]
    pub sexo: Option<String>,
    #[serde(default)]
    pub faixa: Option<String>,
}

/// National ranking entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameRanking {
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub regiao: Option<i64>,
    #[serde(default)]
    pub freq: Option<i64>,
    #[serde(default)]
    pub rank: Option<i64>,
    #[serde(default)]
    pub sexo: Option<String>,
}

/// The four census data sets together; `None` marks an individually
/// failed call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameUnion {
    pub data_basic: Option<Vec<NameBasic>>,
    pub data_map: Option<Vec<NameMap>>,
    pub data_range: Option<Vec<NameRange>>,
    pub data_ranking: Option<Vec<NameRanking>>,
}

/// True when the upstream answered but with an empty result set (the census
/// suppresses names with fewer than 20 occurrences)
fn reports_empty<T>(data: &Option<Vec<T>>) -> bool {
    matches!(data, Some(entries) if entries.is_empty())
}

/// Client for the IBGE name-census statistics
#[derive(Debug, Clone)]
pub struct NamesClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl Default for NamesClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NamesClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: IBGE_BASE_URL.to_string(),
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

    /// Fetches basic stats, per-state map, per-decade range and ranking for
    /// a name, all concurrently with independent timeouts.
    ///
    /// When any of the first three comes back present-but-empty the census
    /// has suppressed the name, and the lookup fails with a single 400.
    pub async fn lookup(
        &self,
        name: &str,
        sex: Option<&str>,
        region: Option<&str>,
    ) -> Result<NameUnion, ServiceError> {
        let sex = sex.unwrap_or(DEFAULT_SEX);
        let region = region.unwrap_or(DEFAULT_REGION);

        let basic_url = format!(
            "{}/basica?nome={}&regiao={}&sexo={}",
            self.base_url, name, region, sex
        );
        let map_url = format!("{}/mapa?nome={}&sexo={}", self.base_url, name, sex);
        let range_url = format!(
            "{}/faixa?nome={}&localidade={}&sexo={}",
            self.base_url, name, region, sex
        );
        let ranking_url = format!("{}/ranking?regiao={}&sexo={}", self.base_url, region, sex);

        let (basic, map, range, ranking) = futures::join!(
            fetch_json::<Vec<NameBasic>>(&self.client, &basic_url, self.timeout, None),
            fetch_json::<Vec<NameMap>>(&self.client, &map_url, self.timeout, None),
            fetch_json::<Vec<NameRange>>(&self.client, &range_url, self.timeout, None),
            fetch_json::<Vec<NameRanking>>(&self.client, &ranking_url, self.timeout, None),
        );

        if reports_empty(&basic.data) || reports_empty(&map.data) || reports_empty(&range.data) {
            return Err(ServiceError::new(
                400,
                "De acordo com os dados existem menos de 20 pessoas com esse nome no brasil",
            ));
        }

        Ok(NameUnion {
            data_basic: basic.data,
            data_map: map.data,
            data_range: range.data,
            data_ranking: ranking.data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_empty_only_for_present_but_empty() {
        assert!(reports_empty::<NameBasic>(&Some(Vec::new())));
        // A failed call (None) is not the "suppressed name" signal
        assert!(!reports_empty::<NameBasic>(&None));
        let populated = Some(vec![NameRanking {
            nome: Some("MARIA".to_string()),
            regiao: Some(0),
            freq: Some(11_734_129),
            rank: Some(1),
            sexo: None,
        }]);
        assert!(!reports_empty(&populated));
    }

    #[test]
    fn test_union_wire_shape_uses_camel_case_keys() {
        let union = NameUnion {
            data_basic: Some(Vec::new()),
            data_map: None,
            data_range: None,
            data_ranking: None,
        };
        let wire = serde_json::to_value(&union).expect("Failed to serialize");
        assert!(wire.get("dataBasic").is_some());
        assert_eq!(wire["dataMap"], serde_json::Value::Null);
    }

    #[test]
    fn test_client_builders() {
        let client = NamesClient::new()
            .with_base_url("http://127.0.0.1:1")
            .with_timeout(Duration::from_millis(100));
        assert_eq!(client.base_url, "http://127.0.0.1:1");
        assert_eq!(client.timeout, Duration::from_millis(100));
    }
}
