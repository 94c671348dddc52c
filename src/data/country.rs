//! REST Countries client, exact-translation selection and display mapping

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::data::ServiceError;
use crate::fetch::{fetch_json, ApiError, DEFAULT_TIMEOUT};

/// Base URL for the REST Countries API
const REST_COUNTRIES_BASE_URL: &str = "https://restcountries.com";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlagsRaw {
    #[serde(default)]
    pub svg: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
}

/// A name pair in one language (native names and translations share it)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamePair {
    #[serde(default)]
    pub official: Option<String>,
    #[serde(default)]
    pub common: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NameRaw {
    #[serde(default)]
    pub common: Option<String>,
    #[serde(default)]
    pub official: Option<String>,
    #[serde(rename = "nativeName", default)]
    pub native_name: Option<HashMap<String, NamePair>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrencyRaw {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CarRaw {
    #[serde(default)]
    pub signs: Option<Vec<String>>,
    #[serde(default)]
    pub side: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapsRaw {
    #[serde(rename = "googleMaps", default)]
    pub google_maps: Option<String>,
}

/// Raw country entry from the REST Countries translation endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountryRaw {
    #[serde(default)]
    pub flags: FlagsRaw,
    #[serde(default)]
    pub name: NameRaw,
    #[serde(default)]
    pub translations: HashMap<String, NamePair>,
    #[serde(default)]
    pub languages: Option<HashMap<String, String>>,
    #[serde(default)]
    pub subregion: Option<String>,
    #[serde(default)]
    pub area: Option<f64>,
    #[serde(default)]
    pub borders: Option<Vec<String>>,
    #[serde(default)]
    pub continents: Option<Vec<String>>,
    #[serde(default)]
    pub population: Option<i64>,
    #[serde(default)]
    pub capital: Option<Vec<String>>,
    #[serde(default)]
    pub tld: Option<Vec<String>>,
    #[serde(default)]
    pub gini: Option<HashMap<String, f64>>,
    #[serde(default)]
    pub currencies: Option<HashMap<String, CurrencyRaw>>,
    #[serde(default)]
    pub car: CarRaw,
    #[serde(default)]
    pub maps: MapsRaw,
    #[serde(rename = "unMember", default)]
    pub un_member: Option<bool>,
    #[serde(default)]
    pub independent: Option<bool>,
    #[serde(default)]
    pub fifa: Option<String>,
    #[serde(default)]
    pub timezones: Option<Vec<String>>,
}

/// A native name joined with its resolved language
#[derive(Debug, Clone, Serialize)]
pub struct NativeName {
    pub language: Option<String>,
    pub official: Option<String>,
    pub common: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountryNames {
    pub common: Option<String>,
    pub official: Option<String>,
    pub common_pt_br: Option<String>,
    pub official_pt_br: Option<String>,
    pub native: Option<Vec<NativeName>>,
}

/// Display-ready country facts (pt-BR oriented fields)
#[derive(Debug, Clone, Serialize)]
pub struct CountryMapped {
    pub flags: FlagsRaw,
    pub names: CountryNames,
    pub subregion: Option<String>,
    pub area: Option<f64>,
    pub borders: Option<Vec<String>>,
    pub continent: Option<Vec<String>>,
    /// Formatted with pt-BR thousand separators
    pub population: Option<String>,
    pub capital: Option<Vec<String>>,
    pub tld: Option<Vec<String>>,
    pub gini: Option<HashMap<String, f64>>,
    pub languages: Option<Vec<String>>,
    pub currencies: Option<HashMap<String, CurrencyRaw>>,
    pub car_signs: Option<Vec<String>>,
    /// "Direita" or "Esquerda"
    pub car_side: String,
    pub maps: Option<String>,
    pub un_member: String,
    pub independent: String,
    pub fifa: Option<String>,
    pub timezone: Option<Vec<String>>,
}

/// Picks the entry whose translations contain an exact case-insensitive
/// common-name match for the query; falls back to the first entry when there
/// is no match or only one candidate.
pub fn select_country<'a>(entries: &'a [CountryRaw], query: &str) -> Option<&'a CountryRaw> {
    if entries.len() > 1 {
        let query = query.to_lowercase();
        let exact = entries.iter().find(|country| {
            country.translations.values().any(|translation| {
                translation
                    .common
                    .as_deref()
                    .is_some_and(|common| common.to_lowercase() == query)
            })
        });
        if exact.is_some() {
            return exact;
        }
    }
    entries.first()
}

/// Formats a population count with pt-BR dot thousand separators
fn format_population(population: i64) -> String {
    let digits = population.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if population < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn sim_nao(flag: Option<bool>) -> String {
    if flag == Some(true) { "Sim" } else { "Não" }.to_string()
}

/// Maps a raw country entry into its display shape
pub fn map_country(raw: &CountryRaw) -> CountryMapped {
    let portuguese = raw.translations.get("por");

    let native = raw.name.native_name.as_ref().map(|native| {
        native
            .iter()
            .map(|(language, pair)| NativeName {
                language: raw
                    .languages
                    .as_ref()
                    .and_then(|languages| languages.get(language).cloned()),
                official: pair.official.clone(),
                common: pair.common.clone(),
            })
            .collect()
    });

    CountryMapped {
        flags: raw.flags.clone(),
        names: CountryNames {
            common: raw.name.common.clone(),
            official: raw.name.official.clone(),
            common_pt_br: portuguese.and_then(|t| t.common.clone()),
            official_pt_br: portuguese.and_then(|t| t.official.clone()),
            native,
        },
        subregion: raw.subregion.clone(),
        area: raw.area,
        borders: raw.borders.clone(),
        continent: raw.continents.clone(),
        population: raw.population.map(format_population),
        capital: raw.capital.clone(),
        tld: raw.tld.clone(),
        gini: raw.gini.clone(),
        languages: raw
            .languages
            .as_ref()
            .map(|languages| languages.values().cloned().collect()),
        currencies: raw.currencies.clone(),
        car_signs: raw.car.signs.clone(),
        car_side: if raw.car.side.as_deref() == Some("right") {
            "Direita".to_string()
        } else {
            "Esquerda".to_string()
        },
        maps: raw.maps.google_maps.clone(),
        un_member: sim_nao(raw.un_member),
        independent: sim_nao(raw.independent),
        fifa: raw.fifa.clone(),
        timezone: raw.timezones.clone(),
    }
}

/// Client for the REST Countries registry
#[derive(Debug, Clone)]
pub struct CountryClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl Default for CountryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CountryClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: REST_COUNTRIES_BASE_URL.to_string(),
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

    /// Looks up a country by free-text name via the translation endpoint.
    ///
    /// A 404 is forwarded as "Country not found"; any other failure keeps
    /// its status class. Multi-entry responses are narrowed with
    /// [`select_country`].
    pub async fn lookup(&self, country: &str) -> Result<CountryRaw, ServiceError> {
        let query = country.trim();
        let url = format!("{}/v3.1/translation/{}", self.base_url, query);

        let response = fetch_json::<Vec<CountryRaw>>(&self.client, &url, self.timeout, None).await;

        if response.is_not_found() {
            return Err(ServiceError::new(404, "Country not found"));
        }

        if let Some(error) = &response.error {
            return Err(match error {
                ApiError::Timeout => ServiceError::new(504, "Request Timeout"),
                ApiError::Network => ServiceError::new(500, "Network error"),
                _ => ServiceError::new(response.status, "Internal Error"),
            });
        }

        let entries = response.data.unwrap_or_default();
        match select_country(&entries, query) {
            Some(country) => Ok(country.clone()),
            None => Err(ServiceError::new(500, "Internal Error")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(common: &str, translation_common: &str) -> CountryRaw {
        CountryRaw {
            name: NameRaw {
                common: Some(common.to_string()),
                official: Some(format!("Republic of {common}")),
                native_name: None,
            },
            translations: HashMap::from([(
                "por".to_string(),
                NamePair {
                    official: Some(format!("República de {translation_common}")),
                    common: Some(translation_common.to_string()),
                },
            )]),
            ..CountryRaw::default()
        }
    }

    #[test]
    fn test_select_country_prefers_exact_translation_match() {
        let entries = vec![entry("India", "Índia"), entry("Indonesia", "Indonésia")];
        let picked = select_country(&entries, "indonésia").expect("Expected a match");
        assert_eq!(picked.name.common.as_deref(), Some("Indonesia"));
    }

    #[test]
    fn test_select_country_defaults_to_first_without_exact_match() {
        let entries = vec![entry("India", "Índia"), entry("Indonesia", "Indonésia")];
        let picked = select_country(&entries, "ind").expect("Expected fallback");
        assert_eq!(picked.name.common.as_deref(), Some("India"));
    }

    #[test]
    fn test_select_country_single_candidate_skips_filtering() {
        let entries = vec![entry("Brazil", "Brasil")];
        let picked = select_country(&entries, "no match at all").expect("Expected first entry");
        assert_eq!(picked.name.common.as_deref(), Some("Brazil"));
    }

    #[test]
    fn test_select_country_empty_is_none() {
        assert!(select_country(&[], "brasil").is_none());
    }

    #[test]
    fn test_format_population_pt_br() {
        assert_eq!(format_population(212_583_750), "212.583.750");
        assert_eq!(format_population(1_000), "1.000");
        assert_eq!(format_population(999), "999");
        assert_eq!(format_population(0), "0");
    }

    #[test]
    fn test_map_country_display_fields() {
        let mut raw = entry("Brazil", "Brasil");
        raw.population = Some(212_583_750);
        raw.car.side = Some("right".to_string());
        raw.un_member = Some(true);
        raw.independent = None;
        raw.languages = Some(HashMap::from([(
            "por".to_string(),
            "Portuguese".to_string(),
        )]));
        raw.name.native_name = Some(HashMap::from([(
            "por".to_string(),
            NamePair {
                official: Some("República Federativa do Brasil".to_string()),
                common: Some("Brasil".to_string()),
            },
        )]));

        let mapped = map_country(&raw);
        assert_eq!(mapped.names.common_pt_br.as_deref(), Some("Brasil"));
        assert_eq!(mapped.population.as_deref(), Some("212.583.750"));
        assert_eq!(mapped.car_side, "Direita");
        assert_eq!(mapped.un_member, "Sim");
        assert_eq!(mapped.independent, "Não");

        let native = mapped.names.native.expect("Expected native names");
        assert_eq!(native.len(), 1);
        assert_eq!(native[0].language.as_deref(), Some("Portuguese"));
    }

    #[test]
    fn test_map_country_left_side_is_default() {
        let mapped = map_country(&entry("Japan", "Japão"));
        assert_eq!(mapped.car_side, "Esquerda");
    }
}
