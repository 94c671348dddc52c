//! Integration tests for the fetch pipeline and domain clients
//!
//! Upstreams are replaced by canned tokio TCP servers so every outcome
//! class (success, HTTP error, timeout, network failure, cancellation) can
//! be exercised deterministically.

use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use brdash::data::cep::CepClient;
use brdash::data::country::CountryClient;
use brdash::data::names::NamesClient;
use brdash::data::weather::WeatherClient;
use brdash::fetch::fetch_json;

/// Spawns a stub HTTP server serving canned responses by path prefix.
/// Unmatched paths get a 404 with an empty JSON object.
async fn spawn_stub(routes: Vec<(&'static str, u16, &'static str)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub server");
    let addr = listener.local_addr().expect("Failed to read stub address");

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let routes = routes.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                loop {
                    match socket.read(&mut buf[read..]).await {
                        Ok(0) => break,
                        Ok(n) => {
                            read += n;
                            if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                            if read == buf.len() {
                                break;
                            }
                        }
                        Err(_) => return,
                    }
                }

                let request = String::from_utf8_lossy(&buf[..read]).to_string();
                let path = request.split_whitespace().nth(1).unwrap_or("/");
                let (status, body) = routes
                    .iter()
                    .find(|(prefix, _, _)| path.starts_with(prefix))
                    .map(|(_, status, body)| (*status, *body))
                    .unwrap_or((404, "{}"));
                let reason = match status {
                    200 => "OK",
                    400 => "Bad Request",
                    404 => "Not Found",
                    502 => "Bad Gateway",
                    _ => "Internal Server Error",
                };

                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}

/// Spawns a server that accepts connections but never responds
async fn spawn_hanging() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind hanging server");
    let addr = listener.local_addr().expect("Failed to read stub address");

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                // Read and discard forever; never write a response
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {}
                    }
                }
            });
        }
    });

    format!("http://{addr}")
}

const CURRENT_WEATHER_BODY: &str = r#"{
    "coord": { "lon": -46.6361, "lat": -23.5475 },
    "weather": [{ "id": 800, "main": "Clear", "description": "céu limpo", "icon": "01d" }],
    "main": { "temp": 22.5, "feels_like": 22.1, "temp_min": 20.0, "temp_max": 24.0, "pressure": 1018, "humidity": 55 },
    "visibility": 10000,
    "wind": { "speed": 2.5, "deg": 90 },
    "clouds": { "all": 0 },
    "dt": 1726660000,
    "sys": { "country": "BR", "sunrise": 1726650000, "sunset": 1726693200 },
    "timezone": -10800,
    "id": 3448439,
    "name": "São Paulo"
}"#;

// --- Normalizer outcome classes ----------------------------------------------

#[tokio::test]
async fn success_returns_data_and_status() {
    let base = spawn_stub(vec![("/ok", 200, r#"{"answer": 42}"#)]).await;
    let client = reqwest::Client::new();

    let response: brdash::fetch::ApiResponse<Value> =
        fetch_json(&client, &format!("{base}/ok"), Duration::from_secs(2), None).await;

    assert_eq!(response.status, 200);
    assert!(response.error.is_none());
    assert_eq!(response.data.unwrap()["answer"], 42);
}

#[tokio::test]
async fn http_error_with_json_body_joins_field_values() {
    let base = spawn_stub(vec![(
        "/missing",
        404,
        r#"{"cod": "404", "message": "city not found"}"#,
    )])
    .await;
    let client = reqwest::Client::new();

    let response: brdash::fetch::ApiResponse<Value> =
        fetch_json(&client, &format!("{base}/missing"), Duration::from_secs(2), None).await;

    assert_eq!(response.status, 404);
    assert!(response.data.is_none());
    assert_eq!(response.error_text().as_deref(), Some("404, city not found"));
}

#[tokio::test]
async fn http_error_without_json_body_falls_back_to_status() {
    let base = spawn_stub(vec![("/broken", 502, "<html>bad gateway</html>")]).await;
    let client = reqwest::Client::new();

    let response: brdash::fetch::ApiResponse<Value> =
        fetch_json(&client, &format!("{base}/broken"), Duration::from_secs(2), None).await;

    assert_eq!(response.status, 502);
    assert_eq!(response.error_text().as_deref(), Some("HTTP 502"));
}

#[tokio::test]
async fn network_failure_maps_to_500() {
    let client = reqwest::Client::new();

    // Nothing listens on port 1
    let response: brdash::fetch::ApiResponse<Value> =
        fetch_json(&client, "http://127.0.0.1:1/", Duration::from_secs(2), None).await;

    assert_eq!(response.status, 500);
    assert_eq!(response.error_text().as_deref(), Some("Network error"));
}

#[tokio::test]
async fn success_body_with_wrong_schema_is_flagged() {
    #[derive(serde::Deserialize, serde::Serialize, Debug)]
    struct Expected {
        answer: u32,
    }

    let base = spawn_stub(vec![("/ok", 200, r#"{"different": true}"#)]).await;
    let client = reqwest::Client::new();

    let response: brdash::fetch::ApiResponse<Expected> =
        fetch_json(&client, &format!("{base}/ok"), Duration::from_secs(2), None).await;

    assert_eq!(response.status, 500);
    assert!(response
        .error_text()
        .unwrap()
        .starts_with("Invalid response body"));
}

// --- Timeout and cancellation ------------------------------------------------

#[tokio::test]
async fn timeout_fires_within_tolerance() {
    let base = spawn_hanging().await;
    let client = reqwest::Client::new();
    let timeout = Duration::from_millis(200);

    let started = Instant::now();
    let response: brdash::fetch::ApiResponse<Value> =
        fetch_json(&client, &base, timeout, None).await;
    let elapsed = started.elapsed();

    assert_eq!(response.status, 504);
    assert_eq!(response.error_text().as_deref(), Some("Request Timeout"));
    assert!(elapsed >= timeout, "resolved early: {elapsed:?}");
    assert!(
        elapsed < Duration::from_secs(2),
        "timeout overshot: {elapsed:?}"
    );
}

#[tokio::test]
async fn external_cancellation_wins_over_longer_timeout() {
    let base = spawn_hanging().await;
    let client = reqwest::Client::new();

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let response: brdash::fetch::ApiResponse<Value> =
        fetch_json(&client, &base, Duration::from_secs(30), Some(&token)).await;
    let elapsed = started.elapsed();

    assert_eq!(response.status, 504);
    assert!(
        elapsed < Duration::from_secs(2),
        "external cancel was not observed: {elapsed:?}"
    );
}

// --- Weather endpoint --------------------------------------------------------

#[tokio::test]
async fn weather_double_404_is_city_not_found() {
    let not_found = r#"{"cod": "404", "message": "city not found"}"#;
    let base = spawn_stub(vec![
        ("/weather", 404, not_found),
        ("/forecast", 404, not_found),
    ])
    .await;

    let client = WeatherClient::new("test-key")
        .with_base_url(base)
        .with_timeout(Duration::from_secs(2));

    let error = client.lookup("nowhere").await.unwrap_err();
    assert_eq!(error.status, 404);
    assert_eq!(error.message, "City not found");
}

#[tokio::test]
async fn weather_partial_result_survives_single_failure() {
    let base = spawn_stub(vec![
        ("/weather", 200, CURRENT_WEATHER_BODY),
        ("/forecast", 404, r#"{"cod": "404", "message": "city not found"}"#),
    ])
    .await;

    let client = WeatherClient::new("test-key")
        .with_base_url(base)
        .with_timeout(Duration::from_secs(2));

    let report = client.lookup("São Paulo").await.expect("Expected partial result");
    let weather = report.weather.expect("Expected current weather half");
    assert_eq!(weather.city, "São Paulo");
    assert_eq!(weather.temp, 23);
    assert!(report.forecast.is_none());
}

// --- Names endpoint ----------------------------------------------------------

const NAME_BASIC_BODY: &str =
    r#"[{"rank": 1, "nome": "MARIA", "freq": 11734129, "percentual": 6.15, "ufMax": "SP", "ufMaxProp": "28.80", "regiao": 0, "sexo": null, "nomes": "MARIA"}]"#;
const NAME_MAP_BODY: &str =
    r#"[{"nome": "MARIA", "uf": 35, "freq": 2143232, "populacao": 41262199, "sexo": null, "prop": 51.94}]"#;
const NAME_RANGE_BODY: &str =
    r#"[{"nome": "MARIA", "freq": 149110, "regiao": 0, "sexo": null, "faixa": "1930"}]"#;
const NAME_RANKING_BODY: &str =
    r#"[{"nome": "MARIA", "regiao": 0, "freq": 11734129, "rank": 1, "sexo": null}]"#;

#[tokio::test]
async fn names_empty_basic_stats_rejects_whole_lookup() {
    let base = spawn_stub(vec![
        ("/basica", 200, "[]"),
        ("/mapa", 200, NAME_MAP_BODY),
        ("/faixa", 200, NAME_RANGE_BODY),
        ("/ranking", 200, NAME_RANKING_BODY),
    ])
    .await;

    let client = NamesClient::new()
        .with_base_url(base)
        .with_timeout(Duration::from_secs(2));

    let error = client.lookup("zzzz", None, None).await.unwrap_err();
    assert_eq!(error.status, 400);
    assert!(
        error.message.contains("menos de 20 pessoas"),
        "unexpected message: {}",
        error.message
    );
}

#[tokio::test]
async fn names_failed_ranking_becomes_null_marker() {
    // No /ranking route: that call 404s while the rest succeed
    let base = spawn_stub(vec![
        ("/basica", 200, NAME_BASIC_BODY),
        ("/mapa", 200, NAME_MAP_BODY),
        ("/faixa", 200, NAME_RANGE_BODY),
    ])
    .await;

    let client = NamesClient::new()
        .with_base_url(base)
        .with_timeout(Duration::from_secs(2));

    let union = client
        .lookup("maria", Some("F"), Some("33"))
        .await
        .expect("Expected partial result");
    assert!(union.data_basic.is_some());
    assert!(union.data_map.is_some());
    assert!(union.data_range.is_some());
    assert!(union.data_ranking.is_none());
}

// --- CEP endpoint ------------------------------------------------------------

#[tokio::test]
async fn cep_not_found_sentinel_maps_to_400() {
    let base = spawn_stub(vec![("/ws/", 200, r#"{"erro": true}"#)]).await;

    let client = CepClient::new()
        .with_base_url(base)
        .with_timeout(Duration::from_secs(2));

    let error = client.lookup("99999999", None).await.unwrap_err();
    assert_eq!(error.status, 400);
    assert_eq!(error.message, "CEP não encontrado");
}

#[tokio::test]
async fn cep_success_forwards_payload_unchanged() {
    let body = r#"{"cep": "01001-000", "logradouro": "Praça da Sé", "bairro": "Sé", "localidade": "São Paulo", "uf": "SP", "ibge": "3550308", "ddd": "11"}"#;
    let base = spawn_stub(vec![("/ws/", 200, body)]).await;

    let client = CepClient::new()
        .with_base_url(base)
        .with_timeout(Duration::from_secs(2));

    let data = client
        .lookup("01001-000", None)
        .await
        .expect("Expected address");
    assert_eq!(data.cep.as_deref(), Some("01001-000"));
    assert_eq!(data.localidade.as_deref(), Some("São Paulo"));
    assert_eq!(data.uf.as_deref(), Some("SP"));
}

#[tokio::test]
async fn cep_cancelled_request_is_connection_timeout() {
    let base = spawn_hanging().await;
    let client = CepClient::new()
        .with_base_url(base)
        .with_timeout(Duration::from_secs(30));

    let token = CancellationToken::new();
    token.cancel();

    let error = client.lookup("01001000", Some(&token)).await.unwrap_err();
    assert_eq!(error.status, 504);
    assert_eq!(error.message, "Connection Timeout");
}

// --- Country endpoint --------------------------------------------------------

#[tokio::test]
async fn country_404_is_not_found() {
    let base = spawn_stub(vec![(
        "/v3.1/translation/",
        404,
        r#"{"status": 404, "message": "Not Found"}"#,
    )])
    .await;

    let client = CountryClient::new()
        .with_base_url(base)
        .with_timeout(Duration::from_secs(2));

    let error = client.lookup("atlantis").await.unwrap_err();
    assert_eq!(error.status, 404);
    assert_eq!(error.message, "Country not found");
}

#[tokio::test]
async fn country_multi_entry_picks_exact_translation_match() {
    let body = r#"[
        {"name": {"common": "India", "official": "Republic of India"},
         "translations": {"por": {"official": "República da Índia", "common": "Índia"}}},
        {"name": {"common": "Indonesia", "official": "Republic of Indonesia"},
         "translations": {"por": {"official": "República da Indonésia", "common": "Indonésia"}}}
    ]"#;
    let base = spawn_stub(vec![("/v3.1/translation/", 200, body)]).await;

    let client = CountryClient::new()
        .with_base_url(base)
        .with_timeout(Duration::from_secs(2));

    let country = client.lookup("indonésia").await.expect("Expected a country");
    assert_eq!(country.name.common.as_deref(), Some("Indonesia"));
}
