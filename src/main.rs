//! brdash - Brazilian public-data dashboards in the terminal
//!
//! Thin presentation layer: parses the subcommand, calls the matching
//! domain client and prints the result as a text dashboard (or raw JSON
//! with `--json`). All error recovery lives below, in the fetch pipeline
//! and the clients.

use chrono::DateTime;
use clap::Parser;
use serde::Serialize;

use brdash::cli::{self, Cli, Command};
use brdash::data::cep::{format_cep, CepClient, CepResponse};
use brdash::data::country::{map_country, CountryClient, CountryMapped};
use brdash::data::names::{NameUnion, NamesClient};
use brdash::data::weather::{WeatherClient, WeatherReport};
use brdash::data::ServiceError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let timeout = cli::timeout_from_millis(cli.timeout).map_err(|e| e.to_string())?;

    match cli.command {
        Command::Cep { code } => {
            let client = CepClient::new().with_timeout(timeout);
            let data = unwrap_or_exit(client.lookup(&code, None).await);
            if cli.json {
                print_json(&data)?;
            } else {
                render_cep(&data);
            }
        }
        Command::Pais { name } => {
            let client = CountryClient::new().with_timeout(timeout);
            let raw = unwrap_or_exit(client.lookup(&name).await);
            if cli.json {
                print_json(&raw)?;
            } else {
                render_country(&map_country(&raw));
            }
        }
        Command::Clima { city } => {
            let api_key = std::env::var("OPEN_WEATHER_KEY")
                .map_err(|_| "OPEN_WEATHER_KEY environment variable is not set")?;
            let client = WeatherClient::new(api_key).with_timeout(timeout);
            let report = unwrap_or_exit(client.lookup(&city).await);
            if cli.json {
                print_json(&report)?;
            } else {
                render_weather(&report);
            }
        }
        Command::Nomes { name, sexo, regiao } => {
            let client = NamesClient::new().with_timeout(timeout);
            let union = unwrap_or_exit(
                client
                    .lookup(&name, sexo.as_deref(), regiao.as_deref())
                    .await,
            );
            if cli.json {
                print_json(&union)?;
            } else {
                render_names(&name, &union);
            }
        }
    }

    Ok(())
}

/// Prints the `{error, status}` pair and exits non-zero
fn unwrap_or_exit<T>(result: Result<T, ServiceError>) -> T {
    match result {
        Ok(value) => value,
        Err(error) => {
            eprintln!("Erro {}: {}", error.status, error.message);
            std::process::exit(1);
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Formats an epoch timestamp in the location's own clock
fn local_clock(epoch: i64, timezone: i64) -> String {
    DateTime::from_timestamp(epoch + timezone, 0)
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

fn render_cep(data: &CepResponse) {
    let field = |value: &Option<String>| value.clone().unwrap_or_default();

    println!("CEP {}", format_cep(&field(&data.cep)));
    println!("  Logradouro: {}", field(&data.logradouro));
    if let Some(complemento) = data.complemento.as_deref().filter(|c| !c.is_empty()) {
        println!("  Complemento: {complemento}");
    }
    println!("  Bairro: {}", field(&data.bairro));
    println!(
        "  Cidade: {} - {}",
        field(&data.localidade),
        field(&data.uf)
    );
    println!("  IBGE: {}  DDD: {}", field(&data.ibge), field(&data.ddd));
}

fn render_country(country: &CountryMapped) {
    let list = |values: &Option<Vec<String>>| values.clone().unwrap_or_default().join(", ");

    println!(
        "{} ({})",
        country.names.common_pt_br.as_deref().unwrap_or("?"),
        country.names.common.as_deref().unwrap_or("?")
    );
    if let Some(official) = &country.names.official_pt_br {
        println!("  Nome oficial: {official}");
    }
    println!("  Capital: {}", list(&country.capital));
    println!(
        "  Continente: {}  Sub-região: {}",
        list(&country.continent),
        country.subregion.as_deref().unwrap_or("-")
    );
    if let Some(population) = &country.population {
        println!("  População: {population}");
    }
    if let Some(area) = country.area {
        println!("  Área: {area} km²");
    }
    println!("  Idiomas: {}", list(&country.languages));
    println!("  Fronteiras: {}", list(&country.borders));
    println!("  Fusos: {}", list(&country.timezone));
    println!(
        "  Mão de direção: {}  Membro da ONU: {}  Independente: {}",
        country.car_side, country.un_member, country.independent
    );
    if let Some(maps) = &country.maps {
        println!("  Mapa: {maps}");
    }
}

fn render_weather(report: &WeatherReport) {
    match &report.weather {
        Some(weather) => {
            println!(
                "Clima em {}{}",
                weather.city,
                weather
                    .country
                    .as_deref()
                    .map(|c| format!(" ({c})"))
                    .unwrap_or_default()
            );
            println!(
                "  {} - {}",
                weather.weather_main, weather.weather_description
            );
            println!(
                "  Temperatura: {}°C (sensação {}°C)",
                weather.temp, weather.feels_like
            );
            match &weather.wind_deg {
                Some(direction) => println!("  Vento: {} km/h, {}", weather.wind, direction),
                None => println!("  Vento: {} km/h", weather.wind),
            }
            println!(
                "  Umidade: {}%  Nuvens: {}%  Pressão: {} hPa",
                weather.humidity, weather.clouds, weather.pressure
            );
            if let Some(visibility) = weather.visibility {
                println!("  Visibilidade: {visibility} km");
            }
            if let Some(rain) = weather.rain {
                println!("  Chuva (1h): {rain} mm");
            }
            if let Some(snow) = weather.snow {
                println!("  Neve: {snow}%");
            }
            println!(
                "  Nascer do sol: {}  Pôr do sol: {}",
                local_clock(weather.sunrise, weather.timezone),
                local_clock(weather.sunset, weather.timezone)
            );
        }
        None => println!("Clima atual indisponível"),
    }

    match &report.forecast {
        Some(forecast) => {
            let buckets = &forecast.forecasts;
            println!();
            if buckets.today.is_empty() {
                println!("Sem previsões restantes para hoje");
            } else {
                println!(
                    "Hoje (pop máxima {}%):",
                    buckets.today_higher_pop
                );
                for entry in &buckets.today {
                    println!(
                        "  {}  {}°C  pop {}%  [{}]",
                        entry.hour, entry.temp, entry.pop, entry.icon
                    );
                }
            }
            if !buckets.next_days.is_empty() {
                println!("Próximos dias:");
                for (date, day) in &buckets.next_days {
                    println!(
                        "  {}  {}°C / {}°C  {} [{}]",
                        date, day.temp_min, day.temp_max, day.description, day.icon
                    );
                }
            }
        }
        None => println!("Previsão indisponível"),
    }
}

fn render_names(name: &str, union: &NameUnion) {
    println!("Censo de nomes: {}", name.to_uppercase());

    match union.data_basic.as_ref().and_then(|basic| basic.first()) {
        Some(basic) => {
            if let Some(freq) = basic.freq {
                println!("  Frequência: {freq}");
            }
            if let Some(rank) = basic.rank {
                println!("  Rank nacional: {rank}");
            }
            if let Some(uf) = &basic.uf_max {
                println!("  UF com maior proporção: {uf}");
            }
        }
        None => println!("  Estatísticas básicas indisponíveis"),
    }

    match &union.data_range {
        Some(range) => {
            println!("  Por década:");
            for entry in range {
                println!(
                    "    {}  {}",
                    entry.faixa.as_deref().unwrap_or("-"),
                    entry.freq.unwrap_or(0)
                );
            }
        }
        None => println!("  Dados por década indisponíveis"),
    }

    match &union.data_map {
        Some(map) => println!("  Estados com dados: {}", map.len()),
        None => println!("  Mapa por estado indisponível"),
    }

    match &union.data_ranking {
        Some(ranking) => {
            println!("  Ranking da região:");
            for entry in ranking.iter().take(10) {
                println!(
                    "    {:>2}. {}  {}",
                    entry.rank.unwrap_or(0),
                    entry.nome.as_deref().unwrap_or("-"),
                    entry.freq.unwrap_or(0)
                );
            }
        }
        None => println!("  Ranking indisponível"),
    }
}
