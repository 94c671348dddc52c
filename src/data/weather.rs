//! OpenWeatherMap API client and current-weather mapping
//!
//! This module holds the typed schemas for the two OpenWeather payloads the
//! app consumes (current weather and 5-day/3-hour forecast), the pure
//! display mapper for current conditions (unit conversions and the 16-point
//! compass), and the client that fetches both payloads concurrently.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::data::{round_half_up, ServiceError};
use crate::fetch::{fetch_json, DEFAULT_TIMEOUT};
use crate::forecast::{map_forecast, ForecastMapped};

/// Base URL for the OpenWeatherMap API
const OPEN_WEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// The 16-point compass rose, Portuguese labels
const COMPASS_POINTS: [&str; 16] = [
    "N (Norte)",
    "NNE (Norte-Nordeste)",
    "NE (Nordeste)",
    "ENE (Este-Nordeste)",
    "L (Leste)",
    "ESE (Este-Sudeste)",
    "SE (Sudeste)",
    "SSE (Sul-Sudeste)",
    "S (Sul)",
    "SSW (Sul-Sudoeste)",
    "SW (Sudoeste)",
    "WSW (Oeste-Sudoeste)",
    "W (Oeste)",
    "WNW (Oeste-Noroeste)",
    "NW (Noroeste)",
    "NNW (Norte-Noroeste)",
];

/// Geographic coordinates, shared by both payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

/// One weather condition entry (`weather[0]` carries the display condition)
#[derive(Debug, Clone, Deserialize)]
pub struct ConditionRaw {
    pub id: i64,
    pub main: String,
    pub description: String,
    pub icon: String,
}

/// `main` block of the current-weather payload
#[derive(Debug, Clone, Deserialize)]
pub struct MainRaw {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: i64,
    pub humidity: i64,
    #[serde(default)]
    pub sea_level: Option<i64>,
    #[serde(default)]
    pub grnd_level: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindRaw {
    /// Wind speed in m/s (metric units)
    pub speed: f64,
    /// Meteorological degrees, 0/360 = North
    pub deg: f64,
    #[serde(default)]
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudsRaw {
    pub all: i64,
}

/// Precipitation volume over the last hour, mm
#[derive(Debug, Clone, Deserialize)]
pub struct HourVolume {
    #[serde(rename = "1h")]
    pub last_hour: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SysRaw {
    #[serde(default)]
    pub country: Option<String>,
    pub sunrise: i64,
    pub sunset: i64,
}

/// Raw current-weather payload (`/data/2.5/weather`)
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherRaw {
    pub coord: Coord,
    pub weather: Vec<ConditionRaw>,
    pub main: MainRaw,
    #[serde(default)]
    pub visibility: Option<i64>,
    pub wind: WindRaw,
    #[serde(default)]
    pub rain: Option<HourVolume>,
    #[serde(default)]
    pub snow: Option<HourVolume>,
    pub clouds: CloudsRaw,
    pub dt: i64,
    pub sys: SysRaw,
    /// Shift from UTC at the queried location, seconds
    pub timezone: i64,
    pub id: i64,
    pub name: String,
}

/// `main` block of a forecast sample
#[derive(Debug, Clone, Deserialize)]
pub struct SampleMainRaw {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: i64,
    pub humidity: i64,
}

/// Precipitation volume over a 3-hour window, mm
#[derive(Debug, Clone, Deserialize)]
pub struct ThreeHourVolume {
    #[serde(rename = "3h")]
    pub window: f64,
}

/// One 3-hour forecast sample
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastSampleRaw {
    /// Absolute timestamp, UTC epoch seconds
    pub dt: i64,
    pub main: SampleMainRaw,
    pub weather: Vec<ConditionRaw>,
    pub clouds: CloudsRaw,
    pub wind: WindRaw,
    #[serde(default)]
    pub visibility: Option<i64>,
    /// Probability of precipitation, 0.0–1.0
    pub pop: f64,
    #[serde(default)]
    pub rain: Option<ThreeHourVolume>,
    #[serde(default)]
    pub snow: Option<ThreeHourVolume>,
    /// Date/time text, `YYYY-MM-DD HH:MM:SS`
    pub dt_txt: String,
}

/// City metadata attached to a forecast payload
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastCityRaw {
    pub id: i64,
    pub name: String,
    pub coord: Coord,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub population: Option<i64>,
    /// Shift from UTC at the forecast location, seconds
    pub timezone: i64,
    pub sunrise: i64,
    pub sunset: i64,
}

/// Raw 5-day/3-hour forecast payload (`/data/2.5/forecast`)
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastRaw {
    pub list: Vec<ForecastSampleRaw>,
    pub city: ForecastCityRaw,
}

/// Display-ready current weather, flattened and converted
#[derive(Debug, Clone, Serialize)]
pub struct WeatherMapped {
    pub city: String,
    pub country: Option<String>,
    pub sunrise: i64,
    pub sunset: i64,
    pub date: i64,
    /// Wind speed in km/h, two decimal places
    pub wind: f64,
    /// Compass label with the original degree value, e.g. `"S (Sul) (185°)"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_deg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ground_level_press: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sea_level_press: Option<i64>,
    pub pressure: i64,
    pub humidity: i64,
    /// Rounded to the nearest whole degree
    pub temp: i64,
    pub feels_like: i64,
    /// Kilometers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
    pub clouds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rain: Option<f64>,
    /// Raw 1h snow volume scaled x100, presented upstream as a percentage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snow: Option<f64>,
    pub weather_main: String,
    pub weather_description: String,
    /// 2-character icon code, day/night suffix stripped
    pub weather_icon: String,
    pub timezone: i64,
}

/// Combined result of a weather lookup; either half may be missing when its
/// upstream call failed (partial results are not suppressed)
#[derive(Debug, Clone, Serialize)]
pub struct WeatherReport {
    pub weather: Option<WeatherMapped>,
    pub forecast: Option<ForecastMapped>,
}

/// Converts meteorological degrees into one of 16 compass labels.
///
/// Degrees are wrapped into `[0, 360)`, shifted by half a sector (11.25°)
/// and divided by the 22.5° sector width to pick the label. Returns `None`
/// when the input is not a number. The suffix keeps the caller's original
/// degree value.
pub fn deg_to_compass(deg: f64) -> Option<String> {
    if deg.is_nan() {
        return None;
    }

    let normalized = ((deg % 360.0) + 360.0) % 360.0;
    let index = (((normalized + 11.25) / 22.5).floor() as usize) % 16;

    Some(format!("{} ({}°)", COMPASS_POINTS[index], deg))
}

/// Truncates an upstream icon identifier to its 2-character code
pub(crate) fn icon_code(icon: &str) -> String {
    icon.chars().take(2).collect()
}

/// Maps a raw current-weather payload into its display shape.
///
/// Pure and total over well-formed payloads: absent optional fields stay
/// absent. Snow keeps the upstream x100 pseudo-percentage convention.
pub fn map_weather(raw: &WeatherRaw) -> WeatherMapped {
    let condition = raw.weather.first();

    WeatherMapped {
        city: raw.name.clone(),
        country: raw.sys.country.clone(),
        sunrise: raw.sys.sunrise,
        sunset: raw.sys.sunset,
        date: raw.dt,
        wind: (raw.wind.speed * 3.6 * 100.0).round() / 100.0,
        wind_deg: deg_to_compass(raw.wind.deg),
        ground_level_press: raw.main.grnd_level,
        sea_level_press: raw.main.sea_level,
        pressure: raw.main.pressure,
        humidity: raw.main.humidity,
        temp: round_half_up(raw.main.temp),
        feels_like: round_half_up(raw.main.feels_like),
        visibility: raw.visibility.map(|meters| meters as f64 / 1000.0),
        clouds: raw.clouds.all,
        rain: raw.rain.as_ref().map(|r| r.last_hour),
        snow: raw.snow.as_ref().map(|s| s.last_hour * 100.0),
        weather_main: condition.map(|c| c.main.clone()).unwrap_or_default(),
        weather_description: condition.map(|c| c.description.clone()).unwrap_or_default(),
        weather_icon: condition.map(|c| icon_code(&c.icon)).unwrap_or_default(),
        timezone: raw.timezone,
    }
}

/// Client for the OpenWeatherMap current-weather and forecast endpoints
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl WeatherClient {
    /// Creates a new client with the given API key (an opaque credential)
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: OPEN_WEATHER_BASE_URL.to_string(),
            api_key: api_key.into(),
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

    /// Fetches current weather and forecast for a city, concurrently.
    ///
    /// Both calls run with their own independent timeout; one failing does
    /// not cancel the other. Only when both upstreams report 404 does the
    /// lookup fail as "City not found" — otherwise whatever half succeeded
    /// is returned.
    pub async fn lookup(&self, city: &str) -> Result<WeatherReport, ServiceError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(ServiceError::new(400, "The city params was not found"));
        }

        let weather_url = format!(
            "{}/weather?q={}&appid={}&units=metric&lang=pt_br",
            self.base_url, city, self.api_key
        );
        let forecast_url = format!(
            "{}/forecast?q={}&appid={}&units=metric&lang=pt_br",
            self.base_url, city, self.api_key
        );

        let (weather, forecast) = futures::join!(
            fetch_json::<WeatherRaw>(&self.client, &weather_url, self.timeout, None),
            fetch_json::<ForecastRaw>(&self.client, &forecast_url, self.timeout, None),
        );

        if weather.is_not_found() && forecast.is_not_found() {
            return Err(ServiceError::new(404, "City not found"));
        }

        let now = Utc::now().timestamp();

        Ok(WeatherReport {
            weather: weather.data.as_ref().map(map_weather),
            forecast: forecast.data.as_ref().map(|raw| map_forecast(raw, now)),
        })
    }
}
