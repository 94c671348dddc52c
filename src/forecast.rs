//! Forecast bucketizing
//!
//! Partitions the flat 3-hour forecast sample sequence into a `today` hourly
//! series and per-day `next_days` aggregates, computed in the forecast
//! city's own local calendar. The current timestamp is an explicit parameter
//! so the whole transformation stays pure and deterministic under test;
//! production callers pass `Utc::now().timestamp()`.

use std::collections::BTreeMap;

use chrono::DateTime;
use serde::Serialize;

use crate::data::round_half_up;
use crate::data::weather::{icon_code, Coord, ForecastRaw};

/// One hourly entry of today's forecast
#[derive(Debug, Clone, Serialize)]
pub struct TodayEntry {
    /// Time portion of the sample's date/time text, `HH:MM:SS`
    pub hour: String,
    /// 2-character icon code
    pub icon: String,
    /// Rounded temperature
    pub temp: i64,
    /// Probability of precipitation as a percentage
    pub pop: f64,
}

/// Aggregate for one future calendar day
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAggregate {
    /// Running maximum of the samples' rounded `temp_max`
    pub temp_max: i64,
    /// Running minimum of the samples' rounded `temp_min`
    pub temp_min: i64,
    /// Icon of the highest-severity sample seen for the day
    pub icon: String,
    /// Description paired with that icon
    pub description: String,
}

/// The two forecast buckets plus the running today maximum
#[derive(Debug, Clone, Serialize)]
pub struct Forecasts {
    /// Remaining samples of the current local day, in input order
    pub today: Vec<TodayEntry>,
    /// Future days keyed by `YYYY-MM-DD`; key order is chronological
    pub next_days: BTreeMap<String, DayAggregate>,
    /// Highest pop percentage across `today`; stays 0 when `today` is empty,
    /// which callers must read as "no data", not "0% chance of rain"
    pub today_higher_pop: f64,
}

/// City metadata passed through from the raw payload
#[derive(Debug, Clone, Serialize)]
pub struct ForecastCity {
    pub id: i64,
    pub name: String,
    pub coord: Coord,
}

/// Display-ready forecast: bucketized samples plus city metadata
#[derive(Debug, Clone, Serialize)]
pub struct ForecastMapped {
    pub city: ForecastCity,
    pub country: Option<String>,
    pub population: Option<i64>,
    /// Shift from UTC at the forecast location, seconds
    pub timezone: i64,
    pub sunrise: i64,
    pub sunset: i64,
    pub forecasts: Forecasts,
}

/// Severity ranking used to pick the single icon/description representing a
/// day with several samples. Lower number wins; ties keep the sample seen
/// first.
///
/// Atmosphere (7xx) > Snow (6xx) > Thunderstorm (2xx) > Rain (5xx) >
/// Drizzle (3xx) > Clouds (801-809) > Clear (800) and anything else.
pub fn icon_priority(id: i64) -> u8 {
    match id {
        700..=799 => 1,
        600..=699 => 2,
        200..=299 => 3,
        500..=599 => 4,
        300..=399 => 5,
        801..=809 => 6,
        _ => 7,
    }
}

/// Bucketizes a raw forecast payload relative to `now_utc` (epoch seconds).
///
/// Each sample lands in exactly one place: discarded when its timestamp is
/// strictly before "now" in the city's local terms, appended to `today` when
/// its date text matches the current local date, or folded into the
/// `next_days` aggregate for its own date otherwise.
pub fn map_forecast(raw: &ForecastRaw, now_utc: i64) -> ForecastMapped {
    let offset = raw.city.timezone;
    let local_now = now_utc + offset;
    let today_key = DateTime::from_timestamp(local_now, 0)
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    let mut today = Vec::new();
    let mut today_higher_pop: f64 = 0.0;
    let mut next_days: BTreeMap<String, (DayAggregate, u8)> = BTreeMap::new();

    for sample in &raw.list {
        if sample.dt + offset < local_now {
            continue;
        }

        let Some((date, time)) = sample.dt_txt.split_once(' ') else {
            continue;
        };

        let (condition_id, icon, description) = sample
            .weather
            .first()
            .map(|c| (c.id, icon_code(&c.icon), c.description.clone()))
            .unwrap_or((0, String::new(), String::new()));

        if date == today_key {
            let pop = sample.pop * 100.0;
            if pop > today_higher_pop {
                today_higher_pop = pop;
            }
            today.push(TodayEntry {
                hour: time.to_string(),
                icon,
                temp: round_half_up(sample.main.temp),
                pop,
            });
            continue;
        }

        let priority = icon_priority(condition_id);
        let temp_max = round_half_up(sample.main.temp_max);
        let temp_min = round_half_up(sample.main.temp_min);

        match next_days.get_mut(date) {
            None => {
                next_days.insert(
                    date.to_string(),
                    (
                        DayAggregate {
                            temp_max,
                            temp_min,
                            icon,
                            description,
                        },
                        priority,
                    ),
                );
            }
            Some((day, winning)) => {
                day.temp_max = day.temp_max.max(temp_max);
                day.temp_min = day.temp_min.min(temp_min);
                if priority < *winning {
                    day.icon = icon;
                    day.description = description;
                    *winning = priority;
                }
            }
        }
    }

    ForecastMapped {
        city: ForecastCity {
            id: raw.city.id,
            name: raw.city.name.clone(),
            coord: raw.city.coord.clone(),
        },
        country: raw.city.country.clone(),
        population: raw.city.population,
        timezone: offset,
        sunrise: raw.city.sunrise,
        sunset: raw.city.sunset,
        forecasts: Forecasts {
            today,
            next_days: next_days
                .into_iter()
                .map(|(date, (day, _))| (date, day))
                .collect(),
            today_higher_pop,
        },
    }
}
