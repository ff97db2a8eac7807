//! Placeholder weather served when AMap is unreachable and the fallback is enabled.
//!
//! The table maps a city key (and its pinyin aliases) to the city/province pair
//! reported back. Input that matches no key resolves to [`DEFAULT_CITY_KEY`].

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime};

use crate::amap_client::{DailyCast, WeatherReport};

pub const DEFAULT_CITY_KEY: &str = "北京";

const WEEKDAYS: [&str; 7] = ["日", "一", "二", "三", "四", "五", "六"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackEntry {
    pub key: &'static str,
    pub aliases: &'static [&'static str],
    pub city: &'static str,
    pub province: &'static str,
}

#[derive(Debug, Clone)]
pub struct FallbackTable {
    entries: Vec<FallbackEntry>,
}

impl Default for FallbackTable {
    fn default() -> Self {
        Self {
            entries: vec![
                FallbackEntry {
                    key: "北京",
                    aliases: &["beijing"],
                    city: "北京",
                    province: "北京",
                },
                FallbackEntry {
                    key: "上海",
                    aliases: &["shanghai"],
                    city: "上海",
                    province: "上海",
                },
                FallbackEntry {
                    key: "广州",
                    aliases: &["guangzhou"],
                    city: "广州",
                    province: "广东",
                },
            ],
        }
    }
}

impl FallbackTable {
    pub fn new(entries: Vec<FallbackEntry>) -> Self {
        Self { entries }
    }

    /// First entry whose key or alias occurs in `city`, else the default entry.
    pub fn lookup(&self, city: &str) -> &FallbackEntry {
        let lowered = city.to_lowercase();
        self.entries
            .iter()
            .find(|entry| {
                city.contains(entry.key) || entry.aliases.iter().any(|alias| lowered.contains(alias))
            })
            .or_else(|| self.entries.iter().find(|entry| entry.key == DEFAULT_CITY_KEY))
            .or_else(|| self.entries.first())
            .unwrap_or(&BUILTIN_DEFAULT)
    }

    pub fn report_now(&self, city: &str) -> WeatherReport {
        self.report(city, Local::now().naive_local())
    }

    pub fn report(&self, city: &str, now: NaiveDateTime) -> WeatherReport {
        let entry = self.lookup(city);
        let today = now.date();
        let tomorrow = today + Duration::days(1);

        WeatherReport {
            city: entry.city.to_string(),
            province: entry.province.to_string(),
            reporttime: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            weather: vec![
                placeholder_cast(today, "晴", "晴", "25", "15", "南风", "南风", "≤3级", "≤3级"),
                placeholder_cast(tomorrow, "多云", "阴", "23", "13", "北风", "北风", "4-5级", "≤3级"),
            ],
        }
    }
}

static BUILTIN_DEFAULT: FallbackEntry = FallbackEntry {
    key: DEFAULT_CITY_KEY,
    aliases: &[],
    city: "北京",
    province: "北京",
};

#[allow(clippy::too_many_arguments)]
fn placeholder_cast(
    date: NaiveDate,
    dayweather: &str,
    nightweather: &str,
    daytemp: &str,
    nighttemp: &str,
    daywind: &str,
    nightwind: &str,
    daypower: &str,
    nightpower: &str,
) -> DailyCast {
    DailyCast {
        date: date.format("%Y-%m-%d").to_string(),
        week: WEEKDAYS[date.weekday().num_days_from_sunday() as usize].to_string(),
        dayweather: dayweather.to_string(),
        nightweather: nightweather.to_string(),
        daytemp: daytemp.to_string(),
        nighttemp: nighttemp.to_string(),
        daywind: daywind.to_string(),
        nightwind: nightwind.to_string(),
        daypower: daypower.to_string(),
        nightpower: nightpower.to_string(),
    }
}
