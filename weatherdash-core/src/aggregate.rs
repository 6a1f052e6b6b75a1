//! Daily buckets and chart rows derived from the 3-hour forecast feed.
//!
//! Everything here is a pure function of the samples and a time zone; the
//! zone decides where one calendar day ends and the next begins.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, TimeZone};
use serde::Serialize;

use crate::model::ForecastSample;

/// Upper bound on the number of days kept from one forecast.
pub const MAX_DAYS: usize = 7;

/// Forecast samples sharing one local calendar date, with derived statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    /// Full weekday name, e.g. `Monday`.
    pub day_name: String,
    /// e.g. `Jan 05, 2026`.
    pub date_formatted: String,
    pub samples: Vec<ForecastSample>,
    pub min_temp: f64,
    pub max_temp: f64,
    pub avg_temp: f64,
    pub avg_humidity: i64,
    pub avg_wind: f64,
    pub avg_pressure: i64,
    pub avg_pop: i64,
    pub dominant_weather: Option<String>,
    pub icon: Option<String>,
}

impl DailyBucket {
    /// Builds a bucket from its members. Returns `None` for an empty member list.
    pub fn from_samples(date: NaiveDate, samples: Vec<ForecastSample>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let temps: Vec<f64> = samples.iter().map(|s| s.main.temp).collect();
        let min_temp = temps.iter().copied().fold(f64::INFINITY, f64::min);
        let max_temp = temps.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let avg_temp = round_to(mean(temps.iter().copied()), 1);
        let avg_humidity = mean(samples.iter().map(|s| s.main.humidity)).round() as i64;
        let avg_wind = round_to(mean(samples.iter().map(|s| s.wind.speed)), 1);
        let avg_pressure = mean(samples.iter().map(|s| s.main.pressure)).round() as i64;
        let avg_pop = mean(samples.iter().map(|s| s.pop * 100.0)).round() as i64;

        let dominant_weather = dominant_condition(&samples);
        let icon = samples[samples.len() / 2].icon().map(str::to_string);

        Some(Self {
            date,
            day_name: date.format("%A").to_string(),
            date_formatted: date.format("%b %d, %Y").to_string(),
            samples,
            min_temp,
            max_temp,
            avg_temp,
            avg_humidity,
            avg_wind,
            avg_pressure,
            avg_pop,
            dominant_weather,
            icon,
        })
    }

    /// Grouping key, `YYYY-MM-DD`.
    pub fn key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Groups time-ordered samples by local calendar date in `zone`.
///
/// Buckets appear in the order their dates are first seen and at most
/// [`MAX_DAYS`] are returned. Samples whose timestamp is out of range are
/// skipped.
pub fn bucket_by_day<Tz: TimeZone>(samples: &[ForecastSample], zone: &Tz) -> Vec<DailyBucket> {
    let mut order: Vec<NaiveDate> = Vec::new();
    let mut groups: HashMap<NaiveDate, Vec<ForecastSample>> = HashMap::new();

    for sample in samples {
        let Some(local) = local_time(sample, zone) else {
            tracing::debug!(dt = sample.dt, "skipping forecast sample with invalid timestamp");
            continue;
        };

        let date = local.date_naive();
        groups
            .entry(date)
            .or_insert_with(|| {
                order.push(date);
                Vec::new()
            })
            .push(sample.clone());
    }

    order
        .into_iter()
        .take(MAX_DAYS)
        .filter_map(|date| {
            let members = groups.remove(&date)?;
            DailyBucket::from_samples(date, members)
        })
        .collect()
}

/// One chart row per sample of a day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyRow {
    /// 24h, sortable: `HH:MM`.
    pub time: String,
    /// 12h, for display: `hh:MM AM`.
    pub time_formatted: String,
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub wind: f64,
    pub precipitation: f64,
    pub pressure: f64,
    pub clouds: f64,
    pub weather: Option<String>,
    pub icon: Option<String>,
}

/// Projects the members of `bucket` into chart rows, in member order.
pub fn hourly_view<'a, Tz: TimeZone>(
    bucket: &'a DailyBucket,
    zone: &'a Tz,
) -> impl Iterator<Item = HourlyRow> + 'a {
    bucket.samples.iter().map(move |sample| {
        let (time, time_formatted) = match local_time(sample, zone) {
            Some(local) => {
                let naive = local.naive_local();
                (
                    naive.format("%H:%M").to_string(),
                    naive.format("%I:%M %p").to_string(),
                )
            }
            None => (String::new(), String::new()),
        };

        HourlyRow {
            time,
            time_formatted,
            temp: sample.main.temp,
            feels_like: sample.main.feels_like,
            humidity: sample.main.humidity,
            wind: sample.wind.speed,
            precipitation: sample.pop * 100.0,
            pressure: sample.main.pressure,
            clouds: sample.clouds.all,
            weather: sample.condition().map(str::to_string),
            icon: sample.icon().map(str::to_string),
        }
    })
}

/// One row of the weekly overview chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyRow {
    /// Three-letter weekday, e.g. `Mon`.
    pub day: String,
    /// `MM/DD`.
    pub date: String,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub humidity: i64,
    pub wind: f64,
    pub precipitation: i64,
}

pub fn weekly_overview(buckets: &[DailyBucket]) -> Vec<WeeklyRow> {
    buckets
        .iter()
        .map(|b| WeeklyRow {
            day: b.day_name.chars().take(3).collect(),
            date: b.date.format("%m/%d").to_string(),
            min: b.min_temp,
            max: b.max_temp,
            avg: b.avg_temp,
            humidity: b.avg_humidity,
            wind: b.avg_wind,
            precipitation: b.avg_pop,
        })
        .collect()
}

fn local_time<Tz: TimeZone>(sample: &ForecastSample, zone: &Tz) -> Option<DateTime<Tz>> {
    sample.time().map(|utc| utc.with_timezone(zone))
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Most frequent condition label; on a tie the label seen first wins.
fn dominant_condition(samples: &[ForecastSample]) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();

    for label in samples.iter().filter_map(ForecastSample::condition) {
        match counts.iter_mut().find(|(l, _)| *l == label) {
            Some((_, n)) => *n += 1,
            None => counts.push((label, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (label, n) in counts {
        if best.is_none_or(|(_, top)| n > top) {
            best = Some((label, n));
        }
    }

    best.map(|(label, _)| label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Clouds, Condition, SampleMain, Wind};
    use chrono::{FixedOffset, Utc};

    fn ts(y: i32, m: u32, d: u32, h: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap().timestamp()
    }

    fn sample(dt: i64, temp: f64, condition: &str, icon: &str) -> ForecastSample {
        ForecastSample {
            dt,
            main: SampleMain {
                temp,
                feels_like: temp - 1.0,
                temp_min: temp - 0.5,
                temp_max: temp + 0.5,
                pressure: 1012.0,
                humidity: 60.0,
            },
            weather: vec![Condition {
                main: condition.to_string(),
                description: String::new(),
                icon: icon.to_string(),
            }],
            wind: Wind { speed: 3.0 },
            clouds: Clouds { all: 40.0 },
            pop: 0.2,
        }
    }

    fn one_day(temps: &[f64]) -> Vec<ForecastSample> {
        temps
            .iter()
            .enumerate()
            .map(|(i, &t)| sample(ts(2024, 3, 10, 3 * i as u32), t, "Clear", &format!("0{i}d")))
            .collect()
    }

    #[test]
    fn empty_input_yields_no_buckets() {
        assert!(bucket_by_day(&[], &Utc).is_empty());
    }

    #[test]
    fn empty_member_list_builds_no_bucket() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert!(DailyBucket::from_samples(date, Vec::new()).is_none());
    }

    #[test]
    fn single_day_statistics() {
        let samples = one_day(&[10.0, 12.0, 15.0, 18.0, 17.0, 14.0, 11.0, 9.0]);
        let buckets = bucket_by_day(&samples, &Utc);

        assert_eq!(buckets.len(), 1);
        let day = &buckets[0];
        assert_eq!(day.key(), "2024-03-10");
        assert_eq!(day.day_name, "Sunday");
        assert_eq!(day.date_formatted, "Mar 10, 2024");
        assert_eq!(day.min_temp, 9.0);
        assert_eq!(day.max_temp, 18.0);
        assert_eq!(day.avg_temp, 13.3);
        assert!(day.min_temp <= day.avg_temp && day.avg_temp <= day.max_temp);
        assert_eq!(day.avg_humidity, 60);
        assert_eq!(day.avg_pressure, 1012);
        assert_eq!(day.avg_wind, 3.0);
        assert_eq!(day.avg_pop, 20);
        assert_eq!(day.icon.as_deref(), Some("04d"));
    }

    #[test]
    fn averages_round_half_away_from_zero() {
        let mut samples = one_day(&[1.0, 2.0]);
        samples[0].main.humidity = 70.0;
        samples[1].main.humidity = 71.0;
        samples[0].main.pressure = 1000.0;
        samples[1].main.pressure = 1003.0;
        samples[0].wind.speed = 2.0;
        samples[1].wind.speed = 2.2;
        samples[0].pop = 0.33;
        samples[1].pop = 0.34;

        let buckets = bucket_by_day(&samples, &Utc);
        let day = &buckets[0];
        assert_eq!(day.avg_temp, 1.5);
        assert_eq!(day.avg_humidity, 71);
        assert_eq!(day.avg_pressure, 1002);
        assert_eq!(day.avg_wind, 2.1);
        assert_eq!(day.avg_pop, 34);
    }

    #[test]
    fn dominant_weather_tie_goes_to_first_seen() {
        let samples = vec![
            sample(ts(2024, 3, 10, 0), 5.0, "Clouds", "04d"),
            sample(ts(2024, 3, 10, 3), 5.0, "Rain", "10d"),
            sample(ts(2024, 3, 10, 6), 5.0, "Clouds", "04d"),
            sample(ts(2024, 3, 10, 9), 5.0, "Rain", "10d"),
        ];
        let buckets = bucket_by_day(&samples, &Utc);
        let day = &buckets[0];
        assert_eq!(day.dominant_weather.as_deref(), Some("Clouds"));
    }

    #[test]
    fn dominant_weather_prefers_the_majority() {
        let samples = vec![
            sample(ts(2024, 3, 10, 0), 5.0, "Clouds", "04d"),
            sample(ts(2024, 3, 10, 3), 5.0, "Rain", "10d"),
            sample(ts(2024, 3, 10, 6), 5.0, "Rain", "10d"),
        ];
        let buckets = bucket_by_day(&samples, &Utc);
        let day = &buckets[0];
        assert_eq!(day.dominant_weather.as_deref(), Some("Rain"));
    }

    #[test]
    fn samples_without_condition_do_not_vote() {
        let mut samples = one_day(&[1.0, 2.0, 3.0]);
        samples[0].weather.clear();
        samples[1].weather.clear();
        samples[2].weather[0].main = "Snow".to_string();

        let buckets = bucket_by_day(&samples, &Utc);
        let day = &buckets[0];
        assert_eq!(day.dominant_weather.as_deref(), Some("Snow"));
        assert_eq!(day.icon, None);
    }

    #[test]
    fn day_boundaries_follow_the_zone() {
        let samples = vec![
            sample(ts(2024, 1, 1, 21), 1.0, "Clear", "01n"),
            sample(ts(2024, 1, 2, 0), 2.0, "Clear", "01n"),
        ];

        assert_eq!(bucket_by_day(&samples, &Utc).len(), 2);

        let kolkata = bucket_by_day(&samples, &chrono_tz::Asia::Kolkata);
        assert_eq!(kolkata.len(), 1);
        assert_eq!(kolkata[0].key(), "2024-01-02");

        let minus_five = FixedOffset::west_opt(5 * 3600).unwrap();
        let buckets = bucket_by_day(&samples, &minus_five);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].key(), "2024-01-01");
    }

    #[test]
    fn keeps_at_most_seven_days_and_preserves_order() {
        let samples: Vec<ForecastSample> = (0..10u32)
            .flat_map(|day| {
                (0..8u32).map(move |slot| {
                    sample(ts(2024, 5, 1 + day, slot * 3), (day * 8 + slot) as f64, "Clear", "01d")
                })
            })
            .collect();

        let buckets = bucket_by_day(&samples, &Utc);
        assert_eq!(buckets.len(), MAX_DAYS);

        for pair in buckets.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }

        for bucket in &buckets {
            assert!(bucket.samples.iter().all(|s| {
                s.time().unwrap().with_timezone(&Utc).date_naive() == bucket.date
            }));
        }

        let flattened: Vec<ForecastSample> =
            buckets.iter().flat_map(|b| b.samples.iter().cloned()).collect();
        assert_eq!(flattened, samples[..MAX_DAYS * 8].to_vec());
    }

    #[test]
    fn concatenation_reproduces_input_within_seven_days() {
        let samples: Vec<ForecastSample> = (0..40)
            .map(|i| sample(ts(2024, 6, 1, 2) + i * 3 * 3600, i as f64, "Clouds", "03d"))
            .collect();

        let zone = chrono_tz::America::New_York;
        let buckets = bucket_by_day(&samples, &zone);
        assert!(buckets.len() <= MAX_DAYS);

        let flattened: Vec<ForecastSample> =
            buckets.iter().flat_map(|b| b.samples.iter().cloned()).collect();
        assert_eq!(flattened, samples);
    }

    #[test]
    fn hourly_rows_project_members_in_order() {
        let samples = one_day(&[10.0, 12.0, 15.0]);
        let buckets = bucket_by_day(&samples, &Utc);
        let day = &buckets[0];

        let rows: Vec<HourlyRow> = hourly_view(day, &Utc).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].time, "00:00");
        assert_eq!(rows[0].time_formatted, "12:00 AM");
        assert_eq!(rows[2].time, "06:00");
        assert_eq!(rows[2].time_formatted, "06:00 AM");
        assert_eq!(rows[1].temp, 12.0);
        assert_eq!(rows[1].feels_like, 11.0);
        assert!((rows[1].precipitation - 20.0).abs() < 1e-9);
        assert_eq!(rows[1].clouds, 40.0);
        assert_eq!(rows[1].weather.as_deref(), Some("Clear"));
        assert_eq!(rows[1].icon.as_deref(), Some("01d"));
    }

    #[test]
    fn hourly_rows_use_local_clock() {
        let samples = vec![sample(ts(2024, 1, 1, 15), 1.0, "Clear", "01d")];
        let zone = chrono_tz::Asia::Kolkata;
        let buckets = bucket_by_day(&samples, &zone);
        let day = &buckets[0];

        let row = hourly_view(day, &zone).next().unwrap();
        assert_eq!(row.time, "20:30");
        assert_eq!(row.time_formatted, "08:30 PM");
    }

    #[test]
    fn weekly_overview_rows() {
        let samples = one_day(&[10.0, 20.0]);
        let buckets = bucket_by_day(&samples, &Utc);

        let rows = weekly_overview(&buckets);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].day, "Sun");
        assert_eq!(rows[0].date, "03/10");
        assert_eq!(rows[0].min, 10.0);
        assert_eq!(rows[0].max, 20.0);
        assert_eq!(rows[0].avg, 15.0);
        assert_eq!(rows[0].precipitation, 20);
    }
}
