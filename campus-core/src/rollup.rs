//! Calendar rollups over readings.
//!
//! The two bucketings differ in which buckets they emit: [`daily`] is sparse
//! (only dates that have readings), [`weekly`] is dense (every week between
//! the first and the last reading, empty weeks included with a zero total).

use std::collections::BTreeMap;

use time::{Date, Duration};

use crate::domain::Reading;

/// Summed consumption for one calendar bucket, labelled by its date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketTotal {
    pub date: Date,
    pub kwh: f64,
}

fn sum_by<I, F>(readings: I, key: F) -> BTreeMap<Date, f64>
where
    I: IntoIterator<Item = Reading>,
    F: Fn(&Reading) -> Date,
{
    let mut sums: BTreeMap<Date, f64> = BTreeMap::new();
    for r in readings {
        *sums.entry(key(&r)).or_insert(0.0) += r.kwh;
    }
    sums
}

/// Total per calendar date, time of day ignored, ascending.
///
/// Only dates with at least one reading appear in the output.
pub fn daily<I>(readings: I) -> Vec<BucketTotal>
where
    I: IntoIterator<Item = Reading>,
{
    sum_by(readings, |r| r.ts.date())
        .into_iter()
        .map(|(date, kwh)| BucketTotal { date, kwh })
        .collect()
}

/// The Sunday closing the Monday-to-Sunday week that contains `date`.
pub fn week_ending(date: Date) -> Date {
    let days_left = 6 - i64::from(date.weekday().number_days_from_monday());
    date.checked_add(Duration::days(days_left)).unwrap_or(Date::MAX)
}

/// Total per Sunday-ending week, ascending.
///
/// Every week from the first reading's week through the last reading's week
/// is emitted; weeks without readings carry `0.0`.
pub fn weekly<I>(readings: I) -> Vec<BucketTotal>
where
    I: IntoIterator<Item = Reading>,
{
    let sums = sum_by(readings, |r| week_ending(r.ts.date()));
    let (Some((&first, _)), Some((&last, _))) = (sums.first_key_value(), sums.last_key_value())
    else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut week = Some(first);
    while let Some(date) = week.filter(|d| *d <= last) {
        out.push(BucketTotal {
            date,
            kwh: sums.get(&date).copied().unwrap_or(0.0),
        });
        week = date.checked_add(Duration::weeks(1));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn reading(ts: time::PrimitiveDateTime, kwh: f64) -> Reading {
        Reading::new(ts, kwh)
    }

    #[test]
    fn daily_sums_per_date_ignoring_time_of_day() {
        let rows = vec![
            reading(datetime!(2024-01-01 00:00:00), 10.0),
            reading(datetime!(2024-01-02 00:00:00), 20.0),
            reading(datetime!(2024-01-01 18:45:00), 5.0),
        ];
        let out = daily(rows);
        assert_eq!(
            out,
            vec![
                BucketTotal { date: date!(2024-01-01), kwh: 15.0 },
                BucketTotal { date: date!(2024-01-02), kwh: 20.0 },
            ]
        );
    }

    #[test]
    fn daily_is_insensitive_to_row_order() {
        let rows = vec![
            reading(datetime!(2024-02-03 09:00:00), 1.5),
            reading(datetime!(2024-02-01 10:00:00), 4.0),
            reading(datetime!(2024-02-03 11:00:00), 2.5),
            reading(datetime!(2024-02-01 23:00:00), 8.0),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();
        assert_eq!(daily(rows), daily(reversed));
    }

    #[test]
    fn week_ending_lands_on_sunday() {
        // 2024-01-01 is a Monday, 2024-01-07 a Sunday.
        assert_eq!(week_ending(date!(2024-01-01)), date!(2024-01-07));
        assert_eq!(week_ending(date!(2024-01-07)), date!(2024-01-07));
        assert_eq!(week_ending(date!(2024-01-08)), date!(2024-01-14));
    }

    #[test]
    fn weekly_fills_gaps_with_zero_while_daily_stays_sparse() {
        let rows = vec![
            reading(datetime!(2024-01-02 00:00:00), 3.0),
            reading(datetime!(2024-01-07 23:30:00), 2.0),
            reading(datetime!(2024-01-24 00:00:00), 7.0),
        ];

        let weeks = weekly(rows.clone());
        assert_eq!(
            weeks,
            vec![
                BucketTotal { date: date!(2024-01-07), kwh: 5.0 },
                BucketTotal { date: date!(2024-01-14), kwh: 0.0 },
                BucketTotal { date: date!(2024-01-21), kwh: 0.0 },
                BucketTotal { date: date!(2024-01-28), kwh: 7.0 },
            ]
        );

        let days = daily(rows);
        assert_eq!(days.len(), 3);
        assert!(days.iter().all(|d| d.kwh > 0.0));
    }

    #[test]
    fn empty_input_yields_empty_tables() {
        assert!(daily(Vec::new()).is_empty());
        assert!(weekly(Vec::new()).is_empty());
    }
}
