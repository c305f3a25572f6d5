use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike, Utc};

use lumen_types::{AggregatedPoint, BucketInterval, Sample};

/// Aggregate samples into buckets aligned on the UTC calendar.
///
/// See [`aggregate_in`].
#[must_use]
pub fn aggregate(samples: &[Sample], interval: BucketInterval) -> Vec<AggregatedPoint> {
    aggregate_in(samples, interval, &Utc)
}

/// Aggregate samples into fixed-width buckets aligned on the calendar of `tz`.
///
/// A sample's bucket keeps its local year, month, day and hour and truncates
/// the local minute down to a multiple of `interval` (seconds zeroed), so a
/// bucket never spans an hour boundary even when the interval does not divide
/// 60. Each bucket yields the mean of its samples; output is sorted ascending
/// by bucket start with one point per bucket. Input order does not matter.
///
/// During a repeated local hour (DST fall-back) samples with identical local
/// fields share a bucket whose start resolves to the earliest instant.
#[must_use]
pub fn aggregate_in<Tz: TimeZone>(
    samples: &[Sample],
    interval: BucketInterval,
    tz: &Tz,
) -> Vec<AggregatedPoint> {
    let mut buckets: BTreeMap<NaiveDateTime, Accumulator> = BTreeMap::new();

    for sample in samples {
        let local = sample.ts.with_timezone(tz).naive_local();
        let key = local_bucket_key(local, interval);
        buckets
            .entry(key)
            .or_insert_with(|| Accumulator::new(bucket_start(tz, key, local, sample.ts)))
            .add(sample.value);
    }

    buckets.into_values().map(Accumulator::finish).collect()
}

fn local_bucket_key(local: NaiveDateTime, interval: BucketInterval) -> NaiveDateTime {
    let minute = local.minute();
    let bucket_minute = minute - minute % interval.minutes();
    local
        .date()
        .and_hms_opt(local.hour(), bucket_minute, 0)
        .unwrap_or(local)
}

fn bucket_start<Tz: TimeZone>(
    tz: &Tz,
    key: NaiveDateTime,
    local: NaiveDateTime,
    ts: DateTime<Utc>,
) -> DateTime<Utc> {
    tz.from_local_datetime(&key)
        .earliest()
        .map_or_else(|| ts - (local - key), |start| start.with_timezone(&Utc))
}

struct Accumulator {
    start: DateTime<Utc>,
    sum: f64,
    count: usize,
}

impl Accumulator {
    const fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            sum: 0.0,
            count: 0,
        }
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(self) -> AggregatedPoint {
        AggregatedPoint {
            bucket_start: self.start,
            value: self.sum / self.count as f64,
            count: self.count,
        }
    }
}
