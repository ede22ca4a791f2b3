//! KPI Time - Timezone Aware Bucket Arithmetic
//!
//! Bucket keys are computed in local wall-clock time and mapped back to UTC.
//! The UTC offset is looked up twice: once at the sample instant and again
//! at the truncated local time, so a DST transition between the two does not
//! move the sample into a neighbouring bucket.
//!
//! @version 0.1.0
//! @author KPI Pipeline Development Team

use crate::error::{KpiError, Result};
use crate::types::Resolution;
use chrono::{DateTime, LocalResult, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;

pub const SECONDS_PER_DAY: i64 = 86_400;

// =============================================================================
// Offsets
// =============================================================================

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| KpiError::Configuration(format!("unknown timezone '{}': {}", name, e)))
}

fn naive(seconds: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(seconds, 0).map(|dt| dt.naive_utc())
}

/// UTC offset in seconds in effect at a UTC instant.
///
/// Instants outside chrono's range fall back to UTC with a warning.
pub fn offset_at_utc(tz: &Tz, timestamp: i64) -> i64 {
    match naive(timestamp) {
        Some(utc) => tz.offset_from_utc_datetime(&utc).fix().local_minus_utc() as i64,
        None => {
            tracing::warn!(timestamp, %tz, "timestamp out of range, assuming UTC offset");
            0
        }
    }
}

/// How far back to look for the last valid local time before a gap.
const GAP_SEARCH_MINUTES: i64 = 180;

/// UTC offset in seconds in effect at a local wall-clock time.
///
/// Ambiguous times use `hint` when it is one of the candidates, otherwise
/// the earliest instant. Nonexistent times use the offset in effect just
/// before the gap, which maps them onto the transition instant.
pub fn offset_at_local(tz: &Tz, local: i64, hint: Option<i64>) -> i64 {
    let Some(naive_local) = naive(local) else {
        return hint.unwrap_or_else(|| offset_at_utc(tz, local));
    };

    match tz.offset_from_local_datetime(&naive_local) {
        LocalResult::Single(offset) => offset.fix().local_minus_utc() as i64,
        LocalResult::Ambiguous(a, b) => {
            let a = a.fix().local_minus_utc() as i64;
            let b = b.fix().local_minus_utc() as i64;
            tracing::trace!(local = %naive_local, a, b, ?hint, "ambiguous local bucket start");
            match hint {
                Some(hint) if hint == a || hint == b => hint,
                _ => a.max(b),
            }
        }
        LocalResult::None => {
            let before = offset_before_gap(tz, local);
            tracing::trace!(local = %naive_local, ?before, "nonexistent local bucket start");
            before
                .or(hint)
                .unwrap_or_else(|| offset_at_utc(tz, local))
        }
    }
}

/// Offset of the last valid local time before `local`, scanning back by the
/// minute. Ambiguous candidates take the later instant.
fn offset_before_gap(tz: &Tz, local: i64) -> Option<i64> {
    (1..=GAP_SEARCH_MINUTES).find_map(|minutes| {
        let candidate = naive(local - minutes * 60)?;
        match tz.offset_from_local_datetime(&candidate) {
            LocalResult::Single(offset) => Some(offset.fix().local_minus_utc() as i64),
            LocalResult::Ambiguous(a, b) => Some(
                (a.fix().local_minus_utc() as i64).min(b.fix().local_minus_utc() as i64),
            ),
            LocalResult::None => None,
        }
    })
}

// =============================================================================
// Buckets
// =============================================================================

/// Start of the bucket containing `timestamp`, as a UTC timestamp.
pub fn bucket_key(tz: &Tz, timestamp: i64, resolution: Resolution) -> i64 {
    let size = resolution.seconds() as i64;
    let offset = offset_at_utc(tz, timestamp);
    let local = timestamp + offset;
    let truncated = local - local.rem_euclid(size);
    // A local day can start twice; it always begins at the earlier one.
    let hint = (resolution != Resolution::Day).then_some(offset);
    truncated - offset_at_local(tz, truncated, hint)
}

/// Start of the bucket following the one that starts at `key`.
pub fn next_bucket_key(tz: &Tz, key: i64, resolution: Resolution) -> i64 {
    let size = resolution.seconds() as i64;
    // Land mid-bucket so 23 and 25 hour days resolve to the next local day.
    let next = bucket_key(tz, key + size + size / 2, resolution);
    if next <= key {
        key + size
    } else {
        next
    }
}

/// Every bucket start in `[start, end)` at `resolution`.
pub fn bucket_keys(tz: &Tz, start: i64, end: i64, resolution: Resolution) -> Vec<i64> {
    let mut keys = Vec::new();
    let mut key = bucket_key(tz, start, resolution);
    if key < start {
        key = next_bucket_key(tz, key, resolution);
    }
    while key < end {
        keys.push(key);
        key = next_bucket_key(tz, key, resolution);
    }
    keys
}

/// Midnight UTC of the day containing `timestamp`.
#[inline]
pub fn utc_day_floor(timestamp: i64) -> i64 {
    timestamp - timestamp.rem_euclid(SECONDS_PER_DAY)
}

// =============================================================================
// Tests
// =============================================================================
