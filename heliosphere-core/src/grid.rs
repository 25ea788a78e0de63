use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("total_days must be positive, got {0}")]
    NonPositiveTotalDays(u32),
    #[error("interval_minutes must be positive, got {0}")]
    NonPositiveInterval(u32),
    #[error("interval_minutes ({0}) must evenly divide one day (1440 minutes)")]
    IntervalNotADivisorOfDay(u32),
}

/// A single 15-minute-aligned grid timestamp and its zero-based ordinal on the run's time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GridPoint {
    pub index: u32,
    pub timestamp: DateTime<Utc>,
}

/// Enumerates the target grid timestamps for one run (C1).
///
/// Pure function, no I/O. The end of the grid is `floor(now - safe_delay_days, interval)`
/// with seconds zeroed; the start is `end - (total_points - 1) * interval`.
pub fn build_grid(now: DateTime<Utc>, cfg: &Config) -> Result<Vec<GridPoint>, GridError> {
    if cfg.total_days == 0 {
        return Err(GridError::NonPositiveTotalDays(cfg.total_days));
    }
    if cfg.interval_minutes == 0 {
        return Err(GridError::NonPositiveInterval(cfg.interval_minutes));
    }
    if 1440 % cfg.interval_minutes != 0 {
        return Err(GridError::IntervalNotADivisorOfDay(cfg.interval_minutes));
    }

    let interval = ChronoDuration::minutes(cfg.interval_minutes as i64);
    let end = floor_to_interval(now - ChronoDuration::days(cfg.safe_delay_days as i64), cfg.interval_minutes);

    let total_points = cfg.full_window_frames() as i64;
    let start = end - interval * (total_points - 1) as i32;

    let mut grid = Vec::with_capacity(total_points as usize);
    let mut ts = start;
    for index in 0..total_points as u32 {
        grid.push(GridPoint { index, timestamp: ts });
        ts += interval;
    }
    Ok(grid)
}

/// Floors a timestamp to the nearest `interval_minutes` boundary since midnight UTC,
/// zeroing seconds and sub-second components. All arithmetic is UTC, so DST has no effect.
fn floor_to_interval(ts: DateTime<Utc>, interval_minutes: u32) -> DateTime<Utc> {
    let minute_of_day = ts.hour() * 60 + ts.minute();
    let floored_minute_of_day = (minute_of_day / interval_minutes) * interval_minutes;
    ts.date_naive()
        .and_hms_opt(floored_minute_of_day / 60, floored_minute_of_day % 60, 0)
        .expect("floored minute-of-day is always a valid time")
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cfg_with(total_days: u32, safe_delay_days: u32, interval_minutes: u32) -> Config {
        Config {
            total_days,
            safe_delay_days,
            interval_minutes,
            ..Config::default()
        }
    }

    #[test]
    fn grid_has_exactly_total_days_times_points_per_day_entries() {
        let cfg = cfg_with(2, 2, 15);
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 13, 37, 42).unwrap();
        let grid = build_grid(now, &cfg).unwrap();
        assert_eq!(grid.len(), 2 * 96);
    }

    #[test]
    fn grid_is_ascending_and_evenly_spaced() {
        let cfg = cfg_with(1, 0, 15);
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap();
        let grid = build_grid(now, &cfg).unwrap();
        for w in grid.windows(2) {
            assert_eq!(w[1].timestamp - w[0].timestamp, ChronoDuration::minutes(15));
            assert_eq!(w[1].index, w[0].index + 1);
        }
    }

    #[test]
    fn end_is_floored_and_delayed() {
        let cfg = cfg_with(1, 2, 15);
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 13, 37, 42).unwrap();
        let grid = build_grid(now, &cfg).unwrap();
        let end = grid.last().unwrap().timestamp;
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 7, 26, 13, 30, 0).unwrap());
    }

    #[test]
    fn rejects_non_divisor_interval() {
        let cfg = cfg_with(1, 0, 13);
        let now = Utc::now();
        assert_eq!(
            build_grid(now, &cfg),
            Err(GridError::IntervalNotADivisorOfDay(13))
        );
    }

    #[test]
    fn rejects_zero_total_days() {
        let cfg = cfg_with(0, 0, 15);
        assert_eq!(
            build_grid(Utc::now(), &cfg),
            Err(GridError::NonPositiveTotalDays(0))
        );
    }

    #[test]
    fn no_skipped_or_duplicated_points_across_a_dst_like_boundary() {
        // UTC has no DST, but this exercises a month/day rollover boundary.
        let cfg = cfg_with(1, 0, 15);
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 10, 0).unwrap();
        let grid = build_grid(now, &cfg).unwrap();
        let mut seen = std::collections::HashSet::new();
        for p in &grid {
            assert!(seen.insert(p.timestamp), "duplicate grid timestamp {:?}", p.timestamp);
        }
    }
}
