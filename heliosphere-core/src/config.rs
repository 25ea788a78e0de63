use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Run configuration. All values are read once at startup; defaults mirror
/// distilled spec §6.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub total_days: u32,
    pub social_days: u32,
    pub safe_delay_days: u32,
    pub interval_minutes: u32,
    pub fps: u32,

    pub frame_width: u32,
    pub frame_height: u32,
    pub composite_radius: f64,
    pub feather_radius: f64,

    pub fetch_concurrency: usize,
    pub process_concurrency: usize,
    pub batch_size: usize,
    pub max_retries: u32,
    pub max_fallback_minutes: i64,

    /// Minimum accepted response-body size, in bytes. Not numerically fixed
    /// by the distilled spec; chosen generously above any valid thumbnail
    /// PNG/JPEG header-plus-payload size (see DESIGN.md open question log).
    pub min_frame_size_bytes: usize,
    pub max_missing_frames_percent: f64,
    pub max_consecutive_resolve_failures: u32,

    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub total_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub retry_backoff: Duration,
    #[serde(with = "duration_secs")]
    pub wall_clock_timeout: Duration,

    pub jpeg_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            total_days: 56,
            social_days: 30,
            safe_delay_days: 2,
            interval_minutes: 15,
            fps: 24,

            frame_width: 1460,
            frame_height: 1200,
            composite_radius: 400.0,
            feather_radius: 40.0,

            fetch_concurrency: 8,
            process_concurrency: 4,
            batch_size: 100,
            max_retries: 3,
            max_fallback_minutes: 14,

            min_frame_size_bytes: 2048,
            max_missing_frames_percent: 5.0,
            max_consecutive_resolve_failures: 10,

            connect_timeout: Duration::from_secs(10),
            total_timeout: Duration::from_secs(30),
            retry_backoff: Duration::from_secs(2),
            wall_clock_timeout: Duration::from_secs(6 * 3600),

            jpeg_quality: 92,
        }
    }
}

impl Config {
    /// Grid points per day at this config's cadence (96 at the default 15-minute interval).
    pub fn points_per_day(&self) -> u32 {
        1440 / self.interval_minutes
    }

    pub fn full_window_frames(&self) -> u32 {
        self.total_days * self.points_per_day()
    }

    pub fn social_window_frames(&self) -> u32 {
        self.social_days * self.points_per_day()
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.total_days, 56);
        assert_eq!(cfg.social_days, 30);
        assert_eq!(cfg.points_per_day(), 96);
        assert_eq!(cfg.full_window_frames(), 56 * 96);
        assert_eq!(cfg.social_window_frames(), 30 * 96);
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = Config::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
