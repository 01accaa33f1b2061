use crate::similarity::SimilarityMetric;
use common::{env_nonempty, env_or, env_positive};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Camera index, stream URL or path handed to the video backend.
    pub source: String,
    pub sample_interval: Duration,
    /// Consecutive similar samples before the feed counts as frozen.
    pub frame_threshold: u32,
    pub metric: SimilarityMetric,
    pub screenshot_dir: Option<PathBuf>,
    pub subscriber_capacity: usize,
}

impl MonitorConfig {
    pub fn from_env() -> Self {
        let metric = match env_nonempty("FREEZE_METRIC")
            .unwrap_or_else(|| "pixel".to_string())
            .to_lowercase()
            .as_str()
        {
            "ssim" => SimilarityMetric::Ssim {
                min_score: env_or("FREEZE_SSIM_THRESHOLD", 0.98),
            },
            other => {
                if other != "pixel" {
                    tracing::warn!(metric = other, "Unknown FREEZE_METRIC, using pixel");
                }
                SimilarityMetric::PixelDiff {
                    max_changed_pixels: env_or("FREEZE_PIXEL_DIFF_THRESHOLD", 1500),
                }
            }
        };

        Self {
            source: env_nonempty("FREEZE_SOURCE").unwrap_or_else(|| "0".to_string()),
            sample_interval: Duration::from_millis(env_positive("FREEZE_SAMPLE_INTERVAL_MS", 500)),
            frame_threshold: env_positive("FREEZE_FRAME_THRESHOLD", 3),
            metric,
            screenshot_dir: env_nonempty("FREEZE_SCREENSHOT_DIR").map(PathBuf::from),
            subscriber_capacity: env_positive("FREEZE_SUBSCRIBER_CAPACITY", 16),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            source: "0".to_string(),
            sample_interval: Duration::from_millis(500),
            frame_threshold: 3,
            metric: SimilarityMetric::PixelDiff {
                max_changed_pixels: 1500,
            },
            screenshot_dir: None,
            subscriber_capacity: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const VARS: [&str; 8] = [
        "FREEZE_SOURCE",
        "FREEZE_SAMPLE_INTERVAL_MS",
        "FREEZE_FRAME_THRESHOLD",
        "FREEZE_METRIC",
        "FREEZE_PIXEL_DIFF_THRESHOLD",
        "FREEZE_SSIM_THRESHOLD",
        "FREEZE_SCREENSHOT_DIR",
        "FREEZE_SUBSCRIBER_CAPACITY",
    ];

    fn clear() {
        for var in VARS {
            unsafe { env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();
        let config = MonitorConfig::from_env();

        assert_eq!(config.source, "0");
        assert_eq!(config.sample_interval, Duration::from_millis(500));
        assert_eq!(config.frame_threshold, 3);
        assert_eq!(
            config.metric,
            SimilarityMetric::PixelDiff {
                max_changed_pixels: 1500
            }
        );
        assert!(config.screenshot_dir.is_none());
        assert_eq!(config.subscriber_capacity, 16);
    }

    #[test]
    #[serial]
    fn test_ssim_metric_from_env() {
        clear();
        unsafe {
            env::set_var("FREEZE_METRIC", "SSIM");
            env::set_var("FREEZE_SSIM_THRESHOLD", "0.9");
            env::set_var("FREEZE_SOURCE", "rtsp://scope/stream");
        }

        let config = MonitorConfig::from_env();
        assert_eq!(config.metric, SimilarityMetric::Ssim { min_score: 0.9 });
        assert_eq!(config.source, "rtsp://scope/stream");
        clear();
    }

    #[test]
    #[serial]
    fn test_zero_values_fall_back() {
        clear();
        unsafe {
            env::set_var("FREEZE_FRAME_THRESHOLD", "0");
            env::set_var("FREEZE_SAMPLE_INTERVAL_MS", "0");
            env::set_var("FREEZE_SCREENSHOT_DIR", "");
        }

        let config = MonitorConfig::from_env();
        assert_eq!(config.frame_threshold, 3);
        assert_eq!(config.sample_interval, Duration::from_millis(500));
        assert!(config.screenshot_dir.is_none());
        clear();
    }
}
