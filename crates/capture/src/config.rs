use common::env_positive;

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Frame rate assumed for image-sequence videos.
    pub source_fps: f64,
}

impl CaptureConfig {
    pub fn from_env() -> Self {
        Self {
            source_fps: env_positive("SOURCE_FPS", 30.0),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { source_fps: 30.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_source_fps_from_env() {
        unsafe { env::set_var("SOURCE_FPS", "25") };
        assert_eq!(CaptureConfig::from_env().source_fps, 25.0);

        unsafe { env::set_var("SOURCE_FPS", "0") };
        assert_eq!(CaptureConfig::from_env().source_fps, 30.0);

        unsafe { env::remove_var("SOURCE_FPS") };
        assert_eq!(CaptureConfig::from_env().source_fps, 30.0);
    }
}
