pub mod capture;
pub mod display;
pub mod filter;
pub mod pipeline;
#[cfg(feature = "v4l2")]
pub mod utils;

use std::path::Path;
use std::time::Duration;

use capture::frame::PixelFormat;
use filter::FilterSelector;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use capture::Frame;
pub use pipeline::{ControlHandle, FrameScheduler};

/// Frames per second when the configuration asks for zero.
pub const DEFAULT_FPS: u32 = 30;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "PRISM";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {field} must be non-zero")]
    Zero { field: &'static str },
}

/// System configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub capture: CaptureConfig,
    pub display: DisplayConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Device node, `auto`, or a `stub://` synthetic device
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: PixelFormat,
    pub buffer_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub initial_filter: FilterSelector,
    /// Start ticking without waiting for the control surface
    pub autostart: bool,
    /// Headless mode logs every Nth presented frame
    pub log_every: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture: CaptureConfig {
                device: "/dev/video0".into(),
                width: 640,
                height: 480,
                fps: DEFAULT_FPS,
                format: PixelFormat::Mjpeg,
                buffer_count: 4,
            },
            display: DisplayConfig {
                width: 800,
                height: 600,
                title: "Real-Time Camera Processing".into(),
            },
            pipeline: PipelineConfig {
                initial_filter: FilterSelector::None,
                autostart: false,
                log_every: 30,
            },
        }
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then `PRISM__SECTION__KEY`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Self::defaults_builder()?;
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()
    }

    /// Defaults overridden by an in-memory TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let builder = Self::defaults_builder()?
            .add_source(config::File::from_str(text, config::FileFormat::Toml));
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()
    }

    /// Reject sizes that would produce empty frames or no capture buffers.
    pub fn validate(self) -> Result<Self, ConfigError> {
        let sizes = [
            ("capture.width", self.capture.width),
            ("capture.height", self.capture.height),
            ("capture.buffer_count", self.capture.buffer_count),
            ("display.width", self.display.width),
            ("display.height", self.display.height),
        ];
        if let Some(&(field, _)) = sizes.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Zero { field });
        }
        Ok(self)
    }

    fn defaults_builder(
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let defaults = config::Config::try_from(&Config::default())?;
        Ok(config::Config::builder().add_source(defaults))
    }

    /// Time between ticks.
    pub fn tick_period(&self) -> Duration {
        let fps = if self.capture.fps == 0 {
            DEFAULT_FPS
        } else {
            self.capture.fps
        };
        Duration::from_secs_f64(1.0 / f64::from(fps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    #[test]
    fn defaults_match_original_camera_settings() {
        let config = Config::default();
        assert_eq!(config.capture.device, "/dev/video0");
        assert_eq!(config.capture.fps, 30);
        assert_eq!(config.pipeline.initial_filter, FilterSelector::None);
        assert!(!config.pipeline.autostart);
    }

    #[test]
    fn tick_period_is_one_over_fps() {
        let mut config = Config::default();
        assert_eq!(config.tick_period(), Duration::from_secs_f64(1.0 / 30.0));
        config.capture.fps = 10;
        assert_eq!(config.tick_period(), Duration::from_millis(100));
        config.capture.fps = 0;
        assert_eq!(config.tick_period(), Duration::from_secs_f64(1.0 / 30.0));
    }

    #[test]
    fn toml_overrides_layer_on_defaults() {
        let config = Config::from_toml(
            r#"
            [capture]
            device = "stub://test"
            fps = 15

            [pipeline]
            initial_filter = "sepia"
            autostart = true
            "#,
        )
        .unwrap();

        assert_eq!(config.capture.device, "stub://test");
        assert_eq!(config.capture.fps, 15);
        assert_eq!(config.capture.width, 640);
        assert_eq!(config.pipeline.initial_filter, FilterSelector::Sepia);
        assert!(config.pipeline.autostart);
        assert_eq!(config.display.title, "Real-Time Camera Processing");
    }

    #[test]
    fn unknown_initial_filter_falls_back_to_none() {
        let config = Config::from_toml("[pipeline]\ninitial_filter = \"cartoon\"\n").unwrap();
        assert_eq!(config.pipeline.initial_filter, FilterSelector::None);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(matches!(
            Config::from_toml("[capture\nfps = "),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn zero_frame_size_is_rejected() {
        for doc in [
            "[capture]\nwidth = 0\n",
            "[capture]\nheight = 0\n",
            "[capture]\nbuffer_count = 0\n",
        ] {
            assert!(
                matches!(Config::from_toml(doc), Err(ConfigError::Zero { .. })),
                "{doc}"
            );
        }

        let err = Config::from_toml("[capture]\nwidth = 0\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: capture.width must be non-zero"
        );
    }

    // Environment variables are process-wide
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn load_layers_file_then_environment() {
        let _guard = ENV_LOCK.lock().unwrap();

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[capture]\ndevice = \"stub://file\"\nfps = 20\nwidth = 320"
        )
        .unwrap();

        std::env::set_var("PRISM__CAPTURE__FPS", "15");
        std::env::set_var("PRISM_CONFIG", "/nonexistent/prism.toml");
        let loaded = Config::load(Some(file.path()));
        std::env::remove_var("PRISM__CAPTURE__FPS");
        std::env::remove_var("PRISM_CONFIG");
        let config = loaded.unwrap();

        // Environment beats the file
        assert_eq!(config.capture.fps, 15);
        // File beats the defaults
        assert_eq!(config.capture.device, "stub://file");
        assert_eq!(config.capture.width, 320);
        // Untouched keys keep their defaults
        assert_eq!(config.capture.height, 480);
        assert_eq!(config.display.title, "Real-Time Camera Processing");
    }

    #[test]
    fn load_rejects_zero_width_from_environment() {
        let _guard = ENV_LOCK.lock().unwrap();

        std::env::set_var("PRISM__CAPTURE__WIDTH", "0");
        let loaded = Config::load(None);
        std::env::remove_var("PRISM__CAPTURE__WIDTH");

        assert!(matches!(
            loaded,
            Err(ConfigError::Zero {
                field: "capture.width"
            })
        ));
    }

    #[test]
    fn load_requires_an_existing_file() {
        let _guard = ENV_LOCK.lock().unwrap();
        let missing = Path::new("/nonexistent/prism.toml");
        assert!(matches!(Config::load(Some(missing)), Err(ConfigError::Load(_))));
    }
}
