use serde::{Deserialize, Serialize};
use std::path::Path;

/// Display sink selection for the subscriber window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplaySink {
    /// Platform-selected video sink (autovideosink)
    #[default]
    Auto,
    /// X11 window sink (ximagesink)
    X11,
    /// No window, discard frames (fakesink) - useful for headless runs
    Headless,
}

impl DisplaySink {
    /// Get the GStreamer element name for this sink
    pub fn element_name(&self) -> &'static str {
        match self {
            DisplaySink::Auto => "autovideosink",
            DisplaySink::X11 => "ximagesink",
            DisplaySink::Headless => "fakesink",
        }
    }
}

/// A UDP endpoint the RTP stream is sent to or received on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Host address (e.g., 127.0.0.1)
    pub host: String,
    /// UDP port
    pub port: u16,
}

/// Geometry and rate of the generated video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Frame width in pixels
    #[serde(default = "default_width")]
    pub width: u32,
    /// Frame height in pixels
    #[serde(default = "default_height")]
    pub height: u32,
    /// Target frame rate
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
        }
    }
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

fn default_fps() -> u32 {
    30
}

fn default_bitrate_kbps() -> u32 {
    2000
}

fn default_publish_endpoint() -> EndpointConfig {
    EndpointConfig {
        host: "127.0.0.1".to_string(),
        port: 5000,
    }
}

fn default_subscribe_endpoint() -> EndpointConfig {
    EndpointConfig {
        host: "127.0.0.1".to_string(),
        port: 5001,
    }
}

/// Configuration for the frame publisher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Destination endpoint for the RTP stream
    #[serde(default = "default_publish_endpoint")]
    pub endpoint: EndpointConfig,
    /// Generated video geometry and rate
    #[serde(default)]
    pub video: VideoConfig,
    /// H264 encoder bitrate in kbit/s
    #[serde(default = "default_bitrate_kbps")]
    pub bitrate_kbps: u32,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            endpoint: default_publish_endpoint(),
            video: VideoConfig::default(),
            bitrate_kbps: default_bitrate_kbps(),
        }
    }
}

impl PublisherConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject geometry the pipeline cannot negotiate
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.video.width == 0 || self.video.height == 0 {
            return Err(ConfigError::ValidationError(
                "video width and height must be positive".to_string(),
            ));
        }
        if self.video.fps == 0 {
            return Err(ConfigError::ValidationError(
                "video fps must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the frame subscriber
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriberConfig {
    /// Endpoint the RTP stream is received on
    #[serde(default = "default_subscribe_endpoint")]
    pub endpoint: EndpointConfig,
    /// Display sink for received frames
    #[serde(default)]
    pub display: DisplaySink,
    /// Display poll rate (ticks per second)
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            endpoint: default_subscribe_endpoint(),
            display: DisplaySink::default(),
            fps: default_fps(),
        }
    }
}

impl SubscriberConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fps == 0 {
            return Err(ConfigError::ValidationError(
                "poll fps must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publisher_defaults() {
        let config = PublisherConfig::parse("{}").unwrap();
        assert_eq!(config.endpoint.host, "127.0.0.1");
        assert_eq!(config.endpoint.port, 5000);
        assert_eq!(config.video.width, 1280);
        assert_eq!(config.video.height, 720);
        assert_eq!(config.video.fps, 30);
        assert_eq!(config.bitrate_kbps, 2000);
    }

    #[test]
    fn test_publisher_overrides() {
        let yaml = r#"
endpoint:
  host: "192.168.1.20"
  port: 6000
video:
  width: 640
  height: 480
  fps: 15
bitrate_kbps: 500
"#;
        let config = PublisherConfig::parse(yaml).unwrap();
        assert_eq!(config.endpoint.host, "192.168.1.20");
        assert_eq!(config.endpoint.port, 6000);
        assert_eq!(config.video.width, 640);
        assert_eq!(config.video.height, 480);
        assert_eq!(config.video.fps, 15);
        assert_eq!(config.bitrate_kbps, 500);
    }

    #[test]
    fn test_publisher_rejects_zero_dimensions() {
        let yaml = r#"
video:
  width: 0
"#;
        assert!(matches!(
            PublisherConfig::parse(yaml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_subscriber_defaults() {
        let config = SubscriberConfig::parse("{}").unwrap();
        assert_eq!(config.endpoint.port, 5001);
        assert_eq!(config.display, DisplaySink::Auto);
        assert_eq!(config.fps, 30);
    }

    #[test]
    fn test_subscriber_display_sink() {
        let config = SubscriberConfig::parse("display: headless").unwrap();
        assert_eq!(config.display, DisplaySink::Headless);
        assert_eq!(config.display.element_name(), "fakesink");

        let config = SubscriberConfig::parse("display: x11").unwrap();
        assert_eq!(config.display, DisplaySink::X11);
        assert_eq!(config.display.element_name(), "ximagesink");
    }

    #[test]
    fn test_subscriber_rejects_zero_fps() {
        assert!(matches!(
            SubscriberConfig::parse("fps: 0"),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
