use crate::permission::Permission;
use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Everything the application needs, fixed at construction
#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// chrono strftime pattern for photo file names
    #[serde(default = "default_file_name_format")]
    pub file_name_format: String,
    #[serde(default = "default_photo_extension")]
    pub photo_extension: String,
    /// Correlates a permission request with its response
    #[serde(default = "default_request_code")]
    pub request_code: u32,
    #[serde(default = "default_required_permissions")]
    pub required_permissions: Vec<Permission>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub camera: DeviceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// App-scoped media directories, the first one is preferred
    #[serde(default = "default_external_media_dirs")]
    pub external_media_dirs: Vec<PathBuf>,
    /// Internal storage, used when no external directory is usable
    #[serde(default = "default_files_dir")]
    pub files_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub index: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// v4l2loopback device receiving the preview, none disables preview
    #[serde(default)]
    pub preview_device: Option<PathBuf>,
    #[serde(default = "default_preview_width")]
    pub preview_width: u32,
    #[serde(default = "default_preview_height")]
    pub preview_height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            tag: default_tag(),
            app_name: default_app_name(),
            file_name_format: default_file_name_format(),
            photo_extension: default_photo_extension(),
            request_code: default_request_code(),
            required_permissions: default_required_permissions(),
            storage: StorageConfig::default(),
            camera: DeviceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            external_media_dirs: default_external_media_dirs(),
            files_dir: default_files_dir(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            jpeg_quality: default_jpeg_quality(),
            preview_device: None,
            preview_width: default_preview_width(),
            preview_height: default_preview_height(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl CameraConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: CameraConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.file_name_format.is_empty()
            || StrftimeItems::new(&self.file_name_format).any(|item| matches!(item, Item::Error))
        {
            return Err(ConfigError::Invalid(format!(
                "file_name_format {:?} is not a valid strftime pattern",
                self.file_name_format
            )));
        }
        if self.camera.fps == 0 {
            return Err(ConfigError::Invalid("camera.fps must be positive".into()));
        }
        if !(1..=100).contains(&self.camera.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "camera.jpeg_quality {} is outside 1..=100",
                self.camera.jpeg_quality
            )));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

// Default value functions
fn default_tag() -> String {
    "lumacam".into()
}
fn default_app_name() -> String {
    "lumacam".into()
}
fn default_file_name_format() -> String {
    "%y-%m-%d-%H-%M-%S-%3f".into()
}
fn default_photo_extension() -> String {
    "jpg".into()
}
fn default_request_code() -> u32 {
    200
}
fn default_required_permissions() -> Vec<Permission> {
    vec![Permission::Camera]
}
fn default_external_media_dirs() -> Vec<PathBuf> {
    home_dir()
        .map(|home| vec![home.join("Pictures")])
        .unwrap_or_default()
}
fn default_files_dir() -> PathBuf {
    match std::env::var_os("XDG_DATA_HOME").filter(|dir| !dir.is_empty()) {
        Some(data) => PathBuf::from(data).join(default_app_name()),
        None => home_dir()
            .map(|home| home.join(".local/share").join(default_app_name()))
            .unwrap_or_else(|| std::env::temp_dir().join(default_app_name())),
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
fn default_jpeg_quality() -> u8 {
    90
}
fn default_preview_width() -> u32 {
    1280
}
fn default_preview_height() -> u32 {
    720
}
fn default_log_level() -> String {
    "info".into()
}
