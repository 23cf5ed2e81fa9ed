//! # Application Configuration
//!
//! All knobs the bootstrap sequence reads live here: the application
//! descriptor handed to instance creation, the window geometry, the build
//! toggle for validation and diagnostics, and the layer/extension lists.
//!
//! Every type is serializable so a whole setup can be kept in a TOML or RON
//! file and loaded through [`Config`].

use ash::vk;
use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError};

/// Khronos validation layer enabled in diagnostic builds
pub const KHRONOS_VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Device extension every presenting device must support
pub const SWAPCHAIN_EXTENSION: &str = "VK_KHR_swapchain";

/// A `major.minor.patch` version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
    /// Patch version
    pub patch: u32,
}

impl Version {
    /// Create a version triple
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Pack into the Vulkan version encoding (variant 0)
    pub const fn to_vk(self) -> u32 {
        vk::make_api_version(0, self.major, self.minor, self.patch)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// # Application Descriptor
///
/// Identity reported to the Vulkan runtime at instance creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationDescriptor {
    /// Application name, also used as the window title
    pub name: String,
    /// Application version
    pub version: Version,
    /// Engine name
    pub engine_name: String,
    /// Engine version
    pub engine_version: Version,
    /// Vulkan API version the application targets
    pub api_version: Version,
}

impl ApplicationDescriptor {
    /// Create a descriptor with default versions and no engine
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Version::new(1, 0, 0),
            engine_name: "No Engine".to_string(),
            engine_version: Version::new(1, 0, 0),
            api_version: Version::new(1, 0, 0),
        }
    }
}

impl Default for ApplicationDescriptor {
    fn default() -> Self {
        Self::new("VK_Test")
    }
}

/// # Window Configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Client area width in pixels
    pub width: u32,
    /// Client area height in pixels
    pub height: u32,
    /// Whether the user may resize the window
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 500,
            resizable: false,
        }
    }
}

/// # Build Configuration
///
/// Replaces a compile-time validation switch with a value threaded through
/// instance creation and the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Enable validation layers, the debug messenger and diagnostic output
    pub validation_enabled: bool,
}

impl BuildConfig {
    /// Validation on in debug builds, off in release builds
    pub const fn from_build_profile() -> Self {
        Self { validation_enabled: cfg!(debug_assertions) }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::from_build_profile()
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration consumed by the lifecycle controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Identity reported to the runtime
    pub application: ApplicationDescriptor,
    /// Window geometry
    pub window: WindowConfig,
    /// Validation / diagnostics toggle
    pub build: BuildConfig,
    /// Layers requested when validation is enabled
    pub validation_layers: Vec<String>,
    /// Extensions the selected device must support
    pub device_extensions: Vec<String>,
}

impl AppConfig {
    /// Create a configuration with defaults for the named application
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application: ApplicationDescriptor::new(app_name),
            ..Self::default()
        }
    }

    /// Enable or disable validation layers
    pub const fn with_validation(mut self, enabled: bool) -> Self {
        self.build.validation_enabled = enabled;
        self
    }

    /// Validation layers that will actually be requested
    pub fn requested_layers(&self) -> &[String] {
        if self.build.validation_enabled {
            &self.validation_layers
        } else {
            &[]
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application.name.trim().is_empty() {
            return Err(ConfigError::Invalid("application name cannot be empty".to_string()));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if let Some(empty) = self
            .validation_layers
            .iter()
            .chain(&self.device_extensions)
            .find(|name| name.trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!("empty layer or extension name {empty:?}")));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            application: ApplicationDescriptor::default(),
            window: WindowConfig::default(),
            build: BuildConfig::default(),
            validation_layers: vec![KHRONOS_VALIDATION_LAYER.to_string()],
            device_extensions: vec![SWAPCHAIN_EXTENSION.to_string()],
        }
    }
}

impl Config for AppConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_bootstrap_setup() {
        let config = AppConfig::default();
        assert_eq!(config.application.name, "VK_Test");
        assert_eq!(config.application.engine_name, "No Engine");
        assert_eq!(config.application.api_version, Version::new(1, 0, 0));
        assert_eq!((config.window.width, config.window.height), (500, 500));
        assert!(!config.window.resizable);
        assert_eq!(config.validation_layers, vec![KHRONOS_VALIDATION_LAYER]);
        assert_eq!(config.device_extensions, vec![SWAPCHAIN_EXTENSION]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_version_packing() {
        assert_eq!(Version::new(1, 0, 0).to_vk(), vk::API_VERSION_1_0);
        assert_eq!(Version::new(1, 2, 0).to_vk(), vk::API_VERSION_1_2);
        assert_eq!(Version::new(1, 2, 3).to_string(), "1.2.3");
    }

    #[test]
    fn test_requested_layers_follow_validation_toggle() {
        let on = AppConfig::default().with_validation(true);
        let off = AppConfig::default().with_validation(false);
        assert_eq!(on.requested_layers(), [KHRONOS_VALIDATION_LAYER.to_string()]);
        assert!(off.requested_layers().is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::new("  ");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config = AppConfig::default();
        config.window.height = 0;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.device_extensions.push(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_and_partial_files() {
        let config = AppConfig::new("Demo").with_validation(true);
        let text = config.to_toml_string().unwrap();
        assert_eq!(AppConfig::from_toml_str(&text).unwrap(), config);

        // Missing sections fall back to defaults
        let partial = AppConfig::from_toml_str("device_extensions = []\n").unwrap();
        assert!(partial.device_extensions.is_empty());
        assert_eq!(partial.window, WindowConfig::default());
    }

    #[test]
    fn test_file_round_trip_in_both_formats() {
        let dir = std::env::temp_dir().join(format!("vk_bootstrap_config_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut config = AppConfig::new("Saved").with_validation(false);
        config.window.width = 800;
        config.device_extensions.push("VK_KHR_maintenance1".to_string());

        for name in ["app.toml", "app.ron"] {
            let path = dir.join(name);
            config.save_to_file(&path).unwrap();
            assert_eq!(AppConfig::load_from_file(&path).unwrap(), config);
        }

        assert!(matches!(
            config.save_to_file(dir.join("app.json")),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            AppConfig::load_from_file(dir.join("missing.toml")),
            Err(ConfigError::Io(_))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_ron_parse() {
        let parsed = AppConfig::from_ron_str(
            "(build: (validation_enabled: false), validation_layers: [\"VK_LAYER_test\"])",
        )
        .unwrap();
        assert!(!parsed.build.validation_enabled);
        assert_eq!(parsed.validation_layers, vec!["VK_LAYER_test"]);
        assert_eq!(parsed.application, ApplicationDescriptor::default());
    }
}
