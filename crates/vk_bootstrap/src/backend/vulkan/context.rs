//! Vulkan context management
//!
//! Owns the Vulkan entry point and instance. Instance creation checks the
//! requested validation layers up front, always enables portability
//! enumeration, and chains a debug messenger into the creation call when
//! validation is on so creation-time messages are captured too.

use std::ffi::CString;

use ash::extensions::ext::DebugUtils;
use ash::{vk, Entry, Instance};
use thiserror::Error;

use super::capability::{missing_names, name_from_raw, CapabilityProbe, PhysicalDeviceSource};
use super::debug::{messenger_create_info, DebugSink, SinkKey, SinkRegistration};
use super::physical_device::{DeviceFeatures, DeviceProperties};
use super::queue_family::QueueFamily;
use crate::core::config::{AppConfig, ApplicationDescriptor};
use crate::foundation::logging::{Logger, Severity};

/// Instance extension that lets non-conformant drivers be enumerated
pub const PORTABILITY_ENUMERATION_EXTENSION: &str = "VK_KHR_portability_enumeration";

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// The Vulkan loader library could not be loaded
    #[error("Vulkan loader unavailable: {0}")]
    LoaderUnavailable(String),

    /// A requested validation layer is not installed
    #[error("validation layer requested, but not available: {layer}")]
    UnavailableLayer {
        /// Name of the first missing layer
        layer: String,
    },

    /// The runtime refused to create the instance
    #[error("failed to create instance: {0:?}")]
    CreationRejected(vk::Result),

    /// The debug utilities extension is not enabled or not present
    #[error("debug utils extension not present")]
    ExtensionNotPresent,

    /// Surface creation through the window failed
    #[error("failed to create window surface: {0}")]
    SurfaceCreationFailed(String),

    /// No physical device was enumerated
    #[error("failed to find GPUs with Vulkan support")]
    NoGpuFound,

    /// Devices exist but none meets the requirements
    #[error("failed to find a suitable GPU")]
    NoSuitableGpu,

    /// Queue family indices were missing a role
    #[error("queue family indices are incomplete: {0}")]
    IncompleteQueueFamilies(String),

    /// Logical device creation failed
    #[error("failed to create logical device: {0:?}")]
    DeviceCreationFailed(vk::Result),

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

/// Layers and extensions requested at instance creation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceRequirements {
    /// Extensions to enable, duplicates tolerated
    pub extensions: Vec<String>,
    /// Validation layers to enable
    pub layers: Vec<String>,
    /// Chain a debug messenger into creation and allow a debug channel
    pub debug_messenger: bool,
}

impl InstanceRequirements {
    /// Build requirements from the window's extensions and the app config
    ///
    /// Portability enumeration is always added; debug utilities only when
    /// validation is enabled.
    pub fn for_window(window_extensions: Vec<String>, config: &AppConfig) -> Self {
        let validation = config.build.validation_enabled;
        let mut extensions = window_extensions;
        extensions.push(PORTABILITY_ENUMERATION_EXTENSION.to_string());
        if validation {
            extensions.push(DebugUtils::name().to_string_lossy().into_owned());
        }

        Self {
            extensions,
            layers: config.requested_layers().to_vec(),
            debug_messenger: validation,
        }
    }
}

/// Fail with the first requested layer missing from `available`
pub fn check_layer_support(available: &[String], requested: &[String]) -> VulkanResult<()> {
    match missing_names(available, requested).first() {
        Some(layer) => Err(VulkanError::UnavailableLayer { layer: (*layer).to_string() }),
        None => Ok(()),
    }
}

/// Pair every available extension with whether it was requested
pub fn extension_report(available: &[String], enabled: &[String]) -> Vec<(String, bool)> {
    available
        .iter()
        .map(|name| (name.clone(), enabled.contains(name)))
        .collect()
}

pub(crate) fn to_cstrings(names: &[String]) -> VulkanResult<Vec<CString>> {
    names
        .iter()
        .map(|name| {
            CString::new(name.as_str()).map_err(|_| VulkanError::InvalidOperation {
                reason: format!("name contains a NUL byte: {name:?}"),
            })
        })
        .collect()
}

/// Vulkan instance wrapper with RAII cleanup
pub struct ApiContext {
    entry: Entry,
    instance: Instance,
    enabled_extensions: Vec<String>,
    enabled_layers: Vec<String>,
    // Dropped after the instance: destruction can still emit messages
    debug_registration: Option<SinkRegistration>,
}

impl ApiContext {
    /// Load the Vulkan runtime and create an instance
    pub fn create(
        descriptor: &ApplicationDescriptor,
        requirements: &InstanceRequirements,
        logger: Logger,
    ) -> VulkanResult<Self> {
        let entry = unsafe { Entry::load() }
            .map_err(|e| VulkanError::LoaderUnavailable(e.to_string()))?;
        Self::create_with_entry(entry, descriptor, requirements, logger)
    }

    /// Create an instance from an already loaded entry point
    pub fn create_with_entry(
        entry: Entry,
        descriptor: &ApplicationDescriptor,
        requirements: &InstanceRequirements,
        logger: Logger,
    ) -> VulkanResult<Self> {
        check_layer_support(&entry.instance_layers()?, &requirements.layers)?;

        let app_name = to_cstrings(std::slice::from_ref(&descriptor.name))?.remove(0);
        let engine_name = to_cstrings(std::slice::from_ref(&descriptor.engine_name))?.remove(0);
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(descriptor.version.to_vk())
            .engine_name(&engine_name)
            .engine_version(descriptor.engine_version.to_vk())
            .api_version(descriptor.api_version.to_vk());

        let layer_names = to_cstrings(&requirements.layers)?;
        let layer_ptrs: Vec<*const std::ffi::c_char> = layer_names.iter().map(|name| name.as_ptr()).collect();
        let extension_names = to_cstrings(&requirements.extensions)?;
        let extension_ptrs: Vec<*const std::ffi::c_char> = extension_names.iter().map(|name| name.as_ptr()).collect();

        let debug_registration = requirements
            .debug_messenger
            .then(|| SinkRegistration::register(DebugSink::new(logger)));
        let mut debug_info = debug_registration
            .as_ref()
            .map(|registration| messenger_create_info(registration.key()));

        let mut create_info = vk::InstanceCreateInfo::builder()
            .flags(vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR)
            .application_info(&app_info)
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&extension_ptrs);
        if let Some(info) = debug_info.as_mut() {
            create_info = create_info.push_next(info);
        }

        let instance = unsafe {
            entry
                .create_instance(&create_info, None)
                .map_err(VulkanError::CreationRejected)?
        };
        log::info!(
            "Created Vulkan instance for {} {} (API {})",
            descriptor.name,
            descriptor.version,
            descriptor.api_version
        );

        Self::log_extensions(&entry, &requirements.extensions, &logger);

        Ok(Self {
            entry,
            instance,
            enabled_extensions: requirements.extensions.clone(),
            enabled_layers: requirements.layers.clone(),
            debug_registration,
        })
    }

    fn log_extensions(entry: &Entry, enabled: &[String], logger: &Logger) {
        let available = match entry.instance_extensions() {
            Ok(available) => available,
            Err(e) => {
                log::warn!("Could not list instance extensions: {}", e);
                return;
            }
        };

        logger.write(Severity::Info, "available extensions:");
        for (name, requested) in extension_report(&available, enabled) {
            let (severity, mark) = if requested {
                (Severity::Info, "requested")
            } else {
                (Severity::Verbose, "not requested")
            };
            logger.write(severity, &format!("\t{name} ({mark})"));
        }
    }

    /// Get a reference to the Vulkan entry
    pub const fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Get a reference to the Vulkan instance
    pub const fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Extensions the instance was created with
    pub fn enabled_extensions(&self) -> &[String] {
        &self.enabled_extensions
    }

    /// Layers the instance was created with
    pub fn enabled_layers(&self) -> &[String] {
        &self.enabled_layers
    }

    /// Registry key of the debug sink, when validation is on
    pub fn debug_sink_key(&self) -> Option<SinkKey> {
        self.debug_registration.as_ref().map(SinkRegistration::key)
    }

    /// Debug sink receiving runtime messages, when validation is on
    pub fn debug_sink(&self) -> Option<&DebugSink> {
        self.debug_registration.as_ref().map(SinkRegistration::sink)
    }
}

impl PhysicalDeviceSource for ApiContext {
    fn physical_devices(&self) -> VulkanResult<Vec<vk::PhysicalDevice>> {
        unsafe { self.instance.enumerate_physical_devices().map_err(VulkanError::Api) }
    }

    fn device_properties(&self, device: vk::PhysicalDevice) -> DeviceProperties {
        let properties = unsafe { self.instance.get_physical_device_properties(device) };
        DeviceProperties::from(&properties)
    }

    fn device_features(&self, device: vk::PhysicalDevice) -> DeviceFeatures {
        let features = unsafe { self.instance.get_physical_device_features(device) };
        DeviceFeatures::from(&features)
    }

    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<QueueFamily> {
        let families = unsafe { self.instance.get_physical_device_queue_family_properties(device) };
        families
            .iter()
            .zip(0u32..)
            .map(|(family, index)| QueueFamily {
                index,
                flags: family.queue_flags,
                queue_count: family.queue_count,
            })
            .collect()
    }

    fn device_extensions(&self, device: vk::PhysicalDevice) -> VulkanResult<Vec<String>> {
        let extensions = unsafe {
            self.instance
                .enumerate_device_extension_properties(device)
                .map_err(VulkanError::Api)?
        };
        Ok(extensions
            .iter()
            .map(|ext| name_from_raw(&ext.extension_name))
            .collect())
    }
}

impl Drop for ApiContext {
    fn drop(&mut self) {
        unsafe {
            self.instance.destroy_instance(None);
        }
        log::debug!("Vulkan instance destroyed");
    }
}
