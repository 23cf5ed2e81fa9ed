//! Vulkan backend implementation
//!
//! Organized the way the bootstrap runs: window, context, debug channel,
//! surface, device selection, logical device.

/// Runtime capability queries behind traits
pub mod capability;

/// Entry point and instance ownership
pub mod context;

/// Debug messenger and message sinks
pub mod debug;

/// Logical device and queues
pub mod logical_device;

/// Physical device scoring and selection
pub mod physical_device;

/// Graphics and present queue family resolution
pub mod queue_family;

/// Window surface
pub mod surface;

/// GLFW window
pub mod window;

#[cfg(test)]
mod tests;

pub use capability::{CapabilityProbe, PhysicalDeviceSource, PresentSupport};
pub use context::{ApiContext, InstanceRequirements, VulkanError, VulkanResult};
pub use debug::{DebugChannel, DebugSink, SinkKey, SinkRegistration};
pub use logical_device::{LogicalDevice, QueueCreateRecord, QueueHandle};
pub use physical_device::{DeviceClass, DeviceScore, DeviceSelector, SelectedDevice};
pub use queue_family::{QueueFamily, QueueFamilyIndices};
pub use surface::PresentationSurface;
pub use window::{Window, WindowBackend, WindowError, WindowResult};
