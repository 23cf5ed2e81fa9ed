//! In-memory stand-in for the Vulkan runtime
//!
//! Devices are handed out as handles `1..=n` in the order they were added.

use std::cell::RefCell;

use ash::vk::{self, Handle};

use crate::backend::vulkan::capability::{PhysicalDeviceSource, PresentSupport};
use crate::backend::vulkan::context::{VulkanError, VulkanResult};
use crate::backend::vulkan::physical_device::{DeviceClass, DeviceFeatures, DeviceProperties};
use crate::backend::vulkan::queue_family::QueueFamily;

/// One fake physical device
#[derive(Debug, Clone)]
pub struct ScriptedDevice {
    pub properties: DeviceProperties,
    pub features: DeviceFeatures,
    pub families: Vec<QueueFamily>,
    pub present_families: Vec<u32>,
    pub extensions: Vec<String>,
}

impl ScriptedDevice {
    /// Device with geometry shaders, one graphics+present family and the swapchain extension
    pub fn new(name: &str, class: DeviceClass, max_3d: u32) -> Self {
        Self {
            properties: DeviceProperties {
                name: name.to_string(),
                class,
                max_image_dimension_2d: 16384,
                max_image_dimension_3d: max_3d,
            },
            features: DeviceFeatures { geometry_shader: true },
            families: vec![family(0, vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER)],
            present_families: vec![0],
            extensions: vec!["VK_KHR_swapchain".to_string()],
        }
    }

    pub fn without_geometry_shader(mut self) -> Self {
        self.features.geometry_shader = false;
        self
    }

    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|s| (*s).to_string()).collect();
        self
    }

    pub fn with_families(mut self, families: Vec<QueueFamily>, present_families: &[u32]) -> Self {
        self.families = families;
        self.present_families = present_families.to_vec();
        self
    }
}

/// Shorthand for a queue family with one queue
pub fn family(index: u32, flags: vk::QueueFlags) -> QueueFamily {
    QueueFamily {
        index,
        flags,
        queue_count: 1,
    }
}

/// Scripted runtime acting as both device source and surface
#[derive(Debug, Default)]
pub struct ScriptedRuntime {
    devices: Vec<ScriptedDevice>,
    present_queries: RefCell<Vec<(vk::PhysicalDevice, u32)>>,
    fail_enumeration: bool,
}

impl ScriptedRuntime {
    pub fn new(devices: Vec<ScriptedDevice>) -> Self {
        Self {
            devices,
            ..Self::default()
        }
    }

    /// Runtime whose device enumeration fails
    pub fn failing() -> Self {
        Self {
            fail_enumeration: true,
            ..Self::default()
        }
    }

    /// Handle of the device added at `position`
    pub fn handle(position: usize) -> vk::PhysicalDevice {
        vk::PhysicalDevice::from_raw(position as u64 + 1)
    }

    /// Every (device, family) pair asked for present support so far
    pub fn present_queries(&self) -> Vec<(vk::PhysicalDevice, u32)> {
        self.present_queries.borrow().clone()
    }

    fn device(&self, handle: vk::PhysicalDevice) -> &ScriptedDevice {
        let position = usize::try_from(handle.as_raw() - 1).unwrap();
        &self.devices[position]
    }
}

impl PhysicalDeviceSource for ScriptedRuntime {
    fn physical_devices(&self) -> VulkanResult<Vec<vk::PhysicalDevice>> {
        if self.fail_enumeration {
            return Err(VulkanError::Api(vk::Result::ERROR_INITIALIZATION_FAILED));
        }
        Ok((0..self.devices.len()).map(Self::handle).collect())
    }

    fn device_properties(&self, device: vk::PhysicalDevice) -> DeviceProperties {
        self.device(device).properties.clone()
    }

    fn device_features(&self, device: vk::PhysicalDevice) -> DeviceFeatures {
        self.device(device).features
    }

    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<QueueFamily> {
        self.device(device).families.clone()
    }

    fn device_extensions(&self, device: vk::PhysicalDevice) -> VulkanResult<Vec<String>> {
        Ok(self.device(device).extensions.clone())
    }
}

impl PresentSupport for ScriptedRuntime {
    fn supports_present(&self, device: vk::PhysicalDevice, queue_family_index: u32) -> VulkanResult<bool> {
        self.present_queries.borrow_mut().push((device, queue_family_index));
        Ok(self.device(device).present_families.contains(&queue_family_index))
    }
}
