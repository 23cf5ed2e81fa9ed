//! Runtime capability queries
//!
//! The selection logic never talks to `ash` directly. It asks these traits,
//! which the real instance and surface implement and which tests script.
//! Nothing here caches: every call goes back to the driver.

use std::ffi::{c_char, CStr};

use ash::{vk, Entry};

use super::context::{VulkanError, VulkanResult};
use super::physical_device::{DeviceFeatures, DeviceProperties};
use super::queue_family::QueueFamily;

/// Instance-level capability queries, available before an instance exists
pub trait CapabilityProbe {
    /// Names of every instance extension the runtime offers
    fn instance_extensions(&self) -> VulkanResult<Vec<String>>;

    /// Names of every instance layer the runtime offers
    fn instance_layers(&self) -> VulkanResult<Vec<String>>;
}

/// Physical device enumeration and per-device queries
pub trait PhysicalDeviceSource {
    /// Enumerate physical devices in runtime order
    fn physical_devices(&self) -> VulkanResult<Vec<vk::PhysicalDevice>>;

    /// Properties relevant to scoring
    fn device_properties(&self, device: vk::PhysicalDevice) -> DeviceProperties;

    /// Feature flags relevant to scoring
    fn device_features(&self, device: vk::PhysicalDevice) -> DeviceFeatures;

    /// Queue families in index order
    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<QueueFamily>;

    /// Names of every extension the device offers
    fn device_extensions(&self, device: vk::PhysicalDevice) -> VulkanResult<Vec<String>>;
}

/// Presentation support of a surface
pub trait PresentSupport {
    /// Whether `queue_family_index` of `device` can present to this surface
    fn supports_present(&self, device: vk::PhysicalDevice, queue_family_index: u32) -> VulkanResult<bool>;
}

impl CapabilityProbe for Entry {
    fn instance_extensions(&self) -> VulkanResult<Vec<String>> {
        let extensions = self
            .enumerate_instance_extension_properties(None)
            .map_err(VulkanError::Api)?;
        Ok(extensions.iter().map(|ext| name_from_raw(&ext.extension_name)).collect())
    }

    fn instance_layers(&self) -> VulkanResult<Vec<String>> {
        let layers = self
            .enumerate_instance_layer_properties()
            .map_err(VulkanError::Api)?;
        Ok(layers.iter().map(|layer| name_from_raw(&layer.layer_name)).collect())
    }
}

/// Convert a fixed-size, NUL-terminated name array into an owned string
pub(crate) fn name_from_raw(raw: &[c_char]) -> String {
    // Driver strings are NUL-terminated within VK_MAX_*_NAME_SIZE
    let bytes: Vec<u8> = raw
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Names from `required` that are absent from `available`, in request order
pub fn missing_names<'a>(available: &[String], required: &'a [String]) -> Vec<&'a str> {
    required
        .iter()
        .filter(|name| !available.iter().any(|have| have == *name))
        .map(String::as_str)
        .collect()
}

/// Whether `name` appears in a list of C string names
pub(crate) fn contains_cstr(names: &[String], name: &CStr) -> bool {
    let name = name.to_string_lossy();
    names.iter().any(|have| *have == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_name(name: &str) -> [c_char; vk::MAX_EXTENSION_NAME_SIZE] {
        let mut raw = [0 as c_char; vk::MAX_EXTENSION_NAME_SIZE];
        for (slot, byte) in raw.iter_mut().zip(name.bytes()) {
            *slot = byte as c_char;
        }
        raw
    }

    #[test]
    fn test_name_from_raw_stops_at_nul() {
        assert_eq!(name_from_raw(&raw_name("VK_KHR_surface")), "VK_KHR_surface");
        assert_eq!(name_from_raw(&raw_name("")), "");
    }

    #[test]
    fn test_missing_names_keeps_request_order() {
        let available = vec!["a".to_string(), "c".to_string()];
        let required = vec!["d".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(missing_names(&available, &required), vec!["d", "b"]);
        assert!(missing_names(&available, &[]).is_empty());
        assert_eq!(missing_names(&[], &required).len(), 3);
    }

    #[test]
    fn test_contains_cstr() {
        let names = vec!["VK_EXT_debug_utils".to_string()];
        assert!(contains_cstr(&names, CStr::from_bytes_with_nul(b"VK_EXT_debug_utils\0").unwrap()));
        assert!(!contains_cstr(&names, CStr::from_bytes_with_nul(b"VK_KHR_surface\0").unwrap()));
    }
}
