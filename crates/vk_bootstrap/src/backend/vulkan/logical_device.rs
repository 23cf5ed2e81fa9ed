//! Logical device creation and queue retrieval

use ash::{vk, Device};

use super::context::{to_cstrings, ApiContext, VulkanError, VulkanResult};
use super::queue_family::QueueFamilyIndices;
use crate::foundation::logging::{Logger, Severity};

/// One queue request per distinct family
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueCreateRecord {
    /// Family the queue is taken from
    pub family_index: u32,
    /// Priority of each requested queue
    pub priorities: [f32; 1],
}

/// Build queue requests for every distinct family in `indices`
///
/// A shared graphics/present family yields a single record. Records come
/// out in ascending family order.
pub fn queue_create_records(indices: &QueueFamilyIndices) -> VulkanResult<Vec<QueueCreateRecord>> {
    indices.roles()?;

    Ok(indices
        .unique_families()
        .into_iter()
        .map(|family_index| QueueCreateRecord {
            family_index,
            priorities: [1.0],
        })
        .collect())
}

/// A queue fetched from a logical device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueHandle {
    /// Raw queue handle
    pub queue: vk::Queue,
    /// Family the queue belongs to
    pub family_index: u32,
    /// Queue index inside its family
    pub queue_index: u32,
}

/// Fetch queue 0 of the graphics and present families, in that order
///
/// When both roles share a family the same queue is returned twice.
pub fn retrieve_queues<F>(graphics_family: u32, present_family: u32, mut fetch: F) -> (QueueHandle, QueueHandle)
where
    F: FnMut(u32, u32) -> vk::Queue,
{
    let mut handle = |family_index| QueueHandle {
        queue: fetch(family_index, 0),
        family_index,
        queue_index: 0,
    };
    let graphics = handle(graphics_family);
    let present = handle(present_family);
    (graphics, present)
}

/// Log a failed idle wait; the device is destroyed regardless
fn warn_on_idle_failure(result: Result<(), vk::Result>) -> bool {
    match result {
        Ok(()) => false,
        Err(e) => {
            log::warn!("device_wait_idle failed before destroying the device: {:?}", e);
            true
        }
    }
}

/// Logical device wrapper with RAII cleanup
pub struct LogicalDevice {
    device: Device,
    graphics_queue: QueueHandle,
    present_queue: QueueHandle,
}

impl LogicalDevice {
    /// Create a logical device on `physical_device` with one queue per distinct family
    pub fn create(
        context: &ApiContext,
        physical_device: vk::PhysicalDevice,
        indices: &QueueFamilyIndices,
        extensions: &[String],
        logger: Logger,
    ) -> VulkanResult<Self> {
        // Everything fallible happens before the device exists
        let (graphics_family, present_family) = indices.roles()?;
        let records = queue_create_records(indices)?;
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = records
            .iter()
            .map(|record| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(record.family_index)
                    .queue_priorities(&record.priorities)
                    .build()
            })
            .collect();

        let extension_names = to_cstrings(extensions)?;
        let extension_ptrs: Vec<*const std::ffi::c_char> = extension_names.iter().map(|name| name.as_ptr()).collect();
        let layer_names = to_cstrings(context.enabled_layers())?;
        let layer_ptrs: Vec<*const std::ffi::c_char> = layer_names.iter().map(|name| name.as_ptr()).collect();

        let device_features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&extension_ptrs)
            .enabled_features(&device_features);

        let device = unsafe {
            context
                .instance()
                .create_device(physical_device, &create_info, None)
                .map_err(VulkanError::DeviceCreationFailed)?
        };

        let (graphics_queue, present_queue) = retrieve_queues(graphics_family, present_family, |family, index| unsafe {
            device.get_device_queue(family, index)
        });

        logger.write(
            Severity::Info,
            &format!(
                "Logical device created with {} queue famil{} ({})",
                records.len(),
                if records.len() == 1 { "y" } else { "ies" },
                indices
            ),
        );

        Ok(Self {
            device,
            graphics_queue,
            present_queue,
        })
    }

    /// Queue used for graphics work
    pub const fn graphics_queue(&self) -> QueueHandle {
        self.graphics_queue
    }

    /// Queue used for presentation
    pub const fn present_queue(&self) -> QueueHandle {
        self.present_queue
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            warn_on_idle_failure(self.device.device_wait_idle());
            self.device.destroy_device(None);
        }
        log::debug!("Logical device destroyed");
    }
}
