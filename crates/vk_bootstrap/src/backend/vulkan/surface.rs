//! Vulkan surface management
//!
//! Binds the window to the instance. Queue family resolution asks the
//! surface which families can present, so it has to exist before any device
//! is evaluated.

use ash::{vk, extensions::khr};

use super::capability::PresentSupport;
use super::context::{ApiContext, VulkanError, VulkanResult};
use super::window::Window;

/// Vulkan surface wrapper for presentation
pub struct PresentationSurface {
    surface_loader: khr::Surface,
    surface: vk::SurfaceKHR,
}

impl PresentationSurface {
    /// Create a surface for `window` on the context's instance
    pub fn create(context: &ApiContext, window: &Window) -> VulkanResult<Self> {
        let surface_loader = khr::Surface::new(context.entry(), context.instance());

        let surface = window
            .create_vulkan_surface(context.instance().handle())
            .map_err(|e| VulkanError::SurfaceCreationFailed(e.to_string()))?;
        log::debug!("Window surface created");

        Ok(Self {
            surface_loader,
            surface,
        })
    }

    /// Get the underlying surface handle
    pub const fn handle(&self) -> vk::SurfaceKHR {
        self.surface
    }
}

impl PresentSupport for PresentationSurface {
    fn supports_present(&self, physical_device: vk::PhysicalDevice, queue_family_index: u32) -> VulkanResult<bool> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_support(physical_device, queue_family_index, self.surface)
                .map_err(VulkanError::Api)
        }
    }
}

impl Drop for PresentationSurface {
    fn drop(&mut self) {
        unsafe {
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
