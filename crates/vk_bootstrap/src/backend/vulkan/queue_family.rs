//! Queue family resolution

use std::collections::BTreeSet;
use std::fmt;

use ash::vk;

use super::capability::{PhysicalDeviceSource, PresentSupport};
use super::context::{VulkanError, VulkanResult};
use crate::foundation::logging::{Logger, Severity};

/// One queue family as reported by a physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamily {
    /// Family index
    pub index: u32,
    /// Operations the family supports
    pub flags: vk::QueueFlags,
    /// Number of queues in the family
    pub queue_count: u32,
}

impl QueueFamily {
    /// Whether the family can run graphics work
    pub fn supports_graphics(&self) -> bool {
        self.flags.contains(vk::QueueFlags::GRAPHICS)
    }
}

/// Queue family indices a device will use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueFamilyIndices {
    /// First family with graphics support
    pub graphics_family: Option<u32>,
    /// First family able to present to the surface
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    /// Both roles have a family
    pub const fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// `(graphics, present)` family indices, failing if either is missing
    pub fn roles(&self) -> VulkanResult<(u32, u32)> {
        match (self.graphics_family, self.present_family) {
            (Some(graphics), Some(present)) => Ok((graphics, present)),
            _ => Err(VulkanError::IncompleteQueueFamilies(self.to_string())),
        }
    }

    /// Distinct family indices in use, ascending
    pub fn unique_families(&self) -> BTreeSet<u32> {
        self.graphics_family.into_iter().chain(self.present_family).collect()
    }

    /// Resolve graphics and presentation families for a device
    ///
    /// Every family is visited: the first graphics-capable one and the first
    /// one that can present to `surface` win, and all of them are logged.
    pub fn resolve<S, P>(
        source: &S,
        surface: &P,
        device: vk::PhysicalDevice,
        logger: &Logger,
    ) -> VulkanResult<Self>
    where
        S: PhysicalDeviceSource + ?Sized,
        P: PresentSupport + ?Sized,
    {
        let mut indices = Self::default();

        for family in source.queue_families(device) {
            let graphics = family.supports_graphics();
            if graphics && indices.graphics_family.is_none() {
                indices.graphics_family = Some(family.index);
            }

            let present = surface.supports_present(device, family.index)?;
            if present && indices.present_family.is_none() {
                indices.present_family = Some(family.index);
            }

            logger.write(
                Severity::Verbose,
                &format!(
                    "  queue family {}: {:?} x{} graphics={} present={}",
                    family.index, family.flags, family.queue_count, graphics, present
                ),
            );
        }

        Ok(indices)
    }
}

impl fmt::Display for QueueFamilyIndices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn slot(index: Option<u32>) -> String {
            index.map_or_else(|| "none".to_string(), |i| i.to_string())
        }
        write!(
            f,
            "graphics: {}, present: {}",
            slot(self.graphics_family),
            slot(self.present_family)
        )
    }
}
