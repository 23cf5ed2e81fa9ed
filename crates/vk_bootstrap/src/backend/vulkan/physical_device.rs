//! Physical device scoring and selection
//!
//! Every enumerated device is evaluated the same way: its properties and
//! features produce a score, its queue families are resolved against the
//! presentation surface, and its extension list is checked against the
//! required device extensions. Only devices that pass the hard requirements
//! compete on score.

use std::fmt;

use ash::vk;

use super::capability::{missing_names, name_from_raw, PhysicalDeviceSource, PresentSupport};
use super::context::{VulkanError, VulkanResult};
use super::queue_family::QueueFamilyIndices;
use crate::foundation::logging::{Logger, Severity};

/// Score given to a device; `<= 0` means unusable, higher is better
pub type DeviceScore = i64;

/// Bonus for hardware-backed (integrated, discrete, virtual) accelerators
pub const GPU_CLASS_BONUS: DeviceScore = 1000;

/// Kind of accelerator a physical device reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    /// GPU sharing memory with the host
    Integrated,
    /// Dedicated GPU
    Discrete,
    /// GPU exposed through virtualization
    Virtual,
    /// Software rasterizer running on the CPU
    Cpu,
    /// Anything else
    Other,
}

impl DeviceClass {
    /// Whether this class earns the GPU bonus
    pub const fn is_gpu(self) -> bool {
        matches!(self, Self::Integrated | Self::Discrete | Self::Virtual)
    }
}

impl From<vk::PhysicalDeviceType> for DeviceClass {
    fn from(device_type: vk::PhysicalDeviceType) -> Self {
        match device_type {
            vk::PhysicalDeviceType::INTEGRATED_GPU => Self::Integrated,
            vk::PhysicalDeviceType::DISCRETE_GPU => Self::Discrete,
            vk::PhysicalDeviceType::VIRTUAL_GPU => Self::Virtual,
            vk::PhysicalDeviceType::CPU => Self::Cpu,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integrated => "integrated",
            Self::Discrete => "discrete",
            Self::Virtual => "virtual",
            Self::Cpu => "cpu",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Device properties relevant to selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProperties {
    /// Driver-reported device name
    pub name: String,
    /// Accelerator class
    pub class: DeviceClass,
    /// Largest supported 2D image dimension
    pub max_image_dimension_2d: u32,
    /// Largest supported 3D image dimension
    pub max_image_dimension_3d: u32,
}

impl From<&vk::PhysicalDeviceProperties> for DeviceProperties {
    fn from(properties: &vk::PhysicalDeviceProperties) -> Self {
        Self {
            name: name_from_raw(&properties.device_name),
            class: properties.device_type.into(),
            max_image_dimension_2d: properties.limits.max_image_dimension2_d,
            max_image_dimension_3d: properties.limits.max_image_dimension3_d,
        }
    }
}

/// Device feature flags relevant to selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceFeatures {
    /// Geometry shader stage support
    pub geometry_shader: bool,
}

impl From<&vk::PhysicalDeviceFeatures> for DeviceFeatures {
    fn from(features: &vk::PhysicalDeviceFeatures) -> Self {
        Self {
            geometry_shader: features.geometry_shader == vk::TRUE,
        }
    }
}

/// Rate a device for ranking
///
/// Devices without geometry shaders always score 0. Otherwise the score is
/// the 3D image limit plus [`GPU_CLASS_BONUS`] for GPU-class devices.
pub fn rate_device(properties: &DeviceProperties, features: &DeviceFeatures) -> DeviceScore {
    if !features.geometry_shader {
        return 0;
    }
    let bonus = if properties.class.is_gpu() { GPU_CLASS_BONUS } else { 0 };
    DeviceScore::from(properties.max_image_dimension_3d) + bonus
}

/// Everything learned about one candidate during a selection pass
#[derive(Debug, Clone)]
pub struct CandidateReport {
    /// Physical device handle
    pub device: vk::PhysicalDevice,
    /// Queried properties
    pub properties: DeviceProperties,
    /// Queried features
    pub features: DeviceFeatures,
    /// Ranking score
    pub score: DeviceScore,
    /// Resolved queue families
    pub queue_families: QueueFamilyIndices,
    /// Required device extensions the device lacks
    pub missing_extensions: Vec<String>,
}

impl CandidateReport {
    /// Whether the device satisfies every hard requirement
    pub fn is_eligible(&self) -> bool {
        self.rejection_reason().is_none()
    }

    /// Why the device cannot be selected, if it cannot
    pub fn rejection_reason(&self) -> Option<String> {
        if !self.queue_families.is_complete() {
            return Some(format!("incomplete queue families ({})", self.queue_families));
        }
        if !self.missing_extensions.is_empty() {
            return Some(format!("missing device extensions: {}", self.missing_extensions.join(", ")));
        }
        if self.score <= 0 {
            return Some("unusable score".to_string());
        }
        None
    }
}

/// The physical device chosen for logical device creation
#[derive(Debug, Clone)]
pub struct SelectedDevice {
    /// Physical device handle
    pub device: vk::PhysicalDevice,
    /// Properties at selection time
    pub properties: DeviceProperties,
    /// Score it won with
    pub score: DeviceScore,
    /// Queue families it will use, always complete
    pub queue_families: QueueFamilyIndices,
}

impl From<CandidateReport> for SelectedDevice {
    fn from(report: CandidateReport) -> Self {
        Self {
            device: report.device,
            properties: report.properties,
            score: report.score,
            queue_families: report.queue_families,
        }
    }
}

/// Scores, filters and picks a physical device
pub struct DeviceSelector<'a> {
    required_extensions: &'a [String],
    logger: Logger,
}

impl<'a> DeviceSelector<'a> {
    /// Create a selector requiring the given device extensions
    pub const fn new(required_extensions: &'a [String], logger: Logger) -> Self {
        Self { required_extensions, logger }
    }

    /// Query and judge a single candidate
    pub fn evaluate<S, P>(&self, source: &S, surface: &P, device: vk::PhysicalDevice) -> VulkanResult<CandidateReport>
    where
        S: PhysicalDeviceSource + ?Sized,
        P: PresentSupport + ?Sized,
    {
        let properties = source.device_properties(device);
        let features = source.device_features(device);
        let score = rate_device(&properties, &features);

        let queue_families = QueueFamilyIndices::resolve(source, surface, device, &self.logger)?;

        let available = source.device_extensions(device)?;
        let missing_extensions = missing_names(&available, self.required_extensions)
            .into_iter()
            .map(str::to_owned)
            .collect();

        Ok(CandidateReport {
            device,
            properties,
            features,
            score,
            queue_families,
            missing_extensions,
        })
    }

    /// Select the best eligible device
    ///
    /// Ties on score go to the device enumerated first.
    pub fn select<S, P>(&self, source: &S, surface: &P) -> VulkanResult<SelectedDevice>
    where
        S: PhysicalDeviceSource + ?Sized,
        P: PresentSupport + ?Sized,
    {
        let devices = source.physical_devices()?;
        if devices.is_empty() {
            return Err(VulkanError::NoGpuFound);
        }

        let mut best: Option<CandidateReport> = None;
        for device in devices {
            let report = self.evaluate(source, surface, device)?;
            self.log_candidate(&report);

            if !report.is_eligible() {
                continue;
            }
            if best.as_ref().map_or(true, |current| report.score > current.score) {
                best = Some(report);
            }
        }

        let selected = best.map(SelectedDevice::from).ok_or(VulkanError::NoSuitableGpu)?;
        log::info!("Selected GPU: {} (score {})", selected.properties.name, selected.score);
        Ok(selected)
    }

    fn log_candidate(&self, report: &CandidateReport) {
        let properties = &report.properties;
        let line = format!(
            "{}: {} [{}] 2D {} / 3D {}, geometry shader: {}",
            report.score,
            properties.name,
            properties.class,
            properties.max_image_dimension_2d,
            properties.max_image_dimension_3d,
            report.features.geometry_shader,
        );
        match report.rejection_reason() {
            None => self.logger.write(Severity::Info, &line),
            Some(reason) => self.logger.write(Severity::Warning, &format!("{line} - skipped: {reason}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties(class: DeviceClass, max_3d: u32) -> DeviceProperties {
        DeviceProperties {
            name: "test".to_string(),
            class,
            max_image_dimension_2d: 8192,
            max_image_dimension_3d: max_3d,
        }
    }

    const GEOMETRY: DeviceFeatures = DeviceFeatures { geometry_shader: true };
    const NO_GEOMETRY: DeviceFeatures = DeviceFeatures { geometry_shader: false };

    #[test]
    fn test_no_geometry_shader_scores_zero() {
        for class in [DeviceClass::Discrete, DeviceClass::Integrated, DeviceClass::Cpu, DeviceClass::Other] {
            for max_3d in [0, 1, 2048, u32::MAX] {
                assert_eq!(rate_device(&properties(class, max_3d), &NO_GEOMETRY), 0);
            }
        }
    }

    #[test]
    fn test_score_formula() {
        assert_eq!(rate_device(&properties(DeviceClass::Discrete, 4096), &GEOMETRY), 5096);
        assert_eq!(rate_device(&properties(DeviceClass::Integrated, 2048), &GEOMETRY), 3048);
        assert_eq!(rate_device(&properties(DeviceClass::Virtual, 256), &GEOMETRY), 1256);
        assert_eq!(rate_device(&properties(DeviceClass::Cpu, 2048), &GEOMETRY), 2048);
        assert_eq!(rate_device(&properties(DeviceClass::Other, 0), &GEOMETRY), 0);
    }

    #[test]
    fn test_score_increases_with_3d_limit() {
        for class in [DeviceClass::Discrete, DeviceClass::Cpu] {
            let mut previous = rate_device(&properties(class, 0), &GEOMETRY);
            for max_3d in [1, 16, 2048, 2049, u32::MAX] {
                let score = rate_device(&properties(class, max_3d), &GEOMETRY);
                assert!(score > previous);
                previous = score;
            }
        }
    }

    #[test]
    fn test_gpu_bonus_is_exactly_1000() {
        for gpu in [DeviceClass::Integrated, DeviceClass::Discrete, DeviceClass::Virtual] {
            for non_gpu in [DeviceClass::Cpu, DeviceClass::Other] {
                let gpu_score = rate_device(&properties(gpu, 1024), &GEOMETRY);
                let other_score = rate_device(&properties(non_gpu, 1024), &GEOMETRY);
                assert_eq!(gpu_score - other_score, GPU_CLASS_BONUS);
            }
        }
    }

    #[test]
    fn test_device_class_from_vk() {
        assert_eq!(DeviceClass::from(vk::PhysicalDeviceType::DISCRETE_GPU), DeviceClass::Discrete);
        assert_eq!(DeviceClass::from(vk::PhysicalDeviceType::INTEGRATED_GPU), DeviceClass::Integrated);
        assert_eq!(DeviceClass::from(vk::PhysicalDeviceType::VIRTUAL_GPU), DeviceClass::Virtual);
        assert_eq!(DeviceClass::from(vk::PhysicalDeviceType::CPU), DeviceClass::Cpu);
        assert_eq!(DeviceClass::from(vk::PhysicalDeviceType::OTHER), DeviceClass::Other);
    }

    #[test]
    fn test_rejection_reasons() {
        let mut report = CandidateReport {
            device: vk::PhysicalDevice::null(),
            properties: properties(DeviceClass::Discrete, 2048),
            features: GEOMETRY,
            score: 3048,
            queue_families: QueueFamilyIndices { graphics_family: Some(0), present_family: None },
            missing_extensions: Vec::new(),
        };
        assert!(report.rejection_reason().unwrap().contains("queue families"));

        report.queue_families.present_family = Some(1);
        assert!(report.is_eligible());

        report.missing_extensions.push("VK_KHR_swapchain".to_string());
        assert!(report.rejection_reason().unwrap().contains("VK_KHR_swapchain"));

        report.missing_extensions.clear();
        report.score = 0;
        assert!(!report.is_eligible());
    }
}
