//! # VK Bootstrap
//!
//! Brings a Vulkan application up to the point where it could start
//! rendering: a window, an instance with optional validation, a presentation
//! surface, the best suitable GPU and a logical device with graphics and
//! present queues.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vk_bootstrap::prelude::*;
//!
//! fn main() -> Result<(), AppError> {
//!     let config = AppConfig::default();
//!     logging::init(&config.build);
//!     LifecycleController::new(config).run()
//! }
//! ```

// Shared configuration types
pub mod core;

pub mod config;
pub mod foundation;
pub mod backend;

mod application;

pub use application::{AppError, AppResult, LifecycleController, LifecycleState, StartupStages, VulkanStages};

/// Common imports for bootstrap users
pub mod prelude {
    pub use crate::{
        AppError, AppResult, LifecycleController, LifecycleState,
        backend::vulkan::{
            ApiContext, DeviceSelector, LogicalDevice, PresentationSurface,
            VulkanError, VulkanResult, Window, WindowError,
        },
        core::config::{AppConfig, ApplicationDescriptor, BuildConfig, Version, WindowConfig},
        config::{Config, ConfigError},
        foundation::logging::{self, Logger, Severity},
    };
}
