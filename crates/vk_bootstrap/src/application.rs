//! Application lifecycle management
//!
//! [`LifecycleController`] walks the bootstrap sequence one state at a time,
//! keeps every resource it built alive while the window is open, and tears
//! them down in reverse order on exit or on the first startup failure.
//!
//! The resources themselves come from a [`StartupStages`] implementation.
//! [`VulkanStages`] is the real one; anything else can stand in for it as
//! long as it builds the stages in the same order.

use std::fmt;

use thiserror::Error;

use crate::backend::vulkan::context::{ApiContext, InstanceRequirements, VulkanError};
use crate::backend::vulkan::debug::{DebugChannel, DebugSink};
use crate::backend::vulkan::logical_device::LogicalDevice;
use crate::backend::vulkan::physical_device::DeviceSelector;
use crate::backend::vulkan::surface::PresentationSurface;
use crate::backend::vulkan::window::{close_on_escape, run_event_loop, Window, WindowBackend, WindowError};
use crate::config::ConfigError;
use crate::core::config::AppConfig;
use crate::foundation::logging::Logger;

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Vulkan error propagated to application level
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] VulkanError),

    /// Window system error
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for application operations
pub type AppResult<T> = Result<T, AppError>;

/// Bootstrap progress, strictly in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    /// Nothing created yet
    Uninitialized,
    /// Window is open
    WindowOpen,
    /// Instance exists, debug channel attached if validating
    ApiReady,
    /// Surface is bound to the window
    SurfaceReady,
    /// Logical device and queues exist
    DeviceReady,
    /// Event loop is running
    Running,
    /// Everything has been torn down
    Terminated,
}

impl LifecycleState {
    /// The state after this one; `Terminated` is final
    pub const fn next(self) -> Self {
        match self {
            Self::Uninitialized => Self::WindowOpen,
            Self::WindowOpen => Self::ApiReady,
            Self::ApiReady => Self::SurfaceReady,
            Self::SurfaceReady => Self::DeviceReady,
            Self::DeviceReady => Self::Running,
            Self::Running | Self::Terminated => Self::Terminated,
        }
    }

    /// Whether the controller has finished
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Terminated)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Builds each startup resource, in the order the controller calls them
///
/// Every associated type releases its resource on drop.
pub trait StartupStages {
    /// Window the event loop polls
    type Window: WindowBackend;
    /// API instance
    type Context;
    /// Debug messenger
    type DebugChannel;
    /// Presentation surface
    type Surface;
    /// Logical device with its queues
    type Device;

    /// Open the window
    fn open_window(&mut self, config: &AppConfig) -> AppResult<Self::Window>;

    /// Create the API instance for `window`
    fn create_context(&mut self, window: &Self::Window, config: &AppConfig) -> AppResult<Self::Context>;

    /// Attach a debug channel when the context was created with one
    fn attach_debug_channel(&mut self, context: &Self::Context) -> AppResult<Option<Self::DebugChannel>>;

    /// Bind `window` to the context
    fn create_surface(&mut self, context: &Self::Context, window: &Self::Window) -> AppResult<Self::Surface>;

    /// Select a physical device and create the logical device on it
    fn create_device(
        &mut self,
        context: &Self::Context,
        surface: &Self::Surface,
        config: &AppConfig,
    ) -> AppResult<Self::Device>;

    /// Debug messages received so far
    fn debug_message_count(&self, _context: &Self::Context) -> u64 {
        0
    }
}

/// The GLFW + Vulkan startup stages
#[derive(Debug, Clone, Copy)]
pub struct VulkanStages {
    logger: Logger,
}

impl VulkanStages {
    /// Stages writing diagnostics through `logger`
    pub const fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl StartupStages for VulkanStages {
    type Window = Window;
    type Context = ApiContext;
    type DebugChannel = DebugChannel;
    type Surface = PresentationSurface;
    type Device = LogicalDevice;

    fn open_window(&mut self, config: &AppConfig) -> AppResult<Window> {
        let mut window = Window::open(&config.application.name, &config.window)?;
        window.set_key_handler(close_on_escape);
        Ok(window)
    }

    fn create_context(&mut self, window: &Window, config: &AppConfig) -> AppResult<ApiContext> {
        let requirements = InstanceRequirements::for_window(window.get_required_instance_extensions()?, config);
        Ok(ApiContext::create(&config.application, &requirements, self.logger)?)
    }

    fn attach_debug_channel(&mut self, context: &ApiContext) -> AppResult<Option<DebugChannel>> {
        if context.debug_sink_key().is_none() {
            return Ok(None);
        }
        let channel = DebugChannel::attach(context)?;
        log::debug!("Debug messenger {:?} attached", channel.handle());
        Ok(Some(channel))
    }

    fn create_surface(&mut self, context: &ApiContext, window: &Window) -> AppResult<PresentationSurface> {
        let surface = PresentationSurface::create(context, window)?;
        log::debug!("Surface {:?} bound to the window", surface.handle());
        Ok(surface)
    }

    fn create_device(
        &mut self,
        context: &ApiContext,
        surface: &PresentationSurface,
        config: &AppConfig,
    ) -> AppResult<LogicalDevice> {
        let selector = DeviceSelector::new(&config.device_extensions, self.logger);
        let selected = selector.select(context, surface)?;
        let device = LogicalDevice::create(
            context,
            selected.device,
            &selected.queue_families,
            &config.device_extensions,
            self.logger,
        )?;
        log::info!(
            "Running on {} (graphics family {}, present family {})",
            selected.properties.name,
            device.graphics_queue().family_index,
            device.present_queue().family_index
        );
        Ok(device)
    }

    fn debug_message_count(&self, context: &ApiContext) -> u64 {
        context.debug_sink().map_or(0, DebugSink::total)
    }
}

/// Everything alive while the application runs
///
/// Fields drop top to bottom, which is the reverse of creation order.
struct Session<S: StartupStages> {
    _device: S::Device,
    _surface: S::Surface,
    _debug_channel: Option<S::DebugChannel>,
    context: S::Context,
    window: S::Window,
}

/// Drives the bootstrap sequence and the event loop
pub struct LifecycleController {
    config: AppConfig,
    logger: Logger,
    state: LifecycleState,
    history: Vec<LifecycleState>,
}

impl LifecycleController {
    /// Create a controller for `config`; nothing is created until [`run`](Self::run)
    pub fn new(config: AppConfig) -> Self {
        let logger = Logger::new(&config.build);
        Self {
            config,
            logger,
            state: LifecycleState::Uninitialized,
            history: vec![LifecycleState::Uninitialized],
        }
    }

    /// Current lifecycle state
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Every state entered so far, oldest first
    pub fn history(&self) -> &[LifecycleState] {
        &self.history
    }

    /// Configuration the controller runs with
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Bring up the window and Vulkan, loop until the window closes, then tear down
    pub fn run(&mut self) -> AppResult<()> {
        let mut stages = VulkanStages::new(self.logger);
        self.run_with(&mut stages)
    }

    /// Run the lifecycle with resources built by `stages`
    ///
    /// On a startup failure the resources built so far are released in
    /// reverse order before the error is returned, and the controller moves
    /// straight to `Terminated`.
    pub fn run_with<S: StartupStages>(&mut self, stages: &mut S) -> AppResult<()> {
        if self.state != LifecycleState::Uninitialized {
            return Err(VulkanError::InvalidOperation {
                reason: format!("controller already ran (state {})", self.state),
            }
            .into());
        }

        let mut session = match self.start(stages) {
            Ok(session) => session,
            Err(e) => {
                log::error!("Startup failed in state {}: {}", self.state, e);
                self.enter(LifecycleState::Terminated);
                return Err(e);
            }
        };

        self.enter(LifecycleState::Running);
        let polls = run_event_loop(&mut session.window);
        log::debug!(
            "Event loop finished after {} polls, {} debug messages received",
            polls,
            stages.debug_message_count(&session.context)
        );

        drop(session);
        self.enter(LifecycleState::Terminated);
        log::info!("Shutdown complete");
        Ok(())
    }

    fn start<S: StartupStages>(&mut self, stages: &mut S) -> AppResult<Session<S>> {
        let window = stages.open_window(&self.config)?;
        self.enter(LifecycleState::WindowOpen);

        let context = stages.create_context(&window, &self.config)?;
        let debug_channel = stages.attach_debug_channel(&context)?;
        self.enter(LifecycleState::ApiReady);

        let surface = stages.create_surface(&context, &window)?;
        self.enter(LifecycleState::SurfaceReady);

        let device = stages.create_device(&context, &surface, &self.config)?;
        self.enter(LifecycleState::DeviceReady);

        Ok(Session {
            _device: device,
            _surface: surface,
            _debug_channel: debug_channel,
            context,
            window,
        })
    }

    fn enter(&mut self, next: LifecycleState) {
        log::debug!("Lifecycle: {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
    }
}
