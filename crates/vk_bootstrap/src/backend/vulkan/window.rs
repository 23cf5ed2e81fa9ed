//! GLFW-based window management
//!
//! Opens the window the surface is bound to, reports the instance
//! extensions GLFW needs, and turns key and close events into a close
//! request the event loop can poll.

use glfw::{Action, Key, WindowEvent};
use thiserror::Error;

use crate::core::config::WindowConfig;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// GLFW could not create the window
    #[error("Window creation failed")]
    CreationFailed,

    /// Any other GLFW failure
    #[error("GLFW error: {0}")]
    GlfwError(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// Key callback; returning `true` requests the window to close
pub type KeyHandler = Box<dyn FnMut(Key, Action) -> bool>;

/// Default key handler: Escape closes the window
pub fn close_on_escape(key: Key, action: Action) -> bool {
    key == Key::Escape && action == Action::Press
}

/// Minimal window contract the event loop needs
pub trait WindowBackend {
    /// Whether closing was requested
    fn should_close(&self) -> bool;

    /// Process pending window events
    fn poll_events(&mut self);
}

/// Poll `window` until it asks to close; returns the number of polls
pub fn run_event_loop<W: WindowBackend + ?Sized>(window: &mut W) -> u64 {
    let mut polls = 0;
    while !window.should_close() {
        window.poll_events();
        polls += 1;
    }
    polls
}

/// GLFW window wrapper with proper resource management
pub struct Window {
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, WindowEvent)>,
    key_handler: Option<KeyHandler>,
    glfw: glfw::Glfw,
}

impl Window {
    /// Open a window with no client API, titled after the application
    pub fn open(title: &str, config: &WindowConfig) -> WindowResult<Self> {
        // Errors are logged only; the Option/Result returns carry the failure
        let mut glfw = glfw::init(glfw::log_errors)
            .map_err(|_| WindowError::InitializationFailed)?;

        // Configure for Vulkan (no OpenGL context)
        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(config.resizable));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        log::info!("Opened {}x{} window \"{}\"", config.width, config.height, title);

        Ok(Self {
            window,
            events,
            key_handler: None,
            glfw,
        })
    }

    /// Install the key callback consulted on every polled key event
    pub fn set_key_handler<F>(&mut self, handler: F)
    where
        F: FnMut(Key, Action) -> bool + 'static,
    {
        self.key_handler = Some(Box::new(handler));
    }

    /// Get required Vulkan instance extensions from GLFW
    pub fn get_required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| WindowError::GlfwError("Vulkan is not supported by GLFW on this host".to_string()))
    }

    /// Create Vulkan surface using GLFW's built-in functionality
    pub fn create_vulkan_surface(&self, instance: ash::vk::Instance) -> WindowResult<ash::vk::SurfaceKHR> {
        let mut surface = ash::vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == ash::vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::GlfwError(format!("Failed to create Vulkan surface: {:?}", result)))
        }
    }
}

impl WindowBackend for Window {
    fn should_close(&self) -> bool {
        self.window.should_close()
    }

    fn poll_events(&mut self) {
        self.glfw.poll_events();
        for (_, event) in glfw::flush_messages(&self.events) {
            match event {
                WindowEvent::Key(key, _, action, _) => {
                    if let Some(handler) = self.key_handler.as_mut() {
                        if handler(key, action) {
                            self.window.set_should_close(true);
                        }
                    }
                }
                WindowEvent::Close => self.window.set_should_close(true),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedWindow {
        close_after: u64,
        polled: u64,
    }

    impl WindowBackend for ScriptedWindow {
        fn should_close(&self) -> bool {
            self.polled >= self.close_after
        }

        fn poll_events(&mut self) {
            self.polled += 1;
        }
    }

    #[test]
    fn test_escape_press_closes() {
        assert!(close_on_escape(Key::Escape, Action::Press));
        assert!(!close_on_escape(Key::Escape, Action::Release));
        assert!(!close_on_escape(Key::Escape, Action::Repeat));
        assert!(!close_on_escape(Key::Space, Action::Press));
    }

    #[test]
    fn test_open_reports_failure_instead_of_panicking() {
        // Headless hosts must get an error value back, not an abort
        match Window::open("window test", &WindowConfig::default()) {
            Ok(window) => assert!(!window.should_close()),
            Err(e) => assert!(matches!(e, WindowError::InitializationFailed | WindowError::CreationFailed)),
        }
    }

    #[test]
    fn test_event_loop_polls_until_close() {
        let mut window = ScriptedWindow { close_after: 3, polled: 0 };
        assert_eq!(run_event_loop(&mut window), 3);

        let mut closed = ScriptedWindow { close_after: 0, polled: 0 };
        assert_eq!(run_event_loop(&mut closed), 0);
    }
}
