//! # Backend Module
//!
//! Concrete platform backends. The only backend is Vulkan on top of a GLFW
//! window.

pub mod vulkan;
