//! Debug messenger wiring
//!
//! The runtime's user-data slot carries a [`SinkKey`] rather than a pointer.
//! The callback resolves the key through a process-wide slotmap registry, so
//! a message arriving for a sink that is already gone is simply logged and
//! dropped.

use std::borrow::Cow;
use std::ffi::{c_void, CStr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use ash::extensions::ext::DebugUtils;
use ash::vk;
use slotmap::{new_key_type, Key, KeyData, SlotMap};

use super::capability::contains_cstr;
use super::context::{ApiContext, VulkanError, VulkanResult};
use crate::foundation::logging::{Logger, Severity};

new_key_type! {
    /// Registry key of a [`DebugSink`]
    pub struct SinkKey;
}

/// Receives runtime diagnostic messages
#[derive(Debug)]
pub struct DebugSink {
    logger: Logger,
    counts: [AtomicU64; 4],
}

impl DebugSink {
    /// Create a sink writing through `logger`
    pub const fn new(logger: Logger) -> Self {
        Self {
            logger,
            counts: [AtomicU64::new(0), AtomicU64::new(0), AtomicU64::new(0), AtomicU64::new(0)],
        }
    }

    /// Record one message
    pub fn record(&self, severity: Severity, types: vk::DebugUtilsMessageTypeFlagsEXT, message: &str) {
        self.counts[severity as usize].fetch_add(1, Ordering::Relaxed);
        self.logger.write(severity, &format!("[Vulkan] {types:?} - {message}"));
    }

    /// Messages received at `severity`
    pub fn count(&self, severity: Severity) -> u64 {
        self.counts[severity as usize].load(Ordering::Relaxed)
    }

    /// Messages received at any severity
    pub fn total(&self) -> u64 {
        Severity::ALL.iter().map(|&severity| self.count(severity)).sum()
    }
}

fn registry() -> &'static Mutex<SlotMap<SinkKey, Arc<DebugSink>>> {
    static REGISTRY: OnceLock<Mutex<SlotMap<SinkKey, Arc<DebugSink>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(SlotMap::with_key()))
}

fn lookup(key: SinkKey) -> Option<Arc<DebugSink>> {
    let sinks = registry().lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    sinks.get(key).cloned()
}

/// A sink entered in the registry; removed again on drop
#[derive(Debug)]
pub struct SinkRegistration {
    key: SinkKey,
    sink: Arc<DebugSink>,
}

impl SinkRegistration {
    /// Enter `sink` in the registry
    pub fn register(sink: DebugSink) -> Self {
        let sink = Arc::new(sink);
        let key = registry()
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(Arc::clone(&sink));
        Self { key, sink }
    }

    /// Key passed through the runtime's user-data slot
    pub const fn key(&self) -> SinkKey {
        self.key
    }

    /// The registered sink
    pub fn sink(&self) -> &DebugSink {
        &self.sink
    }
}

impl Drop for SinkRegistration {
    fn drop(&mut self) {
        registry()
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(self.key);
    }
}

/// Map runtime severity bits to a logger severity
pub fn severity_from_vk(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Severity {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        Severity::Error
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        Severity::Warning
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        Severity::Info
    } else {
        Severity::Verbose
    }
}

/// Messenger description routed to the sink registered under `key`
///
/// Subscribes to every severity and to general, validation and performance
/// messages.
pub fn messenger_create_info(key: SinkKey) -> vk::DebugUtilsMessengerCreateInfoEXT {
    vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback))
        .user_data(key.data().as_ffi() as *mut c_void)
        .build()
}

/// Debug callback for validation layers
///
/// Never asks the runtime to abort the triggering call.
pub(crate) unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    user_data: *mut c_void,
) -> vk::Bool32 {
    let message = if callback_data.is_null() || (*callback_data).p_message.is_null() {
        Cow::from("")
    } else {
        CStr::from_ptr((*callback_data).p_message).to_string_lossy()
    };
    let severity = severity_from_vk(message_severity);

    let key = SinkKey::from(KeyData::from_ffi(user_data as u64));
    match lookup(key) {
        Some(sink) => sink.record(severity, message_type, &message),
        None => log::debug!("[Vulkan] message for unregistered sink: {}", message),
    }

    vk::FALSE
}

/// Debug messenger attached to a live instance
pub struct DebugChannel {
    loader: DebugUtils,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugChannel {
    /// Attach a messenger routed to the context's debug sink
    pub fn attach(context: &ApiContext) -> VulkanResult<Self> {
        let key = context.debug_sink_key().ok_or(VulkanError::ExtensionNotPresent)?;
        if !contains_cstr(context.enabled_extensions(), DebugUtils::name()) {
            return Err(VulkanError::ExtensionNotPresent);
        }

        let loader = DebugUtils::new(context.entry(), context.instance());
        let create_info = messenger_create_info(key);
        let messenger = unsafe {
            loader
                .create_debug_utils_messenger(&create_info, None)
                .map_err(|result| match result {
                    vk::Result::ERROR_EXTENSION_NOT_PRESENT => VulkanError::ExtensionNotPresent,
                    other => VulkanError::Api(other),
                })?
        };
        log::debug!("Debug messenger attached");

        Ok(Self { loader, messenger })
    }

    /// Raw messenger handle
    pub const fn handle(&self) -> vk::DebugUtilsMessengerEXT {
        self.messenger
    }
}

impl Drop for DebugChannel {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_debug_utils_messenger(self.messenger, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::ptr;

    fn fire(severity: vk::DebugUtilsMessageSeverityFlagsEXT, key: SinkKey, text: &str) -> vk::Bool32 {
        let message = CString::new(text).unwrap();
        let data = vk::DebugUtilsMessengerCallbackDataEXT {
            p_message: message.as_ptr(),
            ..Default::default()
        };
        unsafe {
            debug_callback(
                severity,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                &data,
                key.data().as_ffi() as *mut c_void,
            )
        }
    }

    #[test]
    fn test_callback_routes_by_key_and_never_aborts() {
        let registration = SinkRegistration::register(DebugSink::new(Logger::disabled()));
        let key = registration.key();

        assert_eq!(fire(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR, key, "bad"), vk::FALSE);
        assert_eq!(fire(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING, key, "hmm"), vk::FALSE);
        assert_eq!(fire(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE, key, "chatter"), vk::FALSE);

        let sink = registration.sink();
        assert_eq!(sink.count(Severity::Error), 1);
        assert_eq!(sink.count(Severity::Warning), 1);
        assert_eq!(sink.count(Severity::Verbose), 1);
        assert_eq!(sink.count(Severity::Info), 0);
        assert_eq!(sink.total(), 3);
    }

    #[test]
    fn test_callback_after_unregister_is_harmless() {
        let registration = SinkRegistration::register(DebugSink::new(Logger::disabled()));
        let key = registration.key();
        drop(registration);

        assert!(lookup(key).is_none());
        assert_eq!(fire(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR, key, "late"), vk::FALSE);
    }

    #[test]
    fn test_callback_tolerates_null_data() {
        let registration = SinkRegistration::register(DebugSink::new(Logger::disabled()));
        let result = unsafe {
            debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
                ptr::null(),
                registration.key().data().as_ffi() as *mut c_void,
            )
        };
        assert_eq!(result, vk::FALSE);
        assert_eq!(registration.sink().count(Severity::Info), 1);
    }

    #[test]
    fn test_severity_mapping() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as Flags;
        assert_eq!(severity_from_vk(Flags::VERBOSE), Severity::Verbose);
        assert_eq!(severity_from_vk(Flags::INFO), Severity::Info);
        assert_eq!(severity_from_vk(Flags::WARNING), Severity::Warning);
        assert_eq!(severity_from_vk(Flags::ERROR), Severity::Error);
        assert_eq!(severity_from_vk(Flags::empty()), Severity::Verbose);
    }

    #[test]
    fn test_create_info_carries_key() {
        let registration = SinkRegistration::register(DebugSink::new(Logger::disabled()));
        let info = messenger_create_info(registration.key());

        assert_eq!(info.p_user_data as u64, registration.key().data().as_ffi());
        assert!(info.pfn_user_callback.is_some());
        assert!(info.message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE));
        assert!(info.message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE));
    }
}
