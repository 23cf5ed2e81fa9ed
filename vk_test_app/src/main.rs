//! VK Test
//!
//! Opens a 500x500 window, brings Vulkan up on the best GPU and waits for
//! the window to close or Escape to be pressed.
//!
//! Usage: `vk_test [config.toml|config.ron]`

use std::process::ExitCode;

use vk_bootstrap::prelude::*;

fn load_config() -> Result<AppConfig, ConfigError> {
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from_file(&path)?,
        None => AppConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn main() -> ExitCode {
    // Set up panic hook for better error reporting
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC occurred: {}", panic_info);
    }));

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", AppError::from(e));
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.build);
    log::info!("Starting {} {}", config.application.name, config.application.version);

    let mut controller = LifecycleController::new(config);
    match controller.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
