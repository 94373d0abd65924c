//! Load-time initialization
//!
//! Runs from `.init_array` with priority 101, so it executes while the
//! dynamic loader initializes this library, before the host program's own
//! constructors and `main`, and so before the host can register its own
//! fault handlers. Order: logging, config, primitive resolution, handler
//! installation, and only then arming the guard.

use std::ffi::c_int;
use std::io;

use sigshield_core::{load_config, Config};
use thiserror::Error;

use crate::state::ShieldState;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "SIGSHIELD_LOG";

/// Environment variable controlling log colors
pub const LOG_STYLE_ENV: &str = "SIGSHIELD_LOG_STYLE";

/// Initialization errors
#[derive(Debug, Error)]
pub enum InitError {
    #[error("real sigaction could not be resolved")]
    Unresolved,

    #[error("Failed to install handler for signal {signal}: {source}")]
    Install {
        signal: c_int,
        #[source]
        source: io::Error,
    },

    #[error("fault correction is not supported on this architecture")]
    Unsupported,
}

/// Set up `env_logger` on `SIGSHIELD_LOG`, defaulting to warnings only
///
/// A logger the host already installed is left alone.
pub fn init_logging() {
    let env = env_logger::Env::new()
        .filter_or(LOG_ENV, "warn")
        .write_style(LOG_STYLE_ENV);
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Configure `state`, install the handlers and arm the guard
///
/// A broken config file is reported and replaced by defaults.
pub fn initialize(state: &ShieldState) -> Result<(), InitError> {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Ignoring sigshield config: {}", e);
            Config::default()
        }
    };
    state.configure(&config);

    if !state.primitives.resolve_all() {
        log::warn!(
            "Some libc primitives could not be resolved; affected calls will fail with ENOSYS"
        );
    }

    install_and_arm(state, config.guard.enabled)
}

#[cfg(target_arch = "x86_64")]
fn install_and_arm(state: &ShieldState, arm: bool) -> Result<(), InitError> {
    let real = state.primitives.sigaction().ok_or(InitError::Unresolved)?;
    unsafe { crate::handlers::install_handlers(&state.guard, real)? };

    if arm {
        state.guard.arm();
        log::info!("Fault handlers installed and locked for SIGSEGV, SIGTRAP, SIGILL");
    } else {
        log::info!("Fault handlers installed; guard disabled by config");
    }
    Ok(())
}

#[cfg(not(target_arch = "x86_64"))]
fn install_and_arm(_state: &ShieldState, _arm: bool) -> Result<(), InitError> {
    Err(InitError::Unsupported)
}

#[cfg(not(test))]
extern "C" fn on_load() {
    init_logging();
    if let Err(e) = initialize(crate::state::state()) {
        log::error!("sigshield disabled: {}", e);
    }
}

#[cfg(not(test))]
#[used]
#[link_section = ".init_array.00101"]
static ON_LOAD: extern "C" fn() = on_load;
