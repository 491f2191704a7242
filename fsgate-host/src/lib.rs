// SPDX-License-Identifier: AGPL-3.0-or-later
//! Host integration for fsgate
//!
//! Embedding runtimes reach the filesystem facade in one of two ways:
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │        Host runtime (JS engine, app shell)    │
//! ├───────────────────────────────────────────────┤
//! │   C ABI (ffi.rs)   │   Rust hosts (registry)  │
//! ├───────────────────────────────────────────────┤
//! │  ModuleRegistry: (name, ApiVersion) → module  │
//! ├───────────────────────────────────────────────┤
//! │   FileSystemModule → fsgate_local::FileSystem │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! Calls are asynchronous and settle a [`Promise`] exactly once.

pub mod error;
pub mod ffi;
pub mod module;
pub mod promise;
pub mod registry;

pub use error::{FfiStatus, HostError, HostResult};
pub use module::{ExportedModule, FileSystemModule};
pub use promise::{Promise, Rejection};
pub use registry::{ApiVersion, ModuleRegistry};

use once_cell::sync::OnceCell;
use tokio::runtime::Runtime;

/// Runtime shared by every call made through the C ABI
static RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// Start the shared runtime if it is not running yet.
pub fn init_runtime() -> HostResult<&'static Runtime> {
    RUNTIME.get_or_try_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("fsgate-worker")
            .enable_all()
            .build()
            .map_err(|e| HostError::Ffi(format!("failed to start runtime: {e}")))
    })
}

pub fn runtime() -> HostResult<&'static Runtime> {
    RUNTIME.get().ok_or(HostError::NotInitialized)
}

/// Initialize logging and the shared runtime
///
/// Must be called before `fsgate_call`. Safe to call more than once.
#[no_mangle]
pub extern "C" fn fsgate_init() -> i32 {
    #[cfg(debug_assertions)]
    {
        use tracing_subscriber::prelude::*;
        let _ = tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .try_init();
    }

    match init_runtime() {
        Ok(_) => {
            tracing::info!("fsgate initialized");
            FfiStatus::Success as i32
        }
        Err(e) => {
            tracing::error!("{e}");
            FfiStatus::from(&e) as i32
        }
    }
}

/// Drop every registered module
///
/// The runtime keeps running until the process exits; in-flight calls still
/// settle.
#[no_mangle]
pub extern "C" fn fsgate_shutdown() {
    tracing::info!("fsgate shutting down");
    ffi::clear();
}
