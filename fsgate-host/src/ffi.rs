// SPDX-License-Identifier: AGPL-3.0-or-later
//! C FFI layer
//!
//! Strings cross the boundary as NUL-terminated UTF-8. Strings returned by
//! this module are owned by the caller and released with
//! `fsgate_string_free`. Strings passed to callbacks are only valid for the
//! duration of the callback.

use crate::error::{FfiStatus, HostError, HostResult};
use crate::module::FileSystemModule;
use crate::promise::{Promise, Rejection};
use crate::registry::{ApiVersion, ModuleRegistry};
use fsgate_core::{FileUri, RootDirectories};
use fsgate_local::FileSystem;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::sync::Arc;

/// Called with the JSON-encoded result
pub type ResolveCallback = extern "C" fn(context: *mut c_void, result_json: *const c_char);

/// Called with an error code such as `E_NOT_FOUND` and a message
pub type RejectCallback =
    extern "C" fn(context: *mut c_void, code: *const c_char, message: *const c_char);

static REGISTRY: Lazy<RwLock<ModuleRegistry>> = Lazy::new(|| RwLock::new(ModuleRegistry::new()));

/// Facades by version, for the synchronous entry points
static FACADES: Lazy<RwLock<HashMap<ApiVersion, Arc<FileSystem>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

pub(crate) fn clear() {
    REGISTRY.write().clear();
    FACADES.write().clear();
}

/// Opaque host pointer handed back to the callbacks
#[derive(Clone, Copy)]
struct HostContext(*mut c_void);

// SAFETY: the host promises the context stays valid, and may be used from
// any thread, until one of the two callbacks has run.
unsafe impl Send for HostContext {}

impl HostContext {
    fn get(self) -> *mut c_void {
        self.0
    }
}

unsafe fn c_str<'a>(ptr: *const c_char, what: &str) -> HostResult<&'a str> {
    if ptr.is_null() {
        return Err(HostError::InvalidArguments(format!("{what} is null")));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| HostError::InvalidArguments(format!("{what} is not valid UTF-8")))
}

unsafe fn c_version(ptr: *const c_char) -> HostResult<ApiVersion> {
    c_str(ptr, "version")?.parse()
}

fn into_c_string(s: String) -> *mut c_char {
    CString::new(s)
        .map(CString::into_raw)
        .unwrap_or(ptr::null_mut())
}

fn facade(version: ApiVersion) -> HostResult<Arc<FileSystem>> {
    FACADES
        .read()
        .get(&version)
        .cloned()
        .ok_or_else(|| HostError::UnknownModule {
            name: FileSystemModule::NAME.to_string(),
            version,
        })
}

fn status(err: &HostError) -> i32 {
    tracing::debug!(code = err.code(), error = %err, "ffi call failed");
    FfiStatus::from(err) as i32
}

/// Register the filesystem module for an API version
///
/// Registering a version again replaces its roots.
///
/// # Safety
/// All string parameters must be valid null-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn fsgate_module_register(
    version: *const c_char,
    document_dir: *const c_char,
    caches_dir: *const c_char,
    bundle_dir: *const c_char,
) -> i32 {
    let result = (|| -> HostResult<()> {
        let version = c_version(version)?;
        let roots = RootDirectories::new(
            c_str(document_dir, "document_dir")?,
            c_str(caches_dir, "caches_dir")?,
            c_str(bundle_dir, "bundle_dir")?,
        )?;
        let fs = Arc::new(FileSystem::new(roots));
        FACADES.write().insert(version, Arc::clone(&fs));
        REGISTRY
            .write()
            .register(version, Arc::new(FileSystemModule::new(fs)));
        Ok(())
    })();

    match result {
        Ok(()) => FfiStatus::Success as i32,
        Err(e) => status(&e),
    }
}

/// Call a module method asynchronously
///
/// `args_json` is a JSON array of positional arguments; null means none.
/// Exactly one of `resolve` or `reject` is called exactly once, possibly
/// before this function returns. The return value only reports whether the
/// call was dispatched.
///
/// # Safety
/// String parameters must be null or valid null-terminated strings.
/// `context` must stay valid until a callback has run.
#[no_mangle]
pub unsafe extern "C" fn fsgate_call(
    module: *const c_char,
    version: *const c_char,
    method: *const c_char,
    args_json: *const c_char,
    context: *mut c_void,
    resolve: ResolveCallback,
    reject: RejectCallback,
) -> i32 {
    let ctx = HostContext(context);
    let promise = Promise::new(
        move |value| {
            let json = CString::new(value.to_string()).unwrap_or_default();
            resolve(ctx.get(), json.as_ptr());
        },
        move |rejection: Rejection| {
            let code = CString::new(rejection.code).unwrap_or_default();
            let message = CString::new(rejection.message).unwrap_or_default();
            reject(ctx.get(), code.as_ptr(), message.as_ptr());
        },
    );

    let prepared = (|| -> HostResult<_> {
        let module = c_str(module, "module")?;
        let version = c_version(version)?;
        let method = c_str(method, "method")?;
        let args = if args_json.is_null() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(c_str(args_json, "args_json")?)?
        };
        let handle = crate::runtime()?.handle();
        Ok((module, version, method, args, handle))
    })();

    match prepared {
        Ok((module, version, method, args, handle)) => {
            // Lock released before any callback can run
            let found = REGISTRY.read().get_or_err(module, version);
            match found {
                Ok(m) => ModuleRegistry::dispatch_to(handle, m, method, args, promise),
                Err(e) => promise.settle(Err(e)),
            }
            FfiStatus::Success as i32
        }
        Err(e) => {
            let code = status(&e);
            promise.settle(Err(e));
            code
        }
    }
}

/// Permission bits for a path or `file://` URI: 1 = read, 2 = write
///
/// Returns a negative status on error.
///
/// # Safety
/// String parameters must be valid null-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn fsgate_permissions_for_path(
    version: *const c_char,
    path: *const c_char,
) -> i32 {
    let result = (|| -> HostResult<i32> {
        let fs = facade(c_version(version)?)?;
        let uri = FileUri::parse(c_str(path, "path")?)?;
        Ok(i32::from(fs.permissions_for_uri(&uri).bits()))
    })();

    result.unwrap_or_else(|e| status(&e))
}

/// Create a directory and its ancestors
///
/// Returns true when the path is a directory afterwards.
///
/// # Safety
/// String parameters must be valid null-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn fsgate_ensure_dir_exists(
    version: *const c_char,
    path: *const c_char,
) -> bool {
    let result = (|| -> HostResult<bool> {
        let fs = facade(c_version(version)?)?;
        let uri = FileUri::parse(c_str(path, "path")?)?;
        Ok(fs.ensure_dir_exists(uri.path()))
    })();

    result.unwrap_or_else(|e| {
        status(&e);
        false
    })
}

/// Generate a unique path inside `directory`
///
/// `extension` may be null. Returns null on error; free the result with
/// `fsgate_string_free`.
///
/// # Safety
/// String parameters must be null or valid null-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn fsgate_generate_path(
    version: *const c_char,
    directory: *const c_char,
    extension: *const c_char,
) -> *mut c_char {
    let result = (|| -> HostResult<String> {
        let fs = facade(c_version(version)?)?;
        let dir = FileUri::parse(c_str(directory, "directory")?)?;
        let ext = if extension.is_null() {
            ""
        } else {
            c_str(extension, "extension")?
        };
        Ok(fs
            .generate_path_in_directory(dir.path(), ext)
            .to_string_lossy()
            .into_owned())
    })();

    match result {
        Ok(path) => into_c_string(path),
        Err(e) => {
            status(&e);
            ptr::null_mut()
        }
    }
}

/// Lowercase hex MD5 of a byte buffer
///
/// # Safety
/// `data` must point to `len` readable bytes, or be null with `len == 0`.
#[no_mangle]
pub unsafe extern "C" fn fsgate_md5(data: *const u8, len: usize) -> *mut c_char {
    let bytes = if data.is_null() {
        if len != 0 {
            return ptr::null_mut();
        }
        &[][..]
    } else {
        std::slice::from_raw_parts(data, len)
    };
    into_c_string(FileSystem::md5(bytes))
}

/// Free a string returned by fsgate
///
/// # Safety
/// The pointer must have been returned by an fsgate function.
#[no_mangle]
pub unsafe extern "C" fn fsgate_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
