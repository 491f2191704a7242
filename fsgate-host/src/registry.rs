// SPDX-License-Identifier: AGPL-3.0-or-later
//! Versioned module registry
//!
//! Hosts that pin an older module ABI look the module up under that version.
//! Side-by-side versions are separate registrations sharing one
//! implementation.

use crate::error::{HostError, HostResult};
use crate::module::ExportedModule;
use crate::promise::Promise;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Module ABI version, e.g. `43.0.0`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ApiVersion {
    type Err = HostError;

    /// Accepts `43`, `43.1` or `43.1.2`; missing parts are zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HostError::InvalidArguments(format!("invalid API version: {s:?}"));
        let s = s.trim().trim_start_matches(['v', 'V']);

        let mut parts = [0u32; 3];
        let mut count = 0;
        for part in s.split('.') {
            if count == parts.len() {
                return Err(invalid());
            }
            parts[count] = part.parse().map_err(|_| invalid())?;
            count += 1;
        }
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

/// Registry of exported modules keyed by name and version
#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, BTreeMap<ApiVersion, Arc<dyn ExportedModule>>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module, replacing any previous registration for the same
    /// name and version.
    pub fn register(&mut self, version: ApiVersion, module: Arc<dyn ExportedModule>) {
        let name = module.name().to_string();
        tracing::info!(module = %name, %version, "registered module");
        self.modules.entry(name).or_default().insert(version, module);
    }

    pub fn get(&self, name: &str, version: ApiVersion) -> Option<Arc<dyn ExportedModule>> {
        self.modules.get(name)?.get(&version).cloned()
    }

    pub fn get_or_err(&self, name: &str, version: ApiVersion) -> HostResult<Arc<dyn ExportedModule>> {
        self.get(name, version)
            .ok_or_else(|| HostError::UnknownModule {
                name: name.to_string(),
                version,
            })
    }

    /// Registered versions of a module, oldest first.
    pub fn versions(&self, name: &str) -> Vec<ApiVersion> {
        self.modules
            .get(name)
            .map(|v| v.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn latest(&self, name: &str) -> Option<(ApiVersion, Arc<dyn ExportedModule>)> {
        self.modules
            .get(name)?
            .iter()
            .next_back()
            .map(|(v, m)| (*v, Arc::clone(m)))
    }

    /// Module names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn remove(&mut self, name: &str, version: ApiVersion) -> Option<Arc<dyn ExportedModule>> {
        let versions = self.modules.get_mut(name)?;
        let removed = versions.remove(&version);
        if versions.is_empty() {
            self.modules.remove(name);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.modules.clear();
    }

    /// Call a method and wait for its result.
    pub async fn call(
        &self,
        name: &str,
        version: ApiVersion,
        method: &str,
        args: Value,
    ) -> HostResult<Value> {
        let module = self.get_or_err(name, version)?;
        module.call(method, args).await
    }

    /// Start a call on `handle` and settle `promise` with its result.
    ///
    /// Lookup failures settle the promise before returning.
    pub fn dispatch(
        &self,
        handle: &Handle,
        name: &str,
        version: ApiVersion,
        method: &str,
        args: Value,
        promise: Promise,
    ) {
        match self.get_or_err(name, version) {
            Ok(module) => Self::dispatch_to(handle, module, method, args, promise),
            Err(e) => promise.settle(Err(e)),
        }
    }

    /// Start a call on an already resolved module.
    pub fn dispatch_to(
        handle: &Handle,
        module: Arc<dyn ExportedModule>,
        method: &str,
        args: Value,
        promise: Promise,
    ) {
        if !module.exported_methods().contains(&method) {
            return promise.settle(Err(HostError::UnknownMethod {
                module: module.name().to_string(),
                method: method.to_string(),
            }));
        }

        let method = method.to_string();
        handle.spawn(async move {
            let result = module.call(&method, args).await;
            promise.settle(result);
        });
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, versions) in &self.modules {
            map.entry(name, &versions.keys().collect::<Vec<_>>());
        }
        map.finish()
    }
}
