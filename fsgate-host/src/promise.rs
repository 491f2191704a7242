// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resolve/reject continuation pair
//!
//! Settling consumes the promise, so at most one continuation can run.
//! A promise dropped without being settled rejects itself, so at least one
//! runs too.

use crate::error::{HostError, HostResult};
use serde::Serialize;
use serde_json::Value;

type ResolveFn = Box<dyn FnOnce(Value) + Send>;
type RejectFn = Box<dyn FnOnce(Rejection) + Send>;

/// Payload handed to the reject continuation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_code: Option<i32>,
}

impl Rejection {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            os_code: None,
        }
    }
}

impl From<&HostError> for Rejection {
    fn from(err: &HostError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            os_code: err.os_code(),
        }
    }
}

pub struct Promise {
    resolve: Option<ResolveFn>,
    reject: Option<RejectFn>,
}

impl Promise {
    pub fn new(
        resolve: impl FnOnce(Value) + Send + 'static,
        reject: impl FnOnce(Rejection) + Send + 'static,
    ) -> Self {
        Self {
            resolve: Some(Box::new(resolve)),
            reject: Some(Box::new(reject)),
        }
    }

    pub fn resolve(mut self, value: Value) {
        self.reject = None;
        if let Some(resolve) = self.resolve.take() {
            resolve(value);
        }
    }

    pub fn reject(mut self, rejection: Rejection) {
        self.resolve = None;
        if let Some(reject) = self.reject.take() {
            reject(rejection);
        }
    }

    pub fn settle(self, result: HostResult<Value>) {
        match result {
            Ok(value) => self.resolve(value),
            Err(err) => {
                tracing::debug!(code = err.code(), error = %err, "rejecting");
                self.reject(Rejection::from(&err))
            }
        }
    }
}

impl Drop for Promise {
    fn drop(&mut self) {
        self.resolve = None;
        if let Some(reject) = self.reject.take() {
            tracing::warn!("promise dropped without being settled");
            reject(Rejection::new(
                "E_PROMISE_DROPPED",
                "operation ended without a result",
            ));
        }
    }
}

impl std::fmt::Debug for Promise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise")
            .field("settled", &self.reject.is_none())
            .finish()
    }
}
