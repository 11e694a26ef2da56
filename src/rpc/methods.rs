//! Method registry.
//!
//! Maps method names to handlers. Domain modules populate a
//! [`MethodRegistry`] at startup; the server then takes ownership of it
//! and only ever reads from it.

use std::collections::HashMap;
use std::sync::Arc;

use super::protocol::{MethodResult, Params};

/// A single RPC method implementation.
///
/// Handlers never raise: a failure is reported by returning `Err` with a
/// JSON-RPC error object.
pub trait RpcMethod: Send + Sync {
    fn call(&self, params: &Params) -> MethodResult;
}

impl<F> RpcMethod for F
where
    F: Fn(&Params) -> MethodResult + Send + Sync,
{
    fn call(&self, params: &Params) -> MethodResult {
        self(params)
    }
}

/// Name-keyed table of method handlers.
#[derive(Default, Clone)]
pub struct MethodRegistry {
    methods: HashMap<String, Arc<dyn RpcMethod>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `name`. A later registration for the same
    /// name replaces the earlier one.
    pub fn register(&mut self, name: impl Into<String>, method: impl RpcMethod + 'static) -> &mut Self {
        let name = name.into();
        if self.methods.insert(name.clone(), Arc::new(method)).is_some() {
            tracing::warn!(method = %name, "RPC method registered twice, keeping the last handler");
        }
        self
    }

    /// Register a closure. Equivalent to [`register`](Self::register) but
    /// lets the compiler infer the closure's signature.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Params) -> MethodResult + Send + Sync + 'static,
    {
        self.register(name, handler)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn RpcMethod>> {
        self.methods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Registered method names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
