//! Typed registry of downstream operations.
//!
//! Operations are registered once at setup under a string identifier and
//! resolved per call; an unknown identifier is a `NotConfigured` error.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::resilience::error::DownstreamError;

/// A downstream call taking `A` and producing `T`.
pub trait Operation<A, T>: Send + Sync {
    fn call(&self, args: A) -> BoxFuture<'static, Result<T, DownstreamError>>;

    /// Refuse arguments this operation cannot serve. Runs before admission,
    /// so a refusal never reaches the breaker.
    fn check(&self, _args: &A) -> Result<(), String> {
        Ok(())
    }
}

impl<A, T, F, Fut> Operation<A, T> for F
where
    F: Fn(A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, DownstreamError>> + Send + 'static,
{
    fn call(&self, args: A) -> BoxFuture<'static, Result<T, DownstreamError>> {
        Box::pin(self(args))
    }
}

/// Operation identifier → callable.
pub struct OperationRegistry<A, T> {
    operations: HashMap<String, Arc<dyn Operation<A, T>>>,
}

impl<A, T> OperationRegistry<A, T> {
    pub fn new() -> Self {
        Self {
            operations: HashMap::new(),
        }
    }

    /// Register `operation` under `id`, replacing any previous entry.
    pub fn register<O>(&mut self, id: impl Into<String>, operation: O) -> &mut Self
    where
        O: Operation<A, T> + 'static,
    {
        self.operations.insert(id.into(), Arc::new(operation));
        self
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Operation<A, T>>> {
        self.operations.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.operations.contains_key(id)
    }

    /// Registered identifiers, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.operations.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl<A, T> Default for OperationRegistry<A, T> {
    fn default() -> Self {
        Self::new()
    }
}
