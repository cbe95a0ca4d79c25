//! InMemoryConnector: hands out a shared [`InMemoryRuntime`].

use super::InMemoryRuntime;
use crate::config::ConnectionConfig;
use crate::error::RuntimeError;
use crate::runtime::{Connector, Runtime};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;

/// Connector returning the same in-memory runtime on every connect.
///
/// Can be told to refuse connections, and can hold a connect attempt
/// open until released so tests can observe the `Connecting` state.
pub struct InMemoryConnector {
    runtime: Arc<InMemoryRuntime>,
    refusal: Mutex<Option<RuntimeError>>,
    gate: Option<Arc<Notify>>,
    attempts: AtomicUsize,
}

impl InMemoryConnector {
    /// Connector for `runtime`.
    pub fn new(runtime: Arc<InMemoryRuntime>) -> Self {
        Self {
            runtime,
            refusal: Mutex::new(None),
            gate: None,
            attempts: AtomicUsize::new(0),
        }
    }

    /// Connector whose connect attempts wait until the returned
    /// [`Notify`] is signalled (once per attempt).
    pub fn held(runtime: Arc<InMemoryRuntime>) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let connector = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::new(runtime)
        };
        (connector, gate)
    }

    /// Refuse every future connect with `err`.
    pub fn refuse(&self, err: RuntimeError) {
        *self.refusal.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
    }

    /// Accept connects again.
    pub fn accept(&self) {
        *self.refusal.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Connect attempts made so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    async fn connect(&self, _config: &ConnectionConfig) -> Result<Arc<dyn Runtime>, RuntimeError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let refusal = self
            .refusal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match refusal {
            Some(err) => Err(err),
            None => Ok(Arc::clone(&self.runtime) as Arc<dyn Runtime>),
        }
    }
}
