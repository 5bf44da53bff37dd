//! 取消注册表：每个在途请求标识对应唯一的取消句柄。
//!
//! Cancellation registry: one [`CancellationToken`] per in-flight request identity.
//!
//! - `cancel` on an unknown or settled identity is a no-op.
//! - `cancel_all` swaps the map out under the lock and cancels outside it, so
//!   registrations racing with it land in the fresh map instead of being dropped.
//! - A caller-supplied token is chained with [`CancellationToken::child_token`]: cancelling
//!   the caller's token cancels ours, and dropping ours detaches it from the caller's.

use crate::client::types::RequestId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Default)]
pub struct CancellationRegistry {
    handles: Mutex<HashMap<RequestId, CancellationToken>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestId, CancellationToken>> {
        // Entries are plain tokens; a poisoned map is still consistent.
        self.handles.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Store the handle for `id`, replacing (not cancelling) any previous one.
    pub fn register(&self, id: RequestId, handle: CancellationToken) {
        if self.lock().insert(id.clone(), handle).is_some() {
            debug!(request_id = %id, "replaced cancellation handle");
        }
    }

    /// Abort and forget `id`. Returns whether a live entry was cancelled.
    pub fn cancel(&self, id: &RequestId) -> bool {
        let handle = self.lock().remove(id);
        match handle {
            Some(h) => {
                h.cancel();
                debug!(request_id = %id, "request cancelled");
                true
            }
            None => false,
        }
    }

    /// Abort every tracked request and clear the registry.
    pub fn cancel_all(&self) -> usize {
        let drained = std::mem::take(&mut *self.lock());
        let n = drained.len();
        for handle in drained.into_values() {
            handle.cancel();
        }
        if n > 0 {
            debug!(cancelled = n, "cancelled all in-flight requests");
        }
        n
    }

    /// Forget `id` without cancelling.
    pub fn release(&self, id: &RequestId) {
        self.lock().remove(id);
    }

    pub fn contains(&self, id: &RequestId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Build the per-call handle, chained to the caller's token when one is given.
pub(crate) fn chain(external: Option<&CancellationToken>) -> CancellationToken {
    match external {
        Some(ext) => ext.child_token(),
        None => CancellationToken::new(),
    }
}

/// Registry entry that releases itself when the call settles or is dropped.
pub(crate) struct Registration {
    registry: Arc<CancellationRegistry>,
    id: RequestId,
    token: CancellationToken,
}

impl Registration {
    pub(crate) fn new(
        registry: Arc<CancellationRegistry>,
        id: RequestId,
        token: CancellationToken,
    ) -> Self {
        registry.register(id.clone(), token.clone());
        Self {
            registry,
            id,
            token,
        }
    }

    pub(crate) fn id(&self) -> &RequestId {
        &self.id
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.release(&self.id);
    }
}
