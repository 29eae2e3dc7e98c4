//! Request-scoped identity propagation.
//!
//! An [`AuthContext`] attaches the current [`Authentication`] to the calling
//! thread. Values are confined to the thread that set them: another thread
//! (another request) never observes them. Hand-off to a new concurrent unit
//! of work is explicit, through [`AuthContext::snapshot`] or
//! [`AuthContext::spawn`].
//!
//! Several independent contexts can coexist in one process (tests typically
//! create one per case); storage is keyed by the context instance. Dropping a
//! context removes its entry from the dropping thread only, so entries left
//! by a discarded context on other live threads stay until those threads
//! exit.

use crate::config::{parse_bool, ConfigError, AUTH_ENABLED_KEY};
use common::identity::Authentication;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

thread_local! {
    static CURRENT: RefCell<HashMap<u64, Authentication>> = RefCell::new(HashMap::new());
}

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

fn replace_current(context_id: u64, value: Option<Authentication>) -> Option<Authentication> {
    // try_with: guards may drop while the thread-local is being torn down
    CURRENT
        .try_with(|current| {
            let mut current = current.borrow_mut();
            match value {
                Some(auth) => current.insert(context_id, auth),
                None => current.remove(&context_id),
            }
        })
        .ok()
        .flatten()
}

/// Holder of the current authentication and the process-wide auth toggle.
#[derive(Debug)]
pub struct AuthContext {
    id: u64,
    auth_enabled: AtomicBool,
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthContext {
    /// Create a context with authentication disabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            auth_enabled: AtomicBool::new(false),
        }
    }

    /// Attach `auth` to the current thread, replacing any previous value.
    pub fn set(&self, auth: Authentication) {
        replace_current(self.id, Some(auth));
    }

    /// Authentication attached to the current thread, if any.
    #[must_use]
    pub fn get(&self) -> Option<Authentication> {
        CURRENT
            .try_with(|current| current.borrow().get(&self.id).cloned())
            .ok()
            .flatten()
    }

    /// Remove the authentication from the current thread.
    pub fn clear(&self) {
        replace_current(self.id, None);
    }

    /// Attach `auth` for the lifetime of the returned guard.
    ///
    /// Dropping the guard (including during unwinding) restores whatever was
    /// attached before.
    #[must_use = "the authentication is detached as soon as the guard is dropped"]
    pub fn scope(&self, auth: Authentication) -> ContextGuard {
        let previous = replace_current(self.id, Some(auth));
        ContextGuard::new(self.id, previous)
    }

    /// Capture the current thread's authentication for hand-off.
    #[must_use]
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            context_id: self.id,
            value: self.get(),
        }
    }

    /// Spawn a named thread that starts with the caller's authentication.
    ///
    /// The child sees the value as of the call. Later changes on either side
    /// are not visible to the other.
    pub fn spawn<F, T>(&self, name: impl Into<String>, f: F) -> io::Result<JoinHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let snapshot = self.snapshot();
        thread::Builder::new().name(name.into()).spawn(move || {
            let _guard = snapshot.attach();
            f()
        })
    }

    #[must_use]
    pub fn is_auth_enabled(&self) -> bool {
        self.auth_enabled.load(Ordering::Acquire)
    }

    pub fn set_auth_enabled(&self, enabled: bool) {
        let previous = self.auth_enabled.swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            info!(target: "aaa.context", auth_enabled = enabled, "Authentication toggle changed");
        }
    }

    /// Apply a configuration update.
    ///
    /// `None` leaves the toggle unchanged. The only recognized key is
    /// `authEnabled`, whose value must be `true` or `false` (any case).
    pub fn apply_properties(
        &self,
        properties: Option<&HashMap<String, String>>,
    ) -> Result<(), ConfigError> {
        let Some(properties) = properties else {
            debug!(target: "aaa.context", "Empty configuration update, keeping current settings");
            return Ok(());
        };

        if let Some(unknown) = properties.keys().find(|k| k.as_str() != AUTH_ENABLED_KEY) {
            return Err(ConfigError::UnknownKey(unknown.clone()));
        }

        if let Some(value) = properties.get(AUTH_ENABLED_KEY) {
            self.set_auth_enabled(parse_bool(AUTH_ENABLED_KEY, value)?);
        }

        Ok(())
    }
}

impl Drop for AuthContext {
    fn drop(&mut self) {
        replace_current(self.id, None);
    }
}

/// Captured authentication, transferable to another thread.
#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    context_id: u64,
    value: Option<Authentication>,
}

impl ContextSnapshot {
    #[must_use]
    pub fn authentication(&self) -> Option<&Authentication> {
        self.value.as_ref()
    }

    /// Attach the captured value to the current thread until the guard drops.
    #[must_use = "the authentication is detached as soon as the guard is dropped"]
    pub fn attach(&self) -> ContextGuard {
        let previous = replace_current(self.context_id, self.value.clone());
        ContextGuard::new(self.context_id, previous)
    }
}

/// Restores the previous authentication when dropped.
///
/// Not `Send`: it must drop on the thread it was created on.
#[derive(Debug)]
pub struct ContextGuard {
    context_id: u64,
    previous: Option<Authentication>,
    _not_send: PhantomData<*const ()>,
}

impl ContextGuard {
    fn new(context_id: u64, previous: Option<Authentication>) -> Self {
        Self {
            context_id,
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        replace_current(self.context_id, self.previous.take());
    }
}
