//! Service initiation: handing transport handles to API-service constructors.
//!
//! Downstream service constructors take a [`CallContext`] and a
//! [`ClientOption`]. [`context_for_handle`] wraps a handle directly; a
//! [`ClientRegistry`] additionally remembers one "current" handle per
//! [`CredentialKind`] for code that cannot pass handles around.
//!
//! # Thread Safety
//!
//! The registry guards its slots with a mutex. Installs are last-writer-wins;
//! callers that need a particular handle should prefer
//! [`context_for_handle`] over reading the registry.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::model::CredentialKind;
use crate::transport::TransportHandle;

/// Error type for registry and call-context operations.
#[derive(Debug, Error)]
pub enum InitiatorError {
    /// No handle of this kind has been installed.
    #[error("no {kind} client has been installed")]
    Uninitialized { kind: CredentialKind },

    /// The call did not finish before the context's deadline.
    #[error("call exceeded its deadline")]
    DeadlineExceeded,
}

/// Per-call context passed to API-service constructors.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context with no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Limit calls made under this context to `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Run `future`, failing if it outlives the deadline.
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output, InitiatorError> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, future)
                .await
                .map_err(|_| InitiatorError::DeadlineExceeded),
            None => Ok(future.await),
        }
    }
}

/// Client configuration passed to API-service constructors.
#[derive(Debug, Clone)]
pub enum ClientOption {
    /// Use this authenticated HTTP client for every call.
    HttpClient(TransportHandle),
}

impl ClientOption {
    pub fn transport(&self) -> &TransportHandle {
        match self {
            Self::HttpClient(handle) => handle,
        }
    }
}

/// What an API-service constructor takes.
pub type ServiceInit = (CallContext, ClientOption);

/// Wrap `handle` for a service constructor, bypassing any registry.
pub fn context_for_handle(handle: &TransportHandle) -> ServiceInit {
    (
        CallContext::background(),
        ClientOption::HttpClient(handle.clone()),
    )
}

/// Build a handle with `init` and wrap it for a service constructor.
pub fn context_from<F, E>(init: F) -> Result<ServiceInit, E>
where
    F: FnOnce() -> Result<TransportHandle, E>,
{
    let handle = init()?;
    Ok(context_for_handle(&handle))
}

/// Holds the current transport handle for each credential kind.
#[derive(Default)]
pub struct ClientRegistry {
    slots: Mutex<HashMap<CredentialKind, TransportHandle>>,
}

impl ClientRegistry {
    /// Create a registry with every slot empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `handle` the current handle for `kind`, returning the previous one.
    pub fn install(&self, handle: TransportHandle, kind: CredentialKind) -> Option<TransportHandle> {
        if handle.kind() != kind {
            tracing::warn!(
                handle_kind = %handle.kind(),
                slot = %kind,
                "Installing a handle into a slot of a different credential kind"
            );
        }
        tracing::debug!(slot = %kind, "Installed client");
        self.slots.lock().insert(kind, handle)
    }

    /// The current handle for `kind`, if any.
    pub fn current(&self, kind: CredentialKind) -> Option<TransportHandle> {
        self.slots.lock().get(&kind).cloned()
    }

    /// Wrap the current handle for `kind`.
    pub fn context_for(&self, kind: CredentialKind) -> Result<ServiceInit, InitiatorError> {
        self.current(kind)
            .map(|handle| context_for_handle(&handle))
            .ok_or(InitiatorError::Uninitialized { kind })
    }

    /// Empty every slot.
    pub fn clear(&self) {
        self.slots.lock().clear();
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.lock();
        f.debug_struct("ClientRegistry")
            .field("delegated", &slots.contains_key(&CredentialKind::Delegated))
            .field(
                "service_account",
                &slots.contains_key(&CredentialKind::ServiceAccount),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::AuthError;
    use crate::scope::ScopeSet;
    use crate::token::Token;
    use crate::transport::TokenSource;
    use async_trait::async_trait;

    struct FixedSource;

    #[async_trait]
    impl TokenSource for FixedSource {
        async fn token(&self) -> Result<Token, AuthError> {
            Ok(Token::new("fixed"))
        }
    }

    fn handle(kind: CredentialKind) -> TransportHandle {
        TransportHandle::new(kind, ScopeSet::new(), FixedSource)
    }

    #[test]
    fn test_context_for_uninitialized() {
        let registry = ClientRegistry::new();
        let result = registry.context_for(CredentialKind::Delegated);
        assert!(matches!(
            result,
            Err(InitiatorError::Uninitialized {
                kind: CredentialKind::Delegated
            })
        ));
    }

    #[test]
    fn test_install_then_context_for() {
        let registry = ClientRegistry::new();
        let delegated = handle(CredentialKind::Delegated);

        assert!(registry.install(delegated.clone(), CredentialKind::Delegated).is_none());

        let (ctx, option) = registry.context_for(CredentialKind::Delegated).unwrap();
        assert!(ctx.deadline().is_none());
        assert!(option.transport().same_binding(&delegated));

        // Slots are independent.
        assert!(registry.context_for(CredentialKind::ServiceAccount).is_err());
    }

    #[test]
    fn test_last_writer_wins() {
        let registry = ClientRegistry::new();
        let first = handle(CredentialKind::ServiceAccount);
        let second = handle(CredentialKind::ServiceAccount);

        registry.install(first.clone(), CredentialKind::ServiceAccount);
        let previous = registry
            .install(second.clone(), CredentialKind::ServiceAccount)
            .unwrap();

        assert!(previous.same_binding(&first));
        assert!(registry
            .current(CredentialKind::ServiceAccount)
            .unwrap()
            .same_binding(&second));
    }

    #[test]
    fn test_clear() {
        let registry = ClientRegistry::new();
        registry.install(handle(CredentialKind::Delegated), CredentialKind::Delegated);
        registry.clear();
        assert!(registry.current(CredentialKind::Delegated).is_none());
    }

    #[test]
    fn test_context_for_handle_bypasses_registry() {
        let h = handle(CredentialKind::Delegated);
        let (_, option) = context_for_handle(&h);
        assert!(option.transport().same_binding(&h));
    }

    #[test]
    fn test_context_from() {
        let result: Result<ServiceInit, AuthError> =
            context_from(|| Ok(handle(CredentialKind::ServiceAccount)));
        let (_, option) = result.unwrap();
        assert_eq!(option.transport().kind(), CredentialKind::ServiceAccount);

        let failed: Result<ServiceInit, AuthError> = context_from(|| {
            Err(AuthError::Config {
                message: "no key".to_string(),
            })
        });
        assert!(failed.is_err());
    }

    #[tokio::test]
    async fn test_call_context_deadline() {
        let ctx = CallContext::background().with_timeout(Duration::from_millis(20));
        let result = ctx.run(tokio::time::sleep(Duration::from_secs(5))).await;
        assert!(matches!(result, Err(InitiatorError::DeadlineExceeded)));

        let ctx = CallContext::background();
        assert_eq!(ctx.run(async { 7 }).await.unwrap(), 7);
    }
}
