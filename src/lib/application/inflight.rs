//! The set of request ids currently being served, shared by every transport

use crate::domain::ServiceError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Default)]
pub struct InFlightRequests {
    entries: Mutex<HashMap<String, CancellationToken>>,
}

impl InFlightRequests {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim `request_id`, plus `artifact` (the name the invocation writes
    /// under) when it differs. Either key being in flight rejects the whole
    /// admission. The guard's token also fires when `parent` is cancelled.
    pub fn admit(
        self: &Arc<Self>,
        request_id: &str,
        artifact: Option<&str>,
        parent: &CancellationToken,
    ) -> Result<InFlightGuard, ServiceError> {
        let mut keys = vec![request_id.to_string()];
        if let Some(artifact) = artifact.filter(|name| *name != request_id) {
            keys.push(artifact.to_string());
        }
        let token = parent.child_token();
        {
            let mut entries = self.lock();
            if let Some(taken) = keys.iter().find(|key| entries.contains_key(key.as_str())) {
                return Err(ServiceError::DuplicateRequest(taken.clone()));
            }
            for key in &keys {
                entries.insert(key.clone(), token.clone());
            }
        }
        debug!(request_id, claimed = keys.len(), "Request admitted");
        Ok(InFlightGuard {
            registry: Arc::clone(self),
            keys,
            token,
        })
    }

    /// Cancel one in-flight request. Returns false for unknown ids.
    pub fn cancel(&self, request_id: &str) -> bool {
        match self.lock().get(request_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, request_id: &str) -> bool {
        self.lock().contains_key(request_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Membership in the in-flight set. Dropping it releases the id and cancels
/// whatever is still running under its token.
pub struct InFlightGuard {
    registry: Arc<InFlightRequests>,
    /// The request id first, then any artifact name claimed with it.
    keys: Vec<String>,
    token: CancellationToken,
}

impl InFlightGuard {
    pub fn request_id(&self) -> &str {
        &self.keys[0]
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.token.cancel();
        let mut entries = self.registry.lock();
        for key in &self.keys {
            entries.remove(key);
        }
        debug!(request_id = self.request_id(), "Request released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;

    fn admit(registry: &Arc<InFlightRequests>, request_id: &str) -> Result<InFlightGuard, ServiceError> {
        registry.admit(request_id, None, &CancellationToken::new())
    }

    #[test]
    fn duplicate_is_rejected_until_released() {
        let registry = InFlightRequests::new();
        let first = admit(&registry, "r1").unwrap();

        let err = admit(&registry, "r1").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ProtocolError);
        assert!(registry.contains("r1"));

        drop(first);
        assert!(registry.is_empty());
        assert!(admit(&registry, "r1").is_ok());
    }

    #[test]
    fn cancel_reaches_the_token() {
        let registry = InFlightRequests::new();
        let guard = admit(&registry, "r2").unwrap();
        assert!(registry.cancel("r2"));
        assert!(guard.token().is_cancelled());
        assert!(!registry.cancel("missing"));
    }

    #[test]
    fn parent_cancellation_propagates() {
        let registry = InFlightRequests::new();
        let session = CancellationToken::new();
        let a = registry.admit("a", None, &session).unwrap();
        let b = admit(&registry, "b").unwrap();

        session.cancel();

        assert!(a.token().is_cancelled());
        assert!(!b.token().is_cancelled());
    }

    #[test]
    fn dropping_guard_cancels_work() {
        let registry = InFlightRequests::new();
        let guard = admit(&registry, "r3").unwrap();
        let token = guard.token().clone();
        drop(guard);
        assert!(token.is_cancelled());
    }

    #[test]
    fn artifact_name_is_claimed_with_the_request() {
        let registry = InFlightRequests::new();
        let parent = CancellationToken::new();
        let first = registry
            .admit("a", Some("shared"), &parent)
            .unwrap();
        assert!(registry.contains("shared"));

        let err = registry
            .admit("b", Some("shared"), &parent)
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::DuplicateRequest(ref key) if key == "shared"));
        assert!(!registry.contains("b"));

        assert!(registry.cancel("shared"));
        assert!(first.token().is_cancelled());
        drop(first);
        assert!(registry.is_empty());
    }

    #[test]
    fn matching_artifact_name_is_claimed_once() {
        let registry = InFlightRequests::new();
        let guard = registry
            .admit("r5", Some("r5"), &CancellationToken::new())
            .unwrap();
        assert_eq!(guard.request_id(), "r5");
        assert_eq!(registry.len(), 1);
    }
}
