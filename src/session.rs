use std::sync::RwLock;

/// An authenticated user identity plus its bearer token.
///
/// The token is minted and refreshed elsewhere; the cart only carries it
/// into the `Authorization` header of every gateway call.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub user_id: i64,
    pub token: String,
}

/// Source of the current session, passed explicitly into the gateway and
/// the store. `None` means an anonymous visitor: no cart state exists for
/// such a session and no cart request may be issued on its behalf.
pub trait SessionProvider: Send + Sync {
    fn current(&self) -> Option<Session>;
}

/// Shared mutable session slot for sign-in/sign-out flows.
#[derive(Debug, Default)]
pub struct SessionHandle {
    inner: RwLock<Option<Session>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        SessionHandle::default()
    }

    pub fn signed_in(user_id: i64, token: impl Into<String>) -> Self {
        let handle = SessionHandle::new();
        handle.set(Session {
            user_id,
            token: token.into(),
        });
        handle
    }

    pub fn set(&self, session: Session) {
        *self.write() = Some(session);
    }

    pub fn clear(&self) {
        *self.write() = None;
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionProvider for SessionHandle {
    fn current(&self) -> Option<Session> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
