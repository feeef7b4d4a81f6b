use std::sync::RwLock;

/// The shopper or operator on whose behalf a request runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl SessionUser {
    pub fn new(id: impl Into<String>, email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: name.into(),
        }
    }
}

/// Read-only view of the auth store.
pub trait Session: Send + Sync {
    fn current_user(&self) -> Option<SessionUser>;

    fn is_logged_in(&self) -> bool {
        self.current_user().is_some()
    }
}

/// Session held in memory. `login`/`logout` swap the current user.
#[derive(Debug, Default)]
pub struct StaticSession {
    user: RwLock<Option<SessionUser>>,
}

impl StaticSession {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn logged_in(user: SessionUser) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    pub fn login(&self, user: SessionUser) {
        *self.user.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(user);
    }

    pub fn logout(&self) {
        *self.user.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

impl Session for StaticSession {
    fn current_user(&self) -> Option<SessionUser> {
        self.user
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_and_logout_toggle_current_user() {
        let session = StaticSession::anonymous();
        assert!(!session.is_logged_in());

        session.login(SessionUser::new("u1", "alice@example.com", "Alice"));
        assert_eq!(session.current_user().map(|u| u.name), Some("Alice".to_string()));

        session.logout();
        assert_eq!(session.current_user(), None);
    }
}
