use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Process-wide bearer credential. Clones share the same slot, so clearing it
/// from the client after a 401 logs every holder out.
#[derive(Clone, Default)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
}

impl Session {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token.filter(|t| !t.is_empty()))),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_no_token() {
        assert!(!Session::new(Some(String::new())).is_authenticated());
        assert!(Session::new(Some("abc".into())).is_authenticated());
    }

    #[test]
    fn clones_share_the_credential() {
        let session = Session::default();
        let other = session.clone();
        session.set("abc");
        assert_eq!(other.token().as_deref(), Some("abc"));
        other.clear();
        assert!(!session.is_authenticated());
    }
}
