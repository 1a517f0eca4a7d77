//! Scoped ownership of a browser session.
//!
//! A [`SessionGuard`] closes its session exactly once: explicitly through
//! [`SessionGuard::release`], or from `Drop` on every other exit path
//! (early returns, `?` propagation, panics).

use std::ops::{Deref, DerefMut};

use super::types::{BrowserSession, SessionResult};

pub struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
    label: String,
}

impl SessionGuard {
    /// Take ownership of `session`; `label` identifies the owner in logs
    pub fn new(session: Box<dyn BrowserSession>, label: impl Into<String>) -> Self {
        Self {
            session: Some(session),
            label: label.into(),
        }
    }

    /// Close the session now and report the outcome
    pub fn release(mut self) -> SessionResult<()> {
        match self.session.take() {
            Some(mut session) => {
                tracing::debug!(owner = %self.label, "closing browser session");
                session.close()
            }
            None => Ok(()),
        }
    }
}

impl Deref for SessionGuard {
    type Target = dyn BrowserSession;

    fn deref(&self) -> &Self::Target {
        // Only `release` and `drop` empty the slot, and both consume the guard.
        self.session.as_deref().expect("session present until release")
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session.as_deref_mut().expect("session present until release")
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            tracing::debug!(owner = %self.label, "closing browser session on drop");
            if let Err(e) = session.close() {
                tracing::warn!(owner = %self.label, error = %e, "failed to close browser session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::{MockElement, MockPage, MockSession, SessionCall};

    fn page() -> MockPage {
        MockPage::new(MockElement::new("html"))
    }

    #[test]
    fn test_release_closes_once() {
        let session = MockSession::new(page());
        let log = session.call_log();
        let guard = SessionGuard::new(Box::new(session), "test");
        guard.release().unwrap();
        assert_eq!(log.count(|c| matches!(c, SessionCall::Close)), 1);
    }

    #[test]
    fn test_drop_closes() {
        let session = MockSession::new(page());
        let log = session.call_log();
        {
            let mut guard = SessionGuard::new(Box::new(session), "test");
            guard.navigate("https://example.test").unwrap();
        }
        assert_eq!(log.count(|c| matches!(c, SessionCall::Close)), 1);
    }

    #[test]
    fn test_drop_closes_on_panic() {
        let session = MockSession::new(page());
        let log = session.call_log();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = SessionGuard::new(Box::new(session), "test");
            panic!("check blew up");
        }));
        assert!(result.is_err());
        assert_eq!(log.count(|c| matches!(c, SessionCall::Close)), 1);
    }
}
