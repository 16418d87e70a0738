use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::models::Session;
use crate::session::SessionProvider;
use crate::validation;
use crate::Result;

/// Account operations a backend has to provide.
///
/// Errors come back as `Error::Auth` carrying the backend's own message.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session>;
    async fn sign_out(&self, session: &Session) -> Result<()>;
    /// Trade the session's refresh token for a new, unexpired session
    async fn refresh(&self, session: &Session) -> Result<Session>;
}

/// Validates credentials locally, talks to the backend, then publishes the
/// resulting session
#[derive(Clone)]
pub struct Authenticator {
    backend: Arc<dyn AuthBackend>,
    sessions: SessionProvider,
}

impl Authenticator {
    pub fn new(backend: Arc<dyn AuthBackend>, sessions: SessionProvider) -> Self {
        Self { backend, sessions }
    }

    pub fn sessions(&self) -> &SessionProvider {
        &self.sessions
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let email = email.trim();
        validation::validate_login(email, password)?;

        let session = self.backend.sign_in(email, password).await.map_err(|e| {
            warn!("Sign-in failed for {}: {}", email, e);
            e
        })?;

        self.sessions.publish(Some(session.clone()));
        Ok(session)
    }

    pub async fn signup(&self, email: &str, password: &str, confirm: &str) -> Result<Session> {
        let email = email.trim();
        validation::validate_signup(email, password, confirm)?;

        let session = self.backend.sign_up(email, password).await.map_err(|e| {
            warn!("Sign-up failed for {}: {}", email, e);
            e
        })?;

        info!("Created account for {}", email);
        self.sessions.publish(Some(session.clone()));
        Ok(session)
    }

    /// Always ends signed out, even if the backend call fails
    pub async fn logout(&self) {
        if let Some(session) = self.sessions.current() {
            if let Err(e) = self.backend.sign_out(&session).await {
                warn!("Backend sign-out failed: {}", e);
            }
        }
        self.sessions.publish(None);
    }

    /// The current session, refreshed first if it has lapsed.
    ///
    /// A refreshed session is re-published. When the refresh fails the
    /// session is cleared, so subscribers see the sign-out.
    pub async fn ensure_fresh(&self) -> Option<Session> {
        let session = self.sessions.current()?;
        if !session.is_expired() {
            return Some(session);
        }

        debug!("Session for {} expired, refreshing", session.email);
        match self.renew(&session).await {
            Some(fresh) => {
                self.sessions.publish(Some(fresh.clone()));
                Some(fresh)
            }
            None => {
                self.sessions.publish(None);
                None
            }
        }
    }

    /// Re-publish a persisted session, refreshing it first if it has lapsed
    pub async fn restore(&self, session: Session) -> bool {
        let session = if session.is_expired() {
            info!("Persisted session for {} has expired", session.email);
            match self.renew(&session).await {
                Some(fresh) => fresh,
                None => return false,
            }
        } else {
            session
        };

        self.sessions.publish(Some(session));
        true
    }

    async fn renew(&self, session: &Session) -> Option<Session> {
        if !session.can_refresh() {
            return None;
        }

        match self.backend.refresh(session).await {
            Ok(fresh) if !fresh.is_expired() => {
                info!("Refreshed session for {}", fresh.email);
                Some(fresh)
            }
            Ok(_) => {
                warn!("Refresh for {} returned an expired session", session.email);
                None
            }
            Err(e) => {
                warn!("Session refresh failed for {}: {}", session.email, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use chrono::{Duration, Utc};

    fn session(email: &str) -> Session {
        Session {
            uid: "uid-1".into(),
            email: email.into(),
            id_token: None,
            refresh_token: None,
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    fn lapsed(email: &str) -> Session {
        let mut stale = session(email);
        stale.refresh_token = Some("refresh-1".into());
        stale.expires_at = Utc::now() - Duration::seconds(1);
        stale
    }

    #[tokio::test]
    async fn test_signup_publishes_session() {
        let mut backend = MockAuthBackend::new();
        backend
            .expect_sign_up()
            .withf(|email, password| email == "a@b.com" && password == "secret1")
            .times(1)
            .returning(|email, _| Ok(session(email)));

        let sessions = SessionProvider::new();
        let auth = Authenticator::new(Arc::new(backend), sessions.clone());

        let result = auth.signup("a@b.com", "secret1", "secret1").await.unwrap();
        assert_eq!(result.email, "a@b.com");
        assert_eq!(sessions.current().map(|s| s.uid), Some("uid-1".to_string()));
    }

    #[tokio::test]
    async fn test_signup_mismatch_never_calls_backend() {
        let mut backend = MockAuthBackend::new();
        backend.expect_sign_up().times(0);

        let sessions = SessionProvider::new();
        let auth = Authenticator::new(Arc::new(backend), sessions.clone());

        let result = auth.signup("a@b.com", "secret1", "secret2").await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(sessions.current().is_none());
    }

    #[tokio::test]
    async fn test_login_bad_email_never_calls_backend() {
        let mut backend = MockAuthBackend::new();
        backend.expect_sign_in().times(0);

        let auth = Authenticator::new(Arc::new(backend), SessionProvider::new());
        assert!(matches!(
            auth.login("not-an-email", "secret1").await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_backend_error_passes_through() {
        let mut backend = MockAuthBackend::new();
        backend
            .expect_sign_in()
            .times(1)
            .returning(|_, _| Err(Error::Auth("INVALID_PASSWORD".into())));

        let sessions = SessionProvider::new();
        let auth = Authenticator::new(Arc::new(backend), sessions.clone());

        match auth.login("a@b.com", "wrong").await {
            Err(err) => assert_eq!(err.user_message(), "INVALID_PASSWORD"),
            Ok(_) => panic!("login should fail"),
        }
        assert!(sessions.current().is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_session_even_if_backend_fails() {
        let mut backend = MockAuthBackend::new();
        backend
            .expect_sign_out()
            .times(1)
            .returning(|_| Err(Error::Storage("offline".into())));

        let sessions = SessionProvider::new();
        sessions.publish(Some(session("a@b.com")));
        let auth = Authenticator::new(Arc::new(backend), sessions.clone());

        auth.logout().await;
        assert!(sessions.current().is_none());
    }

    #[tokio::test]
    async fn test_restore_rejects_expired_without_refresh_token() {
        let mut backend = MockAuthBackend::new();
        backend.expect_refresh().times(0);
        let sessions = SessionProvider::new();
        let auth = Authenticator::new(Arc::new(backend), sessions.clone());

        let mut stale = session("a@b.com");
        stale.expires_at = Utc::now() - Duration::seconds(1);
        assert!(!auth.restore(stale).await);
        assert!(sessions.current().is_none());

        assert!(auth.restore(session("a@b.com")).await);
        assert!(sessions.is_authenticated());
    }

    #[tokio::test]
    async fn test_restore_refreshes_expired_session() {
        let mut backend = MockAuthBackend::new();
        backend
            .expect_refresh()
            .withf(|s| s.refresh_token.as_deref() == Some("refresh-1"))
            .times(1)
            .returning(|s| Ok(session(&s.email)));
        let sessions = SessionProvider::new();
        let auth = Authenticator::new(Arc::new(backend), sessions.clone());

        assert!(auth.restore(lapsed("a@b.com")).await);
        assert!(sessions.is_authenticated());
    }

    #[tokio::test]
    async fn test_ensure_fresh_leaves_valid_session_alone() {
        let mut backend = MockAuthBackend::new();
        backend.expect_refresh().times(0);
        let sessions = SessionProvider::new();
        sessions.publish(Some(session("a@b.com")));
        let mut sub = sessions.subscribe();
        let auth = Authenticator::new(Arc::new(backend), sessions.clone());

        assert_eq!(auth.ensure_fresh().await, sessions.current());
        assert_eq!(sub.poll_change(), None);
    }

    #[tokio::test]
    async fn test_lapsed_session_is_refreshed_and_republished() {
        let mut backend = MockAuthBackend::new();
        backend.expect_refresh().times(1).returning(|s| {
            let mut fresh = session(&s.email);
            fresh.id_token = Some("token-2".into());
            Ok(fresh)
        });
        let sessions = SessionProvider::new();
        sessions.publish(Some(lapsed("a@b.com")));
        let mut sub = sessions.subscribe();
        let auth = Authenticator::new(Arc::new(backend), sessions.clone());

        let fresh = auth.ensure_fresh().await.unwrap();
        assert_eq!(fresh.id_token.as_deref(), Some("token-2"));
        assert!(!fresh.is_expired());

        let published = sub.poll_change().expect("refreshed session published");
        assert_eq!(published, Some(fresh));
    }

    #[tokio::test]
    async fn test_failed_refresh_signs_out() {
        let mut backend = MockAuthBackend::new();
        backend
            .expect_refresh()
            .times(1)
            .returning(|_| Err(Error::Auth("TOKEN_EXPIRED".into())));
        let sessions = SessionProvider::new();
        sessions.publish(Some(lapsed("a@b.com")));
        let mut sub = sessions.subscribe();
        let auth = Authenticator::new(Arc::new(backend), sessions.clone());

        assert!(auth.ensure_fresh().await.is_none());
        assert!(sessions.current().is_none());
        assert_eq!(sub.poll_change(), Some(None));
    }
}
