// Local backend - SQLite accounts and favorites via grippy-store
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use grippy_store::{LocalStore, StoreError, StoredFavorite};

use crate::{
    auth::AuthBackend,
    favorites::FavoriteStore,
    models::{FavoriteItem, Session},
    Error, Result,
};

/// Implements both backend traits on top of one SQLite file
pub struct LocalBackend {
    store: Arc<LocalStore>,
    session_ttl: Duration,
}

impl LocalBackend {
    pub fn open(db_path: impl AsRef<Path>, session_days: u32) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = LocalStore::open(db_path).map_err(to_error)?;
        Ok(Self::new(Arc::new(store), session_days))
    }

    pub fn new(store: Arc<LocalStore>, session_days: u32) -> Self {
        Self {
            store,
            session_ttl: Duration::days(i64::from(session_days)),
        }
    }

    /// Local refresh tokens just name the account; refreshing checks it still exists
    fn session_for(&self, uid: String, email: String) -> Session {
        Session {
            refresh_token: Some(uid.clone()),
            uid,
            email,
            id_token: None,
            expires_at: Utc::now() + self.session_ttl,
        }
    }
}

/// Account errors keep their message for the user, the rest are storage
fn to_error(err: StoreError) -> Error {
    match err {
        StoreError::EmailInUse | StoreError::InvalidCredentials => Error::Auth(err.to_string()),
        other => Error::Storage(other.to_string()),
    }
}

fn to_item(stored: StoredFavorite) -> FavoriteItem {
    FavoriteItem {
        id: stored.id,
        url: stored.url,
    }
}

#[async_trait]
impl AuthBackend for LocalBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let account = self.store.verify_account(email, password).map_err(to_error)?;
        Ok(self.session_for(account.uid, account.email))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        let account = self.store.create_account(email, password).map_err(to_error)?;
        Ok(self.session_for(account.uid, account.email))
    }

    async fn sign_out(&self, _session: &Session) -> Result<()> {
        // Nothing server-side to revoke
        Ok(())
    }

    async fn refresh(&self, session: &Session) -> Result<Session> {
        let uid = session
            .refresh_token
            .as_deref()
            .filter(|token| *token == session.uid)
            .ok_or_else(|| Error::Auth("Session expired, sign in again.".into()))?;

        match self.store.find_account(uid).map_err(to_error)? {
            Some(account) => Ok(self.session_for(account.uid, account.email)),
            None => Err(Error::Auth("Account no longer exists.".into())),
        }
    }
}

#[async_trait]
impl FavoriteStore for LocalBackend {
    async fn create(&self, session: &Session, url: &str) -> Result<FavoriteItem> {
        self.store
            .insert_favorite(&session.uid, url)
            .map(to_item)
            .map_err(to_error)
    }

    async fn find_by_url(&self, session: &Session, url: &str) -> Result<Vec<FavoriteItem>> {
        let found = self
            .store
            .find_favorites_by_url(&session.uid, url)
            .map_err(to_error)?;
        Ok(found.into_iter().map(to_item).collect())
    }

    async fn delete(&self, session: &Session, id: &str) -> Result<bool> {
        self.store.delete_favorite(&session.uid, id).map_err(to_error)
    }

    async fn list(&self, session: &Session, limit: usize) -> Result<Vec<FavoriteItem>> {
        let items = self
            .store
            .list_favorites(&session.uid, limit)
            .map_err(to_error)?;
        Ok(items.into_iter().map(to_item).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> LocalBackend {
        LocalBackend::new(Arc::new(LocalStore::in_memory().unwrap()), 30)
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let backend = backend();
        let created = backend.sign_up("a@b.com", "secret1").await.unwrap();
        let signed_in = backend.sign_in("a@b.com", "secret1").await.unwrap();

        assert_eq!(created.uid, signed_in.uid);
        assert!(!signed_in.is_expired());
        assert!(signed_in.id_token.is_none());
    }

    #[tokio::test]
    async fn test_refresh_restamps_expiry() {
        let backend = backend();
        let mut lapsed = backend.sign_up("a@b.com", "secret1").await.unwrap();
        lapsed.expires_at = Utc::now() - Duration::seconds(1);

        let fresh = backend.refresh(&lapsed).await.unwrap();
        assert_eq!(fresh.uid, lapsed.uid);
        assert_eq!(fresh.email, "a@b.com");
        assert!(!fresh.is_expired());
    }

    #[tokio::test]
    async fn test_refresh_rejects_unknown_account() {
        let backend = backend();
        let session = backend.session_for("ghost".into(), "ghost@b.com".into());
        assert!(matches!(backend.refresh(&session).await, Err(Error::Auth(_))));

        let mut tokenless = backend.sign_up("a@b.com", "secret1").await.unwrap();
        tokenless.refresh_token = None;
        assert!(matches!(backend.refresh(&tokenless).await, Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_is_auth_error() {
        let backend = backend();
        backend.sign_up("a@b.com", "secret1").await.unwrap();

        match backend.sign_up("a@b.com", "secret1").await {
            Err(Error::Auth(msg)) => assert_eq!(msg, "Email already in use"),
            other => panic!("expected auth error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_reports_missing() {
        let backend = backend();
        let session = backend.sign_up("a@b.com", "secret1").await.unwrap();
        let item = backend.create(&session, "https://x/1.gif").await.unwrap();

        assert!(backend.delete(&session, &item.id).await.unwrap());
        assert!(!backend.delete(&session, &item.id).await.unwrap());
    }
}
