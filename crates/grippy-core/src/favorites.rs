use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::auth::Authenticator;
use crate::models::{FavoriteItem, Session, DEFAULT_LIST_LIMIT};
use crate::Result;

/// The four document operations favorites need, scoped to one user's
/// collection. Failures come back as `Error::Storage`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    async fn create(&self, session: &Session, url: &str) -> Result<FavoriteItem>;
    async fn find_by_url(&self, session: &Session, url: &str) -> Result<Vec<FavoriteItem>>;
    /// `Ok(false)` when no such item existed
    async fn delete(&self, session: &Session, id: &str) -> Result<bool>;
    async fn list(&self, session: &Session, limit: usize) -> Result<Vec<FavoriteItem>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(FavoriteItem),
    AlreadyExists,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOutcome {
    Items(Vec<FavoriteItem>),
    Denied,
}

impl AddOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            AddOutcome::Added(_) => "GIF added to favorites!",
            AddOutcome::AlreadyExists => "GIF already added to favorites!",
            AddOutcome::Denied => "You need to be logged in to save favorites.",
        }
    }
}

impl RemoveOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            RemoveOutcome::Removed => "GIF removed from favorites.",
            RemoveOutcome::NotFound => "That GIF was already removed.",
            RemoveOutcome::Denied => "You need to be logged in to manage favorites.",
        }
    }
}

/// Per-user favorites: list, add with dedupe, remove by id.
///
/// Every call goes through `Authenticator::ensure_fresh`, so a lapsed token
/// is refreshed before the store sees it.
#[derive(Clone)]
pub struct FavoritesWorkflow {
    store: Arc<dyn FavoriteStore>,
    auth: Authenticator,
    limit: usize,
}

impl FavoritesWorkflow {
    pub fn new(store: Arc<dyn FavoriteStore>, auth: Authenticator) -> Self {
        Self {
            store,
            auth,
            limit: DEFAULT_LIST_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub async fn list(&self) -> Result<ListOutcome> {
        let Some(session) = self.auth.ensure_fresh().await else {
            debug!("Favorites list denied: no session");
            return Ok(ListOutcome::Denied);
        };

        let items = self
            .store
            .list(&session, self.limit)
            .await
            .map_err(|e| {
                error!("Error fetching favorite GIFs: {}", e);
                e
            })?;

        debug!("Loaded {} favorites for {}", items.len(), session.uid);
        Ok(ListOutcome::Items(items))
    }

    /// Check-then-insert; a URL already saved by this user is not written again
    pub async fn add(&self, url: &str) -> Result<AddOutcome> {
        let Some(session) = self.auth.ensure_fresh().await else {
            warn!("Refusing to save favorite without a session");
            return Ok(AddOutcome::Denied);
        };

        let existing = self
            .store
            .find_by_url(&session, url)
            .await
            .map_err(|e| {
                error!("Error adding GIF to favorites: {}", e);
                e
            })?;

        if !existing.is_empty() {
            debug!("{} already in favorites for {}", url, session.uid);
            return Ok(AddOutcome::AlreadyExists);
        }

        let item = self.store.create(&session, url).await.map_err(|e| {
            error!("Error adding GIF to favorites: {}", e);
            e
        })?;

        info!("Saved favorite {} for {}", item.id, session.uid);
        Ok(AddOutcome::Added(item))
    }

    pub async fn remove(&self, id: &str) -> Result<RemoveOutcome> {
        let Some(session) = self.auth.ensure_fresh().await else {
            warn!("Refusing to delete favorite without a session");
            return Ok(RemoveOutcome::Denied);
        };

        let existed = self.store.delete(&session, id).await.map_err(|e| {
            error!("Error deleting favorite GIF: {}", e);
            e
        })?;

        if existed {
            info!("Removed favorite {} for {}", id, session.uid);
            Ok(RemoveOutcome::Removed)
        } else {
            debug!("Favorite {} not found for {}", id, session.uid);
            Ok(RemoveOutcome::NotFound)
        }
    }
}

/// The caller-side list of favorites.
///
/// Removals are applied locally as soon as the backend confirms them, so the
/// list never needs a re-fetch to stay consistent.
#[derive(Debug, Default)]
pub struct FavoritesView {
    items: Vec<FavoriteItem>,
}

impl FavoritesView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[FavoriteItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&FavoriteItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Reload from the backend. On `Denied` the view is emptied.
    pub async fn refresh(&mut self, workflow: &FavoritesWorkflow) -> Result<ListOutcome> {
        let outcome = workflow.list().await?;
        match &outcome {
            ListOutcome::Items(items) => self.items = items.clone(),
            ListOutcome::Denied => self.items.clear(),
        }
        Ok(outcome)
    }

    pub async fn remove(&mut self, workflow: &FavoritesWorkflow, id: &str) -> Result<RemoveOutcome> {
        let outcome = workflow.remove(id).await?;
        // Gone either way
        if matches!(outcome, RemoveOutcome::Removed | RemoveOutcome::NotFound) {
            self.items.retain(|item| item.id != id);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MockAuthBackend;
    use crate::session::SessionProvider;
    use crate::Error;
    use chrono::{Duration, Utc};

    fn alice(valid_for: Duration) -> Session {
        Session {
            uid: "alice".into(),
            email: "alice@example.com".into(),
            id_token: Some("token-1".into()),
            refresh_token: Some("refresh-1".into()),
            expires_at: Utc::now() + valid_for,
        }
    }

    fn auth_with(session: Option<Session>, backend: MockAuthBackend) -> Authenticator {
        let sessions = SessionProvider::new();
        sessions.publish(session);
        Authenticator::new(Arc::new(backend), sessions)
    }

    fn signed_in() -> Authenticator {
        let mut backend = MockAuthBackend::new();
        backend.expect_refresh().times(0);
        auth_with(Some(alice(Duration::hours(1))), backend)
    }

    fn signed_out() -> Authenticator {
        auth_with(None, MockAuthBackend::new())
    }

    fn item(id: &str, url: &str) -> FavoriteItem {
        FavoriteItem {
            id: id.into(),
            url: url.into(),
        }
    }

    #[tokio::test]
    async fn test_add_new_url_writes_once() {
        let mut store = MockFavoriteStore::new();
        store
            .expect_find_by_url()
            .withf(|session, url| session.uid == "alice" && url == "https://x/1.gif")
            .times(1)
            .returning(|_, _| Ok(Vec::new()));
        store
            .expect_create()
            .times(1)
            .returning(|_, url| Ok(item("fav-1", url)));

        let workflow = FavoritesWorkflow::new(Arc::new(store), signed_in());
        let outcome = workflow.add("https://x/1.gif").await.unwrap();
        assert_eq!(outcome, AddOutcome::Added(item("fav-1", "https://x/1.gif")));
    }

    #[tokio::test]
    async fn test_add_existing_url_does_not_write() {
        let mut store = MockFavoriteStore::new();
        store
            .expect_find_by_url()
            .times(1)
            .returning(|_, url| Ok(vec![item("fav-1", url)]));
        store.expect_create().times(0);

        let workflow = FavoritesWorkflow::new(Arc::new(store), signed_in());
        assert_eq!(
            workflow.add("https://x/1.gif").await.unwrap(),
            AddOutcome::AlreadyExists
        );
    }

    #[tokio::test]
    async fn test_unauthenticated_calls_never_touch_store() {
        let mut store = MockFavoriteStore::new();
        store.expect_find_by_url().times(0);
        store.expect_create().times(0);
        store.expect_delete().times(0);
        store.expect_list().times(0);

        let workflow = FavoritesWorkflow::new(Arc::new(store), signed_out());
        assert_eq!(workflow.add("https://x/1.gif").await.unwrap(), AddOutcome::Denied);
        assert_eq!(workflow.remove("fav-1").await.unwrap(), RemoveOutcome::Denied);
        assert_eq!(workflow.list().await.unwrap(), ListOutcome::Denied);
    }

    #[tokio::test]
    async fn test_lapsed_session_is_refreshed_before_store_call() {
        let mut backend = MockAuthBackend::new();
        backend.expect_refresh().times(1).returning(|s| {
            let mut fresh = s.clone();
            fresh.id_token = Some("token-2".into());
            fresh.expires_at = Utc::now() + Duration::hours(1);
            Ok(fresh)
        });
        let auth = auth_with(Some(alice(Duration::milliseconds(100))), backend);
        let sessions = auth.sessions().clone();

        let mut store = MockFavoriteStore::new();
        store
            .expect_find_by_url()
            .withf(|session, _| session.id_token.as_deref() == Some("token-2"))
            .times(1)
            .returning(|_, _| Ok(Vec::new()));
        store
            .expect_create()
            .withf(|session, _| !session.is_expired())
            .times(1)
            .returning(|_, url| Ok(item("fav-1", url)));

        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        let workflow = FavoritesWorkflow::new(Arc::new(store), auth);
        assert_eq!(
            workflow.add("https://x/1.gif").await.unwrap(),
            AddOutcome::Added(item("fav-1", "https://x/1.gif"))
        );
        assert!(sessions.is_authenticated());
    }

    #[tokio::test]
    async fn test_failed_refresh_denies_and_signs_out() {
        let mut backend = MockAuthBackend::new();
        backend
            .expect_refresh()
            .times(1)
            .returning(|_| Err(Error::Auth("TOKEN_EXPIRED".into())));
        let auth = auth_with(Some(alice(Duration::seconds(-1))), backend);
        let mut sub = auth.sessions().subscribe();

        let mut store = MockFavoriteStore::new();
        store.expect_list().times(0);

        let workflow = FavoritesWorkflow::new(Arc::new(store), auth);
        assert_eq!(workflow.list().await.unwrap(), ListOutcome::Denied);
        assert_eq!(sub.poll_change(), Some(None));
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_error() {
        let mut store = MockFavoriteStore::new();
        store
            .expect_find_by_url()
            .times(1)
            .returning(|_, _| Err(Error::Storage("unavailable".into())));
        store.expect_create().times(0);

        let workflow = FavoritesWorkflow::new(Arc::new(store), signed_in());
        assert!(matches!(
            workflow.add("https://x/1.gif").await,
            Err(Error::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_list_uses_limit() {
        let mut store = MockFavoriteStore::new();
        store
            .expect_list()
            .withf(|_, limit| *limit == 10)
            .times(1)
            .returning(|_, _| Ok(vec![item("a", "https://x/a.gif")]));

        let workflow = FavoritesWorkflow::new(Arc::new(store), signed_in());
        assert_eq!(
            workflow.list().await.unwrap(),
            ListOutcome::Items(vec![item("a", "https://x/a.gif")])
        );
    }

    #[tokio::test]
    async fn test_view_drops_removed_item_without_refetch() {
        let mut store = MockFavoriteStore::new();
        store.expect_list().times(1).returning(|_, _| {
            Ok(vec![item("a", "https://x/a.gif"), item("b", "https://x/b.gif")])
        });
        store
            .expect_delete()
            .withf(|_, id| id == "a")
            .times(1)
            .returning(|_, _| Ok(true));

        let workflow = FavoritesWorkflow::new(Arc::new(store), signed_in());
        let mut view = FavoritesView::new();
        view.refresh(&workflow).await.unwrap();
        assert_eq!(view.len(), 2);

        let outcome = view.remove(&workflow, "a").await.unwrap();
        assert_eq!(outcome, RemoveOutcome::Removed);
        assert_eq!(view.items(), &[item("b", "https://x/b.gif")]);
    }

    #[tokio::test]
    async fn test_view_keeps_item_when_delete_fails() {
        let mut store = MockFavoriteStore::new();
        store
            .expect_list()
            .times(1)
            .returning(|_, _| Ok(vec![item("a", "https://x/a.gif")]));
        store
            .expect_delete()
            .times(1)
            .returning(|_, _| Err(Error::Storage("unavailable".into())));

        let workflow = FavoritesWorkflow::new(Arc::new(store), signed_in());
        let mut view = FavoritesView::new();
        view.refresh(&workflow).await.unwrap();

        assert!(view.remove(&workflow, "a").await.is_err());
        assert_eq!(view.len(), 1);
    }
}
