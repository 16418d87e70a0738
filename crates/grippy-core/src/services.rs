// Wires config into the workflows the UI and CLI call
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::{
    auth::{AuthBackend, Authenticator},
    backends::{FirebaseBackend, LocalBackend},
    config::{BackendKind, Config},
    debounce::DEFAULT_DEBOUNCE,
    favorites::{FavoriteStore, FavoritesWorkflow},
    providers::GiphyProvider,
    search::{GifProvider, SearchWorkflow},
    session::SessionProvider,
    Error, Result,
};

/// Everything a front end needs, sharing one session provider
#[derive(Clone)]
pub struct Services {
    pub sessions: SessionProvider,
    pub auth: Authenticator,
    pub search: SearchWorkflow,
    pub favorites: FavoritesWorkflow,
    pub debounce_window: Duration,
}

impl Services {
    pub fn new(
        auth_backend: Arc<dyn AuthBackend>,
        store: Arc<dyn FavoriteStore>,
        provider: Arc<dyn GifProvider>,
    ) -> Self {
        let sessions = SessionProvider::new();
        let auth = Authenticator::new(auth_backend, sessions.clone());
        Self {
            favorites: FavoritesWorkflow::new(store, auth.clone()),
            auth,
            search: SearchWorkflow::new(provider),
            sessions,
            debounce_window: DEFAULT_DEBOUNCE,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.giphy.api_key.clone().unwrap_or_else(|| {
            warn!("No Giphy API key configured, searches will be rejected");
            String::new()
        });
        let provider: Arc<dyn GifProvider> =
            Arc::new(GiphyProvider::new(api_key, config.giphy.api_url.clone())?);

        let (auth_backend, store): (Arc<dyn AuthBackend>, Arc<dyn FavoriteStore>) =
            match config.backend.kind {
                BackendKind::Local => {
                    let db_path = match &config.backend.local.db_path {
                        Some(path) => path.clone(),
                        None => Config::data_dir()?.join("grippy.db"),
                    };
                    info!("Using local backend at {}", db_path.display());
                    let backend = Arc::new(LocalBackend::open(
                        &db_path,
                        config.backend.local.session_days,
                    )?);
                    let auth: Arc<dyn AuthBackend> = backend.clone();
                    let store: Arc<dyn FavoriteStore> = backend;
                    (auth, store)
                }
                BackendKind::Firebase => {
                    let firebase = &config.backend.firebase;
                    let api_key = firebase.api_key.clone().ok_or_else(|| {
                        Error::Config("backend.firebase.api_key is required".into())
                    })?;
                    let project_id = firebase.project_id.clone().ok_or_else(|| {
                        Error::Config("backend.firebase.project_id is required".into())
                    })?;
                    info!("Using Firebase backend for project {}", project_id);
                    let backend = Arc::new(FirebaseBackend::new(api_key, project_id)?);
                    let auth: Arc<dyn AuthBackend> = backend.clone();
                    let store: Arc<dyn FavoriteStore> = backend;
                    (auth, store)
                }
            };

        let mut services = Self::new(auth_backend, store, provider);
        services.search = services.search.with_page_size(config.giphy.page_size);
        services.favorites = services.favorites.with_limit(config.favorites.list_limit);
        services.debounce_window = Duration::from_millis(config.search.debounce_ms);
        Ok(services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_backend_from_config() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.backend.local.db_path = Some(dir.path().join("db").join("grippy.db"));
        config.search.debounce_ms = 150;

        let services = Services::from_config(&config).unwrap();
        assert_eq!(services.debounce_window, Duration::from_millis(150));
        assert_eq!(services.search.page_size(), 10);
        assert!(!services.sessions.is_authenticated());
    }

    #[test]
    fn test_firebase_requires_project() {
        let mut config = Config::default();
        config.backend.kind = BackendKind::Firebase;
        config.backend.firebase.api_key = Some("key".into());

        assert!(matches!(Services::from_config(&config), Err(Error::Config(_))));
    }
}
