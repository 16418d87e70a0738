// Core workflows: sessions, search, favorites, navigation
pub mod auth;
pub mod backends;
pub mod config;
pub mod debounce;
pub mod error;
pub mod favorites;
pub mod models;
pub mod navigation;
pub mod providers;
pub mod search;
pub mod services;
pub mod session;
pub mod session_store;
pub mod validation;

pub use auth::{AuthBackend, Authenticator};
pub use config::Config;
pub use debounce::Debouncer;
pub use error::{Error, ProviderError};
pub use favorites::{AddOutcome, FavoriteStore, FavoritesView, FavoritesWorkflow, ListOutcome, RemoveOutcome};
pub use models::{FavoriteItem, PageCursor, SearchPage, SearchResult, Session};
pub use navigation::{AuthState, Navigator, Screen};
pub use search::{GifProvider, RequestToken, RequestTracker, SearchWorkflow};
pub use services::Services;
pub use session::{SessionProvider, SessionSubscription};
pub use session_store::SessionStore;

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
