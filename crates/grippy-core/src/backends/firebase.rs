// Firebase backend - Identity Toolkit for accounts, Firestore for favorites
use async_trait::async_trait;
use chrono::{Duration, Utc};
use grippy_api::{
    AuthTokens, Document, FirebaseError, FirestoreClient, IdentityClient, RefreshedTokens,
};

use crate::{
    auth::AuthBackend,
    favorites::FavoriteStore,
    models::{FavoriteItem, Session},
    Error, Result,
};

/// Favorites live at `favourite/{uid}/gifs/{id}` with a single `url` field
const FAVORITES_ROOT: &str = "favourite";
const FAVORITES_COLLECTION: &str = "gifs";
const URL_FIELD: &str = "url";

pub struct FirebaseBackend {
    identity: IdentityClient,
    firestore: FirestoreClient,
}

impl FirebaseBackend {
    pub fn new(api_key: String, project_id: String) -> Result<Self> {
        let identity = IdentityClient::new(api_key).map_err(config_error)?;
        let firestore = FirestoreClient::new(project_id).map_err(config_error)?;
        Ok(Self::with_clients(identity, firestore))
    }

    pub fn with_clients(identity: IdentityClient, firestore: FirestoreClient) -> Self {
        Self {
            identity,
            firestore,
        }
    }
}

fn config_error(err: FirebaseError) -> Error {
    Error::Config(format!("Failed to build Firebase client: {}", err))
}

fn auth_error(err: FirebaseError) -> Error {
    match err {
        FirebaseError::Auth(msg) => Error::Auth(msg),
        other => Error::Auth(other.to_string()),
    }
}

fn storage_error(err: FirebaseError) -> Error {
    Error::Storage(err.to_string())
}

fn ttl(expires_in_secs: u64) -> Duration {
    Duration::seconds(i64::try_from(expires_in_secs).unwrap_or(3600))
}

fn non_empty(token: String) -> Option<String> {
    Some(token).filter(|t| !t.is_empty())
}

fn session_from_tokens(tokens: AuthTokens) -> Session {
    let expires_at = Utc::now() + ttl(tokens.expires_in_secs());
    Session {
        uid: tokens.local_id,
        email: tokens.email,
        id_token: Some(tokens.id_token),
        refresh_token: non_empty(tokens.refresh_token),
        expires_at,
    }
}

/// The token endpoint does not echo the email, so it carries over
fn refreshed_session(previous: &Session, tokens: RefreshedTokens) -> Session {
    let expires_at = Utc::now() + ttl(tokens.expires_in_secs());
    Session {
        uid: tokens.user_id,
        email: previous.email.clone(),
        id_token: Some(tokens.id_token),
        refresh_token: non_empty(tokens.refresh_token).or_else(|| previous.refresh_token.clone()),
        expires_at,
    }
}

fn parent_path(session: &Session) -> String {
    format!("{}/{}", FAVORITES_ROOT, session.uid)
}

fn id_token(session: &Session) -> Result<&str> {
    session
        .id_token
        .as_deref()
        .ok_or_else(|| Error::Auth("Session has no Firebase token, sign in again.".into()))
}

/// Documents without a url field are skipped
fn to_item(doc: Document) -> Option<FavoriteItem> {
    let url = doc.field(URL_FIELD)?.to_string();
    Some(FavoriteItem { id: doc.id, url })
}

#[async_trait]
impl AuthBackend for FirebaseBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let tokens = self
            .identity
            .sign_in_with_password(email, password)
            .await
            .map_err(auth_error)?;
        Ok(session_from_tokens(tokens))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        let tokens = self
            .identity
            .sign_up(email, password)
            .await
            .map_err(auth_error)?;
        Ok(session_from_tokens(tokens))
    }

    async fn sign_out(&self, _session: &Session) -> Result<()> {
        // ID tokens are stateless; dropping the session is all sign-out means
        Ok(())
    }

    async fn refresh(&self, session: &Session) -> Result<Session> {
        let refresh_token = session
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Auth("Session expired, sign in again.".into()))?;

        let tokens = self
            .identity
            .refresh_id_token(refresh_token)
            .await
            .map_err(auth_error)?;
        Ok(refreshed_session(session, tokens))
    }
}

#[async_trait]
impl FavoriteStore for FirebaseBackend {
    async fn create(&self, session: &Session, url: &str) -> Result<FavoriteItem> {
        let doc = self
            .firestore
            .create_document(
                id_token(session)?,
                &parent_path(session),
                FAVORITES_COLLECTION,
                &[(URL_FIELD, url)],
            )
            .await
            .map_err(storage_error)?;

        Ok(FavoriteItem {
            id: doc.id,
            url: url.to_string(),
        })
    }

    async fn find_by_url(&self, session: &Session, url: &str) -> Result<Vec<FavoriteItem>> {
        let docs = self
            .firestore
            .query_by_field(
                id_token(session)?,
                &parent_path(session),
                FAVORITES_COLLECTION,
                URL_FIELD,
                url,
            )
            .await
            .map_err(storage_error)?;

        Ok(docs.into_iter().filter_map(to_item).collect())
    }

    async fn delete(&self, session: &Session, id: &str) -> Result<bool> {
        match self
            .firestore
            .delete_document(
                id_token(session)?,
                &parent_path(session),
                FAVORITES_COLLECTION,
                id,
            )
            .await
        {
            Ok(()) => Ok(true),
            Err(FirebaseError::NotFound(_)) => Ok(false),
            Err(e) => Err(storage_error(e)),
        }
    }

    async fn list(&self, session: &Session, limit: usize) -> Result<Vec<FavoriteItem>> {
        let docs = self
            .firestore
            .list_documents(
                id_token(session)?,
                &parent_path(session),
                FAVORITES_COLLECTION,
                limit,
            )
            .await
            .map_err(storage_error)?;

        Ok(docs.into_iter().filter_map(to_item).take(limit).collect())
    }
}
