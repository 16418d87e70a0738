// HTTP clients for the services Grippy talks to
pub mod firebase;
pub mod firestore;
pub mod giphy;

// Re-export common types
pub use firebase::{AuthTokens, FirebaseError, IdentityClient, RefreshedTokens};
pub use firestore::{Document, FirestoreClient};
pub use giphy::{GiphyClient, GiphyError, GiphyGif, GiphyPagination, GiphySearchResponse};
