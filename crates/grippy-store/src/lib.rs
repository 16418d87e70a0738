// SQLite-backed local backend
// Accounts and per-user favorites for running without Firebase

pub mod store;

pub use store::{Account, LocalStore, StoreError, StoredFavorite};
