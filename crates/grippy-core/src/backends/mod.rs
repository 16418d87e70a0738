// Auth + favorites backends
pub mod firebase;
pub mod local;

pub use firebase::FirebaseBackend;
pub use local::LocalBackend;
