// Search provider implementations
pub mod giphy;

pub use giphy::GiphyProvider;
