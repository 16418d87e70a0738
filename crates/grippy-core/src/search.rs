use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::error::ProviderError;
use crate::models::{SearchPage, DEFAULT_PAGE_SIZE};

/// Trait for GIF search backends
///
/// Giphy is the only real one; tests swap in mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GifProvider: Send + Sync {
    async fn search(
        &self,
        term: &str,
        limit: u32,
        offset: u32,
    ) -> std::result::Result<SearchPage, ProviderError>;
}

/// ceil(total / page_size), zero when there is nothing to page through
pub fn page_count(total_count: u32, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    ((u64::from(total_count) + u64::from(page_size) - 1) / u64::from(page_size)) as u32
}

/// Pagination controls are 1-based, the workflow is 0-based
pub fn request_page(ui_page: u32) -> u32 {
    ui_page.saturating_sub(1)
}

/// Paged GIF search
#[derive(Clone)]
pub struct SearchWorkflow {
    provider: Arc<dyn GifProvider>,
    page_size: u32,
}

impl SearchWorkflow {
    pub fn new(provider: Arc<dyn GifProvider>) -> Self {
        Self {
            provider,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset_for(&self, page: u32) -> u32 {
        page.saturating_mul(self.page_size)
    }

    /// Search and report failures to the caller
    pub async fn try_search(&self, term: &str, page: u32) -> std::result::Result<SearchPage, ProviderError> {
        let offset = self.offset_for(page);
        info!("Searching for '{}' (page {}, offset {})", term, page, offset);
        self.provider.search(term, self.page_size, offset).await
    }

    /// Search, turning any failure into an empty page.
    ///
    /// Failures are logged here and nowhere else.
    pub async fn search(&self, term: &str, page: u32) -> SearchPage {
        match self.try_search(term, page).await {
            Ok(results) => {
                info!(
                    "Got {} results ({} total)",
                    results.items.len(),
                    results.cursor.total_count
                );
                results
            }
            Err(err @ ProviderError::Status { .. }) => {
                warn!("Search for '{}' rejected by provider: {}", term, err);
                SearchPage::empty(self.page_size)
            }
            Err(err @ ProviderError::Malformed(_)) => {
                error!("Search for '{}' returned an unexpected response: {}", term, err);
                SearchPage::empty(self.page_size)
            }
            Err(err @ ProviderError::Transport(_)) => {
                warn!("Search for '{}' failed: {}", term, err);
                SearchPage::empty(self.page_size)
            }
        }
    }
}

/// Identifies one dispatched search
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

/// Keeps late responses from overwriting newer ones.
///
/// Every dispatch takes a fresh token; a response is only applied if its token
/// is still the latest one handed out.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: u64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> RequestToken {
        self.latest += 1;
        RequestToken(self.latest)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.latest
    }

    /// Make everything in flight stale
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}
