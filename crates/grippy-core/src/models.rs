use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Results per page, both for requests and page math
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Max favorites returned by a single list call
pub const DEFAULT_LIST_LIMIT: usize = 10;

/// The signed-in identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Partition key for favorites
    pub uid: String,
    pub email: String,
    /// Bearer token for backends that need one
    #[serde(default)]
    pub id_token: Option<String>,
    /// Trades for a new `id_token` once this one lapses
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// One GIF from a search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub preview_url: String,
}

/// Where we are in the provider's result set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageCursor {
    pub total_count: u32,
    pub count: u32,
    pub offset: u32,
    pub page_size: u32,
}

impl PageCursor {
    pub fn empty(page_size: u32) -> Self {
        Self {
            total_count: 0,
            count: 0,
            offset: 0,
            page_size,
        }
    }

    /// ceil(total_count / page_size)
    pub fn page_count(&self) -> u32 {
        crate::search::page_count(self.total_count, self.page_size)
    }

    /// 1-based page the cursor sits on
    pub fn current_page(&self) -> u32 {
        if self.page_size == 0 {
            return 1;
        }
        self.offset / self.page_size + 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page() < self.page_count()
    }

    pub fn has_previous(&self) -> bool {
        self.current_page() > 1
    }
}

/// A page of results plus the cursor it came with
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchPage {
    pub items: Vec<SearchResult>,
    pub cursor: PageCursor,
}

impl SearchPage {
    pub fn empty(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            cursor: PageCursor::empty(page_size),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A saved GIF URL owned by one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FavoriteItem {
    pub id: String,
    pub url: String,
}
