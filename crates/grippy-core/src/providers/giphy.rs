// Giphy provider - bridges the API client with the GifProvider trait
use async_trait::async_trait;
use grippy_api::{GiphyClient, GiphyError, GiphySearchResponse};
use tracing::debug;

use crate::{
    error::ProviderError,
    models::{PageCursor, SearchPage, SearchResult},
    search::GifProvider,
    Error, Result,
};

/// Wrapper around GiphyClient that implements GifProvider
pub struct GiphyProvider {
    client: GiphyClient,
}

impl GiphyProvider {
    pub fn new(api_key: String, api_url: String) -> Result<Self> {
        let client = GiphyClient::with_base_url(api_key, api_url)
            .map_err(|e| Error::Config(format!("Failed to build Giphy client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl GifProvider for GiphyProvider {
    async fn search(
        &self,
        term: &str,
        limit: u32,
        offset: u32,
    ) -> std::result::Result<SearchPage, ProviderError> {
        let response = self
            .client
            .search(term, limit, offset)
            .await
            .map_err(to_provider_error)?;

        Ok(response_to_page(response, limit))
    }
}

fn to_provider_error(err: GiphyError) -> ProviderError {
    match err {
        GiphyError::Status { status, message } => ProviderError::Status { status, message },
        GiphyError::Malformed(msg) => ProviderError::Malformed(msg),
        GiphyError::NetworkError(e) if e.is_decode() => ProviderError::Malformed(e.to_string()),
        GiphyError::NetworkError(e) => ProviderError::Transport(e.to_string()),
    }
}

/// Convert a Giphy response into our page model.
///
/// GIFs without a `fixed_width` rendition have nothing to preview and are
/// skipped; the cursor still reflects what the provider reported.
fn response_to_page(response: GiphySearchResponse, page_size: u32) -> SearchPage {
    let items = response
        .data
        .into_iter()
        .filter_map(|gif| {
            let Some(rendition) = gif.images.fixed_width else {
                debug!("Skipping {}: no fixed_width rendition", gif.id);
                return None;
            };
            Some(SearchResult {
                id: gif.id,
                title: gif.title,
                preview_url: rendition.url,
            })
        })
        .collect();

    SearchPage {
        items,
        cursor: PageCursor {
            total_count: response.pagination.total_count,
            count: response.pagination.count,
            offset: response.pagination.offset,
            page_size,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grippy_api::giphy::parse_search_response;

    #[test]
    fn test_response_maps_to_page() {
        let body = r#"{
            "data": [{"id": "abc", "title": "Dancing cat", "images": {"fixed_width": {"url": "https://media.giphy.com/abc/200w.gif"}}}],
            "pagination": {"total_count": 45, "count": 1, "offset": 10},
            "meta": {"status": 200, "msg": "OK"}
        }"#;
        let page = response_to_page(parse_search_response(200, body).unwrap(), 10);

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].preview_url, "https://media.giphy.com/abc/200w.gif");
        assert_eq!(page.cursor.page_count(), 5);
        assert_eq!(page.cursor.current_page(), 2);
    }

    #[test]
    fn test_gif_without_preview_is_skipped() {
        let body = r#"{
            "data": [
                {"id": "abc", "title": "Cat", "images": {"fixed_width": {"url": "https://media.giphy.com/abc/200w.gif"}}},
                {"id": "still", "title": "Still", "images": {"original": {"url": "https://media.giphy.com/still.gif"}}}
            ],
            "pagination": {"total_count": 2, "count": 2, "offset": 0},
            "meta": {"status": 200, "msg": "OK"}
        }"#;
        let page = response_to_page(parse_search_response(200, body).unwrap(), 10);

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "abc");
        assert_eq!(page.cursor.total_count, 2);
    }

    #[test]
    fn test_status_and_shape_errors_stay_distinct() {
        assert_eq!(
            to_provider_error(GiphyError::Status {
                status: 429,
                message: "Too many".into()
            }),
            ProviderError::Status {
                status: 429,
                message: "Too many".into()
            }
        );
        assert_eq!(
            to_provider_error(GiphyError::Malformed("missing data".into())),
            ProviderError::Malformed("missing data".into())
        );
    }
}
