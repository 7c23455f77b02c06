//! Paginated Fetcher
//!
//! Walks `path?page=N` from page 1, concatenating items in page order until
//! the reported `total_pages` is exhausted. An empty page ends the walk even
//! when the metadata claims more pages remain.

use super::dispatcher::RequestDispatcher;
use super::types::{ListEnvelope, Page, PanelRequest};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Aggregates every page of a listing endpoint
pub struct PaginatedFetcher<'a> {
    dispatcher: &'a RequestDispatcher,
}

impl<'a> PaginatedFetcher<'a> {
    pub fn new(dispatcher: &'a RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Fetch a single page
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page: u32,
    ) -> crate::Result<Page<T>> {
        let response = self
            .dispatcher
            .execute(PanelRequest::get(path).with_query("page", page))
            .await?;

        let envelope: ListEnvelope<T> = response.decode()?;
        let total_pages = envelope
            .meta
            .pagination
            .as_ref()
            .and_then(|p| p.total_pages)
            .unwrap_or(1);

        Ok(Page {
            items: envelope.into_items(),
            page,
            total_pages,
        })
    }

    /// Fetch every page; any failure discards what was collected so far
    pub async fn fetch_all<T: DeserializeOwned>(&self, path: &str) -> crate::Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let current = self.fetch_page::<T>(path, page).await?;
            if current.items.is_empty() {
                debug!(path = %path, page, "Empty page, stopping pagination");
                break;
            }

            let total_pages = current.total_pages;
            items.extend(current.items);

            page += 1;
            if page > total_pages {
                break;
            }
        }

        debug!(path = %path, pages = page - 1, count = items.len(), "Pagination complete");
        Ok(items)
    }
}
