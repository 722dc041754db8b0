//! Cursor-based page walking
//!
//! Listing endpoints answer with `{"items": [...], "next": <url or null>}`.
//! [`walk_pages`] follows `next` until it runs out and yields the items one by
//! one, fetching a page only when the consumer has drained the previous one.
//!
//! A page with no items ends the walk even if it carries a `next` cursor.

use std::collections::VecDeque;

use futures::stream::{self, Stream};
use serde_json::Value;
use tracing::debug;

use crate::client::{ApiClient, FetchRequest};
use crate::error::{Error, Result};

/// One decoded page
#[derive(Debug, PartialEq)]
pub(crate) struct Page {
    pub items: Vec<Value>,
    pub next: Option<String>,
}

impl Page {
    /// Decode a page body, rejecting anything that is not `{items: [..], next: str|null}`
    pub(crate) fn from_value(body: Value) -> Result<Self> {
        let Value::Object(mut fields) = body else {
            return Err(Error::shape("page is not a JSON object", body));
        };

        let items = match fields.remove("items") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(Error::shape("page 'items' is not an array", other));
            }
        };

        let next = match fields.remove("next") {
            None | Some(Value::Null) => None,
            Some(Value::String(url)) if url.is_empty() => None,
            Some(Value::String(url)) => Some(url),
            Some(other) => {
                return Err(Error::shape("page 'next' is not a URL or null", other));
            }
        };

        Ok(Self { items, next })
    }
}

struct WalkState {
    client: ApiClient,
    cursor: Option<String>,
    buffered: VecDeque<Value>,
    pages: usize,
}

/// Lazily yield every item of a paginated listing, in page order
///
/// The stream ends after the first error. Walking again re-issues every request.
pub fn walk_pages(
    client: ApiClient,
    start_url: String,
) -> impl Stream<Item = Result<Value>> + Send + 'static {
    let state = WalkState {
        client,
        cursor: Some(start_url),
        buffered: VecDeque::new(),
        pages: 0,
    };

    stream::try_unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.buffered.pop_front() {
                return Ok(Some((item, state)));
            }

            let Some(url) = state.cursor.take() else {
                debug!(pages = state.pages, "Pagination finished");
                return Ok(None);
            };

            let body = state.client.fetch_json(&FetchRequest::get(&url)).await?;
            let page = Page::from_value(body)?;
            state.pages += 1;

            debug!(
                url = %url,
                page = state.pages,
                items = page.items.len(),
                has_next = page.next.is_some(),
                "Fetched page"
            );

            if page.items.is_empty() {
                if page.next.is_some() {
                    debug!(url = %url, "Empty page still carries a next cursor, stopping");
                }
                return Ok(None);
            }

            state.cursor = page.next;
            state.buffered.extend(page.items);
        }
    })
}
