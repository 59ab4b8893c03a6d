//! Cursor pagination

use crate::context::CancelToken;
use crate::error::Error;
use std::collections::HashSet;

/// One page of a remote listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Continuation token; absent or empty means this was the last page
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_token: Option<String>) -> Self {
        Self { items, next_token }
    }

    /// A final page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

/// Walk every page of a listing and return the items in page order.
///
/// `fetch` receives the previous page's token (`None` for the first call).
/// `cancel` is checked before every fetch, so an interrupted listing fails
/// without issuing another request. A fetch error is returned unchanged. A
/// token the listing already returned fails with
/// [`Error::DuplicatePageToken`] instead of looping.
pub fn drain<T, F>(cancel: &CancelToken, mut fetch: F) -> anyhow::Result<Vec<T>>
where
    F: FnMut(Option<&str>) -> anyhow::Result<Page<T>>,
{
    let mut items = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut next: Option<String> = None;

    loop {
        cancel.check()?;
        let page = fetch(next.as_deref())?;
        log::debug!(
            "fetched page of {} item(s) (token: {:?})",
            page.items.len(),
            next
        );
        items.extend(page.items);

        let token = match page.next_token {
            Some(token) if !token.is_empty() => token,
            _ => return Ok(items),
        };

        if !seen.insert(token.clone()) {
            return Err(Error::DuplicatePageToken(token).into());
        }
        next = Some(token);
    }
}
