use std::collections::HashSet;

use cloudsync_cloud::PageRequest;

/// Follows continuation tokens until the provider stops returning one.
///
/// Stops early on a token it has already seen or on the page ceiling; a
/// listing cut short that way is reported as incomplete so callers do not
/// treat it as the full provider view.
#[derive(Debug)]
pub(crate) struct Paginator {
    next: Option<PageRequest>,
    seen: HashSet<String>,
    pages: usize,
    max_pages: usize,
    truncated: bool,
}

impl Paginator {
    pub(crate) fn new(page_size: u32, max_pages: usize) -> Self {
        Self {
            next: Some(PageRequest::first(page_size.max(1))),
            seen: HashSet::new(),
            pages: 0,
            max_pages: max_pages.max(1),
            truncated: false,
        }
    }

    /// The request for the next page, or `None` once the listing is done.
    pub(crate) fn next_request(&self) -> Option<PageRequest> {
        self.next.clone()
    }

    /// Records the continuation token of the page just fetched.
    pub(crate) fn advance(&mut self, next_token: Option<String>) {
        self.pages += 1;
        let current = self.next.take();

        let Some(token) = next_token.filter(|t| !t.is_empty()) else {
            return;
        };
        if self.pages >= self.max_pages {
            tracing::warn!(pages = self.pages, "Listing stopped at page ceiling");
            self.truncated = true;
            return;
        }
        if !self.seen.insert(token.clone()) {
            tracing::warn!(token = %token, "Provider repeated a continuation token");
            self.truncated = true;
            return;
        }
        self.next = current.map(|request| request.next(token));
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.next.is_none() && !self.truncated
    }
}
