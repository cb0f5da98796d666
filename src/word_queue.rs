//! # Word Queue Module
//!
//! Batch prefetcher holding the study items of one (user, language, filters)
//! tuple. Items are fetched one page at a time; a page shorter than the
//! requested size means the backend has nothing more to offer.
//!
//! Fetch failures are returned to the caller untouched. The queue never
//! retries; recovery is owned by the meta-state layer.

use chrono::NaiveDate;
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::backend::{BackendGateway, BackendUserId};
use crate::errors::GatewayError;
use crate::word_model::{QueueFilters, StudyItem};

/// Ordered, filtered buffer of study items with paging state
#[derive(Debug, Clone)]
pub struct WordQueue {
    user_id: BackendUserId,
    language_id: String,
    filters: QueueFilters,
    page_size: usize,
    buffer: VecDeque<StudyItem>,
    /// Start word for the next page
    next_start_word: u32,
    backend_exhausted: bool,
    requested: usize,
    received: usize,
}

impl WordQueue {
    pub fn new(user_id: BackendUserId, language_id: &str, filters: QueueFilters, page_size: usize) -> Self {
        Self {
            user_id,
            language_id: language_id.to_string(),
            filters,
            page_size: page_size.max(1),
            buffer: VecDeque::new(),
            next_start_word: filters.start_word.max(1),
            backend_exhausted: false,
            requested: 0,
            received: 0,
        }
    }

    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    pub fn filters(&self) -> QueueFilters {
        self.filters
    }

    /// Items fetched but not yet served
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_backend_exhausted(&self) -> bool {
        self.backend_exhausted
    }

    /// Total items requested from and received from the backend, for diagnostics
    pub fn counters(&self) -> (usize, usize) {
        (self.requested, self.received)
    }

    /// Whether this queue serves the given user, language and filters
    pub fn matches(&self, user_id: BackendUserId, language_id: &str, filters: QueueFilters) -> bool {
        self.user_id == user_id && self.language_id == language_id && self.filters == filters
    }

    /// Replace the filters; any change discards buffered items and paging state
    pub fn set_filters(&mut self, filters: QueueFilters) {
        if self.filters != filters {
            debug!(language_id = %self.language_id, ?filters, "Word queue filters changed");
            self.filters = filters;
            self.invalidate();
        }
    }

    /// Drop everything buffered so the next request performs a fresh fetch
    pub fn invalidate(&mut self) {
        self.buffer.clear();
        self.next_start_word = self.filters.start_word.max(1);
        self.backend_exhausted = false;
    }

    /// Return the next study item, fetching a page when the buffer is drained
    ///
    /// `Ok(None)` is the terminal "everything studied" condition: the buffer
    /// is empty and the last page was short, so the backend is not asked again.
    pub async fn ensure_available<B: BackendGateway>(
        &mut self,
        backend: &B,
        today: NaiveDate,
    ) -> Result<Option<StudyItem>, GatewayError> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            if self.backend_exhausted {
                return Ok(None);
            }
            self.fetch_page(backend, today).await?;
        }
    }

    async fn fetch_page<B: BackendGateway>(&mut self, backend: &B, today: NaiveDate) -> Result<(), GatewayError> {
        let filters = QueueFilters {
            start_word: self.next_start_word,
            ..self.filters
        };
        self.requested += self.page_size;

        let page = backend
            .fetch_study_items(self.user_id, &self.language_id, filters, self.page_size)
            .await?;

        let page_len = page.len();
        self.received += page_len;
        if page_len < self.page_size {
            self.backend_exhausted = true;
        }
        if let Some(last) = page.iter().map(|item| item.word_number).max() {
            self.next_start_word = last.saturating_add(1);
        } else {
            self.backend_exhausted = true;
        }

        let admitted: Vec<StudyItem> = page
            .into_iter()
            .filter(|item| self.filters.admits(item, today))
            .collect();
        info!(
            language_id = %self.language_id,
            start_word = filters.start_word,
            received = page_len,
            admitted = admitted.len(),
            exhausted = self.backend_exhausted,
            "Fetched study items page"
        );
        self.buffer.extend(admitted);
        Ok(())
    }
}
