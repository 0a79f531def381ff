//! Paging over the registry device list

use std::collections::VecDeque;

use futures::{Stream, TryStreamExt};
use otagate_api::Device;
use otagate_api::responses::{DeviceSummary, RegistryPage};
use tracing::debug;

use crate::backends::Backends;
use crate::devices::{DEVICES_RESOURCE, summarize};
use crate::error::CoreError;

/// Registry page size used when listing devices
pub const PAGE_LIMIT: u64 = 100;

/// Cursor over every device matching an optional registry regex
///
/// Pages are fetched one at a time, only once the previous page has been
/// consumed. The `total` reported by the first page decides when to stop;
/// devices added or removed while paging may be missed or seen twice.
/// Create a new pager to start over.
pub struct DevicePager {
    backends: Backends,
    regex: Option<String>,
    offset: u64,
    limit: u64,
    total: Option<u64>,
    buffered: VecDeque<Device>,
    exhausted: bool,
}

impl DevicePager {
    #[must_use]
    pub fn new(backends: Backends, regex: Option<String>) -> Self {
        Self {
            backends,
            regex,
            offset: 0,
            limit: PAGE_LIMIT,
            total: None,
            buffered: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Override the page size
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Offset of the next page to fetch
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Device count reported by the first page, once fetched
    #[must_use]
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Next enriched device, or `None` once the listing is exhausted
    ///
    /// # Errors
    /// Returns `CoreError::Backend` if a page or an enrichment call fails.
    pub async fn next(&mut self) -> Result<Option<DeviceSummary>, CoreError> {
        loop {
            if let Some(device) = self.buffered.pop_front() {
                return summarize(&self.backends, device).await.map(Some);
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_page().await?;
        }
    }

    async fn fetch_page(&mut self) -> Result<(), CoreError> {
        let mut query = vec![
            ("offset", self.offset.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(regex) = &self.regex {
            query.push(("regex", regex.clone()));
        }

        let page: RegistryPage<Device> = self
            .backends
            .registry
            .get_with(DEVICES_RESOURCE, &query)
            .await?;
        let total = *self.total.get_or_insert(page.total);
        debug!(
            offset = self.offset,
            total,
            count = page.values.len(),
            "fetched device page"
        );

        // an empty page means the registry shrank underneath us
        self.exhausted = page.values.is_empty();
        self.buffered.extend(page.values);
        self.offset += self.limit;
        if self.offset >= total {
            self.exhausted = true;
        }
        Ok(())
    }

    /// Adapt the cursor into a stream; it ends after the first error
    pub fn into_stream(self) -> impl Stream<Item = Result<DeviceSummary, CoreError>> {
        futures::stream::try_unfold(self, |mut pager| async move {
            let next = pager.next().await?;
            Ok::<_, CoreError>(next.map(|device| (device, pager)))
        })
    }

    /// Drain the whole listing
    ///
    /// # Errors
    /// Returns the first error hit while paging.
    pub async fn collect_all(self) -> Result<Vec<DeviceSummary>, CoreError> {
        self.into_stream().try_collect().await
    }
}
