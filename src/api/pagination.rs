//! Ordered cursor over the provider's paginated listings.
//!
//! Listings come back as `{"<field>": [...], "meta": {"total": N}}`. The cursor
//! walks `?page=P&per_page=S` in order and yields at most `total` items, so
//! position `i` of the sequence is item `i` of the listing as the provider
//! counted it when the first page was served.

use std::collections::VecDeque;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::ApiError;
use super::http::{Method, Transport};

pub const DEFAULT_PAGE_SIZE: u32 = 50;

pub struct PageCursor<'a, T> {
    transport: &'a dyn Transport,
    url: String,
    field: &'static str,
    page_size: u32,
    next_page: u32,
    total: Option<u64>,
    yielded: u64,
    buffer: VecDeque<T>,
    exhausted: bool,
}

impl<'a, T: DeserializeOwned> PageCursor<'a, T> {
    pub fn new(transport: &'a dyn Transport, url: String, field: &'static str, page_size: u32) -> Self {
        Self {
            transport,
            url,
            field,
            page_size: page_size.max(1),
            next_page: 1,
            total: None,
            yielded: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Total reported by the provider, known once the first page is fetched.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    fn fetch_page(&mut self) -> Result<(), ApiError> {
        let page_url = format!(
            "{}?page={}&per_page={}",
            self.url, self.next_page, self.page_size
        );
        let body = self.transport.request(Method::Get, &page_url, None)?;
        let decode_error = |message: String| ApiError::Decode {
            url: page_url.clone(),
            message,
        };
        let mut value: Value =
            serde_json::from_str(&body).map_err(|err| decode_error(err.to_string()))?;

        if self.total.is_none() {
            self.total = value
                .get("meta")
                .and_then(|meta| meta.get("total"))
                .and_then(Value::as_u64);
        }
        let items: Vec<T> = match value.get_mut(self.field).map(Value::take) {
            Some(raw) => {
                serde_json::from_value(raw).map_err(|err| decode_error(err.to_string()))?
            }
            None => return Err(decode_error(format!("missing `{}` array", self.field))),
        };
        debug!(
            "[pages] {} page {} returned {} item(s) (total {:?})",
            self.url,
            self.next_page,
            items.len(),
            self.total
        );
        self.next_page += 1;

        let received = items.len();
        let remaining = match self.total {
            Some(total) => total.saturating_sub(self.yielded) as usize,
            None => received,
        };
        if received == 0 {
            if remaining > 0 && self.total.is_some() {
                warn!(
                    "[pages] {} ended after {} of {:?} item(s)",
                    self.url, self.yielded, self.total
                );
            }
            self.exhausted = true;
        } else if self.total.is_none() && received < self.page_size as usize {
            self.exhausted = true;
        }
        self.buffer.extend(items.into_iter().take(remaining));
        Ok(())
    }
}

impl<T: DeserializeOwned> Iterator for PageCursor<'_, T> {
    type Item = Result<T, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                self.yielded += 1;
                return Some(Ok(item));
            }
            if self.exhausted {
                return None;
            }
            if let Some(total) = self.total {
                if self.yielded >= total {
                    self.exhausted = true;
                    return None;
                }
            }
            if let Err(err) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(err));
            }
        }
    }
}
