use serde::Serialize;
use std::sync::Arc;

use super::clicks::ClickRecorder;
use super::error::ShortenerError;
use crate::storage::Storage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub original_url: String,
}

/// Resolves short codes for the redirect path and hands the visit to the
/// click recorder without waiting on it.
pub struct RedirectResolver {
    storage: Arc<dyn Storage>,
    clicks: Arc<ClickRecorder>,
}

impl RedirectResolver {
    pub fn new(storage: Arc<dyn Storage>, clicks: Arc<ClickRecorder>) -> Self {
        Self { storage, clicks }
    }

    /// Look up `code` and return its target verbatim.
    ///
    /// A missing code yields `ShortenerError::NotFound` and records nothing.
    pub async fn resolve(&self, code: &str) -> Result<Resolution, ShortenerError> {
        let link = self
            .storage
            .find_by_code(code)
            .await?
            .ok_or(ShortenerError::NotFound)?;

        self.clicks.record(&link.short_code);

        Ok(Resolution {
            original_url: link.original_url,
        })
    }
}
