pub mod normalize;
pub mod params;

use crate::core::feed::fetcher::{fetch_feed, FetchError};
use crate::core::feed::parser::{parse_shelf_feed, FeedParseError};
use normalize::{NormalizeError, ShelfEnvelope};
use params::ShelfParams;

/// Everything that can go wrong once the parameters are accepted.
#[derive(Debug, thiserror::Error)]
pub enum ShelfError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("parse failed: {0}")]
    Parse(#[from] FeedParseError),
    #[error("normalize failed: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ShelfError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Parse(_) => "parse",
            Self::Normalize(_) => "normalize",
            Self::Encode(_) => "encode",
        }
    }
}

pub async fn load_shelf(
    client: &reqwest::Client,
    upstream_base: &str,
    params: &ShelfParams,
) -> Result<ShelfEnvelope, ShelfError> {
    let url = params.feed_url(upstream_base);
    let fetched = fetch_feed(client, &url).await?;
    let parsed = parse_shelf_feed(&fetched.body)?;
    tracing::trace!(
        url = %url,
        bytes = fetched.body.len(),
        content_type = fetched.content_type.as_deref().unwrap_or_default(),
        feed_title = parsed.title.as_deref().unwrap_or_default(),
        items = parsed.items.len(),
        "parsed shelf feed"
    );
    Ok(ShelfEnvelope::from_items(parsed.items)?)
}

/// Fetches, normalizes and serializes a shelf in one pass.
pub async fn render_shelf(
    client: &reqwest::Client,
    upstream_base: &str,
    params: &ShelfParams,
) -> Result<(usize, Vec<u8>), ShelfError> {
    let envelope = load_shelf(client, upstream_base, params).await?;
    let body = serde_json::to_vec(&envelope)?;
    Ok((envelope.count, body))
}
