//! Mint-site fetching and address candidate scanning.
//!
//! Mint sites embed the candy machine config address somewhere in their
//! bundled javascript. We cannot tell locally which quoted string is the
//! real address, so the scanner collects everything address-shaped and the
//! resolver lets the chain decide.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::{Client, Url};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// System addresses start with a run of ones; none of them are ever a candy
/// machine config.
pub const EXCLUDE_FLAG: &str = "111111111";

/// Well-known program and sysvar addresses that show up in every bundle.
pub const EXCLUDED_ADDRESSES: &[&str] = &[
    "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
    "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL",
    "metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s",
    "cndyAnrLdpjq1Ssp1z8xxDsB8dxe7u4HL5Nxi2K5WXZ",
    "So11111111111111111111111111111111111111112",
    "SysvarRent111111111111111111111111111111111",
    "SysvarC1ock11111111111111111111111111111111",
    "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr",
];

const CANDIDATE_MIN_LEN: usize = 40;
const CANDIDATE_MAX_LEN: usize = 50;

/// Extract address-shaped candidates from scraped site text.
///
/// A candidate is a purely alphanumeric run of 40-50 characters bounded on
/// both sides by `"` in the source, i.e. a quoted string literal. Anything
/// in the exclusion set or carrying the all-ones marker is dropped. The
/// result is deduplicated and unordered.
pub fn extract_candidates<'a, I>(texts: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut candidates = HashSet::new();
    for text in texts {
        let parts: Vec<&str> = text.split('"').collect();
        if parts.len() < 3 {
            continue;
        }
        // Segments strictly between two quote characters.
        for segment in &parts[1..parts.len() - 1] {
            if looks_like_address(segment) {
                candidates.insert((*segment).to_string());
            }
        }
    }
    candidates
}

fn looks_like_address(segment: &str) -> bool {
    (CANDIDATE_MIN_LEN..=CANDIDATE_MAX_LEN).contains(&segment.len())
        && segment.chars().all(|c| c.is_ascii_alphanumeric())
        && !segment.contains(EXCLUDE_FLAG)
        && !EXCLUDED_ADDRESSES.contains(&segment)
}

/// Fetch a mint page and its script bundles, returning the raw text blobs.
///
/// This is deliberately shallow: the page body plus any `<script src>`
/// javascript it references. Full site mirroring is out of scope.
pub async fn fetch_site_text(client: &Client, url: &str) -> Result<Vec<String>> {
    let base = Url::parse(url).map_err(|e| Error::Fetch(format!("bad url {}: {}", url, e)))?;
    let page = fetch_text(client, base.clone()).await?;

    let mut texts = Vec::new();
    for src in script_sources(&page) {
        match base.join(&src) {
            Ok(script_url) => match fetch_text(client, script_url.clone()).await {
                Ok(body) => {
                    debug!("fetched bundle {} ({} bytes)", script_url, body.len());
                    texts.push(body);
                }
                Err(e) => warn!("skipping bundle {}: {}", script_url, e),
            },
            Err(e) => warn!("skipping unresolvable script src '{}': {}", src, e),
        }
    }
    texts.push(page);
    Ok(texts)
}

async fn fetch_text(client: &Client, url: Url) -> Result<String> {
    let response = client
        .get(url.clone())
        .timeout(Duration::from_secs(30))
        .send()
        .await
        .map_err(|e| Error::Fetch(e.to_string()))?;
    if !response.status().is_success() {
        return Err(Error::Fetch(format!("{} returned {}", url, response.status())));
    }
    response.text().await.map_err(|e| Error::Fetch(e.to_string()))
}

/// Pull `src="..."` script references out of a page body.
fn script_sources(page: &str) -> Vec<String> {
    let mut sources = Vec::new();
    let mut rest = page;
    while let Some(pos) = rest.find("src=\"") {
        rest = &rest[pos + 5..];
        if let Some(end) = rest.find('"') {
            let src = &rest[..end];
            if src.ends_with(".js") || src.ends_with(".mjs") {
                sources.push(src.to_string());
            }
            rest = &rest[end..];
        } else {
            break;
        }
    }
    sources
}
