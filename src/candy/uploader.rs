//! Batch upload of metadata config lines.
//!
//! Items are partitioned into consecutive batches of at most ten; batch `i`
//! starts at line offset `i * 10` and goes out as one `add_config_lines`
//! transaction. Batches are independent: one failure is recorded and the
//! rest still run. Nothing is retried automatically.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::candy::{add_config_lines_instruction, ConfigLine};
use crate::chain::ChainClient;
use crate::error::{Error, Result};
use crate::types::MetadataItem;

pub const CONFIG_LINE_BATCH: usize = 10;
/// Placeholder in the URI template replaced with each item's absolute index.
pub const URI_INDEX_PLACEHOLDER: &str = "{index}";

/// Outcome of one batch submission.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Absolute line offset of the batch (`i * 10`).
    pub offset: u32,
    pub items: usize,
    pub tx: Option<String>,
    pub error: Option<String>,
}

impl BatchResult {
    pub fn succeeded(&self) -> bool {
        self.tx.is_some()
    }
}

/// Partition items into `(offset, lines)` batches, substituting each item's
/// absolute index into the URI template.
pub fn plan_batches(items: &[MetadataItem], uri_template: &str) -> Vec<(u32, Vec<ConfigLine>)> {
    let lines: Vec<ConfigLine> = items
        .iter()
        .enumerate()
        .map(|(index, item)| ConfigLine {
            name: item.name.clone(),
            uri: uri_template.replace(URI_INDEX_PLACEHOLDER, &index.to_string()),
        })
        .collect();
    lines
        .chunks(CONFIG_LINE_BATCH)
        .enumerate()
        .map(|(group, chunk)| ((group * CONFIG_LINE_BATCH) as u32, chunk.to_vec()))
        .collect()
}

/// Upload all config lines in grouped transactions, tolerating partial
/// failure. Results come back in ascending offset order even though the
/// submissions complete in any order.
pub async fn upload_config_lines(
    client: Arc<dyn ChainClient>,
    payer: Arc<Keypair>,
    config: Pubkey,
    items: &[MetadataItem],
    uri_template: &str,
) -> Vec<BatchResult> {
    let batches = plan_batches(items, uri_template);
    info!(
        "uploading {} item(s) in {} batch(es)",
        items.len(),
        batches.len()
    );

    let mut tasks = JoinSet::new();
    for (offset, lines) in batches {
        let client = Arc::clone(&client);
        let payer = Arc::clone(&payer);
        tasks.spawn(async move {
            let count = lines.len();
            let ix = add_config_lines_instruction(&config, &payer.pubkey(), offset, &lines);
            match client
                .submit_transaction(&[ix], &payer.pubkey(), &[payer.as_ref()])
                .await
            {
                Ok(tx) => {
                    info!("batch at offset {} landed: {}", offset, tx);
                    BatchResult {
                        offset,
                        items: count,
                        tx: Some(tx),
                        error: None,
                    }
                }
                Err(err) => {
                    warn!("batch at offset {} failed: {}", offset, err);
                    BatchResult {
                        offset,
                        items: count,
                        tx: None,
                        error: Some(err.to_string()),
                    }
                }
            }
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        if let Ok(result) = joined {
            results.push(result);
        }
    }
    results.sort_by_key(|r| r.offset);
    results
}

/// List and parse the `*.json` asset files in a directory, sorted by file
/// name so line order is stable across runs.
pub fn load_metadata_items(dir: &Path) -> Result<Vec<MetadataItem>> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(Error::Config(format!(
            "no NFT asset files found in {}",
            dir.display()
        )));
    }

    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = fs::read_to_string(&path)?;
        let item: MetadataItem = serde_json::from_str(&raw).map_err(|e| {
            Error::Config(format!("bad asset file {}: {}", path.display(), e))
        })?;
        items.push(item);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<MetadataItem> {
        (0..n)
            .map(|i| MetadataItem {
                name: format!("Egg #{}", i),
            })
            .collect()
    }

    #[test]
    fn twenty_five_items_make_three_batches() {
        let batches = plan_batches(&items(25), "https://example.org/nft/{index}.png");
        assert_eq!(batches.len(), 3);
        assert_eq!(
            batches.iter().map(|(o, _)| *o).collect::<Vec<_>>(),
            vec![0, 10, 20]
        );
        assert_eq!(
            batches.iter().map(|(_, l)| l.len()).collect::<Vec<_>>(),
            vec![10, 10, 5]
        );
    }

    #[test]
    fn batch_count_is_ceil_and_sizes_sum() {
        for n in [1usize, 9, 10, 11, 30, 101] {
            let batches = plan_batches(&items(n), "u/{index}");
            assert_eq!(batches.len(), n.div_ceil(CONFIG_LINE_BATCH));
            assert_eq!(batches.iter().map(|(_, l)| l.len()).sum::<usize>(), n);
            for (i, (offset, lines)) in batches.iter().enumerate() {
                assert_eq!(*offset as usize, i * CONFIG_LINE_BATCH);
                assert!(lines.len() <= CONFIG_LINE_BATCH);
            }
        }
    }

    #[test]
    fn empty_item_list_plans_nothing() {
        assert!(plan_batches(&[], "u/{index}").is_empty());
    }

    #[test]
    fn uri_carries_absolute_index() {
        let batches = plan_batches(&items(12), "https://example.org/nft/{index}.png");
        let (_, second) = &batches[1];
        assert_eq!(second[0].uri, "https://example.org/nft/10.png");
        assert_eq!(second[1].name, "Egg #11");
    }

    #[test]
    fn loads_assets_sorted_and_rejects_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_metadata_items(tmp.path()).is_err());

        fs::write(tmp.path().join("1.json"), r#"{"name":"B"}"#).unwrap();
        fs::write(tmp.path().join("0.json"), r#"{"name":"A"}"#).unwrap();
        fs::write(tmp.path().join("0.png"), [0u8; 4]).unwrap();

        let items = load_metadata_items(tmp.path()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "A");
        assert_eq!(items[1].name, "B");
    }
}
