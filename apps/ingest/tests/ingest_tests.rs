use std::collections::HashMap;
use std::fs;

use tempfile::tempdir;
use tokenholder_core::holders::{HolderCategory, HolderKind};
use tokenholder_ingest::config::Config;
use tokenholder_ingest::{build_state, ingest_file};

const BATCH: &str = r#"
{"signerAddress":"0xA","evmAddress":"","type":"Account","tokenAddress":"0xT","nftId":null,"balance":"100","info":null,"timestamp":"2024-01-01T00:00:00Z"}
{"signerAddress":"0xA","evmAddress":"","type":"Account","tokenAddress":"0xT","nftId":null,"balance":"999","info":null,"timestamp":"2024-01-01T00:00:05Z"}
{"signerAddress":"","evmAddress":"0xC","type":"Contract","tokenAddress":"0xT","nftId":"7","balance":"1","info":{"uri":"ipfs://x"},"timestamp":"2024-01-01T00:00:00Z"}
{"signerAddress":"","evmAddress":"","type":"Account","tokenAddress":"0xT","nftId":null,"balance":"3","info":null,"timestamp":"2024-01-01T00:00:00Z"}
"#;

fn test_config(db_path: &str, policy: &str) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        ("HOLDERS_DB_PATH", db_path.to_string()),
        ("HOLDERS_DEDUP_POLICY", policy.to_string()),
    ]);
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

#[tokio::test]
async fn test_ingest_file_writes_each_category_once() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("db").join("holders.db");
    let input = dir.path().join("batch.ndjson");
    fs::write(&input, BATCH).unwrap();

    let state = build_state(&test_config(db_path.to_str().unwrap(), "first"))
        .await
        .unwrap();
    let summary = ingest_file(&state, &input).await.unwrap();

    assert_eq!(summary.written_for(HolderCategory::AccountToken), 1);
    assert_eq!(summary.written_for(HolderCategory::ContractNft), 1);
    assert_eq!(summary.written_for(HolderCategory::AccountNft), 0);
    assert_eq!(summary.skipped, 1);

    let stored = state.holder_service.get_token_holders("0xT").unwrap();
    assert_eq!(stored.len(), 2);
    let account = stored
        .iter()
        .find(|h| h.kind == HolderKind::Account)
        .unwrap();
    assert_eq!(account.balance.as_str(), "100");
}

#[tokio::test]
async fn test_reingesting_with_last_seen_updates_in_place() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("holders.db");
    let input = dir.path().join("batch.ndjson");
    fs::write(&input, BATCH).unwrap();

    let state = build_state(&test_config(db_path.to_str().unwrap(), "last"))
        .await
        .unwrap();
    ingest_file(&state, &input).await.unwrap();
    ingest_file(&state, &input).await.unwrap();

    let stored = state.holder_service.get_token_holders("0xT").unwrap();
    assert_eq!(stored.len(), 2);
    let account = stored
        .iter()
        .find(|h| h.kind == HolderKind::Account)
        .unwrap();
    assert_eq!(account.balance.as_str(), "999");
}

#[tokio::test]
async fn test_malformed_file_is_rejected_before_writing() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("holders.db");
    let input = dir.path().join("broken.ndjson");
    fs::write(&input, "{\"type\":\"Account\"}\n").unwrap();

    let state = build_state(&test_config(db_path.to_str().unwrap(), "first"))
        .await
        .unwrap();
    let err = ingest_file(&state, &input).await.unwrap_err();

    assert!(err.to_string().contains("broken.ndjson"));
    assert!(state.holder_service.get_token_holders("0xT").unwrap().is_empty());
}
