use async_trait::async_trait;
use diesel::prelude::*;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_query;
use diesel::sql_types::{Nullable, Text};
use diesel::sqlite::{Sqlite, SqliteConnection};
use log::debug;
use std::sync::Arc;

use super::model::{ConflictTarget, NewTokenHolderDB, TokenHolderDB, INSERT_COLUMNS};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::token_holder;
use crate::utils::chunk_rows_for_sqlite;
use tokenholder_core::holders::{HolderCategory, HolderRecord, HolderStore};
use tokenholder_core::{Error, Result};

pub struct HolderRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl HolderRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

/// Builds one multi-row upsert for `rows` against the category's conflict target.
fn build_upsert_query(
    category: HolderCategory,
    rows: &[NewTokenHolderDB],
) -> BoxedSqlQuery<'static, Sqlite, SqlQuery> {
    let placeholders = format!("({})", vec!["?"; INSERT_COLUMNS.len()].join(", "));
    let values = vec![placeholders.as_str(); rows.len()].join(", ");
    let sql = format!(
        "INSERT INTO token_holder ({}) VALUES {} {}",
        INSERT_COLUMNS.join(", "),
        values,
        ConflictTarget::for_category(category).on_conflict_clause()
    );

    let mut query = sql_query(sql).into_boxed::<Sqlite>();
    for row in rows {
        query = query
            .bind::<Nullable<Text>, _>(row.signer.clone())
            .bind::<Nullable<Text>, _>(row.evm_address.clone())
            .bind::<Text, _>(row.holder_type.clone())
            .bind::<Text, _>(row.token_address.clone())
            .bind::<Nullable<Text>, _>(row.nft_id.clone())
            .bind::<Text, _>(row.balance.clone())
            .bind::<Text, _>(row.info.clone())
            .bind::<Text, _>(row.timestamp.clone());
    }
    query
}

#[async_trait]
impl HolderStore for HolderRepository {
    async fn upsert_holders(
        &self,
        category: HolderCategory,
        holders: &[HolderRecord],
    ) -> Result<usize> {
        if holders.is_empty() {
            return Ok(0);
        }

        let rows = holders
            .iter()
            .map(NewTokenHolderDB::try_from)
            .collect::<std::result::Result<Vec<_>, StorageError>>()?;

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let mut affected_rows = 0;
                for chunk in chunk_rows_for_sqlite(&rows, INSERT_COLUMNS.len()) {
                    affected_rows += build_upsert_query(category, chunk)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                debug!("Upserted {} {} holder rows", affected_rows, category);
                Ok(affected_rows)
            })
            .await
    }

    fn get_token_holders(&self, token_address: &str) -> Result<Vec<HolderRecord>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = token_holder::table
            .filter(token_holder::token_address.eq(token_address))
            .order((
                token_holder::holder_type.asc(),
                token_holder::nft_id.is_not_null().asc(),
                token_holder::signer.asc(),
                token_holder::evm_address.asc(),
                token_holder::nft_id.asc(),
            ))
            .select(TokenHolderDB::as_select())
            .load::<TokenHolderDB>(&mut conn)
            .into_core()?;

        rows.into_iter()
            .map(|row| HolderRecord::try_from(row).map_err(Error::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, init, run_migrations, write_actor::spawn_writer};
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;
    use tempfile::tempdir;
    use tokenholder_core::errors::DatabaseError;
    use tokenholder_core::holders::{
        Balance, DedupPolicy, HolderInfo, HolderKind, HolderService, HolderServiceTrait,
    };

    /// Creates a repository over a fresh migrated database in a temp directory.
    /// Returns the repository, pool (for raw assertions), and temp dir (to keep it alive)
    async fn create_test_repository() -> (HolderRepository, Arc<DbPool>, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("holders.db");
        let db_path_str = init(&db_path.to_string_lossy()).expect("Failed to init database");

        let pool = create_pool(&db_path_str, 4).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone()).expect("Failed to spawn writer");

        let repo = HolderRepository::new(Arc::clone(&pool), writer);
        (repo, pool, temp_dir)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn holder(kind: HolderKind, identity: &str, token: &str, balance: u64, secs: i64) -> HolderRecord {
        HolderRecord::new(kind, identity, token, Balance::from(balance), at(secs))
    }

    fn stored_rows(pool: &DbPool) -> Vec<TokenHolderDB> {
        let mut conn = get_connection(pool).expect("Failed to get connection");
        token_holder::table
            .order(token_holder::id.asc())
            .select(TokenHolderDB::as_select())
            .load(&mut conn)
            .expect("Failed to load rows")
    }

    #[tokio::test]
    async fn test_upsert_inserts_and_reads_back() {
        let (repo, _pool, _dir) = create_test_repository().await;
        let holders = vec![
            holder(HolderKind::Account, "0xA", "T1", 5, 0),
            holder(HolderKind::Account, "0xB", "T1", 6, 0),
        ];

        let written = repo
            .upsert_holders(HolderCategory::AccountToken, &holders)
            .await
            .unwrap();

        assert_eq!(written, 2);
        let stored = repo.get_token_holders("T1").unwrap();
        assert_eq!(stored, holders);
    }

    #[tokio::test]
    async fn test_upsert_empty_group_is_noop() {
        let (repo, pool, _dir) = create_test_repository().await;
        let written = repo
            .upsert_holders(HolderCategory::ContractNft, &[])
            .await
            .unwrap();
        assert_eq!(written, 0);
        assert!(stored_rows(&pool).is_empty());
    }

    #[tokio::test]
    async fn test_conflict_overwrites_balance_timestamp_and_info_only() {
        let (repo, pool, _dir) = create_test_repository().await;
        repo.upsert_holders(
            HolderCategory::AccountToken,
            &[holder(HolderKind::Account, "0xA", "T1", 5, 0)],
        )
        .await
        .unwrap();
        let before = stored_rows(&pool);

        let mut info = HolderInfo::new();
        info.insert("symbol".into(), json!("REEF"));
        let update = holder(HolderKind::Account, "0xA", "T1", 9, 60).with_info(info);
        repo.upsert_holders(HolderCategory::AccountToken, &[update])
            .await
            .unwrap();

        let after = stored_rows(&pool);
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, before[0].id);
        assert_eq!(after[0].balance, "9");
        assert_eq!(after[0].timestamp, "2023-11-14T22:14:20.000000000Z");
        assert_eq!(after[0].info, r#"{"symbol":"REEF"}"#);
        assert_eq!(after[0].signer, before[0].signer);
        assert_eq!(after[0].holder_type, before[0].holder_type);
    }

    #[tokio::test]
    async fn test_categories_occupy_disjoint_partitions() {
        let (repo, pool, _dir) = create_test_repository().await;
        let same_address = "0x1111";

        for (category, record) in [
            (
                HolderCategory::AccountToken,
                holder(HolderKind::Account, same_address, "T1", 1, 0),
            ),
            (
                HolderCategory::ContractToken,
                holder(HolderKind::Contract, same_address, "T1", 2, 0),
            ),
            (
                HolderCategory::AccountNft,
                holder(HolderKind::Account, same_address, "T1", 1, 0).with_nft_id("7"),
            ),
            (
                HolderCategory::ContractNft,
                holder(HolderKind::Contract, same_address, "T1", 1, 0).with_nft_id("7"),
            ),
        ] {
            repo.upsert_holders(category, &[record]).await.unwrap();
        }

        assert_eq!(stored_rows(&pool).len(), 4);
        let categories: Vec<_> = repo
            .get_token_holders("T1")
            .unwrap()
            .iter()
            .map(|r| r.category())
            .collect();
        assert_eq!(categories.len(), 4);
        for category in HolderCategory::WRITE_ORDER {
            assert!(categories.contains(&category));
        }
    }

    #[tokio::test]
    async fn test_read_back_orders_by_category_then_identity() {
        let (repo, _pool, _dir) = create_test_repository().await;
        repo.upsert_holders(
            HolderCategory::AccountNft,
            &[
                holder(HolderKind::Account, "0xB", "T1", 1, 0).with_nft_id("1"),
                holder(HolderKind::Account, "0xA", "T1", 1, 0).with_nft_id("2"),
            ],
        )
        .await
        .unwrap();
        repo.upsert_holders(
            HolderCategory::ContractToken,
            &[holder(HolderKind::Contract, "0xC", "T1", 3, 0)],
        )
        .await
        .unwrap();
        repo.upsert_holders(
            HolderCategory::AccountToken,
            &[holder(HolderKind::Account, "0xZ", "T1", 4, 0)],
        )
        .await
        .unwrap();

        let order: Vec<_> = repo
            .get_token_holders("T1")
            .unwrap()
            .into_iter()
            .map(|r| (r.category(), r.holder_identity().map(str::to_string)))
            .collect();

        assert_eq!(
            order,
            vec![
                (HolderCategory::AccountToken, Some("0xZ".to_string())),
                (HolderCategory::AccountNft, Some("0xA".to_string())),
                (HolderCategory::AccountNft, Some("0xB".to_string())),
                (HolderCategory::ContractToken, Some("0xC".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_identity_stored_as_null() {
        let (repo, pool, _dir) = create_test_repository().await;
        let mut record = holder(HolderKind::Contract, "0xC", "T1", 1, 0);
        record.signer_address = Some(String::new());

        repo.upsert_holders(HolderCategory::ContractToken, &[record])
            .await
            .unwrap();

        let mut conn = get_connection(&pool).unwrap();
        let blank_signers: i64 = token_holder::table
            .filter(token_holder::signer.eq(""))
            .count()
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(blank_signers, 0);
        assert_eq!(stored_rows(&pool)[0].signer, None);
    }

    #[tokio::test]
    async fn test_default_info_stored_as_empty_object() {
        let (repo, pool, _dir) = create_test_repository().await;
        let record: HolderRecord = serde_json::from_value(json!({
            "signerAddress": "0xA",
            "evmAddress": "",
            "type": "Account",
            "tokenAddress": "T1",
            "nftId": "3",
            "balance": "1",
            "info": null,
            "timestamp": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        repo.upsert_holders(HolderCategory::AccountNft, &[record])
            .await
            .unwrap();

        assert_eq!(stored_rows(&pool)[0].info, "{}");
    }

    #[tokio::test]
    async fn test_large_group_spans_several_statements() {
        let (repo, pool, _dir) = create_test_repository().await;
        let holders: Vec<_> = (0..300)
            .map(|i| holder(HolderKind::Account, &format!("0x{:04x}", i), "T1", i, 0))
            .collect();

        let written = repo
            .upsert_holders(HolderCategory::AccountToken, &holders)
            .await
            .unwrap();

        assert_eq!(written, 300);
        assert_eq!(stored_rows(&pool).len(), 300);
    }

    #[tokio::test]
    async fn test_rejected_row_rolls_back_whole_category() {
        let (repo, pool, _dir) = create_test_repository().await;
        let good = holder(HolderKind::Account, "0xA", "T1", 1, 0);
        // No identity at all: violates the one-identity check constraint.
        let mut bad = holder(HolderKind::Account, "0xB", "T1", 1, 0);
        bad.signer_address = None;

        let err = repo
            .upsert_holders(HolderCategory::AccountToken, &[good, bad])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Database(DatabaseError::QueryFailed(_))));
        assert!(stored_rows(&pool).is_empty());
    }

    #[tokio::test]
    async fn test_service_batch_redelivery_is_idempotent() {
        let (repo, pool, _dir) = create_test_repository().await;
        let service = HolderService::new(Arc::new(repo), DedupPolicy::FirstSeen);
        let batch = vec![
            holder(HolderKind::Account, "0xA", "T1", 5, 100),
            holder(HolderKind::Account, "0xA", "T1", 9, 200),
            holder(HolderKind::Contract, "0xC", "T1", 3, 100),
            holder(HolderKind::Contract, "0xC", "T1", 1, 100).with_nft_id("42"),
            holder(HolderKind::Account, "0xA", "T1", 1, 100).with_nft_id("42"),
        ];

        let first = service.insert_holders(batch.clone()).await.unwrap();
        let after_first = stored_rows(&pool);
        let second = service.insert_holders(batch).await.unwrap();
        let after_second = stored_rows(&pool);

        assert_eq!(first, second);
        assert_eq!(first.total_written(), 4);
        assert_eq!(after_first, after_second);

        let account_token = service
            .get_token_holders("T1")
            .unwrap()
            .into_iter()
            .find(|r| r.category() == HolderCategory::AccountToken)
            .unwrap();
        assert_eq!(account_token.balance.as_str(), "5");
    }
}
