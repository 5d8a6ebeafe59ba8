//! Pooled sessions against a real database. Skipped unless `DATABASE_URL` is set.

#![cfg(feature = "pool")]

use dbx::{OrmError, OrmResult, Registry, create_pool_with_config};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_postgres::NoTls;

#[tokio::test]
async fn dropped_transaction_does_not_reach_next_session() -> OrmResult<()> {
    let _ = dotenvy::dotenv();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping dropped_transaction_does_not_reach_next_session");
            return Ok(());
        }
    };

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before UNIX_EPOCH")
        .as_nanos();
    let table = format!("dbx_test_recycle_{}_{}", std::process::id(), nanos);

    // One connection, so the second session reuses the first one's.
    let mut registry = Registry::new();
    registry.register("live", create_pool_with_config(&database_url, 1)?);

    let setup = registry.session("live").await?;
    setup
        .exec(&format!("CREATE TABLE {table} (id bigint)"), &[])
        .await?;
    drop(setup);

    let insert = format!("INSERT INTO {table} (id) VALUES ($1)");
    {
        let mut abandoned = registry.session("live").await?;
        abandoned.begin().await?;
        abandoned.exec(&insert, &[&1_i64]).await?;
    }

    let next = registry.session("live").await?;
    assert!(!next.in_transaction());
    next.exec(&insert, &[&2_i64]).await?;
    drop(next);

    let (observer, connection) = tokio_postgres::connect(&database_url, NoTls)
        .await
        .map_err(OrmError::from_db_error)?;
    tokio::spawn(async move {
        let _ = connection.await;
    });
    let ids: Vec<i64> = observer
        .query(&format!("SELECT id FROM {table} ORDER BY id"), &[])
        .await
        .map_err(OrmError::from_db_error)?
        .iter()
        .map(|row| row.get(0))
        .collect();
    observer
        .execute(&format!("DROP TABLE {table}"), &[])
        .await
        .map_err(OrmError::from_db_error)?;

    assert_eq!(ids, vec![2]);
    Ok(())
}
