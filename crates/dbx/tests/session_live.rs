//! Round trips against a real database. Skipped unless `DATABASE_URL` is set
//! (a `.env` file is honoured).

#![cfg(feature = "derive")]

use dbx::{Entity, FromRow, OrmError, OrmResult, QueryBuilder, Session, TransactionOptions};
use tokio_postgres::NoTls;

#[derive(Debug, Entity, FromRow)]
#[orm(table = "dbx_live_items")]
struct Item {
    #[orm(display = "ID")]
    id: i64,
    #[orm(display = "Label")]
    label: String,
    #[orm(virtual, display = "Price")]
    price: dbx::Money,
}

fn database_url(test: &str) -> Option<String> {
    let _ = dotenvy::dotenv();
    match std::env::var("DATABASE_URL") {
        Ok(v) => Some(v),
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            None
        }
    }
}

async fn connect(url: &str) -> OrmResult<Session<tokio_postgres::Client>> {
    let (client, connection) = tokio_postgres::connect(url, NoTls)
        .await
        .map_err(OrmError::from_db_error)?;
    tokio::spawn(async move {
        let _ = connection.await;
    });
    let session = Session::new(client);
    session
        .exec(
            "CREATE TEMP TABLE dbx_live_items (id bigint PRIMARY KEY, label text NOT NULL)",
            &[],
        )
        .await?;
    Ok(session)
}

#[tokio::test]
async fn builder_fetches_rows_with_meta() -> OrmResult<()> {
    let Some(url) = database_url("builder_fetches_rows_with_meta") else {
        return Ok(());
    };
    let mut session = connect(&url).await?;

    for (id, label) in [(1_i64, "apple"), (2, "banana"), (3, "cherry")] {
        session
            .exec(
                "INSERT INTO dbx_live_items (id, label) VALUES ($1, $2)",
                &[&id, &label],
            )
            .await?;
    }

    let mut qb = QueryBuilder::<Item>::new()
        .select(["id", "label"])
        .order_by("id", "DESC");
    qb.apply_filters([("label%5Blike%5D", "an"), ("limit", "1")])?;

    let page = qb.fetch_with_meta::<Item>(&session).await?;
    assert_eq!(page.meta.count, 1);
    assert_eq!(page.body.len(), 1);
    assert_eq!(page.body[0].label, "banana");
    assert_eq!(page.body[0].price, dbx::Money::default());
    assert!(page.meta.header["price"].is_virtual);

    let mut qb = QueryBuilder::<Item>::new();
    qb.apply_filters([("id%5Bin%5D", "[1,3]")])?;
    assert_eq!(qb.count(&session).await?, 2);

    session.close().await?;
    Ok(())
}

#[tokio::test]
async fn rollback_discards_and_commit_keeps() -> OrmResult<()> {
    let Some(url) = database_url("rollback_discards_and_commit_keeps") else {
        return Ok(());
    };
    let mut session = connect(&url).await?;
    let insert = "INSERT INTO dbx_live_items (id, label) VALUES ($1, $2)";

    session.begin().await?;
    assert!(session.in_transaction());
    assert_eq!(session.exec(insert, &[&10_i64, &"gone"]).await?, 1);
    session.rollback().await?;

    session
        .begin_with(TransactionOptions::new().read_only(false))
        .await?;
    session.exec(insert, &[&11_i64, &"kept"]).await?;
    session.commit().await?;
    assert!(!session.in_transaction());

    let labels: Vec<String> = session
        .query_raw("SELECT label FROM dbx_live_items ORDER BY id", &[])
        .await?
        .iter()
        .map(|row| row.get(0))
        .collect();
    assert_eq!(labels, vec!["kept"]);

    let missing = session
        .query_row("SELECT id FROM dbx_live_items WHERE id = $1", &[&10_i64])
        .await
        .into_result();
    assert!(matches!(missing, Err(OrmError::NotFound(_))));

    let item: Item = session
        .query_row("SELECT id, label FROM dbx_live_items WHERE id = $1", &[&11_i64])
        .await
        .scan()?;
    assert_eq!(item.id, 11);

    assert!(session.commit().await.is_err());
    session.close().await?;
    session.close().await?;
    assert!(session.is_closed());
    assert!(session.exec("SELECT 1", &[]).await.is_err());
    Ok(())
}
