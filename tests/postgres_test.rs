//! Integration tests against PostgreSQL
//!
//! Run with `DATABASE_URL` set: `cargo test -- --ignored --test-threads=1`.
//! Every test recreates the `crud_widgets` table.

use crudbase::prelude::*;

#[model]
#[table(name = "crud_widgets")]
pub struct Widget {
    pub id: i64,
    pub name: String,
    #[unique]
    pub sku: String,
    pub quantity: i32,
    pub note: Option<i32>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

async fn setup() -> anyhow::Result<CrudBase> {
    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPool::connect(&database_url).await?;

    sqlx::query("DROP TABLE IF EXISTS crud_widgets")
        .execute(&pool)
        .await?;
    sqlx::query(
        r#"CREATE TABLE crud_widgets (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            sku TEXT NOT NULL UNIQUE,
            quantity INTEGER NOT NULL DEFAULT 0,
            note INTEGER,
            tags TEXT[] NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            deleted_at TIMESTAMPTZ
        )"#,
    )
    .execute(&pool)
    .await?;

    Ok(CrudBase::from_pool(pool))
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_crud_roundtrip() -> anyhow::Result<()> {
    let crudbase = setup().await?;
    crudbase.health_check().await?;
    let widgets = crudbase.repository::<Widget>();
    let options = CrudOptions::default();

    let bolt = widgets
        .create(&json!({"name": "Bolt", "quantity": 10, "sku": "B-1"}), &options)
        .await?;
    widgets
        .create(&json!({"name": "Nut", "quantity": 0, "sku": "N-1"}), &options)
        .await?;

    let in_stock = widgets
        .find_all(&Filter::from_value(&json!({"quantity": {"gt": 0}}))?, &options)
        .await?;
    assert_eq!(in_stock.len(), 1);

    let updated = widgets
        .update_by_id(bolt.id, &json!({"quantity": 5}), &options)
        .await?;
    assert_eq!(updated.quantity, 5);
    assert!(updated.updated_at >= bolt.updated_at);

    let page = widgets
        .paginated(&PaginationRequest::new(1, 1).with_sort("name"), &Filter::new(), &options)
        .await?;
    assert_eq!(page.total, 2);
    assert_eq!(page.page_count, 2);
    assert_eq!(page.rows[0].name, "Bolt");

    widgets.delete_by_id(bolt.id, DeleteMode::Soft, &options).await?;
    assert!(widgets.find_by_id(bolt.id, &options).await?.is_none());
    assert_eq!(widgets.count(&Filter::new(), &CrudOptions::new().with_deleted()).await?, 2);

    let removed = widgets
        .delete_many(&Filter::new(), DeleteMode::Hard)
        .await?;
    assert_eq!(removed.count, 2);

    crudbase.close().await;
    Ok(())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_create_many_skips_duplicates() -> anyhow::Result<()> {
    let crudbase = setup().await?;
    let widgets = crudbase.repository::<Widget>();

    widgets
        .create(&json!({"name": "Bolt", "sku": "B-1"}), &CrudOptions::default())
        .await?;
    let batch = vec![
        json!({"name": "Bolt", "sku": "B-1"}),
        json!({"name": "Washer", "sku": "W-1"}),
        json!({"name": "Screw", "sku": "S-1"}),
    ];
    let result = widgets
        .create_many(&batch, &CrudOptions::new().skip_duplicates())
        .await?;
    assert_eq!(result.count, 2);

    crudbase.close().await;
    Ok(())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_transaction_rolls_back() -> anyhow::Result<()> {
    let crudbase = setup().await?;
    let widgets = crudbase.repository::<Widget>();

    let outcome: Result<(), CrudError> = crudbase
        .transaction(|tx| {
            let widgets = widgets.bind(tx);
            async move {
                widgets
                    .create(&json!({"name": "Gear", "sku": "G-1"}), &CrudOptions::default())
                    .await?;
                Err(CrudError::validation("Widget", "sku", "rejected"))
            }
        })
        .await;
    assert!(outcome.is_err());
    assert_eq!(widgets.count(&Filter::new(), &CrudOptions::default()).await?, 0);

    crudbase.close().await;
    Ok(())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_upsert_and_select() -> anyhow::Result<()> {
    let crudbase = setup().await?;
    let widgets = crudbase.repository::<Widget>();
    let filter = Filter::new().eq("sku", "C-1");

    let created = widgets
        .upsert(
            &filter,
            &json!({"name": "Cog", "sku": "C-1"}),
            &json!({"quantity": 3}),
            &CrudOptions::default(),
        )
        .await?;
    assert_eq!(created.quantity, 0);

    let updated = widgets
        .upsert(
            &filter,
            &json!({"name": "Cog", "sku": "C-1"}),
            &json!({"quantity": 3}),
            &CrudOptions::default(),
        )
        .await?;
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.quantity, 3);

    let args = FindArgs::new(Filter::new())
        .projection(CrudOptions::new().select(&["id", "sku"]).projection());
    let rows = crudbase.client().find_many(&Widget::spec(), &args).await?;
    assert_eq!(rows[0].len(), 2);

    crudbase.close().await;
    Ok(())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_null_and_array_values_take_column_types() -> anyhow::Result<()> {
    let crudbase = setup().await?;
    let widgets = crudbase.repository::<Widget>();
    let options = CrudOptions::default();

    let bolt = widgets
        .create(
            &json!({"name": "Bolt", "sku": "B-1", "note": null, "tags": ["metal", "m8"]}),
            &options,
        )
        .await?;
    assert_eq!(bolt.note, None);
    assert_eq!(bolt.tags, vec!["metal", "m8"]);

    let noted = widgets
        .update_by_id(bolt.id, &json!({"note": 7, "tags": []}), &options)
        .await?;
    assert_eq!(noted.note, Some(7));
    assert!(noted.tags.is_empty());

    widgets.delete_by_id(bolt.id, DeleteMode::Soft, &options).await?;
    let restored = widgets
        .update_one(
            &Filter::new().eq("id", bolt.id),
            &json!({"deleted_at": null, "note": null}),
            &CrudOptions::new().with_deleted(),
        )
        .await?;
    assert!(restored.deleted_at.is_none());
    assert_eq!(restored.note, None);
    assert!(widgets.find_by_id(bolt.id, &options).await?.is_some());

    crudbase.close().await;
    Ok(())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_text_filters_on_uuid_and_date_like_values() -> anyhow::Result<()> {
    let crudbase = setup().await?;
    let widgets = crudbase.repository::<Widget>();
    let options = CrudOptions::default();
    let uuid_sku = "550e8400-e29b-41d4-a716-446655440000";
    let date_name = "2024-01-01T00:00:00Z";

    widgets
        .create(&json!({"name": date_name, "sku": uuid_sku}), &options)
        .await?;
    widgets
        .create(&json!({"name": "Plain", "sku": "P-1"}), &options)
        .await?;

    let by_sku = widgets.find_one(&Filter::new().eq("sku", uuid_sku), &options).await?;
    assert_eq!(by_sku.map(|w| w.name).as_deref(), Some(date_name));

    let by_name = widgets.find_one(&Filter::new().eq("name", date_name), &options).await?;
    assert_eq!(by_name.map(|w| w.sku).as_deref(), Some(uuid_sku));

    let listed = widgets
        .find_all(
            &Filter::new().in_values("sku", vec![json!(uuid_sku), json!("P-1")]),
            &options,
        )
        .await?;
    assert_eq!(listed.len(), 2);

    let matched = widgets
        .count(&Filter::from_value(&json!({"sku": {"startsWith": "550e8400"}}))?, &options)
        .await?;
    assert_eq!(matched, 1);

    let recent = widgets
        .count(&Filter::new().gte("created_at", "2000-01-01T00:00:00Z"), &options)
        .await?;
    assert_eq!(recent, 2);

    crudbase.close().await;
    Ok(())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_upsert_updates_soft_deleted_match() -> anyhow::Result<()> {
    let crudbase = setup().await?;
    let widgets = crudbase.repository::<Widget>();
    let options = CrudOptions::default();

    let cog = widgets
        .create(&json!({"name": "Cog", "sku": "C-1"}), &options)
        .await?;
    widgets.delete_by_id(cog.id, DeleteMode::Soft, &options).await?;

    let upserted = widgets
        .upsert(
            &Filter::new().eq("sku", "C-1"),
            &json!({"name": "Cog", "sku": "C-1"}),
            &json!({"quantity": 4}),
            &options,
        )
        .await?;
    assert_eq!(upserted.id, cog.id);
    assert_eq!(upserted.quantity, 4);
    assert!(upserted.deleted_at.is_some());
    assert_eq!(widgets.count(&Filter::new(), &CrudOptions::new().with_deleted()).await?, 1);

    crudbase.close().await;
    Ok(())
}
