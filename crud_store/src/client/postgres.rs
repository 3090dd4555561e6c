//! PostgreSQL store client
//!
//! Executes statements from `SqlGenerator` on a `PgPool`, or on the
//! transaction a handle was bound to by `begin`.

use crate::errors::CrudError;
use crate::query_builder::{Filter, Projection, SqlGenerator, Statement};
use crate::traits::{FindArgs, ModelSpec, StoreClient};
use crate::Row;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgQueryResult, PgRow};
use sqlx::{PgPool, Postgres, Row as _, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

// Column values arrive as jsonb objects typed by `jsonb_populate_record` in
// the statement; LIKE patterns arrive as text
macro_rules! bind_json_param {
    ($query:expr, $param:expr) => {
        match $param {
            serde_json::Value::String(s) => $query.bind(s),
            other => $query.bind(sqlx::types::Json(other)),
        }
    };
}

/// Store client backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgClient {
    pool: PgPool,
    transaction: Option<Arc<Mutex<Option<Transaction<'static, Postgres>>>>>,
}

impl std::fmt::Debug for PgClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgClient")
            .field("pool_size", &self.pool.size())
            .field("in_transaction", &self.transaction.is_some())
            .finish()
    }
}

enum Fetch {
    All(Vec<PgRow>),
    Optional(Option<PgRow>),
    Done(PgQueryResult),
}

#[derive(Clone, Copy)]
enum Mode {
    All,
    Optional,
    Execute,
}

impl PgClient {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            transaction: None,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn run(
        &self,
        spec: &ModelSpec,
        operation: &'static str,
        statement: Statement,
        mode: Mode,
    ) -> Result<Fetch, CrudError> {
        tracing::debug!(
            table = spec.table,
            operation,
            params = statement.params.len(),
            "SQL: {}",
            statement.sql
        );

        let mut query = sqlx::query(&statement.sql);
        for param in statement.params {
            query = bind_json_param!(query, param);
        }

        let result = match &self.transaction {
            Some(transaction) => {
                let mut guard = transaction.lock().await;
                let conn = guard
                    .as_mut()
                    .ok_or_else(|| CrudError::Transaction("transaction already finished".into()))?;
                match mode {
                    Mode::All => query.fetch_all(&mut **conn).await.map(Fetch::All),
                    Mode::Optional => query.fetch_optional(&mut **conn).await.map(Fetch::Optional),
                    Mode::Execute => query.execute(&mut **conn).await.map(Fetch::Done),
                }
            }
            None => match mode {
                Mode::All => query.fetch_all(&self.pool).await.map(Fetch::All),
                Mode::Optional => query.fetch_optional(&self.pool).await.map(Fetch::Optional),
                Mode::Execute => query.execute(&self.pool).await.map(Fetch::Done),
            },
        };

        result.map_err(|e| CrudError::database_operation(spec.name, operation, e))
    }

    async fn fetch_records(
        &self,
        spec: &ModelSpec,
        operation: &'static str,
        statement: Statement,
    ) -> Result<Vec<Row>, CrudError> {
        match self.run(spec, operation, statement, Mode::All).await? {
            Fetch::All(rows) => rows.iter().map(|row| record(spec, operation, row)).collect(),
            _ => Ok(Vec::new()),
        }
    }

    async fn fetch_record(
        &self,
        spec: &ModelSpec,
        operation: &'static str,
        statement: Statement,
    ) -> Result<Option<Row>, CrudError> {
        match self.run(spec, operation, statement, Mode::Optional).await? {
            Fetch::Optional(Some(row)) => record(spec, operation, &row).map(Some),
            _ => Ok(None),
        }
    }

    async fn execute(
        &self,
        spec: &ModelSpec,
        operation: &'static str,
        statement: Statement,
    ) -> Result<u64, CrudError> {
        match self.run(spec, operation, statement, Mode::Execute).await? {
            Fetch::Done(result) => Ok(result.rows_affected()),
            _ => Ok(0),
        }
    }

    fn transaction(&self) -> Result<&Arc<Mutex<Option<Transaction<'static, Postgres>>>>, CrudError> {
        self.transaction
            .as_ref()
            .ok_or_else(|| CrudError::Transaction("no transaction in progress".into()))
    }
}

/// Decode the `record` column produced by the generated projection
fn record(spec: &ModelSpec, operation: &str, row: &PgRow) -> Result<Row, CrudError> {
    let value: Value = row
        .try_get("record")
        .map_err(|e| CrudError::database_operation(spec.name, operation, e))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(CrudError::validation(spec.name, "record", "expected a JSON object")),
    }
}

#[async_trait]
impl StoreClient for PgClient {
    async fn create(&self, spec: &ModelSpec, data: Row, projection: &Projection) -> Result<Row, CrudError> {
        let statement = SqlGenerator::insert(spec, &data, projection)?;
        self.fetch_record(spec, "create", statement)
            .await?
            .ok_or_else(|| CrudError::not_found(spec.name, "create"))
    }

    async fn create_many(&self, spec: &ModelSpec, data: Vec<Row>, skip_duplicates: bool) -> Result<u64, CrudError> {
        if data.is_empty() {
            return Ok(0);
        }
        let statement = SqlGenerator::insert_many(spec, &data, skip_duplicates)?;
        self.execute(spec, "create_many", statement).await
    }

    async fn find_first(&self, spec: &ModelSpec, args: &FindArgs) -> Result<Option<Row>, CrudError> {
        let args = args.clone().take(1);
        let statement = SqlGenerator::select(spec, &args)?;
        self.fetch_record(spec, "find_first", statement).await
    }

    async fn find_many(&self, spec: &ModelSpec, args: &FindArgs) -> Result<Vec<Row>, CrudError> {
        let statement = SqlGenerator::select(spec, args)?;
        self.fetch_records(spec, "find_many", statement).await
    }

    async fn count(&self, spec: &ModelSpec, filter: &Filter) -> Result<u64, CrudError> {
        let statement = SqlGenerator::count(spec, filter.conditions())?;
        let row = match self.run(spec, "count", statement, Mode::Optional).await? {
            Fetch::Optional(Some(row)) => row,
            _ => return Ok(0),
        };
        let total: i64 = row
            .try_get("total")
            .map_err(|e| CrudError::database_operation(spec.name, "count", e))?;
        Ok(total.max(0) as u64)
    }

    async fn update(
        &self,
        spec: &ModelSpec,
        filter: &Filter,
        data: Row,
        projection: &Projection,
    ) -> Result<Row, CrudError> {
        let statement = SqlGenerator::update(spec, filter.conditions(), &data, projection)?;
        self.fetch_record(spec, "update", statement)
            .await?
            .ok_or_else(|| CrudError::not_found(spec.name, "update"))
    }

    async fn update_many(&self, spec: &ModelSpec, filter: &Filter, data: Row) -> Result<u64, CrudError> {
        let statement = SqlGenerator::update_many(spec, filter.conditions(), &data)?;
        self.execute(spec, "update_many", statement).await
    }

    async fn upsert(
        &self,
        spec: &ModelSpec,
        filter: &Filter,
        create: Row,
        update: Row,
        projection: &Projection,
    ) -> Result<Row, CrudError> {
        let statement = SqlGenerator::upsert(spec, filter.conditions(), &create, &update, projection)?;
        self.fetch_record(spec, "upsert", statement)
            .await?
            .ok_or_else(|| CrudError::not_found(spec.name, "upsert"))
    }

    async fn delete(&self, spec: &ModelSpec, filter: &Filter, projection: &Projection) -> Result<Row, CrudError> {
        let statement = SqlGenerator::delete(spec, filter.conditions(), projection)?;
        self.fetch_record(spec, "delete", statement)
            .await?
            .ok_or_else(|| CrudError::not_found(spec.name, "delete"))
    }

    async fn delete_many(&self, spec: &ModelSpec, filter: &Filter) -> Result<u64, CrudError> {
        let statement = SqlGenerator::delete_many(spec, filter.conditions())?;
        self.execute(spec, "delete_many", statement).await
    }

    async fn begin(&self) -> Result<Self, CrudError> {
        if self.transaction.is_some() {
            return Err(CrudError::Transaction(
                "nested transactions are not supported".into(),
            ));
        }
        let transaction = self
            .pool
            .begin()
            .await
            .map_err(|e| CrudError::Transaction(format!("Failed to begin transaction: {}", e)))?;
        Ok(Self {
            pool: self.pool.clone(),
            transaction: Some(Arc::new(Mutex::new(Some(transaction)))),
        })
    }

    async fn commit(&self) -> Result<(), CrudError> {
        let transaction = self
            .transaction()?
            .lock()
            .await
            .take()
            .ok_or_else(|| CrudError::Transaction("transaction already finished".into()))?;
        transaction
            .commit()
            .await
            .map_err(|e| CrudError::Transaction(format!("Failed to commit transaction: {}", e)))
    }

    async fn rollback(&self) -> Result<(), CrudError> {
        let transaction = self
            .transaction()?
            .lock()
            .await
            .take()
            .ok_or_else(|| CrudError::Transaction("transaction already finished".into()))?;
        transaction
            .rollback()
            .await
            .map_err(|e| CrudError::Transaction(format!("Failed to rollback transaction: {}", e)))
    }

    fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }
}
