//! In-process store client
//!
//! Tables are vectors of JSON rows behind a shared lock. Transactions work on
//! a snapshot of every table; commit merges the rows the transaction inserted,
//! changed or removed (matched by primary key) into the current shared state,
//! so writes committed elsewhere in the meantime survive and a rolled back
//! unit of work leaves no trace. Every call is appended to an operation log
//! (`"users.find_many"`) that tests use to check which store calls were made.

use super::eval::{compare_rows, matches, values_equal};
use super::timestamp_now;
use crate::errors::CrudError;
use crate::query_builder::{Filter, Projection};
use crate::traits::{FindArgs, ModelSpec, StoreClient};
use crate::Row;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    spec: Option<ModelSpec>,
    rows: Vec<Row>,
}

impl MemoryTable {
    fn position(&self, key: &str, value: &Value) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.get(key).is_some_and(|v| values_equal(v, value)))
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    tables: HashMap<String, MemoryTable>,
}

impl MemoryState {
    fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.get(name)
    }

    fn table_mut(&mut self, spec: &ModelSpec) -> &mut MemoryTable {
        let table = self.tables.entry(spec.table.to_string()).or_default();
        if table.spec.is_none() {
            table.spec = Some(spec.clone());
        }
        table
    }

    fn rows(&self, name: &str) -> &[Row] {
        self.table(name).map(|t| t.rows.as_slice()).unwrap_or(&[])
    }
}

/// Serial counters per table, shared by every handle and never rolled back
#[derive(Debug, Clone, Default)]
struct Sequences(Arc<StdMutex<HashMap<String, i64>>>);

impl Sequences {
    fn next(&self, table: &str) -> i64 {
        let mut counters = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let counter = counters.entry(table.to_string()).or_default();
        *counter += 1;
        *counter
    }

    /// Keep the counter ahead of an explicitly supplied id
    fn observe(&self, table: &str, id: i64) {
        let mut counters = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let counter = counters.entry(table.to_string()).or_default();
        *counter = (*counter).max(id);
    }
}

/// Tables as of `begin`, and the transaction's own copy
#[derive(Debug)]
struct TransactionState {
    base: MemoryState,
    working: MemoryState,
}

/// Store client keeping every table in memory
#[derive(Clone, Default)]
pub struct MemoryClient {
    state: Arc<RwLock<MemoryState>>,
    transaction: Option<Arc<Mutex<Option<TransactionState>>>>,
    sequences: Sequences,
    operations: Arc<StdMutex<Vec<String>>>,
}

impl std::fmt::Debug for MemoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryClient")
            .field("in_transaction", &self.transaction.is_some())
            .finish()
    }
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls issued so far, as `"<table>.<operation>"`
    pub fn operations(&self) -> Vec<String> {
        self.operations
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn clear_operations(&self) {
        if let Ok(mut log) = self.operations.lock() {
            log.clear();
        }
    }

    /// Committed rows of a table, in insertion order
    pub async fn dump(&self, table: &str) -> Vec<Row> {
        self.state.read().await.rows(table).to_vec()
    }

    fn record(&self, spec: &ModelSpec, operation: &str) {
        if let Ok(mut log) = self.operations.lock() {
            log.push(format!("{}.{}", spec.table, operation));
        }
    }

    /// Run `work` against the transaction snapshot, or the shared state
    async fn with_state<R, F>(&self, work: F) -> Result<R, CrudError>
    where
        F: FnOnce(&mut MemoryState) -> Result<R, CrudError> + Send,
        R: Send,
    {
        match &self.transaction {
            Some(transaction) => {
                let mut guard = transaction.lock().await;
                let state = guard
                    .as_mut()
                    .ok_or_else(|| CrudError::Transaction("transaction already finished".into()))?;
                work(&mut state.working)
            }
            None => {
                let mut guard = self.state.write().await;
                work(&mut guard)
            }
        }
    }
}

fn ensure_object(spec: &ModelSpec, row: &mut Row) {
    for column in spec.columns {
        row.entry(column.to_string()).or_insert(Value::Null);
    }
}

/// Apply the defaults PostgreSQL would: serial id, timestamps, null columns
fn prepare_insert(spec: &ModelSpec, sequences: &Sequences, mut row: Row) -> Row {
    let now = timestamp_now();
    match row.get(spec.primary_key) {
        None | Some(Value::Null) => {
            let id = sequences.next(spec.table);
            row.insert(spec.primary_key.to_string(), Value::from(id));
        }
        Some(Value::Number(n)) => {
            if let Some(id) = n.as_i64() {
                sequences.observe(spec.table, id);
            }
        }
        Some(_) => {}
    }
    for column in [spec.created_at_column, spec.updated_at_column].into_iter().flatten() {
        if spec.has_column(column) && row.get(column).is_none_or(Value::is_null) {
            row.insert(column.to_string(), now.clone());
        }
    }
    ensure_object(spec, &mut row);
    row
}

/// First conflicting unique value of `row` among `rows`, skipping index `skip`
fn unique_conflict(spec: &ModelSpec, rows: &[Row], row: &Row, skip: Option<usize>) -> Option<String> {
    let keys = std::iter::once(spec.primary_key).chain(spec.unique_columns.iter().copied());
    for key in keys {
        let Some(value) = row.get(key).filter(|v| !v.is_null()) else {
            continue;
        };
        let taken = rows
            .iter()
            .enumerate()
            .any(|(i, other)| Some(i) != skip && other.get(key).is_some_and(|o| values_equal(o, value)));
        if taken {
            return Some(format!("{} = {} already exists", key, value));
        }
    }
    None
}

fn apply_update(spec: &ModelSpec, row: &mut Row, data: &Row) {
    for (key, value) in data {
        row.insert(key.clone(), value.clone());
    }
    if let Some(updated_at) = spec.updated_at_column.filter(|c| spec.has_column(c)) {
        if !data.contains_key(updated_at) {
            row.insert(updated_at.to_string(), timestamp_now());
        }
    }
}

fn project(state: &MemoryState, row: &Row, projection: &Projection) -> Row {
    let mut record = match &projection.select {
        Some(columns) if !columns.is_empty() => columns
            .iter()
            .map(|column| (column.clone(), row.get(column).cloned().unwrap_or(Value::Null)))
            .collect(),
        _ => row.clone(),
    };

    for relation in &projection.include {
        let local = row.get(&relation.local_column).unwrap_or(&Value::Null);
        let mut related = state.rows(&relation.table).iter().filter(|other| {
            !local.is_null()
                && other
                    .get(&relation.foreign_column)
                    .is_some_and(|foreign| values_equal(foreign, local))
        });
        let embedded = if relation.many {
            Value::Array(related.map(|r| Value::Object(r.clone())).collect())
        } else {
            related
                .next()
                .map(|r| Value::Object(r.clone()))
                .unwrap_or(Value::Null)
        };
        record.insert(relation.name.clone(), embedded);
    }
    record
}

fn find_rows(state: &MemoryState, spec: &ModelSpec, args: &FindArgs) -> Vec<Row> {
    let mut found: Vec<&Row> = state
        .rows(spec.table)
        .iter()
        .filter(|row| matches(row, &args.filter))
        .collect();
    if !args.order_by.is_empty() {
        found.sort_by(|a, b| compare_rows(a, b, &args.order_by));
    }
    let skip = args.skip.unwrap_or(0) as usize;
    let take = args.take.map(|t| t as usize).unwrap_or(usize::MAX);
    found
        .into_iter()
        .skip(skip)
        .take(take)
        .map(|row| project(state, row, &args.projection))
        .collect()
}

fn first_index(state: &MemoryState, spec: &ModelSpec, filter: &Filter) -> Option<usize> {
    state.rows(spec.table).iter().position(|row| matches(row, filter))
}

fn insert_row(
    state: &mut MemoryState,
    sequences: &Sequences,
    spec: &ModelSpec,
    data: Row,
) -> Result<Row, CrudError> {
    let row = prepare_insert(spec, sequences, data);
    let table = state.table_mut(spec);
    if let Some(detail) = unique_conflict(spec, &table.rows, &row, None) {
        return Err(CrudError::unique_violation(spec.name, detail));
    }
    table.rows.push(row.clone());
    Ok(row)
}

fn update_at(state: &mut MemoryState, spec: &ModelSpec, index: usize, data: &Row) -> Result<Row, CrudError> {
    let table = state.table_mut(spec);
    let mut updated = table.rows[index].clone();
    apply_update(spec, &mut updated, data);
    if let Some(detail) = unique_conflict(spec, &table.rows, &updated, Some(index)) {
        return Err(CrudError::unique_violation(spec.name, detail));
    }
    table.rows[index] = updated.clone();
    Ok(updated)
}

/// Apply the row changes of `working` relative to `base` onto `shared`.
///
/// Rows are matched by primary key. A changed row that was removed from
/// `shared` in the meantime stays removed; an inserted row whose key or unique
/// value is now taken fails the whole merge.
fn merge_tables(shared: &mut MemoryState, base: &MemoryState, working: MemoryState) -> Result<(), CrudError> {
    for (name, table) in working.tables {
        let Some(spec) = table.spec.clone() else {
            continue;
        };
        let pk = spec.primary_key;
        let base_table = base.table(&name);
        let base_rows = base_table.map(|t| t.rows.as_slice()).unwrap_or(&[]);
        let base_row = |value: &Value| {
            base_rows
                .iter()
                .find(|row| row.get(pk).is_some_and(|v| values_equal(v, value)))
        };

        let target = shared.table_mut(&spec);
        for removed in base_rows {
            let Some(key) = removed.get(pk) else { continue };
            if table.position(pk, key).is_none() {
                if let Some(index) = target.position(pk, key) {
                    target.rows.remove(index);
                }
            }
        }

        for row in table.rows {
            let Some(key) = row.get(pk).cloned() else { continue };
            match base_row(&key) {
                Some(original) if *original == row => {}
                Some(_) => {
                    if let Some(index) = target.position(pk, &key) {
                        if let Some(detail) = unique_conflict(&spec, &target.rows, &row, Some(index)) {
                            return Err(CrudError::unique_violation(spec.name, detail));
                        }
                        target.rows[index] = row;
                    }
                }
                None => {
                    if let Some(detail) = unique_conflict(&spec, &target.rows, &row, None) {
                        return Err(CrudError::unique_violation(spec.name, detail));
                    }
                    target.rows.push(row);
                }
            }
        }
    }
    Ok(())
}

#[async_trait]
impl StoreClient for MemoryClient {
    async fn create(&self, spec: &ModelSpec, data: Row, projection: &Projection) -> Result<Row, CrudError> {
        self.record(spec, "create");
        self.with_state(|state| {
            let row = insert_row(state, &self.sequences, spec, data)?;
            Ok(project(state, &row, projection))
        })
        .await
    }

    async fn create_many(&self, spec: &ModelSpec, data: Vec<Row>, skip_duplicates: bool) -> Result<u64, CrudError> {
        self.record(spec, "create_many");
        self.with_state(|state| {
            // Stage on a copy so a failing batch leaves the table untouched
            let mut staged = state.table_mut(spec).clone();
            let mut count = 0;
            for item in data {
                let row = prepare_insert(spec, &self.sequences, item);
                match unique_conflict(spec, &staged.rows, &row, None) {
                    Some(_) if skip_duplicates => continue,
                    Some(detail) => return Err(CrudError::unique_violation(spec.name, detail)),
                    None => {
                        staged.rows.push(row);
                        count += 1;
                    }
                }
            }
            *state.table_mut(spec) = staged;
            Ok(count)
        })
        .await
    }

    async fn find_first(&self, spec: &ModelSpec, args: &FindArgs) -> Result<Option<Row>, CrudError> {
        self.record(spec, "find_first");
        let args = args.clone().take(1);
        self.with_state(|state| Ok(find_rows(state, spec, &args).into_iter().next()))
            .await
    }

    async fn find_many(&self, spec: &ModelSpec, args: &FindArgs) -> Result<Vec<Row>, CrudError> {
        self.record(spec, "find_many");
        self.with_state(|state| Ok(find_rows(state, spec, args))).await
    }

    async fn count(&self, spec: &ModelSpec, filter: &Filter) -> Result<u64, CrudError> {
        self.record(spec, "count");
        self.with_state(|state| {
            Ok(state
                .rows(spec.table)
                .iter()
                .filter(|row| matches(row, filter))
                .count() as u64)
        })
        .await
    }

    async fn update(
        &self,
        spec: &ModelSpec,
        filter: &Filter,
        data: Row,
        projection: &Projection,
    ) -> Result<Row, CrudError> {
        self.record(spec, "update");
        self.with_state(|state| {
            let index = first_index(state, spec, filter)
                .ok_or_else(|| CrudError::not_found(spec.name, "update"))?;
            let row = update_at(state, spec, index, &data)?;
            Ok(project(state, &row, projection))
        })
        .await
    }

    async fn update_many(&self, spec: &ModelSpec, filter: &Filter, data: Row) -> Result<u64, CrudError> {
        self.record(spec, "update_many");
        self.with_state(|state| {
            let mut staged = state.table_mut(spec).clone();
            let mut count = 0;
            for index in 0..staged.rows.len() {
                if !matches(&staged.rows[index], filter) {
                    continue;
                }
                let mut updated = staged.rows[index].clone();
                apply_update(spec, &mut updated, &data);
                if let Some(detail) = unique_conflict(spec, &staged.rows, &updated, Some(index)) {
                    return Err(CrudError::unique_violation(spec.name, detail));
                }
                staged.rows[index] = updated;
                count += 1;
            }
            *state.table_mut(spec) = staged;
            Ok(count)
        })
        .await
    }

    async fn upsert(
        &self,
        spec: &ModelSpec,
        filter: &Filter,
        create: Row,
        update: Row,
        projection: &Projection,
    ) -> Result<Row, CrudError> {
        self.record(spec, "upsert");
        self.with_state(|state| {
            let row = match first_index(state, spec, filter) {
                Some(index) => update_at(state, spec, index, &update)?,
                None => insert_row(state, &self.sequences, spec, create)?,
            };
            Ok(project(state, &row, projection))
        })
        .await
    }

    async fn delete(&self, spec: &ModelSpec, filter: &Filter, projection: &Projection) -> Result<Row, CrudError> {
        self.record(spec, "delete");
        self.with_state(|state| {
            let index = first_index(state, spec, filter)
                .ok_or_else(|| CrudError::not_found(spec.name, "delete"))?;
            let row = state.table_mut(spec).rows.remove(index);
            Ok(project(state, &row, projection))
        })
        .await
    }

    async fn delete_many(&self, spec: &ModelSpec, filter: &Filter) -> Result<u64, CrudError> {
        self.record(spec, "delete_many");
        self.with_state(|state| {
            let table = state.table_mut(spec);
            let before = table.rows.len();
            table.rows.retain(|row| !matches(row, filter));
            Ok((before - table.rows.len()) as u64)
        })
        .await
    }

    async fn begin(&self) -> Result<Self, CrudError> {
        if self.transaction.is_some() {
            return Err(CrudError::Transaction(
                "nested transactions are not supported".into(),
            ));
        }
        let base = self.state.read().await.clone();
        let working = base.clone();
        Ok(Self {
            state: self.state.clone(),
            transaction: Some(Arc::new(Mutex::new(Some(TransactionState { base, working })))),
            sequences: self.sequences.clone(),
            operations: self.operations.clone(),
        })
    }

    async fn commit(&self) -> Result<(), CrudError> {
        let transaction = self
            .transaction
            .as_ref()
            .ok_or_else(|| CrudError::Transaction("no transaction in progress".into()))?;
        let TransactionState { base, working } = transaction
            .lock()
            .await
            .take()
            .ok_or_else(|| CrudError::Transaction("transaction already finished".into()))?;

        let mut shared = self.state.write().await;
        let mut merged = shared.clone();
        merge_tables(&mut merged, &base, working)?;
        *shared = merged;
        Ok(())
    }

    async fn rollback(&self) -> Result<(), CrudError> {
        let transaction = self
            .transaction
            .as_ref()
            .ok_or_else(|| CrudError::Transaction("no transaction in progress".into()))?;
        transaction
            .lock()
            .await
            .take()
            .ok_or_else(|| CrudError::Transaction("transaction already finished".into()))?;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }
}
