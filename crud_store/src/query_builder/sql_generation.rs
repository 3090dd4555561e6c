//! SQL generation for PostgreSQL
//!
//! Statements are fully parameterized: values travel in `Statement::params`,
//! identifiers are validated and double-quoted. Records are returned as a
//! single `record` column built with `to_jsonb`/`jsonb_build_object`, so one
//! code path serves every model, projection and include.
//!
//! Column values are bound as a one-key `jsonb` object and read back through
//! `jsonb_populate_record(NULL::"table", $n)."column"`, which gives every
//! value the declared type of the column it is written to or compared with.
//! LIKE patterns are the exception and are bound as plain text.

use crate::errors::CrudError;
use crate::query_builder::filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
use crate::query_builder::options::Projection;
use crate::query_builder::pagination::MAX_ROW_BOUND;
use crate::query_builder::ordering::SortField;
use crate::traits::{FindArgs, ModelSpec};
use crate::validation::utils::{quote_field, quote_table};
use crate::Row;
use serde_json::Value;

/// A SQL string with its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Positional parameter accumulator; placeholders are numbered in push order
#[derive(Debug)]
struct Params {
    table: String,
    values: Vec<Value>,
}

impl Params {
    fn new(table: &str) -> Result<Self, CrudError> {
        Ok(Self {
            table: quote_table(table)?,
            values: Vec::new(),
        })
    }

    /// Placeholder expression typed as `column` of the statement's table
    fn push(&mut self, column: &str, value: Value) -> Result<String, CrudError> {
        let quoted = quote_field(column)?;
        let mut wrapped = Row::new();
        wrapped.insert(column.to_string(), value);
        self.values.push(Value::Object(wrapped));
        Ok(format!(
            "(jsonb_populate_record(NULL::{}, ${})).{}",
            self.table,
            self.values.len(),
            quoted
        ))
    }

    fn push_text(&mut self, value: &Value) -> String {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.values.push(Value::String(text));
        format!("${}", self.values.len())
    }
}

pub struct SqlGenerator;

impl SqlGenerator {
    /// Build WHERE clause from conditions on `table`, numbering parameters from `$1`
    pub fn build_where_clause(
        table: &str,
        conditions: &[QueryFilter],
    ) -> Result<(String, Vec<Value>), CrudError> {
        let mut params = Params::new(table)?;
        let clause = Self::where_clause(conditions, &mut params)?;
        Ok((clause, params.values))
    }

    fn where_clause(conditions: &[QueryFilter], params: &mut Params) -> Result<String, CrudError> {
        if conditions.is_empty() {
            return Ok(String::new());
        }
        let conditions_sql = conditions
            .iter()
            .map(|condition| Self::build_condition_sql(condition, params))
            .collect::<Result<Vec<_>, _>>()?
            .join(" AND ");
        Ok(format!("WHERE {}", conditions_sql))
    }

    fn build_condition_sql(filter: &QueryFilter, params: &mut Params) -> Result<String, CrudError> {
        match filter {
            QueryFilter::Condition(condition) => Self::build_single_condition_sql(condition, params),
            QueryFilter::Group { operator, filters } => {
                if filters.is_empty() {
                    return Ok(match operator {
                        LogicalOperator::And => "TRUE".to_string(),
                        LogicalOperator::Or => "FALSE".to_string(),
                    });
                }
                let operator_str = match operator {
                    LogicalOperator::And => " AND ",
                    LogicalOperator::Or => " OR ",
                };
                let group_conditions = filters
                    .iter()
                    .map(|f| Self::build_condition_sql(f, params))
                    .collect::<Result<Vec<_>, _>>()?
                    .join(operator_str);
                Ok(format!("({})", group_conditions))
            }
        }
    }

    fn build_single_condition_sql(
        condition: &QueryCondition,
        params: &mut Params,
    ) -> Result<String, CrudError> {
        let field = quote_field(&condition.field)?;

        let binary = |op: &str, params: &mut Params| -> Result<String, CrudError> {
            Ok(match &condition.value {
                Some(value) => format!(
                    "{} {} {}",
                    field,
                    op,
                    params.push(&condition.field, value.clone())?
                ),
                None => "1=0".to_string(),
            })
        };
        let pattern = |op: &str, params: &mut Params| match &condition.value {
            Some(value) => format!("{}::text {} {}", field, op, params.push_text(value)),
            None => "1=0".to_string(),
        };

        let sql = match &condition.operator {
            QueryOperator::Eq => match &condition.value {
                Some(Value::Null) | None => format!("{} IS NULL", field),
                Some(_) => binary("=", params)?,
            },
            QueryOperator::Ne => match &condition.value {
                Some(Value::Null) | None => format!("{} IS NOT NULL", field),
                Some(_) => binary("!=", params)?,
            },
            QueryOperator::Gt => binary(">", params)?,
            QueryOperator::Gte => binary(">=", params)?,
            QueryOperator::Lt => binary("<", params)?,
            QueryOperator::Lte => binary("<=", params)?,
            QueryOperator::Like => pattern("LIKE", params),
            QueryOperator::ILike => pattern("ILIKE", params),
            QueryOperator::In | QueryOperator::NotIn => {
                let not_in = condition.operator == QueryOperator::NotIn;
                match &condition.value {
                    Some(Value::Array(values)) if !values.is_empty() => {
                        let placeholders = values
                            .iter()
                            .map(|v| params.push(&condition.field, v.clone()))
                            .collect::<Result<Vec<_>, _>>()?;
                        format!(
                            "{} {} ({})",
                            field,
                            if not_in { "NOT IN" } else { "IN" },
                            placeholders.join(", ")
                        )
                    }
                    // Empty IN matches nothing, empty NOT IN matches everything
                    _ if not_in => "1=1".to_string(),
                    _ => "1=0".to_string(),
                }
            }
            QueryOperator::IsNull => format!("{} IS NULL", field),
            QueryOperator::IsNotNull => format!("{} IS NOT NULL", field),
        };
        Ok(sql)
    }

    /// Build ORDER BY clause, qualifying columns with `alias`
    pub fn build_order_clause(order_by: &[SortField], alias: &str) -> Result<String, CrudError> {
        if order_by.is_empty() {
            return Ok(String::new());
        }
        let order_items = order_by
            .iter()
            .map(|sort| Ok(format!("{}.{} {}", alias, quote_field(&sort.field)?, sort.order.to_sql())))
            .collect::<Result<Vec<_>, CrudError>>()?;
        Ok(format!("ORDER BY {}", order_items.join(", ")))
    }

    /// Build LIMIT/OFFSET clause; both are clamped to the `bigint` range
    pub fn build_limit_clause(limit: Option<u64>, offset: Option<u64>) -> String {
        let mut clauses = Vec::new();
        if let Some(limit) = limit {
            clauses.push(format!("LIMIT {}", limit.min(MAX_ROW_BOUND)));
        }
        if let Some(offset) = offset {
            clauses.push(format!("OFFSET {}", offset.min(MAX_ROW_BOUND)));
        }
        clauses.join(" ")
    }

    /// JSON expression producing one record from the row aliased `alias`
    pub fn build_projection(projection: &Projection, alias: &str) -> Result<String, CrudError> {
        let mut parts = Vec::with_capacity(1 + projection.include.len());

        match &projection.select {
            Some(columns) if !columns.is_empty() => {
                let pairs = columns
                    .iter()
                    .map(|column| Ok(format!("'{}', {}.{}", column, alias, quote_field(column)?)))
                    .collect::<Result<Vec<_>, CrudError>>()?;
                parts.push(format!("jsonb_build_object({})", pairs.join(", ")));
            }
            _ => parts.push(format!("to_jsonb({}.*)", alias)),
        }

        for relation in &projection.include {
            quote_field(&relation.name)?;
            let table = quote_table(&relation.table)?;
            let foreign = quote_field(&relation.foreign_column)?;
            let local = quote_field(&relation.local_column)?;
            let related = if relation.many {
                format!(
                    "(SELECT COALESCE(jsonb_agg(to_jsonb(r.*)), '[]'::jsonb) FROM {} r WHERE r.{} = {}.{})",
                    table, foreign, alias, local
                )
            } else {
                format!(
                    "(SELECT to_jsonb(r.*) FROM {} r WHERE r.{} = {}.{} LIMIT 1)",
                    table, foreign, alias, local
                )
            };
            parts.push(format!("jsonb_build_object('{}', {})", relation.name, related));
        }

        Ok(parts.join(" || "))
    }

    pub fn select(spec: &ModelSpec, args: &FindArgs) -> Result<Statement, CrudError> {
        let mut params = Params::new(spec.table)?;
        let projection = Self::build_projection(&args.projection, "t")?;
        let where_clause = Self::where_clause(args.filter.conditions(), &mut params)?;
        let order_clause = Self::build_order_clause(&args.order_by, "t")?;
        let limit_clause = Self::build_limit_clause(args.take, args.skip);

        let mut sql = format!("SELECT {} AS record FROM {} t", projection, quote_table(spec.table)?);
        for clause in [&where_clause, &order_clause, &limit_clause] {
            if !clause.is_empty() {
                sql.push(' ');
                sql.push_str(clause);
            }
        }
        Ok(Statement {
            sql,
            params: params.values,
        })
    }

    pub fn count(spec: &ModelSpec, conditions: &[QueryFilter]) -> Result<Statement, CrudError> {
        let mut params = Params::new(spec.table)?;
        let where_clause = Self::where_clause(conditions, &mut params)?;
        let mut sql = format!("SELECT COUNT(*) AS total FROM {} t", quote_table(spec.table)?);
        if !where_clause.is_empty() {
            sql.push(' ');
            sql.push_str(&where_clause);
        }
        Ok(Statement {
            sql,
            params: params.values,
        })
    }

    pub fn insert(spec: &ModelSpec, data: &Row, projection: &Projection) -> Result<Statement, CrudError> {
        let mut params = Params::new(spec.table)?;
        let table = quote_table(spec.table)?;
        let insert = if data.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES RETURNING *", table)
        } else {
            let (columns, values) = Self::column_values(data, &mut params)?;
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
                table,
                columns.join(", "),
                values.join(", ")
            )
        };
        Self::returning_record(insert, projection, params)
    }

    /// Multi-row insert; keys missing from a row fall back to the column DEFAULT
    pub fn insert_many(spec: &ModelSpec, rows: &[Row], skip_duplicates: bool) -> Result<Statement, CrudError> {
        let mut columns: Vec<&String> = Vec::new();
        for row in rows {
            for key in row.keys() {
                if !columns.contains(&key) {
                    columns.push(key);
                }
            }
        }
        if columns.is_empty() {
            return Err(CrudError::validation(spec.name, "data", "create_many needs at least one column"));
        }

        let mut params = Params::new(spec.table)?;
        let quoted = columns
            .iter()
            .map(|c| quote_field(c))
            .collect::<Result<Vec<_>, _>>()?;
        let tuples: Vec<String> = rows
            .iter()
            .map(|row| {
                let values: Vec<String> = columns
                    .iter()
                    .map(|column| match row.get(column.as_str()) {
                        Some(value) => params.push(column.as_str(), value.clone()),
                        None => Ok("DEFAULT".to_string()),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", values.join(", ")))
            })
            .collect::<Result<Vec<_>, CrudError>>()?;

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            quote_table(spec.table)?,
            quoted.join(", "),
            tuples.join(", ")
        );
        if skip_duplicates {
            sql.push_str(" ON CONFLICT DO NOTHING");
        }
        Ok(Statement {
            sql,
            params: params.values,
        })
    }

    /// Update the first row matching `conditions`
    pub fn update(
        spec: &ModelSpec,
        conditions: &[QueryFilter],
        data: &Row,
        projection: &Projection,
    ) -> Result<Statement, CrudError> {
        let mut params = Params::new(spec.table)?;
        let table = quote_table(spec.table)?;
        let target = Self::first_match(spec, conditions, &mut params)?;
        let set_clause = Self::set_clause(spec, data, &mut params)?;
        let update = format!("UPDATE {} SET {} WHERE {} RETURNING *", table, set_clause, target);
        Self::returning_record(update, projection, params)
    }

    pub fn update_many(spec: &ModelSpec, conditions: &[QueryFilter], data: &Row) -> Result<Statement, CrudError> {
        let mut params = Params::new(spec.table)?;
        let set_clause = Self::set_clause(spec, data, &mut params)?;
        let where_clause = Self::where_clause(conditions, &mut params)?;
        let mut sql = format!("UPDATE {} SET {}", quote_table(spec.table)?, set_clause);
        if !where_clause.is_empty() {
            sql.push(' ');
            sql.push_str(&where_clause);
        }
        Ok(Statement {
            sql,
            params: params.values,
        })
    }

    /// Delete the first row matching `conditions`
    pub fn delete(spec: &ModelSpec, conditions: &[QueryFilter], projection: &Projection) -> Result<Statement, CrudError> {
        let mut params = Params::new(spec.table)?;
        let target = Self::first_match(spec, conditions, &mut params)?;
        let delete = format!("DELETE FROM {} WHERE {} RETURNING *", quote_table(spec.table)?, target);
        Self::returning_record(delete, projection, params)
    }

    pub fn delete_many(spec: &ModelSpec, conditions: &[QueryFilter]) -> Result<Statement, CrudError> {
        let mut params = Params::new(spec.table)?;
        let where_clause = Self::where_clause(conditions, &mut params)?;
        let mut sql = format!("DELETE FROM {}", quote_table(spec.table)?);
        if !where_clause.is_empty() {
            sql.push(' ');
            sql.push_str(&where_clause);
        }
        Ok(Statement {
            sql,
            params: params.values,
        })
    }

    /// Single-statement upsert: lock the first match, update it if present,
    /// insert `create` otherwise
    pub fn upsert(
        spec: &ModelSpec,
        conditions: &[QueryFilter],
        create: &Row,
        update: &Row,
        projection: &Projection,
    ) -> Result<Statement, CrudError> {
        if create.is_empty() {
            return Err(CrudError::validation(spec.name, "create", "upsert needs create data"));
        }

        let mut params = Params::new(spec.table)?;
        let table = quote_table(spec.table)?;
        let pk = quote_field(spec.primary_key)?;
        let where_clause = Self::where_clause(conditions, &mut params)?;

        let existing = format!(
            "SELECT {pk} FROM {table} {where_clause} LIMIT 1 FOR UPDATE",
            pk = pk,
            table = table,
            where_clause = where_clause
        );

        let updated = if update.is_empty() && Self::updated_at(spec).is_none() {
            format!("SELECT * FROM {} WHERE {} IN (SELECT {} FROM existing)", table, pk, pk)
        } else {
            let set_clause = Self::set_clause(spec, update, &mut params)?;
            format!(
                "UPDATE {} SET {} WHERE {} IN (SELECT {} FROM existing) RETURNING *",
                table, set_clause, pk, pk
            )
        };

        let (columns, values) = Self::column_values(create, &mut params)?;
        let inserted = format!(
            "INSERT INTO {} ({}) SELECT {} WHERE NOT EXISTS (SELECT 1 FROM existing) RETURNING *",
            table,
            columns.join(", "),
            values.join(", ")
        );

        let sql = format!(
            "WITH existing AS ({}), updated AS ({}), inserted AS ({}), \
             t AS (SELECT * FROM updated UNION ALL SELECT * FROM inserted) \
             SELECT {} AS record FROM t",
            existing,
            updated,
            inserted,
            Self::build_projection(projection, "t")?
        );
        Ok(Statement {
            sql,
            params: params.values,
        })
    }

    fn returning_record(statement: String, projection: &Projection, params: Params) -> Result<Statement, CrudError> {
        let sql = format!(
            "WITH t AS ({}) SELECT {} AS record FROM t",
            statement,
            Self::build_projection(projection, "t")?
        );
        Ok(Statement {
            sql,
            params: params.values,
        })
    }

    /// `"pk" = (SELECT "pk" FROM "table" WHERE ... LIMIT 1)`
    fn first_match(spec: &ModelSpec, conditions: &[QueryFilter], params: &mut Params) -> Result<String, CrudError> {
        let pk = quote_field(spec.primary_key)?;
        let where_clause = Self::where_clause(conditions, params)?;
        let mut subquery = format!("SELECT {} FROM {}", pk, quote_table(spec.table)?);
        if !where_clause.is_empty() {
            subquery.push(' ');
            subquery.push_str(&where_clause);
        }
        Ok(format!("{} = ({} LIMIT 1)", pk, subquery))
    }

    fn column_values(data: &Row, params: &mut Params) -> Result<(Vec<String>, Vec<String>), CrudError> {
        let mut columns = Vec::with_capacity(data.len());
        let mut values = Vec::with_capacity(data.len());
        for (column, value) in data {
            columns.push(quote_field(column)?);
            values.push(params.push(column, value.clone())?);
        }
        Ok((columns, values))
    }

    fn set_clause(spec: &ModelSpec, data: &Row, params: &mut Params) -> Result<String, CrudError> {
        let mut assignments = Vec::with_capacity(data.len() + 1);
        for (column, value) in data {
            assignments.push(format!("{} = {}", quote_field(column)?, params.push(column, value.clone())?));
        }
        if let Some(updated_at) = Self::updated_at(spec) {
            if !data.contains_key(updated_at) {
                assignments.push(format!("{} = NOW()", quote_field(updated_at)?));
            }
        }
        if assignments.is_empty() {
            return Err(CrudError::validation(spec.name, "data", "update data is empty"));
        }
        Ok(assignments.join(", "))
    }

    fn updated_at(spec: &ModelSpec) -> Option<&'static str> {
        spec.updated_at_column.filter(|column| spec.has_column(column))
    }
}
