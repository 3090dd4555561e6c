//! Per-call options and projections

/// A related table embedded into each returned record under `name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub name: String,
    pub table: String,
    /// Column on the queried record
    pub local_column: String,
    /// Column on the related rows that must equal `local_column`
    pub foreign_column: String,
    /// Embed an array of rows rather than a single row (or null)
    pub many: bool,
}

impl Relation {
    /// Rows of `table` whose `foreign_column` points at this record's `id`
    pub fn has_many(name: &str, table: &str, foreign_column: &str) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            local_column: "id".to_string(),
            foreign_column: foreign_column.to_string(),
            many: true,
        }
    }

    /// The row of `table` whose `id` this record's `local_column` references
    pub fn belongs_to(name: &str, table: &str, local_column: &str) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            local_column: local_column.to_string(),
            foreign_column: "id".to_string(),
            many: false,
        }
    }

    /// Override the join columns
    pub fn on(mut self, local_column: &str, foreign_column: &str) -> Self {
        self.local_column = local_column.to_string();
        self.foreign_column = foreign_column.to_string();
        self
    }
}

/// Shape of returned records: optional column subset plus embedded relations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    pub select: Option<Vec<String>>,
    pub include: Vec<Relation>,
}

impl Projection {
    pub fn is_default(&self) -> bool {
        self.select.is_none() && self.include.is_empty()
    }
}

/// Options accepted by every repository call
#[derive(Debug, Clone, Default)]
pub struct CrudOptions {
    pub include: Vec<Relation>,
    pub select: Option<Vec<String>>,
    pub order_by: Option<String>,
    pub with_deleted: bool,
    pub skip_duplicates: bool,
}

impl CrudOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, relation: Relation) -> Self {
        self.include.push(relation);
        self
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.select = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn order_by(mut self, sort: &str) -> Self {
        self.order_by = Some(sort.to_string());
        self
    }

    pub fn with_deleted(mut self) -> Self {
        self.with_deleted = true;
        self
    }

    pub fn skip_duplicates(mut self) -> Self {
        self.skip_duplicates = true;
        self
    }

    pub fn projection(&self) -> Projection {
        Projection {
            select: self.select.clone(),
            include: self.include.clone(),
        }
    }
}
