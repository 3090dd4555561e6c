//! Parsing of `#[table]` and field attributes
//!
//! Table and column names are validated here with the same rules the runtime
//! applies, so a bad identifier fails the build instead of the first query.

use syn::{Attribute, Data, DeriveInput, Error, Fields, LitStr, Result};

const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Validate table name and return syn::Error for better proc macro error handling
pub fn validate_table_name_syn(name: &str, span: proc_macro2::Span) -> Result<()> {
    validate_identifier(name)
        .and_then(|_| {
            if is_reserved_keyword(name) {
                Err(format!("Name '{}' is a reserved SQL keyword", name))
            } else {
                Ok(())
            }
        })
        .map_err(|e| Error::new(span, format!("Invalid table name '{}': {}", name, e)))
}

/// Column names are always quoted, so keywords are allowed
pub fn validate_field_name_syn(name: &str, span: proc_macro2::Span) -> Result<()> {
    validate_identifier(name)
        .map_err(|e| Error::new(span, format!("Invalid field name '{}': {}", name, e)))
}

fn validate_identifier(name: &str) -> std::result::Result<(), String> {
    let first_char = name
        .chars()
        .next()
        .ok_or_else(|| "Name cannot be empty".to_string())?;

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(format!(
            "Name '{}' is too long: {} characters (max {})",
            name,
            name.len(),
            MAX_IDENTIFIER_LENGTH
        ));
    }

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(format!(
            "Name '{}' must start with a letter or underscore",
            name
        ));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("Name '{}' contains invalid characters: only alphanumeric characters and underscores are allowed", name));
    }

    Ok(())
}

/// Keep in sync with crud_store::validation
fn is_reserved_keyword(name: &str) -> bool {
    const RESERVED_KEYWORDS: &[&str] = &[
        "ALL", "ALTER", "AND", "AS", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN", "CONSTRAINT",
        "CREATE", "DEFAULT", "DELETE", "DISTINCT", "DROP", "ELSE", "END", "EXISTS", "FALSE",
        "FOREIGN", "FROM", "FULL", "GROUP", "HAVING", "IN", "INNER", "INSERT", "JOIN", "LEFT",
        "LIKE", "LIMIT", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER", "PRIMARY",
        "REFERENCES", "RETURNING", "RIGHT", "SELECT", "TABLE", "THEN", "TRUE", "UNION", "UNIQUE",
        "UPDATE", "USER", "WHEN", "WHERE", "WITH",
    ];

    RESERVED_KEYWORDS.contains(&name.to_ascii_uppercase().as_str())
}

#[derive(Debug, PartialEq, Eq)]
pub struct ModelInfo {
    pub table: String,
    pub primary_key: String,
    pub columns: Vec<String>,
    pub unique_columns: Vec<String>,
    pub soft_delete_column: String,
    pub created_at_column: Option<String>,
    pub updated_at_column: Option<String>,
}

pub fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}

fn parse_table_name(attrs: &[Attribute]) -> Result<String> {
    let mut table_name = None;

    for attr in attrs {
        if !attr.path().is_ident("table") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                validate_table_name_syn(&value.value(), value.span())?;
                table_name = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported table option, expected `name`"))
            }
        })?;
    }

    table_name.ok_or_else(|| {
        Error::new(
            proc_macro2::Span::call_site(),
            "table attribute is required: add #[table(name = \"table_name\")] to your struct",
        )
    })
}

/// Column marked with `attribute`, else a column with the conventional name
fn marked_or_named(
    marked: Vec<String>,
    columns: &[String],
    attribute: &str,
    conventional: &str,
) -> Result<Option<String>> {
    match marked.len() {
        0 => Ok(columns.iter().find(|c| *c == conventional).cloned()),
        1 => Ok(marked.into_iter().next()),
        _ => Err(Error::new(
            proc_macro2::Span::call_site(),
            format!("only one field may be marked #[{}]", attribute),
        )),
    }
}

pub fn parse_model(input: &DeriveInput) -> Result<ModelInfo> {
    let table = parse_table_name(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(Error::new_spanned(
                    &input.ident,
                    "Model can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new_spanned(
                &input.ident,
                "Model can only be derived for structs with named fields",
            ))
        }
    };

    let mut columns = Vec::new();
    let mut unique_columns = Vec::new();
    let mut primary_keys = Vec::new();
    let mut soft_delete = Vec::new();
    let mut created_at = Vec::new();
    let mut updated_at = Vec::new();

    for field in fields {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new_spanned(field, "Field must have a name"))?;
        if has_attribute(&field.attrs, "relation") {
            continue;
        }

        let name = ident.to_string();
        let name = name.strip_prefix("r#").unwrap_or(&name).to_string();
        validate_field_name_syn(&name, ident.span())?;

        if has_attribute(&field.attrs, "primary_key") {
            primary_keys.push(name.clone());
        }
        if has_attribute(&field.attrs, "unique") {
            unique_columns.push(name.clone());
        }
        if has_attribute(&field.attrs, "soft_delete") {
            soft_delete.push(name.clone());
        }
        if has_attribute(&field.attrs, "created_at") {
            created_at.push(name.clone());
        }
        if has_attribute(&field.attrs, "updated_at") {
            updated_at.push(name.clone());
        }
        columns.push(name);
    }

    let primary_key = marked_or_named(primary_keys, &columns, "primary_key", "id")?.ok_or_else(|| {
        Error::new_spanned(
            &input.ident,
            "model needs a primary key: add an `id` field or mark one with #[primary_key]",
        )
    })?;
    let soft_delete_column = marked_or_named(soft_delete, &columns, "soft_delete", "deleted_at")?
        .ok_or_else(|| {
            Error::new_spanned(
                &input.ident,
                "model needs a soft-delete column: add a `deleted_at` field or mark one with #[soft_delete]",
            )
        })?;

    Ok(ModelInfo {
        table,
        primary_key,
        unique_columns,
        soft_delete_column,
        created_at_column: marked_or_named(created_at, &columns, "created_at", "created_at")?,
        updated_at_column: marked_or_named(updated_at, &columns, "updated_at", "updated_at")?,
        columns,
    })
}

#[cfg(test)]
mod validation_tests {
    use super::*;
    use syn::parse_quote;

    // Helper functions for tests - these call the _syn versions but panic on error
    fn validate_table_name(name: &str) {
        if let Err(e) = validate_table_name_syn(name, proc_macro2::Span::call_site()) {
            panic!("Invalid table name: {}", e);
        }
    }

    fn validate_field_name(name: &str) {
        if let Err(e) = validate_field_name_syn(name, proc_macro2::Span::call_site()) {
            panic!("Invalid field name: {}", e);
        }
    }

    #[test]
    fn test_valid_table_names() {
        validate_table_name("users");
        validate_table_name("user_profiles");
        validate_table_name("_private");
        validate_table_name("table123");
    }

    #[test]
    #[should_panic(expected = "Invalid table name")]
    fn test_reserved_keyword() {
        validate_table_name("select");
    }

    #[test]
    #[should_panic(expected = "Invalid table name")]
    fn test_invalid_start() {
        validate_table_name("123table");
    }

    #[test]
    #[should_panic(expected = "Invalid table name")]
    fn test_empty_name() {
        validate_table_name("");
    }

    #[test]
    fn test_field_names_may_be_keywords() {
        validate_field_name("order");
        validate_field_name("user_id");
    }

    #[test]
    #[should_panic(expected = "Invalid field name")]
    fn test_invalid_field() {
        validate_field_name("user-id");
    }

    #[test]
    fn test_sql_injection_prevention() {
        let malicious_names = [
            "users; DROP TABLE users; --",
            "users' OR '1'='1",
            "users\"; DELETE FROM users; --",
        ];
        for name in malicious_names {
            assert!(validate_table_name_syn(name, proc_macro2::Span::call_site()).is_err());
        }
    }

    #[test]
    fn test_conventional_columns() {
        let input: DeriveInput = parse_quote! {
            #[table(name = "users")]
            struct User {
                id: i64,
                #[unique]
                email: String,
                created_at: String,
                updated_at: String,
                deleted_at: Option<String>,
                #[relation]
                posts: Option<Vec<String>>,
            }
        };
        let info = parse_model(&input).unwrap();

        assert_eq!(
            info,
            ModelInfo {
                table: "users".to_string(),
                primary_key: "id".to_string(),
                columns: vec![
                    "id".to_string(),
                    "email".to_string(),
                    "created_at".to_string(),
                    "updated_at".to_string(),
                    "deleted_at".to_string(),
                ],
                unique_columns: vec!["email".to_string()],
                soft_delete_column: "deleted_at".to_string(),
                created_at_column: Some("created_at".to_string()),
                updated_at_column: Some("updated_at".to_string()),
            }
        );
    }

    #[test]
    fn test_marked_columns() {
        let input: DeriveInput = parse_quote! {
            #[table(name = "audit_log")]
            struct Entry {
                #[primary_key]
                entry_id: String,
                #[created_at]
                logged_at: String,
                #[soft_delete]
                removed_at: Option<String>,
            }
        };
        let info = parse_model(&input).unwrap();

        assert_eq!(info.primary_key, "entry_id");
        assert_eq!(info.soft_delete_column, "removed_at");
        assert_eq!(info.created_at_column.as_deref(), Some("logged_at"));
        assert_eq!(info.updated_at_column, None);
    }

    #[test]
    fn test_missing_table_attribute() {
        let input: DeriveInput = parse_quote! {
            struct User {
                id: i64,
                deleted_at: Option<String>,
            }
        };
        let err = parse_model(&input).unwrap_err();
        assert!(err.to_string().contains("table attribute is required"));
    }

    #[test]
    fn test_missing_soft_delete_column() {
        let input: DeriveInput = parse_quote! {
            #[table(name = "users")]
            struct User {
                id: i64,
            }
        };
        let err = parse_model(&input).unwrap_err();
        assert!(err.to_string().contains("soft-delete column"));
    }

    #[test]
    fn test_duplicate_primary_key() {
        let input: DeriveInput = parse_quote! {
            #[table(name = "users")]
            struct User {
                #[primary_key]
                id: i64,
                #[primary_key]
                other: i64,
                deleted_at: Option<String>,
            }
        };
        assert!(parse_model(&input).is_err());
    }
}
