//! Postgres SELECT builder and filter translation.
//!
//! Identifiers only ever come from static entity schemas, and every value is
//! bound as a text parameter. Non-text columns get an explicit cast on the
//! placeholder (`$1::numeric`).

use serde_json::Value as JsonValue;

use storefront_core::{EntitySchema, Filter, FilterValue, FindConfig, RepositoryError, SortDirection};

/// Cast applied to a bound text parameter for a given column.
pub fn column_cast(column: &str) -> Option<&'static str> {
    match column {
        "inventory_quantity" => Some("numeric"),
        "created_at" | "updated_at" => Some("timestamptz"),
        _ => None,
    }
}

/// `"alias"."column"`
pub fn qualified(alias: &str, column: &str) -> String {
    format!("{}.{}", quote(alias), quote(column))
}

pub fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    /// `col <op> $n[::cast]`
    Compare {
        column: String,
        op: &'static str,
        value: String,
        cast: Option<&'static str>,
    },
    In {
        column: String,
        values: Vec<String>,
        cast: Option<&'static str>,
        or_null: bool,
    },
    Like {
        column: String,
        pattern: String,
    },
    IsNull(String),
    IsNotNull(String),
    /// Predicate that can never hold (e.g. `IN ()`).
    Never,
}

#[derive(Debug, Clone)]
pub struct SelectBuilder {
    table: &'static str,
    alias: &'static str,
    columns: Vec<String>,
    joins: Vec<String>,
    conditions: Vec<Condition>,
    order: Vec<(String, SortDirection)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectBuilder {
    pub fn new(table: &'static str, alias: &'static str) -> Self {
        Self {
            table,
            alias,
            columns: Vec::new(),
            joins: Vec::new(),
            conditions: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Select every column of `schema` from `alias`, each as `<prefix><column>`.
    pub fn columns_of(mut self, alias: &str, schema: &EntitySchema, prefix: &str) -> Self {
        for column in schema.columns {
            let expr = qualified(alias, column);
            if prefix.is_empty() {
                self.columns.push(expr);
            } else {
                self.columns
                    .push(format!("{expr} AS {}", quote(&format!("{prefix}{column}"))));
            }
        }
        self
    }

    /// `LEFT JOIN "<table>" AS "<alias>" ON "<alias>"."id" = "<self>"."<fk>"`
    pub fn left_join(mut self, table: &str, alias: &str, foreign_key: &str) -> Self {
        self.joins.push(format!(
            "LEFT JOIN {} AS {} ON {} = {}",
            quote(table),
            quote(alias),
            qualified(alias, "id"),
            qualified(self.alias, foreign_key)
        ));
        self
    }

    /// AND every predicate of `filter` onto the root table.
    ///
    /// Semantics follow [`FilterValue::matches`]: `Eq(null)` is `IS NULL`,
    /// `Ne` is null-aware, comparisons against null never hold.
    pub fn filter(mut self, filter: &Filter) -> Result<Self, RepositoryError> {
        for (field, predicate) in filter.iter() {
            let column = qualified(self.alias, field);
            let cast = column_cast(field);
            let condition = match predicate {
                FilterValue::Eq(JsonValue::Null) => Condition::IsNull(column),
                FilterValue::Ne(JsonValue::Null) => Condition::IsNotNull(column),
                FilterValue::Eq(v) => Condition::Compare {
                    column,
                    op: "=",
                    value: bind_text(field, v)?,
                    cast,
                },
                FilterValue::Ne(v) => Condition::Compare {
                    column,
                    op: "IS DISTINCT FROM",
                    value: bind_text(field, v)?,
                    cast,
                },
                FilterValue::Gt(JsonValue::Null) | FilterValue::Lt(JsonValue::Null) => Condition::Never,
                FilterValue::Gt(v) => Condition::Compare {
                    column,
                    op: ">",
                    value: bind_text(field, v)?,
                    cast,
                },
                FilterValue::Lt(v) => Condition::Compare {
                    column,
                    op: "<",
                    value: bind_text(field, v)?,
                    cast,
                },
                FilterValue::In(candidates) => {
                    let or_null = candidates.iter().any(JsonValue::is_null);
                    let values = candidates
                        .iter()
                        .filter(|v| !v.is_null())
                        .map(|v| bind_text(field, v))
                        .collect::<Result<Vec<_>, _>>()?;
                    match (values.is_empty(), or_null) {
                        (true, false) => Condition::Never,
                        (true, true) => Condition::IsNull(column),
                        _ => Condition::In {
                            column,
                            values,
                            cast,
                            or_null,
                        },
                    }
                }
                FilterValue::Like(pattern) => Condition::Like {
                    column,
                    pattern: pattern.clone(),
                },
                FilterValue::IsNull => Condition::IsNull(column),
                FilterValue::NotNull => Condition::IsNotNull(column),
            };
            self.conditions.push(condition);
        }
        Ok(self)
    }

    /// Apply ordering and paging from `config`. With no explicit order,
    /// `default_order` columns are used ascending.
    ///
    /// `LIMIT`/`OFFSET` are `bigint` in Postgres, so larger values are clamped
    /// to `i64::MAX`.
    pub fn page(mut self, config: &FindConfig, default_order: &[&str]) -> Self {
        if config.order.is_empty() {
            for column in default_order {
                self.order.push((qualified(self.alias, column), SortDirection::Asc));
            }
        } else {
            for order in &config.order {
                self.order
                    .push((qualified(self.alias, &order.field), order.direction));
            }
        }
        self.limit = config.take.map(clamp_bigint);
        self.offset = config.skip.map(clamp_bigint);
        self
    }

    /// Build `SELECT ... FROM ... [JOIN] [WHERE] [ORDER BY] [LIMIT] [OFFSET]`.
    pub fn build_select(&self) -> (String, Vec<String>) {
        let columns = if self.columns.is_empty() {
            format!("{}.*", quote(self.alias))
        } else {
            self.columns.join(", ")
        };
        let mut sql = format!("SELECT {columns} FROM {}", self.from());
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        let params = self.append_where(&mut sql);
        self.append_order(&mut sql);
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        (sql, params)
    }

    /// Build `SELECT COUNT(*)` over the same filter, ignoring joins and paging.
    pub fn build_count(&self) -> (String, Vec<String>) {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.from());
        let params = self.append_where(&mut sql);
        (sql, params)
    }

    fn from(&self) -> String {
        format!("{} AS {}", quote(self.table), quote(self.alias))
    }

    fn append_where(&self, sql: &mut String) -> Vec<String> {
        let mut params = Vec::new();
        if self.conditions.is_empty() {
            return params;
        }

        let mut next = 1usize;
        let mut placeholder = |cast: Option<&str>| {
            let p = match cast {
                Some(cast) => format!("${next}::{cast}"),
                None => format!("${next}"),
            };
            next += 1;
            p
        };

        let clauses: Vec<String> = self
            .conditions
            .iter()
            .map(|condition| match condition {
                Condition::Compare {
                    column,
                    op,
                    value,
                    cast,
                } => {
                    params.push(value.clone());
                    format!("{column} {op} {}", placeholder(*cast))
                }
                Condition::In {
                    column,
                    values,
                    cast,
                    or_null,
                } => {
                    let list: Vec<String> = values
                        .iter()
                        .map(|v| {
                            params.push(v.clone());
                            placeholder(*cast)
                        })
                        .collect();
                    let clause = format!("{column} IN ({})", list.join(", "));
                    if *or_null {
                        format!("({clause} OR {column} IS NULL)")
                    } else {
                        clause
                    }
                }
                Condition::Like { column, pattern } => {
                    params.push(pattern.clone());
                    format!("{column}::text LIKE {}", placeholder(None))
                }
                Condition::IsNull(column) => format!("{column} IS NULL"),
                Condition::IsNotNull(column) => format!("{column} IS NOT NULL"),
                Condition::Never => "FALSE".to_string(),
            })
            .collect();

        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
        params
    }

    fn append_order(&self, sql: &mut String) {
        if self.order.is_empty() {
            return;
        }
        let clauses: Vec<String> = self
            .order
            .iter()
            .map(|(column, direction)| match direction {
                SortDirection::Asc => format!("{column} ASC"),
                SortDirection::Desc => format!("{column} DESC"),
            })
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&clauses.join(", "));
    }
}

fn clamp_bigint(n: u64) -> u64 {
    n.min(i64::MAX as u64)
}

fn bind_text(field: &str, value: &JsonValue) -> Result<String, RepositoryError> {
    match value {
        JsonValue::String(s) => Ok(s.clone()),
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::Bool(b) => Ok(b.to_string()),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => Err(RepositoryError::Query(
            format!("unsupported filter value for {field}: {value}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static ITEM: EntitySchema = EntitySchema {
        name: "Item",
        table: "item",
        columns: &["id", "title", "inventory_quantity"],
        relations: &[],
    };

    #[test]
    fn plain_select_with_limit() {
        let (sql, params) = SelectBuilder::new("item", "i")
            .columns_of("i", &ITEM, "")
            .page(&FindConfig::new().take(1), &[])
            .build_select();
        assert_eq!(
            sql,
            r#"SELECT "i"."id", "i"."title", "i"."inventory_quantity" FROM "item" AS "i" LIMIT 1"#
        );
        assert!(params.is_empty());
    }

    #[test]
    fn filters_number_placeholders_and_cast_numeric_columns() {
        let filter = Filter::by_id("test-1").eq("inventory_quantity", 10);
        let (sql, params) = SelectBuilder::new("item", "i")
            .filter(&filter)
            .unwrap()
            .build_select();
        assert_eq!(
            sql,
            r#"SELECT "i".* FROM "item" AS "i" WHERE "i"."id" = $1 AND "i"."inventory_quantity" = $2::numeric"#
        );
        assert_eq!(params, ["test-1", "10"]);
    }

    #[test]
    fn in_with_null_and_empty_in() {
        let filter = Filter::new()
            .with("id", FilterValue::In(vec![json!("a"), JsonValue::Null]))
            .with("title", FilterValue::In(vec![]));
        let (sql, params) = SelectBuilder::new("item", "i")
            .filter(&filter)
            .unwrap()
            .build_count();
        assert_eq!(
            sql,
            r#"SELECT COUNT(*) FROM "item" AS "i" WHERE ("i"."id" IN ($1) OR "i"."id" IS NULL) AND FALSE"#
        );
        assert_eq!(params, ["a"]);
    }

    #[test]
    fn null_aware_equality_and_like() {
        let filter = Filter::new()
            .with("id", FilterValue::Ne(json!("x")))
            .with("title", FilterValue::Like("variant%".into()));
        let (sql, params) = SelectBuilder::new("item", "i")
            .filter(&filter)
            .unwrap()
            .build_select();
        assert!(sql.ends_with(r#"WHERE "i"."id" IS DISTINCT FROM $1 AND "i"."title"::text LIKE $2"#));
        assert_eq!(params, ["x", "variant%"]);

        let (sql, _) = SelectBuilder::new("item", "i")
            .filter(&Filter::new().eq("title", JsonValue::Null))
            .unwrap()
            .build_select();
        assert!(sql.ends_with(r#"WHERE "i"."title" IS NULL"#));
    }

    #[test]
    fn join_order_and_offset() {
        let config = FindConfig::new()
            .order_by("title", SortDirection::Desc)
            .skip(5)
            .take(10);
        let (sql, _) = SelectBuilder::new("item", "i")
            .columns_of("i", &ITEM, "")
            .left_join("owner", "o", "owner_id")
            .page(&config, &["id"])
            .build_select();
        assert!(sql.contains(r#"LEFT JOIN "owner" AS "o" ON "o"."id" = "i"."owner_id""#));
        assert!(sql.ends_with(r#"ORDER BY "i"."title" DESC LIMIT 10 OFFSET 5"#));
    }

    #[test]
    fn paging_beyond_bigint_is_clamped() {
        let config = FindConfig::new().take(u64::MAX).skip(u64::MAX);
        let (sql, _) = SelectBuilder::new("item", "i").page(&config, &[]).build_select();
        assert_eq!(
            sql,
            r#"SELECT "i".* FROM "item" AS "i" LIMIT 9223372036854775807 OFFSET 9223372036854775807"#
        );

        let config = FindConfig::new().take(25).skip(50);
        let (sql, _) = SelectBuilder::new("item", "i").page(&config, &[]).build_select();
        assert!(sql.ends_with(" LIMIT 25 OFFSET 50"));
    }

    #[test]
    fn default_order_applies_without_explicit_order() {
        let (sql, _) = SelectBuilder::new("item", "i")
            .page(&FindConfig::new(), &["id"])
            .build_select();
        assert!(sql.ends_with(r#"ORDER BY "i"."id" ASC"#));
    }

    #[test]
    fn object_values_are_rejected() {
        let err = SelectBuilder::new("item", "i")
            .filter(&Filter::new().eq("title", json!({"nested": true})))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Query(_)));
    }

    #[test]
    fn prefixed_columns_are_aliased() {
        let (sql, _) = SelectBuilder::new("item", "i")
            .columns_of("o", &ITEM, "owner__")
            .build_select();
        assert!(sql.starts_with(r#"SELECT "o"."id" AS "owner__id""#));
    }
}
