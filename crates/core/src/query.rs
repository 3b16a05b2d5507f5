//! Filter and find-config query model.
//!
//! A [`Filter`] says *which* rows match; a [`FindConfig`] says how many, in what
//! order, and with which fields and relations. Backends translate both: the
//! in-memory stores evaluate filters against the JSON form of an entity, the
//! SQL backend turns them into `WHERE` clauses.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::entity::EntitySchema;
use crate::error::RepositoryError;
use crate::projection::Projection;

/// Predicate applied to a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Eq(JsonValue),
    Ne(JsonValue),
    In(Vec<JsonValue>),
    Gt(JsonValue),
    Lt(JsonValue),
    /// SQL `LIKE` pattern (`%` any run, `_` any single character).
    Like(String),
    IsNull,
    NotNull,
}

impl FilterValue {
    /// Evaluate the predicate against a field value (`Null` when absent).
    pub fn matches(&self, actual: &JsonValue) -> bool {
        match self {
            FilterValue::Eq(expected) => values_equal(actual, expected),
            FilterValue::Ne(expected) => !values_equal(actual, expected),
            FilterValue::In(candidates) => candidates.iter().any(|c| values_equal(actual, c)),
            FilterValue::Gt(bound) => compare_to_bound(actual, bound) == Some(Ordering::Greater),
            FilterValue::Lt(bound) => compare_to_bound(actual, bound) == Some(Ordering::Less),
            FilterValue::Like(pattern) => match actual {
                JsonValue::String(s) => {
                    let pattern: Vec<char> = pattern.chars().collect();
                    let text: Vec<char> = s.chars().collect();
                    like_matches(&pattern, &text)
                }
                _ => false,
            },
            FilterValue::IsNull => actual.is_null(),
            FilterValue::NotNull => !actual.is_null(),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Eq(JsonValue::from(value))
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Eq(JsonValue::from(value))
    }
}

/// Mapping from field name to predicate. All predicates must hold (AND).
///
/// An empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: BTreeMap<String, FilterValue>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `{ id: <id> }`.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().eq("id", id.into())
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.with(field, FilterValue::Eq(value.into()))
    }

    pub fn with(mut self, field: impl Into<String>, value: FilterValue) -> Self {
        self.conditions.insert(field.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.conditions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Evaluate against a JSON object (the serialized form of an entity).
    pub fn matches(&self, record: &JsonValue) -> bool {
        self.conditions.iter().all(|(field, cond)| {
            let actual = record.get(field).unwrap_or(&JsonValue::Null);
            cond.matches(actual)
        })
    }

    /// Reject fields the entity does not have.
    pub fn validate(&self, schema: &EntitySchema) -> Result<(), RepositoryError> {
        for field in self.conditions.keys() {
            if !schema.has_column(field) {
                return Err(RepositoryError::UnknownField {
                    entity: schema.name,
                    field: field.clone(),
                });
            }
        }
        Ok(())
    }
}

impl<K: Into<String>> FromIterator<(K, FilterValue)> for Filter {
    fn from_iter<T: IntoIterator<Item = (K, FilterValue)>>(iter: T) -> Self {
        Self {
            conditions: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// Query options: paging, projection and eager relations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindConfig {
    /// Maximum number of rows; `None` is unbounded.
    pub take: Option<u64>,
    /// Rows to skip before taking.
    pub skip: Option<u64>,
    /// Explicit field projection. Dot paths (`product.title`) reach relations.
    pub select: Vec<String>,
    /// Relations to load eagerly. Dot paths (`product.tags`) nest.
    pub relations: Vec<String>,
    /// Explicit ordering. Without it, storage order is returned.
    pub order: Vec<OrderBy>,
}

impl FindConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn relations<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relations = relations.into_iter().map(Into::into).collect();
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Check order fields, selected fields and relations against `schema` and
    /// return the parsed projection.
    pub fn validate(&self, schema: &EntitySchema) -> Result<Projection, RepositoryError> {
        for order in &self.order {
            if !schema.has_column(&order.field) {
                return Err(RepositoryError::UnknownField {
                    entity: schema.name,
                    field: order.field.clone(),
                });
            }
        }
        let projection = Projection::from_config(self);
        projection.validate(schema)?;
        Ok(projection)
    }

    /// Apply `order`, `skip` and `take` to already-filtered rows.
    ///
    /// `key` extracts the JSON form used for ordering comparisons.
    pub fn paginate<T>(&self, mut rows: Vec<T>, key: impl Fn(&T) -> JsonValue) -> Vec<T> {
        if !self.order.is_empty() {
            rows.sort_by(|a, b| {
                let (a, b) = (key(a), key(b));
                for order in &self.order {
                    let av = a.get(&order.field).unwrap_or(&JsonValue::Null);
                    let bv = b.get(&order.field).unwrap_or(&JsonValue::Null);
                    let ord = compare_values(av, bv);
                    let ord = match order.direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let skip = self.skip.map_or(0, |s| usize::try_from(s).unwrap_or(usize::MAX));
        let take = self.take.map_or(usize::MAX, |t| usize::try_from(t).unwrap_or(usize::MAX));
        rows.into_iter().skip(skip).take(take).collect()
    }
}

/// Equality with numeric coercion when either side is a JSON number.
///
/// Decimals are stored string-encoded (`"10"`), so a numeric filter value has
/// to compare equal to its string form.
pub fn values_equal(actual: &JsonValue, expected: &JsonValue) -> bool {
    if actual == expected {
        return true;
    }
    if actual.is_number() || expected.is_number() {
        if let (Some(a), Some(b)) = (as_number(actual), as_number(expected)) {
            return a == b;
        }
    }
    false
}

/// Total order over JSON values, used for sorting.
///
/// Values of different kinds order by kind: booleans, numbers, strings,
/// arrays, objects, then `null` last (like `NULLS LAST` for ascending order).
/// Numbers compare with [`f64::total_cmp`] and strings compare bytewise, so
/// `"10" < "9"`. Columns that should sort numerically must be converted to
/// JSON numbers before they get here.
pub fn compare_values(a: &JsonValue, b: &JsonValue) -> Ordering {
    match (a, b) {
        (JsonValue::Bool(a), JsonValue::Bool(b)) => a.cmp(b),
        (JsonValue::Number(a), JsonValue::Number(b)) => {
            let (a, b) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
            a.total_cmp(&b)
        }
        (JsonValue::String(a), JsonValue::String(b)) => a.cmp(b),
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

fn kind_rank(v: &JsonValue) -> u8 {
    match v {
        JsonValue::Bool(_) => 0,
        JsonValue::Number(_) => 1,
        JsonValue::String(_) => 2,
        JsonValue::Array(_) => 3,
        JsonValue::Object(_) => 4,
        JsonValue::Null => 5,
    }
}

/// Compare a stored value against a `Gt`/`Lt` bound.
///
/// The stored value decides the comparison: a number column coerces the bound
/// to a number, a text column compares against the bound's text form. `null`
/// on either side is never greater or less than anything.
fn compare_to_bound(actual: &JsonValue, bound: &JsonValue) -> Option<Ordering> {
    match (actual, bound) {
        (JsonValue::Null, _) | (_, JsonValue::Null) => None,
        (JsonValue::Number(_), _) => Some(as_number(actual)?.total_cmp(&as_number(bound)?)),
        (JsonValue::String(a), JsonValue::Number(n)) => Some(a.as_str().cmp(n.to_string().as_str())),
        (JsonValue::String(a), JsonValue::Bool(b)) => Some(a.as_str().cmp(&b.to_string())),
        _ if kind_rank(actual) == kind_rank(bound) => Some(compare_values(actual, bound)),
        _ => None,
    }
}

fn as_number(v: &JsonValue) -> Option<f64> {
    match v {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn like_matches(pattern: &[char], text: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some(('%', rest)) => (0..=text.len()).any(|i| like_matches(rest, &text[i..])),
        Some(('_', rest)) => !text.is_empty() && like_matches(rest, &text[1..]),
        Some((c, rest)) => text.first() == Some(c) && like_matches(rest, &text[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static VARIANT: EntitySchema = EntitySchema {
        name: "Variant",
        table: "variant",
        columns: &["id", "title", "inventory_quantity"],
        relations: &[],
    };

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::new().matches(&json!({"id": "a"})));
        assert!(Filter::new().matches(&json!({})));
    }

    #[test]
    fn numeric_filter_matches_string_encoded_decimal() {
        let filter = Filter::new().eq("inventory_quantity", 10);
        assert!(filter.matches(&json!({"inventory_quantity": "10"})));
        assert!(!filter.matches(&json!({"inventory_quantity": "11"})));
    }

    #[test]
    fn string_ids_do_not_coerce_numerically() {
        let filter = Filter::by_id("01");
        assert!(!filter.matches(&json!({"id": "1"})));
    }

    #[test]
    fn in_gt_lt_and_null_predicates() {
        let row = json!({"id": "b", "inventory_quantity": 5, "title": null});
        assert!(FilterValue::In(vec![json!("a"), json!("b")]).matches(&row["id"]));
        assert!(FilterValue::Gt(json!(4)).matches(&row["inventory_quantity"]));
        assert!(FilterValue::Gt(json!("4.5")).matches(&row["inventory_quantity"]));
        assert!(!FilterValue::Lt(json!(5)).matches(&row["inventory_quantity"]));
        assert!(!FilterValue::Gt(json!("a")).matches(&row["title"]));
        assert!(FilterValue::IsNull.matches(&row["title"]));
        assert!(FilterValue::NotNull.matches(&row["id"]));
    }

    #[test]
    fn gt_and_lt_on_text_compare_lexically() {
        let title = json!("9");
        assert!(FilterValue::Gt(json!("10")).matches(&title));
        assert!(FilterValue::Gt(json!(10)).matches(&title));
        assert!(FilterValue::Lt(json!("9a")).matches(&title));
    }

    #[test]
    fn ordering_mixes_numeric_and_alphanumeric_titles() {
        let titles = ["9", "10", "5x", "3XL", "2 pack", "XL", "nan", "", "1e3", "S"];
        let rows: Vec<JsonValue> = titles.iter().map(|t| json!({"title": t})).collect();
        let out = FindConfig::new()
            .order_by("title", SortDirection::Asc)
            .paginate(rows, |r| r.clone());
        let sorted: Vec<&str> = out.iter().map(|r| r["title"].as_str().unwrap()).collect();
        assert_eq!(sorted, ["", "10", "1e3", "2 pack", "3XL", "5x", "9", "S", "XL", "nan"]);
    }

    #[test]
    fn nulls_sort_last_ascending_and_first_descending() {
        let rows = vec![json!({"n": null}), json!({"n": 2}), json!({"n": 1})];
        let asc = FindConfig::new()
            .order_by("n", SortDirection::Asc)
            .paginate(rows.clone(), |r| r.clone());
        assert_eq!(asc, vec![json!({"n": 1}), json!({"n": 2}), json!({"n": null})]);
        let desc = FindConfig::new()
            .order_by("n", SortDirection::Desc)
            .paginate(rows, |r| r.clone());
        assert_eq!(desc, vec![json!({"n": null}), json!({"n": 2}), json!({"n": 1})]);
    }

    #[test]
    fn skip_and_take_beyond_usize_do_not_overflow() {
        let out = FindConfig::new()
            .skip(u64::MAX)
            .take(u64::MAX)
            .paginate(vec![1, 2], |n| json!({"n": n}));
        assert!(out.is_empty());
    }

    #[test]
    fn like_supports_percent_and_underscore() {
        let title = json!("variant 1");
        assert!(FilterValue::Like("variant%".into()).matches(&title));
        assert!(FilterValue::Like("%ant _".into()).matches(&title));
        assert!(!FilterValue::Like("variant".into()).matches(&title));
    }

    #[test]
    fn validate_rejects_unknown_filter_field() {
        let err = Filter::new().eq("colour", "red").validate(&VARIANT).unwrap_err();
        assert!(matches!(err, RepositoryError::UnknownField { field, .. } if field == "colour"));
    }

    #[test]
    fn validate_rejects_unknown_order_field() {
        let err = FindConfig::new()
            .order_by("rank", SortDirection::Asc)
            .validate(&VARIANT)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UnknownField { .. }));
    }

    #[test]
    fn paginate_orders_skips_and_takes() {
        let rows = vec![json!({"id": "a", "n": 3}), json!({"id": "b", "n": 1}), json!({"id": "c", "n": 2})];
        let config = FindConfig::new().order_by("n", SortDirection::Desc).skip(1).take(1);
        let out = config.paginate(rows, |r| r.clone());
        assert_eq!(out, vec![json!({"id": "c", "n": 2})]);
    }

    #[test]
    fn paginate_without_order_keeps_storage_order() {
        let rows = vec![1, 2, 3];
        let out = FindConfig::new().take(2).paginate(rows, |n| json!({"n": n}));
        assert_eq!(out, vec![1, 2]);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: `take` caps cardinality and never errors on fewer rows.
            #[test]
            fn take_caps_cardinality(len in 0usize..50, take in 0u64..60) {
                let rows: Vec<usize> = (0..len).collect();
                let out = FindConfig::new().take(take).paginate(rows, |n| json!({"n": n}));
                prop_assert_eq!(out.len(), len.min(take as usize));
            }

            /// Property: `compare_values` is a total order over mixed scalars.
            #[test]
            fn compare_values_is_a_total_order((a, b, c) in (scalar(), scalar(), scalar())) {
                let (a, b, c) = (&a, &b, &c);
                prop_assert_eq!(compare_values(a, b), compare_values(b, a).reverse());
                if compare_values(a, b) != Ordering::Greater && compare_values(b, c) != Ordering::Greater {
                    prop_assert_ne!(compare_values(a, c), Ordering::Greater);
                }
            }

            /// Property: sorting arbitrary titles never panics and yields sorted output.
            #[test]
            fn sorting_mixed_titles_is_ordered(titles in prop::collection::vec("[0-9a-zA-Z .]{0,4}", 0..40)) {
                let rows: Vec<JsonValue> = titles.iter().map(|t| json!({"title": t})).collect();
                let out = FindConfig::new()
                    .order_by("title", SortDirection::Asc)
                    .paginate(rows, |r| r.clone());
                for pair in out.windows(2) {
                    prop_assert!(pair[0]["title"].as_str() <= pair[1]["title"].as_str());
                }
            }
        }

        fn scalar() -> impl Strategy<Value = JsonValue> {
            prop_oneof![
                Just(JsonValue::Null),
                any::<bool>().prop_map(JsonValue::from),
                (-1000i64..1000).prop_map(JsonValue::from),
                (-1000.0f64..1000.0).prop_map(JsonValue::from),
                "[0-9a-z .]{0,4}".prop_map(JsonValue::from),
            ]
        }
    }
}
