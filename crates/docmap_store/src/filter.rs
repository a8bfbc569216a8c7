//! Native filter evaluation for the in-memory store.
//!
//! Supported filter forms:
//!
//! - `{key: value}` equality, where `key` may be a dotted path
//! - `{key: {$eq: value}}` and `{key: {$in: [values]}}`
//! - `{key: {$elemMatch: filter}}`, where one document element of the array
//!   at `key` must satisfy the whole of `filter`
//! - `{$and: [filters]}` and `{$or: [filters]}`
//!
//! Path segments that land on an array fan out over its elements, so
//! `ITEMS.QUANTITY` matches when any element of `ITEMS` has that quantity.
//! A missing field compares equal to `null`.

use crate::error::{StoreError, StoreResult};
use docmap_document::{Document, Value};

/// Returns true if `document` satisfies every clause of `filter`.
///
/// # Errors
///
/// Returns an error for unknown `$` operators or malformed operator operands.
pub fn matches_filter(document: &Document, filter: &Document) -> StoreResult<bool> {
    for (key, expected) in filter.iter() {
        let clause = match key {
            "$and" => {
                let mut all = true;
                for sub in sub_filters(key, expected)? {
                    if !matches_filter(document, sub)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for sub in sub_filters(key, expected)? {
                    if matches_filter(document, sub)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            op if op.starts_with('$') => return Err(StoreError::unsupported_operator(op)),
            path => {
                let condition = Condition::parse(expected)?;
                let mut segments = path.split('.');
                let head = segments.next().unwrap_or_default();
                let rest: Vec<&str> = segments.collect();
                path_matches(document.get(head), &rest, &condition)?
            }
        };
        if !clause {
            return Ok(false);
        }
    }
    Ok(true)
}

fn sub_filters<'f>(operator: &str, operand: &'f Value) -> StoreResult<Vec<&'f Document>> {
    let items = operand.as_array().ok_or_else(|| {
        StoreError::invalid_native_query(0, format!("{operator} expects an array of filters"))
    })?;
    items
        .iter()
        .map(|item| {
            item.as_document().ok_or_else(|| {
                StoreError::invalid_native_query(0, format!("{operator} expects filter documents"))
            })
        })
        .collect()
}

enum Condition<'f> {
    Eq(&'f Value),
    In(&'f [Value]),
    ElemMatch(&'f Document),
}

impl<'f> Condition<'f> {
    fn parse(expected: &'f Value) -> StoreResult<Self> {
        let Some(doc) = expected.as_document() else {
            return Ok(Condition::Eq(expected));
        };
        let mut entries = doc.iter();
        match (entries.next(), entries.next()) {
            (Some(("$eq", operand)), None) => Ok(Condition::Eq(operand)),
            (Some(("$in", operand)), None) => operand
                .as_array()
                .map(Condition::In)
                .ok_or_else(|| StoreError::invalid_native_query(0, "$in expects an array")),
            (Some(("$elemMatch", operand)), None) => operand
                .as_document()
                .map(Condition::ElemMatch)
                .ok_or_else(|| {
                    StoreError::invalid_native_query(0, "$elemMatch expects a filter document")
                }),
            (Some((op, _)), _) if op.starts_with('$') => Err(StoreError::unsupported_operator(op)),
            // A plain sub-document compares structurally.
            _ => Ok(Condition::Eq(expected)),
        }
    }

    fn accepts(&self, value: &Value) -> StoreResult<bool> {
        match self {
            Condition::Eq(expected) => Ok(value.matches(expected)),
            Condition::In(candidates) => Ok(candidates.iter().any(|c| value.matches(c))),
            Condition::ElemMatch(filter) => {
                let Value::Array(items) = value else {
                    return Ok(false);
                };
                for item in items {
                    if let Some(element) = item.as_document() {
                        if matches_filter(element, filter)? {
                            return Ok(true);
                        }
                    }
                }
                Ok(false)
            }
        }
    }

    fn accepts_missing(&self) -> StoreResult<bool> {
        self.accepts(&Value::Null)
    }
}

fn path_matches(
    value: Option<&Value>,
    segments: &[&str],
    condition: &Condition<'_>,
) -> StoreResult<bool> {
    let Some(value) = value else {
        return condition.accepts_missing();
    };
    match segments.split_first() {
        None => match value {
            Value::Array(items) if !matches!(condition, Condition::ElemMatch(_)) => {
                if condition.accepts(value)? {
                    return Ok(true);
                }
                for item in items {
                    if condition.accepts(item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            _ => condition.accepts(value),
        },
        Some((head, rest)) => match value {
            Value::Document(doc) => path_matches(doc.get(head), rest, condition),
            Value::Array(items) => {
                for item in items.iter().filter(|item| item.as_document().is_some()) {
                    if path_matches(Some(item), segments, condition)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            _ => Ok(false),
        },
    }
}
