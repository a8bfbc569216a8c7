//! Resolves parsed statements against the registry.
//!
//! Every alias is bound to a position in the document: the type it ranges
//! over, the document keys leading to it, and whether an embedded list has
//! been crossed on the way. Comparison paths are resolved from their alias
//! and flattened into dotted document paths, so a join over `o.items`
//! followed by `i.quantity` becomes `ITEMS.QUANTITY`.
//!
//! A join alias over an embedded list names one element of it. When two or
//! more conditions use the same such alias they are folded into one
//! element match on the list, so `i.quantity = 2 AND i.price = 1` needs a
//! single item with both values. A lone condition stays a dotted path.
//!
//! Dotted paths only reach one field past an embedded list, so anything
//! deeper is rejected here with [`CoreError::UnsupportedPath`] instead of
//! producing a filter that would silently match the wrong documents.

use super::ast::{comparable, CompiledQuery, DocumentPath, Operand, Predicate};
use super::syntax::{OperandExpr, PathExpr, SelectStatement};
use crate::error::{CoreError, CoreResult};
use crate::metadata::{FieldKind, Registry, ScalarType};
use std::collections::HashMap;
use tracing::trace;

#[derive(Debug, Clone)]
struct Position {
    type_name: String,
    keys: Vec<String>,
    /// Set once an embedded list has been crossed.
    in_list: bool,
    /// Segments resolved since crossing the list.
    past_list: usize,
    /// Set on a join alias that ranges over the elements of a list.
    binds_element: bool,
}

struct Resolved {
    position: Position,
    kind: FieldKind,
}

/// Compiles a statement; `source` is kept on the result for messages and caching.
pub(crate) fn compile(
    statement: &SelectStatement,
    source: String,
    registry: &Registry,
) -> CoreResult<CompiledQuery> {
    let descriptor = registry.describe(&statement.entity)?;
    if descriptor.is_embeddable() {
        return Err(CoreError::invalid_query(
            statement.entity_offset,
            format!("{} is embeddable and cannot be queried directly", statement.entity),
        ));
    }
    if statement.selected != statement.root_alias {
        return Err(CoreError::invalid_query(
            statement.selected_offset,
            format!(
                "only the root alias {} can be selected",
                statement.root_alias
            ),
        ));
    }

    let mut aliases = HashMap::new();
    aliases.insert(
        statement.root_alias.clone(),
        Position {
            type_name: descriptor.type_name().to_string(),
            keys: Vec::new(),
            in_list: false,
            past_list: 0,
            binds_element: false,
        },
    );

    for join in &statement.joins {
        if join.source.fields.is_empty() {
            return Err(CoreError::invalid_query(
                join.source.offset,
                "JOIN needs a field path such as o.items",
            ));
        }
        let resolved = resolve(registry, &aliases, &join.source)?;
        if matches!(resolved.kind, FieldKind::Scalar(_)) {
            return Err(CoreError::invalid_query(
                join.source.offset,
                format!("JOIN target {} is not an embedded field", join.source),
            ));
        }
        if aliases.contains_key(&join.alias) {
            return Err(CoreError::invalid_query(
                join.offset,
                format!("alias {} is already defined", join.alias),
            ));
        }
        let mut position = resolved.position;
        position.binds_element = matches!(resolved.kind, FieldKind::EmbeddedList(_));
        aliases.insert(join.alias.clone(), position);
    }

    let mut comparisons = Vec::with_capacity(statement.conditions.len());
    for condition in &statement.conditions {
        if condition.path.fields.is_empty() {
            return Err(CoreError::invalid_query(
                condition.offset,
                format!("cannot compare alias {} itself; name a field", condition.path.alias),
            ));
        }
        let resolved = resolve(registry, &aliases, &condition.path)?;
        let FieldKind::Scalar(field_type) = resolved.kind else {
            return Err(CoreError::invalid_query(
                condition.offset,
                format!("{} is not a scalar field", condition.path),
            ));
        };
        let operand = match &condition.operand {
            OperandExpr::Literal(value) => {
                if !comparable(value, field_type) {
                    return Err(CoreError::invalid_query(
                        condition.offset,
                        format!(
                            "cannot compare {} ({field_type}) with {}",
                            condition.path,
                            value.kind()
                        ),
                    ));
                }
                Operand::Literal(value.clone())
            }
            OperandExpr::Parameter(name) => Operand::Parameter(name.clone()),
        };
        let element = aliases
            .get(&condition.path.alias)
            .filter(|alias| alias.binds_element)
            .map(|alias| (condition.path.alias.as_str(), alias.keys.len()));
        comparisons.push(Comparison {
            element,
            keys: resolved.position.keys,
            field_type,
            operand,
        });
    }

    let predicate = conjoin(comparisons);

    trace!(query = %source, ?predicate, "compiled query");
    Ok(CompiledQuery {
        source,
        entity_type: descriptor.type_name().to_string(),
        collection: descriptor.collection().to_string(),
        predicate,
    })
}

/// A resolved condition before conditions are grouped.
struct Comparison<'s> {
    /// The list-element alias the condition goes through, with the number of
    /// keys leading to its list.
    element: Option<(&'s str, usize)>,
    keys: Vec<String>,
    field_type: ScalarType,
    operand: Operand,
}

impl Comparison<'_> {
    /// Builds the comparison with its first `skip` keys dropped.
    fn into_predicate(self, skip: usize) -> Predicate {
        Predicate::Eq {
            path: DocumentPath::new(self.keys.into_iter().skip(skip).collect()),
            field_type: self.field_type,
            operand: self.operand,
        }
    }
}

enum Slot {
    Single(Predicate),
    Element(DocumentPath, Vec<Predicate>),
}

/// Conjoins comparisons in query order. Comparisons sharing a list-element
/// alias become one [`Predicate::ElemMatch`] at the place of the first.
fn conjoin(comparisons: Vec<Comparison<'_>>) -> Option<Predicate> {
    let mut uses: HashMap<&str, usize> = HashMap::new();
    for (alias, _) in comparisons.iter().filter_map(|c| c.element) {
        *uses.entry(alias).or_default() += 1;
    }

    let mut slots = Vec::with_capacity(comparisons.len());
    let mut element_slots: HashMap<&str, usize> = HashMap::new();
    for comparison in comparisons {
        let shared = comparison
            .element
            .filter(|(alias, _)| uses.get(alias).copied().unwrap_or(0) > 1);
        let Some((alias, depth)) = shared else {
            slots.push(Slot::Single(comparison.into_predicate(0)));
            continue;
        };
        let index = *element_slots.entry(alias).or_insert_with(|| {
            let list = DocumentPath::new(comparison.keys[..depth].to_vec());
            slots.push(Slot::Element(list, Vec::new()));
            slots.len() - 1
        });
        if let Slot::Element(_, parts) = &mut slots[index] {
            parts.push(comparison.into_predicate(depth));
        }
    }

    let mut predicates: Vec<Predicate> = slots
        .into_iter()
        .map(|slot| match slot {
            Slot::Single(predicate) => predicate,
            Slot::Element(path, parts) => Predicate::ElemMatch {
                path,
                predicate: Box::new(Predicate::And(parts)),
            },
        })
        .collect();
    match predicates.len() {
        0 => None,
        1 => predicates.pop(),
        _ => Some(Predicate::And(predicates)),
    }
}

fn resolve(
    registry: &Registry,
    aliases: &HashMap<String, Position>,
    path: &PathExpr,
) -> CoreResult<Resolved> {
    let mut position = aliases.get(&path.alias).cloned().ok_or_else(|| {
        CoreError::invalid_query(path.offset, format!("unknown alias {}", path.alias))
    })?;
    let mut kind = None;

    for name in &path.fields {
        if let Some(FieldKind::Scalar(_)) = kind {
            return Err(CoreError::invalid_query(
                path.offset,
                format!("{path} navigates into a scalar field"),
            ));
        }
        let descriptor = registry.describe(&position.type_name)?;
        let field = descriptor.field(name).ok_or_else(|| CoreError::UnknownField {
            entity_type: position.type_name.clone(),
            field: name.clone(),
        })?;

        if position.in_list {
            position.past_list += 1;
            if position.past_list > 1 {
                return Err(CoreError::unsupported_path(
                    path.to_string(),
                    "only one field can follow an embedded list",
                ));
            }
        }
        match field.kind() {
            FieldKind::EmbeddedList(ty) => {
                if position.in_list {
                    return Err(CoreError::unsupported_path(
                        path.to_string(),
                        "embedded lists inside embedded lists are not supported",
                    ));
                }
                position.in_list = true;
                position.past_list = 0;
                position.type_name = ty.clone();
            }
            FieldKind::EmbeddedEntity(ty) => position.type_name = ty.clone(),
            FieldKind::Scalar(_) => {}
        }
        position.keys.push(field.key().to_string());
        kind = Some(field.kind().clone());
    }

    // Callers reject empty paths before resolving.
    let kind = kind.ok_or_else(|| CoreError::invalid_query(path.offset, "empty path"))?;
    Ok(Resolved { position, kind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{EntityDefinition, FieldDefinition, ScalarType};
    use crate::query::syntax::parse;
    use docmap_document::{Document, Value};
    use docmap_store::Filter;
    use crate::query::Bindings;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        for def in [
            EntityDefinition::entity("Order", "id")
                .field(FieldDefinition::scalar("id", ScalarType::Text))
                .field(FieldDefinition::scalar("customer", ScalarType::Text))
                .field(FieldDefinition::list("items", "Item"))
                .field(FieldDefinition::embedded("shipping", "Address").optional()),
            EntityDefinition::embeddable("Item")
                .field(FieldDefinition::scalar("quantity", ScalarType::Integer))
                .field(FieldDefinition::scalar("price", ScalarType::Float))
                .field(FieldDefinition::list("parts", "Part"))
                .field(FieldDefinition::embedded("origin", "Address").optional()),
            EntityDefinition::embeddable("Part")
                .field(FieldDefinition::scalar("serial", ScalarType::Text)),
            EntityDefinition::embeddable("Address")
                .field(FieldDefinition::scalar("city", ScalarType::Text)),
        ] {
            registry.register(def).unwrap();
        }
        registry
    }

    fn compile_text(text: &str) -> CoreResult<CompiledQuery> {
        compile(&parse(text)?, text.to_string(), &registry())
    }

    fn filter_of(text: &str) -> Filter {
        compile_text(text).unwrap().to_filter(&Bindings::new()).unwrap()
    }

    #[test]
    fn join_path_flattens_to_dotted_key() {
        let q = compile_text("SELECT o FROM Order o JOIN o.items i WHERE i.quantity = 2").unwrap();

        assert_eq!(q.entity_type(), "Order");
        assert_eq!(q.collection(), "ORDER");
        assert_eq!(
            q.to_filter(&Bindings::new()).unwrap(),
            Filter::Native(Document::new().with("ITEMS.QUANTITY", 2))
        );
    }

    #[test]
    fn direct_navigation_matches_join() {
        assert_eq!(
            filter_of("SELECT o FROM Order o WHERE o.items.quantity = 2"),
            filter_of("SELECT o FROM Order o JOIN o.items i WHERE i.quantity = 2")
        );
    }

    #[test]
    fn embedded_entity_paths() {
        assert_eq!(
            filter_of("SELECT o FROM Order o WHERE o.shipping.city = 'Bonn'"),
            Filter::Native(Document::new().with("SHIPPING.CITY", "Bonn"))
        );
        assert_eq!(
            filter_of("SELECT o FROM Order o JOIN o.shipping s WHERE s.city = 'Bonn'"),
            Filter::Native(Document::new().with("SHIPPING.CITY", "Bonn"))
        );
    }

    #[test]
    fn identity_resolves_to_id_key() {
        assert_eq!(
            filter_of("SELECT o FROM Order o WHERE o.id = 'o-1'"),
            Filter::Native(Document::new().with("_id", "o-1"))
        );
    }

    #[test]
    fn no_where_selects_all() {
        assert_eq!(filter_of("SELECT o FROM Order o"), Filter::All);
    }

    #[test]
    fn repeated_conditions_are_conjoined() {
        let filter = filter_of(
            "SELECT o FROM Order o WHERE o.customer = 'a' AND o.customer = 'b'",
        );
        let Filter::Native(doc) = filter else {
            panic!("expected a native filter");
        };
        assert_eq!(doc.get("$and").and_then(Value::as_array).map(<[Value]>::len), Some(2));
    }

    #[test]
    fn conditions_on_one_element_alias_share_an_element() {
        let filter = filter_of(
            "SELECT o FROM Order o JOIN o.items i WHERE o.customer = 'x' AND i.quantity = 2 AND i.price = 47.11",
        );

        let element = Document::new().with(
            "$and",
            vec![
                Value::from(Document::new().with("QUANTITY", 2)),
                Value::from(Document::new().with("PRICE", 47.11)),
            ],
        );
        let expected = Document::new().with(
            "$and",
            vec![
                Value::from(Document::new().with("CUSTOMER", "x")),
                Value::from(
                    Document::new().with("ITEMS", Document::new().with("$elemMatch", element)),
                ),
            ],
        );
        assert_eq!(filter, Filter::Native(expected));
    }

    #[test]
    fn separate_aliases_match_any_element() {
        let filter = filter_of(
            "SELECT o FROM Order o JOIN o.items a JOIN o.items b WHERE a.quantity = 2 AND b.price = 47.11",
        );
        let expected = Document::new().with(
            "$and",
            vec![
                Value::from(Document::new().with("ITEMS.QUANTITY", 2)),
                Value::from(Document::new().with("ITEMS.PRICE", 47.11)),
            ],
        );
        assert_eq!(filter, Filter::Native(expected));

        // Navigation without a join names no element.
        let Filter::Native(doc) = filter_of(
            "SELECT o FROM Order o WHERE o.items.quantity = 2 AND o.items.price = 47.11",
        ) else {
            panic!("expected a native filter");
        };
        assert!(doc.contains_key("$and"));
    }

    #[test]
    fn unknown_field_and_type() {
        assert!(matches!(
            compile_text("SELECT o FROM Order o JOIN o.items i WHERE i.weight = 2"),
            Err(CoreError::UnknownField { ref entity_type, ref field }) if entity_type == "Item" && field == "weight"
        ));
        assert!(matches!(
            compile_text("SELECT o FROM Invoice o"),
            Err(CoreError::UnknownType { .. })
        ));
    }

    #[test]
    fn nested_list_paths_are_unsupported() {
        assert!(matches!(
            compile_text("SELECT o FROM Order o JOIN o.items i WHERE i.parts.serial = 'x'"),
            Err(CoreError::UnsupportedPath { .. })
        ));
        assert!(matches!(
            compile_text("SELECT o FROM Order o JOIN o.items i JOIN i.parts p WHERE p.serial = 'x'"),
            Err(CoreError::UnsupportedPath { .. })
        ));
        assert!(matches!(
            compile_text("SELECT o FROM Order o WHERE o.items.origin.city = 'x'"),
            Err(CoreError::UnsupportedPath { .. })
        ));
    }

    #[test]
    fn invalid_structure() {
        let cases = [
            "SELECT i FROM Order o JOIN o.items i",
            "SELECT o FROM Order o JOIN x.items i",
            "SELECT o FROM Order o JOIN o.customer c",
            "SELECT o FROM Order o JOIN o.items o",
            "SELECT o FROM Order o WHERE o.items = 2",
            "SELECT o FROM Order o WHERE o = 2",
            "SELECT o FROM Order o WHERE o.customer.name = 'x'",
            "SELECT o FROM Order o WHERE o.customer = 5",
            "SELECT o FROM Item o",
        ];
        for text in cases {
            assert!(
                matches!(compile_text(text), Err(CoreError::InvalidQuery { .. })),
                "{text}"
            );
        }
    }

    #[test]
    fn parameters_are_collected() {
        let q = compile_text(
            "SELECT o FROM Order o JOIN o.items i WHERE o.customer = :c AND i.quantity = :q",
        )
        .unwrap();
        assert_eq!(q.parameters(), vec!["c", "q"]);
        assert!(matches!(
            q.to_filter(&Bindings::new().with("c", "x")),
            Err(CoreError::UnboundParameter { .. })
        ));
    }
}
