//! Schema command implementation.

use super::{build_mapper, to_json, OutputFormat};
use crate::error::CliResult;
use docmap_core::{EntityDescriptor, FieldKind};
use docmap_store::InMemoryStore;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// A resolved type.
#[derive(Debug, Serialize)]
pub struct TypeReport {
    /// Type name.
    pub name: String,
    /// Collection name; `None` for embeddables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Identity field name; `None` for embeddables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    /// Fields in document order.
    pub fields: Vec<FieldReport>,
}

/// A resolved field.
#[derive(Debug, Serialize)]
pub struct FieldReport {
    /// Field name.
    pub name: String,
    /// Document key.
    pub key: String,
    /// Field kind.
    #[serde(flatten)]
    pub kind: FieldKind,
    /// Whether the field must be present.
    pub required: bool,
}

impl From<&EntityDescriptor> for TypeReport {
    fn from(descriptor: &EntityDescriptor) -> Self {
        let embeddable = descriptor.is_embeddable();
        Self {
            name: descriptor.type_name().to_string(),
            collection: (!embeddable).then(|| descriptor.collection().to_string()),
            identity: descriptor.identity().map(|field| field.name().to_string()),
            fields: descriptor
                .fields()
                .iter()
                .map(|field| FieldReport {
                    name: field.name().to_string(),
                    key: field.key().to_string(),
                    kind: field.kind().clone(),
                    required: field.is_required(),
                })
                .collect(),
        }
    }
}

/// Resolves every type in the schema file, sorted by name.
pub fn describe(schema: &Path) -> CliResult<Vec<TypeReport>> {
    let mapper = build_mapper(schema, Arc::new(InMemoryStore::new()))?;
    let registry = mapper.registry();
    registry
        .type_names()
        .into_iter()
        .map(|name| -> CliResult<TypeReport> { Ok(TypeReport::from(registry.describe(name)?)) })
        .collect()
}

fn kind_label(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Scalar(ty) => ty.to_string(),
        FieldKind::EmbeddedList(ty) => format!("[{ty}]"),
        FieldKind::EmbeddedEntity(ty) => ty.clone(),
    }
}

/// Runs the schema command.
pub fn run(schema: &Path, format: OutputFormat) -> CliResult<()> {
    let types = describe(schema)?;
    match format {
        OutputFormat::Json => println!("{}", to_json(&types)),
        OutputFormat::Text => {
            for ty in &types {
                match (&ty.collection, &ty.identity) {
                    (Some(collection), Some(identity)) => {
                        println!("{} -> {collection} (identity: {identity})", ty.name)
                    }
                    _ => println!("{} (embeddable)", ty.name),
                }
                for field in &ty.fields {
                    let optional = if field.required { "" } else { "?" };
                    println!(
                        "  {:<16} {:<16} {}{optional}",
                        field.name,
                        field.key,
                        kind_label(&field.kind)
                    );
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmap_core::ScalarType;
    use docmap_testkit::FixtureFiles;

    #[test]
    fn describes_every_type() {
        let files = FixtureFiles::sample();
        let types = describe(&files.schema_path()).unwrap();

        let names: Vec<_> = types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Address", "Component", "Dimensions", "Item", "Order", "Part", "Shipment"]
        );

        let order = types.iter().find(|t| t.name == "Order").unwrap();
        assert_eq!(order.collection.as_deref(), Some("ORDER"));
        assert_eq!(order.identity.as_deref(), Some("id"));
        assert_eq!(order.fields[0].key, "_id");
        assert_eq!(order.fields[2].kind, FieldKind::EmbeddedList("Item".to_string()));

        let item = types.iter().find(|t| t.name == "Item").unwrap();
        assert!(item.collection.is_none());
        assert_eq!(item.fields[0].kind, FieldKind::Scalar(ScalarType::Integer));
    }

    #[test]
    fn json_report_flattens_kinds() {
        let files = FixtureFiles::sample();
        let json = to_json(&describe(&files.schema_path()).unwrap());
        assert!(json.contains(r#""embedded_list": "Item""#));
        assert!(json.contains(r#""scalar": "float""#));
    }

    #[test]
    fn labels() {
        assert_eq!(kind_label(&FieldKind::Scalar(ScalarType::Text)), "text");
        assert_eq!(kind_label(&FieldKind::EmbeddedList("Item".into())), "[Item]");
    }
}
