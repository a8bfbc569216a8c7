//! Entity metadata registry.

use super::definition::EntityDefinition;
use super::descriptor::{EntityDescriptor, FieldKind, FieldMapping, ScalarType};
use super::keys::{KeyCase, KeyMapper};
use crate::error::{CoreError, CoreResult};
use docmap_store::ID_KEY;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Holds the descriptor of every registered type.
///
/// Types are registered once while the mapper is built; after that the
/// registry is read-only and shared by every session.
#[derive(Debug, Default)]
pub struct Registry {
    types: HashMap<String, EntityDescriptor>,
    key_case: KeyCase,
}

impl Registry {
    /// Creates an empty registry with upper-case keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry with the given default key case.
    #[must_use]
    pub fn with_key_case(key_case: KeyCase) -> Self {
        Self {
            types: HashMap::new(),
            key_case,
        }
    }

    /// Registers a definition using its own key case, or the registry default.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateRegistration`] if the type is already
    /// registered, or [`CoreError::InvalidDefinition`] if the definition is
    /// malformed.
    pub fn register(&mut self, definition: EntityDefinition) -> CoreResult<&EntityDescriptor> {
        let case = definition.key_case.unwrap_or(self.key_case);
        self.register_with_mapper(definition, &case)
    }

    /// Registers a definition, naming its collection and keys with `mapper`.
    ///
    /// Explicit collection and key overrides in the definition win over the mapper.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::register`].
    pub fn register_with_mapper(
        &mut self,
        definition: EntityDefinition,
        mapper: &dyn KeyMapper,
    ) -> CoreResult<&EntityDescriptor> {
        let descriptor = resolve(definition, mapper)?;
        let name = descriptor.type_name.clone();
        if self.types.contains_key(&name) {
            return Err(CoreError::DuplicateRegistration { type_name: name });
        }
        debug!(
            type_name = %name,
            collection = %descriptor.collection,
            fields = descriptor.fields.len(),
            embeddable = descriptor.is_embeddable(),
            "registered type"
        );
        Ok(self.types.entry(name).or_insert(descriptor))
    }

    /// Returns the descriptor for a type.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownType`] if the type is not registered.
    pub fn describe(&self, type_name: &str) -> CoreResult<&EntityDescriptor> {
        self.types
            .get(type_name)
            .ok_or_else(|| CoreError::unknown_type(type_name))
    }

    /// Returns the descriptor for a type that can be persisted on its own.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownType`] if the type is not registered, or
    /// [`CoreError::InvalidOperation`] if it is an embeddable.
    pub fn describe_entity(&self, type_name: &str) -> CoreResult<&EntityDescriptor> {
        let descriptor = self.describe(type_name)?;
        if descriptor.is_embeddable() {
            return Err(CoreError::invalid_operation(format!(
                "{type_name} is embeddable and has no collection of its own"
            )));
        }
        Ok(descriptor)
    }

    /// Checks if a type is registered.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Returns the registered type names, sorted.
    #[must_use]
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Checks that every embedded field names a registered type.
    ///
    /// Types may be registered in any order, so this runs once all of them are in.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDefinition`] naming the first dangling reference.
    pub fn validate(&self) -> CoreResult<()> {
        for name in self.type_names() {
            let descriptor = &self.types[name];
            for field in &descriptor.fields {
                if let Some(target) = field.kind.embedded_type() {
                    if !self.types.contains_key(target) {
                        return Err(CoreError::invalid_definition(
                            name,
                            format!("field {} embeds unregistered type {target}", field.name),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

fn resolve(definition: EntityDefinition, mapper: &dyn KeyMapper) -> CoreResult<EntityDescriptor> {
    let type_name = definition.name;
    if type_name.is_empty() {
        return Err(CoreError::invalid_definition("", "type name is empty"));
    }

    let mut names = HashSet::new();
    let mut keys = HashSet::new();
    let mut fields = Vec::with_capacity(definition.fields.len());
    let mut identity = None;

    for field in definition.fields {
        if field.name.is_empty() {
            return Err(CoreError::invalid_definition(&type_name, "field name is empty"));
        }
        if !names.insert(field.name.clone()) {
            return Err(CoreError::invalid_definition(
                &type_name,
                format!("field {} is declared twice", field.name),
            ));
        }

        let is_identity = definition.identity.as_deref() == Some(field.name.as_str());
        if is_identity {
            let valid = matches!(
                field.kind,
                FieldKind::Scalar(ScalarType::Text | ScalarType::Integer)
            );
            if !valid || !field.required {
                return Err(CoreError::invalid_definition(
                    &type_name,
                    format!(
                        "identity field {} must be a required text or integer scalar",
                        field.name
                    ),
                ));
            }
            identity = Some(fields.len());
        }

        let key = match field.key {
            Some(key) => key,
            None if is_identity => ID_KEY.to_string(),
            None => mapper.map_key(&field.name),
        };
        if key.is_empty() || key.contains('.') || key.starts_with('$') {
            return Err(CoreError::invalid_definition(
                &type_name,
                format!("field {} maps to invalid key {key:?}", field.name),
            ));
        }
        if !keys.insert(key.clone()) {
            return Err(CoreError::invalid_definition(
                &type_name,
                format!("field {} reuses document key {key}", field.name),
            ));
        }

        fields.push(FieldMapping {
            name: field.name,
            key,
            kind: field.kind,
            required: field.required,
        });
    }

    if let Some(declared) = &definition.identity {
        if identity.is_none() {
            return Err(CoreError::invalid_definition(
                &type_name,
                format!("identity field {declared} is not declared"),
            ));
        }
    }

    let collection = definition
        .collection
        .unwrap_or_else(|| mapper.map_key(&type_name));

    Ok(EntityDescriptor {
        type_name,
        collection,
        identity,
        fields,
    })
}
