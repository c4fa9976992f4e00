//! Directive Indexing
//!
//! Extracts per-type directive information from a parsed schema document.
//! Unexpected argument shapes never fail; they simply do not match.

use std::collections::{HashMap, HashSet};

use apollo_compiler::ast::{
    Definition, Directive, DirectiveList, Document, FieldDefinition, InputValueDefinition, Type,
    Value,
};
use apollo_compiler::Node;

/// Type name to every directive attached to the type or its members
pub type DirectiveMap = HashMap<String, Vec<Node<Directive>>>;

/// Type names having a non-null field with an `@auth` directive
pub type FieldAuthTypeSet = HashSet<String>;

/// Type name to the names of directives attached to the type or its members
pub type DirectiveNameMap = HashMap<String, HashSet<String>>;

pub const AUTH: &str = "auth";
pub const MODEL: &str = "model";
pub const PRIMARY_KEY: &str = "primaryKey";

/// Group directives under the name of the type definition they belong to
///
/// Directives on fields, field arguments, input fields and enum values count
/// towards their enclosing type. Type extensions merge into the entry of the
/// type they extend.
pub fn collect_directives_by_type(doc: &Document) -> DirectiveMap {
    let mut map = DirectiveMap::new();

    for definition in &doc.definitions {
        match definition {
            Definition::ObjectTypeDefinition(def) => {
                let entry = map.entry(def.name.to_string()).or_default();
                extend(entry, &def.directives);
                extend_fields(entry, &def.fields);
            }
            Definition::InterfaceTypeDefinition(def) => {
                let entry = map.entry(def.name.to_string()).or_default();
                extend(entry, &def.directives);
                extend_fields(entry, &def.fields);
            }
            Definition::InputObjectTypeDefinition(def) => {
                let entry = map.entry(def.name.to_string()).or_default();
                extend(entry, &def.directives);
                extend_inputs(entry, &def.fields);
            }
            Definition::EnumTypeDefinition(def) => {
                let entry = map.entry(def.name.to_string()).or_default();
                extend(entry, &def.directives);
                for value in &def.values {
                    extend(entry, &value.directives);
                }
            }
            Definition::UnionTypeDefinition(def) => {
                extend(map.entry(def.name.to_string()).or_default(), &def.directives);
            }
            Definition::ScalarTypeDefinition(def) => {
                extend(map.entry(def.name.to_string()).or_default(), &def.directives);
            }
            Definition::ObjectTypeExtension(def) => {
                let entry = map.entry(def.name.to_string()).or_default();
                extend(entry, &def.directives);
                extend_fields(entry, &def.fields);
            }
            Definition::InterfaceTypeExtension(def) => {
                let entry = map.entry(def.name.to_string()).or_default();
                extend(entry, &def.directives);
                extend_fields(entry, &def.fields);
            }
            Definition::InputObjectTypeExtension(def) => {
                let entry = map.entry(def.name.to_string()).or_default();
                extend(entry, &def.directives);
                extend_inputs(entry, &def.fields);
            }
            Definition::EnumTypeExtension(def) => {
                let entry = map.entry(def.name.to_string()).or_default();
                extend(entry, &def.directives);
                for value in &def.values {
                    extend(entry, &value.directives);
                }
            }
            Definition::UnionTypeExtension(def) => {
                extend(map.entry(def.name.to_string()).or_default(), &def.directives);
            }
            Definition::ScalarTypeExtension(def) => {
                extend(map.entry(def.name.to_string()).or_default(), &def.directives);
            }
            _ => {}
        }
    }

    map
}

fn extend(entry: &mut Vec<Node<Directive>>, directives: &DirectiveList) {
    entry.extend(directives.iter().cloned());
}

fn extend_fields(entry: &mut Vec<Node<Directive>>, fields: &[Node<FieldDefinition>]) {
    for field in fields {
        extend(entry, &field.directives);
        extend_inputs(entry, &field.arguments);
    }
}

fn extend_inputs(entry: &mut Vec<Node<Directive>>, inputs: &[Node<InputValueDefinition>]) {
    for input in inputs {
        extend(entry, &input.directives);
    }
}

/// Reduce [`collect_directives_by_type`] to directive names
pub fn directive_names_by_type(doc: &Document) -> DirectiveNameMap {
    collect_directives_by_type(doc)
        .into_iter()
        .map(|(type_name, directives)| {
            let names = directives.iter().map(|d| d.name.to_string()).collect();
            (type_name, names)
        })
        .collect()
}

/// Types with at least one non-null field carrying `@auth`
///
/// Nullable fields with `@auth` do not count.
pub fn has_field_auth_directives(doc: &Document) -> FieldAuthTypeSet {
    let mut types = FieldAuthTypeSet::new();

    for definition in &doc.definitions {
        let qualifies = match definition {
            Definition::ObjectTypeDefinition(def) => any_auth_field(&def.fields),
            Definition::InterfaceTypeDefinition(def) => any_auth_field(&def.fields),
            Definition::InputObjectTypeDefinition(def) => any_auth_input(&def.fields),
            Definition::ObjectTypeExtension(def) => any_auth_field(&def.fields),
            Definition::InterfaceTypeExtension(def) => any_auth_field(&def.fields),
            Definition::InputObjectTypeExtension(def) => any_auth_input(&def.fields),
            _ => false,
        };

        if qualifies {
            if let Some(name) = type_name(definition) {
                types.insert(name.to_string());
            }
        }
    }

    types
}

fn any_auth_field(fields: &[Node<FieldDefinition>]) -> bool {
    fields
        .iter()
        .any(|f| is_non_null(&f.ty) && has_directive(&f.directives, AUTH))
}

fn any_auth_input(fields: &[Node<InputValueDefinition>]) -> bool {
    fields
        .iter()
        .any(|f| is_non_null(&f.ty) && has_directive(&f.directives, AUTH))
}

/// Whether transformer v2 is active and some type carries `@auth` itself
///
/// Field-level `@auth` is not considered here.
pub fn has_v2_auth_directives(doc: &Document, uses_transformer_v2: bool) -> bool {
    uses_transformer_v2
        && doc
            .definitions
            .iter()
            .filter_map(type_level_directives)
            .any(|directives| has_directive(directives, AUTH))
}

/// Whether the first `@model` directive turns subscriptions off
///
/// Matches `subscriptions: null` and `subscriptions: { level: off }` (enum or
/// string), as well as `subscriptions: { level: null }`.
pub fn subscriptions_disabled(directives: &[Node<Directive>]) -> bool {
    let Some(model) = directives.iter().find(|d| d.name.as_str() == MODEL) else {
        return false;
    };

    model
        .arguments
        .iter()
        .filter(|arg| arg.name.as_str() == "subscriptions")
        .any(|arg| match &*arg.value {
            Value::Null => true,
            Value::Object(fields) => fields
                .iter()
                .any(|(name, value)| name.as_str() == "level" && is_off_or_null(value)),
            _ => false,
        })
}

fn is_off_or_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Enum(name) => name.as_str() == "off",
        Value::String(s) => s.as_str() == "off",
        _ => false,
    }
}

fn is_non_null(ty: &Type) -> bool {
    matches!(ty, Type::NonNullNamed(_) | Type::NonNullList(_))
}

fn has_directive(directives: &DirectiveList, name: &str) -> bool {
    directives.iter().any(|d| d.name.as_str() == name)
}

fn type_name(definition: &Definition) -> Option<&str> {
    let name = match definition {
        Definition::ObjectTypeDefinition(def) => &def.name,
        Definition::InterfaceTypeDefinition(def) => &def.name,
        Definition::InputObjectTypeDefinition(def) => &def.name,
        Definition::EnumTypeDefinition(def) => &def.name,
        Definition::UnionTypeDefinition(def) => &def.name,
        Definition::ScalarTypeDefinition(def) => &def.name,
        Definition::ObjectTypeExtension(def) => &def.name,
        Definition::InterfaceTypeExtension(def) => &def.name,
        Definition::InputObjectTypeExtension(def) => &def.name,
        Definition::EnumTypeExtension(def) => &def.name,
        Definition::UnionTypeExtension(def) => &def.name,
        Definition::ScalarTypeExtension(def) => &def.name,
        _ => return None,
    };
    Some(name.as_str())
}

fn type_level_directives(definition: &Definition) -> Option<&DirectiveList> {
    match definition {
        Definition::ObjectTypeDefinition(def) => Some(&def.directives),
        Definition::InterfaceTypeDefinition(def) => Some(&def.directives),
        Definition::InputObjectTypeDefinition(def) => Some(&def.directives),
        Definition::EnumTypeDefinition(def) => Some(&def.directives),
        Definition::UnionTypeDefinition(def) => Some(&def.directives),
        Definition::ScalarTypeDefinition(def) => Some(&def.directives),
        Definition::ObjectTypeExtension(def) => Some(&def.directives),
        Definition::InterfaceTypeExtension(def) => Some(&def.directives),
        Definition::InputObjectTypeExtension(def) => Some(&def.directives),
        Definition::EnumTypeExtension(def) => Some(&def.directives),
        Definition::UnionTypeExtension(def) => Some(&def.directives),
        Definition::ScalarTypeExtension(def) => Some(&def.directives),
        _ => None,
    }
}
