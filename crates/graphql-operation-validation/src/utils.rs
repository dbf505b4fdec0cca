use std::{collections::HashSet, fmt};

use async_graphql_value::{ConstValue, Value};
use itertools::Itertools;

use crate::{registry::MetaType, type_name::MetaTypeName, variables::Variables, Schema};

/// Where a variable reference or fragment spread occurred: directly in an
/// operation, or inside a fragment definition.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Scope<'a> {
    Operation(Option<&'a str>),
    Fragment(&'a str),
}

/// Dotted path into a nested input value, used to point at the offending
/// field in coercion error messages.
#[derive(Debug, Clone, Default)]
pub(crate) struct QueryPath(Vec<String>);

impl QueryPath {
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn child(mut self, segment: impl ToString) -> Self {
        self.0.push(segment.to_string());
        self
    }
}

impl fmt::Display for QueryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join("."))
    }
}

fn valid_error(path_node: &QueryPath, msg: String) -> String {
    format!("\"{path_node}\", {msg}")
}

pub(crate) fn referenced_variables(value: &Value) -> Vec<&str> {
    let mut vars = Vec::new();
    referenced_variables_to_vec(value, &mut vars);
    vars
}

fn referenced_variables_to_vec<'a>(value: &'a Value, vars: &mut Vec<&'a str>) {
    match value {
        Value::Variable(name) => {
            vars.push(name);
        }
        Value::List(values) => values
            .iter()
            .for_each(|value| referenced_variables_to_vec(value, vars)),
        Value::Object(obj) => obj
            .values()
            .for_each(|value| referenced_variables_to_vec(value, vars)),
        _ => {}
    }
}

/// Resolves variable references against the provided bindings. Returns `None`
/// when the value references a variable with no binding, in which case rules
/// that need a concrete value skip the check rather than guess.
pub(crate) fn resolve_value(value: &Value, variables: Option<&Variables>) -> Option<ConstValue> {
    value
        .clone()
        .into_const_with(|name| {
            variables
                .and_then(|variables| variables.get(name.as_str()))
                .cloned()
                .ok_or(())
        })
        .ok()
}

pub(crate) fn is_valid_input_value(
    schema: &Schema,
    type_name: &str,
    value: &ConstValue,
    path: QueryPath,
) -> Option<String> {
    match MetaTypeName::create(type_name) {
        MetaTypeName::NonNull(type_name) => match value {
            ConstValue::Null => Some(valid_error(
                &path,
                format!("expected type \"{type_name}\" but found null"),
            )),
            _ => is_valid_input_value(schema, type_name, value, path),
        },
        MetaTypeName::List(type_name) => match value {
            ConstValue::List(elems) => elems.iter().enumerate().find_map(|(idx, elem)| {
                is_valid_input_value(schema, type_name, elem, path.clone().child(idx))
            }),
            ConstValue::Null => None,
            // A single value coerces to a list of one.
            _ => is_valid_input_value(schema, type_name, value, path),
        },
        MetaTypeName::Named(type_name) => {
            if let ConstValue::Null = value {
                return None;
            }

            // Unknown types are reported by the known-type-names rule.
            match schema.lookup_type(type_name)? {
                MetaType::Scalar { .. } => {
                    if is_valid_scalar_value(type_name, value) {
                        None
                    } else {
                        Some(valid_error(&path, format!("expected type \"{type_name}\"")))
                    }
                }
                MetaType::Enum { name: enum_name, values } => {
                    let contains = |name: &str| values.contains(name);
                    match value {
                        ConstValue::Enum(name) if contains(name.as_str()) => None,
                        ConstValue::String(name) if contains(name.as_str()) => None,
                        ConstValue::Enum(name) => Some(valid_error(
                            &path,
                            format!(
                                "enumeration type \"{enum_name}\" does not contain the value \"{name}\""
                            ),
                        )),
                        ConstValue::String(name) => Some(valid_error(
                            &path,
                            format!(
                                "enumeration type \"{enum_name}\" does not contain the value \"{name}\""
                            ),
                        )),
                        _ => Some(valid_error(
                            &path,
                            format!("expected type \"{type_name}\" but got {value}"),
                        )),
                    }
                }
                MetaType::InputObject { name, input_fields } => match value {
                    ConstValue::Object(values) => {
                        let mut input_names: HashSet<&str> =
                            values.keys().map(AsRef::as_ref).collect::<HashSet<_>>();

                        for field in input_fields.values() {
                            input_names.remove(field.name.as_str());
                            if let Some(value) = values.get(field.name.as_str()) {
                                if let Some(reason) = is_valid_input_value(
                                    schema,
                                    &field.ty,
                                    value,
                                    path.clone().child(&field.name),
                                ) {
                                    return Some(reason);
                                }
                            } else if MetaTypeName::create(&field.ty).is_non_null()
                                && field.default_value.is_none()
                            {
                                return Some(valid_error(
                                    &path,
                                    format!(
                                        "field \"{}\" of type \"{name}\" is required but not provided",
                                        field.name,
                                    ),
                                ));
                            }
                        }

                        if let Some(field_name) = input_names.iter().next() {
                            return Some(valid_error(
                                &path,
                                format!("unknown field \"{field_name}\" of type \"{name}\""),
                            ));
                        }

                        None
                    }
                    _ => None,
                },
                _ => None,
            }
        }
    }
}

fn is_valid_scalar_value(type_name: &str, value: &ConstValue) -> bool {
    match type_name {
        "Int" => matches!(
            value,
            ConstValue::Number(n) if n.as_i64().is_some_and(|n| i32::try_from(n).is_ok())
        ),
        "Float" => matches!(value, ConstValue::Number(_)),
        "String" => matches!(value, ConstValue::String(_)),
        "Boolean" => matches!(value, ConstValue::Boolean(_)),
        "ID" => matches!(value, ConstValue::String(_) | ConstValue::Number(_)),
        // Custom scalars accept any literal.
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::parse(
            r"
            type Query { ok: Boolean }
            enum Command { SIT, HEEL }
            input Filter { required: Boolean!, limit: Int, tags: [String] }
            scalar Odd
            ",
        )
        .unwrap()
    }

    fn check(type_name: &str, value: &str) -> Option<String> {
        let value = async_graphql_parser::parse_query(format!("{{ f(arg: {value}) }}"))
            .ok()
            .and_then(|doc| {
                let (_, operation) = doc.operations.iter().next()?;
                let Some(async_graphql_parser::types::Selection::Field(field)) =
                    operation.node.selection_set.node.items.first().map(|s| &s.node)
                else {
                    return None;
                };
                field.node.arguments.first()?.1.node.clone().into_const()
            })
            .unwrap();
        is_valid_input_value(&schema(), type_name, &value, QueryPath::empty().child("arg"))
    }

    #[test]
    fn null_against_non_null_is_rejected() {
        assert!(check("Int!", "null").unwrap().contains("found null"));
        assert!(check("Int", "null").is_none());
    }

    #[test]
    fn scalars_check_their_literal_shape() {
        assert!(check("Int", "3").is_none());
        assert!(check("Int", "3.5").is_some());
        assert!(check("Int", "2147483648").is_some());
        assert!(check("Float", "3").is_none());
        assert!(check("Boolean", "true").is_none());
        assert!(check("String", "3").is_some());
        assert!(check("Odd", "{ anything: true }").is_none());
    }

    #[test]
    fn single_values_coerce_to_lists() {
        assert!(check("[String]", "\"a\"").is_none());
        assert!(check("[String]", "[\"a\", 3]").is_some());
    }

    #[test]
    fn enums_accept_members_only() {
        assert!(check("Command", "SIT").is_none());
        let reason = check("Command", "ROLL_OVER").unwrap();
        assert!(reason.contains("does not contain the value \"ROLL_OVER\""));
    }

    #[test]
    fn input_objects_check_fields() {
        assert!(check("Filter", "{ required: true, limit: 3 }").is_none());
        assert!(check("Filter", "{ limit: 3 }")
            .unwrap()
            .contains("\"required\" of type \"Filter\" is required"));
        assert!(check("Filter", "{ required: true, unknown: 1 }")
            .unwrap()
            .contains("unknown field \"unknown\""));
        assert!(check("Filter", "{ required: true, tags: [3] }")
            .unwrap()
            .contains("arg.tags.0"));
    }

    #[test]
    fn unbound_variables_do_not_resolve() {
        let value = Value::Variable(async_graphql_value::Name::new("missing"));
        assert!(resolve_value(&value, None).is_none());

        let variables = Variables::from_json(serde_json::json!({ "missing": 1 }));
        assert_eq!(
            resolve_value(&value, Some(&variables)),
            Some(ConstValue::Number(1.into()))
        );
    }
}
