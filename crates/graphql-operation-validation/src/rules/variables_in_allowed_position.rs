use async_graphql_parser::{
    types::{BaseType, FragmentDefinition, FragmentSpread, OperationDefinition, Type, VariableDefinition},
    Pos, Positioned,
};
use indexmap::IndexMap;
use async_graphql_value::{ConstValue, Name, Value};

use crate::{
    rules::variables_are_input_types::base_type_name,
    type_name::MetaTypeName,
    utils::Scope,
    visitor::{Visitor, VisitorContext},
};

const CODE: &str = "variables-in-allowed-position";

/// Records every variable usage together with the input type expected at
/// that position, then checks each usage against its operation's variable
/// definitions once the whole document has been walked.
#[derive(Default)]
pub struct VariableInAllowedPosition<'a> {
    // Scopes are reported in traversal order, so these are ordered maps.
    variable_usages: IndexMap<Scope<'a>, Vec<(&'a str, Pos, MetaTypeName<'a>)>>,
    variable_defs: IndexMap<Scope<'a>, Vec<&'a Positioned<VariableDefinition>>>,
    spreads: IndexMap<Scope<'a>, Vec<&'a str>>,
    current_scope: Option<Scope<'a>>,
}

/// Whether a variable declared as `var` may be used where `expected` is
/// required. A nullable variable with a non-null default may flow into a
/// non-null position.
fn variable_usage_allowed(def: &VariableDefinition, expected: MetaTypeName<'_>) -> bool {
    if let MetaTypeName::NonNull(inner) = expected {
        if def.var_type.node.nullable {
            let has_non_null_default = def
                .default_value
                .as_ref()
                .is_some_and(|value| !matches!(value.node, ConstValue::Null));
            return has_non_null_default
                && is_subtype_shape(&def.var_type.node, MetaTypeName::create(inner));
        }
    }
    is_subtype(&def.var_type.node, expected)
}

fn is_subtype(var: &Type, expected: MetaTypeName<'_>) -> bool {
    match expected {
        MetaTypeName::NonNull(inner) => {
            !var.nullable && is_subtype_shape(var, MetaTypeName::create(inner))
        }
        _ => is_subtype_shape(var, expected),
    }
}

fn is_subtype_shape(var: &Type, expected: MetaTypeName<'_>) -> bool {
    match (&var.base, expected) {
        (_, MetaTypeName::NonNull(_)) => false,
        (BaseType::List(item), MetaTypeName::List(inner)) => {
            is_subtype(item, MetaTypeName::create(inner))
        }
        (BaseType::Named(name), MetaTypeName::Named(expected)) => name.as_str() == expected,
        _ => false,
    }
}

impl<'a> VariableInAllowedPosition<'a> {
    fn collect_incoming_scopes(&self, scope: &Scope<'a>, collected: &mut Vec<Scope<'a>>) {
        if collected.contains(scope) {
            return;
        }
        collected.push(*scope);
        if let Some(spreads) = self.spreads.get(scope) {
            for spread in spreads {
                self.collect_incoming_scopes(&Scope::Fragment(spread), collected);
            }
        }
    }
}

impl<'a> Visitor<'a> for VariableInAllowedPosition<'a> {
    fn enter_operation_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        name: Option<&'a Name>,
        _operation: &'a Positioned<OperationDefinition>,
    ) {
        self.current_scope = Some(Scope::Operation(name.map(Name::as_str)));
    }

    fn enter_fragment_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        name: &'a Name,
        _fragment: &'a Positioned<FragmentDefinition>,
    ) {
        self.current_scope = Some(Scope::Fragment(name));
    }

    fn enter_variable_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        variable_definition: &'a Positioned<VariableDefinition>,
    ) {
        if let Some(scope) = &self.current_scope {
            self.variable_defs
                .entry(*scope)
                .or_default()
                .push(variable_definition);
        }
    }

    fn enter_fragment_spread(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        fragment_spread: &'a Positioned<FragmentSpread>,
    ) {
        if let Some(scope) = &self.current_scope {
            self.spreads
                .entry(*scope)
                .or_default()
                .push(fragment_spread.node.fragment_name.node.as_str());
        }
    }

    fn enter_input_value(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        pos: Pos,
        expected_type: &Option<MetaTypeName<'a>>,
        value: &'a Value,
    ) {
        let (Value::Variable(name), Some(expected)) = (value, expected_type) else {
            return;
        };
        if let Some(scope) = &self.current_scope {
            self.variable_usages
                .entry(*scope)
                .or_default()
                .push((name.as_str(), pos, *expected));
        }
    }

    fn exit_document(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        _doc: &'a async_graphql_parser::types::ExecutableDocument,
    ) {
        let operation_scopes = self
            .variable_defs
            .keys()
            .filter(|scope| matches!(scope, Scope::Operation(_)))
            .copied()
            .collect::<Vec<_>>();
        for operation_scope in operation_scopes {
            let Some(defs) = self.variable_defs.get(&operation_scope) else {
                continue;
            };
            let mut reachable = Vec::new();
            self.collect_incoming_scopes(&operation_scope, &mut reachable);
            for scope in reachable {
                let Some(usages) = self.variable_usages.get(&scope) else {
                    continue;
                };
                for (name, usage_pos, expected) in usages {
                    // Undefined variables and unknown types are other rules'
                    // concerns.
                    let Some(def) = defs
                        .iter()
                        .find(|def| def.node.name.node.as_str() == *name)
                    else {
                        continue;
                    };
                    let base = base_type_name(&def.node.var_type.node);
                    if ctx.schema().lookup_type(base).is_none() {
                        continue;
                    }
                    if !variable_usage_allowed(&def.node, *expected) {
                        ctx.report_error(
                            CODE,
                            vec![def.pos, *usage_pos],
                            format!(
                                "Variable \"${name}\" of type \"{}\" used in position expecting type \"{expected}\"",
                                def.node.var_type.node,
                            ),
                        );
                    }
                }
            }
        }
    }
}
