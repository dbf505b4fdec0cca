use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use async_graphql_parser::{
    types::{FragmentDefinition, FragmentSpread, OperationDefinition, VariableDefinition},
    Pos, Positioned,
};
use async_graphql_value::{Name, Value};

use crate::{
    utils::{referenced_variables, Scope},
    visitor::{Visitor, VisitorContext},
};

const CODE: &str = "no-undefined-variables";

/// Collects variable definitions per operation and variable uses per scope
/// during the walk, then resolves uses through fragment spreads once the
/// whole document has been seen.
#[derive(Default)]
pub struct NoUndefinedVariables<'a> {
    defined_variables: IndexMap<Option<&'a str>, (Pos, HashSet<&'a str>)>,
    used_variables: HashMap<Scope<'a>, HashMap<&'a str, Vec<Pos>>>,
    spreads: HashMap<Scope<'a>, Vec<&'a str>>,
    current_scope: Option<Scope<'a>>,
}

impl<'a> NoUndefinedVariables<'a> {
    fn collect_used<'b>(
        &'b self,
        scope: &Scope<'a>,
        used: &mut HashMap<&'a str, &'b Vec<Pos>>,
        visited: &mut HashSet<Scope<'a>>,
    ) {
        if !visited.insert(*scope) {
            return;
        }
        if let Some(variables) = self.used_variables.get(scope) {
            for (name, positions) in variables {
                used.entry(name).or_insert(positions);
            }
        }
        if let Some(spreads) = self.spreads.get(scope) {
            for spread in spreads {
                self.collect_used(&Scope::Fragment(spread), used, visited);
            }
        }
    }
}

impl<'a> Visitor<'a> for NoUndefinedVariables<'a> {
    fn enter_operation_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        name: Option<&'a Name>,
        operation: &'a Positioned<OperationDefinition>,
    ) {
        let name = name.map(Name::as_str);
        self.current_scope = Some(Scope::Operation(name));
        self.defined_variables
            .insert(name, (operation.pos, HashSet::new()));
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
        if let Some(Scope::Operation(name)) = &self.current_scope {
            if let Some((_, variables)) = self.defined_variables.get_mut(name) {
                variables.insert(variable_definition.node.name.node.as_str());
            }
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

    fn enter_argument(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _name: &'a Positioned<Name>,
        value: &'a Positioned<Value>,
    ) {
        if let Some(scope) = &self.current_scope {
            self.used_variables
                .entry(*scope)
                .or_default()
                .extend(
                    referenced_variables(&value.node)
                        .into_iter()
                        .map(|name| (name, vec![value.pos])),
                );
        }
    }

    fn exit_document(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        _doc: &'a async_graphql_parser::types::ExecutableDocument,
    ) {
        for (operation_name, (operation_pos, defined)) in &self.defined_variables {
            let mut used = HashMap::new();
            let mut visited = HashSet::new();
            self.collect_used(&Scope::Operation(*operation_name), &mut used, &mut visited);
            let mut errors = Vec::new();
            for (name, positions) in used {
                if !defined.contains(name) {
                    let mut locations = positions.clone();
                    locations.push(*operation_pos);
                    let message = match operation_name {
                        Some(operation_name) => format!(
                            "Variable \"${name}\" is not defined by operation \"{operation_name}\""
                        ),
                        None => format!("Variable \"${name}\" is not defined"),
                    };
                    errors.push((locations, message));
                }
            }
            errors.sort_by(|(_, a), (_, b)| a.cmp(b));
            for (locations, message) in errors {
                ctx.report_error(CODE, locations, message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn factory<'a>() -> NoUndefinedVariables<'a> {
        NoUndefinedVariables::default()
    }

    #[test]
    fn all_variables_defined() {
        expect_passes_rule!(
            factory,
            r"
            query Foo($a: Boolean, $b: Int, $c: Int) {
                complicatedArgs {
                    booleanArgField(booleanArg: $a)
                    multipleReqs(req1: $b, req2: $c)
                }
            }
            ",
        );
    }

    #[test]
    fn variables_defined_and_used_through_fragments() {
        expect_passes_rule!(
            factory,
            r"
            query Foo($a: Boolean) {
                complicatedArgs { ...argFields }
            }
            fragment argFields on ComplicatedArgs {
                booleanArgField(booleanArg: $a)
            }
            ",
        );
    }

    #[test]
    fn variable_used_but_not_defined() {
        expect_fails_rule!(
            factory,
            r"
            query Foo($a: Boolean) {
                complicatedArgs {
                    booleanArgField(booleanArg: $a)
                    intArgField(intArg: $undefined)
                }
            }
            ",
        );
    }

    #[test]
    fn variable_in_fragment_not_defined_by_operation() {
        expect_fails_rule!(
            factory,
            r"
            query Foo {
                complicatedArgs { ...argFields }
            }
            fragment argFields on ComplicatedArgs {
                booleanArgField(booleanArg: $a)
            }
            ",
        );
    }

    #[test]
    fn variable_defined_in_one_operation_only() {
        // $a is defined by Foo but Bar also reaches the fragment.
        expect_fails_rule!(
            factory,
            r"
            query Foo($a: Boolean) {
                complicatedArgs { ...argFields }
            }
            query Bar {
                complicatedArgs { ...argFields }
            }
            fragment argFields on ComplicatedArgs {
                booleanArgField(booleanArg: $a)
            }
            ",
        );
    }

    #[test]
    fn variables_inside_nested_input_values_are_seen() {
        expect_fails_rule!(
            factory,
            r"
            query Foo {
                complicatedArgs {
                    complexArgField(complexArg: { requiredField: true, intField: $missing })
                }
            }
            ",
        );
    }
}
