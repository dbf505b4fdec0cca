use std::collections::{HashMap, HashSet};

use async_graphql_parser::{
    types::{FragmentDefinition, FragmentSpread, OperationDefinition, VariableDefinition},
    Pos, Positioned,
};
use async_graphql_value::{Name, Value};
use indexmap::IndexMap;

use crate::{
    utils::{referenced_variables, Scope},
    visitor::{Visitor, VisitorContext},
};

const CODE: &str = "no-unused-variables";

#[derive(Default)]
pub struct NoUnusedVariables<'a> {
    defined_variables: IndexMap<Option<&'a str>, Vec<(&'a str, Pos)>>,
    used_variables: HashMap<Scope<'a>, HashSet<&'a str>>,
    spreads: HashMap<Scope<'a>, Vec<&'a str>>,
    current_scope: Option<Scope<'a>>,
}

impl<'a> NoUnusedVariables<'a> {
    fn collect_used(
        &self,
        scope: &Scope<'a>,
        used: &mut HashSet<&'a str>,
        visited: &mut HashSet<Scope<'a>>,
    ) {
        if !visited.insert(*scope) {
            return;
        }
        if let Some(variables) = self.used_variables.get(scope) {
            used.extend(variables);
        }
        if let Some(spreads) = self.spreads.get(scope) {
            for spread in spreads {
                self.collect_used(&Scope::Fragment(spread), used, visited);
            }
        }
    }
}

impl<'a> Visitor<'a> for NoUnusedVariables<'a> {
    fn enter_operation_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        name: Option<&'a Name>,
        _operation: &'a Positioned<OperationDefinition>,
    ) {
        let name = name.map(Name::as_str);
        self.current_scope = Some(Scope::Operation(name));
        self.defined_variables.insert(name, Vec::new());
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
            if let Some(variables) = self.defined_variables.get_mut(name) {
                variables.push((
                    variable_definition.node.name.node.as_str(),
                    variable_definition.pos,
                ));
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
                .extend(referenced_variables(&value.node));
        }
    }

    fn exit_document(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        _doc: &'a async_graphql_parser::types::ExecutableDocument,
    ) {
        for (operation_name, defined) in &self.defined_variables {
            let mut used = HashSet::new();
            let mut visited = HashSet::new();
            self.collect_used(&Scope::Operation(*operation_name), &mut used, &mut visited);
            for (name, pos) in defined {
                if !used.contains(name) {
                    let message = match operation_name {
                        Some(operation_name) => format!(
                            "Variable \"${name}\" is not used by operation \"{operation_name}\""
                        ),
                        None => format!("Variable \"${name}\" is not used"),
                    };
                    ctx.report_error(CODE, vec![*pos], message);
                }
            }
        }
    }
}
