use std::collections::{HashMap, HashSet};

use async_graphql_parser::{
    types::{FragmentDefinition, FragmentSpread, OperationDefinition},
    Pos, Positioned,
};
use async_graphql_value::Name;
use indexmap::IndexMap;

use crate::{
    utils::Scope,
    visitor::{Visitor, VisitorContext},
};

const CODE: &str = "no-unused-fragments";

#[derive(Default)]
pub struct NoUnusedFragments<'a> {
    spreads: HashMap<Scope<'a>, Vec<&'a str>>,
    defined_fragments: IndexMap<&'a str, Pos>,
    operation_scopes: Vec<Scope<'a>>,
    current_scope: Option<Scope<'a>>,
}

impl<'a> NoUnusedFragments<'a> {
    fn mark_reachable(&self, scope: &Scope<'a>, reachable: &mut HashSet<&'a str>) {
        if let Some(spreads) = self.spreads.get(scope) {
            for spread in spreads {
                if reachable.insert(spread) {
                    self.mark_reachable(&Scope::Fragment(spread), reachable);
                }
            }
        }
    }
}

impl<'a> Visitor<'a> for NoUnusedFragments<'a> {
    fn enter_operation_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        name: Option<&'a Name>,
        _operation: &'a Positioned<OperationDefinition>,
    ) {
        let scope = Scope::Operation(name.map(Name::as_str));
        self.operation_scopes.push(scope);
        self.current_scope = Some(scope);
    }

    fn enter_fragment_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        name: &'a Name,
        fragment: &'a Positioned<FragmentDefinition>,
    ) {
        self.current_scope = Some(Scope::Fragment(name));
        self.defined_fragments.insert(name.as_str(), fragment.pos);
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

    fn exit_document(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        _doc: &'a async_graphql_parser::types::ExecutableDocument,
    ) {
        let mut reachable = HashSet::new();
        for scope in &self.operation_scopes {
            self.mark_reachable(scope, &mut reachable);
        }
        for (name, pos) in &self.defined_fragments {
            if !reachable.contains(name) {
                ctx.report_error(
                    CODE,
                    vec![*pos],
                    format!("Fragment \"{name}\" is never used"),
                );
            }
        }
    }
}
