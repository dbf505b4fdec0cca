use std::collections::HashMap;

use async_graphql_parser::{
    types::{OperationDefinition, VariableDefinition},
    Pos, Positioned,
};
use async_graphql_value::Name;

use crate::visitor::{Visitor, VisitorContext};

const CODE: &str = "unique-variable-names";

#[derive(Default)]
pub struct UniqueVariableNames<'a> {
    names: HashMap<&'a str, Pos>,
}

impl<'a> Visitor<'a> for UniqueVariableNames<'a> {
    fn enter_operation_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _name: Option<&'a Name>,
        _operation: &'a Positioned<OperationDefinition>,
    ) {
        self.names.clear();
    }

    fn enter_variable_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        variable_definition: &'a Positioned<VariableDefinition>,
    ) {
        let name = variable_definition.node.name.node.as_str();
        if let Some(previous) = self.names.insert(name, variable_definition.pos) {
            ctx.report_error(
                CODE,
                vec![previous, variable_definition.pos],
                format!("There can only be one variable named \"${name}\""),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn factory<'a>() -> UniqueVariableNames<'a> {
        UniqueVariableNames::default()
    }

    #[test]
    fn unique_variable_names() {
        expect_passes_rule!(
            factory,
            r"
            query A($x: Int, $y: String) { human { name } }
            query B($x: String, $y: Int) { human { name } }
            ",
        );
    }

    #[test]
    fn duplicate_variable_names() {
        expect_fails_rule!(
            factory,
            r"
            query A($x: Int, $x: String) { human { name } }
            ",
        );
    }

    #[test]
    fn same_name_in_different_operations_is_fine() {
        expect_passes_rule!(
            factory,
            r"
            query A($x: Int) { human { name } }
            query B($x: Int) { human { name } }
            ",
        );
    }
}
