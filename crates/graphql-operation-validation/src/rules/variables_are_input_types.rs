use async_graphql_parser::{
    types::{BaseType, Type, VariableDefinition},
    Positioned,
};

use crate::visitor::{Visitor, VisitorContext};

const CODE: &str = "variables-are-input-types";

pub struct VariablesAreInputTypes;

pub(crate) fn base_type_name(ty: &Type) -> &str {
    match &ty.base {
        BaseType::Named(name) => name.as_str(),
        BaseType::List(inner) => base_type_name(inner),
    }
}

impl<'a> Visitor<'a> for VariablesAreInputTypes {
    fn enter_variable_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        variable_definition: &'a Positioned<VariableDefinition>,
    ) {
        let var_type = &variable_definition.node.var_type.node;
        // Unknown types are reported by the known-type-names rule.
        if let Some(ty) = ctx.schema().lookup_type(base_type_name(var_type)) {
            if !ty.is_input() {
                ctx.report_error(
                    CODE,
                    vec![variable_definition.pos],
                    format!(
                        "Variable \"${}\" cannot be of non-input type \"{var_type}\"",
                        variable_definition.node.name.node,
                    ),
                );
            }
        }
    }
}
