use async_graphql_parser::{
    types::{FragmentDefinition, InlineFragment, VariableDefinition},
    Pos, Positioned,
};
use async_graphql_value::Name;

use crate::{
    rules::variables_are_input_types::base_type_name,
    suggestion::make_suggestion,
    visitor::{Visitor, VisitorContext},
};

const CODE: &str = "known-type-names";

pub struct KnownTypeNames;

fn check_known(ctx: &mut VisitorContext<'_>, name: &str, pos: Pos) {
    if ctx.schema().lookup_type(name).is_none() {
        let mut message = format!("Unknown type \"{name}\"");
        if let Some(suggestion) = make_suggestion("Did you mean", ctx.schema().type_names(), name) {
            message.push_str(". ");
            message.push_str(&suggestion);
        }
        ctx.report_error(CODE, vec![pos], message);
    }
}

impl<'a> Visitor<'a> for KnownTypeNames {
    fn enter_fragment_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        _name: &'a Name,
        fragment: &'a Positioned<FragmentDefinition>,
    ) {
        let condition = &fragment.node.type_condition;
        check_known(ctx, condition.node.on.node.as_str(), condition.pos);
    }

    fn enter_inline_fragment(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        inline_fragment: &'a Positioned<InlineFragment>,
    ) {
        if let Some(condition) = &inline_fragment.node.type_condition {
            check_known(ctx, condition.node.on.node.as_str(), condition.pos);
        }
    }

    fn enter_variable_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        variable_definition: &'a Positioned<VariableDefinition>,
    ) {
        check_known(
            ctx,
            base_type_name(&variable_definition.node.var_type.node),
            variable_definition.pos,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn factory() -> KnownTypeNames {
        KnownTypeNames
    }

    #[test]
    fn known_type_names_are_valid() {
        expect_passes_rule!(
            factory,
            r"
            query Foo($var: String, $required: [String!]!) {
                human { pets { ... on Pet { name } ...PetFields } }
            }
            fragment PetFields on Pet { name }
            ",
        );
    }

    #[test]
    fn unknown_type_names_are_invalid() {
        expect_fails_rule!(
            factory,
            r"
            query Foo($var: JumbledUpLetters) { human { name } }
            ",
        );
        expect_fails_rule!(
            factory,
            r"
            { human { pets { ... on Badger { name } } } }
            ",
        );
        expect_fails_rule!(
            factory,
            r"
            fragment PetFields on Peettt { name }
            { human { name } }
            ",
        );
    }

    #[test]
    fn wrapped_variable_types_are_unwrapped() {
        expect_fails_rule!(
            factory,
            r"
            query Foo($var: [Unknown!]!) { human { name } }
            ",
        );
    }
}
