use std::collections::HashMap;

use async_graphql_parser::{
    types::{
        Directive, Field, FragmentDefinition, FragmentSpread, InlineFragment, OperationDefinition,
    },
    Pos, Positioned,
};
use async_graphql_value::Name;

use crate::visitor::{Visitor, VisitorContext};

const CODE: &str = "directives-unique";

pub struct DirectivesUnique;

fn check_duplicates(ctx: &mut VisitorContext<'_>, directives: &[Positioned<Directive>]) {
    let mut seen: HashMap<&str, Pos> = HashMap::new();
    for directive in directives {
        let name = directive.node.name.node.as_str();
        let repeatable = ctx
            .schema()
            .directive(name)
            .is_some_and(|def| def.is_repeatable);
        if repeatable {
            continue;
        }
        if let Some(previous) = seen.insert(name, directive.pos) {
            ctx.report_error(
                CODE,
                vec![previous, directive.pos],
                format!("Duplicate directive \"@{name}\""),
            );
        }
    }
}

impl<'a> Visitor<'a> for DirectivesUnique {
    fn enter_operation_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        _name: Option<&'a Name>,
        operation: &'a Positioned<OperationDefinition>,
    ) {
        check_duplicates(ctx, &operation.node.directives);
    }

    fn enter_fragment_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        _name: &'a Name,
        fragment: &'a Positioned<FragmentDefinition>,
    ) {
        check_duplicates(ctx, &fragment.node.directives);
    }

    fn enter_field(&mut self, ctx: &mut VisitorContext<'a>, field: &'a Positioned<Field>) {
        check_duplicates(ctx, &field.node.directives);
    }

    fn enter_fragment_spread(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        fragment_spread: &'a Positioned<FragmentSpread>,
    ) {
        check_duplicates(ctx, &fragment_spread.node.directives);
    }

    fn enter_inline_fragment(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        inline_fragment: &'a Positioned<InlineFragment>,
    ) {
        check_duplicates(ctx, &inline_fragment.node.directives);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn factory() -> DirectivesUnique {
        DirectivesUnique
    }

    #[test]
    fn distinct_directives_are_valid() {
        expect_passes_rule!(
            factory,
            r"
            { dog { name @skip(if: false) @include(if: true) } }
            ",
        );
    }

    #[test]
    fn same_directive_on_different_locations_is_valid() {
        expect_passes_rule!(
            factory,
            r"
            { dog @onField { name @onField } }
            ",
        );
    }

    #[test]
    fn duplicate_directive_on_one_field_is_invalid() {
        expect_fails_rule!(
            factory,
            r"
            { dog { name @skip(if: false) @skip(if: false) } }
            ",
        );
    }

    #[test]
    fn duplicate_directive_on_fragment_spread_is_invalid() {
        expect_fails_rule!(
            factory,
            r"
            fragment dogFields on Dog { name }
            { dog { ...dogFields @onField @onField } }
            ",
        );
    }

    #[test]
    fn repeatable_directives_may_repeat() {
        expect_passes_rule!(
            factory,
            r"
            { dog { name @repeatableOnField @repeatableOnField } }
            ",
        );
    }

    #[test]
    fn unknown_duplicate_directives_are_still_flagged() {
        expect_fails_rule!(
            factory,
            r"
            { dog { name @unknownThing @unknownThing } }
            ",
        );
    }
}
