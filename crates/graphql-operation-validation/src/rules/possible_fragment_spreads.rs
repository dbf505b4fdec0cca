use async_graphql_parser::{
    types::{FragmentSpread, InlineFragment},
    Positioned,
};

use crate::visitor::{Visitor, VisitorContext};

const CODE: &str = "possible-fragment-spreads";

/// A spread is only satisfiable when the possible types of the fragment
/// condition and of the surrounding selection overlap; otherwise the fragment
/// can never apply and the spread is dead.
pub struct PossibleFragmentSpreads;

impl<'a> Visitor<'a> for PossibleFragmentSpreads {
    fn enter_fragment_spread(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        fragment_spread: &'a Positioned<FragmentSpread>,
    ) {
        let name = fragment_spread.node.fragment_name.node.as_str();
        let Some(fragment) = ctx.fragment(name) else {
            return;
        };
        let on = fragment.node.type_condition.node.on.node.as_str();
        let Some(fragment_type) = ctx.schema().lookup_type(on) else {
            return;
        };
        let Some(parent) = ctx.parent_type() else {
            return;
        };
        if fragment_type.is_composite()
            && parent.is_composite()
            && !ctx.schema().type_overlap(fragment_type, parent)
        {
            ctx.report_error(
                CODE,
                vec![fragment_spread.pos],
                format!(
                    "Fragment \"{name}\" cannot be spread here as objects of type \"{}\" can never be of type \"{on}\"",
                    parent.name(),
                ),
            );
        }
    }

    fn enter_inline_fragment(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        inline_fragment: &'a Positioned<InlineFragment>,
    ) {
        let Some(condition) = &inline_fragment.node.type_condition else {
            return;
        };
        let Some(fragment_type) = ctx.schema().lookup_type(condition.node.on.node.as_str())
        else {
            return;
        };
        let Some(parent) = ctx.parent_type() else {
            return;
        };
        if fragment_type.is_composite()
            && parent.is_composite()
            && !ctx.schema().type_overlap(fragment_type, parent)
        {
            ctx.report_error(
                CODE,
                vec![inline_fragment.pos],
                format!(
                    "Fragment cannot be spread here as objects of type \"{}\" can never be of type \"{}\"",
                    parent.name(),
                    condition.node.on.node,
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn factory() -> PossibleFragmentSpreads {
        PossibleFragmentSpreads
    }

    #[test]
    fn same_object_type() {
        expect_passes_rule!(
            factory,
            r"
            fragment objectWithinObject on Dog { ...dogFragment }
            fragment dogFragment on Dog { barkVolume }
            { dog { ...objectWithinObject } }
            ",
        );
    }

    #[test]
    fn object_into_implemented_interface() {
        expect_passes_rule!(
            factory,
            r"
            fragment objectWithinInterface on Pet { ...dogFragment }
            fragment dogFragment on Dog { barkVolume }
            { pet { ...objectWithinInterface } }
            ",
        );
    }

    #[test]
    fn object_into_containing_union() {
        expect_passes_rule!(
            factory,
            r"
            fragment objectWithinUnion on CatOrDog { ...dogFragment }
            fragment dogFragment on Dog { barkVolume }
            { catOrDog { ...objectWithinUnion } }
            ",
        );
    }

    #[test]
    fn interface_into_overlapping_union() {
        expect_passes_rule!(
            factory,
            r"
            fragment petWithinUnion on CatOrDog { ...petFragment }
            fragment petFragment on Pet { name }
            { catOrDog { ...petWithinUnion } }
            ",
        );
    }

    #[test]
    fn different_object_into_object() {
        expect_fails_rule!(
            factory,
            r"
            fragment invalidObjectWithinObject on Cat { ...dogFragment }
            fragment dogFragment on Dog { barkVolume }
            { cat { ...invalidObjectWithinObject } }
            ",
        );
    }

    #[test]
    fn object_into_not_implementing_interface_inline() {
        expect_fails_rule!(
            factory,
            r"
            { pet { ... on Alien { numEyes } } }
            ",
        );
    }

    #[test]
    fn object_into_not_containing_union() {
        expect_fails_rule!(
            factory,
            r"
            fragment invalidObjectWithinUnion on CatOrDog { ...humanFragment }
            fragment humanFragment on Human { pets { name } }
            { catOrDog { ...invalidObjectWithinUnion } }
            ",
        );
    }

    #[test]
    fn unions_without_overlap_are_invalid() {
        expect_fails_rule!(
            factory,
            r"
            fragment invalidUnionWithinUnion on CatOrDog { ...humanOrAlienFragment }
            fragment humanOrAlienFragment on HumanOrAlien { __typename }
            { catOrDog { ...invalidUnionWithinUnion } }
            ",
        );
    }
}
