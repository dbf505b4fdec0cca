use async_graphql_parser::{
    types::{FragmentDefinition, InlineFragment},
    Positioned,
};
use async_graphql_value::Name;

use crate::visitor::{Visitor, VisitorContext};

const CODE: &str = "fragments-on-composite-types";

pub struct FragmentsOnCompositeTypes;

impl<'a> Visitor<'a> for FragmentsOnCompositeTypes {
    fn enter_fragment_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: &'a Name,
        fragment: &'a Positioned<FragmentDefinition>,
    ) {
        // Unknown condition types are reported by the known-type-names rule.
        let Some(ty) = ctx.current_type() else {
            return;
        };
        if !ty.is_composite() {
            ctx.report_error(
                CODE,
                vec![fragment.pos],
                format!(
                    "Fragment \"{name}\" cannot condition on non composite type \"{}\"",
                    fragment.node.type_condition.node.on.node,
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
        let Some(ty) = ctx.current_type() else {
            return;
        };
        if !ty.is_composite() {
            ctx.report_error(
                CODE,
                vec![inline_fragment.pos],
                format!(
                    "Fragment cannot condition on non composite type \"{}\"",
                    condition.node.on.node,
                ),
            );
        }
    }
}
