use async_graphql_parser::{
    types::{Directive, Field},
    Positioned,
};

use crate::{
    type_name::MetaTypeName,
    visitor::{Visitor, VisitorContext},
};

const CODE: &str = "provided-non-null-arguments";

pub struct ProvidedNonNullArguments;

impl<'a> Visitor<'a> for ProvidedNonNullArguments {
    fn enter_field(&mut self, ctx: &mut VisitorContext<'a>, field: &'a Positioned<Field>) {
        let Some(def) = ctx.field_def() else {
            return;
        };
        for arg in &def.args {
            if !MetaTypeName::create(&arg.ty).is_non_null() || arg.default_value.is_some() {
                continue;
            }
            let provided = field
                .node
                .arguments
                .iter()
                .any(|(name, _)| name.node.as_str() == arg.name);
            if !provided {
                ctx.report_error(
                    CODE,
                    vec![field.pos],
                    format!(
                        "Field \"{}\" argument \"{}\" of type \"{}\" is required but not provided",
                        field.node.name.node,
                        arg.name,
                        arg.ty,
                    ),
                );
            }
        }
    }

    fn enter_directive(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        directive: &'a Positioned<Directive>,
    ) {
        let Some(def) = ctx.directive_def() else {
            return;
        };
        for arg in &def.args {
            if !MetaTypeName::create(&arg.ty).is_non_null() || arg.default_value.is_some() {
                continue;
            }
            let provided = directive
                .node
                .arguments
                .iter()
                .any(|(name, _)| name.node.as_str() == arg.name);
            if !provided {
                ctx.report_error(
                    CODE,
                    vec![directive.pos],
                    format!(
                        "Directive \"@{}\" argument \"{}\" of type \"{}\" is required but not provided",
                        directive.node.name.node,
                        arg.name,
                        arg.ty,
                    ),
                );
            }
        }
    }
}
