use async_graphql_parser::{
    types::{
        Directive, DirectiveLocation, Field, FragmentDefinition, FragmentSpread, InlineFragment,
        OperationDefinition, OperationType,
    },
    Positioned,
};
use async_graphql_value::Name;

use crate::visitor::{Visitor, VisitorContext};

const CODE: &str = "known-directives";

#[derive(Default)]
pub struct KnownDirectives {
    location_stack: Vec<DirectiveLocation>,
}

fn location_display(location: DirectiveLocation) -> &'static str {
    match location {
        DirectiveLocation::Query => "QUERY",
        DirectiveLocation::Mutation => "MUTATION",
        DirectiveLocation::Subscription => "SUBSCRIPTION",
        DirectiveLocation::Field => "FIELD",
        DirectiveLocation::FragmentDefinition => "FRAGMENT_DEFINITION",
        DirectiveLocation::FragmentSpread => "FRAGMENT_SPREAD",
        DirectiveLocation::InlineFragment => "INLINE_FRAGMENT",
        _ => "UNSUPPORTED_LOCATION",
    }
}

impl<'a> Visitor<'a> for KnownDirectives {
    fn enter_operation_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _name: Option<&'a Name>,
        operation: &'a Positioned<OperationDefinition>,
    ) {
        self.location_stack.push(match operation.node.ty {
            OperationType::Query => DirectiveLocation::Query,
            OperationType::Mutation => DirectiveLocation::Mutation,
            OperationType::Subscription => DirectiveLocation::Subscription,
        });
    }

    fn exit_operation_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _name: Option<&'a Name>,
        _operation: &'a Positioned<OperationDefinition>,
    ) {
        self.location_stack.pop();
    }

    fn enter_fragment_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _name: &'a Name,
        _fragment: &'a Positioned<FragmentDefinition>,
    ) {
        self.location_stack.push(DirectiveLocation::FragmentDefinition);
    }

    fn exit_fragment_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _name: &'a Name,
        _fragment: &'a Positioned<FragmentDefinition>,
    ) {
        self.location_stack.pop();
    }

    fn enter_field(&mut self, _ctx: &mut VisitorContext<'a>, _field: &'a Positioned<Field>) {
        self.location_stack.push(DirectiveLocation::Field);
    }

    fn exit_field(&mut self, _ctx: &mut VisitorContext<'a>, _field: &'a Positioned<Field>) {
        self.location_stack.pop();
    }

    fn enter_fragment_spread(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _fragment_spread: &'a Positioned<FragmentSpread>,
    ) {
        self.location_stack.push(DirectiveLocation::FragmentSpread);
    }

    fn exit_fragment_spread(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _fragment_spread: &'a Positioned<FragmentSpread>,
    ) {
        self.location_stack.pop();
    }

    fn enter_inline_fragment(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _inline_fragment: &'a Positioned<InlineFragment>,
    ) {
        self.location_stack.push(DirectiveLocation::InlineFragment);
    }

    fn exit_inline_fragment(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _inline_fragment: &'a Positioned<InlineFragment>,
    ) {
        self.location_stack.pop();
    }

    fn enter_directive(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        directive: &'a Positioned<Directive>,
    ) {
        let name = directive.node.name.node.as_str();
        let Some(def) = ctx.schema().directive(name) else {
            ctx.report_error(
                CODE,
                vec![directive.pos],
                format!("Unknown directive \"{name}\""),
            );
            return;
        };
        if let Some(current_location) = self.location_stack.last() {
            if !def.locations.contains(current_location) {
                ctx.report_error(
                    CODE,
                    vec![directive.pos],
                    format!(
                        "Directive \"{name}\" may not be used on {}",
                        location_display(*current_location),
                    ),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn factory() -> KnownDirectives {
        KnownDirectives::default()
    }

    #[test]
    fn no_directives_is_valid() {
        expect_passes_rule!(
            factory,
            r"
            query Foo { human { name } }
            ",
        );
    }

    #[test]
    fn known_directives_in_valid_locations() {
        expect_passes_rule!(
            factory,
            r"
            query Foo @onQuery {
                human @include(if: true) {
                    name @skip(if: false)
                    ...Frag @include(if: true)
                }
            }
            fragment Frag on Human @onFragmentDefinition { name }
            ",
        );
    }

    #[test]
    fn unknown_directive_is_invalid() {
        expect_fails_rule!(
            factory,
            r"
            { dog { name @unknown } }
            ",
        );
    }

    #[test]
    fn directive_in_wrong_location_is_invalid() {
        expect_fails_rule!(
            factory,
            r"
            { dog { name @onQuery } }
            ",
        );
        expect_fails_rule!(
            factory,
            r"
            query Foo @onMutation { human { name } }
            ",
        );
    }

    #[test]
    fn wrong_location_message_names_the_location() {
        let schema = crate::test_harness::test_schema();
        let doc = async_graphql_parser::parse_query("{ dog { name @onQuery } }").unwrap();
        let errors = crate::test_harness::validate_with(&schema, &doc, None, factory());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Directive \"onQuery\" may not be used on FIELD");
    }
}
