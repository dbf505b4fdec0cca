use async_graphql_parser::{
    types::{Directive, Field},
    Positioned,
};
use async_graphql_value::{Name, Value};

use crate::{
    registry::{MetaDirective, MetaField},
    suggestion::make_suggestion,
    visitor::{Visitor, VisitorContext},
};

const CODE: &str = "known-argument-names";

enum ArgsPosition<'a> {
    Directive {
        name: &'a str,
        def: Option<&'a MetaDirective>,
    },
    Field {
        field_name: &'a str,
        type_name: &'a str,
        def: Option<&'a MetaField>,
    },
}

/// Unknown host definitions are left to the rules that report them (unknown
/// fields, unknown directives), so this rule only fires when the host is
/// known but the argument is not.
#[derive(Default)]
pub struct KnownArgumentNames<'a> {
    current: Option<ArgsPosition<'a>>,
}

impl<'a> Visitor<'a> for KnownArgumentNames<'a> {
    fn enter_directive(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        directive: &'a Positioned<Directive>,
    ) {
        let name = directive.node.name.node.as_str();
        self.current = Some(ArgsPosition::Directive {
            name,
            def: ctx.schema().directive(name),
        });
    }

    fn exit_directive(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _directive: &'a Positioned<Directive>,
    ) {
        self.current = None;
    }

    fn enter_field(&mut self, ctx: &mut VisitorContext<'a>, field: &'a Positioned<Field>) {
        self.current = Some(ArgsPosition::Field {
            field_name: field.node.name.node.as_str(),
            type_name: ctx.parent_type().map(|ty| ty.name()).unwrap_or_default(),
            def: ctx.field_def(),
        });
    }

    fn exit_field(&mut self, _ctx: &mut VisitorContext<'a>, _field: &'a Positioned<Field>) {
        self.current = None;
    }

    fn enter_argument(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: &'a Positioned<Name>,
        _value: &'a Positioned<Value>,
    ) {
        let argument = name.node.as_str();
        match &self.current {
            Some(ArgsPosition::Directive { name: directive_name, def: Some(def) }) => {
                if def.argument(argument).is_none() {
                    let mut message = format!(
                        "Unknown argument \"{argument}\" on directive \"@{directive_name}\""
                    );
                    let options = def.args.iter().map(|arg| arg.name.as_str());
                    if let Some(suggestion) = make_suggestion("Did you mean", options, argument) {
                        message.push_str(". ");
                        message.push_str(&suggestion);
                    }
                    ctx.report_error(CODE, vec![name.pos], message);
                }
            }
            Some(ArgsPosition::Field { field_name, type_name, def: Some(def) }) => {
                if def.argument(argument).is_none() {
                    let mut message = format!(
                        "Unknown argument \"{argument}\" on field \"{field_name}\" of type \"{type_name}\""
                    );
                    let options = def.args.iter().map(|arg| arg.name.as_str());
                    if let Some(suggestion) = make_suggestion("Did you mean", options, argument) {
                        message.push_str(". ");
                        message.push_str(&suggestion);
                    }
                    ctx.report_error(CODE, vec![name.pos], message);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn factory<'a>() -> KnownArgumentNames<'a> {
        KnownArgumentNames::default()
    }

    #[test]
    fn known_arguments_are_valid() {
        expect_passes_rule!(
            factory,
            r"
            {
                dog {
                    doesKnowCommand(dogCommand: SIT)
                    isHousetrained(atOtherHomes: true) @include(if: true)
                }
                complicatedArgs {
                    multipleReqs(req2: 2, req1: 1)
                }
            }
            ",
        );
    }

    #[test]
    fn no_arguments_on_optional_arg_field() {
        expect_passes_rule!(
            factory,
            r"
            { dog { isHousetrained } }
            ",
        );
    }

    #[test]
    fn unknown_field_argument_is_invalid() {
        expect_fails_rule!(
            factory,
            r"
            { dog { doesKnowCommand(unknown: true) } }
            ",
        );
    }

    #[test]
    fn unknown_directive_argument_is_invalid() {
        expect_fails_rule!(
            factory,
            r"
            { dog { name @include(unless: false) } }
            ",
        );
    }

    #[test]
    fn arguments_on_unknown_fields_are_ignored() {
        expect_passes_rule!(
            factory,
            r"
            { dog { unknownField(unknownArg: true) } }
            ",
        );
    }

    #[test]
    fn misspelled_argument_gets_a_suggestion() {
        let schema = crate::test_harness::test_schema();
        let doc =
            async_graphql_parser::parse_query("{ dog { doesKnowCommand(dogCommant: SIT) } }")
                .unwrap();
        let errors = crate::test_harness::validate_with(&schema, &doc, None, factory());
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "Unknown argument \"dogCommant\" on field \"doesKnowCommand\" of type \"Dog\". Did you mean \"dogCommand\"?"
        );
    }
}
