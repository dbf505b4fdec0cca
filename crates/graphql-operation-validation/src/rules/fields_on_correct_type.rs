use async_graphql_parser::{types::Field, Positioned};

use crate::{
    suggestion::make_suggestion,
    visitor::{Visitor, VisitorContext},
};

const CODE: &str = "fields-on-correct-type";

pub struct FieldsOnCorrectType;

impl<'a> Visitor<'a> for FieldsOnCorrectType {
    fn enter_field(&mut self, ctx: &mut VisitorContext<'a>, field: &'a Positioned<Field>) {
        let field_name = field.node.name.node.as_str();
        // Meta fields such as __typename are resolved by the executor.
        if field_name.starts_with("__") {
            return;
        }
        let Some(parent) = ctx.parent_type() else {
            return;
        };
        if ctx.field_def().is_none() {
            let mut message =
                format!("Unknown field \"{field_name}\" on type \"{}\".", parent.name());
            if let Some(suggestion) =
                make_suggestion("Did you mean", parent.field_names(), field_name)
            {
                message.push(' ');
                message.push_str(&suggestion);
            }
            ctx.report_error(CODE, vec![field.pos], message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn factory() -> FieldsOnCorrectType {
        FieldsOnCorrectType
    }

    #[test]
    fn object_field_selection() {
        expect_passes_rule!(
            factory,
            r"
            fragment objectFieldSelection on Dog {
                __typename
                name
            }
            { dog { ...objectFieldSelection } }
            ",
        );
    }

    #[test]
    fn aliased_object_field_selection() {
        expect_passes_rule!(
            factory,
            r"
            { dog { otherName: name } }
            ",
        );
    }

    #[test]
    fn interface_field_selection() {
        expect_passes_rule!(
            factory,
            r"
            { pet { __typename name } }
            ",
        );
    }

    #[test]
    fn lying_alias_selection() {
        expect_passes_rule!(
            factory,
            r"
            { dog { barkVolume: name } }
            ",
        );
    }

    #[test]
    fn ignores_fields_on_unknown_type() {
        expect_passes_rule!(
            factory,
            r"
            fragment unknownSelection on UnknownType { unknownField }
            { dog { ...unknownSelection } }
            ",
        );
    }

    #[test]
    fn field_not_defined_on_fragment() {
        expect_fails_rule!(
            factory,
            r"
            { dog { meowVolume } }
            ",
        );
    }

    #[test]
    fn field_not_defined_deeply_only_reports_first() {
        expect_fails_rule!(
            factory,
            r"
            { dog { unknown_field { deeper_unknown_field } } }
            ",
        );
    }

    #[test]
    fn field_not_defined_on_interface() {
        expect_fails_rule!(
            factory,
            r"
            { pet { tailLength } }
            ",
        );
    }

    #[test]
    fn direct_field_selection_on_union() {
        expect_fails_rule!(
            factory,
            r"
            { catOrDog { directField } }
            ",
        );
    }

    #[test]
    fn typename_on_union_is_fine() {
        expect_passes_rule!(
            factory,
            r"
            { catOrDog { __typename ... on Dog { name } } }
            ",
        );
    }

    #[test]
    fn unknown_field_suggests_close_names() {
        let schema = crate::test_harness::test_schema();
        let doc = async_graphql_parser::parse_query("{ dog { barkVolum } }").unwrap();
        let errors = crate::test_harness::validate_with(&schema, &doc, None, factory());
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "Unknown field \"barkVolum\" on type \"Dog\". Did you mean \"barkVolume\"?"
        );
    }
}
