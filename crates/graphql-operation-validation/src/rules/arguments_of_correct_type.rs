use async_graphql_parser::Positioned;
use async_graphql_value::{Name, Value};

use crate::{
    utils::{is_valid_input_value, resolve_value, QueryPath},
    visitor::{Visitor, VisitorContext},
};

const CODE: &str = "arguments-of-correct-type";

pub struct ArgumentsOfCorrectType;

impl<'a> Visitor<'a> for ArgumentsOfCorrectType {
    fn enter_argument(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: &'a Positioned<Name>,
        value: &'a Positioned<Value>,
    ) {
        // Unknown arguments are reported by the known-argument-names rule.
        let Some(def) = ctx.argument_def() else {
            return;
        };
        // A reference to an unbound variable cannot be checked here; its own
        // rules cover it.
        let Some(const_value) = resolve_value(&value.node, ctx.variables()) else {
            return;
        };
        if let Some(reason) = is_valid_input_value(
            ctx.schema(),
            &def.ty,
            &const_value,
            QueryPath::empty().child(name.node.as_str()),
        ) {
            ctx.report_error(
                CODE,
                vec![value.pos],
                format!("Invalid value for argument {reason}"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn factory() -> ArgumentsOfCorrectType {
        ArgumentsOfCorrectType
    }

    #[test]
    fn good_values() {
        expect_passes_rule!(
            factory,
            r#"
            {
                complicatedArgs {
                    intArgField(intArg: 2)
                    stringArgField(stringArg: "foo")
                    booleanArgField(booleanArg: true)
                    enumArgField(enumArg: TAN)
                    floatArgField(floatArg: 1.1)
                    idArgField(idArg: 1)
                    alsoString: idArgField(idArg: "someIdString")
                    stringListArgField(stringListArg: ["one", "two"])
                    complexArgField(complexArg: { requiredField: true, intField: 4 })
                }
            }
            "#,
        );
    }

    #[test]
    fn coerced_values() {
        expect_passes_rule!(
            factory,
            r#"
            {
                complicatedArgs {
                    floatArgField(floatArg: 1)
                    stringListArgField(stringListArg: "one")
                }
            }
            "#,
        );
    }

    #[test]
    fn int_into_string_is_invalid() {
        expect_fails_rule!(
            factory,
            r"
            { complicatedArgs { stringArgField(stringArg: 1) } }
            ",
        );
    }

    #[test]
    fn unquoted_string_into_enum_is_checked_against_members() {
        expect_fails_rule!(
            factory,
            r"
            { dog { doesKnowCommand(dogCommand: JUGGLE) } }
            ",
        );
    }

    #[test]
    fn overflowing_int_is_invalid() {
        expect_fails_rule!(
            factory,
            r"
            { complicatedArgs { intArgField(intArg: 2147483648) } }
            ",
        );
    }

    #[test]
    fn incorrect_item_type_in_list() {
        expect_fails_rule!(
            factory,
            r#"
            { complicatedArgs { stringListArgField(stringListArg: ["one", 2]) } }
            "#,
        );
    }

    #[test]
    fn missing_required_input_object_field() {
        expect_fails_rule!(
            factory,
            r"
            { complicatedArgs { complexArgField(complexArg: { intField: 4 }) } }
            ",
        );
    }

    #[test]
    fn unbound_variables_are_skipped() {
        expect_passes_rule!(
            factory,
            r"
            query ($value: Int) {
                complicatedArgs { stringArgField(stringArg: $value) }
            }
            ",
        );
    }

    #[test]
    fn bound_variables_are_coerced_and_checked() {
        let schema = crate::test_harness::test_schema();
        let doc = async_graphql_parser::parse_query(
            "query ($value: Int) { complicatedArgs { stringArgField(stringArg: $value) } }",
        )
        .unwrap();
        let variables = crate::Variables::from_json(serde_json::json!({ "value": 3 }));
        let errors =
            crate::test_harness::validate_with(&schema, &doc, Some(&variables), factory());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("expected type \"String\""));
    }
}
