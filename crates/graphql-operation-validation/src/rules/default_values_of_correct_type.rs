use async_graphql_parser::{types::VariableDefinition, Positioned};

use crate::{
    rules::variables_are_input_types::base_type_name,
    utils::{is_valid_input_value, QueryPath},
    visitor::{Visitor, VisitorContext},
};

const CODE: &str = "default-values-of-correct-type";

pub struct DefaultValuesOfCorrectType;

impl<'a> Visitor<'a> for DefaultValuesOfCorrectType {
    fn enter_variable_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        variable_definition: &'a Positioned<VariableDefinition>,
    ) {
        let var_type = &variable_definition.node.var_type.node;
        // Unknown types are reported by the known-type-names rule.
        if ctx.schema().lookup_type(base_type_name(var_type)).is_none() {
            return;
        }
        let Some(value) = &variable_definition.node.default_value else {
            return;
        };
        let var_name = &variable_definition.node.name.node;
        if !var_type.nullable {
            ctx.report_error(
                CODE,
                vec![variable_definition.pos],
                format!(
                    "Argument \"{var_name}\" has type \"{var_type}\" and is not nullable, so it can't have a default value"
                ),
            );
        } else if let Some(reason) = is_valid_input_value(
            ctx.schema(),
            &var_type.to_string(),
            &value.node,
            QueryPath::empty().child(var_name.as_str()),
        ) {
            ctx.report_error(
                CODE,
                vec![variable_definition.pos],
                format!("Invalid default value for argument {reason}"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn factory() -> DefaultValuesOfCorrectType {
        DefaultValuesOfCorrectType
    }

    #[test]
    fn variables_with_no_default_values() {
        expect_passes_rule!(
            factory,
            r"
            query NullableValues($a: Int, $b: String, $c: ComplexInput) {
                dog { name }
            }
            ",
        );
    }

    #[test]
    fn required_variables_without_default_values() {
        expect_passes_rule!(
            factory,
            r"
            query RequiredValues($a: Int!, $b: String!) {
                dog { name }
            }
            ",
        );
    }

    #[test]
    fn variables_with_valid_default_values() {
        expect_passes_rule!(
            factory,
            r#"
            query WithDefaultValues(
                $a: Int = 1,
                $b: String = "ok",
                $c: ComplexInput = { requiredField: true, intField: 3 }
            ) {
                dog { name }
            }
            "#,
        );
    }

    #[test]
    fn no_required_variables_with_default_values() {
        expect_fails_rule!(
            factory,
            r#"
            query UnreachableDefaultValues($a: Int! = 3, $b: String! = "default") {
                dog { name }
            }
            "#,
        );
    }

    #[test]
    fn variables_with_invalid_default_values() {
        expect_fails_rule!(
            factory,
            r#"
            query InvalidDefaultValues($a: Int = "one", $b: String = 4) {
                dog { name }
            }
            "#,
        );
    }

    #[test]
    fn complex_variables_missing_required_field() {
        expect_fails_rule!(
            factory,
            r"
            query MissingRequiredField($a: ComplexInput = { intField: 3 }) {
                dog { name }
            }
            ",
        );
    }

    #[test]
    fn list_variables_with_invalid_item() {
        expect_fails_rule!(
            factory,
            r#"
            query InvalidItem($a: [String] = ["one", 2]) {
                dog { name }
            }
            "#,
        );
    }

    #[test]
    fn unknown_variable_types_are_ignored() {
        expect_passes_rule!(
            factory,
            r"
            query Unknown($a: UnknownType = 3) {
                dog { name }
            }
            ",
        );
    }
}
