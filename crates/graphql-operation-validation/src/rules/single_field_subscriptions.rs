use async_graphql_parser::{
    types::{OperationDefinition, OperationType},
    Positioned,
};
use async_graphql_value::Name;

use crate::visitor::{Visitor, VisitorContext};

const CODE: &str = "single-field-subscriptions";

pub struct SingleFieldSubscriptions;

impl<'a> Visitor<'a> for SingleFieldSubscriptions {
    fn enter_operation_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: Option<&'a Name>,
        operation: &'a Positioned<OperationDefinition>,
    ) {
        if operation.node.ty != OperationType::Subscription {
            return;
        }
        let items = &operation.node.selection_set.node.items;
        if items.len() > 1 {
            let locations = items[1..].iter().map(|selection| selection.pos).collect();
            let message = match name {
                Some(name) => {
                    format!("Subscription \"{name}\" must select only one top level field.")
                }
                None => "Anonymous Subscription must select only one top level field.".to_string(),
            };
            ctx.report_error(CODE, locations, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn factory() -> SingleFieldSubscriptions {
        SingleFieldSubscriptions
    }

    #[test]
    fn single_root_field_is_valid() {
        expect_passes_rule!(
            factory,
            r"
            subscription ImportantEmails { newMessage }
            ",
        );
    }

    #[test]
    fn queries_are_not_restricted() {
        expect_passes_rule!(
            factory,
            r"
            { dog { name } human(id: 1) { name } }
            ",
        );
    }

    #[test]
    fn multiple_root_fields_are_invalid() {
        expect_fails_rule!(
            factory,
            r"
            subscription ImportantEmails {
                newMessage
                disturbance
            }
            ",
        );
    }

    #[test]
    fn anonymous_subscription_with_multiple_roots_is_invalid() {
        expect_fails_rule!(
            factory,
            r"
            subscription {
                newMessage
                disturbance
            }
            ",
        );
    }
}
