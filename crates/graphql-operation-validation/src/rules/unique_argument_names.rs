use std::collections::HashMap;

use async_graphql_parser::{
    types::{Directive, Field},
    Pos, Positioned,
};
use async_graphql_value::{Name, Value};

use crate::visitor::{Visitor, VisitorContext};

const CODE: &str = "unique-argument-names";

#[derive(Default)]
pub struct UniqueArgumentNames<'a> {
    names: HashMap<&'a str, Pos>,
}

impl<'a> Visitor<'a> for UniqueArgumentNames<'a> {
    fn enter_field(&mut self, _ctx: &mut VisitorContext<'a>, _field: &'a Positioned<Field>) {
        self.names.clear();
    }

    fn enter_directive(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _directive: &'a Positioned<Directive>,
    ) {
        self.names.clear();
    }

    fn enter_argument(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: &'a Positioned<Name>,
        _value: &'a Positioned<Value>,
    ) {
        if let Some(previous) = self.names.insert(name.node.as_str(), name.pos) {
            ctx.report_error(
                CODE,
                vec![previous, name.pos],
                format!("There can be only one argument named \"{}\"", name.node),
            );
        }
    }
}
