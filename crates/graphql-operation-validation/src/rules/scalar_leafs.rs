use async_graphql_parser::{types::Field, Positioned};

use crate::visitor::{Visitor, VisitorContext};

const CODE: &str = "scalar-leafs";

pub struct ScalarLeafs;

impl<'a> Visitor<'a> for ScalarLeafs {
    fn enter_field(&mut self, ctx: &mut VisitorContext<'a>, field: &'a Positioned<Field>) {
        let Some(def) = ctx.field_def() else {
            return;
        };
        let Some(ty) = ctx.current_type() else {
            return;
        };
        let field_name = field.node.name.node.as_str();
        let has_selection = !field.node.selection_set.node.items.is_empty();
        if ty.is_leaf() && has_selection {
            ctx.report_error(
                CODE,
                vec![field.pos],
                format!(
                    "Field \"{field_name}\" must not have a selection since type \"{}\" has no subfields",
                    def.ty
                ),
            );
        } else if !ty.is_leaf() && !has_selection {
            ctx.report_error(
                CODE,
                vec![field.pos],
                format!(
                    "Field \"{field_name}\" of type \"{}\" must have a selection of subfields. Did you mean \"{field_name} {{ ... }}\"?",
                    def.ty
                ),
            );
        }
    }
}
