//! The document walker and the rule composition machinery.
//!
//! Rules implement [`Visitor`] and are chained together with
//! [`VisitorNil::with`], so a whole rule set traverses the document in a
//! single pass. The walker drives every hook twice per node, `enter_*` in
//! registration order on the way down and `exit_*` in reverse order on the
//! way back up, and maintains a stack of type frames that rules query
//! through the accessors on [`VisitorContext`].

use std::fmt;

use async_graphql_parser::{
    types::{
        Directive, DocumentOperations, ExecutableDocument, Field, FragmentDefinition,
        FragmentSpread, InlineFragment, OperationDefinition, OperationType, Selection,
        SelectionSet, Type, VariableDefinition,
    },
    Pos, Positioned,
};
use async_graphql_value::{ConstValue, Name, Value};
use itertools::Itertools;

use crate::{
    registry::{MetaDirective, MetaField, MetaInputValue, MetaType},
    type_name::MetaTypeName,
    variables::Variables,
    Schema,
};

/// Selection sets nested deeper than this are reported as an error and not
/// descended into, bounding recursion on adversarial documents. The parser
/// refuses documents nested beyond 64 levels, so this sits below that to
/// stay reachable.
pub(crate) const MAX_SELECTION_NESTING: usize = 32;

const MAX_SELECTION_NESTING_CODE: &str = "max-selection-nesting";

/// A single validation error, tagged with the machine-readable code of the
/// rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleError {
    pub code: &'static str,
    pub locations: Vec<Pos>,
    pub message: String,
}

impl RuleError {
    pub fn new(code: &'static str, locations: Vec<Pos>, message: impl Into<String>) -> Self {
        RuleError {
            code,
            locations,
            message: message.into(),
        }
    }
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, location) in self.locations.iter().enumerate() {
            if i == 0 {
                write!(f, "[")?;
            } else {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", location.line, location.column)?;
            if i == self.locations.len() - 1 {
                write!(f, "] ")?;
            }
        }
        write!(f, "{}", self.message)
    }
}

/// The expected input type at the point a value is being visited.
///
/// Most positions carry a schema type reference; variable definitions carry
/// the type the document itself declared.
#[derive(Debug, Clone, Copy)]
pub enum InputType<'a> {
    Schema(&'a str),
    Variable(&'a Type),
}

/// One entry of the type tracker. A frame is pushed when the walker enters
/// the corresponding node and popped when it leaves it, so the accessors can
/// answer "what is current here" by scanning from the innermost frame out.
#[derive(Debug, Clone, Copy)]
enum TypeFrame<'a> {
    Operation {
        root: Option<&'a MetaType>,
    },
    SelectionSet {
        scope: Option<&'a MetaType>,
    },
    Field {
        def: Option<&'a MetaField>,
        ty: Option<&'a MetaType>,
    },
    Fragment {
        ty: Option<&'a MetaType>,
    },
    VariableDefinition {
        ty: &'a Type,
        default: Option<&'a ConstValue>,
    },
    Directive {
        def: Option<&'a MetaDirective>,
    },
    Argument {
        def: Option<&'a MetaInputValue>,
        ty: Option<&'a str>,
    },
    ListValue {
        ty: Option<&'a str>,
    },
    ObjectField {
        ty: Option<&'a str>,
    },
}

pub struct VisitorContext<'a> {
    schema: &'a Schema,
    doc: &'a ExecutableDocument,
    variables: Option<&'a Variables>,
    pub errors: Vec<RuleError>,
    frames: Vec<TypeFrame<'a>>,
    nesting: usize,
    too_deep_reported: bool,
}

impl<'a> VisitorContext<'a> {
    pub fn new(
        schema: &'a Schema,
        doc: &'a ExecutableDocument,
        variables: Option<&'a Variables>,
    ) -> Self {
        VisitorContext {
            schema,
            doc,
            variables,
            errors: Vec::new(),
            frames: Vec::new(),
            nesting: 0,
            too_deep_reported: false,
        }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn variables(&self) -> Option<&'a Variables> {
        self.variables
    }

    pub fn fragment(&self, name: &str) -> Option<&'a Positioned<FragmentDefinition>> {
        self.doc.fragments.get(name)
    }

    pub fn report_error(
        &mut self,
        code: &'static str,
        locations: Vec<Pos>,
        message: impl Into<String>,
    ) {
        self.errors.push(RuleError::new(code, locations, message));
    }

    /// The named type selections currently resolve against: the field or
    /// fragment the walker most recently entered, or the operation root.
    pub fn current_type(&self) -> Option<&'a MetaType> {
        self.frames.iter().rev().find_map(|frame| match frame {
            TypeFrame::Operation { root } => Some(*root),
            TypeFrame::Field { ty, .. } => Some(*ty),
            TypeFrame::Fragment { ty } => Some(*ty),
            _ => None,
        })?
    }

    /// The type the innermost enclosing selection set was opened on. Unlike
    /// [`current_type`](Self::current_type) this does not move when a field
    /// or inline fragment inside that selection set is entered.
    pub fn parent_type(&self) -> Option<&'a MetaType> {
        self.frames.iter().rev().find_map(|frame| match frame {
            TypeFrame::SelectionSet { scope } => Some(*scope),
            _ => None,
        })?
    }

    /// The schema definition of the innermost field being visited, if the
    /// field exists on its parent type.
    pub fn field_def(&self) -> Option<&'a MetaField> {
        self.frames.iter().rev().find_map(|frame| match frame {
            TypeFrame::Field { def, .. } => Some(*def),
            _ => None,
        })?
    }

    /// The schema definition of the directive being visited, if known.
    pub fn directive_def(&self) -> Option<&'a MetaDirective> {
        self.frames.iter().rev().find_map(|frame| match frame {
            TypeFrame::Directive { def } => Some(*def),
            _ => None,
        })?
    }

    /// The schema definition of the argument being visited, if its host and
    /// the argument itself are known.
    pub fn argument_def(&self) -> Option<&'a MetaInputValue> {
        self.frames.iter().rev().find_map(|frame| match frame {
            TypeFrame::Argument { def, .. } => Some(*def),
            _ => None,
        })?
    }

    /// The input type expected at the innermost value position.
    pub fn input_type(&self) -> Option<InputType<'a>> {
        self.frames.iter().rev().find_map(|frame| match frame {
            TypeFrame::Argument { ty, .. }
            | TypeFrame::ListValue { ty }
            | TypeFrame::ObjectField { ty } => Some(ty.map(InputType::Schema)),
            TypeFrame::VariableDefinition { ty, .. } => Some(Some(InputType::Variable(ty))),
            _ => None,
        })?
    }

    /// The default value of the innermost enclosing variable definition.
    pub fn default_value(&self) -> Option<&'a ConstValue> {
        self.frames.iter().rev().find_map(|frame| match frame {
            TypeFrame::VariableDefinition { default, .. } => Some(*default),
            _ => None,
        })?
    }

    fn push_frame(&mut self, frame: TypeFrame<'a>) {
        self.frames.push(frame);
    }

    fn pop_frame(&mut self) {
        self.frames.pop();
    }

    fn report_too_deep(&mut self, pos: Pos) {
        if !self.too_deep_reported {
            self.too_deep_reported = true;
            self.report_error(
                MAX_SELECTION_NESTING_CODE,
                vec![pos],
                format!("Selection sets are nested too deep (more than {MAX_SELECTION_NESTING} levels)"),
            );
        }
    }
}

#[allow(unused_variables)]
pub trait Visitor<'a> {
    fn enter_document(&mut self, ctx: &mut VisitorContext<'a>, doc: &'a ExecutableDocument) {}
    fn exit_document(&mut self, ctx: &mut VisitorContext<'a>, doc: &'a ExecutableDocument) {}

    fn enter_operation_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: Option<&'a Name>,
        operation: &'a Positioned<OperationDefinition>,
    ) {
    }
    fn exit_operation_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: Option<&'a Name>,
        operation: &'a Positioned<OperationDefinition>,
    ) {
    }

    fn enter_fragment_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: &'a Name,
        fragment: &'a Positioned<FragmentDefinition>,
    ) {
    }
    fn exit_fragment_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: &'a Name,
        fragment: &'a Positioned<FragmentDefinition>,
    ) {
    }

    fn enter_variable_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        variable_definition: &'a Positioned<VariableDefinition>,
    ) {
    }
    fn exit_variable_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        variable_definition: &'a Positioned<VariableDefinition>,
    ) {
    }

    fn enter_directive(&mut self, ctx: &mut VisitorContext<'a>, directive: &'a Positioned<Directive>) {
    }
    fn exit_directive(&mut self, ctx: &mut VisitorContext<'a>, directive: &'a Positioned<Directive>) {
    }

    fn enter_argument(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: &'a Positioned<Name>,
        value: &'a Positioned<Value>,
    ) {
    }
    fn exit_argument(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: &'a Positioned<Name>,
        value: &'a Positioned<Value>,
    ) {
    }

    fn enter_selection_set(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        selection_set: &'a Positioned<SelectionSet>,
    ) {
    }
    fn exit_selection_set(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        selection_set: &'a Positioned<SelectionSet>,
    ) {
    }

    fn enter_selection(&mut self, ctx: &mut VisitorContext<'a>, selection: &'a Positioned<Selection>) {
    }
    fn exit_selection(&mut self, ctx: &mut VisitorContext<'a>, selection: &'a Positioned<Selection>) {
    }

    fn enter_field(&mut self, ctx: &mut VisitorContext<'a>, field: &'a Positioned<Field>) {}
    fn exit_field(&mut self, ctx: &mut VisitorContext<'a>, field: &'a Positioned<Field>) {}

    fn enter_fragment_spread(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        fragment_spread: &'a Positioned<FragmentSpread>,
    ) {
    }
    fn exit_fragment_spread(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        fragment_spread: &'a Positioned<FragmentSpread>,
    ) {
    }

    fn enter_inline_fragment(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        inline_fragment: &'a Positioned<InlineFragment>,
    ) {
    }
    fn exit_inline_fragment(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        inline_fragment: &'a Positioned<InlineFragment>,
    ) {
    }

    fn enter_input_value(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        pos: Pos,
        expected_type: &Option<MetaTypeName<'a>>,
        value: &'a Value,
    ) {
    }
    fn exit_input_value(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        pos: Pos,
        expected_type: &Option<MetaTypeName<'a>>,
        value: &'a Value,
    ) {
    }
}

/// The empty rule chain.
pub struct VisitorNil;

impl VisitorNil {
    pub const fn with<V>(self, visitor: V) -> VisitorCons<Self, V> {
        VisitorCons(self, visitor)
    }
}

impl<'a> Visitor<'a> for VisitorNil {}

/// A rule chain: fires `A` before `B` on entry and `B` before `A` on exit.
pub struct VisitorCons<A, B>(A, B);

impl<A, B> VisitorCons<A, B> {
    pub const fn with<V>(self, visitor: V) -> VisitorCons<Self, V> {
        VisitorCons(self, visitor)
    }
}

macro_rules! visitor_cons_method {
    ($enter:ident, $exit:ident, $($arg:ident: $ty:ty),*) => {
        fn $enter(&mut self, ctx: &mut VisitorContext<'a>, $($arg: $ty),*) {
            self.0.$enter(ctx, $($arg),*);
            self.1.$enter(ctx, $($arg),*);
        }
        fn $exit(&mut self, ctx: &mut VisitorContext<'a>, $($arg: $ty),*) {
            self.1.$exit(ctx, $($arg),*);
            self.0.$exit(ctx, $($arg),*);
        }
    };
}

impl<'a, A, B> Visitor<'a> for VisitorCons<A, B>
where
    A: Visitor<'a>,
    B: Visitor<'a>,
{
    visitor_cons_method!(enter_document, exit_document, doc: &'a ExecutableDocument);
    visitor_cons_method!(
        enter_operation_definition,
        exit_operation_definition,
        name: Option<&'a Name>,
        operation: &'a Positioned<OperationDefinition>
    );
    visitor_cons_method!(
        enter_fragment_definition,
        exit_fragment_definition,
        name: &'a Name,
        fragment: &'a Positioned<FragmentDefinition>
    );
    visitor_cons_method!(
        enter_variable_definition,
        exit_variable_definition,
        variable_definition: &'a Positioned<VariableDefinition>
    );
    visitor_cons_method!(enter_directive, exit_directive, directive: &'a Positioned<Directive>);
    visitor_cons_method!(
        enter_argument,
        exit_argument,
        name: &'a Positioned<Name>,
        value: &'a Positioned<Value>
    );
    visitor_cons_method!(
        enter_selection_set,
        exit_selection_set,
        selection_set: &'a Positioned<SelectionSet>
    );
    visitor_cons_method!(enter_selection, exit_selection, selection: &'a Positioned<Selection>);
    visitor_cons_method!(enter_field, exit_field, field: &'a Positioned<Field>);
    visitor_cons_method!(
        enter_fragment_spread,
        exit_fragment_spread,
        fragment_spread: &'a Positioned<FragmentSpread>
    );
    visitor_cons_method!(
        enter_inline_fragment,
        exit_inline_fragment,
        inline_fragment: &'a Positioned<InlineFragment>
    );
    visitor_cons_method!(
        enter_input_value,
        exit_input_value,
        pos: Pos,
        expected_type: &Option<MetaTypeName<'a>>,
        value: &'a Value
    );
}

/// Walks the whole document, driving the visitor at every node.
///
/// Operations are visited first, then fragment definitions; within each
/// group the traversal follows name order so runs over the same document are
/// deterministic.
pub fn visit<'a, V: Visitor<'a>>(
    v: &mut V,
    ctx: &mut VisitorContext<'a>,
    doc: &'a ExecutableDocument,
) {
    v.enter_document(ctx, doc);
    match &doc.operations {
        DocumentOperations::Single(operation) => visit_operation_definition(v, ctx, None, operation),
        DocumentOperations::Multiple(operations) => {
            for (name, operation) in operations
                .iter()
                .sorted_by_key(|(name, _)| name.as_str())
            {
                visit_operation_definition(v, ctx, Some(name), operation);
            }
        }
    }
    for (name, fragment) in doc.fragments.iter().sorted_by_key(|(name, _)| name.as_str()) {
        visit_fragment_definition(v, ctx, name, fragment);
    }
    v.exit_document(ctx, doc);
}

fn visit_operation_definition<'a, V: Visitor<'a>>(
    v: &mut V,
    ctx: &mut VisitorContext<'a>,
    name: Option<&'a Name>,
    operation: &'a Positioned<OperationDefinition>,
) {
    ctx.too_deep_reported = false;
    let root = match operation.node.ty {
        OperationType::Query => Some(ctx.schema.query_type()),
        OperationType::Mutation => ctx.schema.mutation_type(),
        OperationType::Subscription => ctx.schema.subscription_type(),
    };
    ctx.push_frame(TypeFrame::Operation { root });
    v.enter_operation_definition(ctx, name, operation);
    for variable_definition in &operation.node.variable_definitions {
        visit_variable_definition(v, ctx, variable_definition);
    }
    visit_directives(v, ctx, &operation.node.directives);
    visit_selection_set(v, ctx, &operation.node.selection_set);
    v.exit_operation_definition(ctx, name, operation);
    ctx.pop_frame();
}

fn visit_fragment_definition<'a, V: Visitor<'a>>(
    v: &mut V,
    ctx: &mut VisitorContext<'a>,
    name: &'a Name,
    fragment: &'a Positioned<FragmentDefinition>,
) {
    ctx.too_deep_reported = false;
    let ty = ctx
        .schema
        .lookup_type(fragment.node.type_condition.node.on.node.as_str());
    ctx.push_frame(TypeFrame::Fragment { ty });
    v.enter_fragment_definition(ctx, name, fragment);
    visit_directives(v, ctx, &fragment.node.directives);
    visit_selection_set(v, ctx, &fragment.node.selection_set);
    v.exit_fragment_definition(ctx, name, fragment);
    ctx.pop_frame();
}

fn visit_variable_definition<'a, V: Visitor<'a>>(
    v: &mut V,
    ctx: &mut VisitorContext<'a>,
    variable_definition: &'a Positioned<VariableDefinition>,
) {
    ctx.push_frame(TypeFrame::VariableDefinition {
        ty: &variable_definition.node.var_type.node,
        default: variable_definition
            .node
            .default_value
            .as_ref()
            .map(|value| &value.node),
    });
    v.enter_variable_definition(ctx, variable_definition);
    v.exit_variable_definition(ctx, variable_definition);
    ctx.pop_frame();
}

fn visit_selection_set<'a, V: Visitor<'a>>(
    v: &mut V,
    ctx: &mut VisitorContext<'a>,
    selection_set: &'a Positioned<SelectionSet>,
) {
    if selection_set.node.items.is_empty() {
        return;
    }
    if ctx.nesting >= MAX_SELECTION_NESTING {
        ctx.report_too_deep(selection_set.pos);
        return;
    }
    ctx.nesting += 1;
    let scope = ctx.current_type();
    ctx.push_frame(TypeFrame::SelectionSet { scope });
    v.enter_selection_set(ctx, selection_set);
    for selection in &selection_set.node.items {
        visit_selection(v, ctx, selection);
    }
    v.exit_selection_set(ctx, selection_set);
    ctx.pop_frame();
    ctx.nesting -= 1;
}

fn visit_selection<'a, V: Visitor<'a>>(
    v: &mut V,
    ctx: &mut VisitorContext<'a>,
    selection: &'a Positioned<Selection>,
) {
    v.enter_selection(ctx, selection);
    match &selection.node {
        Selection::Field(field) => {
            let parent = ctx.parent_type();
            let def = parent.and_then(|parent| parent.field(field.node.name.node.as_str()));
            let ty = def.and_then(|def| {
                ctx.schema
                    .lookup_type(MetaTypeName::concrete_typename(&def.ty))
            });
            ctx.push_frame(TypeFrame::Field { def, ty });
            visit_field(v, ctx, field);
            ctx.pop_frame();
        }
        Selection::FragmentSpread(fragment_spread) => {
            v.enter_fragment_spread(ctx, fragment_spread);
            visit_directives(v, ctx, &fragment_spread.node.directives);
            v.exit_fragment_spread(ctx, fragment_spread);
        }
        Selection::InlineFragment(inline_fragment) => {
            let ty = match &inline_fragment.node.type_condition {
                Some(condition) => ctx.schema.lookup_type(condition.node.on.node.as_str()),
                // No condition keeps the enclosing type.
                None => ctx.current_type(),
            };
            ctx.push_frame(TypeFrame::Fragment { ty });
            v.enter_inline_fragment(ctx, inline_fragment);
            visit_directives(v, ctx, &inline_fragment.node.directives);
            visit_selection_set(v, ctx, &inline_fragment.node.selection_set);
            v.exit_inline_fragment(ctx, inline_fragment);
            ctx.pop_frame();
        }
    }
    v.exit_selection(ctx, selection);
}

fn visit_field<'a, V: Visitor<'a>>(
    v: &mut V,
    ctx: &mut VisitorContext<'a>,
    field: &'a Positioned<Field>,
) {
    v.enter_field(ctx, field);
    for (name, value) in &field.node.arguments {
        let def = ctx
            .field_def()
            .and_then(|def| def.argument(name.node.as_str()));
        visit_argument(v, ctx, def, name, value);
    }
    visit_directives(v, ctx, &field.node.directives);
    visit_selection_set(v, ctx, &field.node.selection_set);
    v.exit_field(ctx, field);
}

fn visit_directives<'a, V: Visitor<'a>>(
    v: &mut V,
    ctx: &mut VisitorContext<'a>,
    directives: &'a [Positioned<Directive>],
) {
    for directive in directives {
        let def = ctx.schema.directive(directive.node.name.node.as_str());
        ctx.push_frame(TypeFrame::Directive { def });
        v.enter_directive(ctx, directive);
        for (name, value) in &directive.node.arguments {
            let arg_def = def.and_then(|def| def.argument(name.node.as_str()));
            visit_argument(v, ctx, arg_def, name, value);
        }
        v.exit_directive(ctx, directive);
        ctx.pop_frame();
    }
}

fn visit_argument<'a, V: Visitor<'a>>(
    v: &mut V,
    ctx: &mut VisitorContext<'a>,
    def: Option<&'a MetaInputValue>,
    name: &'a Positioned<Name>,
    value: &'a Positioned<Value>,
) {
    ctx.push_frame(TypeFrame::Argument {
        def,
        ty: def.map(|def| def.ty.as_str()),
    });
    v.enter_argument(ctx, name, value);
    let expected_type = def.map(|def| MetaTypeName::create(&def.ty));
    visit_input_value(v, ctx, value.pos, expected_type, &value.node);
    v.exit_argument(ctx, name, value);
    ctx.pop_frame();
}

fn visit_input_value<'a, V: Visitor<'a>>(
    v: &mut V,
    ctx: &mut VisitorContext<'a>,
    pos: Pos,
    expected_type: Option<MetaTypeName<'a>>,
    value: &'a Value,
) {
    v.enter_input_value(ctx, pos, &expected_type, value);
    match value {
        Value::List(values) => {
            let item_type = match expected_type.map(|ty| ty.unwrap_non_null()) {
                Some(MetaTypeName::List(item)) => Some(item),
                _ => None,
            };
            ctx.push_frame(TypeFrame::ListValue { ty: item_type });
            for elem in values {
                visit_input_value(v, ctx, pos, item_type.map(MetaTypeName::create), elem);
            }
            ctx.pop_frame();
        }
        Value::Object(values) => {
            let input_object = expected_type
                .map(|ty| match ty {
                    MetaTypeName::Named(name) => name,
                    MetaTypeName::NonNull(inner) | MetaTypeName::List(inner) => {
                        MetaTypeName::concrete_typename(inner)
                    }
                })
                .and_then(|name| ctx.schema.lookup_type(name));
            for (name, elem) in values {
                let field_type = input_object
                    .and_then(|ty| ty.input_field(name.as_str()))
                    .map(|field| field.ty.as_str());
                ctx.push_frame(TypeFrame::ObjectField { ty: field_type });
                visit_input_value(v, ctx, pos, field_type.map(MetaTypeName::create), elem);
                ctx.pop_frame();
            }
        }
        _ => {}
    }
    v.exit_input_value(ctx, pos, &expected_type, value);
}
