//! Ensures that any two fields that can end up under the same response key
//! for the same runtime object are guaranteed to merge: same field, same
//! arguments, compatible return types, and recursively mergeable
//! sub-selections.
//!
//! Per-selection-set field collections are cached by node identity and
//! fragment pairs are compared at most once per exclusivity mode, which keeps
//! the check near-linear on documents with heavy fragment sharing.

use std::{collections::HashMap, rc::Rc};

use async_graphql_parser::{
    types::{Field, FragmentDefinition, Selection, SelectionSet},
    Positioned,
};
use async_graphql_value::Value;
use indexmap::IndexMap;
use itertools::Itertools;

use crate::{
    registry::{MetaType, Schema},
    type_name::MetaTypeName,
    utils::resolve_value,
    visitor::{Visitor, VisitorContext, MAX_SELECTION_NESTING},
    Variables,
};

const CODE: &str = "field-selection-merging";

#[derive(Default)]
pub struct OverlappingFieldsCanBeMerged<'a> {
    /// Field collections per selection set, keyed by the node's address.
    cached_fields: HashMap<usize, Rc<FieldsAndFragmentNames<'a>>>,
    compared_fragment_pairs: PairSet<'a>,
}

#[derive(Debug, Clone, Copy)]
struct FieldEntry<'a> {
    parent: Option<&'a MetaType>,
    field: &'a Positioned<Field>,
    def_type: Option<&'a str>,
}

type FieldMap<'a> = IndexMap<&'a str, Vec<FieldEntry<'a>>>;

struct FieldsAndFragmentNames<'a> {
    field_map: FieldMap<'a>,
    fragment_names: Vec<&'a str>,
}

/// Remembers which fragment pairs were already compared. A pair compared
/// without mutual exclusivity subsumes the exclusive comparison, but not the
/// other way around.
#[derive(Default)]
struct PairSet<'a> {
    data: HashMap<(&'a str, &'a str), bool>,
}

impl<'a> PairSet<'a> {
    fn contains(&self, left: &'a str, right: &'a str, mutually_exclusive: bool) -> bool {
        match self.data.get(&Self::key(left, right)) {
            None => false,
            Some(stored) => mutually_exclusive || !*stored,
        }
    }

    fn insert(&mut self, left: &'a str, right: &'a str, mutually_exclusive: bool) {
        self.data.insert(Self::key(left, right), mutually_exclusive);
    }

    fn key(left: &'a str, right: &'a str) -> (&'a str, &'a str) {
        if left <= right {
            (left, right)
        } else {
            (right, left)
        }
    }
}

struct Conflict<'a> {
    reason: ConflictReason,
    fields_left: Vec<&'a Positioned<Field>>,
    fields_right: Vec<&'a Positioned<Field>>,
}

struct ConflictReason {
    response_name: String,
    message: ConflictReasonMessage,
}

enum ConflictReasonMessage {
    Message(String),
    Nested(Vec<ConflictReason>),
}

fn render_reason(message: &ConflictReasonMessage) -> String {
    match message {
        ConflictReasonMessage::Message(message) => message.clone(),
        ConflictReasonMessage::Nested(reasons) => reasons
            .iter()
            .map(|reason| {
                format!(
                    "subfields \"{}\" conflict because {}",
                    reason.response_name,
                    render_reason(&reason.message),
                )
            })
            .join(" and "),
    }
}

fn response_name(field: &Field) -> &str {
    field
        .alias
        .as_ref()
        .map(|alias| alias.node.as_str())
        .unwrap_or(field.name.node.as_str())
}

fn collect_fields<'a>(
    schema: &'a Schema,
    parent: Option<&'a MetaType>,
    selection_set: &'a SelectionSet,
    depth: usize,
    field_map: &mut FieldMap<'a>,
    fragment_names: &mut Vec<&'a str>,
) {
    // The walker reports over-deep documents; beyond the cap there is
    // nothing useful left to compare.
    if depth > MAX_SELECTION_NESTING {
        return;
    }
    for selection in &selection_set.items {
        match &selection.node {
            Selection::Field(field) => {
                let def = parent.and_then(|parent| parent.field(field.node.name.node.as_str()));
                field_map
                    .entry(response_name(&field.node))
                    .or_default()
                    .push(FieldEntry {
                        parent,
                        field,
                        def_type: def.map(|def| def.ty.as_str()),
                    });
            }
            Selection::FragmentSpread(spread) => {
                let name = spread.node.fragment_name.node.as_str();
                if !fragment_names.contains(&name) {
                    fragment_names.push(name);
                }
            }
            Selection::InlineFragment(inline) => {
                let inline_parent = match &inline.node.type_condition {
                    Some(condition) => schema.lookup_type(condition.node.on.node.as_str()),
                    None => parent,
                };
                collect_fields(
                    schema,
                    inline_parent,
                    &inline.node.selection_set.node,
                    depth + 1,
                    field_map,
                    fragment_names,
                );
            }
        }
    }
}

fn same_arguments(
    left: &[(Positioned<async_graphql_value::Name>, Positioned<Value>)],
    right: &[(Positioned<async_graphql_value::Name>, Positioned<Value>)],
    variables: Option<&Variables>,
) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter().all(|(name, value)| {
        right
            .iter()
            .find(|(other_name, _)| other_name.node == name.node)
            .is_some_and(|(_, other_value)| same_value(&value.node, &other_value.node, variables))
    })
}

fn same_value(left: &Value, right: &Value, variables: Option<&Variables>) -> bool {
    match (resolve_value(left, variables), resolve_value(right, variables)) {
        (Some(left), Some(right)) => left == right,
        // With unbound variables, equality falls back to the syntactic form.
        _ => left == right,
    }
}

/// Whether two return types cannot both describe one response position:
/// differing wrappers always conflict, and differing leaf types conflict.
/// Composite named types may still merge through their common subtypes.
fn types_conflict(schema: &Schema, left: &str, right: &str) -> bool {
    match (MetaTypeName::create(left), MetaTypeName::create(right)) {
        (MetaTypeName::List(left), MetaTypeName::List(right)) => {
            types_conflict(schema, left, right)
        }
        (MetaTypeName::List(_), _) | (_, MetaTypeName::List(_)) => true,
        (MetaTypeName::NonNull(left), MetaTypeName::NonNull(right)) => {
            types_conflict(schema, left, right)
        }
        (MetaTypeName::NonNull(_), _) | (_, MetaTypeName::NonNull(_)) => true,
        (MetaTypeName::Named(left), MetaTypeName::Named(right)) => {
            let is_leaf =
                |name: &str| schema.lookup_type(name).map_or(true, MetaType::is_leaf);
            if is_leaf(left) || is_leaf(right) {
                left != right
            } else {
                false
            }
        }
    }
}

impl<'a> OverlappingFieldsCanBeMerged<'a> {
    fn fields_and_fragment_names(
        &mut self,
        ctx: &VisitorContext<'a>,
        parent: Option<&'a MetaType>,
        selection_set: &'a Positioned<SelectionSet>,
    ) -> Rc<FieldsAndFragmentNames<'a>> {
        let key = std::ptr::from_ref(selection_set) as usize;
        if let Some(cached) = self.cached_fields.get(&key) {
            return Rc::clone(cached);
        }
        let mut field_map = FieldMap::default();
        let mut fragment_names = Vec::new();
        collect_fields(
            ctx.schema(),
            parent,
            &selection_set.node,
            0,
            &mut field_map,
            &mut fragment_names,
        );
        let entry = Rc::new(FieldsAndFragmentNames {
            field_map,
            fragment_names,
        });
        self.cached_fields.insert(key, Rc::clone(&entry));
        entry
    }

    fn referenced_fields_and_fragment_names(
        &mut self,
        ctx: &VisitorContext<'a>,
        fragment: &'a Positioned<FragmentDefinition>,
    ) -> Rc<FieldsAndFragmentNames<'a>> {
        let parent = ctx
            .schema()
            .lookup_type(fragment.node.type_condition.node.on.node.as_str());
        self.fields_and_fragment_names(ctx, parent, &fragment.node.selection_set)
    }

    fn find_conflicts_within_selection_set(
        &mut self,
        ctx: &VisitorContext<'a>,
        parent: Option<&'a MetaType>,
        selection_set: &'a Positioned<SelectionSet>,
    ) -> Vec<Conflict<'a>> {
        let mut conflicts = Vec::new();
        let fields = self.fields_and_fragment_names(ctx, parent, selection_set);
        self.collect_conflicts_within(ctx, &mut conflicts, &fields.field_map);
        for (i, &fragment_name) in fields.fragment_names.iter().enumerate() {
            self.collect_conflicts_between_fields_and_fragment(
                ctx,
                &mut conflicts,
                false,
                &fields,
                fragment_name,
                0,
            );
            for &other_name in &fields.fragment_names[i + 1..] {
                self.collect_conflicts_between_fragments(
                    ctx,
                    &mut conflicts,
                    false,
                    fragment_name,
                    other_name,
                    0,
                );
            }
        }
        conflicts
    }

    fn collect_conflicts_within(
        &mut self,
        ctx: &VisitorContext<'a>,
        conflicts: &mut Vec<Conflict<'a>>,
        field_map: &FieldMap<'a>,
    ) {
        for (response_name, fields) in field_map {
            if fields.len() < 2 {
                continue;
            }
            for (left, right) in fields.iter().tuple_combinations() {
                if let Some(conflict) = self.find_conflict(ctx, false, response_name, left, right, 0)
                {
                    conflicts.push(conflict);
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_conflicts_between(
        &mut self,
        ctx: &VisitorContext<'a>,
        conflicts: &mut Vec<Conflict<'a>>,
        mutually_exclusive: bool,
        field_map_left: &FieldMap<'a>,
        field_map_right: &FieldMap<'a>,
        depth: usize,
    ) {
        for (response_name, fields_left) in field_map_left {
            let Some(fields_right) = field_map_right.get(response_name) else {
                continue;
            };
            for left in fields_left {
                for right in fields_right {
                    if let Some(conflict) = self.find_conflict(
                        ctx,
                        mutually_exclusive,
                        response_name,
                        left,
                        right,
                        depth,
                    ) {
                        conflicts.push(conflict);
                    }
                }
            }
        }
    }

    fn collect_conflicts_between_fields_and_fragment(
        &mut self,
        ctx: &VisitorContext<'a>,
        conflicts: &mut Vec<Conflict<'a>>,
        mutually_exclusive: bool,
        fields: &Rc<FieldsAndFragmentNames<'a>>,
        fragment_name: &'a str,
        depth: usize,
    ) {
        let Some(fragment) = ctx.fragment(fragment_name) else {
            return;
        };
        let referenced = self.referenced_fields_and_fragment_names(ctx, fragment);
        // A fragment spread directly inside its own selection set compares
        // against itself; nothing new can come of it.
        if Rc::ptr_eq(fields, &referenced) {
            return;
        }
        self.collect_conflicts_between(
            ctx,
            conflicts,
            mutually_exclusive,
            &fields.field_map,
            &referenced.field_map,
            depth,
        );
        for &referenced_fragment in &referenced.fragment_names {
            if self
                .compared_fragment_pairs
                .contains(referenced_fragment, fragment_name, mutually_exclusive)
            {
                continue;
            }
            self.compared_fragment_pairs
                .insert(referenced_fragment, fragment_name, mutually_exclusive);
            self.collect_conflicts_between_fields_and_fragment(
                ctx,
                conflicts,
                mutually_exclusive,
                fields,
                referenced_fragment,
                depth,
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_conflicts_between_fragments(
        &mut self,
        ctx: &VisitorContext<'a>,
        conflicts: &mut Vec<Conflict<'a>>,
        mutually_exclusive: bool,
        fragment_name_left: &'a str,
        fragment_name_right: &'a str,
        depth: usize,
    ) {
        if fragment_name_left == fragment_name_right {
            return;
        }
        if self.compared_fragment_pairs.contains(
            fragment_name_left,
            fragment_name_right,
            mutually_exclusive,
        ) {
            return;
        }
        self.compared_fragment_pairs
            .insert(fragment_name_left, fragment_name_right, mutually_exclusive);

        let (Some(fragment_left), Some(fragment_right)) = (
            ctx.fragment(fragment_name_left),
            ctx.fragment(fragment_name_right),
        ) else {
            return;
        };
        let left = self.referenced_fields_and_fragment_names(ctx, fragment_left);
        let right = self.referenced_fields_and_fragment_names(ctx, fragment_right);
        self.collect_conflicts_between(
            ctx,
            conflicts,
            mutually_exclusive,
            &left.field_map,
            &right.field_map,
            depth,
        );
        for &referenced_right in &right.fragment_names {
            self.collect_conflicts_between_fragments(
                ctx,
                conflicts,
                mutually_exclusive,
                fragment_name_left,
                referenced_right,
                depth,
            );
        }
        for &referenced_left in &left.fragment_names {
            self.collect_conflicts_between_fragments(
                ctx,
                conflicts,
                mutually_exclusive,
                referenced_left,
                fragment_name_right,
                depth,
            );
        }
    }

    fn find_conflict(
        &mut self,
        ctx: &VisitorContext<'a>,
        parents_mutually_exclusive: bool,
        response_name: &str,
        left: &FieldEntry<'a>,
        right: &FieldEntry<'a>,
        depth: usize,
    ) -> Option<Conflict<'a>> {
        // Fields reached through sibling object-typed conditions can never
        // apply to the same runtime object, so their shapes may differ.
        let mutually_exclusive = parents_mutually_exclusive
            || match (left.parent, right.parent) {
                (Some(left_parent), Some(right_parent)) => {
                    left_parent.name() != right_parent.name()
                        && left_parent.is_object()
                        && right_parent.is_object()
                }
                _ => false,
            };

        if !mutually_exclusive {
            let name_left = left.field.node.name.node.as_str();
            let name_right = right.field.node.name.node.as_str();
            if name_left != name_right {
                return Some(Conflict {
                    reason: ConflictReason {
                        response_name: response_name.to_string(),
                        message: ConflictReasonMessage::Message(format!(
                            "\"{name_left}\" and \"{name_right}\" are different fields"
                        )),
                    },
                    fields_left: vec![left.field],
                    fields_right: vec![right.field],
                });
            }
            if !same_arguments(
                &left.field.node.arguments,
                &right.field.node.arguments,
                ctx.variables(),
            ) {
                return Some(Conflict {
                    reason: ConflictReason {
                        response_name: response_name.to_string(),
                        message: ConflictReasonMessage::Message(
                            "they have differing arguments".to_string(),
                        ),
                    },
                    fields_left: vec![left.field],
                    fields_right: vec![right.field],
                });
            }
        }

        // Return types must be compatible even between mutually exclusive
        // fields, since both shapes land under one response key.
        if let (Some(type_left), Some(type_right)) = (left.def_type, right.def_type) {
            if types_conflict(ctx.schema(), type_left, type_right) {
                return Some(Conflict {
                    reason: ConflictReason {
                        response_name: response_name.to_string(),
                        message: ConflictReasonMessage::Message(format!(
                            "they return conflicting types \"{type_left}\" and \"{type_right}\""
                        )),
                    },
                    fields_left: vec![left.field],
                    fields_right: vec![right.field],
                });
            }
        }

        let selection_set_left = &left.field.node.selection_set;
        let selection_set_right = &right.field.node.selection_set;
        if !selection_set_left.node.items.is_empty() && !selection_set_right.node.items.is_empty() {
            let named_type = |def_type: Option<&'a str>| {
                def_type.and_then(|ty| {
                    ctx.schema().lookup_type(MetaTypeName::concrete_typename(ty))
                })
            };
            let sub_conflicts = self.find_conflicts_between_sub_selection_sets(
                ctx,
                mutually_exclusive,
                named_type(left.def_type),
                selection_set_left,
                named_type(right.def_type),
                selection_set_right,
                depth + 1,
            );
            return subfield_conflicts(
                sub_conflicts,
                response_name,
                left.field,
                right.field,
            );
        }
        None
    }

    #[allow(clippy::too_many_arguments)]
    fn find_conflicts_between_sub_selection_sets(
        &mut self,
        ctx: &VisitorContext<'a>,
        mutually_exclusive: bool,
        parent_left: Option<&'a MetaType>,
        selection_set_left: &'a Positioned<SelectionSet>,
        parent_right: Option<&'a MetaType>,
        selection_set_right: &'a Positioned<SelectionSet>,
        depth: usize,
    ) -> Vec<Conflict<'a>> {
        let mut conflicts = Vec::new();
        if depth > MAX_SELECTION_NESTING {
            return conflicts;
        }
        let left = self.fields_and_fragment_names(ctx, parent_left, selection_set_left);
        let right = self.fields_and_fragment_names(ctx, parent_right, selection_set_right);

        self.collect_conflicts_between(
            ctx,
            &mut conflicts,
            mutually_exclusive,
            &left.field_map,
            &right.field_map,
            depth,
        );
        for &fragment_name in &right.fragment_names {
            self.collect_conflicts_between_fields_and_fragment(
                ctx,
                &mut conflicts,
                mutually_exclusive,
                &left,
                fragment_name,
                depth,
            );
        }
        for &fragment_name in &left.fragment_names {
            self.collect_conflicts_between_fields_and_fragment(
                ctx,
                &mut conflicts,
                mutually_exclusive,
                &right,
                fragment_name,
                depth,
            );
        }
        for &fragment_name_left in &left.fragment_names {
            for &fragment_name_right in &right.fragment_names {
                self.collect_conflicts_between_fragments(
                    ctx,
                    &mut conflicts,
                    mutually_exclusive,
                    fragment_name_left,
                    fragment_name_right,
                    depth,
                );
            }
        }
        conflicts
    }
}

fn subfield_conflicts<'a>(
    conflicts: Vec<Conflict<'a>>,
    response_name: &str,
    field_left: &'a Positioned<Field>,
    field_right: &'a Positioned<Field>,
) -> Option<Conflict<'a>> {
    if conflicts.is_empty() {
        return None;
    }
    let mut fields_left = vec![field_left];
    let mut fields_right = vec![field_right];
    let mut reasons = Vec::new();
    for conflict in conflicts {
        reasons.push(conflict.reason);
        fields_left.extend(conflict.fields_left);
        fields_right.extend(conflict.fields_right);
    }
    Some(Conflict {
        reason: ConflictReason {
            response_name: response_name.to_string(),
            message: ConflictReasonMessage::Nested(reasons),
        },
        fields_left,
        fields_right,
    })
}

impl<'a> Visitor<'a> for OverlappingFieldsCanBeMerged<'a> {
    fn enter_selection_set(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        selection_set: &'a Positioned<SelectionSet>,
    ) {
        let parent = ctx.parent_type();
        let conflicts = self.find_conflicts_within_selection_set(ctx, parent, selection_set);
        for conflict in conflicts {
            let locations = conflict
                .fields_left
                .iter()
                .chain(&conflict.fields_right)
                .map(|field| field.pos)
                .collect();
            ctx.report_error(
                CODE,
                locations,
                format!(
                    "Fields \"{}\" conflict because {}. Use different aliases on the fields to fetch both if this was intentional",
                    conflict.reason.response_name,
                    render_reason(&conflict.reason.message),
                ),
            );
        }
    }
}
