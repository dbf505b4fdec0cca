use std::collections::{HashMap, HashSet, VecDeque};

use async_graphql_parser::{
    types::{FragmentDefinition, FragmentSpread, Selection, SelectionSet},
    Positioned,
};
use async_graphql_value::Name;
use itertools::Itertools;

use crate::visitor::{Visitor, VisitorContext};

const CODE: &str = "no-fragment-cycles";

/// How many fragment spreads deep the cycle search will follow before giving
/// up on a chain. Chains this long without a cycle are pathological, and the
/// cap keeps the recursion bounded.
const MAX_SPREAD_DEPTH: usize = 64;

/// Detects cycles in the fragment spread graph by walking the direct spreads
/// of each fragment depth-first. Every fragment is expanded at most once per
/// run; an edge back to a fragment on the current path is a cycle.
#[derive(Default)]
pub struct NoFragmentCycles<'a> {
    visited: HashSet<&'a str>,
    spread_path: Vec<&'a Positioned<FragmentSpread>>,
    spread_path_index: HashMap<&'a str, usize>,
    too_deep_reported: bool,
}

/// The spreads that appear in this selection set without crossing another
/// fragment boundary, in document order.
fn direct_fragment_spreads<'a>(
    selection_set: &'a SelectionSet,
) -> Vec<&'a Positioned<FragmentSpread>> {
    let mut spreads = Vec::new();
    let mut pending = VecDeque::from([selection_set]);
    while let Some(set) = pending.pop_front() {
        for selection in &set.items {
            match &selection.node {
                Selection::Field(field) => pending.push_back(&field.node.selection_set.node),
                Selection::FragmentSpread(spread) => spreads.push(spread),
                Selection::InlineFragment(inline) => {
                    pending.push_back(&inline.node.selection_set.node);
                }
            }
        }
    }
    spreads
}

impl<'a> NoFragmentCycles<'a> {
    fn detect_cycle(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: &'a str,
        fragment: &'a Positioned<FragmentDefinition>,
    ) {
        if !self.visited.insert(name) {
            return;
        }
        if self.spread_path.len() >= MAX_SPREAD_DEPTH {
            if !self.too_deep_reported {
                self.too_deep_reported = true;
                ctx.report_error(
                    CODE,
                    vec![fragment.pos],
                    format!("Fragment spreads are nested deeper than {MAX_SPREAD_DEPTH} levels"),
                );
            }
            return;
        }

        let spreads = direct_fragment_spreads(&fragment.node.selection_set.node);
        if spreads.is_empty() {
            return;
        }

        self.spread_path_index.insert(name, self.spread_path.len());
        for spread in spreads {
            let spread_name: &'a str = spread.node.fragment_name.node.as_str();
            self.spread_path.push(spread);
            if let Some(&cycle_index) = self.spread_path_index.get(spread_name) {
                let cycle_path = &self.spread_path[cycle_index..];
                let via = if cycle_path.len() > 1 {
                    format!(
                        " via {}",
                        cycle_path[..cycle_path.len() - 1]
                            .iter()
                            .map(|spread| format!("\"{}\"", spread.node.fragment_name.node))
                            .join(", "),
                    )
                } else {
                    String::new()
                };
                let locations = cycle_path.iter().map(|spread| spread.pos).collect();
                ctx.report_error(
                    CODE,
                    locations,
                    format!("Cannot spread fragment \"{spread_name}\" within itself{via}"),
                );
            } else if let Some(target) = ctx.fragment(spread_name) {
                self.detect_cycle(ctx, spread_name, target);
            }
            self.spread_path.pop();
        }
        self.spread_path_index.remove(name);
    }
}

impl<'a> Visitor<'a> for NoFragmentCycles<'a> {
    fn enter_fragment_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: &'a Name,
        fragment: &'a Positioned<FragmentDefinition>,
    ) {
        self.detect_cycle(ctx, name.as_str(), fragment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn factory<'a>() -> NoFragmentCycles<'a> {
        NoFragmentCycles::default()
    }

    #[test]
    fn single_reference_is_valid() {
        expect_passes_rule!(
            factory,
            r"
            fragment fragA on Dog { ...fragB }
            fragment fragB on Dog { name }
            { dog { ...fragA } }
            ",
        );
    }

    #[test]
    fn spreading_twice_is_not_circular() {
        expect_passes_rule!(
            factory,
            r"
            fragment fragA on Dog { ...fragB, ...fragB }
            fragment fragB on Dog { name }
            { dog { ...fragA } }
            ",
        );
    }

    #[test]
    fn diamond_reference_is_not_circular() {
        expect_passes_rule!(
            factory,
            r"
            fragment fragA on Dog { ...fragB, ...fragC }
            fragment fragB on Dog { ...fragD }
            fragment fragC on Dog { ...fragD }
            fragment fragD on Dog { name }
            { dog { ...fragA } }
            ",
        );
    }

    #[test]
    fn unknown_spread_targets_are_ignored() {
        expect_passes_rule!(
            factory,
            r"
            fragment fragA on Dog { ...fragUnknown }
            { dog { ...fragA } }
            ",
        );
    }

    #[test]
    fn self_spread_is_circular() {
        expect_fails_rule!(
            factory,
            r"
            fragment fragA on Dog { ...fragA }
            { dog { ...fragA } }
            ",
        );
    }

    #[test]
    fn self_spread_within_inline_fragment_is_circular() {
        expect_fails_rule!(
            factory,
            r"
            fragment fragA on Pet {
                ... on Dog { ...fragA }
            }
            { pet { ...fragA } }
            ",
        );
    }

    #[test]
    fn mutual_spread_is_circular() {
        expect_fails_rule!(
            factory,
            r"
            fragment fragA on Dog { ...fragB }
            fragment fragB on Dog { ...fragA }
            { dog { ...fragA } }
            ",
        );
    }

    #[test]
    fn long_chain_back_edge_is_circular() {
        expect_fails_rule!(
            factory,
            r"
            fragment fragA on Dog { ...fragB }
            fragment fragB on Dog { ...fragC }
            fragment fragC on Dog { ...fragA }
            { dog { ...fragA } }
            ",
        );
    }

    #[test]
    fn cycle_error_names_the_path() {
        let schema = crate::test_harness::test_schema();
        let doc = async_graphql_parser::parse_query(
            r"
            fragment fragA on Dog { ...fragB }
            fragment fragB on Dog { ...fragA }
            { dog { ...fragA } }
            ",
        )
        .unwrap();
        let errors = crate::test_harness::validate_with(&schema, &doc, None, factory());
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "Cannot spread fragment \"fragA\" within itself via \"fragB\""
        );
        assert_eq!(errors[0].locations.len(), 2);
    }

    #[test]
    fn each_cycle_is_reported_once() {
        let schema = crate::test_harness::test_schema();
        let doc = async_graphql_parser::parse_query(
            r"
            fragment fragA on Dog { ...fragA }
            { dog { ...fragA } }
            ",
        )
        .unwrap();
        let errors = crate::test_harness::validate_with(&schema, &doc, None, factory());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Cannot spread fragment \"fragA\" within itself");
    }
}
