//! Per-state input coverage analysis.
//!
//! The outgoing transitions of a state should exactly partition its input
//! space: every concrete input combination reached by exactly one
//! transition. The analyzer reports gaps and overlaps separately so the
//! editor can highlight the state accordingly.
//!
//! Coverage problems never block verification: a state with a gap or an
//! overlap produces missing or conflicting expectations, and the
//! table/diagram verifier reports the resulting mismatch on its own.

use crate::{enumerate_combos, expand, resize_bits, Transition};
use bit_set::BitSet;
use itertools::Itertools;
use std::collections::HashMap;

/// Coverage flags for one state.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Coverage {
    /// Some input combination is reached by no transition
    pub missing: bool,
    /// Some input combination is reached by more than one transition
    pub overfull: bool,
}

impl Coverage {
    /// Test if the outgoing transitions exactly partition the input space
    pub fn is_exact(&self) -> bool {
        !self.missing && !self.overfull
    }
}

/// Analyze the input coverage of one state's outgoing transitions.
///
/// Each transition's input condition is expanded into concrete
/// combinations and tallied. With no inputs there is no coverage concept
/// and both flags stay false.
///
/// ```
/// use fsmkit::{evaluate_coverage, Transition};
///
/// let transitions = vec![
///     Transition::new(0, 0, 1, "1"),
///     Transition::new(1, 0, 0, "0"),
/// ];
/// assert!(evaluate_coverage(0, &transitions, 1).is_exact());
/// ```
pub fn evaluate_coverage(state_id: usize, transitions: &[Transition], input_count: usize) -> Coverage {
    if input_count == 0 {
        return Coverage::default();
    }
    let expected = 1usize << input_count;
    let mut seen = BitSet::with_capacity(expected);
    let mut overfull = false;
    for tr in transitions.iter().filter(|tr| tr.from == state_id) {
        for combo in expand(&resize_bits(&tr.input_values, input_count)) {
            let idx = usize::from_str_radix(&combo, 2).unwrap_or(0);
            if !seen.insert(idx) {
                overfull = true;
            }
        }
    }
    Coverage {
        missing: seen.len() < expected,
        overfull,
    }
}

/// Build an advisory message describing a state's coverage problems.
///
/// Returns `None` when the coverage is exact. Missing combinations are
/// listed explicitly to help the user complete the diagram.
pub fn describe_coverage(
    state_id: usize,
    transitions: &[Transition],
    input_count: usize,
) -> Option<String> {
    if input_count == 0 {
        return None;
    }
    let mut counts: HashMap<String, usize> = HashMap::new();
    for tr in transitions.iter().filter(|tr| tr.from == state_id) {
        for combo in expand(&resize_bits(&tr.input_values, input_count)) {
            *counts.entry(combo).or_insert(0) += 1;
        }
    }
    let missing = enumerate_combos(input_count)
        .into_iter()
        .filter(|combo| !counts.contains_key(combo))
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Some(format!(
            "State {} is missing input combinations: {}",
            state_id,
            missing.iter().join(", ")
        ));
    }
    if counts.values().any(|count| *count > 1) {
        return Some(format!(
            "State {} has overlapping or extra input combinations",
            state_id
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use crate::coverage::*;
    use crate::Transition;

    fn exact_transitions() -> Vec<Transition> {
        vec![
            Transition::new(0, 0, 0, "00"),
            Transition::new(1, 0, 1, "01"),
            Transition::new(2, 0, 1, "10"),
            Transition::new(3, 0, 0, "11"),
        ]
    }

    #[test]
    fn exact_partition() {
        let coverage = evaluate_coverage(0, &exact_transitions(), 2);
        assert!(coverage.is_exact());
        assert_eq!(describe_coverage(0, &exact_transitions(), 2), None);
    }

    #[test]
    fn removing_a_transition_leaves_a_gap() {
        let mut transitions = exact_transitions();
        transitions.pop();
        let coverage = evaluate_coverage(0, &transitions, 2);
        assert!(coverage.missing);
        assert!(!coverage.overfull);
        let reason = describe_coverage(0, &transitions, 2).unwrap();
        assert!(reason.contains("missing input combinations: 11"));
    }

    #[test]
    fn duplicating_a_pattern_overlaps() {
        let mut transitions = exact_transitions();
        transitions.push(Transition::new(4, 0, 1, "01"));
        let coverage = evaluate_coverage(0, &transitions, 2);
        assert!(!coverage.missing);
        assert!(coverage.overfull);
        assert!(describe_coverage(0, &transitions, 2)
            .unwrap()
            .contains("overlapping"));
    }

    #[test]
    fn wildcards_expand_before_tallying() {
        // a single X-X transition covers all four combinations of two inputs
        let transitions = vec![Transition::new(0, 0, 0, "XX")];
        assert!(evaluate_coverage(0, &transitions, 2).is_exact());

        // X overlapping a concrete pattern is a duplicate
        let transitions = vec![
            Transition::new(0, 0, 0, "X"),
            Transition::new(1, 0, 1, "1"),
        ];
        let coverage = evaluate_coverage(0, &transitions, 1);
        assert!(coverage.overfull);
    }

    #[test]
    fn no_inputs_no_coverage() {
        assert!(evaluate_coverage(0, &[], 0).is_exact());
        assert_eq!(describe_coverage(0, &[], 0), None);
    }

    #[test]
    fn other_states_are_ignored() {
        let transitions = vec![Transition::new(0, 1, 0, "X")];
        let coverage = evaluate_coverage(0, &transitions, 1);
        assert!(coverage.missing);
    }
}
