//! Compile diagram transitions into ground-truth expectations.
//!
//! The expectation map associates every concrete (state bits, input bits)
//! pair reached by some transition with the next-state bits and output
//! bits the diagram promises for it. It is rebuilt from scratch on every
//! verification pass and serves as the reference the transition table is
//! checked against.

use crate::{
    bits_compatible, expand, pattern_string, resize_bits, Machine, MachineKind, FsmState, Ternary,
    Transition,
};
use log::debug;
use std::collections::{HashMap, HashSet};

/// The promised behavior for one concrete (state, input) pair.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Expectation {
    /// Concrete next-state bits
    pub next_state_bits: Vec<Ternary>,
    /// Output bits; may contain free symbols on Mealy transitions
    pub outputs: Vec<Ternary>,
    /// Source state bits this entry was derived from
    pub state_bits: String,
    /// Concrete input combination (empty with no inputs)
    pub input_combo: String,
    /// Literal input pattern of the source transition, before expansion
    pub input_pattern: String,
}

/// The compiled expectation map plus a global consistency flag.
///
/// `conflict` is raised whenever the diagram disagrees with itself: a
/// state code that cannot be resolved, an unspecified output bit, two
/// transitions promising different behavior for the same concrete pair,
/// or duplicated state codes making lookups ambiguous.
#[derive(Clone, Debug, Default)]
pub struct DiagramExpectations {
    /// Entries keyed by `stateBits|inputCombo` (`stateBits|none` without inputs)
    pub expectations: HashMap<String, Expectation>,
    /// The diagram is internally inconsistent
    pub conflict: bool,
}

/// Build the lookup key for a concrete (state bits, input combo) pair.
pub fn expectation_key(state_bits: &str, input_combo: &str) -> String {
    match input_combo.is_empty() {
        true => format!("{}|none", state_bits),
        false => format!("{}|{}", state_bits, input_combo),
    }
}

fn find_state<'a>(states: &'a [FsmState], id: usize) -> Option<&'a FsmState> {
    states.iter().find(|st| st.id == id)
}

/// Outputs promised by a transition, depending on the machine kind.
///
/// Moore outputs are the source state's static output vector; the
/// transition itself carries no output. Mealy outputs come from the
/// transition.
fn outputs_for_transition(
    machine: &Machine,
    tr: &Transition,
    source: &FsmState,
) -> Vec<Option<Ternary>> {
    match machine.kind {
        MachineKind::Moore => resize_bits(&source.outputs, machine.output_count()),
        MachineKind::Mealy => resize_bits(&tr.output_values, machine.output_count()),
    }
}

/// Compile the diagram's transitions into an expectation map.
///
/// Every transition is resolved to concrete source/target bits, its input
/// condition expanded, and one entry recorded per concrete combination.
/// Unresolvable states and unspecified next-state or output bits raise the
/// conflict flag and skip the transition; disagreements between entries for
/// the same key raise the conflict flag globally.
pub fn build_diagram_expectations(
    machine: &Machine,
    states: &[FsmState],
    transitions: &[Transition],
) -> DiagramExpectations {
    let bit_count = machine.bit_count();
    let mut result = DiagramExpectations::default();

    // duplicated codes make every lookup ambiguous
    let mut codes = HashSet::new();
    for st in states {
        if let Some(code) = st.binary_code(bit_count) {
            if !codes.insert(code) {
                debug!("duplicated state code in diagram, marking conflict");
                result.conflict = true;
            }
        }
    }

    for tr in transitions {
        let source = match find_state(states, tr.from) {
            Some(st) => st,
            None => {
                debug!("transition {} has an unresolvable source state", tr.id);
                result.conflict = true;
                continue;
            }
        };
        let source_bits = match source.binary_code(bit_count) {
            Some(bits) => bits,
            None => {
                debug!("transition {} has an unresolvable source state", tr.id);
                result.conflict = true;
                continue;
            }
        };
        let next_bits = find_state(states, tr.to).and_then(|st| st.binary_code(bit_count));
        let next_state_bits: Vec<Ternary> = match next_bits {
            Some(bits) => bits
                .chars()
                .filter_map(|c| Ternary::normalize(&c.to_string()))
                .collect(),
            None => {
                debug!("transition {} has an unresolvable target state", tr.id);
                result.conflict = true;
                continue;
            }
        };
        // outputs must be determinate: a blank bit is a conflict, not a wildcard
        let raw_outputs = outputs_for_transition(machine, tr, source);
        if next_state_bits.len() != bit_count || raw_outputs.contains(&None) {
            debug!("transition {} has unspecified next-state or output bits", tr.id);
            result.conflict = true;
            continue;
        }
        let outputs: Vec<Ternary> = raw_outputs.into_iter().flatten().collect();

        let input_values = resize_bits(&tr.input_values, machine.input_count());
        let input_pattern = pattern_string(&input_values);
        for combo in expand(&input_values) {
            let key = expectation_key(&source_bits, &combo);
            let record = Expectation {
                next_state_bits: next_state_bits.clone(),
                outputs: outputs.clone(),
                state_bits: source_bits.clone(),
                input_combo: combo,
                input_pattern: input_pattern.clone(),
            };
            match result.expectations.get(&key) {
                None => {
                    result.expectations.insert(key, record);
                }
                Some(existing) => {
                    if !bits_compatible(&existing.next_state_bits, &record.next_state_bits)
                        || !bits_compatible(&existing.outputs, &record.outputs)
                    {
                        debug!("conflicting expectations for key {}", key);
                        result.conflict = true;
                    } else if machine.kind == MachineKind::Mealy
                        && existing.input_pattern != record.input_pattern
                    {
                        // two Mealy transitions fanning into the same combo
                        // with different wildcard intents
                        debug!("ambiguous Mealy fan-in for key {}", key);
                        result.conflict = true;
                    }
                }
            }
        }
    }
    debug!(
        "diagram expectations built: {} entries, conflict={}",
        result.expectations.len(),
        result.conflict
    );
    result
}

#[cfg(test)]
mod tests {
    use crate::expect::*;
    use crate::{FsmkitError, MachineKind};

    fn moore_machine() -> Machine {
        Machine::new(MachineKind::Moore, 2, &["X"], &["Z"]).unwrap()
    }

    fn moore_states() -> Vec<FsmState> {
        vec![
            FsmState::new(0, "0").with_outputs("0"),
            FsmState::new(1, "1").with_outputs("1"),
        ]
    }

    fn moore_transitions() -> Vec<Transition> {
        vec![
            Transition::new(0, 0, 1, "1"),
            Transition::new(1, 0, 0, "0"),
            Transition::new(2, 1, 1, "X"),
        ]
    }

    #[test]
    fn build_simple_moore() -> Result<(), FsmkitError> {
        let machine = moore_machine();
        let built = build_diagram_expectations(&machine, &moore_states(), &moore_transitions());
        assert!(!built.conflict);
        assert_eq!(built.expectations.len(), 4);

        let entry = &built.expectations["0|1"];
        assert_eq!(entry.next_state_bits, vec![Ternary::One]);
        assert_eq!(entry.outputs, vec![Ternary::Zero]);

        // the wildcard self-loop covers both combos of state 1
        let entry = &built.expectations["1|0"];
        assert_eq!(entry.next_state_bits, vec![Ternary::One]);
        assert_eq!(entry.outputs, vec![Ternary::One]);
        assert_eq!(entry.input_pattern, "X");
        Ok(())
    }

    #[test]
    fn order_independence() {
        let machine = moore_machine();
        let states = moore_states();
        let mut transitions = moore_transitions();
        let forward = build_diagram_expectations(&machine, &states, &transitions);
        transitions.reverse();
        let backward = build_diagram_expectations(&machine, &states, &transitions);
        assert_eq!(forward.conflict, backward.conflict);
        assert_eq!(forward.expectations, backward.expectations);
    }

    #[test]
    fn disagreeing_transitions_conflict() {
        let machine = moore_machine();
        let states = moore_states();
        // X overlaps the concrete 1 pattern with a different target
        let transitions = vec![
            Transition::new(0, 0, 1, "1"),
            Transition::new(1, 0, 0, "X"),
        ];
        let built = build_diagram_expectations(&machine, &states, &transitions);
        assert!(built.conflict);
    }

    #[test]
    fn blank_outputs_conflict() {
        let machine = moore_machine();
        let states = vec![
            FsmState::new(0, "0"), // no outputs at all
            FsmState::new(1, "1").with_outputs("1"),
        ];
        let built = build_diagram_expectations(&machine, &states, &moore_transitions());
        assert!(built.conflict);
    }

    #[test]
    fn unresolvable_state_conflicts() {
        let machine = moore_machine();
        let states = vec![
            FsmState::new(0, "ab").with_outputs("0"),
            FsmState::new(1, "1").with_outputs("1"),
        ];
        let built = build_diagram_expectations(&machine, &states, &moore_transitions());
        assert!(built.conflict);
    }

    #[test]
    fn duplicated_codes_conflict() {
        let machine = moore_machine();
        let states = vec![
            FsmState::new(0, "1").with_outputs("0"),
            FsmState::new(1, "1").with_outputs("1"),
        ];
        let built = build_diagram_expectations(&machine, &states, &moore_transitions());
        assert!(built.conflict);
    }

    #[test]
    fn mealy_outputs_come_from_transitions() -> Result<(), FsmkitError> {
        let machine = Machine::new(MachineKind::Mealy, 2, &["X"], &["Z"])?;
        let states = vec![FsmState::new(0, "0"), FsmState::new(1, "1")];
        let transitions = vec![
            Transition::new(0, 0, 1, "1").with_outputs("1"),
            Transition::new(1, 0, 0, "0").with_outputs("0"),
            Transition::new(2, 1, 0, "X").with_outputs("X"),
        ];
        let built = build_diagram_expectations(&machine, &states, &transitions);
        assert!(!built.conflict);
        assert_eq!(built.expectations["0|1"].outputs, vec![Ternary::One]);
        assert_eq!(built.expectations["1|1"].outputs, vec![Ternary::Free]);
        Ok(())
    }

    #[test]
    fn mealy_fan_in_with_agreeing_outputs_conflicts() -> Result<(), FsmkitError> {
        let machine = Machine::new(MachineKind::Mealy, 2, &["A", "B"], &["Z"])?;
        let states = vec![FsmState::new(0, "0"), FsmState::new(1, "1")];
        // both cover A=1,B=1 with the same target and outputs, but with
        // different wildcard intents
        let transitions = vec![
            Transition::new(0, 0, 1, "1X").with_outputs("1"),
            Transition::new(1, 0, 1, "X1").with_outputs("1"),
        ];
        let built = build_diagram_expectations(&machine, &states, &transitions);
        assert!(built.conflict);
        Ok(())
    }

    #[test]
    fn zero_inputs_use_the_none_key() -> Result<(), FsmkitError> {
        let machine = Machine::new(MachineKind::Moore, 2, &[], &["Z"])?;
        let states = moore_states();
        let transitions = vec![Transition::new(0, 0, 1, ""), Transition::new(1, 1, 0, "")];
        let built = build_diagram_expectations(&machine, &states, &transitions);
        assert!(!built.conflict);
        assert!(built.expectations.contains_key("0|none"));
        assert!(built.expectations.contains_key("1|none"));
        Ok(())
    }
}
