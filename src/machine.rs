//! Data model for machines, states and transitions.
//!
//! All structures are plain data owned by the caller: the verification
//! entry points read them for the duration of one call and retain nothing.

use crate::{parse_pattern, FsmkitError, Ternary};

/// Largest supported state count
pub const MAX_STATES: usize = 32;

/// The two classical flavours of finite state machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MachineKind {
    /// Outputs depend only on the current state
    Moore,
    /// Outputs depend on the current state and the inputs
    Mealy,
}

/// Global description of a machine: kind, state count and signal names.
///
/// The state count determines the bit width used for state codes; it is
/// capped at [MAX_STATES] so every verification pass stays small.
#[derive(Clone, Debug)]
pub struct Machine {
    /// Moore or Mealy
    pub kind: MachineKind,
    /// Number of states (determines the state bit width)
    pub num_states: usize,
    /// Ordered unique input names
    pub inputs: Vec<String>,
    /// Ordered unique output names
    pub outputs: Vec<String>,
}

impl Machine {
    /// Create a machine description, enforcing the state count cap.
    pub fn new(
        kind: MachineKind,
        num_states: usize,
        inputs: &[&str],
        outputs: &[&str],
    ) -> Result<Self, FsmkitError> {
        if num_states > MAX_STATES {
            return Err(FsmkitError::TooManyStates {
                max: MAX_STATES,
                found: num_states,
            });
        }
        Ok(Self {
            kind,
            num_states,
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Number of bits used to encode a state
    pub fn bit_count(&self) -> usize {
        state_bit_count(self.num_states)
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }
}

/// A single state of the machine.
///
/// The binary code is user-editable and does not have to be the id's
/// natural binary form. Codes must be unique within one verification pass:
/// a duplicated code makes (state,input) lookups ambiguous, which surfaces
/// as a conflict rather than a crash.
#[derive(Clone, Debug)]
pub struct FsmState {
    /// Contiguous integer id, unique within the machine
    pub id: usize,
    /// User-assigned binary code (may be empty, cleaned on resolution)
    pub binary: String,
    /// Whether the editor has placed this state on the canvas
    pub placed: bool,
    /// Static output bits (Moore machines only)
    pub outputs: Vec<Option<Ternary>>,
}

impl FsmState {
    pub fn new(id: usize, binary: &str) -> Self {
        Self {
            id,
            binary: binary.to_string(),
            placed: true,
            outputs: Vec::new(),
        }
    }

    /// Attach static Moore outputs, given as a pattern string
    pub fn with_outputs(mut self, outputs: &str) -> Self {
        self.outputs = parse_pattern(outputs);
        self
    }

    /// Resolve the cleaned binary code of this state at a given bit width.
    ///
    /// Non-binary characters are stripped; when the stored code is empty the
    /// id's natural binary form is used instead. Shorter codes are padded
    /// with leading zeros, longer codes keep their rightmost (least
    /// significant) bits. A code with no binary digit at all cannot be
    /// resolved.
    pub fn binary_code(&self, bit_count: usize) -> Option<String> {
        let source = match self.binary.trim().is_empty() {
            true => format!("{:b}", self.id),
            false => self.binary.clone(),
        };
        let digits: String = source.chars().filter(|c| *c == '0' || *c == '1').collect();
        if digits.is_empty() {
            return None;
        }
        let padded = format!("{:0>width$}", digits, width = bit_count);
        Some(padded[padded.len() - bit_count..].to_string())
    }
}

/// A directed transition between two states.
///
/// Self-loops (`from == to`) and parallel edges between the same pair of
/// states are both legal. Input values may contain free symbols covering
/// several concrete combinations; output values are only meaningful for
/// Mealy machines.
#[derive(Clone, Debug)]
pub struct Transition {
    /// Opaque unique id
    pub id: usize,
    /// Source state id
    pub from: usize,
    /// Target state id
    pub to: usize,
    /// Ternary input condition, sized to the machine's inputs
    pub input_values: Vec<Option<Ternary>>,
    /// Ternary output values, sized to the machine's outputs (Mealy only)
    pub output_values: Vec<Option<Ternary>>,
}

impl Transition {
    pub fn new(id: usize, from: usize, to: usize, inputs: &str) -> Self {
        Self {
            id,
            from,
            to,
            input_values: parse_pattern(inputs),
            output_values: Vec::new(),
        }
    }

    /// Attach Mealy output values, given as a pattern string
    pub fn with_outputs(mut self, outputs: &str) -> Self {
        self.output_values = parse_pattern(outputs);
        self
    }
}

/// Number of bits needed to encode the given number of states.
///
/// Always at least one bit, even for degenerate machines.
pub fn state_bit_count(num_states: usize) -> usize {
    let n = num_states.max(2);
    (usize::BITS - (n - 1).leading_zeros()) as usize
}

/// Test if a state takes part in the diagram.
///
/// A state is used when it is placed on the canvas or when any transition
/// starts or ends on it. Rows of the transition table describing unused
/// states are uninformative and skipped by the verifier.
pub fn state_is_used(state: &FsmState, transitions: &[Transition]) -> bool {
    state.placed
        || transitions
            .iter()
            .any(|tr| tr.from == state.id || tr.to == state.id)
}

#[cfg(test)]
mod tests {
    use crate::machine::*;

    #[test]
    fn bit_widths() {
        assert_eq!(state_bit_count(0), 1);
        assert_eq!(state_bit_count(1), 1);
        assert_eq!(state_bit_count(2), 1);
        assert_eq!(state_bit_count(3), 2);
        assert_eq!(state_bit_count(4), 2);
        assert_eq!(state_bit_count(5), 3);
        assert_eq!(state_bit_count(32), 5);
    }

    #[test]
    fn state_count_cap() {
        assert!(Machine::new(MachineKind::Moore, 32, &[], &[]).is_ok());
        assert!(matches!(
            Machine::new(MachineKind::Moore, 33, &[], &[]),
            Err(FsmkitError::TooManyStates { found: 33, .. })
        ));
    }

    #[test]
    fn binary_code_resolution() {
        // arbitrary user code, padded to width
        assert_eq!(FsmState::new(0, "1").binary_code(2), Some("01".to_string()));
        // longer codes keep the least significant bits
        assert_eq!(FsmState::new(0, "1101").binary_code(2), Some("01".to_string()));
        // empty code falls back to the id's natural form
        assert_eq!(FsmState::new(5, "").binary_code(3), Some("101".to_string()));
        // decoration characters are stripped
        assert_eq!(FsmState::new(0, " 1 0 ").binary_code(2), Some("10".to_string()));
        // garbage cannot be resolved
        assert_eq!(FsmState::new(0, "ab").binary_code(2), None);
    }

    #[test]
    fn used_states() {
        let s0 = FsmState::new(0, "0");
        let mut s1 = FsmState::new(1, "1");
        s1.placed = false;
        let transitions = vec![Transition::new(0, 0, 0, "X")];

        assert!(state_is_used(&s0, &transitions));
        assert!(!state_is_used(&s1, &transitions));

        let transitions = vec![Transition::new(0, 0, 1, "X")];
        assert!(state_is_used(&s1, &transitions));
    }
}
