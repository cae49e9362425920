//! Verify finite state machine diagrams against transition tables and Karnaugh maps.
//!
//! A [Machine] describes the shape of a sequential circuit: Moore or Mealy, a number
//! of states (encoded on [state_bit_count] flip-flops) and named input and output
//! signals. Its behavior is drawn as a diagram made of [states](FsmState) and
//! [transitions](Transition), where transition inputs and outputs are
//! [ternary patterns](Ternary): a wildcard bit stands for both values at once.
//!
//! The diagram is compiled into a map of [expectations](DiagramExpectations), one per
//! reachable (state, concrete input combination) pair, and a filled-in
//! [TransitionTable] is checked against that map cell by cell. The result is a
//! [Verdict] carrying a human-readable failure reason.
//!
//! ```
//! use fsmkit::{
//!     build_diagram_expectations, verify_transition_table, FsmState, Machine, MachineKind,
//!     Transition, TransitionTable,
//! };
//! # use fsmkit::FsmkitError;
//! # fn main() -> Result<(), FsmkitError> {
//!
//! // A two-state Moore machine: wait in 0 until 'go', then stay in 1
//! let machine = Machine::new(MachineKind::Moore, 2, &["go"], &["done"])?;
//! let states = vec![
//!     FsmState::new(0, "0").with_outputs("0"),
//!     FsmState::new(1, "1").with_outputs("1"),
//! ];
//! let transitions = vec![
//!     Transition::new(0, 0, 0, "0"),
//!     Transition::new(1, 0, 1, "1"),
//!     Transition::new(2, 1, 1, "X"),
//! ];
//! let built = build_diagram_expectations(&machine, &states, &transitions);
//! assert!(!built.conflict);
//!
//! // Fill in the matching transition table
//! let mut table = TransitionTable::for_machine(&machine);
//! for (row, q, input, next, out) in [
//!     ("0|0", "0", "0", "0", "0"),
//!     ("0|1", "0", "1", "1", "0"),
//!     ("1|0", "1", "0", "1", "1"),
//!     ("1|1", "1", "1", "1", "1"),
//! ] {
//!     table.set_cell(row, "q_0", q);
//!     table.set_cell(row, "in_0", input);
//!     table.set_cell(row, "next_q_0", next);
//!     table.set_cell(row, "out_0", out);
//! }
//!
//! let verdict = verify_transition_table(&table, &built, &machine, &states, &transitions);
//! assert!(verdict.passed);
//! # Ok(())
//! # }
//! ```
//!
//! # Input coverage
//!
//! Independently of table verification, the transitions leaving each state can be
//! checked for [coverage](Coverage) of the input space: wildcards are expanded and
//! every concrete combination must be claimed exactly once.
//!
//! ```
//! use fsmkit::{evaluate_coverage, Transition};
//!
//! let transitions = vec![
//!     Transition::new(0, 0, 1, "0X"),
//!     Transition::new(1, 0, 0, "10"),
//! ];
//! // combination 11 is not handled by any transition leaving state 0
//! let coverage = evaluate_coverage(0, &transitions, 2);
//! assert!(coverage.missing && !coverage.overfull);
//! ```
//!
//! # Boolean expressions
//!
//! Free-text Boolean expressions use `*` or juxtaposition for AND, `+` for OR and
//! `~`, `'` or an overline for NOT. The [tokenizer](tokenize) never fails: unknown
//! characters are skipped, and malformed expressions surface as an unverifiable
//! (`None`) evaluation instead of an error.
//!
//! ```
//! use fsmkit::{evaluate, expression_tokens, Assignment};
//!
//! let tokens = expression_tokens("EN (Q_1 + Q_0')");
//! let assignment: Assignment =
//!     [("EN", true), ("Q_1", false), ("Q_0", false)].into_iter().collect();
//! assert_eq!(evaluate(&tokens, &assignment), Some(true));
//! ```
//!
//! # Karnaugh maps
//!
//! A [Kmap] lays its variables out on Gray-coded axes (with map-selector bits and
//! sub-grids beyond four variables) and verifies a candidate expression against the
//! cell values, including a prime-implicant check of each term.
//!
//! ```
//! use fsmkit::{verify_kmap_expression, Direction, Kmap, KmapKind};
//! # use fsmkit::FsmkitError;
//! # fn main() -> Result<(), FsmkitError> {
//!
//! let mut kmap = Kmap::new(&["A", "B"], KmapKind::Sop, Direction::Horizontal)?
//!     .with_expression("A B' + A' B");
//! kmap.set_cell(0, 0, "0");
//! kmap.set_cell(0, 1, "1");
//! kmap.set_cell(1, 0, "1");
//! kmap.set_cell(1, 1, "0");
//!
//! assert!(verify_kmap_expression(&kmap).passed);
//! # Ok(())
//! # }
//! ```

mod coverage;
mod error;
mod expect;
mod expr;
mod kmap;
mod machine;
mod table;
mod ternary;

// Export public structures and API
pub use coverage::{describe_coverage, evaluate_coverage, Coverage};
pub use error::FsmkitError;
pub use expect::{build_diagram_expectations, expectation_key, DiagramExpectations, Expectation};
pub use expr::{
    build_truth_table, canonical, evaluate, expression_tokens, insert_implicit_and,
    normalize_tokens, normalize_var_name, parse_expression, to_rpn, tokenize, Assignment, Token,
};
pub use kmap::{
    build_kmap_truth_table, build_layout, gray_code, verify_kmap_expression, Direction, Kmap,
    KmapKind, KmapLayout, Submap,
};
pub use machine::{
    state_bit_count, state_is_used, FsmState, Machine, MachineKind, Transition, MAX_STATES,
};
pub use table::{
    column_templates, row_grid, verify_transition_table, Column, ColumnRole, Row, TransitionTable,
    Verdict,
};
pub use ternary::{
    bits_compatible, compatible, enumerate_combos, expand, normalize_bit_array, parse_pattern,
    pattern_string, resize_bits, Ternary,
};
