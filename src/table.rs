//! Editable transition table model and the table/diagram verifier.
//!
//! The crate owns the table's scaffolding (column templates and the
//! state-by-input-combination row grid); the editor owns the cell values
//! and may reorder or rebuild the columns. Verification locates columns by
//! role rather than position, so any editor-defined layout is accepted as
//! long as every required role is present at the right width.

use crate::{
    bits_compatible, expectation_key, state_is_used, DiagramExpectations, FsmState, Machine,
    MachineKind, Ternary, Transition,
};
use itertools::Itertools;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// The role a table column plays during verification.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnRole {
    /// One bit of the current state code (most significant first)
    CurrentState,
    /// One machine input
    Input,
    /// One bit of the next state code (most significant first)
    NextState,
    /// One machine output
    Output,
    /// Visual separator, ignored by verification
    Spacer,
}

/// A single table column.
#[derive(Clone, Debug)]
pub struct Column {
    /// Editor-defined unique key
    pub key: String,
    /// Stable template key identifying the role instance
    pub base_key: String,
    /// Display label
    pub label: String,
    pub role: ColumnRole,
}

impl Column {
    fn new(base_key: String, label: String, role: ColumnRole) -> Self {
        Self {
            key: base_key.clone(),
            base_key,
            label,
            role,
        }
    }
}

/// A table row describing one (state, input combination) pair.
#[derive(Clone, Debug)]
pub struct Row {
    /// Lookup key, `stateId|combo` or `stateId|none`
    pub key: String,
    pub state_id: usize,
    /// Concrete input combination (empty with no inputs)
    pub input_combo: String,
}

/// The editable transition table: columns, rows and raw cell values.
///
/// Cells are keyed `rowKey::columnKey` and hold whatever the user typed;
/// values are normalized on every read so the table never needs cleaning.
#[derive(Clone, Debug, Default)]
pub struct TransitionTable {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    pub cells: HashMap<String, String>,
}

impl TransitionTable {
    /// Build the default table scaffolding for a machine.
    ///
    /// Column order mirrors the editor's default layout: current-state
    /// bits, next-state bits, a spacer, then inputs and outputs. One row is
    /// generated per state and input combination.
    pub fn for_machine(machine: &Machine) -> Self {
        let mut columns = column_templates(machine);
        let rows = row_grid(machine);
        // the spacer splits state bits from signals; drop it when there are none
        if machine.input_count() == 0 && machine.output_count() == 0 {
            columns.retain(|col| col.role != ColumnRole::Spacer);
        }
        Self {
            columns,
            rows,
            cells: HashMap::new(),
        }
    }

    /// Drop columns whose base key matches no template of the machine.
    ///
    /// Editors may persist stale columns after the machine shape changed;
    /// those cannot be located by role and are removed before verification.
    pub fn retain_known_columns(&mut self, machine: &Machine) {
        let known: HashSet<String> = column_templates(machine)
            .into_iter()
            .map(|col| col.base_key)
            .collect();
        self.columns.retain(|col| known.contains(&col.base_key));
    }

    /// Set the raw value of one cell
    pub fn set_cell(&mut self, row_key: &str, col_key: &str, value: &str) {
        self.cells
            .insert(format!("{}::{}", row_key, col_key), value.to_string());
    }

    fn cell(&self, row_key: &str, col_key: &str) -> Option<Ternary> {
        self.cells
            .get(&format!("{}::{}", row_key, col_key))
            .and_then(|raw| Ternary::normalize(raw))
    }

    fn value_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|col| col.role != ColumnRole::Spacer)
    }

    fn row_is_blank(&self, row: &Row) -> bool {
        self.value_columns()
            .all(|col| self.cell(&row.key, &col.key).is_none())
    }

    fn read_role(&self, row: &Row, role: ColumnRole) -> Vec<Option<Ternary>> {
        self.value_columns()
            .filter(|col| col.role == role)
            .map(|col| self.cell(&row.key, &col.key))
            .collect()
    }
}

/// Default column templates for a machine, in editor order.
pub fn column_templates(machine: &Machine) -> Vec<Column> {
    let bit_count = machine.bit_count();
    let mut templates = Vec::new();
    for i in (0..bit_count).rev() {
        templates.push(Column::new(
            format!("q_{}", i),
            format!("Q_{}", i),
            ColumnRole::CurrentState,
        ));
    }
    for i in (0..bit_count).rev() {
        templates.push(Column::new(
            format!("next_q_{}", i),
            format!("Q_{}^+", i),
            ColumnRole::NextState,
        ));
    }
    templates.push(Column::new(
        "spacer".to_string(),
        String::new(),
        ColumnRole::Spacer,
    ));
    for (idx, name) in machine.inputs.iter().enumerate() {
        templates.push(Column::new(
            format!("in_{}", idx),
            name.clone(),
            ColumnRole::Input,
        ));
    }
    for (idx, name) in machine.outputs.iter().enumerate() {
        templates.push(Column::new(
            format!("out_{}", idx),
            name.clone(),
            ColumnRole::Output,
        ));
    }
    templates
}

/// One row per state and concrete input combination.
pub fn row_grid(machine: &Machine) -> Vec<Row> {
    let combos = crate::enumerate_combos(machine.input_count());
    let mut rows = Vec::with_capacity(machine.num_states * combos.len());
    for state_id in 0..machine.num_states {
        for combo in &combos {
            rows.push(Row {
                key: match combo.is_empty() {
                    true => format!("{}|none", state_id),
                    false => format!("{}|{}", state_id, combo),
                },
                state_id,
                input_combo: combo.clone(),
            });
        }
    }
    rows
}

/// The outcome of a verification pass: a boolean plus an optional reason.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Verdict {
    pub passed: bool,
    pub reason: Option<String>,
}

impl Verdict {
    pub fn pass() -> Self {
        Self {
            passed: true,
            reason: None,
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: Some(reason.into()),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (&self.passed, &self.reason) {
            (true, _) => write!(f, "passed"),
            (false, Some(reason)) => write!(f, "failed: {}", reason),
            (false, None) => write!(f, "failed"),
        }
    }
}

/// Compare output bit arrays, honoring the machine kind.
///
/// Moore outputs use the symmetric wildcard-tolerant rule. Mealy outputs
/// are directional: when the diagram promised a free output bit, the table
/// must record it as free too, so a table cannot silently under-specify a
/// wildcarded Mealy output. The table writing a free bit against a
/// concrete promise remains acceptable.
fn outputs_compatible(expected: &[Ternary], actual: &[Ternary], kind: MachineKind) -> bool {
    if expected.len() != actual.len() {
        return false;
    }
    match kind {
        MachineKind::Moore => bits_compatible(expected, actual),
        MachineKind::Mealy => expected.iter().zip(actual).all(|(e, a)| match (e, a) {
            (Ternary::Free, a) => *a == Ternary::Free,
            (_, Ternary::Free) => true,
            (e, a) => e == a,
        }),
    }
}

/// Check the transition table against the diagram's expectations.
///
/// The verdict is positive only when the diagram is conflict-free, every
/// populated row matches its expectation, and every expectation is claimed
/// by some populated row (table ⊇ diagram and diagram ⊇ table).
pub fn verify_transition_table(
    table: &TransitionTable,
    built: &DiagramExpectations,
    machine: &Machine,
    states: &[FsmState],
    transitions: &[Transition],
) -> Verdict {
    let bit_count = machine.bit_count();

    let role_count = |role| table.value_columns().filter(|c| c.role == role).count();
    let mut missing_headers = Vec::new();
    if role_count(ColumnRole::CurrentState) != bit_count {
        missing_headers.push("current state bits");
    }
    if role_count(ColumnRole::NextState) != bit_count {
        missing_headers.push("next state bits");
    }
    if role_count(ColumnRole::Input) != machine.input_count() {
        missing_headers.push("input columns");
    }
    if role_count(ColumnRole::Output) != machine.output_count() {
        missing_headers.push("output columns");
    }
    if !missing_headers.is_empty() {
        return Verdict::fail(format!(
            "Missing required column headers: {}",
            missing_headers.iter().join(", ")
        ));
    }

    let mut unclaimed: HashSet<&String> = built.expectations.keys().collect();
    let mut matches = !built.conflict;

    for row in &table.rows {
        if !matches {
            break;
        }
        if table.row_is_blank(row) {
            continue;
        }
        let current = table.read_role(row, ColumnRole::CurrentState);
        let inputs = table.read_role(row, ColumnRole::Input);
        // a populated row missing part of its key cannot be verified
        if current.contains(&None) || inputs.contains(&None) {
            debug!("row {} has blank key bits", row.key);
            matches = false;
            break;
        }
        // blank next-state and output cells are concrete 0, not don't-care
        let blank_to_zero = |values: Vec<Option<Ternary>>| -> Vec<Ternary> {
            values
                .into_iter()
                .map(|v| v.unwrap_or(Ternary::Zero))
                .collect()
        };
        let next = blank_to_zero(table.read_role(row, ColumnRole::NextState));
        let outputs = blank_to_zero(table.read_role(row, ColumnRole::Output));

        let current_bits: String = current.iter().flatten().map(|t| t.as_char()).collect();
        let input_bits: String = inputs.iter().flatten().map(|t| t.as_char()).collect();

        // a row about an unknown or unused state is uninformative
        let described = states
            .iter()
            .find(|st| st.binary_code(bit_count).as_deref() == Some(current_bits.as_str()));
        match described {
            None => continue,
            Some(st) if !state_is_used(st, transitions) => continue,
            Some(_) => (),
        }

        let key = expectation_key(&current_bits, &input_bits);
        let expected = match built.expectations.get(&key) {
            Some(e) => e,
            None => {
                debug!("row {} matches no diagram expectation", row.key);
                matches = false;
                break;
            }
        };
        if !bits_compatible(&expected.next_state_bits, &next) {
            debug!("row {} disagrees on next-state bits", row.key);
            matches = false;
            break;
        }
        if !outputs_compatible(&expected.outputs, &outputs, machine.kind) {
            debug!("row {} disagrees on outputs", row.key);
            matches = false;
            break;
        }
        unclaimed.remove(&key);
    }

    if matches && !unclaimed.is_empty() {
        return Verdict::fail("Transition table is missing transitions that exist in the diagram");
    }
    match matches {
        true => Verdict::pass(),
        false => Verdict::fail("Transition table and diagram do not match"),
    }
}
