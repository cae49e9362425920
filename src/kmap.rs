//! Karnaugh map layout and expression verification.
//!
//! A map over `n` variables (2 to 6) is laid out as a grid of Gray-coded
//! rows and columns; variables beyond the first four become map-selector
//! bits producing up to four juxtaposed sub-grids. Unlike the transition
//! table, a blank map cell IS a don't-care: it constrains nothing.

use crate::{
    build_truth_table, canonical, expression_tokens, normalize_var_name, FsmkitError, Ternary,
    Token, Verdict,
};
use itertools::iproduct;
use log::debug;
use std::collections::HashMap;

/// Canonical form targeted by the map's expression.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KmapKind {
    /// Sum of products: terms cover 1-cells
    Sop,
    /// Product of sums: terms cover 0-cells
    Pos,
}

/// Which axis receives the more significant core variables.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    /// More significant variables label the columns
    Horizontal,
    /// More significant variables label the rows
    Vertical,
}

/// One of the up-to-four juxtaposed sub-grids of a large map.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Submap {
    pub map_row: usize,
    pub map_col: usize,
    /// Values of the map-selector bits for this sub-grid
    pub map_code: String,
    pub row_offset: usize,
    pub col_offset: usize,
}

/// The physical layout of a map: axis variables, Gray codes and sub-grids.
#[derive(Clone, Debug)]
pub struct KmapLayout {
    pub map_var_count: usize,
    pub map_vars: Vec<String>,
    pub row_vars: Vec<String>,
    pub col_vars: Vec<String>,
    pub row_codes: Vec<String>,
    pub col_codes: Vec<String>,
    pub base_rows: usize,
    pub base_cols: usize,
    pub map_rows: usize,
    pub map_cols: usize,
    pub total_rows: usize,
    pub total_cols: usize,
    pub submaps: Vec<Submap>,
}

impl KmapLayout {
    /// Full variable order used by truth-table keys:
    /// map-selector bits, then column bits, then row bits.
    pub fn variables(&self) -> Vec<String> {
        let mut variables = self.map_vars.clone();
        variables.extend(self.col_vars.iter().cloned());
        variables.extend(self.row_vars.iter().cloned());
        variables
    }

    fn submap_at(&self, row: usize, col: usize) -> Option<&Submap> {
        self.submaps.iter().find(|sub| {
            row >= sub.row_offset
                && row < sub.row_offset + self.base_rows
                && col >= sub.col_offset
                && col < sub.col_offset + self.base_cols
        })
    }
}

/// A Karnaugh map: variables, cells and the candidate expression.
#[derive(Clone, Debug)]
pub struct Kmap {
    pub variables: Vec<String>,
    pub kind: KmapKind,
    pub direction: Direction,
    /// Raw cell values keyed `row-col`
    pub cells: HashMap<String, String>,
    /// Normalized expression tokens
    pub tokens: Vec<Token>,
}

impl Kmap {
    /// Create an empty map, enforcing the variable count cap.
    pub fn new(
        variables: &[&str],
        kind: KmapKind,
        direction: Direction,
    ) -> Result<Self, FsmkitError> {
        check_variable_count(variables.len())?;
        Ok(Self {
            variables: variables.iter().map(|s| s.to_string()).collect(),
            kind,
            direction,
            cells: HashMap::new(),
            tokens: Vec::new(),
        })
    }

    /// Attach the candidate expression, given as free text
    pub fn with_expression(mut self, raw: &str) -> Self {
        self.tokens = expression_tokens(raw);
        self
    }

    /// Set the raw value of one cell
    pub fn set_cell(&mut self, row: usize, col: usize, value: &str) {
        self.cells.insert(format!("{}-{}", row, col), value.to_string());
    }

    /// Normalized value of one cell; a blank cell is a don't-care.
    pub fn cell(&self, row: usize, col: usize) -> Ternary {
        self.cells
            .get(&format!("{}-{}", row, col))
            .and_then(|raw| Ternary::normalize(raw))
            .unwrap_or(Ternary::Free)
    }

    /// The physical layout of this map
    pub fn layout(&self) -> KmapLayout {
        layout_unchecked(&self.variables, self.direction)
    }
}

fn check_variable_count(count: usize) -> Result<(), FsmkitError> {
    match count {
        2..=6 => Ok(()),
        n => Err(FsmkitError::KmapVariableCount(n)),
    }
}

/// Reflected binary code of the given bit length.
///
/// Consecutive entries, including the wraparound pair, differ in exactly
/// one bit; this adjacency is what makes a Karnaugh map work.
pub fn gray_code(bits: usize) -> Vec<String> {
    if bits == 0 {
        return vec![String::new()];
    }
    let mut codes = vec!["0".to_string(), "1".to_string()];
    for _ in 1..bits {
        let reflected: Vec<String> = codes.iter().rev().cloned().collect();
        codes = codes
            .iter()
            .map(|c| format!("0{}", c))
            .chain(reflected.iter().map(|c| format!("1{}", c)))
            .collect();
    }
    codes
}

/// Derive the grid layout for a list of variables.
///
/// Variables beyond the first four (taken from the front) become
/// map-selector bits; the remaining core variables are split between the
/// axes with the more significant half on the axis picked by `direction`.
/// An axis is never left empty while the other holds several variables.
pub fn build_layout(variables: &[String], direction: Direction) -> Result<KmapLayout, FsmkitError> {
    check_variable_count(variables.len())?;
    Ok(layout_unchecked(variables, direction))
}

fn layout_unchecked(variables: &[String], direction: Direction) -> KmapLayout {
    let map_var_count = variables.len().saturating_sub(4);
    let map_vars: Vec<String> = variables[..map_var_count].to_vec();
    let core: Vec<String> = variables[map_var_count..].to_vec();
    let more_sig_count = (core.len() + 1) / 2;
    let mut more_sig: Vec<String> = core[..more_sig_count].to_vec();
    let mut less_sig: Vec<String> = core[more_sig_count..].to_vec();
    if less_sig.is_empty() && more_sig.len() > 1 {
        if let Some(moved) = more_sig.pop() {
            less_sig.push(moved);
        }
    }
    let (mut row_vars, mut col_vars) = match direction {
        Direction::Vertical => (more_sig, less_sig),
        Direction::Horizontal => (less_sig, more_sig),
    };
    if row_vars.is_empty() && !col_vars.is_empty() {
        row_vars.push(col_vars.remove(0));
    }

    let row_codes = gray_code(row_vars.len());
    let col_codes = gray_code(col_vars.len());
    let base_rows = row_codes.len().max(1);
    let base_cols = col_codes.len().max(1);

    let (map_rows, map_cols, map_row_codes, map_col_codes) = match map_var_count {
        0 => (1, 1, vec![String::new()], vec![String::new()]),
        1 => (1, 2, vec![String::new()], gray_code(1)),
        _ => (2, 2, gray_code(1), gray_code(1)),
    };

    let submaps = iproduct!(0..map_rows, 0..map_cols)
        .map(|(map_row, map_col)| Submap {
            map_row,
            map_col,
            map_code: format!("{}{}", map_row_codes[map_row], map_col_codes[map_col]),
            row_offset: map_row * base_rows,
            col_offset: map_col * base_cols,
        })
        .collect();

    KmapLayout {
        map_var_count,
        map_vars,
        row_vars,
        col_vars,
        row_codes,
        col_codes,
        base_rows,
        base_cols,
        map_rows,
        map_cols,
        total_rows: base_rows * map_rows,
        total_cols: base_cols * map_cols,
        submaps,
    }
}

/// Reconstruct the full truth table described by the map's cells.
///
/// Every physical cell is mapped back to the variable assignment it
/// represents (selector bits, then the column and row Gray codes); blank
/// cells become don't-cares. Keys follow the layout's variable order.
pub fn build_kmap_truth_table(kmap: &Kmap) -> (HashMap<String, Ternary>, Vec<String>) {
    let layout = kmap.layout();
    let variables = layout.variables();
    let mut table = HashMap::new();
    for (row, col) in iproduct!(0..layout.total_rows, 0..layout.total_cols) {
        let (map_code, row_in_sub, col_in_sub) = match layout.submap_at(row, col) {
            Some(sub) => (sub.map_code.clone(), row - sub.row_offset, col - sub.col_offset),
            None => (String::new(), row, col),
        };
        let mut key = format!("{:0<width$}", map_code, width = layout.map_var_count);
        key.push_str(&layout.col_codes[col_in_sub]);
        key.push_str(&layout.row_codes[row_in_sub]);
        table.insert(key, kmap.cell(row, col));
    }
    (table, variables)
}

fn target_value(kind: KmapKind) -> Ternary {
    match kind {
        KmapKind::Sop => Ternary::One,
        KmapKind::Pos => Ternary::Zero,
    }
}

/// Split a token stream into its top-level OR sections.
fn split_sections(tokens: &[Token]) -> Vec<Vec<Token>> {
    let mut sections = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut depth = 0usize;
    let mut push_current = |current: &mut Vec<Token>| {
        if current.iter().any(|tk| matches!(tk, Token::Var { .. })) {
            sections.push(std::mem::take(current));
        } else {
            current.clear();
        }
    };
    for tk in tokens {
        if *tk == Token::Or && depth == 0 {
            push_current(&mut current);
            continue;
        }
        match tk {
            Token::Open => depth += 1,
            Token::Close => depth = depth.saturating_sub(1),
            _ => (),
        }
        current.push(tk.clone());
    }
    push_current(&mut current);
    sections
}

/// Collect the literals of one term, keyed by normalized variable name.
///
/// Returns `None` for a contradictory term (a variable appearing with both
/// signs). The value records the literal's sign: `true` for positive.
fn term_literals(section: &[Token]) -> Option<HashMap<String, bool>> {
    let mut literals = HashMap::new();
    for tk in section {
        if let Token::Var { name, negated } = tk {
            let key = normalize_var_name(name);
            let sign = !negated;
            if let Some(existing) = literals.get(&key) {
                if *existing != sign {
                    return None;
                }
            }
            literals.insert(key, sign);
        }
    }
    Some(literals)
}

/// Enumerate the truth-table keys covered by a set of fixed literal values.
fn covered_keys(
    fixed: &HashMap<String, bool>,
    normalized_vars: &[(String, String)],
) -> Vec<String> {
    let unspecified = normalized_vars
        .iter()
        .filter(|(_, norm)| !fixed.contains_key(norm))
        .count();
    (0..1usize << unspecified)
        .map(|i| {
            let mut idx = 0;
            normalized_vars
                .iter()
                .map(|(_, norm)| match fixed.get(norm) {
                    Some(true) => '1',
                    Some(false) => '0',
                    None => {
                        let bit = (i >> (unspecified - idx - 1)) & 1;
                        idx += 1;
                        if bit == 1 {
                            '1'
                        } else {
                            '0'
                        }
                    }
                })
                .collect()
        })
        .collect()
}

/// Check that one expression term is a valid prime implicant of the map.
///
/// The term's cells must avoid every forbidden cell, include at least one
/// target cell, and the term must be prime: dropping any literal has to
/// expose a forbidden cell. For SOP a term covers the assignments where
/// the product is true; for POS a sum term covers the assignments where
/// the sum is false.
fn check_term(
    literals: &HashMap<String, bool>,
    variables: &[String],
    table: &HashMap<String, Ternary>,
    kind: KmapKind,
) -> Result<(), String> {
    let target = target_value(kind);
    let forbidden = match target {
        Ternary::One => Ternary::Zero,
        _ => Ternary::One,
    };
    let normalized_vars: Vec<(String, String)> = variables
        .iter()
        .map(|v| (v.clone(), normalize_var_name(v)))
        .collect();
    let fixed: HashMap<String, bool> = normalized_vars
        .iter()
        .filter_map(|(_, norm)| {
            literals.get(norm).map(|sign| {
                let covered = match kind {
                    KmapKind::Sop => *sign,
                    KmapKind::Pos => !*sign,
                };
                (norm.clone(), covered)
            })
        })
        .collect();

    let coverage = covered_keys(&fixed, &normalized_vars);
    for key in &coverage {
        if table.get(key) == Some(&forbidden) {
            return Err(format!(
                "Term covers cell {} with forbidden value {}",
                key, forbidden
            ));
        }
    }
    if !coverage.len().is_power_of_two() {
        return Err("Group size is not a power of two".to_string());
    }
    if !coverage.iter().any(|key| table.get(key) == Some(&target)) {
        return Err(format!("Term must include at least one {} cell", target));
    }

    // prime check: removing any literal must expose a forbidden cell
    for dropped in fixed.keys() {
        let expanded: HashMap<String, bool> = fixed
            .iter()
            .filter(|(norm, _)| **norm != *dropped)
            .map(|(norm, value)| (norm.clone(), *value))
            .collect();
        let exposes_forbidden = covered_keys(&expanded, &normalized_vars)
            .iter()
            .any(|key| table.get(key) == Some(&forbidden));
        if !exposes_forbidden {
            return Err(
                "Term is not prime; it can be expanded without covering invalid cells".to_string(),
            );
        }
    }
    Ok(())
}

/// Verify that a map's expression agrees with its cell assignments.
///
/// The expression's truth table must match every concrete cell (don't-care
/// cells impose no constraint), and every top-level term of the expression
/// must be a valid prime implicant of the map. The failure reason
/// distinguishes an invalid or incomplete expression from a genuine
/// disagreement.
pub fn verify_kmap_expression(kmap: &Kmap) -> Verdict {
    let (table, variables) = build_kmap_truth_table(kmap);
    debug!(
        "verifying k-map expression '{}' over {} cells",
        canonical(&kmap.tokens),
        table.len()
    );
    let expr_table = match build_truth_table(&kmap.tokens, &variables) {
        Some(expr_table) => expr_table,
        None => return Verdict::fail("Expression is invalid or empty"),
    };
    for (key, value) in &table {
        if *value == Ternary::Free {
            continue;
        }
        let expected = *value == Ternary::One;
        if expr_table.get(key) != Some(&expected) {
            return Verdict::fail("Expression output does not match K-map values");
        }
    }

    let normalized_map: Vec<String> = variables.iter().map(|v| normalize_var_name(v)).collect();
    for (idx, section) in split_sections(&kmap.tokens).iter().enumerate() {
        let literals = match term_literals(section) {
            Some(literals) if !literals.is_empty() => literals,
            _ => {
                return Verdict::fail(format!(
                    "Expression term {} is contradictory or empty",
                    idx + 1
                ))
            }
        };
        if let Some(unknown) = literals.keys().find(|name| !normalized_map.contains(name)) {
            return Verdict::fail(format!(
                "Expression term {} references unknown variable '{}'",
                idx + 1,
                unknown
            ));
        }
        if let Err(reason) = check_term(&literals, &variables, &table, kmap.kind) {
            debug!("k-map term {} rejected: {}", idx + 1, reason);
            return Verdict::fail(format!(
                "Expression term {} is not a valid prime implicant: {}",
                idx + 1,
                reason
            ));
        }
    }
    Verdict::pass()
}

#[cfg(test)]
mod tests {
    use crate::kmap::*;

    fn var_list(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn differ_by_one_bit(a: &str, b: &str) -> bool {
        a.chars().zip(b.chars()).filter(|(x, y)| x != y).count() == 1
    }

    #[test]
    fn gray_codes_are_adjacent() {
        assert_eq!(gray_code(0), vec![""]);
        assert_eq!(gray_code(1), vec!["0", "1"]);
        assert_eq!(gray_code(2), vec!["00", "01", "11", "10"]);
        for bits in 1..=3 {
            let codes = gray_code(bits);
            assert_eq!(codes.len(), 1 << bits);
            for i in 0..codes.len() {
                let next = &codes[(i + 1) % codes.len()];
                assert!(differ_by_one_bit(&codes[i], next), "{} {}", codes[i], next);
            }
        }
    }

    #[test]
    fn three_variable_horizontal_layout() {
        let layout = build_layout(&var_list(&["A", "B", "C"]), Direction::Horizontal).unwrap();
        assert_eq!(layout.row_vars, var_list(&["C"]));
        assert_eq!(layout.col_vars, var_list(&["A", "B"]));
        assert_eq!(layout.row_codes, vec!["0", "1"]);
        assert_eq!(layout.col_codes, vec!["00", "01", "11", "10"]);
        assert_eq!((layout.total_rows, layout.total_cols), (2, 4));
        // cell (0,3) sits under the column Gray code 10
        assert_eq!(layout.col_codes[3], "10");
    }

    #[test]
    fn vertical_direction_swaps_axes() {
        let layout = build_layout(&var_list(&["A", "B", "C", "D"]), Direction::Vertical).unwrap();
        assert_eq!(layout.row_vars, var_list(&["A", "B"]));
        assert_eq!(layout.col_vars, var_list(&["C", "D"]));
        assert_eq!((layout.total_rows, layout.total_cols), (4, 4));
    }

    #[test]
    fn extra_variables_become_map_selectors() {
        let layout =
            build_layout(&var_list(&["A", "B", "C", "D", "E"]), Direction::Horizontal).unwrap();
        assert_eq!(layout.map_vars, var_list(&["A"]));
        assert_eq!((layout.map_rows, layout.map_cols), (1, 2));
        assert_eq!((layout.total_rows, layout.total_cols), (4, 8));
        assert_eq!(layout.submaps.len(), 2);
        assert_eq!(layout.submaps[1].map_code, "1");
        assert_eq!(layout.submaps[1].col_offset, 4);

        let layout =
            build_layout(&var_list(&["A", "B", "C", "D", "E", "F"]), Direction::Horizontal)
                .unwrap();
        assert_eq!(layout.map_var_count, 2);
        assert_eq!(layout.submaps.len(), 4);
        assert_eq!((layout.total_rows, layout.total_cols), (8, 8));
    }

    #[test]
    fn variable_count_is_capped() {
        assert!(build_layout(&var_list(&["A"]), Direction::Horizontal).is_err());
        assert!(
            build_layout(&var_list(&["A", "B", "C", "D", "E", "F", "G"]), Direction::Horizontal)
                .is_err()
        );
        assert!(Kmap::new(&["A"], KmapKind::Sop, Direction::Horizontal).is_err());
    }

    fn xor_map() -> Kmap {
        // two variables: columns carry A, rows carry B
        let mut kmap = Kmap::new(&["A", "B"], KmapKind::Sop, Direction::Horizontal)
            .unwrap()
            .with_expression("A B' + A' B");
        kmap.set_cell(0, 0, "0");
        kmap.set_cell(0, 1, "1");
        kmap.set_cell(1, 0, "1");
        kmap.set_cell(1, 1, "0");
        kmap
    }

    #[test]
    fn truth_table_reconstruction() {
        let (table, variables) = build_kmap_truth_table(&xor_map());
        assert_eq!(variables, var_list(&["A", "B"]));
        assert_eq!(table["00"], Ternary::Zero);
        assert_eq!(table["10"], Ternary::One);
        assert_eq!(table["01"], Ternary::One);
        assert_eq!(table["11"], Ternary::Zero);
    }

    #[test]
    fn blank_cells_are_dont_cares() {
        let mut kmap = xor_map();
        kmap.cells.clear();
        let (table, _) = build_kmap_truth_table(&kmap);
        assert!(table.values().all(|v| *v == Ternary::Free));
    }

    #[test]
    fn matching_expression_passes() {
        let verdict = verify_kmap_expression(&xor_map());
        assert!(verdict.passed, "{}", verdict);
    }

    #[test]
    fn disagreeing_cell_fails() {
        let mut kmap = xor_map();
        kmap.set_cell(0, 0, "1");
        let verdict = verify_kmap_expression(&kmap);
        assert_eq!(
            verdict.reason.as_deref(),
            Some("Expression output does not match K-map values")
        );
    }

    #[test]
    fn invalid_expression_is_reported_as_such() {
        let kmap = xor_map().with_expression("A +");
        let verdict = verify_kmap_expression(&kmap);
        assert_eq!(verdict.reason.as_deref(), Some("Expression is invalid or empty"));

        let kmap = xor_map().with_expression("");
        assert!(!verify_kmap_expression(&kmap).passed);
    }

    #[test]
    fn dont_care_cells_impose_no_constraint() {
        let mut kmap = Kmap::new(&["A", "B"], KmapKind::Sop, Direction::Horizontal)
            .unwrap()
            .with_expression("A + B");
        kmap.set_cell(0, 0, "0");
        kmap.set_cell(0, 1, "1");
        kmap.set_cell(1, 0, "1");
        // (1,1) left blank: the expression may take either value there
        let verdict = verify_kmap_expression(&kmap);
        assert!(verdict.passed, "{}", verdict);
    }

    #[test]
    fn non_prime_terms_are_rejected() {
        let mut kmap = Kmap::new(&["A", "B"], KmapKind::Sop, Direction::Horizontal)
            .unwrap()
            .with_expression("A B + A B' + A' B + A' B'");
        for (row, col) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            kmap.set_cell(row, col, "1");
        }
        let verdict = verify_kmap_expression(&kmap);
        assert!(!verdict.passed);
        assert!(verdict.reason.unwrap().contains("not a valid prime implicant"));
    }

    #[test]
    fn contradictory_terms_are_rejected() {
        let mut kmap = Kmap::new(&["A", "B"], KmapKind::Sop, Direction::Horizontal)
            .unwrap()
            .with_expression("A A'");
        for (row, col) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            kmap.set_cell(row, col, "0");
        }
        let verdict = verify_kmap_expression(&kmap);
        assert!(!verdict.passed);
        assert!(verdict.reason.unwrap().contains("contradictory"));
    }

    #[test]
    fn pos_terms_cover_zero_cells() {
        // function = A: zeros where A is 0
        let mut kmap = Kmap::new(&["A", "B"], KmapKind::Pos, Direction::Horizontal)
            .unwrap()
            .with_expression("A");
        kmap.set_cell(0, 0, "0");
        kmap.set_cell(1, 0, "0");
        kmap.set_cell(0, 1, "1");
        kmap.set_cell(1, 1, "1");
        let verdict = verify_kmap_expression(&kmap);
        assert!(verdict.passed, "{}", verdict);
    }
}
