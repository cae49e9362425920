//! Ternary bit values and wildcard expansion

use std::fmt;

/// A single ternary symbol: a fixed bit or a free "don't care" position.
///
/// Free symbols are written `X`. A fourth, implicit value exists everywhere
/// in the editable data structures: the *blank* (unspecified) cell, which is
/// represented as `None` in an `Option<Ternary>`. Blank cells expand like
/// free symbols when enumerating concrete combinations, but they are never
/// a valid match target: [compatible] rejects them on either side.
///
/// ```
/// use fsmkit::Ternary;
///
/// assert_eq!(Ternary::normalize(" x "), Some(Ternary::Free));
/// assert_eq!(Ternary::normalize("1"), Some(Ternary::One));
/// assert_eq!(Ternary::normalize("th1s"), Some(Ternary::One));
/// assert_eq!(Ternary::normalize("?"), None);
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Ternary {
    /// A fixed 0 bit
    Zero,
    /// A fixed 1 bit
    One,
    /// A free position matching both values
    Free,
}

impl Ternary {
    /// Coerce arbitrary raw input to a ternary symbol.
    ///
    /// The input is upper-cased and illegal characters are stripped; the
    /// first remaining valid symbol wins. Empty or fully-illegal input
    /// yields `None` (a blank cell).
    pub fn normalize(raw: &str) -> Option<Self> {
        raw.chars().find_map(|c| match c.to_ascii_uppercase() {
            '0' => Some(Ternary::Zero),
            '1' => Some(Ternary::One),
            'X' => Some(Ternary::Free),
            _ => None,
        })
    }

    /// The character form of this symbol
    pub fn as_char(self) -> char {
        match self {
            Ternary::Zero => '0',
            Ternary::One => '1',
            Ternary::Free => 'X',
        }
    }

    /// Test if this symbol is a fixed bit
    pub fn is_fixed(self) -> bool {
        !matches!(self, Ternary::Free)
    }
}

impl From<bool> for Ternary {
    fn from(b: bool) -> Self {
        match b {
            true => Ternary::One,
            false => Ternary::Zero,
        }
    }
}

impl fmt::Display for Ternary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Parse a compact pattern string into a bit array.
///
/// `0`, `1` and `X` (or `x`) map to the corresponding symbols, `-` and `_`
/// mark a blank position, spaces are skipped.
///
/// ```
/// use fsmkit::{parse_pattern, Ternary};
///
/// let bits = parse_pattern("1X -0");
/// assert_eq!(bits.len(), 4);
/// assert_eq!(bits[2], None);
/// ```
pub fn parse_pattern(descr: &str) -> Vec<Option<Ternary>> {
    descr
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '-' | '_' => None,
            c => Ternary::normalize(&c.to_string()),
        })
        .collect()
}

/// Normalize a sequence of raw cell values into a fixed-width bit array.
///
/// Missing positions are padded with blanks, extra positions are dropped.
pub fn normalize_bit_array<I, S>(values: I, expected_len: usize) -> Vec<Option<Ternary>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut result = vec![None; expected_len];
    for (idx, val) in values.into_iter().enumerate() {
        if idx < expected_len {
            result[idx] = Ternary::normalize(val.as_ref());
        }
    }
    result
}

/// Render a bit array as a compact pattern string.
///
/// Blank positions are written `-`; [parse_pattern] reads the result back.
pub fn pattern_string(values: &[Option<Ternary>]) -> String {
    values
        .iter()
        .map(|v| match v {
            Some(t) => t.as_char(),
            None => '-',
        })
        .collect()
}

/// Resize an already-normalized bit array to a fixed width.
///
/// Missing positions become blanks, extra positions are dropped.
pub fn resize_bits(values: &[Option<Ternary>], expected_len: usize) -> Vec<Option<Ternary>> {
    let mut result = vec![None; expected_len];
    for (idx, val) in values.iter().enumerate().take(expected_len) {
        result[idx] = *val;
    }
    result
}

/// Expand a wildcard vector into all concrete binary strings it covers.
///
/// Fixed symbols are appended to every partial string; free and blank
/// symbols branch each partial into its 0 and 1 continuation. The result
/// contains exactly `2^(number of free or blank symbols)` strings, each of
/// the vector's length, with the 0 branch always emitted before the 1
/// branch so the order is deterministic.
///
/// ```
/// use fsmkit::{expand, Ternary};
///
/// let combos = expand(&[Some(Ternary::One), None]);
/// assert_eq!(combos, vec!["10", "11"]);
/// ```
pub fn expand(values: &[Option<Ternary>]) -> Vec<String> {
    let mut combos = vec![String::new()];
    for val in values {
        match val {
            Some(t) if t.is_fixed() => {
                for prefix in &mut combos {
                    prefix.push(t.as_char());
                }
            }
            _ => {
                let mut next = Vec::with_capacity(combos.len() * 2);
                for prefix in combos {
                    let mut zero = prefix.clone();
                    zero.push('0');
                    next.push(zero);
                    let mut one = prefix;
                    one.push('1');
                    next.push(one);
                }
                combos = next;
            }
        }
    }
    combos
}

/// Enumerate all binary strings of the given width in ascending numeric order.
///
/// A zero width yields a single empty string: with no inputs there is
/// exactly one (empty) combination.
pub fn enumerate_combos(count: usize) -> Vec<String> {
    if count == 0 {
        return vec![String::new()];
    }
    (0..1usize << count)
        .map(|i| format!("{:0width$b}", i, width = count))
        .collect()
}

/// Wildcard-tolerant comparison of two normalized symbols.
///
/// A blank on either side never matches; a free symbol matches anything;
/// fixed symbols must be equal.
pub fn compatible(expected: Option<Ternary>, actual: Option<Ternary>) -> bool {
    match (expected, actual) {
        (None, _) | (_, None) => false,
        (Some(Ternary::Free), _) | (_, Some(Ternary::Free)) => true,
        (Some(e), Some(a)) => e == a,
    }
}

/// Wildcard-tolerant comparison of two bit arrays of the same width.
pub fn bits_compatible(expected: &[Ternary], actual: &[Ternary]) -> bool {
    expected.len() == actual.len()
        && expected
            .iter()
            .zip(actual)
            .all(|(e, a)| compatible(Some(*e), Some(*a)))
}
