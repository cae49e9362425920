//! Boolean expression tokenization and evaluation.
//!
//! Expressions arrive either as free text typed by the user or as token
//! lists assembled by the editor's token tray; both funnel into the same
//! pipeline: normalization (folding NOT decorations into variables),
//! implicit-AND insertion, shunting-yard conversion to postfix, and stack
//! evaluation against a variable assignment.
//!
//! Evaluation is deliberately lenient: it never raises an error. A
//! malformed expression or an unassigned variable yields `None`, which
//! propagates as "cannot verify" rather than a boolean result.

use crate::expr::lexer::{ExpressionLexer, Rule};
use crate::FsmkitError;
use itertools::Itertools;
use once_cell::sync::Lazy;
use pest::Parser;
use regex::Regex;
use std::collections::HashMap;
use std::iter::FromIterator;

mod lexer {
    /// Token-level grammar: junk characters are consumed silently so that
    /// lexing arbitrary input never fails.
    #[derive(pest_derive::Parser)]
    #[grammar_inline = r####"
tokens = _{ SOI ~ tok* ~ EOI }
tok    = _{ var | and | or | not | npost | open | close | junk }
var    = @{ (ASCII_ALPHANUMERIC | "_" | "^")+ }
and    =  { "*" }
or     =  { "+" }
not    =  { "~" }
npost  =  { "'" }
open   =  { "(" }
close  =  { ")" }
junk   = _{ ANY }

WHITESPACE = _{ " " | "\t" | NEWLINE }
"####]
    pub struct ExpressionLexer;
}

// overline and strikethrough combining marks are rendering artifacts
static RE_DECORATION: Lazy<Regex> = Lazy::new(|| Regex::new("[\u{0305}\u{0336}]").unwrap());
static RE_NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new("[^0-9A-Za-z]+").unwrap());

/// A lexical or normalized element of a boolean expression.
///
/// In raw token streams `Not` and `NotPost` are standalone; normalization
/// folds them into the adjacent variable's `negated` flag whenever one
/// exists.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Token {
    /// A variable reference, possibly negated
    Var {
        name: String,
        negated: bool,
    },
    /// AND operator (`*` or juxtaposition)
    And,
    /// OR operator (`+`)
    Or,
    /// Prefix NOT (`~`)
    Not,
    /// Postfix NOT (trailing `'`)
    NotPost,
    Open,
    Close,
}

/// Canonical comparison form of a variable name.
///
/// Case, underscores, carets and decoration marks are all erased so that
/// `Q_1`, `q^1` and an overlined `Q1` compare equal.
pub fn normalize_var_name(name: &str) -> String {
    RE_NON_ALNUM.replace_all(name, "").to_uppercase()
}

/// A variable assignment with format-insensitive lookup.
///
/// ```
/// use fsmkit::Assignment;
///
/// let assignment: Assignment = [("A", true), ("B_1", false)].into_iter().collect();
/// assert_eq!(assignment.get("a"), Some(true));
/// assert_eq!(assignment.get("b^1"), Some(false));
/// assert_eq!(assignment.get("C"), None);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Assignment {
    values: HashMap<String, bool>,
}

impl Assignment {
    /// Assign a value to a variable
    pub fn set(&mut self, name: &str, value: bool) {
        self.values.insert(normalize_var_name(name), value);
    }

    /// Look up a variable, ignoring case and decoration
    pub fn get(&self, name: &str) -> Option<bool> {
        self.values.get(&normalize_var_name(name)).copied()
    }
}

impl<S: AsRef<str>> FromIterator<(S, bool)> for Assignment {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        let mut result = Assignment::default();
        for (name, value) in iter {
            result.set(name.as_ref(), value);
        }
        result
    }
}

/// Scan a raw string into lexical tokens.
///
/// Decoration marks are stripped first; whitespace and characters outside
/// the expression alphabet are skipped silently, so this never fails.
pub fn tokenize(raw: &str) -> Vec<Token> {
    let cleaned = RE_DECORATION.replace_all(raw, "");
    let parsed = match ExpressionLexer::parse(Rule::tokens, &cleaned) {
        Ok(pairs) => pairs,
        Err(_) => return Vec::new(),
    };
    parsed
        .filter_map(|pair| match pair.as_rule() {
            Rule::var => Some(Token::Var {
                name: pair.as_str().to_string(),
                negated: false,
            }),
            Rule::and => Some(Token::And),
            Rule::or => Some(Token::Or),
            Rule::not => Some(Token::Not),
            Rule::npost => Some(Token::NotPost),
            Rule::open => Some(Token::Open),
            Rule::close => Some(Token::Close),
            _ => None,
        })
        .collect()
}

/// Fold NOT decorations into the adjacent variable tokens.
///
/// A prefix `~` or postfix `'` next to a variable becomes its `negated`
/// flag. A NOT with no adjacent variable (e.g. before a parenthesis, or
/// dangling at the end) is kept as a standalone token so the stream can be
/// rendered back; dangling NOTs make evaluation yield `None` downstream.
pub fn normalize_tokens(tokens: &[Token]) -> Vec<Token> {
    let mut normalized = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Var { name, .. } => {
                let mut negated = matches!(i.checked_sub(1).map(|p| &tokens[p]), Some(Token::Not));
                if matches!(tokens.get(i + 1), Some(Token::NotPost)) {
                    negated = true;
                    i += 1;
                }
                normalized.push(Token::Var {
                    name: name.clone(),
                    negated,
                });
            }
            Token::Not => {
                if !matches!(tokens.get(i + 1), Some(Token::Var { .. })) {
                    normalized.push(Token::Not);
                }
            }
            Token::And | Token::Or | Token::Open | Token::Close => {
                normalized.push(tokens[i].clone());
            }
            // a stray postfix NOT has nothing to attach to
            Token::NotPost => (),
        }
        i += 1;
    }
    normalized
}

/// Tokenize and normalize a raw expression string in one step.
pub fn expression_tokens(raw: &str) -> Vec<Token> {
    normalize_tokens(&tokenize(raw))
}

/// Tokenize a raw string, requiring a well-formed expression.
///
/// Unlike [expression_tokens] this rejects input that could never
/// evaluate: empty streams, unbalanced parentheses and dangling
/// operators. Well-formedness is structural, so an expression over
/// unassigned variables still parses.
pub fn parse_expression(raw: &str) -> Result<Vec<Token>, FsmkitError> {
    let tokens = expression_tokens(raw);
    let rpn = to_rpn(&insert_implicit_and(&tokens));
    if rpn.is_empty() {
        return Err(FsmkitError::InvalidExpression);
    }
    let mut depth = 0usize;
    for tk in &rpn {
        match tk {
            Token::Var { .. } => depth += 1,
            Token::Not | Token::NotPost => {
                if depth == 0 {
                    return Err(FsmkitError::InvalidExpression);
                }
            }
            Token::And | Token::Or => {
                if depth < 2 {
                    return Err(FsmkitError::InvalidExpression);
                }
                depth -= 1;
            }
            Token::Open | Token::Close => return Err(FsmkitError::InvalidExpression),
        }
    }
    match depth {
        1 => Ok(tokens),
        _ => Err(FsmkitError::InvalidExpression),
    }
}

/// Insert the ANDs the user left implicit.
///
/// An AND is inserted between any two tokens where the left ends a value
/// (variable or closing paren) and the right starts one (variable, NOT or
/// opening paren); this is what lets a user write `AB'` or `A(B+C)`.
pub fn insert_implicit_and(tokens: &[Token]) -> Vec<Token> {
    let mut result = Vec::with_capacity(tokens.len());
    for (idx, tk) in tokens.iter().enumerate() {
        result.push(tk.clone());
        let is_left = matches!(tk, Token::Var { .. } | Token::Close);
        let is_right = matches!(
            tokens.get(idx + 1),
            Some(Token::Var { .. } | Token::Not | Token::Open)
        );
        if is_left && is_right {
            result.push(Token::And);
        }
    }
    result
}

fn precedence(tk: &Token) -> u8 {
    match tk {
        Token::Not | Token::NotPost => 3,
        Token::And => 2,
        Token::Or => 1,
        _ => 0,
    }
}

/// Shunting-yard conversion to postfix.
///
/// NOT binds tighter than AND, AND tighter than OR; NOT is
/// right-associative, the binary operators are left-associative.
/// Unbalanced parentheses are carried through into the output where the
/// evaluator rejects them.
pub fn to_rpn(tokens: &[Token]) -> Vec<Token> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut ops: Vec<Token> = Vec::new();
    for tk in tokens {
        match tk {
            Token::Var { .. } => output.push(tk.clone()),
            Token::Not | Token::NotPost => {
                while ops
                    .last()
                    .map_or(false, |top| *top != Token::Open && precedence(top) >= 3)
                {
                    if let Some(top) = ops.pop() {
                        output.push(top);
                    }
                }
                ops.push(Token::Not);
            }
            Token::And | Token::Or => {
                let prec = precedence(tk);
                while ops
                    .last()
                    .map_or(false, |top| *top != Token::Open && precedence(top) >= prec)
                {
                    if let Some(top) = ops.pop() {
                        output.push(top);
                    }
                }
                ops.push(tk.clone());
            }
            Token::Open => ops.push(Token::Open),
            Token::Close => {
                while let Some(top) = ops.pop() {
                    if top == Token::Open {
                        break;
                    }
                    output.push(top);
                }
            }
        }
    }
    while let Some(top) = ops.pop() {
        output.push(top);
    }
    output
}

fn evaluate_rpn(rpn: &[Token], assignment: &Assignment) -> Option<bool> {
    let mut stack: Vec<bool> = Vec::new();
    for tk in rpn {
        match tk {
            Token::Var { name, negated } => {
                let value = assignment.get(name)?;
                stack.push(value != *negated);
            }
            Token::Not | Token::NotPost => {
                let value = stack.pop()?;
                stack.push(!value);
            }
            Token::And | Token::Or => {
                let b = stack.pop()?;
                let a = stack.pop()?;
                stack.push(match tk {
                    Token::And => a && b,
                    _ => a || b,
                });
            }
            // an unbalanced parenthesis survived conversion
            Token::Open | Token::Close => return None,
        }
    }
    match stack.len() {
        1 => stack.pop(),
        _ => None,
    }
}

/// Evaluate a token stream against a full variable assignment.
///
/// Returns `None` when the expression is empty or malformed, or when a
/// referenced variable has no assigned value; `None` means "cannot
/// verify", which is distinct from both boolean results.
pub fn evaluate(tokens: &[Token], assignment: &Assignment) -> Option<bool> {
    evaluate_rpn(&to_rpn(&insert_implicit_and(tokens)), assignment)
}

/// Render a token stream back into its canonical text form.
///
/// Negated variables are written with a `~` prefix, implicit ANDs as a
/// single space, OR as ` + `. Parsing the result reproduces the same
/// normalized token stream.
pub fn canonical(tokens: &[Token]) -> String {
    #[derive(PartialEq)]
    enum Prev {
        None,
        Value,
        Other,
    }
    let mut parts = String::new();
    let mut prev = Prev::None;
    for tk in tokens {
        match tk {
            Token::Var { name, negated } => {
                if prev == Prev::Value {
                    parts.push(' ');
                }
                if *negated {
                    parts.push('~');
                }
                parts.push_str(name);
                prev = Prev::Value;
            }
            Token::Or => {
                parts.push_str(" + ");
                prev = Prev::Other;
            }
            Token::And => {
                parts.push(' ');
                prev = Prev::Other;
            }
            Token::Not | Token::NotPost => {
                parts.push('~');
                prev = Prev::Other;
            }
            Token::Open => {
                if prev == Prev::Value {
                    parts.push(' ');
                }
                parts.push('(');
                prev = Prev::Other;
            }
            Token::Close => {
                parts.push(')');
                prev = Prev::Value;
            }
        }
    }
    parts.trim().to_string()
}

/// Build the full truth table of an expression over an ordered variable list.
///
/// All `2^n` assignments are enumerated with the first variable as the most
/// significant bit; keys are the assignment bit strings. A single `None`
/// evaluation (malformed expression, unknown variable) invalidates the
/// whole table.
pub fn build_truth_table(tokens: &[Token], variables: &[String]) -> Option<HashMap<String, bool>> {
    if tokens.is_empty() {
        return None;
    }
    let rpn = to_rpn(&insert_implicit_and(tokens));
    let mut table = HashMap::new();
    for i in 0..1usize << variables.len() {
        let assignment: Assignment = variables
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let bit = (i >> (variables.len() - idx - 1)) & 1;
                (name.as_str(), bit == 1)
            })
            .collect();
        let value = evaluate_rpn(&rpn, &assignment)?;
        let key = variables
            .iter()
            .map(|name| match assignment.get(name) {
                Some(true) => '1',
                _ => '0',
            })
            .join("");
        table.insert(key, value);
    }
    Some(table)
}

#[cfg(test)]
mod tests {
    use crate::expr::*;

    fn assign(pairs: &[(&str, bool)]) -> Assignment {
        pairs.iter().map(|(n, v)| (*n, *v)).collect()
    }

    #[test]
    fn tokenize_skips_junk_and_decorations() {
        let tokens = tokenize("A\u{0305} + #B");
        assert_eq!(
            tokens,
            vec![
                Token::Var { name: "A".to_string(), negated: false },
                Token::Or,
                Token::Var { name: "B".to_string(), negated: false },
            ]
        );
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn normalization_folds_nots() {
        let tokens = expression_tokens("~A B'");
        assert_eq!(
            tokens,
            vec![
                Token::Var { name: "A".to_string(), negated: true },
                Token::Var { name: "B".to_string(), negated: true },
            ]
        );
        // NOT before a parenthesis survives as a standalone token
        let tokens = expression_tokens("~(A+B)");
        assert_eq!(tokens[0], Token::Not);
    }

    #[test]
    fn implicit_and_insertion() {
        let tokens = insert_implicit_and(&expression_tokens("A(B+C)"));
        assert_eq!(tokens[1], Token::And);
        let tokens = insert_implicit_and(&expression_tokens("AB'"));
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1], Token::And);
    }

    #[test]
    fn evaluation_basics() {
        let tokens = expression_tokens("A*B + A*~B");
        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            let result = evaluate(&tokens, &assign(&[("A", a), ("B", b)]));
            assert_eq!(result, Some(a), "A={} B={}", a, b);
        }
    }

    #[test]
    fn precedence_and_parens() {
        let assignment = assign(&[("A", false), ("B", true), ("C", true)]);
        assert_eq!(evaluate(&expression_tokens("A + B*C"), &assignment), Some(true));
        assert_eq!(evaluate(&expression_tokens("(A + B)*C"), &assignment), Some(true));
        assert_eq!(evaluate(&expression_tokens("~A*B"), &assignment), Some(true));
        assert_eq!(evaluate(&expression_tokens("~(A+B)"), &assignment), Some(false));
    }

    #[test]
    fn invalid_expressions_yield_none() {
        let assignment = assign(&[("A", true), ("B", false)]);
        // trailing operator
        assert_eq!(evaluate(&expression_tokens("A*"), &assignment), None);
        // unbalanced parenthesis
        assert_eq!(evaluate(&expression_tokens("A+(B"), &assignment), None);
        // empty
        assert_eq!(evaluate(&[], &assignment), None);
        // unassigned variable
        assert_eq!(evaluate(&expression_tokens("A+C"), &assignment), None);
        // dangling NOT
        assert_eq!(evaluate(&expression_tokens("A~"), &assignment), None);
    }

    #[test]
    fn strict_parsing_rejects_malformed_input() {
        assert!(parse_expression("A (B + C')").is_ok());
        // unassigned variables are fine, the check is structural
        assert!(parse_expression("~whatever").is_ok());
        for raw in ["", "A +", "A+(B", "*A", "()"] {
            assert!(parse_expression(raw).is_err(), "{:?}", raw);
        }
    }

    #[test]
    fn name_matching_is_format_insensitive() {
        let assignment = assign(&[("Q_1", true)]);
        assert_eq!(evaluate(&expression_tokens("q^1"), &assignment), Some(true));
    }

    #[test]
    fn canonical_round_trip() {
        for raw in ["A*B + A*~B", "AB'", "A(B + C)", "~(A + B)C"] {
            let tokens = expression_tokens(raw);
            let rendered = canonical(&tokens);
            assert_eq!(expression_tokens(&rendered), tokens, "{} -> {}", raw, rendered);
        }
    }

    #[test]
    fn truth_table_matches_tautology() {
        let variables = vec!["A".to_string(), "B".to_string()];
        let table = build_truth_table(&expression_tokens("A*B + A*~B"), &variables).unwrap();
        assert_eq!(table["00"], false);
        assert_eq!(table["01"], false);
        assert_eq!(table["10"], true);
        assert_eq!(table["11"], true);
    }

    #[test]
    fn malformed_expression_invalidates_the_whole_table() {
        let variables = vec!["A".to_string(), "B".to_string()];
        assert_eq!(build_truth_table(&expression_tokens("A +"), &variables), None);
        assert_eq!(build_truth_table(&[], &variables), None);
    }
}
