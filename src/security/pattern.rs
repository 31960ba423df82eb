//! Static complexity budget for user-supplied regular expressions.
//!
//! The `regex` engine already guarantees linear-time matching, so the budget
//! is mostly about bounding compile cost and refusing the shapes that are
//! catastrophic on backtracking engines. Execution is still run under a
//! deadline by the regex tester.

use regex::{Regex, RegexBuilder};

const MAX_PATTERN_LEN: usize = 1000;
const MAX_GROUP_DEPTH: usize = 10;
const MAX_REPETITION: u32 = 1000;
const COMPILED_SIZE_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternViolation {
    #[error("pattern is {len} characters, the limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("groups are nested deeper than {max} levels")]
    TooDeep { max: usize },

    #[error("unbounded quantifier applied to a group that already repeats without bound (at offset {offset})")]
    NestedQuantifier { offset: usize },

    #[error("quantifier follows another quantifier (at offset {offset})")]
    StackedQuantifier { offset: usize },

    #[error("repetition bound {bound} exceeds {max}")]
    RepetitionTooLarge { bound: u32, max: u32 },

    #[error("Invalid regex pattern: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy)]
pub struct PatternBudget {
    max_len: usize,
    max_depth: usize,
    max_repetition: u32,
}

impl Default for PatternBudget {
    fn default() -> Self {
        Self {
            max_len: MAX_PATTERN_LEN,
            max_depth: MAX_GROUP_DEPTH,
            max_repetition: MAX_REPETITION,
        }
    }
}

/// What the last quantifier can apply to.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Atom {
    None,
    Single,
    Group { unbounded_inside: bool },
}

impl PatternBudget {
    /// Reject patterns over budget without compiling them.
    pub fn check(&self, pattern: &str) -> Result<(), PatternViolation> {
        let len = pattern.chars().count();
        if len > self.max_len {
            return Err(PatternViolation::TooLong { len, max: self.max_len });
        }

        let chars: Vec<char> = pattern.chars().collect();
        let mut groups: Vec<bool> = Vec::new();
        let mut atom = Atom::None;
        // Some(lazy_seen) when the previous token was a quantifier.
        let mut after_quantifier: Option<bool> = None;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let quantifier = match c {
                '*' | '+' => Some((true, 1)),
                '?' => Some((false, 1)),
                '{' => parse_repetition(&chars[i..])
                    .map(|(min, max, consumed)| {
                        let bound = max.unwrap_or(min);
                        if bound.max(min) > self.max_repetition {
                            Err(PatternViolation::RepetitionTooLarge {
                                bound: bound.max(min),
                                max: self.max_repetition,
                            })
                        } else {
                            Ok((max.is_none(), consumed))
                        }
                    })
                    .transpose()?,
                _ => None,
            };

            if let Some((unbounded, consumed)) = quantifier {
                if let Some(lazy_seen) = after_quantifier {
                    if c == '?' && !lazy_seen {
                        after_quantifier = Some(true);
                        i += 1;
                        continue;
                    }
                    return Err(PatternViolation::StackedQuantifier { offset: i });
                }

                if unbounded {
                    if let Atom::Group { unbounded_inside: true } = atom {
                        return Err(PatternViolation::NestedQuantifier { offset: i });
                    }
                    if let Some(top) = groups.last_mut() {
                        *top = true;
                    }
                }

                after_quantifier = Some(false);
                i += consumed;
                continue;
            }

            after_quantifier = None;
            match c {
                '\\' => {
                    i += escape_len(&chars[i..]);
                    atom = Atom::Single;
                    continue;
                }
                '[' => {
                    i += class_len(&chars[i..]);
                    atom = Atom::Single;
                    continue;
                }
                '(' => {
                    groups.push(false);
                    if groups.len() > self.max_depth {
                        return Err(PatternViolation::TooDeep { max: self.max_depth });
                    }
                    atom = Atom::None;
                    i += 1;
                    if chars.get(i) == Some(&'?') {
                        // Skip the group prefix: (?:  (?P<name>  (?<name>  (?i)
                        while let Some(&p) = chars.get(i) {
                            i += 1;
                            if p == ':' || p == '>' {
                                break;
                            }
                            if p == ')' {
                                groups.pop();
                                break;
                            }
                        }
                    }
                    continue;
                }
                ')' => {
                    let unbounded_inside = groups.pop().unwrap_or(false);
                    if unbounded_inside {
                        if let Some(parent) = groups.last_mut() {
                            *parent = true;
                        }
                    }
                    atom = Atom::Group { unbounded_inside };
                }
                '|' => atom = Atom::None,
                _ => atom = Atom::Single,
            }
            i += 1;
        }

        Ok(())
    }

    /// Check the budget, then compile with a bounded program size.
    pub fn compile(&self, pattern: &str) -> Result<Regex, PatternViolation> {
        self.check(pattern)?;
        RegexBuilder::new(pattern)
            .size_limit(COMPILED_SIZE_LIMIT)
            .dfa_size_limit(COMPILED_SIZE_LIMIT)
            .build()
            .map_err(|e| PatternViolation::Invalid(e.to_string()))
    }
}

/// Length of an escape sequence starting at `\`, including braced forms like `\p{Greek}`.
fn escape_len(chars: &[char]) -> usize {
    match chars.get(1) {
        None => 1,
        Some('p' | 'P' | 'x' | 'u' | 'U') if chars.get(2) == Some(&'{') => chars
            .iter()
            .position(|&c| c == '}')
            .map(|end| end + 1)
            .unwrap_or(chars.len()),
        Some(_) => 2,
    }
}

/// Length of a bracketed class starting at `[`, with nested classes.
fn class_len(chars: &[char]) -> usize {
    let mut depth = 0usize;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                i += 2;
                continue;
            }
            '[' => {
                depth += 1;
                i += 1;
                // A leading ']' (after an optional '^') is a literal.
                if chars.get(i) == Some(&'^') {
                    i += 1;
                }
                if chars.get(i) == Some(&']') {
                    i += 1;
                }
                continue;
            }
            ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    chars.len()
}

/// Parse `{n}`, `{n,}` or `{n,m}`. Returns (min, max, consumed).
fn parse_repetition(chars: &[char]) -> Option<(u32, Option<u32>, usize)> {
    let end = chars.iter().position(|&c| c == '}')?;
    let body: String = chars[1..end].iter().collect();
    let (min, max) = match body.split_once(',') {
        None => {
            let n = body.trim().parse().ok()?;
            (n, Some(n))
        }
        Some((lo, hi)) => {
            let lo = lo.trim().parse().ok()?;
            let hi = hi.trim();
            if hi.is_empty() {
                (lo, None)
            } else {
                (lo, Some(hi.parse().ok()?))
            }
        }
    };
    Some((min, max, end + 1))
}
