//! Debian-style dependency expression parsing.
//!
//! An expression is a comma-separated list of terms; each term is either a
//! single constraint or a `|`-separated group of alternatives. Terms are
//! implicitly AND-ed, alternatives OR-ed. `"pkg1 (>= 2.1.0), pkg2 | pkg3"`
//! has two terms, the second with two alternatives.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};
use crate::registry::DELIMITER;
use crate::version::DebVersion;

/// Version relation inside a parenthesized constraint.
///
/// `>>`/`>` and `<<`/`<` are synonyms for strictly-greater and
/// strictly-less; the doubled forms are canonical on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Ge,
    Le,
    Gt,
    Lt,
}

impl Relation {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "=" => Some(Relation::Eq),
            ">=" => Some(Relation::Ge),
            "<=" => Some(Relation::Le),
            ">>" | ">" => Some(Relation::Gt),
            "<<" | "<" => Some(Relation::Lt),
            _ => None,
        }
    }

    /// Whether a three-way comparison result (candidate versus the
    /// constraint's version) satisfies this relation.
    pub fn matches(self, ord: Ordering) -> bool {
        match self {
            Relation::Eq => ord == Ordering::Equal,
            Relation::Ge => ord != Ordering::Less,
            Relation::Le => ord != Ordering::Greater,
            Relation::Gt => ord == Ordering::Greater,
            Relation::Lt => ord == Ordering::Less,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Relation::Eq => "=",
            Relation::Ge => ">=",
            Relation::Le => "<=",
            Relation::Gt => ">>",
            Relation::Lt => "<<",
        };
        f.write_str(symbol)
    }
}

/// A named package requirement with an optional version bound.
///
/// A bare name (no bound) is satisfied by any installed version.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub package: String,
    pub bound: Option<(Relation, DebVersion)>,
}

impl Constraint {
    /// Whether `candidate` satisfies this constraint.
    pub fn satisfied_by(&self, candidate: &DebVersion) -> bool {
        match &self.bound {
            None => true,
            Some((relation, version)) => relation.matches(candidate.compare(version)),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.bound {
            None => f.write_str(&self.package),
            Some((relation, version)) => {
                write!(f, "{} ({} {})", self.package, relation, version)
            }
        }
    }
}

/// One AND-ed term of an expression: a single constraint or a non-empty
/// OR-group of alternatives.
#[derive(Debug, Clone, PartialEq)]
pub enum DependencyTerm {
    Single(Constraint),
    Any(Vec<Constraint>),
}

impl DependencyTerm {
    /// The constraints a candidate may satisfy: one for `Single`, each
    /// alternative for `Any`.
    pub fn alternatives(&self) -> &[Constraint] {
        match self {
            DependencyTerm::Single(constraint) => std::slice::from_ref(constraint),
            DependencyTerm::Any(alternatives) => alternatives,
        }
    }

    /// Whether any alternative with the given package name accepts
    /// `candidate`.
    pub fn satisfied_by(&self, package: &str, candidate: &DebVersion) -> bool {
        self.alternatives()
            .iter()
            .any(|c| c.package == package && c.satisfied_by(candidate))
    }
}

impl fmt::Display for DependencyTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for constraint in self.alternatives() {
            if !first {
                f.write_str(" | ")?;
            }
            write!(f, "{constraint}")?;
            first = false;
        }
        Ok(())
    }
}

/// A parsed dependency expression: ordered AND-ed terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyExpression {
    terms: Vec<DependencyTerm>,
}

impl DependencyExpression {
    /// Parse a raw `Depends`-style string.
    ///
    /// An empty (or all-whitespace) string parses to the empty expression,
    /// which is always satisfied. Fails with `MalformedDependency` on an
    /// empty term or alternative, an unrecognized relation token, or a
    /// constraint missing its closing parenthesis.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(DependencyExpression::default());
        }

        let mut terms = Vec::new();
        for term_src in trimmed.split(',') {
            if term_src.trim().is_empty() {
                return Err(Error::malformed(raw, "empty term"));
            }
            let mut alternatives = Vec::new();
            for alt_src in term_src.split('|') {
                alternatives.push(parse_constraint(alt_src, raw)?);
            }
            let term = if alternatives.len() == 1 {
                DependencyTerm::Single(alternatives.remove(0))
            } else {
                DependencyTerm::Any(alternatives)
            };
            terms.push(term);
        }

        Ok(DependencyExpression { terms })
    }

    pub fn terms(&self) -> &[DependencyTerm] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

fn parse_constraint(src: &str, raw: &str) -> Result<Constraint> {
    let src = src.trim();
    if src.is_empty() {
        return Err(Error::malformed(raw, "empty alternative"));
    }

    let (name, bound) = match src.split_once('(') {
        None => (src, None),
        Some((name, rest)) => {
            let rest = rest.trim();
            let Some(inner) = rest.strip_suffix(')') else {
                return Err(Error::malformed(raw, "missing closing parenthesis"));
            };
            let inner = inner.trim();
            let relation_len = inner
                .find(|c: char| !matches!(c, '<' | '>' | '='))
                .unwrap_or(inner.len());
            let (relation_token, version) = inner.split_at(relation_len);
            let relation = Relation::from_token(relation_token).ok_or_else(|| {
                Error::malformed(raw, format!("unrecognized relation {relation_token:?}"))
            })?;
            let version = version.trim();
            if version.is_empty() {
                return Err(Error::malformed(raw, "constraint is missing a version"));
            }
            (name.trim(), Some((relation, DebVersion::parse(version)?)))
        }
    };

    if name.is_empty() {
        return Err(Error::malformed(raw, "constraint is missing a name"));
    }
    if name.contains(char::is_whitespace) {
        return Err(Error::malformed(
            raw,
            format!("package name {name:?} contains whitespace"),
        ));
    }
    if name.contains(DELIMITER) {
        return Err(Error::malformed(
            raw,
            format!("package name {name:?} contains the reserved delimiter"),
        ));
    }

    Ok(Constraint {
        package: name.to_string(),
        bound,
    })
}
