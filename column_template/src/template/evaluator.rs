//! Post-order template evaluation
//!
//! Evaluation never fails as a whole: a node that cannot be evaluated
//! contributes the empty string and its error is returned alongside the value.

use super::error::TemplateError;
use super::nodes::ParseNode;
use super::pattern::{replace_literal, PatternCache};

/// Field access abstraction over the direct and derived field sources
///
/// `index` selects one value of a multi-valued field; negative values count
/// from the end. Missing fields and out-of-range indices yield `""`.
pub trait FieldLookup {
    fn lookup(&self, name: &str, index: i64) -> String;
}

impl<F> FieldLookup for F
where
    F: Fn(&str, i64) -> String,
{
    fn lookup(&self, name: &str, index: i64) -> String {
        self(name, index)
    }
}

/// Value of one template evaluation plus the configuration errors met on the way
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub value: String,
    pub errors: Vec<TemplateError>,
}

impl Evaluation {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

pub(crate) struct Evaluator<'a> {
    lookup: &'a dyn FieldLookup,
    patterns: &'a PatternCache,
    errors: Vec<TemplateError>,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(lookup: &'a dyn FieldLookup, patterns: &'a PatternCache) -> Self {
        Self {
            lookup,
            patterns,
            errors: Vec::new(),
        }
    }

    pub(crate) fn run(mut self, root: &ParseNode) -> Evaluation {
        let value = self.eval(root);
        Evaluation {
            value,
            errors: self.errors,
        }
    }

    fn eval(&mut self, node: &ParseNode) -> String {
        match node {
            ParseNode::Literal { text } => text.clone(),
            ParseNode::FieldRef { field_name, index } => self
                .lookup
                .lookup(&field_name.to_lowercase(), index.unwrap_or(0)),
            ParseNode::Replace {
                child,
                target,
                replacement,
                all,
            } => {
                let value = self.eval(child);
                replace_literal(&value, target, replacement, *all)
            }
            ParseNode::RegexReplace {
                child,
                pattern,
                flags,
                replacement,
            } => {
                let value = self.eval(child);
                match self
                    .patterns
                    .get(pattern, flags)
                    .and_then(|compiled| compiled.replace(&value, replacement))
                {
                    Ok(replaced) => replaced,
                    Err(err) => {
                        self.errors.push(err);
                        String::new()
                    }
                }
            }
            ParseNode::Concat { children } => {
                let mut joined = String::new();
                for child in children {
                    joined.push_str(&self.eval(child));
                }
                joined
            }
            ParseNode::FirstNonEmpty { children } => {
                for child in children {
                    let value = self.eval(child);
                    if !value.is_empty() {
                        return value;
                    }
                }
                String::new()
            }
            ParseNode::Unsupported => {
                self.errors.push(TemplateError::UnsupportedNode);
                String::new()
            }
        }
    }
}

/// Evaluate a bare node tree with a throwaway pattern cache
pub fn evaluate(node: &ParseNode, lookup: &dyn FieldLookup) -> Evaluation {
    let patterns = PatternCache::new();
    Evaluator::new(lookup, &patterns).run(node)
}

/// Lookup over a plain name -> values map; used by tests and simple hosts
pub fn lookup_in<'a, S>(fields: &'a std::collections::HashMap<String, Vec<S>>) -> impl Fn(&str, i64) -> String + 'a
where
    S: AsRef<str>,
{
    move |name, index| {
        fields
            .get(name)
            .and_then(|values| select_index(values, index))
            .map(|value| value.as_ref().to_string())
            .unwrap_or_default()
    }
}

/// Pick one element of an ordered multi-value, negative index counting from the end
pub fn select_index<T>(values: &[T], index: i64) -> Option<&T> {
    let position = if index < 0 {
        let from_end = usize::try_from(index.unsigned_abs()).ok()?;
        values.len().checked_sub(from_end)?
    } else {
        usize::try_from(index).ok()?
    };
    values.get(position)
}
