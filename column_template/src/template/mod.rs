//! Column templates
//!
//! - [`ParseNode`] is the closed set of node kinds a column template is built from
//! - [`Template`] owns a validated root node plus its compiled-pattern memo
//! - [`evaluate`] runs a bare node tree against a [`FieldLookup`]

pub mod error;
pub mod evaluator;
pub mod nodes;
pub mod pattern;

pub use error::TemplateError;
pub use evaluator::{evaluate, lookup_in, select_index, Evaluation, FieldLookup};
pub use nodes::ParseNode;
pub use pattern::{replace_literal, CompiledPattern, PatternCache, RegexFlags};

use crate::config::constants::template::MAX_TEMPLATE_NODES;
use evaluator::Evaluator;
use std::cell::RefCell;
use std::collections::HashSet;

/// A registered column template
///
/// Regex patterns are compiled on first use and memoised, failures included.
/// Errors are reported through [`Template::take_unreported`] once per distinct
/// error so that per-row evaluation does not flood the log.
#[derive(Debug)]
pub struct Template {
    root: ParseNode,
    patterns: PatternCache,
    reported: RefCell<HashSet<TemplateError>>,
}

impl Template {
    /// Wrap a tree after checking it against the depth and size limits
    pub fn new(root: ParseNode, max_depth: usize) -> Result<Self, TemplateError> {
        let depth = root.depth();
        if depth > max_depth {
            return Err(TemplateError::DepthExceeded {
                depth,
                limit: max_depth,
            });
        }

        let count = root.node_count();
        if count > MAX_TEMPLATE_NODES {
            return Err(TemplateError::TooManyNodes {
                count,
                limit: MAX_TEMPLATE_NODES,
            });
        }

        Ok(Self {
            root,
            patterns: PatternCache::new(),
            reported: RefCell::new(HashSet::new()),
        })
    }

    pub fn root(&self) -> &ParseNode {
        &self.root
    }

    pub fn evaluate(&self, lookup: &dyn FieldLookup) -> Evaluation {
        Evaluator::new(lookup, &self.patterns).run(&self.root)
    }

    /// Compile every pattern up front; returns the ones that fail
    pub fn precompile(&self) -> Vec<TemplateError> {
        let mut failures = Vec::new();
        for (pattern, flags) in self.root.patterns() {
            if let Err(err) = self.patterns.get(pattern, flags) {
                if !failures.contains(&err) {
                    failures.push(err);
                }
            }
        }
        if self.root.contains_unsupported() {
            failures.push(TemplateError::UnsupportedNode);
        }
        failures
    }

    /// Keep only errors this template has not reported before
    pub fn take_unreported(&self, errors: Vec<TemplateError>) -> Vec<TemplateError> {
        let mut reported = self.reported.borrow_mut();
        errors
            .into_iter()
            .filter(|err| reported.insert(err.clone()))
            .collect()
    }
}

impl Clone for Template {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            patterns: PatternCache::new(),
            reported: RefCell::new(HashSet::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn nested(depth: usize) -> ParseNode {
        let mut node = ParseNode::literal("x");
        for _ in 1..depth {
            node = ParseNode::concat(vec![node]);
        }
        node
    }

    #[test]
    fn test_depth_limit() {
        assert!(Template::new(nested(4), 4).is_ok());
        assert_matches!(
            Template::new(nested(5), 4),
            Err(TemplateError::DepthExceeded { depth: 5, limit: 4 })
        );
    }

    #[test]
    fn test_node_limit() {
        let wide = ParseNode::concat(vec![ParseNode::literal("x"); MAX_TEMPLATE_NODES]);
        assert_matches!(
            Template::new(wide, 8),
            Err(TemplateError::TooManyNodes { .. })
        );
    }

    #[test]
    fn test_precompile_reports_bad_patterns() {
        let template = Template::new(
            ParseNode::concat(vec![
                ParseNode::regex(ParseNode::field("a"), "(", "", ""),
                ParseNode::regex(ParseNode::field("b"), "(", "", ""),
                ParseNode::regex(ParseNode::field("c"), "ok", "g", ""),
                ParseNode::Unsupported,
            ]),
            8,
        )
        .unwrap();

        let failures = template.precompile();
        assert_eq!(failures.len(), 2);
        assert_matches!(failures[0], TemplateError::InvalidPattern { .. });
        assert_eq!(failures[1], TemplateError::UnsupportedNode);
    }

    #[test]
    fn test_errors_reported_once() {
        let template = Template::new(
            ParseNode::regex(ParseNode::field("from"), "(", "", ""),
            8,
        )
        .unwrap();
        let lookup = |_: &str, _: i64| "value".to_string();

        let first = template.evaluate(&lookup);
        assert_eq!(template.take_unreported(first.errors).len(), 1);

        let second = template.evaluate(&lookup);
        assert_eq!(second.errors.len(), 1);
        assert!(template.take_unreported(second.errors).is_empty());
    }
}
