//! Template node definitions
//!
//! A template is a finite tree of [`ParseNode`]s. The structured form is JSON
//! tagged by `nodeType`, using the field names extension authors already pass
//! at registration:
//!
//! ```json
//! {"nodeType": "regex",
//!  "child": {"nodeType": "header", "headerName": "from"},
//!  "pattern": ".*@", "flags": "", "replacement": ""}
//! ```

use super::error::TemplateError;
use serde::{Deserialize, Serialize};

/// One node of a column template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "nodeType")]
pub enum ParseNode {
    /// Verbatim text
    #[serde(rename = "literal")]
    Literal {
        #[serde(rename = "literalString")]
        text: String,
    },

    /// Named record field; `index` selects one value of a multi-valued field,
    /// negative indices count from the end
    #[serde(rename = "header")]
    FieldRef {
        #[serde(rename = "headerName")]
        field_name: String,
        #[serde(
            rename = "headerIndex",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        index: Option<i64>,
    },

    /// Literal substring substitution
    #[serde(rename = "replace")]
    Replace {
        child: Box<ParseNode>,
        target: String,
        replacement: String,
        #[serde(rename = "replaceAll", default)]
        all: bool,
    },

    /// Pattern substitution, compiled lazily
    #[serde(rename = "regex")]
    RegexReplace {
        child: Box<ParseNode>,
        pattern: String,
        #[serde(default)]
        flags: String,
        replacement: String,
    },

    #[serde(rename = "concat")]
    Concat {
        #[serde(default)]
        children: Vec<ParseNode>,
    },

    /// First child with a non-empty value
    #[serde(rename = "first")]
    FirstNonEmpty {
        #[serde(default)]
        children: Vec<ParseNode>,
    },

    /// Any `nodeType` this evaluator does not know
    #[serde(other)]
    Unsupported,
}

impl ParseNode {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal { text: text.into() }
    }

    pub fn field(field_name: impl Into<String>) -> Self {
        Self::FieldRef {
            field_name: field_name.into(),
            index: None,
        }
    }

    pub fn field_at(field_name: impl Into<String>, index: i64) -> Self {
        Self::FieldRef {
            field_name: field_name.into(),
            index: Some(index),
        }
    }

    pub fn replace(
        child: ParseNode,
        target: impl Into<String>,
        replacement: impl Into<String>,
        all: bool,
    ) -> Self {
        Self::Replace {
            child: Box::new(child),
            target: target.into(),
            replacement: replacement.into(),
            all,
        }
    }

    pub fn regex(
        child: ParseNode,
        pattern: impl Into<String>,
        flags: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self::RegexReplace {
            child: Box::new(child),
            pattern: pattern.into(),
            flags: flags.into(),
            replacement: replacement.into(),
        }
    }

    pub fn concat(children: Vec<ParseNode>) -> Self {
        Self::Concat { children }
    }

    pub fn first(children: Vec<ParseNode>) -> Self {
        Self::FirstNonEmpty { children }
    }

    /// Parse the structured (JSON) template form
    pub fn from_json(value: &serde_json::Value) -> Result<Self, TemplateError> {
        Ok(ParseNode::deserialize(value)?)
    }

    pub fn from_json_str(source: &str) -> Result<Self, TemplateError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn children(&self) -> &[ParseNode] {
        match self {
            Self::Replace { child, .. } | Self::RegexReplace { child, .. } => {
                std::slice::from_ref(child.as_ref())
            }
            Self::Concat { children } | Self::FirstNonEmpty { children } => children,
            Self::Literal { .. } | Self::FieldRef { .. } | Self::Unsupported => &[],
        }
    }

    /// Nesting depth; a leaf has depth 1
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(ParseNode::depth)
            .max()
            .unwrap_or(0)
    }

    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(ParseNode::node_count)
            .sum::<usize>()
    }

    /// Every `(pattern, flags)` pair in the tree, in pre-order
    pub fn patterns(&self) -> Vec<(&str, &str)> {
        let mut found = Vec::new();
        self.collect_patterns(&mut found);
        found
    }

    fn collect_patterns<'a>(&'a self, found: &mut Vec<(&'a str, &'a str)>) {
        if let Self::RegexReplace { pattern, flags, .. } = self {
            found.push((pattern.as_str(), flags.as_str()));
        }
        for child in self.children() {
            child.collect_patterns(found);
        }
    }

    pub fn contains_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported) || self.children().iter().any(Self::contains_unsupported)
    }
}
