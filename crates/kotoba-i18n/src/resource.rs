//! Resource trees, key-path lookup and `{name}` interpolation

use crate::error::{I18nError, I18nResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Separator between segments of a key path (`popup.header.title`)
pub const KEY_SEPARATOR: char = '.';

/// Template arguments keyed by placeholder name
pub type Params = HashMap<String, String>;

/// A node of a resource tree: a translated string or a nested table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceNode {
    /// Translated string
    Leaf(String),
    /// Nested table of segments
    Branch(BTreeMap<String, ResourceNode>),
}

/// Outcome of walking a key path through one tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// The path ends on a string
    Found(&'a str),
    /// A segment is absent
    Missing,
    /// The path crosses a string where a table is needed, or ends on a table
    WrongShape,
}

impl<'a> Lookup<'a> {
    /// The string, if the path resolved to one
    pub fn found(self) -> Option<&'a str> {
        match self {
            Self::Found(value) => Some(value),
            Self::Missing | Self::WrongShape => None,
        }
    }
}

/// The complete set of strings for one locale
///
/// Built once and never mutated; the store swaps whole trees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceTree {
    root: BTreeMap<String, ResourceNode>,
}

impl ResourceTree {
    /// Wrap an already built table
    pub fn new(root: BTreeMap<String, ResourceNode>) -> Self {
        Self { root }
    }

    /// Parse a JSON document whose top level is an object
    pub fn from_json_str(locale: &str, json: &str) -> I18nResult<Self> {
        serde_json::from_str(json).map_err(|source| I18nError::ResourceParse {
            locale: locale.to_string(),
            source,
        })
    }

    /// Convert a JSON value whose top level is an object
    pub fn from_json_value(locale: &str, value: serde_json::Value) -> I18nResult<Self> {
        serde_json::from_value(value).map_err(|source| I18nError::ResourceParse {
            locale: locale.to_string(),
            source,
        })
    }

    /// Walk `key_path` segment by segment
    pub fn lookup(&self, key_path: &str) -> Lookup<'_> {
        let mut table = &self.root;
        let mut segments = key_path.split(KEY_SEPARATOR).peekable();

        while let Some(segment) = segments.next() {
            let is_last = segments.peek().is_none();
            match (table.get(segment), is_last) {
                (None, _) => return Lookup::Missing,
                (Some(ResourceNode::Leaf(value)), true) => return Lookup::Found(value),
                (Some(ResourceNode::Branch(_)), true) => return Lookup::WrongShape,
                (Some(ResourceNode::Leaf(_)), false) => return Lookup::WrongShape,
                (Some(ResourceNode::Branch(next)), false) => table = next,
            }
        }

        Lookup::Missing
    }

    /// Whether `key_path` resolves to a string
    pub fn contains(&self, key_path: &str) -> bool {
        self.lookup(key_path).found().is_some()
    }

    /// Number of string leaves in the tree
    pub fn len(&self) -> usize {
        fn count(table: &BTreeMap<String, ResourceNode>) -> usize {
            table
                .values()
                .map(|node| match node {
                    ResourceNode::Leaf(_) => 1,
                    ResourceNode::Branch(next) => count(next),
                })
                .sum()
        }
        count(&self.root)
    }

    /// Whether the tree holds no strings
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a single interpolation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolated {
    /// Rendered text
    pub text: String,
    /// Placeholder names that had no matching parameter
    pub missing: Vec<String>,
}

/// Replace `{name}` placeholders with values from `params`
///
/// Single pass: substituted values are not rescanned. Unknown names, empty
/// braces and an unterminated `{` are copied through literally.
pub fn interpolate(template: &str, params: &Params) -> Interpolated {
    let mut text = String::with_capacity(template.len());
    let mut missing = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        text.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let Some(close) = after.find(|c| c == '}' || c == '{') else {
            text.push_str(&rest[open..]);
            rest = "";
            break;
        };

        if after.as_bytes()[close] == b'{' {
            // `{` restarts the scan; the first one is literal
            text.push('{');
            rest = after;
            continue;
        }

        let name = &after[..close];
        match params.get(name) {
            Some(value) if !name.is_empty() => text.push_str(value),
            _ => {
                if !name.is_empty() {
                    missing.push(name.to_string());
                }
                text.push('{');
                text.push_str(name);
                text.push('}');
            }
        }
        rest = &after[close + 1..];
    }

    text.push_str(rest);
    Interpolated { text, missing }
}

/// Macro to create [`Params`] more easily
#[macro_export]
macro_rules! params {
    () => {
        $crate::Params::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut params = $crate::Params::new();
        $(
            params.insert($key.to_string(), $value.to_string());
        )+
        params
    }};
}
