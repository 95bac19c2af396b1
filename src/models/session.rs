// ABOUTME: Session descriptor sent to the provisioning service, plus slug generation for new identifiers

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Vocabulary used to build the default session identifier
pub const SLUG_WORDS: [&str; 12] = [
    "car", "dog", "computer", "person", "inside", "word", "for", "please", "to", "cool", "open",
    "source",
];

const SLUG_LENGTH: usize = 3;

/// Language runtime of a remote session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuntimeKind {
    /// Node.js, sent as `nodeJs`
    #[default]
    NodeJs,
    /// Python, sent as `python`
    Python,
}

impl RuntimeKind {
    /// Selector order
    pub const ALL: [RuntimeKind; 2] = [RuntimeKind::NodeJs, RuntimeKind::Python];

    /// Human readable label shown in the runtime selector
    pub fn label(&self) -> &'static str {
        match self {
            RuntimeKind::NodeJs => "Node.js",
            RuntimeKind::Python => "Python",
        }
    }

    /// Wire name used in the provisioning request
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeKind::NodeJs => "nodeJs",
            RuntimeKind::Python => "python",
        }
    }

    /// Next runtime in selector order, wrapping
    pub fn next(self) -> Self {
        match self {
            RuntimeKind::NodeJs => RuntimeKind::Python,
            RuntimeKind::Python => RuntimeKind::NodeJs,
        }
    }

    /// Previous runtime in selector order, wrapping
    pub fn previous(self) -> Self {
        // Only two runtimes, so both directions land on the other one
        self.next()
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuntimeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nodeJs" | "node" | "node-js" => Ok(RuntimeKind::NodeJs),
            "python" => Ok(RuntimeKind::Python),
            other => Err(format!(
                "unknown runtime '{}', expected 'nodeJs' or 'python'",
                other
            )),
        }
    }
}

/// What the launcher sends to the provisioning service. Built once per submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDescriptor {
    /// Session identifier
    pub identifier: String,
    /// Requested runtime
    pub runtime_kind: RuntimeKind,
}

impl SessionDescriptor {
    /// Descriptor for one submit
    pub fn new(identifier: impl Into<String>, runtime_kind: RuntimeKind) -> Self {
        Self {
            identifier: identifier.into(),
            runtime_kind,
        }
    }
}

/// Generate a session identifier from three random vocabulary words
pub fn random_slug() -> String {
    random_slug_with(&mut rand::thread_rng())
}

/// Same as [`random_slug`] but with a caller supplied RNG
pub fn random_slug_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut slug = String::new();
    for _ in 0..SLUG_LENGTH {
        if let Some(word) = SLUG_WORDS.choose(rng) {
            slug.push_str(word);
        }
    }
    slug
}
