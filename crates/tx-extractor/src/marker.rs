// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::{Deserialize, Serialize};

/// The marker tag every bridge output script starts with.
pub const DEFAULT_MARKER_TAG: &str = "OP_RETURN BRIDGE";

/// The leading script tokens that mark an output as a bridge output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MarkerTag {
    tokens: Vec<String>,
}

impl MarkerTag {
    /// Creates a marker from a whitespace separated list of script tokens.
    pub fn new(tag: &str) -> Self {
        Self {
            tokens: tag.split_whitespace().map(str::to_owned).collect(),
        }
    }

    /// An empty marker matches every script.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// If `asm` starts with this marker, returns the remaining tokens.
    pub fn strip<'a>(&self, asm: &'a str) -> Option<Vec<&'a str>> {
        let mut parts = asm.split_whitespace();
        for token in &self.tokens {
            if parts.next()? != token {
                return None;
            }
        }
        Some(parts.collect())
    }
}

impl Default for MarkerTag {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_TAG)
    }
}

impl std::fmt::Display for MarkerTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}

impl From<String> for MarkerTag {
    fn from(tag: String) -> Self {
        Self::new(&tag)
    }
}

impl From<MarkerTag> for String {
    fn from(tag: MarkerTag) -> Self {
        tag.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_only_leading_tokens() {
        let tag = MarkerTag::default();
        assert_eq!(
            tag.strip("OP_RETURN  BRIDGE ab cd"),
            Some(vec!["ab", "cd"])
        );
        assert_eq!(tag.strip("OP_RETURN BRIDGE"), Some(vec![]));
        assert_eq!(tag.strip("OP_RETURN 6869"), None);
        assert_eq!(tag.strip("OP_DUP OP_RETURN BRIDGE ab"), None);
        assert_eq!(tag.strip(""), None);
    }

    #[test]
    fn blank_tag_is_empty() {
        assert!(MarkerTag::new("  ").is_empty());
        assert!(!MarkerTag::default().is_empty());
    }

    #[test]
    fn custom_tag() {
        let tag = MarkerTag::new("OP_RETURN ZBRIDGE v1");
        assert_eq!(tag.to_string(), "OP_RETURN ZBRIDGE v1");
        assert_eq!(tag.strip("OP_RETURN ZBRIDGE v1 00"), Some(vec!["00"]));
        assert_eq!(tag.strip("OP_RETURN BRIDGE 00"), None);
    }
}
