// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Logical cluster names.
//!
//! A logical cluster is a colon separated list of words, like a path with colons
//! instead of slashes (`root:org:team`). It names
//! 1. a http path prefix serving a Kubernetes-like API (`/clusters/<name>`),
//! 2. the cluster an object belongs to in cross-cluster list/watches.

use crate::constants::annotations;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

const SEPARATOR: char = ':';

/// Name of a logical cluster. The empty name means "unspecified".
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(String);

impl Name {
    /// Wraps a string. No validation is performed.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The logical cluster indicating cross-cluster requests.
    pub fn wildcard() -> Self {
        Self::new("*")
    }

    pub fn is_wildcard(&self) -> bool {
        self.0 == "*"
    }

    /// True if the logical cluster is unset.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Path segment used to reach the API of this logical cluster.
    pub fn path(&self) -> String {
        clean_join("/clusters", &self.0)
    }

    /// Parent of this logical cluster, if it has one.
    pub fn parent(&self) -> (Name, bool) {
        let (parent, _) = self.split();
        let has_parent = !parent.is_empty();
        (parent, has_parent)
    }

    /// Splits immediately following the final colon into a parent and a leaf.
    /// Without a colon the parent is empty and the leaf is the whole value.
    pub fn split(&self) -> (Name, String) {
        match self.0.rfind(SEPARATOR) {
            Some(i) => (Name::new(&self.0[..i]), self.0[i + 1..].to_string()),
            None => (Name::default(), self.0.clone()),
        }
    }

    /// Last component of the name.
    pub fn base(&self) -> String {
        self.split().1
    }

    /// Joins a child component below this logical cluster.
    pub fn join(&self, name: &str) -> Name {
        if self.0.is_empty() {
            return Name::new(name);
        }
        Name(format!("{}{}{}", self.0, SEPARATOR, name))
    }

    pub fn has_prefix(&self, other: &Name) -> bool {
        self.0.starts_with(&other.0)
    }

    /// Logical cluster recorded on an object's metadata.
    pub fn from_meta(meta: &ObjectMeta) -> Self {
        meta.annotations
            .as_ref()
            .and_then(|a| a.get(annotations::CLUSTER))
            .map(|v| Name::new(v.as_str()))
            .unwrap_or_default()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Name {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Name::new(s))
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::new(value)
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Name(value)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Joins `base` and `tail` into a rooted, lexically cleaned slash path.
fn clean_join(base: &str, tail: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(tail.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_split() {
        let cases = [
            ("", "", ""),
            ("foo", "", "foo"),
            ("foo:bar", "foo", "bar"),
            ("foo:bar:baz", "foo:bar", "baz"),
            ("foo::baz", "foo:", "baz"),
        ];
        for (value, parent, leaf) in cases {
            let (got_parent, got_leaf) = Name::new(value).split();
            assert_eq!(got_parent, Name::new(parent), "parent of {value:?}");
            assert_eq!(got_leaf, leaf, "leaf of {value:?}");
        }
    }

    #[test]
    fn test_parent() {
        assert_eq!(Name::new("root:org:team").parent(), (Name::new("root:org"), true));
        assert_eq!(Name::new("root").parent(), (Name::default(), false));
        assert_eq!(Name::default().parent(), (Name::default(), false));
    }

    #[test]
    fn test_base() {
        assert_eq!(Name::new("root:org:team").base(), "team");
        assert_eq!(Name::new("root").base(), "root");
    }

    #[test]
    fn test_join() {
        assert_eq!(Name::default().join("x"), Name::new("x"));
        assert_eq!(Name::new("root").join("org"), Name::new("root:org"));
        assert_eq!(Name::wildcard().join("x"), Name::new("*:x"));
    }

    #[test]
    fn test_join_then_split_roundtrips() {
        for parent in ["root", "root:org", "a::b", "*"] {
            for leaf in ["team", "x-1", "*"] {
                let parent = Name::new(parent);
                let joined = parent.join(leaf);
                assert_eq!(joined.split(), (parent.clone(), leaf.to_string()));
                assert_eq!(joined.parent(), (parent, true));
            }
        }
    }

    #[test]
    fn test_path() {
        assert_eq!(Name::new("test").path(), "/clusters/test");
        assert_eq!(Name::new("root:org").path(), "/clusters/root:org");
        assert_eq!(Name::default().path(), "/clusters");
        assert_eq!(Name::new("/test/").path(), "/clusters/test");
        assert_eq!(Name::wildcard().path(), "/clusters/*");
    }

    #[test]
    fn test_has_prefix() {
        assert!(Name::new("root:org").has_prefix(&Name::new("root")));
        assert!(Name::new("rooted").has_prefix(&Name::new("root")));
        assert!(!Name::new("root").has_prefix(&Name::new("root:org")));
    }

    #[test]
    fn test_wildcard() {
        assert!(Name::wildcard().is_wildcard());
        assert!(!Name::new("root").is_wildcard());
        assert_eq!(Name::wildcard().split(), (Name::default(), "*".to_string()));
    }

    #[test]
    fn test_json() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        struct Claims {
            i: i32,
            cn: Name,
        }

        let claims = Claims {
            i: 1,
            cn: Name::new("foo:bar"),
        };
        let encoded = serde_json::to_string(&claims).unwrap();
        assert_eq!(encoded, r#"{"i":1,"cn":"foo:bar"}"#);

        let decoded: Claims = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_from_meta() {
        let meta = ObjectMeta {
            name: Some("obj".to_string()),
            annotations: Some(BTreeMap::from([(
                annotations::CLUSTER.to_string(),
                "root:org".to_string(),
            )])),
            ..Default::default()
        };
        assert_eq!(Name::from_meta(&meta), Name::new("root:org"));
        assert_eq!(Name::from_meta(&ObjectMeta::default()), Name::default());
    }
}
