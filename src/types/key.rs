// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster-aware object keys.
//!
//! The textual form is `<cluster>|<namespace>/<name>`, collapsing to
//! `<cluster>|<name>` when the namespace is empty and to `<name>` (or
//! `<namespace>/<name>`) when no cluster is given.

use crate::error::{Error, Result};
use crate::types::logical_cluster::Name;
use std::fmt;
use std::str::FromStr;

const CLUSTER_SEPARATOR: char = '|';
const NAMESPACE_SEPARATOR: char = '/';

/// Identifies an instance of some implicit resource.
///
/// Passing a `Key` around instead of its string form means receivers never
/// deal with syntax errors.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    pub cluster: Name,
    pub namespace: String,
    pub name: String,
}

impl Key {
    pub fn new(cluster: Name, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            cluster,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn parts(&self) -> (&Name, &str, &str) {
        (&self.cluster, &self.namespace, &self.name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.cluster.is_empty() {
            write!(f, "{}{}", self.cluster, CLUSTER_SEPARATOR)?;
        }
        if !self.namespace.is_empty() {
            write!(f, "{}{}", self.namespace, NAMESPACE_SEPARATOR)?;
        }
        f.write_str(&self.name)
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_key(s)
    }
}

/// Formats a cluster, namespace and name as a key.
pub fn to_cluster_aware_key(cluster: &str, namespace: &str, name: &str) -> String {
    Key::new(Name::new(cluster), namespace, name).to_string()
}

/// Inverts the key encoding, complaining on syntax error.
pub fn parse_key(encoded: &str) -> Result<Key> {
    let (cluster, namespace, name) = split_meta_cluster_namespace_key(encoded)?;
    Ok(Key {
        cluster,
        namespace,
        name,
    })
}

/// Returns the cluster, namespace and name encoded into `key`.
pub fn split_meta_cluster_namespace_key(key: &str) -> Result<(Name, String, String)> {
    let invalid = || Error::MalformedKey(key.to_string());

    let mut outer = key.split(CLUSTER_SEPARATOR);
    let (cluster, rest) = match (outer.next(), outer.next(), outer.next()) {
        (Some(rest), None, None) => (Name::default(), rest),
        (Some(cluster), Some(rest), None) if !cluster.is_empty() => (Name::new(cluster), rest),
        _ => return Err(invalid()),
    };

    let (namespace, name) = split_meta_namespace_key(rest).ok_or_else(invalid)?;
    Ok((cluster, namespace.to_string(), name.to_string()))
}

fn split_meta_namespace_key(key: &str) -> Option<(&str, &str)> {
    let mut parts = key.split(NAMESPACE_SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), None, None) => Some(("", name)),
        (Some(namespace), Some(name), None) => Some((namespace, name)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        assert_eq!(to_cluster_aware_key("c1", "ns1", "n1"), "c1|ns1/n1");
        assert_eq!(to_cluster_aware_key("c1", "", "n1"), "c1|n1");
        assert_eq!(to_cluster_aware_key("", "", "n1"), "n1");
        assert_eq!(to_cluster_aware_key("", "ns1", "n1"), "ns1/n1");
        assert_eq!(to_cluster_aware_key("c1", "", ""), "c1|");
        assert_eq!(to_cluster_aware_key("c1", "ns1", ""), "c1|ns1/");
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            parse_key("c1|ns1/n1").unwrap(),
            Key::new(Name::new("c1"), "ns1", "n1")
        );
        assert_eq!(parse_key("c1|n1").unwrap(), Key::new(Name::new("c1"), "", "n1"));
        assert_eq!(parse_key("n1").unwrap(), Key::new(Name::default(), "", "n1"));
        assert_eq!(parse_key("ns1/n1").unwrap(), Key::new(Name::default(), "ns1", "n1"));
        assert_eq!(
            parse_key("root:org|ns1/n1").unwrap(),
            Key::new(Name::new("root:org"), "ns1", "n1")
        );
    }

    #[test]
    fn test_parse_rejects_malformed_keys() {
        for key in ["a|b|c", "c1|a/b/c", "a/b/c", "|n1"] {
            let err = parse_key(key).unwrap_err();
            assert!(matches!(err, Error::MalformedKey(ref k) if k == key), "{key}");
            assert_eq!(err.to_string(), format!("unexpected key format: {key:?}"));
        }
    }

    #[test]
    fn test_parse_inverts_format() {
        let triples = [
            ("c1", "ns1", "n1"),
            ("c1", "", "n1"),
            ("", "", "n1"),
            ("", "ns1", "n1"),
            ("c1", "", ""),
            ("c1", "ns1", ""),
            ("root:org:team", "kube-system", "coredns"),
            ("*", "default", "x"),
        ];
        for (cluster, namespace, name) in triples {
            let key: Key = to_cluster_aware_key(cluster, namespace, name).parse().unwrap();
            assert_eq!(key.parts(), (&Name::new(cluster), namespace, name));
        }
    }
}
