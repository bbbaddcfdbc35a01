// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Value types of the logical cluster addressing model.

pub mod key;
pub mod logical_cluster;

pub use key::{parse_key, split_meta_cluster_namespace_key, to_cluster_aware_key, Key};
pub use logical_cluster::Name;
