// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Kubernetes annotation keys understood by this crate
pub mod annotations {
    /// Logical cluster an object belongs to
    pub const CLUSTER: &str = "kcp.io/cluster";
}

/// Header (`X-Kubernetes-Cluster`) set to `<cluster>` on a request as an
/// alternative to the `/clusters/<cluster>` path prefix. Lowercase, as
/// required for static header names.
pub const CLUSTER_HEADER: &str = "x-kubernetes-cluster";

/// Logical cluster every cluster client is validated against on construction
pub const ROOT_CLUSTER: &str = "root";

/// Index names registered on cluster-aware indexers
pub mod indexes {
    /// Index by cluster-aware key `cluster|`
    pub const CLUSTER: &str = "cluster";
    /// Index by cluster-aware key `cluster|namespace/`
    pub const CLUSTER_AND_NAMESPACE: &str = "cluster-and-namespace";
    /// Index by bare logical cluster name
    pub const BY_LOGICAL_CLUSTER: &str = "kcp-byWorkspace";
}

/// Discovery client defaults
pub mod discovery {
    /// Per-request timeout when none is configured. 32s, to be distinguishable
    /// from other timeouts in the stack.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 32;
}
