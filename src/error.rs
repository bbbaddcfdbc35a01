// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("expected cluster in context")]
    MissingCluster,

    #[error("Client construction failed: {0}")]
    Constructor(#[source] tower::BoxError),

    #[error("unexpected key format: {0:?}")]
    MalformedKey(String),

    #[error("object has no meta: {0}")]
    MissingMetadata(String),

    #[error("{resource} {name:?} not found")]
    NotFound { resource: String, name: String },

    #[error("Indexer conflict: {0}")]
    IndexerConflict(String),

    #[error("Index with name {0} does not exist")]
    UnknownIndex(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// True for lookups of objects unknown to a cache, and for API 404s
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::KubeError(kube::Error::Api(response)) => response.code == 404,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
