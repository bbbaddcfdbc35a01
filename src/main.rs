// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::ListParams;
use kube_runtime::watcher;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use kube_logicalcluster::cache::{with_cancellation, ResourceEventHandlerFuncs, SharedIndexInformer};
use kube_logicalcluster::client::{ClusterDiscoveryClient, KubeClusterClient};
use kube_logicalcluster::config::infer_config;
use kube_logicalcluster::constants::ROOT_CLUSTER;
use kube_logicalcluster::types::Name;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cluster = Name::new(ROOT_CLUSTER);
    info!("Using logical cluster {}", cluster);

    let config = infer_config().await?;
    let clients = KubeClusterClient::new_for_config(config.clone())?;

    let discovery = ClusterDiscoveryClient::new_for_config(config)?;
    let group_versions = discovery.cluster(&cluster).server_group_versions().await?;
    info!("{} serves {} group versions", cluster, group_versions.len());

    let config_maps = clients.resource::<ConfigMap>().cluster(&cluster).all();
    let list = config_maps.list(&ListParams::default()).await?;
    info!("Found {} config maps in {}", list.items.len(), cluster);

    // One informer across all clusters, one handler for ours
    let informer = Arc::new(SharedIndexInformer::<ConfigMap>::new("configmaps"));
    let token = CancellationToken::new();
    let handler = ResourceEventHandlerFuncs::new()
        .with_add(|cm: &ConfigMap| info!("Added {:?}", cm.metadata.name))
        .with_update(|_: &ConfigMap, cm: &ConfigMap| info!("Updated {:?}", cm.metadata.name))
        .with_delete(|deleted| info!("Deleted {:?}", deleted.object().metadata.name));
    informer
        .cluster(&cluster)
        .add_cancellable_event_handler(with_cancellation(token.clone(), handler));

    let wildcard = clients.resource::<ConfigMap>().cluster(&Name::wildcard()).all();
    tokio::select! {
        _ = informer.watch(wildcard, watcher::Config::default()) => {
            warn!("Watch ended unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            token.cancel();
        }
    }

    Ok(())
}
