//! Lifecycle tests against the in-memory control plane

use clusterform_core::{ClusterConfig, ClusterDescription, Container, OperationState};
use clusterform_provider::{
    ApiError, ClusterClient, MockClusterApi, ProviderError, RecordedCall,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const PROJECT: &str = "5f1b2c3d4e5f6a7b8c9d0e1f";

fn config(paused: bool) -> ClusterConfig {
    let mut config = ClusterConfig::from_yaml(&format!(
        r#"
projectId: {PROJECT}
name: orders
clusterType: GEOSHARDED
replicationSpecs:
  - zoneName: Zone 1
    regionConfigs:
      - providerName: AWS
        regionName: US_EAST_1
        priority: 7
        electableSpecs:
          instanceSize: M10
          nodeCount: 3
  - zoneName: Zone 2
    regionConfigs:
      - providerName: GCP
        regionName: CENTRAL_US
        priority: 7
        electableSpecs:
          instanceSize: M10
          nodeCount: 3
"#
    ))
    .unwrap();
    config.paused = paused;
    config
}

fn containers() -> Vec<Container> {
    vec![
        Container {
            id: "vpc-aws".to_string(),
            provider_name: "AWS".to_string(),
            region_name: Some("US_EAST_1".to_string()),
            ..Default::default()
        },
        Container {
            id: "net-gcp".to_string(),
            provider_name: "GCP".to_string(),
            ..Default::default()
        },
    ]
}

fn client(api: &MockClusterApi) -> ClusterClient<MockClusterApi> {
    ClusterClient::new(api.clone()).with_poll_intervals(Duration::from_secs(1), Duration::ZERO)
}

mod create {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_create_waits_and_reads_back() {
        let api = MockClusterApi::new()
            .settle_after(3)
            .with_containers(containers());
        let state = client(&api).create(&config(false)).await.unwrap();

        assert_eq!(state.state(), Some(OperationState::Idle));
        let specs = &state.cluster.replication_specs;
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].zone_name, "Zone 1");
        assert!(specs[0].has_id());
        assert_eq!(specs[0].container_id["AWS:US_EAST_1"], "vpc-aws");
        assert_eq!(specs[1].container_id["GCP:CENTRAL_US"], "net-gcp");

        let counts = api.operation_counts();
        assert_eq!(counts.creates, 1);
        assert_eq!(counts.pauses, 0);
        assert_eq!(counts.container_lists, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_paused_pauses_afterwards() {
        let api = MockClusterApi::new().settle_after(1);
        let state = client(&api).create(&config(true)).await.unwrap();

        assert_eq!(state.cluster.paused, Some(true));
        let calls = api.calls();
        let create_at = calls
            .iter()
            .position(|c| matches!(c, RecordedCall::Create { .. }))
            .unwrap();
        let pause_at = calls
            .iter()
            .position(|c| matches!(c, RecordedCall::Update { patch, .. } if patch.paused == Some(true)))
            .unwrap();
        assert!(create_at < pause_at);

        let RecordedCall::Create { request } = &calls[create_at] else {
            unreachable!()
        };
        assert_eq!(request.paused, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_rejected_keeps_remote_message() {
        let api = MockClusterApi::new();
        api.fail_next_create(ApiError::remote(
            400,
            Some("INVALID_CLUSTER_CONFIGURATION"),
            "The specified cluster configuration is not valid.",
        ));

        let err = client(&api).create(&config(false)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "HTTP 400 INVALID_CLUSTER_CONFIGURATION: The specified cluster configuration is not valid."
        );
        assert_eq!(api.operation_counts().gets, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_never_reaches_remote() {
        let api = MockClusterApi::new();
        let mut bad = config(false);
        bad.replication_specs[0].region_configs[0].priority = 1;
        let extra = bad.replication_specs[1].region_configs[0].clone();
        bad.replication_specs[0].region_configs.push(extra);

        let err = client(&api).create(&bad).await.unwrap_err();
        assert!(matches!(err, ProviderError::Core(_)));
        assert!(api.calls().is_empty());
    }
}

mod read {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_read_follows_desired_order() {
        let api = MockClusterApi::new();
        let client = client(&api);
        client.create(&config(false)).await.unwrap();

        let mut desired = config(false).replication_specs;
        desired.reverse();

        let state = client
            .read(PROJECT, "orders", Some(desired.as_slice()))
            .await
            .unwrap()
            .unwrap();
        let zones: Vec<&str> = state
            .cluster
            .replication_specs
            .iter()
            .map(|s| s.zone_name.as_str())
            .collect();
        assert_eq!(zones, vec!["Zone 2", "Zone 1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_missing_is_none() {
        let api = MockClusterApi::new();
        assert!(client(&api).read(PROJECT, "orders", None).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_container_failure_propagates() {
        let api = MockClusterApi::new();
        let client = client(&api);
        client.create(&config(false)).await.unwrap();

        api.fail_next_container_list(ApiError::remote(403, Some("FORBIDDEN"), "no access"));
        let err = client.read(PROJECT, "orders", None).await.unwrap_err();
        assert_eq!(err.api_error().and_then(ApiError::status), Some(403));
    }
}

mod update {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_update_on_paused_cluster_resumes_and_repauses() {
        let api = MockClusterApi::new().settle_after(1);
        let client = client(&api);
        let created = client.create(&config(true)).await.unwrap();
        let prior = created.applied_config(&config(true));
        api.reset_counts();

        let mut next = config(true);
        next.disk_size_gb = Some(80.0);
        let state = client.update(&prior, &next).await.unwrap();

        let counts = api.operation_counts();
        assert_eq!(counts.updates, 2);
        assert_eq!(counts.unpauses, 1);
        assert_eq!(counts.pauses, 1);
        assert_eq!(state.cluster.paused, Some(true));
        assert_eq!(state.cluster.disk_size_gb, Some(80.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_modifies_existing_zones() {
        let api = MockClusterApi::new();
        let client = client(&api);
        let created = client.create(&config(false)).await.unwrap();
        let prior = created.applied_config(&config(false));
        let known_ids: Vec<String> = prior.replication_specs.iter().map(|s| s.id.clone()).collect();

        let mut next = config(false);
        next.replication_specs[1].num_shards = 2;
        let state = client.update(&prior, &next).await.unwrap();

        let patch = api.update_patches().pop().unwrap();
        let sent: Vec<String> = patch
            .replication_specs
            .unwrap()
            .iter()
            .map(|s| s.id.clone())
            .collect();
        assert_eq!(sent, known_ids);
        assert_eq!(state.cluster.replication_specs[1].num_shards, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_change_skips_remote_mutation() {
        let api = MockClusterApi::new();
        let client = client(&api);
        let created = client.create(&config(false)).await.unwrap();
        let prior = created.applied_config(&config(false));
        api.reset_counts();

        client.update(&prior, &config(false)).await.unwrap();
        let counts = api.operation_counts();
        assert_eq!(counts.updates + counts.pauses + counts.unpauses + counts.upgrades, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rename_rejected() {
        let api = MockClusterApi::new();
        let mut next = config(false);
        next.name = "payments".to_string();

        let err = client(&api).update(&config(false), &next).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidConfig(_)));
    }
}

mod upgrade {
    use super::*;

    fn shared() -> ClusterConfig {
        ClusterConfig::from_yaml(&format!(
            r#"
projectId: {PROJECT}
name: sandbox
replicationSpecs:
  - regionConfigs:
      - providerName: TENANT
        backingProviderName: AWS
        regionName: US_EAST_1
        priority: 7
        electableSpecs:
          instanceSize: M2
"#
        ))
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_tier_resize_uses_upgrade() {
        let api = MockClusterApi::new();
        let client = client(&api);
        let created = client.create(&shared()).await.unwrap();
        let prior = created.applied_config(&shared());

        let mut next = shared();
        let region = &mut next.replication_specs[0].region_configs[0];
        region.provider_name = "AWS".to_string();
        region.backing_provider_name = None;
        region.electable_specs.as_mut().unwrap().instance_size = "M10".to_string();

        let state = client.update(&prior, &next).await.unwrap();

        let counts = api.operation_counts();
        assert_eq!(counts.upgrades, 1);
        assert_eq!(counts.updates, 0);
        let region = &state.cluster.replication_specs[0].region_configs[0];
        assert_eq!(region.electable_instance_size(), Some("M10"));
    }
}

mod delete {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_delete_waits_until_gone() {
        let api = MockClusterApi::new().settle_after(2);
        let client = client(&api);
        client.create(&config(false)).await.unwrap();

        let mut config = config(false);
        config.retain_backups_enabled = Some(true);
        client.delete(&config).await.unwrap();

        assert!(api.cluster(PROJECT, "orders").is_none());
        let retained = api.calls().iter().any(|c| {
            matches!(c, RecordedCall::Delete { options, .. } if options.retain_backups)
        });
        assert!(retained);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_missing_cluster_fails() {
        let api = MockClusterApi::new();
        let err = client(&api).delete(&config(false)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_timeout() {
        let existing = ClusterDescription {
            name: "orders".to_string(),
            state_name: OperationState::Idle.to_string(),
            ..Default::default()
        };
        let api = MockClusterApi::with_clusters(PROJECT, vec![existing]).settle_after(10_000);
        let client = client(&api);

        let mut config = config(false);
        config.timeouts.delete = Duration::from_secs(30);
        let err = client.delete(&config).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("DELETING"));
    }
}

mod import {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_import_builds_config_from_remote() {
        let api = MockClusterApi::new();
        let client = client(&api);
        client.create(&config(false)).await.unwrap();

        let (imported, state) = client
            .import(&format!("{PROJECT}-orders"))
            .await
            .unwrap();
        assert_eq!(imported.project_id, PROJECT);
        assert_eq!(imported.name, "orders");
        assert_eq!(imported.cluster_type, "GEOSHARDED");
        assert_eq!(imported.replication_specs.len(), 2);
        assert_eq!(state.cluster.name, "orders");
    }

    #[tokio::test(start_paused = true)]
    async fn test_import_bad_id() {
        let api = MockClusterApi::new();
        let err = client(&api).import("orders").await.unwrap_err();
        assert!(matches!(err, ProviderError::Core(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_import_missing_cluster() {
        let api = MockClusterApi::new();
        let err = client(&api)
            .import(&format!("{PROJECT}-orders"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ClusterNotFound { .. }));
    }
}

mod cancellation {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_create_wait() {
        let api = MockClusterApi::new().settle_after(10_000);
        let cancel = CancellationToken::new();
        let client = client(&api).with_cancellation(cancel.clone());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            cancel.cancel();
        });

        let err = client.create(&config(false)).await.unwrap_err();
        assert!(matches!(err, ProviderError::Cancelled { .. }));
    }
}
