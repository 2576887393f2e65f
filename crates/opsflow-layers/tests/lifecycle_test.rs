mod common;

use common::{CLUSTER_ARN, TestBackend, custom_layer, ecs_layer, haproxy_layer};
use opsflow_cloud::{CloudError, CloudWatchLogsConfiguration};
use opsflow_layers::fake::{FakeOperation, REDACTED, RecordedCall, TagCall};
use opsflow_layers::{
    AttributeValue, CloudWatchLogConfig, LayerError, LayerInstance, LayerVariant, Lifecycle,
    LoadBasedAutoScaling, LogStreamConfig, Operation, ScalingThresholds, VolumeConfig,
};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_create_sends_auto_healing_and_empty_volume_list() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::Custom);

    let mut desired = custom_layer("web1");
    desired.auto_healing = true;

    let created = assert_ok!(resource.create(&desired).await);

    let creates = backend.api.calls_to(FakeOperation::CreateLayer);
    assert_eq!(creates.len(), 1);
    let RecordedCall::CreateLayer(request) = &creates[0] else {
        panic!("expected a create call, got {:?}", creates[0]);
    };
    assert_eq!(request.name, "web1");
    assert_eq!(request.enable_auto_healing, Some(true));
    assert!(request.volume_configurations.is_empty());

    let wire = serde_json::to_value(request).unwrap();
    assert_eq!(wire["EnableAutoHealing"], true);
    assert_eq!(wire["VolumeConfigurations"], serde_json::json!([]));

    let read = assert_ok!(resource.read(&created).await).expect("layer should exist");
    assert!(read.auto_healing);
    assert_eq!(read.name.as_deref(), Some("web1"));
    assert_eq!(read.short_name.as_deref(), Some("web1"));
}

#[tokio::test]
async fn test_create_with_one_volume_reads_back_same_entry() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::Custom);

    let volume = VolumeConfig {
        volume_type: "gp2".to_string(),
        ..VolumeConfig::new("/data", 2, 100)
    };
    let mut desired = custom_layer("db");
    desired.volumes.insert(volume.clone());

    let created = assert_ok!(resource.create(&desired).await);
    let read = assert_ok!(resource.read(&created).await).unwrap();

    assert_eq!(read.volumes.len(), 1);
    assert_eq!(read.volumes.get("/data"), Some(&volume));
}

#[tokio::test]
async fn test_cluster_registered_before_create_and_deregistered_after_delete() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::EcsCluster);

    let created = assert_ok!(resource.create(&ecs_layer()).await);
    assert_eq!(created.cluster_arn(), Some(CLUSTER_ARN));
    assert_eq!(created.name.as_deref(), Some("Ecs Cluster"));

    let calls = backend.api.calls();
    assert_eq!(
        calls[0],
        RecordedCall::RegisterCluster {
            cluster_arn: CLUSTER_ARN.to_string(),
            stack_id: "stack-1".to_string(),
        }
    );
    assert_eq!(calls[1].operation(), FakeOperation::CreateLayer);
    assert!(backend.api.registered_clusters().contains_key(CLUSTER_ARN));

    backend.clear_calls();
    assert_ok!(resource.delete(&created).await);

    let operations: Vec<_> = backend.api.calls().iter().map(|c| c.operation()).collect();
    assert_eq!(
        operations,
        vec![FakeOperation::DeleteLayer, FakeOperation::DeregisterCluster]
    );
    assert_eq!(
        backend.api.calls_to(FakeOperation::DeregisterCluster),
        vec![RecordedCall::DeregisterCluster(CLUSTER_ARN.to_string())]
    );
    assert!(backend.api.registered_clusters().is_empty());
}

#[tokio::test]
async fn test_tag_only_update_skips_layer_update() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::Custom);

    let created = assert_ok!(resource.create(&custom_layer("web1")).await);
    backend.clear_calls();

    let mut desired = created.clone();
    desired.tags.insert("env".to_string(), "prod".to_string());

    let updated = assert_ok!(resource.update(&created, &desired).await);

    assert_eq!(backend.api.count(FakeOperation::UpdateLayer), 0);
    assert_eq!(
        backend.tags.calls(),
        vec![TagCall::Update {
            arn: created.arn.clone().unwrap(),
            old: Default::default(),
            new: desired.tags.clone(),
        }]
    );
    assert_eq!(updated.tags, desired.tags);
}

#[tokio::test]
async fn test_read_of_missing_layer_reports_absence() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::Custom);

    let mut prior = custom_layer("ghost");
    prior.id = Some("layer-404".to_string());

    let read = assert_ok!(resource.read(&prior).await);
    assert!(read.is_none());
}

#[tokio::test]
async fn test_layer_deleted_out_of_band_reads_as_absent() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::StaticWeb);

    let created = assert_ok!(resource.create(&LayerInstance::new("stack-1")).await);
    backend.api.remove_layer(created.id.as_deref().unwrap());

    assert_eq!(assert_ok!(resource.read(&created).await), None);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::EcsCluster);

    let created = assert_ok!(resource.create(&ecs_layer()).await);
    assert_ok!(resource.delete(&created).await);

    backend.clear_calls();
    assert_ok!(resource.delete(&created).await);

    // an already deleted layer has nothing left to deregister
    assert_eq!(
        backend
            .api
            .calls()
            .iter()
            .map(|c| c.operation())
            .collect::<Vec<_>>(),
        vec![FakeOperation::DeleteLayer]
    );
}

#[tokio::test]
async fn test_update_only_sends_changed_groups() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::Custom);

    let mut desired = custom_layer("web1");
    desired.volumes.insert(VolumeConfig::new("/data", 1, 50));
    desired.cloudwatch = Some(CloudWatchLogConfig {
        enabled: true,
        log_streams: vec![LogStreamConfig::new("/var/log/syslog", "web1")],
    });
    desired.custom_recipes.setup = vec!["base::setup".to_string()];
    desired.system_packages.insert("htop".to_string());

    let created = assert_ok!(resource.create(&desired).await);
    backend.clear_calls();

    let mut changed = created.clone();
    changed.auto_healing = false;
    let updated = assert_ok!(resource.update(&created, &changed).await);
    assert!(!updated.auto_healing);
    assert_eq!(updated.volumes, created.volumes);
    assert_eq!(updated.cloudwatch, created.cloudwatch);

    let updates = backend.api.calls_to(FakeOperation::UpdateLayer);
    assert_eq!(updates.len(), 1);
    let RecordedCall::UpdateLayer(request) = &updates[0] else {
        panic!("expected an update call");
    };
    assert_eq!(
        serde_json::to_value(request).unwrap(),
        serde_json::json!({
            "LayerId": created.id.clone().unwrap(),
            "EnableAutoHealing": false,
        })
    );
}

#[tokio::test]
async fn test_update_sends_only_changed_recipe_lists() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::Custom);

    let mut desired = custom_layer("app");
    desired.custom_recipes.setup = vec!["base::setup".to_string()];
    desired.custom_recipes.deploy = vec!["app::deploy".to_string()];
    let created = assert_ok!(resource.create(&desired).await);
    backend.clear_calls();

    let mut changed = created.clone();
    changed.custom_recipes.deploy.push("app::migrate".to_string());
    let updated = assert_ok!(resource.update(&created, &changed).await);

    let updates = backend.api.calls_to(FakeOperation::UpdateLayer);
    let RecordedCall::UpdateLayer(request) = &updates[0] else {
        panic!("expected an update call");
    };
    let recipes = request.custom_recipes.as_ref().unwrap();
    assert_eq!(recipes.setup, None);
    assert_eq!(
        recipes.deploy,
        Some(vec!["app::deploy".to_string(), "app::migrate".to_string()])
    );
    assert_eq!(updated.custom_recipes, changed.custom_recipes);
}

#[tokio::test]
async fn test_write_only_attribute_kept_from_local_state() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::HaProxy);

    let created = assert_ok!(resource.create(&haproxy_layer("s3cret")).await);
    let id = created.id.clone().unwrap();

    let stored = backend.api.layer(&id).unwrap();
    assert_eq!(
        stored.attributes.get("HaproxyStatsPassword").map(String::as_str),
        Some("s3cret")
    );
    assert_eq!(
        created.attributes.get("stats_password"),
        Some(&AttributeValue::from("s3cret"))
    );
    assert_eq!(
        created.attributes.get("stats_url"),
        Some(&AttributeValue::from("/haproxy?stats"))
    );

    let read = assert_ok!(resource.read(&created).await).unwrap();
    assert_eq!(
        read.attributes.get("stats_password"),
        Some(&AttributeValue::from("s3cret"))
    );

    let imported = assert_ok!(resource.import(&id).await).unwrap();
    assert!(!imported.attributes.contains_key("stats_password"));
    assert_ne!(
        imported.attributes.get("stats_password"),
        Some(&AttributeValue::from(REDACTED))
    );
    assert_eq!(imported.stack_id, "stack-1");
}

#[tokio::test]
async fn test_registration_retries_transient_errors() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::EcsCluster);

    backend.api.fail_next(
        FakeOperation::RegisterCluster,
        CloudError::ApiError("role not yet assumable".to_string()),
    );
    backend.api.fail_next(
        FakeOperation::RegisterCluster,
        CloudError::Timeout("register".to_string()),
    );

    assert_ok!(resource.create(&ecs_layer()).await);
    assert_eq!(backend.api.count(FakeOperation::RegisterCluster), 3);
    assert_eq!(backend.api.count(FakeOperation::CreateLayer), 1);
}

#[tokio::test]
async fn test_registration_failure_leaves_no_layer() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::EcsCluster);

    for _ in 0..3 {
        backend.api.fail_next(
            FakeOperation::RegisterCluster,
            CloudError::ApiError("throttled".to_string()),
        );
    }

    let err = assert_err!(resource.create(&ecs_layer()).await);
    assert!(matches!(
        err,
        LayerError::Remote {
            operation: Operation::RegisteringCluster(_),
            ..
        }
    ));
    assert_eq!(err.orphaned_layer_id(), None);
    assert_eq!(backend.api.count(FakeOperation::RegisterCluster), 3);
    assert_eq!(backend.api.count(FakeOperation::CreateLayer), 0);
}

#[tokio::test]
async fn test_permanent_registration_error_is_not_retried() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::EcsCluster);

    backend.api.fail_next(
        FakeOperation::RegisterCluster,
        CloudError::InvalidConfig("cluster belongs to another account".to_string()),
    );

    let err = assert_err!(resource.create(&ecs_layer()).await);
    assert!(err.to_string().contains("cluster belongs to another account"));
    assert_eq!(backend.api.count(FakeOperation::RegisterCluster), 1);
}

#[tokio::test]
async fn test_attach_failure_after_create_is_partial() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::Custom);

    let mut desired = custom_layer("web1");
    desired.elastic_load_balancer = Some("web-elb".to_string());
    backend.api.fail_next(
        FakeOperation::AttachLoadBalancer,
        CloudError::ApiError("load balancer busy".to_string()),
    );

    let err = assert_err!(resource.create(&desired).await);
    assert!(matches!(
        &err,
        LayerError::PartialFailure {
            lifecycle: Lifecycle::Create,
            operation: Operation::AttachingLoadBalancer(name),
            ..
        } if name == "web-elb"
    ));

    let orphan = err.orphaned_layer_id().unwrap();
    assert!(backend.api.layer(orphan).is_some());
    assert!(err.to_string().contains("load balancer busy"));
}

#[tokio::test]
async fn test_tag_failure_after_create_is_partial() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::Custom);

    let mut desired = custom_layer("web1");
    desired.tags.insert("team".to_string(), "platform".to_string());
    backend
        .tags
        .fail_next(CloudError::ApiError("tagging throttled".to_string()));

    let err = assert_err!(resource.create(&desired).await);
    assert!(matches!(
        err,
        LayerError::PartialFailure {
            lifecycle: Lifecycle::Create,
            operation: Operation::UpdatingTags,
            ..
        }
    ));
    assert_eq!(backend.api.count(FakeOperation::CreateLayer), 1);
}

#[tokio::test]
async fn test_create_pushes_tags_and_read_lists_them() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::Custom);

    let mut desired = custom_layer("web1");
    desired.tags.insert("team".to_string(), "platform".to_string());

    let created = assert_ok!(resource.create(&desired).await);
    assert_eq!(created.tags, desired.tags);
    // one describe to learn the ARN, one for the final read
    assert_eq!(backend.api.count(FakeOperation::DescribeLayer), 2);

    let arn = created.arn.clone().unwrap();
    assert_eq!(backend.tags.tags(&arn), desired.tags);

    backend.clear_calls();
    let read = assert_ok!(resource.read(&created).await).unwrap();
    assert_eq!(read.tags, desired.tags);
    assert_eq!(backend.tags.calls(), vec![TagCall::List(arn)]);
}

#[tokio::test]
async fn test_deregistration_failure_after_delete_is_partial() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::EcsCluster);

    let created = assert_ok!(resource.create(&ecs_layer()).await);
    let id = created.id.clone().unwrap();
    backend.api.fail_next(
        FakeOperation::DeregisterCluster,
        CloudError::ApiError("cluster busy".to_string()),
    );

    let err = assert_err!(resource.delete(&created).await);
    assert!(matches!(
        err,
        LayerError::PartialFailure {
            lifecycle: Lifecycle::Delete,
            operation: Operation::DeregisteringCluster(_),
            ..
        }
    ));
    assert_eq!(err.orphaned_layer_id(), None);
    assert!(backend.api.layer(&id).is_none());
    assert!(backend.api.registered_clusters().contains_key(CLUSTER_ARN));
}

#[tokio::test]
async fn test_load_balancer_swap_detaches_then_attaches() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::Custom);

    let mut desired = custom_layer("web1");
    desired.elastic_load_balancer = Some("old-elb".to_string());
    let created = assert_ok!(resource.create(&desired).await);
    assert_eq!(created.elastic_load_balancer.as_deref(), Some("old-elb"));
    backend.clear_calls();

    let mut changed = created.clone();
    changed.elastic_load_balancer = Some("new-elb".to_string());
    let updated = assert_ok!(resource.update(&created, &changed).await);

    let id = created.id.clone().unwrap();
    let side_effects: Vec<_> = backend
        .api
        .calls()
        .into_iter()
        .filter(|c| {
            matches!(
                c.operation(),
                FakeOperation::AttachLoadBalancer | FakeOperation::DetachLoadBalancer
            )
        })
        .collect();
    assert_eq!(
        side_effects,
        vec![
            RecordedCall::DetachLoadBalancer {
                load_balancer: "old-elb".to_string(),
                layer_id: id.clone(),
            },
            RecordedCall::AttachLoadBalancer {
                load_balancer: "new-elb".to_string(),
                layer_id: id.clone(),
            },
        ]
    );
    assert_eq!(backend.api.count(FakeOperation::UpdateLayer), 0);
    assert_eq!(updated.elastic_load_balancer.as_deref(), Some("new-elb"));
    assert_eq!(backend.api.load_balancers(&id), vec!["new-elb".to_string()]);
}

#[tokio::test]
async fn test_more_than_one_load_balancer_is_an_error() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::Custom);

    let created = assert_ok!(resource.create(&custom_layer("web1")).await);
    let id = created.id.clone().unwrap();
    backend.api.add_load_balancer(&id, "a");
    backend.api.add_load_balancer(&id, "b");

    let err = assert_err!(resource.read(&created).await);
    assert!(matches!(
        err,
        LayerError::Remote {
            operation: Operation::ReadingLoadBalancers,
            source: CloudError::TooManyResults { count: 2, .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_force_replace_change_is_refused() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::EcsCluster);

    let created = assert_ok!(resource.create(&ecs_layer()).await);
    backend.clear_calls();

    let mut changed = created.clone();
    changed.attributes.insert(
        "ecs_cluster_arn".to_string(),
        "arn:aws:ecs:us-east-1:123456789012:cluster/staging".into(),
    );

    let err = assert_err!(resource.update(&created, &changed).await);
    assert!(matches!(&err, LayerError::Validation(msg) if msg.contains("ecs_cluster_arn")));
    assert!(backend.api.calls().is_empty());
}

#[tokio::test]
async fn test_invalid_input_rejected_before_remote_calls() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::Custom);

    let mut desired = custom_layer("web1");
    desired.short_name = None;
    assert!(matches!(
        resource.create(&desired).await,
        Err(LayerError::Validation(_))
    ));

    let ganglia = backend.resource(LayerVariant::Ganglia);
    let err = assert_err!(ganglia.create(&LayerInstance::new("stack-1")).await);
    assert!(err.to_string().contains("password"));

    assert!(backend.api.calls().is_empty());
}

#[tokio::test]
async fn test_custom_json_is_normalized() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::Custom);

    let mut desired = custom_layer("web1");
    desired.custom_json = Some("{ \"chef\" : { \"log_level\" : \"info\" } }".to_string());

    let created = assert_ok!(resource.create(&desired).await);
    assert_eq!(
        created.custom_json.as_deref(),
        Some(r#"{"chef":{"log_level":"info"}}"#)
    );
}

#[tokio::test]
async fn test_auto_scaling_applied_and_disabled() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::Custom);

    let scaling = LoadBasedAutoScaling {
        enable: true,
        upscaling: Some(ScalingThresholds::upscaling()),
        downscaling: Some(ScalingThresholds::downscaling()),
    };
    let mut desired = custom_layer("web1");
    desired.load_based_auto_scaling = Some(scaling.clone());

    let created = assert_ok!(resource.create(&desired).await);
    assert_eq!(created.load_based_auto_scaling, Some(scaling));

    let mut changed = created.clone();
    changed.load_based_auto_scaling = None;
    let updated = assert_ok!(resource.update(&created, &changed).await);

    let sets = backend.api.calls_to(FakeOperation::SetAutoScaling);
    let Some(RecordedCall::SetAutoScaling(last)) = sets.last() else {
        panic!("expected a set-auto-scaling call");
    };
    assert_eq!(last.enable, Some(false));
    assert_eq!(
        updated.load_based_auto_scaling.map(|s| s.enable),
        Some(false)
    );
}

#[tokio::test]
async fn test_import_rejects_layer_of_another_kind() {
    let backend = TestBackend::new();
    let haproxy = backend.resource(LayerVariant::HaProxy);
    let created = assert_ok!(haproxy.create(&haproxy_layer("pw")).await);

    let memcached = backend.resource(LayerVariant::Memcached);
    let err = assert_err!(memcached.import(created.id.as_deref().unwrap()).await);
    assert!(matches!(err, LayerError::Validation(_)));
}

fn fully_configured(name: &str) -> LayerInstance {
    let mut layer = custom_layer(name);
    layer.volumes.insert(VolumeConfig::new("/data", 1, 50));
    layer.cloudwatch = Some(CloudWatchLogConfig {
        enabled: true,
        log_streams: vec![LogStreamConfig::new("/var/log/syslog", name)],
    });
    layer.load_based_auto_scaling = Some(LoadBasedAutoScaling {
        enable: true,
        upscaling: Some(ScalingThresholds::upscaling()),
        downscaling: None,
    });
    layer
}

#[tokio::test]
async fn test_removed_volumes_sent_as_empty_list() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::Custom);

    let created = assert_ok!(resource.create(&fully_configured("db")).await);
    backend.clear_calls();

    let mut changed = created.clone();
    changed.volumes = Default::default();
    let updated = assert_ok!(resource.update(&created, &changed).await);

    let updates = backend.api.calls_to(FakeOperation::UpdateLayer);
    let RecordedCall::UpdateLayer(request) = &updates[0] else {
        panic!("expected an update call");
    };
    assert_eq!(request.volume_configurations, Some(Vec::new()));
    assert_eq!(request.cloud_watch_logs_configuration, None);
    assert!(updated.volumes.is_empty());

    let wire = serde_json::to_value(request).unwrap();
    assert_eq!(wire["VolumeConfigurations"], serde_json::json!([]));
}

#[tokio::test]
async fn test_removed_cloudwatch_sent_disabled() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::Custom);

    let created = assert_ok!(resource.create(&fully_configured("web1")).await);
    backend.clear_calls();

    let mut changed = created.clone();
    changed.cloudwatch = None;
    let updated = assert_ok!(resource.update(&created, &changed).await);

    let updates = backend.api.calls_to(FakeOperation::UpdateLayer);
    assert_eq!(updates.len(), 1);
    let RecordedCall::UpdateLayer(request) = &updates[0] else {
        panic!("expected an update call");
    };
    assert_eq!(
        request.cloud_watch_logs_configuration,
        Some(CloudWatchLogsConfiguration {
            enabled: Some(false),
            log_streams: Some(Vec::new()),
        })
    );
    assert_eq!(request.volume_configurations, None);
    assert!(updated.cloudwatch.as_ref().is_none_or(|cw| !cw.enabled));
}

#[tokio::test]
async fn test_removed_blocks_do_not_diff_again() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::Custom);

    let created = assert_ok!(resource.create(&fully_configured("web1")).await);

    let mut removed = created.clone();
    removed.cloudwatch = None;
    removed.load_based_auto_scaling = None;
    let observed = assert_ok!(resource.update(&created, &removed).await);
    assert_eq!(backend.api.count(FakeOperation::UpdateLayer), 1);
    assert_eq!(backend.api.count(FakeOperation::SetAutoScaling), 2);

    backend.clear_calls();
    let mut desired = removed.clone();
    desired.tags.insert("env".to_string(), "prod".to_string());
    assert_ok!(resource.update(&observed, &desired).await);

    assert_eq!(backend.api.count(FakeOperation::UpdateLayer), 0);
    assert_eq!(backend.api.count(FakeOperation::SetAutoScaling), 0);
    assert_eq!(backend.tags.calls().len(), 1);
}

#[tokio::test]
async fn test_attach_failure_during_update_is_partial() {
    let backend = TestBackend::new();
    let resource = backend.resource(LayerVariant::Custom);

    let created = assert_ok!(resource.create(&custom_layer("web1")).await);
    let id = created.id.clone().unwrap();

    let mut changed = created.clone();
    changed.elastic_load_balancer = Some("web-elb".to_string());
    backend.api.fail_next(
        FakeOperation::AttachLoadBalancer,
        CloudError::ApiError("load balancer busy".to_string()),
    );

    let err = assert_err!(resource.update(&created, &changed).await);
    assert!(matches!(
        &err,
        LayerError::PartialFailure {
            lifecycle: Lifecycle::Update,
            operation: Operation::AttachingLoadBalancer(name),
            ..
        } if name == "web-elb"
    ));
    assert_eq!(err.orphaned_layer_id(), Some(id.as_str()));
    assert!(backend.api.layer(&id).is_some());
    assert!(backend.api.load_balancers(&id).is_empty());
}
