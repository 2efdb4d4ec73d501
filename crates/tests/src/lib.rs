//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置加载 -> 分类 -> spawn -> teardown 全流程（mock 后端，无需 CARLA）
//! - 失败回滚与销毁顺序

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;

    use actor_factory::{
        BackendCall, CarlaClient, MockCarlaClient, MockConfig, ProvisionIssue, RetryPolicy,
        SensorSpawnError, SpawnOrchestrator,
    };
    use config_loader::{overrides_from_vars, ConfigFormat, ConfigLoader};
    use contracts::{ObjectsDefinition, Pose, RuntimeSettings, UNATTACHED};

    async fn orchestrator(
        config: MockConfig,
        settings: RuntimeSettings,
    ) -> SpawnOrchestrator<MockCarlaClient> {
        let mut client = MockCarlaClient::with_config(config);
        client.connect("localhost", 2000).await.unwrap();
        client.wait_for_services().await.unwrap();
        SpawnOrchestrator::new(client, settings)
    }

    fn load(json: &str) -> ObjectsDefinition {
        ConfigLoader::load_from_str(json, ConfigFormat::Json).unwrap()
    }

    /// A vehicle refused three times is retried until the backend accepts it
    #[tokio::test]
    async fn test_vehicle_retried_until_accepted() {
        let mut orch = orchestrator(
            MockConfig {
                first_actor_id: 42,
                reject_first: HashMap::from([("ego".to_string(), 3)]),
                ..Default::default()
            },
            RuntimeSettings::default(),
        )
        .await;

        let summary = orch
            .spawn(load(
                r#"{"objects": [{"type": "vehicle.tesla.model3", "id": "ego"}]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(summary.players, vec![42]);
        assert!(summary.global_sensors.is_empty());
        assert_eq!(summary.sensors_spawned, 0);

        let requests = orch.client().spawn_requests();
        assert_eq!(requests.len(), 4);
        assert!(requests.iter().all(|r| r.id == "ego" && r.random_pose));
        assert!(requests.iter().all(|r| r.transform == Pose::ZERO));
        assert_eq!(orch.stats().summary().spawned.get("vehicle"), Some(&1));
    }

    /// A world sensor without a spawn point is skipped, the run continues
    #[tokio::test]
    async fn test_global_sensor_without_spawn_point_is_skipped() {
        let mut orch = orchestrator(MockConfig::default(), RuntimeSettings::default()).await;

        let summary = orch
            .spawn(load(
                r#"{"objects": [{"type": "sensor.camera.rgb", "id": "overview"}]}"#,
            ))
            .await
            .unwrap();

        assert!(summary.global_sensors.is_empty());
        assert!(matches!(
            &summary.issues[..],
            [ProvisionIssue::Sensor {
                owner: None,
                error: SensorSpawnError::MissingField { field, .. },
            }] if field == "spawn_point"
        ));
        assert!(orch.client().spawn_requests().is_empty());
        assert!(orch.ledger().is_empty());
    }

    /// Sensors-only mode attaches sensors to actors spawned by someone else
    #[tokio::test]
    async fn test_sensors_only_attaches_to_existing_actor() {
        let mut orch = orchestrator(
            MockConfig {
                existing_roles: HashMap::from([("ego".to_string(), 7)]),
                ..Default::default()
            },
            RuntimeSettings {
                sensors_only: true,
                ..Default::default()
            },
        )
        .await;

        let summary = orch
            .spawn(load(
                r#"{
                    "objects": [
                        {"type": "sensor.pseudo.actor_list", "id": "actor_list"},
                        {"type": "vehicle.tesla.model3", "id": "ego", "sensors": [
                            {"type": "sensor.camera.rgb", "id": "front",
                             "spawn_point": {"x": 2.0, "z": 1.5}},
                            {"type": "sensor.other.gnss", "id": "gnss"}
                        ]}
                    ]
                }"#,
            ))
            .await
            .unwrap();

        assert!(summary.players.is_empty());
        assert_eq!(summary.sensors_spawned, 2);

        let requests = orch.client().spawn_requests();
        assert!(requests
            .iter()
            .all(|r| !r.object_type.starts_with("vehicle")));
        let attached: Vec<_> = requests.iter().filter(|r| r.attach_to == 7).collect();
        assert_eq!(attached.len(), 2);
        assert_eq!(
            attached[0].transform,
            Pose::from_components(2.0, 0.0, 1.5, 0.0, 0.0, 0.0)
        );

        // 外部 actor 不归本进程销毁
        let report = orch.teardown().await;
        assert_eq!(report.attempted(), 3);
        assert!(!report.destroyed.contains(&7));
        assert!(orch.client().is_alive(7));
    }

    /// Unknown role names are reported and the remaining entities still get sensors
    #[tokio::test]
    async fn test_sensors_only_unknown_role() {
        let mut orch = orchestrator(
            MockConfig {
                existing_roles: HashMap::from([("hero".to_string(), 9)]),
                ..Default::default()
            },
            RuntimeSettings {
                sensors_only: true,
                ..Default::default()
            },
        )
        .await;

        let summary = orch
            .spawn(load(
                r#"{
                    "objects": [
                        {"type": "sensor.pseudo.actor_list", "id": "actor_list"},
                        {"type": "vehicle.tesla.model3", "id": "ego",
                         "sensors": [{"type": "sensor.other.gnss", "id": "gnss"}]},
                        {"type": "vehicle.audi.tt", "id": "hero",
                         "sensors": [{"type": "sensor.other.gnss", "id": "gnss"}]}
                    ]
                }"#,
            ))
            .await
            .unwrap();

        assert_eq!(summary.sensors_spawned, 1);
        assert!(summary
            .issues
            .contains(&ProvisionIssue::UnknownActor {
                entity_id: "ego".to_string()
            }));
        assert!(orch
            .client()
            .spawn_requests()
            .iter()
            .any(|r| r.attach_to == 9));
    }

    /// Spawn point overrides beat the definition file; attributes reach the backend
    #[tokio::test]
    async fn test_override_and_attributes_forwarded() {
        let overrides = overrides_from_vars([
            ("CARLA_SPAWNER_SPAWN_POINT_ego", "10,20,0.5,0,0,90"),
            ("HOME", "/root"),
        ]);
        let mut orch = orchestrator(
            MockConfig::default(),
            RuntimeSettings {
                sensors_only: false,
                overrides,
            },
        )
        .await;

        orch.spawn(load(
            r#"{
                "objects": [
                    {"type": "vehicle.tesla.model3", "id": "ego", "color": "0,0,255",
                     "spawn_point": {"x": 1.0, "y": 1.0, "z": 1.0},
                     "sensors": []}
                ]
            }"#,
        ))
        .await
        .unwrap();

        let requests = orch.client().spawn_requests();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].random_pose);
        assert_eq!(
            requests[0].transform,
            Pose::from_components(10.0, 20.0, 0.5, 0.0, 0.0, 90.0)
        );
        assert_eq!(requests[0].attach_to, UNATTACHED);
        assert_eq!(
            requests[0].attributes.get("color").map(String::as_str),
            Some("0,0,255")
        );
    }

    /// A failed run destroys everything it created, sensors before their owners
    #[tokio::test]
    async fn test_failure_unwinds_in_teardown_order() {
        let mut orch = orchestrator(
            MockConfig {
                reject_always: vec!["hero".to_string()],
                ..Default::default()
            },
            RuntimeSettings::default(),
        )
        .await
        .with_retry_policy(RetryPolicy::bounded(3));

        let result = orch
            .spawn(load(
                r#"{
                    "objects": [
                        {"type": "sensor.pseudo.traffic_lights", "id": "traffic_lights"},
                        {"type": "vehicle.tesla.model3", "id": "ego",
                         "sensors": [{"type": "sensor.other.imu", "id": "imu"}]},
                        {"type": "vehicle.audi.tt", "id": "hero"}
                    ]
                }"#,
            ))
            .await;

        assert!(result.is_err());
        // global sensor, ego's sensor, ego
        assert_eq!(orch.client().destroyed_ids(), vec![1000, 1002, 1001]);
        assert_eq!(orch.client().actor_count(), 0);
        assert_eq!(
            orch.client()
                .spawn_requests()
                .iter()
                .filter(|r| r.id == "hero")
                .count(),
            3
        );
    }

    /// Teardown keeps going past backend failures and never repeats itself
    #[tokio::test]
    async fn test_teardown_survives_destroy_failure() {
        let mut orch = orchestrator(
            MockConfig {
                fail_destroy: vec![1001],
                ..Default::default()
            },
            RuntimeSettings::default(),
        )
        .await;

        orch.spawn(load(
            r#"{
                "objects": [
                    {"type": "walker.pedestrian.0001", "id": "walker",
                     "sensors": [{"type": "sensor.other.collision", "id": "collision"}]}
                ]
            }"#,
        ))
        .await
        .unwrap();

        let report = orch.teardown().await;
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 1001);
        assert_eq!(report.destroyed, vec![1000]);
        assert!(!report.is_clean());

        let calls = orch.client().calls().len();
        assert_eq!(orch.teardown().await.attempted(), 0);
        assert_eq!(orch.client().calls().len(), calls);
        assert!(orch
            .client()
            .calls()
            .iter()
            .all(|call| !matches!(call, BackendCall::GetActor(_))));
    }
}
