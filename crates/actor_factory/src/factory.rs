//! SpawnOrchestrator 核心实现
//!
//! 从 ObjectsDefinition spawn 所有对象，管理生命周期。
//!
//! 顺序：分类 -> 全局传感器 -> (sensors-only: 按 role 查找已有 actor) -> vehicles/walkers 及其传感器。

use std::collections::HashMap;

use contracts::{ActorId, ObjectCategory, ObjectsDefinition, RuntimeSettings, UNATTACHED};
use observability::SpawnMetricsAggregator;
use tracing::{error, info, instrument, warn};

use crate::actors::{ActorProvisioner, ProvisionIssue, SpawnMode};
use crate::classifier::classify;
use crate::client::CarlaClient;
use crate::error::Result;
use crate::ledger::{LifecycleLedger, TeardownReport};
use crate::retry::RetryPolicy;
use crate::sensors::{SensorFailurePolicy, SensorProvisioner, SensorSpawnError};

/// Result of a successful `spawn`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpawnSummary {
    /// Spawned vehicles/walkers
    pub players: Vec<ActorId>,
    /// Spawned world sensors
    pub global_sensors: Vec<ActorId>,
    /// Sensors attached to vehicles/walkers
    pub sensors_spawned: usize,
    /// Recoverable problems, in the order they happened
    pub issues: Vec<ProvisionIssue>,
}

/// Spawn Orchestrator
///
/// 持有后端客户端和 LifecycleLedger，负责 spawn 以及对称的 teardown。
/// `spawn` 失败时会先销毁已创建的 actors 再返回错误。
pub struct SpawnOrchestrator<C: CarlaClient> {
    client: C,
    settings: RuntimeSettings,
    retry: RetryPolicy,
    ledger: LifecycleLedger,
    stats: SpawnMetricsAggregator,
}

impl<C: CarlaClient> SpawnOrchestrator<C> {
    /// 创建新的 SpawnOrchestrator (无上限重试)
    ///
    /// `client` 需要已连接。
    pub fn new(client: C, settings: RuntimeSettings) -> Self {
        Self {
            client,
            settings,
            retry: RetryPolicy::unbounded(),
            ledger: LifecycleLedger::new(),
            stats: SpawnMetricsAggregator::new(),
        }
    }

    /// Replace the entity spawn retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn ledger(&self) -> &LifecycleLedger {
        &self.ledger
    }

    pub fn stats(&self) -> &SpawnMetricsAggregator {
        &self.stats
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    /// Spawn every object of `definition`.
    ///
    /// # 原子性保证
    /// 任何错误都会先销毁所有已创建的 actors，失败的启动不会泄漏 actor。
    #[instrument(
        name = "spawn_orchestrator_spawn",
        skip(self, definition),
        fields(objects = definition.objects.len(), sensors_only = self.settings.sensors_only)
    )]
    pub async fn spawn(&mut self, definition: ObjectsDefinition) -> Result<SpawnSummary> {
        match self.try_spawn(definition).await {
            Ok(summary) => {
                observability::set_live_actors(self.ledger.len());
                info!(
                    players = summary.players.len(),
                    global_sensors = summary.global_sensors.len(),
                    sensors = summary.sensors_spawned,
                    issues = summary.issues.len(),
                    "spawn completed"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, "spawn failed, tearing down everything created so far");
                self.teardown().await;
                Err(e)
            }
        }
    }

    async fn try_spawn(&mut self, definition: ObjectsDefinition) -> Result<SpawnSummary> {
        let classification = classify(definition.objects, self.settings.sensors_only)?;
        let mut issues: Vec<ProvisionIssue> = classification
            .ignored
            .iter()
            .map(|spec| ProvisionIssue::IgnoredObject {
                object_type: spec.object_type.clone(),
                id: spec.id.clone(),
            })
            .collect();

        // 1. 全局传感器：单个失败不影响其他，创建即记账
        let batch = SensorProvisioner::new(&self.client)
            .spawn_sensors(
                &classification.global_sensors,
                UNATTACHED,
                SensorFailurePolicy::Continue,
                &mut self.ledger,
            )
            .await;
        let global_sensors = batch.actor_ids();
        self.stats
            .record_spawned(ObjectCategory::Sensor, global_sensors.len() as u64);
        self.record_sensor_errors(&batch.errors);
        issues.extend(batch.errors.into_iter().map(|error| ProvisionIssue::Sensor {
            owner: None,
            error,
        }));

        // 2. sensors-only: 查找已存在的 actors
        let mode = if self.settings.sensors_only {
            let mut known_actors = HashMap::new();
            for entity in &classification.entities {
                match self.client.get_actor_by_role(&entity.id).await? {
                    Some(actor_id) => {
                        known_actors.insert(entity.id.clone(), actor_id);
                    }
                    None => warn!(role_name = %entity.id, "no actor with this role name"),
                }
            }
            SpawnMode::SensorsOnly { known_actors }
        } else {
            SpawnMode::Normal
        };

        // 3. vehicles / walkers
        let report = ActorProvisioner::new(&self.client, &self.settings.overrides, self.retry)
            .spawn_entities(&classification.entities, &mode, &mut self.ledger)
            .await?;

        for (entity, &attempts) in classification.entities.iter().zip(&report.attempts) {
            let category = entity.category();
            self.stats.record_spawned(category, 1);
            self.stats
                .record_rejections(category, u64::from(attempts.saturating_sub(1)));
            self.stats.record_entity_attempts(attempts);
        }
        self.stats
            .record_spawned(ObjectCategory::Sensor, report.sensors_spawned as u64);
        let sensor_errors: Vec<SensorSpawnError> = report
            .issues
            .iter()
            .filter_map(|issue| match issue {
                ProvisionIssue::Sensor { error, .. } => Some(error.clone()),
                _ => None,
            })
            .collect();
        self.record_sensor_errors(&sensor_errors);

        issues.extend(report.issues);
        self.stats.record_skipped(
            issues
                .iter()
                .filter(|issue| !matches!(issue, ProvisionIssue::SpawnPoint { .. }))
                .count() as u64,
        );

        Ok(SpawnSummary {
            players: report.players,
            global_sensors,
            sensors_spawned: report.sensors_spawned,
            issues,
        })
    }

    fn record_sensor_errors(&mut self, errors: &[SensorSpawnError]) {
        let rejected = errors
            .iter()
            .filter(|e| matches!(e, SensorSpawnError::Rejected { .. }))
            .count();
        self.stats
            .record_rejections(ObjectCategory::Sensor, rejected as u64);
    }

    /// 销毁所有已创建的 actors
    ///
    /// # 幂等性
    /// 多次调用安全，第二次调用不会发出任何销毁请求。
    #[instrument(name = "spawn_orchestrator_teardown", skip(self))]
    pub async fn teardown(&mut self) -> TeardownReport {
        let report = self.ledger.teardown_all(&self.client).await;
        self.stats.record_teardown(
            report.destroyed.len() as u64,
            report.already_gone.len() as u64,
            report.failed.len() as u64,
        );
        observability::set_live_actors(self.ledger.len());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActorFactoryError;
    use crate::mock_client::{BackendCall, MockCarlaClient, MockConfig};
    use contracts::{ContractError, ObjectSpec, SpawnPointSpec, ACTOR_LIST_SENSOR_TYPE};

    async fn orchestrator(config: MockConfig, sensors_only: bool) -> SpawnOrchestrator<MockCarlaClient> {
        let mut client = MockCarlaClient::with_config(config);
        client.connect("localhost", 2000).await.unwrap();
        SpawnOrchestrator::new(
            client,
            RuntimeSettings {
                sensors_only,
                ..Default::default()
            },
        )
    }

    fn definition(objects: Vec<ObjectSpec>) -> ObjectsDefinition {
        ObjectsDefinition { objects }
    }

    fn camera(id: &str) -> ObjectSpec {
        ObjectSpec::new("sensor.camera.rgb", id)
            .with_spawn_point(SpawnPointSpec::at(0.0, 0.0, 2.0))
    }

    #[tokio::test]
    async fn test_spawn_success() {
        let mut orch = orchestrator(MockConfig::default(), false).await;

        let summary = orch
            .spawn(definition(vec![
                camera("overview"),
                ObjectSpec::new("vehicle.tesla.model3", "ego")
                    .with_sensors(vec![camera("front"), camera("rear")]),
                ObjectSpec::new("static.prop.barrel", "barrel"),
            ]))
            .await
            .unwrap();

        assert_eq!(summary.global_sensors, vec![1000]);
        assert_eq!(summary.players, vec![1001]);
        assert_eq!(summary.sensors_spawned, 2);
        assert!(matches!(
            &summary.issues[..],
            [ProvisionIssue::IgnoredObject { id, .. }] if id == "barrel"
        ));
        assert_eq!(orch.ledger().len(), 4);
        assert_eq!(orch.stats().total_spawned(), 4);
    }

    #[tokio::test]
    async fn test_sensors_only_requires_actor_list_before_any_call() {
        let mut orch = orchestrator(MockConfig::default(), true).await;

        let err = orch
            .spawn(definition(vec![
                camera("overview"),
                ObjectSpec::new("vehicle.tesla.model3", "ego"),
            ]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ActorFactoryError::Contract(ContractError::ConfigValidation { .. })
        ));
        assert!(orch.client().calls().is_empty());
    }

    #[tokio::test]
    async fn test_sensors_only_looks_up_roles() {
        let mut orch = orchestrator(
            MockConfig {
                existing_roles: HashMap::from([("ego".to_string(), 7)]),
                ..Default::default()
            },
            true,
        )
        .await;

        let summary = orch
            .spawn(definition(vec![
                ObjectSpec::new(ACTOR_LIST_SENSOR_TYPE, "actor_list"),
                ObjectSpec::new("vehicle.tesla.model3", "ego").with_sensors(vec![camera("front")]),
            ]))
            .await
            .unwrap();

        assert!(summary.players.is_empty());
        assert_eq!(summary.sensors_spawned, 1);
        assert!(orch
            .client()
            .calls()
            .contains(&BackendCall::GetActor("ego".to_string())));
    }

    #[tokio::test]
    async fn test_failed_spawn_unwinds() {
        let mut orch = orchestrator(
            MockConfig {
                reject_always: vec!["lidar".to_string()],
                ..Default::default()
            },
            false,
        )
        .await;

        let result = orch
            .spawn(definition(vec![
                camera("overview"),
                ObjectSpec::new("vehicle.tesla.model3", "ego").with_sensors(vec![
                    camera("front"),
                    ObjectSpec::new("sensor.lidar.ray_cast", "lidar"),
                ]),
            ]))
            .await;

        assert!(matches!(result, Err(ActorFactoryError::SensorSetupFailed { .. })));
        assert!(orch.ledger().is_empty());
        assert_eq!(orch.client().actor_count(), 0);
        // overview, front, ego
        assert_eq!(orch.client().destroyed_ids(), vec![1000, 1002, 1001]);
    }

    #[tokio::test]
    async fn test_teardown_idempotent() {
        let mut orch = orchestrator(MockConfig::default(), false).await;
        orch.spawn(definition(vec![ObjectSpec::new("walker.pedestrian.0001", "w")]))
            .await
            .unwrap();

        assert_eq!(orch.teardown().await.destroyed, vec![1000]);
        let calls = orch.client().calls().len();
        assert_eq!(orch.teardown().await.attempted(), 0);
        assert_eq!(orch.client().calls().len(), calls);
        assert_eq!(orch.stats().destroyed, 1);
    }

    #[tokio::test]
    async fn test_empty_definition() {
        let mut orch = orchestrator(MockConfig::default(), false).await;
        let summary = orch.spawn(ObjectsDefinition::default()).await.unwrap();
        assert_eq!(summary, SpawnSummary::default());
        assert!(orch.ledger().is_empty());
    }

    /// Backend whose spawn service answers after a delay
    struct SlowClient {
        inner: MockCarlaClient,
        delay: std::time::Duration,
    }

    impl CarlaClient for SlowClient {
        async fn connect(&mut self, host: &str, port: u16) -> crate::error::Result<()> {
            self.inner.connect(host, port).await
        }

        async fn wait_for_services(&self) -> crate::error::Result<()> {
            self.inner.wait_for_services().await
        }

        async fn spawn_object(
            &self,
            request: &contracts::SpawnRequest,
        ) -> crate::error::Result<contracts::SpawnResponse> {
            tokio::time::sleep(self.delay).await;
            self.inner.spawn_object(request).await
        }

        async fn destroy_object(&self, actor_id: ActorId) -> crate::error::Result<bool> {
            self.inner.destroy_object(actor_id).await
        }

        async fn get_actor_by_role(&self, role_name: &str) -> crate::error::Result<Option<ActorId>> {
            self.inner.get_actor_by_role(role_name).await
        }
    }

    /// Drop `spawn` after `cancel_after`, then tear down
    async fn cancel_mid_spawn(objects: Vec<ObjectSpec>) -> (usize, TeardownReport, SlowClient) {
        let mut client = SlowClient {
            inner: MockCarlaClient::new(),
            delay: std::time::Duration::from_millis(20),
        };
        client.connect("localhost", 2000).await.unwrap();
        let mut orch = SpawnOrchestrator::new(client, RuntimeSettings::default());

        tokio::select! {
            biased;
            _ = orch.spawn(definition(objects)) => panic!("spawn should still be pending"),
            _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {}
        }

        let alive = orch.client().inner.actor_count();
        let report = orch.teardown().await;
        (alive, report, orch.client)
    }

    #[tokio::test]
    async fn test_cancelled_global_batch_is_torn_down() {
        let (alive, report, client) = cancel_mid_spawn(vec![
            camera("a"),
            camera("b"),
            camera("c"),
            camera("d"),
        ])
        .await;

        assert!(alive > 0 && alive < 4, "alive = {alive}");
        assert_eq!(report.destroyed.len(), alive);
        assert_eq!(client.inner.actor_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_vehicle_sensor_batch_is_torn_down() {
        let (alive, report, client) = cancel_mid_spawn(vec![ObjectSpec::new(
            "vehicle.tesla.model3",
            "ego",
        )
        .with_sensors(vec![camera("front"), camera("rear"), camera("top")])])
        .await;

        // ego plus at least one of its sensors
        assert!(alive >= 2 && alive < 4, "alive = {alive}");
        assert_eq!(report.destroyed.len(), alive);
        assert_eq!(*report.destroyed.last().unwrap(), 1000);
        assert_eq!(client.inner.actor_count(), 0);
    }
}
