//! LifecycleLedger
//!
//! 记录本进程创建的所有 actor，按创建的反向层级顺序销毁：
//! 全局传感器 -> 各 vehicle/walker 的传感器组 -> players。

use contracts::ActorId;
use tracing::{debug, info, instrument, warn};

use crate::client::CarlaClient;

/// Outcome of one teardown pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Destroyed by this pass
    pub destroyed: Vec<ActorId>,
    /// Already gone on the backend
    pub already_gone: Vec<ActorId>,
    /// Destroy call failed, with the error text
    pub failed: Vec<(ActorId, String)>,
}

impl TeardownReport {
    /// Number of destroy calls issued
    pub fn attempted(&self) -> usize {
        self.destroyed.len() + self.already_gone.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Append-only record of spawned actors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleLedger {
    global_sensors: Vec<ActorId>,
    vehicle_sensor_groups: Vec<Vec<ActorId>>,
    players: Vec<ActorId>,
}

impl LifecycleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_global_sensors(&mut self, ids: impl IntoIterator<Item = ActorId>) {
        self.global_sensors.extend(ids);
    }

    /// One group per vehicle/walker, in spawn order
    pub fn record_vehicle_sensors(&mut self, group: Vec<ActorId>) {
        self.vehicle_sensor_groups.push(group);
    }

    pub fn record_global_sensor(&mut self, actor_id: ActorId) {
        self.global_sensors.push(actor_id);
    }

    /// Start the sensor group of the next vehicle/walker
    pub fn open_vehicle_sensor_group(&mut self) {
        self.vehicle_sensor_groups.push(Vec::new());
    }

    /// Append to the group opened last; opens one if none exists
    pub fn record_vehicle_sensor(&mut self, actor_id: ActorId) {
        match self.vehicle_sensor_groups.last_mut() {
            Some(group) => group.push(actor_id),
            None => self.vehicle_sensor_groups.push(vec![actor_id]),
        }
    }

    pub fn record_player(&mut self, actor_id: ActorId) {
        self.players.push(actor_id);
    }

    pub fn global_sensors(&self) -> &[ActorId] {
        &self.global_sensors
    }

    pub fn vehicle_sensor_groups(&self) -> &[Vec<ActorId>] {
        &self.vehicle_sensor_groups
    }

    pub fn players(&self) -> &[ActorId] {
        &self.players
    }

    /// Every recorded id, in teardown order
    pub fn teardown_order(&self) -> Vec<ActorId> {
        self.global_sensors
            .iter()
            .chain(self.vehicle_sensor_groups.iter().flatten())
            .chain(&self.players)
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.global_sensors.len()
            + self.vehicle_sensor_groups.iter().map(Vec::len).sum::<usize>()
            + self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Destroy everything recorded, then clear the ledger.
    ///
    /// Best effort: a failing destroy is reported and the pass continues.
    /// The first failure is logged at warn level, later ones at debug.
    /// Calling it on an empty ledger issues no backend calls.
    #[instrument(
        name = "lifecycle_ledger_teardown",
        skip(self, client),
        fields(
            global_sensors = self.global_sensors.len(),
            sensor_groups = self.vehicle_sensor_groups.len(),
            players = self.players.len()
        )
    )]
    pub async fn teardown_all<C: CarlaClient>(&mut self, client: &C) -> TeardownReport {
        let mut report = TeardownReport::default();
        let order = self.teardown_order();
        self.global_sensors.clear();
        self.vehicle_sensor_groups.clear();
        self.players.clear();

        if order.is_empty() {
            debug!("nothing to tear down");
            return report;
        }
        info!(actors = order.len(), "starting teardown");

        for actor_id in order {
            match client.destroy_object(actor_id).await {
                Ok(true) => {
                    observability::record_actor_destroyed();
                    report.destroyed.push(actor_id);
                }
                Ok(false) => {
                    debug!(actor_id, "actor already gone");
                    report.already_gone.push(actor_id);
                }
                Err(e) => {
                    observability::record_destroy_failure();
                    if report.failed.is_empty() {
                        warn!(actor_id, error = %e, "failed to destroy actor");
                    } else {
                        debug!(actor_id, error = %e, "failed to destroy actor");
                    }
                    report.failed.push((actor_id, e.to_string()));
                }
            }
        }

        info!(
            destroyed = report.destroyed.len(),
            already_gone = report.already_gone.len(),
            failed = report.failed.len(),
            "teardown completed"
        );
        report
    }
}
