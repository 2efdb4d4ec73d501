//! Mock CARLA 客户端
//!
//! 内存中的后端实现，用于单元测试和无 CARLA 的试运行，支持注入失败场景。

use std::collections::HashMap;
use std::sync::Mutex;

use contracts::{ActorId, SpawnRequest, SpawnResponse, UNATTACHED};
use tracing::{debug, instrument};

use crate::client::{
    CarlaClient, DESTROY_OBJECT_SERVICE, GET_ACTOR_SERVICE, SPAWN_OBJECT_SERVICE,
};
use crate::error::{ActorFactoryError, Result};

/// Mock 客户端配置
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// 第一个分配的 actor ID
    pub first_actor_id: ActorId,
    /// 前 N 次 spawn 返回失败的对象 ID (id -> N)
    pub reject_first: HashMap<String, u32>,
    /// 始终 spawn 失败的对象 ID
    pub reject_always: Vec<String>,
    /// destroy 时服务不可用的 actor IDs
    pub fail_destroy: Vec<ActorId>,
    /// 已存在的 actors (role name -> actor ID)，由其他进程 spawn
    pub existing_roles: HashMap<String, ActorId>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            first_actor_id: 1000, // 从 1000 开始，便于识别
            reject_first: HashMap::new(),
            reject_always: Vec::new(),
            fail_destroy: Vec::new(),
            existing_roles: HashMap::new(),
        }
    }
}

/// 记录的后端调用
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Spawn(SpawnRequest),
    Destroy(ActorId),
    GetActor(String),
}

/// Mock CARLA 客户端
pub struct MockCarlaClient {
    /// 配置（可注入失败场景）
    config: MockConfig,
    /// 下一个 actor ID
    next_actor_id: Mutex<ActorId>,
    /// 存活的 actors (actor_id -> type)
    actors: Mutex<HashMap<ActorId, String>>,
    /// 剩余的拒绝次数 (id -> N)
    rejections_left: Mutex<HashMap<String, u32>>,
    /// 调用日志
    calls: Mutex<Vec<BackendCall>>,
    /// 连接状态
    connected: Mutex<bool>,
}

impl MockCarlaClient {
    /// 创建默认 mock 客户端
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// 使用配置创建 mock 客户端
    pub fn with_config(config: MockConfig) -> Self {
        let actors = config
            .existing_roles
            .iter()
            .map(|(role, &id)| (id, format!("existing/{role}")))
            .collect();
        Self {
            next_actor_id: Mutex::new(config.first_actor_id),
            actors: Mutex::new(actors),
            rejections_left: Mutex::new(config.reject_first.clone()),
            calls: Mutex::new(Vec::new()),
            connected: Mutex::new(false),
            config,
        }
    }

    /// 获取当前存活的 actor 数量
    pub fn actor_count(&self) -> usize {
        self.actors.lock().unwrap().len()
    }

    /// 获取所有存活的 actor IDs
    pub fn all_actor_ids(&self) -> Vec<ActorId> {
        self.actors.lock().unwrap().keys().copied().collect()
    }

    pub fn is_alive(&self, actor_id: ActorId) -> bool {
        self.actors.lock().unwrap().contains_key(&actor_id)
    }

    /// 全部调用日志
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    /// 所有 spawn 请求 (含失败的)
    pub fn spawn_requests(&self) -> Vec<SpawnRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| match call {
                BackendCall::Spawn(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    /// 所有 destroy 调用，按调用顺序
    pub fn destroyed_ids(&self) -> Vec<ActorId> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| match call {
                BackendCall::Destroy(actor_id) => Some(*actor_id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn allocate_actor_id(&self) -> ActorId {
        let mut next = self.next_actor_id.lock().unwrap();
        let actor_id = *next;
        *next += 1;
        actor_id
    }

    /// 是否应拒绝本次 spawn，返回拒绝原因
    fn rejection_for(&self, request: &SpawnRequest) -> Option<String> {
        if self.config.reject_always.contains(&request.id) {
            return Some(format!("mock failure for '{}'", request.id));
        }

        let mut left = self.rejections_left.lock().unwrap();
        if let Some(remaining) = left.get_mut(&request.id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Some("simulation not ready".to_string());
            }
        }

        if request.is_attached() && !self.actors.lock().unwrap().contains_key(&request.attach_to)
        {
            return Some(format!("parent actor {} not found", request.attach_to));
        }

        None
    }

    fn ensure_connected(&self, service: &str) -> Result<()> {
        if *self.connected.lock().unwrap() {
            Ok(())
        } else {
            Err(ActorFactoryError::service_unavailable(service, "not connected"))
        }
    }
}

impl Default for MockCarlaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CarlaClient for MockCarlaClient {
    #[instrument(name = "mock_carla_connect", skip(self), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        *self.connected.lock().unwrap() = true;
        debug!(host, port, "mock backend connected");
        Ok(())
    }

    #[instrument(name = "mock_carla_wait_for_services", skip(self))]
    async fn wait_for_services(&self) -> Result<()> {
        self.ensure_connected(SPAWN_OBJECT_SERVICE)?;
        self.ensure_connected(DESTROY_OBJECT_SERVICE)?;
        self.ensure_connected(GET_ACTOR_SERVICE)
    }

    #[instrument(
        name = "mock_carla_spawn_object",
        skip(self, request),
        fields(object_type = %request.object_type, id = %request.id, attach_to = request.attach_to)
    )]
    async fn spawn_object(&self, request: &SpawnRequest) -> Result<SpawnResponse> {
        self.ensure_connected(SPAWN_OBJECT_SERVICE)?;
        self.record(BackendCall::Spawn(request.clone()));

        if let Some(reason) = self.rejection_for(request) {
            return Ok(SpawnResponse::failed(reason));
        }

        let actor_id = self.allocate_actor_id();
        self.actors
            .lock()
            .unwrap()
            .insert(actor_id, request.object_type.clone());
        Ok(SpawnResponse::spawned(actor_id))
    }

    #[instrument(name = "mock_carla_destroy_object", skip(self), fields(actor_id))]
    async fn destroy_object(&self, actor_id: ActorId) -> Result<bool> {
        self.ensure_connected(DESTROY_OBJECT_SERVICE)?;
        self.record(BackendCall::Destroy(actor_id));

        if self.config.fail_destroy.contains(&actor_id) {
            return Err(ActorFactoryError::service_unavailable(
                DESTROY_OBJECT_SERVICE,
                "mock failure",
            ));
        }

        // 幂等：即使不存在也返回 Ok
        Ok(self.actors.lock().unwrap().remove(&actor_id).is_some())
    }

    #[instrument(name = "mock_carla_get_actor", skip(self), fields(role_name = %role_name))]
    async fn get_actor_by_role(&self, role_name: &str) -> Result<Option<ActorId>> {
        self.ensure_connected(GET_ACTOR_SERVICE)?;
        self.record(BackendCall::GetActor(role_name.to_string()));

        let actor_id = self
            .config
            .existing_roles
            .get(role_name)
            .copied()
            .filter(|&id| id != UNATTACHED && self.is_alive(id));
        Ok(actor_id)
    }
}
