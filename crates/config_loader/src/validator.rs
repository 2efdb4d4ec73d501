//! 配置校验模块
//!
//! 校验规则：
//! - type / id 非空
//! - 只有 vehicle / walker 可以挂载 sensors
//! - 顶层 vehicle / walker 的 id 唯一 (id 同时是 role name)
//!
//! 未知类型、缺失 spawn_point 等问题不在此处拒绝，由 spawn 阶段逐个对象处理。

use std::collections::HashSet;

use contracts::{ContractError, ObjectSpec, ObjectsDefinition};

/// 校验 ObjectsDefinition 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(definition: &ObjectsDefinition) -> Result<(), ContractError> {
    for (idx, object) in definition.objects.iter().enumerate() {
        let path = format!("objects[{idx}]");
        validate_object(object, &path)?;
    }
    validate_entity_ids(definition)?;
    Ok(())
}

/// 校验单个对象及其 sensors
fn validate_object(object: &ObjectSpec, path: &str) -> Result<(), ContractError> {
    if object.object_type.trim().is_empty() {
        return Err(ContractError::config_validation(
            format!("{path}.type"),
            "type cannot be empty",
        ));
    }
    if object.id.trim().is_empty() {
        return Err(ContractError::config_validation(
            format!("{path}.id"),
            "id cannot be empty",
        ));
    }

    let Some(sensors) = &object.sensors else {
        return Ok(());
    };

    if !object.category().is_entity() {
        return Err(ContractError::config_validation(
            format!("{path}.sensors"),
            format!(
                "only vehicles and walkers carry sensors, '{}' is a {}",
                object.object_type,
                object.category()
            ),
        ));
    }

    for (idx, sensor) in sensors.iter().enumerate() {
        validate_object(sensor, &format!("{path}.sensors[{idx}]"))?;
    }
    Ok(())
}

/// 校验 vehicle / walker id 唯一性
fn validate_entity_ids(definition: &ObjectsDefinition) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for object in definition
        .objects
        .iter()
        .filter(|object| object.category().is_entity())
    {
        if !seen.insert(object.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("objects[id={}]", object.id),
                "duplicate vehicle/walker id",
            ));
        }
    }
    Ok(())
}
