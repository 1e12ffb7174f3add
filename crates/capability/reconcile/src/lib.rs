//! 状态对账：把入站增量更新逐字段合并进网关/设备树。
//!
//! 基线树由清单获取建立，这里只原地改写已有记录——绝不新建或删除
//! 网关/设备，绝不整体替换记录。更新指向清单之外的网关属于预期内的
//! 视图偏差，静默忽略即可。

use domain::{DeviceValue, GatewayRecord};
use farmsync_normalize::normalize_sensor_type;
use farmsync_realtime::{ControllerStatus, ControllerSwitch, SensorReading};
use std::sync::RwLock;
use tracing::warn;

/// 对账错误。合并本身不失败，错误只来自共享容器的锁。
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("state lock poisoned")]
    Lock,
}

/// 合并一条传感器读数。
///
/// 网关不存在时返回 false（无副作用）。命中后把网关时间戳推进到
/// `res_time`（毫秒，只前进不回退），再把读数写到所有规范化类型匹配
/// 的设备上。一个网关同类型挂多个设备时全部更新——沿用既有面板行为，
/// 但会记一条告警便于排查。
pub fn apply_sensor_update(
    gateways: &mut [GatewayRecord],
    gateway_id: &str,
    reading: &SensorReading,
) -> bool {
    let Some(gateway) = gateways.iter_mut().find(|g| g.gateway_id == gateway_id) else {
        return false;
    };

    let reported_at_ms = reading.res_time_ms();
    advance_timestamp(&mut gateway.last_update_ms, reported_at_ms);

    let kind = normalize_sensor_type(&reading.sensor_type);
    let mut matched = 0usize;
    for device in &mut gateway.devices {
        if normalize_sensor_type(&device.raw_type) == kind {
            device.value = Some(DeviceValue::Number(reading.sensor_val));
            device.reported_at_ms = Some(reported_at_ms);
            matched += 1;
        }
    }
    if matched > 1 {
        warn!(
            target: "farmsync.reconcile",
            gateway_id = %gateway_id,
            sensor_type = %kind,
            matched,
            "sensor_update_matched_multiple_devices"
        );
    }
    true
}

/// 合并一条控制器开关变更。
///
/// 设备按通道号精确匹配；`switch_state == "true"` 写 1，否则写 0。
/// 该负载形态不带时间戳，网关时间戳取调用方给出的接收时刻。
pub fn apply_controller_update(
    gateways: &mut [GatewayRecord],
    gateway_id: &str,
    switch: &ControllerSwitch,
    received_at_ms: i64,
) -> bool {
    let Some(gateway) = gateways.iter_mut().find(|g| g.gateway_id == gateway_id) else {
        return false;
    };

    advance_timestamp(&mut gateway.last_update_ms, received_at_ms);
    let state = if switch.is_on() { 1.0 } else { 0.0 };
    for device in &mut gateway.devices {
        if device.channel == switch.ctr_ch {
            device.value = Some(DeviceValue::Number(state));
        }
    }
    true
}

/// 合并一条控制器状态信息：固件版本与通道总数。
pub fn apply_controller_status(
    gateways: &mut [GatewayRecord],
    gateway_id: &str,
    status: &ControllerStatus,
) -> bool {
    let Some(gateway) = gateways.iter_mut().find(|g| g.gateway_id == gateway_id) else {
        return false;
    };

    gateway.firmware_version = Some(status.firmware_version.clone());
    gateway.channel_count = Some(status.target_ch_num);
    advance_timestamp(&mut gateway.last_update_ms, status.res_time_ms());
    true
}

/// 时间戳只前进：乱序或重复报文不得把网关时间拉回去。
fn advance_timestamp(slot: &mut Option<i64>, candidate_ms: i64) {
    if slot.is_none_or(|current| candidate_ms >= current) {
        *slot = Some(candidate_ms);
    }
}

/// 网关/设备共享状态容器。
///
/// 事件回调路径写、展示/汇总路径读，单把读写锁保证一条报文的合并
/// 对读者原子可见——不会出现时间戳已更新而设备值未更新的中间态。
pub struct GatewayDirectory {
    gateways: RwLock<Vec<GatewayRecord>>,
}

impl GatewayDirectory {
    pub fn new() -> Self {
        Self {
            gateways: RwLock::new(Vec::new()),
        }
    }

    /// 载入基线清单，整树替换。仅在会话建立与手动刷新时调用。
    pub fn load(&self, gateways: Vec<GatewayRecord>) -> Result<(), ReconcileError> {
        let mut guard = self.gateways.write().map_err(|_| ReconcileError::Lock)?;
        *guard = gateways;
        Ok(())
    }

    /// 当前树的完整快照。
    pub fn snapshot(&self) -> Vec<GatewayRecord> {
        self.gateways
            .read()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    pub fn gateway(&self, gateway_id: &str) -> Option<GatewayRecord> {
        self.gateways
            .read()
            .ok()
            .and_then(|g| g.iter().find(|item| item.gateway_id == gateway_id).cloned())
    }

    pub fn len(&self) -> usize {
        self.gateways.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 合并传感器读数，返回是否命中网关。
    pub fn sensor_update(
        &self,
        gateway_id: &str,
        reading: &SensorReading,
    ) -> Result<bool, ReconcileError> {
        let mut guard = self.gateways.write().map_err(|_| ReconcileError::Lock)?;
        Ok(apply_sensor_update(&mut guard, gateway_id, reading))
    }

    /// 合并控制器开关变更，接收时刻取当前墙钟。
    pub fn controller_update(
        &self,
        gateway_id: &str,
        switch: &ControllerSwitch,
    ) -> Result<bool, ReconcileError> {
        let mut guard = self.gateways.write().map_err(|_| ReconcileError::Lock)?;
        Ok(apply_controller_update(
            &mut guard,
            gateway_id,
            switch,
            now_epoch_ms(),
        ))
    }

    /// 合并控制器状态信息，返回是否命中网关。
    pub fn controller_status(
        &self,
        gateway_id: &str,
        status: &ControllerStatus,
    ) -> Result<bool, ReconcileError> {
        let mut guard = self.gateways.write().map_err(|_| ReconcileError::Lock)?;
        Ok(apply_controller_status(&mut guard, gateway_id, status))
    }
}

impl Default for GatewayDirectory {
    fn default() -> Self {
        Self::new()
    }
}

fn now_epoch_ms() -> i64 {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as i64
}
