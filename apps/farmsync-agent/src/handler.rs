//! 事件对账装配模块
//!
//! 该模块把实时链路分发出的类型化事件接到共享状态容器上：
//! 传感器读数与控制器状态合并进网关/设备树，应答只记数与留痕。
//! 处理器内的任何失败都被吸收为日志与计数，事件循环继续运转。

use async_trait::async_trait;
use farmsync_realtime::{EventHandler, EventPayload, RealtimeError, RealtimeEvent};
use farmsync_reconcile::GatewayDirectory;
use farmsync_telemetry::{
    record_ack_received, record_controller_update, record_sensor_update, record_status_update,
    record_unknown_gateway_drop,
};
use std::sync::Arc;
use tracing::{debug, info};

/// 对账处理器
///
/// 同一个实例注册到全部 (类别, 动作) 键上，按负载形态分流。
pub struct ReconcileHandler {
    directory: Arc<GatewayDirectory>,
}

impl ReconcileHandler {
    pub fn new(directory: Arc<GatewayDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl EventHandler for ReconcileHandler {
    async fn handle(&self, event: RealtimeEvent) -> Result<(), RealtimeError> {
        match &event.payload {
            EventPayload::SensorReading(reading) => {
                let hit = self
                    .directory
                    .sensor_update(&event.gateway_id, reading)
                    .map_err(|err| RealtimeError::Handler(err.to_string()))?;
                if hit {
                    record_sensor_update();
                    info!(
                        target: "farmsync.agent",
                        gateway_id = %event.gateway_id,
                        sensor_type = %reading.sensor_type,
                        sensor_val = reading.sensor_val,
                        res_time = reading.res_time,
                        "sensor_update_applied"
                    );
                } else {
                    // 清单外网关：预期内的视图偏差，不是错误。
                    record_unknown_gateway_drop();
                    debug!(
                        target: "farmsync.agent",
                        gateway_id = %event.gateway_id,
                        "sensor_update_for_unknown_gateway"
                    );
                }
            }
            EventPayload::ControllerSwitch(switch) => {
                let hit = self
                    .directory
                    .controller_update(&event.gateway_id, switch)
                    .map_err(|err| RealtimeError::Handler(err.to_string()))?;
                if hit {
                    record_controller_update();
                    info!(
                        target: "farmsync.agent",
                        gateway_id = %event.gateway_id,
                        ctr_ch = switch.ctr_ch,
                        on = switch.is_on(),
                        "controller_update_applied"
                    );
                } else {
                    record_unknown_gateway_drop();
                    debug!(
                        target: "farmsync.agent",
                        gateway_id = %event.gateway_id,
                        "controller_update_for_unknown_gateway"
                    );
                }
            }
            EventPayload::ControllerStatus(status) => {
                let hit = self
                    .directory
                    .controller_status(&event.gateway_id, status)
                    .map_err(|err| RealtimeError::Handler(err.to_string()))?;
                if hit {
                    record_status_update();
                    info!(
                        target: "farmsync.agent",
                        gateway_id = %event.gateway_id,
                        firmware_version = %status.firmware_version,
                        target_ch_num = status.target_ch_num,
                        "controller_status_applied"
                    );
                } else {
                    record_unknown_gateway_drop();
                }
            }
            EventPayload::Ack(value) => {
                record_ack_received();
                debug!(
                    target: "farmsync.agent",
                    gateway_id = %event.gateway_id,
                    payload = %value,
                    "ack_received"
                );
            }
        }
        Ok(())
    }
}
