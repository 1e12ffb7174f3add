//! 类型化实时事件与处理器注册表。

use crate::RealtimeError;
use async_trait::async_trait;
use domain::GatewayClass;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// 网关上报动作，对应主题最后一段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayAction {
    /// 传感器读数上报。
    Sensors,
    /// 指令应答（负载不作解释，原样转发）。
    Ack,
    /// 控制器开关状态变更。
    Update,
    /// 控制器状态信息（固件版本、通道数）。
    Status,
}

impl GatewayAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayAction::Sensors => "sensors",
            GatewayAction::Ack => "ack",
            GatewayAction::Update => "update",
            GatewayAction::Status => "status",
        }
    }

    pub fn parse(segment: &str) -> Option<Self> {
        match segment {
            "sensors" => Some(GatewayAction::Sensors),
            "ack" => Some(GatewayAction::Ack),
            "update" => Some(GatewayAction::Update),
            "status" => Some(GatewayAction::Status),
            _ => None,
        }
    }
}

impl std::fmt::Display for GatewayAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 传感器读数报文。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensorReading {
    pub sensor_type: String,
    pub sensor_val: f64,
    /// 上报时间（epoch 秒）。
    pub res_time: i64,
}

impl SensorReading {
    /// 上报时间的毫秒视图。
    pub fn res_time_ms(&self) -> i64 {
        self.res_time.saturating_mul(1000)
    }
}

/// 控制器开关状态变更报文。该负载形态不携带时间戳。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ControllerSwitch {
    pub ctr_ch: i64,
    /// 线上格式为字符串 "true" / "false"。
    pub switch_state: String,
}

impl ControllerSwitch {
    pub fn is_on(&self) -> bool {
        self.switch_state == "true"
    }
}

/// 控制器状态信息报文。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ControllerStatus {
    pub firmware_version: String,
    /// 上报时间（epoch 秒）。
    pub res_time: i64,
    pub target_ch_num: i64,
}

impl ControllerStatus {
    pub fn res_time_ms(&self) -> i64 {
        self.res_time.saturating_mul(1000)
    }
}

/// 按 (类别, 动作) 解码后的报文负载。
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    SensorReading(SensorReading),
    ControllerSwitch(ControllerSwitch),
    ControllerStatus(ControllerStatus),
    /// 应答负载原样保留，由调用方自行解释。
    Ack(serde_json::Value),
}

/// 路由后的类型化实时事件。
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeEvent {
    pub farm_id: String,
    pub class: GatewayClass,
    pub gateway_id: String,
    pub action: GatewayAction,
    pub payload: EventPayload,
}

/// 实时事件处理器。
///
/// 处理器在连接任务上按到达顺序被依次调用；返回错误只记录日志，
/// 不会中断链路。
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: RealtimeEvent) -> Result<(), RealtimeError>;
}

/// 处理器注册表：按 (网关类别, 动作) 注册，分发时顺序调用。
#[derive(Clone, Default)]
pub struct Dispatcher {
    handlers: HashMap<(GatewayClass, GatewayAction), Vec<Arc<dyn EventHandler>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个处理器。同一键可注册多个，按注册顺序调用。
    pub fn on(
        &mut self,
        class: GatewayClass,
        action: GatewayAction,
        handler: Arc<dyn EventHandler>,
    ) {
        self.handlers
            .entry((class, action))
            .or_default()
            .push(handler);
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// 分发一条事件：顺序调用注册处理器，错误记录后丢弃。
    ///
    /// 无人注册的事件计数后丢弃，不算错误。
    pub async fn dispatch(&self, event: RealtimeEvent) {
        let Some(handlers) = self.handlers.get(&(event.class, event.action)) else {
            farmsync_telemetry::record_unhandled_event();
            return;
        };
        for handler in handlers {
            if let Err(err) = handler.handle(event.clone()).await {
                farmsync_telemetry::record_handler_failure();
                warn!(
                    target: "farmsync.realtime",
                    gateway_id = %event.gateway_id,
                    action = %event.action,
                    error = %err,
                    "event_handler_failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        seen: Arc<Mutex<Vec<String>>>,
        tag: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, event: RealtimeEvent) -> Result<(), RealtimeError> {
            self.seen
                .lock()
                .expect("lock")
                .push(format!("{}:{}", self.tag, event.gateway_id));
            if self.fail {
                return Err(RealtimeError::Handler("forced failure".to_string()));
            }
            Ok(())
        }
    }

    fn sensor_event(gateway_id: &str) -> RealtimeEvent {
        RealtimeEvent {
            farm_id: "farm1".to_string(),
            class: GatewayClass::Sensor,
            gateway_id: gateway_id.to_string(),
            action: GatewayAction::Sensors,
            payload: EventPayload::SensorReading(SensorReading {
                sensor_type: "temperature".to_string(),
                sensor_val: 20.0,
                res_time: 1_700_000_000,
            }),
        }
    }

    #[tokio::test]
    async fn dispatch_preserves_registration_and_arrival_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher.on(
            GatewayClass::Sensor,
            GatewayAction::Sensors,
            Arc::new(Recorder { seen: seen.clone(), tag: "a", fail: false }),
        );
        dispatcher.on(
            GatewayClass::Sensor,
            GatewayAction::Sensors,
            Arc::new(Recorder { seen: seen.clone(), tag: "b", fail: false }),
        );

        dispatcher.dispatch(sensor_event("gw-1")).await;
        dispatcher.dispatch(sensor_event("gw-2")).await;

        let seen = seen.lock().expect("lock");
        assert_eq!(seen.as_slice(), &["a:gw-1", "b:gw-1", "a:gw-2", "b:gw-2"]);
    }

    #[tokio::test]
    async fn handler_failure_does_not_stop_later_handlers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher.on(
            GatewayClass::Sensor,
            GatewayAction::Sensors,
            Arc::new(Recorder { seen: seen.clone(), tag: "bad", fail: true }),
        );
        dispatcher.on(
            GatewayClass::Sensor,
            GatewayAction::Sensors,
            Arc::new(Recorder { seen: seen.clone(), tag: "good", fail: false }),
        );

        dispatcher.dispatch(sensor_event("gw-1")).await;

        let seen = seen.lock().expect("lock");
        assert_eq!(seen.as_slice(), &["bad:gw-1", "good:gw-1"]);
    }

    #[tokio::test]
    async fn unregistered_event_is_dropped() {
        let dispatcher = Dispatcher::new();
        // 空注册表上的分发不应 panic。
        dispatcher.dispatch(sensor_event("gw-1")).await;
    }
}
