//! 实时链路能力：MQTT 订阅、消息路由与事件分发。
//!
//! 链路以农场 ID 为作用域：连接代理后订阅该农场的五个主题模式，
//! 将入站报文解码为类型化事件并按 (网关类别, 动作) 分发给注册的处理器。

pub mod events;
pub mod manager;
pub mod router;
pub mod topics;

pub use events::{
    ControllerStatus, ControllerSwitch, Dispatcher, EventHandler, EventPayload, GatewayAction,
    RealtimeEvent, SensorReading,
};
pub use manager::{LinkConfig, LinkState, RealtimeLink};
pub use router::{route, RouteError};
pub use topics::topics_for;

/// 实时链路错误。
#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("handler error: {0}")]
    Handler(String),
    #[error("link error: {0}")]
    Link(String),
}
