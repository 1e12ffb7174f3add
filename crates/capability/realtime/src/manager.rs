//! 链路管理：连接生命周期、订阅与固定间隔重连。
//!
//! 每个会话持有一条逻辑连接，由后台任务驱动：连接成功后订阅主题表，
//! 逐条路由入站报文并分发；传输层断开后以固定间隔无限重试，直到
//! 显式 `stop()`。单条坏报文只记录日志，绝不拖垮链路。

use crate::events::{Dispatcher, EventHandler, GatewayAction};
use crate::router;
use crate::topics::topics_for;
use domain::GatewayClass;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, Transport};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 链路状态机。`Closed` 仅由显式停止进入，是终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

/// 链路配置。重试间隔与握手超时沿用面板端的固定值。
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub broker_url: String,
    pub enabled: bool,
    pub retry_interval: Duration,
    pub connect_timeout: Duration,
    pub keep_alive: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            broker_url: "wss://127.0.0.1:8084/mqtt".to_string(),
            enabled: true,
            retry_interval: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(30),
            keep_alive: Duration::from_secs(30),
        }
    }
}

struct LinkShared {
    state: RwLock<LinkState>,
}

impl LinkShared {
    fn new() -> Self {
        Self {
            state: RwLock::new(LinkState::Disconnected),
        }
    }

    fn state(&self) -> LinkState {
        self.state.read().map(|s| *s).unwrap_or(LinkState::Disconnected)
    }

    fn set_state(&self, next: LinkState) {
        if let Ok(mut guard) = self.state.write() {
            *guard = next;
        }
    }

    /// Closed 为终态，后台任务不得再改写。
    fn transition(&self, next: LinkState) -> bool {
        if let Ok(mut guard) = self.state.write() {
            if *guard == LinkState::Closed {
                return false;
            }
            *guard = next;
            return true;
        }
        false
    }
}

/// 实时链路：对一个农场的长连接及其事件分发。
pub struct RealtimeLink {
    config: LinkConfig,
    dispatcher: Arc<Dispatcher>,
    shared: Arc<LinkShared>,
    task: Option<JoinHandle<()>>,
    farm_id: Option<String>,
}

impl RealtimeLink {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            dispatcher: Arc::new(Dispatcher::new()),
            shared: Arc::new(LinkShared::new()),
            task: None,
            farm_id: None,
        }
    }

    /// 注册 (类别, 动作) 处理器。须在 `start` 前完成注册。
    pub fn on_event(
        &mut self,
        class: GatewayClass,
        action: GatewayAction,
        handler: Arc<dyn EventHandler>,
    ) {
        Arc::make_mut(&mut self.dispatcher).on(class, action, handler);
    }

    /// 启动链路并订阅指定农场的主题。
    ///
    /// 同一农场重复调用是幂等 no-op；换农场会先拆除旧连接再重建。
    /// 链路被禁用或代理地址为空时记录一次日志后直接返回，此后
    /// `is_connected` 恒为 false。调用立即返回，连接在后台任务内推进。
    pub fn start(&mut self, farm_id: &str) {
        if !self.config.enabled {
            info!(target: "farmsync.realtime", "realtime link disabled, skipping connect");
            return;
        }
        if self.config.broker_url.is_empty() {
            warn!(target: "farmsync.realtime", "broker url missing, skipping connect");
            return;
        }
        if self.farm_id.as_deref() == Some(farm_id)
            && self.task.as_ref().is_some_and(|t| !t.is_finished())
        {
            return;
        }
        self.teardown();

        self.shared.set_state(LinkState::Connecting);
        let shared = self.shared.clone();
        let config = self.config.clone();
        let dispatcher = self.dispatcher.clone();
        let farm = farm_id.to_string();
        self.task = Some(tokio::spawn(run_link(shared, config, dispatcher, farm)));
        self.farm_id = Some(farm_id.to_string());
    }

    /// 停止链路：进入终态 Closed，中止后台任务并释放传输资源。
    ///
    /// 任意状态下调用都安全，且幂等。
    pub fn stop(&mut self) {
        self.shared.set_state(LinkState::Closed);
        self.teardown();
        self.farm_id = None;
    }

    pub fn is_connected(&self) -> bool {
        self.shared.state() == LinkState::Connected
    }

    pub fn state(&self) -> LinkState {
        self.shared.state()
    }

    pub fn farm_id(&self) -> Option<&str> {
        self.farm_id.as_deref()
    }

    fn teardown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for RealtimeLink {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// 连接主循环：握手 → 订阅 → 消息循环，断开后固定间隔重试。
async fn run_link(
    shared: Arc<LinkShared>,
    config: LinkConfig,
    dispatcher: Arc<Dispatcher>,
    farm_id: String,
) {
    let topics = topics_for(&farm_id);

    loop {
        if shared.state() == LinkState::Closed {
            return;
        }
        shared.transition(LinkState::Connecting);

        let (client, mut eventloop) = connect_pair(&config);
        if let Err(reason) = await_handshake(&mut eventloop, config.connect_timeout).await {
            warn!(
                target: "farmsync.realtime",
                farm_id = %farm_id,
                error = %reason,
                "link_connect_failed"
            );
            if !shared.transition(LinkState::Reconnecting) {
                return;
            }
            farmsync_telemetry::record_reconnect_attempt();
            tokio::time::sleep(config.retry_interval).await;
            continue;
        }

        if !shared.transition(LinkState::Connected) {
            return;
        }
        farmsync_telemetry::record_connect();
        info!(target: "farmsync.realtime", farm_id = %farm_id, "link_connected");
        subscribe_all(&client, &topics).await;

        // 消息循环：逐条处理，保持到达顺序，不批处理不重排。
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    farmsync_telemetry::record_message_received();
                    match router::route(&publish.topic, &publish.payload) {
                        Ok(event) => dispatcher.dispatch(event).await,
                        Err(err) => {
                            farmsync_telemetry::record_decode_failure();
                            warn!(
                                target: "farmsync.realtime",
                                topic = %publish.topic,
                                error = %err,
                                "message_dropped"
                            );
                        }
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(
                        target: "farmsync.realtime",
                        farm_id = %farm_id,
                        error = %err,
                        "link_transport_error"
                    );
                    if !shared.transition(LinkState::Reconnecting) {
                        return;
                    }
                    farmsync_telemetry::record_reconnect_attempt();
                    tokio::time::sleep(config.retry_interval).await;
                    break;
                }
            }
        }
    }
}

/// 构建一次连接的客户端与事件循环。
///
/// 客户端 ID 每个会话随机生成，不做跨会话恢复；clean session 配合
/// QoS 0 订阅构成「至多一次」语义：断线期间的报文不补发。
fn connect_pair(config: &LinkConfig) -> (AsyncClient, EventLoop) {
    let client_id = format!("farmsync-web-{}", uuid::Uuid::new_v4());
    let mut options = MqttOptions::new(
        client_id,
        config.broker_url.clone(),
        broker_port(&config.broker_url),
    );
    options.set_keep_alive(config.keep_alive);
    options.set_clean_session(true);
    if config.broker_url.starts_with("wss://") {
        options.set_transport(Transport::wss_with_default_config());
    } else if config.broker_url.starts_with("ws://") {
        options.set_transport(Transport::ws());
    }
    AsyncClient::new(options, 10)
}

/// 等待首个 ConnAck；超时或传输错误都走同一条重试路径。
async fn await_handshake(eventloop: &mut EventLoop, timeout: Duration) -> Result<(), String> {
    let handshake = async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                Ok(_) => {}
                Err(err) => return Err(err.to_string()),
            }
        }
    };
    match tokio::time::timeout(timeout, handshake).await {
        Ok(result) => result,
        Err(_) => Err(format!("handshake timed out after {timeout:?}")),
    }
}

/// 订阅全部主题模式，QoS 0。
///
/// 单条订阅失败记录日志与计数后继续：链路保持 Connected，
/// 只是主题集降级。
async fn subscribe_all(client: &AsyncClient, topics: &[String]) {
    for topic in topics {
        if let Err(err) = client.subscribe(topic.clone(), QoS::AtMostOnce).await {
            farmsync_telemetry::record_subscribe_failure();
            warn!(
                target: "farmsync.realtime",
                topic = %topic,
                error = %err,
                "subscribe_failed"
            );
        }
    }
    info!(target: "farmsync.realtime", count = topics.len(), "topics_subscribed");
}

fn broker_port(url: &str) -> u16 {
    let after_scheme = url.split("://").nth(1).unwrap_or(url);
    let authority = after_scheme.split('/').next().unwrap_or(after_scheme);
    if let Some((_, port)) = authority.rsplit_once(':') {
        if let Ok(port) = port.parse() {
            return port;
        }
    }
    if url.starts_with("wss://") {
        443
    } else if url.starts_with("ws://") {
        80
    } else {
        1883
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_link_is_a_noop() {
        let mut link = RealtimeLink::new(LinkConfig {
            enabled: false,
            ..LinkConfig::default()
        });
        link.start("farm1");
        assert!(!link.is_connected());
        assert_eq!(link.state(), LinkState::Disconnected);
        assert_eq!(link.farm_id(), None);
    }

    #[tokio::test]
    async fn missing_broker_url_is_a_noop() {
        let mut link = RealtimeLink::new(LinkConfig {
            broker_url: String::new(),
            ..LinkConfig::default()
        });
        link.start("farm1");
        assert_eq!(link.state(), LinkState::Disconnected);
    }

    #[tokio::test]
    async fn stop_is_safe_from_any_state_and_idempotent() {
        let mut link = RealtimeLink::new(LinkConfig::default());
        link.stop();
        assert_eq!(link.state(), LinkState::Closed);

        link.start("farm1");
        assert_eq!(link.farm_id(), Some("farm1"));
        link.stop();
        link.stop();
        assert_eq!(link.state(), LinkState::Closed);
        assert!(!link.is_connected());
        assert_eq!(link.farm_id(), None);
    }

    #[tokio::test]
    async fn restart_with_other_farm_rebuilds() {
        let mut link = RealtimeLink::new(LinkConfig::default());
        link.start("farm1");
        link.start("farm2");
        assert_eq!(link.farm_id(), Some("farm2"));
        link.stop();
    }

    #[test]
    fn closed_state_is_terminal_for_the_task() {
        let shared = LinkShared::new();
        shared.set_state(LinkState::Closed);
        assert!(!shared.transition(LinkState::Reconnecting));
        assert_eq!(shared.state(), LinkState::Closed);
    }

    #[test]
    fn broker_port_parses_url_forms() {
        assert_eq!(broker_port("wss://broker.example:8084/mqtt"), 8084);
        assert_eq!(broker_port("wss://broker.example/mqtt"), 443);
        assert_eq!(broker_port("ws://broker.example/mqtt"), 80);
        assert_eq!(broker_port("broker.example"), 1883);
        assert_eq!(broker_port("broker.example:1884"), 1884);
    }
}
