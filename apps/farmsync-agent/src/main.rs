//! 农场实时同步代理：装配配置、清单、链路与对账，周期性输出汇总。

mod handler;

use domain::GatewayClass;
use farmsync_aggregate::{controller_summary, summarize};
use farmsync_config::AppConfig;
use farmsync_inventory::{FileInventoryProvider, InventoryProvider, NoopInventoryProvider};
use farmsync_realtime::{GatewayAction, LinkConfig, RealtimeLink};
use farmsync_reconcile::GatewayDirectory;
use farmsync_telemetry::{init_tracing, metrics};
use handler::ReconcileHandler;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    // 基线清单：链路启动前获取一次，之后只承载增量更新
    let provider: Arc<dyn InventoryProvider> = match &config.inventory_path {
        Some(path) => Arc::new(FileInventoryProvider::new(path)),
        None => Arc::new(NoopInventoryProvider),
    };
    let inventory = provider.fetch(&config.farm_id).await?;
    info!(
        target: "farmsync.agent",
        farm_id = %inventory.farm_id,
        sites = inventory.sites.len(),
        gateways = inventory.gateways.len(),
        "inventory_loaded"
    );

    let directory = Arc::new(GatewayDirectory::new());
    directory.load(inventory.gateways)?;

    // 实时链路：注册对账处理器后启动
    let mut link = RealtimeLink::new(LinkConfig {
        broker_url: config.mqtt_url.clone(),
        enabled: config.mqtt_enabled,
        retry_interval: Duration::from_secs(config.mqtt_retry_seconds),
        connect_timeout: Duration::from_secs(config.mqtt_connect_timeout_seconds),
        keep_alive: Duration::from_secs(config.mqtt_keep_alive_seconds),
    });
    let reconciler: Arc<ReconcileHandler> = Arc::new(ReconcileHandler::new(directory.clone()));
    link.on_event(GatewayClass::Sensor, GatewayAction::Sensors, reconciler.clone());
    link.on_event(GatewayClass::Sensor, GatewayAction::Ack, reconciler.clone());
    link.on_event(GatewayClass::Controller, GatewayAction::Update, reconciler.clone());
    link.on_event(GatewayClass::Controller, GatewayAction::Status, reconciler.clone());
    link.on_event(GatewayClass::Controller, GatewayAction::Ack, reconciler);
    link.start(&config.farm_id);

    // 周期性汇总，Ctrl-C 退出
    let mut ticker = tokio::time::interval(Duration::from_secs(config.summary_interval_seconds));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => log_summary(&link, &directory),
        }
    }

    link.stop();
    info!(target: "farmsync.agent", "agent stopped");
    Ok(())
}

/// 输出一轮同步汇总：链路状态、按类型均值与控制器开关计数。
fn log_summary(link: &RealtimeLink, directory: &GatewayDirectory) {
    let snapshot = directory.snapshot();
    let sensor_devices = snapshot
        .iter()
        .filter(|g| g.class == GatewayClass::Sensor)
        .flat_map(|g| g.devices.iter());
    let sensors = summarize(sensor_devices);
    let controllers =
        controller_summary(snapshot.iter().filter(|g| g.class == GatewayClass::Controller));
    let counters = metrics().snapshot();

    info!(
        target: "farmsync.agent",
        connected = link.is_connected(),
        state = ?link.state(),
        gateways = snapshot.len(),
        controllers_on = controllers.on,
        controllers_total = controllers.total,
        messages = counters.messages_received,
        decode_failures = counters.decode_failures,
        reconnects = counters.reconnect_attempts,
        "sync_summary"
    );
    for (kind, summary) in &sensors {
        if let Some(avg) = summary.average() {
            info!(
                target: "farmsync.agent",
                sensor_type = %kind,
                count = summary.count,
                avg = avg,
                min = ?summary.min(),
                max = ?summary.max(),
                "sensor_summary"
            );
        }
    }
}
