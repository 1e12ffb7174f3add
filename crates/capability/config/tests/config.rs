use farmsync_config::AppConfig;

#[test]
fn load_config_from_env() {
    // Rust 2024 中 set_var 需要显式标注 unsafe（测试进程内可控）。
    unsafe {
        std::env::set_var("FARMSYNC_FARM_ID", "farm1");
        std::env::set_var("FARMSYNC_MQTT_URL", "wss://broker.example:8084/mqtt");
        std::env::set_var("FARMSYNC_MQTT_RETRY_SECONDS", "7");
        std::env::set_var("FARMSYNC_MQTT_ENABLED", "true");
    }

    let config = AppConfig::from_env().expect("config");
    assert_eq!(config.farm_id, "farm1");
    assert_eq!(config.mqtt_url, "wss://broker.example:8084/mqtt");
    assert_eq!(config.mqtt_retry_seconds, 7);
    assert!(config.mqtt_enabled);
    assert_eq!(config.mqtt_connect_timeout_seconds, 30);
    assert_eq!(config.summary_interval_seconds, 60);
    assert_eq!(config.inventory_path, None);
}
