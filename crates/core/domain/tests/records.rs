use domain::{DeviceRecord, DeviceValue, FarmInventory, GatewayClass, GatewayRecord};

#[test]
fn device_numeric_views() {
    let mut device = DeviceRecord {
        device_id: "d1".to_string(),
        name: "led 1".to_string(),
        raw_type: "led".to_string(),
        channel: 1,
        value: Some(DeviceValue::Number(1.0)),
        mode: None,
        reported_at_ms: None,
    };
    assert_eq!(device.numeric_value(), Some(1.0));
    assert!(device.is_on());

    device.value = Some(DeviceValue::Text("n/a".to_string()));
    assert_eq!(device.numeric_value(), None);
    assert!(!device.is_on());
}

#[test]
fn inventory_decodes_from_json() {
    let raw = r#"{
        "farm_id": "farm1",
        "sites": [{ "site_id": "s1", "name": "1F" }],
        "gateways": [{
            "gateway_id": "gw-1",
            "name": "rack a",
            "class": "sensor",
            "site_id": "s1",
            "devices": [{
                "device_id": "d1",
                "name": "air temp",
                "raw_type": "air_temp",
                "channel": 1
            }]
        }]
    }"#;

    let inventory: FarmInventory = serde_json::from_str(raw).expect("inventory");
    assert_eq!(inventory.farm_id, "farm1");
    assert_eq!(inventory.sites.len(), 1);

    let gateway: &GatewayRecord = &inventory.gateways[0];
    assert_eq!(gateway.class, GatewayClass::Sensor);
    assert_eq!(gateway.last_update_ms, None);
    let device = gateway.device("d1").expect("device");
    assert_eq!(device.value, None);
    assert_eq!(device.channel, 1);
}
