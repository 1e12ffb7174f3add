//! 订阅主题表。

/// 生成指定农场的订阅主题模式，固定五条。
///
/// 网关 ID 一段使用单层通配符 `+`，一条订阅即覆盖该类别下的全部网关。
pub fn topics_for(farm_id: &str) -> Vec<String> {
    vec![
        format!("{farm_id}/sensor_gateway/+/res/sensors"),
        format!("{farm_id}/sensor_gateway/+/res/ack"),
        format!("{farm_id}/controller_gateway/+/res/update"),
        format!("{farm_id}/controller_gateway/+/res/status"),
        format!("{farm_id}/controller_gateway/+/res/ack"),
    ]
}
