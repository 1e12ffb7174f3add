//! 传感器类型规范化。
//!
//! 上游设备上报的类型标签格式不一（`AIR_TEMP_01`、`tmp`、`온도`……），
//! 统一折叠到一组标准类别后再做匹配与汇总。

/// 标准传感器类别全集。
pub const CANONICAL_TYPES: [&str; 8] = [
    "temperature",
    "water_temp",
    "humidity",
    "co2",
    "ph",
    "ec",
    "light",
    "water_level",
];

/// 将原始类型标签规范化为标准类别。
///
/// 规则按序匹配，较具体的规则（如 `water_temp`）先于较宽泛的规则
/// （如裸 `temp`）。所有规则都不命中时返回小写化的原始标签，未知类型
/// 不是错误。对任何标准类别输出再次调用本函数得到其自身。
pub fn normalize_sensor_type(raw: &str) -> String {
    let label = raw.to_lowercase();

    if label.contains("water_temp") || label == "water_temperature" {
        return "water_temp".to_string();
    }
    if label.contains("air_temp") || label == "tmp" || label == "온도" || label == "temperature" {
        return "temperature".to_string();
    }
    if label.contains("temp") {
        return "temperature".to_string();
    }
    if label.contains("humid") || label == "hum" || label == "습도" {
        return "humidity".to_string();
    }
    if label.contains("co2") || label == "carbon" {
        return "co2".to_string();
    }
    if label.contains("ph") {
        return "ph".to_string();
    }
    if label.contains("ec") || label.contains("conductivity") {
        return "ec".to_string();
    }
    if label.contains("light") || label.contains("lux") || label == "조도" {
        return "light".to_string();
    }
    if label.contains("level") || label == "수위" {
        return "water_level".to_string();
    }

    label
}
