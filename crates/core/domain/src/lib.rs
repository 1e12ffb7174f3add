pub mod data;

pub use data::{DeviceRecord, FarmInventory, GatewayRecord, SiteRecord};

use serde::{Deserialize, Serialize};

/// 网关类别：一个网关只聚合同一类别的设备。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayClass {
    Sensor,
    Controller,
}

impl GatewayClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayClass::Sensor => "sensor",
            GatewayClass::Controller => "controller",
        }
    }
}

impl std::fmt::Display for GatewayClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 控制器运行模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchMode {
    Auto,
    Manual,
}

/// 设备最近一次上报的取值。
///
/// 传感器设备为数值读数；控制器设备约定为 1（开）/ 0（关）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceValue {
    Number(f64),
    Text(String),
}

impl DeviceValue {
    /// 数值视图：文本取值返回 None。
    pub fn as_number(&self) -> Option<f64> {
        match self {
            DeviceValue::Number(v) => Some(*v),
            DeviceValue::Text(_) => None,
        }
    }
}
