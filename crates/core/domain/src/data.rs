use crate::{DeviceValue, GatewayClass, SwitchMode};
use serde::{Deserialize, Serialize};

/// 设备记录：网关下的单个传感器或控制器通道。
///
/// `device_id` 在所属网关内唯一。`raw_type` 保留上游原始类型标签，
/// 匹配时经 normalize 规范化后比较。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device_id: String,
    pub name: String,
    pub raw_type: String,
    pub channel: i64,
    #[serde(default)]
    pub value: Option<DeviceValue>,
    #[serde(default)]
    pub mode: Option<SwitchMode>,
    /// 该设备最近一次上报时间（epoch 毫秒）。
    #[serde(default)]
    pub reported_at_ms: Option<i64>,
}

impl DeviceRecord {
    /// 数值读数视图（文本或空取值返回 None）。
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.as_ref().and_then(DeviceValue::as_number)
    }

    /// 控制器开关视图：取值为 1 视为开。
    pub fn is_on(&self) -> bool {
        matches!(self.numeric_value(), Some(v) if v == 1.0)
    }
}

/// 网关记录：聚合同一类别设备的物理中继。
///
/// 对账只改写 `last_update_ms`、`firmware_version`、`channel_count`
/// 与设备的 `value`/`reported_at_ms`；其余字段在记录生命周期内不变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayRecord {
    pub gateway_id: String,
    pub name: String,
    pub class: GatewayClass,
    pub site_id: String,
    #[serde(default)]
    pub firmware_version: Option<String>,
    /// 网关上报的通道总数。
    #[serde(default)]
    pub channel_count: Option<i64>,
    /// 网关级最近更新时间（epoch 毫秒）。
    #[serde(default)]
    pub last_update_ms: Option<i64>,
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
}

impl GatewayRecord {
    pub fn device(&self, device_id: &str) -> Option<&DeviceRecord> {
        self.devices.iter().find(|d| d.device_id == device_id)
    }
}

/// 站点记录：农场内的一个分区。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub site_id: String,
    pub name: String,
    #[serde(default)]
    pub site_type: Option<String>,
}

/// 农场基线清单：会话启动时一次性获取的网关/设备树。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmInventory {
    pub farm_id: String,
    #[serde(default)]
    pub sites: Vec<SiteRecord>,
    #[serde(default)]
    pub gateways: Vec<GatewayRecord>,
}
