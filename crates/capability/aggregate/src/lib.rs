//! 汇总统计：对当前设备集合按规范化类型求均值/计数/最值。
//!
//! 无状态，每次调用都从传入集合现算；展示层在需要时随取随算。

use domain::{DeviceRecord, GatewayRecord};
use farmsync_normalize::normalize_sensor_type;
use std::collections::HashMap;

/// 单一类型的汇总：参与统计的数值与计数。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeSummary {
    pub values: Vec<f64>,
    pub count: usize,
}

impl TypeSummary {
    pub fn average(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }
}

/// 控制器汇总：设备总数与处于开状态的数量。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerSummary {
    pub total: usize,
    pub on: usize,
}

/// 按规范化类型汇总设备读数。空值与文本值不参与统计。
pub fn summarize<'a, I>(devices: I) -> HashMap<String, TypeSummary>
where
    I: IntoIterator<Item = &'a DeviceRecord>,
{
    summarize_with(devices, normalize_sensor_type)
}

/// 同 [`summarize`]，但由调用方提供规范化函数。
pub fn summarize_with<'a, I, F>(devices: I, normalize: F) -> HashMap<String, TypeSummary>
where
    I: IntoIterator<Item = &'a DeviceRecord>,
    F: Fn(&str) -> String,
{
    let mut summary: HashMap<String, TypeSummary> = HashMap::new();
    for device in devices {
        let entry = summary.entry(normalize(&device.raw_type)).or_default();
        if let Some(value) = device.numeric_value() {
            entry.values.push(value);
            entry.count += 1;
        }
    }
    summary
}

/// 指定类型的均值；类型缺席或无读数时为 None。
pub fn average(summary: &HashMap<String, TypeSummary>, kind: &str) -> Option<f64> {
    summary.get(kind).and_then(TypeSummary::average)
}

/// 统计控制器设备的开/总数。
pub fn controller_summary<'a, I>(gateways: I) -> ControllerSummary
where
    I: IntoIterator<Item = &'a GatewayRecord>,
{
    let mut summary = ControllerSummary::default();
    for gateway in gateways {
        summary.total += gateway.devices.len();
        summary.on += gateway.devices.iter().filter(|d| d.is_on()).count();
    }
    summary
}
