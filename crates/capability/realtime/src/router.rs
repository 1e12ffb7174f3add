//! 入站报文路由：主题字符串 + 原始负载 → 类型化事件。

use crate::events::{
    ControllerStatus, ControllerSwitch, EventPayload, GatewayAction, RealtimeEvent, SensorReading,
};
use domain::GatewayClass;

/// 报文解析错误。
///
/// 路由失败的报文由连接任务记录日志后丢弃，单条坏报文不影响链路。
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("topic shape invalid: {0}")]
    TopicShape(String),
    #[error("unknown action: {0}")]
    Action(String),
    #[error("payload invalid: {0}")]
    Payload(String),
}

/// 解析一条入站报文。
///
/// 主题形如 `{farm}/{gateway_class}/{gateway_id}/res/{action}`，必须恰好
/// 五段。类别段按是否包含 `sensor` 判定；负载按 (类别, 动作) 解码为
/// 对应的类型化结构，应答负载不作解释。
pub fn route(topic: &str, payload: &[u8]) -> Result<RealtimeEvent, RouteError> {
    let parts: Vec<&str> = topic.split('/').collect();
    if parts.len() != 5 {
        return Err(RouteError::TopicShape(format!(
            "expected 5 segments, got {} in {topic:?}",
            parts.len()
        )));
    }
    if parts[3] != "res" {
        return Err(RouteError::TopicShape(format!(
            "expected res segment in {topic:?}"
        )));
    }

    let farm_id = parts[0].to_string();
    let class = if parts[1].contains("sensor") {
        GatewayClass::Sensor
    } else {
        GatewayClass::Controller
    };
    let gateway_id = parts[2].to_string();
    let action = GatewayAction::parse(parts[4])
        .ok_or_else(|| RouteError::Action(parts[4].to_string()))?;

    let payload = decode_payload(class, action, payload)?;

    Ok(RealtimeEvent {
        farm_id,
        class,
        gateway_id,
        action,
        payload,
    })
}

fn decode_payload(
    class: GatewayClass,
    action: GatewayAction,
    payload: &[u8],
) -> Result<EventPayload, RouteError> {
    match (class, action) {
        (GatewayClass::Sensor, GatewayAction::Sensors) => {
            let reading: SensorReading = decode(payload)?;
            Ok(EventPayload::SensorReading(reading))
        }
        (GatewayClass::Controller, GatewayAction::Update) => {
            let switch: ControllerSwitch = decode(payload)?;
            Ok(EventPayload::ControllerSwitch(switch))
        }
        (GatewayClass::Controller, GatewayAction::Status) => {
            let status: ControllerStatus = decode(payload)?;
            Ok(EventPayload::ControllerStatus(status))
        }
        (_, GatewayAction::Ack) => {
            let value: serde_json::Value = decode(payload)?;
            Ok(EventPayload::Ack(value))
        }
        (class, action) => Err(RouteError::Action(format!("{class}/{action}"))),
    }
}

fn decode<T: serde::de::DeserializeOwned>(payload: &[u8]) -> Result<T, RouteError> {
    serde_json::from_slice(payload).map_err(|err| RouteError::Payload(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_sensor_reading() {
        let payload = br#"{"sensor_type":"temperature","sensor_val":23.4,"res_time":1700000000}"#;
        let event = route("farm1/sensor_gateway/gw-7/res/sensors", payload).expect("event");

        assert_eq!(event.farm_id, "farm1");
        assert_eq!(event.class, GatewayClass::Sensor);
        assert_eq!(event.gateway_id, "gw-7");
        assert_eq!(event.action, GatewayAction::Sensors);
        match event.payload {
            EventPayload::SensorReading(reading) => {
                assert_eq!(reading.sensor_type, "temperature");
                assert_eq!(reading.sensor_val, 23.4);
                assert_eq!(reading.res_time_ms(), 1_700_000_000_000);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn routes_controller_update_and_status() {
        let event = route(
            "farm1/controller_gateway/gw-2/res/update",
            br#"{"ctr_ch":3,"switch_state":"true"}"#,
        )
        .expect("event");
        assert_eq!(event.class, GatewayClass::Controller);
        match &event.payload {
            EventPayload::ControllerSwitch(switch) => {
                assert_eq!(switch.ctr_ch, 3);
                assert!(switch.is_on());
            }
            other => panic!("unexpected payload: {other:?}"),
        }

        let event = route(
            "farm1/controller_gateway/gw-2/res/status",
            br#"{"firmware_version":"1.4.2","res_time":1700000100,"target_ch_num":8}"#,
        )
        .expect("event");
        match &event.payload {
            EventPayload::ControllerStatus(status) => {
                assert_eq!(status.firmware_version, "1.4.2");
                assert_eq!(status.target_ch_num, 8);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn ack_payload_stays_opaque() {
        let event = route(
            "farm1/sensor_gateway/gw-7/res/ack",
            br#"{"cmd":"reboot","ok":true}"#,
        )
        .expect("event");
        match event.payload {
            EventPayload::Ack(value) => assert_eq!(value["cmd"], "reboot"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn short_topic_is_rejected() {
        let err = route("farm1/sensor_gateway/gw-7", b"{}").expect_err("shape");
        assert!(matches!(err, RouteError::TopicShape(_)));

        let err = route("farm1/sensor_gateway/gw-7/req/sensors", b"{}").expect_err("shape");
        assert!(matches!(err, RouteError::TopicShape(_)));
    }

    #[test]
    fn bad_payload_is_rejected_not_panicked() {
        let err = route("farm1/sensor_gateway/gw-7/res/sensors", b"not json").expect_err("payload");
        assert!(matches!(err, RouteError::Payload(_)));

        // 负载形态与动作不符同样按解码失败处理。
        let err = route("farm1/sensor_gateway/gw-7/res/sensors", b"{}").expect_err("payload");
        assert!(matches!(err, RouteError::Payload(_)));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let err = route("farm1/sensor_gateway/gw-7/res/unknown", b"{}").expect_err("action");
        assert!(matches!(err, RouteError::Action(_)));

        // 传感器网关不会上报 update 动作。
        let err = route("farm1/sensor_gateway/gw-7/res/update", b"{}").expect_err("action");
        assert!(matches!(err, RouteError::Action(_)));
    }
}
