use farmsync_telemetry::{metrics, record_decode_failure, record_message_received};

#[test]
fn counters_accumulate_into_snapshot() {
    let before = metrics().snapshot();
    record_message_received();
    record_message_received();
    record_decode_failure();

    let after = metrics().snapshot();
    assert_eq!(after.messages_received - before.messages_received, 2);
    assert_eq!(after.decode_failures - before.decode_failures, 1);
}
