use domain::{Envelope, Reading};
use wire_contract::{decode, encode};

fn sample_envelope() -> Envelope {
    Envelope {
        source_channel: "pzem2/all".to_string(),
        meter_id: 2,
        reading: Reading {
            voltage: Some(231.4),
            power: Some(55.0),
            pf: Some(0.92),
            ..Reading::default()
        },
        observed_at_ms: 1_700_000_000_000,
    }
}

#[test]
fn round_trip_preserves_topic_meter_and_data() {
    let envelope = sample_envelope();
    let text = encode(&envelope).expect("encode");
    let message = decode(&text).expect("decode");

    assert_eq!(message.topic, "pzem2/all");
    assert_eq!(message.meter_id, 2);
    assert_eq!(message.data, envelope.reading);
}

#[test]
fn wire_field_names_are_camel_case() {
    let text = encode(&sample_envelope()).expect("encode");
    let value: serde_json::Value = serde_json::from_str(&text).expect("json");

    assert!(value.get("meterId").is_some());
    assert!(value.get("topic").is_some());
    assert!(value.get("timestamp").is_some());
    // 缺省的抄表字段不出现在报文里
    assert!(value["data"].get("voltage").is_some());
    assert!(value["data"].get("thd").is_none());
}

#[test]
fn timestamp_is_rfc3339() {
    let text = encode(&sample_envelope()).expect("encode");
    let message = decode(&text).expect("decode");
    assert_eq!(message.timestamp, "2023-11-14T22:13:20.000Z");
}

#[test]
fn malformed_text_fails_to_decode() {
    assert!(decode("not json").is_err());
    assert!(decode(r#"{"topic": 1}"#).is_err());
}
