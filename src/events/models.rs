//! Compute Notification Models
//!
//! Notification envelopes emitted by the compute service and the models
//! their payloads and related resources are checked against.
//!
//! # Example Notification
//!
//! ```json
//! {
//!   "event_type": "compute.instance.create.end",
//!   "publisher_id": "compute.host-1",
//!   "message_id": "b1c9a2f0-7f36-4c8e-a5a1-2f2d8f0c9e11",
//!   "priority": "INFO",
//!   "timestamp": "2014-03-12 16:54:01.123456",
//!   "payload": { "instance_id": "...", "state": "active", "...": "..." }
//! }
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::marshalling::{AutoMarshallingModel, Format};

/// Serde adapter for the compute service's timestamp format.
pub mod nova_timestamp {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

    pub fn serialize<S: Serializer>(timestamp: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&timestamp.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(raw.trim(), FORMAT).map_err(de::Error::custom)
    }
}

/// A notification envelope as delivered on the notification bus.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Notification {
    pub event_type: String,
    pub publisher_id: String,
    pub message_id: String,
    pub priority: String,
    #[serde(with = "nova_timestamp")]
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub payload: Value,
}

impl Notification {
    /// Looks up a top-level payload member.
    pub fn payload_field(&self, field: &str) -> Option<&Value> {
        self.payload.get(field)
    }

    /// Instance the notification is about, if the payload names one.
    pub fn instance_id(&self) -> Option<&str> {
        self.payload_field("instance_id").and_then(Value::as_str)
    }
}

impl AutoMarshallingModel for Notification {
    const ROOT_TAG: &'static str = "notification";
    const FIELDS: &'static [&'static str] = &[
        "event_type",
        "publisher_id",
        "message_id",
        "priority",
        "timestamp",
        "payload",
    ];
    const REQUIRED_FIELDS: &'static [&'static str] =
        &["event_type", "publisher_id", "message_id", "priority", "timestamp"];
    const JSON_WRAPPED: bool = false;
    const FORMATS: &'static [Format] = &[Format::Json];
}

/// Payload of `compute.instance.*` lifecycle notifications.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InstancePayload {
    pub tenant_id: String,
    pub user_id: String,
    pub instance_id: String,
    pub display_name: String,
    /// Flavor name
    pub instance_type: String,
    pub instance_type_id: u64,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_state: Option<String>,
    #[serde(default)]
    pub state_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub memory_mb: u64,
    pub disk_gb: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_gb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral_gb: Option<u64>,
    pub vcpus: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref_url: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launched_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

impl AutoMarshallingModel for InstancePayload {
    const ROOT_TAG: &'static str = "payload";
    const FIELDS: &'static [&'static str] = &[
        "tenant_id",
        "user_id",
        "instance_id",
        "display_name",
        "instance_type",
        "instance_type_id",
        "state",
        "old_state",
        "state_description",
        "host",
        "memory_mb",
        "disk_gb",
        "root_gb",
        "ephemeral_gb",
        "vcpus",
        "image_ref_url",
        "created_at",
        "launched_at",
        "terminated_at",
        "deleted_at",
    ];
    const REQUIRED_FIELDS: &'static [&'static str] = &[
        "tenant_id",
        "user_id",
        "instance_id",
        "display_name",
        "instance_type",
        "instance_type_id",
        "state",
        "memory_mb",
        "disk_gb",
        "vcpus",
        "created_at",
    ];
    const JSON_WRAPPED: bool = false;
}

/// A compute flavor as returned by `GET /flavors/{id}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Flavor {
    pub id: String,
    pub name: String,
    pub ram: u64,
    pub disk: u64,
    pub vcpus: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rxtx_factor: Option<f64>,
    #[serde(
        rename = "OS-FLV-EXT-DATA:ephemeral",
        alias = "ephemeral",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ephemeral: Option<u64>,
    #[serde(
        rename = "os-flavor-access:is_public",
        alias = "is_public",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_public: Option<bool>,
}

impl Flavor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, ram: u64, disk: u64, vcpus: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ram,
            disk,
            vcpus,
            swap: None,
            rxtx_factor: None,
            ephemeral: None,
            is_public: None,
        }
    }
}

impl AutoMarshallingModel for Flavor {
    const ROOT_TAG: &'static str = "flavor";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "name",
        "ram",
        "disk",
        "vcpus",
        "swap",
        "rxtx_factor",
        "OS-FLV-EXT-DATA:ephemeral",
        "os-flavor-access:is_public",
        "links",
    ];
    const REQUIRED_FIELDS: &'static [&'static str] = &["id", "name", "ram", "disk", "vcpus"];
    const COLLECTION_TAG: Option<&'static str> = Some("flavors");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshalling::DeserializePolicy;
    use chrono::{NaiveDate, Timelike};
    use serde_json::json;

    fn payload_json() -> Value {
        json!({
            "tenant_id": "t1",
            "user_id": "u1",
            "instance_id": "inst-1",
            "display_name": "web-01",
            "instance_type": "m1.small",
            "instance_type_id": 5,
            "state": "active",
            "old_state": "building",
            "state_description": "",
            "host": "compute-1",
            "memory_mb": 2048,
            "disk_gb": 20,
            "root_gb": 20,
            "ephemeral_gb": 0,
            "vcpus": 1,
            "created_at": "2014-03-12 16:53:40",
            "launched_at": "2014-03-12T16:54:00.000000"
        })
    }

    #[test]
    fn test_notification_timestamp_parsing() {
        let body = r#"{
            "event_type": "compute.instance.create.start",
            "publisher_id": "compute.host-1",
            "message_id": "m1",
            "priority": "INFO",
            "timestamp": "2014-03-12 16:53:41.123456",
            "payload": {"instance_id": "inst-1"}
        }"#;

        let notification =
            Notification::unmarshal(body, Format::Json, DeserializePolicy::Strict).unwrap();
        let expected_date = NaiveDate::from_ymd_opt(2014, 3, 12).unwrap();
        assert_eq!(notification.timestamp.date(), expected_date);
        assert_eq!(notification.timestamp.nanosecond(), 123_456_000);
        assert_eq!(notification.instance_id(), Some("inst-1"));
    }

    #[test]
    fn test_notification_timestamp_without_fraction() {
        let body = r#"{"event_type": "e", "publisher_id": "p", "message_id": "m",
            "priority": "INFO", "timestamp": "2014-03-12 16:53:41"}"#;
        let notification =
            Notification::unmarshal(body, Format::Json, DeserializePolicy::Strict).unwrap();
        assert_eq!(notification.timestamp.second(), 41);
        assert_eq!(notification.payload, Value::Null);
        assert!(notification.instance_id().is_none());
    }

    #[test]
    fn test_notification_bad_timestamp_is_none() {
        let body = r#"{"event_type": "e", "publisher_id": "p", "message_id": "m",
            "priority": "INFO", "timestamp": "yesterday"}"#;
        assert!(Notification::unmarshal(body, Format::Json, DeserializePolicy::Relaxed).is_none());
    }

    #[test]
    fn test_notification_context_keys_need_relaxed() {
        let body = r#"{"event_type": "e", "publisher_id": "p", "message_id": "m",
            "priority": "INFO", "timestamp": "2014-03-12 16:53:41", "_context_user": "u"}"#;
        assert!(Notification::unmarshal(body, Format::Json, DeserializePolicy::Strict).is_none());
        assert!(Notification::unmarshal(body, Format::Json, DeserializePolicy::Relaxed).is_some());
    }

    #[test]
    fn test_notification_is_json_only() {
        assert!(Notification::supports(Format::Json));
        assert!(!Notification::supports(Format::Xml));
    }

    #[test]
    fn test_notification_timestamp_serializes_in_wire_format() {
        let notification = Notification {
            event_type: "e".to_string(),
            publisher_id: "p".to_string(),
            message_id: "m".to_string(),
            priority: "INFO".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2014, 3, 12)
                .unwrap()
                .and_hms_micro_opt(16, 53, 41, 5)
                .unwrap(),
            payload: Value::Null,
        };
        let body = notification.marshal(Format::Json).unwrap();
        assert!(body.contains(r#""timestamp":"2014-03-12 16:53:41.000005""#));
        assert!(!body.contains("payload"));
    }

    #[test]
    fn test_instance_payload_strict() {
        let payload =
            InstancePayload::from_json_value(payload_json(), DeserializePolicy::Strict).unwrap();
        assert_eq!(payload.instance_type, "m1.small");
        assert_eq!(payload.memory_mb, 2048);
        assert_eq!(payload.old_state.as_deref(), Some("building"));
    }

    #[test]
    fn test_instance_payload_strict_rejects_extra_fields() {
        let mut value = payload_json();
        value["architecture"] = json!("x86_64");
        assert!(InstancePayload::from_json_value(value.clone(), DeserializePolicy::Strict).is_none());
        assert!(InstancePayload::from_json_value(value, DeserializePolicy::Relaxed).is_some());
    }

    #[test]
    fn test_instance_payload_xml_round_trip() {
        let mut payload =
            InstancePayload::from_json_value(payload_json(), DeserializePolicy::Strict).unwrap();
        payload.state_description = "spawning".to_string();

        let body = payload.marshal(Format::Xml).unwrap();
        assert!(body.contains("<payload>"));
        assert!(body.contains("<memory_mb>2048</memory_mb>"));

        let parsed = InstancePayload::unmarshal(&body, Format::Xml, DeserializePolicy::Strict).unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn test_flavor_renamed_fields() {
        let body = r#"{"flavor": {
            "id": "2", "name": "m1.small", "ram": 2048, "disk": 20, "vcpus": 1,
            "OS-FLV-EXT-DATA:ephemeral": 0, "os-flavor-access:is_public": true,
            "rxtx_factor": 1.0, "links": []
        }}"#;

        let flavor = Flavor::unmarshal(body, Format::Json, DeserializePolicy::Strict).unwrap();
        assert_eq!(flavor.ephemeral, Some(0));
        assert_eq!(flavor.is_public, Some(true));
        assert_eq!(flavor.rxtx_factor, Some(1.0));

        let marshalled = flavor.marshal(Format::Json).unwrap();
        assert!(marshalled.contains(r#""OS-FLV-EXT-DATA:ephemeral":0"#));
        assert!(marshalled.contains(r#""os-flavor-access:is_public":true"#));
        assert!(!marshalled.contains("swap"));
    }

    #[test]
    fn test_flavor_list() {
        let flavors = vec![
            Flavor::new("1", "m1.tiny", 512, 1, 1),
            Flavor::new("2", "m1.small", 2048, 20, 1),
        ];
        let body = Flavor::marshal_list(&flavors).unwrap();
        let parsed = Flavor::unmarshal_list(&body, DeserializePolicy::Strict).unwrap();
        assert_eq!(parsed, flavors);
    }

    #[test]
    fn test_flavor_xml_round_trip() {
        let mut flavor = Flavor::new("3", "m1.medium", 4096, 40, 2);
        flavor.ephemeral = Some(10);
        flavor.is_public = Some(true);
        flavor.rxtx_factor = Some(1.5);

        let body = flavor.marshal(Format::Xml).unwrap();
        assert!(body.contains("<OS-FLV-EXT-DATA:ephemeral>10</OS-FLV-EXT-DATA:ephemeral>"));
        assert!(body.contains("<os-flavor-access:is_public>true</os-flavor-access:is_public>"));

        let parsed = Flavor::unmarshal(&body, Format::Xml, DeserializePolicy::Strict).unwrap();
        assert_eq!(parsed, flavor);
    }

    #[test]
    fn test_flavor_xml_attribute_form() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<flavor xmlns="http://docs.openstack.org/compute/api/v1.1"
        xmlns:OS-FLV-EXT-DATA="http://docs.openstack.org/compute/ext/flavor_extra_data/api/v1.1"
        id="1" name="m1.tiny" ram="512" disk="1" vcpus="1" OS-FLV-EXT-DATA:ephemeral="0"/>"#;

        let flavor = Flavor::unmarshal(body, Format::Xml, DeserializePolicy::Strict).unwrap();
        let mut expected = Flavor::new("1", "m1.tiny", 512, 1, 1);
        expected.ephemeral = Some(0);
        assert_eq!(flavor, expected);
    }
}
