//! Notification Validators
//!
//! Task builders that check a captured stream of compute notifications,
//! and the lifecycle workflows assembled from them. Every task passes the
//! stream on unchanged except [`for_instance`], which narrows it.

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde_json::{json, Value};

use crate::marshalling::{AutoMarshallingModel, DeserializePolicy};
use crate::workflow::{ParallelTasks, Task, TaskError, WorkflowRunner};

use super::models::{Flavor, InstancePayload, Notification};

/// Data threaded through notification workflows.
pub type Notifications = Vec<Notification>;

/// Renders a JSON value without quoting plain strings.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn find_event<'a>(data: &'a [Notification], event_type: &str) -> Result<&'a Notification, TaskError> {
    data.iter()
        .find(|n| n.event_type == event_type)
        .ok_or_else(|| {
            TaskError::new(event_type, "missing")
                .with_message(format!("no '{}' notification received", event_type))
        })
}

/// Keeps only notifications about `instance_id`; fails when none remain.
pub fn for_instance(instance_id: &str) -> Task<Notifications> {
    let instance_id = instance_id.to_string();
    Task::step("for_instance", move |data: Notifications| {
        let total = data.len();
        let matching: Notifications = data
            .into_iter()
            .filter(|n| n.instance_id() == Some(instance_id.as_str()))
            .collect();

        debug!(
            "{} of {} notifications concern instance {}",
            matching.len(),
            total,
            instance_id
        );

        if matching.is_empty() {
            return Err(TaskError::new(format!("notifications for {}", instance_id), "none")
                .with_message(format!("{} notifications received, none for this instance", total))
                .into());
        }
        Ok(matching)
    })
}

/// Expects exactly `expected` notifications of `event_type`.
pub fn expect_event_count(event_type: &str, expected: usize) -> Task<Notifications> {
    let event_type = event_type.to_string();
    Task::step(format!("{} count", event_type), move |data: Notifications| {
        let count = data.iter().filter(|n| n.event_type == event_type).count();
        if count != expected {
            return Err(TaskError::new(expected.to_string(), count.to_string())
                .with_message(format!("number of '{}' notifications", event_type))
                .into());
        }
        Ok(data)
    })
}

/// Expects the payload of the first `event_type` notification to strictly
/// match model `M`.
pub fn expect_payload_schema<M: AutoMarshallingModel>(event_type: &str) -> Task<Notifications> {
    let event_type = event_type.to_string();
    Task::step(format!("{} payload schema", event_type), move |data: Notifications| {
        let notification = find_event(&data, &event_type)?;
        if M::from_json_value(notification.payload.clone(), DeserializePolicy::Strict).is_none() {
            let keys = notification
                .payload
                .as_object()
                .map(|map| map.keys().cloned().collect::<Vec<_>>().join(", "))
                .unwrap_or_default();
            return Err(TaskError::new(format!("{} payload", M::model_name()), keys)
                .with_message("payload does not match the model")
                .into());
        }
        Ok(data)
    })
}

/// Expects a payload member of the first `event_type` notification to equal `expected`.
pub fn expect_payload_field(event_type: &str, field: &str, expected: Value) -> Task<Notifications> {
    let event_type = event_type.to_string();
    let field = field.to_string();
    Task::step(format!("{} {}", event_type, field), move |data: Notifications| {
        let notification = find_event(&data, &event_type)?;
        match notification.payload_field(&field) {
            Some(actual) if *actual == expected => Ok(data),
            Some(actual) => Err(TaskError::new(display_value(&expected), display_value(actual))
                .with_message(format!("payload field '{}'", field))
                .into()),
            None => Err(TaskError::new(display_value(&expected), "missing")
                .with_message(format!("payload field '{}'", field))
                .into()),
        }
    })
}

/// Expects a payload member of the first `event_type` notification to be set.
pub fn expect_payload_present(event_type: &str, field: &str) -> Task<Notifications> {
    let event_type = event_type.to_string();
    let field = field.to_string();
    Task::step(format!("{} {} set", event_type, field), move |data: Notifications| {
        let notification = find_event(&data, &event_type)?;
        match notification.payload_field(&field) {
            None | Some(Value::Null) => Err(TaskError::new("a value", "missing")
                .with_message(format!("payload field '{}'", field))
                .into()),
            Some(Value::String(s)) if s.trim().is_empty() => Err(TaskError::new("a value", "empty")
                .with_message(format!("payload field '{}'", field))
                .into()),
            Some(_) => Ok(data),
        }
    })
}

/// Expects the instance sizing in the payload to match `flavor`.
pub fn expect_flavor(event_type: &str, flavor: Flavor) -> Task<Notifications> {
    let event_type = event_type.to_string();
    Task::step(format!("{} flavor", event_type), move |data: Notifications| {
        let notification = find_event(&data, &event_type)?;
        let payload = InstancePayload::from_json_value(notification.payload.clone(), DeserializePolicy::Relaxed)
            .ok_or_else(|| {
                TaskError::new("instance payload", "unreadable payload")
                    .with_message(format!("cannot compare '{}' against flavor {}", event_type, flavor.name))
            })?;

        let checks = [
            ("instance_type", flavor.name.clone(), payload.instance_type.clone()),
            ("memory_mb", flavor.ram.to_string(), payload.memory_mb.to_string()),
            ("disk_gb", flavor.disk.to_string(), payload.disk_gb.to_string()),
            ("vcpus", flavor.vcpus.to_string(), payload.vcpus.to_string()),
        ];

        let mismatched: Vec<_> = checks
            .iter()
            .filter(|(_, expected, actual)| expected != actual)
            .collect();

        if mismatched.is_empty() {
            return Ok(data);
        }

        let expected = mismatched
            .iter()
            .map(|(field, expected, _)| format!("{}={}", field, expected))
            .collect::<Vec<_>>()
            .join(" ");
        let actual = mismatched
            .iter()
            .map(|(field, _, actual)| format!("{}={}", field, actual))
            .collect::<Vec<_>>()
            .join(" ");

        Err(TaskError::new(expected, actual)
            .with_message(format!("payload does not match flavor {}", flavor.name))
            .into())
    })
}

/// Expects the first `first` notification not to be later than the first `second` one.
pub fn expect_chronological(first: &str, second: &str) -> Task<Notifications> {
    let first = first.to_string();
    let second = second.to_string();
    Task::step(format!("{} before {}", first, second), move |data: Notifications| {
        let earlier = find_event(&data, &first)?;
        let later = find_event(&data, &second)?;
        if earlier.timestamp > later.timestamp {
            return Err(TaskError::new(
                format!("{} before {}", first, second),
                format!("{} at {}, {} at {}", first, earlier.timestamp, second, later.timestamp),
            )
            .into());
        }
        Ok(data)
    })
}

/// Instance lifecycle operations with start/end notification pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceAction {
    Create,
    Delete,
}

impl InstanceAction {
    pub fn start_event(&self) -> &'static str {
        match self {
            Self::Create => "compute.instance.create.start",
            Self::Delete => "compute.instance.delete.start",
        }
    }

    pub fn end_event(&self) -> &'static str {
        match self {
            Self::Create => "compute.instance.create.end",
            Self::Delete => "compute.instance.delete.end",
        }
    }

    /// Instance state reported in the start payload.
    pub fn start_state(&self) -> &'static str {
        match self {
            Self::Create => "building",
            Self::Delete => "active",
        }
    }

    /// Instance state reported in the end payload.
    pub fn end_state(&self) -> &'static str {
        match self {
            Self::Create => "active",
            Self::Delete => "deleted",
        }
    }

    /// Payload timestamp the end notification must carry.
    pub fn end_timestamp_field(&self) -> &'static str {
        match self {
            Self::Create => "launched_at",
            Self::Delete => "terminated_at",
        }
    }
}

impl fmt::Display for InstanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

impl FromStr for InstanceAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "delete" => Ok(Self::Delete),
            other => Err(format!("Unknown instance action '{}' (expected create or delete)", other)),
        }
    }
}

/// Builds the validation workflow for one instance lifecycle operation.
///
/// The stream is narrowed to the instance, both notifications must appear
/// exactly once, each payload is checked as a parallel group, and the start
/// must precede the end.
///
/// # Example
///
/// ```
/// use cloudcafe::events::{lifecycle_workflow, InstanceAction};
///
/// let runner = lifecycle_workflow(InstanceAction::Create, "inst-1", None);
/// let (report, _) = runner.run(Vec::new());
/// assert!(!report.success());
/// ```
pub fn lifecycle_workflow(
    action: InstanceAction,
    instance_id: &str,
    flavor: Option<Flavor>,
) -> WorkflowRunner<Notifications> {
    let start = action.start_event();
    let end = action.end_event();

    let mut start_checks = vec![
        expect_payload_schema::<InstancePayload>(start),
        expect_payload_field(start, "state", json!(action.start_state())),
    ];
    let mut end_checks = vec![
        expect_payload_schema::<InstancePayload>(end),
        expect_payload_field(end, "state", json!(action.end_state())),
        expect_payload_present(end, action.end_timestamp_field()),
    ];

    if let Some(flavor) = flavor {
        start_checks.push(expect_flavor(start, flavor.clone()));
        end_checks.push(expect_flavor(end, flavor));
    }

    WorkflowRunner::new(
        format!("instance {} {}", action, instance_id),
        vec![
            for_instance(instance_id),
            expect_event_count(start, 1),
            expect_event_count(end, 1),
            ParallelTasks::new(start_checks, format!("{} payload", start)).into(),
            ParallelTasks::new(end_checks, format!("{} payload", end)).into(),
            expect_chronological(start, end),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{ReportEntry, Status};
    use chrono::NaiveDateTime;

    fn notification(event_type: &str, timestamp: &str, payload: Value) -> Notification {
        Notification {
            event_type: event_type.to_string(),
            publisher_id: "compute.host-1".to_string(),
            message_id: format!("msg-{}", event_type),
            priority: "INFO".to_string(),
            timestamp: NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S").unwrap(),
            payload,
        }
    }

    fn payload(instance_id: &str, state: &str) -> Value {
        json!({
            "tenant_id": "t1",
            "user_id": "u1",
            "instance_id": instance_id,
            "display_name": "web-01",
            "instance_type": "m1.small",
            "instance_type_id": 5,
            "state": state,
            "state_description": "",
            "memory_mb": 2048,
            "disk_gb": 20,
            "vcpus": 1,
            "created_at": "2014-03-12 16:53:40"
        })
    }

    fn create_stream() -> Notifications {
        let mut end_payload = payload("inst-1", "active");
        end_payload["launched_at"] = json!("2014-03-12T16:54:00.000000");

        vec![
            notification("compute.instance.create.start", "2014-03-12 16:53:41", payload("inst-1", "building")),
            notification("compute.instance.create.start", "2014-03-12 16:53:42", payload("other", "building")),
            notification("compute.instance.create.end", "2014-03-12 16:54:01", end_payload),
        ]
    }

    fn small() -> Flavor {
        Flavor::new("2", "m1.small", 2048, 20, 1)
    }

    #[test]
    fn test_for_instance_narrows_stream() {
        let task = for_instance("inst-1");
        let Task::Step(step) = task else { panic!("expected step") };
        let narrowed = step.invoke(create_stream()).unwrap();
        assert_eq!(narrowed.len(), 2);
        assert!(narrowed.iter().all(|n| n.instance_id() == Some("inst-1")));
    }

    #[test]
    fn test_for_instance_fails_without_matches() {
        let Task::Step(step) = for_instance("missing") else { panic!("expected step") };
        let error = step.invoke(create_stream()).unwrap_err();
        assert_eq!(error.actual(), "none");
        assert_eq!(
            error.message(),
            Some("3 notifications received, none for this instance")
        );
    }

    #[test]
    fn test_expect_event_count() {
        let Task::Step(step) = expect_event_count("compute.instance.create.start", 1) else {
            panic!("expected step")
        };
        let error = step.invoke(create_stream()).unwrap_err();
        assert_eq!(error.expected(), "1");
        assert_eq!(error.actual(), "2");
    }

    #[test]
    fn test_expect_payload_field_mismatch() {
        let Task::Step(step) =
            expect_payload_field("compute.instance.create.end", "state", json!("error"))
        else {
            panic!("expected step")
        };
        let error = step.invoke(create_stream()).unwrap_err();
        assert_eq!(error.expected(), "error");
        assert_eq!(error.actual(), "active");
    }

    #[test]
    fn test_expect_payload_field_missing_event() {
        let Task::Step(step) =
            expect_payload_field("compute.instance.delete.end", "state", json!("deleted"))
        else {
            panic!("expected step")
        };
        let error = step.invoke(create_stream()).unwrap_err();
        assert_eq!(error.expected(), "compute.instance.delete.end");
        assert_eq!(error.actual(), "missing");
    }

    #[test]
    fn test_expect_payload_present() {
        let Task::Step(present) = expect_payload_present("compute.instance.create.end", "launched_at") else {
            panic!("expected step")
        };
        assert!(present.invoke(create_stream()).is_ok());

        let Task::Step(absent) = expect_payload_present("compute.instance.create.start", "launched_at") else {
            panic!("expected step")
        };
        assert_eq!(absent.invoke(create_stream()).unwrap_err().actual(), "missing");
    }

    #[test]
    fn test_expect_payload_schema_rejects_extra_keys() {
        let mut stream = create_stream();
        stream[0].payload["architecture"] = json!("x86_64");

        let Task::Step(step) = expect_payload_schema::<InstancePayload>("compute.instance.create.start") else {
            panic!("expected step")
        };
        let error = step.invoke(stream).unwrap_err();
        assert_eq!(error.expected(), "InstancePayload payload");
        assert!(error.actual().contains("architecture"));
    }

    #[test]
    fn test_expect_flavor_reports_mismatches() {
        let Task::Step(step) =
            expect_flavor("compute.instance.create.end", Flavor::new("3", "m1.medium", 4096, 20, 2))
        else {
            panic!("expected step")
        };
        let error = step.invoke(create_stream()).unwrap_err();
        assert_eq!(error.expected(), "instance_type=m1.medium memory_mb=4096 vcpus=2");
        assert_eq!(error.actual(), "instance_type=m1.small memory_mb=2048 vcpus=1");
    }

    #[test]
    fn test_expect_chronological() {
        let Task::Step(ordered) =
            expect_chronological("compute.instance.create.start", "compute.instance.create.end")
        else {
            panic!("expected step")
        };
        assert!(ordered.invoke(create_stream()).is_ok());

        let Task::Step(reversed) =
            expect_chronological("compute.instance.create.end", "compute.instance.create.start")
        else {
            panic!("expected step")
        };
        assert!(reversed.invoke(create_stream()).is_err());
    }

    #[test]
    fn test_instance_action_parsing() {
        assert_eq!("create".parse::<InstanceAction>(), Ok(InstanceAction::Create));
        assert_eq!("DELETE".parse::<InstanceAction>(), Ok(InstanceAction::Delete));
        assert!("reboot".parse::<InstanceAction>().is_err());
        assert_eq!(InstanceAction::Delete.to_string(), "delete");
    }

    #[test]
    fn test_create_lifecycle_succeeds() {
        let runner = lifecycle_workflow(InstanceAction::Create, "inst-1", Some(small()));
        let (report, output) = runner.run(create_stream());

        assert!(report.success(), "report:\n{}", report);
        assert_eq!(report.name(), "instance create inst-1");
        assert_eq!(output.map(|n| n.len()), Some(2));
        assert_eq!(report.summary().total(), 11);
    }

    #[test]
    fn test_lifecycle_failure_skips_later_checks() {
        let mut stream = create_stream();
        stream.retain(|n| n.event_type != "compute.instance.create.end");

        let runner = lifecycle_workflow(InstanceAction::Create, "inst-1", None);
        let (report, output) = runner.run(stream);

        assert!(!report.success());
        assert!(output.is_none());

        let results = report.results();
        assert_eq!(results[0].status(), Status::Success);
        assert_eq!(results[1].status(), Status::Success);
        assert_eq!(results[2].status(), Status::Failure);
        for entry in &results[3..] {
            assert_eq!(entry.status(), Status::Skipped);
        }
    }

    #[test]
    fn test_lifecycle_payload_group_reports_all_members() {
        let mut stream = create_stream();
        stream[2].payload["state"] = json!("error");
        stream[2].payload["memory_mb"] = json!(1024);

        let runner = lifecycle_workflow(InstanceAction::Create, "inst-1", Some(small()));
        let (report, _) = runner.run(stream);

        let ReportEntry::Workflow(end_group) = &report.results()[4] else {
            panic!("expected payload group")
        };
        assert!(end_group.is_parallel());
        let statuses: Vec<Status> = end_group.results().iter().map(ReportEntry::status).collect();
        assert_eq!(
            statuses,
            vec![Status::Success, Status::Failure, Status::Success, Status::Failure]
        );
        assert_eq!(report.results()[5].status(), Status::Skipped);
        assert_eq!(report.failures().len(), 2);
    }

    #[test]
    fn test_delete_lifecycle() {
        let mut end_payload = payload("inst-9", "deleted");
        end_payload["terminated_at"] = json!("2014-03-12T17:00:00.000000");
        let stream = vec![
            notification("compute.instance.delete.start", "2014-03-12 16:59:00", payload("inst-9", "active")),
            notification("compute.instance.delete.end", "2014-03-12 17:00:01", end_payload),
        ];

        let runner = lifecycle_workflow(InstanceAction::Delete, "inst-9", None);
        let (report, _) = runner.run(stream);
        assert!(report.success(), "report:\n{}", report);
    }
}
