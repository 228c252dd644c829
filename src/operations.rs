//! Typed versions of the log & status subscriptions the platform offers.
//!
//! Each operation serializes to a `{"query", "variables"}` body and decodes
//! the `data` of every result into its own response type.
//!
//! ```rust
//! use backboard_subscriptions::operations::BuildLogs;
//!
//! let operation = BuildLogs::new("f62b534a").limit(500);
//! ```

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::{graphql::GraphqlOperation, Error};

const BUILD_LOGS: &str = r#"
subscription BuildLogs($deploymentId: String!, $filter: String, $limit: Int) {
  buildLogs(deploymentId: $deploymentId, filter: $filter, limit: $limit) {
    timestamp
    message
    severity
    attributes { key value }
  }
}
"#;

const DEPLOYMENT_LOGS: &str = r#"
subscription DeploymentLogs($deploymentId: String!, $filter: String, $limit: Int) {
  deploymentLogs(deploymentId: $deploymentId, filter: $filter, limit: $limit) {
    timestamp
    message
    severity
    attributes { key value }
  }
}
"#;

const DEPLOYMENT_STATUS: &str = r#"
subscription Deployment($id: String!) {
  deployment(id: $id) {
    id
    status
    deploymentStopped
  }
}
"#;

const ENVIRONMENT_LOGS: &str = r#"
subscription EnvironmentLogs(
  $environmentId: String!
  $filter: String
  $beforeLimit: Int
  $beforeDate: String
  $anchorDate: String
  $afterDate: String
  $afterLimit: Int
) {
  environmentLogs(
    environmentId: $environmentId
    filter: $filter
    beforeLimit: $beforeLimit
    beforeDate: $beforeDate
    anchorDate: $anchorDate
    afterDate: $afterDate
    afterLimit: $afterLimit
  ) {
    timestamp
    message
    severity
    tags {
      projectId
      environmentId
      pluginId
      serviceId
      deploymentId
      deploymentInstanceId
      snapshotId
    }
    attributes { key value }
  }
}
"#;

#[derive(Serialize)]
struct Body<'a, Variables> {
    query: &'static str,
    variables: &'a Variables,
}

fn decode_field<T>(data: Value, field: &str) -> Result<T, Error>
where
    T: serde::de::DeserializeOwned,
{
    let Value::Object(mut data) = data else {
        return Err(Error::Payload(format!("expected an object with {field}")));
    };
    let value = data
        .remove(field)
        .ok_or_else(|| Error::Payload(format!("missing field {field}")))?;

    serde_json::from_value(value).map_err(|error| Error::Payload(error.to_string()))
}

/// A single log line
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LogLine {
    /// RFC 3339 timestamp
    pub timestamp: String,
    /// The log message
    pub message: String,
    /// Severity, when the platform knows it
    #[serde(default)]
    pub severity: Option<String>,
    /// Where the line came from.  Only environment logs carry these.
    #[serde(default)]
    pub tags: Option<LogTags>,
    /// Structured attributes attached to the line
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attributes: Vec<LogAttribute>,
}

impl LogLine {
    /// Looks up an attribute by key
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.key == key)
            .map(|attribute| attribute.value.as_str())
    }
}

/// A key/value attribute on a log line
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LogAttribute {
    #[allow(missing_docs)]
    pub key: String,
    #[allow(missing_docs)]
    pub value: String,
}

/// Identifies the resource an environment log line belongs to
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct LogTags {
    pub project_id: Option<String>,
    pub environment_id: Option<String>,
    pub plugin_id: Option<String>,
    pub service_id: Option<String>,
    pub deployment_id: Option<String>,
    pub deployment_instance_id: Option<String>,
    pub snapshot_id: Option<String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentLogVariables {
    deployment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

impl DeploymentLogVariables {
    fn new(deployment_id: String) -> Self {
        DeploymentLogVariables {
            deployment_id,
            filter: None,
            limit: None,
        }
    }
}

/// Streams the build output of a deployment.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildLogs {
    variables: DeploymentLogVariables,
}

impl BuildLogs {
    /// Build logs of the given deployment
    pub fn new(deployment_id: impl Into<String>) -> Self {
        BuildLogs {
            variables: DeploymentLogVariables::new(deployment_id.into()),
        }
    }

    /// Only lines matching the filter expression
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.variables.filter = Some(filter.into());
        self
    }

    /// How many historical lines to replay before streaming
    pub fn limit(mut self, limit: u32) -> Self {
        self.variables.limit = Some(limit);
        self
    }
}

impl Serialize for BuildLogs {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Body {
            query: BUILD_LOGS,
            variables: &self.variables,
        }
        .serialize(serializer)
    }
}

impl GraphqlOperation for BuildLogs {
    type Response = Vec<LogLine>;

    fn decode(&self, data: Value) -> Result<Self::Response, Error> {
        decode_field(data, "buildLogs")
    }
}

/// Streams the runtime output of a deployment.
#[derive(Clone, Debug, PartialEq)]
pub struct DeploymentLogs {
    variables: DeploymentLogVariables,
}

impl DeploymentLogs {
    /// Runtime logs of the given deployment
    pub fn new(deployment_id: impl Into<String>) -> Self {
        DeploymentLogs {
            variables: DeploymentLogVariables::new(deployment_id.into()),
        }
    }

    /// Only lines matching the filter expression
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.variables.filter = Some(filter.into());
        self
    }

    /// How many historical lines to replay before streaming
    pub fn limit(mut self, limit: u32) -> Self {
        self.variables.limit = Some(limit);
        self
    }
}

impl Serialize for DeploymentLogs {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Body {
            query: DEPLOYMENT_LOGS,
            variables: &self.variables,
        }
        .serialize(serializer)
    }
}

impl GraphqlOperation for DeploymentLogs {
    type Response = Vec<LogLine>;

    fn decode(&self, data: Value) -> Result<Self::Response, Error> {
        decode_field(data, "deploymentLogs")
    }
}

/// Streams status changes of a deployment.
#[derive(Clone, Debug, PartialEq)]
pub struct DeploymentStatus {
    id: String,
}

impl DeploymentStatus {
    /// Status updates of the given deployment
    pub fn new(deployment_id: impl Into<String>) -> Self {
        DeploymentStatus {
            id: deployment_id.into(),
        }
    }
}

#[derive(Serialize)]
struct DeploymentStatusVariables<'a> {
    id: &'a str,
}

impl Serialize for DeploymentStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Body {
            query: DEPLOYMENT_STATUS,
            variables: &DeploymentStatusVariables { id: &self.id },
        }
        .serialize(serializer)
    }
}

/// The current status of a deployment
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatusUpdate {
    /// The deployment id
    pub id: String,
    /// e.g. `BUILDING`, `DEPLOYING`, `SUCCESS`, `FAILED`
    pub status: String,
    /// Whether the deployment has been stopped
    #[serde(default)]
    pub deployment_stopped: bool,
}

impl GraphqlOperation for DeploymentStatus {
    type Response = DeploymentStatusUpdate;

    fn decode(&self, data: Value) -> Result<Self::Response, Error> {
        decode_field(data, "deployment")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvironmentLogVariables {
    environment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    before_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    before_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    anchor_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    after_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    after_limit: Option<u32>,
}

/// Streams the logs of every service in an environment.
///
/// Without any window the stream starts at the live tail, the `before_*`,
/// `anchor_date` & `after_*` options replay history around a point in time.
/// Dates are RFC 3339 strings.
#[derive(Clone, Debug, PartialEq)]
pub struct EnvironmentLogs {
    variables: EnvironmentLogVariables,
}

impl EnvironmentLogs {
    /// Logs of the given environment
    pub fn new(environment_id: impl Into<String>) -> Self {
        EnvironmentLogs {
            variables: EnvironmentLogVariables {
                environment_id: environment_id.into(),
                filter: None,
                before_limit: None,
                before_date: None,
                anchor_date: None,
                after_date: None,
                after_limit: None,
            },
        }
    }

    /// Only lines matching the filter expression, e.g. `@service:<id>`
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.variables.filter = Some(filter.into());
        self
    }

    /// Replay up to `limit` lines before the anchor
    pub fn before(mut self, limit: u32, date: Option<String>) -> Self {
        self.variables.before_limit = Some(limit);
        self.variables.before_date = date;
        self
    }

    /// The point in time history is replayed around
    pub fn anchor_date(mut self, date: impl Into<String>) -> Self {
        self.variables.anchor_date = Some(date.into());
        self
    }

    /// Replay up to `limit` lines after the anchor
    pub fn after(mut self, limit: u32, date: Option<String>) -> Self {
        self.variables.after_limit = Some(limit);
        self.variables.after_date = date;
        self
    }
}

impl Serialize for EnvironmentLogs {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Body {
            query: ENVIRONMENT_LOGS,
            variables: &self.variables,
        }
        .serialize(serializer)
    }
}

impl GraphqlOperation for EnvironmentLogs {
    type Response = Vec<LogLine>;

    fn decode(&self, data: Value) -> Result<Self::Response, Error> {
        decode_field(data, "environmentLogs")
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn build_logs_variables() {
        let body = serde_json::to_value(BuildLogs::new("d1").limit(500)).unwrap();

        assert_eq!(body["query"], json!(BUILD_LOGS));
        assert_eq!(
            body["variables"],
            json!({"deploymentId": "d1", "limit": 500})
        );
    }

    #[test]
    fn environment_logs_variables() {
        let operation = EnvironmentLogs::new("e1")
            .filter("@service:s1")
            .anchor_date("2025-08-27T02:55:21.874Z")
            .before(1000, None);

        let body = serde_json::to_value(&operation).unwrap();
        insta::assert_json_snapshot!(body["variables"], @r#"
        {
          "anchorDate": "2025-08-27T02:55:21.874Z",
          "beforeLimit": 1000,
          "environmentId": "e1",
          "filter": "@service:s1"
        }
        "#);
    }

    #[test]
    fn decodes_deployment_logs() {
        let data = json!({
            "deploymentLogs": [
                {
                    "timestamp": "2025-08-27T02:55:21.874Z",
                    "message": "listening on :8080",
                    "severity": "info",
                    "attributes": [{"key": "level", "value": "info"}]
                },
                {
                    "timestamp": "2025-08-27T02:55:22.000Z",
                    "message": "ready",
                    "attributes": null
                }
            ]
        });

        let lines = DeploymentLogs::new("d1").decode(data).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].message, "listening on :8080");
        assert_eq!(lines[0].attribute("level"), Some("info"));
        assert_eq!(lines[1].severity, None);
        assert!(lines[1].attributes.is_empty());
    }

    #[test]
    fn decodes_environment_log_tags() {
        let data = json!({
            "environmentLogs": [{
                "timestamp": "2025-08-27T02:55:21.874Z",
                "message": "snapshot taken",
                "severity": "info",
                "tags": {"serviceId": "s1", "snapshotId": null},
                "attributes": []
            }]
        });

        let lines = EnvironmentLogs::new("e1").decode(data).unwrap();
        let tags = lines[0].tags.as_ref().unwrap();

        assert_eq!(tags.service_id.as_deref(), Some("s1"));
        assert_eq!(tags.snapshot_id, None);
    }

    #[test]
    fn decodes_deployment_status() {
        let data = json!({
            "deployment": {"id": "d1", "status": "SUCCESS", "deploymentStopped": false}
        });

        assert_eq!(
            DeploymentStatus::new("d1").decode(data).unwrap(),
            DeploymentStatusUpdate {
                id: "d1".into(),
                status: "SUCCESS".into(),
                deployment_stopped: false,
            }
        );
    }

    #[test]
    fn shape_mismatches_are_payload_errors() {
        assert_matches!(
            BuildLogs::new("d1").decode(json!({"deploymentLogs": []})),
            Err(Error::Payload(_))
        );
        assert_matches!(
            DeploymentStatus::new("d1").decode(Value::Null),
            Err(Error::Payload(_))
        );
    }
}
