use serde::{Deserialize, Serialize};

/// Condition type that reflects the overall outcome of a service rollout.
pub const SUCCEEDED_CONDITION: &str = "Succeeded";

/// Result entry that carries the reachable endpoint of a service.
pub const URL_RESULT: &str = "url";

/// Tri-state condition status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum ConditionStatus {
    True,
    False,
    /// Also used for any value the control plane may add later.
    #[default]
    Unknown,
}

impl From<String> for ConditionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "True" => ConditionStatus::True,
            "False" => ConditionStatus::False,
            _ => ConditionStatus::Unknown,
        }
    }
}

impl From<ConditionStatus> for &'static str {
    fn from(s: ConditionStatus) -> Self {
        match s {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// One entry per pipeline sub-task that has started; only the count matters here.
    #[serde(default)]
    pub task_runs: Vec<serde_json::Value>,
    #[serde(default)]
    pub results: Vec<ResultEntry>,
}

/// Point-in-time state of a watched resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSnapshot {
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: ResourceStatus,
}

impl ResourceSnapshot {
    /// Number of sub-task entries reported so far.
    pub fn task_run_count(&self) -> usize {
        self.status.task_runs.len()
    }

    /// The top-level [`SUCCEEDED_CONDITION`], if reported.
    pub fn succeeded(&self) -> Option<&Condition> {
        self.status
            .conditions
            .iter()
            .find(|c| c.kind == SUCCEEDED_CONDITION)
    }

    /// Status of the top-level condition; absent counts as unknown.
    pub fn outcome(&self) -> ConditionStatus {
        self.succeeded().map(|c| c.status).unwrap_or_default()
    }

    /// Value of a named entry in the result list.
    pub fn result(&self, name: &str) -> Option<&str> {
        self.status
            .results
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.value.as_str())
    }

    /// Human-readable failure detail of the top-level condition.
    pub fn failure_detail(&self) -> String {
        match self.succeeded() {
            Some(c) if !c.message.is_empty() => c.message.clone(),
            Some(c) if !c.reason.is_empty() => c.reason.clone(),
            _ => "resource reported failure without detail".to_string(),
        }
    }
}
