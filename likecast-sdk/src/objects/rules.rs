//! Filtered-stream rule management bodies.

use serde::{Deserialize, Serialize};

use super::ApiProblem;

/// A rule currently installed on the filtered stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRule {
    pub id: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// A rule to be installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStreamRule {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// `GET /2/tweets/search/stream/rules` response.
///
/// `data` is omitted by the upstream when no rules are installed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuleListResponse {
    #[serde(default)]
    pub data: Vec<StreamRule>,
}

/// `POST /2/tweets/search/stream/rules` body.
///
/// Serializes as `{"add": [...]}` or `{"delete": {"ids": [...]}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleUpdateRequest {
    Add(Vec<NewStreamRule>),
    Delete { ids: Vec<String> },
}

/// `POST /2/tweets/search/stream/rules` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuleUpdateResponse {
    #[serde(default)]
    pub data: Vec<StreamRule>,
    pub meta: RuleUpdateMeta,
    #[serde(default)]
    pub errors: Vec<ApiProblem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuleUpdateMeta {
    #[serde(default)]
    pub sent: Option<String>,
    #[serde(default)]
    pub summary: RuleUpdateSummary,
}

/// Counts reported by the upstream for a rule update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct RuleUpdateSummary {
    #[serde(default)]
    pub created: u32,
    #[serde(default)]
    pub not_created: u32,
    #[serde(default)]
    pub deleted: u32,
    #[serde(default)]
    pub not_deleted: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_shapes() {
        let delete = RuleUpdateRequest::Delete {
            ids: vec!["r1".into(), "r2".into()],
        };
        assert_eq!(
            serde_json::to_value(&delete).unwrap(),
            serde_json::json!({"delete": {"ids": ["r1", "r2"]}})
        );

        let add = RuleUpdateRequest::Add(vec![NewStreamRule {
            value: "from:42".into(),
            tag: Some("ID filter".into()),
        }]);
        assert_eq!(
            serde_json::to_value(&add).unwrap(),
            serde_json::json!({"add": [{"value": "from:42", "tag": "ID filter"}]})
        );
    }

    #[test]
    fn test_empty_rule_list_has_no_data() {
        let body = r#"{"meta":{"sent":"2024-01-01T00:00:00.000Z","result_count":0}}"#;
        let parsed: RuleListResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.data.is_empty());
    }

    #[test]
    fn test_update_summary_parsing() {
        let body = r#"{
            "data": [{"value": "from:42", "tag": "ID filter", "id": "1700"}],
            "meta": {"sent": "2024-01-01T00:00:00.000Z",
                     "summary": {"created": 1, "not_created": 0, "valid": 1, "invalid": 0}}
        }"#;
        let parsed: RuleUpdateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.meta.summary.created, 1);
        assert_eq!(parsed.data[0].id, "1700");
        assert!(parsed.errors.is_empty());
    }
}
