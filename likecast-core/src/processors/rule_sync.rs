//! RuleSynchronizer processor.
//!
//! Runs once at startup, before the stream is opened:
//! - Lists every rule currently installed on the filtered stream
//! - Deletes all of them, whoever installed them
//! - Installs the single rule the pipeline needs and confirms it was created
//!
//! Any failure is fatal: running with a partial rule set would deliver
//! unfiltered or stale-filtered posts.

use crate::upstream::{RulesApi, UpstreamError};
use likecast_sdk::objects::rules::{NewStreamRule, RuleUpdateRequest, StreamRule};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// The rule the stream should carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRule {
    pub value: String,
    pub tag: String,
}

impl FeedRule {
    /// Match every post authored by `user_id`.
    pub fn authored_by(user_id: &str, tag: impl Into<String>) -> Self {
        Self {
            value: format!("from:{user_id}"),
            tag: tag.into(),
        }
    }
}

/// Errors that can occur during rule synchronization.
#[derive(Debug, Error)]
pub enum RuleSyncError {
    /// Listing installed rules failed
    #[error("failed to list stream rules: {0}")]
    List(#[source] UpstreamError),

    /// Delete request failed
    #[error("failed to delete stream rules: {0}")]
    Delete(#[source] UpstreamError),

    /// The upstream did not delete every rule
    #[error("upstream deleted {deleted} of {requested} stream rules")]
    DeleteIncomplete { requested: usize, deleted: u32 },

    /// Add request failed
    #[error("failed to add stream rule: {0}")]
    Add(#[source] UpstreamError),

    /// The upstream answered but did not install the rule
    #[error("stream rule {value:?} was not created: {reason}")]
    NotCreated { value: String, reason: String },
}

pub struct RuleSynchronizer {
    rules: Arc<dyn RulesApi>,
}

impl RuleSynchronizer {
    pub fn new(rules: Arc<dyn RulesApi>) -> Self {
        Self { rules }
    }

    /// Replace every installed rule with `desired`.
    ///
    /// Returns the rule as installed by the upstream.
    #[tracing::instrument(skip_all, err, name = "RuleSynchronizer:synchronize", fields(rule = %desired.value))]
    pub async fn synchronize(&self, desired: &FeedRule) -> Result<StreamRule, RuleSyncError> {
        let installed = self.rules.list_rules().await.map_err(RuleSyncError::List)?;

        if !installed.is_empty() {
            let ids: Vec<String> = installed.into_iter().map(|rule| rule.id).collect();
            let requested = ids.len();
            info!(count = requested, ids = ?ids, "Deleting installed stream rules");

            let response = self
                .rules
                .update_rules(RuleUpdateRequest::Delete { ids })
                .await
                .map_err(RuleSyncError::Delete)?;
            let summary = response.meta.summary;
            if summary.not_deleted > 0 || (summary.deleted as usize) < requested {
                return Err(RuleSyncError::DeleteIncomplete {
                    requested,
                    deleted: summary.deleted,
                });
            }
        }

        let response = self
            .rules
            .update_rules(RuleUpdateRequest::Add(vec![NewStreamRule {
                value: desired.value.clone(),
                tag: Some(desired.tag.clone()),
            }]))
            .await
            .map_err(RuleSyncError::Add)?;

        for problem in &response.errors {
            warn!(problem = %problem, "Upstream reported a problem adding the stream rule");
        }

        let created = response
            .data
            .into_iter()
            .find(|rule| rule.value == desired.value);
        match created {
            Some(rule) if response.meta.summary.created >= 1 => {
                info!(rule_id = %rule.id, "Stream rule installed");
                Ok(rule)
            }
            _ => Err(RuleSyncError::NotCreated {
                value: desired.value.clone(),
                reason: response
                    .errors
                    .first()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "no rule returned".to_string()),
            }),
        }
    }
}
