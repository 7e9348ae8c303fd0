// ABOUTME: Push notification payload parsing.
// ABOUTME: Reduces a forge push event to a branch and a validated revision.

use serde::Deserialize;

use crate::types::{Revision, RevisionError};

/// An all-zero `after` marks a deleted branch.
const NULL_REVISION: &str = "0000000000000000000000000000000000000000";

#[derive(Debug, Deserialize)]
struct PushPayload {
    #[serde(rename = "ref")]
    git_ref: String,
    after: String,
    #[serde(default)]
    deleted: bool,
}

/// What a push notification asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// A new head for a watched branch.
    Deploy { branch: String, revision: Revision },
    /// Another branch, a tag, or a deletion.
    Ignored { reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("malformed push payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid revision in push payload: {0}")]
    Revision(#[from] RevisionError),
}

impl PushEvent {
    /// Parse a JSON push body and decide whether `branch` is being updated.
    pub fn parse(body: &[u8], branch: &str) -> Result<Self, EventError> {
        let payload: PushPayload = serde_json::from_slice(body)?;

        let Some(pushed) = payload.git_ref.strip_prefix("refs/heads/") else {
            return Ok(PushEvent::Ignored {
                reason: format!("{} is not a branch", payload.git_ref),
            });
        };
        if pushed != branch {
            return Ok(PushEvent::Ignored {
                reason: format!("branch {pushed} is not {branch}"),
            });
        }
        if payload.deleted || payload.after == NULL_REVISION {
            return Ok(PushEvent::Ignored {
                reason: format!("branch {pushed} was deleted"),
            });
        }

        Ok(PushEvent::Deploy {
            branch: pushed.to_string(),
            revision: Revision::parse(&payload.after)?,
        })
    }
}
