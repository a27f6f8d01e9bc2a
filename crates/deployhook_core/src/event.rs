//! Inbound webhook events.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Kind of webhook event, as announced by the event header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Push,
    MergeRequest,
    /// Any other event, with the header value as sent
    Other(String),
}

impl EventKind {
    /// Map a GitLab event header value to an event kind.
    pub fn from_header(value: &str) -> Self {
        match value {
            "Push Hook" => Self::Push,
            "Merge Request Hook" => Self::MergeRequest,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push => write!(f, "Push Hook"),
            Self::MergeRequest => write!(f, "Merge Request Hook"),
            Self::Other(name) => write!(f, "{}", name),
        }
    }
}

/// A webhook event, built once per request and consumed by the admission gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    /// Shared secret presented by the caller (`None` when the header is missing)
    pub token: Option<String>,
    pub kind: EventKind,
    /// `ref` of a push, or target branch of a merge request
    pub reference: Option<String>,
    /// Merge request state (`"merged"`, `"opened"`, ...)
    pub merge_state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GitlabPayload {
    #[serde(rename = "ref")]
    reference: Option<String>,
    object_attributes: Option<ObjectAttributes>,
}

#[derive(Debug, Default, Deserialize)]
struct ObjectAttributes {
    state: Option<String>,
    target_branch: Option<String>,
}

impl WebhookEvent {
    pub fn push(token: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            kind: EventKind::Push,
            reference: Some(reference.into()),
            merge_state: None,
        }
    }

    pub fn merge_request(
        token: impl Into<String>,
        target_branch: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            token: Some(token.into()),
            kind: EventKind::MergeRequest,
            reference: Some(target_branch.into()),
            merge_state: Some(state.into()),
        }
    }

    /// Build an event from a GitLab webhook request.
    ///
    /// The body must be a JSON object; only `ref` and
    /// `object_attributes.{state,target_branch}` are read. A missing event
    /// header is treated as an unnamed, unsupported event.
    pub fn from_gitlab(
        token: Option<String>,
        event_header: Option<&str>,
        body: &[u8],
    ) -> CoreResult<Self> {
        let payload: GitlabPayload = serde_json::from_slice(body)
            .map_err(|e| CoreError::InvalidPayload(e.to_string()))?;

        let kind = EventKind::from_header(event_header.unwrap_or_default());
        let attributes = payload.object_attributes.unwrap_or_default();

        let (reference, merge_state) = match kind {
            EventKind::MergeRequest => (attributes.target_branch, attributes.state),
            _ => (payload.reference, None),
        };

        Ok(Self {
            token: token.filter(|t| !t.is_empty()),
            kind,
            reference,
            merge_state,
        })
    }

    /// Branch this event is about, if it names one.
    ///
    /// For a push the `refs/heads/` prefix of the ref is stripped; for a
    /// merge request the target branch is used as is.
    pub fn branch(&self) -> Option<&str> {
        let reference = self.reference.as_deref()?;
        match self.kind {
            EventKind::Push => Some(
                reference
                    .strip_prefix(BRANCH_REF_PREFIX)
                    .unwrap_or(reference),
            ),
            _ => Some(reference),
        }
    }
}
