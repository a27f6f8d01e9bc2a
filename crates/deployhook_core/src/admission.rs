//! Webhook admission gate.
//!
//! Decides, for one inbound event and a snapshot of the registry, whether a
//! deployment should run. The checks run in a fixed order and the first one
//! that applies wins:
//!
//! 1. token lookup (constant-time against every record) → reject
//! 2. event kind must be push or merge request → ignore
//! 3. a merge request must be merged → ignore
//! 4. the event's branch must be the record's branch → ignore
//! 5. deploy

use std::fmt;
use std::sync::Arc;

use crate::event::{EventKind, WebhookEvent};
use crate::logger::{EventLogger, LogScope};
use crate::registry::RepositoryRecord;
use crate::token::tokens_match;

/// Outcome of admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Run the deployment pipeline for this repository
    Deploy(RepositoryRecord),
    /// Valid caller, nothing to do
    Ignore(IgnoreReason),
    /// Caller could not be authenticated
    Reject(RejectReason),
}

impl Decision {
    /// Human-readable message for ignore and reject decisions.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Deploy(_) => None,
            Self::Ignore(reason) => Some(reason.to_string()),
            Self::Reject(reason) => Some(reason.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Neither a push nor a merge request
    UnsupportedEvent(String),
    NotMerged,
    /// Event branch differs from the configured one
    BranchMismatch(String),
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedEvent(name) => write!(f, "Event ignored ({})", name),
            Self::NotMerged => write!(f, "Merge request event ignored (not merged)"),
            Self::BranchMismatch(branch) => write!(f, "Branch {} ignored", branch),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingToken,
    InvalidToken,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingToken => write!(f, "Missing token"),
            Self::InvalidToken => write!(f, "Invalid token"),
        }
    }
}

/// Find the record whose webhook token equals `token`.
///
/// Every record is compared, even after a match, so the time taken does not
/// depend on where (or whether) the token is found.
fn find_by_token<'a>(token: &str, repositories: &'a [RepositoryRecord]) -> Option<&'a RepositoryRecord> {
    let mut matched = None;
    for record in repositories {
        let equal = tokens_match(token, &record.webhook_token);
        if equal && matched.is_none() {
            matched = Some(record);
        }
    }
    matched
}

/// Pure admission decision, without side effects.
pub fn evaluate(event: &WebhookEvent, repositories: &[RepositoryRecord]) -> Decision {
    let Some(token) = event.token.as_deref() else {
        return Decision::Reject(RejectReason::MissingToken);
    };
    let Some(record) = find_by_token(token, repositories) else {
        return Decision::Reject(RejectReason::InvalidToken);
    };

    match &event.kind {
        EventKind::Push => {}
        EventKind::MergeRequest => {
            if event.merge_state.as_deref() != Some("merged") {
                return Decision::Ignore(IgnoreReason::NotMerged);
            }
        }
        EventKind::Other(name) => {
            return Decision::Ignore(IgnoreReason::UnsupportedEvent(name.clone()));
        }
    }

    let branch = event.branch().unwrap_or_default();
    if branch != record.branch {
        return Decision::Ignore(IgnoreReason::BranchMismatch(branch.to_string()));
    }

    Decision::Deploy(record.clone())
}

/// Admission gate that records its decisions in the event log.
pub struct AdmissionGate {
    logger: Arc<dyn EventLogger>,
}

impl AdmissionGate {
    pub fn new(logger: Arc<dyn EventLogger>) -> Self {
        Self { logger }
    }

    /// Decide what to do with `event`.
    ///
    /// Deploy and ignore decisions are logged at info level in the matched
    /// repository's scope; rejections at error level in the global scope.
    pub fn admit(&self, event: &WebhookEvent, repositories: &[RepositoryRecord]) -> Decision {
        let decision = evaluate(event, repositories);

        match &decision {
            Decision::Deploy(record) => {
                self.logger.info(
                    &LogScope::repository(&record.name),
                    &format!(
                        "Received webhook for {}, branch: {}",
                        record.name, record.branch
                    ),
                );
            }
            Decision::Ignore(reason) => {
                // The token matched, so the repository is known.
                if let Some(record) = event
                    .token
                    .as_deref()
                    .and_then(|t| find_by_token(t, repositories))
                {
                    self.logger
                        .info(&LogScope::repository(&record.name), &reason.to_string());
                }
            }
            Decision::Reject(reason) => {
                self.logger
                    .error(&LogScope::Global, &format!("Webhook error: {}", reason));
            }
        }

        decision
    }
}
