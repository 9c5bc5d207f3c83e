//! GitHub push-event payload structures.

use serde::Deserialize;

/// Serde view of the inbound push payload.
///
/// Every field is optional so that an incomplete payload deserializes fine
/// and is rejected by explicit validation instead of a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "ref", default)]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub repository: Option<Repository>,
    #[serde(default)]
    pub pusher: Option<Pusher>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub owner: Option<Owner>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Owner {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pusher {
    #[serde(default)]
    pub email: Option<String>,
}

/// Data extracted from a validated push payload. Immutable for the lifetime
/// of the pipeline task it belongs to.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub repo_name: String,
    pub owner_login: String,
    /// Branch name with the `refs/heads/` prefix stripped.
    pub ref_branch: String,
    pub pusher_email: Option<String>,
}

impl WebhookEvent {
    /// Extracts the event from a raw payload.
    ///
    /// Returns `None` when the repository name, owner login or `ref` is
    /// missing; the caller treats that as a terminal rejection.
    pub fn from_payload(payload: &PushPayload) -> Option<Self> {
        let repository = payload.repository.as_ref()?;
        let repo_name = repository.name.clone()?;
        let owner_login = repository.owner.as_ref()?.name.clone()?;
        let git_ref = payload.git_ref.as_deref()?;
        let ref_branch = git_ref
            .strip_prefix("refs/heads/")
            .unwrap_or(git_ref)
            .to_string();
        let pusher_email = payload.pusher.as_ref().and_then(|p| p.email.clone());

        Some(WebhookEvent {
            repo_name,
            owner_login,
            ref_branch,
            pusher_email,
        })
    }
}
