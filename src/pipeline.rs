//! The build-then-publish pipeline, driven as an explicit state machine.
//!
//! One task moves `Received -> Validated -> Building -> Publishing` and ends
//! in exactly one terminal state. Build and publish are strictly sequential
//! and short-circuiting: publish never runs after a failed build, and nothing
//! is rolled back (the scripts own their partial-failure cleanup).

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::HookConfig;
use crate::error::Result;
use crate::notifier::Notifier;
use crate::runner;
use crate::scripts::ScriptPair;
use crate::webhook::{PushPayload, WebhookEvent};

/// One enqueued push event, consumed exactly once by the worker.
#[derive(Debug)]
pub struct PipelineTask {
    pub id: Uuid,
    pub payload: PushPayload,
    /// The `:branch` segment of the route the webhook was posted to.
    pub route_branch: String,
}

impl PipelineTask {
    pub fn new(payload: PushPayload, route_branch: String) -> Self {
        PipelineTask {
            id: Uuid::now_v7(),
            payload,
            route_branch,
        }
    }
}

/// The six positional arguments every script is invoked with, derived once
/// per task after validation.
#[derive(Debug, Clone)]
pub struct ScriptParams {
    pub repo: String,
    pub branch: String,
    pub owner: String,
    pub git_url: String,
    pub source_path: String,
    pub build_path: String,
}

impl ScriptParams {
    pub fn new(event: &WebhookEvent, config: &HookConfig) -> Self {
        let git_url = if config.public_repo {
            format!(
                "https://{}/{}/{}.git",
                config.gh_server, event.owner_login, event.repo_name
            )
        } else {
            format!(
                "git@{}:{}/{}.git",
                config.gh_server, event.owner_login, event.repo_name
            )
        };

        let workdir = config
            .temp
            .join(&event.owner_login)
            .join(&event.repo_name)
            .join(&event.ref_branch);

        ScriptParams {
            repo: event.repo_name.clone(),
            branch: event.ref_branch.clone(),
            owner: event.owner_login.clone(),
            git_url,
            source_path: workdir.join("code").display().to_string(),
            build_path: workdir.join("site").display().to_string(),
        }
    }

    /// Argument vector in the order the scripts expect:
    /// repo, branch, owner, git URL, source path, build path.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            self.repo.clone(),
            self.branch.clone(),
            self.owner.clone(),
            self.git_url.clone(),
            self.source_path.clone(),
            self.build_path.clone(),
        ]
    }
}

/// Why a task was dropped before any subprocess ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Payload is missing the repository name, owner login or ref.
    IncompletePayload,
    /// Owner is not in the configured allow-list.
    OwnerNotAllowed(String),
    /// Pushed branch does not match the branch segment of the route.
    BranchMismatch { pushed: String, route: String },
}

/// Pipeline states. Exactly one terminal state is reached per task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Validated,
    Building,
    Publishing,
    Rejected,
    BuildFailed,
    PublishFailed,
    Succeeded,
}

/// Terminal result of a pipeline that got past validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
    BuildFailed,
    PublishFailed,
    Succeeded,
}

/// Everything a finished task can end as, short of a fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Rejected(RejectReason),
    Completed(PipelineResult),
}

/// Validates, authorizes and executes pipeline tasks.
///
/// Holds its configuration immutably; nothing here reads process-wide state.
pub struct Orchestrator {
    config: Arc<HookConfig>,
    notifier: Notifier,
}

impl Orchestrator {
    pub fn new(config: Arc<HookConfig>, notifier: Notifier) -> Self {
        Orchestrator { config, notifier }
    }

    /// Runs one task to a terminal state.
    ///
    /// `Err` is reserved for configuration errors (unresolvable scripts);
    /// everything else, rejections included, is a regular outcome. No
    /// subprocess is spawned unless validation and authorization pass.
    pub async fn execute(&self, task: PipelineTask) -> Result<PipelineOutcome> {
        let task_id = task.id;
        let mut state = PipelineState::Received;

        // Received -> Validated
        let Some(event) = WebhookEvent::from_payload(&task.payload) else {
            warn!("Task {}: request data incomplete", task_id);
            return Ok(self.reject(task_id, &mut state, RejectReason::IncompletePayload));
        };

        if !self.config.accounts.contains(&event.owner_login) {
            info!(
                "Task {}: {} is not an authorized account",
                task_id, event.owner_login
            );
            return Ok(self.reject(
                task_id,
                &mut state,
                RejectReason::OwnerNotAllowed(event.owner_login),
            ));
        }

        if event.ref_branch != task.route_branch {
            info!(
                "Task {}: {} is not the permitted {} branch",
                task_id, event.ref_branch, task.route_branch
            );
            return Ok(self.reject(
                task_id,
                &mut state,
                RejectReason::BranchMismatch {
                    pushed: event.ref_branch,
                    route: task.route_branch,
                },
            ));
        }

        self.advance(task_id, &mut state, PipelineState::Validated);

        let params = ScriptParams::new(&event, &self.config);
        let args = params.to_args();

        // Both scripts must resolve before anything runs; a miss here is a
        // configuration error the operator has to fix.
        let scripts = ScriptPair::resolve(&self.config.scripts, &event.ref_branch)?;

        // Validated -> Building
        self.advance(task_id, &mut state, PipelineState::Building);
        if !runner::run(&scripts.build, &args).await {
            self.advance(task_id, &mut state, PipelineState::BuildFailed);
            info!(
                "Failed to build: {}/{}",
                event.owner_login, event.repo_name
            );
            self.notifier
                .notify(
                    &format!(
                        "Your website at {}/{} failed to build.",
                        event.owner_login, event.repo_name
                    ),
                    "Error building site",
                    &event,
                )
                .await;
            return Ok(PipelineOutcome::Completed(PipelineResult::BuildFailed));
        }

        // Building -> Publishing
        self.advance(task_id, &mut state, PipelineState::Publishing);
        if !runner::run(&scripts.publish, &args).await {
            self.advance(task_id, &mut state, PipelineState::PublishFailed);
            info!(
                "Failed to publish: {}/{}",
                event.owner_login, event.repo_name
            );
            self.notifier
                .notify(
                    &format!(
                        "Your website at {}/{} failed to publish.",
                        event.owner_login, event.repo_name
                    ),
                    "Error publishing site",
                    &event,
                )
                .await;
            return Ok(PipelineOutcome::Completed(PipelineResult::PublishFailed));
        }

        self.advance(task_id, &mut state, PipelineState::Succeeded);
        info!(
            "Successfully rendered: {}/{}",
            event.owner_login, event.repo_name
        );
        self.notifier
            .notify(
                &format!(
                    "Your website at {}/{} was successfully published.",
                    event.owner_login, event.repo_name
                ),
                "Successfully published site",
                &event,
            )
            .await;
        Ok(PipelineOutcome::Completed(PipelineResult::Succeeded))
    }

    fn advance(&self, task_id: Uuid, state: &mut PipelineState, next: PipelineState) {
        debug!("Task {}: {:?} -> {:?}", task_id, state, next);
        *state = next;
    }

    fn reject(
        &self,
        task_id: Uuid,
        state: &mut PipelineState,
        reason: RejectReason,
    ) -> PipelineOutcome {
        self.advance(task_id, state, PipelineState::Rejected);
        PipelineOutcome::Rejected(reason)
    }
}
