use crate::error::GatewayError;
use crate::flow::{SubmissionKind, SubmissionRequest};

/// Server-side plan operations used by a submission.
///
/// Implemented over HTTP by the browser client and by recording fakes in
/// tests. Futures are polled on a single thread, so no `Send` bound.
#[allow(async_fn_in_trait)]
pub trait PlanGateway {
    async fn save_plan(&self, player: &str, plan: &str) -> Result<(), GatewayError>;

    async fn validate_plan(&self, player: &str) -> Result<(), GatewayError>;

    /// Fire-and-forget readiness notice.
    fn mark_ready(&self);
}

/// Save the plan, then validate it when the submission is a revision.
/// The first failing call ends the run.
pub async fn run_submission<G: PlanGateway>(
    gateway: &G,
    request: &SubmissionRequest,
) -> Result<(), GatewayError> {
    gateway.save_plan(&request.player, &request.plan).await?;
    if request.kind == SubmissionKind::Revision {
        gateway.validate_plan(&request.player).await?;
    }
    tracing::debug!(
        player = %request.player,
        kind = ?request.kind,
        trigger = ?request.trigger,
        "plan submitted"
    );
    Ok(())
}
