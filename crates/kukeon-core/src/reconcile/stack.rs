use tracing::{debug, info};

use super::{ensure_realm, ensure_space, ReconcileResult, ReconciledResource};
use crate::differ::{diff_stack, ChangeType};
use crate::error::{KukeonError, Result, RunnerError};
use crate::model::{Kind, Stack};
use crate::runner::{RealmRunner, SpaceRunner, StackRunner};

/// `ReconcileX(runner, desired) -> ReconcileResult` for `Stack`. Two
/// ancestors (`Realm`, `Space`), walked in hierarchy order and
/// auto-provisioned if missing (`spec.md` §3 invariant 1).
pub async fn reconcile_stack<R>(runner: &R, desired: &Stack) -> Result<ReconcileResult>
where
    R: RealmRunner + SpaceRunner + StackRunner + ?Sized,
{
    let name = desired.metadata.name.clone();

    ensure_realm(runner, &desired.spec.realm_name).await?;
    ensure_space(runner, &desired.spec.realm_name, &desired.spec.space_name).await?;

    let actual = match runner
        .get_stack(&desired.spec.realm_name, &desired.spec.space_name, &name)
        .await
    {
        Ok(actual) => actual,
        Err(RunnerError::StackNotFound(_)) => {
            info!(stack = %name, space = %desired.spec.space_name, "creating stack");
            let created = runner.create_stack(desired).await?;
            return Ok(ReconcileResult::created(
                Kind::Stack,
                name,
                ReconciledResource::Stack(created),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let diff = diff_stack(desired, &actual);
    if !diff.has_changes {
        debug!(stack = %name, "no changes");
        return Ok(ReconcileResult::unchanged(
            Kind::Stack,
            name,
            ReconciledResource::Stack(actual),
        ));
    }

    if diff.change_type() == ChangeType::Breaking {
        return Err(KukeonError::BreakingChange {
            kind: Kind::Stack,
            name,
            changes: diff.breaking_changes,
        });
    }

    let updated = runner.update_stack(desired).await?;
    Ok(ReconcileResult::updated(
        Kind::Stack,
        name,
        ReconciledResource::Stack(updated),
        diff.changed_fields,
        diff.details,
    ))
}
