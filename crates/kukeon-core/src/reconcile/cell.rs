use tracing::{debug, info, warn};

use super::{ensure_realm, ensure_space, ensure_stack, ReconcileResult, ReconciledResource};
use crate::differ::{diff_cell, ChangeType};
use crate::error::{KukeonError, Result, RunnerError};
use crate::model::{Cell, CellState, Kind};
use crate::runner::{CellRunner, RealmRunner, SpaceRunner, StackRunner};

/// `ReconcileX(runner, desired) -> ReconcileResult` for `Cell`.
///
/// Three ancestors (`Realm`, `Space`, `Stack`), walked in hierarchy order and
/// auto-provisioned if missing (`spec.md` §3 invariant 1). Creation is then a
/// short linear pipeline (`SPEC_FULL.md` §4.4): create the cgroup/metadata,
/// start the root ("pause") container to bring up the network namespace,
/// re-fetch to pick up what the runner filled in, mark the cell Ready, then
/// persist that status via `update_cell_metadata`.
///
/// Updates split on whether the root container changed: if it did, the cell
/// is recreated wholesale (cgroup + root container, in place); otherwise the
/// compatible delta — the container add/update/remove set the differ
/// already computed — is applied via a single `update_cell` call.
pub async fn reconcile_cell<R>(runner: &R, desired: &Cell) -> Result<ReconcileResult>
where
    R: RealmRunner + SpaceRunner + StackRunner + CellRunner + ?Sized,
{
    let name = desired.metadata.name.clone();

    ensure_realm(runner, &desired.spec.realm_name).await?;
    ensure_space(runner, &desired.spec.realm_name, &desired.spec.space_name).await?;
    ensure_stack(
        runner,
        &desired.spec.realm_name,
        &desired.spec.space_name,
        &desired.spec.stack_name,
    )
    .await?;

    let actual = match runner
        .get_cell(
            &desired.spec.realm_name,
            &desired.spec.space_name,
            &desired.spec.stack_name,
            &name,
        )
        .await
    {
        Ok(actual) => actual,
        Err(RunnerError::CellNotFound(_)) => {
            return create_cell_pipeline(runner, desired, &name).await;
        }
        Err(e) => return Err(e.into()),
    };

    let diff = diff_cell(desired, &actual);
    if !diff.has_changes {
        debug!(cell = %name, "no changes");
        return Ok(ReconcileResult::unchanged(
            Kind::Cell,
            name,
            ReconciledResource::Cell(actual),
        ));
    }

    if diff.root_container_changed {
        warn!(cell = %name, "root container changed, recreating cell");
        let recreated = runner.recreate_cell(desired).await?;
        let mut changes = diff.changed_fields;
        changes.push("root container recreated".to_string());
        return Ok(ReconcileResult::updated(
            Kind::Cell,
            name,
            ReconciledResource::Cell(recreated),
            changes,
            diff.details,
        ));
    }

    if diff.change_type() == ChangeType::Breaking {
        return Err(KukeonError::BreakingChange {
            kind: Kind::Cell,
            name,
            changes: diff.breaking_changes,
        });
    }

    let updated = runner.update_cell(desired).await?;
    Ok(ReconcileResult::updated(
        Kind::Cell,
        name,
        ReconciledResource::Cell(updated),
        diff.changed_fields,
        diff.details,
    ))
}

async fn create_cell_pipeline<R>(runner: &R, desired: &Cell, name: &str) -> Result<ReconcileResult>
where
    R: CellRunner + ?Sized,
{
    info!(cell = %name, stack = %desired.spec.stack_name, "creating cell");
    let created = runner.create_cell(desired).await?;
    runner.start_cell(&created).await?;

    let mut ready = runner
        .get_cell(
            &created.spec.realm_name,
            &created.spec.space_name,
            &created.spec.stack_name,
            &created.metadata.name,
        )
        .await?;
    ready.status.state = CellState::Ready;
    let finalized = runner.update_cell_metadata(&ready).await?;

    Ok(ReconcileResult::created(
        Kind::Cell,
        name.to_string(),
        ReconciledResource::Cell(finalized),
    ))
}
