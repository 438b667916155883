//! Refresh (C7, `SPEC_FULL.md` §4.7): a sweep over every known resource that
//! walks `ListX`/`GetX` top-down and, at each level with a `.status` to
//! reconcile, calls the Runner's `refresh_*_status` to re-derive that status
//! from live namespace/cgroup/network bookkeeping and write it back if it
//! changed. It never calls `CreateX`/`DeleteX`, never touches `.spec`, and
//! the only write path is that one status-refresh call per resource — unlike
//! `UpdateX`, which exists to apply a new `.spec` and therefore protects
//! `.status` from the caller, `refresh_*_status` exists to do the opposite.
//! Standalone containers have no persisted status of their own (they live
//! inside their parent cell's spec), so there is nothing to write back for
//! them; `containers` only ever reports `found`.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::Kind;
use crate::runner::Runner;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct KindCount {
    pub found: usize,
    pub updated: usize,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RefreshResult {
    pub realms: KindCount,
    pub spaces: KindCount,
    pub stacks: KindCount,
    pub cells: KindCount,
    pub containers: KindCount,
    pub errors: Vec<String>,
}

impl RefreshResult {
    pub fn total_found(&self) -> usize {
        self.realms.found + self.spaces.found + self.stacks.found + self.cells.found + self.containers.found
    }

    pub fn total_updated(&self) -> usize {
        self.realms.updated + self.spaces.updated + self.stacks.updated + self.cells.updated
    }
}

/// Walks Realm -> Space -> Stack -> Cell (and each cell's embedded container
/// set) calling `ListX`/`GetX` at every level, best-effort: one resource's
/// read failure is recorded in `errors` and does not stop the sweep.
pub async fn refresh<R>(runner: &R) -> RefreshResult
where
    R: Runner + ?Sized,
{
    let mut result = RefreshResult::default();

    let realms = match runner.list_realms().await {
        Ok(realms) => realms,
        Err(e) => {
            result.errors.push(format!("{}: {e}", Kind::Realm));
            return result;
        }
    };

    for realm in &realms {
        let actual = match runner.get_realm(&realm.metadata.name).await {
            Ok(actual) => {
                result.realms.found += 1;
                actual
            }
            Err(e) => {
                warn!(realm = %realm.metadata.name, error = %e, "refresh: realm read failed");
                result.errors.push(format!("{}/{}: {e}", Kind::Realm, realm.metadata.name));
                continue;
            }
        };
        match runner.refresh_realm_status(&actual).await {
            Ok(refreshed) => {
                if refreshed.status != actual.status {
                    result.realms.updated += 1;
                }
            }
            Err(e) => {
                result.errors.push(format!("{}/{}: {e}", Kind::Realm, realm.metadata.name));
            }
        }

        let spaces = match runner.list_spaces(&realm.metadata.name).await {
            Ok(spaces) => spaces,
            Err(e) => {
                result.errors.push(format!("{}/{}: {e}", Kind::Space, realm.metadata.name));
                continue;
            }
        };

        for space in &spaces {
            refresh_space(runner, &realm.metadata.name, &space.metadata.name, &mut result).await;
        }
    }

    debug!(
        realms = result.realms.found,
        spaces = result.spaces.found,
        stacks = result.stacks.found,
        cells = result.cells.found,
        containers = result.containers.found,
        errors = result.errors.len(),
        "refresh complete"
    );
    result
}

async fn refresh_space<R>(runner: &R, realm_name: &str, space_name: &str, result: &mut RefreshResult)
where
    R: Runner + ?Sized,
{
    let actual = match runner.get_space(realm_name, space_name).await {
        Ok(actual) => {
            result.spaces.found += 1;
            actual
        }
        Err(e) => {
            result.errors.push(format!("{}/{}: {e}", Kind::Space, space_name));
            return;
        }
    };
    match runner.refresh_space_status(&actual).await {
        Ok(refreshed) => {
            if refreshed.status != actual.status {
                result.spaces.updated += 1;
            }
        }
        Err(e) => result.errors.push(format!("{}/{}: {e}", Kind::Space, space_name)),
    }

    let stacks = match runner.list_stacks(realm_name, space_name).await {
        Ok(stacks) => stacks,
        Err(e) => {
            result.errors.push(format!("{}/{}: {e}", Kind::Stack, space_name));
            return;
        }
    };

    for stack in &stacks {
        refresh_stack(runner, realm_name, space_name, &stack.metadata.name, result).await;
    }
}

async fn refresh_stack<R>(
    runner: &R,
    realm_name: &str,
    space_name: &str,
    stack_name: &str,
    result: &mut RefreshResult,
) where
    R: Runner + ?Sized,
{
    let actual = match runner.get_stack(realm_name, space_name, stack_name).await {
        Ok(actual) => {
            result.stacks.found += 1;
            actual
        }
        Err(e) => {
            result.errors.push(format!("{}/{}: {e}", Kind::Stack, stack_name));
            return;
        }
    };
    match runner.refresh_stack_status(&actual).await {
        Ok(refreshed) => {
            if refreshed.status != actual.status {
                result.stacks.updated += 1;
            }
        }
        Err(e) => result.errors.push(format!("{}/{}: {e}", Kind::Stack, stack_name)),
    }

    let cells = match runner.list_cells(realm_name, space_name, stack_name).await {
        Ok(cells) => cells,
        Err(e) => {
            result.errors.push(format!("{}/{}: {e}", Kind::Cell, stack_name));
            return;
        }
    };

    for cell in &cells {
        let actual = match runner
            .get_cell(realm_name, space_name, stack_name, &cell.metadata.name)
            .await
        {
            Ok(actual) => {
                result.cells.found += 1;
                result.containers.found += actual.spec.child_containers().count();
                actual
            }
            Err(e) => {
                result.errors.push(format!("{}/{}: {e}", Kind::Cell, cell.metadata.name));
                continue;
            }
        };
        match runner.refresh_cell_status(&actual).await {
            Ok(refreshed) => {
                if refreshed.status != actual.status {
                    result.cells.updated += 1;
                }
            }
            Err(e) => result.errors.push(format!("{}/{}: {e}", Kind::Cell, cell.metadata.name)),
        }
    }
}

/// Used by the CLI's `kuke refresh` command, which treats any accumulated
/// error as a non-zero exit without failing the whole sweep.
pub fn refresh_succeeded(result: &RefreshResult) -> Result<()> {
    if result.errors.is_empty() {
        Ok(())
    } else {
        Err(crate::error::KukeonError::Config(format!(
            "refresh completed with {} error(s)",
            result.errors.len()
        )))
    }
}
