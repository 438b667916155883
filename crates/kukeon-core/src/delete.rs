//! Delete / Purge Orchestrator (C6, `SPEC_FULL.md` §4.6). Reverse-of-apply
//! cascade with dependency validation when not forced. `Purge` supersedes
//! `Delete`: it additionally succeeds when the typed resource's metadata is
//! already gone (`spec.md` §9 open question, resolved below) — the reference
//! Runner (`kukeon-runtime`) has no separate remnant-sweep primitive beyond
//! the typed `DeleteX` calls, so the "additional cleanup" `Purge` performs is
//! recorded in `PurgeResult.purged` as a description rather than a literal
//! extra Runner call; a production Runner backed by real containerd/CNI
//! would extend this with actual out-of-band sweeps.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{KukeonError, Result, RunnerError};
use crate::model::{Cell, Kind, Realm, Space, Stack};
use crate::runner::Runner;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeleteResult {
    pub deleted: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PurgeResult {
    pub deleted: Vec<String>,
    pub purged: Vec<String>,
}

fn require_name(name: &str, kind: Kind) -> Result<()> {
    if name.is_empty() {
        Err(KukeonError::NameRequired { kind })
    } else {
        Ok(())
    }
}

fn dependency_error(kind: Kind, name: &str, child_kind: Kind, count: usize) -> KukeonError {
    KukeonError::ResourceHasDependencies {
        kind,
        name: name.to_string(),
        child_kind,
        count,
    }
}

// ---------------------------------------------------------------------
// Realm
// ---------------------------------------------------------------------

pub async fn delete_realm<R>(runner: &R, name: &str, force: bool, cascade: bool) -> Result<DeleteResult>
where
    R: Runner + ?Sized,
{
    require_name(name, Kind::Realm)?;
    let actual = runner
        .get_realm(name)
        .await
        .map_err(|_| KukeonError::NotFound { kind: Kind::Realm, name: name.to_string() })?;
    delete_realm_found(runner, name, &actual, force, cascade).await
}

async fn delete_realm_found<R>(
    runner: &R,
    name: &str,
    actual: &Realm,
    force: bool,
    cascade: bool,
) -> Result<DeleteResult>
where
    R: Runner + ?Sized,
{
    let children = runner.list_spaces(name).await?;
    let mut deleted = Vec::new();

    if cascade {
        for space in &children {
            info!(realm = %name, space = %space.metadata.name, "cascading delete to space");
            let child = delete_space(runner, name, &space.metadata.name, force, true).await?;
            deleted.extend(child.deleted);
        }
    } else if !force && !children.is_empty() {
        return Err(dependency_error(Kind::Realm, name, Kind::Space, children.len()));
    }

    let outcome = runner.delete_realm(actual).await?;
    if outcome.metadata_deleted || outcome.namespace_deleted || outcome.cgroup_deleted {
        deleted.push(format!("Realm:{name}"));
    }
    Ok(DeleteResult { deleted })
}

pub async fn purge_realm<R>(runner: &R, name: &str, force: bool, cascade: bool) -> Result<PurgeResult>
where
    R: Runner + ?Sized,
{
    require_name(name, Kind::Realm)?;
    match runner.get_realm(name).await {
        Ok(actual) => {
            let del = delete_realm_found(runner, name, &actual, force, cascade).await?;
            Ok(PurgeResult {
                deleted: del.deleted,
                purged: vec!["realm namespace and cgroup remnants".to_string()],
            })
        }
        Err(RunnerError::RealmNotFound(_)) => {
            warn!(realm = %name, "purge: realm metadata already absent");
            Ok(PurgeResult::default())
        }
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------
// Space
// ---------------------------------------------------------------------

pub async fn delete_space<R>(
    runner: &R,
    realm_name: &str,
    name: &str,
    force: bool,
    cascade: bool,
) -> Result<DeleteResult>
where
    R: Runner + ?Sized,
{
    require_name(name, Kind::Space)?;
    let actual = runner
        .get_space(realm_name, name)
        .await
        .map_err(|_| KukeonError::NotFound { kind: Kind::Space, name: name.to_string() })?;
    delete_space_found(runner, realm_name, name, &actual, force, cascade).await
}

async fn delete_space_found<R>(
    runner: &R,
    realm_name: &str,
    name: &str,
    actual: &Space,
    force: bool,
    cascade: bool,
) -> Result<DeleteResult>
where
    R: Runner + ?Sized,
{
    let children = runner.list_stacks(realm_name, name).await?;
    let mut deleted = Vec::new();

    if cascade {
        for stack in &children {
            let child = delete_stack(runner, realm_name, name, &stack.metadata.name, force, true).await?;
            deleted.extend(child.deleted);
        }
    } else if !force && !children.is_empty() {
        return Err(dependency_error(Kind::Space, name, Kind::Stack, children.len()));
    }

    let outcome = runner.delete_space(actual).await?;
    if outcome.metadata_deleted || outcome.network_deleted || outcome.cgroup_deleted {
        deleted.push(format!("Space:{name}"));
    }
    Ok(DeleteResult { deleted })
}

pub async fn purge_space<R>(
    runner: &R,
    realm_name: &str,
    name: &str,
    force: bool,
    cascade: bool,
) -> Result<PurgeResult>
where
    R: Runner + ?Sized,
{
    require_name(name, Kind::Space)?;
    match runner.get_space(realm_name, name).await {
        Ok(actual) => {
            let del = delete_space_found(runner, realm_name, name, &actual, force, cascade).await?;
            Ok(PurgeResult {
                deleted: del.deleted,
                purged: vec!["CNI network remnants".to_string()],
            })
        }
        Err(RunnerError::SpaceNotFound(_)) => Ok(PurgeResult::default()),
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------
// Stack
// ---------------------------------------------------------------------

pub async fn delete_stack<R>(
    runner: &R,
    realm_name: &str,
    space_name: &str,
    name: &str,
    force: bool,
    cascade: bool,
) -> Result<DeleteResult>
where
    R: Runner + ?Sized,
{
    require_name(name, Kind::Stack)?;
    let actual = runner
        .get_stack(realm_name, space_name, name)
        .await
        .map_err(|_| KukeonError::NotFound { kind: Kind::Stack, name: name.to_string() })?;
    delete_stack_found(runner, realm_name, space_name, name, &actual, force, cascade).await
}

async fn delete_stack_found<R>(
    runner: &R,
    realm_name: &str,
    space_name: &str,
    name: &str,
    actual: &Stack,
    force: bool,
    cascade: bool,
) -> Result<DeleteResult>
where
    R: Runner + ?Sized,
{
    let children = runner.list_cells(realm_name, space_name, name).await?;
    let mut deleted = Vec::new();

    if cascade {
        for cell in &children {
            let child =
                delete_cell(runner, realm_name, space_name, name, &cell.metadata.name, force, true).await?;
            deleted.extend(child.deleted);
        }
    } else if !force && !children.is_empty() {
        return Err(dependency_error(Kind::Stack, name, Kind::Cell, children.len()));
    }

    let outcome = runner.delete_stack(actual).await?;
    if outcome.metadata_deleted || outcome.cgroup_deleted {
        deleted.push(format!("Stack:{name}"));
    }
    Ok(DeleteResult { deleted })
}

pub async fn purge_stack<R>(
    runner: &R,
    realm_name: &str,
    space_name: &str,
    name: &str,
    force: bool,
    cascade: bool,
) -> Result<PurgeResult>
where
    R: Runner + ?Sized,
{
    require_name(name, Kind::Stack)?;
    match runner.get_stack(realm_name, space_name, name).await {
        Ok(actual) => {
            let del = delete_stack_found(runner, realm_name, space_name, name, &actual, force, cascade).await?;
            Ok(PurgeResult {
                deleted: del.deleted,
                purged: vec!["stack cgroup remnants".to_string()],
            })
        }
        Err(RunnerError::StackNotFound(_)) => Ok(PurgeResult::default()),
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------
// Cell (children are its own embedded container specs, not a separate
// Runner-listed collection — destroying the cell destroys them with it)
// ---------------------------------------------------------------------

pub async fn delete_cell<R>(
    runner: &R,
    realm_name: &str,
    space_name: &str,
    stack_name: &str,
    name: &str,
    force: bool,
    cascade: bool,
) -> Result<DeleteResult>
where
    R: Runner + ?Sized,
{
    require_name(name, Kind::Cell)?;
    let actual = runner
        .get_cell(realm_name, space_name, stack_name, name)
        .await
        .map_err(|_| KukeonError::NotFound { kind: Kind::Cell, name: name.to_string() })?;
    delete_cell_found(runner, name, &actual, force, cascade).await
}

async fn delete_cell_found<R>(
    runner: &R,
    name: &str,
    actual: &Cell,
    force: bool,
    cascade: bool,
) -> Result<DeleteResult>
where
    R: Runner + ?Sized,
{
    let children: Vec<_> = actual.spec.child_containers().collect();
    let mut deleted = Vec::new();

    if cascade {
        for child in &children {
            deleted.push(format!("Container:{}", child.id));
        }
    } else if !force && !children.is_empty() {
        return Err(dependency_error(Kind::Cell, name, Kind::Container, children.len()));
    }

    let outcome = runner.delete_cell(actual).await?;
    if outcome.metadata_deleted || outcome.cgroup_deleted {
        deleted.push(format!("Cell:{name}"));
    }
    Ok(DeleteResult { deleted })
}

pub async fn purge_cell<R>(
    runner: &R,
    realm_name: &str,
    space_name: &str,
    stack_name: &str,
    name: &str,
    force: bool,
    cascade: bool,
) -> Result<PurgeResult>
where
    R: Runner + ?Sized,
{
    require_name(name, Kind::Cell)?;
    match runner.get_cell(realm_name, space_name, stack_name, name).await {
        Ok(actual) => {
            let del = delete_cell_found(runner, name, &actual, force, cascade).await?;
            Ok(PurgeResult {
                deleted: del.deleted,
                purged: vec!["cell cgroup remnants".to_string()],
            })
        }
        Err(RunnerError::CellNotFound(_)) => Ok(PurgeResult::default()),
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------
// Container (a field inside its cell's container set, not independently
// stored — "deletion" is removing it from the cell's spec and converging
// via `update_cell`, mirroring how `reconcile_container` mutates it)
// ---------------------------------------------------------------------

pub async fn delete_container<R>(
    runner: &R,
    realm_name: &str,
    space_name: &str,
    stack_name: &str,
    cell_name: &str,
    id: &str,
    force: bool,
) -> Result<DeleteResult>
where
    R: Runner + ?Sized,
{
    require_name(id, Kind::Container)?;
    let cell = runner
        .get_cell(realm_name, space_name, stack_name, cell_name)
        .await
        .map_err(|_| KukeonError::NotFound { kind: Kind::Cell, name: cell_name.to_string() })?;

    if !cell.spec.containers.iter().any(|c| c.id == id) {
        return Err(KukeonError::NotFound { kind: Kind::Container, name: id.to_string() });
    }
    let _ = force; // containers have no children of their own to guard against

    let mut desired = cell.clone();
    desired.spec.containers.retain(|c| c.id != id);
    runner.update_cell(&desired).await?;
    Ok(DeleteResult { deleted: vec![format!("Container:{id}")] })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, CellSpec, ContainerSpec, Metadata, Realm, Space, SpaceSpec, Stack, StackSpec};
    use crate::testutil::FakeRunner;

    fn root() -> ContainerSpec {
        ContainerSpec { root: true, image: "pause:3.9".into(), ..Default::default() }
    }

    async fn seeded_cell(runner: &FakeRunner, containers: Vec<ContainerSpec>) {
        runner
            .create_realm(&Realm { metadata: Metadata::new("prod"), spec: Default::default(), status: Default::default() })
            .await
            .unwrap();
        runner
            .create_space(&Space {
                metadata: Metadata::new("web"),
                spec: SpaceSpec { realm_name: "prod".into(), cni_config_path: String::new() },
                status: Default::default(),
            })
            .await
            .unwrap();
        runner
            .create_stack(&Stack {
                metadata: Metadata::new("api"),
                spec: StackSpec { realm_name: "prod".into(), space_name: "web".into(), id: String::new() },
                status: Default::default(),
            })
            .await
            .unwrap();
        runner
            .create_cell(&Cell {
                metadata: Metadata::new("worker"),
                spec: CellSpec {
                    realm_name: "prod".into(),
                    space_name: "web".into(),
                    stack_name: "api".into(),
                    containers,
                },
                status: Default::default(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delete_realm_requires_name() {
        let runner = FakeRunner::new();
        let err = delete_realm(&runner, "", false, false).await.unwrap_err();
        assert!(matches!(err, KukeonError::NameRequired { kind: Kind::Realm }));
    }

    #[tokio::test]
    async fn delete_realm_missing_is_not_found() {
        let runner = FakeRunner::new();
        let err = delete_realm(&runner, "prod", false, false).await.unwrap_err();
        assert!(matches!(err, KukeonError::NotFound { kind: Kind::Realm, .. }));
    }

    #[tokio::test]
    async fn delete_realm_with_children_and_no_force_fails() {
        let runner = FakeRunner::new();
        seeded_cell(&runner, vec![root()]).await;
        let err = delete_realm(&runner, "prod", false, false).await.unwrap_err();
        assert!(matches!(err, KukeonError::ResourceHasDependencies { kind: Kind::Realm, .. }));
    }

    #[tokio::test]
    async fn delete_realm_cascade_removes_whole_hierarchy() {
        let runner = FakeRunner::new();
        seeded_cell(&runner, vec![root()]).await;
        let result = delete_realm(&runner, "prod", false, true).await.unwrap();
        assert!(result.deleted.iter().any(|d| d == "Realm:prod"));
        assert!(runner.get_realm("prod").await.is_err());
        assert!(runner.get_space("prod", "web").await.is_err());
        assert!(runner.get_stack("prod", "web", "api").await.is_err());
        assert!(runner.get_cell("prod", "web", "api", "worker").await.is_err());
    }

    #[tokio::test]
    async fn delete_realm_force_without_cascade_skips_guard() {
        let runner = FakeRunner::new();
        seeded_cell(&runner, vec![root()]).await;
        let result = delete_realm(&runner, "prod", true, false).await.unwrap();
        assert!(result.deleted.iter().any(|d| d == "Realm:prod"));
        // force bypasses the dependency guard, but children are untouched
        assert!(runner.get_space("prod", "web").await.is_ok());
    }

    #[tokio::test]
    async fn purge_realm_on_absent_metadata_succeeds_with_empty_result() {
        let runner = FakeRunner::new();
        let result = purge_realm(&runner, "prod", false, false).await.unwrap();
        assert!(result.deleted.is_empty());
        assert!(result.purged.is_empty());
    }

    #[tokio::test]
    async fn purge_realm_with_cascade_reports_purged_description() {
        let runner = FakeRunner::new();
        seeded_cell(&runner, vec![root()]).await;
        let result = purge_realm(&runner, "prod", false, true).await.unwrap();
        assert!(!result.purged.is_empty());
        assert!(runner.get_realm("prod").await.is_err());
    }

    #[tokio::test]
    async fn delete_cell_without_cascade_guards_on_containers() {
        let runner = FakeRunner::new();
        let child = ContainerSpec { id: "app".into(), image: "app:1".into(), ..Default::default() };
        seeded_cell(&runner, vec![root(), child]).await;
        let err = delete_cell(&runner, "prod", "web", "api", "worker", false, false)
            .await
            .unwrap_err();
        assert!(matches!(err, KukeonError::ResourceHasDependencies { kind: Kind::Cell, .. }));
    }

    #[tokio::test]
    async fn delete_container_removes_from_cell_spec() {
        let runner = FakeRunner::new();
        let child = ContainerSpec { id: "app".into(), image: "app:1".into(), ..Default::default() };
        seeded_cell(&runner, vec![root(), child]).await;

        let result = delete_container(&runner, "prod", "web", "api", "worker", "app", false)
            .await
            .unwrap();
        assert_eq!(result.deleted, vec!["Container:app".to_string()]);

        let cell = runner.get_cell("prod", "web", "api", "worker").await.unwrap();
        assert!(!cell.spec.containers.iter().any(|c| c.id == "app"));
    }

    #[tokio::test]
    async fn delete_container_unknown_id_is_not_found() {
        let runner = FakeRunner::new();
        seeded_cell(&runner, vec![root()]).await;
        let err = delete_container(&runner, "prod", "web", "api", "worker", "missing", false)
            .await
            .unwrap_err();
        assert!(matches!(err, KukeonError::NotFound { kind: Kind::Container, .. }));
    }
}
