//! The `Runner` capability set (`SPEC_FULL.md` §4.2) — the only thing the
//! reconciliation engine depends on. A real implementation owns containerd
//! namespaces, cgroups, on-disk metadata, CNI networks, and root + workload
//! containers; `kukeon-runtime` is the reference implementation this
//! workspace ships for tests and local use.
//!
//! Every method is `async` so a real implementation can do real I/O; the
//! engine itself makes no assumption about latency or concurrency beyond
//! what `SPEC_FULL.md` §5 describes (synchronous-looking, no internal
//! timeout, no rollback).

use async_trait::async_trait;

use crate::error::RunnerError;
use crate::model::{Cell, ContainerSpec, Realm, Space, Stack};

/// What actually changed as a result of a delete call. The reconciler never
/// treats "nothing to delete" as an error — deleting already-missing
/// metadata is idempotent (`SPEC_FULL.md` §4.2).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub metadata_deleted: bool,
    pub cgroup_deleted: bool,
    /// Realm only: the containerd namespace was removed.
    pub namespace_deleted: bool,
    /// Space only: the CNI network was removed.
    pub network_deleted: bool,
}

pub type RResult<T> = std::result::Result<T, RunnerError>;

#[async_trait]
pub trait RealmRunner: Send + Sync {
    async fn get_realm(&self, name: &str) -> RResult<Realm>;
    async fn create_realm(&self, desired: &Realm) -> RResult<Realm>;
    async fn update_realm(&self, desired: &Realm) -> RResult<Realm>;
    async fn delete_realm(&self, actual: &Realm) -> RResult<DeleteOutcome>;
    async fn list_realms(&self) -> RResult<Vec<Realm>>;
    /// Re-derives `.status` from live namespace/cgroup bookkeeping and
    /// persists it if it changed, leaving `.spec` untouched. The refresh
    /// sweep's one write path (`SPEC_FULL.md` §4.7); unlike `update_realm`,
    /// it is allowed to change `.status`.
    async fn refresh_realm_status(&self, actual: &Realm) -> RResult<Realm>;
}

#[async_trait]
pub trait SpaceRunner: Send + Sync {
    async fn get_space(&self, realm_name: &str, name: &str) -> RResult<Space>;
    async fn create_space(&self, desired: &Space) -> RResult<Space>;
    async fn update_space(&self, desired: &Space) -> RResult<Space>;
    async fn delete_space(&self, actual: &Space) -> RResult<DeleteOutcome>;
    async fn list_spaces(&self, realm_name: &str) -> RResult<Vec<Space>>;
    /// See `RealmRunner::refresh_realm_status`.
    async fn refresh_space_status(&self, actual: &Space) -> RResult<Space>;
}

#[async_trait]
pub trait StackRunner: Send + Sync {
    async fn get_stack(&self, realm_name: &str, space_name: &str, name: &str) -> RResult<Stack>;
    async fn create_stack(&self, desired: &Stack) -> RResult<Stack>;
    async fn update_stack(&self, desired: &Stack) -> RResult<Stack>;
    async fn delete_stack(&self, actual: &Stack) -> RResult<DeleteOutcome>;
    async fn list_stacks(&self, realm_name: &str, space_name: &str) -> RResult<Vec<Stack>>;
    /// See `RealmRunner::refresh_realm_status`.
    async fn refresh_stack_status(&self, actual: &Stack) -> RResult<Stack>;
}

#[async_trait]
pub trait CellRunner: Send + Sync {
    async fn get_cell(
        &self,
        realm_name: &str,
        space_name: &str,
        stack_name: &str,
        name: &str,
    ) -> RResult<Cell>;
    async fn create_cell(&self, desired: &Cell) -> RResult<Cell>;
    /// Applies compatible changes, including converging the child container
    /// set via the add/update/remove lists the differ already computed.
    /// Must be all-or-nothing at the cell level (`SPEC_FULL.md` §5).
    async fn update_cell(&self, desired: &Cell) -> RResult<Cell>;
    async fn delete_cell(&self, actual: &Cell) -> RResult<DeleteOutcome>;
    async fn list_cells(&self, realm_name: &str, space_name: &str, stack_name: &str) -> RResult<Vec<Cell>>;

    /// Tears down and rebuilds the cell (and its root container) in place,
    /// used when the root container's image/command/args changed.
    async fn recreate_cell(&self, desired: &Cell) -> RResult<Cell>;
    /// Starts the root ("pause") container, bringing up the cell's network
    /// namespace. Called once right after `create_cell`.
    async fn start_cell(&self, cell: &Cell) -> RResult<()>;
    /// Persists `.metadata` (labels) for an already-created cell.
    async fn update_cell_metadata(&self, cell: &Cell) -> RResult<Cell>;

    async fn create_container(&self, parent_cell: &Cell, spec: &ContainerSpec) -> RResult<Cell>;
    async fn update_container(&self, parent_cell: &Cell, spec: &ContainerSpec) -> RResult<Cell>;

    /// See `RealmRunner::refresh_realm_status`.
    async fn refresh_cell_status(&self, actual: &Cell) -> RResult<Cell>;
}

/// The full capability set a reconciler needs, implemented by a single
/// concrete Runner (e.g. `kukeon_runtime::LocalRunner`).
pub trait Runner: RealmRunner + SpaceRunner + StackRunner + CellRunner + Send + Sync {}

impl<T> Runner for T where T: RealmRunner + SpaceRunner + StackRunner + CellRunner + Send + Sync {}
