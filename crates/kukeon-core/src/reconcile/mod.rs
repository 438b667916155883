//! Per-kind reconcilers (`SPEC_FULL.md` §4.4): the unified five-step
//! algorithm — ensure ancestors, fetch actual, diff, handle breaking
//! changes, apply the compatible delta — specialized per kind.

mod cell;
mod container;
mod realm;
mod space;
mod stack;

pub use cell::reconcile_cell;
pub use container::reconcile_container;
pub use realm::reconcile_realm;
pub use space::reconcile_space;
pub use stack::reconcile_stack;

use crate::error::{RunnerError, Result};
use crate::model::{Cell, Container, Kind, Metadata, Realm, RealmSpec, Space, SpaceSpec, Stack, StackSpec};
use crate::runner::{RealmRunner, SpaceRunner, StackRunner};

/// Ancestor auto-provisioning (`spec.md` §3 invariant 1 / §4.4 step 1): on
/// `apply`, a missing ancestor is synthesized with just its name and
/// upstream refs copied from the child being reconciled, then created
/// directly — this is a minimal stand-in, not a full `ReconcileX` pass, so
/// it never diffs or updates an ancestor that already exists.
pub(super) async fn ensure_realm<R: RealmRunner + ?Sized>(runner: &R, realm_name: &str) -> Result<()> {
    match runner.get_realm(realm_name).await {
        Ok(_) => Ok(()),
        Err(RunnerError::RealmNotFound(_)) => {
            runner
                .create_realm(&Realm {
                    metadata: Metadata::new(realm_name),
                    spec: RealmSpec::default(),
                    status: Default::default(),
                })
                .await?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub(super) async fn ensure_space<R: SpaceRunner + ?Sized>(
    runner: &R,
    realm_name: &str,
    space_name: &str,
) -> Result<()> {
    match runner.get_space(realm_name, space_name).await {
        Ok(_) => Ok(()),
        Err(RunnerError::SpaceNotFound(_)) => {
            runner
                .create_space(&Space {
                    metadata: Metadata::new(space_name),
                    spec: SpaceSpec {
                        realm_name: realm_name.to_string(),
                        cni_config_path: String::new(),
                    },
                    status: Default::default(),
                })
                .await?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub(super) async fn ensure_stack<R: StackRunner + ?Sized>(
    runner: &R,
    realm_name: &str,
    space_name: &str,
    stack_name: &str,
) -> Result<()> {
    match runner.get_stack(realm_name, space_name, stack_name).await {
        Ok(_) => Ok(()),
        Err(RunnerError::StackNotFound(_)) => {
            runner
                .create_stack(&Stack {
                    metadata: Metadata::new(stack_name),
                    spec: StackSpec {
                        realm_name: realm_name.to_string(),
                        space_name: space_name.to_string(),
                        id: String::new(),
                    },
                    status: Default::default(),
                })
                .await?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileAction {
    Created,
    Updated,
    Unchanged,
}

impl ReconcileAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileAction::Created => "created",
            ReconcileAction::Updated => "updated",
            ReconcileAction::Unchanged => "unchanged",
        }
    }
}

/// The entity a `ReconcileResult` carries, replacing the `interface{}`
/// payload the engine this is modeled on used (`SPEC_FULL.md` §9).
#[derive(Clone, Debug, PartialEq)]
pub enum ReconciledResource {
    Realm(Realm),
    Space(Space),
    Stack(Stack),
    Cell(Cell),
    Container(Container),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReconcileResult {
    pub action: ReconcileAction,
    pub kind: Kind,
    pub name: String,
    pub resource: ReconciledResource,
    pub changes: Vec<String>,
    pub details: Vec<(String, String)>,
}

impl ReconcileResult {
    fn unchanged(kind: Kind, name: String, resource: ReconciledResource) -> Self {
        ReconcileResult {
            action: ReconcileAction::Unchanged,
            kind,
            name,
            resource,
            changes: Vec::new(),
            details: Vec::new(),
        }
    }

    fn created(kind: Kind, name: String, resource: ReconciledResource) -> Self {
        ReconcileResult {
            action: ReconcileAction::Created,
            kind,
            name,
            resource,
            changes: Vec::new(),
            details: Vec::new(),
        }
    }

    fn updated(
        kind: Kind,
        name: String,
        resource: ReconciledResource,
        changes: Vec<String>,
        details: Vec<(String, String)>,
    ) -> Self {
        ReconcileResult {
            action: ReconcileAction::Updated,
            kind,
            name,
            resource,
            changes,
            details,
        }
    }
}
