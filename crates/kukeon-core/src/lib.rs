//! Reconciliation engine for the Kukeon container orchestrator
//! (`SPEC_FULL.md`). This crate knows the resource model, the diffing rules,
//! and the apply/delete/purge/refresh orchestrators; it knows nothing about
//! containerd, CNI, or cgroups directly — all of that lives behind the
//! [`Runner`] trait, implemented by `kukeon-runtime`.

pub mod apply;
pub mod delete;
pub mod differ;
pub mod document;
pub mod error;
pub mod model;
pub mod order;
pub mod reconcile;
pub mod refresh;
pub mod runner;
pub mod testutil;

pub use apply::{apply, ApplyResult, ResourceAction, ResourceResult};
pub use delete::{
    delete_cell, delete_container, delete_realm, delete_space, delete_stack, purge_cell, purge_realm,
    purge_space, purge_stack, DeleteResult, PurgeResult,
};
pub use differ::{ChangeType, ContainerAction, DiffResult};
pub use document::{Document, RawDocument};
pub use error::{KukeonError, Result, RunnerError};
pub use model::{
    Cell, CellSpec, CellState, CellStatus, Container, ContainerEntitySpec, ContainerSpec, ContainerState,
    ContainerStatus, EnvVar, Kind, Metadata, PortMapping, Realm, RealmSpec, RealmState, RealmStatus,
    RegistryCredentials, RestartPolicy, Space, SpaceSpec, SpaceState, SpaceStatus, Stack, StackSpec, StackState,
    StackStatus, VolumeMount,
};
pub use order::sort_documents;
pub use reconcile::{
    reconcile_cell, reconcile_container, reconcile_realm, reconcile_space, reconcile_stack, ReconcileAction,
    ReconcileResult, ReconciledResource,
};
pub use refresh::{refresh, refresh_succeeded, KindCount, RefreshResult};
pub use runner::{CellRunner, DeleteOutcome, RResult, RealmRunner, Runner, SpaceRunner, StackRunner};
