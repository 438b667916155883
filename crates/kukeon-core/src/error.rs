//! Error taxonomy for the reconciliation engine (`SPEC_FULL.md` §4.9 / §7).
//!
//! `RunnerError` is the narrow set of sentinels a `Runner` implementation
//! raises; `KukeonError` is the wider set the orchestrators (C5/C6/C7) and
//! document ingestion (C10) raise, wrapping `RunnerError` with `#[from]` so
//! reconciler code can keep using `?`.

use crate::model::Kind;

/// Errors a `Runner` implementation is expected to raise. The reconciler
/// matches on these by name (not by string) to decide whether to recover
/// (`NotFound` during apply triggers create) or propagate.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("realm {0:?} not found")]
    RealmNotFound(String),
    #[error("space {0:?} not found")]
    SpaceNotFound(String),
    #[error("stack {0:?} not found")]
    StackNotFound(String),
    #[error("cell {0:?} not found")]
    CellNotFound(String),
    #[error("container {0:?} not found")]
    ContainerNotFound(String),

    #[error("failed to create {kind} {name:?}: {reason}")]
    CreateFailed {
        kind: Kind,
        name: String,
        reason: String,
    },
    #[error("failed to update metadata for {kind} {name:?}: {reason}")]
    UpdateMetadataFailed {
        kind: Kind,
        name: String,
        reason: String,
    },
    #[error("failed to delete {kind} {name:?}: {reason}")]
    DeleteFailed {
        kind: Kind,
        name: String,
        reason: String,
    },
    #[error("failed to create pause container for cell {0:?}: {1}")]
    CreatePauseContainerFailed(String, String),
    #[error("failed to create network for space {0:?}: {1}")]
    CreateNetworkFailed(String, String),
    #[error("network for space {0:?} already exists")]
    NetworkAlreadyExists(String),
    #[error("failed to connect to containerd: {0}")]
    ConnectContainerdFailed(String),

    /// A Runner MUST refuse an `UpdateX` call that touches a breaking field
    /// (defense in depth, `SPEC_FULL.md` §4.2). Reconcilers never trigger
    /// this in practice since they check breaking-ness themselves first.
    #[error("refusing to apply breaking field {field:?} via update on {kind} {name:?}")]
    BreakingFieldRejected {
        kind: Kind,
        name: String,
        field: String,
    },
}

/// Errors the reconciliation engine itself raises (input validation,
/// conversion, cascade constraints) plus every `RunnerError` it can surface
/// unchanged.
#[derive(Debug, thiserror::Error)]
pub enum KukeonError {
    #[error("{kind} name is required")]
    NameRequired { kind: Kind },
    #[error("space document is required")]
    SpaceDocRequired,
    #[error("unsupported apiVersion {0:?}")]
    UnsupportedApiVersion(String),
    #[error("unknown kind {0:?}")]
    UnknownKind(String),

    #[error("failed to convert external document into internal model: {0}")]
    ConversionFailed(String),
    #[error("failed to apply defaults: {0}")]
    DefaultingFailed(String),

    #[error(
        "{kind} {name:?} has breaking changes: {changes:?}. Delete the {kind} and recreate it."
    )]
    BreakingChange {
        kind: Kind,
        name: String,
        changes: Vec<String>,
    },

    #[error("{kind} {name:?} not found")]
    NotFound { kind: Kind, name: String },

    #[error(
        "{kind} {name:?} has {count} dependent {child_kind}(s); pass --cascade or --force"
    )]
    ResourceHasDependencies {
        kind: Kind,
        name: String,
        child_kind: Kind,
        count: usize,
    },

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, KukeonError>;
