//! The five entity kinds that make up the realm → space → stack → cell →
//! container hierarchy, plus the value types their specs are built from.
//!
//! Every entity is `Metadata` + `Spec` + `Status`, value-typed, and cheap to
//! clone: reconcilers work on owned copies so the differ (`crate::differ`)
//! can stay pure.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name + labels shared by every kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Metadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
        }
    }
}

/// Credentials for a container registry. Compared as an order-independent
/// set (see `SPEC_FULL.md` §3): two realms with the same credentials listed
/// in a different order are not a breaking or even compatible change, they
/// are equal.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
    pub server_address: String,
}

// ---------------------------------------------------------------------
// Realm
// ---------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum RealmState {
    #[default]
    Pending,
    Creating,
    Ready,
    Deleting,
    Failed,
    Unknown,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmSpec {
    /// containerd namespace name. Empty means "derive from metadata.name".
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub registry_credentials: Vec<RegistryCredentials>,
}

impl RealmSpec {
    /// The effective containerd namespace: `namespace` if set, else the
    /// realm's own name.
    pub fn effective_namespace<'a>(&'a self, realm_name: &'a str) -> &'a str {
        if self.namespace.is_empty() {
            realm_name
        } else {
            &self.namespace
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmStatus {
    #[serde(default)]
    pub state: RealmState,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub cgroup_path: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub last_transition: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Realm {
    pub metadata: Metadata,
    pub spec: RealmSpec,
    #[serde(default)]
    pub status: RealmStatus,
}

// ---------------------------------------------------------------------
// Space
// ---------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SpaceState {
    #[default]
    Pending,
    Creating,
    Ready,
    Deleting,
    Failed,
    Unknown,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceSpec {
    pub realm_name: String,
    #[serde(default)]
    pub cni_config_path: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceStatus {
    #[serde(default)]
    pub state: SpaceState,
    /// Canonical CNI network name, `{realm}-{space}` once created.
    #[serde(default)]
    pub network_name: Option<String>,
    #[serde(default)]
    pub cgroup_path: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub last_transition: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub metadata: Metadata,
    pub spec: SpaceSpec,
    #[serde(default)]
    pub status: SpaceStatus,
}

impl Space {
    /// Canonical CNI network name, independent of whether it has been
    /// observed yet.
    pub fn canonical_network_name(realm_name: &str, space_name: &str) -> String {
        format!("{realm_name}-{space_name}")
    }
}

// ---------------------------------------------------------------------
// Stack
// ---------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum StackState {
    #[default]
    Pending,
    Creating,
    Ready,
    Deleting,
    Failed,
    Unknown,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackSpec {
    pub realm_name: String,
    pub space_name: String,
    #[serde(default)]
    pub id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackStatus {
    #[serde(default)]
    pub state: StackState,
    #[serde(default)]
    pub cgroup_path: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub last_transition: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub metadata: Metadata,
    pub spec: StackSpec,
    #[serde(default)]
    pub status: StackStatus,
}

// ---------------------------------------------------------------------
// Container (shared template + standalone entity)
// ---------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestartPolicy {
    #[default]
    Never,
    OnFailure,
    Always,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub container_port: u16,
    #[serde(default)]
    pub host_port: Option<u16>,
    #[serde(default)]
    pub protocol: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub host_path: String,
    pub container_path: String,
    #[serde(default)]
    pub read_only: bool,
}

/// The fields of a single container, shared between the entry embedded in a
/// cell's `Spec.Containers` slice and the standalone `Container` entity's
/// spec. Kept as one struct so the differ's container-level comparison
/// (§4.3) only has to be written once and is reused by both the cell
/// container-set diff and the standalone container reconciler.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSpec {
    /// Non-empty for every non-root container; keyed on for diff purposes.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub root: bool,
    pub image: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub ports: Vec<PortMapping>,
    #[serde(default)]
    pub volumes: Vec<VolumeMount>,
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
    #[serde(default)]
    pub cni_config_path: String,
}

impl ContainerSpec {
    /// `id` for non-root containers, a synthetic stable key for the root
    /// (there is at most one per cell so the constant key is unambiguous).
    pub fn diff_key(&self) -> &str {
        if self.root {
            "__root__"
        } else {
            &self.id
        }
    }
}

// ---------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum CellState {
    #[default]
    Pending,
    Creating,
    Starting,
    Ready,
    Deleting,
    Failed,
    Unknown,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellSpec {
    pub realm_name: String,
    pub space_name: String,
    pub stack_name: String,
    pub containers: Vec<ContainerSpec>,
}

impl CellSpec {
    pub fn root_container(&self) -> Option<&ContainerSpec> {
        self.containers.iter().find(|c| c.root)
    }

    pub fn child_containers(&self) -> impl Iterator<Item = &ContainerSpec> {
        self.containers.iter().filter(|c| !c.root)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellStatus {
    #[serde(default)]
    pub state: CellState,
    #[serde(default)]
    pub cgroup_path: Option<String>,
    #[serde(default)]
    pub root_container_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub last_transition: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub metadata: Metadata,
    pub spec: CellSpec,
    #[serde(default)]
    pub status: CellStatus,
}

// ---------------------------------------------------------------------
// Container (standalone entity)
// ---------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ContainerState {
    #[default]
    Pending,
    Creating,
    Running,
    Restarting,
    Stopped,
    Deleting,
    Failed,
    Unknown,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerEntitySpec {
    pub realm_name: String,
    pub space_name: String,
    pub stack_name: String,
    pub cell_name: String,
    #[serde(flatten)]
    pub container: ContainerSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    #[serde(default)]
    pub state: ContainerState,
    #[serde(default)]
    pub restart_count: u32,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub last_transition: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub metadata: Metadata,
    pub spec: ContainerEntitySpec,
    #[serde(default)]
    pub status: ContainerStatus,
}

/// The five kinds, used anywhere code needs to talk about "a kind" without
/// an instance (ordering, error messages, CLI dispatch).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Kind {
    Realm,
    Space,
    Stack,
    Cell,
    Container,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Realm => "Realm",
            Kind::Space => "Space",
            Kind::Stack => "Stack",
            Kind::Cell => "Cell",
            Kind::Container => "Container",
        }
    }

    /// 1..5, Realm..Container. The sole place the kind hierarchy is encoded
    /// numerically (`spec.md` §4.8).
    pub fn rank(&self) -> u8 {
        match self {
            Kind::Realm => 1,
            Kind::Space => 2,
            Kind::Stack => 3,
            Kind::Cell => 4,
            Kind::Container => 5,
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
