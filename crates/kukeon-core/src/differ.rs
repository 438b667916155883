//! Pure diff functions, one per kind (`SPEC_FULL.md` §4.3). No Runner calls,
//! no I/O — these only ever compare two in-memory values, which is what
//! makes the idempotence and reflexivity properties in `SPEC_FULL.md` §8
//! testable without a fake backend.

use std::collections::BTreeSet;

use crate::model::{Cell, ContainerSpec, Container, Realm, Space, Stack};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangeType {
    None,
    Additive,
    Compatible,
    Breaking,
}

impl ChangeType {
    /// Breaking dominates Compatible dominates Additive dominates None.
    fn combine(self, other: ChangeType) -> ChangeType {
        self.max(other)
    }
}

/// A single container add/update/remove action discovered while diffing a
/// cell's container set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainerAction {
    Add(ContainerSpec),
    Update(ContainerSpec),
    Remove(ContainerSpec),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiffResult {
    pub has_changes: bool,
    pub change_type: ChangeTypeStorage,
    pub changed_fields: Vec<String>,
    pub breaking_changes: Vec<String>,
    pub details: Vec<(String, String)>,
    /// Set only for `Cell`: whether the root container's image/command/args
    /// changed, was added, or removed — triggers `RecreateCell` in C4.
    pub root_container_changed: bool,
    /// Set only for `Cell`: the per-container actions to converge via
    /// `UpdateCell`.
    pub container_actions: Vec<ContainerAction>,
}

/// `ChangeType` doesn't implement `Default`; this newtype lets `DiffResult`
/// derive it while keeping `ChangeType::None` as the default value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChangeTypeStorage(pub ChangeType);

impl Default for ChangeTypeStorage {
    fn default() -> Self {
        ChangeTypeStorage(ChangeType::None)
    }
}

impl DiffResult {
    fn none() -> Self {
        DiffResult::default()
    }

    fn breaking(field: impl Into<String>, detail: impl Into<String>) -> Self {
        let field = field.into();
        DiffResult {
            has_changes: true,
            change_type: ChangeTypeStorage(ChangeType::Breaking),
            changed_fields: vec![field.clone()],
            breaking_changes: vec![field.clone()],
            details: vec![(field, detail.into())],
            root_container_changed: false,
            container_actions: Vec::new(),
        }
    }

    fn add_compatible(&mut self, field: impl Into<String>, detail: impl Into<String>) {
        let field = field.into();
        self.has_changes = true;
        self.change_type = ChangeTypeStorage(self.change_type.0.combine(ChangeType::Compatible));
        self.changed_fields.push(field.clone());
        self.details.push((field, detail.into()));
    }

    pub fn change_type(&self) -> ChangeType {
        self.change_type.0
    }
}

fn labels_differ(a: &std::collections::BTreeMap<String, String>, b: &std::collections::BTreeMap<String, String>) -> bool {
    a != b
}

// ---------------------------------------------------------------------
// Realm
// ---------------------------------------------------------------------

pub fn diff_realm(desired: &Realm, actual: &Realm) -> DiffResult {
    if desired.metadata.name != actual.metadata.name {
        return DiffResult::breaking("metadata.name", "realm name changed");
    }
    let desired_ns = desired.spec.effective_namespace(&desired.metadata.name);
    let actual_ns = actual.spec.effective_namespace(&actual.metadata.name);
    if !desired.spec.namespace.is_empty() && desired_ns != actual_ns {
        return DiffResult::breaking("spec.namespace", "containerd namespace changed");
    }

    let mut result = DiffResult::none();
    if labels_differ(&desired.metadata.labels, &actual.metadata.labels) {
        result.add_compatible("metadata.labels", "labels differ");
    }
    let desired_creds: BTreeSet<_> = desired.spec.registry_credentials.iter().cloned().collect();
    let actual_creds: BTreeSet<_> = actual.spec.registry_credentials.iter().cloned().collect();
    if desired_creds != actual_creds {
        result.add_compatible("spec.registryCredentials", "registry credential set differs");
    }
    result
}

// ---------------------------------------------------------------------
// Space
// ---------------------------------------------------------------------

pub fn diff_space(desired: &Space, actual: &Space) -> DiffResult {
    if desired.metadata.name != actual.metadata.name {
        return DiffResult::breaking("metadata.name", "space name changed");
    }
    if desired.spec.realm_name != actual.spec.realm_name {
        return DiffResult::breaking("spec.realmName", "parent realm changed");
    }
    if !desired.spec.cni_config_path.is_empty()
        && desired.spec.cni_config_path != actual.spec.cni_config_path
    {
        return DiffResult::breaking("spec.cniConfigPath", "CNI config path changed");
    }

    let mut result = DiffResult::none();
    if labels_differ(&desired.metadata.labels, &actual.metadata.labels) {
        result.add_compatible("metadata.labels", "labels differ");
    }
    result
}

// ---------------------------------------------------------------------
// Stack
// ---------------------------------------------------------------------

pub fn diff_stack(desired: &Stack, actual: &Stack) -> DiffResult {
    if desired.metadata.name != actual.metadata.name {
        return DiffResult::breaking("metadata.name", "stack name changed");
    }
    if desired.spec.realm_name != actual.spec.realm_name {
        return DiffResult::breaking("spec.realmName", "parent realm changed");
    }
    if desired.spec.space_name != actual.spec.space_name {
        return DiffResult::breaking("spec.spaceName", "parent space changed");
    }

    let mut result = DiffResult::none();
    if labels_differ(&desired.metadata.labels, &actual.metadata.labels) {
        result.add_compatible("metadata.labels", "labels differ");
    }
    if desired.spec.id != actual.spec.id {
        result.add_compatible("spec.id", "stack id differs");
    }
    result
}

// ---------------------------------------------------------------------
// Container (used both standalone and inside a cell's container set)
// ---------------------------------------------------------------------

/// Diffs the non-identity fields of two containers that are already known
/// to share the same diff key. Ancestor/name checks are the caller's job
/// (standalone `diff_container`, or the cell-level set diff below).
fn diff_container_fields(desired: &ContainerSpec, actual: &ContainerSpec) -> DiffResult {
    let mut result = DiffResult::none();
    if desired.image != actual.image || desired.command != actual.command || desired.args != actual.args
    {
        result.has_changes = true;
        result.change_type = ChangeTypeStorage(ChangeType::Breaking);
        for (field, d, a) in [
            ("image", &desired.image, &actual.image),
            // command/args compared as whole vectors below
        ] {
            if d != a {
                result.changed_fields.push(field.to_string());
                result.breaking_changes.push(field.to_string());
                result.details.push((field.to_string(), "image changed".to_string()));
            }
        }
        if desired.command != actual.command {
            result.changed_fields.push("command".to_string());
            result.breaking_changes.push("command".to_string());
            result
                .details
                .push(("command".to_string(), "command changed".to_string()));
        }
        if desired.args != actual.args {
            result.changed_fields.push("args".to_string());
            result.breaking_changes.push("args".to_string());
            result
                .details
                .push(("args".to_string(), "args changed (order-sensitive)".to_string()));
        }
        return result;
    }

    if desired.env != actual.env {
        result.add_compatible("env", "environment variables differ");
    }
    if desired.ports != actual.ports {
        result.add_compatible("ports", "port mappings differ");
    }
    if desired.volumes != actual.volumes {
        result.add_compatible("volumes", "volume mounts differ");
    }
    if desired.privileged != actual.privileged {
        result.add_compatible("privileged", "privileged flag differs");
    }
    if desired.networks != actual.networks {
        result.add_compatible("networks", "attached networks differ");
    }
    if desired.aliases != actual.aliases {
        result.add_compatible("aliases", "network aliases differ");
    }
    if desired.restart_policy != actual.restart_policy {
        result.add_compatible("restartPolicy", "restart policy differs");
    }
    if desired.cni_config_path != actual.cni_config_path {
        result.add_compatible("cniConfigPath", "CNI config path differs");
    }
    result
}

pub fn diff_container(desired: &Container, actual: &Container) -> DiffResult {
    if desired.metadata.name != actual.metadata.name {
        return DiffResult::breaking("metadata.name", "container name changed");
    }
    let d = &desired.spec;
    let a = &actual.spec;
    if d.realm_name != a.realm_name
        || d.space_name != a.space_name
        || d.stack_name != a.stack_name
        || d.cell_name != a.cell_name
    {
        return DiffResult::breaking("spec.cellName", "ancestor reference changed");
    }

    let mut result = diff_container_fields(&d.container, &a.container);
    if result.change_type() == ChangeType::Breaking {
        return result;
    }
    if labels_differ(&desired.metadata.labels, &actual.metadata.labels) {
        result.add_compatible("metadata.labels", "labels differ");
    }
    result
}

// ---------------------------------------------------------------------
// Cell (ancestor checks, root container, and container-set diff)
// ---------------------------------------------------------------------

pub fn diff_cell(desired: &Cell, actual: &Cell) -> DiffResult {
    if desired.metadata.name != actual.metadata.name {
        return DiffResult::breaking("metadata.name", "cell name changed");
    }
    if desired.spec.realm_name != actual.spec.realm_name
        || desired.spec.space_name != actual.spec.space_name
        || desired.spec.stack_name != actual.spec.stack_name
    {
        return DiffResult::breaking("spec.stackName", "ancestor reference changed");
    }

    let mut result = DiffResult::none();

    let desired_root = desired.spec.root_container();
    let actual_root = actual.spec.root_container();
    match (desired_root, actual_root) {
        (Some(d), Some(a)) => {
            let root_diff = diff_container_fields(d, a);
            if root_diff.change_type() == ChangeType::Breaking {
                result.has_changes = true;
                result.change_type = ChangeTypeStorage(ChangeType::Breaking);
                result.root_container_changed = true;
                result.breaking_changes.extend(root_diff.breaking_changes);
                result.details.push((
                    "spec.containers[root]".to_string(),
                    "root container image/command/args changed".to_string(),
                ));
            }
        }
        (Some(_), None) | (None, Some(_)) => {
            result.has_changes = true;
            result.change_type = ChangeTypeStorage(ChangeType::Breaking);
            result.root_container_changed = true;
            result.breaking_changes.push("spec.containers[root]".to_string());
            result.details.push((
                "spec.containers[root]".to_string(),
                "root container added or removed".to_string(),
            ));
        }
        (None, None) => {}
    }

    // Container-set diff keyed by id, independent of the root check above.
    let desired_children: std::collections::BTreeMap<&str, &ContainerSpec> = desired
        .spec
        .child_containers()
        .map(|c| (c.id.as_str(), c))
        .collect();
    let actual_children: std::collections::BTreeMap<&str, &ContainerSpec> = actual
        .spec
        .child_containers()
        .map(|c| (c.id.as_str(), c))
        .collect();

    for (id, d) in &desired_children {
        match actual_children.get(id) {
            None => {
                result.container_actions.push(ContainerAction::Add((*d).clone()));
                if result.change_type() != ChangeType::Breaking {
                    result.change_type = ChangeTypeStorage(result.change_type.0.combine(ChangeType::Additive));
                }
                result.has_changes = true;
                result
                    .details
                    .push((format!("spec.containers[{id}]"), "container added".to_string()));
            }
            Some(a) => {
                let child_diff = diff_container_fields(d, a);
                if child_diff.has_changes {
                    result.has_changes = true;
                    result.container_actions.push(ContainerAction::Update((*d).clone()));
                    if result.change_type() != ChangeType::Breaking {
                        result.change_type =
                            ChangeTypeStorage(result.change_type.0.combine(child_diff.change_type()));
                    }
                    result
                        .details
                        .push((format!("spec.containers[{id}]"), "container updated".to_string()));
                }
            }
        }
    }
    for (id, a) in &actual_children {
        if !desired_children.contains_key(id) {
            // Orphan: present in actual only. Additive (action = remove).
            result.container_actions.push(ContainerAction::Remove((*a).clone()));
            if result.change_type() != ChangeType::Breaking {
                result.change_type = ChangeTypeStorage(result.change_type.0.combine(ChangeType::Additive));
            }
            result.has_changes = true;
            result
                .details
                .push((format!("spec.containers[{id}]"), "orphan container removed".to_string()));
        }
    }

    if labels_differ(&desired.metadata.labels, &actual.metadata.labels) {
        result.add_compatible("metadata.labels", "labels differ");
    }

    debug_assert!(
        !(result.root_container_changed && result.change_type() != ChangeType::Breaking),
        "root_container_changed must imply Breaking classification"
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;

    fn realm(name: &str) -> Realm {
        Realm {
            metadata: Metadata::new(name),
            spec: RealmSpec::default(),
            status: RealmStatus::default(),
        }
    }

    #[test]
    fn reflexive_diff_has_no_changes() {
        let r = realm("prod");
        assert!(!diff_realm(&r, &r).has_changes);
    }

    #[test]
    fn realm_name_change_is_breaking() {
        let a = realm("prod");
        let b = realm("prod2");
        let d = diff_realm(&a, &b);
        assert_eq!(d.change_type(), ChangeType::Breaking);
    }

    #[test]
    fn realm_namespace_change_is_breaking() {
        let mut a = realm("prod");
        a.spec.namespace = "ns-a".into();
        let mut b = a.clone();
        b.spec.namespace = "ns-b".into();
        assert_eq!(diff_realm(&a, &b).change_type(), ChangeType::Breaking);
    }

    #[test]
    fn realm_label_change_is_compatible() {
        let mut a = realm("prod");
        let mut b = a.clone();
        b.metadata.labels.insert("team".into(), "x".into());
        let d = diff_realm(&a, &b);
        assert_eq!(d.change_type(), ChangeType::Compatible);
        a.metadata.labels.insert("team".into(), "x".into());
        assert!(!diff_realm(&a, &b).has_changes);
    }

    fn container(id: &str, image: &str) -> ContainerSpec {
        ContainerSpec {
            id: id.to_string(),
            image: image.to_string(),
            ..Default::default()
        }
    }

    fn cell_with(containers: Vec<ContainerSpec>) -> Cell {
        Cell {
            metadata: Metadata::new("web"),
            spec: CellSpec {
                realm_name: "r".into(),
                space_name: "s".into(),
                stack_name: "st".into(),
                containers,
            },
            status: CellStatus::default(),
        }
    }

    #[test]
    fn root_image_change_is_breaking_and_flagged() {
        let mut root = container("", "img:1");
        root.root = true;
        let a = cell_with(vec![root.clone()]);
        let mut root2 = root.clone();
        root2.image = "img:2".into();
        let b = cell_with(vec![root2]);
        let d = diff_cell(&b, &a);
        assert_eq!(d.change_type(), ChangeType::Breaking);
        assert!(d.root_container_changed);
    }

    #[test]
    fn add_remove_update_children_single_diff() {
        let mut root = container("", "img");
        root.root = true;
        let old_child = container("old", "img");
        let upd_child = container("upd", "img");
        let actual = cell_with(vec![root.clone(), old_child.clone(), upd_child.clone()]);

        let new_child = container("new", "img");
        let mut upd_child2 = upd_child.clone();
        upd_child2.env.push(EnvVar {
            name: "X".into(),
            value: "1".into(),
        });
        let desired = cell_with(vec![root, new_child, upd_child2]);

        let d = diff_cell(&desired, &actual);
        assert_eq!(d.change_type(), ChangeType::Compatible);
        assert_eq!(d.container_actions.len(), 3);
        assert!(d
            .container_actions
            .iter()
            .any(|a| matches!(a, ContainerAction::Add(c) if c.id == "new")));
        assert!(d
            .container_actions
            .iter()
            .any(|a| matches!(a, ContainerAction::Remove(c) if c.id == "old")));
        assert!(d
            .container_actions
            .iter()
            .any(|a| matches!(a, ContainerAction::Update(c) if c.id == "upd")));
    }

    #[test]
    fn env_order_change_counts_as_change() {
        let mut a = container("c", "img");
        a.env = vec![
            EnvVar { name: "A".into(), value: "1".into() },
            EnvVar { name: "B".into(), value: "2".into() },
        ];
        let mut b = a.clone();
        b.env.reverse();
        let d = diff_container_fields(&a, &b);
        assert!(d.has_changes);
        assert_eq!(d.change_type(), ChangeType::Compatible);
    }
}
