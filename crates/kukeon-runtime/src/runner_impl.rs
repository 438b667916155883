//! [`LocalRunner`]: the reference `Runner` (`SPEC_FULL.md` §4.11). Entity
//! metadata lives in [`crate::MetadataStore`]; containerd namespaces, CNI
//! networks, and cgroup paths — the infrastructure a real backend would own
//! — are stood in for with in-memory `HashSet`s, since this crate is
//! explicitly a development/test double and is never wired to a real
//! containerd socket.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, info};

use kukeon_core::error::RunnerError;
use kukeon_core::model::{Cell, CellState, ContainerSpec, Realm, RealmState, Space, SpaceState, Stack, StackState};
use kukeon_core::runner::{CellRunner, DeleteOutcome, RResult, RealmRunner, SpaceRunner, StackRunner};

use crate::store::MetadataStore;

pub struct LocalRunner {
    store: MetadataStore,
    namespaces: Mutex<HashSet<String>>,
    networks: Mutex<HashSet<String>>,
    cgroups: Mutex<HashSet<String>>,
}

impl LocalRunner {
    pub fn new(store: MetadataStore) -> Self {
        Self {
            store,
            namespaces: Mutex::new(HashSet::new()),
            networks: Mutex::new(HashSet::new()),
            cgroups: Mutex::new(HashSet::new()),
        }
    }

    fn store_err<T>(r: crate::store::StoreResult<T>, kind: &str, name: &str) -> RResult<T> {
        r.map_err(|e| RunnerError::CreateFailed {
            kind: match kind {
                "Realm" => kukeon_core::model::Kind::Realm,
                "Space" => kukeon_core::model::Kind::Space,
                "Stack" => kukeon_core::model::Kind::Stack,
                _ => kukeon_core::model::Kind::Cell,
            },
            name: name.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl RealmRunner for LocalRunner {
    async fn get_realm(&self, name: &str) -> RResult<Realm> {
        let path = self.store.realm_file(name);
        Self::store_err(self.store.read(&path), "Realm", name)?
            .ok_or_else(|| RunnerError::RealmNotFound(name.to_string()))
    }

    async fn create_realm(&self, desired: &Realm) -> RResult<Realm> {
        let mut realm = desired.clone();
        let namespace = realm.spec.effective_namespace(&realm.metadata.name).to_string();
        self.namespaces.lock().unwrap().insert(namespace.clone());
        self.cgroups.lock().unwrap().insert(format!("/kukeon/{}", realm.metadata.name));

        realm.status.state = RealmState::Ready;
        realm.status.namespace = Some(namespace);
        realm.status.cgroup_path = Some(format!("/kukeon/{}", realm.metadata.name));

        let path = self.store.realm_file(&realm.metadata.name);
        Self::store_err(self.store.write(&path, &realm), "Realm", &realm.metadata.name)?;
        info!(realm = %realm.metadata.name, "created realm");
        Ok(realm)
    }

    async fn update_realm(&self, desired: &Realm) -> RResult<Realm> {
        let existing = self.get_realm(&desired.metadata.name).await?;
        let mut updated = desired.clone();
        updated.status = existing.status;
        let path = self.store.realm_file(&updated.metadata.name);
        Self::store_err(self.store.write(&path, &updated), "Realm", &updated.metadata.name)?;
        Ok(updated)
    }

    async fn delete_realm(&self, actual: &Realm) -> RResult<DeleteOutcome> {
        let path = self.store.realm_file(&actual.metadata.name);
        let removed = Self::store_err(self.store.remove(&path), "Realm", &actual.metadata.name)?;
        let namespace = actual.spec.effective_namespace(&actual.metadata.name);
        let namespace_deleted = self.namespaces.lock().unwrap().remove(namespace);
        let cgroup_deleted = self
            .cgroups
            .lock()
            .unwrap()
            .remove(&format!("/kukeon/{}", actual.metadata.name));
        debug!(realm = %actual.metadata.name, "deleted realm");
        Ok(DeleteOutcome {
            metadata_deleted: removed,
            cgroup_deleted,
            namespace_deleted,
            network_deleted: false,
        })
    }

    async fn list_realms(&self) -> RResult<Vec<Realm>> {
        let names = Self::store_err(self.store.list_child_dirs(self.store.root()), "Realm", "")?;
        let mut realms = Vec::new();
        for name in names {
            if let Some(realm) = Self::store_err(self.store.read(&self.store.realm_file(&name)), "Realm", &name)? {
                realms.push(realm);
            }
        }
        Ok(realms)
    }

    async fn refresh_realm_status(&self, actual: &Realm) -> RResult<Realm> {
        let namespace = actual.spec.effective_namespace(&actual.metadata.name).to_string();
        let namespace_present = self.namespaces.lock().unwrap().contains(&namespace);
        let cgroup_path = format!("/kukeon/{}", actual.metadata.name);
        let cgroup_present = self.cgroups.lock().unwrap().contains(&cgroup_path);

        let mut refreshed = actual.clone();
        refreshed.status.state = if namespace_present && cgroup_present {
            RealmState::Ready
        } else {
            RealmState::Unknown
        };
        refreshed.status.namespace = namespace_present.then_some(namespace);
        refreshed.status.cgroup_path = cgroup_present.then_some(cgroup_path);

        if refreshed.status != actual.status {
            let path = self.store.realm_file(&refreshed.metadata.name);
            Self::store_err(self.store.write(&path, &refreshed), "Realm", &refreshed.metadata.name)?;
        }
        Ok(refreshed)
    }
}

#[async_trait]
impl SpaceRunner for LocalRunner {
    async fn get_space(&self, realm_name: &str, name: &str) -> RResult<Space> {
        let path = self.store.space_file(realm_name, name);
        Self::store_err(self.store.read(&path), "Space", name)?
            .ok_or_else(|| RunnerError::SpaceNotFound(name.to_string()))
    }

    async fn create_space(&self, desired: &Space) -> RResult<Space> {
        let mut space = desired.clone();
        let network_name = Space::canonical_network_name(&space.spec.realm_name, &space.metadata.name);
        if !self.networks.lock().unwrap().insert(network_name.clone()) {
            return Err(RunnerError::NetworkAlreadyExists(network_name));
        }
        self.cgroups
            .lock()
            .unwrap()
            .insert(format!("/kukeon/{}/{}", space.spec.realm_name, space.metadata.name));

        space.status.state = SpaceState::Ready;
        space.status.network_name = Some(network_name);
        space.status.cgroup_path = Some(format!("/kukeon/{}/{}", space.spec.realm_name, space.metadata.name));

        let path = self.store.space_file(&space.spec.realm_name, &space.metadata.name);
        Self::store_err(self.store.write(&path, &space), "Space", &space.metadata.name)?;
        info!(space = %space.metadata.name, realm = %space.spec.realm_name, "created space");
        Ok(space)
    }

    async fn update_space(&self, desired: &Space) -> RResult<Space> {
        let existing = self.get_space(&desired.spec.realm_name, &desired.metadata.name).await?;
        let mut updated = desired.clone();
        updated.status = existing.status;
        let path = self.store.space_file(&updated.spec.realm_name, &updated.metadata.name);
        Self::store_err(self.store.write(&path, &updated), "Space", &updated.metadata.name)?;
        Ok(updated)
    }

    async fn delete_space(&self, actual: &Space) -> RResult<DeleteOutcome> {
        let path = self.store.space_file(&actual.spec.realm_name, &actual.metadata.name);
        let removed = Self::store_err(self.store.remove(&path), "Space", &actual.metadata.name)?;
        let network_name = Space::canonical_network_name(&actual.spec.realm_name, &actual.metadata.name);
        let network_deleted = self.networks.lock().unwrap().remove(&network_name);
        let cgroup_deleted = self
            .cgroups
            .lock()
            .unwrap()
            .remove(&format!("/kukeon/{}/{}", actual.spec.realm_name, actual.metadata.name));
        Ok(DeleteOutcome {
            metadata_deleted: removed,
            cgroup_deleted,
            namespace_deleted: false,
            network_deleted,
        })
    }

    async fn list_spaces(&self, realm_name: &str) -> RResult<Vec<Space>> {
        let dir = self.store.realm_dir(realm_name);
        let names = Self::store_err(self.store.list_child_dirs(&dir), "Space", realm_name)?;
        let mut spaces = Vec::new();
        for name in names {
            if let Some(space) = Self::store_err(self.store.read(&self.store.space_file(realm_name, &name)), "Space", &name)? {
                spaces.push(space);
            }
        }
        Ok(spaces)
    }

    async fn refresh_space_status(&self, actual: &Space) -> RResult<Space> {
        let network_name = Space::canonical_network_name(&actual.spec.realm_name, &actual.metadata.name);
        let network_present = self.networks.lock().unwrap().contains(&network_name);
        let cgroup_path = format!("/kukeon/{}/{}", actual.spec.realm_name, actual.metadata.name);
        let cgroup_present = self.cgroups.lock().unwrap().contains(&cgroup_path);

        let mut refreshed = actual.clone();
        refreshed.status.state = if network_present && cgroup_present {
            SpaceState::Ready
        } else {
            SpaceState::Unknown
        };
        refreshed.status.network_name = network_present.then_some(network_name);
        refreshed.status.cgroup_path = cgroup_present.then_some(cgroup_path);

        if refreshed.status != actual.status {
            let path = self.store.space_file(&refreshed.spec.realm_name, &refreshed.metadata.name);
            Self::store_err(self.store.write(&path, &refreshed), "Space", &refreshed.metadata.name)?;
        }
        Ok(refreshed)
    }
}

#[async_trait]
impl StackRunner for LocalRunner {
    async fn get_stack(&self, realm_name: &str, space_name: &str, name: &str) -> RResult<Stack> {
        let path = self.store.stack_file(realm_name, space_name, name);
        Self::store_err(self.store.read(&path), "Stack", name)?
            .ok_or_else(|| RunnerError::StackNotFound(name.to_string()))
    }

    async fn create_stack(&self, desired: &Stack) -> RResult<Stack> {
        let mut stack = desired.clone();
        let cgroup_path = format!(
            "/kukeon/{}/{}/{}",
            stack.spec.realm_name, stack.spec.space_name, stack.metadata.name
        );
        self.cgroups.lock().unwrap().insert(cgroup_path.clone());
        stack.status.state = StackState::Ready;
        stack.status.cgroup_path = Some(cgroup_path);

        let path = self
            .store
            .stack_file(&stack.spec.realm_name, &stack.spec.space_name, &stack.metadata.name);
        Self::store_err(self.store.write(&path, &stack), "Stack", &stack.metadata.name)?;
        info!(stack = %stack.metadata.name, space = %stack.spec.space_name, "created stack");
        Ok(stack)
    }

    async fn update_stack(&self, desired: &Stack) -> RResult<Stack> {
        let existing = self
            .get_stack(&desired.spec.realm_name, &desired.spec.space_name, &desired.metadata.name)
            .await?;
        let mut updated = desired.clone();
        updated.status = existing.status;
        let path = self
            .store
            .stack_file(&updated.spec.realm_name, &updated.spec.space_name, &updated.metadata.name);
        Self::store_err(self.store.write(&path, &updated), "Stack", &updated.metadata.name)?;
        Ok(updated)
    }

    async fn delete_stack(&self, actual: &Stack) -> RResult<DeleteOutcome> {
        let path = self
            .store
            .stack_file(&actual.spec.realm_name, &actual.spec.space_name, &actual.metadata.name);
        let removed = Self::store_err(self.store.remove(&path), "Stack", &actual.metadata.name)?;
        let cgroup_deleted = self.cgroups.lock().unwrap().remove(&format!(
            "/kukeon/{}/{}/{}",
            actual.spec.realm_name, actual.spec.space_name, actual.metadata.name
        ));
        Ok(DeleteOutcome {
            metadata_deleted: removed,
            cgroup_deleted,
            namespace_deleted: false,
            network_deleted: false,
        })
    }

    async fn list_stacks(&self, realm_name: &str, space_name: &str) -> RResult<Vec<Stack>> {
        let dir = self.store.space_dir(realm_name, space_name);
        let names = Self::store_err(self.store.list_child_dirs(&dir), "Stack", space_name)?;
        let mut stacks = Vec::new();
        for name in names {
            if let Some(stack) =
                Self::store_err(self.store.read(&self.store.stack_file(realm_name, space_name, &name)), "Stack", &name)?
            {
                stacks.push(stack);
            }
        }
        Ok(stacks)
    }

    async fn refresh_stack_status(&self, actual: &Stack) -> RResult<Stack> {
        let cgroup_path = format!(
            "/kukeon/{}/{}/{}",
            actual.spec.realm_name, actual.spec.space_name, actual.metadata.name
        );
        let cgroup_present = self.cgroups.lock().unwrap().contains(&cgroup_path);

        let mut refreshed = actual.clone();
        refreshed.status.state = if cgroup_present { StackState::Ready } else { StackState::Unknown };
        refreshed.status.cgroup_path = cgroup_present.then_some(cgroup_path);

        if refreshed.status != actual.status {
            let path = self
                .store
                .stack_file(&refreshed.spec.realm_name, &refreshed.spec.space_name, &refreshed.metadata.name);
            Self::store_err(self.store.write(&path, &refreshed), "Stack", &refreshed.metadata.name)?;
        }
        Ok(refreshed)
    }
}

#[async_trait]
impl CellRunner for LocalRunner {
    async fn get_cell(&self, realm_name: &str, space_name: &str, stack_name: &str, name: &str) -> RResult<Cell> {
        let path = self.store.cell_file(realm_name, space_name, stack_name, name);
        Self::store_err(self.store.read(&path), "Cell", name)?
            .ok_or_else(|| RunnerError::CellNotFound(name.to_string()))
    }

    async fn create_cell(&self, desired: &Cell) -> RResult<Cell> {
        let mut cell = desired.clone();
        let cgroup_path = format!(
            "/kukeon/{}/{}/{}/{}",
            cell.spec.realm_name, cell.spec.space_name, cell.spec.stack_name, cell.metadata.name
        );
        self.cgroups.lock().unwrap().insert(cgroup_path.clone());
        cell.status.state = CellState::Creating;
        cell.status.cgroup_path = Some(cgroup_path);

        if let Some(root) = cell.spec.root_container() {
            if root.image.is_empty() {
                return Err(RunnerError::CreatePauseContainerFailed(
                    cell.metadata.name.clone(),
                    "root container image is empty".to_string(),
                ));
            }
        }

        self.persist_cell(&cell)?;
        info!(cell = %cell.metadata.name, stack = %cell.spec.stack_name, "created cell");
        Ok(cell)
    }

    async fn update_cell(&self, desired: &Cell) -> RResult<Cell> {
        let existing = self
            .get_cell(
                &desired.spec.realm_name,
                &desired.spec.space_name,
                &desired.spec.stack_name,
                &desired.metadata.name,
            )
            .await?;
        let mut updated = desired.clone();
        updated.status = existing.status;
        self.persist_cell(&updated)?;
        Ok(updated)
    }

    async fn delete_cell(&self, actual: &Cell) -> RResult<DeleteOutcome> {
        let path = self.store.cell_file(
            &actual.spec.realm_name,
            &actual.spec.space_name,
            &actual.spec.stack_name,
            &actual.metadata.name,
        );
        let removed = Self::store_err(self.store.remove(&path), "Cell", &actual.metadata.name)?;
        let cgroup_deleted = self.cgroups.lock().unwrap().remove(&format!(
            "/kukeon/{}/{}/{}/{}",
            actual.spec.realm_name, actual.spec.space_name, actual.spec.stack_name, actual.metadata.name
        ));
        Ok(DeleteOutcome {
            metadata_deleted: removed,
            cgroup_deleted,
            namespace_deleted: false,
            network_deleted: false,
        })
    }

    async fn list_cells(&self, realm_name: &str, space_name: &str, stack_name: &str) -> RResult<Vec<Cell>> {
        let dir = self.store.stack_dir(realm_name, space_name, stack_name);
        let names = Self::store_err(self.store.list_child_dirs(&dir), "Cell", stack_name)?;
        let mut cells = Vec::new();
        for name in names {
            if let Some(cell) = Self::store_err(
                self.store.read(&self.store.cell_file(realm_name, space_name, stack_name, &name)),
                "Cell",
                &name,
            )? {
                cells.push(cell);
            }
        }
        Ok(cells)
    }

    async fn recreate_cell(&self, desired: &Cell) -> RResult<Cell> {
        let mut cell = desired.clone();
        cell.status.state = CellState::Ready;
        cell.status.root_container_id = cell.spec.root_container().map(|_| format!("{}-root", cell.metadata.name));
        self.persist_cell(&cell)?;
        info!(cell = %cell.metadata.name, "recreated cell (root container changed)");
        Ok(cell)
    }

    async fn start_cell(&self, cell: &Cell) -> RResult<()> {
        let mut started = cell.clone();
        started.status.state = CellState::Starting;
        started.status.root_container_id =
            started.spec.root_container().map(|_| format!("{}-root", started.metadata.name));
        self.persist_cell(&started)?;
        Ok(())
    }

    async fn update_cell_metadata(&self, cell: &Cell) -> RResult<Cell> {
        self.persist_cell(cell)?;
        Ok(cell.clone())
    }

    async fn create_container(&self, parent_cell: &Cell, spec: &ContainerSpec) -> RResult<Cell> {
        let mut cell = self
            .get_cell(
                &parent_cell.spec.realm_name,
                &parent_cell.spec.space_name,
                &parent_cell.spec.stack_name,
                &parent_cell.metadata.name,
            )
            .await?;
        cell.spec.containers.push(spec.clone());
        self.persist_cell(&cell)?;
        Ok(cell)
    }

    async fn update_container(&self, parent_cell: &Cell, spec: &ContainerSpec) -> RResult<Cell> {
        let mut cell = self
            .get_cell(
                &parent_cell.spec.realm_name,
                &parent_cell.spec.space_name,
                &parent_cell.spec.stack_name,
                &parent_cell.metadata.name,
            )
            .await?;
        match cell.spec.containers.iter_mut().find(|c| c.id == spec.id) {
            Some(existing) => *existing = spec.clone(),
            None => cell.spec.containers.push(spec.clone()),
        }
        self.persist_cell(&cell)?;
        Ok(cell)
    }

    async fn refresh_cell_status(&self, actual: &Cell) -> RResult<Cell> {
        let cgroup_path = format!(
            "/kukeon/{}/{}/{}/{}",
            actual.spec.realm_name, actual.spec.space_name, actual.spec.stack_name, actual.metadata.name
        );
        let cgroup_present = self.cgroups.lock().unwrap().contains(&cgroup_path);

        let mut refreshed = actual.clone();
        refreshed.status.state = if cgroup_present { CellState::Ready } else { CellState::Unknown };
        refreshed.status.cgroup_path = cgroup_present.then_some(cgroup_path);

        if refreshed.status != actual.status {
            self.persist_cell(&refreshed)?;
        }
        Ok(refreshed)
    }
}

impl LocalRunner {
    fn persist_cell(&self, cell: &Cell) -> RResult<()> {
        let path = self.store.cell_file(
            &cell.spec.realm_name,
            &cell.spec.space_name,
            &cell.spec.stack_name,
            &cell.metadata.name,
        );
        Self::store_err(self.store.write(&path, cell), "Cell", &cell.metadata.name)
    }
}
