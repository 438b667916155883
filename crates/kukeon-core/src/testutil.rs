//! An in-memory `Runner` double used by unit and integration tests across
//! this crate. Not wired to containerd/CNI/cgroups at all — it exists only
//! to let the reconciler's tests exercise real ancestor-creation, diffing,
//! and container-set convergence without a real backend. See
//! `kukeon-runtime` for the reference implementation that actually owns a
//! metadata store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::RunnerError;
use crate::model::{Cell, Container, ContainerSpec, Realm, Space, Stack};
use crate::runner::{CellRunner, DeleteOutcome, RResult, RealmRunner, SpaceRunner, StackRunner};

type SpaceKey = (String, String);
type StackKey = (String, String, String);
type CellKey = (String, String, String, String);

#[derive(Default)]
pub struct FakeRunner {
    realms: Mutex<HashMap<String, Realm>>,
    spaces: Mutex<HashMap<SpaceKey, Space>>,
    stacks: Mutex<HashMap<StackKey, Stack>>,
    cells: Mutex<HashMap<CellKey, Cell>>,
    pub create_calls: Mutex<Vec<String>>,
    pub started_cells: Mutex<Vec<String>>,
    pub recreated_cells: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell_key(realm: &str, space: &str, stack: &str, name: &str) -> CellKey {
        (realm.to_string(), space.to_string(), stack.to_string(), name.to_string())
    }
}

#[async_trait]
impl RealmRunner for FakeRunner {
    async fn get_realm(&self, name: &str) -> RResult<Realm> {
        self.realms
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| RunnerError::RealmNotFound(name.to_string()))
    }

    async fn create_realm(&self, desired: &Realm) -> RResult<Realm> {
        self.create_calls
            .lock()
            .unwrap()
            .push(format!("Realm/{}", desired.metadata.name));
        let mut realm = desired.clone();
        realm.status.state = crate::model::RealmState::Ready;
        realm.status.namespace = Some(realm.spec.effective_namespace(&realm.metadata.name).to_string());
        self.realms
            .lock()
            .unwrap()
            .insert(realm.metadata.name.clone(), realm.clone());
        Ok(realm)
    }

    async fn update_realm(&self, desired: &Realm) -> RResult<Realm> {
        let mut realms = self.realms.lock().unwrap();
        let existing = realms
            .get(&desired.metadata.name)
            .ok_or_else(|| RunnerError::RealmNotFound(desired.metadata.name.clone()))?;
        let mut updated = desired.clone();
        updated.status = existing.status.clone();
        realms.insert(updated.metadata.name.clone(), updated.clone());
        Ok(updated)
    }

    async fn delete_realm(&self, actual: &Realm) -> RResult<DeleteOutcome> {
        let removed = self.realms.lock().unwrap().remove(&actual.metadata.name).is_some();
        Ok(DeleteOutcome {
            metadata_deleted: removed,
            cgroup_deleted: removed,
            namespace_deleted: removed,
            network_deleted: false,
        })
    }

    async fn list_realms(&self) -> RResult<Vec<Realm>> {
        Ok(self.realms.lock().unwrap().values().cloned().collect())
    }

    // No separate namespace/cgroup bookkeeping to drift from the stored
    // status, so there is nothing for a fake sweep to observe or rewrite.
    async fn refresh_realm_status(&self, actual: &Realm) -> RResult<Realm> {
        Ok(actual.clone())
    }
}

#[async_trait]
impl SpaceRunner for FakeRunner {
    async fn get_space(&self, realm_name: &str, name: &str) -> RResult<Space> {
        self.spaces
            .lock()
            .unwrap()
            .get(&(realm_name.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| RunnerError::SpaceNotFound(name.to_string()))
    }

    async fn create_space(&self, desired: &Space) -> RResult<Space> {
        self.create_calls
            .lock()
            .unwrap()
            .push(format!("Space/{}", desired.metadata.name));
        let mut space = desired.clone();
        space.status.state = crate::model::SpaceState::Ready;
        space.status.network_name = Some(Space::canonical_network_name(
            &space.spec.realm_name,
            &space.metadata.name,
        ));
        self.spaces.lock().unwrap().insert(
            (space.spec.realm_name.clone(), space.metadata.name.clone()),
            space.clone(),
        );
        Ok(space)
    }

    async fn update_space(&self, desired: &Space) -> RResult<Space> {
        let mut spaces = self.spaces.lock().unwrap();
        let key = (desired.spec.realm_name.clone(), desired.metadata.name.clone());
        let existing = spaces
            .get(&key)
            .ok_or_else(|| RunnerError::SpaceNotFound(desired.metadata.name.clone()))?;
        let mut updated = desired.clone();
        updated.status = existing.status.clone();
        spaces.insert(key, updated.clone());
        Ok(updated)
    }

    async fn delete_space(&self, actual: &Space) -> RResult<DeleteOutcome> {
        let key = (actual.spec.realm_name.clone(), actual.metadata.name.clone());
        let removed = self.spaces.lock().unwrap().remove(&key).is_some();
        Ok(DeleteOutcome {
            metadata_deleted: removed,
            cgroup_deleted: removed,
            namespace_deleted: false,
            network_deleted: removed,
        })
    }

    async fn list_spaces(&self, realm_name: &str) -> RResult<Vec<Space>> {
        Ok(self
            .spaces
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.spec.realm_name == realm_name)
            .cloned()
            .collect())
    }

    async fn refresh_space_status(&self, actual: &Space) -> RResult<Space> {
        Ok(actual.clone())
    }
}

#[async_trait]
impl StackRunner for FakeRunner {
    async fn get_stack(&self, realm_name: &str, space_name: &str, name: &str) -> RResult<Stack> {
        self.stacks
            .lock()
            .unwrap()
            .get(&(realm_name.to_string(), space_name.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| RunnerError::StackNotFound(name.to_string()))
    }

    async fn create_stack(&self, desired: &Stack) -> RResult<Stack> {
        self.create_calls
            .lock()
            .unwrap()
            .push(format!("Stack/{}", desired.metadata.name));
        let mut stack = desired.clone();
        stack.status.state = crate::model::StackState::Ready;
        self.stacks.lock().unwrap().insert(
            (
                stack.spec.realm_name.clone(),
                stack.spec.space_name.clone(),
                stack.metadata.name.clone(),
            ),
            stack.clone(),
        );
        Ok(stack)
    }

    async fn update_stack(&self, desired: &Stack) -> RResult<Stack> {
        let mut stacks = self.stacks.lock().unwrap();
        let key = (
            desired.spec.realm_name.clone(),
            desired.spec.space_name.clone(),
            desired.metadata.name.clone(),
        );
        let existing = stacks
            .get(&key)
            .ok_or_else(|| RunnerError::StackNotFound(desired.metadata.name.clone()))?;
        let mut updated = desired.clone();
        updated.status = existing.status.clone();
        stacks.insert(key, updated.clone());
        Ok(updated)
    }

    async fn delete_stack(&self, actual: &Stack) -> RResult<DeleteOutcome> {
        let key = (
            actual.spec.realm_name.clone(),
            actual.spec.space_name.clone(),
            actual.metadata.name.clone(),
        );
        let removed = self.stacks.lock().unwrap().remove(&key).is_some();
        Ok(DeleteOutcome {
            metadata_deleted: removed,
            cgroup_deleted: removed,
            namespace_deleted: false,
            network_deleted: false,
        })
    }

    async fn list_stacks(&self, realm_name: &str, space_name: &str) -> RResult<Vec<Stack>> {
        Ok(self
            .stacks
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.spec.realm_name == realm_name && s.spec.space_name == space_name)
            .cloned()
            .collect())
    }

    async fn refresh_stack_status(&self, actual: &Stack) -> RResult<Stack> {
        Ok(actual.clone())
    }
}

#[async_trait]
impl CellRunner for FakeRunner {
    async fn get_cell(&self, realm_name: &str, space_name: &str, stack_name: &str, name: &str) -> RResult<Cell> {
        self.cells
            .lock()
            .unwrap()
            .get(&Self::cell_key(realm_name, space_name, stack_name, name))
            .cloned()
            .ok_or_else(|| RunnerError::CellNotFound(name.to_string()))
    }

    async fn create_cell(&self, desired: &Cell) -> RResult<Cell> {
        self.create_calls
            .lock()
            .unwrap()
            .push(format!("Cell/{}", desired.metadata.name));
        let mut cell = desired.clone();
        cell.status.state = crate::model::CellState::Creating;
        cell.status.root_container_id = cell.spec.root_container().map(|_| "root".to_string());
        let key = Self::cell_key(
            &cell.spec.realm_name,
            &cell.spec.space_name,
            &cell.spec.stack_name,
            &cell.metadata.name,
        );
        self.cells.lock().unwrap().insert(key, cell.clone());
        Ok(cell)
    }

    async fn update_cell(&self, desired: &Cell) -> RResult<Cell> {
        let key = Self::cell_key(
            &desired.spec.realm_name,
            &desired.spec.space_name,
            &desired.spec.stack_name,
            &desired.metadata.name,
        );
        let mut cells = self.cells.lock().unwrap();
        let existing = cells
            .get(&key)
            .ok_or_else(|| RunnerError::CellNotFound(desired.metadata.name.clone()))?;
        let mut updated = desired.clone();
        updated.status = existing.status.clone();
        cells.insert(key, updated.clone());
        Ok(updated)
    }

    async fn delete_cell(&self, actual: &Cell) -> RResult<DeleteOutcome> {
        let key = Self::cell_key(
            &actual.spec.realm_name,
            &actual.spec.space_name,
            &actual.spec.stack_name,
            &actual.metadata.name,
        );
        let removed = self.cells.lock().unwrap().remove(&key).is_some();
        Ok(DeleteOutcome {
            metadata_deleted: removed,
            cgroup_deleted: removed,
            namespace_deleted: false,
            network_deleted: false,
        })
    }

    async fn list_cells(&self, realm_name: &str, space_name: &str, stack_name: &str) -> RResult<Vec<Cell>> {
        Ok(self
            .cells
            .lock()
            .unwrap()
            .values()
            .filter(|c| {
                c.spec.realm_name == realm_name
                    && c.spec.space_name == space_name
                    && c.spec.stack_name == stack_name
            })
            .cloned()
            .collect())
    }

    async fn recreate_cell(&self, desired: &Cell) -> RResult<Cell> {
        self.recreated_cells
            .lock()
            .unwrap()
            .push(desired.metadata.name.clone());
        let key = Self::cell_key(
            &desired.spec.realm_name,
            &desired.spec.space_name,
            &desired.spec.stack_name,
            &desired.metadata.name,
        );
        let mut cell = desired.clone();
        cell.status.state = crate::model::CellState::Ready;
        self.cells.lock().unwrap().insert(key, cell.clone());
        Ok(cell)
    }

    async fn start_cell(&self, cell: &Cell) -> RResult<()> {
        self.started_cells.lock().unwrap().push(cell.metadata.name.clone());
        let key = Self::cell_key(
            &cell.spec.realm_name,
            &cell.spec.space_name,
            &cell.spec.stack_name,
            &cell.metadata.name,
        );
        if let Some(existing) = self.cells.lock().unwrap().get_mut(&key) {
            existing.status.state = crate::model::CellState::Starting;
        }
        Ok(())
    }

    async fn update_cell_metadata(&self, cell: &Cell) -> RResult<Cell> {
        let key = Self::cell_key(
            &cell.spec.realm_name,
            &cell.spec.space_name,
            &cell.spec.stack_name,
            &cell.metadata.name,
        );
        let mut cells = self.cells.lock().unwrap();
        cells.insert(key, cell.clone());
        Ok(cell.clone())
    }

    async fn create_container(&self, parent_cell: &Cell, spec: &ContainerSpec) -> RResult<Cell> {
        let key = Self::cell_key(
            &parent_cell.spec.realm_name,
            &parent_cell.spec.space_name,
            &parent_cell.spec.stack_name,
            &parent_cell.metadata.name,
        );
        let mut cells = self.cells.lock().unwrap();
        let cell = cells
            .get_mut(&key)
            .ok_or_else(|| RunnerError::CellNotFound(parent_cell.metadata.name.clone()))?;
        cell.spec.containers.push(spec.clone());
        Ok(cell.clone())
    }

    async fn update_container(&self, parent_cell: &Cell, spec: &ContainerSpec) -> RResult<Cell> {
        let key = Self::cell_key(
            &parent_cell.spec.realm_name,
            &parent_cell.spec.space_name,
            &parent_cell.spec.stack_name,
            &parent_cell.metadata.name,
        );
        let mut cells = self.cells.lock().unwrap();
        let cell = cells
            .get_mut(&key)
            .ok_or_else(|| RunnerError::CellNotFound(parent_cell.metadata.name.clone()))?;
        if let Some(existing) = cell.spec.containers.iter_mut().find(|c| c.id == spec.id) {
            *existing = spec.clone();
        } else {
            cell.spec.containers.push(spec.clone());
        }
        Ok(cell.clone())
    }

    async fn refresh_cell_status(&self, actual: &Cell) -> RResult<Cell> {
        Ok(actual.clone())
    }
}

/// Helper used by the standalone-container reconciler's tests: builds a
/// `Container` entity view from a cell and one of its container specs.
pub fn container_entity_from_cell(cell: &Cell, spec: &ContainerSpec) -> Container {
    Container {
        metadata: crate::model::Metadata::new(spec.id.clone()),
        spec: crate::model::ContainerEntitySpec {
            realm_name: cell.spec.realm_name.clone(),
            space_name: cell.spec.space_name.clone(),
            stack_name: cell.spec.stack_name.clone(),
            cell_name: cell.metadata.name.clone(),
            container: spec.clone(),
        },
        status: Default::default(),
    }
}
