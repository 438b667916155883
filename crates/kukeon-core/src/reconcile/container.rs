use tracing::{debug, info};

use super::{ReconcileResult, ReconciledResource};
use crate::differ::{diff_container, ChangeType};
use crate::error::{KukeonError, Result, RunnerError};
use crate::model::{Cell, Container, ContainerEntitySpec, ContainerSpec, Kind, Metadata};
use crate::runner::CellRunner;

fn build_entity(cell: &Cell, spec: &ContainerSpec) -> Container {
    Container {
        metadata: Metadata::new(spec.id.clone()),
        spec: ContainerEntitySpec {
            realm_name: cell.spec.realm_name.clone(),
            space_name: cell.spec.space_name.clone(),
            stack_name: cell.spec.stack_name.clone(),
            cell_name: cell.metadata.name.clone(),
            container: spec.clone(),
        },
        status: Default::default(),
    }
}

/// `ReconcileX(runner, desired) -> ReconcileResult` for the standalone
/// `Container` kind. There is no `ContainerRunner`: containers live inside a
/// cell's container set, so both mutations route through `CellRunner` on the
/// parent cell (`SPEC_FULL.md` §4.2).
pub async fn reconcile_container<R>(runner: &R, desired: &Container) -> Result<ReconcileResult>
where
    R: CellRunner + ?Sized,
{
    let name = desired.metadata.name.clone();
    let d = &desired.spec;

    let cell = runner
        .get_cell(&d.realm_name, &d.space_name, &d.stack_name, &d.cell_name)
        .await
        .map_err(|_| KukeonError::NotFound {
            kind: Kind::Cell,
            name: d.cell_name.clone(),
        })?;

    let existing = cell
        .spec
        .containers
        .iter()
        .find(|c| c.id == d.container.id)
        .cloned();

    let actual = match existing {
        None => {
            info!(container = %name, cell = %d.cell_name, "creating container");
            let updated_cell = runner.create_container(&cell, &d.container).await?;
            let created_spec = updated_cell
                .spec
                .containers
                .iter()
                .find(|c| c.id == d.container.id)
                .cloned()
                .ok_or_else(|| KukeonError::Runner(RunnerError::ContainerNotFound(d.container.id.clone())))?;
            return Ok(ReconcileResult::created(
                Kind::Container,
                name,
                ReconciledResource::Container(build_entity(&updated_cell, &created_spec)),
            ));
        }
        Some(spec) => build_entity(&cell, &spec),
    };

    let diff = diff_container(desired, &actual);
    if !diff.has_changes {
        debug!(container = %name, "no changes");
        return Ok(ReconcileResult::unchanged(
            Kind::Container,
            name,
            ReconciledResource::Container(actual),
        ));
    }

    if diff.change_type() == ChangeType::Breaking {
        return Err(KukeonError::BreakingChange {
            kind: Kind::Container,
            name,
            changes: diff.breaking_changes,
        });
    }

    let updated_cell = runner.update_container(&cell, &d.container).await?;
    let updated_spec = updated_cell
        .spec
        .containers
        .iter()
        .find(|c| c.id == d.container.id)
        .cloned()
        .ok_or_else(|| KukeonError::Runner(RunnerError::ContainerNotFound(d.container.id.clone())))?;
    Ok(ReconcileResult::updated(
        Kind::Container,
        name,
        ReconciledResource::Container(build_entity(&updated_cell, &updated_spec)),
        diff.changed_fields,
        diff.details,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellSpec, Metadata, Space, SpaceSpec, Stack, StackSpec};
    use crate::testutil::FakeRunner;

    async fn seeded_cell(runner: &FakeRunner) {
        runner
            .create_realm(&crate::model::Realm {
                metadata: Metadata::new("prod"),
                spec: Default::default(),
                status: Default::default(),
            })
            .await
            .unwrap();
        runner
            .create_space(&Space {
                metadata: Metadata::new("web"),
                spec: SpaceSpec {
                    realm_name: "prod".into(),
                    cni_config_path: String::new(),
                },
                status: Default::default(),
            })
            .await
            .unwrap();
        runner
            .create_stack(&Stack {
                metadata: Metadata::new("api"),
                spec: StackSpec {
                    realm_name: "prod".into(),
                    space_name: "web".into(),
                    id: String::new(),
                },
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
                    containers: vec![ContainerSpec {
                        root: true,
                        image: "pause:3.9".into(),
                        ..Default::default()
                    }],
                },
                status: Default::default(),
            })
            .await
            .unwrap();
    }

    fn container(name: &str, image: &str) -> Container {
        Container {
            metadata: Metadata::new(name),
            spec: ContainerEntitySpec {
                realm_name: "prod".into(),
                space_name: "web".into(),
                stack_name: "api".into(),
                cell_name: "worker".into(),
                container: ContainerSpec {
                    id: name.to_string(),
                    image: image.to_string(),
                    ..Default::default()
                },
            },
            status: Default::default(),
        }
    }

    #[tokio::test]
    async fn fails_without_cell() {
        let runner = FakeRunner::new();
        let c = container("app", "app:1");
        let err = reconcile_container(&runner, &c).await.unwrap_err();
        assert!(matches!(err, KukeonError::NotFound { kind: Kind::Cell, .. }));
    }

    #[tokio::test]
    async fn creates_then_unchanged_then_label_update() {
        let runner = FakeRunner::new();
        seeded_cell(&runner).await;
        let c = container("app", "app:1");
        let created = reconcile_container(&runner, &c).await.unwrap();
        assert_eq!(created.action, super::super::ReconcileAction::Created);

        let again = reconcile_container(&runner, &c).await.unwrap();
        assert_eq!(again.action, super::super::ReconcileAction::Unchanged);

        let mut c2 = c.clone();
        c2.metadata.labels.insert("tier".into(), "backend".into());
        let updated = reconcile_container(&runner, &c2).await.unwrap();
        assert_eq!(updated.action, super::super::ReconcileAction::Updated);
    }

    #[tokio::test]
    async fn image_change_is_rejected() {
        let runner = FakeRunner::new();
        seeded_cell(&runner).await;
        let c = container("app", "app:1");
        reconcile_container(&runner, &c).await.unwrap();

        let mut c2 = c.clone();
        c2.spec.container.image = "app:2".into();
        let err = reconcile_container(&runner, &c2).await.unwrap_err();
        assert!(matches!(err, KukeonError::BreakingChange { .. }));
    }
}
