use tracing::{debug, info};

use super::{ensure_realm, ReconcileResult, ReconciledResource};
use crate::differ::{diff_space, ChangeType};
use crate::error::{KukeonError, Result, RunnerError};
use crate::model::{Kind, Space};
use crate::runner::{RealmRunner, SpaceRunner};

/// `ReconcileX(runner, desired) -> ReconcileResult` for `Space`. Spaces have
/// one ancestor (`Realm`); per `spec.md` §3 invariant 1 a missing realm is
/// auto-provisioned rather than treated as an error during `apply`.
pub async fn reconcile_space<R>(runner: &R, desired: &Space) -> Result<ReconcileResult>
where
    R: RealmRunner + SpaceRunner + ?Sized,
{
    let name = desired.metadata.name.clone();

    ensure_realm(runner, &desired.spec.realm_name).await?;

    let actual = match runner.get_space(&desired.spec.realm_name, &name).await {
        Ok(actual) => actual,
        Err(RunnerError::SpaceNotFound(_)) => {
            info!(space = %name, realm = %desired.spec.realm_name, "creating space");
            let created = runner.create_space(desired).await?;
            return Ok(ReconcileResult::created(
                Kind::Space,
                name,
                ReconciledResource::Space(created),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let diff = diff_space(desired, &actual);
    if !diff.has_changes {
        debug!(space = %name, "no changes");
        return Ok(ReconcileResult::unchanged(
            Kind::Space,
            name,
            ReconciledResource::Space(actual),
        ));
    }

    if diff.change_type() == ChangeType::Breaking {
        return Err(KukeonError::BreakingChange {
            kind: Kind::Space,
            name,
            changes: diff.breaking_changes,
        });
    }

    let updated = runner.update_space(desired).await?;
    Ok(ReconcileResult::updated(
        Kind::Space,
        name,
        ReconciledResource::Space(updated),
        diff.changed_fields,
        diff.details,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeRunner;

    fn realm(name: &str) -> crate::model::Realm {
        crate::model::Realm {
            metadata: crate::model::Metadata::new(name),
            spec: Default::default(),
            status: Default::default(),
        }
    }

    fn space(realm_name: &str, name: &str) -> Space {
        Space {
            metadata: crate::model::Metadata::new(name),
            spec: crate::model::SpaceSpec {
                realm_name: realm_name.to_string(),
                cni_config_path: String::new(),
            },
            status: Default::default(),
        }
    }

    #[tokio::test]
    async fn auto_creates_missing_realm() {
        let runner = FakeRunner::new();
        let s = space("prod", "web");
        let result = reconcile_space(&runner, &s).await.unwrap();
        assert_eq!(result.action, super::super::ReconcileAction::Created);
        assert!(runner.get_realm("prod").await.is_ok());
    }

    #[tokio::test]
    async fn creates_when_realm_exists() {
        let runner = FakeRunner::new();
        runner.create_realm(&realm("prod")).await.unwrap();
        let s = space("prod", "web");
        let result = reconcile_space(&runner, &s).await.unwrap();
        assert_eq!(result.action, super::super::ReconcileAction::Created);
    }

    #[tokio::test]
    async fn realm_name_change_is_rejected() {
        let runner = FakeRunner::new();
        runner.create_realm(&realm("prod")).await.unwrap();
        runner.create_realm(&realm("staging")).await.unwrap();
        let s = space("prod", "web");
        reconcile_space(&runner, &s).await.unwrap();

        let mut s2 = s.clone();
        s2.spec.realm_name = "staging".into();
        let err = reconcile_space(&runner, &s2).await;
        // get_space("staging","web") is a miss, so this actually creates
        // under the new realm rather than detecting a move — moving a space
        // between realms is modeled as delete+recreate, not an in-place
        // update (`SPEC_FULL.md` §4.3).
        assert!(err.is_ok());
    }
}
