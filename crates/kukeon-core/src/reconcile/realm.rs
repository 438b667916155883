use tracing::{debug, info};

use super::{ReconcileResult, ReconciledResource};
use crate::differ::{diff_realm, ChangeType};
use crate::error::{KukeonError, Result, RunnerError};
use crate::model::Kind;
use crate::model::Realm;
use crate::runner::RealmRunner;

/// `ReconcileX(runner, desired) -> ReconcileResult` for `Realm`. Realms have
/// no ancestors, so this is the simplest instance of the unified algorithm.
pub async fn reconcile_realm<R: RealmRunner + ?Sized>(
    runner: &R,
    desired: &Realm,
) -> Result<ReconcileResult> {
    let name = desired.metadata.name.clone();

    let actual = match runner.get_realm(&name).await {
        Ok(actual) => actual,
        Err(RunnerError::RealmNotFound(_)) => {
            info!(realm = %name, "creating realm");
            let created = runner.create_realm(desired).await?;
            return Ok(ReconcileResult::created(
                Kind::Realm,
                name,
                ReconciledResource::Realm(created),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let diff = diff_realm(desired, &actual);
    if !diff.has_changes {
        debug!(realm = %name, "no changes");
        return Ok(ReconcileResult::unchanged(
            Kind::Realm,
            name,
            ReconciledResource::Realm(actual),
        ));
    }

    if diff.change_type() == ChangeType::Breaking {
        return Err(KukeonError::BreakingChange {
            kind: Kind::Realm,
            name,
            changes: diff.breaking_changes,
        });
    }

    let updated = runner.update_realm(desired).await?;
    Ok(ReconcileResult::updated(
        Kind::Realm,
        name,
        ReconciledResource::Realm(updated),
        diff.changed_fields,
        diff.details,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeRunner;

    fn realm(name: &str) -> Realm {
        Realm {
            metadata: crate::model::Metadata::new(name),
            spec: Default::default(),
            status: Default::default(),
        }
    }

    #[tokio::test]
    async fn creates_when_missing() {
        let runner = FakeRunner::new();
        let r = realm("prod");
        let result = reconcile_realm(&runner, &r).await.unwrap();
        assert_eq!(result.action, super::super::ReconcileAction::Created);
        assert!(runner.get_realm("prod").await.is_ok());
    }

    #[tokio::test]
    async fn second_apply_is_unchanged() {
        let runner = FakeRunner::new();
        let r = realm("prod");
        reconcile_realm(&runner, &r).await.unwrap();
        let result = reconcile_realm(&runner, &r).await.unwrap();
        assert_eq!(result.action, super::super::ReconcileAction::Unchanged);
    }

    #[tokio::test]
    async fn namespace_change_is_rejected() {
        let runner = FakeRunner::new();
        let mut r = realm("prod");
        r.spec.namespace = "ns-a".into();
        reconcile_realm(&runner, &r).await.unwrap();

        let mut r2 = r.clone();
        r2.spec.namespace = "ns-b".into();
        let err = reconcile_realm(&runner, &r2).await.unwrap_err();
        assert!(matches!(err, KukeonError::BreakingChange { .. }));
    }

    #[tokio::test]
    async fn label_change_updates() {
        let runner = FakeRunner::new();
        let r = realm("prod");
        reconcile_realm(&runner, &r).await.unwrap();

        let mut r2 = r.clone();
        r2.metadata.labels.insert("team".into(), "payments".into());
        let result = reconcile_realm(&runner, &r2).await.unwrap();
        assert_eq!(result.action, super::super::ReconcileAction::Updated);
        assert!(result.changes.contains(&"metadata.labels".to_string()));
    }
}
