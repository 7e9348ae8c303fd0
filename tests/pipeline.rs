// ABOUTME: Integration tests for the deployment pipeline against in-memory adapters.
// ABOUTME: Covers tag invariants, rollback paths, timeouts, and idempotent re-runs.

mod support;

use hoku::diagnostics::WarningKind;
use hoku::pipeline::{ErrorClass, RollbackCause, RunOutcome, Stage, manual_rollback};
use support::fakes::{ClusterFailure, EngineFailure, FakeEngine};
use support::harness::{BOOTSTRAP_IMAGE, Harness};

const FIRST: &str = "a1b2c3d";
const SECOND: &str = "e4f5a6b";

fn stages(report: &hoku::pipeline::RunReport) -> Vec<Stage> {
    report.steps.iter().map(|s| s.stage).collect()
}

mod happy_path {
    use super::*;

    #[tokio::test]
    async fn first_deploy_has_no_stable() {
        support::init_tracing();
        let h = Harness::new();

        let report = h.run(FIRST).await;

        assert_eq!(report.outcome, RunOutcome::Deployed);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(h.registry("stable"), None);
        assert_eq!(h.registry("latest"), Some(FakeEngine::build_id(FIRST)));
        assert_eq!(h.registry(FIRST), Some(FakeEngine::build_id(FIRST)));
        assert_eq!(h.cluster.image(), Some(h.reference(FIRST)));
        assert_eq!(report.previous_image.as_deref(), Some(BOOTSTRAP_IMAGE));
        assert_eq!(
            stages(&report),
            vec![
                Stage::Sync,
                Stage::Backup,
                Stage::Build,
                Stage::VerifyBuilt,
                Stage::Publish,
                Stage::Apply,
                Stage::AwaitHealth,
                Stage::Cleanup,
            ]
        );
        assert!(report.warnings.is_empty());
        assert!(report.failure.is_none());
    }

    #[tokio::test]
    async fn stable_lags_latest_by_one_deployment() {
        let h = Harness::new();
        h.run(FIRST).await;

        let report = h.run(SECOND).await;

        assert_eq!(report.outcome, RunOutcome::Deployed);
        assert_eq!(h.registry("latest"), Some(FakeEngine::build_id(SECOND)));
        assert_eq!(h.registry("stable"), Some(FakeEngine::build_id(FIRST)));
        assert_eq!(h.cluster.image(), Some(h.reference(SECOND)));
        assert_eq!(report.previous_image, Some(h.reference(FIRST)));

        h.run("0123abc").await;
        assert_eq!(h.registry("latest"), Some(FakeEngine::build_id("0123abc")));
        assert_eq!(h.registry("stable"), Some(FakeEngine::build_id(SECOND)));
    }

    #[tokio::test]
    async fn report_carries_resolved_commit_and_image() {
        let h = Harness::new();
        let report = h.run(FIRST).await;

        assert_eq!(report.workload, "shop");
        assert_eq!(report.revision, FIRST);
        assert_eq!(report.image, "localhost:5000/shop:a1b2c3d");
        assert_eq!(
            report.commit.as_deref(),
            Some("a1b2c3d000000000000000000000000000000000")
        );
        assert!(report.started_at <= report.finished_at);
        for step in &report.steps {
            assert!(step.success);
            assert!(step.started_at <= step.finished_at);
        }
    }

    #[tokio::test]
    async fn rerun_of_deployed_revision_changes_nothing() {
        let h = Harness::new();
        h.run(FIRST).await;
        h.run(SECOND).await;
        let registry = h.engine.registry_snapshot();
        let generations = h.cluster.generations();

        let report = h.run(SECOND).await;

        assert_eq!(report.outcome, RunOutcome::Deployed);
        assert_eq!(h.engine.registry_snapshot(), registry);
        assert_eq!(h.cluster.generations(), generations);
        assert_eq!(h.engine.builds(), vec![FIRST, SECOND, SECOND]);
        assert_eq!(h.registry("stable"), Some(FakeEngine::build_id(FIRST)));
        let backup = &report.steps[1];
        assert_eq!(backup.stage, Stage::Backup);
        assert!(backup.message.contains("stable kept"), "{}", backup.message);
    }

    #[tokio::test]
    async fn backup_pulls_latest_on_a_fresh_host() {
        let h = Harness::new();
        h.run(FIRST).await;
        h.engine.clear_local();

        let report = h.run(SECOND).await;

        assert_eq!(report.outcome, RunOutcome::Deployed);
        assert_eq!(h.registry("stable"), Some(FakeEngine::build_id(FIRST)));
    }
}

mod local_failures {
    use super::*;
    use std::collections::HashMap;

    /// Deploy FIRST and snapshot the registry.
    async fn deployed() -> (Harness, HashMap<String, String>) {
        let h = Harness::new();
        h.run(FIRST).await;
        let registry = h.engine.registry_snapshot();
        (h, registry)
    }

    /// Nothing the next run's Backup reads may name the aborted build.
    fn assert_untouched(
        h: &Harness,
        report: &hoku::pipeline::RunReport,
        registry: &HashMap<String, String>,
        last: Stage,
    ) {
        assert_eq!(report.outcome, RunOutcome::Aborted);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(stages(report).last(), Some(&last));
        assert_eq!(h.cluster.image(), Some(h.reference(FIRST)));
        assert_eq!(&h.engine.registry_snapshot(), registry);
        assert_eq!(h.local("latest"), Some(FakeEngine::build_id(FIRST)));
        assert_ne!(h.local("stable"), Some(FakeEngine::build_id(SECOND)));
    }

    #[tokio::test]
    async fn sync_failure_aborts_before_anything_else() {
        let (h, registry) = deployed().await;
        h.source.fail();

        let report = h.run(SECOND).await;

        assert_eq!(report.steps.len(), 1);
        assert!(report.commit.is_none());
        assert_eq!(report.failure_class(), Some(ErrorClass::LocalFailure));
        assert_untouched(&h, &report, &registry, Stage::Sync);
    }

    #[tokio::test]
    async fn build_failure_records_exit_code() {
        let (h, registry) = deployed().await;
        h.engine.fail(EngineFailure::Build);

        let report = h.run(SECOND).await;

        assert_eq!(report.failure_class(), Some(ErrorClass::LocalFailure));
        assert_untouched(&h, &report, &registry, Stage::Build);
        let build = report.steps.last().unwrap();
        assert!(!build.success);
        assert_eq!(build.exit_code, Some(1));
        assert!(build.message.contains("image build failed"));
    }

    #[tokio::test]
    async fn missing_built_image_aborts() {
        let (h, registry) = deployed().await;
        h.engine.fail(EngineFailure::LoseBuild);

        let report = h.run(SECOND).await;

        assert_eq!(report.failure_class(), Some(ErrorClass::LocalFailure));
        assert_untouched(&h, &report, &registry, Stage::VerifyBuilt);
        assert!(
            report
                .failure
                .as_ref()
                .unwrap()
                .message
                .contains("not present locally")
        );
    }

    #[tokio::test]
    async fn publish_failure_leaves_workload_alone() {
        let (h, registry) = deployed().await;
        h.engine.fail(EngineFailure::Push);

        let report = h.run(SECOND).await;

        assert_eq!(report.failure_class(), Some(ErrorClass::PublishFailure));
        assert_untouched(&h, &report, &registry, Stage::Publish);
    }

    #[tokio::test]
    async fn failed_latest_push_resets_local_latest() {
        let h = Harness::new();
        h.run(FIRST).await;
        h.engine.fail(EngineFailure::PushLatest);

        let report = h.run(SECOND).await;

        assert_eq!(report.outcome, RunOutcome::Aborted);
        assert_eq!(report.failure_class(), Some(ErrorClass::PublishFailure));
        assert_eq!(h.local("latest"), Some(FakeEngine::build_id(FIRST)));
        assert_eq!(h.registry("latest"), Some(FakeEngine::build_id(FIRST)));
        assert_eq!(h.cluster.image(), Some(h.reference(FIRST)));
    }

    #[tokio::test]
    async fn failed_latest_push_on_first_deploy_drops_local_latest() {
        let h = Harness::new();
        h.engine.fail(EngineFailure::PushLatest);

        let report = h.run(FIRST).await;

        assert_eq!(report.outcome, RunOutcome::Aborted);
        assert_eq!(h.local("latest"), None);
        assert_eq!(h.registry("latest"), None);
        assert_eq!(h.local(FIRST), Some(FakeEngine::build_id(FIRST)));
    }

    #[tokio::test]
    async fn unpublished_build_never_becomes_stable() {
        let h = Harness::new();
        h.run(FIRST).await;
        h.engine.fail(EngineFailure::PushLatest);
        h.run(SECOND).await;
        h.engine.heal();
        h.cluster.fail(ClusterFailure::Unhealthy);

        let report = h.run("0123abc").await;

        assert_eq!(report.outcome, RunOutcome::RolledBack);
        assert_eq!(h.cluster.image(), Some(h.reference(FIRST)));
        assert_eq!(h.registry("stable"), Some(FakeEngine::build_id(FIRST)));
        assert_eq!(h.registry("latest"), Some(FakeEngine::build_id(FIRST)));
    }
}

mod best_effort {
    use super::*;

    #[tokio::test]
    async fn cleanup_failure_is_a_warning() {
        let h = Harness::new();
        h.engine.fail(EngineFailure::Prune);

        let report = h.run(FIRST).await;

        assert_eq!(report.outcome, RunOutcome::Deployed);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, WarningKind::Cleanup);
        assert!(report.failure.is_none());
        assert!(!report.steps.last().unwrap().success);
    }

    #[tokio::test]
    async fn backup_failure_is_a_warning() {
        let h = Harness::new();
        h.run(FIRST).await;
        h.engine.clear_local();
        h.engine.fail(EngineFailure::Pull);

        let report = h.run(SECOND).await;

        assert_eq!(report.outcome, RunOutcome::Deployed);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, WarningKind::Backup);
    }
}

mod rollback {
    use super::*;

    #[tokio::test]
    async fn unhealthy_second_deploy_rolls_back() {
        support::init_tracing();
        let h = Harness::new();
        h.run(FIRST).await;
        h.cluster.fail(ClusterFailure::Unhealthy);

        let report = h.run(SECOND).await;

        assert_eq!(report.outcome, RunOutcome::RolledBack);
        assert_eq!(report.exit_code(), 2);
        assert_eq!(report.failure_class(), Some(ErrorClass::HealthFailure));
        assert_eq!(h.registry("stable"), Some(FakeEngine::build_id(FIRST)));
        assert_eq!(h.registry("latest"), Some(FakeEngine::build_id(FIRST)));
        assert_eq!(h.cluster.image(), report.previous_image);
        assert_eq!(h.cluster.undo_calls(), 1);
        assert_eq!(
            stages(&report).last(),
            Some(&Stage::Rollback(RollbackCause::Unhealthy))
        );
    }

    #[tokio::test]
    async fn orchestrator_timeout_rolls_back() {
        let h = Harness::new();
        h.run(FIRST).await;
        h.cluster.fail(ClusterFailure::RolloutTimedOut);

        let report = h.run(SECOND).await;

        assert_eq!(report.outcome, RunOutcome::RolledBack);
        assert!(
            report
                .failure
                .as_ref()
                .unwrap()
                .message
                .contains("not healthy within 300s")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn hung_health_check_is_bounded_and_rolls_back() {
        let h = Harness::new();
        h.run(FIRST).await;
        h.cluster.fail(ClusterFailure::HangRollout);

        let report = h.run(SECOND).await;

        assert_eq!(report.outcome, RunOutcome::RolledBack);
        let failure = report.failure.as_ref().unwrap();
        assert_eq!(failure.stage, Some(Stage::AwaitHealth));
        assert_eq!(failure.class, ErrorClass::HealthFailure);
        assert!(failure.message.contains("await-health did not finish"));
        assert_eq!(h.registry("latest"), Some(FakeEngine::build_id(FIRST)));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_build_is_bounded_and_aborts() {
        let h = Harness::new();
        h.engine.fail(EngineFailure::HangBuild);

        let report = h.run(FIRST).await;

        assert_eq!(report.outcome, RunOutcome::Aborted);
        assert_eq!(report.failure_class(), Some(ErrorClass::LocalFailure));
        assert_eq!(h.cluster.image().as_deref(), Some(BOOTSTRAP_IMAGE));
    }

    #[tokio::test]
    async fn first_deploy_failure_is_fatal() {
        let h = Harness::new();
        h.cluster.fail(ClusterFailure::Unhealthy);

        let report = h.run(FIRST).await;

        assert_eq!(report.outcome, RunOutcome::Fatal);
        assert_eq!(report.exit_code(), 3);
        assert_eq!(report.failure_class(), Some(ErrorClass::Fatal));
        let rollback = report.rollback_failure.as_ref().unwrap();
        assert!(rollback.message.contains("no stable image"));
        assert_eq!(h.cluster.image().as_deref(), Some(BOOTSTRAP_IMAGE));
    }

    #[tokio::test]
    async fn failed_undo_skips_tag_restore() {
        let h = Harness::new();
        h.run(FIRST).await;
        h.cluster.fail(ClusterFailure::Unhealthy);
        h.cluster.fail(ClusterFailure::Undo);

        let report = h.run(SECOND).await;

        assert_eq!(report.outcome, RunOutcome::Fatal);
        assert!(
            report
                .rollback_failure
                .as_ref()
                .unwrap()
                .message
                .contains("rollout undo failed")
        );
        assert_eq!(h.registry("latest"), Some(FakeEngine::build_id(SECOND)));
    }

    #[tokio::test]
    async fn apply_failure_restores_latest_without_undo() {
        let h = Harness::new();
        h.run(FIRST).await;
        let generations = h.cluster.generations();
        h.cluster.fail(ClusterFailure::SetImage);

        let report = h.run(SECOND).await;

        assert_eq!(report.outcome, RunOutcome::Aborted);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.failure_class(), Some(ErrorClass::ApplyFailure));
        assert_eq!(h.cluster.undo_calls(), 0);
        assert_eq!(h.cluster.generations(), generations);
        assert_eq!(h.registry("latest"), Some(FakeEngine::build_id(FIRST)));
        assert_eq!(
            stages(&report).last(),
            Some(&Stage::Rollback(RollbackCause::ApplyFailed))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn apply_that_lands_then_hangs_is_undone() {
        let h = Harness::new();
        h.run(FIRST).await;
        h.cluster.fail(ClusterFailure::HangAfterSetImage);

        let report = h.run(SECOND).await;

        assert_eq!(report.outcome, RunOutcome::RolledBack);
        assert_eq!(report.exit_code(), 2);
        assert_eq!(report.failure_class(), Some(ErrorClass::ApplyFailure));
        assert!(
            report
                .failure
                .as_ref()
                .unwrap()
                .message
                .contains("apply did not finish")
        );
        assert_eq!(h.cluster.undo_calls(), 1);
        assert_eq!(h.cluster.image(), Some(h.reference(FIRST)));
        assert_eq!(h.registry("latest"), Some(FakeEngine::build_id(FIRST)));
        assert_eq!(
            stages(&report).last(),
            Some(&Stage::Rollback(RollbackCause::ApplyInterrupted))
        );
    }

    #[tokio::test]
    async fn apply_failure_on_first_deploy_is_fatal() {
        let h = Harness::new();
        h.cluster.fail(ClusterFailure::SetImage);

        let report = h.run(FIRST).await;

        assert_eq!(report.outcome, RunOutcome::Fatal);
        assert_eq!(h.cluster.undo_calls(), 0);
    }

    #[tokio::test]
    async fn recovered_workload_deploys_again() {
        let h = Harness::new();
        h.run(FIRST).await;
        h.cluster.fail(ClusterFailure::Unhealthy);
        h.run(SECOND).await;
        h.cluster.heal();

        let report = h.run("0123abc").await;

        assert_eq!(report.outcome, RunOutcome::Deployed);
        assert_eq!(h.registry("stable"), Some(FakeEngine::build_id(FIRST)));
        assert_eq!(h.registry("latest"), Some(FakeEngine::build_id("0123abc")));
    }
}

mod manual {
    use super::*;

    #[tokio::test]
    async fn manual_rollback_reverts_workload_and_tags() {
        let h = Harness::new();
        h.run(FIRST).await;
        h.run(SECOND).await;

        let restored = manual_rollback(&h.config, &h.adapters).await.unwrap();

        assert_eq!(restored.as_str(), FakeEngine::build_id(FIRST));
        assert_eq!(h.cluster.image(), Some(h.reference(FIRST)));
        assert_eq!(h.registry("latest"), Some(FakeEngine::build_id(FIRST)));
    }

    #[tokio::test]
    async fn manual_rollback_without_history_is_fatal() {
        let h = Harness::new();

        let err = manual_rollback(&h.config, &h.adapters).await.unwrap_err();

        assert_eq!(err.class(), ErrorClass::Fatal);
    }
}
