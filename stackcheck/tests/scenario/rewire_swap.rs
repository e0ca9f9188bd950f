//! Rewiring transiency edges must be judged on the settled state only,
//! even when the rewrite passes through a momentary cycle.

use stackcheck::{ScenarioRunner, SimWindowManager, WindowKind};

use super::util;

#[tokio::test]
async fn swap_through_momentary_cycle_settles_to_new_chain() {
    for seed in [0, 3, 17, 99] {
        let mut run = ScenarioRunner::new(SimWindowManager::new(seed), util::fast_settle());
        run.discover_desktop().await.expect("desktop");
        let app = run.create(WindowKind::Application, None).await.expect("app");
        let d1 = run.create(WindowKind::Dialog, Some(&app)).await.expect("d1");
        let d2 = run.create(WindowKind::Dialog, Some(&d1)).await.expect("d2");
        run.settle().await.expect("settle");

        // First rewrite makes d1 transient for d2 while d2 is still
        // transient for d1: a cycle, tolerated until the second rewrite.
        run.rewire(&d1, &d2).await.expect("rewire d1");
        run.rewire(&d2, &app).await.expect("rewire d2");
        run.settle().await.expect("settle");
        run.check("settled state matches the new edges only")
            .await
            .expect("check");

        let report = run.finish().await;
        assert!(report.passed(), "seed {seed} failed:\n{report}");
    }
}

#[tokio::test]
async fn registry_reflects_rewires_not_history() {
    let mut run = ScenarioRunner::new(SimWindowManager::new(5), util::fast_settle());
    run.discover_desktop().await.expect("desktop");
    let app = run.create(WindowKind::Application, None).await.expect("app");
    let d1 = run.create(WindowKind::Dialog, Some(&app)).await.expect("d1");
    let d2 = run.create(WindowKind::Dialog, Some(&d1)).await.expect("d2");
    run.rewire(&d1, &d2).await.expect("rewire d1");
    run.rewire(&d2, &app).await.expect("rewire d2");

    let constraints = run.registry().ordering_constraints();
    assert!(
        constraints
            .iter()
            .any(|c| c.above == d1 && c.below == d2)
    );
    assert!(
        constraints
            .iter()
            .any(|c| c.above == d2 && c.below == app)
    );
    // The replaced d2-above-d1 edge must be gone.
    assert!(
        !constraints
            .iter()
            .any(|c| c.above == d2 && c.below == d1)
    );
}
