//! Transient chains must follow their application through
//! iconify/activate cycles.

use stackcheck::{CheckOutcome, SimWindowManager};

use super::util;

#[tokio::test]
async fn full_scenario_passes_across_seeds() {
    for seed in 0..10 {
        let report = util::run_transient_dialog_scenario(SimWindowManager::new(seed))
            .await
            .expect("scenario runs");
        assert!(report.passed(), "seed {seed} failed:\n{report}");
        assert_eq!(report.checks.len(), 4, "seed {seed}");
    }
}

#[tokio::test]
async fn report_counts_and_labels_every_check() {
    let report = util::run_transient_dialog_scenario(SimWindowManager::new(1))
        .await
        .expect("scenario runs");
    assert_eq!(report.passed_count(), 4);
    assert_eq!(report.failed_count(), 0);
    assert!(
        report
            .checks
            .iter()
            .all(|c| c.outcome == CheckOutcome::Passed)
    );
    let rendered = report.to_string();
    assert!(rendered.contains("Passed: 4"));
    assert!(rendered.contains("dialog raised with its application"));
}
