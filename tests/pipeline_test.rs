mod common;

use casework::error::Error;
use casework::locator::{DEFAULT_BASE_URL, Locator};
use casework::model::{
    FindingStatus, ResultPayload, UnitId, UnitInput, UnitState, UnitType, Verdict,
};
use casework::pipeline::Pipeline;
use casework::store::Store;
use common::{single_claim_catalog, submission, verified};
use serde_json::Map;

async fn pipeline() -> Pipeline {
    let catalog = single_claim_catalog();
    let locator = Locator::new(DEFAULT_BASE_URL, catalog.ranges.clone()).unwrap();
    let store = Store::in_memory().await.unwrap();
    Pipeline::new(&catalog, locator, store)
}

/// Generate and assign the single verify unit.
async fn assigned_unit(pipeline: &Pipeline) -> UnitId {
    let unit = pipeline.next_unit(UnitType::VerifyFinding).unwrap();
    pipeline.assign(unit.unit_id.as_str(), "w1").unwrap();
    unit.unit_id
}

#[tokio::test]
async fn verified_claim_produces_one_accepted_finding() {
    let pipeline = pipeline().await;
    let unit = pipeline.next_unit(UnitType::VerifyFinding).unwrap();
    match &unit.input {
        UnitInput::VerifyFinding { document_urls, .. } => assert_eq!(
            document_urls[0].as_str(),
            "https://www.justice.gov/epstein/files/DataSet%209/EFTA00039186.pdf"
        ),
        other => panic!("unexpected input {other:?}"),
    }
    pipeline.assign(unit.unit_id.as_str(), "w1").unwrap();

    let outcome = pipeline
        .submit(submission(&unit.unit_id, "w1", verified(&["EFTA00039186"])))
        .await
        .unwrap();
    assert!(outcome.accepted);

    let findings = pipeline
        .store()
        .get_findings_for_document("EFTA00039186")
        .await
        .unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].status, FindingStatus::Accepted);
    assert_eq!(findings[0].citations.len(), 1);
    assert_eq!(findings[0].citations[0].document_id, "EFTA00039186");
    assert_eq!(Some(findings[0].finding_id.clone()), outcome.finding_id);

    assert_eq!(
        pipeline.generator().unit_state(unit.unit_id.as_str()).unwrap(),
        UnitState::Completed
    );
    assert!(matches!(
        pipeline.next_unit(UnitType::VerifyFinding),
        Err(Error::NotAvailable(_))
    ));
}

#[tokio::test]
async fn unknown_unit_is_not_found() {
    let pipeline = pipeline().await;
    let result = pipeline
        .submit(submission(
            &UnitId::from("verify-000000000000"),
            "w1",
            verified(&["EFTA00039186"]),
        ))
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn submit_before_assignment_is_invalid_state() {
    let pipeline = pipeline().await;
    let unit = pipeline.next_unit(UnitType::VerifyFinding).unwrap();
    let result = pipeline
        .submit(submission(&unit.unit_id, "w1", verified(&["EFTA00039186"])))
        .await;
    assert!(matches!(
        result,
        Err(Error::InvalidState {
            from: UnitState::Generated,
            to: UnitState::Completed,
            ..
        })
    ));
    assert_eq!(pipeline.store().count_by_status().await.unwrap().total(), 0);
}

#[tokio::test]
async fn submit_after_release_is_invalid_state() {
    let pipeline = pipeline().await;
    let unit_id = assigned_unit(&pipeline).await;
    pipeline.release(unit_id.as_str()).unwrap();
    let result = pipeline
        .submit(submission(&unit_id, "w1", verified(&["EFTA00039186"])))
        .await;
    assert!(matches!(
        result,
        Err(Error::InvalidState {
            from: UnitState::Released,
            ..
        })
    ));
}

#[tokio::test]
async fn payload_type_must_match_unit_type() {
    let pipeline = pipeline().await;
    let unit_id = assigned_unit(&pipeline).await;
    let chain = ResultPayload::DecisionChain {
        communication_graph: Vec::new(),
        patterns_observed: Vec::new(),
        extensions: Map::new(),
    };
    let result = pipeline.submit(submission(&unit_id, "w1", chain)).await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(
        pipeline.generator().unit_state(unit_id.as_str()).unwrap(),
        UnitState::Assigned
    );
}

#[tokio::test]
async fn resubmission_after_completion_returns_existing_finding() {
    let pipeline = pipeline().await;
    let unit_id = assigned_unit(&pipeline).await;

    let first = pipeline
        .submit(submission(&unit_id, "w1", verified(&["EFTA00039186"])))
        .await
        .unwrap();
    let second = pipeline
        .submit(submission(&unit_id, "w1", verified(&["EFTA00039186"])))
        .await
        .unwrap();

    assert!(second.accepted);
    assert_eq!(first.finding_id, second.finding_id);
    assert_eq!(pipeline.store().count_by_status().await.unwrap().accepted, 1);
}

#[tokio::test]
async fn pii_submission_completes_the_unit_as_quarantined() {
    let pipeline = pipeline().await;
    let unit_id = assigned_unit(&pipeline).await;
    let result = ResultPayload::VerifyFinding {
        verdict: Verdict::Verified,
        reasoning: "Contact at (212) 555-0199.".to_string(),
        citations: Vec::new(),
        extensions: Map::new(),
    };

    let outcome = pipeline
        .submit(submission(&unit_id, "w1", result))
        .await
        .unwrap();
    assert!(outcome.pii_detected);
    assert_eq!(outcome.status, Some(FindingStatus::Quarantined));
    assert_eq!(
        pipeline.generator().unit_state(unit_id.as_str()).unwrap(),
        UnitState::Completed
    );
    assert_eq!(
        pipeline.store().count_by_status().await.unwrap().quarantined,
        1
    );
}

#[tokio::test]
async fn quarantined_unit_never_gains_an_accepted_finding() {
    let pipeline = pipeline().await;
    let unit_id = assigned_unit(&pipeline).await;
    let leaky = ResultPayload::VerifyFinding {
        verdict: Verdict::Verified,
        reasoning: "Contact at (212) 555-0199.".to_string(),
        citations: Vec::new(),
        extensions: Map::new(),
    };
    let first = pipeline
        .submit(submission(&unit_id, "w1", leaky))
        .await
        .unwrap();
    assert_eq!(first.status, Some(FindingStatus::Quarantined));

    let clean = pipeline
        .submit(submission(&unit_id, "w2", verified(&["EFTA00039186"])))
        .await;
    assert!(matches!(
        clean,
        Err(Error::InvalidState {
            from: UnitState::Completed,
            to: UnitState::Completed,
            ..
        })
    ));

    let counts = pipeline.store().count_by_status().await.unwrap();
    assert_eq!(counts.accepted, 0);
    assert_eq!(counts.quarantined, 1);
    assert!(
        pipeline
            .store()
            .get_findings_for_document("EFTA00039186")
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn provenance_failure_leaves_the_unit_assigned() {
    let pipeline = pipeline().await;
    let unit_id = assigned_unit(&pipeline).await;

    let outcome = pipeline
        .submit(submission(&unit_id, "w1", verified(&["EFTA00000999"])))
        .await
        .unwrap();
    assert!(!outcome.accepted);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(
        pipeline.generator().unit_state(unit_id.as_str()).unwrap(),
        UnitState::Assigned
    );

    // The worker may correct the citation and try again.
    let retry = pipeline
        .submit(submission(&unit_id, "w1", verified(&["EFTA00039186"])))
        .await
        .unwrap();
    assert!(retry.accepted);
}

#[tokio::test]
async fn status_reports_generator_store_and_availability() {
    let pipeline = pipeline().await;

    let status = pipeline.status().await.unwrap();
    assert_eq!(status.generator.total_claims, 1);
    assert_eq!(status.generator.generated, 0);
    assert_eq!(
        status.next_unit_available,
        vec![
            (UnitType::VerifyFinding, true),
            (UnitType::DecisionChain, false)
        ]
    );
    assert!(status.coverage.iter().all(|c| c.total == 0 && c.percent == 0.0));

    let unit_id = assigned_unit(&pipeline).await;
    let status = pipeline.status().await.unwrap();
    assert_eq!(status.generator.assigned, 1);
    assert_eq!(status.next_unit_available[0], (UnitType::VerifyFinding, false));

    pipeline
        .submit(submission(&unit_id, "w1", verified(&["EFTA00039186"])))
        .await
        .unwrap();
    let status = pipeline.status().await.unwrap();
    assert_eq!(status.generator.completed, 1);
    assert_eq!(status.findings.accepted, 1);
    assert_eq!(status.coverage[0].unit_type, UnitType::VerifyFinding);
    assert_eq!(status.coverage[0].percent, 100.0);
}
