// tests/pipeline_scenarios.rs
//
// End-to-end pipeline runs against local model stubs, a stub timeline,
// and the in-memory access store.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use author_sex_estimator::align::{to_percentage, AlignedOutcome};
use author_sex_estimator::error::ValidationError;
use author_sex_estimator::messages::Message;
use author_sex_estimator::record::MemoryAccessStore;
use author_sex_estimator::Submission;
use common::{make_post, pipeline, ModelStub, StubTimeline};

fn submission(account: &str, tweet: &str) -> Submission {
    Submission {
        account: Some(account.to_string()),
        tweet: Some(tweet.to_string()),
    }
}

#[tokio::test]
async fn missing_input_skips_remote_calls_but_still_records() {
    let stub = ModelStub::start().await;
    let timeline = StubTimeline::with_posts(vec![]);
    let store = Arc::new(MemoryAccessStore::new());
    let p = pipeline(stub.config(), timeline.clone(), store.clone());

    let report = p.run(&submission("", ""), Vec::new()).await;

    assert_eq!(report.errors, vec![Message::MissingInput]);
    assert!(!report.analyzed());
    assert_eq!(report.sex, AlignedOutcome::UNDETERMINED);
    assert_eq!(stub.vectorize_calls(), 0);
    assert_eq!(stub.classify_calls(), 0);
    assert_eq!(timeline.calls(), 0);

    let rows = store.snapshot();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].account, "-");
    assert_eq!(rows[0].predicted_sex, -1);
    assert_eq!(rows[0].probability_sex, 0.0);
}

#[tokio::test]
async fn free_text_is_normalized_before_vectorizing() {
    let stub = ModelStub::start().await;
    let store = Arc::new(MemoryAccessStore::new());
    let p = pipeline(stub.config(), StubTimeline::with_posts(vec![]), store.clone());

    let report = p.run(&submission("", "hello\r\nworld"), Vec::new()).await;

    assert!(report.analyzed(), "errors: {:?}", report.errors);
    let sent = stub.state.vectorize_inputs.lock()[0].clone();
    assert_eq!(sent["strData"], "hello,world#DEMI#");
    assert_eq!(store.snapshot()[0].tweet, "hello,world#DEMI#");
}

#[tokio::test]
async fn predicted_class_zero_is_rebased_onto_the_positive_class() {
    let stub = ModelStub::start().await;
    stub.set_classify_values(vec![0.8, 0.0]);
    let store = Arc::new(MemoryAccessStore::new());
    let p = pipeline(stub.config(), StubTimeline::with_posts(vec![]), store.clone());

    let report = p.run(&submission("", "some text"), Vec::new()).await;

    assert!(report.analyzed());
    assert_eq!(report.sex.probability, 0.8);
    assert_eq!(report.sex.predicted_class, 0);
    let shown = report.sex.positive_probability();
    assert!((shown - 0.2).abs() < 1e-12);
    assert_eq!(to_percentage(shown), 20.0);

    // The record keeps the raw pair, not the display value.
    let row = &store.snapshot()[0];
    assert_eq!((row.predicted_sex, row.probability_sex), (0, 0.8));
    assert_eq!((row.predicted_engineer, row.probability_engineer), (0, 0.0));
}

#[tokio::test]
async fn external_link_posts_never_reach_the_vectorizer() {
    let stub = ModelStub::start().await;
    let timeline = StubTimeline::with_posts(vec![
        make_post("morning coffee", &[], &[]),
        make_post("must read https://t.co/zz", &["https://news.example.com/story"], &[]),
        make_post("cat https://t.co/p1", &[], &["photo"]),
    ]);
    let store = Arc::new(MemoryAccessStore::new());
    let p = pipeline(stub.config(), timeline.clone(), store.clone());

    let report = p.run(&submission("someone", ""), Vec::new()).await;

    assert!(report.analyzed(), "errors: {:?}", report.errors);
    assert!(report.request.sourced_from_timeline);
    let sent = stub.state.vectorize_inputs.lock()[0].clone();
    assert_eq!(sent["strData"], "morning coffee,cat .PHOTOIMAGE.");
    assert!(!sent["strData"].as_str().unwrap_or_default().contains("must read"));
    assert_eq!(store.snapshot()[0].account, "someone");
}

#[tokio::test]
async fn vectorizer_failure_blocks_classify_and_records_sentinel() {
    let stub = ModelStub::start().await;
    stub.fail_vectorizer_with(&[500]);
    let store = Arc::new(MemoryAccessStore::new());
    let p = pipeline(stub.config(), StubTimeline::with_posts(vec![]), store.clone());

    let report = p.run(&submission("", "hello"), Vec::new()).await;

    assert_eq!(report.errors, vec![Message::General]);
    assert_eq!(report.sex, AlignedOutcome::UNDETERMINED);
    assert_eq!(stub.vectorize_calls(), 1);
    assert_eq!(stub.classify_calls(), 0, "classify must not run after vectorize failed");

    let rows = store.snapshot();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].predicted_sex, -1);
    assert_eq!(rows[0].probability_sex, 0.0);
}

#[tokio::test]
async fn retry_keeps_classify_after_vectorize() {
    let stub = ModelStub::start().await;
    stub.fail_vectorizer_with(&[502]);
    let mut cfg = stub.config();
    cfg.remote_max_attempts = 2;
    let store = Arc::new(MemoryAccessStore::new());
    let p = pipeline(cfg, StubTimeline::with_posts(vec![]), store.clone());

    let report = p.run(&submission("", "hello"), Vec::new()).await;

    assert!(report.analyzed());
    assert_eq!(stub.vectorize_calls(), 2);
    assert_eq!(stub.classify_calls(), 1);
}

#[tokio::test]
async fn classifier_failure_is_a_general_error() {
    let stub = ModelStub::start().await;
    *stub.state.classify_status.lock() = Some(503);
    let store = Arc::new(MemoryAccessStore::new());
    let p = pipeline(stub.config(), StubTimeline::with_posts(vec![]), store.clone());

    let report = p.run(&submission("", "hello"), Vec::new()).await;

    assert_eq!(report.errors, vec![Message::General]);
    assert_eq!(report.sex, AlignedOutcome::UNDETERMINED);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn empty_timeline_is_zero_content_and_padded() {
    let stub = ModelStub::start().await;
    let store = Arc::new(MemoryAccessStore::new());
    let p = pipeline(stub.config(), StubTimeline::with_posts(vec![]), store.clone());

    let t0 = Instant::now();
    let report = p.run(&submission("quiet_account", ""), Vec::new()).await;

    assert_eq!(report.errors, vec![Message::ZeroContent]);
    assert_eq!(stub.vectorize_calls(), 0);
    assert_eq!(store.snapshot()[0].account, "quiet_account");
    assert_eq!(store.snapshot()[0].tweet, "");
    assert!(t0.elapsed() >= Duration::from_millis(1_000), "{:?}", t0.elapsed());
}

#[tokio::test]
async fn failed_timeline_read_is_distinguishable_from_empty() {
    let stub = ModelStub::start().await;
    let timeline = StubTimeline::failing();
    let store = Arc::new(MemoryAccessStore::new());
    let p = pipeline(stub.config(), timeline.clone(), store.clone());

    let report = p.run(&submission("someone", ""), Vec::new()).await;

    assert_eq!(report.errors, vec![Message::SourceUnavailable]);
    assert_eq!(timeline.calls(), 1);
    assert_eq!(stub.vectorize_calls(), 0);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn direct_text_is_not_padded() {
    let stub = ModelStub::start().await;
    let p = pipeline(
        stub.config(),
        StubTimeline::with_posts(vec![]),
        Arc::new(MemoryAccessStore::new()),
    );
    let t0 = Instant::now();
    let report = p.run(&submission("", "quick"), Vec::new()).await;
    assert!(report.analyzed());
    assert!(t0.elapsed() < Duration::from_millis(900), "{:?}", t0.elapsed());
}

#[tokio::test]
async fn rejected_body_still_records_once() {
    let stub = ModelStub::start().await;
    let store = Arc::new(MemoryAccessStore::new());
    let p = pipeline(stub.config(), StubTimeline::with_posts(vec![]), store.clone());

    let report = p
        .run(&Submission::default(), vec![ValidationError::InvalidOperation])
        .await;

    assert_eq!(
        report.errors,
        vec![Message::InvalidOperation, Message::MissingInput]
    );
    assert_eq!(store.len(), 1);
    assert_eq!(stub.vectorize_calls(), 0);
}

#[tokio::test]
async fn persistence_failure_surfaces_as_general_error() {
    let stub = ModelStub::start().await;
    let p = author_sex_estimator::Pipeline::new(
        stub.config(),
        reqwest::Client::new(),
        StubTimeline::with_posts(vec![]),
        Arc::new(common::BrokenStore),
    );

    let report = p.run(&submission("", "hello"), Vec::new()).await;

    assert_eq!(report.errors, vec![Message::General]);
    // Inference already happened and is not rolled back.
    assert_eq!(stub.classify_calls(), 1);
    assert_eq!(report.sex.predicted_class, 0);
}

#[tokio::test]
async fn engineer_classifier_result_is_recorded_when_wired() {
    let stub = ModelStub::start().await;
    let mut cfg = stub.config();
    cfg.engineer_url = Some(stub.url("/engineer"));
    let store = Arc::new(MemoryAccessStore::new());
    let p = pipeline(cfg, StubTimeline::with_posts(vec![]), store.clone());

    let report = p.run(&submission("", "hello"), Vec::new()).await;

    assert!(report.analyzed());
    assert_eq!(
        report.engineer,
        Some(AlignedOutcome {
            probability: 0.6,
            predicted_class: 1
        })
    );
    let row = &store.snapshot()[0];
    assert_eq!((row.predicted_engineer, row.probability_engineer), (1, 0.6));
}

#[tokio::test]
async fn concurrent_identical_requests_run_independently() {
    let stub = ModelStub::start().await;
    let store = Arc::new(MemoryAccessStore::new());
    let p = Arc::new(pipeline(
        stub.config(),
        StubTimeline::with_posts(vec![]),
        store.clone(),
    ));

    let a = {
        let p = p.clone();
        tokio::spawn(async move { p.run(&submission("", "same"), Vec::new()).await })
    };
    let b = {
        let p = p.clone();
        tokio::spawn(async move { p.run(&submission("", "same"), Vec::new()).await })
    };
    assert!(a.await.unwrap().analyzed());
    assert!(b.await.unwrap().analyzed());

    assert_eq!(stub.vectorize_calls(), 2);
    assert_eq!(stub.classify_calls(), 2);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn failing_engineer_classifier_is_stored_as_zeros() {
    let stub = ModelStub::start().await;
    stub.set_engineer_values(vec![0.7]);
    let mut cfg = stub.config();
    cfg.engineer_url = Some(stub.url("/engineer"));
    let store = Arc::new(MemoryAccessStore::new());
    let p = pipeline(cfg, StubTimeline::with_posts(vec![]), store.clone());

    let report = p.run(&submission("", "hello"), Vec::new()).await;

    assert!(report.analyzed(), "secondary failure is not a caller error");
    assert_eq!(report.engineer, Some(AlignedOutcome::UNDETERMINED));
    assert_eq!(stub.engineer_calls(), 1);
    let row = &store.snapshot()[0];
    assert_eq!((row.predicted_sex, row.probability_sex), (0, 0.8));
    assert_eq!((row.predicted_engineer, row.probability_engineer), (0, 0.0));
}

#[tokio::test]
async fn engineer_is_stored_as_zeros_when_primary_fails() {
    let stub = ModelStub::start().await;
    *stub.state.classify_status.lock() = Some(500);
    let mut cfg = stub.config();
    cfg.engineer_url = Some(stub.url("/engineer"));
    let store = Arc::new(MemoryAccessStore::new());
    let p = pipeline(cfg, StubTimeline::with_posts(vec![]), store.clone());

    let report = p.run(&submission("", "hello"), Vec::new()).await;

    assert_eq!(report.errors, vec![Message::General]);
    assert_eq!(stub.engineer_calls(), 0);
    let row = &store.snapshot()[0];
    assert_eq!((row.predicted_sex, row.probability_sex), (-1, 0.0));
    assert_eq!((row.predicted_engineer, row.probability_engineer), (0, 0.0));
}

#[tokio::test]
async fn non_binary_class_label_is_a_general_error() {
    for label in [2.0, -3.0, 0.9] {
        let stub = ModelStub::start().await;
        stub.set_classify_values(vec![0.8, label]);
        let store = Arc::new(MemoryAccessStore::new());
        let p = pipeline(stub.config(), StubTimeline::with_posts(vec![]), store.clone());

        let report = p.run(&submission("", "hello"), Vec::new()).await;

        assert_eq!(report.errors, vec![Message::General], "label {label}");
        assert_eq!(report.sex, AlignedOutcome::UNDETERMINED);
        assert_eq!(store.snapshot()[0].predicted_sex, -1);
    }
}

#[tokio::test]
async fn overlong_handle_is_recorded_without_failing() {
    let stub = ModelStub::start().await;
    let store = Arc::new(MemoryAccessStore::new());
    let p = pipeline(
        stub.config(),
        StubTimeline::with_posts(vec![make_post("hi", &[], &[])]),
        store.clone(),
    );
    let handle = "a".repeat(200);

    let report = p.run(&submission(&handle, ""), Vec::new()).await;

    assert!(report.analyzed(), "errors: {:?}", report.errors);
    assert_eq!(store.snapshot()[0].account, "a".repeat(64));
}
