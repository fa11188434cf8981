use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use pipeline_core::{
    FeatureEngineeringRequest, JobKind, JobRequest, JobStatus, Notice, NoticeKind,
    PreprocessRequest, TrainingRequest,
};
use pipeline_engine::{
    BackendSettings, EngineSettings, FailureKind, JobPoller, PipelineClient, PollSettings,
    SaveError, StartError, ToastSink,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(pipeline_logging::initialize_for_tests);
}

#[derive(Default)]
struct RecordingSink {
    shown: Mutex<Vec<Notice>>,
}

impl RecordingSink {
    fn shown(&self) -> Vec<Notice> {
        self.shown.lock().unwrap().clone()
    }
}

impl ToastSink for RecordingSink {
    fn show(&self, notice: &Notice) {
        self.shown.lock().unwrap().push(notice.clone());
    }
}

fn fast_polling() -> PollSettings {
    PollSettings {
        poll_interval: Duration::from_millis(20),
        clock_interval: Duration::from_millis(5),
        preprocess_auto_reset: None,
        training_auto_reset: None,
        feature_engineering_auto_reset: None,
    }
}

fn poller_for(server: &MockServer, poll: PollSettings) -> (JobPoller, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let settings = EngineSettings {
        backend: BackendSettings {
            base_url: Url::parse(&server.uri()).unwrap(),
            ..BackendSettings::default()
        },
        poll,
    };
    let client = PipelineClient::new(settings, sink.clone()).unwrap();
    (client.job_poller(), sink)
}

async fn requests_to(server: &MockServer, prefix: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path().starts_with(prefix))
        .count()
}

fn sales_request() -> JobRequest {
    JobRequest::Preprocess(PreprocessRequest::new(
        "sales.csv",
        json!({ "removeDuplicates": true }),
    ))
}

async fn mount_start(server: &MockServer, job_id: &str) {
    Mock::given(method("POST"))
        .and(path("/api/data/preprocess/sales.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "job_id": job_id })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn sales_job_runs_to_completion() {
    init_logging();
    let server = MockServer::start().await;
    mount_start(&server, "abc123").await;
    Mock::given(method("GET"))
        .and(path("/api/data/preprocess/status/abc123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": "pending", "progress": 0 })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/data/preprocess/status/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "progress": 100,
            "result": { "rows": 500 },
        })))
        .mount(&server)
        .await;

    let (poller, sink) = poller_for(&server, fast_polling());
    let job_id = poller.start(sales_request()).await.expect("start ok");
    assert_eq!(job_id, "abc123");

    let view = poller.wait_until_settled().await;
    assert_eq!(view.status, JobStatus::Completed);
    assert_eq!(view.progress, 100.0);
    assert_eq!(view.result, Some(json!({ "rows": 500 })));
    assert_eq!(view.error, None);
    assert_eq!(view.job_id, None);

    let polls = requests_to(&server, "/api/data/preprocess/status").await;
    assert_eq!(polls, 2);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(requests_to(&server, "/api/data/preprocess/status").await, polls);
    assert!(!poller.is_polling());

    let kinds: Vec<_> = sink.shown().iter().map(|notice| notice.kind).collect();
    assert_eq!(kinds.first(), Some(&NoticeKind::Success));
}

#[tokio::test]
async fn reset_mid_poll_stops_requests_and_clears_state() {
    init_logging();
    let server = MockServer::start().await;
    mount_start(&server, "abc123").await;
    Mock::given(method("GET"))
        .and(path("/api/data/preprocess/status/abc123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": "running", "progress": 10 })),
        )
        .mount(&server)
        .await;

    let (poller, _sink) = poller_for(&server, fast_polling());
    poller.start(sales_request()).await.expect("start ok");
    tokio::time::sleep(Duration::from_millis(70)).await;
    assert_eq!(poller.snapshot().status, JobStatus::Running);

    poller.reset();
    assert!(!poller.is_polling());

    // Let a request already on the wire land before counting.
    tokio::time::sleep(Duration::from_millis(30)).await;
    let after_reset = requests_to(&server, "/api/data/preprocess/status").await;
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(
        requests_to(&server, "/api/data/preprocess/status").await,
        after_reset
    );

    let view = poller.snapshot();
    assert_eq!(view.status, JobStatus::Idle);
    assert_eq!(view.progress, 0.0);
    assert_eq!(view.job_id, None);
    assert_eq!(view.elapsed, Duration::ZERO);
    assert_eq!(view.result, None);
    assert_eq!(view.error, None);

    // Idempotent.
    poller.reset();
    assert_eq!(poller.snapshot().status, JobStatus::Idle);
}

#[tokio::test]
async fn empty_filename_never_reaches_the_backend() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "job_id": "x" })))
        .expect(0)
        .mount(&server)
        .await;

    let (poller, sink) = poller_for(&server, fast_polling());
    let request = JobRequest::Preprocess(PreprocessRequest::new("", json!({})));

    let err = poller.start(request).await.unwrap_err();
    let reason = "Please select a dataset before running preprocessing.";
    assert_eq!(err, StartError::Validation(reason.to_string()));
    assert_eq!(poller.snapshot().status, JobStatus::Idle);

    let shown = sink.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].key(), format!("error::{reason}"));
    assert!(poller.notifier().is_active(&format!("error::{reason}")));
}

#[tokio::test]
async fn start_failure_is_returned_and_nothing_is_polled() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "bad steps" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (poller, sink) = poller_for(&server, fast_polling());
    let err = poller.start(sales_request()).await.unwrap_err();

    match err {
        StartError::Request(err) => {
            assert_eq!(err.kind, FailureKind::HttpStatus(400));
            assert_eq!(err.message, "bad steps");
        }
        other => panic!("unexpected error {other:?}"),
    }
    let view = poller.snapshot();
    assert_eq!(view.status, JobStatus::Failed);
    assert_eq!(view.error.as_deref(), Some("bad steps"));
    assert_eq!(view.result, None);
    assert_eq!(sink.shown()[0].message, "Failed to preprocess: bad steps");

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(requests_to(&server, "/api/data/preprocess/status").await, 0);
}

#[tokio::test]
async fn failed_poll_ends_the_job_without_retry() {
    init_logging();
    let server = MockServer::start().await;
    mount_start(&server, "abc123").await;
    Mock::given(method("GET"))
        .and(path_regex("^/api/data/preprocess/status/.*$"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (poller, sink) = poller_for(&server, fast_polling());
    poller.start(sales_request()).await.expect("start ok");

    let view = poller.wait_until_settled().await;
    assert_eq!(view.status, JobStatus::Failed);
    assert_eq!(view.message, "Progress tracking interrupted");
    assert_eq!(
        view.error.as_deref(),
        Some("Unable to fetch preprocessing status")
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(requests_to(&server, "/api/data/preprocess/status").await, 1);
    assert!(sink
        .shown()
        .iter()
        .any(|notice| notice.kind == NoticeKind::Error));
}

#[tokio::test]
async fn finished_preprocessing_returns_to_idle_after_delay() {
    init_logging();
    let server = MockServer::start().await;
    mount_start(&server, "abc123").await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "completed" })))
        .mount(&server)
        .await;

    let poll = PollSettings {
        preprocess_auto_reset: Some(Duration::from_millis(40)),
        ..fast_polling()
    };
    let (poller, _sink) = poller_for(&server, poll);
    poller.start(sales_request()).await.expect("start ok");

    let mut rx = poller.subscribe();
    let settled = poller.wait_until_settled().await;
    assert_eq!(settled.status, JobStatus::Completed);

    let idle = rx
        .wait_for(|view| view.status == JobStatus::Idle)
        .await
        .map(|view| view.clone())
        .unwrap();
    assert_eq!(idle.result, None);
    assert_eq!(idle.progress, 0.0);
}

#[tokio::test]
async fn elapsed_time_advances_while_running() {
    init_logging();
    let server = MockServer::start().await;
    mount_start(&server, "abc123").await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "running" })))
        .mount(&server)
        .await;

    let (poller, _sink) = poller_for(&server, fast_polling());
    poller.start(sales_request()).await.expect("start ok");
    tokio::time::sleep(Duration::from_millis(60)).await;

    let first = poller.snapshot().elapsed;
    assert!(first > Duration::ZERO);
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(poller.snapshot().elapsed > first);
    poller.reset();
}

#[tokio::test]
async fn completed_training_model_can_be_saved() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/model-training/training/train/sales.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "job_id": "t-1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/model-training/training/status/t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "progress": 100,
            "result": { "best_model": { "model_name": "random_forest" } },
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/model-training/training/save/t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "model_id": "m-7" })))
        .expect(1)
        .mount(&server)
        .await;

    let (poller, sink) = poller_for(&server, fast_polling());
    assert_eq!(poller.save_model().await, Err(SaveError::NothingToSave));

    let request = JobRequest::Training(TrainingRequest::new("sales.csv", "churn"));
    poller.start(request).await.expect("start ok");
    let view = poller.wait_until_settled().await;
    assert_eq!(view.status, JobStatus::Completed);
    assert_eq!(view.saved_model_id, None);

    assert_eq!(poller.save_model().await.unwrap(), "m-7");
    assert_eq!(poller.snapshot().saved_model_id.as_deref(), Some("m-7"));

    let keys: Vec<_> = sink.shown().iter().map(Notice::key).collect();
    assert_eq!(keys.first().map(String::as_str), Some("train-save-error"));
}

#[tokio::test]
async fn reset_during_submission_drops_the_late_acceptance() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/data/preprocess/sales.csv"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "job_id": "abc123" }))
                .set_delay(Duration::from_millis(60)),
        )
        .mount(&server)
        .await;

    let (poller, _sink) = poller_for(&server, fast_polling());
    let starter = poller.clone();
    let pending = tokio::spawn(async move { starter.start(sales_request()).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(poller.snapshot().status, JobStatus::Queued);
    poller.reset();

    let outcome = pending.await.unwrap();
    assert_eq!(
        outcome,
        Err(StartError::Superseded {
            job_id: "abc123".to_string()
        })
    );

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(requests_to(&server, "/api/data/preprocess/status").await, 0);
    assert_eq!(poller.snapshot().status, JobStatus::Idle);
    assert!(!poller.is_polling());
}

#[tokio::test]
async fn feature_engineering_job_runs_to_completion() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/feature-engineering/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "job_id": "fe-1" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/feature-engineering/status/fe-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": "running", "progress": 40 })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/feature-engineering/status/fe-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "progress": 100,
            "result": { "new_columns": ["price_log"] },
        })))
        .mount(&server)
        .await;

    let (poller, sink) = poller_for(&server, fast_polling());
    let request = JobRequest::FeatureEngineering(FeatureEngineeringRequest::new(
        "sales.csv",
        json!([{ "type": "log_transform", "column": "price" }]),
    ));
    assert_eq!(poller.start(request).await.expect("start ok"), "fe-1");

    let view = poller.wait_until_settled().await;
    assert_eq!(view.kind, Some(JobKind::FeatureEngineering));
    assert_eq!(view.status, JobStatus::Completed);
    assert_eq!(view.progress, 100.0);
    assert_eq!(view.result, Some(json!({ "new_columns": ["price_log"] })));
    assert_eq!(view.job_id, None);

    let polls = requests_to(&server, "/api/feature-engineering/status").await;
    assert_eq!(polls, 2);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(
        requests_to(&server, "/api/feature-engineering/status").await,
        polls
    );

    let first = &sink.shown()[0];
    assert_eq!(
        first.message,
        "Feature engineering started. We'll keep you posted on progress."
    );
}
