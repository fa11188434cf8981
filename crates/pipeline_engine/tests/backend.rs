use pipeline_core::{
    FeatureEngineeringRequest, JobKind, JobRequest, JobStatus, PreprocessRequest, ProblemType,
    TrainingRequest,
};
use pipeline_engine::{BackendSettings, FailureKind, JobBackend, ReqwestBackend};
use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer) -> ReqwestBackend {
    let settings = BackendSettings {
        base_url: Url::parse(&server.uri()).unwrap(),
        ..BackendSettings::default()
    };
    ReqwestBackend::new(settings).unwrap()
}

#[tokio::test]
async fn preprocess_submission_posts_steps_to_base_filename() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/data/preprocess/sales.csv"))
        .and(body_json(json!({ "steps": { "removeDuplicates": true } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "job_id": "abc123" })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let request = JobRequest::Preprocess(PreprocessRequest::new(
        "uploads/2024/sales.csv",
        json!({ "removeDuplicates": true }),
    ));

    let job_id = backend.submit(&request).await.expect("submit ok");
    assert_eq!(job_id, "abc123");
}

#[tokio::test]
async fn training_submission_sends_full_config() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/model-training/training/train/sales.csv"))
        .and(body_json(json!({
            "target_column": "price",
            "problem_type": "regression",
            "test_size": 0.2,
            "random_state": 42,
            "models_to_train": ["linear_regression", "random_forest"],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "job_id": 17 })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let mut training = TrainingRequest::new("sales.csv", "price");
    training.problem_type = ProblemType::Regression;
    training.models_to_train = Some(vec![
        "linear_regression".to_string(),
        "random_forest".to_string(),
    ]);

    let job_id = backend
        .submit(&JobRequest::Training(training))
        .await
        .expect("submit ok");
    assert_eq!(job_id, "17");
}

#[tokio::test]
async fn submission_error_prefers_detail_from_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/data/preprocess/sales.csv"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "detail": "Unknown step: explode" })),
        )
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let request = JobRequest::Preprocess(PreprocessRequest::new("sales.csv", json!({})));

    let err = backend.submit(&request).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(422));
    assert_eq!(err.message, "Unknown step: explode");
}

#[tokio::test]
async fn submission_error_falls_back_to_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let request = JobRequest::Preprocess(PreprocessRequest::new("sales.csv", json!({})));

    let err = backend.submit(&request).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(500));
    assert_eq!(err.message, "Failed to start preprocessing job");
}

#[tokio::test]
async fn submission_without_job_id_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let request = JobRequest::Preprocess(PreprocessRequest::new("sales.csv", json!({})));

    let err = backend.submit(&request).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::MissingJobId);
    assert_eq!(err.message, "Failed to obtain preprocessing job identifier");
}

#[tokio::test]
async fn status_payload_maps_optional_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/data/preprocess/status/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "running",
            "progress": 37.5,
            "message": "Dropping duplicates",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/model-training/training/status/t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "warming_up",
            "progress": null,
            "result": null,
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);

    let report = backend
        .status(JobKind::Preprocess, "abc123")
        .await
        .expect("status ok");
    assert_eq!(report.status, Some(JobStatus::Running));
    assert_eq!(report.progress, Some(37.5));
    assert_eq!(report.message.as_deref(), Some("Dropping duplicates"));
    assert_eq!(report.result, None);

    let report = backend
        .status(JobKind::Training, "t-1")
        .await
        .expect("status ok");
    assert_eq!(report.status, None);
    assert_eq!(report.progress, None);
    assert_eq!(report.result, None);
}

#[tokio::test]
async fn malformed_status_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend
        .status(JobKind::Preprocess, "abc123")
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::MalformedBody);
}

#[tokio::test]
async fn save_model_returns_model_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/model-training/training/save/t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "model_id": "m-42" })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    assert_eq!(backend.save_model("t-1").await.unwrap(), "m-42");
}

#[tokio::test]
async fn feature_engineering_posts_full_filename_and_steps_to_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/feature-engineering/run"))
        .and(body_json(json!({
            "filename": "uploads/sales.csv",
            "steps": [{ "type": "one_hot", "column": "region" }],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "job_id": "fe-9" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/feature-engineering/status/fe-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "running",
            "progress": 55,
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let request = JobRequest::FeatureEngineering(FeatureEngineeringRequest::new(
        "uploads/sales.csv",
        json!([{ "type": "one_hot", "column": "region" }]),
    ));

    let job_id = backend.submit(&request).await.expect("submit ok");
    assert_eq!(job_id, "fe-9");

    let report = backend
        .status(JobKind::FeatureEngineering, "fe-9")
        .await
        .expect("status ok");
    assert_eq!(report.status, Some(JobStatus::Running));
    assert_eq!(report.progress, Some(55.0));
}

#[tokio::test]
async fn feature_engineering_errors_use_its_fallbacks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/feature-engineering/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let request =
        JobRequest::FeatureEngineering(FeatureEngineeringRequest::new("sales.csv", json!([])));

    let err = backend.submit(&request).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::MissingJobId);
    assert_eq!(
        err.message,
        "Failed to obtain feature engineering job identifier"
    );

    let err = backend
        .status(JobKind::FeatureEngineering, "fe-1")
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(502));
    assert_eq!(err.message, "Unable to fetch feature engineering status");
}
