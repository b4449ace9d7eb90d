use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use loan_approval::config::{ArtifactConfig, ServingConfig};
use loan_approval::prediction::{
    evaluate, prediction_router, read_dataset, ArtifactError, ModelName, ModelRegistry,
    PredictionService,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

/// Artifact root in a temporary directory that is removed on drop.
struct ArtifactDir(TempDir);

impl ArtifactDir {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        fs::create_dir(dir.path().join("models")).expect("create models dir");
        Self(dir)
    }

    fn path(&self) -> &Path {
        self.0.path()
    }

    fn write(&self, relative: &str, contents: &Value) {
        fs::write(self.path().join(relative), contents.to_string()).expect("write artifact");
    }

    fn config(&self) -> ArtifactConfig {
        ArtifactConfig {
            dir: self.path().to_path_buf(),
        }
    }
}

fn scaler() -> Value {
    json!({
        "mean": [0.82, 0.65, 0.74, 0.78, 0.13, 5403.0, 1621.0, 146.0, 342.0, 0.85, 1.04],
        "scale": [0.39, 0.48, 1.01, 0.41, 0.34, 6109.0, 2926.0, 84.0, 65.0, 0.35, 0.79],
        "feature_names": [
            "gender", "married", "dependents", "education", "self_employed",
            "applicant_income", "coapplicant_income", "loan_amount", "loan_term",
            "credit_history", "property_area"
        ]
    })
}

fn neural_network() -> Value {
    json!({
        "kind": "neural_network",
        "activation": "relu",
        "layers": [
            {
                "weights": [
                    [0.0, 0.0, 0.0, 0.0, 0.0, 0.4, 0.0, -0.3, 0.0, 1.5, 0.0],
                    [0.0, 0.2, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.5]
                ],
                "biases": [0.0, 0.0]
            },
            { "weights": [[1.0, 0.5]], "biases": [-0.2] }
        ]
    })
}

fn svm() -> Value {
    json!({
        "kind": "svm",
        "kernel": { "type": "rbf", "gamma": 0.1 },
        "support_vectors": [
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.43, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -2.43, 0.0]
        ],
        "dual_coef": [1.0, -1.0],
        "intercept": 0.0,
        "prob_a": -1.5,
        "prob_b": 0.0
    })
}

fn decision_tree() -> Value {
    json!({
        "kind": "decision_tree",
        "nodes": [
            { "split": { "feature": 9, "threshold": 0.0, "left": 1, "right": 2 } },
            { "leaf": { "counts": [40.0, 10.0] } },
            { "leaf": { "counts": [20.0, 80.0] } }
        ]
    })
}

fn knn() -> Value {
    json!({
        "kind": "knn",
        "k": 3,
        "weights": "distance",
        "samples": [
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.43, 1.2],
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.43, -1.3],
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0, -2.43, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0, -0.1, 0.0, 0.0, 0.0, 0.43, 0.0]
        ],
        "labels": [1, 1, 0, 0]
    })
}

fn full_artifacts() -> ArtifactDir {
    let dir = ArtifactDir::new();
    dir.write("scaler.json", &scaler());
    dir.write("models/neural_network.json", &neural_network());
    dir.write("models/svm.json", &svm());
    dir.write("models/decision_tree.json", &decision_tree());
    dir.write("models/knn.json", &knn());
    dir
}

fn example_record() -> Value {
    json!({
        "gender": 1,
        "married": 1,
        "dependents": 0,
        "education": 1,
        "self_employed": 0,
        "applicant_income": 5000,
        "coapplicant_income": 0,
        "loan_amount": 150,
        "loan_term": 360,
        "credit_history": 1.0,
        "property_area": 2
    })
}

async fn post_predict(service: Arc<PredictionService>, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    let response = prediction_router(service)
        .oneshot(request)
        .await
        .expect("router response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    (status, serde_json::from_slice(&bytes).expect("json payload"))
}

#[test]
fn registry_loads_every_artifact_present() {
    let dir = full_artifacts();
    dir.write("models/random_forest.json", &json!({ "kind": "random_forest" }));

    let registry = ModelRegistry::load(dir.path()).expect("registry loads");
    assert_eq!(registry.len(), 4);
    assert_eq!(registry.names(), ModelName::ALL.to_vec());
}

#[test]
fn registry_accepts_a_partial_deployment() {
    let dir = ArtifactDir::new();
    dir.write("models/svm.json", &svm());

    let registry = ModelRegistry::load(dir.path()).expect("registry loads");
    assert_eq!(registry.names(), vec![ModelName::Svm]);
    assert!(!registry.contains(ModelName::NeuralNetwork));
}

#[test]
fn registry_rejects_kind_mismatch() {
    let dir = ArtifactDir::new();
    dir.write("models/svm.json", &knn());

    match ModelRegistry::load(dir.path()) {
        Err(ArtifactError::KindMismatch {
            expected, found, ..
        }) => {
            assert_eq!(expected, "svm");
            assert_eq!(found, "knn");
        }
        other => panic!("expected kind mismatch, got {other:?}"),
    }
}

#[test]
fn registry_requires_at_least_one_model() {
    let dir = ArtifactDir::new();

    match ModelRegistry::load(dir.path()) {
        Err(ArtifactError::NoModels(path)) => assert!(path.ends_with("models")),
        other => panic!("expected no models, got {other:?}"),
    }
}

#[test]
fn startup_fails_on_invalid_parameters() {
    let dir = full_artifacts();
    dir.write(
        "models/knn.json",
        &json!({ "kind": "knn", "k": 5, "samples": [], "labels": [] }),
    );

    let err = PredictionService::from_artifacts(&dir.config(), ServingConfig::default())
        .expect_err("invalid knn");
    assert!(matches!(err, ArtifactError::Invalid { .. }), "{err}");
}

#[test]
fn startup_fails_without_scaler() {
    let dir = ArtifactDir::new();
    dir.write("models/neural_network.json", &neural_network());

    let err = PredictionService::from_artifacts(&dir.config(), ServingConfig::default())
        .expect_err("scaler missing");
    assert!(matches!(err, ArtifactError::Io { .. }), "{err}");
}

#[test]
fn startup_fails_on_reordered_scaler_features() {
    let dir = full_artifacts();
    let mut scaler = scaler();
    scaler["feature_names"][0] = json!("married");
    scaler["feature_names"][1] = json!("gender");
    dir.write("scaler.json", &scaler);

    let err = PredictionService::from_artifacts(&dir.config(), ServingConfig::default())
        .expect_err("feature order mismatch");
    assert!(matches!(err, ArtifactError::Invalid { .. }), "{err}");
}

#[tokio::test]
async fn example_record_is_served_by_both_variants() {
    let dir = full_artifacts();
    let service = Arc::new(
        PredictionService::from_artifacts(&dir.config(), ServingConfig::default())
            .expect("service loads"),
    );

    let (status, body) = post_predict(service.clone(), &example_record()).await;
    assert_eq!(status, StatusCode::OK);
    let percentage = body["approval_probability"].as_f64().expect("probability");
    let expected = if percentage >= 40.0 {
        "Approved"
    } else {
        "Rejected"
    };
    assert_eq!(body["loan_status"], json!(expected));

    let mut request = example_record();
    request["model"] = json!("svm");
    let (status, first) = post_predict(service.clone(), &request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["model_used"], json!("svm"));
    let (_, second) = post_predict(service.clone(), &request).await;
    assert_eq!(first, second);

    request["model"] = json!("gradient_boosting");
    let (status, body) = post_predict(service, &request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid model selected" }));
}

#[test]
fn evaluation_scores_every_loaded_model() {
    let dir = full_artifacts();
    let service = PredictionService::from_artifacts(&dir.config(), ServingConfig::default())
        .expect("service loads");

    let csv = "gender,married,dependents,education,self_employed,applicant_income,coapplicant_income,loan_amount,loan_term,credit_history,property_area,loan_status\n\
1,1,0,1,0,5000,0,150,360,1,2,Y\n\
1,0,3+,0,1,2500,1200,120,360,0,0,N\n\
0,1,1,1,0,8000,0,200,180,1,1,Y\n\
1,1,2,0,0,3000,1500,250,360,0,1,N\n";
    let rows = read_dataset(csv.as_bytes()).expect("dataset parses");
    assert_eq!(rows.len(), 4);

    let report = evaluate(&service, &rows, None).expect("evaluation");
    assert_eq!(report.samples, 4);
    assert_eq!(report.approved, 2);
    assert_eq!(report.threshold, 0.5);
    assert_eq!(report.models.len(), 4);
    for model in &report.models {
        assert_eq!(model.confusion.total(), 4);
        assert!((0.0..=1.0).contains(&model.accuracy));
    }
}
