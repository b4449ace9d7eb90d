use super::common::*;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::prediction::{prediction_router, ModelName, ProbabilisticClassifier};

fn router() -> Router {
    prediction_router(Arc::new(service()))
}

fn post_predict(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn home_reports_liveness() {
    let response = router()
        .oneshot(Request::get("/").body(Body::empty()).expect("request"))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(
        body,
        json!({ "message": "Loan approval prediction service is running" })
    );
}

#[tokio::test]
async fn simple_predict_returns_loan_status() {
    let response = router()
        .oneshot(post_predict(&reference_body()))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let status = body["loan_status"].as_str().expect("loan_status");
    assert!(status == "Approved" || status == "Rejected");
    let percentage = body["approval_probability"].as_f64().expect("probability");
    assert!((0.0..=100.0).contains(&percentage));
    assert!(body.get("model_used").is_none());
}

#[tokio::test]
async fn model_predict_returns_decision_for_every_model() {
    for model in ModelName::ALL {
        let mut request = reference_body();
        request["model"] = json!(model.as_str());

        let response = router()
            .oneshot(post_predict(&request))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK, "{model}");
        let body = read_json_body(response).await;
        assert_eq!(body["model_used"], json!(model.as_str()));
        let percentage = body["approval_probability"].as_f64().expect("probability");
        assert!((0.0..=100.0).contains(&percentage));
        let decision = body["decision"].as_str().expect("decision");
        assert!(decision == "Approved" || decision == "Rejected");
    }
}

#[tokio::test]
async fn unknown_model_returns_exact_error_body() {
    let counting = CountingClassifier::new(ModelName::NeuralNetwork);
    let classifier: Box<dyn ProbabilisticClassifier> = Box::new(counting.clone());
    let router = prediction_router(Arc::new(service_with(vec![classifier])));

    let mut request = reference_body();
    request["model"] = json!("random_forest");
    let response = router
        .oneshot(post_predict(&request))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body, json!({ "error": "Invalid model selected" }));
    assert_eq!(counting.calls(), 0);
}

#[tokio::test]
async fn non_finite_probability_is_an_internal_error() {
    let classifier: Box<dyn ProbabilisticClassifier> = Box::new(FixedClassifier {
        name: ModelName::NeuralNetwork,
        probability: f64::NAN,
    });
    let router = prediction_router(Arc::new(service_with(vec![classifier])));

    let response = router
        .oneshot(post_predict(&reference_body()))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json_body(response).await;
    let message = body["error"].as_str().expect("error message");
    assert!(message.contains("neural_network"), "{message}");
}

#[tokio::test]
async fn missing_field_is_unprocessable() {
    let mut request = reference_body();
    request
        .as_object_mut()
        .expect("object")
        .remove("credit_history");

    let response = router()
        .oneshot(post_predict(&request))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["field"], json!("credit_history"));
}

#[tokio::test]
async fn three_plus_dependents_is_accepted() {
    let mut request = reference_body();
    request["dependents"] = json!("3+");

    let response = router()
        .oneshot(post_predict(&request))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_json_is_unprocessable() {
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"gender\": 1,"))
        .expect("request");

    let response = router().oneshot(request).await.expect("router response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["field"], json!("body"));
}

#[tokio::test]
async fn models_lists_registered_names_and_thresholds() {
    let response = router()
        .oneshot(Request::get("/models").body(Body::empty()).expect("request"))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(
        body["models"],
        json!(["neural_network", "svm", "decision_tree", "knn"])
    );
    assert_eq!(body["default_model"], json!("neural_network"));
    assert_eq!(body["default_threshold"], json!(0.5));
    assert_eq!(body["simple_threshold"], json!(0.4));
}
