use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::response::Response;
use serde_json::{json, Value};

use crate::config::ServingConfig;
use crate::prediction::classifiers::{
    DecisionTreeArtifact, DenseLayerArtifact, DistanceMetric, Kernel, KnnArtifact,
    NeighborWeights, NeuralNetworkArtifact, SvmArtifact, TreeNode,
};
use crate::prediction::domain::{ModelName, FEATURE_COUNT};
use crate::prediction::request::LoanApplicationRequest;
use crate::prediction::scaler::{ScaledFeatures, ScalerArtifact, StandardScaler};
use crate::prediction::{
    LoanApplication, ModelArtifact, ModelRegistry, PredictionService, ProbabilisticClassifier,
};

pub(super) fn reference_body() -> Value {
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

pub(super) fn reference_application() -> LoanApplication {
    serde_json::from_value::<LoanApplicationRequest>(reference_body())
        .expect("request decodes")
        .validate()
        .expect("reference record is valid")
}

pub(super) fn scaler() -> StandardScaler {
    StandardScaler::from_artifact(ScalerArtifact {
        mean: vec![
            0.82, 0.65, 0.74, 0.78, 0.13, 5403.0, 1621.0, 146.0, 342.0, 0.85, 1.04,
        ],
        scale: vec![
            0.39, 0.48, 1.01, 0.41, 0.34, 6109.0, 2926.0, 84.0, 65.0, 0.35, 0.79,
        ],
        feature_names: None,
    })
    .expect("valid scaler")
}

fn row(entries: &[(usize, f64)]) -> Vec<f64> {
    let mut values = vec![0.0; FEATURE_COUNT];
    for (index, value) in entries {
        values[*index] = *value;
    }
    values
}

pub(super) fn neural_network_artifact() -> NeuralNetworkArtifact {
    NeuralNetworkArtifact {
        activation: Default::default(),
        layers: vec![
            DenseLayerArtifact {
                weights: vec![
                    row(&[(9, 1.5), (5, 0.4), (7, -0.3)]),
                    row(&[(10, 0.5), (1, 0.2)]),
                ],
                biases: vec![0.0, 0.0],
            },
            DenseLayerArtifact {
                weights: vec![vec![1.0, 0.5]],
                biases: vec![-0.2],
            },
        ],
    }
}

pub(super) fn svm_artifact() -> SvmArtifact {
    SvmArtifact {
        kernel: Kernel::Rbf { gamma: 0.1 },
        support_vectors: vec![row(&[(9, 0.43)]), row(&[(9, -2.43)])],
        dual_coef: vec![1.0, -1.0],
        intercept: 0.0,
        prob_a: -1.5,
        prob_b: 0.0,
    }
}

pub(super) fn tree_artifact() -> DecisionTreeArtifact {
    DecisionTreeArtifact {
        nodes: vec![
            TreeNode::Split {
                feature: 9,
                threshold: 0.0,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf {
                counts: [40.0, 10.0],
            },
            TreeNode::Leaf {
                counts: [20.0, 80.0],
            },
        ],
    }
}

pub(super) fn knn_artifact() -> KnnArtifact {
    KnnArtifact {
        k: 3,
        weights: NeighborWeights::Uniform,
        metric: DistanceMetric::Euclidean,
        samples: vec![
            row(&[(9, 0.43), (10, 1.2)]),
            row(&[(9, 0.43), (10, -1.3)]),
            row(&[(9, -2.43), (5, 0.5)]),
            row(&[(9, 0.43), (5, -0.1)]),
        ],
        labels: vec![1, 1, 0, 0],
    }
}

pub(super) fn model_artifacts() -> Vec<ModelArtifact> {
    vec![
        ModelArtifact::NeuralNetwork(neural_network_artifact()),
        ModelArtifact::Svm(svm_artifact()),
        ModelArtifact::DecisionTree(tree_artifact()),
        ModelArtifact::Knn(knn_artifact()),
    ]
}

pub(super) fn full_registry() -> ModelRegistry {
    let mut registry = ModelRegistry::default();
    for artifact in model_artifacts() {
        registry.insert(artifact.into_classifier().expect("valid artifact"));
    }
    registry
}

pub(super) fn service() -> PredictionService {
    PredictionService::new(scaler(), full_registry(), ServingConfig::default())
        .expect("service builds")
}

pub(super) fn service_with(
    classifiers: Vec<Box<dyn ProbabilisticClassifier>>,
) -> PredictionService {
    let mut registry = ModelRegistry::default();
    for classifier in classifiers {
        registry.insert(classifier);
    }
    PredictionService::new(scaler(), registry, ServingConfig::default()).expect("service builds")
}

/// Returns the same probability for every record.
pub(super) struct FixedClassifier {
    pub(super) name: ModelName,
    pub(super) probability: f64,
}

impl ProbabilisticClassifier for FixedClassifier {
    fn name(&self) -> ModelName {
        self.name
    }

    fn approval_probability(&self, _features: &ScaledFeatures) -> f64 {
        self.probability
    }
}

/// Counts invocations so tests can assert that inference never ran.
#[derive(Clone)]
pub(super) struct CountingClassifier {
    pub(super) name: ModelName,
    pub(super) calls: Arc<AtomicUsize>,
}

impl CountingClassifier {
    pub(super) fn new(name: ModelName) -> Self {
        Self {
            name,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProbabilisticClassifier for CountingClassifier {
    fn name(&self) -> ModelName {
        self.name
    }

    fn approval_probability(&self, _features: &ScaledFeatures) -> f64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        0.7
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
