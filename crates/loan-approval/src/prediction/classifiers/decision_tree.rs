use serde::{Deserialize, Serialize};

use super::ProbabilisticClassifier;
use crate::prediction::artifact::ArtifactError;
use crate::prediction::domain::{ModelName, FEATURE_COUNT};
use crate::prediction::scaler::ScaledFeatures;

const ARTIFACT: &str = "decision_tree";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// Samples with `x[feature] <= threshold` continue at `left`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Training sample counts (or weights) for the rejected and approved classes.
    Leaf { counts: [f64; 2] },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeArtifact {
    pub nodes: Vec<TreeNode>,
}

/// Binary decision tree stored as a flat node array rooted at index 0.
#[derive(Debug)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl TryFrom<DecisionTreeArtifact> for DecisionTree {
    type Error = ArtifactError;

    fn try_from(artifact: DecisionTreeArtifact) -> Result<Self, Self::Error> {
        let nodes = artifact.nodes;
        if nodes.is_empty() {
            return Err(ArtifactError::invalid(ARTIFACT, "tree has no nodes"));
        }

        for (index, node) in nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= FEATURE_COUNT {
                        return Err(ArtifactError::invalid(
                            ARTIFACT,
                            format!("node {index} splits on unknown feature {feature}"),
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(ArtifactError::invalid(
                            ARTIFACT,
                            format!("node {index} has a non-finite threshold"),
                        ));
                    }
                    // Children must point forward, which also rules out cycles.
                    for child in [*left, *right] {
                        if child <= index || child >= nodes.len() {
                            return Err(ArtifactError::invalid(
                                ARTIFACT,
                                format!("node {index} has invalid child {child}"),
                            ));
                        }
                    }
                }
                TreeNode::Leaf { counts } => {
                    let total = counts[0] + counts[1];
                    if counts.iter().any(|c| !c.is_finite() || *c < 0.0) || total <= 0.0 {
                        return Err(ArtifactError::invalid(
                            ARTIFACT,
                            format!("leaf {index} needs non-negative counts with a positive total"),
                        ));
                    }
                }
            }
        }

        Ok(Self { nodes })
    }
}

impl DecisionTree {
    fn leaf_counts(&self, features: &ScaledFeatures) -> [f64; 2] {
        let values = features.values();
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if values[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { counts } => return *counts,
            }
        }
    }
}

impl ProbabilisticClassifier for DecisionTree {
    fn name(&self) -> ModelName {
        ModelName::DecisionTree
    }

    fn approval_probability(&self, features: &ScaledFeatures) -> f64 {
        let [rejected, approved] = self.leaf_counts(features);
        approved / (rejected + approved)
    }
}
