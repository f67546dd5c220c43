//! Local model inference contract.
//!
//! Training is out of scope; the pipeline only depends on this inference
//! interface. Predictions are CPU-bound and non-suspending.

use serde::{Deserialize, Serialize};

use crate::types::RiskLevel;

/// Prediction emitted by an on-device model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalPrediction {
    pub level: RiskLevel,
    pub confidence: f64,
    #[serde(default)]
    pub scam_type: Option<String>,
}

/// On-device classifier. `None` means the model abstained.
pub trait LocalModel: Send + Sync {
    fn predict(&self, message: &str) -> Option<LocalPrediction>;

    /// Model identifier for diagnostics.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(LocalPrediction);

    impl LocalModel for Fixed {
        fn predict(&self, _message: &str) -> Option<LocalPrediction> {
            Some(self.0.clone())
        }
        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_trait_object_usage() {
        let model: Box<dyn LocalModel> = Box::new(Fixed(LocalPrediction {
            level: RiskLevel::High,
            confidence: 0.95,
            scam_type: Some("KYC Scam".to_string()),
        }));

        let prediction = model.predict("anything").unwrap();
        assert_eq!(prediction.level, RiskLevel::High);
        assert_eq!(model.name(), "fixed");
    }
}
