//! Maintenance recommendations shown alongside a prediction
//!
//! Two advisors produce exactly four recommendations per prediction:
//! - A deterministic rule engine checking temperatures, speed and torque
//! - A chat-completions advisor that falls back to the rules on any failure

pub mod llm;
pub mod models;
pub mod rules;

pub use llm::LlmAdvisor;
pub use models::{
    Advice, Priority, ReadingContext, Recommendation, RecommendationSource, SensorReadings,
};
pub use rules::{RecommendationEngine, RECOMMENDATION_COUNT};

use crate::config::RecommendationsConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Produces recommendations for a prediction
#[async_trait]
pub trait Advisor: Send + Sync + 'static {
    /// Get advisor name
    fn name(&self) -> &str;

    /// Recommendations for the readings and predicted outcome
    async fn advise(&self, readings: &SensorReadings, requires_maintenance: bool) -> Advice;
}

/// Advisor backed only by the rule engine
#[derive(Debug, Clone, Default)]
pub struct RuleAdvisor {
    engine: RecommendationEngine,
}

impl RuleAdvisor {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Advisor for RuleAdvisor {
    fn name(&self) -> &str {
        "rules"
    }

    async fn advise(&self, readings: &SensorReadings, requires_maintenance: bool) -> Advice {
        Advice {
            recommendations: self
                .engine
                .default_recommendations(readings, requires_maintenance),
            source: RecommendationSource::Rules,
        }
    }
}

/// Pick the advisor for the configuration: the language model when enabled and
/// an API key is present, the rule engine otherwise
pub fn build_advisor(config: &RecommendationsConfig) -> Result<Arc<dyn Advisor>> {
    if !config.enabled {
        info!("AI recommendations disabled, using rule engine");
        return Ok(Arc::new(RuleAdvisor::new()));
    }

    match config.api_key() {
        Some(api_key) => {
            info!(model = %config.model, url = %config.api_url, "Using AI recommendations");
            Ok(Arc::new(LlmAdvisor::new(config, api_key)?))
        }
        None => {
            info!(
                env = %config.api_key_env,
                "No API key configured, using rule engine for recommendations"
            );
            Ok(Arc::new(RuleAdvisor::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rule_advisor() {
        let advisor = RuleAdvisor::new();
        let advice = advisor
            .advise(&SensorReadings::new(298.1, 308.6, 1551.0, 42.8), true)
            .await;

        assert_eq!(advice.source, RecommendationSource::Rules);
        assert_eq!(advice.recommendations.len(), RECOMMENDATION_COUNT);
        assert_eq!(advice.recommendations[3].title, "Immediate Maintenance Protocol");
    }

    #[test]
    fn test_build_advisor_without_key() {
        let config = RecommendationsConfig {
            api_key_env: "MP_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        assert_eq!(build_advisor(&config).unwrap().name(), "rules");

        let config = RecommendationsConfig {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(build_advisor(&config).unwrap().name(), "rules");
    }
}
