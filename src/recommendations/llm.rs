//! Recommendations from an OpenAI-compatible chat completions endpoint

use crate::config::RecommendationsConfig;
use crate::error::{AppError, Result};
use crate::recommendations::models::{
    Advice, Recommendation, RecommendationSource, SensorReadings, KELVIN_OFFSET,
};
use crate::recommendations::rules::{RecommendationEngine, RECOMMENDATION_COUNT};
use crate::recommendations::Advisor;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You are an expert industrial maintenance engineer with 20+ years of experience in predictive maintenance systems.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct RecommendationList {
    recommendations: Vec<Recommendation>,
}

/// Advisor asking a language model, with the rule engine as fallback
pub struct LlmAdvisor {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    rules: RecommendationEngine,
}

impl LlmAdvisor {
    pub fn new(config: &RecommendationsConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            rules: RecommendationEngine::new(),
        })
    }

    async fn request_recommendations(
        &self,
        readings: &SensorReadings,
        requires_maintenance: bool,
    ) -> Result<Vec<Recommendation>> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_prompt(readings, requires_maintenance),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(format!("chat completions request: {}", e))
                } else {
                    AppError::Network(format!("chat completions request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Network(format!(
                "chat completions endpoint returned {}",
                status
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Serialization(format!("invalid chat completions body: {}", e)))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::Serialization("response has no choices".to_string()))?;

        parse_recommendations(&content)
    }

    fn fallback(&self, readings: &SensorReadings, requires_maintenance: bool) -> Advice {
        Advice {
            recommendations: self
                .rules
                .default_recommendations(readings, requires_maintenance),
            source: RecommendationSource::Rules,
        }
    }
}

#[async_trait]
impl Advisor for LlmAdvisor {
    fn name(&self) -> &str {
        "llm"
    }

    async fn advise(&self, readings: &SensorReadings, requires_maintenance: bool) -> Advice {
        match self.request_recommendations(readings, requires_maintenance).await {
            Ok(mut recommendations) if !recommendations.is_empty() => {
                recommendations.truncate(RECOMMENDATION_COUNT);
                debug!(count = recommendations.len(), "Recommendations received from model");
                Advice {
                    recommendations,
                    source: RecommendationSource::Ai,
                }
            }
            Ok(_) => {
                warn!("Model returned no recommendations, using rule engine");
                self.fallback(readings, requires_maintenance)
            }
            Err(e) => {
                warn!(error = %e, "AI recommendations unavailable, using rule engine");
                self.fallback(readings, requires_maintenance)
            }
        }
    }
}

fn build_prompt(readings: &SensorReadings, requires_maintenance: bool) -> String {
    let status = if requires_maintenance {
        "requires maintenance"
    } else {
        "is in good condition"
    };

    let mut lines = vec![
        "As an industrial maintenance expert, analyze these machine parameters and provide 4 specific, actionable maintenance recommendations:".to_string(),
        String::new(),
        format!("Machine Status: {}", status),
    ];
    if let Some(air) = readings.air_temperature {
        lines.push(format!(
            "- Air Temperature: {} K ({:.1}°C)",
            air,
            air - KELVIN_OFFSET
        ));
    }
    if let Some(process) = readings.process_temperature {
        lines.push(format!(
            "- Process Temperature: {} K ({:.1}°C)",
            process,
            process - KELVIN_OFFSET
        ));
    }
    if let Some(rpm) = readings.rotational_speed {
        lines.push(format!("- Rotational Speed: {} RPM", rpm));
    }
    if let Some(torque) = readings.torque {
        lines.push(format!("- Torque: {} Nm", torque));
    }

    lines.push(String::new());
    lines.push(
        r#"Consider these factors in your analysis:
- Temperature differentials and thermal stress
- Rotational speed vs torque relationship
- Wear patterns and lubrication needs
- Energy efficiency optimization
- Predictive maintenance strategies
- Safety protocols and compliance

Provide exactly 4 recommendations in this JSON format:
{
    "recommendations": [
        {
            "title": "Specific Action Title",
            "description": "Detailed explanation of what to do and why",
            "icon": "fas fa-relevant-icon",
            "priority": "high/medium/low"
        }
    ]
}

Make recommendations specific to the actual parameter values, not generic advice. Include a mix of immediate actions, preventive measures, monitoring suggestions, and optimization opportunities."#
            .to_string(),
    );

    lines.join("\n")
}

/// Parse the JSON object embedded in a model reply (first `{` to last `}`)
pub(crate) fn parse_recommendations(content: &str) -> Result<Vec<Recommendation>> {
    let start = content.find('{');
    let end = content.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => {
            return Err(AppError::Serialization(
                "reply contains no JSON object".to_string(),
            ))
        }
    };

    let list: RecommendationList = serde_json::from_str(json)?;
    Ok(list.recommendations)
}
