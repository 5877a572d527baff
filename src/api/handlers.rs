use crate::api::{pages, AppState};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::ml::{MlError, PredictionRequest, PredictionResponse};
use crate::recommendations::{Advice, Recommendation, RecommendationSource};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prediction form
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let service = &state.service;
    Html(pages::form_page(
        &service.info(),
        service.encoder(),
        &BTreeMap::new(),
        &[],
    ))
}

/// Handle a form submission.
///
/// Validation errors re-render the form with 422 and the submitted values kept.
pub async fn predict_form(
    State(state): State<AppState>,
    Form(fields): Form<BTreeMap<String, String>>,
) -> Response {
    let request = PredictionRequest::new(fields);

    match state.service.predict(&request) {
        Ok(prediction) => {
            let advice = advise(&state, &prediction).await;
            Html(pages::result_page(&prediction, &advice)).into_response()
        }
        Err(MlError::InputValidation(violations)) => {
            let service = &state.service;
            let page = pages::form_page(
                &service.info(),
                service.encoder(),
                &request.fields,
                &violations,
            );
            (StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

/// Model information page
pub async fn model_info_page(State(state): State<AppState>) -> Html<String> {
    Html(pages::info_page(&state.service.info()))
}

#[derive(Debug, Deserialize)]
pub struct PredictJsonRequest {
    /// Feature values keyed by schema key; numbers and strings are both accepted
    pub features: BTreeMap<String, serde_json::Value>,
}

impl PredictJsonRequest {
    fn into_prediction_request(self) -> PredictionRequest {
        PredictionRequest::new(
            self.features
                .into_iter()
                .map(|(key, value)| (key, json_field(value)))
                .collect(),
        )
    }
}

fn json_field(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct PredictJsonResponse {
    #[serde(flatten)]
    pub prediction: PredictionResponse,
    pub recommendations: Vec<Recommendation>,
    pub recommendation_source: RecommendationSource,
}

/// JSON prediction endpoint
pub async fn predict_json(
    State(state): State<AppState>,
    Json(request): Json<PredictJsonRequest>,
) -> Result<Json<PredictJsonResponse>> {
    let prediction = state.service.predict(&request.into_prediction_request())?;
    let advice = advise(&state, &prediction).await;

    Ok(Json(PredictJsonResponse {
        prediction,
        recommendations: advice.recommendations,
        recommendation_source: advice.source,
    }))
}

/// Loaded model metadata
pub async fn model_info(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    Ok(Json(serde_json::to_value(state.service.info())?))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    let metadata = state.service.metadata();
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        model_type: metadata.model_type.to_string(),
        advisor: state.advisor.name().to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub model_type: String,
    pub advisor: String,
}

/// Prometheus text exposition
pub async fn export_metrics(State(state): State<AppState>) -> impl IntoResponse {
    metrics::UPTIME_SECONDS.set(state.uptime_seconds() as f64);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

async fn advise(state: &AppState, prediction: &PredictionResponse) -> Advice {
    let advice = state
        .advisor
        .advise(&prediction.readings, prediction.outcome.value.requires_maintenance)
        .await;
    metrics::record_recommendations(advice.source.as_str());
    advice
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_fields_become_form_values() {
        let request: PredictJsonRequest = serde_json::from_value(json!({
            "features": {
                "air_temperature": 298.1,
                "process_temperature": "308.6",
                "rotational_speed": 1551,
                "torque": null
            }
        }))
        .unwrap();

        let fields = request.into_prediction_request().fields;
        assert_eq!(fields["air_temperature"], "298.1");
        assert_eq!(fields["process_temperature"], "308.6");
        assert_eq!(fields["rotational_speed"], "1551");
        assert_eq!(fields["torque"], "");
    }

    #[test]
    fn test_missing_features_key_rejected() {
        assert!(serde_json::from_value::<PredictJsonRequest>(json!({"air_temperature": 1})).is_err());
    }
}
