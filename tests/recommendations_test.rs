/// Integration tests for the recommendation advisors
///
/// The chat-completions endpoint is mocked with mockito; every failure mode
/// must fall back to the rule engine.

use maintenance_predictor::config::RecommendationsConfig;
use maintenance_predictor::recommendations::{
    Advisor, LlmAdvisor, Priority, RecommendationEngine, RecommendationSource, SensorReadings,
    RECOMMENDATION_COUNT,
};
use serde_json::json;

fn readings() -> SensorReadings {
    SensorReadings::new(298.1, 308.6, 1551.0, 42.8)
}

fn advisor(server: &mockito::ServerGuard) -> LlmAdvisor {
    let config = RecommendationsConfig {
        api_url: format!("{}/openai/v1/chat/completions", server.url()),
        timeout_secs: 5,
        ..Default::default()
    };
    LlmAdvisor::new(&config, "test-key").unwrap()
}

fn completion(content: &str) -> String {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
        ]
    })
    .to_string()
}

fn model_reply(count: usize) -> String {
    let recommendations: Vec<_> = (0..count)
        .map(|i| {
            json!({
                "title": format!("Action {}", i + 1),
                "description": "Check the spindle bearing",
                "icon": "fas fa-cog",
                "priority": if i == 0 { "high" } else { "low" }
            })
        })
        .collect();
    format!(
        "Based on the readings:\n{}\nLet me know if you need more.",
        json!({ "recommendations": recommendations })
    )
}

#[tokio::test]
async fn test_model_recommendations_are_used() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/openai/v1/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(mockito::Matcher::PartialJson(json!({
            "model": "mixtral-8x7b-32768",
            "max_tokens": 1200
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion(&model_reply(4)))
        .create_async()
        .await;

    let advice = advisor(&server).advise(&readings(), true).await;

    mock.assert_async().await;
    assert_eq!(advice.source, RecommendationSource::Ai);
    assert_eq!(advice.recommendations.len(), 4);
    assert_eq!(advice.recommendations[0].title, "Action 1");
    assert_eq!(advice.recommendations[0].priority, Priority::High);
}

#[tokio::test]
async fn test_long_model_reply_is_truncated() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/openai/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion(&model_reply(6)))
        .create_async()
        .await;

    let advice = advisor(&server).advise(&readings(), false).await;

    assert_eq!(advice.source, RecommendationSource::Ai);
    assert_eq!(advice.recommendations.len(), RECOMMENDATION_COUNT);
    assert_eq!(advice.recommendations[3].title, "Action 4");
}

#[tokio::test]
async fn test_unusual_priorities_keep_model_recommendations() {
    let mut server = mockito::Server::new_async().await;
    let reply = json!({
        "recommendations": [
            {"title": "Stop the spindle", "description": "Torque spike", "priority": "Critical "},
            {"title": "Inspect tooling", "description": "Wear check", "priority": "HIGH"},
            {"title": "Log readings", "description": "Trend torque", "priority": "moderate"},
            {"title": "Clean filters", "description": "Airflow", "priority": "Low"}
        ]
    });
    server
        .mock("POST", "/openai/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion(&reply.to_string()))
        .create_async()
        .await;

    let advice = advisor(&server).advise(&readings(), true).await;

    assert_eq!(advice.source, RecommendationSource::Ai);
    let priorities: Vec<Priority> = advice.recommendations.iter().map(|r| r.priority).collect();
    assert_eq!(
        priorities,
        vec![Priority::High, Priority::High, Priority::Medium, Priority::Low]
    );
}

#[tokio::test]
async fn test_http_error_falls_back_to_rules() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/openai/v1/chat/completions")
        .with_status(500)
        .with_body("upstream unavailable")
        .create_async()
        .await;

    let advice = advisor(&server).advise(&readings(), true).await;

    assert_eq!(advice.source, RecommendationSource::Rules);
    assert_eq!(
        advice.recommendations,
        RecommendationEngine::new().default_recommendations(&readings(), true)
    );
}

#[tokio::test]
async fn test_unparsable_reply_falls_back_to_rules() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/openai/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion("I'd recommend checking the machine regularly."))
        .create_async()
        .await;

    let advice = advisor(&server).advise(&readings(), false).await;

    assert_eq!(advice.source, RecommendationSource::Rules);
    assert_eq!(advice.recommendations.len(), RECOMMENDATION_COUNT);
}

#[tokio::test]
async fn test_empty_recommendation_list_falls_back_to_rules() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/openai/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion(r#"{"recommendations": []}"#))
        .create_async()
        .await;

    let advice = advisor(&server).advise(&readings(), false).await;

    assert_eq!(advice.source, RecommendationSource::Rules);
}

#[tokio::test]
async fn test_unreachable_endpoint_falls_back_to_rules() {
    let config = RecommendationsConfig {
        api_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
        timeout_secs: 2,
        ..Default::default()
    };
    let advisor = LlmAdvisor::new(&config, "test-key").unwrap();

    let advice = advisor.advise(&readings(), true).await;

    assert_eq!(advice.source, RecommendationSource::Rules);
    assert_eq!(advice.recommendations.len(), RECOMMENDATION_COUNT);
}

#[test]
fn test_rule_engine_always_returns_four() {
    let engine = RecommendationEngine::new();
    let cases = [
        SensorReadings::new(295.0, 330.0, 2600.0, 70.0),
        SensorReadings::new(300.0, 310.0, 900.0, 10.0),
        SensorReadings::new(298.1, 308.6, 1551.0, 42.8),
        SensorReadings::default(),
    ];

    for readings in cases {
        for requires_maintenance in [true, false] {
            let recs = engine.default_recommendations(&readings, requires_maintenance);
            assert_eq!(recs.len(), RECOMMENDATION_COUNT);
        }
    }
}
