//! Integration tests for the LLM client.
//!
//! These tests make real API calls to the OpenAI Responses API.
//! Run with: OPENAI_API_KEY=your_key cargo test --test llm_integration -- --ignored

use std::sync::Arc;

use company_news::llm::{GenerationRequest, LlmProvider, OpenAiClient, Tool};
use company_news::{BatchRequest, NewsConfig, NewsSearch};

fn get_test_api_key() -> String {
    std::env::var("OPENAI_API_KEY")
        .expect("OPENAI_API_KEY environment variable must be set for integration tests")
}

fn create_test_config() -> NewsConfig {
    NewsConfig::from_env()
        .expect("environment configuration should be valid")
        .with_api_key(get_test_api_key())
}

#[tokio::test]
#[ignore] // Run with: cargo test --test llm_integration -- --ignored
async fn test_simple_generation() {
    let client = create_test_config()
        .build_client()
        .expect("client should build");

    let request = GenerationRequest::new(
        client.default_model(),
        "What is 2 + 2? Reply with just the number.",
    )
    .with_temperature(0.0);

    let response = client.generate(request).await;
    assert!(response.is_ok(), "Generation failed: {:?}", response.err());

    let response = response.expect("Should have response");
    assert!(
        response.output_text.contains('4'),
        "Response should contain '4', got: {}",
        response.output_text
    );

    // Verify usage was tracked
    let usage = response.usage.expect("Should have token usage");
    assert!(usage.total_tokens > 0, "Should have token usage");
}

#[tokio::test]
#[ignore]
async fn test_generation_with_web_search() {
    let client = create_test_config()
        .build_client()
        .expect("client should build");

    let request = GenerationRequest::new(
        client.default_model(),
        "Name one headline about Microsoft from the last month. Reply in one line.",
    )
    .with_tool(Tool::web_search());

    let response = client
        .generate(request)
        .await
        .expect("Generation should succeed");
    assert!(
        !response.output_text.trim().is_empty(),
        "Should have output text"
    );
}

#[tokio::test]
#[ignore]
async fn test_news_search_end_to_end() {
    let config = create_test_config().with_max_concurrent(2);
    let client = config.build_client().expect("client should build");
    let search = NewsSearch::new(&config, Arc::new(client));

    let outcome = search
        .search(
            BatchRequest::new(["Microsoft", "Nvidia"], "2024-01-01", "2024-01-31"),
            None,
        )
        .await
        .expect("valid batch");

    assert_eq!(outcome.len(), 2);
    for result in outcome.results() {
        assert!(
            result.is_success(),
            "{} failed: {:?}",
            result.query(),
            result.error()
        );
    }
}

#[tokio::test]
#[ignore]
async fn test_invalid_api_key_fails_cleanly() {
    let client = OpenAiClient::new(
        "https://api.openai.com/v1",
        Some("sk-invalid".to_string()),
        "gpt-4o-mini",
        std::time::Duration::from_secs(30),
    )
    .expect("client should build");

    let result = client
        .generate(GenerationRequest::new("gpt-4o-mini", "ping"))
        .await;
    assert!(result.is_err(), "Invalid key should fail");
}
