//! Builtin capabilities against mock HTTP services
//!
//! - Serper web search: auth header, payload, result formatting
//! - document retrieval: request body and passage formatting
//! - generation through an OpenAI-compatible endpoint
//! - upstream failures degrade to error text through a capability set


use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use taskcrew::capabilities::builtin::{
    DocumentSearchCapability, GenerationCapability, WebSearchCapability,
};
use taskcrew::capabilities::{Capability, CapabilitySet};
use taskcrew::llm::{LlmProvider, OpenAiConfig, OpenAiProvider};
use test_helpers::{chat_completion, test_credentials};
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn test_web_search_sends_serper_request_and_formats_results() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("X-API-KEY", "serper-test-key"))
        .and(body_json(json!({
            "q": "latest AI news",
            "num": 2,
            "gl": "us",
            "hl": "en"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organic": [
                {"title": "Model release", "link": "https://news.example/a", "snippet": "A new model"},
                {"title": "Chip deal", "link": "https://news.example/b", "snippet": "Fabs expand"},
                {"title": "Ignored", "link": "https://news.example/c", "snippet": "Past the cap"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let capability = WebSearchCapability::from_settings(
        Some(&settings(&[
            ("endpoint", json!(format!("{}/search", server.uri()))),
            ("max_results", json!(2)),
        ])),
        &test_credentials(),
    )
    .unwrap();

    let text = capability.invoke("latest AI news").await.unwrap();
    assert_eq!(
        text,
        "Title: Model release\nLink: https://news.example/a\nSnippet: A new model\n---\n\
         Title: Chip deal\nLink: https://news.example/b\nSnippet: Fabs expand"
    );
}

#[tokio::test]
async fn test_web_search_without_results() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"organic": []})))
        .mount(&server)
        .await;

    let capability =
        WebSearchCapability::new("key", format!("{}/search", server.uri())).unwrap();
    assert_eq!(capability.invoke("nothing").await.unwrap(), "No results found.");
}

#[tokio::test]
async fn test_web_search_outage_degrades_through_capability_set() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let capability =
        WebSearchCapability::new("key", format!("{}/search", server.uri())).unwrap();
    let set = CapabilitySet::new().with(Arc::new(capability));

    let text = set.call("web_search", &json!({"query": "rust"})).await;
    assert!(text.starts_with("Error performing search: "));
    assert!(text.contains("500"));
    assert!(text.contains("upstream exploded"));
}

#[tokio::test]
async fn test_document_search_posts_query_and_formats_passages() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_json(json!({
            "query": "How is hate speech detected?",
            "document": "hatespeech.pdf",
            "top_k": 2
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"text": "  Classifiers are fine-tuned on labelled posts. ", "score": 0.91},
                {"text": "Annotator agreement is low."}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let capability = DocumentSearchCapability::from_settings(
        Some(&settings(&[
            ("endpoint", json!(format!("{}/query", server.uri()))),
            ("document", json!("hatespeech.pdf")),
            ("top_k", json!(2)),
        ])),
        &test_credentials(),
    )
    .unwrap();

    let text = capability
        .invoke("How is hate speech detected?")
        .await
        .unwrap();
    assert_eq!(
        text,
        "[1] (score 0.91) Classifiers are fine-tuned on labelled posts.\n\n[2] Annotator agreement is low."
    );
}

#[tokio::test]
async fn test_document_search_falls_back_to_answer_field() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"answer": "It uses classifiers."})),
        )
        .mount(&server)
        .await;

    let capability =
        DocumentSearchCapability::new(&format!("{}/query", server.uri()), None).unwrap();
    assert_eq!(capability.invoke("q").await.unwrap(), "It uses classifiers.");
}

#[tokio::test]
async fn test_document_search_error_is_degraded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let capability =
        DocumentSearchCapability::new(&format!("{}/query", server.uri()), None).unwrap();
    let set = CapabilitySet::new().with(Arc::new(capability));

    let text = set.call("document_search", &json!({"query": "q"})).await;
    assert!(text.starts_with("Error performing retrieval: Retrieval service error (503)"));
}

#[tokio::test]
async fn test_generation_uses_configured_model_at_zero_temperature() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "temperature": 0.0,
            "messages": [{"role": "user", "content": "Write a haiku about Rust"}]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_completion("Borrowed, never lost")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let llm: Arc<dyn LlmProvider> = Arc::new(
        OpenAiProvider::new(OpenAiConfig {
            api_key: "sk-test".to_string(),
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
        })
        .unwrap(),
    );
    let capability = GenerationCapability::from_settings(None, llm).unwrap();

    let text = capability.invoke("Write a haiku about Rust").await.unwrap();
    assert_eq!(text, "Borrowed, never lost");
}

#[tokio::test]
async fn test_invalid_arguments_never_reach_the_service() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"organic": []})))
        .expect(0)
        .mount(&server)
        .await;

    let capability =
        WebSearchCapability::new("key", format!("{}/search", server.uri())).unwrap();
    let set = CapabilitySet::new().with(Arc::new(capability));

    let text = set.call("web_search", &json!({"q": "wrong field"})).await;
    assert!(text.starts_with("Error performing search: Argument validation failed"));
}
