//! End-to-end orchestrator and HTTP-surface tests against a scripted
//! provider and a stubbed feature service. No network involved.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use aqm_domain::config::Config;
use aqm_domain::tool::{ContentPart, MessageContent, Role, ToolCall};
use aqm_domain::{Error, Result};
use aqm_gateway::api;
use aqm_gateway::runtime::{run_turn, ChatOutcome, TurnInput};
use aqm_gateway::state::AppState;
use aqm_geodata::client::{Feature, FeatureAttributes};
use aqm_geodata::{AirQualityAdapter, FeatureQuery, FeatureSet, PlaceResolver, StatsQuery, TtlCache};
use aqm_providers::mock::MockProvider;
use aqm_providers::retry::RetryPolicy;
use aqm_providers::{CompletionRequest, CompletionResponse, LlmProvider};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Fixtures
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
struct StubGeodata {
    script: Mutex<VecDeque<Result<FeatureSet>>>,
    queries: Mutex<Vec<StatsQuery>>,
}

impl StubGeodata {
    fn scripted(script: Vec<Result<FeatureSet>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            queries: Mutex::new(Vec::new()),
        })
    }

    fn query_count(&self) -> usize {
        self.queries.lock().len()
    }
}

#[async_trait::async_trait]
impl FeatureQuery for StubGeodata {
    async fn query(&self, q: &StatsQuery) -> Result<FeatureSet> {
        self.queries.lock().push(q.clone());
        self.script
            .lock()
            .pop_front()
            .unwrap_or(Ok(FeatureSet::default()))
    }
}

fn feature(city: &str, country: &str, avg: f64, n: i64) -> Feature {
    Feature {
        attributes: FeatureAttributes {
            city: Some(city.into()),
            country_name: Some(country.into()),
            location: None,
            avg_pm25: Some(avg),
            n_stations: Some(n),
        },
    }
}

fn make_state(mock: &Arc<MockProvider>, geodata: &Arc<StubGeodata>) -> AppState {
    let llm: Arc<dyn LlmProvider> = mock.clone();
    let client: Arc<dyn FeatureQuery> = geodata.clone();
    AppState {
        config: Arc::new(Config::default()),
        llm: Some(llm),
        retry: RetryPolicy::with_max_attempts(3),
        geodata: Arc::new(AirQualityAdapter::new(client)),
        resolver: Arc::new(PlaceResolver::new()),
        top_cache: Arc::new(TtlCache::new(Duration::from_secs(60))),
        place_cache: Arc::new(TtlCache::new(Duration::from_secs(30))),
    }
}

fn tool_call(id: &str, name: &str, args: &str) -> ToolCall {
    ToolCall {
        call_id: id.into(),
        tool_name: name.into(),
        arguments_json: args.into(),
    }
}

fn tool_call_response(calls: Vec<ToolCall>) -> CompletionResponse {
    CompletionResponse {
        content: String::new(),
        tool_calls: calls,
        model: "mock".into(),
        finish_reason: Some("tool_calls".into()),
    }
}

async fn ask(state: &AppState, mock: &Arc<MockProvider>, message: &str) -> ChatOutcome {
    run_turn(
        state,
        mock.as_ref(),
        TurnInput {
            user_message: message.into(),
            history: Vec::new(),
        },
    )
    .await
}

/// `(tool_use_id, payload)` pairs from the tool-role messages of a request.
fn tool_results(req: &CompletionRequest) -> Vec<(String, Value)> {
    req.messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .flat_map(|m| match &m.content {
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::ToolResult { tool_use_id, content } => Some((
                        tool_use_id.clone(),
                        serde_json::from_str(content).unwrap(),
                    )),
                    _ => None,
                })
                .collect::<Vec<_>>(),
            MessageContent::Text(_) => Vec::new(),
        })
        .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Orchestrator scenarios
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn ranking_question_runs_the_full_tool_loop() {
    let mock = Arc::new(MockProvider::new());
    mock.push_response(tool_call_response(vec![tool_call(
        "call_1",
        "get_top_cities",
        r#"{"limit":3}"#,
    )]));
    mock.push_text("Right now the worst PM2.5 is in Lahore, Delhi and Dhaka.");

    let geodata = StubGeodata::scripted(vec![Ok(FeatureSet {
        features: vec![
            feature("Lahore", "Pakistan", 182.6, 5),
            feature("Delhi", "India", 154.2, 11),
            feature("Dhaka", "Bangladesh", 133.0, 4),
        ],
    })]);
    let state = make_state(&mock, &geodata);

    let outcome = ask(&state, &mock, "Top 3 polluted cities now").await;
    assert!(outcome.reply.contains("Lahore"));
    assert!(outcome.action.is_none());

    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    // First completion declares the tools; the second never does.
    assert_eq!(requests[0].tools.len(), 2);
    assert!(requests[1].tools.is_empty());

    let results = tool_results(&requests[1]);
    assert_eq!(results.len(), 1);
    let cities = results[0].1["cities"].as_array().unwrap();
    assert_eq!(cities.len(), 3);
    assert!(cities[0]["avg_pm25"].as_i64() > cities[2]["avg_pm25"].as_i64());
}

#[tokio::test]
async fn city_question_surfaces_a_center_on_action() {
    let mock = Arc::new(MockProvider::new());
    mock.push_response(tool_call_response(vec![tool_call(
        "call_1",
        "get_city_pm25",
        r#"{"query":"Hanoi"}"#,
    )]));
    mock.push_text("Hanoi is averaging 81 µg/m³ (OpenAQ via the Esri Living Atlas, latest hour).");

    let geodata = StubGeodata::scripted(vec![Ok(FeatureSet {
        features: vec![feature("Hanoi", "Vietnam", 81.4, 6)],
    })]);
    let state = make_state(&mock, &geodata);

    let outcome = ask(&state, &mock, "PM2.5 in Hanoi").await;
    assert!(outcome.reply.contains("Hanoi"));
    let action = serde_json::to_value(outcome.action.unwrap()).unwrap();
    assert_eq!(action["kind"], "centerOn");
    assert_eq!(action["place"], "Hanoi");

    // The alias fan-out reached the feature query.
    let sent = geodata.queries.lock();
    assert!(sent[0].where_clause.contains("hà nội"));
}

#[tokio::test]
async fn upstream_failure_becomes_a_tool_error_payload() {
    let mock = Arc::new(MockProvider::new());
    mock.push_response(tool_call_response(vec![tool_call(
        "call_1",
        "get_city_pm25",
        r#"{"query":"Hanoi"}"#,
    )]));
    mock.push_text("I could not reach the air-quality data right now.");

    let geodata = StubGeodata::scripted(vec![
        Err(Error::Upstream { status: 502, message: "bad gateway".into() }),
        Err(Error::Upstream { status: 502, message: "bad gateway".into() }),
    ]);
    let state = make_state(&mock, &geodata);

    let outcome = ask(&state, &mock, "PM2.5 in Hanoi").await;
    assert!(outcome.action.is_none());
    assert!(outcome.reply.contains("could not reach"));

    // The turn still completed: error went back to the model in-band.
    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    let results = tool_results(&requests[1]);
    let err = results[0].1["error"].as_str().unwrap();
    assert!(err.starts_with("Tool exec error:"));
}

#[tokio::test]
async fn off_topic_question_answers_without_tools() {
    let mock = Arc::new(MockProvider::new());
    mock.push_text("I can only help with air quality and the PM2.5 map.");

    let geodata = StubGeodata::scripted(vec![]);
    let state = make_state(&mock, &geodata);

    let outcome = ask(&state, &mock, "Who won the world cup?").await;
    assert!(outcome.reply.contains("air quality"));
    assert!(outcome.action.is_none());
    assert_eq!(mock.calls(), 1);
    assert_eq!(geodata.query_count(), 0);
}

#[tokio::test]
async fn every_tool_call_gets_a_matching_result_before_the_second_completion() {
    let mock = Arc::new(MockProvider::new());
    mock.push_response(tool_call_response(vec![
        tool_call("call_a", "get_top_cities", r#"{"limit":2}"#),
        tool_call("call_b", "get_city_pm25", r#"{"query":"Hanoi"}"#),
        tool_call("call_c", "no_such_tool", "{}"),
    ]));
    mock.push_text("done");

    let geodata = StubGeodata::scripted(vec![
        Ok(FeatureSet { features: vec![feature("Lahore", "Pakistan", 182.6, 5)] }),
        Ok(FeatureSet { features: vec![feature("Hanoi", "Vietnam", 81.4, 6)] }),
    ]);
    let state = make_state(&mock, &geodata);

    let outcome = ask(&state, &mock, "everything at once").await;

    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    let results = tool_results(&requests[1]);
    let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["call_a", "call_b", "call_c"]);
    assert_eq!(
        results[2].1["error"].as_str().unwrap(),
        "Unknown tool: no_such_tool"
    );

    // The lookup ran second, so its action is the one surfaced.
    let action = serde_json::to_value(outcome.action.unwrap()).unwrap();
    assert_eq!(action["place"], "Hanoi");
}

#[tokio::test]
async fn malformed_tool_arguments_do_not_abort_the_turn() {
    let mock = Arc::new(MockProvider::new());
    mock.push_response(tool_call_response(vec![tool_call(
        "call_1",
        "get_city_pm25",
        "{not json",
    )]));
    mock.push_text("Sorry, I could not look that up.");

    let geodata = StubGeodata::scripted(vec![]);
    let state = make_state(&mock, &geodata);

    let outcome = ask(&state, &mock, "PM2.5 in Hanoi").await;
    assert!(outcome.action.is_none());
    assert_eq!(geodata.query_count(), 0);

    let results = tool_results(&mock.requests()[1]);
    assert!(results[0].1["error"].as_str().unwrap().starts_with("Tool exec error:"));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Retry behavior
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test(start_paused = true)]
async fn rate_limits_recover_within_the_retry_budget() {
    let mock = Arc::new(MockProvider::new());
    mock.push_error(Error::RateLimited("Rate limit reached".into()));
    mock.push_error(Error::RateLimited("Rate limit reached".into()));
    mock.push_text("All clear today.");

    let geodata = StubGeodata::scripted(vec![]);
    let state = make_state(&mock, &geodata);

    let outcome = ask(&state, &mock, "How is the air?").await;
    assert_eq!(outcome.reply, "All clear today.");
    assert_eq!(mock.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn exhausted_rate_limits_yield_the_busy_reply() {
    let mock = Arc::new(MockProvider::new());
    for _ in 0..3 {
        mock.push_error(Error::RateLimited("Rate limit reached".into()));
    }

    let geodata = StubGeodata::scripted(vec![]);
    let state = make_state(&mock, &geodata);

    let outcome = ask(&state, &mock, "How is the air?").await;
    assert_eq!(outcome.reply, aqm_gateway::runtime::orchestrator::REPLY_BUSY);
    assert!(outcome.action.is_none());
    assert_eq!(mock.calls(), 3);
    assert_eq!(geodata.query_count(), 0);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cache behavior
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn repeated_ranking_question_hits_the_cache() {
    let mock = Arc::new(MockProvider::new());
    let geodata = StubGeodata::scripted(vec![Ok(FeatureSet {
        features: vec![feature("Lahore", "Pakistan", 182.6, 5)],
    })]);
    let state = make_state(&mock, &geodata);

    for _ in 0..2 {
        mock.push_response(tool_call_response(vec![tool_call(
            "call_1",
            "get_top_cities",
            r#"{"limit":3}"#,
        )]));
        mock.push_text("Lahore leads.");
        let outcome = ask(&state, &mock, "Top 3 polluted cities now").await;
        assert!(outcome.reply.contains("Lahore"));
    }

    // Second turn was served from the cache.
    assert_eq!(geodata.query_count(), 1);
}

#[tokio::test]
async fn repeated_city_question_hits_the_cache_and_keeps_the_action() {
    let mock = Arc::new(MockProvider::new());
    let geodata = StubGeodata::scripted(vec![Ok(FeatureSet {
        features: vec![feature("Hanoi", "Vietnam", 81.4, 6)],
    })]);
    let state = make_state(&mock, &geodata);

    for _ in 0..2 {
        mock.push_response(tool_call_response(vec![tool_call(
            "call_1",
            "get_city_pm25",
            r#"{"query":"Hanoi"}"#,
        )]));
        mock.push_text("Hanoi is at 81.");
        let outcome = ask(&state, &mock, "PM2.5 in Hanoi").await;
        assert!(outcome.action.is_some());
    }

    assert_eq!(geodata.query_count(), 1);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP surface
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod http {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn body_json(res: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_chat(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn non_post_method_gets_405_with_in_band_error() {
        let mock = Arc::new(MockProvider::new());
        let geodata = StubGeodata::scripted(vec![]);
        let app = api::router(make_state(&mock, &geodata));

        let res = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/v1/chat")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            res.headers()["cache-control"],
            "no-store, no-cache, must-revalidate, max-age=0"
        );
        assert_eq!(body_json(res).await["error"], "POST only");
    }

    #[tokio::test]
    async fn malformed_body_degrades_to_the_type_a_message_reply() {
        let mock = Arc::new(MockProvider::new());
        let geodata = StubGeodata::scripted(vec![]);
        let app = api::router(make_state(&mock, &geodata));

        let res = app.oneshot(post_chat("{not json")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()["cache-control"],
            "no-store, no-cache, must-revalidate, max-age=0"
        );
        assert_eq!(
            body_json(res).await["reply"],
            aqm_gateway::api::chat::REPLY_NO_MESSAGE
        );
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn missing_provider_short_circuits_before_any_network_call() {
        let mock = Arc::new(MockProvider::new());
        let geodata = StubGeodata::scripted(vec![]);
        let mut state = make_state(&mock, &geodata);
        state.llm = None;
        let app = api::router(state);

        let res = app
            .oneshot(post_chat(r#"{"userMessage":"PM2.5 in Hanoi"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            body_json(res).await["reply"],
            aqm_gateway::api::chat::REPLY_NOT_CONFIGURED
        );
        assert_eq!(mock.calls(), 0);
        assert_eq!(geodata.query_count(), 0);
    }

    #[tokio::test]
    async fn chat_response_carries_reply_and_action() {
        let mock = Arc::new(MockProvider::new());
        mock.push_response(tool_call_response(vec![tool_call(
            "call_1",
            "get_city_pm25",
            r#"{"query":"Hanoi"}"#,
        )]));
        mock.push_text("Hanoi is at 81 µg/m³ right now.");
        let geodata = StubGeodata::scripted(vec![Ok(FeatureSet {
            features: vec![feature("Hanoi", "Vietnam", 81.4, 6)],
        })]);
        let app = api::router(make_state(&mock, &geodata));

        let res = app
            .oneshot(post_chat(r#"{"userMessage":"PM2.5 in Hanoi"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let v = body_json(res).await;
        assert!(v["reply"].as_str().unwrap().contains("Hanoi"));
        assert_eq!(v["action"]["kind"], "centerOn");
        assert_eq!(v["action"]["place"], "Hanoi");
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let mock = Arc::new(MockProvider::new());
        let geodata = StubGeodata::scripted(vec![]);
        let app = api::router(make_state(&mock, &geodata));

        let res = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["status"], "ok");
    }
}
