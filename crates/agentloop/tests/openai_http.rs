//! `ChatOpenAI` against a local axum stub of the chat-completions endpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use agentloop::tool::builtin::{UserLocationTool, WeatherTool};
use agentloop::{
    ChatOpenAI, InMemoryStore, LlmClient, LlmError, Message, OpenAiConfig, RetryPolicy,
    ToolRegistry, TurnController, TurnOptions,
};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Captured {
    bodies: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<String>>>,
}

#[derive(Clone)]
struct Stub {
    replies: Arc<Mutex<Vec<(StatusCode, String)>>>,
    captured: Captured,
}

async fn completions(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    stub.captured.bodies.lock().unwrap().push(body);
    if let Some(v) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        stub.captured.auth.lock().unwrap().push(v.to_string());
    }
    let mut replies = stub.replies.lock().unwrap();
    if replies.len() > 1 {
        replies.remove(0)
    } else {
        replies[0].clone()
    }
}

/// Serves `replies` in order (the last one repeats); returns the base URL.
async fn serve(replies: Vec<(StatusCode, String)>) -> (String, Captured) {
    let captured = Captured::default();
    let stub = Stub {
        replies: Arc::new(Mutex::new(replies)),
        captured: captured.clone(),
    };
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v1"), captured)
}

fn client(base_url: &str) -> ChatOpenAI {
    ChatOpenAI::new(
        OpenAiConfig::new("sk-test", base_url, "moonshot-v1-8k")
            .with_temperature(0.3)
            .with_request_timeout(Duration::from_secs(5)),
    )
    .unwrap()
}

fn final_body(text: &str) -> String {
    json!({
        "id": "cmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": text}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 9, "completion_tokens": 4, "total_tokens": 13}
    })
    .to_string()
}

#[tokio::test]
async fn ok_reply_is_parsed_and_request_is_well_formed() {
    let (base, captured) = serve(vec![(StatusCode::OK, final_body("Hello, I am Kimi."))]).await;

    let r = client(&base)
        .invoke(&[Message::user("Who are you?")], "Be brief.")
        .await
        .unwrap();

    assert_eq!(r.content, "Hello, I am Kimi.");
    assert!(r.is_final());
    assert_eq!(r.usage.total(), 13);
    let bodies = captured.bodies.lock().unwrap();
    assert_eq!(bodies[0]["model"], "moonshot-v1-8k");
    assert_eq!(bodies[0]["messages"][0], json!({"role": "system", "content": "Be brief."}));
    assert_eq!(bodies[0]["messages"][1], json!({"role": "user", "content": "Who are you?"}));
    assert_eq!(captured.auth.lock().unwrap()[0], "Bearer sk-test");
}

#[tokio::test]
async fn server_error_is_upstream_with_status_and_body() {
    let (base, _) = serve(vec![(
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"error":"overloaded"}"#.into(),
    )])
    .await;

    let err = client(&base)
        .invoke(&[Message::user("hi")], "")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        LlmError::Upstream {
            status: 500,
            body: r#"{"error":"overloaded"}"#.into()
        }
    );
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unauthorized_is_upstream_and_not_retryable() {
    let (base, _) = serve(vec![(StatusCode::UNAUTHORIZED, "invalid api key".into())]).await;

    let err = client(&base).invoke(&[Message::user("hi")], "").await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn garbage_body_is_malformed() {
    let (base, _) = serve(vec![(StatusCode::OK, "<html>gateway</html>".into())]).await;

    let err = client(&base).invoke(&[Message::user("hi")], "").await.unwrap_err();

    assert!(matches!(err, LlmError::MalformedResponse(_)), "{err:?}");
}

#[tokio::test]
async fn unreachable_endpoint_is_transport() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}/v1"))
        .invoke(&[Message::user("hi")], "")
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn full_turn_over_http_with_tool_round() {
    let tool_reply = json!({
        "choices": [{"message": {
            "role": "assistant",
            "content": "",
            "tool_calls": [{
                "id": "call_abc",
                "type": "function",
                "function": {"name": "get_user_location", "arguments": "{}"}
            }]
        }}]
    })
    .to_string();
    let (base, captured) = serve(vec![
        (StatusCode::SERVICE_UNAVAILABLE, "busy".into()),
        (StatusCode::OK, tool_reply),
        (StatusCode::OK, final_body("Florida forecast: sunny with a chance of puns.")),
    ])
    .await;
    let tools = ToolRegistry::new()
        .with_tool(UserLocationTool::default())
        .with_tool(WeatherTool::default());
    let llm = client(&base).with_tools(tools.specs());
    let store = Arc::new(InMemoryStore::new());
    let ctl = TurnController::new(Arc::new(llm), Arc::new(tools), store, "forecaster").with_options(
        TurnOptions::default().with_retry(RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(10),
        }),
    );

    let out = ctl.run_turn("t", "What's the weather where I am?").await.unwrap();

    assert_eq!(out.answer, "Florida forecast: sunny with a chance of puns.");
    assert_eq!(out.model_calls, 2);
    let bodies = captured.bodies.lock().unwrap();
    assert_eq!(bodies.len(), 3);
    let names: Vec<&str> = bodies[0]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["function"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["get_user_location", "get_weather_for_location"]);
    let last = bodies[2]["messages"].as_array().unwrap();
    assert_eq!(last.last().unwrap()["role"], "tool");
    assert_eq!(last.last().unwrap()["tool_call_id"], "call_abc");
    assert_eq!(last.last().unwrap()["content"], "Florida");
}
