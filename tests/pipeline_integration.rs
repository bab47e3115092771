//! End-to-end tests for the classification pipeline.
//!
//! Each test spins up an Axum server on a random port that stands in for the
//! chat-completions endpoint, drives the real `OpenAiProvider` → `LlmClassifier`
//! → `ThreadProcessor` → `ClassificationScheduler` stack against an in-memory
//! database, then reads the results back through the classifications API.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use voice_classifier::api::{ApiState, classification_routes};
use voice_classifier::campaign::{Intent, ThreadStatus};
use voice_classifier::classifier::LlmClassifier;
use voice_classifier::llm::OpenAiProvider;
use voice_classifier::pipeline::{ClassificationScheduler, ThreadProcessor, TickSummary};
use voice_classifier::store::{LibSqlBackend, classifications, threads};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Every request body and bearer token the fake endpoint received.
#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

impl Recorded {
    fn bodies(&self) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }

    fn auth_headers(&self) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(auth, _)| auth.clone())
            .collect()
    }
}

fn completion(content: Value) -> Response {
    raw_completion(&content.to_string())
}

fn raw_completion(content: &str) -> Response {
    Json(json!({
        "id": "chatcmpl-test",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 120, "completion_tokens": 8 }
    }))
    .into_response()
}

/// Answers as a model would, keyed on the transcript text.
async fn chat_completions(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    recorded.requests.lock().unwrap().push((auth, body.clone()));

    let messages = body["messages"].as_array().cloned().unwrap_or_default();
    let transcript = messages
        .get(1)
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default()
        .to_string();
    let second_stage = messages.len() > 2;

    if transcript.contains("explode") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }
    if transcript.contains("static noise") {
        return raw_completion("intent: voice_unknown");
    }
    if transcript.contains("tomorrow at 3") {
        return if second_stage {
            completion(json!({ "agreedDatetime": "2024-01-11T15:00:00" }))
        } else {
            completion(json!({ "intent": "voice_wants_call_back" }))
        };
    }
    if transcript.contains("Thursday at 10") {
        return if second_stage {
            completion(json!({ "agreedDatetime": "2024-01-11T10:00:00" }))
        } else {
            completion(json!({ "intent": "voice_interested" }))
        };
    }
    if transcript.contains("not interested") {
        return completion(json!({ "intent": "voice_not_interested" }));
    }
    completion(json!({ "intent": "voice_unknown" }))
}

/// Start the fake chat-completions server, return (base_url, recorder).
async fn start_llm_server() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(recorded.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{port}/v1"), recorded)
}

/// Start the classifications API over `backend`, return its base URL.
async fn start_api_server(backend: Arc<LibSqlBackend>) -> String {
    let app = classification_routes(ApiState { backend });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    format!("http://127.0.0.1:{port}")
}

async fn build_scheduler(base_url: &str) -> (Arc<LibSqlBackend>, ClassificationScheduler) {
    let backend = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let llm = Arc::new(
        OpenAiProvider::new(base_url, secrecy::SecretString::from("sk-test"), "gpt-4.1").unwrap(),
    );
    let classifier = Arc::new(LlmClassifier::new(llm));
    let processor = ThreadProcessor::new(Arc::clone(&backend), classifier);
    let scheduler =
        ClassificationScheduler::new(Arc::clone(&backend), processor, Duration::from_millis(25));
    (backend, scheduler)
}

async fn seed(backend: &LibSqlBackend, thread_id: &str, calls: &[(&str, &str, &str)]) {
    let conn = backend.conn();
    threads::insert(conn, thread_id, ThreadStatus::VoiceCallUnclassified)
        .await
        .unwrap();
    // 2024-01-10 10:00 in Singapore.
    let called_at = chrono::DateTime::parse_from_rfc3339("2024-01-10T02:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    for (call_id, transcript, tz) in calls {
        classifications::insert_voice_call(conn, call_id, thread_id, Some(called_at), transcript, tz)
            .await
            .unwrap();
    }
}

async fn status(backend: &LibSqlBackend, thread_id: &str) -> ThreadStatus {
    threads::get(backend.conn(), thread_id)
        .await
        .unwrap()
        .unwrap()
        .status
}

#[tokio::test]
async fn tick_classifies_threads_and_exposes_results() {
    timeout(TEST_TIMEOUT, async {
        let (base_url, recorded) = start_llm_server().await;
        let (backend, scheduler) = build_scheduler(&base_url).await;

        seed(
            &backend,
            "t-callback",
            &[
                ("vc-1", "Agent: hi\nUser: not interested right now", "Asia/Singapore"),
                ("vc-2", "Agent: hi again\nUser: call me tomorrow at 3", "Asia/Singapore"),
            ],
        )
        .await;
        seed(
            &backend,
            "t-meeting",
            &[("vc-3", "User: Thursday at 10 works", "Asia/Singapore")],
        )
        .await;

        let summary = scheduler.run_tick().await.unwrap();
        assert_eq!(
            summary,
            TickSummary {
                threads: 2,
                classified: 2,
                waiting: 0,
                failed: 0
            }
        );
        assert_eq!(status(&backend, "t-callback").await, ThreadStatus::VoiceCallClassified);
        assert_eq!(status(&backend, "t-meeting").await, ThreadStatus::VoiceCallClassified);

        // One round-trip for not-interested, two each for the others.
        let bodies = recorded.bodies();
        assert_eq!(bodies.len(), 5);
        for body in &bodies {
            assert_eq!(body["model"], "gpt-4.1");
            assert_eq!(body["temperature"], 0.0);
            assert_eq!(body["response_format"]["type"], "json_object");
        }
        assert!(
            recorded
                .auth_headers()
                .iter()
                .all(|h| h.as_deref() == Some("Bearer sk-test"))
        );

        // Stage 2 re-sends stage 1's answer and carries the local call time.
        let stage_two = &bodies[2]["messages"];
        assert_eq!(stage_two.as_array().unwrap().len(), 4);
        assert_eq!(stage_two[2]["role"], "assistant");
        assert!(stage_two[2]["content"].as_str().unwrap().contains("voice_wants_call_back"));
        assert!(stage_two[3]["content"].as_str().unwrap().contains("2024-01-10 10:00:00"));

        let rows = classifications::list_for_thread(backend.conn(), "t-callback")
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].intent, Intent::NotInterested);
        assert_eq!(rows[1].intent, Intent::WantsCallBack);
        assert_eq!(rows[1].interested_time, None);
        assert_eq!(
            rows[1].call_back_time.unwrap().to_rfc3339(),
            "2024-01-11T15:00:00+08:00"
        );

        // Read path over real HTTP.
        let api = start_api_server(Arc::clone(&backend)).await;
        let body: Value = reqwest::get(format!("{api}/classifications/t-meeting"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let list = body["classifications"].as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["campaignThreadID"], "t-meeting");
        assert_eq!(list[0]["intent"], "voice_interested");
        assert_eq!(list[0]["interestedTime"], "2024-01-11T10:00:00+08:00");
        assert!(list[0]["callBackTime"].is_null());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn failing_call_holds_thread_until_retry() {
    timeout(TEST_TIMEOUT, async {
        let (base_url, recorded) = start_llm_server().await;
        let (backend, scheduler) = build_scheduler(&base_url).await;

        seed(
            &backend,
            "t-1",
            &[
                ("vc-1", "User: not interested", "Asia/Singapore"),
                ("vc-2", "User: explode", "Asia/Singapore"),
                ("vc-3", "User: call me tomorrow at 3", "Asia/Singapore"),
            ],
        )
        .await;
        seed(&backend, "t-2", &[("vc-4", "User: not interested", "Asia/Singapore")]).await;

        let summary = scheduler.run_tick().await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.classified, 1);

        // vc-3 never reached the model; vc-1's row stays.
        assert_eq!(recorded.bodies().len(), 3);
        assert_eq!(status(&backend, "t-1").await, ThreadStatus::VoiceCallUnclassified);
        assert_eq!(status(&backend, "t-2").await, ThreadStatus::VoiceCallClassified);
        let rows = classifications::list_for_thread(backend.conn(), "t-1")
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        // Next tick retries only the outstanding calls and fails at the same place.
        scheduler.run_tick().await.unwrap();
        let rows = classifications::list_for_thread(backend.conn(), "t-1")
            .await
            .unwrap();
        assert_eq!(rows.len(), 1, "already-classified calls are not duplicated");
        assert_eq!(recorded.bodies().len(), 4);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn malformed_model_answer_keeps_thread_unclassified() {
    timeout(TEST_TIMEOUT, async {
        let (base_url, recorded) = start_llm_server().await;
        let (backend, scheduler) = build_scheduler(&base_url).await;
        seed(&backend, "t-1", &[("vc-1", "User: static noise", "Asia/Singapore")]).await;

        let summary = scheduler.run_tick().await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(recorded.bodies().len(), 1);
        assert_eq!(status(&backend, "t-1").await, ThreadStatus::VoiceCallUnclassified);
        assert!(
            classifications::list_for_thread(backend.conn(), "t-1")
                .await
                .unwrap()
                .is_empty()
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unknown_timezone_fails_only_that_thread() {
    timeout(TEST_TIMEOUT, async {
        let (base_url, _recorded) = start_llm_server().await;
        let (backend, scheduler) = build_scheduler(&base_url).await;

        seed(&backend, "t-bad", &[("vc-1", "User: call me tomorrow at 3", "Mars/Olympus")]).await;
        seed(&backend, "t-good", &[("vc-2", "User: hello?", "Asia/Singapore")]).await;

        let summary = scheduler.run_tick().await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(status(&backend, "t-bad").await, ThreadStatus::VoiceCallUnclassified);
        assert_eq!(status(&backend, "t-good").await, ThreadStatus::VoiceCallClassified);
        assert!(
            classifications::list_for_thread(backend.conn(), "t-bad")
                .await
                .unwrap()
                .is_empty()
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn spawned_scheduler_stops_between_ticks() {
    timeout(TEST_TIMEOUT, async {
        let (base_url, _recorded) = start_llm_server().await;
        let (backend, scheduler) = build_scheduler(&base_url).await;
        seed(&backend, "t-1", &[("vc-1", "User: not interested", "Asia/Singapore")]).await;
        seed(&backend, "t-empty", &[]).await;

        let (handle, shutdown) = scheduler.spawn();
        while status(&backend, "t-1").await != ThreadStatus::VoiceCallClassified {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        shutdown.send(true).unwrap();
        handle.await.unwrap();

        // A thread with no calls is never advanced.
        assert_eq!(status(&backend, "t-empty").await, ThreadStatus::VoiceCallUnclassified);
    })
    .await
    .expect("test timed out");
}
