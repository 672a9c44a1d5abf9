//! Route configuration.

use std::sync::Arc;

use alertlark_core::{AlertSource, CorrelationStore, Messenger};
use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers::{callback, notify, ping};
use crate::state::AppState;

/// Create the alertlark router.
pub fn create_router<M, S, A>(state: Arc<AppState<M, S, A>>) -> Router
where
    M: Messenger + 'static,
    S: CorrelationStore + 'static,
    A: AlertSource + 'static,
{
    Router::new()
        .route("/ping", get(ping))
        .route("/notify", post(notify::<M, S, A>))
        .route("/callback", post(callback::<M, S, A>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use alertlark_core::MemoryStore;
    use alertlark_core::testing::{FakeAlertSource, FakeMessenger, SentMessage};
    use alertlark_core::{CorrelationStore, SourceAlert};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const TOKEN: &str = "vt";
    const EMAIL: &str = "oncall@example.com";

    struct Harness {
        messenger: FakeMessenger,
        store: MemoryStore,
        source: FakeAlertSource,
        router: Router,
    }

    impl Harness {
        fn new(messenger: FakeMessenger, source: FakeAlertSource) -> Self {
            let store = MemoryStore::new();
            let state = Arc::new(AppState::new(
                Arc::new(messenger.clone()),
                Arc::new(store.clone()),
                Arc::new(source.clone()),
                TOKEN,
            ));
            Self {
                messenger,
                store,
                source,
                router: create_router(state),
            }
        }

        fn standard() -> Self {
            Self::new(
                FakeMessenger::new().with_user("ou_1", Some(EMAIL)),
                FakeAlertSource::new().with_alert(SourceAlert::new("X").with_label("alertname", "HighCPU")),
            )
        }

        async fn post(&self, uri: &str, body: impl Into<Body>) -> (StatusCode, Vec<u8>) {
            let request = Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap();
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            (status, bytes.to_vec())
        }

        async fn wait_for_texts(&self, message_id: &str) -> Vec<String> {
            for _ in 0..100 {
                let texts = self.messenger.texts_to(message_id);
                if !texts.is_empty() {
                    return texts;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            Vec::new()
        }
    }

    fn webhook(color: &str, callback_id: &str) -> String {
        serde_json::json!({
            "attachments": [
                {"color": color, "callback_id": callback_id, "title": "T", "text": "t"}
            ],
            "channel": "C",
            "username": "alertmanager"
        })
        .to_string()
    }

    fn card_action(tag: &str, option: Option<&str>) -> String {
        signed_card_action(TOKEN, tag, option)
    }

    fn signed_card_action(token: &str, tag: &str, option: Option<&str>) -> String {
        serde_json::json!({
            "schema": "2.0",
            "header": {"event_type": "card.action.trigger", "event_id": "ev_1", "token": token},
            "event": {
                "operator": {"open_id": "ou_1"},
                "action": {"tag": tag, "value": {"alert_id": "X,"}, "option": option},
                "context": {"open_message_id": "om_card", "open_chat_id": "oc_chat"}
            }
        })
        .to_string()
    }

    mod ping_tests {
        use super::*;

        #[tokio::test]
        async fn ping_is_ok() {
            let harness = Harness::standard();
            let request = Request::builder().uri("/ping").body(Body::empty()).unwrap();

            let response = harness.router.clone().oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert!(body.is_empty());
        }

        #[tokio::test]
        async fn unknown_route_is_not_found() {
            let harness = Harness::standard();
            let (status, _) = harness.post("/nope", Body::empty()).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }
    }

    mod notify_tests {
        use super::*;

        #[tokio::test]
        async fn firing_then_resolved_threads_reply() {
            let harness = Harness::standard();

            let (status, body) = harness.post("/notify", webhook("red", "X")).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, b"ok");

            let sent = harness.messenger.sent();
            assert_eq!(sent.len(), 1);
            let SentMessage::New { channel, message_id, content } = &sent[0] else {
                panic!("expected new message, got {:?}", sent[0]);
            };
            assert_eq!(channel, "C");
            let card: serde_json::Value = serde_json::from_str(content).unwrap();
            assert_eq!(card["header"]["template"], "red");
            assert_eq!(harness.store.peek("X").as_ref(), Some(message_id));

            let (status, _) = harness.post("/notify", webhook("green", "X")).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(harness.messenger.replies_to(message_id), 1);
            assert!(harness.store.get("X").await.unwrap().is_none());
        }

        #[tokio::test]
        async fn malformed_webhook_is_bad_request() {
            let harness = Harness::standard();

            let (status, body) = harness.post("/notify", "{not json").await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["error"], "invalid_request");
            assert!(harness.messenger.sent().is_empty());
        }

        #[tokio::test]
        async fn messaging_failure_is_internal_error() {
            let harness = Harness::new(FakeMessenger::new().failing_after(0), FakeAlertSource::new());

            let (status, _) = harness.post("/notify", webhook("red", "X")).await;

            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(harness.store.is_empty());
        }
    }

    mod callback_tests {
        use super::*;

        #[tokio::test]
        async fn url_verification_echoes_challenge() {
            let harness = Harness::standard();
            let body = r#"{"type": "url_verification", "token": "vt", "challenge": "abc"}"#;

            let (status, body) = harness.post("/callback", body).await;

            assert_eq!(status, StatusCode::OK);
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json, serde_json::json!({"challenge": "abc"}));
        }

        #[tokio::test]
        async fn url_verification_with_wrong_token_is_unauthorized() {
            let harness = Harness::standard();
            let body = r#"{"type": "url_verification", "token": "wrong", "challenge": "abc"}"#;

            let (status, body) = harness.post("/callback", body).await;

            assert_eq!(status, StatusCode::UNAUTHORIZED);
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert!(json.get("challenge").is_none());
        }

        #[tokio::test]
        async fn unreadable_body_gets_error_toast() {
            let harness = Harness::standard();

            let (status, body) = harness.post("/callback", "garbage").await;

            assert_eq!(status, StatusCode::OK);
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["toast"]["type"], "error");
            assert_eq!(json["toast"]["content"], "Failed to read request body");
        }

        #[tokio::test]
        async fn select_action_is_acknowledged_then_silenced() {
            let harness = Harness::standard();

            let (status, body) = harness
                .post("/callback", card_action("select_static", Some("1h")))
                .await;

            assert_eq!(status, StatusCode::OK);
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["toast"]["type"], "info");
            assert_eq!(json["toast"]["content"], "Request received, processing...");

            let texts = harness.wait_for_texts("om_card").await;
            assert_eq!(texts.len(), 1);
            assert!(texts[0].starts_with("Silence created successfully. It will expire at "));
            assert!(texts[0].ends_with(&format!(" WIB by {EMAIL}.")));

            let silences = harness.source.silences();
            assert_eq!(silences.len(), 1);
            assert_eq!(
                silences[0].ends_at - silences[0].starts_at,
                chrono::Duration::hours(1)
            );
        }

        #[tokio::test]
        async fn unknown_alert_gets_failure_reply() {
            let harness = Harness::new(
                FakeMessenger::new().with_user("ou_1", Some(EMAIL)),
                FakeAlertSource::new(),
            );

            harness.post("/callback", card_action("button", None)).await;

            let texts = harness.wait_for_texts("om_card").await;
            assert_eq!(texts, vec![format!("Failed to create silence for alert X by {EMAIL}.")]);
        }

        #[tokio::test]
        async fn action_with_wrong_token_is_rejected() {
            let harness = Harness::standard();

            let (status, body) = harness
                .post("/callback", signed_card_action("forged", "select_static", Some("1h")))
                .await;

            assert_eq!(status, StatusCode::UNAUTHORIZED);
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["error"], "unauthorized");
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(harness.source.silences().is_empty());
            assert!(harness.messenger.sent().is_empty());
        }

        #[tokio::test]
        async fn action_without_token_is_rejected() {
            let harness = Harness::standard();
            let body = r#"{"event": {"action": {"tag": "button", "value": {"alert_id": "X"}}}}"#;

            let (status, _) = harness.post("/callback", body).await;

            assert_eq!(status, StatusCode::UNAUTHORIZED);
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(harness.source.silences().is_empty());
        }

        #[tokio::test]
        async fn other_action_is_acknowledged_and_ignored() {
            let harness = Harness::standard();

            let (status, _) = harness.post("/callback", card_action("input", None)).await;

            assert_eq!(status, StatusCode::OK);
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(harness.messenger.sent().is_empty());
            assert!(harness.source.silences().is_empty());
        }
    }
}
