//! HTTP request handlers.

use std::sync::Arc;

use alertlark_client::{CallbackBody, CallbackResponse, ChallengeResponse};
use alertlark_core::{
    AlertSource, CallbackEvent, CallbackOutcome, CorrelationStore, Messenger, WebhookPayload,
};
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, error, info, warn};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Handle GET /ping - liveness probe.
pub async fn ping() -> StatusCode {
    StatusCode::OK
}

/// Handle POST /notify - deliver an Alertmanager webhook to chat.
pub async fn notify<M, S, A>(
    State(state): State<Arc<AppState<M, S, A>>>,
    body: Bytes,
) -> ServerResult<&'static str>
where
    M: Messenger + 'static,
    S: CorrelationStore + 'static,
    A: AlertSource + 'static,
{
    let webhook: WebhookPayload = serde_json::from_slice(&body)?;
    debug!(
        chat_id = %webhook.channel,
        alerts = webhook.alerts.len(),
        "received webhook"
    );

    let outcomes = state.notify().notify_alerts(&webhook).await.map_err(|e| {
        error!(chat_id = %webhook.channel, error = %e, "failed to notify alerts");
        ServerError::from(e)
    })?;

    let degraded = outcomes.iter().filter(|o| o.bookkeeping.is_some()).count();
    info!(
        chat_id = %webhook.channel,
        delivered = outcomes.len(),
        degraded,
        "webhook delivered"
    );
    Ok("ok")
}

/// Handle POST /callback - card actions and URL verification.
///
/// URL verification is answered directly. Card actions carrying the
/// configured verification token are acknowledged with a toast right away
/// and processed in a detached task; any other token is rejected with 401.
pub async fn callback<M, S, A>(
    State(state): State<Arc<AppState<M, S, A>>>,
    body: Bytes,
) -> Response
where
    M: Messenger + 'static,
    S: CorrelationStore + 'static,
    A: AlertSource + 'static,
{
    let parsed = match CallbackBody::parse(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "failed to read callback body");
            return Json(CallbackResponse::unreadable_body()).into_response();
        }
    };

    match parsed {
        CallbackBody::UrlVerification(request) => {
            if !state.verifies(&request.token) {
                warn!("invalid verification token");
                return ServerError::Unauthorized.into_response();
            }
            info!("answered url verification");
            Json(ChallengeResponse {
                challenge: request.challenge,
            })
            .into_response()
        }
        CallbackBody::CardAction(payload) => {
            if !state.verifies(payload.token()) {
                warn!(event_id = %payload.event_id(), "card action with invalid verification token");
                return ServerError::Unauthorized.into_response();
            }
            let event_id = payload.event_id().to_string();
            let event = payload.into_event();
            let workflow = state.callback();
            tokio::spawn(async move {
                match workflow.process_event(&event).await {
                    Ok(outcome) => log_outcome(&event, &outcome),
                    Err(e) => error!(
                        event_id = %event_id,
                        alert_id = %event.alert_id,
                        error = %e,
                        "failed to process card action"
                    ),
                }
            });
            Json(CallbackResponse::processing()).into_response()
        }
    }
}

fn log_outcome(event: &CallbackEvent, outcome: &CallbackOutcome) {
    match outcome {
        CallbackOutcome::Ignored { tag } => {
            debug!(alert_id = %event.alert_id, action = %tag, "card action ignored");
        }
        CallbackOutcome::Silenced { silence, .. } => {
            info!(
                alert_id = %event.alert_id,
                silence_id = %silence.silence_id,
                "card action silenced alert"
            );
        }
        CallbackOutcome::Failed { error, .. } => {
            warn!(alert_id = %event.alert_id, error = %error, "card action failed");
        }
    }
}
