//! HTTP client for the external moderation oracle.
//!
//! `POST {base}/check` with `{"text": "..."}`; the oracle answers
//! `{"a_signer": <flag>, "proba": <0..1>}`. Every failure is reported as
//! [`ModerationOutcome::Unavailable`] and never as an error.

use std::time::Duration;

use civic_core::{ModerationOutcome, Moderator};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

#[derive(Serialize)]
struct CheckRequest<'a> {
    text: &'a str,
}

#[derive(Clone)]
pub struct ModerationClient {
    http: reqwest::Client,
    base_url: String,
    enabled: bool,
}

impl ModerationClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            enabled: true,
        })
    }

    /// Never calls out; every check yields [`ModerationOutcome::Disabled`].
    pub fn disabled() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: String::new(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn ask(&self, text: &str) -> Result<ModerationOutcome, String> {
        let url = format!("{}/check", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&CheckRequest { text })
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !resp.status().is_success() {
            return Err(format!("oracle returned {}", resp.status()));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| format!("unreadable answer: {e}"))?;
        let flagged = truthy(body.get("a_signer"));
        let probability = numeric(body.get("proba"));
        debug!("Moderation answer: flagged={} proba={}", flagged, probability);

        Ok(ModerationOutcome::from_oracle(flagged, probability))
    }
}

impl Moderator for ModerationClient {
    async fn check(&self, text: &str) -> ModerationOutcome {
        if !self.enabled {
            return ModerationOutcome::Disabled;
        }
        self.ask(text)
            .await
            .unwrap_or_else(ModerationOutcome::Unavailable)
    }
}

/// Loose truthiness: absent, null, false, 0 and "" are false.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

/// Loose number coercion; anything unusable is 0.
fn numeric(value: Option<&Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        Some(Value::Bool(true)) => 1.0,
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use civic_core::ModerationVerdict;
    use serde_json::json;
    use std::time::Instant;

    /// Serves `app` from a throwaway listener and returns its base URL.
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Serves `answer` on `/check`.
    async fn oracle(answer: Value) -> String {
        serve(Router::new().route(
            "/check",
            post(move |Json(_): Json<Value>| {
                let answer = answer.clone();
                async move { Json(answer) }
            }),
        ))
        .await
    }

    #[tokio::test]
    async fn scores_from_oracle_answer() {
        let url = oracle(json!({ "a_signer": true, "proba": 0.87 })).await;
        let client = ModerationClient::new(&url, Duration::from_secs(2)).unwrap();

        let outcome = client.check("texte").await;
        assert_eq!(
            outcome,
            ModerationOutcome::Scored(ModerationVerdict {
                score: 87,
                flagged: true
            })
        );
    }

    #[tokio::test]
    async fn loose_answer_fields_are_coerced() {
        let url = oracle(json!({ "a_signer": 0, "proba": "0.2" })).await;
        let client = ModerationClient::new(&url, Duration::from_secs(2)).unwrap();

        let verdict = client.check("texte").await.verdict();
        assert_eq!(verdict.score, 20);
        assert!(!verdict.flagged);
    }

    #[tokio::test]
    async fn unreachable_oracle_is_unavailable() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            ModerationClient::new(&format!("http://{addr}"), Duration::from_millis(500)).unwrap();
        let outcome = client.check("texte").await;
        assert!(matches!(outcome, ModerationOutcome::Unavailable(_)));
        assert_eq!(outcome.verdict(), ModerationVerdict::default());
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let url = serve(Router::new().route(
            "/check",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "proba": 0.9 }))) }),
        ))
        .await;
        let client = ModerationClient::new(&url, Duration::from_secs(2)).unwrap();

        let outcome = client.check("texte").await;
        assert!(matches!(&outcome, ModerationOutcome::Unavailable(why) if why.contains("500")));
        assert_eq!(outcome.verdict(), ModerationVerdict::default());
    }

    #[tokio::test]
    async fn non_json_answer_is_unavailable() {
        let url = serve(Router::new().route("/check", post(|| async { "<html>busy</html>" }))).await;
        let client = ModerationClient::new(&url, Duration::from_secs(2)).unwrap();

        let outcome = client.check("texte").await;
        assert!(matches!(outcome, ModerationOutcome::Unavailable(_)));
        assert_eq!(outcome.verdict(), ModerationVerdict::default());
    }

    #[tokio::test]
    async fn slow_oracle_times_out_as_unavailable() {
        let url = serve(Router::new().route(
            "/check",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "a_signer": true, "proba": 1.0 }))
            }),
        ))
        .await;
        let client = ModerationClient::new(&url, Duration::from_millis(100)).unwrap();

        let started = Instant::now();
        let outcome = client.check("texte").await;
        assert!(matches!(outcome, ModerationOutcome::Unavailable(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn disabled_client_never_calls_out() {
        let client = ModerationClient::disabled();
        assert!(!client.is_enabled());
        assert_eq!(client.check("texte").await, ModerationOutcome::Disabled);
    }

    #[test]
    fn coercion_helpers() {
        assert!(truthy(Some(&json!("oui"))));
        assert!(!truthy(Some(&json!(""))));
        assert!(!truthy(None));
        assert_eq!(numeric(Some(&json!(null))), 0.0);
        assert_eq!(numeric(Some(&json!("abc"))), 0.0);
        assert_eq!(numeric(Some(&json!(0.5))), 0.5);
    }
}
