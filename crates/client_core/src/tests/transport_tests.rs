use super::*;
use std::sync::Mutex as StdMutex;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use shared::domain::{PostId, VoteDirection, VoteState};
use tokio::{net::TcpListener, sync::Mutex};

use crate::actions::{ImageUpload, LoginAction, LoginForm, NewPostAction, NewPostForm, VoteAction};

#[derive(Clone, Default)]
struct ServerState {
    login_bodies: Arc<Mutex<Vec<serde_json::Value>>>,
    post_fields: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

/// Distrusts every invisible token and accepts any fallback response.
async fn handle_login(
    State(state): State<ServerState>,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    let trusted = body.get("CaptchaV2").is_some();
    state.login_bodies.lock().await.push(body);
    if trusted {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    }
}

async fn handle_new_post(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let name = field.name().unwrap_or_default().to_string();
        let data = field.bytes().await.expect("field bytes").to_vec();
        state.post_fields.lock().await.push((name, data));
    }
    Json(serde_json::json!({ "UUID": "fresh-post" }))
}

async fn handle_vote() -> impl IntoResponse {
    (StatusCode::GONE, "")
}

async fn spawn_forum_server() -> Result<(String, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let app = Router::new()
        .route("/login", post(handle_login))
        .route("/post/new", post(handle_new_post))
        .route("/post/:id/vote", post(handle_vote))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

struct SolvedChallenge {
    response: StdMutex<Option<String>>,
}

#[async_trait]
impl ChallengeProvider for SolvedChallenge {
    async fn execute(&self, _action: &str) -> Result<ChallengeToken> {
        Ok(ChallengeToken("low-score-token".into()))
    }

    fn show(&self) {
        *self.response.lock().expect("lock") = Some("human-proof".into());
    }

    fn hide(&self) {}

    fn response(&self) -> Option<FallbackChallengeResponse> {
        self.response
            .lock()
            .expect("lock")
            .clone()
            .map(FallbackChallengeResponse)
    }

    fn reset(&self) {
        *self.response.lock().expect("lock") = None;
    }
}

#[derive(Default)]
struct Log {
    notices: StdMutex<Vec<Notice>>,
    locations: StdMutex<Vec<String>>,
}

impl Notifier for Log {
    fn notify(&self, notice: Notice) {
        self.notices.lock().expect("lock").push(notice);
    }
}

impl Navigator for Log {
    fn navigate(&self, location: &str) {
        self.locations.lock().expect("lock").push(location.to_string());
    }
}

fn collaborators(server_url: &str, log: &Arc<Log>) -> Collaborators {
    Collaborators {
        transport: Arc::new(HttpTransport::new(format!("{server_url}/"))),
        challenge: Arc::new(SolvedChallenge {
            response: StdMutex::new(None),
        }),
        notifier: log.clone(),
        navigator: log.clone(),
    }
}

#[tokio::test]
async fn login_round_trips_through_fallback_over_http() {
    let (server_url, state) = spawn_forum_server().await.expect("spawn server");
    let log = Arc::new(Log::default());
    let mut controller = SubmissionController::new(
        LoginAction::new(Some("/post/xyz".into())),
        collaborators(&server_url, &log),
    );

    let status = controller
        .submit(LoginForm {
            email: "cat@example.com".into(),
            password: "meow".into(),
        })
        .await;
    assert!(status.is_awaiting_fallback(), "{status:?}");

    let status = controller.complete_fallback().await;
    assert!(matches!(status, FlowStatus::Completed(_)), "{status:?}");

    let bodies = state.login_bodies.lock().await.clone();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["Captcha"], "low-score-token");
    assert_eq!(bodies[1]["CaptchaV2"], "human-proof");
    assert!(bodies[1].get("Captcha").is_none());
    assert_eq!(*log.locations.lock().expect("lock"), ["/post/xyz"]);
}

#[tokio::test]
async fn new_post_is_sent_as_multipart() {
    let (server_url, state) = spawn_forum_server().await.expect("spawn server");
    let log = Arc::new(Log::default());
    let mut controller = SubmissionController::new(NewPostAction, collaborators(&server_url, &log));

    controller
        .submit(NewPostForm {
            title: "Dog".into(),
            description: "Good dog".into(),
            image: Some(ImageUpload {
                filename: "dog.png".into(),
                mime_type: Some("image/png".into()),
                bytes: b"\x89PNG".to_vec(),
            }),
        })
        .await;

    let fields = state.post_fields.lock().await.clone();
    let names: Vec<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["title", "description", "image", "captcha"]);
    assert_eq!(fields[2].1, b"\x89PNG".to_vec());
    assert_eq!(fields[3].1, b"low-score-token".to_vec());
    assert_eq!(*log.locations.lock().expect("lock"), ["/post/fresh-post"]);
}

#[tokio::test]
async fn vote_gone_status_is_read_from_http_response() {
    let (server_url, _state) = spawn_forum_server().await.expect("spawn server");
    let log = Arc::new(Log::default());
    let mut controller = SubmissionController::new(
        VoteAction::new(PostId("deleted".into()), true, VoteState::None),
        collaborators(&server_url, &log),
    );

    let status = controller.submit(VoteDirection::Up).await;

    assert!(matches!(status, FlowStatus::Failed(SubmissionError::Gone { .. })));
    let notices = log.notices.lock().expect("lock").clone();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "This post has been deleted.");
}

#[tokio::test]
async fn unreachable_server_is_a_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let log = Arc::new(Log::default());
    let mut controller = SubmissionController::new(
        LoginAction::default(),
        collaborators(&format!("http://{addr}"), &log),
    );

    let status = controller
        .submit(LoginForm {
            email: "cat@example.com".into(),
            password: "meow".into(),
        })
        .await;

    assert!(matches!(
        status,
        FlowStatus::Failed(SubmissionError::Transport(_))
    ));
}
