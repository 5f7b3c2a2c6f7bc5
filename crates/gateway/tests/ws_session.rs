//! End-to-end duplex session over a real socket.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

use adj_domain::config::Config;
use adj_gateway::{api, bootstrap};
use adj_sessions::SessionState;

async fn serve(config: Config) -> (adj_gateway::state::AppState, std::net::SocketAddr) {
    let state = bootstrap::build_app_state(config).await.unwrap();
    let app = api::router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (state, addr)
}

async fn next_json<S>(ws: &mut S) -> Value
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("transport error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn chat_round_trip_and_clean_close() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.services.storage.state_path = tmp.path().join("state");
    config.services.storage.workspace_path = tmp.path().join("workspace");
    config.auth.token_env = "ADJUTANT_TEST_TOKEN_UNSET".into();

    let (state, addr) = serve(config).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws/assistant"))
        .await
        .unwrap();

    // Hello frame carries the gateway session id.
    let hello = next_json(&mut ws).await;
    assert_eq!(hello["type"], "session");
    let session_id = hello["session_id"].as_str().unwrap().to_owned();
    assert_eq!(
        state.sessions.get(&session_id).unwrap().state,
        SessionState::Active
    );

    ws.send(Message::Text(
        json!({ "message": "hello", "type": "chat" }).to_string(),
    ))
    .await
    .unwrap();

    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "response");
    assert_eq!(reply["session_id"], session_id.as_str());
    assert_eq!(reply["data"]["reply"], "ack: hello");

    // A malformed frame gets an error notice without dropping us.
    ws.send(Message::Text("not json".into())).await.unwrap();
    let notice = next_json(&mut ws).await;
    assert_eq!(notice["type"], "error");

    ws.send(Message::Text(json!({ "message": "again" }).to_string()))
        .await
        .unwrap();
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["data"]["reply"], "ack: again");

    ws.close(None).await.unwrap();

    // Teardown runs on the server side of the close.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        match state.sessions.get(&session_id) {
            Some(r) if r.state == SessionState::Closed => break,
            _ if tokio::time::Instant::now() > deadline => {
                panic!("session was not reclaimed after close")
            }
            _ => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
}

#[tokio::test]
async fn invalid_token_is_rejected_before_the_upgrade() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.services.storage.state_path = tmp.path().join("state");
    config.services.storage.workspace_path = tmp.path().join("workspace");
    config.auth.token_env = "ADJUTANT_TEST_TOKEN_UNSET".into();
    config.auth.principals = vec![adj_domain::config::Principal {
        id: "alice".into(),
        token: "alpha-token-0123456789".into(),
    }];

    let (_state, addr) = serve(config).await;

    let err = tokio_tungstenite::connect_async(format!(
        "ws://{addr}/ws/assistant?token=wrong"
    ))
    .await
    .unwrap_err();
    match err {
        tokio_tungstenite::tungstenite::Error::Http(resp) => {
            assert_eq!(resp.status(), 401);
        }
        other => panic!("expected HTTP rejection, got {other:?}"),
    }

    // The right token upgrades fine.
    let (mut ws, _) = tokio_tungstenite::connect_async(format!(
        "ws://{addr}/ws/assistant?token=alpha-token-0123456789"
    ))
    .await
    .unwrap();
    let hello = next_json(&mut ws).await;
    assert_eq!(hello["type"], "session");
    ws.close(None).await.unwrap();
}
