//! End-to-end tests over real WebSocket connections.
//!
//! Each test binds an ephemeral port, serves the real gateway app, and
//! drives it with tokio-tungstenite clients.

use std::time::Duration;

use {
    futures::{SinkExt, StreamExt},
    serde_json::{Value, json},
    tokio::net::TcpStream,
    tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message},
};

use {
    intrachat_config::IntrachatConfig,
    intrachat_gateway::{server, state::GatewayState},
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SEED_CPF: &str = "20030321778";
const SEED_SENHA: &str = "SergioP10";

async fn spawn_gateway() -> String {
    let state = GatewayState::new(&IntrachatConfig::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(server::serve(listener, state));
    format!("ws://{addr}/ws")
}

async fn connect(url: &str) -> Client {
    connect_async(url).await.expect("websocket connect").0
}

async fn send_frame(client: &mut Client, frame: Value) {
    client
        .send(Message::Text(frame.to_string().into()))
        .await
        .expect("send frame");
}

async fn recv_frame(client: &mut Client) -> Value {
    let deadline = Duration::from_secs(5);
    loop {
        let received = tokio::time::timeout(deadline, client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .expect("websocket error");
        if let Message::Text(text) = received {
            return serde_json::from_str(text.as_str()).expect("frames are JSON");
        }
    }
}

/// Assert that no text frame arrives within a short window.
async fn assert_quiet(client: &mut Client) {
    let outcome = tokio::time::timeout(Duration::from_millis(200), client.next()).await;
    assert!(outcome.is_err(), "expected no frame, got {outcome:?}");
}

async fn login(client: &mut Client, cpf: &str, senha: &str) {
    send_frame(client, json!({"type": "login", "data": {"cpf": cpf, "senha": senha}})).await;
    let event = recv_frame(client).await;
    assert_eq!(event["type"], "loginSuccess", "login failed: {event}");
}

async fn register(admin: &mut Client, cpf: &str, nome: &str, setor: &str) -> Value {
    send_frame(
        admin,
        json!({"type": "register", "data": {
            "cpf": cpf, "senha": "pw", "nome": nome, "setor": setor, "cargo": "Dev",
        }}),
    )
    .await;
    recv_frame(admin).await
}

#[tokio::test]
async fn seed_registers_users_and_directory_reflects_presence() {
    let url = spawn_gateway().await;
    let mut admin = connect(&url).await;

    // Wrong password first.
    send_frame(
        &mut admin,
        json!({"type": "login", "data": {"cpf": SEED_CPF, "senha": "nope"}}),
    )
    .await;
    assert_eq!(recv_frame(&mut admin).await["type"], "loginError");

    login(&mut admin, SEED_CPF, SEED_SENHA).await;

    let event = register(&mut admin, "11111111111", "New User", "T.I").await;
    assert_eq!(event["type"], "registerSuccess");

    // Same cpf again: rejected.
    let event = register(&mut admin, "11111111111", "New User", "T.I").await;
    assert_eq!(event["type"], "registerError");
    assert_eq!(event["data"]["message"], "CPF já cadastrado");

    // The fresh account sees exactly the seed, online.
    let mut user = connect(&url).await;
    login(&mut user, "11111111111", "pw").await;
    send_frame(&mut user, json!({"type": "getUsers", "data": {}})).await;
    let event = recv_frame(&mut user).await;
    assert_eq!(event["type"], "usersList");
    let list = event["data"].as_array().expect("array");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["cpf"], SEED_CPF);
    assert_eq!(list[0]["online"], true);
}

#[tokio::test]
async fn two_users_exchange_messages_and_a_bystander_hears_nothing() {
    let url = spawn_gateway().await;
    let mut admin = connect(&url).await;
    login(&mut admin, SEED_CPF, SEED_SENHA).await;
    for (cpf, nome) in [("111", "Alice"), ("222", "Bruno"), ("333", "Carla")] {
        let event = register(&mut admin, cpf, nome, "Comercial").await;
        assert_eq!(event["type"], "registerSuccess");
    }

    let mut alice = connect(&url).await;
    login(&mut alice, "111", "pw").await;
    let mut bruno = connect(&url).await;
    login(&mut bruno, "222", "pw").await;
    let mut carla = connect(&url).await;
    login(&mut carla, "333", "pw").await;

    send_frame(
        &mut alice,
        json!({"type": "startConversation", "data": {"targetCpf": "222"}}),
    )
    .await;
    let started = recv_frame(&mut alice).await;
    assert_eq!(started["type"], "conversationStarted");
    assert_eq!(started["data"]["conversationId"], "111-222");
    assert_eq!(started["data"]["targetUser"]["nome"], "Bruno");

    send_frame(
        &mut alice,
        json!({"type": "sendMessage", "data": {"conversationId": "111-222", "content": "hi"}}),
    )
    .await;
    // Bruno replies only after seeing the first message, so the append
    // order is deterministic.
    let first = recv_frame(&mut bruno).await;
    assert_eq!(first["type"], "newMessage");
    assert_eq!(first["data"]["message"]["content"], "hi");
    assert_eq!(first["data"]["message"]["sender"]["nome"], "Alice");
    send_frame(
        &mut bruno,
        json!({"type": "sendMessage", "data": {"conversationId": "111-222", "content": "hello"}}),
    )
    .await;
    assert_eq!(recv_frame(&mut bruno).await["data"]["message"]["content"], "hello");

    // Alice sees both, in append order.
    let first = recv_frame(&mut alice).await;
    let second = recv_frame(&mut alice).await;
    assert_eq!(first["data"]["message"]["content"], "hi");
    assert_eq!(second["data"]["message"]["content"], "hello");
    assert_eq!(second["data"]["isGroup"], false);
    assert_quiet(&mut carla).await;
}

#[tokio::test]
async fn disconnect_removes_presence_and_fan_out_skips_the_offline_party() {
    let url = spawn_gateway().await;
    let mut admin = connect(&url).await;
    login(&mut admin, SEED_CPF, SEED_SENHA).await;
    let event = register(&mut admin, "111", "Alice", "Comercial").await;
    assert_eq!(event["type"], "registerSuccess");

    let mut alice = connect(&url).await;
    login(&mut alice, "111", "pw").await;
    send_frame(
        &mut alice,
        json!({"type": "startConversation", "data": {"targetCpf": SEED_CPF}}),
    )
    .await;
    let id = recv_frame(&mut alice).await["data"]["conversationId"]
        .as_str()
        .expect("id")
        .to_string();

    // The seed drops off; give the server a beat to run cleanup.
    admin.close(None).await.expect("close");
    tokio::time::sleep(Duration::from_millis(100)).await;

    send_frame(
        &mut alice,
        json!({"type": "sendMessage", "data": {"conversationId": id, "content": "anyone?"}}),
    )
    .await;
    // Alice still gets her own echo and the server stays healthy.
    let event = recv_frame(&mut alice).await;
    assert_eq!(event["data"]["message"]["content"], "anyone?");

    send_frame(&mut alice, json!({"type": "getUsers", "data": {}})).await;
    let event = recv_frame(&mut alice).await;
    assert_eq!(event["data"][0]["cpf"], SEED_CPF);
    assert_eq!(event["data"][0]["online"], false);
}

#[tokio::test]
async fn legacy_frames_reach_every_connected_socket() {
    let url = spawn_gateway().await;
    let mut admin = connect(&url).await;
    login(&mut admin, SEED_CPF, SEED_SENHA).await;
    // Anonymous sockets participate in the legacy relay too.
    let mut anon = connect(&url).await;

    send_frame(&mut anon, json!({"type": "shout", "data": {"text": "legacy"}})).await;
    assert_eq!(recv_frame(&mut anon).await["data"]["text"], "legacy");
    assert_eq!(recv_frame(&mut admin).await["data"]["text"], "legacy");
}
