//! End-to-end tests over HTTP
//!
//! The router is served on an ephemeral port; upstream model and mail
//! services are stubbed, so no API keys are needed.

use async_trait::async_trait;
use pixy_relay::storage::memory::InMemoryStorage;
use pixy_relay::storage::{ConversationStorage, DEFAULT_SESSION};
use pixy_relay::{
    server, AppState, ContactMessage, ConversationRelay, GatewayError, GeminiClient,
    HttpMailRelay, MailError, MailRelay, ModelGateway, PromptBuilder, PromptMessage, PromptRole,
    Role, Settings,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FALLBACK: &str = "Pixy is napping 🍄";

/// Replies "pixy says: <message>" and remembers every prompt it was given
#[derive(Default)]
struct ScriptedGateway {
    fail: bool,
    delay: Option<Duration>,
    prompts: Mutex<Vec<Vec<PromptMessage>>>,
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn generate(&self, messages: &[PromptMessage]) -> Result<String, GatewayError> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(GatewayError::EmptyReply);
        }
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        Ok(format!("pixy says: {}", last))
    }

    fn fallback_reply(&self) -> &str {
        FALLBACK
    }
}

#[derive(Default)]
struct RecordingMail {
    sent: Mutex<Vec<ContactMessage>>,
}

#[async_trait]
impl MailRelay for RecordingMail {
    async fn send(&self, contact: &ContactMessage) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(contact.clone());
        Ok(())
    }
}

struct TestApp {
    base: String,
    client: reqwest::Client,
    storage: Arc<InMemoryStorage>,
}

impl TestApp {
    async fn post(&self, route: &str, body: Value) -> (u16, Value) {
        let response = self
            .client
            .post(format!("{}{}", self.base, route))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }
}

async fn spawn_app(gateway: Arc<dyn ModelGateway>, mail: Arc<dyn MailRelay>) -> TestApp {
    let storage = Arc::new(InMemoryStorage::new());
    let relay = ConversationRelay::new(PromptBuilder::new("be Pixy"), gateway, storage.clone());
    let state = AppState {
        relay: Arc::new(relay),
        mail,
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, state));

    TestApp {
        base: format!("http://{}", addr),
        client: reqwest::Client::new(),
        storage,
    }
}

async fn spawn_default() -> (TestApp, Arc<ScriptedGateway>) {
    let gateway = Arc::new(ScriptedGateway::default());
    let app = spawn_app(gateway.clone(), Arc::new(RecordingMail::default())).await;
    (app, gateway)
}

#[tokio::test]
async fn test_conversation_grows_two_turns_per_exchange() {
    let (app, gateway) = spawn_default().await;

    let (status, body) = app.post("/mascot", json!({ "message": "Hello" })).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "reply": "pixy says: Hello" }));

    let turns = app.storage.all(DEFAULT_SESSION).await.unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].content, "Hello");
    assert_eq!(turns[1].content, "pixy says: Hello");

    let (status, _) = app.post("/mascot", json!({ "message": "How are you?" })).await;
    assert_eq!(status, 200);
    assert_eq!(app.storage.len(DEFAULT_SESSION).await.unwrap(), 4);

    let prompts = gateway.prompts.lock().unwrap();
    let contents: Vec<_> = prompts[1].iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["be Pixy", "Hello", "pixy says: Hello", "How are you?"]
    );
}

#[tokio::test]
async fn test_alternate_route_uses_same_contract() {
    let (app, _) = spawn_default().await;

    let (status, body) = app.post("/api/mascot", json!({ "message": "Hi" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["reply"], "pixy says: Hi");
    assert!(body.get("text").is_none());
}

#[tokio::test]
async fn test_missing_or_empty_message_is_rejected() {
    let (app, gateway) = spawn_default().await;

    for body in [json!({ "message": "" }), json!({}), json!({ "message": "   " })] {
        let (status, response) = app.post("/mascot", body).await;
        assert_eq!(status, 400);
        assert_eq!(response, json!({ "error": "Message is required" }));
    }

    let response = app
        .client
        .post(format!("{}/mascot", app.base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    assert_eq!(app.storage.len(DEFAULT_SESSION).await.unwrap(), 0);
    assert!(gateway.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_gateway_failure_returns_fallback() {
    let gateway = Arc::new(ScriptedGateway {
        fail: true,
        ..Default::default()
    });
    let app = spawn_app(gateway, Arc::new(RecordingMail::default())).await;

    let (status, body) = app.post("/mascot", json!({ "message": "Hello" })).await;
    assert_eq!(status, 500);
    assert_eq!(body, json!({ "error": FALLBACK }));
    assert_eq!(app.storage.len(DEFAULT_SESSION).await.unwrap(), 0);
}

#[tokio::test]
async fn test_sessions_do_not_share_history() {
    let (app, gateway) = spawn_default().await;

    app.post("/mascot", json!({ "message": "I am Ada", "session_id": "ada" }))
        .await;
    app.post("/mascot", json!({ "message": "I am Bob", "session_id": "bob" }))
        .await;

    assert_eq!(app.storage.len("ada").await.unwrap(), 2);
    assert_eq!(app.storage.len("bob").await.unwrap(), 2);

    let prompts = gateway.prompts.lock().unwrap();
    assert_eq!(prompts[1].len(), 2);
}

#[tokio::test]
async fn test_client_history_seeds_empty_session() {
    let (app, gateway) = spawn_default().await;

    let (status, _) = app
        .post(
            "/mascot",
            json!({
                "message": "Remember me?",
                "session_id": "returning",
                "history": [
                    { "role": "user", "content": "I like mushrooms" },
                    { "role": "assistant", "content": "Me too 🍄" }
                ]
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(app.storage.len("returning").await.unwrap(), 4);
    assert_eq!(gateway.prompts.lock().unwrap()[0].len(), 4);
}

#[tokio::test]
async fn test_client_history_accepts_model_role() {
    let (app, gateway) = spawn_default().await;

    let (status, _) = app
        .post(
            "/mascot",
            json!({
                "message": "Still there?",
                "session_id": "gemini-shaped",
                "history": [
                    { "role": "user", "content": "Hi" },
                    { "role": "model", "content": "Hello from the mushroom" }
                ]
            }),
        )
        .await;
    assert_eq!(status, 200);

    let turns = app.storage.all("gemini-shaped").await.unwrap();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(gateway.prompts.lock().unwrap()[0][2].role, PromptRole::Model);
}

#[tokio::test]
async fn test_concurrent_first_requests_seed_once() {
    let gateway = Arc::new(ScriptedGateway {
        delay: Some(Duration::from_millis(50)),
        ..Default::default()
    });
    let app = spawn_app(gateway, Arc::new(RecordingMail::default())).await;

    let requests = ["first", "second"].map(|message| {
        app.post(
            "/mascot",
            json!({
                "message": message,
                "session_id": "r",
                "history": [
                    { "role": "user", "content": "seed question" },
                    { "role": "assistant", "content": "seed answer" }
                ]
            }),
        )
    });
    let results = futures::future::join_all(requests).await;
    assert!(results.iter().all(|(status, _)| *status == 200));

    let turns = app.storage.all("r").await.unwrap();
    assert_eq!(turns.len(), 6);
    assert_eq!(
        turns.iter().filter(|t| t.content == "seed question").count(),
        1
    );
    assert_eq!(turns[0].content, "seed question");
}

#[tokio::test]
async fn test_history_and_clear_routes() {
    let (app, _) = spawn_default().await;
    app.post("/mascot", json!({ "message": "Hello", "session_id": "s1" }))
        .await;

    let history: Value = app
        .client
        .get(format!("{}/mascot/history?session_id=s1", app.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        history,
        json!({ "turns": [
            { "role": "user", "content": "Hello" },
            { "role": "assistant", "content": "pixy says: Hello" }
        ]})
    );

    let response = app
        .client
        .delete(format!("{}/mascot/history?session_id=s1", app.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);
    assert_eq!(app.storage.len("s1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_history_routes_require_session_id() {
    let (app, _) = spawn_default().await;
    app.post("/mascot", json!({ "message": "Hello" })).await;

    let response = app
        .client
        .get(format!("{}/mascot/history", app.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "session_id is required" }));

    let response = app
        .client
        .delete(format!("{}/mascot/history", app.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(app.storage.len(DEFAULT_SESSION).await.unwrap(), 2);
}

#[tokio::test]
async fn test_concurrent_requests_keep_every_turn() {
    let gateway = Arc::new(ScriptedGateway {
        delay: Some(Duration::from_millis(20)),
        ..Default::default()
    });
    let app = spawn_app(gateway, Arc::new(RecordingMail::default())).await;

    let requests = (0..10).map(|i| app.post("/mascot", json!({ "message": format!("msg {}", i) })));
    let results = futures::future::join_all(requests).await;

    let completed = results.iter().filter(|(status, _)| *status == 200).count();
    assert_eq!(completed, 10);
    assert_eq!(
        app.storage.len(DEFAULT_SESSION).await.unwrap(),
        2 * completed
    );
}

#[tokio::test]
async fn test_health() {
    let (app, _) = spawn_default().await;
    let body: Value = app
        .client
        .get(format!("{}/health", app.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_send_email_validation_and_success() {
    let mail = Arc::new(RecordingMail::default());
    let app = spawn_app(Arc::new(ScriptedGateway::default()), mail.clone()).await;

    let (status, body) = app
        .post("/send-email", json!({ "name": "Ada", "email": "" , "message": "Hi" }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({ "error": "All fields are required!" }));

    let (status, body) = app
        .post(
            "/api/send-email",
            json!({ "name": "Ada", "email": "ada@example.com", "message": "Build me a site" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);

    let sent = mail.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].email, "ada@example.com");
}

#[tokio::test]
async fn test_send_email_accepts_multipart_form() {
    let mail = Arc::new(RecordingMail::default());
    let app = spawn_app(Arc::new(ScriptedGateway::default()), mail.clone()).await;

    let form = reqwest::multipart::Form::new()
        .text("name", "Ada")
        .text("email", "ada@example.com")
        .text("message", "Here is a sketch")
        .part(
            "image",
            reqwest::multipart::Part::bytes(vec![0x89, 0x50, 0x4e, 0x47])
                .file_name("sketch.png")
                .mime_str("image/png")
                .unwrap(),
        );
    let response = app
        .client
        .post(format!("{}/api/send-email", app.base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);

    let response = app
        .client
        .post(format!("{}/api/send-email", app.base))
        .form(&[("name", "Bob"), ("email", "bob@example.com"), ("message", "Hi")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let incomplete = reqwest::multipart::Form::new()
        .text("name", "Eve")
        .text("message", "no address");
    let response = app
        .client
        .post(format!("{}/api/send-email", app.base))
        .multipart(incomplete)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let sent = mail.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].name, "Ada");
    assert_eq!(sent[0].message, "Here is a sketch");
    assert_eq!(sent[1].email, "bob@example.com");
}

#[tokio::test]
async fn test_send_email_through_http_relay() {
    let relay_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&relay_server)
        .await;

    let mail = HttpMailRelay::new(
        format!("{}/send", relay_server.uri()),
        Some(("studio@example.com".to_string(), "secret".to_string())),
    );
    let app = spawn_app(Arc::new(ScriptedGateway::default()), Arc::new(mail)).await;

    let (status, _) = app
        .post(
            "/send-email",
            json!({ "name": "Ada", "email": "ada@example.com", "message": "Hi" }),
        )
        .await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_send_email_relay_failure() {
    let relay_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&relay_server)
        .await;

    let mail = HttpMailRelay::new(
        relay_server.uri(),
        Some(("studio@example.com".to_string(), "secret".to_string())),
    );
    let app = spawn_app(Arc::new(ScriptedGateway::default()), Arc::new(mail)).await;

    let (status, body) = app
        .post(
            "/send-email",
            json!({ "name": "Ada", "email": "ada@example.com", "message": "Hi" }),
        )
        .await;
    assert_eq!(status, 500);
    assert_eq!(body, json!({ "error": "Failed to send email." }));
}

#[tokio::test]
async fn test_full_stack_with_stubbed_gemini() {
    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": " Hiya! 🍄 " }] } }]
        })))
        .mount(&gemini)
        .await;

    let mut settings = Settings::defaults().unwrap();
    settings.llm.base_url = gemini.uri();
    let app = spawn_app(
        Arc::new(GeminiClient::new("key".to_string(), settings).unwrap()),
        Arc::new(RecordingMail::default()),
    )
    .await;

    let (status, body) = app.post("/mascot", json!({ "message": "Hello" })).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "reply": "Hiya! 🍄" }));
}
