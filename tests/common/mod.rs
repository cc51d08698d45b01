//! Shared helpers: boot the real router on an ephemeral port.

#![allow(dead_code, clippy::panic, clippy::indexing_slicing)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use livequiz_server::app_state::AppState;
use livequiz_server::channels::ChannelLayer;
use livequiz_server::config::AppConfig;
use livequiz_server::persistence::{Database, QuizStore};
use livequiz_server::server::build_app;
use livequiz_server::service::QuizService;

/// A client-side quiz socket.
pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A running server plus an HTTP client pointed at it.
pub struct TestApp {
    /// Bound address.
    pub addr: SocketAddr,
    /// HTTP client.
    pub client: reqwest::Client,
}

/// A created quiz with its host token.
pub struct HostedQuiz {
    /// Quiz ID.
    pub id: String,
    /// Host token.
    pub token: String,
    /// Question IDs in order.
    pub question_ids: Vec<String>,
}

/// Starts the server with in-memory SQLite and the in-memory channel layer.
pub async fn spawn_app() -> TestApp {
    let Ok(db) = Database::in_memory().await else {
        panic!("in-memory database");
    };
    let service = QuizService::new(QuizStore::new(db), ChannelLayer::in_memory(100));
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind ephemeral port");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("local addr");
    };
    let app = build_app(AppState::new(service), &AppConfig::local(addr));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    TestApp {
        addr,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// WebSocket URL for a quiz, with an optional query string.
    pub fn ws_url(&self, quiz_id: &str, query: &str) -> String {
        format!("ws://{}/ws/quiz/{quiz_id}/{query}", self.addr)
    }

    /// Creates a draft quiz with `questions` questions, correct answer `A`.
    pub async fn create_quiz(&self, questions: usize) -> HostedQuiz {
        let Ok(resp) = self
            .client
            .post(self.url("/api/quiz/host"))
            .json(&json!({"title": "Integration quiz", "time_per_question": 20}))
            .send()
            .await
        else {
            panic!("create request failed");
        };
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
        let Ok(body) = resp.json::<Value>().await else {
            panic!("create body");
        };
        let id = body["quiz"]["id"].as_str().unwrap_or_default().to_string();
        let token = body["host_token"].as_str().unwrap_or_default().to_string();

        let mut question_ids = Vec::new();
        for i in 0..questions {
            let Ok(resp) = self
                .client
                .post(self.url(&format!("/api/quiz/host/{id}/questions")))
                .bearer_auth(&token)
                .json(&json!({
                    "question_text": format!("Question {i}"),
                    "option_a": "right",
                    "option_b": "wrong",
                    "option_c": "wrong",
                    "option_d": "wrong",
                    "correct_answer": "A",
                    "order": i,
                }))
                .send()
                .await
            else {
                panic!("add question failed");
            };
            assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
            let Ok(q) = resp.json::<Value>().await else {
                panic!("question body");
            };
            question_ids.push(q["id"].as_str().unwrap_or_default().to_string());
        }
        HostedQuiz {
            id,
            token,
            question_ids,
        }
    }

    /// Creates and confirms a quiz.
    pub async fn ready_quiz(&self, questions: usize) -> HostedQuiz {
        let quiz = self.create_quiz(questions).await;
        let Ok(resp) = self
            .client
            .post(self.url(&format!("/api/quiz/host/{}/confirm", quiz.id)))
            .bearer_auth(&quiz.token)
            .json(&json!({}))
            .send()
            .await
        else {
            panic!("confirm failed");
        };
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        quiz
    }

    /// Joins `nickname` over REST.
    pub async fn join(&self, quiz_id: &str, nickname: &str) -> reqwest::Response {
        let Ok(resp) = self
            .client
            .post(self.url(&format!("/api/quiz/public/{quiz_id}/join")))
            .json(&json!({ "nickname": nickname }))
            .send()
            .await
        else {
            panic!("join failed");
        };
        resp
    }

    /// Opens a quiz socket.
    pub async fn connect(&self, quiz_id: &str, query: &str) -> Socket {
        let Ok((socket, _)) = connect_async(self.ws_url(quiz_id, query)).await else {
            panic!("ws connect failed");
        };
        socket
    }

    /// Connects as host and starts the quiz, returning the host socket
    /// after the first question arrived.
    pub async fn start(&self, quiz: &HostedQuiz) -> Socket {
        let mut host = self
            .connect(&quiz.id, &format!("?token={}", quiz.token))
            .await;
        send_json(&mut host, json!({"type": "start_quiz"})).await;
        let _ = recv_type(&mut host, "question").await;
        host
    }
}

/// Sends a JSON text frame.
pub async fn send_json(socket: &mut Socket, value: Value) {
    let Ok(()) = socket.send(Message::text(value.to_string())).await else {
        panic!("ws send failed");
    };
}

/// Sends a raw text frame.
pub async fn send_text(socket: &mut Socket, text: &str) {
    let Ok(()) = socket.send(Message::text(text.to_string())).await else {
        panic!("ws send failed");
    };
}

/// Next server message as JSON, or `None` once the socket closed.
pub async fn recv_json(socket: &mut Socket) -> Option<Value> {
    loop {
        let Ok(frame) = tokio::time::timeout(Duration::from_secs(5), socket.next()).await else {
            panic!("timed out waiting for a ws message");
        };
        match frame {
            Some(Ok(Message::Text(text))) => {
                let Ok(value) = serde_json::from_str(text.as_str()) else {
                    panic!("server sent invalid JSON: {text}");
                };
                return Some(value);
            }
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
            Some(Ok(_)) => {}
        }
    }
}

/// Skips messages until one with `type == kind` arrives.
pub async fn recv_type(socket: &mut Socket, kind: &str) -> Value {
    loop {
        let Some(msg) = recv_json(socket).await else {
            panic!("socket closed while waiting for {kind}");
        };
        if msg["type"] == kind {
            return msg;
        }
    }
}
