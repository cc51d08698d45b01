//! Live session protocol over a real WebSocket.

#![allow(clippy::panic, clippy::indexing_slicing)]

mod common;

use serde_json::json;

use common::{recv_json, recv_type, send_json, send_text, spawn_app};

#[tokio::test]
async fn unknown_quiz_errors_and_closes() {
    let app = spawn_app().await;
    let mut socket = app.connect(&uuid::Uuid::new_v4().to_string(), "").await;
    let Some(msg) = recv_json(&mut socket).await else {
        panic!("expected an error frame");
    };
    assert_eq!(msg["type"], "error");
    assert_eq!(msg["message"], "Quiz not found");
    assert!(recv_json(&mut socket).await.is_none());
}

#[tokio::test]
async fn malformed_quiz_id_is_not_found() {
    let app = spawn_app().await;
    let mut socket = app.connect("not-a-uuid", "").await;
    let Some(msg) = recv_json(&mut socket).await else {
        panic!("expected an error frame");
    };
    assert_eq!(msg["message"], "Quiz not found");
}

#[tokio::test]
async fn connect_sends_state_then_participant_count() {
    let app = spawn_app().await;
    let quiz = app.ready_quiz(1).await;
    let _ = app.join(&quiz.id, "ana").await;

    let mut socket = app.connect(&quiz.id, "").await;
    let Some(state) = recv_json(&mut socket).await else {
        panic!("expected quiz_state");
    };
    assert_eq!(state["type"], "quiz_state");
    assert_eq!(state["data"]["id"], quiz.id.as_str());
    assert_eq!(state["data"]["status"], "ready");
    assert_eq!(state["data"]["participant_count"], 1);
    assert_eq!(state["data"]["time_per_question"], 20);

    let update = recv_type(&mut socket, "participant_update").await;
    assert_eq!(update["participant_count"], 1);
}

#[tokio::test]
async fn invalid_frames_keep_the_socket_open() {
    let app = spawn_app().await;
    let quiz = app.ready_quiz(1).await;
    let mut socket = app.connect(&quiz.id, "").await;
    let _ = recv_type(&mut socket, "participant_update").await;

    send_text(&mut socket, "{not json").await;
    let err = recv_type(&mut socket, "error").await;
    assert_eq!(err["message"], "Invalid JSON");

    send_json(&mut socket, json!({"type": "dance"})).await;
    let err = recv_type(&mut socket, "error").await;
    assert!(err["message"].as_str().unwrap_or_default().contains("dance"));

    send_json(&mut socket, json!({"type": "ping"})).await;
    let pong = recv_type(&mut socket, "pong").await;
    assert_eq!(pong["type"], "pong");
}

#[tokio::test]
async fn host_commands_need_the_token() {
    let app = spawn_app().await;
    let quiz = app.ready_quiz(1).await;

    let mut anonymous = app.connect(&quiz.id, "").await;
    send_json(&mut anonymous, json!({"type": "start_quiz"})).await;
    let err = recv_type(&mut anonymous, "error").await;
    assert!(
        err["message"]
            .as_str()
            .unwrap_or_default()
            .contains("host token required")
    );

    let mut impostor = app.connect(&quiz.id, "?token=wrong").await;
    send_json(&mut impostor, json!({"type": "start_quiz"})).await;
    let err = recv_type(&mut impostor, "error").await;
    assert!(
        err["message"]
            .as_str()
            .unwrap_or_default()
            .contains("only the host")
    );
}

#[tokio::test]
async fn authorization_query_param_is_accepted() {
    let app = spawn_app().await;
    let quiz = app.ready_quiz(1).await;
    let mut host = app
        .connect(&quiz.id, &format!("?authorization=Bearer%20{}", quiz.token))
        .await;
    send_json(&mut host, json!({"type": "start_quiz"})).await;
    let question = recv_type(&mut host, "question").await;
    assert_eq!(question["question"]["index"], 0);
}

#[tokio::test]
async fn full_session_round_trip() {
    let app = spawn_app().await;
    let quiz = app.ready_quiz(2).await;

    let mut host = app
        .connect(&quiz.id, &format!("?token={}", quiz.token))
        .await;
    let mut player = app.connect(&quiz.id, "").await;
    let _ = recv_type(&mut player, "quiz_state").await;

    send_json(&mut player, json!({"type": "join", "nickname": "ana"})).await;
    let update = loop {
        let msg = recv_type(&mut player, "participant_update").await;
        if msg["participant_count"] == 1 {
            break msg;
        }
    };
    assert_eq!(update["participant_count"], 1);

    send_json(&mut host, json!({"type": "start_quiz"})).await;
    let question = recv_type(&mut player, "question").await;
    assert_eq!(question["time_limit"], 20);
    assert_eq!(question["question"]["index"], 0);
    assert!(question["question"].get("correct_answer").is_none());
    let first_id = question["question"]["id"].clone();

    send_json(
        &mut player,
        json!({
            "type": "submit_answer",
            "nickname": "ana",
            "question_id": first_id,
            "selected_option": "A",
            "response_time": 0.0,
        }),
    )
    .await;
    let ack = recv_type(&mut player, "answer_ack").await;
    assert_eq!(ack["is_correct"], true);
    assert_eq!(ack["score"], 150);
    assert_eq!(ack["total_score"], 150);

    let board = recv_type(&mut host, "leaderboard").await;
    assert_eq!(board["data"][0]["nickname"], "ana");

    send_json(&mut host, json!({"type": "next_question"})).await;
    let second = recv_type(&mut player, "question").await;
    assert_eq!(second["question"]["index"], 1);

    send_json(&mut host, json!({"type": "next_question"})).await;
    let done = recv_type(&mut player, "quiz_completed").await;
    assert_eq!(done["leaderboard"][0]["total_score"], 150);
    assert_eq!(done["leaderboard"][0]["rank"], 1);
}

#[tokio::test]
async fn late_socket_gets_current_question() {
    let app = spawn_app().await;
    let quiz = app.ready_quiz(1).await;
    let _host = app.start(&quiz).await;

    let mut late = app.connect(&quiz.id, "").await;
    let state = recv_type(&mut late, "quiz_state").await;
    assert_eq!(state["data"]["status"], "live");
    let question = recv_type(&mut late, "question").await;
    assert_eq!(question["question"]["id"], quiz.question_ids[0].as_str());
}

#[tokio::test]
async fn completed_quiz_snapshot_has_leaderboard() {
    let app = spawn_app().await;
    let quiz = app.ready_quiz(1).await;
    let mut host = app.start(&quiz).await;
    send_json(&mut host, json!({"type": "end_quiz"})).await;
    let _ = recv_type(&mut host, "quiz_completed").await;

    let mut late = app.connect(&quiz.id, "").await;
    let state = recv_type(&mut late, "quiz_state").await;
    assert_eq!(state["data"]["status"], "completed");
    let done = recv_type(&mut late, "quiz_completed").await;
    assert!(done["leaderboard"].is_array());
}

#[tokio::test]
async fn get_leaderboard_replies_privately() {
    let app = spawn_app().await;
    let quiz = app.ready_quiz(1).await;
    let _ = app.join(&quiz.id, "ana").await;
    let mut socket = app.connect(&quiz.id, "").await;
    send_json(&mut socket, json!({"type": "get_leaderboard"})).await;
    let board = recv_type(&mut socket, "leaderboard").await;
    assert_eq!(board["data"][0]["nickname"], "ana");
    assert_eq!(board["data"][0]["total_score"], 0);
}

#[tokio::test]
async fn submit_errors_are_reported_not_fatal() {
    let app = spawn_app().await;
    let quiz = app.ready_quiz(1).await;
    let _host = app.start(&quiz).await;
    let mut socket = app.connect(&quiz.id, "").await;

    send_json(
        &mut socket,
        json!({
            "type": "submit_answer",
            "nickname": "ghost",
            "question_id": quiz.question_ids[0],
            "selected_option": "A",
        }),
    )
    .await;
    let err = recv_type(&mut socket, "error").await;
    assert!(err["message"].as_str().unwrap_or_default().contains("ghost"));

    send_json(&mut socket, json!({"type": "ping"})).await;
    let _ = recv_type(&mut socket, "pong").await;
}
