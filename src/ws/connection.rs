//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single quiz socket: client frames are
//! dispatched to the [`QuizService`], and group broadcasts arrive through
//! the socket's channel-layer inbox.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::messages::{ClientMessage, ServerMessage};
use crate::domain::QuizId;
use crate::error::QuizError;
use crate::service::{QuizService, SessionSnapshot, Submission};

type WsSink = SplitSink<WebSocket, Message>;

/// Runs the full lifecycle of one quiz socket.
///
/// - Rejects unknown quizzes with `error` and a close frame.
/// - Otherwise joins the quiz group, sends the session snapshot, and loops
///   until the client disconnects.
/// - Leaves the group on the way out.
pub async fn run_connection(
    socket: WebSocket,
    quiz_id: Option<QuizId>,
    host_token: Option<String>,
    service: Arc<QuizService>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let Some(quiz_id) = quiz_id else {
        reject(&mut ws_tx, "Quiz not found").await;
        return;
    };
    let channels = service.channels().clone();
    let group = quiz_id.group_name();
    let Subscription {
        channel,
        mut inbox,
        snapshot,
    } = match subscribe(&service, quiz_id).await {
        Ok(subscription) => subscription,
        Err(QuizError::QuizNotFound(_)) => {
            reject(&mut ws_tx, "Quiz not found").await;
            return;
        }
        Err(e) => {
            reject(&mut ws_tx, &e.to_string()).await;
            return;
        }
    };
    tracing::debug!(%quiz_id, %channel, "ws connected");

    let state = ServerMessage::QuizState {
        data: snapshot.state,
    };
    let mut open = send(&mut ws_tx, &state).await;
    if let Err(e) = service.announce_participants(quiz_id).await {
        tracing::warn!(%quiz_id, error = %e, "failed to announce participants");
    }
    if open && let Some(followup) = snapshot.followup {
        open = send(&mut ws_tx, &followup).await;
    }

    let session = Session {
        quiz_id,
        host_token,
        service,
    };

    while open {
        tokio::select! {
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = session.handle_text(text.as_str()).await {
                            open = send(&mut ws_tx, &reply).await;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(%quiz_id, error = %e, "ws receive error");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
            message = inbox.recv() => {
                match message {
                    Some(message) => open = send(&mut ws_tx, &message).await,
                    None => break,
                }
            }
        }
    }

    if let Err(e) = channels.group_discard(&group, &channel).await {
        tracing::warn!(%quiz_id, error = %e, "failed to leave quiz group");
    }
    channels.close_channel(&channel).await;
    tracing::debug!(%quiz_id, %channel, "ws connection closed");
}

/// A socket's group membership plus the state it saw after joining.
struct Subscription {
    channel: String,
    inbox: mpsc::Receiver<ServerMessage>,
    snapshot: SessionSnapshot,
}

/// Joins the quiz group first and only then reads the snapshot, so a
/// transition racing the connect is seen either in the snapshot or in the
/// inbox. On failure the membership is undone.
async fn subscribe(service: &QuizService, quiz_id: QuizId) -> Result<Subscription, QuizError> {
    let channels = service.channels();
    let group = quiz_id.group_name();
    let (channel, inbox) = channels.new_channel().await;
    let joined = channels.group_add(&group, &channel).await;
    let snapshot = match joined {
        Ok(()) => service.session_snapshot(quiz_id).await,
        Err(e) => Err(e),
    };
    match snapshot {
        Ok(snapshot) => Ok(Subscription {
            channel,
            inbox,
            snapshot,
        }),
        Err(e) => {
            // Closing the channel also drops its group memberships.
            channels.close_channel(&channel).await;
            Err(e)
        }
    }
}

/// Per-socket context for dispatching client messages.
struct Session {
    quiz_id: QuizId,
    host_token: Option<String>,
    service: Arc<QuizService>,
}

impl Session {
    /// Parses and dispatches one text frame, returning the private reply.
    async fn handle_text(&self, text: &str) -> Option<ServerMessage> {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
            return Some(ServerMessage::error("Invalid JSON"));
        };
        let message = match serde_json::from_value::<ClientMessage>(value) {
            Ok(message) => message,
            Err(e) => return Some(ServerMessage::error(format!("Unsupported message: {e}"))),
        };
        match self.dispatch(message).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::debug!(quiz_id = %self.quiz_id, error = %e, "ws command failed");
                Some(ServerMessage::error(e.to_string()))
            }
        }
    }

    async fn dispatch(&self, message: ClientMessage) -> Result<Option<ServerMessage>, QuizError> {
        let token = self.host_token.as_deref();
        match message {
            ClientMessage::Join { nickname } => {
                self.service.join(self.quiz_id, &nickname).await?;
                Ok(None)
            }
            ClientMessage::StartQuiz => {
                self.service.start_quiz(self.quiz_id, token).await?;
                Ok(None)
            }
            ClientMessage::NextQuestion => {
                self.service.next_question(self.quiz_id, token).await?;
                Ok(None)
            }
            ClientMessage::EndQuiz => {
                self.service.end_quiz(self.quiz_id, token).await?;
                Ok(None)
            }
            ClientMessage::SubmitAnswer {
                nickname,
                question_id,
                selected_option,
                response_time,
            } => {
                let outcome = self
                    .service
                    .submit_answer(
                        self.quiz_id,
                        Submission {
                            nickname,
                            question_id,
                            selected_option,
                            response_time,
                        },
                    )
                    .await?;
                Ok(Some(ServerMessage::AnswerAck {
                    question_id: outcome.answer.question_id,
                    is_correct: outcome.answer.is_correct,
                    score: outcome.answer.score,
                    total_score: outcome.participant.total_score,
                }))
            }
            ClientMessage::GetLeaderboard => {
                let data = self.service.leaderboard(self.quiz_id).await?;
                Ok(Some(ServerMessage::Leaderboard { data }))
            }
            ClientMessage::Ping => Ok(Some(ServerMessage::Pong)),
        }
    }
}

/// Sends one message; returns `false` once the socket is gone.
async fn send(ws_tx: &mut WsSink, message: &ServerMessage) -> bool {
    ws_tx.send(Message::text(message.to_json())).await.is_ok()
}

async fn reject(ws_tx: &mut WsSink, reason: &str) {
    if send(ws_tx, &ServerMessage::error(reason)).await {
        let _ = ws_tx.send(Message::Close(None)).await;
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::channels::ChannelLayer;
    use crate::domain::{AnswerOption, Difficulty, QuestionDraft, Quiz, QuizStatus};
    use crate::persistence::{Database, QuizStore};
    use crate::service::NewQuiz;

    async fn ready_quiz() -> (QuizService, Quiz) {
        let Ok(db) = Database::in_memory().await else {
            panic!("in-memory database");
        };
        let service = QuizService::new(QuizStore::new(db), ChannelLayer::in_memory(16));
        let Ok(quiz) = service
            .create_quiz(NewQuiz {
                title: "Rivers".to_string(),
                description: String::new(),
                difficulty: Difficulty::Easy,
                time_per_question: Some(15),
            })
            .await
        else {
            panic!("create failed");
        };
        let token = Some(quiz.host_token.as_str());
        let draft = QuestionDraft {
            question_text: "Longest river?".to_string(),
            options: ["Nile".into(), "Amazon".into(), "Yangtze".into(), "Volga".into()],
            correct_answer: AnswerOption::A,
            explanation: String::new(),
            order: 0,
        };
        let Ok(_) = service.add_question(quiz.id, token, draft).await else {
            panic!("add question failed");
        };
        let Ok(quiz) = service.confirm_quiz(quiz.id, token, None).await else {
            panic!("confirm failed");
        };
        (service, quiz)
    }

    fn drain_has_question(inbox: &mut mpsc::Receiver<ServerMessage>) -> bool {
        let mut found = false;
        while let Ok(message) = inbox.try_recv() {
            found |= matches!(message, ServerMessage::Question { .. });
        }
        found
    }

    #[tokio::test]
    async fn start_after_group_join_reaches_inbox_and_snapshot() {
        let (service, quiz) = ready_quiz().await;
        let channels = service.channels();
        let (channel, mut inbox) = channels.new_channel().await;
        let Ok(()) = channels.group_add(&quiz.id.group_name(), &channel).await else {
            panic!("group_add failed");
        };

        let Ok(_) = service.start_quiz(quiz.id, Some(&quiz.host_token)).await else {
            panic!("start failed");
        };
        let Ok(snapshot) = service.session_snapshot(quiz.id).await else {
            panic!("snapshot failed");
        };

        assert_eq!(snapshot.state.status, QuizStatus::Live);
        assert!(matches!(snapshot.followup, Some(ServerMessage::Question { .. })));
        assert!(drain_has_question(&mut inbox));
    }

    #[tokio::test]
    async fn concurrent_start_is_never_missed() {
        for _ in 0..10 {
            let (service, quiz) = ready_quiz().await;
            let (subscribed, started) = tokio::join!(
                subscribe(&service, quiz.id),
                service.start_quiz(quiz.id, Some(&quiz.host_token)),
            );
            assert!(started.is_ok());
            let Ok(mut subscription) = subscribed else {
                panic!("subscribe failed");
            };
            let seen_in_snapshot = matches!(
                subscription.snapshot.followup,
                Some(ServerMessage::Question { .. })
            );
            assert!(seen_in_snapshot || drain_has_question(&mut subscription.inbox));
        }
    }

    #[tokio::test]
    async fn unknown_quiz_leaves_no_membership() {
        let (service, _) = ready_quiz().await;
        let missing = QuizId::new();
        assert!(matches!(
            subscribe(&service, missing).await,
            Err(QuizError::QuizNotFound(_))
        ));
        let ChannelLayer::InMemory(layer) = service.channels() else {
            panic!("in-memory layer");
        };
        assert_eq!(layer.group_size(&missing.group_name()).await, 0);
    }
}
