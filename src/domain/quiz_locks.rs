//! Per-quiz mutation locks.
//!
//! [`QuizLocks`] hands out one [`tokio::sync::Mutex`] per quiz so that
//! lifecycle transitions and score recomputation on the same quiz run one
//! at a time, while different quizzes proceed concurrently. The database
//! stays the source of truth; the lock only orders writers in this process.
//!
//! Entries live only while someone holds or waits for them: dropping the
//! last [`QuizGuard`] removes the quiz from the map.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};

use super::QuizId;

type LockMap = HashMap<QuizId, Arc<Mutex<()>>>;

/// Registry of per-quiz mutexes.
///
/// The outer map sits behind a synchronous mutex: it is only held for a
/// lookup or insert, never across an await, so [`QuizGuard`] can prune its
/// entry from `Drop`.
#[derive(Debug, Default)]
pub struct QuizLocks {
    locks: Arc<StdMutex<LockMap>>,
}

/// Exclusive access to one quiz until dropped.
#[derive(Debug)]
pub struct QuizGuard {
    quiz_id: QuizId,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<StdMutex<LockMap>>,
}

impl QuizLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `quiz_id`, creating it on first use.
    pub async fn lock(&self, quiz_id: QuizId) -> QuizGuard {
        let mutex = {
            let mut map = lock_map(&self.locks);
            Arc::clone(map.entry(quiz_id).or_default())
        };
        // Built before awaiting so a cancelled acquire still prunes.
        let mut pending = QuizGuard {
            quiz_id,
            guard: None,
            locks: Arc::clone(&self.locks),
        };
        pending.guard = Some(mutex.lock_owned().await);
        pending
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock_map(&self.locks).len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        lock_map(&self.locks).is_empty()
    }
}

impl Drop for QuizGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut map = lock_map(&self.locks);
        // The map holds one reference; any other belongs to a waiter.
        let idle = map
            .get(&self.quiz_id)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1);
        if idle {
            map.remove(&self.quiz_id);
        }
    }
}

fn lock_map(locks: &StdMutex<LockMap>) -> MutexGuard<'_, LockMap> {
    locks.lock().unwrap_or_else(PoisonError::into_inner)
}
