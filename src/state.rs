// src/state.rs
//! Per-user conversation state: a bounded history of turns, persisted as
//! JSON under `user_state:{user_id}` with a TTL. Created lazily on the first
//! turn, trimmed on every write, never explicitly deleted (it expires).

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::KeyValueStore;

const USER_STATE_PREFIX: &str = "user_state:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserState {
    #[serde(default)]
    pub history: Vec<Turn>,
    #[serde(default)]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub struct UserStateStore {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
    max_turns: usize,
}

impl UserStateStore {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration, max_turns: usize) -> Self {
        Self { store, ttl, max_turns }
    }

    /// Absent or unparseable state reads as a fresh one.
    pub async fn load(&self, user_id: &str) -> UserState {
        let key = format!("{USER_STATE_PREFIX}{user_id}");
        match self.store.get(&key).await {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|_| {
                tracing::warn!(user_id, "invalid user state json, resetting");
                UserState::default()
            }),
            None => UserState::default(),
        }
    }

    /// Appends the question/answer pair, trims to the retention cap (oldest
    /// dropped first) and persists with a fresh TTL.
    pub async fn record_exchange(&self, user_id: &str, state: &mut UserState, question: &str, answer: &str) {
        state.history.push(Turn {
            role: Role::User,
            content: question.to_string(),
        });
        state.history.push(Turn {
            role: Role::Assistant,
            content: answer.to_string(),
        });
        if state.history.len() > self.max_turns {
            let excess = state.history.len() - self.max_turns;
            state.history.drain(0..excess);
        }
        state.updated_at = Some(chrono::Utc::now());

        let key = format!("{USER_STATE_PREFIX}{user_id}");
        match serde_json::to_string(state) {
            Ok(raw) => self.store.set(&key, &raw, self.ttl).await,
            Err(e) => tracing::warn!(user_id, error = %e, "user state serialization failed"),
        }
    }
}
