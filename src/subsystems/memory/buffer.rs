//! Short-term conversation window.

use std::collections::VecDeque;

use crate::llm::{ChatMessage, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

/// The last `capacity` turns, oldest first. Older turns fall off the front.
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    turns: VecDeque<Turn>,
    capacity: usize,
}

impl ConversationBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { turns: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        while self.turns.len() >= self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(Turn { user: user.into(), assistant: assistant.into() });
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Alternating user/assistant messages for a chat request.
    pub fn as_messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .flat_map(|t| {
                [
                    ChatMessage { role: Role::User, content: t.user.clone() },
                    ChatMessage { role: Role::Assistant, content: t.assistant.clone() },
                ]
            })
            .collect()
    }
}
