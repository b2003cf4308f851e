use std::sync::Arc;

use docqa_llm::Message;
use uuid::Uuid;

use crate::collection::{CollectionHandle, CollectionManager};
use crate::persona::Persona;

/// One user's conversation state. Sessions share nothing with each other.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub persona: Persona,
    history: Vec<Message>,
    collections: Arc<CollectionManager>,
}

impl Session {
    #[must_use]
    pub fn new(persona: Persona) -> Self {
        Self {
            id: Uuid::new_v4(),
            persona,
            history: Vec::new(),
            collections: Arc::new(CollectionManager::new()),
        }
    }

    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn push_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.history.push(Message::user(question));
        self.history.push(Message::assistant(answer));
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub async fn active(&self) -> Option<CollectionHandle> {
        self.collections.active().await
    }

    pub(crate) fn collections(&self) -> &Arc<CollectionManager> {
        &self.collections
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Persona::default())
    }
}
