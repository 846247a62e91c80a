//! Stateful conversation holder accumulating chat history across round-trips.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::LlmError;
use crate::provider::FragmentHandler;
use crate::types::{LlmOptions, LlmResponse, Message};

/// Capability interface covering exactly the verbs a [`Conversation`] calls.
///
/// [`crate::client::LlmClient`] implements it in full; tests substitute fakes.
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    /// Sends the given history and resolves to the normalized response.
    async fn send_conversation(
        &self,
        messages: &[Message],
        options: &LlmOptions,
    ) -> Result<LlmResponse, LlmError>;

    /// Streams a completion for the given history, invoking the callback once
    /// per fragment in delivery order.
    async fn stream_conversation(
        &self,
        messages: &[Message],
        on_fragment: FragmentHandler<'_>,
        options: &LlmOptions,
    ) -> Result<LlmResponse, LlmError>;
}

/// Ordered, append-only chat log plus convenience verbs to extend it via an
/// LLM call.
///
/// The holder owns its history; the backend never retains a reference to it.
/// The assistant reply is appended only after a successful round-trip, so a
/// failed call leaves history exactly as it was. The `&mut self` receivers
/// make concurrent mutation a compile error; callers wanting concurrency use
/// separate conversations or serialize access themselves.
///
/// # Examples
///
/// ```no_run
/// # async fn demo(client: std::sync::Arc<tsunagi::LlmClient>) -> Result<(), tsunagi::LlmError> {
/// use tsunagi::types::{LlmOptions, Message};
///
/// let mut conversation = client.start_conversation();
/// conversation.add_message(Message::user("What is ownership?"));
/// let reply = conversation.send(&LlmOptions::default()).await?;
/// println!("{}", reply.content);
/// assert_eq!(conversation.history().len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct Conversation {
    backend: Arc<dyn ConversationBackend>,
    messages: Vec<Message>,
}

impl Conversation {
    /// Creates an empty conversation bound to the given backend.
    pub fn new(backend: Arc<dyn ConversationBackend>) -> Self {
        Self {
            backend,
            messages: Vec::new(),
        }
    }

    /// Appends a message, stamping a timestamp when the caller set none.
    pub fn add_message(&mut self, mut message: Message) {
        if message.timestamp.is_none() {
            message.timestamp = Some(Utc::now());
        }
        self.messages.push(message);
    }

    /// Returns the accumulated history in chronological order.
    pub fn history(&self) -> &[Message] {
        &self.messages
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Sends the current history and appends the assistant reply on success.
    pub async fn send(&mut self, options: &LlmOptions) -> Result<LlmResponse, LlmError> {
        let response = self
            .backend
            .send_conversation(&self.messages, options)
            .await?;
        self.push_assistant(response.content.clone());
        Ok(response)
    }

    /// Streams a completion for the current history, forwarding every fragment
    /// to the caller's callback.
    ///
    /// The fragments are also accumulated locally, and on success the locally
    /// accumulated text is what gets appended to history, so the stored turn
    /// reflects exactly what the caller observed fragment by fragment.
    pub async fn stream(
        &mut self,
        on_fragment: FragmentHandler<'_>,
        options: &LlmOptions,
    ) -> Result<LlmResponse, LlmError> {
        let mut local = String::new();
        let response = {
            let mut forward = |fragment: &str| {
                local.push_str(fragment);
                on_fragment(fragment);
            };
            self.backend
                .stream_conversation(&self.messages, &mut forward, options)
                .await?
        };
        self.push_assistant(local);
        Ok(response)
    }

    fn push_assistant(&mut self, content: String) {
        let mut message = Message::assistant(content);
        message.timestamp = Some(Utc::now());
        self.messages.push(message);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::types::Role;

    /// 返回固定回复的假后端
    struct EchoBackend {
        reply: &'static str,
        calls: AtomicUsize,
    }

    impl EchoBackend {
        fn new(reply: &'static str) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
            }
        }

        fn response(&self) -> LlmResponse {
            LlmResponse {
                content: self.reply.to_string(),
                model: "fake-model".to_string(),
                usage: None,
                metadata: HashMap::new(),
            }
        }
    }

    #[async_trait]
    impl ConversationBackend for EchoBackend {
        async fn send_conversation(
            &self,
            _messages: &[Message],
            _options: &LlmOptions,
        ) -> Result<LlmResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response())
        }

        async fn stream_conversation(
            &self,
            _messages: &[Message],
            on_fragment: FragmentHandler<'_>,
            _options: &LlmOptions,
        ) -> Result<LlmResponse, LlmError> {
            for fragment in ["str", "eam", "ed"] {
                on_fragment(fragment);
            }
            Ok(self.response())
        }
    }

    /// 总是失败的假后端
    struct FailingBackend;

    #[async_trait]
    impl ConversationBackend for FailingBackend {
        async fn send_conversation(
            &self,
            _messages: &[Message],
            _options: &LlmOptions,
        ) -> Result<LlmResponse, LlmError> {
            Err(LlmError::api("fake", 500, "backend exploded"))
        }

        async fn stream_conversation(
            &self,
            _messages: &[Message],
            on_fragment: FragmentHandler<'_>,
            _options: &LlmOptions,
        ) -> Result<LlmResponse, LlmError> {
            // 失败前已经送出的片段不会被撤回
            on_fragment("partial ");
            Err(LlmError::api("fake", 500, "stream died"))
        }
    }

    #[tokio::test]
    async fn send_appends_assistant_reply_after_success() {
        let mut conversation = Conversation::new(Arc::new(EchoBackend::new("hello there")));
        conversation.add_message(Message::user("hi"));

        let response = conversation
            .send(&LlmOptions::default())
            .await
            .expect("send should succeed");
        assert_eq!(response.content, "hello there");

        let history = conversation.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "hello there");
        assert!(history[1].timestamp.is_some());
    }

    #[tokio::test]
    async fn failed_send_leaves_history_untouched() {
        let mut conversation = Conversation::new(Arc::new(FailingBackend));
        conversation.add_message(Message::user("hi"));
        let before: Vec<String> = conversation
            .history()
            .iter()
            .map(|m| m.content.clone())
            .collect();

        let err = conversation
            .send(&LlmOptions::default())
            .await
            .expect_err("send should fail");
        assert_eq!(err.status(), Some(500));

        let after: Vec<String> = conversation
            .history()
            .iter()
            .map(|m| m.content.clone())
            .collect();
        assert_eq!(before, after, "history must be unchanged on failure");
    }

    #[tokio::test]
    async fn stream_appends_locally_accumulated_text() {
        let mut conversation = Conversation::new(Arc::new(EchoBackend::new("ignored")));
        conversation.add_message(Message::user("hi"));

        let mut seen = Vec::new();
        let mut callback = |fragment: &str| seen.push(fragment.to_string());
        conversation
            .stream(&mut callback, &LlmOptions::default())
            .await
            .expect("stream should succeed");

        assert_eq!(seen, vec!["str", "eam", "ed"]);
        // 追加的是本地累积文本 即使后端自报的 content 不一致
        let history = conversation.history();
        assert_eq!(history[1].content, "streamed");
    }

    #[tokio::test]
    async fn failed_stream_appends_nothing() {
        let mut conversation = Conversation::new(Arc::new(FailingBackend));
        conversation.add_message(Message::user("hi"));

        let mut seen = Vec::new();
        let mut callback = |fragment: &str| seen.push(fragment.to_string());
        let err = conversation
            .stream(&mut callback, &LlmOptions::default())
            .await
            .expect_err("stream should fail");

        assert_eq!(err.status(), Some(500));
        assert_eq!(seen, vec!["partial "], "delivered fragments stay delivered");
        assert_eq!(
            conversation.history().len(),
            1,
            "no partial assistant message on failure"
        );
    }

    #[tokio::test]
    async fn add_message_stamps_missing_timestamps() {
        let mut conversation = Conversation::new(Arc::new(EchoBackend::new("x")));
        conversation.add_message(Message::user("no timestamp"));
        assert!(conversation.history()[0].timestamp.is_some());

        let stamped = Message {
            timestamp: Some(chrono::DateTime::UNIX_EPOCH),
            ..Message::user("explicit")
        };
        conversation.add_message(stamped);
        assert_eq!(
            conversation.history()[1].timestamp,
            Some(chrono::DateTime::UNIX_EPOCH),
            "caller-provided timestamps are kept"
        );
    }
}
