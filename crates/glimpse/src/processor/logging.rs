use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Input, InputProcessor, Output, OutputProcessor};
use crate::errors::AgentResult;

/// Emits one log line per dispatch and counts them until reset
#[derive(Debug, Default)]
pub struct LoggingProcessor {
    dispatches: AtomicUsize,
}

impl LoggingProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatches seen since construction or the last reset
    pub fn dispatches(&self) -> usize {
        self.dispatches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InputProcessor for LoggingProcessor {
    async fn process_input(&self, input: &mut Input) -> AgentResult<()> {
        let dispatch = self.dispatches.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(
            dispatch,
            model = %input.model,
            messages = input.messages.len(),
            options = input.options.len(),
            "dispatching to platform"
        );
        Ok(())
    }

    fn reset(&self) {
        self.dispatches.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl OutputProcessor for LoggingProcessor {
    async fn process_output(&self, output: &mut Output) -> AgentResult<()> {
        tracing::debug!(
            result = %output.result().id(),
            round = output.round(),
            max_rounds = output.max_rounds(),
            "platform returned"
        );
        Ok(())
    }

    fn reset(&self) {
        self.dispatches.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::{Message, MessageBag};
    use crate::models::options::Options;

    #[tokio::test]
    async fn test_counts_until_reset() {
        let processor = LoggingProcessor::new();
        let mut input = Input {
            model: "scripted".into(),
            messages: MessageBag::new(vec![Message::user().with_text("Hi")]),
            options: Options::new(),
        };

        processor.process_input(&mut input).await.unwrap();
        processor.process_input(&mut input).await.unwrap();
        assert_eq!(processor.dispatches(), 2);

        InputProcessor::reset(&processor);
        assert_eq!(processor.dispatches(), 0);
    }
}
