use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::base::{ModelCatalog, Platform};
use crate::errors::{PlatformError, PlatformResult};
use crate::models::message::MessageBag;
use crate::models::options::Options;
use crate::result::{Content, DeferredResult};

/// Model identifier accepted by a [`ScriptedPlatform`] unless configured otherwise
pub const SCRIPTED_MODEL: &str = "scripted";

/// A pre-configured reply of a [`ScriptedPlatform`]
#[derive(Debug, Clone)]
pub enum Reply {
    Content(Content),
    /// Text delivered as a stream of chunks
    Chunks(Vec<String>),
    /// Fails when the result is materialized
    Error(PlatformError),
}

impl From<Content> for Reply {
    fn from(content: Content) -> Self {
        Reply::Content(content)
    }
}

/// What a [`ScriptedPlatform`] was asked to do
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub model: String,
    pub messages: MessageBag,
    pub options: Options,
}

/// A platform that returns pre-configured replies in order, for tests and offline runs.
/// When the script runs out every further reply is empty text.
#[derive(Debug)]
pub struct ScriptedPlatform {
    catalog: ModelCatalog,
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<Request>>,
    materializations: Arc<AtomicUsize>,
}

impl ScriptedPlatform {
    pub fn new<I: IntoIterator<Item = Reply>>(replies: I) -> Self {
        Self {
            catalog: ModelCatalog::new([SCRIPTED_MODEL]),
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            materializations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Convenience for a script made only of content
    pub fn with_contents<I: IntoIterator<Item = Content>>(contents: I) -> Self {
        Self::new(contents.into_iter().map(Reply::from))
    }

    pub fn with_catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Invocations that produced a result
    pub fn invocations(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Results whose content was actually produced
    pub fn materializations(&self) -> usize {
        self.materializations.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Platform for ScriptedPlatform {
    fn invoke(
        &self,
        model: &str,
        messages: &MessageBag,
        options: &Options,
    ) -> PlatformResult<DeferredResult> {
        self.catalog.ensure_supported(model)?;

        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Request {
                model: model.to_string(),
                messages: messages.clone(),
                options: options.clone(),
            });
        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Reply::Content(Content::text("")));

        let counter = self.materializations.clone();
        let result = match reply {
            Reply::Content(content) => DeferredResult::new(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(content)
            }),
            Reply::Chunks(chunks) => {
                let stream = futures::stream::iter(chunks.into_iter().map(Ok));
                DeferredResult::from_text_stream(futures::StreamExt::chain(
                    futures::stream::once(async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(String::new())
                    }),
                    stream,
                ))
            }
            Reply::Error(err) => DeferredResult::new(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(err)
            }),
        };
        Ok(result)
    }
}
