
use tracing::{debug, warn};

use crate::config::Config;
use crate::providers::{ChatTurn, EmbeddingProvider, GenerationProvider};
use crate::store::{ContextStore, RetrievalCandidate};
use crate::{QueryAiError, Result};

/// Sentinel emitted when the context store raises a database error.
pub const DATABASE_UNAVAILABLE_ANSWER: &str =
    "Sorry, I cannot access my database. Try again later.";

/// Sentinel emitted when retrieval succeeds but the store holds no chunks.
pub const EMPTY_STORE_ANSWER: &str = "The context database is empty.";

/// Sentinel emitted when the validity classifier rejects the question.
pub const OUT_OF_CONTEXT_ANSWER: &str = "I don't know";

/// The unit returned to callers; one per candidate context. Never
/// persisted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub question: String,
    pub context: String,
    pub answer_text: String,
}

impl AnswerRecord {
    fn sentinel(question: &str, answer_text: &str) -> Self {
        Self {
            question: question.to_string(),
            context: String::new(),
            answer_text: answer_text.to_string(),
        }
    }
}

/// Orchestrates retrieval, question validation and answer generation.
///
/// Stateless per invocation: the engine holds only its collaborators and
/// retains nothing across calls. Store faults never escape; they become
/// sentinel answer records. Provider faults (embedding or generation)
/// are the only errors a caller can observe.
pub struct RetrievalAnswerEngine<'a, S, E, G> {
    store: &'a S,
    embedder: &'a E,
    generator: &'a G,
    max_output_length: u32,
    retrieval_limit: i64,
}

impl<'a, S, E, G> RetrievalAnswerEngine<'a, S, E, G>
where
    S: ContextStore + Sync,
    E: EmbeddingProvider + Sync,
    G: GenerationProvider + Sync,
{
    #[inline]
    pub fn new(store: &'a S, embedder: &'a E, generator: &'a G, config: &Config) -> Self {
        Self {
            store,
            embedder,
            generator,
            max_output_length: config.generator.max_output_length,
            retrieval_limit: 1,
        }
    }

    /// Widen retrieval beyond the single best candidate. The answer list
    /// then carries one record per candidate, in distance order. Limits
    /// below 1 are clamped to 1.
    #[inline]
    #[must_use]
    pub fn with_retrieval_limit(mut self, limit: i64) -> Self {
        self.retrieval_limit = limit.max(1);
        self
    }

    /// Answer a question against the retrieved context, or against
    /// `provided_context` when the caller supplies one.
    ///
    /// Always returns a well-formed record list. A store fault or an
    /// empty store short-circuits into a single sentinel record.
    #[inline]
    pub async fn answer(
        &self,
        question: &str,
        provided_context: Option<&str>,
    ) -> Result<Vec<AnswerRecord>> {
        // A blank provided context counts as absent; the question still
        // goes through retrieval.
        let provided_context = provided_context.filter(|context| !context.trim().is_empty());

        let candidates = if let Some(context) = provided_context {
            vec![RetrievalCandidate {
                context_text: context.to_string(),
                distance: 0.0,
            }]
        } else {
            let embedding = self
                .embedder
                .embed(question)
                .map_err(|err| QueryAiError::Embedding(err.to_string()))?;

            match self.store.nearest(&embedding, self.retrieval_limit).await {
                Ok(candidates) => candidates,
                Err(err) => {
                    warn!("Context store unavailable: {err}");
                    return Ok(vec![AnswerRecord::sentinel(
                        question,
                        DATABASE_UNAVAILABLE_ANSWER,
                    )]);
                }
            }
        };

        if candidates.is_empty() {
            debug!("The context database is empty");
            return Ok(vec![AnswerRecord::sentinel(question, EMPTY_STORE_ANSWER)]);
        }

        let mut records = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            records.push(self.answer_against(question, &candidate.context_text)?);
        }
        Ok(records)
    }

    fn answer_against(&self, question: &str, context: &str) -> Result<AnswerRecord> {
        let answer_text = if self.is_answerable(context, question)? {
            self.ask(context, question)?
        } else {
            debug!("The question is out of context");
            OUT_OF_CONTEXT_ANSWER.to_string()
        };

        Ok(AnswerRecord {
            question: question.to_string(),
            context: context.to_string(),
            answer_text,
        })
    }

    /// Run the validity classifier: a generation call expected to reply
    /// with a bare `1` (answerable) or `0` (not answerable).
    fn is_answerable(&self, context: &str, question: &str) -> Result<bool> {
        let system = format!(
            "You are an analyst that validates if question can be answered from the\n\
             given context.\n\
             \n\
             Context: \n\
             \n\
             {context}\n\
             \n\
             Question:\n\
             \n\
             {question}"
        );
        let turns = [
            ChatTurn::new("system", system),
            ChatTurn::new("analyst", "Must answer 1 if yes, 0 if no."),
        ];

        let reply = self
            .generator
            .generate(&turns, "analyst:", self.max_output_length)
            .map_err(|err| QueryAiError::Generation(err.to_string()))?;

        debug!("Validation result: {}", reply.trim());

        // The classifier contract is a bare binary token, but nothing
        // forces the model to honor it. A reply that parses to 0 skips
        // generation; any numeric non-zero means answerable. A reply
        // that does not parse falls through to generation, whose prompt
        // already instructs the model to decline out-of-context
        // questions.
        match reply.trim().parse::<i64>() {
            Ok(flag) => Ok(flag != 0),
            Err(_) => {
                warn!("Non-numeric validation reply {:?}, proceeding to answer", reply.trim());
                Ok(true)
            }
        }
    }

    fn ask(&self, context: &str, question: &str) -> Result<String> {
        let system = format!(
            "You are a chatbot that can answer questions based on the given context.\n\
             Context: \n\
             \n\
             {context}"
        );
        let turns = [
            ChatTurn::new("system", system),
            ChatTurn::new("assistant", "Must answer politely and informatively."),
            ChatTurn::new("assistant", "Respond 'I don't know' if out of context."),
            ChatTurn::new("user", question),
        ];

        self.generator
            .generate(&turns, "assistant:", self.max_output_length)
            .map_err(|err| QueryAiError::Generation(err.to_string()))
    }
}
