//! Decorator that keeps the session answering when the model is unreachable.
use tracing::{info, warn};

use super::{
    arithmetic::{self, ArithmeticError},
    fallback, Agent,
};

/// Wraps an [`Agent`]: plain arithmetic is answered locally and any failure
/// of the inner agent becomes an offline reply.
pub struct ResilientAgent<A> {
    inner: A,
}

impl<A: Agent> ResilientAgent<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub async fn answer(&mut self, query: &str) -> String {
        match arithmetic::evaluate(query) {
            Some(Ok(value)) => {
                info!(target: "mcp_chat::agent", "Answered arithmetic locally");
                return value.to_string();
            }
            Some(Err(err)) => return self.arithmetic_failure(query, err),
            None => {}
        }

        match self.inner.answer(query).await {
            Ok(answer) => answer,
            Err(err) => {
                warn!(target: "mcp_chat::agent", reason = %err, "Model call failed; using offline reply");
                eprintln!("\n[warning] Model call failed: {err}\n");
                fallback::offline_response(query).to_string()
            }
        }
    }

    fn arithmetic_failure(&self, query: &str, err: ArithmeticError) -> String {
        warn!(target: "mcp_chat::agent", reason = %err, "Arithmetic evaluation failed");
        eprintln!("\n[warning] Could not evaluate `{}`: {err}\n", query.trim());
        fallback::offline_response(query).to_string()
    }
}
