//! Per-request context handed to every field implementation.

use derivative::Derivative;
use tokio_util::sync::CancellationToken;

use crate::server::Server;

/// Carries cancellation and the server a request runs against.
///
/// Cloning is cheap; clones share the same cancellation state.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Context {
    cancellation: CancellationToken,

    #[derivative(Debug = "ignore")]
    server: Option<Server>,
}

impl Context {
    pub fn new() -> Self {
        Context::with_cancellation(CancellationToken::new())
    }

    /// A context cancelled whenever `token` is.
    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Context {
            cancellation,
            server: None,
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn cancel(&self) {
        self.cancellation.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Completes once the context is cancelled.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    /// The server this context is resolving against, once a resolution has started.
    pub fn server(&self) -> Option<&Server> {
        self.server.as_ref()
    }

    pub(crate) fn bind(&self, server: &Server) -> Context {
        match &self.server {
            Some(bound) if bound.ptr_eq(server) => self.clone(),
            _ => Context {
                server: Some(server.clone()),
                ..self.clone()
            },
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_cancellation() {
        let ctx = Context::new();
        let clone = ctx.clone();
        assert!(!clone.is_cancelled());
        ctx.cancel();
        assert!(clone.is_cancelled());
        clone.cancelled().await;
    }

    #[test]
    fn child_token_follows_parent() {
        let parent = CancellationToken::new();
        let ctx = Context::with_cancellation(parent.child_token());
        parent.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn unbound_by_default() {
        assert!(Context::default().server().is_none());
    }
}
