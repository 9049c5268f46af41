use std::sync::Arc;

use crate::config::Config;
use crate::interactions::JobInteractions;
use crate::llm_client::CompletionProvider;
use crate::store::live::LiveStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LiveStore>,
    pub interactions: JobInteractions,
    /// Pluggable completion backend. Production: AnthropicProvider.
    pub provider: Arc<dyn CompletionProvider>,
    pub config: Config,
}
