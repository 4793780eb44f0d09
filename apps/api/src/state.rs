use std::sync::Arc;

use crate::analysis::gate::RequestGate;
use crate::llm_client::GeminiClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: GeminiClient,
    /// Single-in-flight discipline for the analysis endpoint.
    pub gate: Arc<RequestGate>,
}
