//! Event handler lookup.

use super::{encode_query_value, ConductorMcpServer};
use rmcp::{
    handler::server::wrapper::Parameters, model::*, schemars, tool, tool_router,
    ErrorData as McpError,
};
use serde::Deserialize;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct EventHandlersParam {
    /// Only handlers listening for this event (e.g. "kafka:orders")
    #[serde(default)]
    pub event: Option<String>,
    /// Only active handlers (default true)
    #[serde(default = "default_active_only")]
    pub active_only: bool,
}

fn default_active_only() -> bool {
    true
}

pub fn event_handlers_path(event: Option<&str>, active_only: bool) -> String {
    match event.filter(|e| !e.is_empty()) {
        Some(e) => format!(
            "event?event={}&activeOnly={}",
            encode_query_value(e),
            active_only
        ),
        None => format!("event?activeOnly={}", active_only),
    }
}

#[tool_router(router = event_router, vis = "pub(crate)")]
impl ConductorMcpServer {
    #[tool(description = "Gets event handlers, optionally filtered by event name. Event handlers decide how Conductor reacts to external events, such as starting a workflow or completing a task.")]
    async fn get_event_handlers(
        &self,
        Parameters(p): Parameters<EventHandlersParam>,
    ) -> Result<CallToolResult, McpError> {
        let body = self
            .api_get(&event_handlers_path(p.event.as_deref(), p.active_only))
            .await?;
        Self::text_result(body)
    }
}
