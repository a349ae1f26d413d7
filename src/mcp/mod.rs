//! Conductor MCP server: tools, resources and prompts backed by [`HttpProxy`].
//!
//! Each tool builds a resource path, forwards it through the proxy and hands
//! the raw response text back to the agent.

pub mod event;
pub mod prompts;
pub mod resources;
pub mod task;
pub mod workflow;

use crate::error::ConductorError;
use crate::network::{Headers, HttpProxy};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rmcp::{
    handler::server::router::{prompt::PromptRouter, tool::ToolRouter},
    model::*,
    prompt_handler,
    service::RequestContext,
    tool_handler, ErrorData as McpError, RoleServer, ServerHandler,
};
use serde_json::Value;

/// Name advertised to MCP clients.
pub const SERVER_NAME: &str = "orkes-conductor";

/// Characters left unescaped in query parameter values.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a value for use inside a query string.
pub fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

impl From<ConductorError> for McpError {
    fn from(e: ConductorError) -> Self {
        McpError::internal_error(e.to_string(), None)
    }
}

#[derive(Clone)]
pub struct ConductorMcpServer {
    proxy: HttpProxy,
    tool_router: ToolRouter<Self>,
    prompt_router: PromptRouter<Self>,
}

impl ConductorMcpServer {
    pub fn new(proxy: HttpProxy) -> Self {
        Self {
            proxy,
            tool_router: Self::workflow_router() + Self::task_router() + Self::event_router(),
            prompt_router: Self::prompt_router(),
        }
    }

    pub fn proxy(&self) -> &HttpProxy {
        &self.proxy
    }

    async fn api_get(&self, path: &str) -> Result<String, McpError> {
        self.proxy.get(path).await.map_err(|e| {
            tracing::warn!("GET {} failed: {}", path, e);
            e.into()
        })
    }

    async fn api_post(&self, path: &str, body: &Value) -> Result<String, McpError> {
        self.api_post_with_headers(path, body, &Headers::new()).await
    }

    async fn api_post_with_headers(
        &self,
        path: &str,
        body: &Value,
        headers: &Headers,
    ) -> Result<String, McpError> {
        self.proxy.post(path, body, headers).await.map_err(|e| {
            tracing::warn!("POST {} failed: {}", path, e);
            e.into()
        })
    }

    async fn api_put(&self, path: &str) -> Result<String, McpError> {
        self.proxy.put(path, None, &Headers::new()).await.map_err(|e| {
            tracing::warn!("PUT {} failed: {}", path, e);
            e.into()
        })
    }

    async fn api_delete(&self, path: &str) -> Result<String, McpError> {
        self.proxy.delete(path).await.map_err(|e| {
            tracing::warn!("DELETE {} failed: {}", path, e);
            e.into()
        })
    }

    fn text_result(text: impl Into<String>) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_handler]
#[prompt_handler]
impl ServerHandler for ConductorMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .enable_prompts()
                .build(),
            server_info: Implementation {
                name: SERVER_NAME.into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: Some("Orkes Conductor".into()),
                description: Some(
                    "List, start, query and troubleshoot Conductor workflows and tasks".into(),
                ),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "# Conductor MCP: workflow orchestration\n\
                 \n\
                 Every tool returns the Conductor API response as raw JSON text. \
                 Error responses from Conductor are returned as text too; read the \
                 `status` and `message` fields before assuming success.\n\
                 \n\
                 ## Tool Groups\n\
                 **Workflow definitions:** get_all_workflows, get_workflow_by_name, create_workflow_definition\n\
                 **Executions:** start_workflow_by_name, get_workflow_by_id, query_workflow_executions\n\
                 **Control:** pause_workflow, resume_workflow, terminate_workflow, restart_workflow, retry_workflow\n\
                 **Tasks:** get_task_by_id, get_task_logs, update_task_status, get_task_queue_details\n\
                 **Task definitions:** get_all_task_definitions, get_task_definition_for_tasktype, create_task_definition\n\
                 **Events:** get_event_handlers\n\
                 \n\
                 ## Resources\n\
                 conductor://workflows/{definitions,running,failed,paused}, \
                 conductor://tasks/{definitions,queue}\n\
                 \n\
                 ## Prompts\n\
                 troubleshoot_workflow, analyze_failures, create_workflow, monitor_workflow, optimize_workflow"
                    .into(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult::with_all_items(resources::list()))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        self.read_conductor_resource(&request.uri).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::ConductorConfig;
    use crate::network::{Credential, TokenManager};
    use chrono::Utc;
    use reqwest::Client;
    use std::sync::Arc;

    pub const TEST_TOKEN: &str = "test_tolkien";

    /// Server talking to `base` with a fresh token already cached.
    pub fn server_for(base: &str) -> ConductorMcpServer {
        let client = Client::new();
        let config = Arc::new(ConductorConfig::new(base, "k", "s"));
        let tokens = TokenManager::new(client.clone(), config.clone())
            .with_credential(Credential::new(TEST_TOKEN, Utc::now()));
        ConductorMcpServer::new(HttpProxy::new(client, config, Arc::new(tokens)))
    }

    pub fn text(result: &CallToolResult) -> &str {
        result.content[0]
            .as_text()
            .map(|t| t.text.as_str())
            .unwrap_or_default()
    }
}
