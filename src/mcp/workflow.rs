//! Workflow definition and execution tools.

use super::{encode_query_value, ConductorMcpServer};
use crate::network::Headers;
use rmcp::{
    handler::server::wrapper::Parameters, model::*, schemars, tool, tool_router,
    ErrorData as McpError,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Header carrying the caller's idempotency key on workflow starts.
pub const IDEMPOTENCY_KEY_HEADER: &str = "X-Idempotency-key";
/// Header carrying the duplicate-start policy alongside the key.
pub const ON_CONFLICT_HEADER: &str = "X-on-conflict";

/// What Conductor does when a start request reuses an idempotency key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdempotencyStrategy {
    /// Return the execution already started with this key
    #[default]
    ReturnExisting,
    /// Reject the request
    Fail,
    /// Reject only while the earlier execution is still running
    FailOnRunning,
}

impl IdempotencyStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdempotencyStrategy::ReturnExisting => "RETURN_EXISTING",
            IdempotencyStrategy::Fail => "FAIL",
            IdempotencyStrategy::FailOnRunning => "FAIL_ON_RUNNING",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
    TimedOut,
    Terminated,
    Paused,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Running => "RUNNING",
            WorkflowStatus::Completed => "COMPLETED",
            WorkflowStatus::Failed => "FAILED",
            WorkflowStatus::TimedOut => "TIMED_OUT",
            WorkflowStatus::Terminated => "TERMINATED",
            WorkflowStatus::Paused => "PAUSED",
        }
    }
}

// ---------------------------------------------------------------------------
// Parameter types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct WorkflowIdParam {
    /// The uuid of the workflow execution
    pub workflow_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct WorkflowNameParam {
    /// Name of the workflow definition
    pub workflow_name: String,
    /// Definition version; the latest version when omitted
    #[serde(default)]
    pub version: Option<i32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct WorkflowDefinitionParam {
    /// Full workflow definition: name, description, version, tasks, inputParameters,
    /// outputParameters, schemaVersion (2), ownerEmail, timeoutSeconds
    pub workflow_definition: Value,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct StartWorkflowParam {
    /// Name of the workflow definition to execute
    pub workflow_name: String,
    /// Optional id used to correlate this execution with others
    #[serde(default)]
    pub correlation_id: Option<String>,
    /// Execution priority, 0 (default) to 99
    #[serde(default)]
    pub priority: i32,
    /// Policy applied when `idempotency_key` was already used (default RETURN_EXISTING)
    #[serde(default)]
    pub idempotency_strategy: IdempotencyStrategy,
    /// Optional client-chosen key that makes the start request idempotent
    #[serde(default)]
    pub idempotency_key: Option<String>,
    /// Workflow input, sent as the request body
    #[serde(default)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct QueryExecutionsParam {
    /// Only executions of this workflow definition
    #[serde(default)]
    pub workflow_name: Option<String>,
    /// Only executions in this status
    #[serde(default)]
    pub status: Option<WorkflowStatus>,
    /// Lower bound on start time, epoch milliseconds
    #[serde(default)]
    pub start_time_from: Option<i64>,
    /// Upper bound on start time, epoch milliseconds
    #[serde(default)]
    pub start_time_to: Option<i64>,
    /// Free text search across execution fields
    #[serde(default)]
    pub free_text: Option<String>,
    /// Raw Conductor query clause, ANDed with the other filters
    #[serde(default)]
    pub query: Option<String>,
    /// Page size (default 100)
    #[serde(default = "default_page_size")]
    pub size: u32,
    /// Offset of the first result (default 0)
    #[serde(default)]
    pub start: u32,
}

fn default_page_size() -> u32 {
    100
}

impl Default for QueryExecutionsParam {
    fn default() -> Self {
        Self {
            workflow_name: None,
            status: None,
            start_time_from: None,
            start_time_to: None,
            free_text: None,
            query: None,
            size: default_page_size(),
            start: 0,
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TerminateWorkflowParam {
    /// The uuid of the workflow execution
    pub workflow_id: String,
    /// Reason recorded on the terminated execution
    #[serde(default)]
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Request construction
// ---------------------------------------------------------------------------

pub fn workflow_by_id_path(workflow_id: &str) -> String {
    format!("workflow/{}?includeTasks=true&summarize=false", workflow_id)
}

pub fn workflow_by_name_path(workflow_name: &str, version: Option<i32>) -> String {
    match version {
        Some(v) => format!("metadata/workflow/{}?version={}", workflow_name, v),
        None => format!("metadata/workflow/{}", workflow_name),
    }
}

/// Path and extra headers for starting an execution.
///
/// The idempotency headers are only sent together, and only with a key.
pub fn start_workflow_request(p: &StartWorkflowParam) -> (String, Headers) {
    let mut path = format!("workflow/{}?priority={}", p.workflow_name, p.priority);
    if let Some(correlation_id) = &p.correlation_id {
        path.push_str("&correlationId=");
        path.push_str(&encode_query_value(correlation_id));
    }

    let mut headers = Headers::new();
    if let Some(key) = &p.idempotency_key {
        headers.insert(IDEMPOTENCY_KEY_HEADER.to_string(), key.clone());
        headers.insert(
            ON_CONFLICT_HEADER.to_string(),
            p.idempotency_strategy.as_str().to_string(),
        );
    }
    (path, headers)
}

/// Conductor search expression for the structured filters, ANDed together.
pub fn build_search_query(p: &QueryExecutionsParam) -> Option<String> {
    let mut clauses = Vec::new();
    if let Some(name) = &p.workflow_name {
        clauses.push(format!("workflowType=\"{}\"", name));
    }
    if let Some(status) = p.status {
        clauses.push(format!("status=\"{}\"", status.as_str()));
    }
    if let Some(from) = p.start_time_from {
        clauses.push(format!("startTime>{}", from));
    }
    if let Some(to) = p.start_time_to {
        clauses.push(format!("startTime<{}", to));
    }
    if let Some(raw) = p.query.as_deref().filter(|q| !q.trim().is_empty()) {
        clauses.push(raw.to_string());
    }

    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" AND "))
    }
}

pub fn search_path(p: &QueryExecutionsParam) -> String {
    let mut path = format!("workflow/search?start={}&size={}", p.start, p.size);
    if let Some(text) = p.free_text.as_deref().filter(|t| !t.is_empty()) {
        path.push_str("&freeText=");
        path.push_str(&encode_query_value(text));
    }
    if let Some(query) = build_search_query(p) {
        path.push_str("&query=");
        path.push_str(&encode_query_value(&query));
    }
    path
}

pub fn terminate_path(workflow_id: &str, reason: Option<&str>) -> String {
    match reason.filter(|r| !r.is_empty()) {
        Some(r) => format!("workflow/{}?reason={}", workflow_id, encode_query_value(r)),
        None => format!("workflow/{}", workflow_id),
    }
}

#[tool_router(router = workflow_router, vis = "pub(crate)")]
impl ConductorMcpServer {
    // ── Definitions ────────────────────────────────────────────────────────

    #[tool(description = "Gets a conductor workflow execution in json format based on that workflow's id, including its tasks.")]
    async fn get_workflow_by_id(
        &self,
        Parameters(p): Parameters<WorkflowIdParam>,
    ) -> Result<CallToolResult, McpError> {
        let body = self.api_get(&workflow_by_id_path(&p.workflow_id)).await?;
        Self::text_result(body)
    }

    #[tool(description = "Gets the metadata (definition) of a conductor workflow by name. Returns the latest version unless a version is given.")]
    async fn get_workflow_by_name(
        &self,
        Parameters(p): Parameters<WorkflowNameParam>,
    ) -> Result<CallToolResult, McpError> {
        let body = self
            .api_get(&workflow_by_name_path(&p.workflow_name, p.version))
            .await?;
        Self::text_result(body)
    }

    #[tool(description = "Gets a short description of every workflow definition: name, version, description and owner.")]
    async fn get_all_workflows(&self) -> Result<CallToolResult, McpError> {
        let body = self.api_get("metadata/workflow?short=true").await?;
        Self::text_result(body)
    }

    #[tool(description = "Creates a new workflow definition. The definition needs at least name, description, version, tasks and schemaVersion 2. Returns the Conductor response as text.")]
    async fn create_workflow_definition(
        &self,
        Parameters(p): Parameters<WorkflowDefinitionParam>,
    ) -> Result<CallToolResult, McpError> {
        let body = self
            .api_post("metadata/workflow", &p.workflow_definition)
            .await?;
        Self::text_result(body)
    }

    // ── Executions ─────────────────────────────────────────────────────────

    #[tool(description = "Starts a new execution of the named workflow with `data` as input. Returns the new workflow id. Pass idempotency_key to make retries safe; idempotency_strategy (RETURN_EXISTING, FAIL, FAIL_ON_RUNNING) decides what a repeated key does.")]
    async fn start_workflow_by_name(
        &self,
        Parameters(p): Parameters<StartWorkflowParam>,
    ) -> Result<CallToolResult, McpError> {
        let (path, headers) = start_workflow_request(&p);
        let data = Value::Object(p.data);
        let body = self.api_post_with_headers(&path, &data, &headers).await?;
        Self::text_result(body)
    }

    #[tool(description = "Searches workflow executions. Filters (workflow_name, status, start_time_from/start_time_to in epoch millis, free_text, raw query) are combined with AND. Paged by start and size (default 100).")]
    async fn query_workflow_executions(
        &self,
        Parameters(p): Parameters<QueryExecutionsParam>,
    ) -> Result<CallToolResult, McpError> {
        let body = self.api_get(&search_path(&p)).await?;
        Self::text_result(body)
    }

    // ── Control ────────────────────────────────────────────────────────────

    #[tool(description = "Pauses a running workflow execution. No new tasks are scheduled until it is resumed.")]
    async fn pause_workflow(
        &self,
        Parameters(p): Parameters<WorkflowIdParam>,
    ) -> Result<CallToolResult, McpError> {
        let body = self
            .api_put(&format!("workflow/{}/pause", p.workflow_id))
            .await?;
        Self::text_result(body)
    }

    #[tool(description = "Resumes a paused workflow execution.")]
    async fn resume_workflow(
        &self,
        Parameters(p): Parameters<WorkflowIdParam>,
    ) -> Result<CallToolResult, McpError> {
        let body = self
            .api_put(&format!("workflow/{}/resume", p.workflow_id))
            .await?;
        Self::text_result(body)
    }

    #[tool(description = "Terminates a workflow execution, optionally recording a reason. Terminated executions can be restarted.")]
    async fn terminate_workflow(
        &self,
        Parameters(p): Parameters<TerminateWorkflowParam>,
    ) -> Result<CallToolResult, McpError> {
        let body = self
            .api_delete(&terminate_path(&p.workflow_id, p.reason.as_deref()))
            .await?;
        Self::text_result(body)
    }

    #[tool(description = "Restarts a completed or terminated workflow execution from the beginning with its original input.")]
    async fn restart_workflow(
        &self,
        Parameters(p): Parameters<WorkflowIdParam>,
    ) -> Result<CallToolResult, McpError> {
        let body = self
            .api_post(&format!("workflow/{}/restart", p.workflow_id), &json!({}))
            .await?;
        Self::text_result(body)
    }

    #[tool(description = "Retries the last failed task of a failed workflow execution and continues from there.")]
    async fn retry_workflow(
        &self,
        Parameters(p): Parameters<WorkflowIdParam>,
    ) -> Result<CallToolResult, McpError> {
        let body = self
            .api_post(&format!("workflow/{}/retry", p.workflow_id), &json!({}))
            .await?;
        Self::text_result(body)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{server_for, text, TEST_TOKEN};
    use super::*;
    use mockito::{Matcher, Server};

    fn start(name: &str) -> StartWorkflowParam {
        StartWorkflowParam {
            workflow_name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_start_defaults() {
        let (path, headers) = start_workflow_request(&start("test1"));
        assert_eq!(path, "workflow/test1?priority=0");
        assert!(headers.is_empty());
    }

    #[test]
    fn test_start_with_priority() {
        let p = StartWorkflowParam {
            priority: 13,
            ..start("test2")
        };
        assert_eq!(start_workflow_request(&p).0, "workflow/test2?priority=13");
    }

    #[test]
    fn test_start_strategy_without_key_sends_no_headers() {
        let p = StartWorkflowParam {
            idempotency_strategy: IdempotencyStrategy::Fail,
            ..start("test3")
        };
        let (path, headers) = start_workflow_request(&p);
        assert_eq!(path, "workflow/test3?priority=0");
        assert!(headers.is_empty());
    }

    #[test]
    fn test_start_key_uses_default_strategy() {
        let p = StartWorkflowParam {
            priority: 9,
            idempotency_key: Some("azog".to_string()),
            ..start("test4")
        };
        let (path, headers) = start_workflow_request(&p);
        assert_eq!(path, "workflow/test4?priority=9");
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[IDEMPOTENCY_KEY_HEADER], "azog");
        assert_eq!(headers[ON_CONFLICT_HEADER], "RETURN_EXISTING");
    }

    #[test]
    fn test_start_key_with_explicit_strategy() {
        let p = StartWorkflowParam {
            priority: 11,
            idempotency_key: Some("azog".to_string()),
            idempotency_strategy: IdempotencyStrategy::FailOnRunning,
            ..start("test5")
        };
        let (path, headers) = start_workflow_request(&p);
        assert_eq!(path, "workflow/test5?priority=11");
        assert_eq!(headers[ON_CONFLICT_HEADER], "FAIL_ON_RUNNING");
    }

    #[test]
    fn test_start_with_correlation_id() {
        let p = StartWorkflowParam {
            correlation_id: Some("42".to_string()),
            ..start("test6")
        };
        assert_eq!(
            start_workflow_request(&p).0,
            "workflow/test6?priority=0&correlationId=42"
        );
    }

    #[test]
    fn test_start_params_deserialize_defaults() {
        let p: StartWorkflowParam =
            serde_json::from_value(json!({"workflow_name": "wf"})).unwrap();
        assert_eq!(p.priority, 0);
        assert_eq!(p.idempotency_strategy, IdempotencyStrategy::ReturnExisting);
        assert!(p.data.is_empty());

        let p: StartWorkflowParam = serde_json::from_value(json!({
            "workflow_name": "wf",
            "idempotency_strategy": "FAIL_ON_RUNNING"
        }))
        .unwrap();
        assert_eq!(p.idempotency_strategy, IdempotencyStrategy::FailOnRunning);
    }

    #[test]
    fn test_workflow_by_name_path() {
        assert_eq!(workflow_by_name_path("order", None), "metadata/workflow/order");
        assert_eq!(
            workflow_by_name_path("order", Some(3)),
            "metadata/workflow/order?version=3"
        );
    }

    #[test]
    fn test_search_without_filters() {
        assert_eq!(
            search_path(&QueryExecutionsParam::default()),
            "workflow/search?start=0&size=100"
        );
    }

    #[test]
    fn test_search_query_joins_filters() {
        let p = QueryExecutionsParam {
            workflow_name: Some("order".to_string()),
            status: Some(WorkflowStatus::Failed),
            start_time_from: Some(1000),
            start_time_to: Some(2000),
            query: Some("priority>5".to_string()),
            ..Default::default()
        };
        assert_eq!(
            build_search_query(&p).unwrap(),
            "workflowType=\"order\" AND status=\"FAILED\" AND startTime>1000 AND startTime<2000 AND priority>5"
        );
    }

    #[test]
    fn test_search_path_encodes_query_and_paging() {
        let p = QueryExecutionsParam {
            status: Some(WorkflowStatus::Running),
            free_text: Some("order 7".to_string()),
            size: 10,
            start: 20,
            ..Default::default()
        };
        assert_eq!(
            search_path(&p),
            "workflow/search?start=20&size=10&freeText=order%207&query=status%3D%22RUNNING%22"
        );
    }

    #[test]
    fn test_terminate_path() {
        assert_eq!(terminate_path("abc", None), "workflow/abc");
        assert_eq!(terminate_path("abc", Some("")), "workflow/abc");
        assert_eq!(
            terminate_path("abc", Some("stuck task")),
            "workflow/abc?reason=stuck%20task"
        );
    }

    #[tokio::test]
    async fn test_get_workflow_by_id_returns_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/workflow/123?includeTasks=true&summarize=false")
            .match_header("x-authorization", TEST_TOKEN)
            .with_body(r#"{"workflowId":"123"}"#)
            .create_async()
            .await;

        let mcp = server_for(&format!("{}/api", server.url()));
        let result = mcp
            .get_workflow_by_id(Parameters(WorkflowIdParam {
                workflow_id: "123".to_string(),
            }))
            .await
            .unwrap();

        assert_eq!(text(&result), r#"{"workflowId":"123"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_start_workflow_sends_data_and_headers() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/workflow/order?priority=5")
            .match_header(IDEMPOTENCY_KEY_HEADER, "k-1")
            .match_header(ON_CONFLICT_HEADER, "FAIL")
            .match_body(Matcher::Json(json!({"orderId": 7})))
            .with_body("wf-uuid")
            .create_async()
            .await;

        let mcp = server_for(&format!("{}/api", server.url()));
        let mut data = Map::new();
        data.insert("orderId".to_string(), json!(7));
        let result = mcp
            .start_workflow_by_name(Parameters(StartWorkflowParam {
                workflow_name: "order".to_string(),
                priority: 5,
                idempotency_key: Some("k-1".to_string()),
                idempotency_strategy: IdempotencyStrategy::Fail,
                data,
                ..Default::default()
            }))
            .await
            .unwrap();

        assert_eq!(text(&result), "wf-uuid");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_control_verbs() {
        let mut server = Server::new_async().await;
        let pause = server
            .mock("PUT", "/api/workflow/w1/pause")
            .match_body(Matcher::Exact(String::new()))
            .create_async()
            .await;
        let resume = server
            .mock("PUT", "/api/workflow/w1/resume")
            .create_async()
            .await;
        let terminate = server
            .mock("DELETE", "/api/workflow/w1?reason=done")
            .create_async()
            .await;
        let restart = server
            .mock("POST", "/api/workflow/w1/restart")
            .match_body(Matcher::Json(json!({})))
            .create_async()
            .await;
        let retry = server
            .mock("POST", "/api/workflow/w1/retry")
            .match_body(Matcher::Json(json!({})))
            .create_async()
            .await;

        let mcp = server_for(&format!("{}/api", server.url()));
        let id = || {
            Parameters(WorkflowIdParam {
                workflow_id: "w1".to_string(),
            })
        };
        mcp.pause_workflow(id()).await.unwrap();
        mcp.resume_workflow(id()).await.unwrap();
        mcp.terminate_workflow(Parameters(TerminateWorkflowParam {
            workflow_id: "w1".to_string(),
            reason: Some("done".to_string()),
        }))
        .await
        .unwrap();
        mcp.restart_workflow(id()).await.unwrap();
        mcp.retry_workflow(id()).await.unwrap();

        pause.assert_async().await;
        resume.assert_async().await;
        terminate.assert_async().await;
        restart.assert_async().await;
        retry.assert_async().await;
    }

    #[tokio::test]
    async fn test_upstream_error_is_returned_as_text() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/metadata/workflow/missing")
            .with_status(404)
            .with_body(r#"{"status":404,"message":"No such workflow found by name: missing"}"#)
            .create_async()
            .await;

        let mcp = server_for(&format!("{}/api", server.url()));
        let result = mcp
            .get_workflow_by_name(Parameters(WorkflowNameParam {
                workflow_name: "missing".to_string(),
                version: None,
            }))
            .await
            .unwrap();
        assert!(text(&result).contains("No such workflow"));
    }
}
