//! Task execution and task definition tools.

use super::ConductorMcpServer;
use rmcp::{
    handler::server::wrapper::Parameters, model::*, schemars, tool, tool_router,
    ErrorData as McpError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Statuses a worker may report for a task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    InProgress,
    Failed,
    FailedWithTerminalError,
    Completed,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TaskIdParam {
    /// The uuid of the task execution
    pub task_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TaskTypeParam {
    /// Task type (the task definition name). Only user-defined tasks have definitions.
    #[serde(alias = "taskType")]
    pub task_type: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateTaskStatusParam {
    /// The uuid of the task execution
    pub task_id: String,
    /// The uuid of the workflow execution the task belongs to
    pub workflow_instance_id: String,
    /// New status: IN_PROGRESS, FAILED, FAILED_WITH_TERMINAL_ERROR or COMPLETED
    pub status: TaskStatus,
    /// Task output merged into the execution
    #[serde(default)]
    pub output_data: Option<Map<String, Value>>,
    /// Log entries to append to the task
    #[serde(default)]
    pub logs: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TaskDefinitionParam {
    /// Task definition with at least name, description, retryCount, timeoutSeconds
    /// and responseTimeoutSeconds. Optional inputKeys and outputKeys.
    pub task_definition: Value,
}

/// Body of `POST tasks`. Absent optional fields are left out entirely.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskResult<'a> {
    workflow_instance_id: &'a str,
    task_id: &'a str,
    status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_data: Option<&'a Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logs: Option<&'a Vec<Value>>,
}

pub fn task_update_body(p: &UpdateTaskStatusParam) -> crate::error::Result<Value> {
    let result = TaskResult {
        workflow_instance_id: &p.workflow_instance_id,
        task_id: &p.task_id,
        status: p.status,
        output_data: p.output_data.as_ref(),
        logs: p.logs.as_ref(),
    };
    Ok(serde_json::to_value(result)?)
}

#[tool_router(router = task_router, vis = "pub(crate)")]
impl ConductorMcpServer {
    #[tool(description = "Gets the metadata for a conductor workflow task execution in json format based on that task's id.")]
    async fn get_task_by_id(
        &self,
        Parameters(p): Parameters<TaskIdParam>,
    ) -> Result<CallToolResult, McpError> {
        let body = self.api_get(&format!("tasks/{}", p.task_id)).await?;
        Self::text_result(body)
    }

    #[tool(description = "Gets the execution logs for a task. Returns the log entries generated while the task ran.")]
    async fn get_task_logs(
        &self,
        Parameters(p): Parameters<TaskIdParam>,
    ) -> Result<CallToolResult, McpError> {
        let body = self.api_get(&format!("tasks/{}/log", p.task_id)).await?;
        Self::text_result(body)
    }

    #[tool(description = "Gets the current size of every task queue, keyed by task type.")]
    async fn get_task_queue_details(&self) -> Result<CallToolResult, McpError> {
        let body = self.api_get("tasks/queue/all").await?;
        Self::text_result(body)
    }

    #[tool(description = "Gets all task definitions.")]
    async fn get_all_task_definitions(&self) -> Result<CallToolResult, McpError> {
        let body = self
            .api_get("metadata/taskdefs?access=READ&metadata=false")
            .await?;
        Self::text_result(body)
    }

    #[tool(description = "Gets the task definition for a task type. \"Task type\" is synonymous with \"task name\"; only user-defined tasks have definitions.")]
    async fn get_task_definition_for_tasktype(
        &self,
        Parameters(p): Parameters<TaskTypeParam>,
    ) -> Result<CallToolResult, McpError> {
        let body = self
            .api_get(&format!("metadata/taskdefs/{}?metadata=false", p.task_type))
            .await?;
        Self::text_result(body)
    }

    #[tool(description = "Updates the status of a task execution, optionally with output data and log entries. Normally done by the worker executing the task.")]
    async fn update_task_status(
        &self,
        Parameters(p): Parameters<UpdateTaskStatusParam>,
    ) -> Result<CallToolResult, McpError> {
        let payload = task_update_body(&p)?;
        let body = self.api_post("tasks", &payload).await?;
        Self::text_result(body)
    }

    #[tool(description = "Creates or updates a task definition. Needs at least name, description, retryCount, timeoutSeconds and responseTimeoutSeconds.")]
    async fn create_task_definition(
        &self,
        Parameters(p): Parameters<TaskDefinitionParam>,
    ) -> Result<CallToolResult, McpError> {
        // The endpoint takes a list of definitions.
        let body = self
            .api_post("metadata/taskdefs", &json!([p.task_definition]))
            .await?;
        Self::text_result(body)
    }
}
