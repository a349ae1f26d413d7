//! Prompt templates that walk an agent through common Conductor chores.
//!
//! Each prompt renders a single user message naming the tools to call.

use super::ConductorMcpServer;
use rmcp::{
    handler::server::wrapper::Parameters,
    model::{PromptMessage, PromptMessageRole},
    prompt, prompt_router, schemars,
};
use serde::{Deserialize, Deserializer};

pub const DEFAULT_LOOKBACK_HOURS: u32 = 24;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct WorkflowIdArgs {
    /// The workflow execution id
    pub workflow_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct WorkflowNameArgs {
    /// Name of the workflow definition
    pub workflow_name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AnalyzeFailuresArgs {
    /// Only failures of this workflow definition
    #[serde(default)]
    pub workflow_name: Option<String>,
    /// How many hours to look back (default 24)
    #[serde(default = "default_hours", deserialize_with = "hours_from_number_or_string")]
    #[schemars(with = "u32")]
    pub hours: u32,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateWorkflowArgs {
    /// Name for the new workflow
    pub workflow_name: String,
    /// What the workflow should do
    pub description: String,
}

fn default_hours() -> u32 {
    DEFAULT_LOOKBACK_HOURS
}

// Prompt arguments usually arrive as strings.
fn hours_from_number_or_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Hours {
        Number(u32),
        Text(String),
    }

    match Hours::deserialize(deserializer)? {
        Hours::Number(n) => Ok(n),
        Hours::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

pub fn troubleshoot_workflow_text(workflow_id: &str) -> String {
    format!(
        "I need help troubleshooting workflow {workflow_id}. Please:
1. Get the current status of the workflow using get_workflow_by_id
2. Identify any failed tasks and their error messages
3. Check the task logs for detailed errors using get_task_logs
4. Analyze the workflow definition to understand the expected flow
5. Suggest possible solutions based on the error messages
6. Recommend next steps to resolve the issue

Start by fetching the workflow status."
    )
}

pub fn analyze_failures_text(workflow_name: Option<&str>, hours: u32) -> String {
    let filter = workflow_name
        .filter(|n| !n.is_empty())
        .map(|n| format!(" for workflow type \"{}\"", n))
        .unwrap_or_default();
    format!(
        "Analyze all failed workflows in the last {hours} hours{filter}.

Please:
1. Use query_workflow_executions to find failed workflows with query: status=\"FAILED\"
2. For each failed workflow, examine the failed tasks and error messages
3. Identify common error patterns and group failures by root cause
4. Determine the most frequently failing tasks
5. Analyze potential root causes (configuration issues, external dependencies, timeouts, etc.)
6. Provide recommendations to prevent future failures
7. Prioritize fixes based on failure frequency and impact

Start by querying for failed workflows."
    )
}

pub fn create_workflow_text(workflow_name: &str, description: &str) -> String {
    format!(
        "I want to create a new workflow called \"{workflow_name}\".
Description: {description}

Please help me:
1. First, use get_all_workflows to show me existing workflow definitions as examples
2. Based on the description, design the workflow structure with appropriate tasks
3. Guide me through creating the workflow definition JSON
4. Ensure all task types are valid (SIMPLE, HTTP, INLINE, SWITCH, DO_WHILE, etc.)
5. Create any necessary task definitions using create_task_definition
6. Register the workflow definition using create_workflow_definition
7. Verify the workflow was created successfully

Remember the key rules:
- taskReferenceName must be unique within the workflow
- INLINE tasks can only access variables via inputParameters
- SWITCH tasks cannot have both switchCaseValue and expression
- Version numbers must be incremented when updating existing workflows

Start by showing me existing workflows for reference."
    )
}

pub fn monitor_workflow_text(workflow_id: &str) -> String {
    format!(
        "Please monitor workflow {workflow_id} and provide a detailed status report.

Steps:
1. Use get_workflow_by_id to fetch the current workflow status
2. List all completed tasks with their execution times
3. Identify the currently running task(s) and their progress
4. Show pending tasks that are yet to execute
5. Check for any warnings or potential issues (slow tasks, retries, etc.)
6. If the workflow is stuck, investigate possible causes
7. Estimate time to completion based on task durations (if possible)

Provide a clear summary of the workflow's health and progress."
    )
}

pub fn optimize_workflow_text(workflow_name: &str) -> String {
    format!(
        "Analyze the workflow \"{workflow_name}\" for optimization opportunities.

Please:
1. Use get_workflow_by_name to fetch the workflow definition
2. Review the task structure and identify potential improvements:
   - Tasks that could run in parallel (using FORK/JOIN)
   - Unnecessary sequential dependencies
   - Tasks with excessive timeouts
   - Opportunities for batching similar operations
3. Check recent executions for performance patterns using query_workflow_executions
4. Identify bottleneck tasks that take the longest
5. Suggest specific changes to improve workflow efficiency
6. Provide before/after estimates if applicable

Start by fetching the workflow definition."
    )
}

fn user_message(text: String) -> Vec<PromptMessage> {
    vec![PromptMessage::new_text(PromptMessageRole::User, text)]
}

#[prompt_router(vis = "pub(crate)")]
impl ConductorMcpServer {
    #[prompt(
        name = "troubleshoot_workflow",
        description = "Troubleshoot a failed or stuck workflow execution."
    )]
    async fn troubleshoot_workflow(
        &self,
        Parameters(args): Parameters<WorkflowIdArgs>,
    ) -> Vec<PromptMessage> {
        user_message(troubleshoot_workflow_text(&args.workflow_id))
    }

    #[prompt(
        name = "analyze_failures",
        description = "Analyze recent workflow failures and identify patterns."
    )]
    async fn analyze_failures(
        &self,
        Parameters(args): Parameters<AnalyzeFailuresArgs>,
    ) -> Vec<PromptMessage> {
        user_message(analyze_failures_text(args.workflow_name.as_deref(), args.hours))
    }

    #[prompt(
        name = "create_workflow",
        description = "Guide the creation of a new workflow definition."
    )]
    async fn create_workflow(
        &self,
        Parameters(args): Parameters<CreateWorkflowArgs>,
    ) -> Vec<PromptMessage> {
        user_message(create_workflow_text(&args.workflow_name, &args.description))
    }

    #[prompt(
        name = "monitor_workflow",
        description = "Report on the progress and health of a running workflow execution."
    )]
    async fn monitor_workflow(
        &self,
        Parameters(args): Parameters<WorkflowIdArgs>,
    ) -> Vec<PromptMessage> {
        user_message(monitor_workflow_text(&args.workflow_id))
    }

    #[prompt(
        name = "optimize_workflow",
        description = "Analyze a workflow definition for optimization opportunities."
    )]
    async fn optimize_workflow(
        &self,
        Parameters(args): Parameters<WorkflowNameArgs>,
    ) -> Vec<PromptMessage> {
        user_message(optimize_workflow_text(&args.workflow_name))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::server_for;
    use super::*;
    use rmcp::model::PromptMessageContent;
    use serde_json::json;

    fn message_text(messages: &[PromptMessage]) -> &str {
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, PromptMessageRole::User);
        match &messages[0].content {
            PromptMessageContent::Text { text } => text,
            other => panic!("expected text content, got {:?}", other),
        }
    }

    #[test]
    fn test_troubleshoot_mentions_id_and_tools() {
        let text = troubleshoot_workflow_text("wf-42");
        assert!(text.starts_with("I need help troubleshooting workflow wf-42."));
        assert!(text.contains("get_workflow_by_id"));
        assert!(text.contains("get_task_logs"));
    }

    #[test]
    fn test_analyze_failures_filter() {
        let all = analyze_failures_text(None, 24);
        assert!(all.starts_with("Analyze all failed workflows in the last 24 hours."));

        let one = analyze_failures_text(Some("order"), 6);
        assert!(one.starts_with(
            "Analyze all failed workflows in the last 6 hours for workflow type \"order\"."
        ));
    }

    #[test]
    fn test_create_workflow_interpolates_both_args() {
        let text = create_workflow_text("billing", "Charge a card");
        assert!(text.contains("called \"billing\""));
        assert!(text.contains("Description: Charge a card"));
        assert!(text.contains("create_workflow_definition"));
    }

    #[test]
    fn test_monitor_and_optimize() {
        assert!(monitor_workflow_text("abc").contains("monitor workflow abc"));
        assert!(optimize_workflow_text("order").contains("workflow \"order\""));
    }

    #[test]
    fn test_hours_accepts_string_or_number() {
        let args: AnalyzeFailuresArgs = serde_json::from_value(json!({"hours": "48"})).unwrap();
        assert_eq!(args.hours, 48);
        let args: AnalyzeFailuresArgs = serde_json::from_value(json!({"hours": 12})).unwrap();
        assert_eq!(args.hours, 12);
        let args: AnalyzeFailuresArgs = serde_json::from_value(json!({})).unwrap();
        assert_eq!(args.hours, DEFAULT_LOOKBACK_HOURS);
        assert!(serde_json::from_value::<AnalyzeFailuresArgs>(json!({"hours": "soon"})).is_err());
    }

    #[tokio::test]
    async fn test_prompt_methods_render_single_user_message() {
        let mcp = server_for("http://127.0.0.1:9/api");

        let messages = mcp
            .analyze_failures(Parameters(AnalyzeFailuresArgs {
                workflow_name: Some("order".to_string()),
                hours: 3,
            }))
            .await;
        assert!(message_text(&messages).contains("last 3 hours for workflow type \"order\""));

        let messages = mcp
            .troubleshoot_workflow(Parameters(WorkflowIdArgs {
                workflow_id: "wf-1".to_string(),
            }))
            .await;
        assert!(message_text(&messages).contains("workflow wf-1"));
    }
}
