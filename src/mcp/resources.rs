//! Read-only `conductor://` resources, each backed by one GET request.

use super::ConductorMcpServer;
use rmcp::{model::*, ErrorData as McpError};

/// A fixed resource URI and the API path that serves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConductorResource {
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub path: &'static str,
}

pub const RESOURCES: &[ConductorResource] = &[
    ConductorResource {
        uri: "conductor://workflows/definitions",
        name: "workflow_definitions",
        description: "All registered workflow definitions: names, versions, descriptions and task configuration.",
        path: "metadata/workflow?short=false&metadata=true",
    },
    ConductorResource {
        uri: "conductor://tasks/definitions",
        name: "task_definitions",
        description: "All registered task definitions: names, descriptions, retry policies and timeouts.",
        path: "metadata/taskdefs?access=READ&metadata=false",
    },
    ConductorResource {
        uri: "conductor://workflows/running",
        name: "running_workflows",
        description: "Workflow executions currently in RUNNING status.",
        path: "workflow/search?query=status%3D%22RUNNING%22",
    },
    ConductorResource {
        uri: "conductor://workflows/failed",
        name: "failed_workflows",
        description: "Recently failed workflow executions with their failure reasons.",
        path: "workflow/search?query=status%3D%22FAILED%22",
    },
    ConductorResource {
        uri: "conductor://workflows/paused",
        name: "paused_workflows",
        description: "Workflow executions currently in PAUSED status.",
        path: "workflow/search?query=status%3D%22PAUSED%22",
    },
    ConductorResource {
        uri: "conductor://tasks/queue",
        name: "task_queues",
        description: "Pending task count for every task queue.",
        path: "tasks/queue/all",
    },
];

pub fn find(uri: &str) -> Option<&'static ConductorResource> {
    RESOURCES.iter().find(|r| r.uri == uri)
}

/// Resource listing advertised to clients.
pub fn list() -> Vec<Resource> {
    RESOURCES
        .iter()
        .map(|r| {
            let mut raw = RawResource::new(r.uri, r.name);
            raw.description = Some(r.description.to_string());
            raw.mime_type = Some("text".to_string());
            raw.no_annotation()
        })
        .collect()
}

impl ConductorMcpServer {
    pub(crate) async fn read_conductor_resource(
        &self,
        uri: &str,
    ) -> Result<ReadResourceResult, McpError> {
        let resource = find(uri).ok_or_else(|| {
            McpError::resource_not_found(format!("Unknown resource: {}", uri), None)
        })?;
        let text = self.api_get(resource.path).await?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }
}
