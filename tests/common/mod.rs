//! Shared test helpers: scripted remote sources, static providers, handlers.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use toolmesh::context::CallContext;
use toolmesh::error::MeshError;
use toolmesh::federation::{RemoteTool, RemoteToolSource};
use toolmesh::tools::{
    handler_fn, ToolArguments, ToolDefinition, ToolHandler, ToolParameters, ToolProvider,
    ToolResponse,
};

/// Handler that always answers with `text`.
pub fn text_handler(text: &'static str) -> Arc<dyn ToolHandler> {
    handler_fn(move |_args, _ctx| async move { Ok(ToolResponse::text(text)) })
}

/// Handler that echoes the `msg` argument.
pub fn echo_handler() -> Arc<dyn ToolHandler> {
    handler_fn(|args: ToolArguments, _ctx| async move {
        Ok(ToolResponse::text(args.get_str("msg")?))
    })
}

pub fn echo_definition() -> ToolDefinition {
    ToolDefinition::new(
        "echo",
        "Echo a message back",
        ToolParameters::object()
            .string("msg", "message to echo", true)
            .build(),
    )
}

pub fn plain(name: &str) -> ToolDefinition {
    ToolDefinition::new(name, format!("{name} tool"), ToolParameters::empty())
}

pub fn names(descriptors: &[toolmesh::tools::ToolDescriptor]) -> Vec<String> {
    descriptors.iter().map(|d| d.name.clone()).collect()
}

/// Remote source whose `list_tools` answers follow a script.
///
/// Each list call pops the next planned answer; once the plan is exhausted the
/// last answer repeats. Calls are recorded as `(name, arguments)`.
pub struct ScriptedSource {
    plan: Mutex<VecDeque<Result<Vec<&'static str>, String>>>,
    last: Mutex<Result<Vec<&'static str>, String>>,
    pub calls: Mutex<Vec<(String, serde_json::Value)>>,
}

impl ScriptedSource {
    pub fn serving(tools: &[&'static str]) -> Arc<Self> {
        Self::scripted(vec![Ok(tools.to_vec())])
    }

    pub fn failing() -> Arc<Self> {
        Self::scripted(vec![Err("connection refused".to_string())])
    }

    pub fn scripted(plan: Vec<Result<Vec<&'static str>, String>>) -> Arc<Self> {
        let last = plan
            .last()
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()));
        Arc::new(Self {
            plan: Mutex::new(plan.into()),
            last: Mutex::new(last),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn recorded_calls(&self) -> Vec<(String, serde_json::Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteToolSource for ScriptedSource {
    async fn list_tools(&self) -> Result<Vec<RemoteTool>, MeshError> {
        let next = self.plan.lock().unwrap().pop_front();
        let answer = match next {
            Some(answer) => {
                *self.last.lock().unwrap() = answer.clone();
                answer
            }
            None => self.last.lock().unwrap().clone(),
        };
        match answer {
            Ok(names) => Ok(names
                .into_iter()
                .map(|name| RemoteTool::new(name).with_description(format!("remote {name}")))
                .collect()),
            Err(message) => Err(MeshError::Remote {
                endpoint: "scripted".into(),
                message,
            }),
        }
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolResponse, MeshError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        Ok(ToolResponse::text(format!("remote:{name}")))
    }

    fn describe(&self) -> String {
        "scripted".into()
    }
}

/// Provider serving fixed definitions; executing answers `provider:<name>`.
pub struct StaticProvider {
    pub label: &'static str,
    pub tools: Vec<ToolDefinition>,
}

impl StaticProvider {
    pub fn new(label: &'static str, tools: Vec<ToolDefinition>) -> Arc<Self> {
        Arc::new(Self { label, tools })
    }
}

#[async_trait]
impl ToolProvider for StaticProvider {
    async fn list_tools(&self, _ctx: &CallContext) -> Result<Vec<ToolDefinition>, MeshError> {
        Ok(self.tools.clone())
    }

    async fn execute_tool(
        &self,
        name: &str,
        args: &ToolArguments,
        _ctx: &CallContext,
    ) -> Result<ToolResponse, MeshError> {
        Ok(ToolResponse {
            content: vec![toolmesh::tools::Content::text(format!("{}:{name}", self.label))],
            structured_content: Some(json!({ "arguments": args.raw() })),
            is_error: false,
        })
    }
}

/// Provider whose listing always fails.
pub struct BrokenProvider;

#[async_trait]
impl ToolProvider for BrokenProvider {
    async fn list_tools(&self, _ctx: &CallContext) -> Result<Vec<ToolDefinition>, MeshError> {
        Err(MeshError::Internal("provider offline".into()))
    }

    async fn execute_tool(
        &self,
        name: &str,
        _args: &ToolArguments,
        _ctx: &CallContext,
    ) -> Result<ToolResponse, MeshError> {
        Err(MeshError::UnknownTool(name.to_string()))
    }
}
