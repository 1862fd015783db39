/*
 * interpreter.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use serde_json::Value;

use crate::comm::comm_manager::CommManager;
use crate::language::execution_context::ExecutionContext;
use crate::wire::complete_reply::CompleteReply;
use crate::wire::complete_request::CompleteRequest;
use crate::wire::exception::Exception;
use crate::wire::execute_request::ExecuteRequest;
use crate::wire::inspect_reply::InspectReply;
use crate::wire::inspect_request::InspectRequest;
use crate::wire::is_complete_reply::IsCompleteReply;
use crate::wire::is_complete_request::IsCompleteRequest;
use crate::wire::kernel_info_reply::KernelInfo;

/// What a successful execution produced
#[derive(Debug, Clone)]
pub struct ExecuteOutcome {
    /// MIME bundle published as `execute_result`; nothing is published when
    /// absent
    pub data: Option<Value>,

    /// Metadata of the `execute_result`
    pub metadata: Value,

    /// Deprecated reply payloads, passed through to the `execute_reply`
    pub payload: Vec<Value>,

    /// Results for the request's `user_expressions`
    pub user_expressions: Value,
}

impl ExecuteOutcome {
    /// An execution that produced no value.
    pub fn empty() -> Self {
        Self {
            data: None,
            metadata: json!({}),
            payload: Vec::new(),
            user_expressions: json!({}),
        }
    }

    /// An execution whose value is the given MIME bundle.
    pub fn with_result(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::empty()
        }
    }
}

/// Why an execution did not complete
#[derive(Debug, Clone)]
pub enum ExecuteFailure {
    /// The code raised; published as an `error` and answered with an error
    /// `execute_reply`
    Error(Exception),

    /// The execution observed its cancellation token and stopped
    Interrupted,
}

/// A language back end. The kernel serializes `execute` calls and hands each
/// one an [ExecutionContext] for output, input and cancellation.
///
/// Docs: https://jupyter-client.readthedocs.io/en/stable/messaging.html
#[async_trait]
pub trait Interpreter: Send + Sync {
    /// Describes the kernel for `kernel_info_request`.
    async fn kernel_info(&self) -> crate::Result<KernelInfo>;

    /// Executes code. Output is published through the context while the
    /// execution runs.
    async fn execute(
        &self,
        req: &ExecuteRequest,
        context: &ExecutionContext,
    ) -> Result<ExecuteOutcome, ExecuteFailure>;

    /// Handles a request to provide completions for the given code fragment.
    async fn complete(&self, req: &CompleteRequest) -> crate::Result<CompleteReply>;

    /// Handles a request to inspect a fragment of code.
    async fn inspect(&self, req: &InspectRequest) -> crate::Result<InspectReply>;

    /// Handles a request to test a fragment of code to see whether it is a
    /// complete expression.
    async fn is_complete(&self, req: &IsCompleteRequest) -> crate::Result<IsCompleteReply>;

    /// Whether completion, inspection and completeness checks may run while
    /// an execution is in progress. When false they wait for it to finish.
    fn supports_concurrent_introspection(&self) -> bool {
        true
    }

    /// Registers the comm targets this interpreter serves. Called once while
    /// the kernel starts, before any request is read.
    fn register_comm_targets(&self, _comms: &Arc<CommManager>) {}

    /// Called before the kernel replies to a `shutdown_request`.
    async fn shutdown(&self, _restart: bool) -> crate::Result<()> {
        Ok(())
    }
}
