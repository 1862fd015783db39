/*
 * interpreter.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use async_trait::async_trait;
use callisto::language::execution_context::ExecutionContext;
use callisto::language::interpreter::ExecuteFailure;
use callisto::language::interpreter::ExecuteOutcome;
use callisto::language::interpreter::Interpreter;
use callisto::wire::complete_reply::CompleteReply;
use callisto::wire::complete_request::CompleteRequest;
use callisto::wire::exception::Exception;
use callisto::wire::execute_request::ExecuteRequest;
use callisto::wire::help_link::HelpLink;
use callisto::wire::inspect_reply::InspectReply;
use callisto::wire::inspect_request::InspectRequest;
use callisto::wire::is_complete_reply::IsComplete;
use callisto::wire::is_complete_reply::IsCompleteReply;
use callisto::wire::is_complete_request::IsCompleteRequest;
use callisto::wire::jupyter_message::Status;
use callisto::wire::kernel_info_reply::KernelInfo;
use callisto::wire::language_info::LanguageInfo;
use log::info;
use serde_json::json;

/// "Executes" code by echoing it back as the result.
#[derive(Default)]
pub struct EchoInterpreter {}

impl EchoInterpreter {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl Interpreter for EchoInterpreter {
    async fn kernel_info(&self) -> callisto::Result<KernelInfo> {
        Ok(KernelInfo {
            implementation: String::from("echo"),
            implementation_version: String::from(env!("CARGO_PKG_VERSION")),
            language_info: LanguageInfo {
                name: String::from("Echo"),
                version: String::from("1.0"),
                mimetype: String::from("text/echo"),
                file_extension: String::from(".ech"),
                pygments_lexer: None,
                codemirror_mode: None,
                nbconvert_exporter: None,
            },
            banner: format!("Callisto Echo {}", env!("CARGO_PKG_VERSION")),
            debugger: false,
            help_links: vec![HelpLink {
                text: String::from("Jupyter messaging"),
                url: String::from("https://jupyter-client.readthedocs.io/en/stable/messaging.html"),
            }],
        })
    }

    async fn execute(
        &self,
        req: &ExecuteRequest,
        context: &ExecutionContext,
    ) -> Result<ExecuteOutcome, ExecuteFailure> {
        match req.code.as_str() {
            // Keyword: "hello, world"
            //
            // Writes to stdout instead of producing a result
            "hello, world" => {
                context.stdout("Hello, world!\n");
                Ok(ExecuteOutcome::empty())
            },

            // Keyword: "error"
            //
            // Create an artificial error
            "error" => {
                context.stderr("An error is about to occur\n");
                Err(ExecuteFailure::Error(Exception {
                    ename: String::from("Generic Error"),
                    evalue: String::from("Some kind of error occurred. No idea which."),
                    traceback: vec![
                        String::from("Frame1"),
                        String::from("Frame2"),
                        String::from("Frame3"),
                    ],
                }))
            },

            // Keyword: "prompt"
            //
            // Asks the frontend for input and echoes it
            "prompt" => match context.input("Echo> ", false) {
                Ok(value) => Ok(ExecuteOutcome::with_result(json!({ "text/plain": value }))),
                Err(callisto::Error::InputInterrupted) => Err(ExecuteFailure::Interrupted),
                Err(err) => Err(ExecuteFailure::Error(Exception::internal_error(format!(
                    "{err}"
                )))),
            },

            code => Ok(ExecuteOutcome::with_result(json!({ "text/plain": code }))),
        }
    }

    async fn complete(&self, _req: &CompleteRequest) -> callisto::Result<CompleteReply> {
        Ok(CompleteReply {
            status: Status::Ok,
            matches: vec![String::from("a.echo1"), String::from("a.echo2")],
            cursor_start: 2,
            cursor_end: 6,
            metadata: json!({}),
        })
    }

    async fn inspect(&self, req: &InspectRequest) -> callisto::Result<InspectReply> {
        Ok(InspectReply {
            status: Status::Ok,
            found: true,
            data: json!({ "text/plain": format!("echo: {}", req.code) }),
            metadata: json!({}),
        })
    }

    /// The code's completeness is whatever the code says it is.
    async fn is_complete(&self, req: &IsCompleteRequest) -> callisto::Result<IsCompleteReply> {
        let (status, indent) = match req.code.as_str() {
            "incomplete" => (IsComplete::Incomplete, String::from("   ")),
            "invalid" => (IsComplete::Invalid, String::new()),
            "unknown" => (IsComplete::Unknown, String::new()),
            _ => (IsComplete::Complete, String::new()),
        };
        Ok(IsCompleteReply { status, indent })
    }

    async fn shutdown(&self, restart: bool) -> callisto::Result<()> {
        info!("Echo kernel shutting down (restart = {restart})");
        Ok(())
    }
}
