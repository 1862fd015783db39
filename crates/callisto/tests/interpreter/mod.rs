/*
 * mod.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use callisto::comm::comm_manager::CommManager;
use callisto::comm::comm_socket::CommMsg;
use callisto::comm::comm_socket::CommSocket;
use callisto::language::execution_context::ExecutionContext;
use callisto::language::interpreter::ExecuteFailure;
use callisto::language::interpreter::ExecuteOutcome;
use callisto::language::interpreter::Interpreter;
use callisto::wire::complete_reply::CompleteReply;
use callisto::wire::complete_request::CompleteRequest;
use callisto::wire::exception::Exception;
use callisto::wire::execute_request::ExecuteRequest;
use callisto::wire::inspect_reply::InspectReply;
use callisto::wire::inspect_request::InspectRequest;
use callisto::wire::is_complete_reply::IsComplete;
use callisto::wire::is_complete_reply::IsCompleteReply;
use callisto::wire::is_complete_request::IsCompleteRequest;
use callisto::wire::jupyter_message::Status;
use callisto::wire::kernel_info_reply::KernelInfo;
use callisto::wire::language_info::LanguageInfo;
use callisto::Error;
use serde_json::json;
use serde_json::Value;

const KEYWORDS: [&str; 2] = ["print", "println"];

/// Stub interpreter for the test harness. Keywords trigger the behaviors
/// under test; any other code is echoed back as the result.
pub struct TestInterpreter {
    concurrent_introspection: bool,
}

impl TestInterpreter {
    pub fn new() -> Self {
        Self {
            concurrent_introspection: true,
        }
    }

    /// An interpreter whose introspection waits for running executions
    pub fn serialized() -> Self {
        Self {
            concurrent_introspection: false,
        }
    }
}

fn test_error(evalue: &str) -> ExecuteFailure {
    ExecuteFailure::Error(Exception {
        ename: String::from("TestError"),
        evalue: String::from(evalue),
        traceback: vec![String::from("Frame1"), String::from("Frame2")],
    })
}

/// Comm target "echo": every message is sent back wrapped in `{"echo": ...}`.
/// Opening with `{"refuse": true}` is rejected.
fn open_echo_comm(comm: CommSocket, data: &Value) -> callisto::Result<()> {
    if data.get("refuse").is_some() {
        return Err(callisto::anyhow!("Echo comm refused"));
    }
    thread::spawn(move || {
        for msg in comm.incoming_rx.iter() {
            match msg {
                CommMsg::Data(data) => {
                    let _ = comm.send(json!({ "echo": data }));
                },
                CommMsg::Close(_) => break,
            }
        }
    });
    Ok(())
}

/// Evaluates `a*b` for integers
fn product(code: &str) -> Option<i64> {
    let (lhs, rhs) = code.split_once('*')?;
    let lhs: i64 = lhs.trim().parse().ok()?;
    let rhs: i64 = rhs.trim().parse().ok()?;
    Some(lhs * rhs)
}

#[async_trait]
impl Interpreter for TestInterpreter {
    async fn kernel_info(&self) -> callisto::Result<KernelInfo> {
        Ok(KernelInfo {
            implementation: String::from("test"),
            implementation_version: String::from("1.0"),
            language_info: LanguageInfo {
                name: String::from("Test"),
                version: String::from("1.0"),
                mimetype: String::from("text/x-test"),
                file_extension: String::from(".test"),
                pygments_lexer: None,
                codemirror_mode: None,
                nbconvert_exporter: None,
            },
            banner: String::from("Callisto Test"),
            debugger: false,
            help_links: Vec::new(),
        })
    }

    async fn execute(
        &self,
        req: &ExecuteRequest,
        context: &ExecutionContext,
    ) -> Result<ExecuteOutcome, ExecuteFailure> {
        match req.code.as_str() {
            "hello" => {
                context.stdout("hello\n");
                Ok(ExecuteOutcome::empty())
            },
            "error" => {
                context.stderr("about to fail\n");
                Err(test_error("Some kind of error occurred"))
            },
            "slow_error" => {
                thread::sleep(Duration::from_millis(200));
                Err(test_error("Slow error"))
            },
            "sleep" => loop {
                if context.is_cancelled() {
                    return Err(ExecuteFailure::Interrupted);
                }
                thread::sleep(Duration::from_millis(10));
            },
            "prompt" => {
                let name = match context.input("name? ", false) {
                    Ok(name) => name,
                    Err(Error::InputInterrupted) => return Err(ExecuteFailure::Interrupted),
                    Err(err) => return Err(test_error(&format!("{err}"))),
                };
                context.stdout(&format!("hello {name}\n"));
                Ok(ExecuteOutcome::empty())
            },
            "panic" => panic!("Interpreter exploded"),
            code => {
                let value = match product(code) {
                    Some(value) => value.to_string(),
                    None => String::from(code),
                };
                Ok(ExecuteOutcome::with_result(json!({ "text/plain": value })))
            },
        }
    }

    async fn complete(&self, req: &CompleteRequest) -> callisto::Result<CompleteReply> {
        let prefix: String = req.code.chars().take(req.cursor_pos as usize).collect();
        let matches = KEYWORDS
            .iter()
            .filter(|keyword| keyword.starts_with(prefix.as_str()))
            .map(|keyword| String::from(*keyword))
            .collect();

        Ok(CompleteReply {
            status: Status::Ok,
            matches,
            cursor_start: 0,
            cursor_end: req.cursor_pos,
            metadata: json!({}),
        })
    }

    async fn inspect(&self, req: &InspectRequest) -> callisto::Result<InspectReply> {
        let found = KEYWORDS.contains(&req.code.as_str());
        let data = if found {
            json!({ "text/plain": format!("{}(x): writes x", req.code) })
        } else {
            json!({})
        };

        Ok(InspectReply {
            status: Status::Ok,
            found,
            data,
            metadata: json!({}),
        })
    }

    async fn is_complete(&self, req: &IsCompleteRequest) -> callisto::Result<IsCompleteReply> {
        if req.code == "invalid" {
            return Err(Error::ShellErrorReply(Exception {
                ename: String::from("SyntaxError"),
                evalue: String::from("invalid"),
                traceback: Vec::new(),
            }));
        }

        let (status, indent) = if req.code.ends_with(':') {
            (IsComplete::Incomplete, String::from("    "))
        } else {
            (IsComplete::Complete, String::new())
        };
        Ok(IsCompleteReply { status, indent })
    }

    fn supports_concurrent_introspection(&self) -> bool {
        self.concurrent_introspection
    }

    fn register_comm_targets(&self, comms: &Arc<CommManager>) {
        comms.register_target("echo", open_echo_comm);
    }
}
