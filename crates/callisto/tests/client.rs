/*
 * client.rs
 *
 * Copyright (C) 2022-2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use callisto::config::KernelConfig;
use callisto::fixtures::dummy_frontend::DummyFrontend;
use callisto::fixtures::dummy_frontend::ExecuteRequestOptions;
use callisto::kernel;
use callisto::kernel::Kernel;
use callisto::session::Session;
use callisto::wire::comm_close::CommClose;
use callisto::wire::comm_info_request::CommInfoRequest;
use callisto::wire::comm_msg::CommWireMsg;
use callisto::wire::comm_open::CommOpen;
use callisto::wire::complete_request::CompleteRequest;
use callisto::wire::execute_request::ExecuteRequest;
use callisto::wire::history_reply::HistoryEntry;
use callisto::wire::history_request::HistAccessType;
use callisto::wire::history_request::HistoryRequest;
use callisto::wire::inspect_request::InspectRequest;
use callisto::wire::interrupt_request::InterruptRequest;
use callisto::wire::is_complete_reply::IsComplete;
use callisto::wire::is_complete_request::IsCompleteRequest;
use callisto::wire::jupyter_message::Message;
use callisto::wire::jupyter_message::Status;
use callisto::wire::kernel_info_request::KernelInfoRequest;
use callisto::wire::shutdown_request::ShutdownRequest;
use serde_json::json;

mod interpreter;

use interpreter::TestInterpreter;

fn start_kernel() -> (DummyFrontend, Kernel) {
    start_kernel_with(TestInterpreter::new(), KernelConfig::default())
}

fn start_kernel_with(interpreter: TestInterpreter, config: KernelConfig) -> (DummyFrontend, Kernel) {
    let _ = env_logger::builder().is_test(true).try_init();

    let frontend = DummyFrontend::new();
    let kernel = kernel::connect(frontend.connection_file(), config, Arc::new(interpreter)).unwrap();

    frontend.recv_iopub_starting();
    frontend.recv_iopub_idle();
    (frontend, kernel)
}

fn history_request(hist_access_type: HistAccessType) -> HistoryRequest {
    HistoryRequest {
        output: false,
        raw: true,
        hist_access_type,
        session: 0,
        start: None,
        stop: None,
        n: None,
        pattern: None,
        unique: false,
    }
}

/// Runs `code` and consumes everything it broadcasts, which must be a
/// plain result. Returns the execution count.
fn execute_for_result(frontend: &DummyFrontend, code: &str, expected: &str) -> u32 {
    frontend.send_execute_request(code, ExecuteRequestOptions::default());
    frontend.recv_iopub_busy();
    let input = frontend.recv_iopub_execute_input();
    assert_eq!(input.code, code);
    assert_eq!(frontend.recv_iopub_execute_result(), expected);
    frontend.recv_iopub_idle();

    let count = frontend.recv_shell_execute_reply();
    assert_eq!(count, input.execution_count);
    count
}

/// Consumes the broadcasts and reply of an execution that fails with the
/// given exception name.
fn expect_execution_error(frontend: &DummyFrontend, ename: &str) {
    let error = frontend.recv_iopub_execute_error();
    assert_eq!(error.ename, ename);
    frontend.recv_iopub_idle();
    assert_eq!(frontend.recv_shell_execute_reply_exception().ename, ename);
}

#[test]
fn test_kernel_info() {
    let (frontend, _kernel) = start_kernel();

    let id = frontend.send_shell(KernelInfoRequest {});
    assert_matches!(frontend.recv_shell(), Message::KernelInfoReply(reply) => {
        assert_eq!(reply.parent_header.unwrap().msg_id, id);
        assert_eq!(reply.content.status, Status::Ok);
        assert_eq!(reply.content.protocol_version, "5.3");
        assert_eq!(reply.content.language_info.name, "Test");
        assert_eq!(reply.content.implementation, "test");
    });

    // Only execute requests change the kernel status
    frontend.assert_nothing_within(&frontend.iopub_socket, 200);
    frontend.assert_no_incoming();
}

#[test]
fn test_execute_result() {
    let (frontend, _kernel) = start_kernel();

    let id = frontend.send_execute_request("6*7", ExecuteRequestOptions::default());

    assert_matches!(frontend.recv_iopub(), Message::Status(status) => {
        assert_eq!(status.parent_header.unwrap().msg_id, id);
    });
    let input = frontend.recv_iopub_execute_input();
    assert_eq!(input.code, "6*7");
    assert_eq!(input.execution_count, 1);
    assert_eq!(frontend.recv_iopub_execute_result(), "42");
    frontend.recv_iopub_idle();

    assert_matches!(frontend.recv_shell(), Message::ExecuteReply(reply) => {
        assert_eq!(reply.parent_header.unwrap().msg_id, id);
        assert_eq!(reply.content.status, Status::Ok);
        assert_eq!(reply.content.execution_count, 1);
    });

    frontend.assert_no_incoming();
}

#[test]
fn test_execute_error_with_stream() {
    let (frontend, _kernel) = start_kernel();

    frontend.send_execute_request("error", ExecuteRequestOptions::default());
    frontend.recv_iopub_busy();
    assert_eq!(frontend.recv_iopub_execute_input().execution_count, 1);
    assert_eq!(frontend.recv_iopub_stream_stderr(), "about to fail\n");

    let error = frontend.recv_iopub_execute_error();
    assert_eq!(error.ename, "TestError");
    assert_eq!(error.evalue, "Some kind of error occurred");
    assert_eq!(error.traceback, vec!["Frame1", "Frame2"]);
    frontend.recv_iopub_idle();

    let exception = frontend.recv_shell_execute_reply_exception();
    assert_eq!(exception, error);

    // Failed executions still consume a count
    assert_eq!(execute_for_result(&frontend, "1*1", "1"), 2);
    frontend.assert_no_incoming();
}

#[test]
fn test_execution_counts_follow_submission_order() {
    let (frontend, _kernel) = start_kernel();

    let codes = ["first", "second", "third"];
    for code in codes {
        frontend.send_execute_request(code, ExecuteRequestOptions::default());
    }

    for (i, code) in codes.iter().enumerate() {
        let count = i as u32 + 1;
        frontend.recv_iopub_busy();
        let input = frontend.recv_iopub_execute_input();
        assert_eq!(input.code, *code);
        assert_eq!(input.execution_count, count);
        assert_eq!(frontend.recv_iopub_execute_result(), *code);
        frontend.recv_iopub_idle();
    }

    for i in 1..=codes.len() {
        assert_eq!(frontend.recv_shell_execute_reply(), i as u32);
    }

    frontend.assert_no_incoming();
}

#[test]
fn test_silent_execution() {
    let (frontend, _kernel) = start_kernel();

    frontend.send_execute_request("6*7", ExecuteRequestOptions {
        silent: true,
        ..Default::default()
    });
    frontend.recv_iopub_busy();
    frontend.recv_iopub_idle();
    assert_eq!(frontend.recv_shell_execute_reply(), 0);

    // Output produced by the code itself is still published
    frontend.send_execute_request("hello", ExecuteRequestOptions::default());
    frontend.recv_iopub_busy();
    assert_eq!(frontend.recv_iopub_execute_input().execution_count, 1);
    assert_eq!(frontend.recv_iopub_stream_stdout(), "hello\n");
    frontend.recv_iopub_idle();
    assert_eq!(frontend.recv_shell_execute_reply(), 1);

    frontend.assert_no_incoming();
}

#[test]
fn test_bad_signature_is_rejected() {
    let (frontend, _kernel) = start_kernel();

    let impostor = Session::create("hmac-sha256", "not-the-key").unwrap();
    frontend.send_shell_signed_with(
        ExecuteRequest {
            code: String::from("6*7"),
            silent: false,
            store_history: true,
            user_expressions: json!({}),
            allow_stdin: false,
            stop_on_error: false,
        },
        &impostor,
    );

    // No reply, no status change, no count consumed
    frontend.assert_nothing_within(&frontend.shell_socket, 300);
    frontend.assert_nothing_within(&frontend.iopub_socket, 0);

    assert_eq!(execute_for_result(&frontend, "6*7", "42"), 1);
    frontend.assert_no_incoming();
}

#[test]
fn test_interrupt() {
    let (frontend, _kernel) = start_kernel();

    frontend.send_execute_request("sleep", ExecuteRequestOptions::default());
    frontend.recv_iopub_busy();
    frontend.recv_iopub_execute_input();

    frontend.send_control(InterruptRequest {});
    assert_matches!(frontend.recv_control(), Message::InterruptReply(reply) => {
        assert_eq!(reply.content.status, Status::Ok);
    });

    expect_execution_error(&frontend, "KeyboardInterrupt");

    // The kernel keeps serving requests
    assert_eq!(execute_for_result(&frontend, "2*3", "6"), 2);
    frontend.assert_no_incoming();
}

#[test]
fn test_interrupt_as_soon_as_busy() {
    let (frontend, _kernel) = start_kernel();

    frontend.send_execute_request("sleep", ExecuteRequestOptions::default());
    frontend.recv_iopub_busy();

    // The execution is interruptible from the moment the kernel reports busy
    frontend.send_control(InterruptRequest {});
    assert_matches!(frontend.recv_control(), Message::InterruptReply(reply) => {
        assert_eq!(reply.content.status, Status::Ok);
    });

    frontend.recv_iopub_execute_input();
    expect_execution_error(&frontend, "KeyboardInterrupt");
    frontend.assert_no_incoming();
}

#[test]
fn test_interrupt_while_idle() {
    let (frontend, _kernel) = start_kernel();

    frontend.send_control(InterruptRequest {});
    assert_matches!(frontend.recv_control(), Message::InterruptReply(reply) => {
        assert_eq!(reply.content.status, Status::Ok);
    });

    assert_eq!(execute_for_result(&frontend, "2*3", "6"), 1);
    frontend.assert_no_incoming();
}

#[test]
fn test_introspection_while_busy() {
    let (frontend, _kernel) = start_kernel();

    frontend.send_execute_request("sleep", ExecuteRequestOptions::default());
    frontend.recv_iopub_busy();
    frontend.recv_iopub_execute_input();

    frontend.send_shell(CompleteRequest {
        code: String::from("pri"),
        cursor_pos: 3,
    });
    assert_matches!(frontend.recv_shell(), Message::CompleteReply(reply) => {
        assert_eq!(reply.content.matches, vec!["print", "println"]);
        assert_eq!(reply.content.cursor_start, 0);
        assert_eq!(reply.content.cursor_end, 3);
    });

    frontend.send_shell(InspectRequest {
        code: String::from("print"),
        cursor_pos: 5,
        detail_level: 0,
    });
    assert_matches!(frontend.recv_shell(), Message::InspectReply(reply) => {
        assert!(reply.content.found);
    });

    frontend.send_control(InterruptRequest {});
    frontend.recv_control();
    expect_execution_error(&frontend, "KeyboardInterrupt");
    frontend.assert_no_incoming();
}

#[test]
fn test_serialized_introspection_waits_for_execution() {
    let (frontend, _kernel) =
        start_kernel_with(TestInterpreter::serialized(), KernelConfig::default());

    frontend.send_execute_request("sleep", ExecuteRequestOptions::default());
    frontend.recv_iopub_busy();
    frontend.recv_iopub_execute_input();

    frontend.send_shell(CompleteRequest {
        code: String::from("pri"),
        cursor_pos: 3,
    });
    frontend.assert_nothing_within(&frontend.shell_socket, 300);

    frontend.send_control(InterruptRequest {});
    frontend.recv_control();
    assert_eq!(frontend.recv_iopub_execute_error().ename, "KeyboardInterrupt");
    frontend.recv_iopub_idle();

    // Both replies arrive once the execution is over, in either order
    let mut replies = vec![frontend.recv_shell(), frontend.recv_shell()];
    replies.sort_by_key(|msg| !matches!(msg, Message::CompleteReply(_)));
    assert_matches!(&replies[0], Message::CompleteReply(_));
    assert_matches!(&replies[1], Message::ExecuteReplyException(_));

    frontend.assert_no_incoming();
}

#[test]
fn test_is_complete() {
    let (frontend, _kernel) = start_kernel();

    frontend.send_shell(IsCompleteRequest {
        code: String::from("for x in y:"),
    });
    assert_matches!(frontend.recv_shell(), Message::IsCompleteReply(reply) => {
        assert_eq!(reply.content.status, IsComplete::Incomplete);
        assert_eq!(reply.content.indent, "    ");
    });

    // Handler failures come back as error replies of the same type
    let id = frontend.send_shell(IsCompleteRequest {
        code: String::from("invalid"),
    });
    let reply = frontend.recv_wire(&frontend.shell_socket);
    assert_eq!(reply.header.msg_type, "is_complete_reply");
    assert_eq!(reply.parent_header.unwrap().msg_id, id);
    assert_eq!(reply.content["status"], "error");
    assert_eq!(reply.content["ename"], "SyntaxError");

    frontend.assert_no_incoming();
}

#[test]
fn test_unknown_request_type() {
    let (frontend, _kernel) = start_kernel();

    let id = frontend.send_shell_wire("frobnicate_request", json!({}));
    let reply = frontend.recv_wire(&frontend.shell_socket);
    assert_eq!(reply.header.msg_type, "frobnicate_reply");
    assert_eq!(reply.parent_header.unwrap().msg_id, id);
    assert_eq!(reply.content["status"], "error");
    assert_eq!(reply.content["ename"], "UnknownRequestType");

    // Unknown messages that are not requests are dropped
    frontend.send_shell_wire("frobnicate_notification", json!({}));
    frontend.assert_nothing_within(&frontend.shell_socket, 200);

    frontend.assert_no_incoming();
}

#[test]
fn test_execute_refused_on_control() {
    let (frontend, _kernel) = start_kernel();

    frontend.send_control(ExecuteRequest {
        code: String::from("6*7"),
        silent: false,
        store_history: true,
        user_expressions: json!({}),
        allow_stdin: false,
        stop_on_error: false,
    });
    let reply = frontend.recv_wire(&frontend.control_socket);
    assert_eq!(reply.header.msg_type, "execute_reply");
    assert_eq!(reply.content["status"], "error");

    // Nothing ran
    assert_eq!(execute_for_result(&frontend, "6*7", "42"), 1);
    frontend.assert_no_incoming();
}

#[test]
fn test_history() {
    let (frontend, _kernel) = start_kernel();

    execute_for_result(&frontend, "1*2", "2");
    execute_for_result(&frontend, "echo", "echo");
    execute_for_result(&frontend, "2*2", "4");

    frontend.send_shell(HistoryRequest {
        n: Some(2),
        ..history_request(HistAccessType::Tail)
    });
    assert_matches!(frontend.recv_shell(), Message::HistoryReply(reply) => {
        assert_eq!(reply.content.history, vec![
            HistoryEntry(0, 2, String::from("echo")),
            HistoryEntry(0, 3, String::from("2*2")),
        ]);
    });

    frontend.send_shell(HistoryRequest {
        pattern: Some(String::from("?*2")),
        ..history_request(HistAccessType::Search)
    });
    assert_matches!(frontend.recv_shell(), Message::HistoryReply(reply) => {
        let inputs: Vec<String> = reply.content.history.into_iter().map(|entry| entry.2).collect();
        assert_eq!(inputs, vec!["1*2", "2*2"]);
    });

    frontend.send_shell(HistoryRequest {
        start: Some(1),
        stop: Some(2),
        ..history_request(HistAccessType::Range)
    });
    assert_matches!(frontend.recv_shell(), Message::HistoryReply(reply) => {
        assert_eq!(reply.content.history, vec![HistoryEntry(0, 1, String::from("1*2"))]);
    });

    frontend.assert_no_incoming();
}

#[test]
fn test_heartbeat_while_busy() {
    let (frontend, _kernel) = start_kernel();

    frontend.send_heartbeat(zmq::Message::from("ping"));
    assert_eq!(&frontend.recv_heartbeat()[..], b"ping");

    frontend.send_execute_request("sleep", ExecuteRequestOptions::default());
    frontend.recv_iopub_busy();
    frontend.recv_iopub_execute_input();

    frontend.send_heartbeat(zmq::Message::from("still there?"));
    assert_eq!(&frontend.recv_heartbeat()[..], b"still there?");

    frontend.send_control(InterruptRequest {});
    frontend.recv_control();
    expect_execution_error(&frontend, "KeyboardInterrupt");
    frontend.assert_no_incoming();
}

#[test]
fn test_input_request() {
    let (frontend, _kernel) = start_kernel();

    frontend.send_execute_request("prompt", ExecuteRequestOptions {
        allow_stdin: true,
        ..Default::default()
    });
    frontend.recv_iopub_busy();
    frontend.recv_iopub_execute_input();

    let request = frontend.recv_stdin_input_request();
    assert_eq!(request.prompt, "name? ");
    assert!(!request.password);
    frontend.send_stdin_input_reply("callisto");

    assert_eq!(frontend.recv_iopub_stream_stdout(), "hello callisto\n");
    frontend.recv_iopub_idle();
    assert_eq!(frontend.recv_shell_execute_reply(), 1);
    frontend.assert_no_incoming();
}

#[test]
fn test_input_refused_without_stdin() {
    let (frontend, _kernel) = start_kernel();

    frontend.send_execute_request("prompt", ExecuteRequestOptions::default());
    frontend.recv_iopub_busy();
    frontend.recv_iopub_execute_input();
    expect_execution_error(&frontend, "TestError");

    frontend.assert_nothing_within(&frontend.stdin_socket, 0);
    frontend.assert_no_incoming();
}

#[test]
fn test_stdin_allowed_by_default() {
    let (frontend, _kernel) = start_kernel();

    // A request that leaves out `allow_stdin` may still prompt
    frontend.send_shell_wire("execute_request", json!({ "code": "prompt" }));
    frontend.recv_iopub_busy();
    frontend.recv_iopub_execute_input();

    assert_eq!(frontend.recv_stdin_input_request().prompt, "name? ");
    frontend.send_stdin_input_reply("callisto");

    assert_eq!(frontend.recv_iopub_stream_stdout(), "hello callisto\n");
    frontend.recv_iopub_idle();
    assert_eq!(frontend.recv_shell_execute_reply(), 1);
    frontend.assert_no_incoming();
}

#[test]
fn test_interrupt_pending_input() {
    let (frontend, _kernel) = start_kernel();

    frontend.send_execute_request("prompt", ExecuteRequestOptions {
        allow_stdin: true,
        ..Default::default()
    });
    frontend.recv_iopub_busy();
    frontend.recv_iopub_execute_input();
    frontend.recv_stdin_input_request();

    frontend.send_control(InterruptRequest {});
    frontend.recv_control();
    expect_execution_error(&frontend, "KeyboardInterrupt");
    frontend.assert_no_incoming();
}

#[test]
fn test_stop_on_error_aborts_queue() {
    let (frontend, _kernel) = start_kernel();

    frontend.send_execute_request("slow_error", ExecuteRequestOptions {
        stop_on_error: true,
        ..Default::default()
    });
    let queued = frontend.send_execute_request("6*7", ExecuteRequestOptions::default());

    frontend.recv_iopub_busy();
    assert_eq!(frontend.recv_iopub_execute_input().execution_count, 1);
    expect_execution_error(&frontend, "TestError");

    // The queued request is answered without running
    frontend.recv_iopub_busy();
    frontend.recv_iopub_idle();
    assert_matches!(frontend.recv_shell(), Message::ExecuteReply(reply) => {
        assert_eq!(reply.parent_header.unwrap().msg_id, queued);
        assert_eq!(reply.content.status, Status::Aborted);
        assert_eq!(reply.content.execution_count, 1);
    });

    // Requests sent afterwards run again
    assert_eq!(execute_for_result(&frontend, "6*7", "42"), 2);
    frontend.assert_no_incoming();
}

#[test]
fn test_silent_error_does_not_abort_queue() {
    let (frontend, _kernel) = start_kernel();

    frontend.send_execute_request("slow_error", ExecuteRequestOptions {
        silent: true,
        stop_on_error: true,
        ..Default::default()
    });
    let queued = frontend.send_execute_request("6*7", ExecuteRequestOptions::default());

    frontend.recv_iopub_busy();
    expect_execution_error(&frontend, "TestError");

    // The queued request runs as usual
    frontend.recv_iopub_busy();
    assert_eq!(frontend.recv_iopub_execute_input().execution_count, 1);
    assert_eq!(frontend.recv_iopub_execute_result(), "42");
    frontend.recv_iopub_idle();
    assert_matches!(frontend.recv_shell(), Message::ExecuteReply(reply) => {
        assert_eq!(reply.parent_header.unwrap().msg_id, queued);
        assert_eq!(reply.content.status, Status::Ok);
        assert_eq!(reply.content.execution_count, 1);
    });
    frontend.assert_no_incoming();
}

#[test]
fn test_panic_becomes_internal_error() {
    let (frontend, _kernel) = start_kernel();

    frontend.send_execute_request("panic", ExecuteRequestOptions::default());
    frontend.recv_iopub_busy();
    frontend.recv_iopub_execute_input();

    let error = frontend.recv_iopub_execute_error();
    assert_eq!(error.ename, "InternalError");
    assert!(error.evalue.contains("Interpreter exploded"));
    frontend.recv_iopub_idle();
    assert_eq!(
        frontend.recv_shell_execute_reply_exception().ename,
        "InternalError"
    );

    assert_eq!(execute_for_result(&frontend, "6*7", "42"), 2);
    frontend.assert_no_incoming();
}

#[test]
fn test_execution_timeout() {
    let config = KernelConfig {
        execution_timeout: Some(Duration::from_millis(200)),
        ..Default::default()
    };
    let (frontend, _kernel) = start_kernel_with(TestInterpreter::new(), config);

    frontend.send_execute_request("sleep", ExecuteRequestOptions::default());
    frontend.recv_iopub_busy();
    frontend.recv_iopub_execute_input();
    expect_execution_error(&frontend, "TimeoutError");

    // Executions finishing in time are unaffected
    assert_eq!(execute_for_result(&frontend, "6*7", "42"), 2);
    frontend.assert_no_incoming();
}

#[test]
fn test_comms() {
    let (frontend, _kernel) = start_kernel();

    frontend.send_shell(CommInfoRequest { target_name: None });
    assert_matches!(frontend.recv_shell(), Message::CommInfoReply(reply) => {
        assert_eq!(reply.content.status, Status::Ok);
        assert!(reply.content.comms.is_empty());
    });

    // Comms opened for an unknown target are closed right away
    let id = frontend.send_shell(CommOpen {
        comm_id: String::from("comm-1"),
        target_name: String::from("plots"),
        data: json!({}),
    });
    assert_matches!(frontend.recv_iopub(), Message::CommClose(close) => {
        assert_eq!(close.parent_header.unwrap().msg_id, id);
        assert_eq!(close.content.comm_id, "comm-1");
    });

    frontend.assert_no_incoming();
}

#[test]
fn test_comm_round_trip() {
    let (frontend, _kernel) = start_kernel();

    frontend.send_shell(CommOpen {
        comm_id: String::from("echo-1"),
        target_name: String::from("echo"),
        data: json!({}),
    });

    frontend.send_shell(CommInfoRequest {
        target_name: Some(String::from("echo")),
    });
    assert_matches!(frontend.recv_shell(), Message::CommInfoReply(reply) => {
        assert_eq!(reply.content.comms.len(), 1);
        assert_eq!(reply.content.comms.get("echo-1"), Some(&json!({ "target_name": "echo" })));
    });

    let id = frontend.send_shell(CommWireMsg {
        comm_id: String::from("echo-1"),
        data: json!({ "x": 1 }),
    });
    assert_matches!(frontend.recv_iopub(), Message::CommMsg(msg) => {
        assert_eq!(msg.parent_header.unwrap().msg_id, id);
        assert_eq!(msg.content.comm_id, "echo-1");
        assert_eq!(msg.content.data, json!({ "echo": { "x": 1 } }));
    });

    frontend.send_shell(CommClose {
        comm_id: String::from("echo-1"),
        data: json!({}),
    });
    frontend.send_shell(CommInfoRequest { target_name: None });
    assert_matches!(frontend.recv_shell(), Message::CommInfoReply(reply) => {
        assert!(reply.content.comms.is_empty());
    });

    // A target may refuse a comm, which is then closed
    let id = frontend.send_shell(CommOpen {
        comm_id: String::from("echo-2"),
        target_name: String::from("echo"),
        data: json!({ "refuse": true }),
    });
    assert_matches!(frontend.recv_iopub(), Message::CommClose(close) => {
        assert_eq!(close.parent_header.unwrap().msg_id, id);
        assert_eq!(close.content.comm_id, "echo-2");
    });

    frontend.assert_no_incoming();
}

#[test]
fn test_shutdown() {
    let (frontend, kernel) = start_kernel();

    frontend.send_control(ShutdownRequest { restart: true });
    assert_matches!(frontend.recv_control(), Message::ShutdownReply(reply) => {
        assert_eq!(reply.content.status, Status::Ok);
        assert!(reply.content.restart);
    });

    let request = kernel.wait_for_shutdown().unwrap();
    assert!(request.restart);
}

#[test]
fn test_shutdown_drops_queued_executions() {
    let (frontend, kernel) = start_kernel();

    frontend.send_execute_request("sleep", ExecuteRequestOptions::default());
    frontend.recv_iopub_busy();
    frontend.recv_iopub_execute_input();
    frontend.send_execute_request("6*7", ExecuteRequestOptions::default());

    frontend.send_control(ShutdownRequest { restart: false });

    // The running execution is interrupted and still answered
    expect_execution_error(&frontend, "KeyboardInterrupt");
    assert_matches!(frontend.recv_control(), Message::ShutdownReply(reply) => {
        assert_eq!(reply.content.status, Status::Ok);
        assert!(!reply.content.restart);
    });
    assert!(!kernel.wait_for_shutdown().unwrap().restart);

    // The queued request never runs
    frontend.assert_nothing_within(&frontend.iopub_socket, 500);
    frontend.assert_nothing_within(&frontend.shell_socket, 500);
}

#[test]
fn test_nothing_answered_after_shutdown() {
    let (frontend, kernel) = start_kernel();

    frontend.send_control(ShutdownRequest { restart: false });
    assert_matches!(frontend.recv_control(), Message::ShutdownReply(_));
    kernel.wait_for_shutdown().unwrap();

    frontend.send_shell(KernelInfoRequest {});
    frontend.send_execute_request("6*7", ExecuteRequestOptions::default());
    frontend.send_control(InterruptRequest {});

    frontend.assert_nothing_within(&frontend.shell_socket, 500);
    frontend.assert_nothing_within(&frontend.control_socket, 200);
    frontend.assert_nothing_within(&frontend.iopub_socket, 200);
}
