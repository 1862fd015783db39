/*
 * dummy_frontend.rs
 *
 * Copyright (C) 2022-2024 Posit Software, PBC. All rights reserved.
 *
 */

use assert_matches::assert_matches;
use serde_json::json;
use serde_json::Value;

use crate::connection_file::ConnectionFile;
use crate::session::Session;
use crate::socket::channel::Channel;
use crate::socket::socket::Socket;
use crate::wire::exception::Exception;
use crate::wire::execute_input::ExecuteInput;
use crate::wire::execute_request::ExecuteRequest;
use crate::wire::header::JupyterHeader;
use crate::wire::input_reply::InputReply;
use crate::wire::input_request::InputRequest;
use crate::wire::jupyter_message::JupyterMessage;
use crate::wire::jupyter_message::Message;
use crate::wire::jupyter_message::ProtocolMessage;
use crate::wire::jupyter_message::Status;
use crate::wire::status::ExecutionState;
use crate::wire::stream::Stream;
use crate::wire::wire_message::WireMessage;

/// How long to wait for an expected message before failing the test
const RECV_TIMEOUT_MS: i64 = 5000;

/// Flags of an `execute_request` besides its code
#[derive(Debug, Clone, Copy)]
pub struct ExecuteRequestOptions {
    pub silent: bool,
    pub store_history: bool,
    pub allow_stdin: bool,
    pub stop_on_error: bool,
}

impl Default for ExecuteRequestOptions {
    fn default() -> Self {
        Self {
            silent: false,
            store_history: true,
            allow_stdin: false,
            stop_on_error: false,
        }
    }
}

/// A synthetic frontend for driving a kernel over real sockets in tests.
/// It connects first; the kernel binds the ports named in
/// [DummyFrontend::connection_file] afterwards.
pub struct DummyFrontend {
    pub control_socket: Socket,
    pub shell_socket: Socket,
    pub iopub_socket: Socket,
    pub stdin_socket: Socket,
    pub heartbeat_socket: Socket,
    session: Session,
    key: String,
    control_port: u16,
    shell_port: u16,
    iopub_port: u16,
    stdin_port: u16,
    heartbeat_port: u16,
}

impl DummyFrontend {
    pub fn new() -> Self {
        use rand::Rng;

        // Create a random HMAC key for signing messages.
        let key_bytes = rand::thread_rng().gen::<[u8; 16]>();
        let key = hex::encode(key_bytes);

        // Create a random socket identity for the shell and stdin sockets. Per
        // the Jupyter messaging protocol, these must share a ZeroMQ identity.
        let shell_id = rand::thread_rng().gen::<[u8; 16]>();

        let session = Session::create("hmac-sha256", &key)
            .unwrap()
            .with_username("frontend");

        let ctx = zmq::Context::new();

        let connect = |channel: Channel, identity: Option<&[u8]>| {
            let port = portpicker::pick_unused_port().unwrap();
            let socket = Socket::new(
                session.clone(),
                ctx.clone(),
                channel.to_string(),
                channel.frontend_socket_type(),
                identity,
                format!("tcp://127.0.0.1:{port}"),
            )
            .unwrap();
            (socket, port)
        };

        let (control, control_port) = connect(Channel::Control, None);
        let (shell, shell_port) = connect(Channel::Shell, Some(&shell_id[..]));
        let (iopub, iopub_port) = connect(Channel::IOPub, None);
        let (stdin, stdin_port) = connect(Channel::Stdin, Some(&shell_id[..]));
        let (heartbeat, heartbeat_port) = connect(Channel::Heartbeat, None);

        // The subscription reaches the kernel as soon as it binds IOPub
        iopub.subscribe().unwrap();

        Self {
            session,
            key,
            control_port,
            control_socket: control,
            shell_port,
            shell_socket: shell,
            iopub_port,
            iopub_socket: iopub,
            stdin_port,
            stdin_socket: stdin,
            heartbeat_port,
            heartbeat_socket: heartbeat,
        }
    }

    /// Gets a connection file for a kernel that will connect it to this
    /// synthetic frontend.
    pub fn connection_file(&self) -> ConnectionFile {
        ConnectionFile {
            control_port: self.control_port,
            shell_port: self.shell_port,
            stdin_port: self.stdin_port,
            iopub_port: self.iopub_port,
            hb_port: self.heartbeat_port,
            transport: String::from("tcp"),
            signature_scheme: String::from("hmac-sha256"),
            ip: String::from("127.0.0.1"),
            key: self.key.clone(),
            kernel_name: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn send<T: ProtocolMessage>(&self, socket: &Socket, msg: T) -> String {
        let message = JupyterMessage::create(msg, None, &self.session);
        let id = message.header.msg_id.clone();
        message.send(socket).unwrap();
        id
    }

    /// Sends a Jupyter message on the Shell socket; returns the ID of the newly
    /// created message
    pub fn send_shell<T: ProtocolMessage>(&self, msg: T) -> String {
        self.send(&self.shell_socket, msg)
    }

    /// Sends a Jupyter message on the Control socket
    pub fn send_control<T: ProtocolMessage>(&self, msg: T) -> String {
        self.send(&self.control_socket, msg)
    }

    /// Sends a Jupyter message on the Stdin socket
    pub fn send_stdin<T: ProtocolMessage>(&self, msg: T) -> String {
        self.send(&self.stdin_socket, msg)
    }

    pub fn send_execute_request(&self, code: &str, options: ExecuteRequestOptions) -> String {
        self.send_shell(ExecuteRequest {
            code: String::from(code),
            silent: options.silent,
            store_history: options.store_history,
            user_expressions: json!({}),
            allow_stdin: options.allow_stdin,
            stop_on_error: options.stop_on_error,
        })
    }

    /// Sends a message of an arbitrary type on the Shell socket
    pub fn send_shell_wire(&self, msg_type: &str, content: Value) -> String {
        let header = JupyterHeader::create(
            String::from(msg_type),
            self.session.session_id.clone(),
            self.session.username.clone(),
        );
        let id = header.msg_id.clone();
        let msg = WireMessage {
            zmq_identities: Vec::new(),
            header,
            parent_header: None,
            metadata: json!({}),
            content,
            buffers: Vec::new(),
        };
        msg.send(&self.shell_socket).unwrap();
        id
    }

    /// Sends a Shell message signed with another session's key
    pub fn send_shell_signed_with<T: ProtocolMessage>(&self, msg: T, session: &Session) -> String {
        let message = JupyterMessage::create(msg, None, session);
        let id = message.header.msg_id.clone();
        let wire = WireMessage::try_from(&message).unwrap();
        let frames = wire.to_frames(session.key.as_ref()).unwrap();
        self.shell_socket.send_multipart(&frames).unwrap();
        id
    }

    pub fn send_stdin_input_reply(&self, value: &str) -> String {
        self.send_stdin(InputReply {
            value: String::from(value),
        })
    }

    fn wait_for(socket: &Socket) {
        // It's important to wait with a timeout because the kernel thread might
        // have panicked, preventing it from sending the expected message. The
        // tests would then hang indefinitely.
        if !socket.poll_incoming(RECV_TIMEOUT_MS).unwrap() {
            panic!("Timeout while expecting message on socket {}", socket.name);
        }
    }

    pub fn recv(&self, socket: &Socket) -> Message {
        Self::wait_for(socket);
        Message::read_from_socket(socket).unwrap()
    }

    /// Receives an undecoded message, for message types the kernel does not
    /// know about
    pub fn recv_wire(&self, socket: &Socket) -> WireMessage {
        Self::wait_for(socket);
        WireMessage::read_from_socket(socket).unwrap()
    }

    /// Receives a Jupyter message from the Shell socket
    pub fn recv_shell(&self) -> Message {
        self.recv(&self.shell_socket)
    }

    /// Receives a Jupyter message from the Control socket
    pub fn recv_control(&self) -> Message {
        self.recv(&self.control_socket)
    }

    /// Receives a Jupyter message from the IOPub socket
    pub fn recv_iopub(&self) -> Message {
        self.recv(&self.iopub_socket)
    }

    /// Receives a Jupyter message from the Stdin socket
    pub fn recv_stdin(&self) -> Message {
        self.recv(&self.stdin_socket)
    }

    /// Receive from Shell and assert `ExecuteReply` message.
    /// Returns `execution_count`.
    pub fn recv_shell_execute_reply(&self) -> u32 {
        let msg = self.recv_shell();

        assert_matches!(msg, Message::ExecuteReply(data) => {
            assert_eq!(data.content.status, Status::Ok);
            data.content.execution_count
        })
    }

    /// Receive from Shell and assert `ExecuteReplyException` message.
    /// Returns the exception.
    pub fn recv_shell_execute_reply_exception(&self) -> Exception {
        let msg = self.recv_shell();

        assert_matches!(msg, Message::ExecuteReplyException(data) => {
            assert_eq!(data.content.status, Status::Error);
            data.content.exception
        })
    }

    /// Receive from IOPub and assert a status message with the given state
    pub fn recv_iopub_status(&self, state: ExecutionState) {
        let msg = self.recv_iopub();

        assert_matches!(msg, Message::Status(data) => {
            assert_eq!(data.content.execution_state, state);
        });
    }

    /// Receive from IOPub and assert Busy message
    pub fn recv_iopub_busy(&self) {
        self.recv_iopub_status(ExecutionState::Busy)
    }

    /// Receive from IOPub and assert Idle message
    pub fn recv_iopub_idle(&self) {
        self.recv_iopub_status(ExecutionState::Idle)
    }

    /// Receive from IOPub and assert Starting message
    pub fn recv_iopub_starting(&self) {
        self.recv_iopub_status(ExecutionState::Starting)
    }

    /// Receive from IOPub and assert ExecuteInput message
    pub fn recv_iopub_execute_input(&self) -> ExecuteInput {
        let msg = self.recv_iopub();

        assert_matches!(msg, Message::ExecuteInput(data) => {
            data.content
        })
    }

    /// Receive from IOPub and assert ExecuteResult message. Returns compulsory
    /// `plain/text` result.
    pub fn recv_iopub_execute_result(&self) -> String {
        let msg = self.recv_iopub();

        assert_matches!(msg, Message::ExecuteResult(data) => {
            assert_matches!(data.content.data, Value::Object(map) => {
                assert_matches!(map["text/plain"], Value::String(ref string) => {
                    string.clone()
                })
            })
        })
    }

    pub fn recv_iopub_stream_stdout(&self) -> String {
        let msg = self.recv_iopub();

        assert_matches!(msg, Message::Stream(data) => {
            assert_eq!(data.content.name, Stream::Stdout);
            data.content.text
        })
    }

    pub fn recv_iopub_stream_stderr(&self) -> String {
        let msg = self.recv_iopub();

        assert_matches!(msg, Message::Stream(data) => {
            assert_eq!(data.content.name, Stream::Stderr);
            data.content.text
        })
    }

    /// Receive from IOPub and assert ExecuteError message
    pub fn recv_iopub_execute_error(&self) -> Exception {
        let msg = self.recv_iopub();

        assert_matches!(msg, Message::ExecuteError(data) => {
            data.content.exception
        })
    }

    /// Receive from Stdin and assert InputRequest message
    pub fn recv_stdin_input_request(&self) -> InputRequest {
        let msg = self.recv_stdin();

        assert_matches!(msg, Message::InputRequest(data) => {
            data.content
        })
    }

    /// Sends a (raw) message to the heartbeat socket
    pub fn send_heartbeat(&self, msg: zmq::Message) {
        self.heartbeat_socket.send(msg).unwrap();
    }

    /// Receives a (raw) message from the heartbeat socket
    pub fn recv_heartbeat(&self) -> zmq::Message {
        Self::wait_for(&self.heartbeat_socket);
        let mut msg = zmq::Message::new();
        self.heartbeat_socket.recv(&mut msg).unwrap();
        msg
    }

    /// Asserts that nothing arrives on `socket` within `timeout_ms`
    pub fn assert_nothing_within(&self, socket: &Socket, timeout_ms: i64) {
        if socket.poll_incoming(timeout_ms).unwrap() {
            Self::flush_incoming(&socket.name, socket);
            panic!("Unexpected message on socket {}", socket.name);
        }
    }

    /// Asserts that no socket has incoming data
    pub fn assert_no_incoming(&self) {
        let mut has_incoming = false;

        for socket in [
            &self.iopub_socket,
            &self.shell_socket,
            &self.control_socket,
            &self.stdin_socket,
        ] {
            if socket.has_incoming_data().unwrap() {
                has_incoming = true;
                Self::flush_incoming(&socket.name, socket);
            }
        }

        if has_incoming {
            panic!("Sockets must be empty on exit (see details above)");
        }
    }

    fn flush_incoming(name: &str, socket: &Socket) {
        println!("{name} has incoming data:");

        while socket.has_incoming_data().unwrap() {
            dbg!(WireMessage::read_from_socket(socket).unwrap());
            println!("---");
        }
    }
}

impl Default for DummyFrontend {
    fn default() -> Self {
        Self::new()
    }
}
