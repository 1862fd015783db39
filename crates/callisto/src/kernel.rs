/*
 * kernel.rs
 *
 * Copyright (C) 2022-2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::sync::Arc;
use std::sync::Mutex;

use crossbeam::channel::bounded;
use crossbeam::channel::unbounded;
use crossbeam::channel::Receiver;
use crossbeam::channel::Sender;
use stdext::spawn;

use crate::comm::comm_manager::CommManager;
use crate::config::KernelConfig;
use crate::connection_file::ConnectionFile;
use crate::dispatcher::Dispatcher;
use crate::error::Error;
use crate::executor::ExecuteTask;
use crate::executor::Executor;
use crate::history::History;
use crate::language::interpreter::Interpreter;
use crate::session::Session;
use crate::session_state::SessionState;
use crate::socket::channel::Channel;
use crate::socket::control::Control;
use crate::socket::heartbeat::Heartbeat;
use crate::socket::iopub::IOPub;
use crate::socket::iopub::IOPubMessage;
use crate::socket::shell::Shell;
use crate::socket::shell::SHELL_RELAY_ENDPOINT;
use crate::socket::socket::Socket;
use crate::socket::stdin::Stdin;
use crate::wire::input_request::ShellInputRequest;
use crate::wire::shutdown_request::ShutdownRequest;
use crate::wire::status::ExecutionState;

/// A running kernel. The channel threads serve the frontend until it asks
/// for a shutdown.
pub struct Kernel {
    session: Session,
    state: Arc<SessionState>,
    comm_manager: Arc<CommManager>,
    shutdown_rx: Receiver<ShutdownRequest>,
}

impl Kernel {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub fn comm_manager(&self) -> &Arc<CommManager> {
        &self.comm_manager
    }

    /// Blocks until a frontend asks the kernel to shut down. Returns `None`
    /// if the control thread went away without a request.
    pub fn wait_for_shutdown(&self) -> Option<ShutdownRequest> {
        match self.shutdown_rx.recv() {
            Ok(req) => Some(req),
            Err(err) => {
                log::error!("Control thread exited without a shutdown request: {err}");
                None
            },
        }
    }
}

/// Connects the Kernel to the frontend
///
/// Binds every channel listed in the connection file, starts one thread per
/// channel plus the executor, and broadcasts the initial `starting` and
/// `idle` statuses once a frontend has subscribed to IOPub (or the
/// subscription wait has timed out).
pub fn connect(
    connection_file: ConnectionFile,
    config: KernelConfig,
    interpreter: Arc<dyn Interpreter>,
) -> Result<Kernel, Error> {
    let name = config.name.clone();
    let ctx = zmq::Context::new();

    if connection_file.key.is_empty() {
        log::warn!("Connection file has an empty key; messages will not be signed");
    }
    let session = Session::create(&connection_file.signature_scheme, &connection_file.key)?
        .with_username(&config.username);

    // Everything broadcast on IOPub flows through this channel to the IOPub
    // thread, which owns the socket
    let (iopub_tx, iopub_rx) = unbounded::<IOPubMessage>();
    let state = Arc::new(SessionState::new(iopub_tx.clone()));
    let history = Arc::new(History::new());
    let lane = Arc::new(Mutex::new(()));

    let comm_manager = Arc::new(CommManager::new(iopub_tx.clone()));
    interpreter.register_comm_targets(&comm_manager);

    let (execute_tx, execute_rx) = unbounded::<ExecuteTask>();
    let (input_request_tx, input_request_rx) = unbounded::<ShellInputRequest>();
    let (stdin_interrupt_tx, stdin_interrupt_rx) = bounded::<()>(1);
    let (shutdown_tx, shutdown_rx) = unbounded::<ShutdownRequest>();

    let bind = |channel: Channel, port: u16| {
        Socket::bind_channel(
            session.clone(),
            ctx.clone(),
            channel,
            connection_file.endpoint(port),
        )
    };
    let shell_socket = bind(Channel::Shell, connection_file.shell_port)?;
    let control_socket = bind(Channel::Control, connection_file.control_port)?;
    let stdin_socket = bind(Channel::Stdin, connection_file.stdin_port)?;
    let iopub_socket = bind(Channel::IOPub, connection_file.iopub_port)?;
    let heartbeat_socket = bind(Channel::Heartbeat, connection_file.hb_port)?;

    // The bound end must exist before the executor connects to an inproc
    // endpoint
    let relay_socket = Socket::new_pair(
        session.clone(),
        ctx.clone(),
        String::from("ShellRelay"),
        String::from(SHELL_RELAY_ENDPOINT),
        true,
    )?;
    let reply_socket = Socket::new_pair(
        session.clone(),
        ctx.clone(),
        String::from("ExecuteReply"),
        String::from(SHELL_RELAY_ENDPOINT),
        false,
    )?;

    let dispatcher = Arc::new(Dispatcher::new(
        interpreter.clone(),
        state.clone(),
        history.clone(),
        comm_manager.clone(),
        lane.clone(),
        execute_tx,
        iopub_tx.clone(),
        stdin_interrupt_tx,
        shutdown_tx,
        &config,
    ));

    // Notified when the XPUB socket sees its first subscription, meaning
    // the messages we send over IOPub will no longer be dropped on the way out
    let (iopub_subscription_tx, iopub_subscription_rx) = bounded::<()>(1);
    spawn!(format!("{name}-iopub"), move || {
        IOPub::new(iopub_socket, iopub_rx, iopub_subscription_tx).listen()
    });

    spawn!(format!("{name}-heartbeat"), move || {
        Heartbeat::new(heartbeat_socket).listen()
    });

    spawn!(format!("{name}-stdin"), move || {
        Stdin::new(stdin_socket, input_request_rx, stdin_interrupt_rx).listen()
    });

    let executor = Executor::new(
        interpreter,
        state.clone(),
        history,
        lane,
        iopub_tx,
        input_request_tx,
        reply_socket,
        execute_rx,
        &config,
    );
    spawn!(format!("{name}-executor"), move || executor.listen());

    let shell_dispatcher = dispatcher.clone();
    spawn!(format!("{name}-shell"), move || {
        Shell::new(shell_socket, relay_socket, shell_dispatcher).listen()
    });

    spawn!(format!("{name}-control"), move || {
        Control::new(control_socket, dispatcher).listen()
    });

    // Without a subscriber the XPUB socket silently drops the initial
    // statuses, so give the frontend a chance to connect first
    log::info!("Waiting on IOPub subscription confirmation");
    match iopub_subscription_rx.recv_timeout(config.iopub_subscription_timeout) {
        Ok(_) => log::info!("Received IOPub subscription confirmation"),
        Err(err) => log::warn!(
            "No IOPub subscription after {:?} ({err}); starting anyway",
            config.iopub_subscription_timeout
        ),
    }

    state.set_status(ExecutionState::Starting, None)?;
    state.set_status(ExecutionState::Idle, None)?;

    Ok(Kernel {
        session,
        state,
        comm_manager,
        shutdown_rx,
    })
}

/// Reads a `connection_file` containing Jupyter connection information
pub fn read_connection(connection_file: &str) -> crate::Result<ConnectionFile> {
    let connection = ConnectionFile::from_file(connection_file)?;
    log::info!("Loaded connection information from frontend in {connection_file}");
    log::trace!(
        "Shell on {}, IOPub on {}",
        connection.endpoint(connection.shell_port),
        connection.endpoint(connection.iopub_port)
    );
    Ok(connection)
}
