//! The listening server: one accept thread feeding a fixed pool of
//! connection workers.

use std::io::{ErrorKind, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{debug, error, info, warn};
use sofablend_io::ApplyReport;

use crate::error::{Result, ServerError};
use crate::framing::FrameDecoder;
use crate::handler::{decode_message, MessageHandler};
use crate::options::ServerOptions;

const READ_CHUNK: usize = 4096;

/// Something that happened on the server.
#[derive(Debug)]
pub enum ServerEvent {
    ConnectionOpened { peer: SocketAddr },
    /// Every worker was busy and the pending queue was full.
    ConnectionRefused { peer: SocketAddr },
    ConnectionClosed { peer: SocketAddr },
    MessageApplied { iteration: u64, report: ApplyReport },
    MessageRejected { reason: String },
}

/// A running server.
///
/// Dropping the session stops it.
pub struct ServerSession {
    options: ServerOptions,
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    accept: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
    events: Receiver<ServerEvent>,
}

impl ServerSession {
    /// Bind the listener and spawn the accept thread and workers.
    pub fn start(options: ServerOptions, handler: Arc<dyn MessageHandler>) -> Result<Self> {
        let address = options.address();
        let listener = TcpListener::bind(&address).map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let running = Arc::new(AtomicBool::new(true));
        let pool_size = options.max_connections.max(1);
        let (event_tx, event_rx) = crossbeam_channel::bounded(options.event_buffer.max(1));
        let (conn_tx, conn_rx) = crossbeam_channel::bounded::<(TcpStream, SocketAddr)>(pool_size);

        let mut session = Self {
            options,
            local_addr,
            running,
            accept: None,
            workers: Vec::with_capacity(pool_size),
            events: event_rx,
        };

        for index in 0..pool_size {
            let worker = Worker {
                connections: conn_rx.clone(),
                handler: Arc::clone(&handler),
                events: event_tx.clone(),
                running: Arc::clone(&session.running),
                options: session.options.clone(),
            };
            let handle = thread::Builder::new()
                .name(format!("sofablend-worker-{index}"))
                .spawn(move || worker.run())?;
            session.workers.push(handle);
        }

        let acceptor = Acceptor {
            listener,
            connections: conn_tx,
            events: event_tx,
            running: Arc::clone(&session.running),
            options: session.options.clone(),
        };
        let handle = thread::Builder::new()
            .name("sofablend-accept".into())
            .spawn(move || acceptor.run())?;
        session.accept = Some(handle);

        info!("listening on {}", session.local_addr);
        Ok(session)
    }

    /// Address actually bound; useful with port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.accept.is_some()
    }

    /// Receiver of server events. Events are dropped while the channel is
    /// full.
    pub fn events(&self) -> Receiver<ServerEvent> {
        self.events.clone()
    }

    /// Stop accepting, close every connection and join all threads.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.accept.is_none() && self.workers.is_empty() {
            return;
        }
        self.running.store(false, Ordering::SeqCst);
        if let Some(accept) = self.accept.take() {
            if accept.join().is_err() {
                error!("accept thread panicked");
            }
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("connection worker panicked");
            }
        }
        info!("stopped listening on {}", self.local_addr);
    }
}

impl Drop for ServerSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn emit(events: &Sender<ServerEvent>, event: ServerEvent) {
    // full or disconnected: nobody is keeping up, drop the event
    let _ = events.try_send(event);
}

struct Acceptor {
    listener: TcpListener,
    connections: Sender<(TcpStream, SocketAddr)>,
    events: Sender<ServerEvent>,
    running: Arc<AtomicBool>,
    options: ServerOptions,
}

impl Acceptor {
    fn run(self) {
        let poll = self.options.poll_interval();
        while self.running.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, peer)) => match self.connections.try_send((stream, peer)) {
                    Ok(()) => debug!("[{peer}] queued"),
                    Err(TrySendError::Full(_)) => {
                        warn!("[{peer}] refused: all {} workers busy", self.options.max_connections);
                        emit(&self.events, ServerEvent::ConnectionRefused { peer });
                    }
                    Err(TrySendError::Disconnected(_)) => break,
                },
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(poll),
                Err(e) => {
                    error!("accept failed: {e}");
                    thread::sleep(poll);
                }
            }
        }
    }
}

struct Worker {
    connections: Receiver<(TcpStream, SocketAddr)>,
    handler: Arc<dyn MessageHandler>,
    events: Sender<ServerEvent>,
    running: Arc<AtomicBool>,
    options: ServerOptions,
}

impl Worker {
    fn run(self) {
        let poll = self.options.poll_interval();
        while self.running.load(Ordering::Relaxed) {
            match self.connections.recv_timeout(poll) {
                Ok((stream, peer)) => {
                    emit(&self.events, ServerEvent::ConnectionOpened { peer });
                    info!("[{peer}] connected");
                    if let Err(e) = self.serve(stream, peer) {
                        error!("[{peer}] connection failed: {e}");
                    }
                    info!("[{peer}] disconnected");
                    emit(&self.events, ServerEvent::ConnectionClosed { peer });
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn serve(&self, mut stream: TcpStream, peer: SocketAddr) -> Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(self.options.poll_interval()))?;

        let mut decoder = FrameDecoder::new().with_max_message_bytes(self.options.max_message_bytes);
        let mut chunk = [0u8; READ_CHUNK];

        while self.running.load(Ordering::Relaxed) {
            let n = match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                    continue
                }
                Err(e) => return Err(e.into()),
            };
            decoder.push(&chunk[..n]);
            while let Some(body) = decoder.next_message() {
                self.dispatch(&body, peer);
            }
        }
        Ok(())
    }

    fn dispatch(&self, body: &[u8], peer: SocketAddr) {
        let message = match decode_message(body) {
            Ok(message) => message,
            Err(e) => {
                warn!("[{peer}] dropping message: {e}");
                emit(&self.events, ServerEvent::MessageRejected { reason: e.to_string() });
                return;
            }
        };

        let iteration = message.iteration;
        match self.handler.handle(message) {
            Ok(report) => {
                debug!(
                    "[{peer}] applied iteration #{iteration}: {} created, {} updated, {} failed",
                    report.objects_created,
                    report.objects_updated,
                    report.failures.len()
                );
                emit(&self.events, ServerEvent::MessageApplied { iteration, report });
            }
            Err(e) => {
                warn!("[{peer}] iteration #{iteration} rejected: {e}");
                emit(&self.events, ServerEvent::MessageRejected { reason: e.to_string() });
            }
        }
    }
}
