//! The transport layer: one worker task owns the byte stream and runs
//! exchanges strictly one at a time, the way a half-duplex RS-485 line
//! requires. Commands schedule requests through a queue and wait for the
//! matching outcome.

use crate::modbus::{self, ModbusRTUCodec};
use futures::{SinkExt as _, StreamExt as _};
use std::collections::BTreeMap;
use std::sync::atomic::AtomicU16;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::error::SendError;
use tokio::time::Instant;
use tokio_util::codec::Framed;
use tracing::{debug, info, trace, warn};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("lookup of `{1}` failed")]
    LookupHost(#[source] std::io::Error, String),
    #[error("could not connect to `{1}` over TCP")]
    Connect(#[source] std::io::Error, String),
    #[error("could not open the serial port `{1}`")]
    OpenSerial(#[source] tokio_serial::Error, String),
    #[error("scheduling a request failed")]
    ScheduleRequest(#[source] SendError<modbus::Request>),
    #[error("could not read data from the stream")]
    Receive(#[source] modbus::Error),
    #[error("could not send out the request")]
    Send(#[source] modbus::Error),
    #[error("the controller did not respond in time")]
    TimedOut,
    #[error("response checksum mismatch (computed {computed:#06X}, received {received:#06X})")]
    BadChecksum { computed: u16, received: u16 },
    #[error(
        "the controller rejected the request: {} (exception code {code})",
        modbus::exception_description(*code)
    )]
    Exception { code: u8 },
    #[error("device {received} replied to a request addressed to device {expected}")]
    DeviceIdMismatch { expected: u8, received: u8 },
    #[error(
        "the controller echoed register {}={:#06X} for a write of register {}={:#06X}",
        echoed.0, echoed.1, sent.0, sent.1
    )]
    WriteEchoMismatch { sent: (u16, u16), echoed: (u16, u16) },
    #[error("the read reply carries {received} bytes where {expected} were requested")]
    ShortRead { expected: usize, received: usize },
    #[error("the controller replied to a different kind of request")]
    UnexpectedReply,
}

/// How a single exchange ended, as reported by the worker.
#[derive(Debug)]
pub enum Outcome {
    Response(modbus::Response),
    BadChecksum { computed: u16, received: u16 },
    TimedOut,
}

#[derive(Default)]
pub struct ResponseTracker {
    outcomes: Mutex<BTreeMap<u16, Outcome>>,
    change_notify: Notify,
}

impl ResponseTracker {
    pub fn resolve(&self, transaction_id: u16, outcome: Outcome) {
        let mut guard = self.outcomes.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(transaction_id, outcome);
        self.change_notify.notify_waiters();
        drop(guard);
    }

    pub async fn wait_for(&self, transaction_id: u16) -> Outcome {
        loop {
            let notified = self.change_notify.notified();
            {
                let mut guard = self.outcomes.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(v) = guard.remove(&transaction_id) {
                    return v;
                }
            }
            notified.await;
        }
    }
}

#[derive(clap::Parser, Clone)]
#[group(id = "connection::Args")]
pub struct Args {
    #[clap(flatten)]
    how: ConnectionGroup,

    /// The modbus device address of the chamber controller.
    #[arg(long, short = 'i', default_value = "1",
          value_parser = clap::value_parser!(u8).range(1..=247))]
    device_id: u8,

    /// The baud rate the controller's serial interface is configured for.
    ///
    /// Also paces exchanges over the TCP bridge, which forwards to the same
    /// serial line on its far side.
    #[arg(long, default_value = "9600")]
    baudrate: u32,

    /// Consider an exchange failed when no complete response arrives within
    /// this amount of time plus the time it takes to clock the reply out over
    /// the serial line.
    #[arg(long, default_value = "1s")]
    read_timeout: humantime::Duration,

    /// The controller's documented response allowance, honored as additional
    /// quiet time between any two exchanges.
    #[arg(long, default_value = "200ms")]
    device_timeout: humantime::Duration,
}

#[derive(clap::Parser, Clone)]
#[group(required = true, multiple = false)]
pub struct ConnectionGroup {
    /// Talk to the chamber over a directly attached serial line (9600 8E1).
    ///
    /// Specify the path to the serial device.
    #[arg(long)]
    serial: Option<String>,

    /// Talk to the chamber through an RTU-over-TCP bridge, `host:port`.
    #[arg(long)]
    tcp: Option<String>,

    /// Do not talk to any chamber: accept every request and let it time out.
    ///
    /// Useful for exercising command plumbing without hardware.
    #[arg(long)]
    dummy: bool,
}

/// The mandatory line-idle time between two exchanges: 28 bit-times of
/// silence at the configured baud rate plus the controller's response
/// allowance. Roughly 203ms at 9600 baud with the stock allowance.
pub fn quiet_period(baudrate: u32, device_timeout: Duration) -> Duration {
    let silence = Duration::from_micros(28_000_000 / u64::from(baudrate.max(1)));
    silence + device_timeout
}

pub struct Connection {
    request_queue: tokio::sync::mpsc::UnboundedSender<modbus::Request>,
    pub worker: tokio::task::JoinHandle<Result<(), Error>>,
    response_tracker: Arc<ResponseTracker>,
    transaction_id_generator: AtomicU16,
    device_id: u8,
}

impl Connection {
    pub async fn new(args: &Args) -> Result<Connection, Error> {
        if let Some(path) = &args.how.serial {
            let builder = tokio_serial::new(path.clone(), args.baudrate)
                .data_bits(tokio_serial::DataBits::Eight)
                .parity(tokio_serial::Parity::Even)
                .stop_bits(tokio_serial::StopBits::One);
            let stream = tokio_serial::SerialStream::open(&builder)
                .map_err(|e| Error::OpenSerial(e, path.clone()))?;
            info!(message = "serial port open", path);
            Ok(Self::with_transport(stream, args))
        } else if let Some(address) = &args.how.tcp {
            let addresses = tokio::net::lookup_host(address)
                .await
                .map_err(|e| Error::LookupHost(e, address.clone()))?
                .collect::<Vec<_>>();
            debug!(message = "resolved", ?addresses);
            let socket = TcpStream::connect(&*addresses)
                .await
                .map_err(|e| Error::Connect(e, address.clone()))?;
            let nodelay_result = socket.set_nodelay(true);
            trace!(message = "setting nodelay", is_error = ?nodelay_result.err());
            info!(message = "connected", address);
            Ok(Self::with_transport(socket, args))
        } else {
            Ok(Self::with_transport(NullStream, args))
        }
    }

    /// Wires a worker up to an already-open byte stream.
    pub fn with_transport<S>(stream: S, args: &Args) -> Connection
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (request_queue, jobs) = tokio::sync::mpsc::unbounded_channel();
        let response_tracker: Arc<ResponseTracker> = Default::default();
        let worker = Worker {
            responses: Arc::clone(&response_tracker),
            baudrate: args.baudrate,
            read_timeout: *args.read_timeout,
            quiet_period: quiet_period(args.baudrate, *args.device_timeout),
        }
        .spawn(Framed::new(stream, ModbusRTUCodec {}), jobs);
        Self {
            request_queue,
            worker,
            response_tracker,
            transaction_id_generator: AtomicU16::new(0),
            device_id: args.device_id,
        }
    }

    pub fn new_transaction_id(&self) -> u16 {
        self.transaction_id_generator.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    }

    pub async fn send(&self, operation: modbus::Operation) -> Result<modbus::Response, Error> {
        let transaction_id = self.new_transaction_id();
        let request =
            modbus::Request { device_id: self.device_id, transaction_id, operation };
        self.request_queue.send(request).map_err(Error::ScheduleRequest)?;
        match self.response_tracker.wait_for(transaction_id).await {
            Outcome::Response(response) => {
                if response.device_id != self.device_id {
                    return Err(Error::DeviceIdMismatch {
                        expected: self.device_id,
                        received: response.device_id,
                    });
                }
                Ok(response)
            }
            Outcome::BadChecksum { computed, received } => {
                Err(Error::BadChecksum { computed, received })
            }
            Outcome::TimedOut => Err(Error::TimedOut),
        }
    }

    /// Reads `count` registers starting at `address` and returns the raw
    /// big-endian payload bytes.
    pub async fn read_registers(&self, address: u16, count: u16) -> Result<Vec<u8>, Error> {
        let response =
            self.send(modbus::Operation::ReadRegisters { address, count }).await?;
        match response.kind {
            modbus::ResponseKind::ReadRegisters { values } => {
                let expected = usize::from(count) * 2;
                if values.len() != expected {
                    return Err(Error::ShortRead { expected, received: values.len() });
                }
                Ok(values)
            }
            modbus::ResponseKind::ErrorCode(code) => Err(Error::Exception { code }),
            _ => Err(Error::UnexpectedReply),
        }
    }

    /// Reads a single register.
    pub async fn read_register(&self, address: u16) -> Result<u16, Error> {
        let values = self.read_registers(address, 1).await?;
        modbus::extract_word(address, address, &values).ok_or(Error::UnexpectedReply)
    }

    /// Writes a single register and verifies the controller's echo.
    pub async fn write_register(&self, address: u16, value: u16) -> Result<(), Error> {
        let response =
            self.send(modbus::Operation::WriteRegister { address, value }).await?;
        match response.kind {
            modbus::ResponseKind::WriteRegister { address: a, value: v } => {
                if (a, v) != (address, value) {
                    return Err(Error::WriteEchoMismatch {
                        sent: (address, value),
                        echoed: (a, v),
                    });
                }
                Ok(())
            }
            modbus::ResponseKind::ErrorCode(code) => Err(Error::Exception { code }),
            _ => Err(Error::UnexpectedReply),
        }
    }

    /// Writes a block of registers and verifies the echoed address and
    /// quantity.
    pub async fn write_registers(&self, address: u16, values: Vec<u16>) -> Result<(), Error> {
        let quantity = values.len() as u16;
        let response =
            self.send(modbus::Operation::WriteRegisters { address, values }).await?;
        match response.kind {
            modbus::ResponseKind::WriteRegisters { address: a, count } => {
                if (a, count) != (address, quantity) {
                    return Err(Error::WriteEchoMismatch {
                        sent: (address, quantity),
                        echoed: (a, count),
                    });
                }
                Ok(())
            }
            modbus::ResponseKind::ErrorCode(code) => Err(Error::Exception { code }),
            _ => Err(Error::UnexpectedReply),
        }
    }
}

struct Worker {
    responses: Arc<ResponseTracker>,
    baudrate: u32,
    read_timeout: Duration,
    quiet_period: Duration,
}

impl Worker {
    fn spawn<S>(
        self,
        io: Framed<S, ModbusRTUCodec>,
        jobs: UnboundedReceiver<modbus::Request>,
    ) -> tokio::task::JoinHandle<Result<(), Error>>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        tokio::task::spawn(self.main_loop(io, jobs))
    }

    async fn main_loop<S>(
        self,
        mut io: Framed<S, ModbusRTUCodec>,
        mut jobs: UnboundedReceiver<modbus::Request>,
    ) -> Result<(), Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut next_send = Instant::now();
        while let Some(request) = jobs.recv().await {
            tokio::time::sleep_until(next_send).await;
            // Stale bytes in the buffer belong to no outstanding request;
            // drop them so the next frame decodes from a clean boundary.
            io.read_buffer_mut().clear();
            trace!(message = "exchange", transaction = request.transaction_id);
            if let Err(error) = io.send(&request).await {
                self.responses.resolve(request.transaction_id, Outcome::TimedOut);
                return Err(Error::Send(error));
            }
            let response_length = u64::from(request.expected_response_length());
            let transmission =
                Duration::from_secs(response_length) / (self.baudrate / 10).max(1);
            let outcome =
                match tokio::time::timeout(transmission + self.read_timeout, io.next()).await
                {
                    Err(_) => {
                        debug!(
                            message = "exchange timed out",
                            transaction = request.transaction_id
                        );
                        Outcome::TimedOut
                    }
                    Ok(None) => {
                        debug!("the transport closed with a request outstanding");
                        self.responses.resolve(request.transaction_id, Outcome::TimedOut);
                        return Ok(());
                    }
                    Ok(Some(Err(modbus::Error::Checksum { computed, received }))) => {
                        warn!(message = "response failed checksum validation", computed, received);
                        Outcome::BadChecksum { computed, received }
                    }
                    Ok(Some(Err(error))) => {
                        self.responses.resolve(request.transaction_id, Outcome::TimedOut);
                        return Err(Error::Receive(error));
                    }
                    Ok(Some(Ok(response))) => Outcome::Response(response),
                };
            self.responses.resolve(request.transaction_id, outcome);
            next_send = Instant::now() + self.quiet_period;
        }
        Ok(())
    }
}

/// The `--dummy` transport. Swallows every write and never produces a byte,
/// so each exchange resolves as a timeout through the regular code path.
struct NullStream;

impl AsyncRead for NullStream {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        _buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::task::Poll::Pending
    }
}

impl AsyncWrite for NullStream {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<Result<usize, std::io::Error>> {
        std::task::Poll::Ready(Ok(buf.len()))
    }
    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), std::io::Error>> {
        std::task::Poll::Ready(Ok(()))
    }
    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), std::io::Error>> {
        std::task::Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc;
    use clap::Parser as _;
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _, DuplexStream};

    fn args() -> Args {
        Args::parse_from(["test", "--dummy"])
    }

    /// A scripted far end: reads one fixed-size request, replies with
    /// whatever the closure returns (nothing when it returns `None`).
    fn chamber<F>(mut remote: DuplexStream, request_length: usize, reply: F)
    where
        F: Fn(&[u8]) -> Option<Vec<u8>> + Send + 'static,
    {
        tokio::task::spawn(async move {
            loop {
                let mut request = vec![0u8; request_length];
                if remote.read_exact(&mut request).await.is_err() {
                    return;
                }
                if let Some(bytes) = reply(&request) {
                    let _ = remote.write_all(&bytes).await;
                }
            }
        });
    }

    #[test]
    fn quiet_period_matches_the_documented_pace() {
        assert_eq!(
            quiet_period(9600, Duration::from_millis(200)),
            Duration::from_micros(202_916)
        );
        assert_eq!(
            quiet_period(19200, Duration::from_millis(200)),
            Duration::from_micros(201_458)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn write_round_trip() {
        let (local, remote) = tokio::io::duplex(256);
        // A well-behaved controller echoes the write frame verbatim.
        chamber(remote, 8, |request| Some(request.to_vec()));
        let connection = Connection::with_transport(local, &args());
        connection.write_register(21, 1).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn read_round_trip() {
        let (local, remote) = tokio::io::duplex(256);
        chamber(remote, 8, |_| {
            let mut reply = vec![0x01, 0x03, 0x04, 0x00, 0xEC, 0x01, 0x90];
            crc::append(&mut reply);
            Some(reply)
        });
        let connection = Connection::with_transport(local, &args());
        let values = connection.read_registers(60, 2).await.unwrap();
        assert_eq!(values, [0x00, 0xEC, 0x01, 0x90]);
        assert_eq!(modbus::extract_word(60, 61, &values), Some(0x0190));
    }

    #[tokio::test(start_paused = true)]
    async fn silence_is_a_timeout() {
        let (local, remote) = tokio::io::duplex(256);
        chamber(remote, 8, |_| None);
        let connection = Connection::with_transport(local, &args());
        let result = connection.write_register(21, 1).await;
        assert!(matches!(result, Err(Error::TimedOut)), "{result:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn dummy_transport_times_out() {
        let connection = Connection::with_transport(NullStream, &args());
        let result = connection.read_register(61).await;
        assert!(matches!(result, Err(Error::TimedOut)), "{result:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn corrupted_response_fails_the_exchange() {
        let (local, remote) = tokio::io::duplex(256);
        chamber(remote, 8, |request| {
            let mut reply = request.to_vec();
            let last = reply.len() - 1;
            reply[last] ^= 0xFF;
            Some(reply)
        });
        let connection = Connection::with_transport(local, &args());
        let result = connection.write_register(21, 1).await;
        assert!(matches!(result, Err(Error::BadChecksum { .. })), "{result:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn device_exception_is_reported() {
        let (local, remote) = tokio::io::duplex(256);
        chamber(remote, 8, |_| {
            let mut reply = vec![0x01, 0x86, 0x06];
            crc::append(&mut reply);
            Some(reply)
        });
        let connection = Connection::with_transport(local, &args());
        let result = connection.write_register(21, 1).await;
        assert!(matches!(result, Err(Error::Exception { code: 6 })), "{result:?}");
        assert!(result.unwrap_err().to_string().contains("device busy"));
    }

    #[tokio::test(start_paused = true)]
    async fn mismatched_echo_is_reported() {
        let (local, remote) = tokio::io::duplex(256);
        chamber(remote, 8, |_| {
            // Claims it wrote a different value than requested.
            let mut reply = vec![0x01, 0x06, 0x00, 0x15, 0x00, 0x07];
            crc::append(&mut reply);
            Some(reply)
        });
        let connection = Connection::with_transport(local, &args());
        let result = connection.write_register(21, 1).await;
        assert!(matches!(result, Err(Error::WriteEchoMismatch { .. })), "{result:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_device_reply_is_reported() {
        let (local, remote) = tokio::io::duplex(256);
        chamber(remote, 8, |_| {
            let mut reply = vec![0x02, 0x06, 0x00, 0x15, 0x00, 0x01];
            crc::append(&mut reply);
            Some(reply)
        });
        let connection = Connection::with_transport(local, &args());
        let result = connection.write_register(21, 1).await;
        assert!(
            matches!(result, Err(Error::DeviceIdMismatch { expected: 1, received: 2 })),
            "{result:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn exchanges_do_not_interleave() {
        let (local, remote) = tokio::io::duplex(256);
        let arrivals = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&arrivals);
        chamber(remote, 8, move |request| {
            recorded.lock().unwrap().push(Instant::now());
            Some(request.to_vec())
        });
        let connection = Connection::with_transport(local, &args());
        connection.write_register(21, 1).await.unwrap();
        connection.write_register(21, 0).await.unwrap();
        let arrivals = arrivals.lock().unwrap();
        assert_eq!(arrivals.len(), 2);
        let pace = quiet_period(9600, Duration::from_millis(200));
        assert!(arrivals[1] - arrivals[0] >= pace, "{:?}", arrivals[1] - arrivals[0]);
    }
}
