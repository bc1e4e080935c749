//! Serial transport backed by an operating-system serial port.
//!
//! [`SerialPortLink`] opens a device path through the `serialport` crate and
//! runs a dedicated reader thread that feeds the registered [`LinkClient`].
//! The reader polls with a short timeout so `close` can stop and join it.
//! If a read fails with anything other than a timeout the reader exits and
//! the link reports itself closed until it is reopened.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use serialport::{FlowControl, SerialPort};
use tracing::{debug, error, warn};

use crate::{
    HardwareError, Result,
    traits::{LinkClient, LinkWriter, SerialLink},
};

/// How long a single port read blocks before the reader re-checks for shutdown.
const READ_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Size of the scratch buffer used by the reader thread.
const READ_CHUNK_SIZE: usize = 256;

/// Serial link over a real UART device such as `/dev/ttyAMA1`.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use uartlink_hardware::serial::SerialPortLink;
/// use uartlink_hardware::traits::{LinkClient, LinkWriter, SerialLink};
///
/// struct Print;
///
/// impl LinkClient for Print {
///     fn receive_buf(&self, _link: &dyn LinkWriter, data: &[u8]) -> usize {
///         println!("rx {} bytes", data.len());
///         data.len()
///     }
/// }
///
/// # fn main() -> uartlink_hardware::Result<()> {
/// let link = SerialPortLink::new("/dev/ttyAMA1", 115_200);
/// link.open(Arc::new(Print))?;
/// link.write_buf(b"hello\r\n")?;
/// link.close()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SerialPortLink {
    path: String,
    baud: AtomicU32,
    flow_control: AtomicBool,
    port: Mutex<Option<OpenPort>>,
}

struct OpenPort {
    writer: Arc<PortWriter>,
    stop: Arc<AtomicBool>,
    /// Set by the reader thread when the port stopped delivering data.
    failed: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl std::fmt::Debug for OpenPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenPort")
            .field("stopping", &self.stop.load(Ordering::Relaxed))
            .field("failed", &self.failed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl SerialPortLink {
    /// Create a link for `path`. Nothing is opened until [`SerialLink::open`].
    pub fn new(path: impl Into<String>, baud: u32) -> Self {
        Self {
            path: path.into(),
            baud: AtomicU32::new(baud),
            flow_control: AtomicBool::new(false),
            port: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<OpenPort>> {
        self.port.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn writer(&self) -> Result<Arc<PortWriter>> {
        match self.lock().as_ref() {
            Some(open) if open.failed.load(Ordering::Acquire) => {
                Err(HardwareError::disconnected(&self.path))
            }
            Some(open) => Ok(Arc::clone(&open.writer)),
            None => Err(HardwareError::not_open(&self.path)),
        }
    }

    fn flow_control_mode(enabled: bool) -> FlowControl {
        if enabled {
            FlowControl::Hardware
        } else {
            FlowControl::None
        }
    }
}

impl LinkWriter for SerialPortLink {
    fn write_buf(&self, data: &[u8]) -> Result<usize> {
        self.writer()?.write_buf(data)
    }
}

impl SerialLink for SerialPortLink {
    fn open(&self, client: Arc<dyn LinkClient>) -> Result<()> {
        let mut slot = self.lock();
        if slot.is_some() {
            return Err(HardwareError::already_open(&self.path));
        }

        let port = serialport::new(&self.path, self.baud.load(Ordering::Relaxed))
            .flow_control(Self::flow_control_mode(
                self.flow_control.load(Ordering::Relaxed),
            ))
            .timeout(READ_POLL_INTERVAL)
            .open()?;
        let reader_port = port.try_clone()?;

        let writer = Arc::new(PortWriter {
            port: Mutex::new(port),
        });
        let stop = Arc::new(AtomicBool::new(false));
        let failed = Arc::new(AtomicBool::new(false));

        let reader = {
            let writer = Arc::clone(&writer);
            let stop = Arc::clone(&stop);
            let failed = Arc::clone(&failed);
            let path = self.path.clone();
            std::thread::Builder::new()
                .name(format!("uartlink-rx:{}", self.path))
                .spawn(move || {
                    reader_loop(
                        &path,
                        reader_port,
                        writer.as_ref(),
                        client.as_ref(),
                        &stop,
                        &failed,
                    )
                })?
        };

        debug!("Opened serial port {}", self.path);
        *slot = Some(OpenPort {
            writer,
            stop,
            failed,
            reader,
        });
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let open = self
            .lock()
            .take()
            .ok_or_else(|| HardwareError::not_open(&self.path))?;

        open.stop.store(true, Ordering::Release);
        open.reader
            .join()
            .map_err(|_| HardwareError::other(format!("{} reader thread panicked", self.path)))?;

        debug!("Closed serial port {}", self.path);
        Ok(())
    }

    fn set_baudrate(&self, baud: u32) -> Result<u32> {
        self.baud.store(baud, Ordering::Relaxed);
        match self.writer() {
            Ok(writer) => {
                let mut port = writer.lock();
                port.set_baud_rate(baud)?;
                Ok(port.baud_rate()?)
            }
            // Applied when the port is opened
            Err(_) => Ok(baud),
        }
    }

    fn set_flow_control(&self, enabled: bool) -> Result<()> {
        self.flow_control.store(enabled, Ordering::Relaxed);
        if let Ok(writer) = self.writer() {
            writer
                .lock()
                .set_flow_control(Self::flow_control_mode(enabled))?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|open| !open.failed.load(Ordering::Acquire))
    }

    fn name(&self) -> &str {
        &self.path
    }
}

impl Drop for SerialPortLink {
    fn drop(&mut self) {
        // A failed port still holds a reader thread to join.
        if self.lock().is_some() {
            if let Err(e) = self.close() {
                warn!("Error closing {} on drop: {}", self.path, e);
            }
        }
    }
}

/// Transmit side of an open port, shared with the reader thread for echo.
struct PortWriter {
    port: Mutex<Box<dyn SerialPort>>,
}

impl PortWriter {
    fn lock(&self) -> MutexGuard<'_, Box<dyn SerialPort>> {
        self.port.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LinkWriter for PortWriter {
    fn write_buf(&self, data: &[u8]) -> Result<usize> {
        match self.lock().write(data) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Err(HardwareError::timeout(
                READ_POLL_INTERVAL.as_millis() as u64,
            )),
            Err(e) => Err(e.into()),
        }
    }
}

fn reader_loop(
    path: &str,
    mut port: impl Read,
    writer: &dyn LinkWriter,
    client: &dyn LinkClient,
    stop: &AtomicBool,
    failed: &AtomicBool,
) {
    let mut buf = [0u8; READ_CHUNK_SIZE];

    while !stop.load(Ordering::Acquire) {
        match port.read(&mut buf) {
            Ok(0) => {}
            Ok(n) => {
                client.receive_buf(writer, &buf[..n]);
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted) => {}
            Err(e) => {
                error!("Serial read on {} failed, link is down: {}", path, e);
                failed.store(true, Ordering::Release);
                break;
            }
        }
    }

    debug!("Reader for {} stopped", path);
}
