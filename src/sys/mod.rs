use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result, TransportConfig};

mod stream;

pub use stream::StreamTransport;

#[cfg(target_os = "linux")]
#[path = "linux.rs"]
mod imp;

#[cfg(not(target_os = "linux"))]
#[path = "stub.rs"]
mod imp;

#[cfg(test)]
pub(crate) mod mock;

/// A line-oriented instrument session.
///
/// Commands and text responses are single lines; `read_block` returns one binary response,
/// framing included.
pub trait Transport {
    fn write_line(&mut self, line: &str) -> Result<()>;
    fn read_line(&mut self) -> Result<String>;
    fn read_block(&mut self) -> Result<Vec<u8>>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Enumerates bus resources and opens sessions to them.
pub trait ResourceManager {
    type Transport: Transport;

    fn list_resources(&self) -> Result<Vec<Resource>>;
    fn open(&self, resource: &Resource) -> Result<Self::Transport>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Bus {
    #[default]
    Usb,
    Tcpip,
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Usb => write!(f, "USB"),
            Self::Tcpip => write!(f, "TCPIP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Resource {
    /// USBTMC character device, e.g. `USB::/dev/usbtmc0`.
    Usb { path: PathBuf },
    /// Raw SCPI socket, e.g. `TCPIP::192.168.1.20::5555::SOCKET`.
    Tcpip { host: String, port: u16 },
}

impl Resource {
    pub fn bus(&self) -> Bus {
        match self {
            Self::Usb { .. } => Bus::Usb,
            Self::Tcpip { .. } => Bus::Tcpip,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Usb { path } =>
                write!(f, "USB::{}", path.display()),
            Self::Tcpip { host, port } =>
                write!(f, "TCPIP::{}::{}::SOCKET", host, port),
        }
    }
}

// accepts VISA-style board numbers, i.e. both `TCPIP::` and `TCPIP0::`
fn has_bus_prefix(name: &str, prefix: &str) -> bool {
    match (name.get(..prefix.len()), name.get(prefix.len()..)) {
        (Some(head), Some(board)) =>
            head.eq_ignore_ascii_case(prefix) && board.chars().all(|c| c.is_ascii_digit()),
        _ => false,
    }
}

impl FromStr for Resource {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        let malformed = || Error::Config(format!("malformed resource name {:?}", name));
        let parts = name.split("::").collect::<Vec<_>>();
        match parts.as_slice() {
            [bus, path] | [bus, path, "INSTR"] if has_bus_prefix(bus, "USB") && !path.is_empty() =>
                Ok(Resource::Usb { path: PathBuf::from(*path) }),
            [bus, host, port, "SOCKET"] if has_bus_prefix(bus, "TCPIP") && !host.is_empty() => {
                let port = port.parse().map_err(|_| malformed())?;
                Ok(Resource::Tcpip { host: host.to_string(), port })
            }
            _ => Err(malformed()),
        }
    }
}

impl TryFrom<String> for Resource {
    type Error = Error;

    fn try_from(name: String) -> Result<Self> {
        name.parse()
    }
}

/// Byte stream of an open system resource.
#[derive(Debug)]
pub enum Connection {
    Usb(File),
    Tcp(TcpStream),
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Usb(file) => file.read(buf),
            Self::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Usb(file) => file.write(buf),
            Self::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Usb(file) => file.flush(),
            Self::Tcp(stream) => stream.flush(),
        }
    }
}

/// Resources reachable from this host: USBTMC devices found by the kernel driver, plus
/// the sockets listed in the configuration.
#[derive(Debug, Clone)]
pub struct SystemResourceManager {
    config: TransportConfig,
}

impl SystemResourceManager {
    pub fn new(config: TransportConfig) -> SystemResourceManager {
        SystemResourceManager { config }
    }
}

impl ResourceManager for SystemResourceManager {
    type Transport = StreamTransport<Connection>;

    fn list_resources(&self) -> Result<Vec<Resource>> {
        let mut resources = imp::usbtmc_devices(&self.config.usbtmc_dir)?
            .into_iter()
            .map(|path| Resource::Usb { path })
            .collect::<Vec<_>>();
        resources.extend(self.config.resources.iter().cloned());
        log::debug!("list_resources() = {:?}", resources);
        Ok(resources)
    }

    fn open(&self, resource: &Resource) -> Result<Self::Transport> {
        log::debug!("open({})", resource);
        let connection = match resource {
            Resource::Usb { path } =>
                Connection::Usb(imp::open_usbtmc(path)?),
            Resource::Tcpip { host, port } =>
                Connection::Tcp(connect_tcp(host, *port, self.config.timeout)?),
        };
        Ok(StreamTransport::new(connection))
    }
}

fn connect_tcp(host: &str, port: u16, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_error = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
                stream.set_nodelay(true)?;
                return Ok(stream)
            }
            Err(error) => {
                log::debug!("connect({}) failed: {}", addr, error);
                last_error = Some(error)
            }
        }
    }
    Err(last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, format!("{} did not resolve", host))
    }))
}
