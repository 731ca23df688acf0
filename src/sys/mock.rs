//! Scripted instruments for tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use crate::{Error, Instrument, Resource, Result};
use super::{ResourceManager, Transport};

pub type Responder = Box<dyn FnMut(&str) -> Option<Vec<u8>>>;

/// Text response, terminator included.
pub fn line(text: impl std::fmt::Display) -> Option<Vec<u8>> {
    Some(format!("{}\n", text).into_bytes())
}

/// Waveform data block: 12 byte header, payload, terminator.
///
/// The header is the 11 byte `#9<length>` block header padded with a space, reproducing the
/// fixed 12 byte framing `decode_block` strips. A real DS1000Z sends the unpadded header.
pub fn block(payload: &[u8]) -> Option<Vec<u8>> {
    let mut data = format!("#9{:09} ", payload.len()).into_bytes();
    data.extend_from_slice(payload);
    data.push(b'\n');
    Some(data)
}

pub fn idn(model: &str) -> String {
    format!("RIGOL TECHNOLOGIES,{},MOCK0001,00.01.01", model)
}

/// Everything written to a mock transport, shared with the test after the transport is moved
/// into an instrument.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    commands: Rc<RefCell<Vec<String>>>,
    closed: Rc<Cell<usize>>,
}

impl Journal {
    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.commands.borrow().iter().filter(|c| c.as_str() == command).count()
    }

    pub fn clear(&self) {
        self.commands.borrow_mut().clear()
    }

    pub fn closed(&self) -> usize {
        self.closed.get()
    }
}

pub struct MockTransport {
    journal: Journal,
    respond: Responder,
    pending: VecDeque<Vec<u8>>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("MockTransport").field("journal", &self.journal).finish_non_exhaustive()
    }
}

impl MockTransport {
    pub fn new<F>(respond: F) -> (MockTransport, Journal)
            where F: FnMut(&str) -> Option<Vec<u8>> + 'static {
        let journal = Journal::default();
        let transport = MockTransport {
            journal: journal.clone(),
            respond: Box::new(respond),
            pending: VecDeque::new(),
        };
        (transport, journal)
    }

    /// An identified instrument of `model`; the identification query is not journaled.
    pub fn instrument<F>(model: &str, mut respond: F) -> (Instrument<MockTransport>, Journal)
            where F: FnMut(&str) -> Option<Vec<u8>> + 'static {
        let identity = idn(model);
        let (transport, journal) = MockTransport::new(move |command| {
            if command == "*IDN?" { line(&identity) } else { respond(command) }
        });
        let resource = Resource::Usb { path: format!("/dev/mock-{}", model).into() };
        let instrument = Instrument::from_transport(resource, transport)
            .expect("mock identification failed");
        journal.clear();
        (instrument, journal)
    }

    fn next_response(&mut self) -> Result<Vec<u8>> {
        self.pending.pop_front()
            .ok_or_else(|| Error::Transport(io::Error::new(io::ErrorKind::TimedOut, "no response")))
    }
}

impl Transport for MockTransport {
    fn write_line(&mut self, line: &str) -> Result<()> {
        self.journal.commands.borrow_mut().push(line.to_owned());
        if let Some(response) = (self.respond)(line) {
            self.pending.push_back(response);
        }
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        let mut response = self.next_response()?;
        if response.last() == Some(&b'\n') {
            response.pop();
        }
        Ok(String::from_utf8(response).expect("mock response is not UTF-8"))
    }

    fn read_block(&mut self) -> Result<Vec<u8>> {
        self.next_response()
    }

    fn close(&mut self) -> Result<()> {
        self.journal.closed.set(self.journal.closed.get() + 1);
        Ok(())
    }
}

/// A bus with a fixed set of instruments that only answer identification queries.
#[derive(Debug, Default)]
pub struct MockResourceManager {
    devices: Vec<(Resource, Option<String>)>,
    pub opened: RefCell<Vec<Resource>>,
    pub journals: RefCell<Vec<Journal>>,
}

impl MockResourceManager {
    pub fn device(mut self, resource: &str, idn: &str) -> Self {
        let resource = resource.parse().expect("mock resource name");
        self.devices.push((resource, Some(idn.to_owned())));
        self
    }

    /// A resource that is listed but cannot be opened.
    pub fn unreachable(mut self, resource: &str) -> Self {
        let resource = resource.parse().expect("mock resource name");
        self.devices.push((resource, None));
        self
    }
}

impl ResourceManager for MockResourceManager {
    type Transport = MockTransport;

    fn list_resources(&self) -> Result<Vec<Resource>> {
        Ok(self.devices.iter().map(|(resource, _)| resource.clone()).collect())
    }

    fn open(&self, resource: &Resource) -> Result<MockTransport> {
        let (_, idn) = self.devices.iter().find(|(candidate, _)| candidate == resource)
            .expect("opened a resource that was never listed");
        let idn = idn.clone()
            .ok_or_else(|| Error::Transport(io::Error::new(io::ErrorKind::PermissionDenied, "busy")))?;
        self.opened.borrow_mut().push(resource.clone());
        let (transport, journal) = MockTransport::new(move |command| {
            if command == "*IDN?" { line(&idn) } else { None }
        });
        self.journals.borrow_mut().push(journal);
        Ok(transport)
    }
}
