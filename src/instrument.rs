use std::fmt;

use crate::{Bus, Error, Resource, Result};
use crate::sys::{ResourceManager, Transport};
use crate::regs::{self, EventStatus};

const QUERY_IDN: &str = "*IDN?";

/// Parsed `*IDN?` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    pub firmware: String,
}

impl Identity {
    /// Parse a comma separated identification string. At least the manufacturer and the model
    /// must be present.
    pub fn parse(response: &str) -> Option<Identity> {
        let mut fields = response.trim().split(',').map(|field| field.trim().to_owned());
        let manufacturer = fields.next().filter(|field| !field.is_empty())?;
        let model = fields.next().filter(|field| !field.is_empty())?;
        Some(Identity {
            manufacturer,
            model,
            serial: fields.next().unwrap_or_default(),
            firmware: fields.next().unwrap_or_default(),
        })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} (serial {}, firmware {})",
            self.manufacturer, self.model, self.serial, self.firmware)
    }
}

/// An open session to one identified instrument.
///
/// The session is closed by `close()` or when the instrument is dropped, whichever comes first.
/// Every operation on a closed instrument fails with `Error::Closed`.
#[derive(Debug)]
pub struct Instrument<T: Transport> {
    resource: Resource,
    identity: Identity,
    transport: Option<T>,
}

impl<T: Transport> Instrument<T> {
    /// Open the first resource on `bus` whose identification reports `model`.
    pub fn open<M>(manager: &M, bus: Bus, model: &str) -> Result<Instrument<T>>
            where M: ResourceManager<Transport = T> {
        for resource in manager.list_resources()?.into_iter().filter(|r| r.bus() == bus) {
            let transport = match manager.open(&resource) {
                Ok(transport) => transport,
                Err(error) => {
                    log::warn!("skipping {}: {}", resource, error);
                    continue
                }
            };
            match Instrument::from_transport(resource.clone(), transport) {
                Ok(instrument) if instrument.identity.model == model => {
                    log::info!("found {} at {}", instrument.identity, resource);
                    return Ok(instrument)
                }
                Ok(instrument) =>
                    log::debug!("{} is {}, not {}", resource, instrument.identity.model, model),
                Err(error) =>
                    log::warn!("skipping {}: {}", resource, error),
            }
        }
        Err(Error::DeviceNotFound { model: model.to_owned(), bus })
    }

    /// Take ownership of an open transport and identify the instrument behind it.
    pub fn from_transport(resource: Resource, mut transport: T) -> Result<Instrument<T>> {
        transport.write_line(QUERY_IDN)?;
        let response = transport.read_line()?;
        let identity = Identity::parse(&response)
            .ok_or_else(|| Error::InvalidResponse { command: QUERY_IDN.to_owned(), response })?;
        Ok(Instrument { resource, identity, transport: Some(transport) })
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    fn transport(&mut self) -> Result<&mut T> {
        self.transport.as_mut().ok_or(Error::Closed)
    }

    pub fn write(&mut self, command: &str) -> Result<()> {
        log::trace!("{}: write({:?})", self.resource, command);
        self.transport()?.write_line(command)
    }

    pub fn query(&mut self, command: &str) -> Result<String> {
        let transport = self.transport()?;
        transport.write_line(command)?;
        let response = transport.read_line()?;
        log::trace!("{}: query({:?}) = {:?}", self.resource, command, response);
        Ok(response)
    }

    pub fn query_f64(&mut self, command: &str) -> Result<f64> {
        let response = self.query(command)?;
        response.trim().parse()
            .map_err(|_| Error::InvalidResponse { command: command.to_owned(), response })
    }

    pub fn read_raw(&mut self) -> Result<Vec<u8>> {
        let data = self.transport()?.read_block()?;
        log::trace!("{}: read_raw() = {} bytes", self.resource, data.len());
        Ok(data)
    }

    /// Query the identification again, e.g. to check the session is still alive.
    pub fn identify(&mut self) -> Result<Identity> {
        let response = self.query(QUERY_IDN)?;
        Identity::parse(&response)
            .ok_or_else(|| Error::InvalidResponse { command: QUERY_IDN.to_owned(), response })
    }

    /// Read (and thereby clear) the standard event status register.
    pub fn event_status(&mut self) -> Result<EventStatus> {
        let response = self.query(regs::QUERY_ESR)?;
        let bits = response.trim().parse::<u8>()
            .map_err(|_| Error::InvalidResponse { command: regs::QUERY_ESR.to_owned(), response })?;
        let status = EventStatus::from_bits_retain(bits);
        log::debug!("{}: event_status() = {:?}", self.resource, status);
        Ok(status)
    }

    pub fn clear_status(&mut self) -> Result<()> {
        self.write(regs::CLEAR_STATUS)
    }

    /// Close the session. Closing an already closed instrument does nothing.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut transport) = self.transport.take() {
            log::debug!("closing {}", self.resource);
            transport.close()?;
        }
        Ok(())
    }
}

impl<T: Transport> Drop for Instrument<T> {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            log::warn!("error closing {}: {}", self.resource, error);
        }
    }
}
