use log::{debug, trace};

use crate::client::mechanisms::ClientMechanism;
use crate::client::{Mechanism, MechanismConfig, MechanismError};

/// Drives one SASL exchange with a given host.
///
/// Holds the mechanism picked for this connection, binds it to the host and
/// forwards the exchange and the security layer to it.
#[derive(Debug)]
pub struct Client<M: Mechanism = ClientMechanism> {
    host: String,
    mechanism: M,
}

impl<M: Mechanism> Client<M> {
    /// Creates a client authenticating to `host` with `mechanism`.
    pub fn new<H: Into<String>>(host: H, mut mechanism: M) -> Client<M> {
        let host = host.into();
        mechanism.bind_host(&host);
        debug!("SASL {} client for {}", mechanism.name(), host);
        Client { host, mechanism }
    }

    /// The host this client authenticates to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The mechanism in use.
    pub fn mechanism(&self) -> &M {
        &self.mechanism
    }

    /// Mutable access to the mechanism in use.
    pub fn mechanism_mut(&mut self) -> &mut M {
        &mut self.mechanism
    }

    /// The negotiated properties of the mechanism.
    pub fn config(&self) -> &MechanismConfig {
        self.mechanism.config()
    }

    /// Whether the exchange has produced its final response.
    pub fn is_complete(&self) -> bool {
        self.mechanism.is_complete()
    }

    /// Produces the initial response, if the mechanism has one.
    pub fn start(&mut self) -> Result<Option<Vec<u8>>, MechanismError> {
        self.step(None)
    }

    /// Answers a server challenge.
    pub fn step(&mut self, challenge: Option<&[u8]>) -> Result<Option<Vec<u8>>, MechanismError> {
        trace!(
            "SASL {} challenge of {} bytes",
            self.mechanism.name(),
            challenge.map_or(0, <[u8]>::len)
        );
        let response = self.mechanism.step(challenge)?;
        if self.mechanism.is_complete() {
            debug!("SASL {} exchange with {} complete", self.mechanism.name(), self.host);
        }
        Ok(response)
    }

    /// Protects outgoing data with the negotiated security layer.
    pub fn wrap(&mut self, outgoing: &[u8]) -> Result<Vec<u8>, MechanismError> {
        self.mechanism.wrap(outgoing)
    }

    /// Removes the security layer from incoming data.
    pub fn unwrap(&mut self, incoming: &[u8]) -> Result<Vec<u8>, MechanismError> {
        self.mechanism.unwrap(incoming)
    }

    /// Wipes secrets and releases native resources held by the mechanism.
    pub fn dispose(&mut self) {
        self.mechanism.dispose()
    }
}
