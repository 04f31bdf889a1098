//! Client side of a SASL exchange: the mechanism contract and the [`Client`] driving it.

use crate::client::mechanisms::ContextError;
use crate::common::ChallengeError;
use std::error::Error as StdError;
use std::fmt;

mod config;
pub mod mechanisms;
mod session;

pub use self::config::MechanismConfig;
pub use self::session::Client;

/// Errors a mechanism can return from any of its operations.
#[derive(Debug, PartialEq)]
pub enum MechanismError {
    /// No mechanism of that name is available.
    UnsupportedMechanism(String),
    /// ANONYMOUS was given a password.
    AnonymousRequiresNoCredentials,

    /// The mechanism needs a username.
    MissingUsername,
    /// The mechanism needs a plaintext password.
    MissingPassword,
    /// The mechanism needs a service name.
    MissingService,

    /// The server challenge could not be decoded.
    Challenge(ChallengeError),
    /// The DIGEST-MD5 challenge carries no nonce.
    NoServerNonce,
    /// The message does not fit the current state of the exchange.
    InvalidState,
    /// The exchange already completed, no further steps are possible.
    AlreadyComplete,
    /// The server failed to prove knowledge of the shared secret.
    AuthenticationFailed,
    /// The HMAC key was rejected.
    InvalidKeyLength(hmac::digest::InvalidLength),

    /// The native security context failed.
    Context(ContextError),
    /// The security layer negotiation message does not decode to four bytes.
    InvalidSecurityLayerMessage {
        /// Length of the decoded message.
        length: usize,
    },
    /// The server advertised a maximum buffer size of zero.
    ZeroMaxLength,
    /// Wrap or unwrap was called before the security layer was negotiated.
    SecurityLayerNotReady,
    /// The mechanism was used after being disposed.
    Disposed,
}

impl From<ChallengeError> for MechanismError {
    fn from(err: ChallengeError) -> MechanismError {
        MechanismError::Challenge(err)
    }
}

impl From<ContextError> for MechanismError {
    fn from(err: ContextError) -> MechanismError {
        MechanismError::Context(err)
    }
}

impl From<hmac::digest::InvalidLength> for MechanismError {
    fn from(err: hmac::digest::InvalidLength) -> MechanismError {
        MechanismError::InvalidKeyLength(err)
    }
}

impl fmt::Display for MechanismError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "{}",
            match self {
                MechanismError::UnsupportedMechanism(name) =>
                    return write!(fmt, "unsupported mechanism: {}", name),
                MechanismError::AnonymousRequiresNoCredentials =>
                    "ANONYMOUS mechanism requires no credentials",

                MechanismError::MissingUsername => "mechanism requires a username",
                MechanismError::MissingPassword => "mechanism requires a plaintext password",
                MechanismError::MissingService => "mechanism requires a service name",

                MechanismError::Challenge(err) => return write!(fmt, "can't decode challenge: {}", err),
                MechanismError::NoServerNonce => "no server nonce",
                MechanismError::InvalidState => "not in the right state to receive this challenge",
                MechanismError::AlreadyComplete => "SASL exchange already complete",
                MechanismError::AuthenticationFailed => "server authentication failed",
                MechanismError::InvalidKeyLength(err) =>
                    return write!(fmt, "invalid key length: {}", err),

                MechanismError::Context(err) => return write!(fmt, "security context error: {}", err),
                MechanismError::InvalidSecurityLayerMessage { length } =>
                    return write!(
                        fmt,
                        "security layer message should be 4 bytes long, got {}",
                        length
                    ),
                MechanismError::ZeroMaxLength =>
                    "server advertised a zero maximum length, it doesn't support a security layer",
                MechanismError::SecurityLayerNotReady => "security layer not negotiated yet",
                MechanismError::Disposed => "mechanism already disposed",
            }
        )
    }
}

impl StdError for MechanismError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            MechanismError::Challenge(err) => Some(err),
            MechanismError::Context(err) => Some(err),
            _ => None,
        }
    }
}

/// A trait which defines client-side SASL mechanisms.
///
/// A mechanism is a single-session state machine. Feed it server challenges
/// through [`step`](Mechanism::step) until [`is_complete`](Mechanism::is_complete)
/// turns true, then pass application traffic through
/// [`wrap`](Mechanism::wrap) and [`unwrap`](Mechanism::unwrap).
pub trait Mechanism {
    /// The negotiated properties of this mechanism.
    fn config(&self) -> &MechanismConfig;

    /// The name of the mechanism.
    fn name(&self) -> &str {
        self.config().name()
    }

    /// Whether the exchange has produced its final response.
    ///
    /// Once true, stays true for the lifetime of the mechanism.
    fn is_complete(&self) -> bool {
        self.config().is_complete()
    }

    /// Tells the mechanism which host it is authenticating to.
    fn bind_host(&mut self, _host: &str) {}

    /// Provides the initial response, same as `step(None)`.
    fn start(&mut self) -> Result<Option<Vec<u8>>, MechanismError> {
        self.step(None)
    }

    /// Creates a response to the server challenge.
    ///
    /// `None` asks for the initial client response. A `None` result means
    /// nothing has to be sent back.
    fn step(&mut self, challenge: Option<&[u8]>) -> Result<Option<Vec<u8>>, MechanismError>;

    /// Protects outgoing application data with the negotiated security layer.
    fn wrap(&mut self, outgoing: &[u8]) -> Result<Vec<u8>, MechanismError> {
        Ok(outgoing.to_vec())
    }

    /// Removes the security layer from incoming application data.
    fn unwrap(&mut self, incoming: &[u8]) -> Result<Vec<u8>, MechanismError> {
        Ok(incoming.to_vec())
    }

    /// Wipes secrets and releases native resources. Safe to call repeatedly.
    fn dispose(&mut self) {}
}
