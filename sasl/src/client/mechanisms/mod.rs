//! Provides the client SASL mechanisms.

use crate::client::{Mechanism, MechanismConfig, MechanismError};
use crate::common::Credentials;

mod anonymous;
mod cram_md5;
mod digest_md5;
mod gssapi;
mod plain;

pub use self::anonymous::Anonymous;
pub use self::cram_md5::CramMd5;
pub use self::digest_md5::DigestMd5;
pub use self::gssapi::{ContextError, Gssapi, SecurityContext};
#[cfg(feature = "kerberos")]
#[cfg_attr(docsrs, doc(cfg(feature = "kerberos")))]
pub use self::gssapi::Krb5Context;
pub use self::plain::Plain;

/// Any of the mechanisms this crate implements.
///
/// Lets a caller hold whichever mechanism it picked behind one concrete type.
#[derive(Debug)]
pub enum ClientMechanism {
    /// ANONYMOUS, RFC 4505.
    Anonymous(Anonymous),
    /// PLAIN, RFC 4616.
    Plain(Plain),
    /// CRAM-MD5, RFC 2195.
    CramMd5(CramMd5),
    /// DIGEST-MD5, RFC 2831.
    DigestMd5(DigestMd5),
    /// GSSAPI, RFC 4752.
    Gssapi(Gssapi),
}

macro_rules! dispatch {
    ($self:expr, $mechanism:ident => $body:expr) => {
        match $self {
            ClientMechanism::Anonymous($mechanism) => $body,
            ClientMechanism::Plain($mechanism) => $body,
            ClientMechanism::CramMd5($mechanism) => $body,
            ClientMechanism::DigestMd5($mechanism) => $body,
            ClientMechanism::Gssapi($mechanism) => $body,
        }
    };
}

impl ClientMechanism {
    /// Builds the mechanism registered under `name`, compared case-insensitively.
    ///
    /// GSSAPI is only available with the `kerberos` feature, since it needs a
    /// native security context.
    pub fn from_name(name: &str, credentials: Credentials) -> Result<ClientMechanism, MechanismError> {
        match name.to_ascii_uppercase().as_str() {
            "ANONYMOUS" => Anonymous::from_credentials(credentials).map(Into::into),
            "PLAIN" => Plain::from_credentials(credentials).map(Into::into),
            "CRAM-MD5" => CramMd5::from_credentials(credentials).map(Into::into),
            "DIGEST-MD5" => DigestMd5::from_credentials(credentials).map(Into::into),
            #[cfg(feature = "kerberos")]
            "GSSAPI" => {
                let context: Box<dyn SecurityContext> = Box::new(Krb5Context::new());
                Gssapi::from_credentials(credentials, context).map(Into::into)
            }
            _ => Err(MechanismError::UnsupportedMechanism(name.to_owned())),
        }
    }
}

impl Mechanism for ClientMechanism {
    fn config(&self) -> &MechanismConfig {
        dispatch!(self, mechanism => mechanism.config())
    }

    fn bind_host(&mut self, host: &str) {
        dispatch!(self, mechanism => mechanism.bind_host(host))
    }

    fn step(&mut self, challenge: Option<&[u8]>) -> Result<Option<Vec<u8>>, MechanismError> {
        dispatch!(self, mechanism => mechanism.step(challenge))
    }

    fn wrap(&mut self, outgoing: &[u8]) -> Result<Vec<u8>, MechanismError> {
        dispatch!(self, mechanism => mechanism.wrap(outgoing))
    }

    fn unwrap(&mut self, incoming: &[u8]) -> Result<Vec<u8>, MechanismError> {
        dispatch!(self, mechanism => mechanism.unwrap(incoming))
    }

    fn dispose(&mut self) {
        dispatch!(self, mechanism => mechanism.dispose())
    }
}

impl From<Anonymous> for ClientMechanism {
    fn from(mechanism: Anonymous) -> ClientMechanism {
        ClientMechanism::Anonymous(mechanism)
    }
}

impl From<Plain> for ClientMechanism {
    fn from(mechanism: Plain) -> ClientMechanism {
        ClientMechanism::Plain(mechanism)
    }
}

impl From<CramMd5> for ClientMechanism {
    fn from(mechanism: CramMd5) -> ClientMechanism {
        ClientMechanism::CramMd5(mechanism)
    }
}

impl From<DigestMd5> for ClientMechanism {
    fn from(mechanism: DigestMd5) -> ClientMechanism {
        ClientMechanism::DigestMd5(mechanism)
    }
}

impl From<Gssapi> for ClientMechanism {
    fn from(mechanism: Gssapi) -> ClientMechanism {
        ClientMechanism::Gssapi(mechanism)
    }
}
