//! Provides the SASL "CRAM-MD5" mechanism.

use hmac::{Hmac, Mac};
use md5::Md5;

use crate::client::{Mechanism, MechanismConfig, MechanismError};
use crate::common::{Credentials, UserPassword};

type HmacMd5 = Hmac<Md5>;

/// A struct for the SASL CRAM-MD5 mechanism.
///
/// The server speaks first; the single response is the username followed
/// by the HMAC-MD5 of the challenge keyed with the password.
#[derive(Debug)]
pub struct CramMd5 {
    config: MechanismConfig,
    creds: UserPassword,
}

impl CramMd5 {
    /// Constructs a new struct for authenticating using the SASL CRAM-MD5 mechanism.
    pub fn new<N: Into<String>, P: Into<String>>(username: N, password: P) -> CramMd5 {
        CramMd5 {
            config: MechanismConfig::new("CRAM-MD5")
                .with_score(20)
                .with_flags(false, false, false, false),
            creds: UserPassword::new(username, password),
        }
    }

    /// Creates this mechanism from `Credentials`.
    pub fn from_credentials(credentials: Credentials) -> Result<CramMd5, MechanismError> {
        Ok(CramMd5 {
            creds: UserPassword::from_credentials(&credentials)?,
            ..CramMd5::new("", "")
        })
    }
}

impl Mechanism for CramMd5 {
    fn config(&self) -> &MechanismConfig {
        &self.config
    }

    fn step(&mut self, challenge: Option<&[u8]>) -> Result<Option<Vec<u8>>, MechanismError> {
        self.config.ensure_incomplete()?;
        self.creds.ensure_available()?;
        let challenge = match challenge {
            Some(challenge) => challenge,
            None => return Ok(None),
        };
        let mut mac = HmacMd5::new_from_slice(self.creds.password.as_bytes())?;
        mac.update(challenge);
        let digest = mac.finalize().into_bytes();

        let mut response = Vec::with_capacity(self.creds.username.len() + 1 + digest.len());
        response.extend(self.creds.username.bytes());
        response.push(b' ');
        response.extend_from_slice(&digest);
        self.config.mark_complete();
        Ok(Some(response))
    }

    fn dispose(&mut self) {
        self.creds.clear();
    }
}
