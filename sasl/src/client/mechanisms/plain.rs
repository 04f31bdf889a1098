//! Provides the SASL "PLAIN" mechanism.

use crate::client::{Mechanism, MechanismConfig, MechanismError};
use crate::common::{Credentials, UserPassword};

/// A struct for the SASL PLAIN mechanism.
#[derive(Debug)]
pub struct Plain {
    config: MechanismConfig,
    creds: UserPassword,
}

impl Plain {
    /// Constructs a new struct for authenticating using the SASL PLAIN mechanism.
    ///
    /// It is recommended that instead you use a `Credentials` struct and turn it into the
    /// requested mechanism using `from_credentials`.
    pub fn new<N: Into<String>, P: Into<String>>(username: N, password: P) -> Plain {
        Plain {
            config: MechanismConfig::new("PLAIN")
                .with_score(1)
                .with_initial_response()
                .with_flags(false, true, false, false),
            creds: UserPassword::new(username, password),
        }
    }

    /// Acts on behalf of `authorization_id` instead of the username.
    pub fn with_authorization_id<A: Into<String>>(mut self, authorization_id: A) -> Plain {
        self.config.set_authorization_id(Some(authorization_id.into()));
        self
    }

    /// Creates this mechanism from `Credentials`.
    pub fn from_credentials(credentials: Credentials) -> Result<Plain, MechanismError> {
        let creds = UserPassword::from_credentials(&credentials)?;
        let mut plain = Plain::new(creds.username.as_str(), creds.password.as_str());
        plain.config.set_authorization_id(credentials.authorization_id);
        Ok(plain)
    }
}

impl Mechanism for Plain {
    fn config(&self) -> &MechanismConfig {
        &self.config
    }

    fn step(&mut self, _challenge: Option<&[u8]>) -> Result<Option<Vec<u8>>, MechanismError> {
        self.config.ensure_incomplete()?;
        self.creds.ensure_available()?;
        let mut auth = Vec::new();
        if let Some(authorization_id) = self.config.authorization_id() {
            auth.extend(authorization_id.bytes());
        }
        auth.push(0);
        auth.extend(self.creds.username.bytes());
        auth.push(0);
        auth.extend(self.creds.password.bytes());
        self.config.mark_complete();
        Ok(Some(auth))
    }

    fn dispose(&mut self) {
        self.creds.clear();
    }
}
