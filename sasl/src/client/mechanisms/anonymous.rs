//! Provides the SASL "ANONYMOUS" mechanism.

use crate::client::{Mechanism, MechanismConfig, MechanismError};
use crate::common::{Credentials, Secret};

const TRACE: &[u8] = b"Anonymous, None";

/// A struct for the SASL ANONYMOUS mechanism.
#[derive(Debug)]
pub struct Anonymous {
    config: MechanismConfig,
}

impl Anonymous {
    /// Constructs a new struct for authenticating using the SASL ANONYMOUS mechanism.
    ///
    /// It is recommended that instead you use a `Credentials` struct and turn it into the
    /// requested mechanism using `from_credentials`.
    pub fn new() -> Anonymous {
        Anonymous {
            config: MechanismConfig::new("ANONYMOUS")
                .with_initial_response()
                .with_flags(true, false, false, true),
        }
    }

    /// Creates this mechanism from `Credentials`, which must hold no secret.
    pub fn from_credentials(credentials: Credentials) -> Result<Anonymous, MechanismError> {
        if let Secret::None = credentials.secret {
            Ok(Anonymous::new())
        } else {
            Err(MechanismError::AnonymousRequiresNoCredentials)
        }
    }
}

impl Default for Anonymous {
    fn default() -> Anonymous {
        Anonymous::new()
    }
}

impl Mechanism for Anonymous {
    fn config(&self) -> &MechanismConfig {
        &self.config
    }

    fn step(&mut self, _challenge: Option<&[u8]>) -> Result<Option<Vec<u8>>, MechanismError> {
        self.config.ensure_incomplete()?;
        self.config.mark_complete();
        Ok(Some(TRACE.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Credentials;

    #[test]
    fn anonymous_works() {
        let mut mechanism = Anonymous::new();
        assert_eq!(mechanism.name(), "ANONYMOUS");
        assert!(!mechanism.is_complete());
        let response = mechanism.step(Some(b"ignored")).unwrap();
        assert_eq!(response.as_deref(), Some(&b"Anonymous, None"[..]));
        assert!(mechanism.is_complete());
    }

    #[test]
    fn no_step_after_completion() {
        let mut mechanism = Anonymous::new();
        mechanism.start().unwrap();
        assert_eq!(mechanism.step(None), Err(MechanismError::AlreadyComplete));
        assert!(mechanism.is_complete());
    }

    #[test]
    fn rejects_password() {
        let creds = Credentials::default().with_password("pencil");
        assert_eq!(
            Anonymous::from_credentials(creds).unwrap_err(),
            MechanismError::AnonymousRequiresNoCredentials
        );
        assert!(Anonymous::from_credentials(Credentials::default()).is_ok());
    }

    #[test]
    fn dispose_twice() {
        let mut mechanism = Anonymous::new();
        mechanism.dispose();
        mechanism.dispose();
    }
}
