//! Types shared by every mechanism: credentials, secrets, the challenge codec and QOP flags.

use zeroize::{Zeroize, Zeroizing};

pub mod challenge;
pub mod qop;

pub use self::challenge::{encode_challenge, parse_challenge, quote, Challenge, ChallengeError};
pub use self::qop::{select_qop, Qop, QopSet, DEFAULT_MAX_LENGTH, MAX_SECURITY_LAYER_LENGTH};

/// The identity a client authenticates as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identity {
    /// No identity, used by ANONYMOUS and GSSAPI.
    None,
    /// A username.
    Username(String),
}

impl From<String> for Identity {
    fn from(s: String) -> Identity {
        Identity::Username(s)
    }
}

impl<'a> From<&'a str> for Identity {
    fn from(s: &'a str) -> Identity {
        Identity::Username(s.to_owned())
    }
}

/// A struct containing SASL credentials.
#[derive(Clone, Debug)]
pub struct Credentials {
    /// The requested identity.
    pub identity: Identity,
    /// The secret used to authenticate.
    pub secret: Secret,
    /// Identity to act as, if different from the authenticating one.
    pub authorization_id: Option<String>,
    /// Registered service name, used to build the DIGEST-MD5 digest-uri
    /// and the GSSAPI service principal.
    pub service: Option<String>,
}

impl Default for Credentials {
    fn default() -> Credentials {
        Credentials {
            identity: Identity::None,
            secret: Secret::None,
            authorization_id: None,
            service: None,
        }
    }
}

impl Credentials {
    /// Creates a new Credentials with the specified username.
    pub fn with_username<N: Into<String>>(mut self, username: N) -> Credentials {
        self.identity = Identity::Username(username.into());
        self
    }

    /// Creates a new Credentials with the specified plaintext password.
    pub fn with_password<P: Into<String>>(mut self, password: P) -> Credentials {
        self.secret = Secret::password(password);
        self
    }

    /// Creates a new Credentials acting on behalf of `authorization_id`.
    ///
    /// An empty string is treated as no authorization identity.
    pub fn with_authorization_id<A: Into<String>>(mut self, authorization_id: A) -> Credentials {
        let authorization_id = authorization_id.into();
        self.authorization_id = if authorization_id.is_empty() {
            None
        } else {
            Some(authorization_id)
        };
        self
    }

    /// Creates a new Credentials for the given service name, e.g. `imap` or `hive`.
    pub fn with_service<S: Into<String>>(mut self, service: S) -> Credentials {
        self.service = Some(service.into());
        self
    }
}

/// Represents a SASL secret, like a password.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Secret {
    /// No extra data needed.
    None,
    /// Plaintext password required.
    Password(String),
}

impl Secret {
    /// Wraps a plaintext password.
    pub fn password<S: Into<String>>(password: S) -> Secret {
        Secret::Password(password.into())
    }
}

/// Username and password held by the password based mechanisms.
///
/// PLAIN, CRAM-MD5 and DIGEST-MD5 each own one of these; the password is
/// wiped on [`UserPassword::clear`] and again when dropped.
#[derive(Clone)]
pub(crate) struct UserPassword {
    pub(crate) username: String,
    pub(crate) password: Zeroizing<String>,
    cleared: bool,
}

impl UserPassword {
    pub(crate) fn new<N: Into<String>, P: Into<String>>(username: N, password: P) -> UserPassword {
        UserPassword {
            username: username.into(),
            password: Zeroizing::new(password.into()),
            cleared: false,
        }
    }

    /// Pulls a username and a plaintext password out of `credentials`.
    pub(crate) fn from_credentials(
        credentials: &Credentials,
    ) -> Result<UserPassword, crate::client::MechanismError> {
        use crate::client::MechanismError;
        match (&credentials.identity, &credentials.secret) {
            (Identity::Username(username), Secret::Password(password)) => {
                Ok(UserPassword::new(username.as_str(), password.as_str()))
            }
            (Identity::None, _) => Err(MechanismError::MissingUsername),
            (_, Secret::None) => Err(MechanismError::MissingPassword),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.password.zeroize();
        self.cleared = true;
    }

    /// Fails with [`Disposed`](crate::client::MechanismError::Disposed) once cleared.
    pub(crate) fn ensure_available(&self) -> Result<(), crate::client::MechanismError> {
        if self.cleared {
            Err(crate::client::MechanismError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for UserPassword {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("UserPassword")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MechanismError;

    #[test]
    fn builder_sets_fields() {
        let creds = Credentials::default()
            .with_username("user")
            .with_password("pencil")
            .with_authorization_id("admin")
            .with_service("imap");
        assert_eq!(creds.identity, Identity::Username("user".to_owned()));
        assert_eq!(creds.secret, Secret::Password("pencil".to_owned()));
        assert_eq!(creds.authorization_id.as_deref(), Some("admin"));
        assert_eq!(creds.service.as_deref(), Some("imap"));
    }

    #[test]
    fn empty_authorization_id_is_none() {
        let creds = Credentials::default().with_authorization_id("");
        assert_eq!(creds.authorization_id, None);
    }

    #[test]
    fn user_password_requires_both() {
        let creds = Credentials::default().with_password("pencil");
        assert_eq!(
            UserPassword::from_credentials(&creds).unwrap_err(),
            MechanismError::MissingUsername
        );
        let creds = Credentials::default().with_username("user");
        assert_eq!(
            UserPassword::from_credentials(&creds).unwrap_err(),
            MechanismError::MissingPassword
        );
    }

    #[test]
    fn clear_wipes_password() {
        let mut up = UserPassword::new("user", "pencil");
        assert_eq!(up.ensure_available(), Ok(()));
        up.clear();
        assert_eq!(up.ensure_available(), Err(MechanismError::Disposed));
        assert!(up.password.is_empty());
        assert_eq!(up.username, "user");
        assert!(!format!("{:?}", up).contains("pencil"));
    }
}
