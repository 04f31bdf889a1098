use std::error::Error as StdError;
use std::fmt;

/// An error from the native GSSAPI layer.
#[derive(Debug)]
pub struct ContextError {
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ContextError {
    /// Creates an error carrying only a message.
    pub fn new<M: Into<String>>(message: M) -> ContextError {
        ContextError {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an error coming out of the native layer.
    pub fn from_source<E: StdError + Send + Sync + 'static>(err: E) -> ContextError {
        ContextError {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ContextError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(&self.message)
    }
}

impl StdError for ContextError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|err| err.as_ref() as &(dyn StdError + 'static))
    }
}

// Native errors carry no comparable state beyond their message.
impl PartialEq for ContextError {
    fn eq(&self, other: &ContextError) -> bool {
        self.message == other.message
    }
}

/// The native GSSAPI security context the GSSAPI mechanism drives.
///
/// An implementation owns one initiator context. The mechanism calls
/// [`establish`](SecurityContext::establish) until
/// [`established_identity`](SecurityContext::established_identity) reports
/// who we are, then uses [`wrap`](SecurityContext::wrap) and
/// [`unwrap`](SecurityContext::unwrap) for the security layer.
pub trait SecurityContext {
    /// Runs one round of context establishment towards `target`, feeding it
    /// the server token if there is one. Returns the token for the server,
    /// possibly empty.
    fn establish(&mut self, target: &str, token: Option<&[u8]>) -> Result<Vec<u8>, ContextError>;

    /// Our own principal, once the context is established.
    fn established_identity(&mut self) -> Option<String>;

    /// Whether the context can protect message integrity.
    fn integrity_available(&mut self) -> bool;

    /// Whether the context can encrypt messages.
    fn confidentiality_available(&mut self) -> bool;

    /// Protects `buffer`, encrypting it if `confidential` is set.
    fn wrap(&mut self, buffer: &[u8], confidential: bool) -> Result<Vec<u8>, ContextError>;

    /// Verifies and, if needed, decrypts `buffer`.
    fn unwrap(&mut self, buffer: &[u8]) -> Result<Vec<u8>, ContextError>;

    /// Releases the native context. Called at most once by the mechanism.
    fn dispose(&mut self);
}

impl<C: SecurityContext + ?Sized> SecurityContext for Box<C> {
    fn establish(&mut self, target: &str, token: Option<&[u8]>) -> Result<Vec<u8>, ContextError> {
        (**self).establish(target, token)
    }

    fn established_identity(&mut self) -> Option<String> {
        (**self).established_identity()
    }

    fn integrity_available(&mut self) -> bool {
        (**self).integrity_available()
    }

    fn confidentiality_available(&mut self) -> bool {
        (**self).confidentiality_available()
    }

    fn wrap(&mut self, buffer: &[u8], confidential: bool) -> Result<Vec<u8>, ContextError> {
        (**self).wrap(buffer, confidential)
    }

    fn unwrap(&mut self, buffer: &[u8]) -> Result<Vec<u8>, ContextError> {
        (**self).unwrap(buffer)
    }

    fn dispose(&mut self) {
        (**self).dispose()
    }
}
