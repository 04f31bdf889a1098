//! Provides the SASL "GSSAPI" mechanism and its security layer.
//!
//! The exchange runs in three stages. First the native context sends its
//! initial token, then tokens go back and forth until the context knows who
//! we are, and finally client and server agree on a quality of protection
//! and a maximum buffer size through one message each way, as described in
//! RFC 4752.

use log::{debug, trace, warn};

use crate::client::{Mechanism, MechanismConfig, MechanismError};
use crate::common::{
    select_qop, Credentials, Qop, QopSet, DEFAULT_MAX_LENGTH, MAX_SECURITY_LAYER_LENGTH,
};

mod context;
#[cfg(feature = "kerberos")]
mod krb5;

pub use self::context::{ContextError, SecurityContext};
#[cfg(feature = "kerberos")]
#[cfg_attr(docsrs, doc(cfg(feature = "kerberos")))]
pub use self::krb5::Krb5Context;

/// Placeholder in a service principal replaced by the host we connect to.
const HOST_PLACEHOLDER: &str = "_HOST";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Init,
    Establishing,
    Negotiating,
    Complete,
    Failed,
}

/// A struct for the SASL GSSAPI mechanism.
///
/// Generic over the native context so the state machine can run on top of
/// Kerberos (see `Krb5Context`, behind the `kerberos` feature) or anything
/// else implementing [`SecurityContext`].
pub struct Gssapi<C: SecurityContext = Box<dyn SecurityContext>> {
    config: MechanismConfig,
    service: String,
    host: String,
    context: Option<C>,
    stage: Stage,
    user: Option<String>,
    qop: Option<Qop>,
    supported_qop: QopSet,
    user_select_qop: QopSet,
    server_max_length: u32,
    max_length: u32,
}

impl<C: SecurityContext> Gssapi<C> {
    /// Constructs a new struct for authenticating to `service` through `context`.
    ///
    /// `service` is either a bare service name such as `hive`, combined with
    /// the host into `hive/host`, or a full principal like
    /// `hive/_HOST@EXAMPLE.COM` in which `_HOST` is replaced by the host.
    pub fn new<S: Into<String>>(service: S, context: C) -> Gssapi<C> {
        Gssapi {
            config: MechanismConfig::new("GSSAPI")
                .with_score(100)
                .with_initial_response()
                .with_flags(false, false, true, true)
                .with_qop(QopSet::ALL),
            service: service.into(),
            host: String::new(),
            context: Some(context),
            stage: Stage::Init,
            user: None,
            qop: None,
            supported_qop: QopSet::from(Qop::Auth),
            user_select_qop: QopSet::ALL,
            server_max_length: 0,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }

    /// Creates this mechanism from `Credentials`, which must name a service.
    pub fn from_credentials(credentials: Credentials, context: C) -> Result<Gssapi<C>, MechanismError> {
        let service = credentials.service.ok_or(MechanismError::MissingService)?;
        let mut gssapi = Gssapi::new(service, context);
        gssapi.config.set_authorization_id(credentials.authorization_id);
        Ok(gssapi)
    }

    /// Restricts the security layers we are willing to negotiate.
    pub fn with_qop(mut self, qop: QopSet) -> Gssapi<C> {
        self.user_select_qop = qop;
        self
    }

    /// Sets the largest buffer we accept through the security layer.
    ///
    /// Values above 2²⁴ - 1 are clamped, the wire format has three bytes for it.
    pub fn with_max_length(mut self, max_length: u32) -> Gssapi<C> {
        self.max_length = max_length.min(MAX_SECURITY_LAYER_LENGTH);
        self
    }

    /// Acts on behalf of `authorization_id` instead of the authenticated principal.
    pub fn with_authorization_id<A: Into<String>>(mut self, authorization_id: A) -> Gssapi<C> {
        self.config.set_authorization_id(Some(authorization_id.into()));
        self
    }

    /// The principal the context is established for.
    pub fn target_principal(&self) -> String {
        let (service, rest) = match self.service.split_once('/') {
            Some(split) => split,
            None => return format!("{}/{}", self.service, self.host),
        };
        match rest.strip_prefix(HOST_PLACEHOLDER) {
            Some(tail)
                if !service.is_empty()
                    && (tail.is_empty() || tail.starts_with('@') || tail.starts_with('/')) =>
            {
                format!("{}/{}{}", service, self.host, tail)
            }
            _ => self.service.clone(),
        }
    }

    /// Our principal, as reported by the established context.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// The negotiated quality of protection, `None` until complete or if none
    /// could be agreed on.
    pub fn qop(&self) -> Option<Qop> {
        self.qop
    }

    /// Security layers the established context can provide.
    pub fn supported_qop(&self) -> QopSet {
        self.supported_qop
    }

    /// Largest buffer the server accepts, zero until it said so.
    pub fn server_max_length(&self) -> u32 {
        self.server_max_length
    }

    /// Largest buffer we accept; reset to zero when no QOP could be agreed on.
    pub fn max_length(&self) -> u32 {
        self.max_length
    }

    /// The buffer size both sides agreed on, zero meaning no security layer.
    pub fn negotiated_max_length(&self) -> u32 {
        self.max_length.min(self.server_max_length)
    }

    /// The native context, until disposed.
    pub fn context(&self) -> Option<&C> {
        self.context.as_ref()
    }

    fn release_context(&mut self) {
        if let Some(mut context) = self.context.take() {
            debug!("GSSAPI releasing security context");
            context.dispose();
        }
    }

    fn fail(&mut self, err: MechanismError) -> MechanismError {
        warn!("GSSAPI negotiation failed: {}", err);
        self.stage = Stage::Failed;
        self.release_context();
        err
    }

    fn establish(&mut self, token: Option<&[u8]>) -> Result<Vec<u8>, MechanismError> {
        let target = self.target_principal();
        let context = self.context.as_mut().ok_or(MechanismError::Disposed)?;
        match context.establish(&target, token) {
            Ok(output) => {
                trace!(
                    "GSSAPI context step for {}: {} bytes in, {} bytes out",
                    target,
                    token.map_or(0, <[u8]>::len),
                    output.len()
                );
                Ok(output)
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    fn negotiate(&mut self, challenge: &[u8]) -> Result<Vec<u8>, MechanismError> {
        let context = self.context.as_mut().ok_or(MechanismError::Disposed)?;
        let data = context.unwrap(challenge)?;
        if data.len() != 4 {
            return Err(MechanismError::InvalidSecurityLayerMessage { length: data.len() });
        }
        let offered = QopSet::from_bits(data[0]);
        self.server_max_length = u32::from_be_bytes([0, data[1], data[2], data[3]]);
        if self.server_max_length == 0 {
            return Err(MechanismError::ZeroMaxLength);
        }

        self.qop = select_qop(self.user_select_qop, self.supported_qop, offered);
        match self.qop {
            Some(qop) => debug!("GSSAPI selected QOP {}", qop),
            None => {
                warn!(
                    "GSSAPI no common QOP (local {:#04x}, supported {:#04x}, offered {:#04x}), disabling security layer",
                    self.user_select_qop.bits(),
                    self.supported_qop.bits(),
                    offered.bits()
                );
                self.max_length = 0;
            }
        }

        let flag = self.qop.map_or(0, Qop::flag);
        let length = self.max_length.min(self.server_max_length);
        let header = ((u32::from(flag) << 24) | length).to_be_bytes();
        let identity = self
            .config
            .authorization_id()
            .or(self.user.as_deref())
            .unwrap_or_default();

        let mut message = Vec::with_capacity(header.len() + identity.len());
        message.extend_from_slice(&header);
        message.extend(identity.bytes());
        let wrapped = context.wrap(&message, false)?;

        self.stage = Stage::Complete;
        self.config.mark_complete();
        debug!("GSSAPI negotiation complete, max length {}", length);
        Ok(wrapped)
    }

    fn layer_context(&mut self) -> Result<Option<(&mut C, Qop)>, MechanismError> {
        if !self.config.is_complete() {
            return Err(MechanismError::SecurityLayerNotReady);
        }
        match self.qop {
            None | Some(Qop::Auth) => Ok(None),
            Some(qop) => {
                let context = self.context.as_mut().ok_or(MechanismError::Disposed)?;
                Ok(Some((context, qop)))
            }
        }
    }
}

impl<C: SecurityContext> Mechanism for Gssapi<C> {
    fn config(&self) -> &MechanismConfig {
        &self.config
    }

    fn bind_host(&mut self, host: &str) {
        self.host = host.to_owned();
    }

    fn step(&mut self, challenge: Option<&[u8]>) -> Result<Option<Vec<u8>>, MechanismError> {
        self.config.ensure_incomplete()?;
        match self.stage {
            Stage::Init => {
                debug!("GSSAPI initiating context for {}", self.target_principal());
                let output = self.establish(None)?;
                self.stage = Stage::Establishing;
                Ok(Some(output))
            }
            Stage::Establishing => {
                let output = self.establish(challenge)?;
                let context = self.context.as_mut().ok_or(MechanismError::Disposed)?;
                if let Some(user) = context.established_identity() {
                    let mut supported = QopSet::from(Qop::Auth);
                    if context.integrity_available() {
                        supported = supported.with(Qop::AuthInt);
                    }
                    if context.confidentiality_available() {
                        supported = supported.with(Qop::AuthConf);
                    }
                    debug!(
                        "GSSAPI context established for {}, supported QOP {:#04x}",
                        user,
                        supported.bits()
                    );
                    self.supported_qop = supported;
                    self.user = Some(user);
                    self.stage = Stage::Negotiating;
                }
                Ok(Some(output))
            }
            Stage::Negotiating => match self.negotiate(challenge.unwrap_or_default()) {
                Ok(wrapped) => Ok(Some(wrapped)),
                Err(err) => Err(self.fail(err)),
            },
            Stage::Complete | Stage::Failed => Err(MechanismError::InvalidState),
        }
    }

    fn wrap(&mut self, outgoing: &[u8]) -> Result<Vec<u8>, MechanismError> {
        match self.layer_context()? {
            None => Ok(outgoing.to_vec()),
            Some((context, qop)) => Ok(context.wrap(outgoing, qop == Qop::AuthConf)?),
        }
    }

    fn unwrap(&mut self, incoming: &[u8]) -> Result<Vec<u8>, MechanismError> {
        match self.layer_context()? {
            None => Ok(incoming.to_vec()),
            Some((context, _)) => Ok(context.unwrap(incoming)?),
        }
    }

    fn dispose(&mut self) {
        self.release_context();
    }
}

impl<C: SecurityContext> Drop for Gssapi<C> {
    fn drop(&mut self) {
        self.release_context();
    }
}

impl<C: SecurityContext> std::fmt::Debug for Gssapi<C> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("Gssapi")
            .field("config", &self.config)
            .field("target", &self.target_principal())
            .field("stage", &self.stage)
            .field("user", &self.user)
            .field("qop", &self.qop)
            .field("max_length", &self.max_length)
            .field("server_max_length", &self.server_max_length)
            .finish()
    }
}
