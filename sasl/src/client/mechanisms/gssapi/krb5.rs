use libgssapi::context::{ClientCtx, CtxFlags, SecurityContext as GssSecurityContext};
use libgssapi::credential::{Cred, CredUsage};
use libgssapi::name::Name;
use libgssapi::oid::{OidSet, GSS_MECH_KRB5, GSS_NT_KRB5_PRINCIPAL};
use log::debug;

use super::{ContextError, SecurityContext};

/// A Kerberos initiator context backed by the system GSSAPI library.
///
/// Credentials come from the default credential cache unless a client
/// principal is set with [`with_principal`](Krb5Context::with_principal).
#[derive(Default)]
pub struct Krb5Context {
    principal: Option<String>,
    ctx: Option<ClientCtx>,
}

impl Krb5Context {
    /// Uses the default credentials of the process.
    pub fn new() -> Krb5Context {
        Krb5Context::default()
    }

    /// Acquires credentials for `principal` instead of the default one.
    pub fn with_principal<P: Into<String>>(mut self, principal: P) -> Krb5Context {
        self.principal = Some(principal.into());
        self
    }

    fn client_context(&self, target: &str) -> Result<ClientCtx, libgssapi::error::Error> {
        let mut mechs = OidSet::new()?;
        mechs.add(&GSS_MECH_KRB5)?;

        let name = match &self.principal {
            Some(principal) => Some(
                Name::new(principal.as_bytes(), Some(&GSS_NT_KRB5_PRINCIPAL))?
                    .canonicalize(Some(&GSS_MECH_KRB5))?,
            ),
            None => None,
        };
        let cred = Cred::acquire(name.as_ref(), None, CredUsage::Initiate, Some(&mechs))?;

        let target = Name::new(target.as_bytes(), Some(&GSS_NT_KRB5_PRINCIPAL))?
            .canonicalize(Some(&GSS_MECH_KRB5))?;
        Ok(ClientCtx::new(
            Some(cred),
            target,
            CtxFlags::GSS_C_MUTUAL_FLAG | CtxFlags::GSS_C_INTEG_FLAG | CtxFlags::GSS_C_CONF_FLAG,
            Some(&GSS_MECH_KRB5),
        ))
    }

    fn established(&mut self) -> Option<&mut ClientCtx> {
        self.ctx.as_mut().filter(|ctx| ctx.is_complete())
    }

    fn has_flag(&mut self, flag: CtxFlags) -> bool {
        self.established()
            .and_then(|ctx| ctx.flags().ok())
            .map_or(false, |flags| flags.contains(flag))
    }

    fn context(&mut self) -> Result<&mut ClientCtx, ContextError> {
        self.ctx
            .as_mut()
            .ok_or_else(|| ContextError::new("Kerberos context not initiated"))
    }
}

impl SecurityContext for Krb5Context {
    fn establish(&mut self, target: &str, token: Option<&[u8]>) -> Result<Vec<u8>, ContextError> {
        if self.ctx.is_none() {
            debug!("acquiring Kerberos credentials for {}", target);
            self.ctx = Some(self.client_context(target).map_err(ContextError::from_source)?);
        }
        let ctx = self.context()?;
        let output = ctx.step(token, None).map_err(ContextError::from_source)?;
        Ok(output.map(|buf| buf.to_vec()).unwrap_or_default())
    }

    fn established_identity(&mut self) -> Option<String> {
        self.established()
            .and_then(|ctx| ctx.source_name().ok())
            .map(|name| name.to_string())
    }

    fn integrity_available(&mut self) -> bool {
        self.has_flag(CtxFlags::GSS_C_INTEG_FLAG)
    }

    fn confidentiality_available(&mut self) -> bool {
        self.has_flag(CtxFlags::GSS_C_CONF_FLAG)
    }

    fn wrap(&mut self, buffer: &[u8], confidential: bool) -> Result<Vec<u8>, ContextError> {
        let ctx = self.context()?;
        let wrapped = ctx.wrap(confidential, buffer).map_err(ContextError::from_source)?;
        Ok(wrapped.to_vec())
    }

    fn unwrap(&mut self, buffer: &[u8]) -> Result<Vec<u8>, ContextError> {
        let ctx = self.context()?;
        let unwrapped = ctx.unwrap(buffer).map_err(ContextError::from_source)?;
        Ok(unwrapped.to_vec())
    }

    fn dispose(&mut self) {
        // Dropping the handle deletes the native context.
        self.ctx = None;
    }
}
