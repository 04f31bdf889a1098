//! Provides the SASL "DIGEST-MD5" mechanism.

use log::{debug, warn};
use md5::{Digest, Md5};
use rand::distributions::Alphanumeric;
use rand::Rng;
use zeroize::{Zeroize, Zeroizing};

use crate::client::{Mechanism, MechanismConfig, MechanismError};
use crate::common::{parse_challenge, quote, Credentials, UserPassword};

/// Length of the generated client nonce.
const CNONCE_LENGTH: usize = 14;

/// Largest buffer we accept, advertised when a security layer is requested.
const MAXBUF: u32 = 16_777_215;

/// Appended to A2 whenever the QOP asks for a security layer.
const A2_PADDING: &str = ":00000000000000000000000000000000";

/// Generates a client nonce of random alphanumeric characters.
fn generate_cnonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CNONCE_LENGTH)
        .map(char::from)
        .collect()
}

fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Picks the QOP to answer with out of the challenge `qop` attribute.
///
/// A single token is echoed as is; out of a list `auth` is preferred, as this
/// mechanism provides no security layer of its own.
fn negotiate_qop(offered: Option<&String>) -> String {
    let tokens: Vec<&str> = offered
        .map(|offered| {
            offered
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if tokens.contains(&"auth") {
        return "auth".to_owned();
    }
    tokens.first().copied().unwrap_or("auth").to_owned()
}

enum DigestState {
    Init,
    SentResponse {
        nonce: String,
        qop: String,
        key_hash: Zeroizing<[u8; 16]>,
    },
    Done,
}

/// A struct for the SASL DIGEST-MD5 mechanism.
///
/// The server speaks first. The client answers the first challenge with a
/// digest proving knowledge of the password, then checks the `rspauth` the
/// server sends back to prove it knows the password too.
pub struct DigestMd5 {
    config: MechanismConfig,
    creds: UserPassword,
    service: String,
    host: String,
    cnonce: Option<String>,
    nonce_count: u32,
    state: DigestState,
}

impl DigestMd5 {
    /// Constructs a new struct for authenticating to `service` using the SASL
    /// DIGEST-MD5 mechanism. The host is bound later by the [`Client`](crate::client::Client).
    pub fn new<S: Into<String>, N: Into<String>, P: Into<String>>(
        service: S,
        username: N,
        password: P,
    ) -> DigestMd5 {
        DigestMd5 {
            config: MechanismConfig::new("DIGEST-MD5")
                .with_score(30)
                .with_flags(false, false, false, false),
            creds: UserPassword::new(username, password),
            service: service.into(),
            host: String::new(),
            cnonce: None,
            nonce_count: 0,
            state: DigestState::Init,
        }
    }

    /// Acts on behalf of `authorization_id` instead of the username.
    pub fn with_authorization_id<A: Into<String>>(mut self, authorization_id: A) -> DigestMd5 {
        self.config.set_authorization_id(Some(authorization_id.into()));
        self
    }

    /// Creates this mechanism from `Credentials`, which must name a service.
    pub fn from_credentials(credentials: Credentials) -> Result<DigestMd5, MechanismError> {
        let creds = UserPassword::from_credentials(&credentials)?;
        let service = credentials.service.ok_or(MechanismError::MissingService)?;
        let mut digest = DigestMd5::new(service, "", "");
        digest.creds = creds;
        digest.config.set_authorization_id(credentials.authorization_id);
        Ok(digest)
    }

    // Used for testing.
    #[doc(hidden)]
    #[cfg(test)]
    pub fn new_with_cnonce<S: Into<String>, N: Into<String>, P: Into<String>>(
        service: S,
        username: N,
        password: P,
        cnonce: &str,
    ) -> DigestMd5 {
        let mut digest = DigestMd5::new(service, username, password);
        digest.cnonce = Some(cnonce.to_owned());
        digest
    }

    fn digest_uri(&self) -> String {
        format!("{}/{}", self.service, self.host)
    }

    /// Computes `H(A1:nonce:nc:cnonce:qop:H(A2))`, where A2 starts with `a2_prefix`.
    fn response_hash(
        &self,
        key_hash: &[u8; 16],
        nonce: &str,
        nc: &str,
        cnonce: &str,
        qop: &str,
        a2_prefix: &str,
    ) -> String {
        let mut a1 = Vec::new();
        a1.extend_from_slice(key_hash);
        a1.push(b':');
        a1.extend(nonce.bytes());
        a1.push(b':');
        a1.extend(cnonce.bytes());
        if let Some(authorization_id) = self.config.authorization_id() {
            a1.push(b':');
            a1.extend(authorization_id.bytes());
        }
        let a1 = md5_hex(&a1);

        let mut a2 = format!("{}{}", a2_prefix, self.digest_uri());
        if qop != "auth" {
            a2.push_str(A2_PADDING);
        }
        let a2 = md5_hex(a2.as_bytes());

        md5_hex(format!("{}:{}:{}:{}:{}:{}", a1, nonce, nc, cnonce, qop, a2).as_bytes())
    }

    fn respond(
        &mut self,
        realm: &str,
        nonce: String,
        qop: String,
        key_hash: Option<Zeroizing<[u8; 16]>>,
    ) -> Vec<u8> {
        let cnonce = self.cnonce.get_or_insert_with(generate_cnonce).clone();
        self.nonce_count += 1;
        let nc = format!("{:08x}", self.nonce_count);

        let key_hash = key_hash.unwrap_or_else(|| {
            let mut hasher = Md5::new();
            hasher.update(self.creds.username.as_bytes());
            hasher.update(b":");
            hasher.update(realm.as_bytes());
            hasher.update(b":");
            hasher.update(self.creds.password.as_bytes());
            let mut key_hash = Zeroizing::new([0; 16]);
            key_hash.copy_from_slice(&hasher.finalize());
            key_hash
        });

        let response = self.response_hash(&key_hash, &nonce, &nc, &cnonce, &qop, "AUTHENTICATE:");

        let mut ret = format!(
            "qop={},realm={},username={},nonce={},cnonce={},nc={},digest-uri={},response={}",
            qop,
            quote(realm),
            quote(&self.creds.username),
            quote(&nonce),
            quote(&cnonce),
            nc,
            quote(&self.digest_uri()),
            response,
        );
        if let Some(authorization_id) = self.config.authorization_id() {
            ret.push_str(&format!(",authzid={}", quote(authorization_id)));
        }
        if qop != "auth" {
            ret.push_str(&format!(",maxbuf={}", MAXBUF));
        }

        debug!("DIGEST-MD5 response sent with nc={} qop={}", nc, qop);
        self.state = DigestState::SentResponse {
            nonce,
            qop,
            key_hash,
        };
        ret.into_bytes()
    }
}

impl std::fmt::Debug for DigestMd5 {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("DigestMd5")
            .field("config", &self.config)
            .field("creds", &self.creds)
            .field("service", &self.service)
            .field("host", &self.host)
            .field("nonce_count", &self.nonce_count)
            .finish()
    }
}

impl Mechanism for DigestMd5 {
    fn config(&self) -> &MechanismConfig {
        &self.config
    }

    fn bind_host(&mut self, host: &str) {
        self.host = host.to_owned();
    }

    fn step(&mut self, challenge: Option<&[u8]>) -> Result<Option<Vec<u8>>, MechanismError> {
        self.config.ensure_incomplete()?;
        self.creds.ensure_available()?;
        let challenge = match challenge {
            Some(challenge) => challenge,
            None => return Ok(None),
        };
        let frame = parse_challenge(challenge)?;

        if let Some(rspauth) = frame.get("rspauth") {
            let (nonce, qop, key_hash) = match self.state {
                DigestState::SentResponse {
                    ref nonce,
                    ref qop,
                    ref key_hash,
                } => (nonce, qop, key_hash),
                _ => return Err(MechanismError::InvalidState),
            };
            let cnonce = self.cnonce.as_deref().unwrap_or_default();
            let nc = format!("{:08x}", self.nonce_count);
            let expected = self.response_hash(key_hash, nonce, &nc, cnonce, qop, ":");

            self.state = DigestState::Done;
            self.config.mark_complete();
            if expected.eq_ignore_ascii_case(rspauth) {
                debug!("DIGEST-MD5 server authenticated");
                return Ok(None);
            }
            warn!("DIGEST-MD5 rspauth from server does not match");
            return Err(MechanismError::AuthenticationFailed);
        }

        let key_hash = match self.state {
            DigestState::Init => None,
            DigestState::SentResponse { ref key_hash, .. } => Some(key_hash.clone()),
            DigestState::Done => return Err(MechanismError::InvalidState),
        };
        let nonce = frame.get("nonce").ok_or(MechanismError::NoServerNonce)?.clone();
        let realm = frame.get("realm").map(String::as_str).unwrap_or_default();
        let qop = negotiate_qop(frame.get("qop"));
        Ok(Some(self.respond(realm, nonce, qop, key_hash)))
    }

    fn dispose(&mut self) {
        self.creds.clear();
        if let DigestState::SentResponse { ref mut key_hash, .. } = self.state {
            key_hash.zeroize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Challenge;

    // Source: RFC 2831, section 4.
    const CHALLENGE: &[u8] = br#"realm="elwood.innosoft.com",nonce="OA6MG9tEQGm2hh",qop="auth",algorithm=md5-sess,charset=utf-8"#;

    fn mechanism() -> DigestMd5 {
        let mut mechanism = DigestMd5::new("imap", "chris", "secret");
        mechanism.bind_host("elwood.innosoft.com");
        mechanism
    }

    fn parse(response: &[u8]) -> Challenge {
        parse_challenge(response).unwrap()
    }

    #[test]
    fn initial_response_is_empty() {
        let mut mechanism = mechanism();
        assert_eq!(mechanism.start().unwrap(), None);
        assert!(!mechanism.is_complete());
    }

    #[test]
    fn response_fields() {
        let mut mechanism = mechanism();
        let response = mechanism.step(Some(CHALLENGE)).unwrap().unwrap();
        assert!(!mechanism.is_complete());

        let fields = parse(&response);
        assert_eq!(fields["username"], "chris");
        assert_eq!(fields["realm"], "elwood.innosoft.com");
        assert_eq!(fields["nonce"], "OA6MG9tEQGm2hh");
        assert_eq!(fields["nc"], "00000001");
        assert_eq!(fields["digest-uri"], "imap/elwood.innosoft.com");
        assert_eq!(fields["qop"], "auth");
        assert!(!fields.contains_key("maxbuf"));

        let cnonce = &fields["cnonce"];
        assert_eq!(cnonce.len(), CNONCE_LENGTH);
        assert!(cnonce.chars().all(|c| c.is_ascii_alphanumeric()));
        let digest = &fields["response"];
        assert_eq!(digest.len(), 32);
        assert!(digest.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));

        let text = String::from_utf8(response).unwrap();
        assert!(text.starts_with(r#"qop=auth,realm="elwood.innosoft.com",username="chris",nonce="OA6MG9tEQGm2hh",cnonce=""#));
        assert!(text.contains(r#",nc=00000001,digest-uri="imap/elwood.innosoft.com",response="#));
    }

    #[test]
    fn rfc2831_known_answer() {
        let mut mechanism =
            DigestMd5::new_with_cnonce("imap", "chris", "secret", "OA6MHXh6VqTrRk");
        mechanism.bind_host("elwood.innosoft.com");
        let response = mechanism.step(Some(CHALLENGE)).unwrap().unwrap();
        assert_eq!(
            String::from_utf8(response).unwrap(),
            r#"qop=auth,realm="elwood.innosoft.com",username="chris",nonce="OA6MG9tEQGm2hh",cnonce="OA6MHXh6VqTrRk",nc=00000001,digest-uri="imap/elwood.innosoft.com",response=d388dad90d4bbd760a152321f2143af7"#
        );

        let response = mechanism
            .step(Some(b"rspauth=ea40f60335c427b5527b84dbabcdfffd"))
            .unwrap();
        assert_eq!(response, None);
        assert!(mechanism.is_complete());
    }

    #[test]
    fn wrong_rspauth_fails_but_completes() {
        let mut mechanism = mechanism();
        mechanism.step(Some(CHALLENGE)).unwrap();
        let err = mechanism
            .step(Some(b"rspauth=ea40f60335c427b5527b84dbabcdfffd"))
            .unwrap_err();
        assert_eq!(err, MechanismError::AuthenticationFailed);
        assert!(mechanism.is_complete());
        assert_eq!(
            mechanism.step(Some(b"rspauth=00")),
            Err(MechanismError::AlreadyComplete)
        );
    }

    #[test]
    fn rspauth_before_response() {
        let mut mechanism = mechanism();
        assert_eq!(
            mechanism.step(Some(b"rspauth=ea40f60335c427b5527b84dbabcdfffd")),
            Err(MechanismError::InvalidState)
        );
        assert!(!mechanism.is_complete());
    }

    #[test]
    fn nonce_count_increases_and_cnonce_is_reused() {
        let mut mechanism = mechanism();
        let first = parse(&mechanism.step(Some(CHALLENGE)).unwrap().unwrap());
        let second = parse(&mechanism.step(Some(CHALLENGE)).unwrap().unwrap());
        assert_eq!(first["nc"], "00000001");
        assert_eq!(second["nc"], "00000002");
        assert_eq!(first["cnonce"], second["cnonce"]);
        assert_ne!(first["response"], second["response"]);
    }

    #[test]
    fn integrity_qop_requests_maxbuf() {
        let mut mechanism = mechanism();
        let response = mechanism
            .step(Some(br#"realm="r",nonce="n",qop="auth-int""#))
            .unwrap()
            .unwrap();
        let fields = parse(&response);
        assert_eq!(fields["qop"], "auth-int");
        assert_eq!(fields["maxbuf"], "16777215");
    }

    #[test]
    fn authorization_id_changes_response() {
        let mut plain = DigestMd5::new_with_cnonce("imap", "chris", "secret", "OA6MHXh6VqTrRk");
        plain.bind_host("elwood.innosoft.com");
        let mut proxied = DigestMd5::new_with_cnonce("imap", "chris", "secret", "OA6MHXh6VqTrRk")
            .with_authorization_id("admin");
        proxied.bind_host("elwood.innosoft.com");
        let a = parse(&plain.step(Some(CHALLENGE)).unwrap().unwrap());
        let b = parse(&proxied.step(Some(CHALLENGE)).unwrap().unwrap());
        assert_ne!(a["response"], b["response"]);
        assert!(!a.contains_key("authzid"));
        assert_eq!(b["authzid"], "admin");
    }

    #[test]
    fn qop_list() {
        assert_eq!(negotiate_qop(None), "auth");
        assert_eq!(negotiate_qop(Some(&"auth-conf".to_owned())), "auth-conf");
        assert_eq!(negotiate_qop(Some(&"auth-int, auth".to_owned())), "auth");
        assert_eq!(negotiate_qop(Some(&"auth-int,auth-conf".to_owned())), "auth-int");
    }

    #[test]
    fn missing_nonce() {
        let mut mechanism = mechanism();
        assert_eq!(
            mechanism.step(Some(br#"realm="r",qop="auth""#)),
            Err(MechanismError::NoServerNonce)
        );
    }

    #[test]
    fn malformed_challenge() {
        let mut mechanism = mechanism();
        assert!(matches!(
            mechanism.step(Some(b"realm")),
            Err(MechanismError::Challenge(_))
        ));
    }

    #[test]
    fn from_credentials_needs_service() {
        let creds = Credentials::default().with_username("chris").with_password("secret");
        assert_eq!(
            DigestMd5::from_credentials(creds.clone()).unwrap_err(),
            MechanismError::MissingService
        );
        let mechanism = DigestMd5::from_credentials(creds.with_service("imap")).unwrap();
        assert_eq!(mechanism.name(), "DIGEST-MD5");
        assert_eq!(mechanism.service, "imap");
    }

    #[test]
    fn dispose_clears_secrets() {
        let mut mechanism = mechanism();
        mechanism.step(Some(CHALLENGE)).unwrap();
        mechanism.dispose();
        mechanism.dispose();
        assert!(mechanism.creds.password.is_empty());
        match mechanism.state {
            DigestState::SentResponse { ref key_hash, .. } => assert_eq!(**key_hash, [0; 16]),
            _ => panic!("unexpected state"),
        }
        assert_eq!(mechanism.step(Some(CHALLENGE)), Err(MechanismError::Disposed));
        assert_eq!(
            mechanism.step(Some(b"rspauth=ea40f60335c427b5527b84dbabcdfffd")),
            Err(MechanismError::Disposed)
        );
        assert!(!mechanism.is_complete());
    }

    #[test]
    fn missing_realm_is_empty() {
        let mut mechanism = mechanism();
        let response = mechanism.step(Some(br#"nonce="n""#)).unwrap().unwrap();
        let text = String::from_utf8(response.clone()).unwrap();
        assert!(text.starts_with(r#"qop=auth,realm="",username="chris",nonce="n","#));

        let fields = parse(&response);
        assert_eq!(fields["realm"], "");
        let digest = &fields["response"];
        assert_eq!(digest.len(), 32);
        assert!(digest.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn escaped_realm_is_hashed_unescaped() {
        let mut escaped =
            DigestMd5::new_with_cnonce("imap", "chris", "secret", "OA6MHXh6VqTrRk");
        escaped.bind_host("elwood.innosoft.com");
        let mut plain = DigestMd5::new_with_cnonce("imap", "chris", "secret", "OA6MHXh6VqTrRk");
        plain.bind_host("elwood.innosoft.com");
        let challenge = br#"realm="elwood\.innosoft.com",nonce="OA6MG9tEQGm2hh""#;
        let a = parse(&escaped.step(Some(challenge)).unwrap().unwrap());
        let b = parse(&plain.step(Some(CHALLENGE)).unwrap().unwrap());
        assert_eq!(a["realm"], "elwood.innosoft.com");
        assert_eq!(a["response"], b["response"]);
    }

    #[test]
    fn key_hash_not_kept_after_rspauth() {
        let mut mechanism =
            DigestMd5::new_with_cnonce("imap", "chris", "secret", "OA6MHXh6VqTrRk");
        mechanism.bind_host("elwood.innosoft.com");
        mechanism.step(Some(CHALLENGE)).unwrap();
        match mechanism.state {
            DigestState::SentResponse { ref key_hash, .. } => assert_ne!(**key_hash, [0; 16]),
            _ => panic!("unexpected state"),
        }
        mechanism
            .step(Some(b"rspauth=ea40f60335c427b5527b84dbabcdfffd"))
            .unwrap();
        assert!(matches!(mechanism.state, DigestState::Done));
    }
}
