use crate::common::QopSet;

/// Negotiated properties of a mechanism.
///
/// Created with the mechanism and only ever changed by it while stepping.
/// The capability flags describe the mechanism for a selection policy;
/// the exchange itself never reads them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MechanismConfig {
    name: String,
    score: i32,
    complete: bool,
    has_initial_response: bool,
    allows_anonymous: bool,
    uses_plaintext: bool,
    active_safe: bool,
    dictionary_safe: bool,
    qop: QopSet,
    authorization_id: Option<String>,
}

impl MechanismConfig {
    pub(crate) fn new<N: Into<String>>(name: N) -> MechanismConfig {
        MechanismConfig {
            name: name.into(),
            score: 0,
            complete: false,
            has_initial_response: false,
            allows_anonymous: true,
            uses_plaintext: true,
            active_safe: false,
            dictionary_safe: false,
            qop: QopSet::EMPTY,
            authorization_id: None,
        }
    }

    pub(crate) fn with_score(mut self, score: i32) -> MechanismConfig {
        self.score = score;
        self
    }

    pub(crate) fn with_initial_response(mut self) -> MechanismConfig {
        self.has_initial_response = true;
        self
    }

    pub(crate) fn with_flags(
        mut self,
        allows_anonymous: bool,
        uses_plaintext: bool,
        active_safe: bool,
        dictionary_safe: bool,
    ) -> MechanismConfig {
        self.allows_anonymous = allows_anonymous;
        self.uses_plaintext = uses_plaintext;
        self.active_safe = active_safe;
        self.dictionary_safe = dictionary_safe;
        self
    }

    pub(crate) fn with_qop(mut self, qop: QopSet) -> MechanismConfig {
        self.qop = qop;
        self
    }

    pub(crate) fn set_authorization_id(&mut self, authorization_id: Option<String>) {
        self.authorization_id = authorization_id.filter(|id| !id.is_empty());
    }

    pub(crate) fn mark_complete(&mut self) {
        self.complete = true;
    }

    /// Fails with [`AlreadyComplete`](crate::client::MechanismError::AlreadyComplete)
    /// once the exchange is over.
    pub(crate) fn ensure_incomplete(&self) -> Result<(), crate::client::MechanismError> {
        if self.complete {
            Err(crate::client::MechanismError::AlreadyComplete)
        } else {
            Ok(())
        }
    }

    /// The IANA name of the mechanism.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Preference of this mechanism relative to others, higher is better.
    pub fn score(&self) -> i32 {
        self.score
    }

    /// Whether the exchange has produced its final response.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Whether the client speaks first.
    pub fn has_initial_response(&self) -> bool {
        self.has_initial_response
    }

    /// Whether the mechanism accepts anonymous logins.
    pub fn allows_anonymous(&self) -> bool {
        self.allows_anonymous
    }

    /// Whether the secret crosses the wire in the clear.
    pub fn uses_plaintext(&self) -> bool {
        self.uses_plaintext
    }

    /// Whether the mechanism resists active attacks.
    pub fn active_safe(&self) -> bool {
        self.active_safe
    }

    /// Whether the mechanism resists offline dictionary attacks.
    pub fn dictionary_safe(&self) -> bool {
        self.dictionary_safe
    }

    /// Security layers this mechanism can provide.
    pub fn qop(&self) -> QopSet {
        self.qop
    }

    /// Identity to act as, if different from the authenticating one.
    pub fn authorization_id(&self) -> Option<&str> {
        self.authorization_id.as_deref()
    }
}
