//! Quality of protection flags for the security layer.

use std::fmt;

/// Maximum security layer buffer size requested by default.
pub const DEFAULT_MAX_LENGTH: u32 = 16_384_000;

/// Largest length expressible in the three length bytes of the
/// security layer negotiation message.
pub const MAX_SECURITY_LAYER_LENGTH: u32 = 0x00ff_ffff;

/// A single quality of protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Qop {
    /// Authentication only, no security layer.
    Auth,
    /// Authentication with integrity protection.
    AuthInt,
    /// Authentication with integrity and confidentiality protection.
    AuthConf,
}

impl Qop {
    /// Every QOP in selection order, strongest first.
    pub const BY_PREFERENCE: [Qop; 3] = [Qop::AuthConf, Qop::AuthInt, Qop::Auth];

    /// The bit this QOP occupies in a negotiation bitmask.
    pub fn flag(self) -> u8 {
        match self {
            Qop::Auth => 1,
            Qop::AuthInt => 2,
            Qop::AuthConf => 4,
        }
    }

    /// The token naming this QOP on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Qop::Auth => "auth",
            Qop::AuthInt => "auth-int",
            Qop::AuthConf => "auth-conf",
        }
    }

    /// Parses a QOP token.
    pub fn from_name(name: &str) -> Option<Qop> {
        match name.trim() {
            "auth" => Some(Qop::Auth),
            "auth-int" => Some(Qop::AuthInt),
            "auth-conf" => Some(Qop::AuthConf),
            _ => None,
        }
    }
}

impl fmt::Display for Qop {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

/// A bitmask of [`Qop`] flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QopSet(u8);

impl QopSet {
    /// No QOP at all.
    pub const EMPTY: QopSet = QopSet(0);

    /// All three QOPs.
    pub const ALL: QopSet = QopSet(1 | 2 | 4);

    /// Builds a set from a raw bitmask, as sent by a server. Unknown bits are kept.
    pub fn from_bits(bits: u8) -> QopSet {
        QopSet(bits)
    }

    /// The raw bitmask.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Returns this set with `qop` added.
    pub fn with(self, qop: Qop) -> QopSet {
        QopSet(self.0 | qop.flag())
    }

    /// Whether `qop` is in the set.
    pub fn contains(self, qop: Qop) -> bool {
        self.0 & qop.flag() != 0
    }

    /// Bits present in both sets.
    pub fn intersection(self, other: QopSet) -> QopSet {
        QopSet(self.0 & other.0)
    }

    /// Whether no known QOP bit is set.
    pub fn is_empty(self) -> bool {
        self.0 & QopSet::ALL.0 == 0
    }

    /// The strongest QOP in the set: confidentiality, then integrity, then auth.
    pub fn strongest(self) -> Option<Qop> {
        Qop::BY_PREFERENCE.into_iter().find(|qop| self.contains(*qop))
    }
}

impl From<Qop> for QopSet {
    fn from(qop: Qop) -> QopSet {
        QopSet(qop.flag())
    }
}

impl FromIterator<Qop> for QopSet {
    fn from_iter<I: IntoIterator<Item = Qop>>(iter: I) -> QopSet {
        iter.into_iter().fold(QopSet::EMPTY, QopSet::with)
    }
}

/// Picks the QOP for a security layer out of what the user allows, what
/// the local context supports and what the server offers.
pub fn select_qop(user_selected: QopSet, supported: QopSet, offered: QopSet) -> Option<Qop> {
    user_selected
        .intersection(supported)
        .intersection(offered)
        .strongest()
}
