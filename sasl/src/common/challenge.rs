//! Codec for the `key=value,key="quoted value"` attribute lists used by
//! text based challenges such as DIGEST-MD5.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

/// A decoded challenge, attribute name to value with quotes stripped.
///
/// Keys keep the case they were transmitted with.
pub type Challenge = HashMap<String, String>;

/// An error that signifies that a challenge cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeError {
    /// The challenge is not valid UTF-8.
    InvalidUtf8,

    /// A segment of the challenge has no `=` separating key from value.
    MissingSeparator {
        /// The offending remainder of the challenge.
        segment: String,
    },
}

impl StdError for ChallengeError {}

impl fmt::Display for ChallengeError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChallengeError::InvalidUtf8 => write!(fmt, "challenge is not valid UTF-8"),
            ChallengeError::MissingSeparator { segment } => {
                write!(fmt, "no `=` in challenge segment {:?}", segment)
            }
        }
    }
}

/// Decodes a challenge into its attributes.
///
/// A quoted value runs up to the next unescaped `"` (or the end of input),
/// with `\x` standing for a literal `x`; the comma following it is skipped.
/// An unquoted value runs up to the next comma. Whitespace around keys is
/// ignored. The empty challenge decodes to an empty map.
pub fn parse_challenge(challenge: &[u8]) -> Result<Challenge, ChallengeError> {
    let mut s = std::str::from_utf8(challenge).map_err(|_| ChallengeError::InvalidUtf8)?;
    let mut ret = HashMap::new();

    while !s.is_empty() {
        let eq = s.find('=').ok_or_else(|| ChallengeError::MissingSeparator {
            segment: s.to_owned(),
        })?;
        let key = s[..eq].trim();
        s = &s[eq + 1..];

        let value;
        if let Some(quoted) = s.strip_prefix('"') {
            let (unquoted, rest) = unquote(quoted);
            value = unquoted;
            s = rest.strip_prefix(',').unwrap_or(rest);
        } else {
            let end = s.find(',').unwrap_or(s.len());
            value = s[..end].to_owned();
            s = s.get(end + 1..).unwrap_or("");
        }

        ret.insert(key.to_owned(), value);
    }

    Ok(ret)
}

/// Reads a quoted string whose opening quote was already consumed.
///
/// Returns the unescaped value and what follows the closing quote.
fn unquote(quoted: &str) -> (String, &str) {
    let mut value = String::with_capacity(quoted.len());
    let mut chars = quoted.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return (value, &quoted[i + 1..]),
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    value.push(escaped);
                }
            }
            c => value.push(c),
        }
    }
    (value, "")
}

/// Double-quotes `value`, escaping backslashes and quotes.
pub fn quote(value: &str) -> String {
    let mut ret = String::with_capacity(value.len() + 2);
    ret.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            ret.push('\\');
        }
        ret.push(c);
    }
    ret.push('"');
    ret
}

/// Encodes attributes in the format [`parse_challenge`] reads, quoting every value.
pub fn encode_challenge<'a, I>(attributes: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    attributes
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, quote(value)))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_challenge() {
        assert!(parse_challenge(b"").unwrap().is_empty());
    }

    #[test]
    fn quoted_and_bare_values() {
        let c = parse_challenge(
            br#"realm="elwood.innosoft.com",nonce="OA6MG9tEQGm2hh",qop="auth",algorithm=md5-sess,charset=utf-8"#,
        )
        .unwrap();
        assert_eq!(c.len(), 5);
        assert_eq!(c["realm"], "elwood.innosoft.com");
        assert_eq!(c["nonce"], "OA6MG9tEQGm2hh");
        assert_eq!(c["qop"], "auth");
        assert_eq!(c["algorithm"], "md5-sess");
        assert_eq!(c["charset"], "utf-8");
    }

    #[test]
    fn quoted_value_keeps_commas() {
        let c = parse_challenge(br#"qop="auth,auth-int,auth-conf",maxbuf=65536"#).unwrap();
        assert_eq!(c["qop"], "auth,auth-int,auth-conf");
        assert_eq!(c["maxbuf"], "65536");
    }

    #[test]
    fn single_bare_pair() {
        let c = parse_challenge(b"rspauth=ea40f60335c427b5527b84dbabcdfffd").unwrap();
        assert_eq!(c.len(), 1);
        assert_eq!(c["rspauth"], "ea40f60335c427b5527b84dbabcdfffd");
    }

    #[test]
    fn value_may_contain_equals() {
        let c = parse_challenge(b"a=b=c,d=\"e=f\"").unwrap();
        assert_eq!(c["a"], "b=c");
        assert_eq!(c["d"], "e=f");
    }

    #[test]
    fn keys_are_case_sensitive_and_trimmed() {
        let c = parse_challenge(b"Realm=x, realm=y").unwrap();
        assert_eq!(c["Realm"], "x");
        assert_eq!(c["realm"], "y");
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        let c = parse_challenge(b"nonce=\"abc").unwrap();
        assert_eq!(c["nonce"], "abc");
    }

    #[test]
    fn missing_separator() {
        let err = parse_challenge(b"realm=x,garbage").unwrap_err();
        assert_eq!(
            err,
            ChallengeError::MissingSeparator {
                segment: "garbage".to_owned()
            }
        );
    }

    #[test]
    fn invalid_utf8() {
        assert_eq!(
            parse_challenge(&[b'a', b'=', 0xff]).unwrap_err(),
            ChallengeError::InvalidUtf8
        );
    }

    #[test]
    fn quoted_pairs_are_unescaped() {
        let c = parse_challenge(br#"realm="a\\b",nonce="say \"hi\"",qop=auth"#).unwrap();
        assert_eq!(c["realm"], r"a\b");
        assert_eq!(c["nonce"], r#"say "hi""#);
        assert_eq!(c["qop"], "auth");
    }

    #[test]
    fn escaped_values_survive_reencoding() {
        let mut attributes = Challenge::new();
        attributes.insert("realm".to_owned(), r"a\b".to_owned());
        attributes.insert("nonce".to_owned(), r#"x"y,z\"#.to_owned());
        attributes.insert("qop".to_owned(), "auth".to_owned());
        let encoded =
            encode_challenge(attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        assert_eq!(parse_challenge(encoded.as_bytes()).unwrap(), attributes);
    }

    #[test]
    fn quote_escapes() {
        assert_eq!(quote("chris"), "\"chris\"");
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
    }

    #[test]
    fn reencoding_keeps_key_set() {
        let original = br#"k1=v1,k2="v2",k3="a,b",k4=""#;
        let first = parse_challenge(original).unwrap();
        let encoded = encode_challenge(first.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let second = parse_challenge(encoded.as_bytes()).unwrap();
        assert_eq!(first, second);
    }
}
