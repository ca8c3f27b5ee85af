//! Parsers for the `Authorization` request header, one per scheme.
//!
//! Nothing here is trusted: a successful parse only means the header is
//! syntactically usable. Whether the credentials are right is decided by
//! [`verify`](crate::verify).

use crate::{Error::*, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;

/// Credentials extracted from an `Authorization` header
#[derive(Debug, PartialEq, Clone)]
pub enum Credentials {
    Basic { user: String, pass: String },
    Bearer { token: String },
    Digest(DigestCredentials),
}

/// Fields of an `Authorization: Digest ...` header
#[derive(Debug, PartialEq, Clone)]
pub struct DigestCredentials {
    pub username: String,
    pub realm: String,
    pub nonce: String,
    pub uri: Option<String>,
    pub qop: Option<String>,
    /// Nonce count, kept as the 8 hex digits the client sent since it is hashed verbatim
    pub nc: Option<String>,
    pub cnonce: Option<String>,
    pub response: String,
    pub algorithm: Option<String>,
    pub opaque: Option<String>,
}

impl Credentials {
    /// Parse any supported scheme, dispatching on the scheme prefix
    ///
    /// # Errors
    /// `MissingRequired` for a Digest header without one of its mandatory
    /// fields; `MalformedHeader` or `InvalidHeaderSyntax` for anything else
    pub fn parse(header: &str) -> Result<Self> {
        if header.starts_with("Basic ") {
            let (user, pass) = parse_basic(header)?;
            Ok(Credentials::Basic { user, pass })
        } else if header.starts_with("Bearer ") {
            Ok(Credentials::Bearer {
                token: parse_bearer(header)?,
            })
        } else if header.starts_with("Digest ") {
            parse_digest_credentials(header).map(Credentials::Digest)
        } else {
            let scheme = header.split_whitespace().next().unwrap_or_default();
            Err(InvalidHeaderSyntax(format!("unsupported scheme '{}'", scheme)))
        }
    }
}

impl DigestCredentials {
    /// Build from a parsed parameter map.
    ///
    /// # Errors
    /// `MissingRequired` if any of username, realm, nonce or response is absent
    pub fn from_map(mut kv: HashMap<String, String>) -> Result<Self> {
        let mut required = |key: &'static str| kv.remove(key).ok_or(MissingRequired(key));

        let username = required("username")?;
        let realm = required("realm")?;
        let nonce = required("nonce")?;
        let response = required("response")?;

        Ok(Self {
            username,
            realm,
            nonce,
            response,
            uri: kv.remove("uri"),
            qop: kv.remove("qop"),
            nc: kv.remove("nc"),
            cnonce: kv.remove("cnonce"),
            algorithm: kv.remove("algorithm"),
            opaque: kv.remove("opaque"),
        })
    }
}

/// Parse `Basic <base64(user:pass)>`. The password may itself contain ':'.
pub fn parse_basic(header: &str) -> Result<(String, String)> {
    let encoded = header.strip_prefix("Basic ").ok_or(MalformedHeader("Basic"))?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| MalformedHeader("Basic"))?;
    let decoded = String::from_utf8(decoded).map_err(|_| MalformedHeader("Basic"))?;

    match decoded.split_once(':') {
        Some((user, pass)) => Ok((user.to_string(), pass.to_string())),
        None => Err(MalformedHeader("Basic")),
    }
}

/// Parse `Bearer <token>`; the token is taken verbatim and must not be empty
pub fn parse_bearer(header: &str) -> Result<String> {
    match header.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(MalformedHeader("Bearer")),
    }
}

/// Parse `Digest k=v, k="v", ...` into a parameter map.
///
/// Returns `None` if the prefix is missing or not a single pair could be read.
/// Malformed pairs are skipped and the well-formed ones kept.
pub fn parse_digest(header: &str) -> Option<HashMap<String, String>> {
    let params = header.strip_prefix("Digest ")?;
    let map = parse_header_map(params);
    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

/// Key-value list parser shared by the `Authorization` and `WWW-Authenticate` grammars
pub fn parse_header_map(input: &str) -> HashMap<String, String> {
    #[derive(Debug)]
    #[allow(non_camel_case_types)]
    enum ParserState {
        P_WHITE,
        P_NAME(usize),
        P_VALUE_BEGIN,
        P_VALUE_QUOTED,
        P_VALUE_QUOTED_NEXTLITERAL,
        P_VALUE_PLAIN,
        P_SKIP,
    }

    fn is_name_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '-' || c == '_'
    }

    let mut state = ParserState::P_WHITE;

    let mut parsed = HashMap::<String, String>::new();
    let mut current_token = "";
    let mut current_value = String::new();

    for (pos, c) in input.char_indices() {
        match state {
            ParserState::P_WHITE => {
                if c.is_ascii_alphabetic() {
                    state = ParserState::P_NAME(pos);
                } else if c != ',' && !c.is_whitespace() {
                    state = ParserState::P_SKIP;
                }
            }
            ParserState::P_NAME(name_start) => {
                if c == '=' {
                    current_token = &input[name_start..pos];
                    state = ParserState::P_VALUE_BEGIN;
                } else if !is_name_char(c) {
                    // bare token without a value, e.g. a stray word
                    state = if c == ',' {
                        ParserState::P_WHITE
                    } else {
                        ParserState::P_SKIP
                    };
                }
            }
            ParserState::P_VALUE_BEGIN => {
                current_value.clear();
                state = match c {
                    '"' => ParserState::P_VALUE_QUOTED,
                    ',' => ParserState::P_WHITE,
                    c if c.is_whitespace() => ParserState::P_SKIP,
                    _ => {
                        current_value.push(c);
                        ParserState::P_VALUE_PLAIN
                    }
                };
            }
            ParserState::P_VALUE_QUOTED => match c {
                '"' => {
                    parsed.insert(current_token.to_ascii_lowercase(), current_value.clone());
                    current_value.clear();
                    state = ParserState::P_WHITE;
                }
                '\\' => state = ParserState::P_VALUE_QUOTED_NEXTLITERAL,
                _ => current_value.push(c),
            },
            ParserState::P_VALUE_QUOTED_NEXTLITERAL => {
                current_value.push(c);
                state = ParserState::P_VALUE_QUOTED
            }
            ParserState::P_VALUE_PLAIN => {
                if c == ',' || c.is_whitespace() {
                    parsed.insert(current_token.to_ascii_lowercase(), current_value.clone());
                    current_value.clear();
                    state = ParserState::P_WHITE;
                } else {
                    current_value.push(c);
                }
            }
            ParserState::P_SKIP => {
                if c == ',' {
                    state = ParserState::P_WHITE;
                }
            }
        }
    }

    // an unterminated quoted value is dropped
    if let ParserState::P_VALUE_PLAIN = state {
        parsed.insert(current_token.to_ascii_lowercase(), current_value);
    }

    parsed
}

/// Parse the header for the scheme the route expects
pub fn parse_digest_credentials(header: &str) -> Result<DigestCredentials> {
    let map = parse_digest(header).ok_or_else(|| InvalidHeaderSyntax(header.to_string()))?;
    DigestCredentials::from_map(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn basic(raw: &str) -> String {
        format!("Basic {}", STANDARD.encode(raw))
    }

    #[test]
    fn test_parse_basic() {
        assert_eq!(
            parse_basic(&basic("foo:bar")).unwrap(),
            ("foo".to_string(), "bar".to_string())
        );

        // split on the first colon only
        assert_eq!(
            parse_basic(&basic("user:pa:ss:")).unwrap(),
            ("user".to_string(), "pa:ss:".to_string())
        );

        assert_eq!(
            parse_basic(&basic(":")).unwrap(),
            (String::new(), String::new())
        );
    }

    #[test]
    fn test_parse_basic_failures() {
        let err = Err(Error::MalformedHeader("Basic"));
        assert_eq!(parse_basic(&basic("no-colon-here")), err);
        assert_eq!(parse_basic("Zm9vOmJhcg=="), err);
        assert_eq!(parse_basic("Bearer Zm9vOmJhcg=="), err);
        assert_eq!(parse_basic("Basic %%%"), err);
        assert_eq!(parse_basic("basic Zm9vOmJhcg=="), err);
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc.def").unwrap(), "abc.def");
        assert_eq!(parse_bearer("Bearer  x").unwrap(), " x");
        assert_eq!(parse_bearer("Bearer "), Err(Error::MalformedHeader("Bearer")));
        assert_eq!(parse_bearer("Bearer"), Err(Error::MalformedHeader("Bearer")));
        assert_eq!(parse_bearer("Basic abc"), Err(Error::MalformedHeader("Bearer")));
    }

    #[test]
    fn test_credentials_dispatch() {
        assert_eq!(
            Credentials::parse(&basic("a:b")).unwrap(),
            Credentials::Basic {
                user: "a".to_string(),
                pass: "b".to_string()
            }
        );
        assert_eq!(
            Credentials::parse("Bearer tok").unwrap(),
            Credentials::Bearer {
                token: "tok".to_string()
            }
        );
        assert!(matches!(
            Credentials::parse(r#"Digest username="u", realm="r", nonce="n", response="x""#),
            Ok(Credentials::Digest(DigestCredentials { ref username, .. })) if username == "u"
        ));
        assert_eq!(
            Credentials::parse(r#"Digest username="u""#),
            Err(Error::MissingRequired("realm"))
        );
        assert!(matches!(
            Credentials::parse("Negotiate abc"),
            Err(Error::InvalidHeaderSyntax(_))
        ));
        assert!(Credentials::parse("").is_err());
    }

    #[test]
    fn test_parse_header_map() {
        let src = r#"
           username="Mufasa",
           realm="http-auth@example.org",
           uri="/dir/index.html",
           algorithm=SHA-256,
           nonce="7ypf/xlj9XXwfDPEoM4URrv/xwf94BcCAzFZH4GiTo0v",
           nc=00000001,
           cnonce="f2/wE4q74E6zIJEtWaHKaf5wv/H5QzzpXusqGemxURZJ",
           qop=auth,
           response="753927fa0e85d155564e2e272a28d1802ca10daf4496794697cf8db5856cb6c1"
        "#;

        let map = parse_header_map(src);

        assert_eq!(map.len(), 9);
        assert_eq!(map["username"], "Mufasa");
        assert_eq!(map["realm"], "http-auth@example.org");
        assert_eq!(map["algorithm"], "SHA-256");
        assert_eq!(map["nc"], "00000001");
        assert_eq!(map["qop"], "auth");
        assert_eq!(
            map["cnonce"],
            "f2/wE4q74E6zIJEtWaHKaf5wv/H5QzzpXusqGemxURZJ"
        );

        assert_eq!(parse_header_map(r#"realm=api@example.org"#)["realm"], "api@example.org");
        assert!(parse_header_map("").is_empty());
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let map = parse_header_map(r#"Username="Foo", REALM="Fake Realm", Nonce=n, Response="r""#);
        assert_eq!(map["username"], "Foo");
        assert_eq!(map["realm"], "Fake Realm");

        let creds = parse_digest_credentials(r#"Digest Username="Foo", REALM="R", Nonce=n, Response="r""#).unwrap();
        assert_eq!(creds.username, "Foo");
        assert_eq!(creds.response, "r");
    }

    #[test]
    fn test_quoted_values() {
        let map = parse_header_map(r#"realm="a, b \"c\" \\d", nonce="""#);
        assert_eq!(map["realm"], r#"a, b "c" \d"#);
        assert_eq!(map["nonce"], "");
    }

    #[test]
    fn test_partial_parse_keeps_good_pairs() {
        let map = parse_header_map(r#"junk, username="foo", =oops, !bad=1, realm="Fake Realm", nonce="abc"#);
        assert_eq!(map.len(), 2);
        assert_eq!(map["username"], "foo");
        assert_eq!(map["realm"], "Fake Realm");
    }

    #[test]
    fn test_parse_digest() {
        assert!(parse_digest(r#"Basic realm="x""#).is_none());
        assert!(parse_digest("Digest ").is_none());
        assert!(parse_digest("Digest garbage").is_none());

        let map = parse_digest(r#"Digest username="foo", response="abc""#).unwrap();
        assert_eq!(map["username"], "foo");
    }

    #[test]
    fn test_digest_required_keys() {
        let full = r#"Digest username="foo", realm="Fake Realm", nonce="n", uri="/x", response="r""#;
        let creds = parse_digest_credentials(full).unwrap();
        assert_eq!(creds.username, "foo");
        assert_eq!(creds.uri.as_deref(), Some("/x"));
        assert_eq!(creds.qop, None);

        for (missing, header) in [
            ("username", r#"Digest realm="R", nonce="n", response="r""#),
            ("realm", r#"Digest username="u", nonce="n", response="r""#),
            ("nonce", r#"Digest username="u", realm="R", response="r""#),
            ("response", r#"Digest username="u", realm="R", nonce="n""#),
        ] {
            assert_eq!(
                parse_digest_credentials(header),
                Err(Error::MissingRequired(missing))
            );
        }
    }
}
