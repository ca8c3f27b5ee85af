use crate::challenge::WwwAuthenticate;
use crate::utils::QuoteForDigest;
use crate::{Algorithm, Error::*, Qop, Result};
use std::fmt::{self, Display, Formatter};

use rand::Rng;

//region Hash chain

/// What goes into the second half of the chain, depending on qop
#[derive(Debug, Clone, Copy)]
#[allow(non_camel_case_types)]
pub enum QopAlgo<'a> {
    NONE,
    AUTH,
    AUTH_INT(&'a [u8]),
}

impl<'a> QopAlgo<'a> {
    /// Pair a qop with the entity body it protects
    pub fn new(qop: Option<Qop>, body: &'a [u8]) -> Self {
        match qop {
            None => QopAlgo::NONE,
            Some(Qop::AUTH) => QopAlgo::AUTH,
            Some(Qop::AUTH_INT) => QopAlgo::AUTH_INT(body),
        }
    }
}

impl<'a> From<QopAlgo<'a>> for Option<Qop> {
    fn from(q: QopAlgo<'a>) -> Self {
        match q {
            QopAlgo::NONE => None,
            QopAlgo::AUTH => Some(Qop::AUTH),
            QopAlgo::AUTH_INT(_) => Some(Qop::AUTH_INT),
        }
    }
}

/// `H(username:realm:password)`
pub fn ha1(h: Algorithm, username: &str, realm: &str, password: &str) -> String {
    h.hash_str(&format!(
        "{name}:{realm}:{pw}",
        name = username,
        realm = realm,
        pw = password
    ))
}

/// `H(method:uri)`, or `H(method:uri:H(body))` for auth-int
pub fn ha2(h: Algorithm, qop: QopAlgo, method: &str, uri: &str) -> String {
    let a2 = match qop {
        QopAlgo::AUTH | QopAlgo::NONE => format!("{method}:{uri}", method = method, uri = uri),
        QopAlgo::AUTH_INT(body) => format!(
            "{method}:{uri}:{bodyhash}",
            method = method,
            uri = uri,
            bodyhash = h.hash(body)
        ),
    };
    h.hash_str(&a2)
}

/// Everything needed to compute a Digest `response` value
#[derive(Debug, Clone)]
pub struct ResponseInput<'a> {
    pub algorithm: Algorithm,
    pub username: &'a str,
    pub realm: &'a str,
    pub password: &'a str,
    pub method: &'a str,
    pub uri: &'a str,
    pub qop: QopAlgo<'a>,
    pub nonce: &'a str,
    /// Nonce count as sent on the wire (8 hex digits)
    pub nc: Option<&'a str>,
    pub cnonce: Option<&'a str>,
}

impl<'a> ResponseInput<'a> {
    /// Run the full HA1/HA2/response chain.
    ///
    /// The RFC 2617 form is used only when qop, nc and cnonce are all present;
    /// anything less falls back to RFC 2069 `H(HA1:nonce:HA2)`.
    pub fn compute(&self) -> String {
        let h = self.algorithm;
        let ha1 = ha1(h, self.username, self.realm, self.password);
        let ha2 = ha2(h, self.qop, self.method, self.uri);

        let qop: Option<Qop> = self.qop.into();
        match (qop, self.nc, self.cnonce) {
            (Some(q), Some(nc), Some(cnonce)) => h.hash_str(&format!(
                "{ha1}:{nonce}:{nc}:{cnonce}:{qop}:{ha2}",
                ha1 = ha1,
                nonce = self.nonce,
                nc = nc,
                cnonce = cnonce,
                qop = q,
                ha2 = ha2
            )),
            _ => h.hash_str(&format!(
                "{ha1}:{nonce}:{ha2}",
                ha1 = ha1,
                nonce = self.nonce,
                ha2 = ha2
            )),
        }
    }
}

//endregion

//region Client side

/// Login attempt context for the client half of the exchange
///
/// All fields are borrowed; it is meaningful only for the one request.
#[derive(Debug)]
pub struct AuthContext<'a> {
    pub username: &'a str,
    pub password: &'a str,
    /// Request target (path and query), as the server will see it
    pub uri: &'a str,
    /// Request payload body, hashed for auth-int
    pub body: Option<&'a [u8]>,
    pub method: &'a str,
    /// Fixed client nonce (tests only; a random one is generated otherwise)
    pub cnonce: Option<&'a str>,
}

impl<'a> AuthContext<'a> {
    /// Construct a new context with the GET verb and no payload body
    pub fn new(username: &'a str, password: &'a str, uri: &'a str) -> Self {
        Self::new_with_method(username, password, uri, None, "GET")
    }

    /// Construct a new context with arbitrary verb and, optionally, a payload body
    pub fn new_with_method(
        username: &'a str,
        password: &'a str,
        uri: &'a str,
        body: Option<&'a [u8]>,
        method: &'a str,
    ) -> Self {
        Self {
            username,
            password,
            uri,
            body,
            method,
            cnonce: None,
        }
    }

    pub fn set_custom_cnonce(&mut self, cnonce: &'a str) {
        self.cnonce = Some(cnonce);
    }
}

/// `Authorization: Digest ...` value computed by a client from a challenge
#[derive(Debug, Clone)]
pub struct AuthorizationHeader {
    pub username: String,
    pub realm: String,
    pub nonce: String,
    pub uri: String,
    /// None in legacy compat mode (RFC 2069)
    pub qop: Option<Qop>,
    pub nc: u32,
    pub cnonce: String,
    pub response: String,
    pub opaque: Option<String>,
    /// None when the challenge did not name one
    pub algorithm: Option<Algorithm>,
}

impl AuthorizationHeader {
    /// Answer a parsed challenge. The challenge's `nc` counter is incremented.
    ///
    /// # Errors
    /// Fails if the challenge offers a qop list with nothing usable in it
    pub fn from_challenge(
        prompt: &mut WwwAuthenticate,
        context: &AuthContext,
    ) -> Result<AuthorizationHeader> {
        let empty_body: &[u8] = &[];
        let qop_algo = match &prompt.qop {
            None => QopAlgo::NONE,
            Some(offered) => {
                if offered.contains(&Qop::AUTH_INT) {
                    match context.body {
                        Some(b) => QopAlgo::AUTH_INT(b),
                        None if offered.contains(&Qop::AUTH) => QopAlgo::AUTH,
                        None => QopAlgo::AUTH_INT(empty_body),
                    }
                } else if offered.contains(&Qop::AUTH) {
                    QopAlgo::AUTH
                } else {
                    return Err(InvalidHeaderSyntax(format!("no usable qop in {:?}", offered)));
                }
            }
        };

        let cnonce = match context.cnonce {
            Some(cnonce) => cnonce.to_owned(),
            None => {
                let mut rng = rand::thread_rng();
                let nonce_bytes: [u8; 16] = rng.gen();
                hex::encode(nonce_bytes)
            }
        };

        prompt.nc += 1;
        let nc = format!("{:08x}", prompt.nc);

        let response = ResponseInput {
            algorithm: prompt.algorithm.unwrap_or_default(),
            username: context.username,
            realm: &prompt.realm,
            password: context.password,
            method: context.method,
            uri: context.uri,
            qop: qop_algo,
            nonce: &prompt.nonce,
            nc: Some(nc.as_str()),
            cnonce: Some(cnonce.as_str()),
        }
        .compute();

        Ok(AuthorizationHeader {
            username: context.username.to_owned(),
            realm: prompt.realm.clone(),
            nonce: prompt.nonce.clone(),
            uri: context.uri.to_owned(),
            qop: qop_algo.into(),
            nc: prompt.nc,
            cnonce,
            response,
            opaque: prompt.opaque.clone(),
            algorithm: prompt.algorithm,
        })
    }
}

impl Display for AuthorizationHeader {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Digest username=\"{}\"", self.username.quote_for_digest())?;
        write!(f, ", realm=\"{}\"", self.realm.quote_for_digest())?;
        write!(f, ", nonce=\"{}\"", self.nonce.quote_for_digest())?;
        write!(f, ", uri=\"{}\"", self.uri.quote_for_digest())?;

        if let Some(qop) = self.qop {
            write!(
                f,
                ", qop={qop}, nc={nc:08x}, cnonce=\"{cnonce}\"",
                qop = qop,
                nc = self.nc,
                cnonce = self.cnonce.quote_for_digest()
            )?;
        }

        write!(f, ", response=\"{}\"", self.response)?;

        if let Some(opaque) = &self.opaque {
            write!(f, ", opaque=\"{}\"", opaque.quote_for_digest())?;
        }

        if let Some(algorithm) = self.algorithm {
            write!(f, ", algorithm={}", algorithm)?;
        }

        Ok(())
    }
}

//endregion

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn rfc_input<'a>(algorithm: Algorithm, qop: QopAlgo<'a>, password: &'a str) -> ResponseInput<'a> {
        ResponseInput {
            algorithm,
            username: "Mufasa",
            realm: "http-auth@example.org",
            password,
            method: "GET",
            uri: "/dir/index.html",
            qop,
            nonce: "7ypf/xlj9XXwfDPEoM4URrv/xwf94BcCAzFZH4GiTo0v",
            nc: Some("00000001"),
            cnonce: Some("f2/wE4q74E6zIJEtWaHKaf5wv/H5QzzpXusqGemxURZJ"),
        }
    }

    #[test]
    fn test_rfc2069() {
        // The RFC has a wrong hash in the example, see errata
        let input = ResponseInput {
            algorithm: Algorithm::MD5,
            username: "Mufasa",
            realm: "testrealm@host.com",
            password: "CircleOfLife",
            method: "GET",
            uri: "/dir/index.html",
            qop: QopAlgo::NONE,
            nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093",
            nc: None,
            cnonce: None,
        };
        assert_eq!(input.compute(), "1949323746fe6a43ef61f9606e7febea");
    }

    #[test]
    fn test_rfc2617() {
        let input = ResponseInput {
            algorithm: Algorithm::MD5,
            username: "Mufasa",
            realm: "testrealm@host.com",
            password: "Circle Of Life",
            method: "GET",
            uri: "/dir/index.html",
            qop: QopAlgo::AUTH,
            nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093",
            nc: Some("00000001"),
            cnonce: Some("0a4f113b"),
        };
        assert_eq!(input.compute(), "6629fae49393a05397450978507c4ef1");
    }

    #[test]
    fn test_rfc7616_md5() {
        let input = rfc_input(Algorithm::MD5, QopAlgo::AUTH, "Circle of Life");
        assert_eq!(input.compute(), "8ca523f5e9506fed4657c9700eebdbec");
    }

    #[test]
    fn test_rfc7616_sha256() {
        let input = rfc_input(Algorithm::SHA2_256, QopAlgo::AUTH, "Circle of Life");
        assert_eq!(
            input.compute(),
            "753927fa0e85d155564e2e272a28d1802ca10daf4496794697cf8db5856cb6c1"
        );
    }

    #[test]
    fn test_missing_cnonce_falls_back_to_rfc2069() {
        let mut input = rfc_input(Algorithm::SHA2_512, QopAlgo::AUTH, "pw");
        input.cnonce = None;

        let h = Algorithm::SHA2_512;
        let expected = h.hash_str(&format!(
            "{}:{}:{}",
            ha1(h, "Mufasa", "http-auth@example.org", "pw"),
            input.nonce,
            ha2(h, QopAlgo::AUTH, "GET", "/dir/index.html")
        ));
        assert_eq!(input.compute(), expected);
    }

    #[test]
    fn test_auth_int_hashes_body() {
        let h = Algorithm::SHA2_256;
        let body = b"{\"hello\": 1}";
        assert_eq!(
            ha2(h, QopAlgo::AUTH_INT(body), "POST", "/x"),
            h.hash_str(&format!("POST:/x:{}", h.hash(body)))
        );
        assert_ne!(
            ha2(h, QopAlgo::AUTH_INT(body), "POST", "/x"),
            ha2(h, QopAlgo::AUTH_INT(b""), "POST", "/x")
        );
        assert_eq!(
            ha2(h, QopAlgo::AUTH, "POST", "/x"),
            ha2(h, QopAlgo::NONE, "POST", "/x")
        );
    }

    #[test]
    fn test_respond_to_challenge() {
        let src = r#"Digest realm="http-auth@example.org", nonce="7ypf/xlj9XXwfDPEoM4URrv/xwf94BcCAzFZH4GiTo0v", qop="auth, auth-int", algorithm=SHA-256, opaque="FQhe/qaU925kfnzjCev0ciny7QMkPqMAFRtzCUYo5tdS""#;

        let mut context = AuthContext::new("Mufasa", "Circle of Life", "/dir/index.html");
        context.set_custom_cnonce("f2/wE4q74E6zIJEtWaHKaf5wv/H5QzzpXusqGemxURZJ");

        let mut prompt = WwwAuthenticate::from_str(src).unwrap();
        let answer = AuthorizationHeader::from_challenge(&mut prompt, &context).unwrap();

        let str = answer.to_string().replace(", ", ",\n  ");
        assert_eq!(
            str,
            r#"
Digest username="Mufasa",
  realm="http-auth@example.org",
  nonce="7ypf/xlj9XXwfDPEoM4URrv/xwf94BcCAzFZH4GiTo0v",
  uri="/dir/index.html",
  qop=auth,
  nc=00000001,
  cnonce="f2/wE4q74E6zIJEtWaHKaf5wv/H5QzzpXusqGemxURZJ",
  response="753927fa0e85d155564e2e272a28d1802ca10daf4496794697cf8db5856cb6c1",
  opaque="FQhe/qaU925kfnzjCev0ciny7QMkPqMAFRtzCUYo5tdS",
  algorithm=SHA-256
"#
            .trim()
        );

        // nc is part of the hash, so the second answer differs
        let second = AuthorizationHeader::from_challenge(&mut prompt, &context).unwrap();
        assert_eq!(second.nc, 2);
        assert_ne!(second.response, answer.response);
    }

    #[test]
    fn test_respond_prefers_auth_int_with_body() {
        let mut prompt =
            WwwAuthenticate::from_str(r#"Digest realm="r", nonce="n", qop="auth,auth-int""#).unwrap();
        let ctx = AuthContext::new_with_method("u", "p", "/post", Some(&b"data"[..]), "POST");
        let answer = AuthorizationHeader::from_challenge(&mut prompt, &ctx).unwrap();
        assert_eq!(answer.qop, Some(Qop::AUTH_INT));
        assert_eq!(answer.algorithm, None);
        assert_eq!(answer.cnonce.len(), 32);
    }
}
