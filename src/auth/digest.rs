//! HTTP digest access authentication per RFC 2617.
//!
//! Covers the `MD5` and `MD5-sess` algorithms with the `auth` and
//! `auth-int` protection qualities. All hash inputs are the ASCII hex
//! digests of the previous stage, exactly as the RFC's examples compute
//! them.
//!
//! [`DigestAuthRequestScheme`] handles the `Authorization: Digest ...`
//! credentials (parsing, composition, digest calculation and verification);
//! [`DigestAuthChallengeScheme`] composes the `WWW-Authenticate` challenge.
//! Both emit the comma-joined parameter list after the `Digest` scheme
//! token.

use std::time::{SystemTime, UNIX_EPOCH};

use constant_time_eq::constant_time_eq;
use uuid::Uuid;

use crate::header::element::{format_param, split_elements, unquote};
use crate::protocol::ParseError;

/// Digest hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    Md5,
    Md5Sess,
}

impl Algorithm {
    pub fn parse(token: &str) -> Result<Self, ParseError> {
        match token {
            "MD5" => Ok(Algorithm::Md5),
            "MD5-sess" => Ok(Algorithm::Md5Sess),
            _ => Err(ParseError::not_implemented(format!(
                "Unknown digest authentication algorithm: {token:?}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Md5Sess => "MD5-sess",
        }
    }
}

/// Quality of protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qop {
    Auth,
    AuthInt,
}

impl Qop {
    pub fn parse(token: &str) -> Result<Self, ParseError> {
        match token {
            "auth" => Ok(Qop::Auth),
            "auth-int" => Ok(Qop::AuthInt),
            _ => Err(ParseError::not_implemented(format!(
                "Unknown quality of protection: {token:?}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Qop::Auth => "auth",
            Qop::AuthInt => "auth-int",
        }
    }
}

/// The parameter bag a digest exchange is computed from.
///
/// Which fields are required depends on the operation: calculating a request
/// digest needs the username/realm/password triple, nonce, method and uri;
/// `auth`/`auth-int` additionally need `cnonce` and `nc`; `auth-int` needs
/// the entity body. A precomputed `a1` replaces the password for
/// `MD5-sess` session keys.
#[derive(Debug, Clone, Default)]
pub struct AuthInfo {
    pub username: Option<String>,
    pub realm: Option<String>,
    pub password: Option<String>,
    pub nonce: Option<String>,
    pub uri: Option<String>,
    pub method: Option<String>,
    pub response: Option<String>,
    pub algorithm: Option<Algorithm>,
    pub qop: Option<Qop>,
    pub cnonce: Option<String>,
    pub nc: Option<String>,
    pub opaque: Option<String>,
    pub etag: Option<String>,
    pub domain: Option<String>,
    pub stale: Option<bool>,
    pub entity_body: Option<Vec<u8>>,
    pub a1: Option<String>,
}

impl AuthInfo {
    fn algorithm(&self) -> Algorithm {
        self.algorithm.unwrap_or_default()
    }
}

fn h<D: AsRef<[u8]>>(data: D) -> String {
    format!("{:x}", md5::compute(data))
}

fn require<'a>(field: &'a Option<String>, name: &str) -> Result<&'a str, ParseError> {
    field
        .as_deref()
        .ok_or_else(|| ParseError::invalid_header(format!("missing digest parameter: {name}")))
}

/// Composition and verification of `Authorization: Digest` credentials.
#[derive(Debug)]
pub struct DigestAuthRequestScheme;

impl DigestAuthRequestScheme {
    /// `A1` per RFC 2617 section 3.2.2.2.
    pub fn a1(authinfo: &AuthInfo) -> Result<String, ParseError> {
        let username = require(&authinfo.username, "username")?;
        let realm = require(&authinfo.realm, "realm")?;
        let password = require(&authinfo.password, "password")?;

        match authinfo.algorithm() {
            Algorithm::Md5 => Ok(format!("{username}:{realm}:{password}")),
            Algorithm::Md5Sess => {
                let nonce = require(&authinfo.nonce, "nonce")?;
                let cnonce = require(&authinfo.cnonce, "cnonce")?;
                Ok(format!("{}:{nonce}:{cnonce}", h(format!("{username}:{realm}:{password}"))))
            }
        }
    }

    /// `A2` per RFC 2617 section 3.2.2.3.
    pub fn a2(authinfo: &AuthInfo) -> Result<String, ParseError> {
        let method = require(&authinfo.method, "method")?;
        let uri = require(&authinfo.uri, "uri")?;

        match authinfo.qop {
            None | Some(Qop::Auth) => Ok(format!("{method}:{uri}")),
            Some(Qop::AuthInt) => {
                let body = authinfo.entity_body.as_deref().ok_or_else(|| {
                    ParseError::invalid_header("missing digest parameter: entity body")
                })?;
                Ok(format!("{method}:{uri}:{}", h(body)))
            }
        }
    }

    /// The request digest the `response` parameter must equal.
    pub fn calculate_request_digest(authinfo: &AuthInfo) -> Result<String, ParseError> {
        let secret = match (&authinfo.a1, authinfo.algorithm()) {
            (Some(a1), Algorithm::Md5Sess) => h(a1),
            _ => h(Self::a1(authinfo)?),
        };

        let nonce = require(&authinfo.nonce, "nonce")?;
        let hash_a2 = h(Self::a2(authinfo)?);

        let data = match authinfo.qop {
            Some(qop) => {
                let nc = require(&authinfo.nc, "nc")?;
                let cnonce = require(&authinfo.cnonce, "cnonce")?;
                format!("{nonce}:{nc}:{cnonce}:{}:{hash_a2}", qop.as_str())
            }
            None => format!("{nonce}:{hash_a2}"),
        };

        Ok(h(format!("{secret}:{data}")))
    }

    /// A fresh server nonce: `H(time:etag-or-realm:uuid)`.
    pub fn generate_nonce(authinfo: &AuthInfo) -> String {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let tag = authinfo.etag.as_deref().or(authinfo.realm.as_deref()).unwrap_or_default();
        h(format!("{seconds}:{tag}:{}", Uuid::new_v4()))
    }

    /// Verifies received credentials against the server's stored ones.
    ///
    /// The realms must match and the recomputed digest must equal the
    /// client's `response`; the comparison is constant-time.
    pub fn check(stored: &AuthInfo, received: &AuthInfo) -> Result<bool, ParseError> {
        if stored.realm != received.realm {
            return Ok(false);
        }
        let expected = Self::calculate_request_digest(stored)?;
        match received.response.as_deref() {
            Some(response) => Ok(constant_time_eq(expected.as_bytes(), response.as_bytes())),
            None => Ok(false),
        }
    }

    /// Emits the credential parameter list for an `Authorization` header.
    ///
    /// A missing nonce is generated, a missing response calculated.
    pub fn compose(authinfo: &AuthInfo) -> Result<String, ParseError> {
        let nonce = match authinfo.nonce.as_deref() {
            Some(nonce) if !nonce.is_empty() => nonce.replace('"', ""),
            _ => Self::generate_nonce(authinfo),
        };

        let response = match &authinfo.response {
            Some(response) => response.clone(),
            None => {
                let mut filled = authinfo.clone();
                filled.nonce = Some(nonce.clone());
                Self::calculate_request_digest(&filled)?
            }
        };

        let mut params: Vec<(&str, String)> = vec![
            ("username", require(&authinfo.username, "username")?.to_string()),
            ("realm", require(&authinfo.realm, "realm")?.to_string()),
            ("nonce", nonce),
            ("uri", require(&authinfo.uri, "uri")?.to_string()),
            ("response", response),
        ];
        if let Some(algorithm) = authinfo.algorithm {
            params.push(("algorithm", algorithm.as_str().to_string()));
        }
        if let Some(qop) = authinfo.qop {
            params.push(("cnonce", require(&authinfo.cnonce, "cnonce")?.to_string()));
            if let Some(opaque) = &authinfo.opaque {
                params.push(("opaque", opaque.clone()));
            }
            params.push(("qop", qop.as_str().to_string()));
            params.push(("nc", require(&authinfo.nc, "nc")?.to_string()));
        } else if let Some(opaque) = &authinfo.opaque {
            params.push(("opaque", opaque.clone()));
        }

        Ok(join_params(&params))
    }

    /// Parses the parameter list of `Authorization: Digest ...` credentials.
    pub fn parse(value: &str) -> Result<AuthInfo, ParseError> {
        let value = value.trim();
        let value = match value.split_once(char::is_whitespace) {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("digest") => rest,
            _ => value,
        };

        let mut authinfo = AuthInfo::default();
        for param in split_elements(value) {
            let Some((name, raw)) = param.split_once('=') else {
                return Err(ParseError::invalid_header(format!(
                    "invalid digest parameter: {param:?}"
                )));
            };
            let name = name.trim().to_ascii_lowercase();
            let value = unquote(raw.trim());
            match name.as_str() {
                "username" => authinfo.username = Some(value),
                "realm" => authinfo.realm = Some(value),
                "nonce" => authinfo.nonce = Some(value),
                "uri" => authinfo.uri = Some(value),
                "response" => authinfo.response = Some(value),
                "algorithm" => authinfo.algorithm = Some(Algorithm::parse(&value)?),
                "qop" => authinfo.qop = Some(Qop::parse(&value)?),
                "cnonce" => authinfo.cnonce = Some(value),
                "nc" => authinfo.nc = Some(value),
                "opaque" => authinfo.opaque = Some(value),
                // unrecognized auth-params are ignored per the RFC
                _ => {}
            }
        }
        Ok(authinfo)
    }
}

/// Composition of the `WWW-Authenticate: Digest` challenge.
#[derive(Debug)]
pub struct DigestAuthChallengeScheme;

impl DigestAuthChallengeScheme {
    /// Emits the challenge parameter list.
    pub fn compose(authinfo: &AuthInfo) -> Result<String, ParseError> {
        let realm = require(&authinfo.realm, "realm")?;
        let nonce = require(&authinfo.nonce, "nonce")?.replace('"', "");

        let mut params: Vec<(&str, String)> = vec![("realm", realm.to_string())];
        if let Some(domain) = &authinfo.domain {
            params.push(("domain", domain.clone()));
        }
        params.push(("nonce", nonce));
        if let Some(opaque) = &authinfo.opaque {
            params.push(("opaque", opaque.clone()));
        }
        if let Some(stale) = authinfo.stale {
            params.push(("stale", if stale { "true" } else { "false" }.to_string()));
        }
        params.push(("algorithm", authinfo.algorithm().as_str().to_string()));
        let qop = match authinfo.qop {
            Some(qop) => qop.as_str().to_string(),
            None => "auth,auth-int".to_string(),
        };
        params.push(("qop", qop));

        Ok(join_params(&params))
    }
}

fn join_params(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(name, value)| format_param(name, Some(value)))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The example exchange from RFC 2617 section 3.5.
    fn rfc_example() -> AuthInfo {
        AuthInfo {
            username: Some("Mufasa".to_string()),
            realm: Some("testrealm@host.com".to_string()),
            password: Some("Circle Of Life".to_string()),
            nonce: Some("dcd98b7102dd2f0e8b11d0f600bfb0c093".to_string()),
            uri: Some("/dir/index.html".to_string()),
            method: Some("GET".to_string()),
            qop: Some(Qop::Auth),
            nc: Some("00000001".to_string()),
            cnonce: Some("0a4f113b".to_string()),
            opaque: Some("5ccc069c403ebaf9f0171e9517f40e41".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn rfc2617_example_digest() {
        let digest = DigestAuthRequestScheme::calculate_request_digest(&rfc_example()).unwrap();
        assert_eq!(digest, "6629fae49393a05397450978507c4ef1");
    }

    #[test]
    fn digest_without_qop_uses_short_form() {
        let mut authinfo = rfc_example();
        authinfo.qop = None;
        let digest = DigestAuthRequestScheme::calculate_request_digest(&authinfo).unwrap();
        // H(H(A1):nonce:H(A2)) for the same inputs
        let ha1 = h("Mufasa:testrealm@host.com:Circle Of Life");
        let ha2 = h("GET:/dir/index.html");
        let expected = h(format!("{ha1}:dcd98b7102dd2f0e8b11d0f600bfb0c093:{ha2}"));
        assert_eq!(digest, expected);
    }

    #[test]
    fn md5_sess_mixes_nonce_into_the_session_key() {
        let mut authinfo = rfc_example();
        authinfo.algorithm = Some(Algorithm::Md5Sess);
        let sess = DigestAuthRequestScheme::calculate_request_digest(&authinfo).unwrap();
        let plain = DigestAuthRequestScheme::calculate_request_digest(&rfc_example()).unwrap();
        assert_ne!(sess, plain);

        // deterministic for fixed inputs
        let again = DigestAuthRequestScheme::calculate_request_digest(&authinfo).unwrap();
        assert_eq!(sess, again);
    }

    #[test]
    fn auth_int_hashes_the_entity_body() {
        let mut authinfo = rfc_example();
        authinfo.qop = Some(Qop::AuthInt);
        authinfo.entity_body = Some(b"body".to_vec());
        let a2 = DigestAuthRequestScheme::a2(&authinfo).unwrap();
        assert_eq!(a2, format!("GET:/dir/index.html:{}", h("body")));

        authinfo.entity_body = None;
        assert!(DigestAuthRequestScheme::a2(&authinfo).is_err());
    }

    #[test]
    fn check_accepts_matching_credentials() {
        let stored = rfc_example();
        let mut received = AuthInfo {
            realm: stored.realm.clone(),
            response: Some("6629fae49393a05397450978507c4ef1".to_string()),
            ..Default::default()
        };
        assert!(DigestAuthRequestScheme::check(&stored, &received).unwrap());

        received.response = Some("00000000000000000000000000000000".to_string());
        assert!(!DigestAuthRequestScheme::check(&stored, &received).unwrap());

        received.realm = Some("other".to_string());
        assert!(!DigestAuthRequestScheme::check(&stored, &received).unwrap());
    }

    #[test]
    fn nonce_is_a_hex_digest() {
        let nonce = DigestAuthRequestScheme::generate_nonce(&rfc_example());
        assert_eq!(nonce.len(), 32);
        assert!(nonce.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn unknown_algorithm_is_not_implemented() {
        let result = Algorithm::parse("SHA-512-SESS");
        assert!(matches!(result, Err(ParseError::NotImplemented { .. })));
    }

    #[test]
    fn credentials_round_trip_through_the_wire_form() {
        let composed = DigestAuthRequestScheme::compose(&rfc_example()).unwrap();
        let parsed = DigestAuthRequestScheme::parse(&composed).unwrap();

        assert_eq!(parsed.username.as_deref(), Some("Mufasa"));
        assert_eq!(parsed.realm.as_deref(), Some("testrealm@host.com"));
        assert_eq!(parsed.qop, Some(Qop::Auth));
        assert_eq!(parsed.response.as_deref(), Some("6629fae49393a05397450978507c4ef1"));
    }

    #[test]
    fn parse_accepts_the_scheme_prefix() {
        let parsed = DigestAuthRequestScheme::parse(
            r#"Digest username="Mufasa", realm="testrealm@host.com", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", uri="/dir/index.html", qop=auth, nc=00000001, cnonce="0a4f113b", response="6629fae49393a05397450978507c4ef1", opaque="5ccc069c403ebaf9f0171e9517f40e41""#,
        )
        .unwrap();

        let mut stored = rfc_example();
        stored.nonce = parsed.nonce.clone();
        assert!(DigestAuthRequestScheme::check(&stored, &parsed).unwrap());
    }

    #[test]
    fn challenge_lists_the_supported_qops() {
        let challenge = DigestAuthChallengeScheme::compose(&AuthInfo {
            realm: Some("users@example.org".to_string()),
            nonce: Some("abcdef".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert!(challenge.starts_with(r#"realm="users@example.org""#));
        assert!(challenge.contains("nonce=abcdef"));
        assert!(challenge.contains("algorithm=MD5"));
        assert!(challenge.contains(r#"qop="auth,auth-int""#));
    }
}
