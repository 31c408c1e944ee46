//! Authentication request messages.

use crate::error::{Error, Result};
use crate::protocol::codec::{read_cstr, read_i32};

/// Authentication method codes.
pub mod auth_type {
    pub const OK: i32 = 0;
    pub const KERBEROS_V5: i32 = 2;
    pub const CLEARTEXT_PASSWORD: i32 = 3;
    pub const MD5_PASSWORD: i32 = 5;
    pub const GSS: i32 = 7;
    pub const GSS_CONTINUE: i32 = 8;
    pub const SSPI: i32 = 9;
    pub const SASL: i32 = 10;
    pub const SASL_CONTINUE: i32 = 11;
    pub const SASL_FINAL: i32 = 12;
}

/// Authentication request from the server ('R').
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationMessage<'a> {
    /// Authentication successful
    Ok,
    /// Kerberos V5 authentication required
    KerberosV5,
    /// Cleartext password required
    CleartextPassword,
    /// MD5 password required
    Md5Password {
        /// 4-byte salt
        salt: [u8; 4],
    },
    /// GSSAPI authentication
    Gss,
    /// GSSAPI or SSPI continuation
    GssContinue {
        /// Mechanism data
        data: &'a [u8],
    },
    /// SSPI authentication
    Sspi,
    /// SASL authentication required
    Sasl {
        /// Mechanisms in server preference order
        mechanisms: Vec<&'a str>,
    },
    /// SASL challenge (server-first-message)
    SaslContinue {
        /// Challenge data
        data: &'a [u8],
    },
    /// SASL outcome (server-final-message)
    SaslFinal {
        /// Additional data
        data: &'a [u8],
    },
}

impl<'a> AuthenticationMessage<'a> {
    /// Parse an Authentication message from payload bytes.
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (code, rest) = read_i32(payload)?;

        let message = match code {
            auth_type::OK => AuthenticationMessage::Ok,
            auth_type::KERBEROS_V5 => AuthenticationMessage::KerberosV5,
            auth_type::CLEARTEXT_PASSWORD => AuthenticationMessage::CleartextPassword,
            auth_type::MD5_PASSWORD => {
                let salt = rest
                    .try_into()
                    .map_err(|_| Error::Protocol("MD5Password: salt must be 4 bytes".into()))?;
                return Ok(AuthenticationMessage::Md5Password { salt });
            }
            auth_type::GSS => AuthenticationMessage::Gss,
            auth_type::GSS_CONTINUE => return Ok(AuthenticationMessage::GssContinue { data: rest }),
            auth_type::SSPI => AuthenticationMessage::Sspi,
            auth_type::SASL => {
                let mut mechanisms = Vec::new();
                let mut data = rest;
                loop {
                    let (mechanism, remaining) = read_cstr(data)?;
                    data = remaining;
                    if mechanism.is_empty() {
                        break;
                    }
                    mechanisms.push(mechanism);
                }
                super::expect_empty("AuthenticationSASL", data)?;
                return Ok(AuthenticationMessage::Sasl { mechanisms });
            }
            auth_type::SASL_CONTINUE => {
                return Ok(AuthenticationMessage::SaslContinue { data: rest });
            }
            auth_type::SASL_FINAL => return Ok(AuthenticationMessage::SaslFinal { data: rest }),
            _ => {
                return Err(Error::Protocol(format!(
                    "unknown authentication type: {}",
                    code
                )));
            }
        };
        super::expect_empty("Authentication", rest)?;
        Ok(message)
    }

    /// Method name used in logs and errors.
    pub fn method_name(&self) -> &'static str {
        match self {
            AuthenticationMessage::Ok => "ok",
            AuthenticationMessage::KerberosV5 => "Kerberos V5",
            AuthenticationMessage::CleartextPassword => "cleartext password",
            AuthenticationMessage::Md5Password { .. } => "MD5 password",
            AuthenticationMessage::Gss | AuthenticationMessage::GssContinue { .. } => "GSSAPI",
            AuthenticationMessage::Sspi => "SSPI",
            AuthenticationMessage::Sasl { .. }
            | AuthenticationMessage::SaslContinue { .. }
            | AuthenticationMessage::SaslFinal { .. } => "SASL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(code: i32, rest: &[u8]) -> Vec<u8> {
        let mut payload = code.to_be_bytes().to_vec();
        payload.extend_from_slice(rest);
        payload
    }

    #[test]
    fn test_parse_md5() {
        let payload = auth(auth_type::MD5_PASSWORD, &[1, 2, 3, 4]);
        assert_eq!(
            AuthenticationMessage::parse(&payload).unwrap(),
            AuthenticationMessage::Md5Password { salt: [1, 2, 3, 4] }
        );
        assert!(AuthenticationMessage::parse(&auth(auth_type::MD5_PASSWORD, &[1, 2])).is_err());
    }

    #[test]
    fn test_parse_sasl_mechanisms() {
        let payload = auth(auth_type::SASL, b"SCRAM-SHA-256-PLUS\0SCRAM-SHA-256\0\0");
        assert_eq!(
            AuthenticationMessage::parse(&payload).unwrap(),
            AuthenticationMessage::Sasl {
                mechanisms: vec!["SCRAM-SHA-256-PLUS", "SCRAM-SHA-256"]
            }
        );
        // list terminator missing
        assert!(AuthenticationMessage::parse(&auth(auth_type::SASL, b"SCRAM-SHA-256\0")).is_err());
    }

    #[test]
    fn test_parse_unsupported_kinds() {
        let gss_msg = auth(auth_type::GSS, &[]);
        let gss = AuthenticationMessage::parse(&gss_msg).unwrap();
        assert_eq!(gss.method_name(), "GSSAPI");
        assert!(AuthenticationMessage::parse(&auth(42, &[])).is_err());
        assert!(AuthenticationMessage::parse(&auth(auth_type::OK, &[0])).is_err());
    }
}
