use axum::http::StatusCode;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Why a delivery failed authentication.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing signature header")]
    Missing,

    #[error("signature does not match")]
    Invalid,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Missing => StatusCode::UNAUTHORIZED,
            Self::Invalid => StatusCode::FORBIDDEN,
        }
    }
}

/// Hex-encoded HMAC-SHA256 of `body` under `secret`.
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Check a raw signature header value against `body`. Accepts an optional
/// `sha256=` prefix. A present header that is not text is `Invalid`, not
/// `Missing`. Comparison is constant-time.
pub fn verify(secret: &[u8], body: &[u8], header: Option<&[u8]>) -> Result<(), AuthError> {
    let header = header
        .map(<[u8]>::trim_ascii)
        .filter(|h| !h.is_empty())
        .ok_or(AuthError::Missing)?;
    let header = std::str::from_utf8(header).map_err(|_| AuthError::Invalid)?;
    let hex_digest = header.strip_prefix("sha256=").unwrap_or(header);
    let expected = hex::decode(hex_digest).map_err(|_| AuthError::Invalid)?;

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| AuthError::Invalid)?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| AuthError::Invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"shared-secret";

    #[test]
    fn signature_round_trips() {
        let body = br#""{\"mods\":[]}""#;
        let sig = sign(SECRET, body);
        assert_eq!(sig.len(), 64);
        assert_eq!(verify(SECRET, body, Some(sig.as_bytes())), Ok(()));
        assert_eq!(
            verify(SECRET, body, Some(format!("sha256={sig}").as_bytes())),
            Ok(())
        );
    }

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2.
        let sig = sign(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn missing_header() {
        assert_eq!(verify(SECRET, b"x", None), Err(AuthError::Missing));
        assert_eq!(verify(SECRET, b"x", Some(b"  ".as_slice())), Err(AuthError::Missing));
        assert_eq!(AuthError::Missing.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn wrong_signature() {
        let sig = sign(b"other-secret", b"x");
        assert_eq!(verify(SECRET, b"x", Some(sig.as_bytes())), Err(AuthError::Invalid));
        assert_eq!(verify(SECRET, b"x", Some(b"not-hex".as_slice())), Err(AuthError::Invalid));
        assert_eq!(AuthError::Invalid.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn non_text_header_is_invalid() {
        assert_eq!(verify(SECRET, b"x", Some([0xff, 0xfe].as_slice())), Err(AuthError::Invalid));
        assert_eq!(verify(SECRET, b"x", Some(b"sha256=\xc3".as_slice())), Err(AuthError::Invalid));
    }

    #[test]
    fn tampered_body() {
        let sig = sign(SECRET, b"original");
        assert_eq!(
            verify(SECRET, b"tampered", Some(sig.as_bytes())),
            Err(AuthError::Invalid)
        );
    }
}
