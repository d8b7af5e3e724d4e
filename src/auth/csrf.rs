//! Double-submit CSRF tokens: `nonce.signature`, both base64url, signed with
//! HMAC-SHA256 over the nonce.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use super::AuthError;

type HmacSha256 = Hmac<Sha256>;

pub const CSRF_COOKIE: &str = "csrf-token";
pub const CSRF_HEADER: &str = "x-csrf-token";

#[derive(Clone)]
pub struct CsrfSigner {
    key: Vec<u8>,
}

impl CsrfSigner {
    pub fn new(secret_key: &str) -> Self {
        Self { key: secret_key.as_bytes().to_vec() }
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(&self.key).map_err(|e| AuthError::Crypto(e.to_string()))
    }

    pub fn mint(&self) -> Result<String, AuthError> {
        let mut nonce = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut nonce);
        let nonce = URL_SAFE_NO_PAD.encode(nonce);

        let mut mac = self.mac()?;
        mac.update(nonce.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{}.{}", nonce, signature))
    }

    pub fn verify(&self, token: &str) -> Result<(), AuthError> {
        let (nonce, signature) = token.split_once('.').ok_or(AuthError::InvalidCsrf)?;
        let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|_| AuthError::InvalidCsrf)?;
        let mut mac = self.mac()?;
        mac.update(nonce.as_bytes());
        mac.verify_slice(&signature).map_err(|_| AuthError::InvalidCsrf)
    }

    /// Cookie value and header value must be the same signed token
    pub fn verify_pair(&self, cookie: Option<&str>, header: Option<&str>) -> Result<(), AuthError> {
        let cookie = cookie.ok_or(AuthError::MissingCsrf)?;
        let header = header.ok_or(AuthError::InvalidCsrf)?;
        if cookie != header {
            return Err(AuthError::InvalidCsrf);
        }
        self.verify(cookie)
    }

    pub fn cookie_header(token: &str) -> String {
        format!("{}={}; Path=/; HttpOnly; SameSite=Strict", CSRF_COOKIE, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_token_verifies() {
        let signer = CsrfSigner::new("key");
        let token = signer.mint().unwrap();
        assert!(signer.verify(&token).is_ok());
        assert!(signer.verify_pair(Some(&token), Some(&token)).is_ok());
    }

    #[test]
    fn foreign_or_mangled_tokens_fail() {
        let token = CsrfSigner::new("key").mint().unwrap();
        assert!(matches!(CsrfSigner::new("other").verify(&token), Err(AuthError::InvalidCsrf)));
        assert!(matches!(CsrfSigner::new("key").verify("no-dot"), Err(AuthError::InvalidCsrf)));
    }

    #[test]
    fn missing_cookie_is_distinguished() {
        let signer = CsrfSigner::new("key");
        let token = signer.mint().unwrap();
        assert!(matches!(signer.verify_pair(None, Some(&token)), Err(AuthError::MissingCsrf)));
        assert!(matches!(signer.verify_pair(Some(&token), Some("x.y")), Err(AuthError::InvalidCsrf)));
    }
}
