use anyhow::{anyhow, Result};
use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::domain::Role;

type HmacSha256 = Hmac<Sha256>;

pub const COOKIE_NAME: &str = "session";

/// Identity carried in the signed session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub rol: Role,
}

impl Session {
    /// Admins may touch anything; everyone else only what they created.
    pub fn may_modify(&self, created_by: Option<i64>) -> bool {
        self.rol.is_admin() || created_by == Some(self.user_id)
    }
}

/// Signs and verifies session cookies with the configured secret.
#[derive(Clone)]
pub struct SessionKeys {
    secret: Vec<u8>,
}

impl SessionKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| anyhow!("Invalid session key: {}", e))
    }

    /// `<base64url(json)>.<hex(hmac-sha256)>`
    pub fn encode(&self, session: &Session) -> Result<String> {
        let payload_part = URL_SAFE_NO_PAD.encode(serde_json::to_vec(session)?);
        let mut mac = self.mac()?;
        mac.update(payload_part.as_bytes());
        let sig_part = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{}.{}", payload_part, sig_part))
    }

    /// A tampered, truncated or malformed token yields `None`.
    pub fn decode(&self, token: &str) -> Option<Session> {
        let (payload_part, sig_part) = token.split_once('.')?;
        let expected = hex::decode(sig_part).ok()?;
        let mut mac = self.mac().ok()?;
        mac.update(payload_part.as_bytes());
        mac.verify_slice(&expected).ok()?;

        let payload = URL_SAFE_NO_PAD.decode(payload_part).ok()?;
        serde_json::from_slice(&payload).ok()
    }

    /// `Set-Cookie` value that starts a session.
    pub fn set_cookie(&self, session: &Session) -> Result<String> {
        Ok(format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            COOKIE_NAME,
            self.encode(session)?
        ))
    }

    /// `Set-Cookie` value that ends the session.
    pub fn clear_cookie() -> String {
        format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", COOKIE_NAME)
    }

    /// The verified session from the request's `Cookie` headers, if any.
    pub fn from_headers(&self, headers: &HeaderMap) -> Option<Session> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .filter(|(name, _)| *name == COOKIE_NAME)
            .find_map(|(_, token)| self.decode(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn session() -> Session {
        Session {
            user_id: 7,
            username: "Minera1".to_string(),
            rol: Role::User,
        }
    }

    #[test]
    fn encode_decode() {
        let keys = SessionKeys::new("secret");
        let token = keys.encode(&session()).unwrap();
        assert_eq!(keys.decode(&token), Some(session()));
    }

    #[test]
    fn rejects_other_key_and_tampering() {
        let keys = SessionKeys::new("secret");
        let token = keys.encode(&session()).unwrap();
        assert_eq!(SessionKeys::new("other").decode(&token), None);

        let admin = Session {
            rol: Role::Admin,
            ..session()
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&admin).unwrap());
        let (_, sig) = token.split_once('.').unwrap();
        assert_eq!(keys.decode(&format!("{}.{}", forged_payload, sig)), None);
        assert_eq!(keys.decode("garbage"), None);
    }

    #[test]
    fn reads_cookie_among_others() {
        let keys = SessionKeys::new("secret");
        let token = keys.encode(&session()).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; session={}; lang=es", token)).unwrap(),
        );
        assert_eq!(keys.from_headers(&headers), Some(session()));
    }

    #[test]
    fn ownership() {
        let user = session();
        assert!(user.may_modify(Some(7)));
        assert!(!user.may_modify(Some(8)));
        assert!(!user.may_modify(None));
        let admin = Session {
            rol: Role::Admin,
            ..session()
        };
        assert!(admin.may_modify(None));
    }
}
