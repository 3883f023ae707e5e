use crate::error::AppError;
use crate::models::user::*;
use crate::state::AppState;
use crate::validation;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Duration, NaiveDateTime};
use rand::RngCore;
use rusqlite::{params, OptionalExtension};
use sha2::{Digest, Sha256};
use uuid::Uuid;

const SALT_LEN: usize = 16;
const HASH_ROUNDS: u32 = 100_000;
const SESSION_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn digest(salt: &[u8], password: &str, rounds: u32) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let mut out = hasher.finalize();
    for _ in 1..rounds {
        let mut hasher = Sha256::new();
        hasher.update(out);
        hasher.update(salt);
        out = hasher.finalize();
    }
    out.to_vec()
}

/// `rounds$base64(salt)$base64(digest)`, the digest being SHA-256 chained `rounds` times.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    format!(
        "{}${}${}",
        HASH_ROUNDS,
        STANDARD.encode(salt),
        STANDARD.encode(digest(&salt, password, HASH_ROUNDS))
    )
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(rounds), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let (Ok(rounds), Ok(salt), Ok(expected)) = (
        rounds.parse::<u32>(),
        STANDARD.decode(salt),
        STANDARD.decode(expected),
    ) else {
        return false;
    };
    if rounds == 0 {
        return false;
    }
    let actual = digest(&salt, password, rounds);
    actual.len() == expected.len()
        && actual
            .iter()
            .zip(&expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let value = header?.trim();
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

pub fn register(state: &AppState, req: Credentials) -> Result<UserInfo, AppError> {
    let username = validation::validate_username(&req.username)?;
    validation::validate_password(&req.password)?;
    let password_hash = hash_password(&req.password);

    let (id, total_users) = state.db.with_tx(|tx| -> Result<(i64, i64), AppError> {
        let taken: Option<i64> = tx
            .query_row(
                "SELECT id FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_some() {
            return Err(AppError::BadRequest("Username is already taken".into()));
        }
        tx.execute(
            "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
            params![username, password_hash],
        )?;
        let id = tx.last_insert_rowid();
        let total: i64 = tx.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok((id, total))
    })?;

    tracing::info!(user_id = id, %username, "user registered");
    state.notifier.notify(format!(
        "New user registered: {} (total users: {})",
        username, total_users
    ));
    Ok(UserInfo { id, username })
}

pub fn login(state: &AppState, req: Credentials) -> Result<Token, AppError> {
    let username = req.username.trim();
    let user: Option<(i64, String)> = state.db.with_conn(|conn| {
        conn.query_row(
            "SELECT id, password_hash FROM users WHERE username = ?1 AND is_active = 1",
            params![username],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
    })?;

    let user_id = match user {
        Some((id, hash)) if verify_password(&req.password, &hash) => id,
        _ => {
            return Err(AppError::Unauthorized(
                "Incorrect username or password".into(),
            ))
        }
    };

    let token = Uuid::new_v4().simple().to_string();
    let now = state.clock.now().naive_utc();
    let expires_at = now + Duration::minutes(state.config.token_ttl_minutes);
    let pruned = state.db.with_tx(|tx| -> Result<usize, AppError> {
        let pruned = tx.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            params![now.format(SESSION_TIME_FORMAT).to_string()],
        )?;
        tx.execute(
            "INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
            params![
                token,
                user_id,
                expires_at.format(SESSION_TIME_FORMAT).to_string()
            ],
        )?;
        Ok(pruned)
    })?;
    if pruned > 0 {
        tracing::debug!(pruned, "expired sessions removed");
    }

    tracing::info!(user_id, "user logged in");
    Ok(Token {
        access_token: token,
        token_type: "bearer".into(),
    })
}

/// Maps a session token to its owner id. Unknown or expired tokens are unauthorized.
pub fn resolve_owner(state: &AppState, token: &str) -> Result<i64, AppError> {
    let session: Option<(i64, String)> = state.db.with_conn(|conn| {
        conn.query_row(
            "SELECT s.user_id, s.expires_at FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token = ?1 AND u.is_active = 1",
            params![token],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
    })?;

    let Some((user_id, expires_at)) = session else {
        return Err(AppError::Unauthorized("Invalid token".into()));
    };
    let expired = NaiveDateTime::parse_from_str(&expires_at, SESSION_TIME_FORMAT)
        .map(|exp| exp <= state.clock.now().naive_utc())
        .unwrap_or(true);
    if expired {
        state.db.with_conn(|conn| {
            conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])
        })?;
        return Err(AppError::Unauthorized("Token expired".into()));
    }
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::test_app;
    use chrono::{TimeZone, Utc};

    fn creds(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn test_password_hash_round_trip() {
        let stored = hash_password("hunter22");
        assert!(verify_password("hunter22", &stored));
        assert!(!verify_password("hunter23", &stored));
        assert!(!verify_password("hunter22", "garbage"));
        assert!(!verify_password("hunter22", "0$AAAA$AAAA"));
        assert!(stored.starts_with("100000$"));
        assert_ne!(stored, hash_password("hunter22"));
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("bearer  abc ")), Some("abc"));
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn test_register_login_resolve() {
        let app = test_app(Utc.with_ymd_and_hms(2025, 11, 21, 9, 0, 0).unwrap());
        let user = register(&app.state, creds("tower", "secret")).unwrap();
        assert_eq!(app.notifier.messages().len(), 1);

        let dup = register(&app.state, creds(" tower ", "secret"));
        assert!(matches!(dup, Err(AppError::BadRequest(_))));

        assert!(matches!(
            login(&app.state, creds("tower", "wrong")),
            Err(AppError::Unauthorized(_))
        ));
        let token = login(&app.state, creds("tower", "secret")).unwrap();
        assert_eq!(token.token_type, "bearer");
        assert_eq!(resolve_owner(&app.state, &token.access_token).unwrap(), user.id);
        assert!(resolve_owner(&app.state, "nope").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let app = test_app(Utc.with_ymd_and_hms(2025, 11, 21, 9, 0, 0).unwrap());
        register(&app.state, creds("expiry", "secret")).unwrap();
        let token = login(&app.state, creds("expiry", "secret")).unwrap();

        app.clock
            .advance(Duration::minutes(app.state.config.token_ttl_minutes + 1));
        assert!(matches!(
            resolve_owner(&app.state, &token.access_token),
            Err(AppError::Unauthorized(_))
        ));
    }

    fn session_count(app: &crate::state::testing::TestApp) -> i64 {
        app.state
            .db
            .with_conn(|conn| conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0)))
            .unwrap()
    }

    #[test]
    fn test_login_prunes_expired_sessions() {
        let app = test_app(Utc.with_ymd_and_hms(2025, 11, 21, 9, 0, 0).unwrap());
        register(&app.state, creds("pruner", "secret")).unwrap();
        login(&app.state, creds("pruner", "secret")).unwrap();
        login(&app.state, creds("pruner", "secret")).unwrap();
        assert_eq!(session_count(&app), 2);

        app.clock
            .advance(Duration::minutes(app.state.config.token_ttl_minutes + 1));
        let fresh = login(&app.state, creds("pruner", "secret")).unwrap();
        assert_eq!(session_count(&app), 1);
        assert!(resolve_owner(&app.state, &fresh.access_token).is_ok());
    }
}
