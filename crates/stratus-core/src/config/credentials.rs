//! Resolve platform credentials.

use crate::deploy::EnvVars;
use crate::error::{StratusError, StratusResult};

pub const ACCOUNT_SID_VAR: &str = "STRATUS_ACCOUNT_SID";
pub const AUTH_TOKEN_VAR: &str = "STRATUS_AUTH_TOKEN";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_sid: String,
    pub auth_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

/// Pick credentials from flags, then the process environment, then `.env`.
pub fn resolve_credentials(
    account_sid: Option<String>,
    auth_token: Option<String>,
    env_file: &EnvVars,
) -> StratusResult<Credentials> {
    resolve_with(account_sid, auth_token, env_file, |key| std::env::var(key).ok())
}

pub(crate) fn resolve_with(
    account_sid: Option<String>,
    auth_token: Option<String>,
    env_file: &EnvVars,
    process_env: impl Fn(&str) -> Option<String>,
) -> StratusResult<Credentials> {
    let pick = |flag: Option<String>, var: &str, file_key: &str| {
        flag.filter(|v| !v.is_empty())
            .or_else(|| process_env(var).filter(|v| !v.is_empty()))
            .or_else(|| env_file.get(file_key).filter(|v| !v.is_empty()).cloned())
    };

    let account_sid = pick(account_sid, ACCOUNT_SID_VAR, "ACCOUNT_SID").ok_or_else(|| {
        StratusError::configuration(format!(
            "no account sid: pass --account-sid, set {} or add ACCOUNT_SID to .env",
            ACCOUNT_SID_VAR
        ))
    })?;
    let auth_token = pick(auth_token, AUTH_TOKEN_VAR, "AUTH_TOKEN").ok_or_else(|| {
        StratusError::configuration(format!(
            "no auth token: pass --auth-token, set {} or add AUTH_TOKEN to .env",
            AUTH_TOKEN_VAR
        ))
    })?;

    Ok(Credentials {
        account_sid,
        auth_token,
    })
}
