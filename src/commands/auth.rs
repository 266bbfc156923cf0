use std::io::{self, Read};
use std::time::SystemTime;

use serde::Serialize;

use crate::auth::backend::AuthBackend;
use crate::auth::{CredentialKey, CredentialStore, TokenPair, token};
use crate::cli::{AuthCommand, LoginArgs};
use crate::context::AppContext;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
pub struct AuthStatusView {
    pub profile: String,
    pub logged_in: bool,
    pub expired: Option<bool>,
    pub expires_in_seconds: Option<i64>,
    pub has_refresh_token: Option<bool>,
    pub note: Option<String>,
}

pub async fn run(ctx: &AppContext, command: AuthCommand) -> AppResult<()> {
    match command {
        AuthCommand::Login(args) => login(ctx, &args),
        AuthCommand::Status => status(ctx),
        AuthCommand::Refresh => refresh(ctx).await,
        AuthCommand::Logout => logout(ctx),
    }
}

fn login(ctx: &AppContext, args: &LoginArgs) -> AppResult<()> {
    let pair = resolve_login_pair(args)?;

    if token::decode_claims(&pair.access_token).is_none() {
        return Err(AppError::InvalidInput(
            "access token is not a decodable bearer token (expected header.payload.signature)"
                .to_string(),
        ));
    }

    ctx.credential_store
        .set(CredentialKey::AccessToken, &pair.access_token)?;
    match &pair.refresh_token {
        Some(refresh_token) => ctx
            .credential_store
            .set(CredentialKey::RefreshToken, refresh_token)?,
        // A stale refresh token from a previous login must not linger.
        None => ctx.credential_store.remove(CredentialKey::RefreshToken)?,
    }
    ctx.api_client.set_token(&pair.access_token);

    let view = status_view(ctx)?;
    let text = describe_status(&view);
    ctx.output.emit(&text, &view)
}

fn status(ctx: &AppContext) -> AppResult<()> {
    let view = status_view(ctx)?;
    let text = describe_status(&view);
    ctx.output.emit(&text, &view)
}

async fn refresh(ctx: &AppContext) -> AppResult<()> {
    let refresh_token = ctx.credential_store.refresh_token()?.ok_or_else(|| {
        AppError::Auth("no refresh token stored. run `showcall auth login`".to_string())
    })?;

    let pair = ctx.auth_backend.refresh(&refresh_token).await?;
    ctx.api_client.set_token(&pair.access_token);
    ctx.credential_store.store_pair(&pair)?;

    let view = status_view(ctx)?;
    let text = format!("{}: session refreshed; {}", ctx.profile, describe_expiry(&view));
    ctx.output.emit(&text, &view)
}

fn logout(ctx: &AppContext) -> AppResult<()> {
    ctx.credential_store.clear()?;
    ctx.api_client.clear_token();

    let view = AuthStatusView {
        profile: ctx.profile.clone(),
        logged_in: false,
        expired: None,
        expires_in_seconds: None,
        has_refresh_token: None,
        note: Some("local credentials removed".to_string()),
    };
    let text = format!("{}: logged out", ctx.profile);
    ctx.output.emit(&text, &view)
}

fn resolve_login_pair(args: &LoginArgs) -> AppResult<TokenPair> {
    if args.stdin {
        let mut raw = String::new();
        io::stdin().read_to_string(&mut raw)?;
        let pair = serde_json::from_str(&raw)?;
        return Ok(pair);
    }

    let access_token = args.access_token.clone().ok_or_else(|| {
        AppError::InvalidInput(
            "pass --access-token (and usually --refresh-token), or --stdin to read a token pair as JSON"
                .to_string(),
        )
    })?;

    Ok(TokenPair {
        access_token,
        refresh_token: args.refresh_token.clone(),
    })
}

fn status_view(ctx: &AppContext) -> AppResult<AuthStatusView> {
    let Some(access_token) = ctx.credential_store.access_token()? else {
        return Ok(AuthStatusView {
            profile: ctx.profile.clone(),
            logged_in: false,
            expired: None,
            expires_in_seconds: None,
            has_refresh_token: None,
            note: Some("no credentials found".to_string()),
        });
    };

    let now = SystemTime::now();
    let claims = token::decode_claims(&access_token).unwrap_or_default();
    let has_refresh_token = ctx.credential_store.refresh_token()?.is_some();

    Ok(AuthStatusView {
        profile: ctx.profile.clone(),
        logged_in: true,
        expired: Some(claims.is_expired(now)),
        expires_in_seconds: claims.expires_in_seconds(now),
        has_refresh_token: Some(has_refresh_token),
        note: None,
    })
}

fn describe_status(view: &AuthStatusView) -> String {
    if !view.logged_in {
        return format!("{}: logged out", view.profile);
    }

    let refresh_hint = match view.has_refresh_token {
        Some(true) => " (refresh available)",
        Some(false) => " (no refresh token)",
        None => "",
    };

    format!(
        "{}: logged in; {}{}",
        view.profile,
        describe_expiry(view),
        refresh_hint
    )
}

fn describe_expiry(view: &AuthStatusView) -> String {
    match (view.expired, view.expires_in_seconds) {
        (Some(true), _) => "access token expired".to_string(),
        (_, Some(seconds)) => format!("access token expires in {seconds}s"),
        _ => "access token has no expiry claim".to_string(),
    }
}
