use axum::{
    extract::{Path, Query, State},
    http::{
        header::{AUTHORIZATION, COOKIE, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use voting_app::application::ports::CodeVerifier;
use voting_app::application::{lookup, remaining_for, submit_vote, Rankings, TOP_LIMIT};
use voting_app::domain::{
    AccessToken, Character, CharacterId, DailyQuota, Identity, RankingsPage, VoteReceipt,
    DEFAULT_PER_PAGE,
};
use voting_app::AppContext;
use voting_errors::AppError;

const SESSION_COOKIE: &str = "sb-access-token";
const VERIFIER_COOKIE: &str = "sb-code-verifier";
const SESSION_MAX_AGE_SECS: u64 = 60 * 60;
const VERIFIER_MAX_AGE_SECS: u64 = 10 * 60;

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/api/characters", get(search_characters))
        .route("/api/characters/{id}/vote", post(vote))
        .route("/api/top", get(top_characters))
        .route("/api/rankings", get(rankings))
        .route("/api/quota", get(quota))
        .route("/auth/sign-in", get(sign_in))
        .route("/auth/callback", get(auth_callback))
        .route("/auth/sign-out", post(sign_out))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Deserialize)]
struct RankingsParams {
    page: Option<usize>,
    per_page: Option<usize>,
}

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
}

async fn search_characters(
    State(ctx): State<AppContext>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Character>>, AppError> {
    let characters = lookup(ctx.remote.as_ref(), &ctx.cache, &params.q).await?;
    Ok(Json(characters))
}

async fn top_characters(State(ctx): State<AppContext>) -> Result<Json<Vec<Character>>, AppError> {
    Ok(Json(ctx.remote.top_by_votes(TOP_LIMIT).await?))
}

async fn rankings(
    State(ctx): State<AppContext>,
    Query(params): Query<RankingsParams>,
) -> Result<Json<RankingsPage>, AppError> {
    let board = Rankings::load(ctx.remote.as_ref()).await?;
    Ok(Json(board.page(
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(DEFAULT_PER_PAGE),
    )))
}

async fn quota(State(ctx): State<AppContext>, headers: HeaderMap) -> Json<DailyQuota> {
    let identity = identity(&ctx, &headers).await;
    Json(remaining_for(ctx.remote.as_ref(), identity.as_ref(), Utc::now().date_naive()).await)
}

async fn vote(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<VoteReceipt>, AppError> {
    let identity = identity(&ctx, &headers)
        .await
        .ok_or(AppError::NotAuthenticated)?;

    let quota = remaining_for(ctx.remote.as_ref(), Some(&identity), Utc::now().date_naive()).await;
    if !quota.can_vote() {
        return Err(AppError::QuotaExhausted);
    }

    let character_id = CharacterId(id);
    submit_vote(
        ctx.remote.as_ref(),
        &identity,
        character_id,
        ctx.config.vote_timeout,
    )
    .await
    .inspect_err(|e| tracing::warn!("Vote for {} rejected: {}", character_id, e))?;

    ctx.cache.invalidate_all();
    tracing::info!("Vote counted for {} by {}", character_id, identity.id);
    Ok(Json(VoteReceipt::counted()))
}

async fn sign_in(State(ctx): State<AppContext>) -> Result<Response, AppError> {
    let callback = ctx
        .config
        .site_url
        .join("/auth/callback")
        .map_err(|e| AppError::InvalidConfig(format!("SITE_URL: {}", e)))?;
    let request = ctx.auth.authorize(callback.as_str())?;

    let verifier = cookie_header(
        &ctx,
        VERIFIER_COOKIE,
        request.verifier.secret(),
        VERIFIER_MAX_AGE_SECS,
    );
    Ok((
        AppendHeaders([(SET_COOKIE, verifier)]),
        Redirect::to(&request.url),
    )
        .into_response())
}

async fn auth_callback(
    State(ctx): State<AppContext>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let Some(code) = params.code else {
        return Ok((StatusCode::NOT_FOUND, "Not Found").into_response());
    };
    let verifier = cookie(&headers, VERIFIER_COOKIE)
        .map(CodeVerifier::new)
        .ok_or(AppError::NotAuthenticated)?;

    let identity = ctx.auth.exchange_code(&code, &verifier).await?;

    Ok((
        AppendHeaders([
            (
                SET_COOKIE,
                cookie_header(
                    &ctx,
                    SESSION_COOKIE,
                    identity.access_token.expose(),
                    SESSION_MAX_AGE_SECS,
                ),
            ),
            (SET_COOKIE, cookie_header(&ctx, VERIFIER_COOKIE, "", 0)),
        ]),
        Redirect::to("/"),
    )
        .into_response())
}

async fn sign_out(State(ctx): State<AppContext>, headers: HeaderMap) -> Response {
    if let Some(identity) = identity(&ctx, &headers).await {
        if let Err(e) = ctx.auth.sign_out(&identity).await {
            tracing::warn!("Remote sign-out failed for {}: {}", identity.id, e);
        }
    }

    (
        AppendHeaders([(SET_COOKIE, cookie_header(&ctx, SESSION_COOKIE, "", 0))]),
        Redirect::to("/"),
    )
        .into_response()
}

/// Bearer header first, then the session cookie.
async fn identity(ctx: &AppContext, headers: &HeaderMap) -> Option<Identity> {
    let token = access_token(headers)?;
    match ctx.auth.identity_for_token(&token).await {
        Ok(identity) => Some(identity),
        Err(e) => {
            tracing::debug!("Ignoring access token: {}", e);
            None
        }
    }
}

fn access_token(headers: &HeaderMap) -> Option<AccessToken> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    bearer
        .or_else(|| cookie(headers, SESSION_COOKIE))
        .map(AccessToken::new)
}

fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn cookie_header(ctx: &AppContext, name: &str, value: &str, max_age: u64) -> String {
    let secure = if ctx.config.site_url.scheme() == "https" {
        "; Secure"
    } else {
        ""
    };
    format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}{secure}")
}
