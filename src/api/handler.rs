use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::logger::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{self, reject};

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CredentialsRequest {
    fn into_parts(self) -> Result<(String, String), warp::Rejection> {
        match (self.username, self.password) {
            (Some(username), Some(password))
                if !username.trim().is_empty() && !password.is_empty() =>
            {
                Ok((username, password))
            }
            _ => Err(reject::custom(ApiError::validation(
                "username and password are required",
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    token: AccessToken,
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

impl From<AuthSession> for SessionResponse {
    fn from(session: AuthSession) -> Self {
        SessionResponse {
            token: session.access_token,
            user_id: session.user_id,
            expires_at: session.expires_at,
        }
    }
}

pub async fn signup(
    body: CredentialsRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let (username, password) = body.into_parts()?;
    let session = auth_service
        .signup(SignupInput { username, password })
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&SessionResponse::from(session)),
        StatusCode::CREATED,
    ))
}

pub async fn login(
    body: CredentialsRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let (username, password) = body.into_parts()?;
    let session = auth_service
        .login(LoginInput { username, password })
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&SessionResponse::from(session)))
}

/// Browser clients keep ids in local storage and send them back as JSON
/// numbers or as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdField {
    Number(i64),
    Text(String),
}

impl IdField {
    fn parse(&self, field: &str) -> Result<i64, warp::Rejection> {
        match self {
            IdField::Number(id) => Ok(*id),
            IdField::Text(raw) => raw.trim().parse().map_err(|_| {
                reject::custom(ApiError::validation(format!("{field} must be an integer")))
            }),
        }
    }
}

/// A client-supplied user id is only ever checked against the token.
fn ensure_owner(owner: UserId, claimed: Option<&IdField>) -> Result<(), warp::Rejection> {
    let Some(claimed) = claimed else {
        return Ok(());
    };
    let claimed = UserId(claimed.parse("userId")?);
    if claimed != owner {
        warn!(%owner, %claimed, "request names another user");
        return Err(reject::custom(ApiError::from(ApiErrorCode::Forbidden)));
    }
    Ok(())
}

fn required(value: Option<String>, field: &str) -> Result<String, warp::Rejection> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(reject::custom(ApiError::validation(format!(
            "{field} is required"
        )))),
    }
}

fn parse_status(raw: &str) -> Result<VisitStatus, warp::Rejection> {
    raw.parse::<VisitStatus>()
        .map_err(CountryStatusError::from)
        .map_err(ApiError::from)
        .map_err(reject::custom)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertCountryRequest {
    pub user_id: Option<IdField>,
    pub iso_code: Option<String>,
    pub status: Option<String>,
    pub country_name: Option<String>,
}

pub async fn upsert_country(
    owner: UserId,
    body: UpsertCountryRequest,
    country_status_service: Arc<dyn CountryStatusService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    ensure_owner(owner, body.user_id.as_ref())?;
    let iso_code = required(body.iso_code, "isoCode")?;
    let status = required(body.status, "status")?;

    let iso_code = IsoCode::parse(&iso_code)
        .map_err(CountryStatusError::from)
        .map_err(ApiError::from)
        .map_err(reject::custom)?;
    let status = parse_status(&status)?;

    let outcome = country_status_service
        .upsert_status(
            owner,
            UpsertStatusInput {
                iso_code,
                status,
                name: body.country_name,
            },
        )
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    let code = match outcome.kind {
        UpsertKind::Created => StatusCode::CREATED,
        UpsertKind::Updated => StatusCode::OK,
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&outcome.record),
        code,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery {
    pub user_id: Option<String>,
}

impl OwnerQuery {
    fn claimed(&self) -> Option<IdField> {
        self.user_id.clone().map(IdField::Text)
    }
}

pub async fn list_countries(
    owner: UserId,
    query: OwnerQuery,
    country_status_service: Arc<dyn CountryStatusService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    ensure_owner(owner, query.claimed().as_ref())?;

    let rows = country_status_service
        .list_statuses(owner)
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&rows))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusRequest {
    pub id: Option<IdField>,
    pub status: Option<String>,
    pub user_id: Option<IdField>,
}

pub async fn set_country_status(
    owner: UserId,
    body: SetStatusRequest,
    country_status_service: Arc<dyn CountryStatusService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    ensure_owner(owner, body.user_id.as_ref())?;
    let id = body
        .id
        .ok_or_else(|| reject::custom(ApiError::validation("id is required")))?
        .parse("id")?;
    let status = parse_status(&required(body.status, "status")?)?;

    let record = country_status_service
        .set_status_by_id(owner, CountryStatusId(id), status)
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&record))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCountryQuery {
    pub id: Option<String>,
    pub user_id: Option<String>,
}

pub async fn delete_country(
    owner: UserId,
    query: DeleteCountryQuery,
    country_status_service: Arc<dyn CountryStatusService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    ensure_owner(owner, query.user_id.clone().map(IdField::Text).as_ref())?;
    let id = IdField::Text(required(query.id, "id")?).parse("id")?;

    let outcome = country_status_service
        .delete_status(owner, CountryStatusId(id))
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    debug!(%owner, id, ?outcome, "country status delete");
    Ok(warp::reply::with_status(
        warp::reply(),
        StatusCode::NO_CONTENT,
    ))
}
