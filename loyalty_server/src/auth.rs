//! Request authentication.
//!
//! The server does not issue or verify credentials itself. An upstream gateway authenticates the caller and forwards
//! the user's id in a trusted header (see [`AuthConfig`]). Handlers that need a user take an [`AuthenticatedUser`]
//! argument; requests without the header are rejected with `401 Unauthorized` before the handler runs.
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use log::*;
use loyalty_engine::db_types::UserId;

use crate::{
    config::{AuthConfig, DEFAULT_USER_ID_HEADER},
    errors::ServerError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

impl AuthenticatedUser {
    pub fn user_id(&self) -> &UserId {
        &self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(user_from_request(req))
    }
}

fn user_from_request(req: &HttpRequest) -> Result<AuthenticatedUser, ServerError> {
    let header = req
        .app_data::<web::Data<AuthConfig>>()
        .map(|config| config.user_id_header.as_str())
        .unwrap_or(DEFAULT_USER_ID_HEADER);
    let value = req.headers().get(header).ok_or_else(|| {
        debug!("💻️ Request to {} has no {header} header", req.path());
        ServerError::AuthenticationError(format!("The {header} header is missing"))
    })?;
    let user_id = value
        .to_str()
        .map_err(|e| ServerError::AuthenticationError(format!("The {header} header is not valid text. {e}")))?
        .trim();
    if user_id.is_empty() {
        return Err(ServerError::AuthenticationError(format!("The {header} header is empty")));
    }
    trace!("💻️ Request authenticated for user {user_id}");
    Ok(AuthenticatedUser(UserId::from(user_id)))
}
