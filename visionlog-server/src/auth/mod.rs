//! Session authentication module
//!
//! Provides the `RequestContext` and `AdminContext` extractors for Axum
//! handlers. Identity comes from an [`IdentityProvider`]; the shipped one
//! trusts the headers set by Google's Identity-Aware Proxy, so the server must
//! only be reachable through it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use thiserror::Error;
use visionlog_core::{GeoInfo, UserAgentInfo};

use crate::config::Config;
use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-goog-authenticated-user-id";
/// Header carrying the authenticated user email.
pub const USER_EMAIL_HEADER: &str = "x-goog-authenticated-user-email";
/// Prefix the proxy puts in front of both values.
pub const IDENTITY_PREFIX: &str = "accounts.google.com:";

pub const COUNTRY_HEADER: &str = "x-appengine-country";
pub const REGION_HEADER: &str = "x-appengine-region";
pub const CITY_HEADER: &str = "x-appengine-city";

/// Placeholder of the login URL template replaced by the return address.
pub const CONTINUE_PLACEHOLDER: &str = "{continue}";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("login URL template has no {{continue}} placeholder: {0}")]
    MissingContinuePlaceholder(String),
}

/// Signed-in user of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub is_admin: bool,
}

/// Source of session identities and login URLs.
pub trait IdentityProvider: Send + Sync {
    /// Identity of the request, `None` when anonymous.
    fn current_user(&self, headers: &HeaderMap) -> Option<SessionUser>;

    /// URL sending the user through login and back to `path`.
    fn login_url(&self, path: &str) -> Result<String, IdentityError>;
}

/// Identity-Aware-Proxy header based provider.
#[derive(Debug, Clone)]
pub struct HeaderIdentityProvider {
    admin_emails: Vec<String>,
    login_url_template: String,
    public_base_url: String,
}

impl HeaderIdentityProvider {
    pub fn new(
        admin_emails: Vec<String>,
        login_url_template: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            admin_emails: admin_emails
                .into_iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
            login_url_template: login_url_template.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.admin_emails.clone(),
            config.login_url_template.clone(),
            config.public_base_url(),
        )
    }
}

impl IdentityProvider for HeaderIdentityProvider {
    fn current_user(&self, headers: &HeaderMap) -> Option<SessionUser> {
        let id = header_value(headers, USER_ID_HEADER);
        let email = header_value(headers, USER_EMAIL_HEADER);
        if id.is_empty() || email.is_empty() {
            return None;
        }

        let id = id.strip_prefix(IDENTITY_PREFIX).unwrap_or(&id).to_string();
        let email = email.strip_prefix(IDENTITY_PREFIX).unwrap_or(&email).to_string();
        let is_admin = self
            .admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(&email));

        Some(SessionUser { id, email, is_admin })
    }

    fn login_url(&self, path: &str) -> Result<String, IdentityError> {
        if !self.login_url_template.contains(CONTINUE_PLACEHOLDER) {
            return Err(IdentityError::MissingContinuePlaceholder(
                self.login_url_template.clone(),
            ));
        }
        let return_to = format!("{}{}", self.public_base_url.trim_end_matches('/'), path);
        let encoded: String = url::form_urlencoded::byte_serialize(return_to.as_bytes()).collect();
        Ok(self.login_url_template.replace(CONTINUE_PLACEHOLDER, &encoded))
    }
}

/// Client details recorded with every visit.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub geo: GeoInfo,
    pub user_agent: String,
}

impl ClientInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            geo: GeoInfo {
                country: header_value(headers, COUNTRY_HEADER),
                region: header_value(headers, REGION_HEADER),
                city: header_value(headers, CITY_HEADER),
            },
            user_agent: header_value(headers, header::USER_AGENT.as_str()),
        }
    }

    pub fn parsed_user_agent(&self) -> UserAgentInfo {
        UserAgentInfo::parse(&self.user_agent)
    }
}

/// Signed-in request. Anonymous requests are redirected to login before the
/// handler runs.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: SessionUser,
    pub client: ClientInfo,
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(user) = state.identity.current_user(&parts.headers) else {
            let location = state.identity.login_url(parts.uri.path()).map_err(|e| {
                tracing::error!(error = %e, "Error getting login URL");
                ApiError::internal(e.to_string())
            })?;
            return Err(ApiError::login_required(location));
        };

        Ok(RequestContext {
            user,
            client: ClientInfo::from_headers(&parts.headers),
        })
    }
}

/// Signed-in administrator.
#[derive(Debug, Clone)]
pub struct AdminContext(pub RequestContext);

impl FromRequestParts<AppState> for AdminContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let context = RequestContext::from_request_parts(parts, state).await?;
        if !context.user.is_admin {
            return Err(ApiError::unauthorized(format!(
                "user {} is not an admin",
                context.user.email
            )));
        }
        Ok(AdminContext(context))
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
