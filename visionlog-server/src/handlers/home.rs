//! Landing page handler

use askama::Template;
use axum::{extract::State, response::Html};

use crate::auth::RequestContext;
use crate::error::ApiError;
use crate::state::AppState;

/// Upload page.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    /// Deployment version shown in the footer
    pub version: &'a str,
    pub email: &'a str,
}

/// Landing page with the upload form
#[utoipa::path(
    get,
    path = "/",
    tag = "Pages",
    responses(
        (status = 200, description = "Upload page"),
        (status = 302, description = "Not signed in, redirected to login"),
        (status = 500, description = "Template rendering failed")
    )
)]
pub async fn home_handler(
    State(state): State<AppState>,
    context: RequestContext,
) -> Result<Html<String>, ApiError> {
    tracing::debug!(user = %context.user.id, "Home page");

    let template = IndexTemplate {
        version: &state.settings.version_id,
        email: &context.user.email,
    };
    Ok(Html(template.render()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_template_shows_version() {
        let html = IndexTemplate {
            version: "20161016t120000",
            email: "alice@example.com",
        }
        .render()
        .unwrap();

        assert!(html.contains("20161016t120000"));
        assert!(html.contains("alice@example.com"));
        assert!(html.contains("select_files"));
    }
}
