use crate::api;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::auth::register,
        api::auth::login,
        api::auth::get_me,
        api::providers::search_providers,
        api::catalog::list_services,
        api::reservations::list_reservations,
        api::reservations::create_reservation,
        api::reservations::transition,
        api::reviews::list_reviews,
        api::reviews::create_review,
        api::invoices::create_invoice,
        api::history::list_history,
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "tabali", description = "Tabali services marketplace API")
    )
)]
pub struct ApiDoc;

/// Declares the `bearer` scheme referenced by the secured paths
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_the_main_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/health"));
        assert!(doc.paths.paths.contains_key("/api/v1/reservations"));
        assert!(doc.paths.paths.contains_key("/api/v1/invoices"));
    }
}
