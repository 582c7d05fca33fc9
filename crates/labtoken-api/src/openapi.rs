//! `OpenAPI` (3.1) specification generation for `labtoken-api`.
//!
//! The generated spec is used to produce mobile client bindings and to
//! detect breaking API changes in CI.

use utoipa::OpenApi;

/// `OpenAPI` documentation for the labtoken REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Labtoken API",
        version = "0.1.0",
        description = "Virology test ordering, result polling, and CTA token exchange"
    ),
    paths(
        crate::routes::virology::order_test_kit,
        crate::routes::virology::register_test_kit,
        crate::routes::virology::poll_test_result,
        crate::routes::virology::exchange_cta_token,
        crate::routes::virology::mobile_health_check,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::routes::virology::VirologyOrderResponseBody,
            crate::routes::virology::VirologyLookupRequest,
            crate::routes::virology::VirologyLookupResponse,
            crate::routes::virology::CtaExchangeRequest,
            crate::routes::virology::CtaExchangeResponse,
        )
    ),
    tags(
        (name = "virology", description = "Virology test order and result operations"),
    )
)]
pub struct ApiDoc;

/// Returns the generated `OpenAPI` spec.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Returns the generated `OpenAPI` spec serialized as pretty JSON.
///
/// # Errors
///
/// Returns an error if JSON serialization fails (should not happen).
pub fn openapi_json() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_contains_all_virology_paths() {
        let json = openapi_json().expect("spec serializes");
        assert!(json.contains("/virology-test/home-kit/order"));
        assert!(json.contains("/virology-test/home-kit/register"));
        assert!(json.contains("/virology-test/results"));
        assert!(json.contains("/virology-test/cta-exchange"));
    }
}
