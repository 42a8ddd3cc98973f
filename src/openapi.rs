use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::coach::models::{CoachRequest, CoachResponse, PromptMode};
use crate::error::ErrorResponse;

/// OpenAPI documentation for the Study Coach API
///
/// This provides schema documentation for the request and response bodies.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Study Coach API",
        version = "1.0.0",
        description = "Turns study notes into quizzes, flashcards, summaries and explanations. POST /api/coach with a prompt and a mode.",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    tags(
        (name = "coach", description = "Study-aid generation")
    ),
    components(
        schemas(
            ErrorResponse,
            CoachRequest,
            CoachResponse,
            PromptMode,
        )
    )
)]
pub struct ApiDoc;

/// Create the Swagger UI router
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
