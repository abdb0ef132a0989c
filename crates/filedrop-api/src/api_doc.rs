//! OpenAPI documentation.
//! Handler path annotations carry the literal `/api/v0`, matching `crate::constants::API_PREFIX`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::services::ingestion;
use filedrop_core::models;

/// Returns the OpenAPI document served at `/api/openapi.json`.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Filedrop API",
        version = "0.1.0",
        description = "File ingestion API (v0). Uploads are stored immediately and hashed asynchronously by a bounded worker pool; records move from processing to completed or failed."
    ),
    paths(
        handlers::files::upload_file,
        handlers::files::get_file,
        handlers::files::list_files,
    ),
    components(
        schemas(
            models::FileMetadata,
            models::ProcessingStatus,
            ingestion::UploadReceipt,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "files", description = "File upload and processing status")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_file_routes() {
        let spec = get_openapi_spec();
        assert!(spec.paths.paths.contains_key("/api/v0/files"));
        assert!(spec.paths.paths.contains_key("/api/v0/files/{id}"));
    }
}
