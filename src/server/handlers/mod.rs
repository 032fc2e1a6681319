pub mod consolidated;
pub mod health;
pub mod maintenance;
pub mod orders;

use axum::{
    http::header,
    response::{IntoResponse, Response},
};

/// CSV download with a suggested file name
pub(crate) fn csv_attachment(filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}
