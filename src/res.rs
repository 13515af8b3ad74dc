use axum::response::{IntoResponse, Response};
use axum::http::StatusCode;

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

/// Same 404 page whether the thing is missing or just not yours.
pub fn sorry(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        axum::response::Html(
            include_res!(str, "/pages/sorry.html").replace("{what}", what),
        ),
    )
        .into_response()
}
