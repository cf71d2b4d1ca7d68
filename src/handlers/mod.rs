pub mod events;
pub mod leaderboard;
pub mod samples;
pub mod timeline;

use ntex::web::HttpRequest;

/// Identity forwarded by the authenticating gateway, if any.
pub(crate) fn caller_id(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
