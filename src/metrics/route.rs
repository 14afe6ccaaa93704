//! Route normalization
//!
//! Maps an arbitrary request path to a small fixed set of route label
//! values. Without this, every static file path would mint its own series
//! and cardinality would grow without bound.

/// Normalize a raw request path into a bounded route label.
///
/// A route template resolved by the routing layer (e.g. `/users/{id}`) is
/// always preferred over this function; callers only reach for `normalize_route`
/// when no template matched. Evaluation order matters: extension groups are
/// checked before asset prefixes, so `/assets/app.js` lands in
/// `/static/scripts` rather than the generic assets bucket. Total and
/// side-effect free, safe for malformed or adversarial paths.
pub fn normalize_route(path: &str) -> &str {
    if let Some((_, ext)) = path.rsplit_once('.') {
        match ext {
            "js" | "css" | "map" => return "/static/scripts",
            "png" | "jpg" | "jpeg" | "gif" | "svg" | "ico" => return "/static/images",
            "woff" | "woff2" | "ttf" | "eot" => return "/static/fonts",
            "html" | "htm" => return "/static/html",
            _ => {}
        }
    }
    if path.starts_with("/assets/") {
        return "/static/assets";
    }
    if path.starts_with("/static/") {
        return "/static/other";
    }
    path
}

#[cfg(test)]
mod tests {
    use super::normalize_route;

    #[test]
    fn groups_script_assets() {
        assert_eq!(normalize_route("/script.js"), "/static/scripts");
        assert_eq!(normalize_route("/css/site.css"), "/static/scripts");
        assert_eq!(normalize_route("/js/app.js.map"), "/static/scripts");
    }

    #[test]
    fn groups_image_font_and_markup_assets() {
        assert_eq!(normalize_route("/img/logo.png"), "/static/images");
        assert_eq!(normalize_route("/photo.jpeg"), "/static/images");
        assert_eq!(normalize_route("/favicon.ico"), "/static/images");
        assert_eq!(normalize_route("/fonts/inter.woff2"), "/static/fonts");
        assert_eq!(normalize_route("/index.html"), "/static/html");
        assert_eq!(normalize_route("/old.htm"), "/static/html");
    }

    #[test]
    fn extension_beats_prefix() {
        assert_eq!(normalize_route("/assets/app.js"), "/static/scripts");
        assert_eq!(normalize_route("/static/logo.svg"), "/static/images");
    }

    #[test]
    fn prefix_buckets_catch_unknown_extensions() {
        assert_eq!(normalize_route("/assets/data.bin"), "/static/assets");
        assert_eq!(normalize_route("/static/blob"), "/static/other");
    }

    #[test]
    fn unmatched_paths_pass_through() {
        assert_eq!(normalize_route("/arbitrary/xyz"), "/arbitrary/xyz");
        assert_eq!(normalize_route("/api/users"), "/api/users");
        assert_eq!(normalize_route(""), "");
        assert_eq!(normalize_route("/v1.2/thing"), "/v1.2/thing");
    }
}
