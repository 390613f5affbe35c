//! Embedded static assets using rust-embed.

use rust_embed::Embed;

/// Stylesheet and browser script embedded in the binary.
#[derive(Embed)]
#[folder = "src/assets/"]
pub struct StaticAssets;

/// Get the content type for a file based on its extension.
pub fn content_type(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("html") => "text/html; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_assets_contains_styles() {
        assert!(StaticAssets::get("styles.css").is_some());
    }

    #[test]
    fn test_static_assets_contains_app_script() {
        let script = StaticAssets::get("app.js").unwrap();
        let text = std::str::from_utf8(script.data.as_ref()).unwrap();
        assert!(text.contains("/api/field"));
        assert!(text.contains("Clear saved session?"));
    }

    #[test]
    fn test_app_script_serializes_field_saves() {
        let script = StaticAssets::get("app.js").unwrap();
        let text = std::str::from_utf8(script.data.as_ref()).unwrap();
        assert!(text.contains("fieldQueue = fieldQueue"));
        assert!(!text.contains("post(\"/api/field\", JSON.stringify"));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("styles.css"), "text/css; charset=utf-8");
        assert_eq!(content_type("app.js"), "application/javascript; charset=utf-8");
        assert_eq!(content_type("unknown.xyz"), "application/octet-stream");
        assert_eq!(content_type("noext"), "application/octet-stream");
    }
}
