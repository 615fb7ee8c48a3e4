//! Media-type resolution by filename extension. Delegates to
//! `mime_guess`'s standard extension table (the crate the pack's
//! `sdlc-server` reaches for to serve static assets), falling back to the
//! generic octet-stream type for unknown extensions.

pub fn guess(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extension_resolves() {
        assert_eq!(guess("hello.txt"), "text/plain");
        assert_eq!(guess("chart.png"), "image/png");
    }

    #[test]
    fn unknown_extension_falls_back() {
        assert_eq!(guess("data.weirdext"), "application/octet-stream");
    }
}
