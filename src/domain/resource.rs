//! Logical resource kinds served by the proxy.

use std::fmt;

/// What a cache entry holds. Each kind owns a disjoint subtree of the cache root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A CSS document of `@font-face` rules, keyed by family list.
    Stylesheet,
    /// A binary font file referenced from a stylesheet, keyed by request path.
    Asset,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Stylesheet => "stylesheet",
            ResourceKind::Asset => "asset",
        }
    }

    /// Directory under the cache root that holds entries of this kind.
    pub fn directory(&self) -> &'static str {
        match self {
            ResourceKind::Stylesheet => "css",
            ResourceKind::Asset => "s",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File extension of the final path segment, without the dot. Only ASCII
/// alphanumeric extensions are accepted, so the media type is always a valid
/// header value.
pub fn asset_extension(path: &str) -> Option<&str> {
    let file_name = path.rsplit('/').next()?;
    let (stem, extension) = file_name.rsplit_once('.')?;
    if stem.is_empty()
        || extension.is_empty()
        || !extension.bytes().all(|b| b.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(extension)
}

/// Media type for a font asset: `font/<ext>`, with the extension used verbatim.
pub fn asset_content_type(path: &str) -> Option<String> {
    asset_extension(path).map(|extension| format!("font/{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_uses_extension_verbatim() {
        assert_eq!(
            asset_content_type("/s/roboto/v30/KFOmCnqEu92Fr1Mu4mxP.woff2").as_deref(),
            Some("font/woff2")
        );
        assert_eq!(
            asset_content_type("/s/lato/v24/S6uyw4BMUTPHjx4wWw.ttf").as_deref(),
            Some("font/ttf")
        );
    }

    #[test]
    fn only_the_last_segment_counts() {
        assert_eq!(asset_extension("/s/v1.2/font"), None);
        assert_eq!(asset_extension("/s/v1.2/font.otf"), Some("otf"));
    }

    #[test]
    fn missing_or_empty_extensions_are_rejected() {
        assert_eq!(asset_content_type("/s/roboto/font"), None);
        assert_eq!(asset_content_type("/s/roboto/font."), None);
        assert_eq!(asset_content_type("/s/roboto/.woff2"), None);
        assert_eq!(asset_content_type("/s/roboto/"), None);
    }

    #[test]
    fn extensions_outside_ascii_alphanumerics_are_rejected() {
        assert_eq!(asset_content_type("/s/roboto/font.wo%0Aff"), None);
        assert_eq!(asset_content_type("/s/roboto/font.wo ff"), None);
        assert_eq!(asset_content_type("/s/roboto/font.wöff"), None);
        assert_eq!(asset_content_type("/s/roboto/font.woff2"), Some("font/woff2".to_string()));
    }

    #[test]
    fn kinds_map_to_disjoint_directories() {
        assert_ne!(
            ResourceKind::Stylesheet.directory(),
            ResourceKind::Asset.directory()
        );
    }
}
