//! Image URL normalization for the content-addressed storage gateway.
//!
//! Proposal images are stored either as full URLs or as bare content hashes.
//! URLs on the retired `vrdao.mypinata.cloud` gateway are rewritten to the
//! public Pinata gateway; nothing here touches the network, a URL that still
//! does not load is left to the renderer's placeholder fallback.

/// Retired gateway prefix
pub const BROKEN_GATEWAY_PREFIX: &str = "https://vrdao.mypinata.cloud/ipfs/";

/// Working gateway prefix
pub const GATEWAY_PREFIX: &str = "https://gateway.pinata.cloud/ipfs/";

/// Local image shown when a proposal has no image or it fails to load
pub const PLACEHOLDER_IMAGE: &str = "/images/election.png";

/// Normalize a proposal image source into a displayable URL.
///
/// Returns `None` for an empty source. Applying it to its own output returns
/// the output unchanged.
pub fn normalize_image_url(source: &str) -> Option<String> {
    if source.is_empty() {
        return None;
    }

    if source.starts_with(BROKEN_GATEWAY_PREFIX) {
        return Some(format!("{}{}", GATEWAY_PREFIX, ipfs_segment(source)));
    }

    if source.starts_with("http://") || source.starts_with("https://") {
        return Some(source.to_string());
    }

    if is_content_hash(source) {
        return Some(format!("{}{}", GATEWAY_PREFIX, source));
    }

    if source.contains("/ipfs/") {
        return Some(format!("{}{}", GATEWAY_PREFIX, ipfs_segment(source)));
    }

    Some(source.to_string())
}

/// Text between the first `/ipfs/` and the next one, or the end of `source`
fn ipfs_segment(source: &str) -> &str {
    source.split("/ipfs/").nth(1).unwrap_or_default()
}

/// CIDv0 (`Qm...`) or base32 CIDv1 (`bafy...`)
fn is_content_hash(source: &str) -> bool {
    source.starts_with("Qm") || source.starts_with("bafy")
}

/// URL a renderer should load for an optional processed image
pub fn display_image(processed: Option<&str>) -> &str {
    processed.unwrap_or(PLACEHOLDER_IMAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("https://vrdao.mypinata.cloud/ipfs/Qm123", "https://gateway.pinata.cloud/ipfs/Qm123" ; "broken gateway")]
    #[test_case("Qm123", "https://gateway.pinata.cloud/ipfs/Qm123" ; "bare cidv0")]
    #[test_case("bafybeigdyrzt", "https://gateway.pinata.cloud/ipfs/bafybeigdyrzt" ; "bare cidv1")]
    #[test_case("https://example.com/cat.png", "https://example.com/cat.png" ; "other https url")]
    #[test_case("http://example.com/cat.png", "http://example.com/cat.png" ; "other http url")]
    #[test_case("https://ipfs.io/ipfs/Qm456", "https://ipfs.io/ipfs/Qm456" ; "other gateway untouched")]
    #[test_case("ipfs://ipfs/Qm789", "https://gateway.pinata.cloud/ipfs/Qm789" ; "ipfs path")]
    #[test_case("/ipfs/Qm789/img.png", "https://gateway.pinata.cloud/ipfs/Qm789/img.png" ; "relative ipfs path")]
    #[test_case("images/local.png", "images/local.png" ; "unknown passes through")]
    #[test_case("/ipfs/Qm1/ipfs/extra", "https://gateway.pinata.cloud/ipfs/Qm1" ; "repeated ipfs marker keeps first segment")]
    #[test_case("https://vrdao.mypinata.cloud/ipfs/Qm1/ipfs/x", "https://gateway.pinata.cloud/ipfs/Qm1" ; "broken gateway with repeated marker")]
    fn test_normalize(source: &str, expected: &str) {
        assert_eq!(normalize_image_url(source).as_deref(), Some(expected));
    }

    #[test]
    fn test_empty_source() {
        assert_eq!(normalize_image_url(""), None);
    }

    #[test_case("https://vrdao.mypinata.cloud/ipfs/Qm123" ; "broken gateway")]
    #[test_case("Qm123" ; "bare hash")]
    #[test_case("https://gateway.pinata.cloud/ipfs/Qm123" ; "working gateway")]
    #[test_case("/ipfs/bafy1" ; "relative path")]
    #[test_case("images/local.png" ; "passthrough")]
    #[test_case("/ipfs/Qm1/ipfs/extra" ; "repeated marker")]
    fn test_idempotent(source: &str) {
        let once = normalize_image_url(source).unwrap();
        let twice = normalize_image_url(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_display_image_placeholder() {
        assert_eq!(display_image(None), "/images/election.png");
        assert_eq!(display_image(Some("https://x/y.png")), "https://x/y.png");
    }
}
