//! Git operations and repository management.

pub mod commit;
pub mod repository;

pub use commit::CommitInfo;
pub use repository::{GitRepository, ImageFile};

/// Number of hex characters to show in abbreviated commit hashes.
pub const SHORT_HASH_LEN: usize = 8;

/// File extensions treated as raster images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp", "tga"];

/// Returns whether a repository path names a raster image, by extension.
pub fn is_image_path(path: &str) -> bool {
    std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Abbreviates a commit hash for display.
pub fn short_hash(hash: &str) -> &str {
    hash.get(..SHORT_HASH_LEN).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_path_by_extension() {
        assert!(is_image_path("art/dragon.png"));
        assert!(is_image_path("promo/Title.JPG"));
        assert!(!is_image_path("src/main.rs"));
        assert!(!is_image_path("png"));
    }

    #[test]
    fn short_hash_handles_short_input() {
        assert_eq!(short_hash("abc"), "abc");
        assert_eq!(short_hash(&"f".repeat(40)), "ffffffff");
    }
}
