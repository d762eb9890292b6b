//! Slug, link and output path conversions.
//!
//! This module handles conversions between:
//! - Source filenames (paths relative to the content root)
//! - Slugs (build-relative output paths, e.g. `post/hello/index.html`)
//! - Links (the URL a slug is served at, e.g. `/post/hello/`)
//! - Output file paths (where slugs are written in the build directory)

use std::path::{Component, Path, PathBuf};

use regex::Regex;

/// Extensions rendered as pages (directory-style slugs, templates, nav).
pub const PAGE_EXTENSIONS: &[&str] = &["md", "html", "htm"];

/// Characters removed from filenames before they become slugs.
const UNSAFE_CHARS: &[char] = &['#', '!', '$', '^', '~'];

/// Lowercased extension of a filename or slug.
pub fn extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

pub fn is_page_like(path: &str) -> bool {
    PAGE_EXTENSIONS.contains(&extension(path).as_str())
}

/// Derive a slug from a content filename.
///
/// # Examples
/// ```ignore
/// slugify("about.md", "index.html", &[]) => "about/index.html"
/// slugify("post/index.md", "index.html", &[]) => "post/index.html"
/// slugify("index.md", "index.html", &[]) => "index.html"
/// slugify("feed.xml", "index.html", &[]) => "feed.xml"
/// slugify("post/01_first post.md", "index.html", &[(\d+_, "")]) => "post/firstpost/index.html"
/// ```
pub fn slugify(filename: &str, index_filename: &str, replace: &[(Regex, String)]) -> String {
    let cleaned: String = filename
        .replace('\\', "/")
        .chars()
        .filter(|c| !c.is_whitespace() && !UNSAFE_CHARS.contains(c))
        .collect();
    let cleaned = cleaned.trim_start_matches("./").trim_start_matches('/');

    let mut slug = if is_page_like(cleaned) {
        let (dir, file) = match cleaned.rsplit_once('/') {
            Some((dir, file)) => (Some(dir), file),
            None => (None, cleaned),
        };
        let stem = Path::new(file)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file);
        let index_stem = Path::new(index_filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(index_filename);

        match (dir, stem == index_stem) {
            (Some(dir), true) => format!("{dir}/{index_filename}"),
            (None, true) => index_filename.to_string(),
            (Some(dir), false) => format!("{dir}/{stem}/{index_filename}"),
            (None, false) => format!("{stem}/{index_filename}"),
        }
    } else {
        cleaned.to_string()
    };

    for (pattern, replacement) in replace {
        slug = pattern.replace_all(&slug, replacement.as_str()).into_owned();
    }
    slug
}

/// The URL a slug is served at: `root` plus the slug, minus its index filename.
///
/// # Examples
/// ```ignore
/// slug_to_link("post/a/index.html", "/", "index.html") => "/post/a/"
/// slug_to_link("index.html", "/blog/", "index.html") => "/blog/"
/// slug_to_link("feed.xml", "/", "index.html") => "/feed.xml"
/// ```
pub fn slug_to_link(slug: &str, root: &str, index_filename: &str) -> String {
    let mut link = root.to_string();
    if !link.ends_with('/') {
        link.push('/');
    }

    let path = if slug == index_filename {
        ""
    } else {
        slug.strip_suffix(index_filename)
            .filter(|rest| rest.ends_with('/'))
            .unwrap_or(slug)
    };
    link.push_str(path.trim_start_matches('/'));
    link
}

/// First path segment of a slug with more than one segment, else empty.
pub fn slug_directory(slug: &str) -> String {
    match slug.split_once('/') {
        Some((first, _)) => first.to_string(),
        None => String::new(),
    }
}

/// Whether a relative path stays inside the directory it is joined to.
pub fn is_contained(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Whether a filename contains a parent-directory segment.
pub fn has_parent_traversal(filename: &str) -> bool {
    filename
        .replace('\\', "/")
        .split('/')
        .any(|segment| segment == "..")
}

/// Convert a slug to its output file path.
///
/// Returns `None` if the slug would resolve outside `build_dir`.
pub fn slug_to_output_path(slug: &str, build_dir: &Path) -> Option<PathBuf> {
    is_contained(slug).then(|| build_dir.join(slug))
}

/// Filename relative to `root`, with forward slashes.
pub fn relative_name(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slug(filename: &str) -> String {
        slugify(filename, "index.html", &[])
    }

    #[test]
    fn test_slugify_pages() {
        assert_eq!(slug("about.md"), "about/index.html");
        assert_eq!(slug("post/hello.md"), "post/hello/index.html");
        assert_eq!(slug("post/deep/page.htm"), "post/deep/page/index.html");
    }

    #[test]
    fn test_slugify_index() {
        assert_eq!(slug("index.md"), "index.html");
        assert_eq!(slug("post/index.md"), "post/index.html");
        assert_eq!(slug("post/index.html"), "post/index.html");
    }

    #[test]
    fn test_slugify_non_page() {
        assert_eq!(slug("feed.xml"), "feed.xml");
        assert_eq!(slug("css/main.css"), "css/main.css");
    }

    #[test]
    fn test_slugify_strips_unsafe() {
        assert_eq!(slug("my #1 post!.md"), "my1post/index.html");
        assert_eq!(slug("~tmp$^.txt"), "tmp.txt");
    }

    #[test]
    fn test_slugify_replacements() {
        let replace = vec![(Regex::new(r"\d+_").unwrap(), String::new())];
        assert_eq!(
            slugify("post/01_first.md", "index.html", &replace),
            "post/first/index.html"
        );
    }

    #[test]
    fn test_slugify_idempotent() {
        let replace = vec![(Regex::new(r"\d+_").unwrap(), String::new())];
        for filename in ["about.md", "post/02_x.md", "index.md", "feed.xml", "a/b/c.html"] {
            let once = slugify(filename, "index.html", &replace);
            assert_eq!(slugify(&once, "index.html", &replace), once);
        }
    }

    #[test]
    fn test_slug_to_link() {
        assert_eq!(slug_to_link("post/a/index.html", "/", "index.html"), "/post/a/");
        assert_eq!(slug_to_link("index.html", "/", "index.html"), "/");
        assert_eq!(slug_to_link("index.html", "/blog", "index.html"), "/blog/");
        assert_eq!(slug_to_link("feed.xml", "/", "index.html"), "/feed.xml");
        assert_eq!(slug_to_link("myindex.html", "/", "index.html"), "/myindex.html");
    }

    #[test]
    fn test_slug_directory() {
        assert_eq!(slug_directory("post/a/index.html"), "post");
        assert_eq!(slug_directory("index.html"), "");
        assert_eq!(slug_directory("feed.xml"), "");
    }

    #[test]
    fn test_containment() {
        assert!(is_contained("post/a/index.html"));
        assert!(!is_contained("../escape.html"));
        assert!(!is_contained("/etc/passwd"));
        assert!(!is_contained("a/../../b"));
        assert!(!is_contained(""));
        assert!(has_parent_traversal("a/../b.md"));
        assert!(has_parent_traversal("..\\b.md"));
        assert!(!has_parent_traversal("a/..b.md"));
    }

    #[test]
    fn test_slug_to_output_path() {
        let build = Path::new("/site");
        assert_eq!(
            slug_to_output_path("post/a/index.html", build),
            Some(PathBuf::from("/site/post/a/index.html"))
        );
        assert_eq!(slug_to_output_path("../x", build), None);
    }
}
