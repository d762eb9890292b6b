//! Paginated listing pages for directory and tag groups.

use serde_json::Value as Json;

use super::paths;
use super::record::{ContentRecord, MenuSetting, Pagination};
use crate::config::SiteConfig;

/// Slug of listing page `page` (0-based) rooted at `dir`.
///
/// Page 0 is the directory index itself; later pages get a numbered
/// subdirectory: `post/index.html`, `post/1/index.html`, ...
pub fn page_slug(dir: &str, page: usize, index_filename: &str) -> String {
    if page == 0 {
        format!("{dir}/{index_filename}")
    } else {
        format!("{dir}/{page}/{index_filename}")
    }
}

/// Split `items` into pages of `size` and build one listing record per page.
///
/// `base` supplies everything except slug, link and `pagination`; it is
/// either the directory's own index record or a synthetic stand-in. Pages
/// after the first are hidden from navigation.
pub fn paginate(
    dir: &str,
    items: &[Json],
    size: usize,
    base: &ContentRecord,
    config: &SiteConfig,
) -> Vec<ContentRecord> {
    if size == 0 {
        return Vec::new();
    }

    let chunks: Vec<&[Json]> = if items.is_empty() {
        vec![&[]]
    } else {
        items.chunks(size).collect()
    };
    let total = chunks.len();

    let hrefs: Vec<String> = (0..total)
        .map(|page| {
            paths::slug_to_link(
                &page_slug(dir, page, &config.index_filename),
                &config.root,
                &config.index_filename,
            )
        })
        .collect();

    chunks
        .into_iter()
        .enumerate()
        .map(|(page, chunk)| {
            let slug = page_slug(dir, page, &config.index_filename);
            let from = page * size;

            let mut record = base.clone();
            record.link = hrefs[page].clone();
            record.directory = paths::slug_directory(&slug);
            record.slug = slug;
            if page > 0 {
                record.menu = MenuSetting::Shown(false);
            }
            record.pagination = Some(Pagination {
                page: chunk.to_vec(),
                page_total: total,
                page_current: page,
                page_current1: page + 1,
                subpage_from1: from + 1,
                subpage_to1: from + chunk.len(),
                href_back: page.checked_sub(1).map(|back| hrefs[back].clone()),
                href_next: hrefs.get(page + 1).cloned(),
                href: hrefs.clone(),
            });
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items(n: usize) -> Vec<Json> {
        (0..n).map(|i| json!({ "slug": format!("post/{i}/index.html") })).collect()
    }

    fn listing(n: usize, size: usize) -> Vec<ContentRecord> {
        let config = SiteConfig::default();
        let base = ContentRecord::synthetic("post/index.html", &config);
        paginate("post", &items(n), size, &base, &config)
    }

    #[test]
    fn test_page_sizes() {
        let pages = listing(7, 3);
        let sizes: Vec<usize> = pages
            .iter()
            .map(|p| p.pagination.as_ref().unwrap().page.len())
            .collect();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn test_page_links() {
        let pages = listing(7, 3);
        assert_eq!(pages[0].slug, "post/index.html");
        assert_eq!(pages[1].slug, "post/1/index.html");
        assert_eq!(pages[2].slug, "post/2/index.html");

        let middle = pages[1].pagination.as_ref().unwrap();
        assert_eq!(middle.href_back.as_deref(), Some("/post/"));
        assert_eq!(middle.href_next.as_deref(), Some("/post/2/"));
        assert_eq!(middle.href, vec!["/post/", "/post/1/", "/post/2/"]);
        assert_eq!(middle.page_current, 1);
        assert_eq!(middle.page_current1, 2);
        assert_eq!(middle.subpage_from1, 4);
        assert_eq!(middle.subpage_to1, 6);

        let first = pages[0].pagination.as_ref().unwrap();
        assert_eq!(first.href_back, None);
        let last = pages[2].pagination.as_ref().unwrap();
        assert_eq!(last.href_next, None);
        assert_eq!(last.subpage_to1, 7);
    }

    #[test]
    fn test_later_pages_hidden_from_menu() {
        let pages = listing(4, 2);
        assert!(!pages[0].menu.is_hidden());
        assert!(pages[1].menu.is_hidden());
    }

    #[test]
    fn test_single_and_empty() {
        assert_eq!(listing(2, 3).len(), 1);
        assert_eq!(listing(0, 3).len(), 1);
        assert!(listing(5, 0).is_empty());
    }

    #[test]
    fn test_serialized_pagination() {
        let pages = listing(7, 3);
        let json = serde_json::to_value(&pages[1]).unwrap();
        assert_eq!(json["pagination"]["pageTotal"], 3);
        assert_eq!(json["pagination"]["hrefBack"], "/post/");
        assert_eq!(json["pagination"]["subpageFrom1"], 4);
    }
}
