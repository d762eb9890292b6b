//! Navigation tree built from published page slugs.
//!
//! Every page-like slug is split into path segments (dropping the index
//! filename) and inserted into a nested map. Directories without a page of
//! their own get a synthesized node titled from the segment name which
//! adopts its first child's link once children are sorted.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Value as Json, json};

use super::aggregate::compare_by_rule;
use super::record::{ContentRecord, DEFAULT_PRIORITY, MenuSetting};
use crate::config::{ListingConfig, SortRule};
use crate::util::title_case;

/// A node of the navigation tree as exposed to templates (`tacs.nav`).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NavNode {
    pub title: String,
    pub link: String,
    pub slug: String,
    pub children: Vec<NavNode>,
    /// Fields the sort rule reads (`priority`, `date`, `title`, ...)
    #[serde(skip)]
    sort_key: Json,
}

/// A tree node for building hierarchical navigation.
#[derive(Default)]
struct NavTreeNode {
    /// The page at this path, if one exists: (node data, sort fields)
    page: Option<(String, String, String, Json)>,
    children: BTreeMap<String, NavTreeNode>,
}

impl NavTreeNode {
    fn insert(&mut self, segments: &[&str], page: (String, String, String, Json)) {
        match segments.split_first() {
            None => self.page = Some(page),
            Some((first, rest)) => self
                .children
                .entry((*first).to_string())
                .or_default()
                .insert(rest, page),
        }
    }

    /// Convert to sorted nodes. `rule` is the top-level directory's sort rule.
    fn into_nodes(self, listing: &ListingConfig, rule: Option<&SortRule>) -> Vec<NavNode> {
        let mut nodes: Vec<NavNode> = self
            .children
            .into_iter()
            .filter_map(|(segment, child)| {
                let child_rule = rule.cloned().unwrap_or_else(|| listing.rule_for(&segment));
                child.into_node(&segment, listing, &child_rule)
            })
            .collect();

        // Top-level nodes order by the default rule; overrides apply below them
        let rule = rule.cloned().unwrap_or_else(|| listing.rule_for(""));
        sort_nodes(&mut nodes, &rule);
        nodes
    }

    fn into_node(self, segment: &str, listing: &ListingConfig, rule: &SortRule) -> Option<NavNode> {
        let NavTreeNode { page, children } = self;
        let children = NavTreeNode {
            page: None,
            children,
        }
        .into_nodes(listing, Some(rule));

        match page {
            Some((title, link, slug, sort_key)) => Some(NavNode {
                title,
                link,
                slug,
                children,
                sort_key,
            }),
            None => {
                let first = children.first()?;
                let title = title_case(segment);
                Some(NavNode {
                    link: first.link.clone(),
                    slug: first.slug.clone(),
                    sort_key: json!({ "title": title, "priority": DEFAULT_PRIORITY, "date": null }),
                    title,
                    children,
                })
            }
        }
    }
}

fn sort_nodes(nodes: &mut [NavNode], rule: &SortRule) {
    nodes.sort_by(|a, b| match compare_by_rule(&a.sort_key, &b.sort_key, rule) {
        Ordering::Equal => a.title.cmp(&b.title),
        other => other,
    });
}

/// Build the navigation tree from published records.
///
/// Only page-like records that are not hidden with `menu: false` take part.
/// The site root index is not a menu entry.
pub fn build_nav(
    records: &[ContentRecord],
    index_filename: &str,
    listing: &ListingConfig,
) -> Vec<NavNode> {
    let mut root = NavTreeNode::default();

    for record in records {
        if !record.is_html || record.menu.is_hidden() {
            continue;
        }
        let path = record
            .slug
            .strip_suffix(index_filename)
            .unwrap_or(&record.slug)
            .trim_end_matches('/');
        if path.is_empty() {
            continue;
        }
        let segments: Vec<&str> = path.split('/').collect();

        let title = match &record.menu {
            MenuSetting::Title(title) => title.clone(),
            MenuSetting::Shown(_) => record.title.clone(),
        };
        let sort_key = json!({
            "title": title,
            "priority": record.priority,
            "date": record.date,
            "slug": record.slug,
        });
        root.insert(
            &segments,
            (title, record.link.clone(), record.slug.clone(), sort_key),
        );
    }

    root.into_nodes(listing, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SiteConfig, SortOrder};
    use crate::util::parse_date;

    fn page(slug: &str, title: &str, priority: f64) -> ContentRecord {
        let config = SiteConfig::default();
        let mut record = ContentRecord::synthetic(slug, &config);
        record.title = title.to_string();
        record.priority = priority;
        record
    }

    fn titles(nodes: &[NavNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.title.as_str()).collect()
    }

    #[test]
    fn test_nav_nesting_and_priority_sort() {
        let records = vec![
            page("index.html", "Home", 1.0),
            page("about/index.html", "About", 0.5),
            page("post/index.html", "Blog", 0.9),
            page("post/a/index.html", "A", 0.2),
            page("post/b/index.html", "B", 0.8),
        ];
        let nav = build_nav(&records, "index.html", &ListingConfig::default());

        assert_eq!(titles(&nav), vec!["Blog", "About"]);
        assert_eq!(titles(&nav[0].children), vec!["B", "A"]);
        assert_eq!(nav[0].link, "/post/");
    }

    #[test]
    fn test_intermediate_node_adopts_first_child() {
        let records = vec![
            page("docs/guide/index.html", "Guide", 0.3),
            page("docs/intro/index.html", "Intro", 0.6),
        ];
        let nav = build_nav(&records, "index.html", &ListingConfig::default());

        assert_eq!(nav.len(), 1);
        assert_eq!(nav[0].title, "Docs");
        assert_eq!(nav[0].link, "/docs/intro/");
        assert_eq!(titles(&nav[0].children), vec!["Intro", "Guide"]);
    }

    #[test]
    fn test_menu_settings() {
        let mut hidden = page("secret/index.html", "Secret", 0.5);
        hidden.menu = MenuSetting::Shown(false);
        let mut renamed = page("about/index.html", "About Us", 0.5);
        renamed.menu = MenuSetting::Title("About".to_string());
        let nav = build_nav(&[hidden, renamed], "index.html", &ListingConfig::default());
        assert_eq!(titles(&nav), vec!["About"]);
    }

    #[test]
    fn test_directory_override_sorts_subtree() {
        let mut listing = ListingConfig::default();
        listing.overrides.insert(
            "post".to_string(),
            SortRule {
                sort_by: "date".to_string(),
                sort_order: SortOrder::Asc,
            },
        );

        let mut old = page("post/old/index.html", "Old", 0.9);
        old.date = parse_date("2020-01-01");
        let mut new = page("post/new/index.html", "New", 0.1);
        new.date = parse_date("2024-01-01");
        let nav = build_nav(&[new, old], "index.html", &listing);

        assert_eq!(titles(&nav[0].children), vec!["Old", "New"]);
    }

    #[test]
    fn test_non_pages_skipped() {
        let config = SiteConfig::default();
        let mut feed = ContentRecord::synthetic("feed.xml", &config);
        feed.is_html = false;
        assert!(build_nav(&[feed], "index.html", &ListingConfig::default()).is_empty());
    }
}
