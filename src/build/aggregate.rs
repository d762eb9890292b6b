//! The site aggregate (`tacs`): every published record grouped by
//! directory and tag, plus listing pages and the navigation tree.
//!
//! Built from scratch at the start of each render pass and read-only
//! afterwards.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::{Value as Json, json};

use super::nav::{NavNode, build_nav};
use super::paginate::{page_slug, paginate};
use super::record::{AdjacentLink, ContentRecord, MenuSetting};
use crate::config::{SiteConfig, SortOrder, SortRule};
use crate::util::title_case;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TagSummary {
    pub tag: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub link: Option<String>,
    pub count: usize,
}

#[derive(Debug, Default)]
pub struct SiteAggregate {
    /// slug -> record
    pub all: BTreeMap<String, Json>,
    /// directory -> sorted slugs
    pub dir: BTreeMap<String, Vec<String>>,
    /// tag ref -> sorted slugs
    pub tag: BTreeMap<String, Vec<String>>,
    /// Tags by descending frequency
    pub tag_list: Vec<TagSummary>,
    pub nav: Vec<NavNode>,
    /// `globals` from the site config
    pub config: Json,
}

impl SiteAggregate {
    /// Group, sort and link `records`, appending synthetic listing pages.
    ///
    /// `records` must hold only published records. A directory's own index
    /// record is replaced by the first page of its listing.
    pub fn build(records: &mut Vec<ContentRecord>, config: &SiteConfig) -> Self {
        let snapshot = record_values(records);

        let mut dir: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut tag: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut tag_names: HashMap<String, (String, Option<String>)> = HashMap::new();

        for record in records.iter() {
            if record.is_html
                && !record.directory.is_empty()
                && !record.is_directory_index(&config.index_filename)
            {
                dir.entry(record.directory.clone())
                    .or_default()
                    .push(record.slug.clone());
            }
            for t in &record.tags {
                tag.entry(t.reference.clone())
                    .or_default()
                    .push(record.slug.clone());
                tag_names
                    .entry(t.reference.clone())
                    .or_insert_with(|| (t.tag.clone(), t.link.clone()));
            }
        }

        for (name, slugs) in dir.iter_mut() {
            sort_slugs(slugs, &snapshot, &config.dir_pages.rule_for(name));
        }
        let tag_rule = config
            .tag_pages
            .as_ref()
            .map(|tp| tp.rule())
            .unwrap_or_else(|| SortRule {
                sort_by: "date".to_string(),
                sort_order: SortOrder::Desc,
            });
        for slugs in tag.values_mut() {
            sort_slugs(slugs, &snapshot, &tag_rule);
        }

        assign_adjacent(records, &dir, &snapshot);

        let snapshot = record_values(records);
        let listings = listing_pages(records, &dir, &tag, &tag_names, &snapshot, config);
        records.extend(listings);

        let mut tag_list: Vec<TagSummary> = tag
            .iter()
            .map(|(reference, slugs)| {
                let (name, link) = tag_names.get(reference).cloned().unwrap_or_default();
                TagSummary {
                    tag: name,
                    reference: reference.clone(),
                    link,
                    count: slugs.len(),
                }
            })
            .collect();
        tag_list.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reference.cmp(&b.reference)));

        SiteAggregate {
            all: record_values(records).into_iter().collect(),
            dir,
            tag,
            tag_list,
            nav: build_nav(records, &config.index_filename, &config.dir_pages),
            config: config.globals.clone(),
        }
    }

    /// Records for a list of slugs, in order.
    pub fn resolve(&self, slugs: &[String]) -> Vec<Json> {
        slugs
            .iter()
            .filter_map(|slug| self.all.get(slug).cloned())
            .collect()
    }

    /// The aggregate as the `tacs` value seen by expressions.
    pub fn to_json(&self) -> Json {
        let groups = |map: &BTreeMap<String, Vec<String>>| -> serde_json::Map<String, Json> {
            map.iter()
                .map(|(key, slugs)| (key.clone(), Json::Array(self.resolve(slugs))))
                .collect()
        };

        json!({
            "all": self.all,
            "dir": groups(&self.dir),
            "tag": groups(&self.tag),
            "tagList": self.tag_list,
            "nav": self.nav,
            "config": self.config,
        })
    }
}

fn record_values(records: &[ContentRecord]) -> HashMap<String, Json> {
    records
        .iter()
        .map(|r| (r.slug.clone(), serde_json::to_value(r).unwrap_or_default()))
        .collect()
}

fn sort_slugs(slugs: &mut [String], records: &HashMap<String, Json>, rule: &SortRule) {
    let null = Json::Null;
    slugs.sort_by(|a, b| {
        let a = records.get(a).unwrap_or(&null);
        let b = records.get(b).unwrap_or(&null);
        compare_by_rule(a, b, rule)
    });
}

/// Compare two records by `rule.sort_by` in the rule's direction, then by
/// date, newest first.
pub fn compare_by_rule(a: &Json, b: &Json, rule: &SortRule) -> Ordering {
    let primary = compare_values(a.get(&rule.sort_by), b.get(&rule.sort_by));
    let primary = match rule.sort_order {
        SortOrder::Asc => primary,
        SortOrder::Desc => primary.reverse(),
    };
    primary.then_with(|| compare_values(b.get("date"), a.get("date")))
}

/// Missing and null sort before everything else.
fn compare_values(a: Option<&Json>, b: Option<&Json>) -> Ordering {
    match (a, b) {
        (Some(Json::Number(x)), Some(Json::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Json::String(x)), Some(Json::String(y))) => x.cmp(y),
        (Some(Json::Bool(x)), Some(Json::Bool(y))) => x.cmp(y),
        (a, b) => rank(a).cmp(&rank(b)),
    }
}

fn rank(value: Option<&Json>) -> u8 {
    match value {
        None | Some(Json::Null) => 0,
        Some(Json::Bool(_)) => 1,
        Some(Json::Number(_)) => 2,
        Some(Json::String(_)) => 3,
        Some(_) => 4,
    }
}

fn adjacent(record: &Json) -> AdjacentLink {
    let field = |key: &str| record.get(key).and_then(Json::as_str).unwrap_or_default().to_string();
    AdjacentLink {
        slug: field("slug"),
        link: field("link"),
        title: field("title"),
    }
}

/// Set `postback`/`postnext` from each record's neighbours in its directory list.
fn assign_adjacent(
    records: &mut [ContentRecord],
    dir: &BTreeMap<String, Vec<String>>,
    snapshot: &HashMap<String, Json>,
) {
    let position: HashMap<String, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.slug.clone(), i))
        .collect();

    for slugs in dir.values() {
        for (i, slug) in slugs.iter().enumerate() {
            let Some(&index) = position.get(slug) else {
                continue;
            };
            let neighbour = |j: Option<usize>| {
                j.and_then(|j| slugs.get(j))
                    .and_then(|s| snapshot.get(s))
                    .map(adjacent)
            };
            records[index].postback = neighbour(i.checked_sub(1));
            records[index].postnext = neighbour(Some(i + 1));
        }
    }
}

/// Take the record at `slug` out of `records` to serve as a listing base.
fn take_base(records: &mut Vec<ContentRecord>, slug: &str) -> Option<ContentRecord> {
    let index = records.iter().position(|r| r.slug == slug)?;
    Some(records.remove(index))
}

fn listing_pages(
    records: &mut Vec<ContentRecord>,
    dir: &BTreeMap<String, Vec<String>>,
    tag: &BTreeMap<String, Vec<String>>,
    tag_names: &HashMap<String, (String, Option<String>)>,
    snapshot: &HashMap<String, Json>,
    config: &SiteConfig,
) -> Vec<ContentRecord> {
    let mut listings = Vec::new();
    let items = |slugs: &[String]| -> Vec<Json> {
        slugs.iter().filter_map(|s| snapshot.get(s).cloned()).collect()
    };

    let dir_pages = &config.dir_pages;
    if dir_pages.size > 0 {
        for (name, slugs) in dir {
            let slug = page_slug(name, 0, &config.index_filename);
            let base = match take_base(records, &slug) {
                Some(mut base) => {
                    if base.template.as_deref() == Some(config.default_template.as_str()) {
                        base.template = Some(dir_pages.template.clone());
                    }
                    base
                }
                None => {
                    let mut base = ContentRecord::synthetic(&slug, config);
                    base.title = title_case(name);
                    base.template = Some(dir_pages.template.clone());
                    base
                }
            };
            listings.extend(paginate(name, &items(slugs), dir_pages.size, &base, config));
        }
    }

    if let Some(tag_pages) = config.tag_pages.as_ref().filter(|tp| tp.size > 0) {
        for (reference, slugs) in tag {
            let root = format!("{}/{}", tag_pages.root, reference);
            let slug = page_slug(&root, 0, &config.index_filename);
            let base = take_base(records, &slug).unwrap_or_else(|| {
                let mut base = ContentRecord::synthetic(&slug, config);
                base.title = tag_names
                    .get(reference)
                    .map(|(name, _)| name.clone())
                    .unwrap_or_else(|| reference.clone());
                base.template = Some(tag_pages.template.clone());
                base.menu = MenuSetting::Shown(false);
                base
            });
            listings.extend(paginate(&root, &items(slugs), tag_pages.size, &base, config));
        }
    }

    listings
}
