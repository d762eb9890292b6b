//! Ordered callback lists run at fixed points of a build.
//!
//! Every hook is synchronous and runs in registration order:
//!
//! - `content_ingested`: mutate a record right after it is built from its file
//! - `template_ingested`: transform template text as it is added
//! - `pre_render`: mutate a record once the site aggregate exists
//! - `post_render`: transform a record's final output before it is written

use super::aggregate::SiteAggregate;
use super::record::ContentRecord;

pub type ContentIngestedHook = Box<dyn Fn(&mut ContentRecord) + Send + Sync>;
pub type TemplateIngestedHook = Box<dyn Fn(&str, String) -> String + Send + Sync>;
pub type PreRenderHook = Box<dyn Fn(&mut ContentRecord, &SiteAggregate) + Send + Sync>;
pub type PostRenderHook = Box<dyn Fn(&ContentRecord, String) -> String + Send + Sync>;

#[derive(Default)]
pub struct Hooks {
    content_ingested: Vec<ContentIngestedHook>,
    template_ingested: Vec<TemplateIngestedHook>,
    pre_render: Vec<PreRenderHook>,
    post_render: Vec<PostRenderHook>,
}

impl Hooks {
    #[allow(dead_code)]
    pub fn on_content_ingested<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut ContentRecord) + Send + Sync + 'static,
    {
        self.content_ingested.push(Box::new(hook));
        self
    }

    #[allow(dead_code)]
    pub fn on_template_ingested<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&str, String) -> String + Send + Sync + 'static,
    {
        self.template_ingested.push(Box::new(hook));
        self
    }

    #[allow(dead_code)]
    pub fn on_pre_render<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut ContentRecord, &SiteAggregate) + Send + Sync + 'static,
    {
        self.pre_render.push(Box::new(hook));
        self
    }

    #[allow(dead_code)]
    pub fn on_post_render<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&ContentRecord, String) -> String + Send + Sync + 'static,
    {
        self.post_render.push(Box::new(hook));
        self
    }
}

impl Hooks {
    pub fn content_ingested(&self, record: &mut ContentRecord) {
        for hook in &self.content_ingested {
            hook(record);
        }
    }

    pub fn template_ingested(&self, name: &str, text: String) -> String {
        self.template_ingested
            .iter()
            .fold(text, |text, hook| hook(name, text))
    }

    pub fn pre_render(&self, record: &mut ContentRecord, aggregate: &SiteAggregate) {
        for hook in &self.pre_render {
            hook(record, aggregate);
        }
    }

    pub fn post_render(&self, record: &ContentRecord, output: String) -> String {
        self.post_render
            .iter()
            .fold(output, |output, hook| hook(record, output))
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("content_ingested", &self.content_ingested.len())
            .field("template_ingested", &self.template_ingested.len())
            .field("pre_render", &self.pre_render.len())
            .field("post_render", &self.post_render.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;

    #[test]
    fn test_hooks_run_in_order() {
        let mut hooks = Hooks::default();
        hooks
            .on_template_ingested(|_, text| format!("{text}a"))
            .on_template_ingested(|name, text| format!("{text}{name}"));
        assert_eq!(hooks.template_ingested("t", "x".to_string()), "xat");

        hooks
            .on_post_render(|_, out| out.replace("old", "new"))
            .on_post_render(|record, out| format!("{out}<!-- {} -->", record.slug));
        let record = ContentRecord::synthetic("a.html", &SiteConfig::default());
        assert_eq!(
            hooks.post_render(&record, "old".to_string()),
            "new<!-- a.html -->"
        );
    }

    #[test]
    fn test_record_hooks_mutate() {
        let mut hooks = Hooks::default();
        hooks.on_content_ingested(|record| record.priority = 0.7);
        hooks.on_pre_render(|record, tacs| record.title = format!("{} records", tacs.all.len()));

        let mut record = ContentRecord::synthetic("a.html", &SiteConfig::default());
        hooks.content_ingested(&mut record);
        hooks.pre_render(&mut record, &SiteAggregate::default());
        assert_eq!(record.priority, 0.7);
        assert_eq!(record.title, "0 records");
    }

    #[test]
    fn test_empty_hooks_pass_through() {
        let hooks = Hooks::default();
        assert_eq!(hooks.template_ingested("t", "same".to_string()), "same");
        assert_eq!(format!("{hooks:?}"), "Hooks { content_ingested: 0, template_ingested: 0, pre_render: 0, post_render: 0 }");
    }
}
