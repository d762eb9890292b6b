use std::path::{Path, PathBuf};

use crate::{
    InitArgs,
    build::SyntaxHighlighter,
    config::{DEFAULT_CONFIG_FILE, PassThrough, SiteConfig},
    log,
};

const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>${ data.title } | ${ tacs.config.site_name }</title>
<link rel="stylesheet" href="${ tacs.config.root }media/css/highlight.css">
</head>
<body>
${ include('partials/nav.html') }
<main>
<h1>${ data.title }</h1>
<nav-heading></nav-heading>
${ data.content }
</main>
</body>
</html>
"#;

const LIST_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>${ data.title } | ${ tacs.config.site_name }</title>
</head>
<body>
${ include('partials/nav.html') }
<main>
<h1>${ data.title }</h1>
<ul>
${ data.pagination.page.map(p => `<li><a href="${ p.link }">${ p.title }</a></li>`) }
</ul>
${ data.pagination.hrefBack ? `<a href="${ data.pagination.hrefBack }">Newer</a>` : '' }
${ data.pagination.hrefNext ? `<a href="${ data.pagination.hrefNext }">Older</a>` : '' }
</main>
</body>
</html>
"#;

const NAV_PARTIAL: &str = r#"<nav><ul>${ tacs.nav.map(n => `<li><a href="${ n.link }">${ n.title }</a></li>`) }</ul></nav>
"#;

const INDEX_CONTENT: &str = "---
title: Home
priority: 1
---
Welcome to ${ tacs.config.site_name }.
";

const POST_CONTENT: &str = "---
title: Hello world
date: 2025-01-01
tags: Getting started
---
## First steps

Edit the files under `src/content` and run `presskit build`.
";

pub async fn run(args: &InitArgs) -> Result<(), anyhow::Error> {
    let path = if args.path.is_relative() {
        std::env::current_dir()?.join(&args.path)
    } else {
        args.path.clone()
    };

    if !path.exists() {
        if args.create {
            tokio::fs::create_dir_all(&path).await?;
            log!("init"; "created directory {}", path.display());
        } else {
            return Err(anyhow::anyhow!(
                "Directory does not exist: {path}",
                path = path.display()
            ));
        }
    }

    let config_file = path.join(DEFAULT_CONFIG_FILE);
    if config_file.exists() {
        return Err(anyhow::anyhow!(
            "Config file already exists: {}",
            config_file.display()
        ));
    }

    log!("init"; "initializing project in {}", path.display());
    let created = scaffold(&path).await?;
    for file in created {
        log!("init"; "created {}", file.display());
    }

    Ok(())
}

/// Write a starter config, templates and content under `path`.
async fn scaffold(path: &Path) -> Result<Vec<PathBuf>, anyhow::Error> {
    let mut config = SiteConfig::default();
    config.pass_through.push(PassThrough {
        from: PathBuf::from("src/media"),
        to: PathBuf::from("media"),
    });
    config.globals = serde_json::json!({
        "site_name": "My Presskit Site",
        "root": config.root,
    });

    let mut files: Vec<(PathBuf, String)> = vec![
        (PathBuf::from(DEFAULT_CONFIG_FILE), serde_yaml::to_string(&config)?),
        (config.template_dir.join(&config.default_template), DEFAULT_TEMPLATE.to_string()),
        (config.template_dir.join(&config.dir_pages.template), LIST_TEMPLATE.to_string()),
        (config.template_dir.join("partials/nav.html"), NAV_PARTIAL.to_string()),
        (config.content_dir.join("index.md"), INDEX_CONTENT.to_string()),
        (config.content_dir.join("post/hello-world.md"), POST_CONTENT.to_string()),
    ];
    if let Some(css) = SyntaxHighlighter::default().generate_css() {
        files.push((PathBuf::from("src/media/css/highlight.css"), css));
    }

    let mut created = Vec::with_capacity(files.len());
    for (relative, text) in files {
        let target = path.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, text).await?;
        created.push(target);
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Builder;

    #[tokio::test]
    async fn test_scaffold_builds() {
        let dir = tempfile::tempdir().unwrap();
        let created = scaffold(dir.path()).await.unwrap();
        assert!(created.iter().any(|p| p.ends_with(DEFAULT_CONFIG_FILE)));

        let config = SiteConfig::load_from_arg(Some(&dir.path().join(DEFAULT_CONFIG_FILE)))
            .await
            .unwrap()
            .resolve_paths(dir.path());
        let mut builder = Builder::new(config.clone()).unwrap();
        let result = builder.build().await.unwrap();
        assert_eq!(result.records, 2);

        let post =
            std::fs::read_to_string(config.build_dir.join("post/hello-world/index.html")).unwrap();
        assert!(post.contains("<h1>Hello world</h1>"));
        assert!(post.contains("My Presskit Site"));
        assert!(config.build_dir.join("post/index.html").exists());
        assert!(config.build_dir.join("tag/getting-started/index.html").exists());
    }
}
