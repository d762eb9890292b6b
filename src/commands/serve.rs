use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use serde_json::json;
use tower_http::services::ServeDir;

use crate::{
    ServeArgs,
    build::{Builder, FileWatcher, ViewEngine, watch_and_rebuild},
    log,
};

use super::load_config;

/// Shared state for request-time rendering.
struct DynamicState {
    build_dir: PathBuf,
    index_filename: String,
    views: ViewEngine,
}

/// Render built HTML files per request; everything else falls through to
/// the static file service.
async fn render_dynamic(
    State(state): State<Arc<DynamicState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let Some(file) = html_file(&state.build_dir, &path, &state.index_filename) else {
        return next.run(request).await;
    };

    let query: HashMap<String, String> = Query::try_from_uri(request.uri())
        .map(|Query(query)| query)
        .unwrap_or_default();
    let data = json!({ "path": path, "query": query });

    match state.views.render_file(&file, &data).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            log!("error"; "{}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// The built HTML file a request path maps to, if there is one.
fn html_file(build_dir: &Path, request_path: &str, index_filename: &str) -> Option<PathBuf> {
    let relative = Path::new(request_path.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }

    let mut file = build_dir.join(relative);
    if request_path.ends_with('/') || file.is_dir() {
        file = file.join(index_filename);
    }

    let is_html = file
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"));
    (is_html && file.is_file()).then_some(file)
}

pub async fn run(args: &ServeArgs) -> Result<(), anyhow::Error> {
    let mut config = load_config(args.config_file.as_deref()).await?;
    config.development = true;

    log!("serve"; "building site...");
    let mut builder = Builder::new(config.clone())?;
    let result = builder.build().await?;
    log!(
        "serve";
        "built {} records ({} written, {} static files)",
        result.records,
        result.written,
        result.copied
    );

    if args.watch {
        let mut watch_dirs = vec![config.content_dir.clone(), config.template_dir.clone()];
        watch_dirs.extend(config.pass_through.iter().map(|entry| entry.from.clone()));

        match FileWatcher::new(&watch_dirs) {
            Ok(watcher) => {
                log!("watch"; "watching for changes...");
                tokio::spawn(watch_and_rebuild(builder, watcher, |stats| {
                    log!("watch"; "rebuilt: {} written, {} unchanged", stats.written, stats.unchanged);
                }));
            }
            Err(e) => log!("warn"; "failed to start file watcher: {}", e),
        }
    }

    let serve_dir = ServeDir::new(&config.build_dir).append_index_html_on_directories(true);
    let mut app = Router::new().fallback_service(serve_dir);

    if args.dynamic {
        let state = Arc::new(DynamicState {
            build_dir: config.build_dir.clone(),
            index_filename: config.index_filename.clone(),
            views: ViewEngine::new(&config.template_dir),
        });
        app = app.layer(middleware::from_fn_with_state(state, render_dynamic));
    }

    // Parse the address
    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;

    // Determine the URL to display
    let display_host = if args.bind == "0.0.0.0" {
        "localhost"
    } else {
        &args.bind
    };
    let url = format!("http://{}:{}", display_host, args.port);

    log!("serve"; "serving site at {}", url);
    log!("serve"; "press Ctrl+C to stop");

    // Open browser if requested
    if args.open
        && let Err(e) = open::that(&url)
    {
        log!("warn"; "failed to open browser: {}", e);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_file_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("post/a")).unwrap();
        std::fs::write(root.join("index.html"), "home").unwrap();
        std::fs::write(root.join("post/a/index.html"), "a").unwrap();
        std::fs::write(root.join("feed.xml"), "<feed/>").unwrap();

        assert_eq!(html_file(root, "/", "index.html"), Some(root.join("index.html")));
        assert_eq!(
            html_file(root, "/post/a/", "index.html"),
            Some(root.join("post/a/index.html"))
        );
        assert_eq!(
            html_file(root, "/post/a", "index.html"),
            Some(root.join("post/a/index.html"))
        );
        assert_eq!(html_file(root, "/feed.xml", "index.html"), None);
        assert_eq!(html_file(root, "/missing/", "index.html"), None);
        assert_eq!(html_file(root, "/../index.html", "index.html"), None);
    }
}
