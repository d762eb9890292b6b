use crate::{BuildArgs, build::Builder, log};

use super::load_config;

pub async fn run(args: &BuildArgs) -> Result<(), anyhow::Error> {
    let mut config = load_config(args.config_file.as_deref()).await?;
    if args.dev {
        config.development = true;
    }

    let mut builder = Builder::new(config)?;
    let result = builder.build().await?;

    log!(
        "build";
        "built site to {} ({} records, {} templates, {} written, {} unchanged, {} static files)",
        result.build_dir.display(),
        result.records,
        result.templates,
        result.written,
        result.unchanged,
        result.copied
    );

    Ok(())
}
