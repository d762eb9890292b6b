use crate::{CleanArgs, log};

use super::load_config;

pub async fn run(args: &CleanArgs) -> Result<(), anyhow::Error> {
    let config = load_config(args.config_file.as_deref()).await?;

    let build_dir = &config.build_dir;
    if !build_dir.exists() {
        log!("clean"; "nothing to delete at {}", build_dir.display());
        return Ok(());
    }

    if args.dry_run {
        log!("clean"; "would delete {}", build_dir.display());
    } else {
        tokio::fs::remove_dir_all(build_dir).await?;
        log!("clean"; "deleted {}", build_dir.display());
    }

    Ok(())
}
