use crate::{CleanArgs, config::Config};

pub async fn run(args: &CleanArgs) -> Result<(), anyhow::Error> {
    let config = Config::load_from_arg(args.config_file.as_deref())?;

    // Delete the generated artifacts folder
    let output_path = config
        .output
        .dir
        .canonicalize()
        .unwrap_or(config.output.dir.clone());
    if output_path.exists() {
        if args.dry_run {
            println!("Would delete {}", output_path.display());
        } else {
            tokio::fs::remove_dir_all(&output_path).await?;
            println!("Deleted {}", output_path.display());
        }
    } else {
        println!("Nothing to clean at {}", output_path.display());
    }

    Ok(())
}
