use crate::{
    InitArgs,
    config::{CONFIG_FILE_NAME, Config},
    prompt::{DEFAULT_PROMPTS, DirectoryStore},
};

pub async fn run(args: &InitArgs) -> Result<(), anyhow::Error> {
    let path = if args.path.is_relative() {
        std::env::current_dir()?.join(&args.path)
    } else {
        args.path.clone()
    };

    if !path.exists() {
        if args.create {
            tokio::fs::create_dir_all(&path).await?;
            println!("Created directory {path}", path = path.display());
        } else {
            return Err(anyhow::anyhow!(
                "Directory does not exist: {path}",
                path = path.display()
            ));
        }
    }

    println!("Initializing project in {}", path.display());

    let default_config = Config::default();
    let config_file = path.join(CONFIG_FILE_NAME);
    if config_file.exists() {
        println!(
            "Config file {config_file} already exists, leaving it untouched",
            config_file = config_file.display()
        );
    } else {
        let config_text = serde_yaml::to_string(&default_config)?;
        tokio::fs::write(&config_file, config_text).await?;
        println!(
            "Created config file {config_file}",
            config_file = config_file.display()
        );
    }

    // Existing templates may have been edited; only fill in the missing ones.
    let store = DirectoryStore::new(path.join(&default_config.prompts.dir));
    tokio::fs::create_dir_all(path.join(&default_config.prompts.dir)).await?;
    let mut written = 0;
    for (key, template) in DEFAULT_PROMPTS {
        let prompt_file = store.path_for(key);
        if prompt_file.exists() {
            continue;
        }
        tokio::fs::write(&prompt_file, format!("{template}\n")).await?;
        written += 1;
    }

    println!(
        "Wrote {written} prompt template(s) to {dir}",
        dir = path.join(&default_config.prompts.dir).display()
    );

    Ok(())
}
