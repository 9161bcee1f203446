use std::net::SocketAddr;

use crate::{
    ServeArgs,
    config::Config,
    pipeline::Pipeline,
    prompt::resolver_for_dir,
    render::Renderer,
    web::{AppState, router},
};

pub async fn run(args: &ServeArgs) -> Result<(), anyhow::Error> {
    let config = Config::load_from_arg(args.config_file.as_deref())?;

    let pipeline = Pipeline::default_pipeline(resolver_for_dir(&config.prompts.dir));
    let renderer = Renderer::new()?;

    let state = AppState::new(config, pipeline, renderer);
    state.spawn_session_sweeper();
    let app = router(state);

    // Parse the address
    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;

    // Determine the URL to display
    let display_host = if args.bind == "0.0.0.0" {
        "localhost"
    } else {
        &args.bind
    };
    let url = format!("http://{}:{}", display_host, args.port);

    println!("\nServing generator at {}", url);
    println!("Press Ctrl+C to stop\n");

    if args.open
        && let Err(e) = open::that(&url)
    {
        eprintln!("Failed to open browser: {}", e);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
