use fanout_core::{config::load_dotenv, init_tracing, Environment};
use fanout_relay::{run, RelayConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let dotenv_loaded = load_dotenv();
    let env = Environment::current();
    init_tracing(&env);

    let config = RelayConfig::from_env()?;
    tracing::info!(
        environment = %env,
        dotenv = dotenv_loaded,
        listen = %config.listen_addr(),
        max_body_bytes = config.max_body_bytes,
        "Starting fanout relay"
    );

    run(config).await?;
    Ok(())
}
