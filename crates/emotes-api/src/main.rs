use emotes_core::Config;

// Image buffers churn the allocator; use mimalloc
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (_state, router) = emotes_api::setup::initialize_app(config.clone()).await?;

    emotes_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
