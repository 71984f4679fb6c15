use std::path::PathBuf;
use std::sync::Arc;

use serenity::async_trait;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use structopt::StructOpt;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod models;
mod services;
mod utils;

use api::feed::DepthFeed;
use api::presence::DiscordPresence;
use config::Config;
use services::PriceMonitor;
use utils::{shutdown, MonitorHandle};

#[derive(Debug, StructOpt)]
#[structopt(name = "price-ticker-bot", about = "Order-book price ticker for Discord")]
struct Args {
    /// Configuration file name
    #[structopt(short = "c", long = "config-file", parse(from_os_str), default_value = "config.toml")]
    config_file: PathBuf,
}

struct Handler {
    config: Arc<Config>,
    endpoint: String,
    monitor: Arc<Mutex<Option<MonitorHandle>>>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        // ready fires again after a gateway reconnect; only the first one starts the loop
        let mut slot = self.monitor.lock().await;
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Price monitor already running");
            return;
        }

        let feed = DepthFeed::new(&self.endpoint, &self.config.symbol, self.config.feed_settings());
        info!("Watching {} on {}", feed.symbol(), self.endpoint);

        let mut monitor = PriceMonitor::new(
            feed,
            DiscordPresence::new(ctx),
            self.config.display_format(),
            self.config.timing(),
        );
        let (trigger, shutdown) = shutdown::channel();
        let task = tokio::spawn(async move { monitor.run(shutdown).await });

        *slot = Some(MonitorHandle::new(trigger, task));
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("price_ticker_bot=info".parse().expect("valid directive"))
                .add_directive("serenity=warn".parse().expect("valid directive")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::from_args();

    info!("🤖 Starting price ticker bot...");
    let config = match Config::load(&args.config_file) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load {}: {}", args.config_file.display(), e);
            return;
        }
    };

    let endpoint = match config.resolve_endpoint().await {
        Ok(endpoint) => endpoint,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    let token = match config.token() {
        Some(token) => token.to_string(),
        None => {
            error!("Discord token not set");
            return;
        }
    };

    let monitor = Arc::new(Mutex::new(None));
    let handler = Handler {
        config: Arc::new(config),
        endpoint,
        monitor: monitor.clone(),
    };

    let intents = GatewayIntents::GUILDS;
    let mut client = match Client::builder(&token, intents).event_handler(handler).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create client: {}", e);
            return;
        }
    };

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        info!("Shutting down...");

        let handle = monitor.lock().await.take();
        if let Some(handle) = handle {
            handle.stop().await;
        }
        shard_manager.shutdown_all().await;
    });

    if let Err(e) = client.start().await {
        error!("Client error: {}", e);
    }
}
