use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use filebalancer::config::BalancerConfig;
use filebalancer::container::{Container, ContainerRegistry};
use filebalancer::events::LoggingListener;
use filebalancer::health::HealthChecker;
use filebalancer::http::{run_api, ApiState};
use filebalancer::shutdown::install_shutdown_handler;
use filebalancer::users::UserService;
use filebalancer::{picker, scheduler, Dispatcher, FileCatalog};

#[derive(Parser, Debug)]
#[command(name = "filebalancer")]
#[command(version)]
#[command(about = "A replicated file-operation load balancer")]
struct Args {
    /// HTTP API port
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Target replica count for new uploads
    #[arg(long, default_value_t = 2)]
    replication_factor: u32,

    /// Health check interval in milliseconds
    #[arg(long, default_value_t = 3000)]
    health_check_interval_ms: u64,

    /// Container lock acquisition timeout in milliseconds
    #[arg(long, default_value_t = 15000)]
    lock_timeout_ms: u64,

    /// Comma-separated ids of the initial containers
    #[arg(long, default_value = "c1,c2,c3", value_delimiter = ',')]
    containers: Vec<String>,

    /// Scheduling policy: fcfs | sjn | priority | rr | mlq
    #[arg(long, default_value = "mlq")]
    scheduler: String,

    /// Container selection strategy: rr | least-conn
    #[arg(long, default_value = "rr")]
    picker: String,
}

impl Args {
    fn into_config(self) -> BalancerConfig {
        BalancerConfig {
            port: self.port,
            replication_factor: self.replication_factor,
            health_check_interval: Duration::from_millis(self.health_check_interval_ms),
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            initial_containers: self.containers,
            scheduler: self.scheduler,
            picker: self.picker,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Args::parse().into_config();

    let registry = Arc::new(ContainerRegistry::new());
    for id in &config.initial_containers {
        registry.add(Arc::new(Container::new(id.clone())))?;
    }

    let catalog = Arc::new(FileCatalog::new(config.replication_factor));
    let scheduler = scheduler::by_name(&config.scheduler)?;
    let picker = picker::by_name(&config.picker)?;
    let users = Arc::new(UserService::new());

    let shutdown = install_shutdown_handler();

    let dispatcher = Dispatcher::new(
        scheduler,
        picker,
        registry.clone(),
        catalog.clone(),
        config.lock_timeout,
        shutdown.clone(),
    );
    dispatcher.register_listener(Arc::new(LoggingListener));
    dispatcher.start();

    HealthChecker::new(registry.clone(), config.health_check_interval).start(shutdown.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = ApiState {
        dispatcher: dispatcher.clone(),
        catalog,
        registry,
        users,
    };
    tokio::spawn(async move {
        run_api(addr, state).await;
    });

    tracing::info!(
        port = config.port,
        rf = config.replication_factor,
        scheduler = %config.scheduler,
        picker = %config.picker,
        "Load balancer ready"
    );

    shutdown.cancelled().await;
    dispatcher.stop().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
