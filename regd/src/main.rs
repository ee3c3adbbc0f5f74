//! Daemon entry point: loads configuration, opens both control sockets, and serves
//! connections until asked to shut down — the userspace analogue of `DriverEntry` bringing
//! up the device and `DriverUnload` tearing it back down.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, LevelFilter};
use regd::config::{ConfigManager, RegdConfig};
use regd::control::{kcont, vars};
use regd::kcont::KcontRegistry;
use regd::vars::VarsRegistry;
use tokio::net::UnixListener;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = find_config_file();
    if !config_path.exists() {
        write_default_config(&config_path)?;
    }
    let cfg_mgr = Arc::new(ConfigManager::new(&config_path)?);
    let cfg = cfg_mgr.get();

    let level: LevelFilter = cfg.log_level.parse().unwrap_or(LevelFilter::Info);
    regd::logger::init(&cfg.log_dir, level)?;
    info!("regd starting, config={}", config_path.display());

    let kcont_registry = Arc::new(KcontRegistry::new(cfg.kcont_buckets));
    let vars_registry = Arc::new(VarsRegistry::new(cfg.vars_default_capacity));

    let kcont_listener = bind_socket(&cfg.kcont_socket)?;
    let vars_listener = bind_socket(&cfg.vars_socket)?;
    info!("kcont socket listening on {}", cfg.kcont_socket.display());
    info!("vars socket listening on {}", cfg.vars_socket.display());

    let kcont_task = tokio::spawn(accept_loop(kcont_listener, move |stream| {
        kcont::serve(stream, kcont_registry.clone())
    }));
    let vars_task = tokio::spawn(accept_loop(vars_listener, move |stream| {
        vars::serve(stream, vars_registry.clone())
    }));

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, closing sockets");
    kcont_task.abort();
    vars_task.abort();
    let _ = std::fs::remove_file(&cfg.kcont_socket);
    let _ = std::fs::remove_file(&cfg.vars_socket);

    Ok(())
}

async fn accept_loop<F, Fut>(listener: UnixListener, handler: F)
where
    F: Fn(tokio::net::UnixStream) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let fut = handler(stream);
                tokio::spawn(fut);
            }
            Err(e) => {
                error!("accept failed: {e}");
            }
        }
    }
}

fn bind_socket(path: &Path) -> std::io::Result<UnixListener> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    // A stale socket file from an unclean previous shutdown must not block bind.
    let _ = std::fs::remove_file(path);
    UnixListener::bind(path)
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn write_default_config(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml = toml::to_string_pretty(&RegdConfig::default()).expect("RegdConfig always serializes");
    std::fs::write(path, toml)
}

fn find_config_file() -> PathBuf {
    if let Some(cfg) = std::env::var_os("REGD_CONFIG") {
        return PathBuf::from(cfg);
    }
    PathBuf::from("/etc/regd/config.toml")
}
