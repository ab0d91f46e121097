//! Server implementation

#![warn(missing_docs)]

mod http;

use std::path::{Path, PathBuf};
use std::thread;

use eyre::{eyre, Result, WrapErr};
use ticket_desk_core::{Config, RequestHandler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line options
#[derive(Debug)]
struct Opts {
    /// Configuration of the ticket desk
    config: Config,
}

impl Opts {
    fn from_args() -> Result<Self> {
        let args: Vec<String> = std::env::args().skip(1).collect();

        let config = match args.iter().position(|arg| arg == "-config") {
            Some(i) => {
                let path = args
                    .get(i + 1)
                    .ok_or_else(|| eyre!("-config takes a file name"))?;
                let mut config = Config::load(Path::new(path))?;
                config.apply_env(|key| std::env::var(key).ok())?;
                config
            }
            None => Config::discover()?,
        };

        Self::parse(args, config)
    }

    /// Apply command line `args` on top of `config`
    fn parse(args: impl IntoIterator<Item = String>, config: Config) -> Result<Self> {
        let mut opts = Opts { config };

        let mut option: Option<String> = None;
        for arg in args {
            if let Some(opt) = option {
                match opt.as_str() {
                    "-config" => {}
                    "-db" => opts.config.database = PathBuf::from(arg),
                    "-host" => opts.config.host = arg,
                    "-public" => opts.config.public_dir = PathBuf::from(arg),
                    "-port" => {
                        opts.config.port = arg.parse().wrap_err("-port takes a decimal u16")?
                    }
                    "-http-threads" => {
                        opts.config.http_threads =
                            arg.parse().wrap_err("-http-threads takes a decimal u32")?
                    }
                    _ => return Err(eyre!("unknown option {opt}")),
                }
                option = None;
            } else {
                match arg.as_str() {
                    "-create-missing" => opts.config.create_missing = true,
                    _ => option = Some(arg),
                }
            }
        }
        if let Some(opt) = option {
            return Err(eyre!("leftover option {opt}"));
        }
        if opts.config.http_threads == 0 {
            return Err(eyre!("-http-threads must be at least 1"));
        }

        Ok(opts)
    }
}

fn http_loop<H: RequestHandler>(server: &tiny_http::Server, handler: &H, public_dir: &Path) {
    loop {
        let rq = match server.recv() {
            Ok(rq) => rq,
            Err(e) => {
                tracing::info!("HTTP loop stopped: {e}");
                return;
            }
        };
        if let Some(rq) = http::parse(rq, public_dir) {
            handler.handle(rq);
        }
    }
}

/// Answer requests on `config.http_threads` threads until `stopped` returns
///
/// If `stopped` returns `true`, every HTTP thread is unblocked and this
/// function returns once all of them are done. On `false` the threads keep
/// serving.
fn serve<H: RequestHandler + Sync>(
    server: &tiny_http::Server,
    handler: &H,
    config: &Config,
    stopped: impl FnOnce() -> bool + Send,
) -> Result<()> {
    thread::scope(|s| -> Result<()> {
        thread::Builder::new()
            .name(String::from("shutdown"))
            .spawn_scoped(s, move || {
                if stopped() {
                    for _ in 0..config.http_threads {
                        server.unblock();
                    }
                }
            })?;
        for i in 0..config.http_threads {
            thread::Builder::new()
                .name(format!("http_{i}"))
                .spawn_scoped(s, || http_loop(server, handler, &config.public_dir))?;
        }
        Ok(())
    })
}

/// Block until Ctrl+C or SIGTERM
fn wait_for_signal() -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = signal(SignalKind::terminate())?;
            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    res?;
                    tracing::info!("Received Ctrl+C");
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM");
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await?;
            tracing::info!("Received Ctrl+C");
        }

        Ok::<(), std::io::Error>(())
    })
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let opts = Opts::from_args()?;
    let config = &opts.config;

    let desk = ticket_desk_store::launch(config)?;
    let server = tiny_http::Server::http((config.host.as_str(), config.port))
        .map_err(|e| eyre!("could not listen on {}:{}: {e}", config.host, config.port))?;
    tracing::info!("Server started: http://{}:{}/", config.host, config.port);
    tracing::info!("Press Ctrl+C to shutdown");

    serve(&server, &desk, config, || match wait_for_signal() {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("cannot listen for shutdown signals: {e}");
            false
        }
    })?;

    tracing::info!("Shutting down gracefully...");
    desk.shutdown();
    Ok(())
}
