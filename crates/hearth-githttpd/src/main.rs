use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::exit;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use hearth::config::Config;
use hearth_githttpd::{routes, Gateway};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_MSG: &str = r#"
Usage

   hearth-githttpd [<option>...]

Options

    --config      <path>       Config file to use (default: ./config.json)
    --listen      <address>    Address to listen on
    --log-level   <level>      Set log level (default: info)
    --version                  Print program version
    --help                     Print help
"#;

struct Options {
    config: Option<PathBuf>,
    listen: Option<SocketAddr>,
    log_level: Option<log::Level>,
}

fn parse_options() -> Result<Options, lexopt::Error> {
    use lexopt::prelude::*;

    let mut parser = lexopt::Parser::from_env();
    let mut config = None;
    let mut listen = None;
    let mut log_level = None;

    while let Some(arg) = parser.next()? {
        match arg {
            Long("config") => {
                config = Some(parser.value()?.parse_with(PathBuf::from_str)?);
            }
            Long("listen") => {
                listen = Some(parser.value()?.parse_with(SocketAddr::from_str)?);
            }
            Long("log-level") => {
                log_level = Some(parser.value()?.parse_with(log::Level::from_str)?);
            }
            Long("help") | Short('h') => {
                println!("{HELP_MSG}");
                exit(0);
            }
            Long("version") => {
                println!("hearth-githttpd {VERSION}");
                exit(0);
            }
            _ => {
                return Err(arg.unexpected());
            }
        }
    }

    Ok(Options {
        config,
        listen,
        log_level,
    })
}

#[derive(Error, Debug)]
enum ExecutionError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    ConfigLoading(#[from] hearth::config::LoadError),
    #[error(transparent)]
    Seed(#[from] hearth::config::SeedError),
}

fn execute(options: Options) -> Result<(), ExecutionError> {
    let config_path = options
        .config
        .unwrap_or_else(|| PathBuf::from("config.json"));
    let mut config = if config_path.is_file() {
        Config::load(&config_path)?
    } else {
        log::warn!(
            target: "githttpd",
            "No configuration found at '{}', using defaults", config_path.display()
        );
        Config::default()
    };

    // The command line takes precedence over the configuration file.
    if options.log_level.is_none() {
        log::set_max_level(log::Level::from(config.log).to_level_filter());
    }
    if let Some(listen) = options.listen {
        config.listen = listen;
    }

    log::info!(target: "githttpd", "Starting hearth-githttpd {VERSION}..");

    std::fs::create_dir_all(&config.storage)?;
    let forge = Arc::new(config.directory()?);
    let listen = config.listen;
    let gateway = Arc::new(Gateway::new(config, forge));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(listen).await?;
        log::info!(target: "githttpd", "Listening on {listen}..");

        axum::serve(listener, routes::router(gateway))
            .with_graceful_shutdown(async {
                tokio::signal::ctrl_c().await.ok();
                log::info!(target: "githttpd", "Shutting down..");
            })
            .await
    })?;

    Ok(())
}

fn panic_hook(info: &std::panic::PanicHookInfo) {
    let thread = std::thread::current();
    let thread = thread.name().unwrap_or("<unnamed>");

    let msg = info
        .payload()
        .downcast_ref::<&'static str>()
        .copied()
        .or(info.payload().downcast_ref::<String>().map(|s| s.as_str()))
        .unwrap_or("Box<Any>");

    match info.location() {
        Some(location) => {
            log::error!(
                target: "panic", "thread '{thread}' panicked at '{msg}': {}:{}",
                location.file(),
                location.line(),
            );
        }
        None => log::error!(target: "panic", "thread '{thread}' panicked at '{msg}'"),
    }

    log::logger().flush();
}

fn main() {
    let options = parse_options().unwrap_or_else(|err| {
        // The lexopt errors read nicely with a comma.
        eprintln!("Failed to parse options, {err:#}");
        exit(2);
    });

    let level = options
        .log_level
        .or_else(hearth::logger::env_level)
        .unwrap_or(log::Level::Info);
    hearth::logger::init(level).unwrap_or_else(|err| {
        eprintln!("Failed to initialize logging: {err:#}");
        exit(3);
    });

    std::panic::set_hook(Box::new(panic_hook));

    if let Err(err) = execute(options) {
        log::error!(target: "githttpd", "{err:#}");
        exit(1);
    }
}
