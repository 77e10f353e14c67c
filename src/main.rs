// Licensed under the MIT License
// Copyright (c) 2025 Hal <hal.long@outlook.com>

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use fluxion::config::ConfigManager;
use fluxion::http_client::ClientOptions;
use fluxion::stealth::{get_profile, CookieJar, StealthContext};
use fluxion::{FetchRequest, FluxionEngine, FluxionError, Result};

#[derive(Parser)]
#[command(name = "fluxion")]
#[command(about = "Adaptive parallel-range download engine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Hal <hal.long@outlook.com>")]
struct Cli {
    /// Enable info-level logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Print the full error chain instead of only the top-line message
    #[arg(long, global = true)]
    trace: bool,

    /// Render results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-error output
    #[arg(long, global = true)]
    quiet: bool,

    /// Disable progress bars and colored output
    #[arg(long, global = true)]
    plain: bool,

    /// Print a single-line summary instead of a detailed report
    #[arg(long, global = true)]
    minimal: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a URL with parallel-range chunking and resume support
    Fetch {
        url: String,
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
        #[arg(short = 'c', long)]
        connections: Option<usize>,
        #[arg(long)]
        no_resume: bool,
        #[arg(long)]
        no_verify: bool,
        #[arg(long)]
        timeout: Option<f64>,
        #[arg(long)]
        proxy: Option<String>,
        #[arg(long)]
        sha256: Option<String>,
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
        #[arg(long = "cookie")]
        cookies: Vec<String>,
        #[arg(long)]
        cookie_file: Option<PathBuf>,
        #[arg(long, value_parser = ["chrome", "firefox", "edge", "safari"])]
        browser_cookies: Option<String>,
        #[arg(long)]
        browser_profile: Option<String>,
        #[arg(long)]
        referer: Option<String>,
    },
    /// Stream a URL's bytes to stdout without buffering to disk
    Stream {
        url: String,
        #[arg(long)]
        no_verify: bool,
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
        #[arg(long = "cookie")]
        cookies: Vec<String>,
        #[arg(long)]
        browser_profile: Option<String>,
        #[arg(long)]
        referer: Option<String>,
    },
    /// Discover a URL's transfer characteristics
    Probe {
        url: String,
        #[arg(long)]
        no_verify: bool,
    },
    /// Measure latency distribution and throughput
    Bench {
        url: String,
        #[arg(short = 'n', long)]
        iterations: Option<usize>,
        #[arg(long)]
        no_verify: bool,
    },
    /// Probe each URL and fetch from whichever is fastest
    Mirror { urls: Vec<String> },
    /// Inspect a URL's TLS certificate
    Secure { url: String },
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.trace {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    let logging_config = fluxion::logging::LoggingConfig {
        level: log_level.to_string(),
        use_ansi_colors: !cli.plain,
        ..fluxion::logging::LoggingConfig::cli(cli.verbose)
    };
    let _ = fluxion::logging::init_logging(logging_config);

    let exit_code = tokio::select! {
        result = run(&cli) => match result {
            Ok(()) => 0,
            Err(e) => {
                report_error(&cli, &e);
                1
            }
        },
        _ = tokio::signal::ctrl_c() => 130,
    };

    std::process::exit(exit_code);
}

fn report_error(cli: &Cli, err: &FluxionError) {
    eprintln!("error: {}", err.message());
    if let Some(suggestion) = err.suggestion() {
        eprintln!("  hint: {suggestion}");
    }
    if cli.trace {
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
    }
}

async fn client_options(_cli: &Cli, timeout: Option<f64>, verify_tls: bool, proxy: Option<String>) -> Result<ClientOptions> {
    let config = ConfigManager::new().await.ok();
    let config = match config {
        Some(manager) => manager.get_config().await,
        None => fluxion::FluxionConfig::default(),
    };

    Ok(ClientOptions {
        timeout: Duration::from_secs_f64(timeout.unwrap_or(config.default_timeout)),
        verify_tls: verify_tls && config.verify_tls,
        proxy: proxy.or(config.proxy),
        user_agent: config.user_agent,
        max_connections: config.max_connections,
    })
}

fn parse_headers(raw: &[String]) -> HashMap<String, String> {
    raw.iter()
        .filter_map(|entry| entry.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

fn build_cookie_jar(cookies: &[String], cookie_file: Option<&PathBuf>, browser_cookies: Option<&str>) -> Result<CookieJar> {
    let mut jar = CookieJar::new();
    for raw in cookies {
        jar.add_raw(raw);
    }
    if let Some(path) = cookie_file {
        jar.load_file(path)?;
    }
    if let Some(browser) = browser_cookies {
        jar.load_browser(browser, None)?;
    }
    Ok(jar)
}

async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Fetch {
            url,
            output,
            connections,
            no_resume,
            no_verify,
            timeout,
            proxy,
            sha256,
            headers,
            cookies,
            cookie_file,
            browser_cookies,
            browser_profile,
            referer,
        } => {
            let options = client_options(cli, *timeout, !no_verify, proxy.clone()).await?;
            let jar = build_cookie_jar(cookies, cookie_file.as_ref(), browser_cookies.as_deref())?;

            let mut request = FetchRequest::new(url.clone());
            request.output = output.clone();
            request.headers = parse_headers(headers);
            request.cookies = jar.as_map();
            request.referer = referer.clone();
            request.browser_profile = browser_profile.clone();
            request.max_connections = connections.unwrap_or(options.max_connections);
            request.resume = !no_resume;
            request.verify_tls = options.verify_tls;
            request.timeout = options.timeout;
            request.proxy = options.proxy.clone();
            request.expected_sha256 = sha256.clone();

            let engine = FluxionEngine::new(options);
            let mut bar = (!cli.quiet && !cli.json).then(fluxion::progress::TransferProgressBar::new);
            let mut on_progress = |stats: &fluxion::TransferStats| {
                if let Some(bar) = bar.as_mut() {
                    bar.update(stats);
                }
            };
            let result = engine.fetch(request, Some(&mut on_progress)).await;
            if let Some(bar) = &bar {
                match &result {
                    Ok(_) => bar.finish("done"),
                    Err(e) => bar.abandon(e.message()),
                }
            }
            let result = result?;

            if cli.json {
                println!("{}", serde_json::to_string(&result).unwrap_or_default());
            } else if cli.minimal {
                println!("{}", result.output_path.display());
            } else if !cli.quiet {
                println!(
                    "Downloaded {:.2} MB to {} ({:.2} MB/s, {})",
                    result.bytes_downloaded as f64 / 1024.0 / 1024.0,
                    result.output_path.display(),
                    result.speed_bps / 1024.0 / 1024.0,
                    result.protocol
                );
                println!("sha256: {}", result.sha256);
            }
            Ok(())
        }
        Commands::Stream {
            url,
            no_verify,
            headers,
            cookies,
            browser_profile,
            referer,
        } => {
            let options = client_options(cli, None, !no_verify, None).await?;
            let mut jar = CookieJar::new();
            for raw in cookies {
                jar.add_raw(raw);
            }
            let profile = match browser_profile {
                Some(name) => Some(get_profile(name)?),
                None => None,
            };
            let ctx = StealthContext {
                profile,
                cookie_jar: jar,
                custom_headers: parse_headers(headers),
                referer: referer.clone(),
            };
            let request_headers = ctx.build_headers();

            let engine = FluxionEngine::new(options);
            let total = engine
                .stream(url, &request_headers, |chunk| {
                    use std::io::Write;
                    let _ = std::io::stdout().write_all(&chunk);
                })
                .await?;
            if cli.verbose {
                eprintln!("streamed {total} bytes");
            }
            Ok(())
        }
        Commands::Probe { url, no_verify } => {
            let options = client_options(cli, None, !no_verify, None).await?;
            let engine = FluxionEngine::new(options);
            let result = engine.probe(url, &HashMap::new()).await?;
            print_report(cli, &result);
            Ok(())
        }
        Commands::Bench { url, iterations, no_verify } => {
            let options = client_options(cli, None, !no_verify, None).await?;
            let engine = FluxionEngine::new(options);
            let result = engine.bench(url, iterations.unwrap_or(10)).await?;
            print_report(cli, &result);
            Ok(())
        }
        Commands::Mirror { urls } => {
            let options = client_options(cli, None, true, None).await?;
            let engine = FluxionEngine::new(options);
            let result = engine.mirror(urls, None).await?;
            print_report(cli, &result);
            Ok(())
        }
        Commands::Secure { url } => {
            let cert = fluxion::secure::inspect(url, true, Duration::from_secs(10)).await?;
            print_report(cli, &cert);
            Ok(())
        }
        Commands::Version => {
            println!("fluxion {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn print_report<T: serde::Serialize + std::fmt::Debug>(cli: &Cli, value: &T) {
    if cli.quiet {
        return;
    }
    if cli.json {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    } else if cli.minimal {
        println!("{}", serde_json::to_string(value).unwrap_or_default());
    } else {
        println!("{value:#?}");
    }
}
