//! Thumb Streamer - on-demand thumbnails for a directory of images.
//!
//! This binary starts the HTTP server or signs thumbnail paths.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use thumb_streamer::{
    config::{Cli, Command, ServeConfig, SignConfig, SignOutputFormat},
    server::{create_router, RouterConfig, ThumbSigner},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Sign(config) => run_sign(config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let options = match config.thumb_options() {
        Ok(options) => options,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Thumb Streamer v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Root: {}", config.root.display());
    info!("  URLs: {}", config.urls.join(", "));
    for pattern in &config.url_patterns {
        info!("  URL pattern: {}", pattern);
    }
    if let Some(ref prefix) = config.prefix {
        info!("  Prefix: {}", prefix);
    }
    info!(
        "  Crop: {}, preserve metadata: {}, JPEG quality: {}",
        config.crop, config.preserve_metadata, config.jpeg_quality
    );

    if options.signing_enabled() {
        info!("  Signed URLs: enabled ({:?}, {} chars)", config.digest, config.keylength.unwrap_or_default());
    } else {
        warn!("  Signed URLs: DISABLED - any thumbnail size can be requested");
        warn!("        Enable for production: --secret=<secret> --keylength=<n>");
    }

    let router = match create_router(&config.root, &options, build_router_config(&config)) {
        Ok(router) => router,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);
    info!("  curl http://{}/health", addr);

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "thumb_streamer=debug,tower_http=debug"
    } else {
        "thumb_streamer=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new();

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

// =============================================================================
// Sign Command
// =============================================================================

fn run_sign(config: SignConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let signer = ThumbSigner::new(&config.secret, config.keylength, config.digest);
    let Some(signed) = signer.sign_path(&config.path) else {
        eprintln!("Error: '{}' is not a thumbnail path", config.path);
        eprintln!("Expected something like /media/photo_50x100-sw.jpg");
        return ExitCode::FAILURE;
    };

    let prefix = config
        .prefix
        .as_deref()
        .map(|p| p.trim_end_matches('/'))
        .unwrap_or("");
    let path = format!("{}{}", prefix, signed);
    let url = config
        .base_url
        .as_deref()
        .map(|base| format!("{}{}", base.trim_end_matches('/'), path));

    match config.format {
        SignOutputFormat::Path => println!("{}", path),
        SignOutputFormat::Url => match url {
            Some(url) => println!("{}", url),
            None => println!("{}", path),
        },
        SignOutputFormat::Json => {
            let json = serde_json::json!({
                "path": path,
                "unsigned": config.path,
                "keylength": signer.keylength(),
                "url": url,
            });
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}
