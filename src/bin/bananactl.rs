use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use banana_edit::cache::proxy::DEFAULT_ASSETS;
use banana_edit::session::presets::{find as find_preset, PRESETS};
use banana_edit::session::state::ProcessingStatus;
use banana_edit::session::{accept_image_file, run_generate};
use banana_edit::{CacheStore, Config, FetchProxy, GeminiClient, SessionState};

#[derive(Parser, Debug)]
#[command(name = "bananactl", about = "CLI for BananaEdit", version)]
struct Cli {
    /// Override GEMINI_API_URL
    #[arg(global = true, long)]
    gemini_api_url: Option<String>,

    /// Override APP_ORIGIN (used by cache commands)
    #[arg(global = true, long)]
    app_origin: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Edit an image with a natural-language instruction
    Edit {
        /// Path to the source image (jpg, png, webp, gif)
        #[arg(long, value_name = "PATH")]
        image: PathBuf,
        /// Edit instruction, e.g. "Remove the background"
        #[arg(long, conflicts_with = "preset")]
        prompt: Option<String>,
        /// Use a built-in preset instruction (see `presets`)
        #[arg(long)]
        preset: Option<String>,
        /// Output path (defaults to ./banana-edit-<timestamp>.<ext>)
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// List built-in preset instructions
    Presets,
    /// Offline cache operations
    Cache {
        #[command(subcommand)]
        cmd: CacheCmd,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCmd {
    /// Pre-populate the current cache generation with core assets
    Warm {
        /// Asset paths or URLs (defaults to the core asset list)
        #[arg(long = "asset", value_name = "PATH_OR_URL")]
        assets: Vec<String>,
    },
    /// Fetch a URL through the network-first proxy
    Fetch {
        /// URL or app-origin-relative path
        url: String,
        /// Write the response body to this path
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load env and parse CLI
    Config::dotenv_load();
    let cli = Cli::parse();

    let mut conf = Config::new().expect("Failed to load config");
    if let Some(url) = cli.gemini_api_url {
        conf.gemini_api_url = url;
    }
    if let Some(origin) = cli.app_origin {
        conf.app_origin = origin;
    }

    match cli.command {
        Commands::Edit {
            image,
            prompt,
            preset,
            out,
        } => {
            let instruction = match (prompt, preset) {
                (Some(p), None) => p,
                (None, Some(name)) => match find_preset(&name) {
                    Some(preset) => preset.instruction.to_string(),
                    None => {
                        eprintln!("Unknown preset: {}", name);
                        std::process::exit(2);
                    }
                },
                _ => {
                    eprintln!("Must provide either --prompt <text> or --preset <name>");
                    std::process::exit(2);
                }
            };

            let session = Arc::new(RwLock::new(SessionState::new()));
            if let Err(e) = accept_image_file(&session, &image).await {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }

            let provider = GeminiClient::new(
                conf.gemini_api_url.clone(),
                conf.gemini_api_key.clone(),
                conf.gemini_model.clone(),
            );
            if let Err(e) = run_generate(&session, &provider, &instruction).await {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }

            let state = session.read().await;
            if state.status() == ProcessingStatus::Error {
                eprintln!(
                    "Error: {}",
                    state.error().unwrap_or("generate failed")
                );
                std::process::exit(1);
            }
            let download = state.download()?;
            let path = out.unwrap_or_else(|| PathBuf::from(&download.filename));
            tokio::fs::write(&path, &download.bytes).await?;
            println!("Saved {} ({} bytes)", path.display(), download.bytes.len());
            Ok(())
        }
        Commands::Presets => {
            for preset in PRESETS {
                println!("{}: {}", preset.name, preset.instruction);
            }
            Ok(())
        }
        Commands::Cache { cmd } => {
            let store = CacheStore::open(conf.cache_dir.clone(), &conf.cache_version).await?;
            let proxy = FetchProxy::new(store, conf.app_origin.clone());
            match cmd {
                CacheCmd::Warm { assets } => {
                    let assets: Vec<&str> = if assets.is_empty() {
                        DEFAULT_ASSETS.to_vec()
                    } else {
                        assets.iter().map(|s| s.as_str()).collect()
                    };
                    if let Err(e) = proxy.install(&assets).await {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                    proxy.activate().await?;
                    println!(
                        "Warmed cache generation '{}' with {} asset(s)",
                        conf.cache_version,
                        assets.len()
                    );
                    Ok(())
                }
                CacheCmd::Fetch { url, out } => {
                    let resolved = proxy.resolve(&url);
                    match proxy.fetch("GET", &resolved).await {
                        Ok(response) => {
                            println!("{} {} ({} bytes)", response.status, resolved, response.body.len());
                            if let Some(path) = out {
                                tokio::fs::write(&path, &response.body).await?;
                                println!("Saved {}", path.display());
                            }
                            Ok(())
                        }
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            std::process::exit(1);
                        }
                    }
                }
            }
        }
    }
}
