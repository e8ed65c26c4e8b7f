use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use ai_image_queries::ai::{self, AiService};
use ai_image_queries::config;
use ai_image_queries::image_data::{self, ImageData};
use ai_image_queries::query::{AiAutoGeneratedField, AiContent, QueryOrchestrator};

#[derive(Parser, Debug)]
#[command(
    name = "ai-image-queries",
    version,
    about = "Generate AI titles, captions, tags, and semantic descriptions for images"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Fields to generate, comma separated (default: queries.auto_generate from config)
    #[arg(short, long, value_name = "FIELDS", value_delimiter = ',')]
    fields: Vec<AiAutoGeneratedField>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    let config = config::Config::load(cli.config.as_deref())?;

    let fields = if cli.fields.is_empty() {
        config.queries.auto_generate.clone()
    } else {
        cli.fields.clone()
    };
    if fields.is_empty() {
        anyhow::bail!("No fields to generate. Pass --fields or set queries.auto_generate in the config.");
    }

    let images = image_data::collect_images(&cli.paths);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }
    log::info!("Found {} image(s) to process", images.len());

    let chain = ai::build_service_chain(&config);
    if chain.is_empty() {
        anyhow::bail!(
            "No AI services configured. Run `ai-image-queries --init` to create a config file, then add your API keys."
        );
    }
    log::info!("AI chain: {}", chain.names().join(" → "));
    let service: Arc<dyn AiService> = Arc::new(chain);

    let fields_label: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
    log::info!("Generating: {}", fields_label.join(", "));

    let mut results = Vec::new();
    let total = images.len();
    let mut failed = 0;

    for (i, image_path) in images.iter().enumerate() {
        log::info!("[{}/{}] Processing: {}", i + 1, total, image_path.display());

        let image = match ImageData::from_path(image_path, config.queries.max_dimension) {
            Ok(image) => image,
            Err(e) => {
                log::error!("  Error: {e:#}");
                failed += 1;
                continue;
            }
        };

        let orchestrator = QueryOrchestrator::new(Arc::clone(&service), fields.clone(), Some(image))?;
        orchestrator.wait_until_idle().await;
        let content = orchestrator.content();

        if !cli.json {
            print_content(&content);
        }
        if is_empty(&content) {
            log::warn!("  No AI suggestions returned");
            failed += 1;
        }

        results.push((image_path.clone(), content));
    }

    if cli.json {
        let json_results: Vec<serde_json::Value> = results
            .iter()
            .map(|(path, content)| {
                serde_json::json!({
                    "path": path.display().to_string(),
                    "title": content.title,
                    "caption": content.caption,
                    "tags": content.tags,
                    "semantic_description": content.semantic_description,
                })
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&json_results)?);
    }

    log::info!(
        "Done: {} succeeded, {failed} failed out of {total} images",
        total - failed
    );

    Ok(())
}

fn is_empty(content: &AiContent) -> bool {
    content.title.is_none()
        && content.caption.is_none()
        && content.tags.is_none()
        && content.semantic_description.is_none()
}

fn print_content(content: &AiContent) {
    if let Some(ref title) = content.title {
        println!("  Title:    {title}");
    }
    if let Some(ref caption) = content.caption {
        println!("  Caption:  {caption}");
    }
    if let Some(ref tags) = content.tags {
        println!("  Tags:     {}", tags.join(", "));
    }
    if let Some(ref semantic) = content.semantic_description {
        println!("  Semantic: {semantic}");
    }
}
