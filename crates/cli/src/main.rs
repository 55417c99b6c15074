use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdftag_core::orchestrator::{apply_outcome, extract_project, generate_one};
use pdftag_core::{write_tagged_pdf, AltTextMap, Config, ModelClient, Project, ProgressReporter};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// pdftag — tagged-PDF alt-text pipeline for accessibility remediation
#[derive(Parser)]
#[command(name = "pdftag", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline over one local PDF and write a tagged copy
    Process(ProcessArgs),
    /// Start the HTTP collaborator surface (upload/generate/export over REST + WS)
    Serve(ServeArgs),
}

#[derive(Parser)]
struct ProcessArgs {
    /// Path to the source PDF
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for materialized images and the tagged PDF
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// Base URL of the vision model endpoint
    #[arg(long, default_value = "http://localhost:11434")]
    model_base_url: String,

    /// Model identifier passed to the vision endpoint
    #[arg(long, default_value = "qwen2.5vl")]
    model_name: String,

    /// Skip the endpoint reachability check before starting
    #[arg(long)]
    skip_check: bool,

    /// Extraction only — discover and materialize images but skip model calls
    #[arg(long)]
    extract_only: bool,
}

#[derive(Parser)]
struct ServeArgs {
    /// Bind address
    #[arg(long, default_value = "0.0.0.0:3000")]
    bind: String,

    /// Path to the SQLite project catalog
    #[arg(long, default_value = "./data/pdftag.sqlite3")]
    db_path: PathBuf,

    /// Root directory for uploaded source PDFs
    #[arg(long, default_value = "./data/uploads")]
    uploads_dir: PathBuf,

    /// Root directory for per-project generated artifacts
    #[arg(long, default_value = "./data/results")]
    results_dir: PathBuf,

    /// Base URL of the vision model endpoint
    #[arg(long, default_value = "http://localhost:11434")]
    model_base_url: String,

    /// Model identifier passed to the vision endpoint
    #[arg(long, default_value = "qwen2.5vl")]
    model_name: String,
}

/// Progress reporter backed by an indicatif progress bar, one bar per
/// document: length is the image count, position advances per finished
/// image rather than per page.
struct CliProgressReporter {
    bar: ProgressBar,
    done: AtomicU32,
}

impl CliProgressReporter {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} images ({msg})",
            )
            .unwrap()
            .progress_chars("█▉▊▋▌▍▎▏ "),
        );
        Self {
            bar,
            done: AtomicU32::new(0),
        }
    }
}

impl ProgressReporter for CliProgressReporter {
    fn on_extraction_start(&self, filename: &str, total_pages: u32) {
        self.bar.set_message(format!("extracting {filename} ({total_pages} pages)"));
    }

    fn on_extraction_complete(&self, filename: &str, total_images: u32) {
        self.bar.set_length(total_images as u64);
        self.bar.set_position(0);
        self.bar.set_message(filename.to_string());
    }

    fn on_image_start(&self, page_num: u32, image_index: u32) {
        self.bar.set_message(format!("page {page_num} image {image_index}"));
    }

    fn on_image_done(&self, _page_num: u32, _image_index: u32, alt_text_preview: &str) {
        let n = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        self.bar.set_position(n as u64);
        let preview: String = alt_text_preview.chars().take(50).collect();
        self.bar.set_message(preview);
    }

    fn on_project_complete(&self, _project_id: &str, total_images: u32) {
        self.bar.finish_with_message(format!("done — {total_images} images"));
    }

    fn on_error(&self, page_num: u32, error: &str) {
        self.bar.println(format!("  error on page {page_num}: {error}"));
    }
}

fn iso_now() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process(args) => run_process(args).await,
        Commands::Serve(args) => run_serve(args).await,
    }
}

async fn run_process(args: ProcessArgs) -> Result<()> {
    if !args.input.is_file() {
        anyhow::bail!("input not found: {}", args.input.display());
    }

    tokio::fs::create_dir_all(&args.output).await?;

    let config = Config {
        model_base_url: args.model_base_url,
        model_name: args.model_name,
        ..Config::default()
    };

    let filename = args
        .input
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("document.pdf")
        .to_string();

    let now = iso_now();
    let id = uuid::Uuid::new_v4().to_string();
    let mut project = Project::new(
        id.clone(),
        "local".to_string(),
        filename.clone(),
        args.input.to_string_lossy().into_owned(),
        &now,
    );

    let reporter: Arc<dyn ProgressReporter> = Arc::new(CliProgressReporter::new());
    let input = args.input.clone();
    let extract_input = input.clone();
    let extract_output = args.output.clone();
    let extract_reporter = reporter.clone();
    let (mut project, mut images) = tokio::task::spawn_blocking(move || {
        let result = extract_project(&mut project, &extract_input, &extract_output, extract_reporter.as_ref());
        result.map(|images| (project, images))
    })
    .await
    .context("extraction task panicked")??;

    println!("extracted {} image(s) from {}", images.len(), filename);

    if !args.extract_only {
        let client = ModelClient::new(&config);
        if !args.skip_check {
            client.check().await.context("vision endpoint not reachable")?;
        }

        for descriptor in images.iter_mut() {
            let outcome = generate_one(&client, &config, descriptor, reporter.as_ref()).await;
            apply_outcome(descriptor, outcome);
        }
        reporter.on_project_complete(&project.id, images.len() as u32);

        let alt_texts: AltTextMap = images
            .iter()
            .filter(|img| !img.is_synthetic())
            .map(|img| (img.xref, img.effective_alt_text()))
            .collect();

        let tagged_path = args.output.join(format!(
            "{}_tagged.pdf",
            filename.trim_end_matches(".pdf")
        ));
        let source = input.clone();
        let dest = tagged_path.clone();
        tokio::task::spawn_blocking(move || write_tagged_pdf(&source, &dest, &alt_texts))
            .await
            .context("tagged-PDF writer task panicked")??;

        println!("wrote tagged PDF to {}", tagged_path.display());
    }

    project.total_images = images.len() as u32;
    let summary_path = args.output.join("project.json");
    tokio::fs::write(&summary_path, serde_json::to_vec_pretty(&(&project, &images))?).await?;
    println!("wrote project summary to {}", summary_path.display());

    Ok(())
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    if let Some(parent) = args.db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }
    tokio::fs::create_dir_all(&args.uploads_dir).await?;
    tokio::fs::create_dir_all(&args.results_dir).await?;

    let config = Config {
        model_base_url: args.model_base_url,
        model_name: args.model_name,
        db_path: args.db_path.to_string_lossy().into_owned(),
        uploads_dir: args.uploads_dir.to_string_lossy().into_owned(),
        results_dir: args.results_dir.to_string_lossy().into_owned(),
        ..Config::default()
    };

    let store = pdftag_server::jobs::ProjectStore::new(&args.db_path)
        .context("failed to open project catalog")?;
    let state = pdftag_server::AppState::new(store, config, args.uploads_dir.clone(), args.results_dir.clone());
    let app = pdftag_server::create_app(state);

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    println!("pdftag server listening on http://{}", args.bind);

    axum::serve(listener, app).await?;
    Ok(())
}
