use anyhow::Result;
use clap::Parser;
use generate::OllamaQuestionGenerator;
use pipeline::{DocumentQuestionPipeline, Settings, TimedOperation};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "study-questions", about = "Generate study questions from extracted lecture text")]
struct Cli {
    /// Settings document
    #[arg(long, default_value = "settings.json")]
    settings: PathBuf,

    /// Directory of .txt files (overrides question_generation.text_input_dir)
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Where question sets are written (overrides question_generation.questions_output_dir)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Model name (overrides ollama.model)
    #[arg(long)]
    model: Option<String>,

    /// Process a single text file instead of the input directory
    #[arg(long)]
    file: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let timer = TimedOperation::start();

    let mut settings = Settings::load(&cli.settings);
    if let Some(dir) = cli.input_dir {
        settings.question_generation.text_input_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        settings.question_generation.questions_output_dir = dir;
    }
    if let Some(model) = cli.model {
        settings.ollama.model = model;
    }

    let client = settings.client();
    if !client.is_available().await {
        anyhow::bail!(
            "Cannot connect to Ollama at {}. Make sure it is running with: ollama serve",
            client.base_url()
        );
    }

    println!("✅ Connected to Ollama at {}", client.base_url());
    println!("🔧 Using model: {}", client.model());

    let output_dir = settings.question_generation.questions_output_dir.clone();
    let mut pipeline =
        DocumentQuestionPipeline::new(OllamaQuestionGenerator::new(client), settings.pipeline_config());

    match cli.file {
        Some(file) => {
            let summary = pipeline.generate_for_file(&file).await;
            match summary {
                Ok(summary) => {
                    println!("\n🎓 Question generation complete!");
                    println!("  Chunks: {} ({} failed)", summary.chunks, summary.failed_chunks);
                    println!("  Questions: {}", summary.questions);
                    println!("  Saved to: {}", summary.output_path.display());
                }
                Err(e) => println!("\n❌ {}", e),
            }
        }
        None => {
            let input_dir = &settings.question_generation.text_input_dir;
            let stats = pipeline.process_directory(input_dir).await;

            println!("\n🎓 Question generation complete!");
            println!("{}", stats);
            println!("  Questions saved to: {}/", output_dir.display());
        }
    }

    println!("\n🔢 Token usage:");
    println!("{}", pipeline.usage());

    println!("\nExecution time: {:.2} seconds", timer.elapsed().as_secs_f64());

    Ok(())
}
