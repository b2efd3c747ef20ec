//! Command-line interface for leaf disease diagnosis

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use burn::module::Module;
use burn::record::CompactRecorder;
use clap::{Parser, Subcommand};
use colored::Colorize;

use leafsight::utils::{init_logging, LogConfig};
use leafsight::{
    backend_name, default_device, DefaultBackend, DiagnosisPipeline, LeafClassifier,
    LeafClassifierConfig, ModelRegistry, SeverityConfig, TaxonomyTable, WeightMap,
};

#[derive(Parser)]
#[command(name = "leafsight")]
#[command(version)]
#[command(about = "Plant leaf disease diagnosis with saliency explanations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Diagnose a leaf image and print the prediction record
    Infer {
        /// Path to the image file
        #[arg(short, long)]
        image: String,

        /// Path to the model checkpoint (.mpk or .json weight map)
        #[arg(short, long, default_value = "models/leaf_classifier.mpk")]
        checkpoint: String,

        /// Path to the class taxonomy JSON
        #[arg(long, default_value = "models/classes.json")]
        classes: String,

        /// Directory for rendered saliency overlays
        #[arg(short, long, default_value = "static/saliency")]
        output_dir: String,

        /// Grayscale brightness below which a pixel counts as leaf
        #[arg(long, default_value = "0.95")]
        brightness_threshold: f32,

        /// Saliency activation above which a leaf pixel counts as diseased
        #[arg(long, default_value = "0.25")]
        activation_threshold: f32,

        /// Print the prediction record as JSON only
        #[arg(long)]
        json: bool,
    },

    /// Export a checkpoint as a named JSON weight map
    ExportWeights {
        /// Path to a CompactRecorder checkpoint (initial weights when omitted)
        #[arg(short, long)]
        checkpoint: Option<String>,

        /// Output path for the weight map
        #[arg(short, long, default_value = "weights.json")]
        output: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let quiet = matches!(&cli.command, Commands::Infer { json: true, .. });

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else if quiet {
        LogConfig::quiet()
    } else {
        LogConfig::default()
    };
    let _ = init_logging(&log_config);

    if !quiet {
        print_banner();
    }

    match cli.command {
        Commands::Infer {
            image,
            checkpoint,
            classes,
            output_dir,
            brightness_threshold,
            activation_threshold,
            json,
        } => cmd_infer(
            &image,
            &checkpoint,
            &classes,
            &output_dir,
            brightness_threshold,
            activation_threshold,
            json,
        )?,
        Commands::ExportWeights { checkpoint, output } => {
            cmd_export_weights(checkpoint.as_deref(), &output)?
        }
    }

    Ok(())
}

fn print_banner() {
    println!();
    println!(
        "{}",
        "╔══════════════════════════════════════════════╗".green()
    );
    println!(
        "{}",
        "║   🌿 Leafsight - Leaf Disease Diagnosis      ║".green()
    );
    println!(
        "{}",
        "║   Classification + Saliency + Severity      ║".green()
    );
    println!(
        "{}",
        "╚══════════════════════════════════════════════╝".green()
    );
    println!();
}

fn cmd_infer(
    image: &str,
    checkpoint: &str,
    classes: &str,
    output_dir: &str,
    brightness_threshold: f32,
    activation_threshold: f32,
    json: bool,
) -> Result<()> {
    if !Path::new(image).exists() {
        println!("{} Image not found: {}", "Error:".red(), image);
        return Ok(());
    }
    if !Path::new(classes).exists() {
        println!("{} Class taxonomy not found: {}", "Error:".red(), classes);
        return Ok(());
    }

    let taxonomy = TaxonomyTable::from_json_file(Path::new(classes))?;

    let mut checkpoints = HashMap::new();
    checkpoints.insert("base".to_string(), PathBuf::from(checkpoint));
    let registry = ModelRegistry::load(&checkpoints);
    let handle = registry
        .handle("base")
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("model 'base' missing from registry"))?;

    if !json {
        println!("🌿 Backend: {}", backend_name());
        println!("🧠 Weights: {}", handle.source());
        println!("🔍 Analyzing: {}", image.cyan());
        println!();
    }

    let severity_config = SeverityConfig {
        brightness_threshold,
        activation_threshold,
    };
    let pipeline =
        DiagnosisPipeline::new(handle, output_dir).with_severity_config(severity_config);

    let record = pipeline.predict(Path::new(image), &taxonomy);

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    if record.is_sentinel() {
        println!(
            "{} Prediction failed, see the log output for details",
            "Error:".red()
        );
        return Ok(());
    }

    println!("{}", "Diagnosis".bold());
    println!("   Leaf:       {}", record.leaf.green());
    println!("   Disease:    {}", record.disease.yellow());
    println!("   Confidence: {:.2}%", record.confidence);
    println!("   Severity:   {:.2}%", record.severity);
    println!("   Overlay:    {}", record.saliency_path.cyan());

    Ok(())
}

fn cmd_export_weights(checkpoint: Option<&str>, output: &str) -> Result<()> {
    let device = default_device();
    let mut model =
        LeafClassifier::<DefaultBackend>::new(&LeafClassifierConfig::new(), &device);

    if let Some(path) = checkpoint {
        if !Path::new(path).exists() {
            println!("{} Checkpoint not found: {}", "Error:".red(), path);
            return Ok(());
        }
        model = model
            .load_file(path, &CompactRecorder::new(), &device)
            .map_err(|e| anyhow::anyhow!("Failed to load checkpoint: {:?}", e))?;
        println!("📦 Loaded checkpoint: {}", path.cyan());
    } else {
        println!("📦 Exporting initial weights");
    }

    let map = WeightMap::from_model(&model)?;
    map.to_file(Path::new(output))?;

    println!("✅ Wrote {} tensors to {}", map.len(), output.green());
    Ok(())
}
