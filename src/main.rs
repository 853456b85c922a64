//! textbite - split document pages into bites and evaluate the result.
//!
//! Usage:
//!   textbite evaluate -s HYP -g GT [--single-page]   Score hypotheses against ground truth
//!   textbite train-graph --train-data BUNDLE          Train the edge affinity model
//!   textbite infer --model W --data BUNDLE --output D Write one hypothesis file per page
//!   textbite finetune-lm --data D --model D --save D  Fine-tune the pair classifier

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;

use textbite::config::{ConfigError, require_dir_or_absent};
use textbite::finetune::{
    FinetuneConfig, FinetuneEvent, PairClassifier, PairEncoder, PairTrainer, read_pair_files,
    read_pairs,
};
use textbite::graph::GraphBundle;
use textbite::model::{
    DevicePreference, EdgeAffinityModel, GraphModelConfig, infer_page, select_device,
};
use textbite::scoring::{format_v_scores, score_corpus_with, score_page_files, write_page};
use textbite::training::{
    GraphTrainConfig, GraphTrainer, OptimizerKind, TrainingEvent, load_graph_data,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "textbite", version, about = "Split document pages into bites")]
struct Cli {
    /// Logging level; `RUST_LOG` is used when this is not given.
    #[arg(long, global = true, value_enum, ignore_case = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
#[value(rename_all = "UPPER")]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Score hypothesis clusterings against ground truth
    Evaluate {
        /// Hypothesis file, or directory of per-page files
        #[arg(short = 's', long = "hypothesis")]
        hypothesis: PathBuf,
        /// Ground-truth file, or directory of per-page files
        #[arg(short = 'g', long = "ground-truth")]
        ground_truth: PathBuf,
        /// Compare two single files instead of two directories
        #[arg(long)]
        single_page: bool,
    },
    /// Train the edge affinity model on a graph bundle
    TrainGraph(TrainGraphArgs),
    /// Cluster every page of a bundle and write one hypothesis file per page
    Infer {
        /// Weights saved by `train-graph`
        #[arg(long)]
        model: PathBuf,
        /// Graph bundle to cluster
        #[arg(long)]
        data: PathBuf,
        /// Output directory for `<page>.json` files
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value = "auto")]
        device: DevicePreference,
    },
    /// Fine-tune the pair classifier on JSON-lines pair data
    FinetuneLm(FinetuneArgs),
}

#[derive(clap::Args)]
struct TrainGraphArgs {
    /// Graph bundle with training pages
    #[arg(long)]
    train_data: Option<PathBuf>,
    /// Graph bundle with validation pages; the training bundle is split otherwise
    #[arg(long)]
    val_data: Option<PathBuf>,
    /// Train/validation ratio when splitting
    #[arg(short = 'r', long)]
    train_ratio: Option<f32>,

    #[arg(long)]
    input_size: Option<usize>,
    #[arg(long)]
    output_size: Option<usize>,
    /// Number of message-passing layers
    #[arg(short = 'l', long)]
    nb_hidden: Option<usize>,
    /// Width of the message-passing layers
    #[arg(short = 'n', long)]
    hidden_width: Option<usize>,
    /// Dropout probability
    #[arg(short = 'd', long)]
    dropout: Option<f32>,

    #[arg(short = 'e', long)]
    epochs: Option<usize>,
    #[arg(long)]
    lr: Option<f64>,
    /// adam or sgd
    #[arg(long)]
    optimizer: Option<OptimizerKind>,
    /// Pages per optimizer step
    #[arg(long)]
    grad_accumulation: Option<usize>,
    /// Pages between two progress reports
    #[arg(long)]
    report_every: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,

    /// Where to save the model best by validation accuracy
    #[arg(long)]
    save: Option<PathBuf>,
    /// Where to put all training checkpoints
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,
    #[arg(long, default_value = "auto")]
    device: DevicePreference,
}

#[derive(clap::Args)]
struct FinetuneArgs {
    /// Directory with train*.jsonl and val.jsonl
    #[arg(long)]
    data: Option<PathBuf>,
    /// Pretrained encoder directory (config.json, model.safetensors)
    #[arg(long)]
    model: Option<PathBuf>,
    /// tokenizer.json; defaults to the one in the model directory
    #[arg(long)]
    tokenizer: Option<PathBuf>,
    /// Directory where the best model is written
    #[arg(long)]
    save: Option<PathBuf>,

    #[arg(short = 'e', long)]
    epochs: Option<usize>,
    #[arg(long)]
    lr: Option<f64>,
    #[arg(long)]
    batch_size: Option<usize>,
    /// Training batches between two validation passes
    #[arg(long)]
    eval_every: Option<usize>,
    #[arg(long)]
    max_seq_len: Option<usize>,
    #[arg(long)]
    max_grad_norm: Option<f64>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value = "auto")]
    device: DevicePreference,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    match cli.command {
        Commands::Evaluate {
            hypothesis,
            ground_truth,
            single_page,
        } => run_evaluate(&hypothesis, &ground_truth, single_page),
        Commands::TrainGraph(args) => run_train_graph(args),
        Commands::Infer {
            model,
            data,
            output,
            device,
        } => run_infer(&model, &data, &output, device),
        Commands::FinetuneLm(args) => run_finetune(args),
    }
}

fn init_tracing(level: Option<LogLevel>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level.directive()),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(LogLevel::Warn.directive())),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_evaluate(hypothesis: &Path, ground_truth: &Path, single_page: bool) -> Result<()> {
    if single_page {
        let scores = score_page_files(hypothesis, ground_truth)?;
        println!("{}", format_v_scores(&scores));
        return Ok(());
    }

    let report = score_corpus_with(hypothesis, ground_truth, |page| {
        println!("{} {}", page.name, format_v_scores(&page.scores));
    })?;

    println!(
        "Average over {} pages: {}",
        report.nb_found(),
        format_v_scores(&report.average)
    );
    Ok(())
}

fn run_train_graph(args: TrainGraphArgs) -> Result<()> {
    let mut model_config = GraphModelConfig::from_env()?;
    if let Some(v) = args.input_size {
        model_config.input_size = v;
    }
    if let Some(v) = args.output_size {
        model_config.output_size = v;
    }
    if let Some(v) = args.nb_hidden {
        model_config.nb_hidden = v;
    }
    if let Some(v) = args.hidden_width {
        model_config.hidden_width = v;
    }
    if let Some(v) = args.dropout {
        model_config.dropout = v;
    }
    model_config.validate()?;

    let mut config = GraphTrainConfig::from_env()?;
    if args.train_data.is_some() {
        config.train_data = args.train_data;
    }
    if args.val_data.is_some() {
        config.val_data = args.val_data;
    }
    if let Some(v) = args.train_ratio {
        config.train_ratio = v;
    }
    if let Some(v) = args.epochs {
        config.epochs = v;
    }
    if let Some(v) = args.lr {
        config.lr = v;
    }
    if let Some(v) = args.optimizer {
        config.optimizer = v;
    }
    if let Some(v) = args.grad_accumulation {
        config.grad_accumulation = v;
    }
    if let Some(v) = args.report_every {
        config.report_every = v;
    }
    if let Some(v) = args.seed {
        config.seed = v;
    }
    if args.save.is_some() {
        config.save_path = args.save;
    }
    if args.checkpoint_dir.is_some() {
        config.checkpoint_dir = args.checkpoint_dir;
    }
    config.validate()?;

    let device = select_device(args.device)?;
    tracing::info!(device = ?device, "Training on selected device");

    let data = load_graph_data(&config)?;
    let model = EdgeAffinityModel::new(model_config, &device)?;
    let mut trainer = GraphTrainer::new(model, config)?;

    tracing::info!("Starting training ...");
    let start = Instant::now();
    let summary = trainer.train_with(&data.train, &data.val, |event| match event {
        TrainingEvent::Validation { report, .. } => {
            println!("{}", report.loss_line());
            println!("{}", report.accuracy_line());
        }
        TrainingEvent::Window { report, .. } => println!("{}", report.summary()),
        TrainingEvent::BestSaved { path, accuracy, .. } => {
            println!("Saving model at accuracy {accuracy:.3} to {}", path.display());
        }
        TrainingEvent::CheckpointSaved { .. } => {}
    })?;

    tracing::info!(
        elapsed_s = start.elapsed().as_secs_f64(),
        best_accuracy = ?summary.best_accuracy,
        "Training finished"
    );
    Ok(())
}

fn run_infer(model: &Path, data: &Path, output: &Path, device: DevicePreference) -> Result<()> {
    require_dir_or_absent(output)?;
    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))?;

    let device = select_device(device)?;
    let model = EdgeAffinityModel::load(model, &device)?;
    let bundle = GraphBundle::load(data)?;

    for page in &bundle.pages {
        let bites = infer_page(&model, page)
            .with_context(|| format!("Failed to cluster page '{}'", page.name))?;
        let path = output.join(format!("{}.json", page.name));
        write_page(&path, &bites)?;
        tracing::info!(page = %page.name, nb_bites = bites.len(), "Hypothesis written");
    }

    println!("Wrote {} pages to {}", bundle.len(), output.display());
    Ok(())
}

fn run_finetune(args: FinetuneArgs) -> Result<()> {
    let mut config = FinetuneConfig::from_env()?;
    if args.data.is_some() {
        config.data_dir = args.data;
    }
    if args.model.is_some() {
        config.model_dir = args.model;
    }
    if args.tokenizer.is_some() {
        config.tokenizer_path = args.tokenizer;
    }
    if args.save.is_some() {
        config.save_dir = args.save;
    }
    if let Some(v) = args.epochs {
        config.epochs = v;
    }
    if let Some(v) = args.lr {
        config.lr = v;
    }
    if let Some(v) = args.batch_size {
        config.batch_size = v;
    }
    if let Some(v) = args.eval_every {
        config.eval_every = v;
    }
    if let Some(v) = args.max_seq_len {
        config.max_seq_len = v;
    }
    if let Some(v) = args.max_grad_norm {
        config.max_grad_norm = v;
    }
    if let Some(v) = args.seed {
        config.seed = v;
    }
    config.validate()?;
    config.discover_data_files()?;

    let Some(model_dir) = config.model_dir.clone() else {
        return Err(ConfigError::MissingValue { name: "model_dir" }.into());
    };
    if config.save_dir.is_none() {
        return Err(ConfigError::MissingValue { name: "save_dir" }.into());
    }

    let device = select_device(args.device)?;
    tracing::info!(device = ?device, "Fine-tuning on selected device");

    tracing::info!("Loading data ...");
    let train = read_pair_files(&config.train_files)?;
    let val = match &config.val_file {
        Some(path) => read_pairs(path)?,
        None => Vec::new(),
    };
    tracing::info!(nb_train = train.len(), nb_val = val.len(), "Data loaded");

    let encoder = PairEncoder::from_file(&config.resolved_tokenizer_path()?, config.max_seq_len)?;
    let model = PairClassifier::load_pretrained(&model_dir, &device)?;
    let mut trainer = PairTrainer::new(model, config)?;

    tracing::info!("Starting training ...");
    let start = Instant::now();
    let summary = trainer.train_with(&train, &val, &encoder, |event| match event {
        FinetuneEvent::TrainReport { report, .. } => {
            println!("TRAIN REPORT:");
            println!("{report}");
        }
        FinetuneEvent::Validation { evaluation, .. } => {
            println!("EVALUATION REPORT:");
            println!("Val loss: {:.4}", evaluation.avg_loss);
            println!("{}", evaluation.report);
        }
        FinetuneEvent::BestSaved { f1, .. } => {
            println!("Found new best model at F1 = {f1:.4}, SAVING");
        }
    })?;

    tracing::info!(
        elapsed_s = start.elapsed().as_secs_f64(),
        best_f1 = summary.best_f1,
        "Training finished"
    );
    Ok(())
}
