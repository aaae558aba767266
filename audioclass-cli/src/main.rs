//! `audioclass`: classify WAV files from the command line.

mod settings;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use audioclass_core::calculator::{
    BatchFileCalculator, CalculatorOptions, ClassifierLoader, SidePackets, AUDIO_PATH, MODEL_PATH,
};
use audioclass_core::inference::stub::StubClassifier;
use audioclass_core::{
    AudioSource, ClassificationRun, ClassifierHandle, ClassifyMode, Delegate, Orchestrator,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};

use settings::{default_settings_path, load_settings, save_settings, CliSettings};

#[derive(Parser, Debug)]
#[command(name = "audioclass")]
#[command(about = "Classify audio events in 16-bit PCM WAV files", version)]
struct Cli {
    /// Settings file (default: per-user config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify one WAV file
    Classify(ClassifyArgs),
    /// Print the effective settings, optionally writing them back
    Settings {
        /// Write the normalized settings to the settings file
        #[arg(long)]
        write: bool,
    },
}

#[derive(clap::Args, Debug)]
struct ClassifyArgs {
    /// 16-bit PCM WAV file
    audio: PathBuf,

    /// ONNX model file
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Label map (`class_map.csv` or one label per line)
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Keep at most this many categories per window
    #[arg(long)]
    max_results: Option<usize>,

    /// Drop categories scoring below this value
    #[arg(long)]
    score_threshold: Option<f32>,

    /// Classify only the first window, or every window
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Build the classifier on the accelerator delegate
    #[arg(long)]
    accelerator: bool,

    /// Use the energy-based stub classifier instead of a model
    #[arg(long)]
    stub: bool,

    /// Stop after this many windows
    #[arg(long)]
    max_windows: Option<usize>,

    /// Print a JSON run report
    #[arg(long)]
    json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Single,
    Stream,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "audioclass=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let settings_path = cli.settings.clone().unwrap_or_else(default_settings_path);
    let settings = load_settings(&settings_path);
    debug!(path = %settings_path.display(), ?settings, "settings loaded");

    match cli.command {
        Command::Classify(args) => classify(args, settings),
        Command::Settings { write } => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            if write {
                save_settings(&settings_path, &settings)
                    .with_context(|| format!("writing {}", settings_path.display()))?;
                info!(path = %settings_path.display(), "settings saved");
            }
            Ok(())
        }
    }
}

fn classify(args: ClassifyArgs, mut settings: CliSettings) -> Result<()> {
    if let Some(mode) = args.mode {
        settings.mode = match mode {
            ModeArg::Single => "single".into(),
            ModeArg::Stream => "stream".into(),
        };
    }
    if args.accelerator {
        settings.delegate = "accelerator".into();
    }
    if let Some(model) = &args.model {
        settings.model_path = Some(model.to_string_lossy().into_owned());
    }
    if args.max_windows.is_some() {
        settings.max_windows = args.max_windows;
    }
    if let Some(labels) = &args.labels {
        settings.labels_path = Some(labels.to_string_lossy().into_owned());
    }
    if args.max_results.is_some() {
        settings.max_results = args.max_results;
    }
    if args.score_threshold.is_some() {
        settings.score_threshold = args.score_threshold;
    }
    settings.normalize();

    let loader = build_loader(&settings, args.stub)?;
    let model_path = settings
        .model_path
        .clone()
        .unwrap_or_else(|| "stub".into());
    let options = CalculatorOptions {
        delegate: settings.delegate(),
        orchestrator: settings.orchestrator_config(),
        ..CalculatorOptions::default()
    };

    let run = match settings.classify_mode() {
        ClassifyMode::FullStream => {
            let side = SidePackets::new()
                .with(MODEL_PATH, model_path)
                .with(AUDIO_PATH, args.audio.to_string_lossy());
            BatchFileCalculator::open(&side, &*loader, options)?.run()?
        }
        ClassifyMode::SingleShot => {
            let handle = loader.load(Path::new(&model_path), options.delegate)?;
            Orchestrator::new(options.orchestrator)
                .classify_single(&handle, &AudioSource::File(args.audio.clone()))?
        }
    };

    print_run(&run, args.json)
}

fn build_loader(settings: &CliSettings, stub: bool) -> Result<Box<dyn ClassifierLoader>> {
    if stub {
        let window = settings.stub_window_length;
        let threshold = settings.stub_threshold;
        return Ok(Box::new(
            move |_: &Path, delegate: Delegate| -> audioclass_core::Result<ClassifierHandle> {
                Ok(ClassifierHandle::new(
                    StubClassifier::new(window)
                        .with_threshold(threshold)
                        .with_delegate(delegate),
                ))
            },
        ));
    }
    if settings.model_path.is_none() {
        bail!("no model given; pass --model <file> or --stub");
    }
    onnx_loader(settings)
}

#[cfg(feature = "onnx")]
fn onnx_loader(settings: &CliSettings) -> Result<Box<dyn ClassifierLoader>> {
    use audioclass_core::calculator::OnnxLoader;
    use audioclass_core::OnnxClassifierConfig;

    let mut template = OnnxClassifierConfig::new(PathBuf::new());
    template.labels_path = settings.labels_path.as_ref().map(PathBuf::from);
    template.scoring = settings.score_options();
    Ok(Box::new(OnnxLoader::new(template)))
}

#[cfg(not(feature = "onnx"))]
fn onnx_loader(settings: &CliSettings) -> Result<Box<dyn ClassifierLoader>> {
    if settings.labels_path.is_some() || settings.score_options() != Default::default() {
        debug!("label and scoring options only apply to ONNX models");
    }
    bail!("built without the `onnx` feature; rebuild with --features onnx or pass --stub")
}

fn print_run(run: &ClassificationRun, json: bool) -> Result<()> {
    let report = run.report();
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    for w in &report.windows {
        println!(
            "{:>4}  {:>8.3}s  {:<24} {:.3}",
            w.index, w.start_secs, w.label, w.score
        );
    }
    if run.is_truncated() {
        println!(
            "({} of {} windows classified)",
            run.len(),
            run.windows_total
        );
    }
    info!(
        delegate = %report.delegate,
        elapsed_ms = report.elapsed_ms,
        windows = report.windows.len(),
        "done"
    );
    Ok(())
}
