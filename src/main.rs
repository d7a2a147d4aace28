//! Retrain a classifier from an exported dataset and write the model artifact.

use std::path::PathBuf;

use searchlab::config::{self, SessionConfig};
use searchlab::dataset::{Label, load_dataset};
use searchlab::logging;
use searchlab::ml::{Algorithm, RetrainOutcome};
use searchlab::session::Session;

fn main() {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let mut session_config = match &options.config {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    apply_overrides(&mut session_config, &options);

    let examples = load_dataset(&options.dataset).map_err(|err| err.to_string())?;
    if examples.is_empty() {
        return Err(format!("Dataset is empty: {}", options.dataset.display()));
    }
    let mut session = Session::new(session_config);
    let restored = session.restore_examples(examples);
    if let Some(words) = &options.words {
        session.register_words(words);
    }
    println!(
        "loaded {restored} examples, vocabulary {} words",
        session.encoder().vocabulary().len()
    );
    for (label, count) in session.dataset().class_count() {
        println!("  {:<11} {count}", label_name(label));
    }

    let outcome = session.retrain();
    let snapshot = outcome.snapshot();
    println!(
        "{}: accuracy={:.4} precision={:.4} recall={:.4} f1={:.4} (train {}, test {})",
        snapshot.algorithm,
        snapshot.accuracy,
        snapshot.precision,
        snapshot.recall,
        snapshot.f1,
        snapshot.train_size,
        snapshot.test_size
    );
    if let RetrainOutcome::Skipped { reason, .. } = &outcome {
        return Err(format!("Retrain skipped: {reason}"));
    }

    let model_path = session.export_model().map_err(|err| err.to_string())?;
    let history_path = session.export_history().map_err(|err| err.to_string())?;
    println!("model written to {}", model_path.display());
    println!("history written to {}", history_path.display());
    Ok(())
}

fn label_name(label: Label) -> &'static str {
    match label {
        Label::Irrelevant => "irrelevant",
        Label::Relevant => "relevant",
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CliOptions {
    dataset: PathBuf,
    algorithm: Option<Algorithm>,
    out_dir: Option<PathBuf>,
    words: Option<String>,
    config: Option<PathBuf>,
}

fn apply_overrides(session_config: &mut SessionConfig, options: &CliOptions) {
    if let Some(algorithm) = options.algorithm {
        session_config.training.algorithm = algorithm;
    }
    if let Some(out_dir) = &options.out_dir {
        session_config.export.out_dir = out_dir.clone();
    }
    session_config.export.auto_export = false;
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut dataset: Option<PathBuf> = None;
    let mut algorithm = None;
    let mut out_dir = None;
    let mut words = None;
    let mut config = None;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--dataset" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--dataset requires a value".to_string())?;
                dataset = Some(PathBuf::from(value));
            }
            "--algorithm" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--algorithm requires a value".to_string())?;
                algorithm = Some(value.parse::<Algorithm>().map_err(|err| err.to_string())?);
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                out_dir = Some(PathBuf::from(value));
            }
            "--words" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--words requires a value".to_string())?;
                words = Some(value.clone());
            }
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                config = Some(PathBuf::from(value));
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let dataset = dataset.ok_or_else(help_text)?;
    Ok(CliOptions {
        dataset,
        algorithm,
        out_dir,
        words,
        config,
    })
}

fn help_text() -> String {
    [
        "searchlab",
        "",
        "Retrains a search-result classifier from an exported dataset and writes model.bin.",
        "",
        "Usage:",
        "  searchlab --dataset <search_dataset.csv> [options]",
        "",
        "Options:",
        "  --dataset <file>     Dataset CSV written by a labeling session (required).",
        "  --algorithm <tag>    random_forest, gbdt_stump or logreg (default: from config).",
        "  --out <dir>          Output directory for model.bin and score_history.json.",
        "  --words <a~b>        Vocabulary words to register before training.",
        "  --config <file>      Config TOML (default: config.toml in the app directory).",
    ]
    .join("\n")
}
