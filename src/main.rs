use std::fmt::{self, Display};
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use parsgd::files::{self, read_ascii_file, read_binary_file, read_svmlight_file};
use parsgd::metrics::{accuracy, inf_norm, l2_norm};
use parsgd::{
    BatchGd, Classifier, Dataset, GdConfig, LinearModel, Loss, Model, ParSgd, SgdConfig,
};

/// Largest dimension for which the full weight vector is printed.
const MAX_PRINTED_DIM: usize = 100;

#[derive(Parser, Debug)]
#[command(about = "Train a regularized linear classifier with parallel SGD")]
struct Cli {
    /// Packed binary training file
    #[arg(long)]
    binary_training_file: Option<PathBuf>,

    /// Packed binary testing file
    #[arg(long)]
    binary_testing_file: Option<PathBuf>,

    /// Whitespace-separated ASCII training file
    #[arg(long)]
    ascii_training_file: Option<PathBuf>,

    /// Whitespace-separated ASCII testing file
    #[arg(long)]
    ascii_testing_file: Option<PathBuf>,

    /// SVMlight-like sparse-index training file
    #[arg(long)]
    svmlight_training_file: Option<PathBuf>,

    /// SVMlight-like sparse-index testing file
    #[arg(long)]
    svmlight_testing_file: Option<PathBuf>,

    /// Regularization strength, must be > 0
    #[arg(long, default_value_t = 1e-5)]
    lambda: f64,

    /// Training epochs
    #[arg(long, default_value_t = 1)]
    rounds: u64,

    /// Offset added to the SGD step index
    #[arg(long, default_value_t = 0)]
    offset: u64,

    /// SGD worker threads
    #[arg(long, default_value_t = 1)]
    threads: usize,

    #[arg(long, value_enum, default_value = "hinge")]
    loss: LossArg,

    #[arg(long, value_enum, default_value = "sgd-nolock")]
    clf: ClfArg,

    /// PRNG seed; drawn from the OS when absent
    #[arg(long)]
    seed: Option<u64>,

    /// Retain a weight snapshot at every epoch barrier
    #[arg(long)]
    keep_histories: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum LossArg {
    Hinge,
    Square,
    Ramp,
    Logistic,
}

impl From<LossArg> for Loss {
    fn from(arg: LossArg) -> Self {
        match arg {
            LossArg::Hinge => Loss::Hinge,
            LossArg::Square => Loss::Square,
            LossArg::Ramp => Loss::Ramp,
            LossArg::Logistic => Loss::Logistic,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ClfArg {
    Gd,
    SgdNolock,
    SgdLock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Binary,
    Ascii,
    Svmlight,
}

#[derive(Debug)]
enum CliError {
    Config(String),
    Data(files::DataError),
}

impl Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "invalid configuration: {msg}"),
            CliError::Data(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Data(e) => Some(e),
            _ => None,
        }
    }
}

impl From<files::DataError> for CliError {
    fn from(e: files::DataError) -> Self {
        CliError::Data(e)
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if cli.lambda <= 0.0 {
        return Err(CliError::Config("need lambda > 0".into()));
    }
    if cli.rounds < 1 {
        return Err(CliError::Config("need rounds >= 1".into()));
    }
    if cli.threads < 1 {
        return Err(CliError::Config("need threads >= 1".into()));
    }

    let (format, train_path) = pick_file(
        "training",
        &cli.binary_training_file,
        &cli.ascii_training_file,
        &cli.svmlight_training_file,
    )?;
    let (test_format, test_path) = pick_file(
        "testing",
        &cli.binary_testing_file,
        &cli.ascii_testing_file,
        &cli.svmlight_testing_file,
    )?;
    if format != test_format {
        return Err(CliError::Config(
            "training and testing files must use the same format".into(),
        ));
    }

    let watch = Instant::now();
    let training = load(format, &train_path)?;
    info!(
        "loaded training set n={} d={} in {:.1} ms",
        training.len(),
        training.dim(),
        watch.elapsed().as_secs_f64() * 1e3
    );

    let watch = Instant::now();
    let testing = load(format, &test_path)?;
    info!(
        "loaded testing set n={} in {:.1} ms",
        testing.len(),
        watch.elapsed().as_secs_f64() * 1e3
    );
    info!("training max norm: {}", training.max_x_norm());

    let seed = cli.seed.unwrap_or_else(rand::random);
    info!("seed: {seed}");
    let rng = StdRng::seed_from_u64(seed);

    let model = LinearModel::new(cli.lambda, cli.loss.into());
    info!(
        "lambda={}, rounds={}, offset={}, threads={}",
        cli.lambda, cli.rounds, cli.offset, cli.threads
    );

    match cli.clf {
        ClfArg::Gd => {
            let clf = BatchGd::new(
                model,
                GdConfig {
                    nrounds: cli.rounds,
                    t_offset: cli.offset,
                    c0: 1.0,
                },
            );
            train_and_report(clf, &training, &testing, cli.keep_histories);
        }
        ClfArg::SgdNolock | ClfArg::SgdLock => {
            let clf = ParSgd::new(
                model,
                SgdConfig {
                    nrounds: cli.rounds,
                    nworkers: cli.threads,
                    locking: cli.clf == ClfArg::SgdLock,
                    t_offset: cli.offset,
                    c0: 1.0,
                },
                rng,
            );
            train_and_report(clf, &training, &testing, cli.keep_histories);
        }
    }

    Ok(())
}

fn pick_file(
    role: &str,
    binary: &Option<PathBuf>,
    ascii: &Option<PathBuf>,
    svmlight: &Option<PathBuf>,
) -> Result<(Format, PathBuf), CliError> {
    let mut candidates = Vec::new();
    if let Some(p) = binary {
        candidates.push((Format::Binary, p.clone()));
    }
    if let Some(p) = ascii {
        candidates.push((Format::Ascii, p.clone()));
    }
    if let Some(p) = svmlight {
        candidates.push((Format::Svmlight, p.clone()));
    }
    match candidates.len() {
        1 => Ok(candidates.pop().expect("one candidate present")),
        0 => Err(CliError::Config(format!(
            "need exactly one {role} file (binary, ascii, or svmlight)"
        ))),
        _ => Err(CliError::Config(format!(
            "conflicting {role} files: pass exactly one format"
        ))),
    }
}

fn load(format: Format, path: &PathBuf) -> Result<Dataset, CliError> {
    let d = match format {
        Format::Binary => read_binary_file(path)?,
        Format::Ascii => read_ascii_file(path)?,
        Format::Svmlight => read_svmlight_file(path)?,
    };
    Ok(d)
}

fn train_and_report<C: Classifier>(
    mut clf: C,
    training: &Dataset,
    testing: &Dataset,
    keep_histories: bool,
) {
    let watch = Instant::now();
    clf.fit(training, keep_histories);
    info!(
        "training took {:.1} ms",
        watch.elapsed().as_secs_f64() * 1e3
    );
    if keep_histories {
        info!("kept {} history entries", clf.history().len());
    }

    let model = clf.model();
    let train_pred = model.predict(training);
    let test_pred = model.predict(testing);

    let w = model.weights();
    if w.len() <= MAX_PRINTED_DIM {
        println!("w: {w:?}");
    }
    println!("norm(w): {}", l2_norm(w));
    println!("infnorm(w): {}", inf_norm(w));
    println!("empirical risk: {}", model.empirical_risk(training));
    println!("norm gradient: {}", model.norm_grad_empirical_risk(training));
    println!("classifier: {}", clf.config());
    println!("acc on train: {}", accuracy(training.labels(), &train_pred));
    println!("acc on test: {}", accuracy(testing.labels(), &test_pred));
}
