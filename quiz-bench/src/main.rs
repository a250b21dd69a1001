//! Quiz Benchmark CLI

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use grader::{SemanticJudge, SimilarityJudge};
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

use quiz_bench::{
    analysis::{aggregate, SuiteReport, Verdict},
    config::Config,
    providers::{create_provider, ProviderError},
    reporting::{
        append_record, append_transcript, print_history, print_rankings, print_suite_report,
        read_records, RunRecord,
    },
    runner::{grade_answer, judge_for_question, ConsoleProgress, Executor, ExecutorConfig},
    tasks::{list_suites, load_suite_from_file, suite_path},
};

#[derive(Parser)]
#[command(name = "quiz-bench")]
#[command(about = "Question/answer benchmark for LLMs with structural answer grading")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run test suites against models
    Run {
        /// Comma-separated model ids (default: `benchmark.models` from config)
        #[arg(short, long)]
        models: Option<String>,

        /// Comma-separated test names (default: config, then every test in the directory)
        #[arg(short, long)]
        tests: Option<String>,

        /// Directory holding the test files
        #[arg(long)]
        tests_dir: Option<PathBuf>,

        /// Questions of one test in flight at once
        #[arg(long)]
        parallel: Option<usize>,

        /// Output directory for transcripts and the ledger
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List available tests
    ListTests {
        /// Directory holding the test files
        #[arg(long)]
        tests_dir: Option<PathBuf>,
    },

    /// Grade a single answer against a question's reference, without running a model
    Grade {
        /// Test name
        #[arg(short, long)]
        test: String,

        /// 1-based question number
        #[arg(short, long)]
        question: usize,

        /// Answer to grade
        #[arg(short, long)]
        answer: String,

        /// Judge model when the semantic judge is enabled and none is configured
        #[arg(long)]
        judge_model: Option<String>,

        /// Directory holding the test files
        #[arg(long)]
        tests_dir: Option<PathBuf>,
    },

    /// Generate default configuration file
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "config/quiz-bench.toml")]
        output: PathBuf,
    },

    /// Show previous runs recorded in the ledger
    History {
        /// Ledger file (default: `output_dir/ledger_file` from config)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Only show runs of this model
        #[arg(short, long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("quiz_bench=debug,grader=debug,info")
    } else {
        EnvFilter::new("quiz_bench=info,grader=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_or_default(),
    };

    match cli.command {
        Commands::Run {
            models,
            tests,
            tests_dir,
            parallel,
            output,
        } => {
            run_benchmark(config, models, tests, tests_dir, parallel, output).await?;
        }

        Commands::ListTests { tests_dir } => {
            list_tests(&config, tests_dir)?;
        }

        Commands::Grade {
            test,
            question,
            answer,
            judge_model,
            tests_dir,
        } => {
            grade(&config, tests_dir, &test, question, answer, judge_model).await?;
        }

        Commands::InitConfig { output } => {
            init_config(output)?;
        }

        Commands::History { input, model } => {
            history(&config, input, model)?;
        }
    }

    Ok(())
}

fn split_list(arg: &str) -> Vec<String> {
    arg.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn resolve_tests_dir(config: &Config, tests_dir: Option<PathBuf>) -> PathBuf {
    tests_dir.unwrap_or_else(|| PathBuf::from(&config.benchmark.tests_dir))
}

async fn run_benchmark(
    mut config: Config,
    models_arg: Option<String>,
    tests_arg: Option<String>,
    tests_dir: Option<PathBuf>,
    parallel: Option<usize>,
    output_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(models) = models_arg {
        config.benchmark.models = split_list(&models);
    }
    if let Some(tests) = tests_arg {
        config.benchmark.tests = split_list(&tests);
    }
    if let Some(parallel) = parallel {
        config.benchmark.parallel_requests = parallel;
    }

    let tests_dir = resolve_tests_dir(&config, tests_dir);
    let tests = if config.benchmark.tests.is_empty() {
        list_suites(&tests_dir)?
    } else {
        config.benchmark.tests.clone()
    };

    if config.benchmark.models.is_empty() {
        eprintln!("Error: No models to run. Pass --models or set benchmark.models in the config.");
        std::process::exit(1);
    }
    if tests.is_empty() {
        eprintln!("Error: No tests found in {}", tests_dir.display());
        std::process::exit(1);
    }

    let output_dir = output_dir.unwrap_or_else(|| PathBuf::from(&config.output.output_dir));
    let ledger_path = output_dir.join(&config.output.ledger_file);

    println!("=== Quiz Benchmark ===");
    println!("Provider: {}", config.provider.name);
    println!("Models:   {}", config.benchmark.models.join(", "));
    println!("Tests:    {}", tests.join(", "));
    println!("Parallel: {}", config.benchmark.parallel_requests.max(1));
    if config.judge.enabled {
        println!(
            "Judge:    {}",
            config.judge.model.as_deref().unwrap_or("(model under test)")
        );
    }
    println!();

    let provider = create_provider(&config)?;
    let executor = Executor::new(provider, ExecutorConfig::from(&config.benchmark))
        .with_generation(config.generation.clone())
        .with_judge(config.judge.clone())
        .with_progress(Arc::new(ConsoleProgress));

    let mut reports: Vec<SuiteReport> = Vec::new();

    'models: for model in &config.benchmark.models {
        println!("Model: {}", model);
        println!("{:-<50}", "");

        for test in &tests {
            let suite = match load_suite_from_file(suite_path(&tests_dir, test)) {
                Ok(suite) => suite,
                Err(e) => {
                    tracing::warn!("Skipping test '{}': {}", test, e);
                    continue;
                }
            };

            println!("Test '{}' ({} questions)", suite.name, suite.len());

            let report = match executor.run_suite(model, &suite).await {
                Ok(report) => report,
                Err(ProviderError::UnknownModel(id)) => {
                    tracing::warn!("Model '{}' is not available, skipping it", id);
                    continue 'models;
                }
                Err(e) => {
                    tracing::warn!("Test '{}' on '{}' failed: {}", test, model, e);
                    continue;
                }
            };

            if config.output.write_transcripts {
                match append_transcript(&output_dir, &report) {
                    Ok(path) => tracing::debug!("Transcript appended to {}", path.display()),
                    Err(e) => tracing::warn!("Failed to write transcript: {}", e),
                }
            }
            if let Err(e) = append_record(&ledger_path, &RunRecord::from(&report)) {
                tracing::warn!("Failed to append to {}: {}", ledger_path.display(), e);
            }

            print_suite_report(&report);
            println!();
            reports.push(report);
        }
    }

    if reports.is_empty() {
        eprintln!("Error: No test completed");
        std::process::exit(1);
    }

    print_rankings(&aggregate(&reports));
    println!("\nResults written to: {}", output_dir.display());

    Ok(())
}

fn list_tests(config: &Config, tests_dir: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let tests_dir = resolve_tests_dir(config, tests_dir);
    let names = list_suites(&tests_dir)?;

    println!("Available Tests ({}):", names.len());
    println!("{:-<60}", "");

    for name in &names {
        match load_suite_from_file(suite_path(&tests_dir, name)) {
            Ok(suite) => println!(
                "  {} | {} questions | {}",
                name,
                suite.len(),
                suite.description.lines().next().unwrap_or_default()
            ),
            Err(e) => println!("  {} | invalid: {}", name, e),
        }
    }

    Ok(())
}

async fn grade(
    config: &Config,
    tests_dir: Option<PathBuf>,
    test: &str,
    number: usize,
    answer: String,
    judge_model: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let tests_dir = resolve_tests_dir(config, tests_dir);
    let suite = load_suite_from_file(suite_path(&tests_dir, test))?;
    let question = suite
        .question(number)
        .cloned()
        .ok_or_else(|| format!("Test '{}' has no question {}", test, number))?;

    let judge: Arc<dyn SemanticJudge> = if config.judge.enabled {
        let provider = create_provider(config)?;
        let model = judge_model
            .or_else(|| config.judge.model.clone())
            .ok_or("The semantic judge is enabled but no judge model is set; pass --judge-model")?;
        judge_for_question(&config.judge, &provider, &model, &question.text, Handle::current())
    } else {
        Arc::new(SimilarityJudge::with_threshold(config.judge.fallback_threshold))
    };

    let settings = suite.settings;
    let reference = question.answer.clone();
    let candidate = answer.clone();
    // The model judge blocks on the runtime
    let correct = tokio::task::spawn_blocking(move || {
        grade_answer(&reference, &candidate, &settings, judge.as_ref())
    })
    .await?;

    let verdict = if correct { Verdict::Correct } else { Verdict::Incorrect };

    println!("Question {}:\n{}", question.number, question.text);
    println!("{:-<50}", "");
    println!("Answer:\n{}", answer);
    println!("Reference answer:\n{}", question.answer);
    println!("{:-<50}", "");
    println!("Verdict: {}", verdict.label());

    Ok(())
}

fn init_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();

    // Ensure parent directory exists
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    config.save_toml(&output)?;
    println!("Configuration written to: {}", output.display());
    Ok(())
}

fn history(
    config: &Config,
    input: Option<PathBuf>,
    model: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = input.unwrap_or_else(|| {
        Path::new(&config.output.output_dir).join(&config.output.ledger_file)
    });

    if !path.exists() {
        println!("No runs recorded in {}", path.display());
        return Ok(());
    }

    let mut records = read_records(&path)?;
    if let Some(model) = model {
        records.retain(|r| r.model == model);
    }

    print_history(&records);
    Ok(())
}
