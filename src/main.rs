//! The CLI shell (§6 "CLI surface"): a small, hand-rolled `argv` walker, consistent with the
//! explicit non-goal of depending on a general-purpose argument-parsing framework. None of the
//! formatter/backend logic lives here; this binary only wires flags to [`unformat::controller`].
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use unformat::backend::{Backend, ClangFormatBackend, UncrustifyBackend};
use unformat::config::Config;
use unformat::controller::EvolveController;

const USAGE: &str = "\
usage: unformat [-c COMMAND] [-g GENERATIONS] [-i INITIAL] [-j JOBS] [-m MUTATION]
                 [-p POPULATION] [-r ROOT] [-l KEY]... [--cf | --uncrustify]
                 GLOB [GLOB...]

  -c, --command COMMAND      formatter executable to invoke
  -g, --generations N        maximum generations without progress before giving up (default 50)
  -i, --initial PATH         initial configuration file (\"\" for tool defaults)
  -j, --jobs N                number of parallel workers (default: number of CPUs)
  -m, --mutation RATE         initial mutation rate (default 0.05)
  -p, --population N          population size (default 40)
  -r, --root PATH             project root (location for configuration file)
  -l, --lock KEY               lock a configuration key from mutation (repeatable)
      --cf                    use clang-format (default)
      --uncrustify             use uncrustify
  -h, --help                  print this message
";

struct CliArgs {
    command: Option<String>,
    generations_ceiling: usize,
    initial: Option<String>,
    jobs: usize,
    mutation: f32,
    population: usize,
    root: Option<PathBuf>,
    locked_keys: Vec<String>,
    use_uncrustify: bool,
    globs: Vec<String>,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            command: None,
            generations_ceiling: 50,
            initial: None,
            jobs: 0,
            mutation: 0.05,
            population: 40,
            root: None,
            locked_keys: Vec::new(),
            use_uncrustify: false,
            globs: Vec::new(),
        }
    }
}

enum ParseOutcome {
    Args(CliArgs),
    Help,
}

fn usage_error(message: &str) -> ! {
    eprintln!("unformat: {message}");
    eprint!("{USAGE}");
    std::process::exit(2);
}

fn parse_args(argv: &[String]) -> ParseOutcome {
    let mut args = CliArgs::default();
    let mut iter = argv.iter();

    fn next_value<'a>(flag: &str, iter: &mut std::slice::Iter<'a, String>) -> &'a str {
        match iter.next() {
            Some(value) => value.as_str(),
            None => usage_error(&format!("missing value for {flag}")),
        }
    }

    fn parse_usize(flag: &str, raw: &str) -> usize {
        raw.parse()
            .unwrap_or_else(|_| usage_error(&format!("expected a whole number for {flag}, got '{raw}'")))
    }

    fn parse_f32(flag: &str, raw: &str) -> f32 {
        raw.parse()
            .unwrap_or_else(|_| usage_error(&format!("expected a number for {flag}, got '{raw}'")))
    }

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return ParseOutcome::Help,
            "-c" | "--command" => args.command = Some(next_value(arg, &mut iter).to_string()),
            "-g" | "--generations" => {
                args.generations_ceiling = parse_usize(arg, next_value(arg, &mut iter))
            }
            "-i" | "--initial" => args.initial = Some(next_value(arg, &mut iter).to_string()),
            "-j" | "--jobs" => args.jobs = parse_usize(arg, next_value(arg, &mut iter)),
            "-m" | "--mutation" => args.mutation = parse_f32(arg, next_value(arg, &mut iter)),
            "-p" | "--population" => args.population = parse_usize(arg, next_value(arg, &mut iter)),
            "-r" | "--root" => args.root = Some(PathBuf::from(next_value(arg, &mut iter))),
            "-l" | "--lock" => args.locked_keys.push(next_value(arg, &mut iter).to_string()),
            "--cf" => args.use_uncrustify = false,
            "--uncrustify" => args.use_uncrustify = true,
            other if other.starts_with('-') && other != "-" => {
                usage_error(&format!("unrecognized flag '{other}'"))
            }
            other => args.globs.push(other.to_string()),
        }
    }

    if args.globs.is_empty() {
        usage_error("at least one example source glob is required");
    }

    ParseOutcome::Args(args)
}

fn expand_globs(patterns: &[String]) -> Result<Vec<PathBuf>, unformat::errors::UnformatError> {
    let mut paths = Vec::new();
    for pattern in patterns {
        for entry in glob::glob(pattern).into_iter().flatten().flatten() {
            paths.push(entry);
        }
    }
    if paths.is_empty() {
        return Err(unformat::errors::UnformatError::SeedFailure {
            paths: patterns.join(" or "),
        });
    }
    Ok(paths)
}

/// §4.6 "Initial population" (a)/(b): a user-supplied config takes precedence; failing that, an
/// existing config already at the project root is reused if present; an explicit `-i ""` or the
/// complete absence of both skips straight to the backend's own seed styles (case (c), handled by
/// the controller itself when this returns `Ok(None)`).
fn resolve_initial_config(
    backend: &dyn Backend,
    initial: &Option<String>,
    root: &Option<PathBuf>,
) -> Result<Option<Config>, unformat::errors::UnformatError> {
    match initial.as_deref() {
        Some("") => Ok(None),
        Some(path) => {
            let bytes = std::fs::read(path).map_err(|e| {
                unformat::errors::UnformatError::InitialConfigDecode {
                    path: path.to_string(),
                    source: Box::new(e),
                }
            })?;
            backend.decode(&bytes).map(Some)
        }
        None => {
            let Some(root) = root else {
                return Ok(None);
            };
            let config_path = root.join(backend.default_config_filename());
            match std::fs::read(&config_path) {
                Ok(bytes) => backend.decode(&bytes).map(Some),
                Err(_) => Ok(None),
            }
        }
    }
}

fn run() -> Result<(), String> {
    env_logger::init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&argv) {
        ParseOutcome::Help => {
            print!("{USAGE}");
            return Ok(());
        }
        ParseOutcome::Args(args) => args,
    };

    let backend: Arc<dyn Backend> = if args.use_uncrustify {
        Arc::new(UncrustifyBackend::new())
    } else {
        Arc::new(ClangFormatBackend::new())
    };

    let example_paths = expand_globs(&args.globs).map_err(|e| e.to_string())?;
    let initial_config =
        resolve_initial_config(backend.as_ref(), &args.initial, &args.root).map_err(|e| e.to_string())?;
    let command = args
        .command
        .clone()
        .unwrap_or_else(|| backend.default_command().to_string());

    let mut builder = EvolveController::builder()
        .with_backend(Arc::clone(&backend))
        .with_command(command)
        .with_example_paths(example_paths)
        .with_population_size(args.population)
        .with_initial_mutation_rate(args.mutation)
        .with_generations_without_progress_ceiling(args.generations_ceiling)
        .with_jobs(args.jobs)
        .with_locked_keys(args.locked_keys);

    if let Some(config) = initial_config {
        builder = builder.with_initial_config(config);
    }
    if let Some(root) = args.root.clone() {
        builder = builder.with_root(root);
    }

    let mut controller = builder.build().map_err(|e| e.to_string())?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))
        .map_err(|e| format!("failed to install interrupt handler: {e}"))?;

    controller.run(interrupted).map(|_| ()).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("unformat: {message}");
            ExitCode::FAILURE
        }
    }
}
