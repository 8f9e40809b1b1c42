//! mathex - compile and evaluate formula text from the command line

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{debug, info};
use mathex_builtins::{parse_boolean, parse_numeric_literal, Value};
use mathex_compiler::{CompiledExpression, Compiler};
use std::io::Write;
use std::path::PathBuf;

mod config;

use config::{ConfigLoader, LogLevel as ConfigLogLevel, MathexConfig};

#[derive(Parser)]
#[command(name = "mathex", version, about = "Compile and evaluate formula text")]
struct Cli {
    /// Set log level
    #[arg(long, value_enum, env = "MATHEX_LOG_LEVEL", value_parser = parse_log_level_env)]
    log_level: Option<LogLevel>,

    /// Configuration file path
    #[arg(long, env = "MATHEX_CONFIG")]
    config: Option<PathBuf>,

    /// Cache capacity override (0 = unbounded)
    #[arg(long)]
    cache_capacity: Option<usize>,

    /// Log extraction output and resolution order of each compilation
    #[arg(long)]
    trace_steps: bool,

    /// Write a sample configuration file and exit (stdout if path omitted)
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = "-")]
    generate_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an expression and invoke it with the given arguments
    Eval {
        /// Formula text
        expression: String,

        /// Arguments in parameter order (numbers, true/false, anything else is a string)
        args: Vec<String>,
    },

    /// Show parameters, result kind and bytecode of an expression
    Inspect {
        /// Formula text
        expression: String,

        /// Also print the rewritten text and bindings
        #[arg(short, long)]
        verbose: bool,
    },

    /// List the builtin functions
    Functions,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for ConfigLogLevel {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => ConfigLogLevel::Error,
            LogLevel::Warn => ConfigLogLevel::Warn,
            LogLevel::Info => ConfigLogLevel::Info,
            LogLevel::Debug => ConfigLogLevel::Debug,
            LogLevel::Trace => ConfigLogLevel::Trace,
        }
    }
}

fn parse_log_level_env(s: &str) -> Result<LogLevel, String> {
    if s.is_empty() {
        return Ok(LogLevel::Warn);
    }

    match s.to_lowercase().as_str() {
        "error" => Ok(LogLevel::Error),
        "warn" => Ok(LogLevel::Warn),
        "info" => Ok(LogLevel::Info),
        "debug" => Ok(LogLevel::Debug),
        "trace" => Ok(LogLevel::Trace),
        _ => Err(format!(
            "Invalid log level '{s}'. Expected: error, warn, info, debug, trace"
        )),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.generate_config {
        if path.as_os_str() == "-" {
            println!("{}", ConfigLoader::generate_sample_config());
        } else {
            ConfigLoader::save_to_file(&MathexConfig::default(), path)?;
            println!("Wrote sample configuration to {}", path.display());
        }
        return Ok(());
    }

    let config = load_configuration(&cli)?;

    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .filter_level(config.logging.level.to_filter())
        .format(format_log_record)
        .init();

    info!("mathex v{} starting", env!("CARGO_PKG_VERSION"));
    debug!("Configuration loaded: {config:?}");

    let compiler = Compiler::builder(config.definition.clone())
        .with_config(config.compiler_config())
        .build()
        .context("Failed to build compiler")?;

    match cli.command {
        Some(Commands::Eval { expression, args }) => execute_eval(&compiler, &expression, &args),
        Some(Commands::Inspect {
            expression,
            verbose,
        }) => execute_inspect(&compiler, &expression, verbose),
        Some(Commands::Functions) => {
            list_functions();
            Ok(())
        }
        None => {
            println!("No command given; try `mathex --help`");
            Ok(())
        }
    }
}

fn load_configuration(cli: &Cli) -> Result<MathexConfig> {
    let mut config = match &cli.config {
        Some(path) if path.is_file() => {
            info!("Loading configuration from: {}", path.display());
            ConfigLoader::load_with_file(path)?
        }
        Some(path) if !path.exists() => {
            anyhow::bail!("Specified config file does not exist: {}", path.display())
        }
        _ => ConfigLoader::load()?,
    };

    if let Some(level) = cli.log_level {
        config.logging.level = level.into();
    }
    if let Some(capacity) = cli.cache_capacity {
        config.compiler.cache_capacity = capacity;
    }
    if cli.trace_steps {
        config.compiler.trace_steps = true;
    }

    Ok(config)
}

fn execute_eval(compiler: &Compiler, expression: &str, args: &[String]) -> Result<()> {
    let compiled = compiler
        .compile(expression)
        .with_context(|| format!("Failed to compile '{expression}'"))?;
    let values: Vec<Value> = args.iter().map(|a| parse_argument(a)).collect();
    debug!("Invoking with {values:?}");

    let result = compiled
        .invoke(&values)
        .with_context(|| format!("Failed to evaluate '{expression}'"))?;
    println!("{result}");
    Ok(())
}

fn execute_inspect(compiler: &Compiler, expression: &str, verbose: bool) -> Result<()> {
    if verbose {
        let analysis = compiler
            .analyze(expression)
            .with_context(|| format!("Failed to analyze '{expression}'"))?;
        println!("rewritten: {}", analysis.literal_text);
        for symbol in &analysis.symbols {
            println!("  symbol {} = {}", symbol.name, symbol.expression);
        }
        println!("resolution order: {}", analysis.resolution_order.join(", "));
        for (slot, binding) in analysis.bindings.iter().enumerate() {
            println!("  binding {slot}: {} = {}", binding.name, binding.node);
        }
        println!("root: {}", analysis.root);
        println!();
    }

    let compiled = compiler
        .compile(expression)
        .with_context(|| format!("Failed to compile '{expression}'"))?;
    print!("{}", describe(&compiled));
    Ok(())
}

fn describe(compiled: &CompiledExpression) -> String {
    let mut out = String::new();
    out.push_str(&format!("expression: {}\n", compiled.source()));
    out.push_str(&format!("returns: {}\n", compiled.return_kind()));
    if compiled.parameter_contexts().is_empty() {
        out.push_str("parameters: none\n");
    } else {
        out.push_str("parameters:\n");
        for param in compiled.parameter_contexts() {
            out.push_str(&format!(
                "  {}: {} {} ({:?}){}\n",
                param.order,
                param.name,
                param.kind,
                param.numeric,
                if param.functional { " deferred" } else { "" }
            ));
        }
    }
    out.push_str("bytecode:\n");
    out.push_str(&compiled.program().disassemble());
    out
}

fn list_functions() {
    let mut functions = mathex_builtins::builtin_functions();
    functions.sort_by(|a, b| (a.category, a.name).cmp(&(b.category, b.name)));
    for func in functions {
        println!(
            "{:<10} {:<12} {:?} -> {}  {}",
            func.category, func.name, func.arity, func.return_kind, func.description
        );
    }
}

/// Numbers and booleans keep their kind; anything else is passed as a string.
fn parse_argument(raw: &str) -> Value {
    if let Some(value) = parse_numeric_literal(raw) {
        return value;
    }
    if let Some(flag) = parse_boolean(raw) {
        return Value::Bool(flag);
    }
    Value::String(raw.to_string())
}

fn format_log_record(
    buf: &mut env_logger::fmt::Formatter,
    record: &log::Record,
) -> std::io::Result<()> {
    let timestamp = buf.timestamp_nanos();
    writeln!(
        buf,
        "[{} {:>5} {}] {}",
        timestamp,
        record.level(),
        record.target(),
        record.args()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathex_compiler::MathDefinition;

    #[test]
    fn arguments_keep_their_kind() {
        assert_eq!(parse_argument("3"), Value::Int(3));
        assert_eq!(parse_argument("2.5"), Value::Num(2.5));
        assert_eq!(parse_argument("0x10"), Value::Int(16));
        assert_eq!(parse_argument("TRUE"), Value::Bool(true));
        assert_eq!(parse_argument("abc"), Value::String("abc".into()));
    }

    #[test]
    fn describe_lists_parameters_and_bytecode() {
        let compiler = Compiler::new(MathDefinition::standard()).unwrap();
        let compiled = compiler.compile("a * 2 + b").unwrap();
        let text = describe(&compiled);
        assert!(text.contains("returns: numeric"));
        assert!(text.contains("0: a numeric"));
        assert!(text.contains("1: b numeric"));
        assert!(text.contains("root:"));

        let compiled = compiler.compile("if(c, x, 0)").unwrap();
        assert!(describe(&compiled).contains("1: x numeric (Unset) deferred"));
    }

    #[test]
    fn log_level_env_accepts_empty() {
        assert!(matches!(parse_log_level_env(""), Ok(LogLevel::Warn)));
        assert!(matches!(parse_log_level_env("DEBUG"), Ok(LogLevel::Debug)));
        assert!(parse_log_level_env("chatty").is_err());
    }

    #[test]
    fn cli_parses_eval_arguments() {
        let cli = Cli::parse_from(["mathex", "eval", "x + y", "1", "2"]);
        match cli.command {
            Some(Commands::Eval { expression, args }) => {
                assert_eq!(expression, "x + y");
                assert_eq!(args, vec!["1", "2"]);
            }
            _ => panic!("expected eval"),
        }
    }

    #[test]
    fn generate_config_path_is_optional() {
        let cli = Cli::parse_from(["mathex", "--generate-config"]);
        assert_eq!(cli.generate_config, Some(PathBuf::from("-")));
        let cli = Cli::parse_from(["mathex", "--generate-config", "out.toml"]);
        assert_eq!(cli.generate_config, Some(PathBuf::from("out.toml")));
    }
}
