use clap::{Parser, Subcommand};
use colored::Colorize;
use obfusrex::{GroupCollector, Lexer, Options, Token, obfuscate, obfuscate_debug, parse_with};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "obfusrex")]
#[command(about = "Obfusrex - rewrite regexes into equivalent, unreadable ones")]
#[command(version)]
struct Cli {
    /// Log pipeline stages to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Obfuscate a regex pattern
    Obfuscate {
        /// The pattern to obfuscate
        pattern: String,
        /// Let `.` match newlines
        #[arg(long)]
        dot_all: bool,
        /// Largest class that is expanded into alternatives
        #[arg(long, value_name = "N")]
        max_class_expansion: Option<usize>,
        /// Show every pipeline stage
        #[arg(short, long)]
        debug: bool,
    },
    /// Show how a pattern is parsed
    Parse {
        /// The pattern to parse
        pattern: String,
        /// Let `.` match newlines
        #[arg(long)]
        dot_all: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Obfuscate {
            pattern,
            dot_all,
            max_class_expansion,
            debug,
        } => {
            let mut options = Options::new().with_dot_all(dot_all);
            if let Some(max) = max_class_expansion {
                options = options.with_max_class_expansion(max);
            }
            cmd_obfuscate(&pattern, &options, debug)
        }
        Commands::Parse { pattern, dot_all } => {
            cmd_parse(&pattern, &Options::new().with_dot_all(dot_all))
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(err: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), err);
    std::process::exit(1);
}

fn cmd_obfuscate(pattern: &str, options: &Options, debug: bool) {
    if debug {
        match obfuscate_debug(pattern, options) {
            Ok(report) => println!("{report}"),
            Err(e) => fail(e),
        }
    } else {
        match obfuscate(pattern, options) {
            Ok(result) => println!("{}", result.green()),
            Err(e) => fail(e),
        }
    }
}

fn cmd_parse(pattern: &str, options: &Options) {
    let ast = match parse_with(pattern, options) {
        Ok(ast) => ast,
        Err(e) => fail(e),
    };
    let tokens = match Lexer::new(pattern).tokenize() {
        Ok(tokens) => tokens,
        Err(e) => fail(e),
    };

    println!("{}", "Parsing pattern...".bold());
    println!("  Input:  {}", pattern.cyan());
    println!();
    println!("{}", "Tokens:".bold());
    for token in &tokens {
        if *token != Token::Eof {
            println!("  {token:?}");
        }
    }
    println!();
    println!("{}", "AST:".bold());
    println!("  {:?}", ast.root);

    let groups = GroupCollector::collect(&ast.root);
    if !groups.is_empty() {
        println!();
        println!("{}", "Capture groups:".bold());
        for group in &groups {
            match &group.name {
                Some(name) => println!("  Group {}: {}", group.index, name.yellow()),
                None => println!("  Group {}", group.index),
            }
        }
    }

    println!();
    println!("{}", "Round trip:".bold());
    println!("  {}", ast.to_string().green());
}
