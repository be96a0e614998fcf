//! Rocket - a minimal local version-control engine
//!
//! This is the main entry point for the rocket command-line interface.

use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use rocket::config::RepositoryConfig;
use rocket::storage::{InitOutcome, ObjectId, Repository, StorageError};

/// A parsed subcommand.
enum Command {
    Init,
    Add(Vec<PathBuf>),
    Commit(String),
    Log(Option<usize>),
    Status,
    Show(String),
    CatObject(String),
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    // Parse simple command line args.
    let mut root = PathBuf::from(".");
    let mut verbose = false;
    let mut rest: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-C" => {
                i += 1;
                if i < args.len() {
                    root = PathBuf::from(&args[i]);
                }
            }
            "-v" | "--verbose" => {
                verbose = true;
            }
            "-h" | "--help" => {
                print_help();
                return ExitCode::SUCCESS;
            }
            "--version" => {
                println!("rocket v{}", env!("CARGO_PKG_VERSION"));
                return ExitCode::SUCCESS;
            }
            _ => {
                rest.extend(args[i..].iter().cloned());
                break;
            }
        }
        i += 1;
    }

    init_logging(verbose);

    let command = match parse_command(&rest) {
        Ok(command) => command,
        Err(msg) => {
            eprintln!("{}", msg);
            eprintln!("Run 'rocket --help' for usage.");
            return ExitCode::FAILURE;
        }
    };

    match run(RepositoryConfig::new(root), command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    let Some((name, rest)) = args.split_first() else {
        return Err("No command given".to_string());
    };

    match name.as_str() {
        "init" => Ok(Command::Init),
        "add" => {
            if rest.is_empty() {
                return Err("add: expected at least one file".to_string());
            }
            Ok(Command::Add(rest.iter().map(PathBuf::from).collect()))
        }
        "commit" => match rest {
            [flag, message] if flag == "-m" || flag == "--message" => {
                Ok(Command::Commit(message.clone()))
            }
            _ => Err("commit: expected -m <message>".to_string()),
        },
        "log" => match rest {
            [] => Ok(Command::Log(None)),
            [flag, n] if flag == "-n" => n
                .parse()
                .map(|n| Command::Log(Some(n)))
                .map_err(|_| format!("log: invalid count '{}'", n)),
            _ => Err("log: expected [-n <count>]".to_string()),
        },
        "status" => Ok(Command::Status),
        "show" => match rest {
            [hash] => Ok(Command::Show(hash.clone())),
            _ => Err("show: expected a commit hash".to_string()),
        },
        "cat-object" => match rest {
            [hash] => Ok(Command::CatObject(hash.clone())),
            _ => Err("cat-object: expected an object hash".to_string()),
        },
        other => Err(format!("Unknown command: {}", other)),
    }
}

fn run(config: RepositoryConfig, command: Command) -> Result<(), StorageError> {
    if let Command::Init = command {
        let (repo, outcome) = Repository::initialize(config)?;
        match outcome {
            InitOutcome::Created => {
                println!("Initialized repository in {}", repo.control_dir().display())
            }
            InitOutcome::AlreadyInitialized => {
                println!("Already initialized the repository in {}", repo.control_dir().display())
            }
        }
        return Ok(());
    }

    let repo = Repository::open(config)?;

    match command {
        Command::Init => {}
        Command::Add(paths) => {
            for path in paths {
                let hash = repo.add(&path)?;
                println!("{} {}", hash, path.display());
            }
        }
        Command::Commit(message) => {
            let id = repo.commit(&message)?;
            println!("[{}] {}", id.short(), message.lines().next().unwrap_or(""));
        }
        Command::Log(limit) => {
            for entry in repo.log()?.take(limit.unwrap_or(usize::MAX)) {
                let entry = entry?;
                println!("commit {}", entry.hash);
                println!("Date:   {}", entry.timestamp);
                println!();
                for line in entry.message.lines() {
                    println!("    {}", line);
                }
                println!();
            }
        }
        Command::Status => {
            let staged = repo.status()?;
            if staged.is_empty() {
                println!("nothing staged");
            }
            for entry in staged {
                println!("{} {}", entry.hash.short(), entry.path);
            }
        }
        Command::Show(hash) => {
            let id = ObjectId::from_hex(&hash)?;
            let commit = repo.read_commit(&id)?;
            println!("commit {}", id);
            if let Some(parent) = &commit.parent {
                println!("Parent: {}", parent);
            }
            println!("Date:   {}", commit.timestamp);
            println!();
            for line in commit.message.lines() {
                println!("    {}", line);
            }
            println!();
            for file in &commit.files {
                println!("{} {}", file.hash, file.path);
            }
        }
        Command::CatObject(hash) => {
            use std::io::Write;

            let id = ObjectId::from_hex(&hash)?;
            let bytes = repo.read_object(&id)?;
            std::io::stdout().write_all(&bytes)?;
        }
    }

    Ok(())
}

fn print_help() {
    println!("rocket - a minimal local version-control engine");
    println!();
    println!("Usage: rocket [OPTIONS] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  init                   Create .rocket/ in the working tree");
    println!("  add <FILE>...          Stage files for the next commit");
    println!("  commit -m <MESSAGE>    Record staged files as a commit");
    println!("  log [-n <COUNT>]       Show history, newest first");
    println!("  status                 List staged files");
    println!("  show <HASH>            Show a commit");
    println!("  cat-object <HASH>      Print an object's raw bytes");
    println!();
    println!("Options:");
    println!("  -C <DIR>               Run as if started in DIR");
    println!("  -v, --verbose          Log progress to stderr (see also RUST_LOG)");
    println!("  -h, --help             Show this help message");
    println!("  --version              Show version");
}
