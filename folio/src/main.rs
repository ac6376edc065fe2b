//! Guided portfolio chat.
//!
//! Keeps chat transcripts and collected project data under `.folio/`, walks
//! the projects listed in `.folio/subjects.json`, and doubles as a client for
//! the newsletter endpoint.

use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use folio::chat::{render_review, run_chat};
use folio::exit_codes;
use folio::io::config::{FolioConfig, load_config};
use folio::io::init::{FolioPaths, InitOptions, init_folio};
use folio::io::newsletter::{HttpSink, Newsletter, SubscribeError, SubscriptionSink};
use folio::io::store::DirStore;
use folio::io::subjects::load_subjects;
use folio::session::{ChatSession, DEFAULT_EXPORT_FILE};
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "folio",
    version,
    about = "Guided portfolio chat and newsletter client"
)]
struct Cli {
    /// Project directory (contains .folio/)
    #[arg(long, global = true, default_value = ".")]
    dir: PathBuf,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.folio/` with config, subject list, and schema if missing.
    Init {
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },
    /// Chat on stdin/stdout. Type `yes` or `/walk` to walk the projects.
    Chat,
    /// Print the collected project data.
    Review,
    /// Write transcript and collected data as JSON.
    Export {
        /// Output file, relative to the project directory.
        #[arg(long, default_value = DEFAULT_EXPORT_FILE)]
        out: PathBuf,
    },
    /// Subscribe an email to the newsletter.
    Subscribe { email: String },
    /// List locally recorded newsletter subscriptions.
    Subscribers,
}

fn main() {
    let cli = Cli::parse();
    folio::logging::init(cli.verbose);
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::FAILED);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let paths = FolioPaths::new(&cli.dir);
    match cli.command {
        Command::Init { force } => cmd_init(&paths, force),
        Command::Chat => cmd_chat(&paths),
        Command::Review => cmd_review(&paths),
        Command::Export { out } => cmd_export(&paths, &out),
        Command::Subscribe { email } => cmd_subscribe(&paths, &email),
        Command::Subscribers => cmd_subscribers(&paths),
    }
}

fn cmd_init(paths: &FolioPaths, force: bool) -> Result<i32> {
    let paths = init_folio(&paths.root, &InitOptions { force })?;
    println!("initialized {}", paths.folio_dir.display());
    Ok(exit_codes::OK)
}

fn cmd_chat(paths: &FolioPaths) -> Result<i32> {
    let mut session = open_session(paths)?;
    let stdin = io::stdin();
    let mut stdout = BufWriter::new(io::stdout());
    run_chat(&mut session, &paths.root, stdin.lock(), &mut stdout)?;
    Ok(exit_codes::OK)
}

fn cmd_review(paths: &FolioPaths) -> Result<i32> {
    let session = open_session(paths)?;
    print!(
        "{}",
        render_review(session.records(), session.engine().schema())
    );
    Ok(exit_codes::OK)
}

fn cmd_export(paths: &FolioPaths, out: &Path) -> Result<i32> {
    let session = open_session(paths)?;
    let out = paths.resolve(out);
    session
        .export_to(&out)
        .with_context(|| format!("export to {}", out.display()))?;
    println!("exported to {}", out.display());
    Ok(exit_codes::OK)
}

fn cmd_subscribe(paths: &FolioPaths, email: &str) -> Result<i32> {
    let cfg = load_folio_config(paths)?;
    let store = DirStore::new(&paths.folio_dir);
    let sink = cfg.newsletter.endpoint.as_ref().map(|endpoint| {
        HttpSink::new(
            endpoint.clone(),
            Duration::from_secs(cfg.newsletter.timeout_secs),
        )
    });
    let newsletter = Newsletter::new(
        &store,
        sink.as_ref().map(|sink| sink as &dyn SubscriptionSink),
    );

    match newsletter.subscribe(email, chrono::Utc::now()) {
        Ok(report) => {
            println!("{}", report.outcome.notice());
            if !report.persisted {
                eprintln!("warning: could not save the local subscription list");
            }
            Ok(exit_codes::OK)
        }
        Err(SubscribeError::InvalidEmail) => {
            println!("Please enter a valid email");
            Ok(exit_codes::REJECTED)
        }
        Err(err) => Err(err.into()),
    }
}

fn cmd_subscribers(paths: &FolioPaths) -> Result<i32> {
    let store = DirStore::new(&paths.folio_dir);
    let newsletter = Newsletter::new(&store, None);
    for subscriber in newsletter.subscribers() {
        println!("{}\t{}", subscriber.email, subscriber.date);
    }
    Ok(exit_codes::OK)
}

fn load_folio_config(paths: &FolioPaths) -> Result<FolioConfig> {
    load_config(&paths.config_path)
}

fn open_session(paths: &FolioPaths) -> Result<ChatSession<DirStore>> {
    let cfg = load_folio_config(paths)?;
    let subjects = load_subjects(&paths.resolve(&cfg.subjects_path))?;
    debug!(subjects = subjects.len(), "opening chat session");
    Ok(ChatSession::open(
        DirStore::new(&paths.folio_dir),
        cfg.schema(),
        subjects,
    ))
}
