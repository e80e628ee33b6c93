//! fabula CLI: factoid knowledge base over a lexical-semantic network.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use fabula::checker::{Decision, Policy, UnknownItem};
use fabula::config::FabulaConfig;
use fabula::engine::Engine;
use fabula::error::StoreError;
use fabula::paths::{DataLayout, FabulaPaths};

#[derive(Parser)]
#[command(name = "fabula", version, about = "Factoid knowledge base with analogical story completion")]
struct Cli {
    /// Data directory (stories, factoids, allow-lists and cache).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bypass the semantic-network response cache.
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import stories from a tagged text file.
    Import {
        /// Input file: domain lines followed by tagged factoid lines.
        file: PathBuf,

        /// Ask before accepting terms or relations the network does not know.
        #[arg(long)]
        interactive: bool,
    },

    /// Generalize every stored story.
    Generalize,

    /// List stored stories.
    List,

    /// Show one story.
    Show {
        /// Story id.
        id: String,
    },

    /// Generalize one story without saving and print both versions.
    Test {
        /// Story id.
        id: String,
    },

    /// Complete a story read from stdin ('?' for blanks, empty line to finish).
    Predict {
        /// Also draw on generalized stories.
        #[arg(long)]
        include_generalized: bool,
    },

    /// Complete every story of a batch file.
    PredictFile {
        /// Batch file: title lines, tagged lines and blanks.
        file: PathBuf,

        /// Ignore generalized stories.
        #[arg(long)]
        originals_only: bool,
    },

    /// Show knowledge base statistics.
    Info,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,fabula=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let paths = FabulaPaths::resolve()?;
    let config_file = cli.config.clone().unwrap_or_else(|| paths.config_file());
    let mut config = FabulaConfig::load_or_default(&config_file)?;
    if cli.no_cache {
        config.network.use_cache = false;
    }
    let layout = match &cli.data_dir {
        Some(dir) => DataLayout::rooted_at(dir),
        None => paths.layout(),
    };
    let mut engine = Engine::open(layout, config)?;

    match cli.command {
        Commands::Import { file, interactive } => {
            let report = if interactive {
                let mut ask = prompt;
                engine.import_file(&file, &mut Policy::Interactive(&mut ask))?
            } else {
                engine.import_file(&file, &mut Policy::Force)?
            };
            for (id, reason) in &report.rejected {
                println!("rejected {id}: {reason:?}");
            }
            println!("{report}");
        }

        Commands::Generalize => {
            let ids = engine.generalize_all()?;
            for id in &ids {
                println!("  {id}");
            }
            println!("{} stories generalized", ids.len());
        }

        Commands::List => {
            let ids = engine.store().list_stories();
            if ids.is_empty() {
                println!("No stories stored.");
            }
            for id in ids {
                println!("- {id}");
            }
        }

        Commands::Show { id } => {
            let story = engine
                .store()
                .get_story(&id)
                .ok_or_else(|| StoreError::StoryNotFound { id: id.clone() })?;
            println!("Story: {} (domain: {})", story.id, story.domain);
            for line in story.render_lines() {
                println!("{line}");
            }
        }

        Commands::Test { id } => match engine.generalize_story(&id, false)? {
            Some(g) => {
                let original = engine
                    .store()
                    .get_story(&id)
                    .map(|s| s.render_lines())
                    .unwrap_or_default();
                println!("Original story:");
                for line in original {
                    println!("{line}");
                }
                println!();
                println!("Generalized story:");
                for line in g.story.render_lines() {
                    println!("{line}");
                }
                for entry in g.mapping.entries() {
                    println!("  {} {} -> {}", entry.role, entry.concrete, entry.substituted());
                }
            }
            None => println!("{id} is already a generalized story."),
        },

        Commands::Predict {
            include_generalized,
        } => {
            println!("Enter a story line by line ('?' for blanks, empty line to finish):");
            let lines = read_story_lines().into_diagnostic()?;
            let marker = engine.config().predictor.blank_marker.clone();
            let predictions = engine.predict_missing(lines.as_slice(), include_generalized)?;
            println!();
            println!("Completed story:");
            for line in fabula::batch::complete(&lines, &predictions, &marker) {
                println!("{line}");
            }
        }

        Commands::PredictFile {
            file,
            originals_only,
        } => {
            let text = std::fs::read_to_string(&file).into_diagnostic()?;
            for (i, story) in engine.complete_batch(&text, !originals_only)?.into_iter().enumerate() {
                let title = if story.title.is_empty() {
                    format!("Story {i}")
                } else {
                    story.title
                };
                println!();
                println!("=== {title} ===");
                for line in story.lines {
                    println!("{line}");
                }
            }
        }

        Commands::Info => {
            print!("{}", engine.info());
        }
    }

    engine.flush()?;
    Ok(())
}

/// Read lines from stdin until an empty line or end of input.
fn read_story_lines() -> std::io::Result<Vec<String>> {
    let stdin = std::io::stdin();
    let mut lines = Vec::new();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        lines.push(line.to_string());
    }
    Ok(lines)
}

/// Ask on stdin whether to accept an unknown item.
fn prompt(item: &UnknownItem) -> Decision {
    print!("{item}. Accept it as valid? (y/n) ");
    if std::io::stdout().flush().is_err() {
        return Decision::Reject;
    }
    let mut answer = String::new();
    match std::io::stdin().read_line(&mut answer) {
        Ok(_) if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "o" | "oui") => {
            Decision::Accept
        }
        _ => Decision::Reject,
    }
}
