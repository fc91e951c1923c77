use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "answerbox",
    about = "A retrieval-based response engine for support Q/A corpora"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask a question and get a synthesized reply
    Ask(AskArgs),
    /// Search the corpus and show ranked matches
    Search(SearchArgs),
    /// Manage Q/A datasets
    Dataset {
        #[command(subcommand)]
        action: DatasetAction,
    },
    /// Record or inspect reply feedback
    Feedback {
        #[command(subcommand)]
        action: FeedbackAction,
    },
    /// Show engine status and corpus statistics
    Status(StatusArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Ask --

#[derive(Debug, Parser)]
pub struct AskArgs {
    /// The question to answer
    pub message: String,

    /// Session identifier echoed back in the response
    #[arg(short = 's', long, default_value = "cli")]
    pub session: String,

    /// Output the full response as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search query
    pub query: String,

    /// Number of results to return
    #[arg(short = 'n', long, default_value = "5")]
    pub count: usize,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Dataset subcommands --

#[derive(Debug, Subcommand)]
pub enum DatasetAction {
    /// Register a JSON/JSONL dataset file and merge it into the corpus
    Add {
        /// Path to the dataset file
        path: PathBuf,
        /// Name for the registered dataset
        #[arg(long)]
        name: String,
    },
    /// Show loaded datasets and their record counts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

// -- Feedback subcommands --

#[derive(Debug, Subcommand)]
pub enum FeedbackAction {
    /// Record a rating for a reply
    Add(FeedbackAddArgs),
    /// Show aggregate feedback statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Parser)]
pub struct FeedbackAddArgs {
    /// Session the rated exchange belongs to
    #[arg(short = 's', long, default_value = "cli")]
    pub session: String,

    /// The original user message
    #[arg(short = 'm', long)]
    pub message: String,

    /// The reply being rated
    #[arg(short = 'r', long)]
    pub reply: String,

    /// Rating from 1 (poor) to 5 (great)
    #[arg(long)]
    pub rating: u8,

    /// Optional free-text feedback
    #[arg(long, default_value = "")]
    pub text: String,
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(self.shell, &mut cmd, "answerbox", &mut std::io::stdout());
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_ask_defaults() {
        let cli = Cli::parse_from(["answerbox", "ask", "how do I reset my password"]);
        match cli.command {
            Command::Ask(args) => {
                assert_eq!(args.message, "how do I reset my password");
                assert_eq!(args.session, "cli");
                assert!(!args.json);
            }
            _ => panic!("expected ask command"),
        }
    }

    #[test]
    fn parse_search_count() {
        let cli = Cli::parse_from(["answerbox", "search", "billing", "-n", "2"]);
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.query, "billing");
                assert_eq!(args.count, 2);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn parse_feedback_add() {
        let cli = Cli::parse_from([
            "answerbox", "feedback", "add", "-m", "question", "-r", "reply", "--rating", "4",
        ]);
        match cli.command {
            Command::Feedback {
                action: FeedbackAction::Add(args),
            } => {
                assert_eq!(args.rating, 4);
                assert_eq!(args.text, "");
            }
            _ => panic!("expected feedback add command"),
        }
    }
}
