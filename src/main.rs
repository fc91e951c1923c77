use clap::Parser;
use tracing_subscriber::EnvFilter;

use answerbox::{
    DataDir, Engine,
    cli::{Cli, Command, DatasetAction, FeedbackAction},
    dataset, error,
    tfidf::SearchResult,
};

fn init_tracing(verbose: u8) {
    let filter = if let Ok(env) = std::env::var("ANSWERBOX_LOG") {
        EnvFilter::new(env)
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let mut engine = Engine::open(&data_dir)?;

    match cli.command {
        Command::Ask(args) => {
            let response = engine.get_response(&args.message, &args.session);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", response.reply);
                eprintln!(
                    "\n[confidence {:.2}, category {}]",
                    response.confidence,
                    response.category.as_str()
                );
            }
        }
        Command::Search(args) => {
            let results = engine.retrieve(&args.query, args.count);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                format_results(&results);
            }
        }
        Command::Dataset { action } => match action {
            DatasetAction::Add { path, name } => {
                let records = dataset::load_file(&path, &name)?;
                if records.is_empty() {
                    eprintln!("Warning: no valid records found in {}", path.display());
                }
                let added = engine.add_custom_dataset(&records, &name)?;
                println!("Registered dataset '{name}' with {added} record(s)");
            }
            DatasetAction::List { json } => {
                let info = engine.dataset_info();
                if json {
                    println!("{}", serde_json::to_string_pretty(&info)?);
                } else if info.source_distribution.is_empty() {
                    println!("No datasets loaded.");
                } else {
                    for (source, count) in &info.source_distribution {
                        println!("{source}\t{count}");
                    }
                    println!("\n{} record(s) total", info.total_records);
                }
            }
        },
        Command::Feedback { action } => match action {
            FeedbackAction::Add(args) => {
                let id = engine.add_feedback(
                    &args.session,
                    &args.message,
                    &args.reply,
                    args.rating,
                    &args.text,
                );
                println!("Recorded feedback {id}");
            }
            FeedbackAction::Stats { json } => {
                let stats = engine.feedback_stats();
                if json {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                } else {
                    println!("Total feedback: {}", stats.total);
                    println!("Average rating: {:.1}", stats.average_rating);
                    println!("Positive (4-5): {}", stats.positive);
                    println!("Negative (1-2): {}", stats.negative);
                    for (i, count) in stats.histogram.iter().enumerate() {
                        println!("  {} star(s): {count}", i + 1);
                    }
                }
            }
        },
        Command::Status(args) => {
            let info = engine.dataset_info();
            if args.json {
                let status = serde_json::json!({
                    "data_dir": data_dir.root().display().to_string(),
                    "documents": engine.store_size(),
                    "vocabulary": engine.vocabulary_size(),
                    "feedback": engine.feedback_count(),
                    "ready": engine.is_ready(),
                    "sources": info.source_distribution,
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("Data directory: {}", data_dir.root().display());
                println!("Documents: {}", engine.store_size());
                println!("Vocabulary: {} term(s)", engine.vocabulary_size());
                println!("Feedback entries: {}", engine.feedback_count());
                println!("Ready: {}", engine.is_ready());
                for (source, count) in &info.source_distribution {
                    println!("  {source}: {count}");
                }
            }
        }
        Command::Completions(_) => unreachable!("handled above"),
    }

    Ok(())
}

/// Format search results for human-readable terminal output.
fn format_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results found.");
        return;
    }

    for (i, r) in results.iter().enumerate() {
        println!("{:>3}. [{:.3}] {} ({})", i + 1, r.similarity, r.question, r.source);
        let text: String = r.text.chars().take(160).collect();
        if text.len() < r.text.len() {
            println!("     {text}...");
        } else {
            println!("     {text}");
        }
    }
    println!("\n{} result(s)", results.len());
}
