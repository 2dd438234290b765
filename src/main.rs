use clap::{Parser, Subcommand};
use query_ai::Result;
use query_ai::commands::{ask, ingest_file, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "query-ai")]
#[command(about = "Retrieval-augmented question answering over a pgvector context store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the resolved configuration
    Config,
    /// Ingest a cleaned text file into the context store
    Ingest {
        /// Path to the text file to ingest
        file: PathBuf,
    },
    /// Ask a question against the stored contexts
    Ask {
        /// The question to answer
        question: String,
        /// Answer against this context instead of retrieving one
        #[arg(long)]
        context: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config => {
            show_config()?;
        }
        Commands::Ingest { file } => {
            ingest_file(&file).await?;
        }
        Commands::Ask { question, context } => {
            ask(&question, context.as_deref()).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["query-ai", "config"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Config);
        }
    }

    #[test]
    fn ask_command_with_question() {
        let cli = Cli::try_parse_from(["query-ai", "ask", "What is AI?"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask { question, context } = parsed.command {
                assert_eq!(question, "What is AI?");
                assert_eq!(context, None);
            }
        }
    }

    #[test]
    fn ask_command_with_inline_context() {
        let cli = Cli::try_parse_from([
            "query-ai",
            "ask",
            "What is AI?",
            "--context",
            "AI stands for Artificial Intelligence.",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask { context, .. } = parsed.command {
                assert_eq!(
                    context,
                    Some("AI stands for Artificial Intelligence.".to_string())
                );
            }
        }
    }

    #[test]
    fn ingest_command_takes_a_file() {
        let cli = Cli::try_parse_from(["query-ai", "ingest", "contexts.txt"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ingest { file } = parsed.command {
                assert_eq!(file, PathBuf::from("contexts.txt"));
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["query-ai", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["query-ai", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
