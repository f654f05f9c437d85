//! Command-line interface definitions.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Credentials can be provided via command-line flags or environment
//! variables.

use clap::{Parser, Subcommand};

/// Command-line arguments for the newswright application.
///
/// # Examples
///
/// ```sh
/// # Process every pending URL
/// newswright run
///
/// # Enqueue an article with categories
/// newswright add https://news.example/story --categories Technology,Business
///
/// # List published posts
/// newswright posts
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// WordPress site URL
    #[arg(long, env = "WORDPRESS_URL")]
    pub wordpress_url: Option<String>,

    /// WordPress username
    #[arg(long, env = "WORDPRESS_USERNAME")]
    pub wordpress_username: Option<String>,

    /// WordPress application password
    #[arg(long, env = "WORDPRESS_PASSWORD", hide_env_values = true)]
    pub wordpress_password: Option<String>,

    /// Path to the SQLite URL database
    #[arg(long, env = "DATABASE_PATH", default_value = "newswright.db")]
    pub database_path: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rewrite and publish every pending URL
    Run,
    /// Enqueue an article URL for the next run
    Add {
        /// The article URL to enqueue
        url: String,

        /// Comma-separated category names to assign
        #[arg(long, value_delimiter = ',')]
        categories: Vec<String>,
    },
    /// List published posts
    Posts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_subcommand() {
        let cli = Cli::parse_from(["newswright", "run"]);
        assert!(matches!(cli.command, Command::Run));
        assert_eq!(cli.database_path, "newswright.db");
    }

    #[test]
    fn test_add_subcommand_with_categories() {
        let cli = Cli::parse_from([
            "newswright",
            "add",
            "https://news.example/story",
            "--categories",
            "Technology,Business",
        ]);
        match cli.command {
            Command::Add { url, categories } => {
                assert_eq!(url, "https://news.example/story");
                assert_eq!(categories, vec!["Technology", "Business"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_config_flag() {
        let cli = Cli::parse_from(["newswright", "-c", "/tmp/config.yaml", "posts"]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/config.yaml"));
        assert!(matches!(cli.command, Command::Posts));
    }
}
