/*!
 * Concurrent command feed
 *
 * Reads `<sender> <command>` lines from stdin. Each line is handled in its
 * own task; outcomes are printed in input order once all tasks finish.
 */

use anyhow::Result;
use colored::*;
use futures::future::join_all;
use idreg_core::IdentityRegistry;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use super::render::render_response;

pub async fn feed<R>(registry: Arc<R>) -> Result<()>
where
    R: IdentityRegistry + 'static,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks = Vec::new();
    let mut line_number = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;

        let (sender, command) = match parse_line(&line) {
            Some(FeedLine::Command { sender, command }) => (sender.to_string(), command.to_string()),
            Some(FeedLine::Skip) => continue,
            None => {
                warn!(line = line_number, "Skipping line without a command");
                continue;
            }
        };

        let registry = Arc::clone(&registry);
        tasks.push(tokio::spawn(async move {
            let response = registry.handle(&command, &sender).await;
            (sender, command, response)
        }));
    }

    info!(commands = tasks.len(), "Feed drained");

    for joined in join_all(tasks).await {
        let (sender, command, response) = joined?;
        match response {
            Ok(response) => println!(
                "{} {} {}",
                sender.dimmed(),
                command,
                render_response(&response)
            ),
            Err(e) => println!("{} {} {}", sender.dimmed(), command, format!("error: {}", e).red()),
        }
    }

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum FeedLine<'a> {
    Command { sender: &'a str, command: &'a str },
    /// Blank line or `#` comment
    Skip,
}

fn parse_line(line: &str) -> Option<FeedLine<'_>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Some(FeedLine::Skip);
    }

    let (sender, command) = line.split_once(char::is_whitespace)?;
    let command = command.trim_start();
    if command.is_empty() {
        return None;
    }

    Some(FeedLine::Command { sender, command })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(
            parse_line("npub1abc id alice admin npub1def"),
            Some(FeedLine::Command {
                sender: "npub1abc",
                command: "id alice admin npub1def",
            })
        );
        assert_eq!(
            parse_line("  npub1abc \t  id alice  "),
            Some(FeedLine::Command {
                sender: "npub1abc",
                command: "id alice",
            })
        );
    }

    #[test]
    fn test_parse_line_skips_blank_and_comments() {
        assert_eq!(parse_line(""), Some(FeedLine::Skip));
        assert_eq!(parse_line("   "), Some(FeedLine::Skip));
        assert_eq!(parse_line("# setup"), Some(FeedLine::Skip));
    }

    #[test]
    fn test_parse_line_requires_command() {
        assert_eq!(parse_line("npub1abc"), None);
        assert_eq!(parse_line("npub1abc   "), None);
    }
}
