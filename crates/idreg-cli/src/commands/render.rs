/*!
 * Terminal rendering of registry responses
 */

use colored::*;
use idreg_core::{Outcome, Response, Unhandled};

pub fn render_response(response: &Response) -> String {
    match response {
        Response::Outcome(outcome) => render_outcome(outcome),
        Response::Unhandled(reason) => render_unhandled(reason),
    }
}

fn render_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Claimed { ignored, .. } if !ignored.is_empty() => {
            let ignored: Vec<String> = ignored.iter().map(ToString::to_string).collect();
            format!(
                "{} {}",
                format!("✓ {}", outcome).green(),
                format!("(ignored: {})", ignored.join(" ")).dimmed()
            )
        }
        Outcome::Claimed { .. }
        | Outcome::Switched { .. }
        | Outcome::Updated { .. }
        | Outcome::Destroyed { .. } => {
            format!("✓ {}", outcome).green().to_string()
        }
        Outcome::AlreadyYours { .. } => outcome.to_string().cyan().to_string(),
        Outcome::Rejected(rejection) => format!("✗ {}", rejection).red().to_string(),
    }
}

fn render_unhandled(reason: &Unhandled) -> String {
    let text = match reason {
        Unhandled::NotAnIdCommand => "not an id command".to_string(),
        Unhandled::Malformed(error) => format!("did not understand: {}", error),
        Unhandled::InvalidName(name) => format!("invalid identity name `{}`", name),
    };
    text.yellow().to_string()
}

/// Format a unix timestamp for display
pub fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use idreg_core::{GrammarError, Rejection};

    #[test]
    fn test_render_mentions_outcome_text() {
        colored::control::set_override(false);

        let claimed = Response::Outcome(Outcome::Claimed {
            name: "alice".to_string(),
            ignored: vec![],
        });
        assert_eq!(render_response(&claimed), "✓ alice is now yours");

        let taken = Response::Outcome(Outcome::Rejected(Rejection::Taken {
            name: "alice".to_string(),
        }));
        assert!(render_response(&taken).starts_with("✗ "));

        let malformed = Response::Unhandled(Unhandled::Malformed(GrammarError::Empty));
        assert!(render_response(&malformed).starts_with("did not understand"));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
    }
}
