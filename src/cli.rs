//! Command-line interface and REPL
//!
//! The line editor blocks, so it runs on a blocking thread and hands parsed
//! commands to the async side over a channel.

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

pub const PROMPT: &str = "mixer> ";

pub const HELP: &str = "\
Commands:
  fader <channel> <value>   Move a fader (value 0.0 - 1.0)
  mute <channel>            Mute a channel
  unmute <channel>          Unmute a channel
  gong                      Play the gong
  status                    Show connection, strips and meters
  connect                   Connect (or reconnect) to the mixer
  disconnect                Close the connection and stop retrying
  help                      Show this help
  quit | exit               Leave

Channel names containing spaces must be quoted: fader \"Hand 1\" 0.5";

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Fader { channel: String, value: f64 },
    Mute { channel: String, muted: bool },
    Gong,
    Status,
    Connect,
    Disconnect,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("'{0}' is not a number")]
    BadNumber(String),
    #[error("unterminated quote")]
    UnterminatedQuote,
}

/// Split a line into words; double or single quotes group words
fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        return Err(ParseError::UnterminatedQuote);
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Parse one REPL line; `Ok(None)` for a blank line
pub fn parse_command(line: &str) -> Result<Option<ReplCommand>, ParseError> {
    let tokens = tokenize(line)?;
    let Some((head, args)) = tokens.split_first() else {
        return Ok(None);
    };

    let command = match (head.to_ascii_lowercase().as_str(), args) {
        ("fader", [channel, value]) => {
            let value = value
                .parse::<f64>()
                .map_err(|_| ParseError::BadNumber(value.clone()))?;
            ReplCommand::Fader {
                channel: channel.clone(),
                value,
            }
        }
        ("fader", _) => return Err(ParseError::Usage("fader <channel> <value>")),
        ("mute", [channel]) => ReplCommand::Mute {
            channel: channel.clone(),
            muted: true,
        },
        ("mute", _) => return Err(ParseError::Usage("mute <channel>")),
        ("unmute", [channel]) => ReplCommand::Mute {
            channel: channel.clone(),
            muted: false,
        },
        ("unmute", _) => return Err(ParseError::Usage("unmute <channel>")),
        ("gong", []) => ReplCommand::Gong,
        ("status", []) => ReplCommand::Status,
        ("connect", []) => ReplCommand::Connect,
        ("disconnect", []) => ReplCommand::Disconnect,
        ("help" | "?", _) => ReplCommand::Help,
        ("quit" | "exit", _) => ReplCommand::Quit,
        ("gong" | "status" | "connect" | "disconnect", _) => {
            return Err(ParseError::Usage("this command takes no arguments"))
        }
        (other, _) => return Err(ParseError::Unknown(other.to_string())),
    };

    Ok(Some(command))
}

/// Run the line editor on a blocking thread
///
/// Parsed commands go to `commands`. Parse errors are printed and the prompt
/// continues. The thread ends on `quit`, EOF, Ctrl+C at the prompt, or when the
/// receiver is dropped; a final `Quit` is sent in the first three cases.
pub fn spawn_repl(commands: mpsc::Sender<ReplCommand>) -> std::thread::JoinHandle<Result<()>> {
    std::thread::spawn(move || run_repl(commands))
}

fn run_repl(commands: mpsc::Sender<ReplCommand>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline(PROMPT);
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                match parse_command(&line) {
                    Ok(Some(command)) => {
                        let quit = command == ReplCommand::Quit;
                        if commands.blocking_send(command).is_err() {
                            debug!("REPL receiver dropped");
                            return Ok(());
                        }
                        if quit {
                            return Ok(());
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{}", e),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                let _ = commands.blocking_send(ReplCommand::Quit);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fader() {
        assert_eq!(
            parse_command("fader HDMI 0.75"),
            Ok(Some(ReplCommand::Fader {
                channel: "HDMI".into(),
                value: 0.75
            }))
        );
    }

    #[test]
    fn test_parse_quoted_channel() {
        assert_eq!(
            parse_command(r#"fader "Hand 1" 1"#),
            Ok(Some(ReplCommand::Fader {
                channel: "Hand 1".into(),
                value: 1.0
            }))
        );
        assert_eq!(
            parse_command("  unmute 'Headset 2'  "),
            Ok(Some(ReplCommand::Mute {
                channel: "Headset 2".into(),
                muted: false
            }))
        );
        assert_eq!(
            parse_command(r#"mute """#),
            Ok(Some(ReplCommand::Mute {
                channel: String::new(),
                muted: true
            }))
        );
    }

    #[test]
    fn test_parse_keywords_case_insensitive() {
        assert_eq!(parse_command("STATUS"), Ok(Some(ReplCommand::Status)));
        assert_eq!(parse_command("Gong"), Ok(Some(ReplCommand::Gong)));
        assert_eq!(parse_command("exit"), Ok(Some(ReplCommand::Quit)));
        assert_eq!(parse_command("quit"), Ok(Some(ReplCommand::Quit)));
        assert_eq!(parse_command("?"), Ok(Some(ReplCommand::Help)));
        assert_eq!(parse_command("connect"), Ok(Some(ReplCommand::Connect)));
        assert_eq!(parse_command("disconnect"), Ok(Some(ReplCommand::Disconnect)));
    }

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(parse_command(""), Ok(None));
        assert_eq!(parse_command("   \t "), Ok(None));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_command("fader HDMI"),
            Err(ParseError::Usage("fader <channel> <value>"))
        );
        assert_eq!(
            parse_command("fader HDMI loud"),
            Err(ParseError::BadNumber("loud".into()))
        );
        assert_eq!(parse_command("mute"), Err(ParseError::Usage("mute <channel>")));
        assert_eq!(
            parse_command("solo HDMI"),
            Err(ParseError::Unknown("solo".into()))
        );
        assert_eq!(
            parse_command(r#"mute "Hand 1"#),
            Err(ParseError::UnterminatedQuote)
        );
        assert!(parse_command("status now").is_err());
    }
}
