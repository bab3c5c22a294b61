//! Runtime controls read from stdin.
//!
//! One command per line. Each command has a long name and a one-letter
//! alias so the viewer can be driven from a tiny keypad-to-serial bridge:
//!
//! | Command   | Alias | Action                              |
//! |-----------|-------|-------------------------------------|
//! | `left`    | `a`   | Rotate 90° counter-clockwise        |
//! | `right`   | `b`   | Rotate 90° clockwise                |
//! | `swap`    | `s`   | Toggle RGB565 byte order            |
//! | `torch`   | `x`   | Toggle the camera flashlight        |
//! | `connect` | `y`   | Open (or reopen) the stream         |
//! | `quit`    | `q`   | Exit                                |

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A user command for the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    RotateLeft,
    RotateRight,
    ToggleSwap,
    ToggleTorch,
    Reconnect,
    Quit,
}

/// Parse one input line. Blank or unknown lines yield `None`.
pub fn parse_command(line: &str) -> Option<InputAction> {
    match line.trim().to_ascii_lowercase().as_str() {
        "left" | "a" => Some(InputAction::RotateLeft),
        "right" | "b" => Some(InputAction::RotateRight),
        "swap" | "s" => Some(InputAction::ToggleSwap),
        "torch" | "x" => Some(InputAction::ToggleTorch),
        "connect" | "reconnect" | "y" => Some(InputAction::Reconnect),
        "quit" | "exit" | "q" => Some(InputAction::Quit),
        _ => None,
    }
}

/// Forward parsed stdin commands to `tx` until stdin closes or the
/// receiver is dropped.
pub fn spawn_stdin_reader(tx: mpsc::Sender<InputAction>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let Some(action) = parse_command(&line) else {
                        if !line.trim().is_empty() {
                            warn!("unknown command {:?}", line.trim());
                        }
                        continue;
                    };
                    if tx.send(action).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("stdin closed");
                    break;
                }
                Err(e) => {
                    warn!("stdin read failed: {e}");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_names_and_aliases() {
        assert_eq!(parse_command("left"), Some(InputAction::RotateLeft));
        assert_eq!(parse_command("a"), Some(InputAction::RotateLeft));
        assert_eq!(parse_command("B"), Some(InputAction::RotateRight));
        assert_eq!(parse_command("  swap\r"), Some(InputAction::ToggleSwap));
        assert_eq!(parse_command("x"), Some(InputAction::ToggleTorch));
        assert_eq!(parse_command("connect"), Some(InputAction::Reconnect));
        assert_eq!(parse_command("Quit"), Some(InputAction::Quit));
    }

    #[test]
    fn unknown_lines_are_ignored() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("rotate"), None);
    }
}
