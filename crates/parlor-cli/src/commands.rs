//! Slash-command parsing.
//!
//! Lines starting with `/` are commands; anything else is a message for the
//! active conversation.

use parlor_proto::UserId;
use thiserror::Error;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text for the active conversation.
    Say(String),
    /// `/msg <user> <text>`
    Message {
        /// Recipient.
        to: UserId,
        /// Message text.
        content: String,
    },
    /// `/open <user>`
    Open {
        /// Peer to open.
        peer: UserId,
    },
    /// `/close`
    Close,
    /// `/read [user]`, defaulting to the active conversation.
    Read {
        /// Peer to mark read.
        peer: Option<UserId>,
    },
    /// `/typing [user]`, defaulting to the active conversation.
    Typing {
        /// Peer to notify.
        to: Option<UserId>,
    },
    /// `/connect`
    Connect,
    /// `/disconnect`
    Disconnect,
    /// `/hide`: pretend the window lost focus.
    Hide,
    /// `/show`
    Show,
    /// `/help`
    Help,
    /// `/quit` or `/q`
    Quit,
}

/// Input that is not a valid command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// No such command.
    #[error("unknown command: /{0} (try /help)")]
    Unknown(String),

    /// Known command with bad arguments.
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Help text listing every command.
pub const HELP: &str = "\
/msg <user> <text>   send a message
/open <user>         open a conversation (plain text goes there)
/close               leave the open conversation
/read [user]         mark a conversation read
/typing [user]       send a typing notice
/connect             connect or retry after giving up
/disconnect          close the connection
/hide, /show         toggle window visibility
/quit                exit";

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Say(line.to_string())));
    };

    let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let args = args.trim();

    let command = match name {
        "msg" | "m" => {
            const USAGE: &str = "/msg <user> <text>";
            let (to, content) = args.split_once(char::is_whitespace).ok_or(CommandError::Usage(USAGE))?;
            let to = to.parse().map_err(|_| CommandError::Usage(USAGE))?;
            Command::Message { to, content: content.trim().to_string() }
        },
        "open" | "o" => {
            const USAGE: &str = "/open <user>";
            let peer = user_arg(args, USAGE)?.ok_or(CommandError::Usage(USAGE))?;
            Command::Open { peer }
        },
        "close" => Command::Close,
        "read" => Command::Read { peer: user_arg(args, "/read [user]")? },
        "typing" => Command::Typing { to: user_arg(args, "/typing [user]")? },
        "connect" => Command::Connect,
        "disconnect" => Command::Disconnect,
        "hide" => Command::Hide,
        "show" => Command::Show,
        "help" | "h" => Command::Help,
        "quit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(Some(command))
}

fn user_arg(args: &str, usage: &'static str) -> Result<Option<UserId>, CommandError> {
    match args.split_whitespace().collect::<Vec<_>>().as_slice() {
        [] => Ok(None),
        [id] => id.parse().map(Some).map_err(|_| CommandError::Usage(usage)),
        _ => Err(CommandError::Usage(usage)),
    }
}
