//! Interactive command parsing.

pub const HELP: &str = "\
Commands:
  next | prev | page <n>     browse catalog pages
  open <id>                  open a character
  close                      close the character view
  gen                        generate a dialogue for the open character
  mute                       toggle narration sound
  script                     show/hide the generated script
  note <text>                save a note for the open character
  delnote <note id>          delete a note
  search <query>             semantic search (empty query clears results)
  clear                      clear search results
  show                       redraw the screen
  help                       this text
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Next,
    Prev,
    Page(u32),
    Open(String),
    Close,
    Generate,
    Mute,
    ToggleScript,
    Note(String),
    DeleteNote(String),
    Search(String),
    ClearSearch,
    Show,
    Help,
    Quit,
}

impl ShellCommand {
    /// Parse one input line. Returns an error message for unusable input.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let cmd = match word.to_lowercase().as_str() {
            "next" | "n" => Self::Next,
            "prev" | "p" => Self::Prev,
            "page" => match rest.parse::<u32>() {
                Ok(n) if n >= 1 => Self::Page(n),
                _ => return Err(format!("Invalid page: {rest:?}")),
            },
            "open" | "o" if !rest.is_empty() => Self::Open(rest.to_string()),
            "close" => Self::Close,
            "gen" | "generate" => Self::Generate,
            "mute" | "unmute" => Self::Mute,
            "script" => Self::ToggleScript,
            "note" => Self::Note(rest.to_string()),
            "delnote" if !rest.is_empty() => Self::DeleteNote(rest.to_string()),
            "search" | "s" => Self::Search(rest.to_string()),
            "clear" => Self::ClearSearch,
            "show" | "" => Self::Show,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => return Err(format!("Unknown command: {line:?} (try `help`)")),
        };
        Ok(cmd)
    }
}
