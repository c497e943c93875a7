//! REPL input parsing

use anyhow::{bail, Result};

pub const HELP: &str = "\
Type a question to ask it under the current message.

  /tree            show the conversation tree
  /history         show the current exchange
  /unfold          show the whole path to the current message
  /goto <id>       jump to a message
  /delete <id>     delete a message and everything below it
  /branch <text>   ask the model to explain <text> from here
  /retry           ask again for an unanswered question
  /new             start a new line of questions from the top
  /save            save this conversation
  /list            list saved conversations
  /load <id>       open a saved conversation
  /usage           tokens and cost so far
  /models          available models
  /help            this text
  /quit            leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Prompt(String),
    Tree,
    History,
    Unfold,
    Goto(String),
    Delete(String),
    Branch(String),
    Retry,
    New,
    Save,
    List,
    Load(String),
    Usage,
    Models,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            return Ok(Some(Self::Quit));
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Self::Prompt(line.to_string())));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "tree" => Self::Tree,
            "history" => Self::History,
            "unfold" => Self::Unfold,
            "goto" => Self::Goto(required(name, arg)?),
            "delete" => Self::Delete(required(name, arg)?),
            "branch" => Self::Branch(required(name, arg)?),
            "retry" => Self::Retry,
            "new" => Self::New,
            "save" => Self::Save,
            "list" => Self::List,
            "load" => Self::Load(required(name, arg)?),
            "usage" => Self::Usage,
            "models" => Self::Models,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => bail!("unknown command /{other} (try /help)"),
        };
        Ok(Some(command))
    }
}

fn required(name: &str, arg: &str) -> Result<String> {
    if arg.is_empty() {
        bail!("/{name} needs an argument");
    }
    Ok(arg.to_string())
}
