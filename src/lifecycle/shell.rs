//! Debug Shell
//!
//! A small line-oriented inspector for a reloaded session. Changes live
//! in memory until the user runs `checkpoint`.

use std::io::{BufRead, Write};

use serde_json::Value;

use super::session::Session;
use crate::error::{Result, SeisflowsError};
use crate::modules::{ModuleState, Role};

const HELP: &str = "\
Commands:
  roles                       list module roles
  show <role>                 print a module's state as JSON
  set <role> <field> <json>   replace one top-level field
  checkpoint                  save every module to the output directory
  help                        show this message
  quit                        leave the shell";

/// Reads commands from `input` until `quit` or end of input.
pub fn run_shell<R: BufRead, W: Write>(session: &mut Session, input: R, mut output: W) -> Result<()> {
    let mut shell = Shell {
        session,
        dirty: false,
    };

    write_line(&mut output, "SeisFlows debug shell. Type 'help' for commands.")?;
    for line in input.lines() {
        let line = line.map_err(|e| SeisflowsError::io("read shell input", e))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        let reply = shell.execute(line);
        write_line(&mut output, &reply)?;
    }

    if shell.dirty {
        write_line(
            &mut output,
            "Leaving with changes that were not checkpointed.",
        )?;
    }
    Ok(())
}

fn write_line<W: Write>(output: &mut W, text: &str) -> Result<()> {
    writeln!(output, "{}", text).map_err(|e| SeisflowsError::io("write shell output", e))
}

struct Shell<'a> {
    session: &'a mut Session,
    dirty: bool,
}

impl Shell<'_> {
    fn execute(&mut self, line: &str) -> String {
        let (command, rest) = next_word(line);

        let result = match command.unwrap_or_default() {
            "help" => Ok(HELP.to_string()),
            "roles" => Ok(self.roles()),
            "show" => parse_role(next_word(rest).0).and_then(|role| self.show(role)),
            "set" => {
                let (role, rest) = next_word(rest);
                let (field, value) = next_word(rest);
                let value = value.trim();
                match (parse_role(role), field) {
                    (Ok(role), Some(field)) if !value.is_empty() => self.set(role, field, value),
                    (Err(e), _) => Err(e),
                    _ => Err("usage: set <role> <field> <json>".to_string()),
                }
            }
            "checkpoint" => self.checkpoint(),
            other => Err(format!("unknown command '{}'; try 'help'", other)),
        };

        result.unwrap_or_else(|e| format!("error: {}", e))
    }

    fn roles(&self) -> String {
        Role::ALL
            .into_iter()
            .map(|role| {
                let status = if self.session.registry.contains(role) {
                    "loaded"
                } else {
                    "missing"
                };
                format!("{:<12} {}", role.name(), status)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn show(&self, role: Role) -> std::result::Result<String, String> {
        let state = self.session.registry.get(role).map_err(|e| e.to_string())?;
        let value = serde_json::to_value(state).map_err(|e| e.to_string())?;
        serde_json::to_string_pretty(&value["state"]).map_err(|e| e.to_string())
    }

    fn set(&mut self, role: Role, field: &str, raw: &str) -> std::result::Result<String, String> {
        let new_value: Value =
            serde_json::from_str(raw).map_err(|e| format!("value is not JSON: {}", e))?;

        let state = self.session.registry.get(role).map_err(|e| e.to_string())?;
        let mut value = serde_json::to_value(state).map_err(|e| e.to_string())?;
        let fields = value["state"]
            .as_object_mut()
            .ok_or_else(|| format!("{} state has no fields", role))?;

        let is_map_role = matches!(role, Role::Parameters | Role::Paths);
        if !is_map_role && !fields.contains_key(field) {
            return Err(format!("{} has no field '{}'", role, field));
        }
        fields.insert(field.to_string(), new_value);

        let updated: ModuleState =
            serde_json::from_value(value).map_err(|e| format!("rejected: {}", e))?;
        self.session.registry.set(updated);
        self.dirty = true;
        Ok(format!("{}.{} updated", role, field))
    }

    fn checkpoint(&mut self) -> std::result::Result<String, String> {
        self.session.checkpoint().map_err(|e| e.to_string())?;
        self.dirty = false;
        Ok(format!(
            "Checkpointed to {}",
            self.session.store.output_dir().display()
        ))
    }
}

/// Splits off the first whitespace-delimited word, returning it and the
/// untouched remainder.
fn next_word(text: &str) -> (Option<&str>, &str) {
    let text = text.trim_start();
    if text.is_empty() {
        return (None, text);
    }
    let end = text.find(char::is_whitespace).unwrap_or(text.len());
    (Some(&text[..end]), &text[end..])
}

fn parse_role(word: Option<&str>) -> std::result::Result<Role, String> {
    word.ok_or_else(|| "missing role name".to_string())?.parse()
}
