mod expr;

use std::collections::BTreeMap;

use deskterm::{LineHistory, PROMPT};

use expr::{EvalError, evaluate, format_number};

const BANNER: &str = "> CALC TERMINAL MODE";
const MAX_COMMAND_CHARS: usize = 255;

/// Backend that turns a terminal command into output lines.
///
/// Implementations own the terminal history; `run` returns exactly the
/// lines it appended so the session can relay them in order.
pub trait CommandInterpreter: Send {
    fn run(&mut self, command: &str) -> Vec<String>;

    fn history(&self) -> &LineHistory;
}

/// Small calculator shell with named variables.
pub struct ToyTerminal {
    history: LineHistory,
    vars: BTreeMap<String, f64>,
}

impl ToyTerminal {
    pub fn new(capacity: usize, max_line_chars: usize) -> Self {
        let mut history = LineHistory::new(capacity, max_line_chars);
        history.push("> CONNECTED");
        history.push(BANNER);
        history.push(PROMPT);
        Self {
            history,
            vars: BTreeMap::new(),
        }
    }

    fn execute(&mut self, command: &str) -> Vec<String> {
        match command {
            "help" => vec![
                "commands: help, vars, clear".to_string(),
                "<expr> evaluates, <name> = <expr> assigns".to_string(),
                "operators: + - * / % ^ ( )".to_string(),
                "functions: sqrt abs sin cos tan floor ceil min max".to_string(),
                "constants: pi e".to_string(),
            ],
            "vars" if self.vars.is_empty() => vec!["(no variables)".to_string()],
            "vars" => self
                .vars
                .iter()
                .map(|(name, value)| format!("{name} = {}", format_number(*value)))
                .collect(),
            "clear" => {
                self.vars.clear();
                vec!["cleared".to_string()]
            }
            _ => match self.evaluate_line(command) {
                Ok(line) => vec![line],
                Err(e) => vec![format!("Error: {e}")],
            },
        }
    }

    fn evaluate_line(&mut self, command: &str) -> Result<String, EvalError> {
        if let Some((lhs, rhs)) = command.split_once('=') {
            let name = lhs.trim();
            if !is_identifier(name) {
                return Err(EvalError::UnexpectedToken(name.to_string()));
            }
            let value = evaluate(rhs, &self.vars)?;
            self.vars.insert(name.to_string(), value);
            return Ok(format!("{name} = {}", format_number(value)));
        }

        evaluate(command, &self.vars).map(format_number)
    }
}

impl Default for ToyTerminal {
    fn default() -> Self {
        Self::new(deskterm::HISTORY_CAPACITY, deskterm::HISTORY_LINE_MAX)
    }
}

impl CommandInterpreter for ToyTerminal {
    fn run(&mut self, command: &str) -> Vec<String> {
        let command: String = command.chars().take(MAX_COMMAND_CHARS).collect();
        self.history.replace_last(format!("{PROMPT}{command}"));

        let trimmed = command.trim();
        let mut appended = if trimmed.is_empty() {
            Vec::new()
        } else {
            self.execute(trimmed)
        };
        appended.push(PROMPT.to_string());

        for line in &appended {
            self.history.push(line.as_str());
        }
        appended
    }

    fn history(&self) -> &LineHistory {
        &self.history
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
