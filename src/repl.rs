// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Interactive REPL (Read-Eval-Print Loop) for the Quill engine.

use anyhow::Context;
use owo_colors::OwoColorize;
use quill_engine::{Engine, EngineConfig, Value};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Config, Editor, Helper};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// REPL configuration constants
const HISTORY_FILE: &str = ".quill_history";
const MAX_HISTORY_SIZE: usize = 1000;

const KEYWORDS: &[&str] = &[
    "break",
    "case",
    "catch",
    "const",
    "continue",
    "default",
    "delete",
    "do",
    "else",
    "finally",
    "for",
    "function",
    "if",
    "in",
    "instanceof",
    "let",
    "new",
    "of",
    "return",
    "switch",
    "throw",
    "try",
    "typeof",
    "var",
    "void",
    "while",
];

const LITERALS: &[&str] = &["true", "false", "null", "undefined", "NaN", "Infinity", "this"];

/// REPL commands that can be executed with a dot prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Exit,
    Clear,
    Version,
    Load,
}

impl ReplCommand {
    /// Parse a REPL command from input string
    pub fn parse(input: &str) -> Option<(Self, Option<&str>)> {
        let rest = input.trim().strip_prefix('.')?;
        let (cmd, arg) = match rest.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, Some(arg.trim()).filter(|arg| !arg.is_empty())),
            None => (rest, None),
        };

        match cmd.to_lowercase().as_str() {
            "help" | "h" | "?" => Some((ReplCommand::Help, arg)),
            "exit" | "quit" | "q" => Some((ReplCommand::Exit, arg)),
            "clear" | "cls" => Some((ReplCommand::Clear, arg)),
            "version" | "v" => Some((ReplCommand::Version, arg)),
            "load" | "l" => Some((ReplCommand::Load, arg)),
            _ => None,
        }
    }

    /// Get all available commands for help/completion
    pub fn all_commands() -> &'static [(&'static str, &'static str)] {
        &[
            (".help", "Show this help message"),
            (".exit", "Exit the REPL"),
            (".clear", "Clear the screen"),
            (".version", "Show version information"),
            (".load <file>", "Load and execute a script file"),
        ]
    }
}

/// Completion, hints, highlighting and multi-line validation for rustyline
#[derive(Default)]
struct QuillHelper {
    /// Keywords plus the engine's current global names
    words: Vec<String>,
}

impl QuillHelper {
    fn new() -> Self {
        let mut helper = Self::default();
        helper.set_globals(Vec::new());
        helper
    }

    /// Replace the global names offered for completion
    fn set_globals(&mut self, globals: Vec<String>) {
        let mut words: Vec<String> = KEYWORDS
            .iter()
            .chain(LITERALS)
            .map(|word| word.to_string())
            .chain(globals)
            .collect();
        words.sort();
        words.dedup();
        self.words = words;
    }
}

/// Start of the identifier that ends at `pos`
fn word_start(line: &str, pos: usize) -> usize {
    line[..pos]
        .rfind(|c: char| !c.is_alphanumeric() && c != '_' && c != '$')
        .map(|i| i + 1)
        .unwrap_or(0)
}

impl Completer for QuillHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        if line.starts_with('.') {
            let candidates = ReplCommand::all_commands()
                .iter()
                .map(|(cmd, _)| cmd.split(' ').next().unwrap_or_default())
                .filter(|cmd| cmd.starts_with(&line[..pos]))
                .map(|cmd| Pair {
                    display: cmd.to_string(),
                    replacement: cmd.to_string(),
                })
                .collect();
            return Ok((0, candidates));
        }

        let start = word_start(line, pos);
        let word = &line[start..pos];
        if word.is_empty() {
            return Ok((pos, Vec::new()));
        }

        let candidates = self
            .words
            .iter()
            .filter(|candidate| candidate.starts_with(word))
            .map(|candidate| Pair {
                display: candidate.clone(),
                replacement: candidate.clone(),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for QuillHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.starts_with('.') {
            return None;
        }

        let word = &line[word_start(line, pos)..];
        if word.len() < 2 {
            return None;
        }

        self.words
            .iter()
            .find(|candidate| candidate.starts_with(word) && candidate.len() > word.len())
            .map(|candidate| (&candidate[word.len()..]).dimmed().to_string())
    }
}

impl Highlighter for QuillHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('.') {
            return Cow::Owned(line.magenta().to_string());
        }

        let mut result = String::with_capacity(line.len() * 2);
        let mut current_word = String::new();

        for c in line.chars() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                current_word.push(c);
                continue;
            }
            if !current_word.is_empty() {
                result.push_str(&highlight_word(&current_word));
                current_word.clear();
            }
            let colored = match c {
                '(' | ')' | '[' | ']' | '{' | '}' => c.yellow().to_string(),
                '+' | '-' | '*' | '/' | '%' | '=' | '<' | '>' | '!' | '&' | '|' | '^' | '?' => {
                    c.cyan().to_string()
                }
                '"' | '\'' | '`' => c.green().to_string(),
                _ => c.to_string(),
            };
            result.push_str(&colored);
        }

        if !current_word.is_empty() {
            result.push_str(&highlight_word(&current_word));
        }

        Cow::Owned(result)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn highlight_word(word: &str) -> String {
    const BUILTINS: &[&str] = &[
        "Array", "Boolean", "console", "Date", "Error", "JSON", "Math", "Number", "Object", "String",
    ];

    if KEYWORDS.contains(&word) {
        word.magenta().bold().to_string()
    } else if LITERALS.contains(&word) {
        word.blue().to_string()
    } else if BUILTINS.contains(&word) {
        word.cyan().to_string()
    } else if word.chars().all(|c| c.is_ascii_digit()) {
        word.yellow().to_string()
    } else {
        word.to_string()
    }
}

impl Validator for QuillHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();
        if input.trim_start().starts_with('.') {
            return Ok(ValidationResult::Valid(None));
        }

        if !is_balanced(input) {
            return Ok(ValidationResult::Incomplete);
        }

        // A trailing operator expects more input
        let trimmed = input.trim_end();
        if trimmed.ends_with(['\\', '+', '-', '*', '/', '=', ',', '&', '|', '?', ':']) {
            return Ok(ValidationResult::Incomplete);
        }

        Ok(ValidationResult::Valid(None))
    }
}

/// Check if brackets, braces, and parentheses are balanced
fn is_balanced(input: &str) -> bool {
    let mut stack = Vec::new();
    let mut in_string = None;
    let mut escape_next = false;

    for c in input.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }

        if c == '\\' && in_string.is_some() {
            escape_next = true;
            continue;
        }

        match in_string {
            Some(quote) if c == quote => in_string = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' | '`' => in_string = Some(c),
                '(' => stack.push(')'),
                '[' => stack.push(']'),
                '{' => stack.push('}'),
                ')' | ']' | '}' => {
                    if stack.pop() != Some(c) {
                        return true; // Let the parser report the mismatch
                    }
                }
                _ => {}
            },
        }
    }

    stack.is_empty() && in_string.is_none()
}

impl Helper for QuillHelper {}

/// The interactive REPL
pub struct Repl {
    engine: Engine,
    editor: Editor<QuillHelper, DefaultHistory>,
    history_path: PathBuf,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(config: EngineConfig) -> anyhow::Result<Self> {
        let editor_config = Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .max_history_size(MAX_HISTORY_SIZE)?
            .auto_add_history(true)
            .build();

        let mut editor = Editor::with_config(editor_config).context("failed to initialize line editor")?;
        editor.set_helper(Some(QuillHelper::new()));

        let history_path = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(HISTORY_FILE);
        // A missing history file is normal on first run
        let _ = editor.load_history(&history_path);

        let mut repl = Self {
            engine: Engine::with_config(config),
            editor,
            history_path,
        };
        repl.refresh_globals();
        Ok(repl)
    }

    /// Run the REPL main loop
    pub fn run(&mut self) -> anyhow::Result<()> {
        self.print_banner();

        loop {
            let prompt = format!("{} ", "quill>".bright_green().bold());

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    if let Some((cmd, arg)) = ReplCommand::parse(trimmed) {
                        match self.execute_command(cmd, arg) {
                            CommandResult::Continue => continue,
                            CommandResult::Exit => break,
                        }
                    }

                    self.eval_and_print(trimmed);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C".dimmed());
                }
                Err(ReadlineError::Eof) => {
                    println!("{}", "^D".dimmed());
                    break;
                }
                Err(err) => return Err(err).context("failed to read input"),
            }
        }

        if let Err(err) = self.editor.save_history(&self.history_path) {
            tracing::debug!(error = %err, "could not save history");
        }

        println!();
        println!("{}", "Goodbye!".bright_cyan());
        Ok(())
    }

    fn print_banner(&self) {
        println!();
        println!(
            "  {} {} {}",
            "Quill".bright_cyan().bold(),
            "v".dimmed(),
            env!("CARGO_PKG_VERSION").bright_yellow()
        );
        println!("  {}", "An embeddable scripting runtime".dimmed());
        println!();
        println!(
            "  {} {} {}",
            "Type".dimmed(),
            ".help".cyan(),
            "for available commands".dimmed()
        );
        println!();
    }

    fn execute_command(&mut self, cmd: ReplCommand, arg: Option<&str>) -> CommandResult {
        match cmd {
            ReplCommand::Help => self.print_help(),
            ReplCommand::Exit => return CommandResult::Exit,
            ReplCommand::Clear => print!("\x1B[2J\x1B[H"),
            ReplCommand::Version => {
                println!();
                println!("{}: {}", "Quill".bright_cyan().bold(), env!("CARGO_PKG_VERSION").yellow());
                println!("{}: {}", "Host".dimmed(), quill_host::VERSION);
                println!();
            }
            ReplCommand::Load => match arg {
                Some(path) => self.load_file(Path::new(path)),
                None => eprintln!(
                    "{}: {} {}",
                    "Error".red().bold(),
                    ".load".cyan(),
                    "requires a file path".dimmed()
                ),
            },
        }
        CommandResult::Continue
    }

    fn print_help(&self) {
        println!();
        println!("{}", "REPL Commands:".white().bold());
        println!();

        for (cmd, desc) in ReplCommand::all_commands() {
            println!("  {:16} {}", cmd.cyan(), desc.dimmed());
        }

        println!();
        println!("{}", "Keyboard Shortcuts:".white().bold());
        println!();
        println!("  {:16} {}", "Ctrl+C".yellow(), "Cancel current input".dimmed());
        println!("  {:16} {}", "Ctrl+D".yellow(), "Exit REPL".dimmed());
        println!("  {:16} {}", "Tab".yellow(), "Autocomplete".dimmed());
        println!("  {:16} {}", "Up/Down".yellow(), "Navigate history".dimmed());
        println!();
    }

    fn load_file(&mut self, path: &Path) {
        let result = self.engine.execute_file(path);
        self.print_result(result);
    }

    fn eval_and_print(&mut self, input: &str) {
        let result = self.engine.execute(input);
        self.print_result(result);
    }

    fn print_result(&mut self, result: quill_engine::Result<Value>) {
        match result {
            Ok(value) => println!("{}", format_value(&value)),
            Err(err) => print_error(&err),
        }
        self.refresh_globals();
    }

    fn refresh_globals(&mut self) {
        let names = self.engine.interpreter_mut().global().names();
        if let Some(helper) = self.editor.helper_mut() {
            helper.set_globals(names);
        }
    }
}

/// Result of executing a REPL command
enum CommandResult {
    Continue,
    Exit,
}

/// Format a value for display with syntax coloring
fn format_value(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".dimmed().to_string(),
        Value::Null => "null".blue().to_string(),
        Value::Boolean(_) | Value::Number(_) => value.to_js_string().yellow().to_string(),
        Value::String(s) => format!("'{s}'").green().to_string(),
        Value::Function(_) => value.inspect().magenta().to_string(),
        Value::Host(_) => value.inspect().cyan().to_string(),
        Value::Object(_) | Value::Array(_) => value.inspect(),
    }
}

/// Print a formatted error message
fn print_error(error: &quill_engine::Error) {
    let text = error.to_string();
    match text.split_once(':') {
        Some((kind, message)) => eprintln!("{}:{}", kind.red().bold(), message),
        None => eprintln!("{}", text.red()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repl_command_parse() {
        assert!(matches!(ReplCommand::parse(".help"), Some((ReplCommand::Help, None))));
        assert!(matches!(ReplCommand::parse(".exit"), Some((ReplCommand::Exit, None))));
        assert!(matches!(
            ReplCommand::parse(".load test.js"),
            Some((ReplCommand::Load, Some("test.js")))
        ));
        assert!(matches!(ReplCommand::parse(".load   "), Some((ReplCommand::Load, None))));
        assert!(ReplCommand::parse("not a command").is_none());
        assert!(ReplCommand::parse(".nope").is_none());
    }

    #[test]
    fn test_is_balanced() {
        assert!(is_balanced("(1 + 2)"));
        assert!(is_balanced("{ a: 1 }"));
        assert!(is_balanced("function() { return 1; }"));
        assert!(!is_balanced("(1 + 2"));
        assert!(!is_balanced("{ a: 1"));
        assert!(is_balanced("'string with (unbalanced'"));
        assert!(!is_balanced("`open template"));
    }

    #[test]
    fn test_completion_words() {
        let mut helper = QuillHelper::new();
        helper.set_globals(vec!["greet".into(), "greeting".into(), "while".into()]);
        assert!(helper.words.contains(&"greeting".to_string()));
        assert_eq!(helper.words.iter().filter(|word| *word == "while").count(), 1);
        assert_eq!(word_start("let x = gre", 11), 8);
    }

    #[test]
    fn test_hint_suffix() {
        let mut helper = QuillHelper::new();
        helper.set_globals(vec!["greet".into()]);
        let history = DefaultHistory::new();
        let ctx = rustyline::Context::new(&history);
        let hint = helper.hint("gre", 3, &ctx).unwrap();
        assert!(hint.contains("et"));
        assert!(helper.hint("g", 1, &ctx).is_none());
        assert!(helper.hint("gre", 1, &ctx).is_none());
    }
}
