//! Argument parsing against a compiled spec.

use crate::help::generate_help;
use crate::registry::HELP_INDEX;
use crate::schema::{CommandSpec, ProgramSpec};
use crate::token::{classify, Token};
use crate::value::{Value, ValueError};
use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, trace};

/// Errors that can occur during argument parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown flag: {0}")]
    CannotFindFlag(String),

    #[error("unexpected positional argument: {0}")]
    ArgumentOverflowed(String),

    #[error("missing value for flag: {0}")]
    FlagValueNotFound(String),

    #[error("flag -{flag} in '-{cluster}' takes a value and must be last in the cluster")]
    InvalidMultipleShortFlags { cluster: String, flag: char },

    #[error("unknown subcommand: {0}")]
    InvalidSubcommand(String),

    #[error("invalid value for {target}: {source}")]
    InvalidValue {
        target: String,
        #[source]
        source: ValueError,
    },
}

/// A parse error together with the help text of the scope it occurred in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct ParseFailure {
    pub error: ParseError,
    pub help: String,
}

/// Values collected for the active scope of one parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matches {
    subcommand: Option<String>,
    positionals: IndexMap<String, Value>,
    flags: IndexMap<String, Value>,
    help_requested: bool,
    help: String,
    args: Vec<String>,
}

impl Matches {
    /// The selected subcommand, if any.
    pub fn subcommand(&self) -> Option<&str> {
        self.subcommand.as_deref()
    }

    /// Value of a positional argument by metavariable.
    pub fn positional(&self, meta: &str) -> Option<&Value> {
        self.positionals.get(meta)
    }

    /// Value of a flag by effective key (long name, or `-c` for short-only flags).
    pub fn flag(&self, key: &str) -> Option<&Value> {
        self.flags.get(key)
    }

    pub fn positionals(&self) -> &IndexMap<String, Value> {
        &self.positionals
    }

    pub fn flags(&self) -> &IndexMap<String, Value> {
        &self.flags
    }

    /// Whether `--help` or `-h` appeared anywhere in the arguments.
    pub fn help_requested(&self) -> bool {
        self.help_requested
    }

    /// Help text for the active scope.
    pub fn help(&self) -> &str {
        &self.help
    }

    /// The arguments that were parsed.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Result of parsing arguments.
pub type ParseResult = Result<Matches, ParseFailure>;

/// Parse arguments (without the program name) according to the spec.
pub fn parse_args<S: AsRef<str>>(program: &ProgramSpec, args: &[S]) -> ParseResult {
    let tokens: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
    let mut parser = Parser::new(program);

    let outcome = parser.run(&tokens);
    let help = generate_help(program, parser.active_name());

    match outcome {
        Ok(()) => {
            parser.state = State::Done;
            Ok(parser.into_matches(help, &tokens))
        }
        Err(error) => {
            parser.state = State::Failed;
            debug!(%error, "argument parsing failed");
            Err(ParseFailure { error, help })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State<'a> {
    ScanningMain,
    ScanningSubcommand(&'a str),
    Done,
    Failed,
}

/// Working values and positional cursor of one command scope.
struct ScopeState<'a> {
    spec: &'a CommandSpec,
    positionals: Vec<Value>,
    flags: Vec<Value>,
    cursor: usize,
}

impl<'a> ScopeState<'a> {
    fn new(spec: &'a CommandSpec) -> Self {
        Self {
            spec,
            positionals: spec.arguments().iter().map(|a| a.value.clone()).collect(),
            flags: spec.flags().iter().map(|(_, f)| f.value.clone()).collect(),
            cursor: 0,
        }
    }
}

struct Parser<'a> {
    program: &'a ProgramSpec,
    state: State<'a>,
    main: ScopeState<'a>,
    subcommand: Option<ScopeState<'a>>,
    help_requested: bool,
}

impl<'a> Parser<'a> {
    fn new(program: &'a ProgramSpec) -> Self {
        Self {
            program,
            state: State::ScanningMain,
            main: ScopeState::new(program.main()),
            subcommand: None,
            help_requested: false,
        }
    }

    fn active_name(&self) -> Option<&'a str> {
        match self.state {
            State::ScanningSubcommand(name) => Some(name),
            _ => None,
        }
    }

    fn active(&mut self) -> &mut ScopeState<'a> {
        match self.subcommand {
            Some(ref mut scope) => scope,
            None => &mut self.main,
        }
    }

    fn run(&mut self, tokens: &[&str]) -> Result<(), ParseError> {
        let mut next = 0;
        while next < tokens.len() {
            let token = classify(tokens[next]);
            trace!(?token, index = next, "classified token");
            next += 1;

            match token {
                Token::Positional(name)
                    if next == 1
                        && self.state == State::ScanningMain
                        && self.program.has_subcommands() =>
                {
                    self.enter_subcommand(name)?;
                }
                Token::Positional(text) => self.positional(text, tokens, &mut next)?,
                Token::Long("") | Token::Short("") => {}
                Token::Long(name) => self.long(name, tokens, &mut next)?,
                Token::Short(cluster) => self.short(cluster, tokens, &mut next)?,
            }
        }
        Ok(())
    }

    fn enter_subcommand(&mut self, name: &str) -> Result<(), ParseError> {
        let spec = self
            .program
            .subcommand(name)
            .ok_or_else(|| ParseError::InvalidSubcommand(name.to_string()))?;
        let name = spec.name();

        debug!(subcommand = name, "entering subcommand scope");
        self.state = State::ScanningSubcommand(name);
        self.subcommand = Some(ScopeState::new(spec));
        Ok(())
    }

    fn positional(&mut self, text: &str, tokens: &[&str], next: &mut usize) -> Result<(), ParseError> {
        let scope = self.active();
        let spec = scope.spec;
        let cursor = scope.cursor;
        let arg = spec
            .arguments()
            .get(cursor)
            .ok_or_else(|| ParseError::ArgumentOverflowed(text.to_string()))?;
        let slot = &mut scope.positionals[cursor];

        slot.assign(text).map_err(|source| invalid(&arg.meta, source))?;
        if slot.is_plural() {
            collect(slot, &arg.meta, tokens, next)?;
        }

        scope.cursor += 1;
        Ok(())
    }

    fn long(&mut self, name: &str, tokens: &[&str], next: &mut usize) -> Result<(), ParseError> {
        let label = format!("--{}", name);
        let scope = self.active();
        let spec = scope.spec;
        let index = spec
            .flags()
            .index_of_long(name)
            .ok_or_else(|| ParseError::CannotFindFlag(label.clone()))?;

        debug!(flag = %label, "resolved long flag");
        assign(&mut scope.flags[index], &label, tokens, next)?;

        if index == HELP_INDEX {
            self.help_requested = true;
        }
        Ok(())
    }

    fn short(&mut self, cluster: &str, tokens: &[&str], next: &mut usize) -> Result<(), ParseError> {
        let scope = self.active();
        let spec = scope.spec;
        let flags = spec.flags();

        let mut resolved = Vec::with_capacity(cluster.len());
        for c in cluster.chars() {
            let index = flags
                .index_of_short(c)
                .ok_or_else(|| ParseError::CannotFindFlag(format!("-{}", c)))?;
            resolved.push((c, index));
        }

        let last = resolved.len().saturating_sub(1);
        for (position, &(c, index)) in resolved.iter().enumerate() {
            if position < last && !scope.flags[index].is_bool() {
                return Err(ParseError::InvalidMultipleShortFlags {
                    cluster: cluster.to_string(),
                    flag: c,
                });
            }
        }

        let mut help = false;
        for (c, index) in resolved {
            debug!(flag = %c, "resolved short flag");
            assign(&mut scope.flags[index], &format!("-{}", c), tokens, next)?;
            help |= index == HELP_INDEX;
        }

        if help {
            self.help_requested = true;
        }
        Ok(())
    }

    fn into_matches(self, help: String, tokens: &[&str]) -> Matches {
        let subcommand = self.subcommand.as_ref().map(|s| s.spec.name().to_string());
        let scope = self.subcommand.unwrap_or(self.main);
        let spec = scope.spec;

        let positionals = spec
            .arguments()
            .iter()
            .map(|a| a.meta.clone())
            .zip(scope.positionals)
            .collect();
        let flags = spec
            .flags()
            .iter()
            .map(|(key, _)| key.to_string())
            .zip(scope.flags)
            .collect();

        Matches {
            subcommand,
            positionals,
            flags,
            help_requested: self.help_requested,
            help,
            args: tokens.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Apply one flag occurrence: toggle booleans, fill scalars from the next
/// token, and extend lists with every following positional token.
fn assign(value: &mut Value, label: &str, tokens: &[&str], next: &mut usize) -> Result<(), ParseError> {
    if value.is_bool() {
        value.toggle();
        return Ok(());
    }

    if value.is_plural() {
        return collect(value, label, tokens, next);
    }

    match tokens.get(*next).copied().map(classify) {
        Some(Token::Positional(text)) => {
            *next += 1;
            value.assign(text).map_err(|source| invalid(label, source))
        }
        _ => Err(ParseError::FlagValueNotFound(label.to_string())),
    }
}

fn collect(value: &mut Value, label: &str, tokens: &[&str], next: &mut usize) -> Result<(), ParseError> {
    while let Some(Token::Positional(text)) = tokens.get(*next).copied().map(classify) {
        *next += 1;
        value.assign(text).map_err(|source| invalid(label, source))?;
    }
    Ok(())
}

fn invalid(target: &str, source: ValueError) -> ParseError {
    ParseError::InvalidValue {
        target: target.to_string(),
        source,
    }
}
