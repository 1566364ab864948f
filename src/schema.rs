//! Spec documents and their compiled, immutable schema.
//!
//! Both spec forms (block text and JSON) deserialize into a [`SpecDocument`],
//! which [`ProgramSpec::compile`] validates into per-command registries.

use crate::registry::{FlagRegistry, Positionals};
use crate::text;
use crate::value::{Value, ValueError, ValueType};
use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Program name shown in help when the main command declares none.
pub const DEFAULT_PROGRAM_NAME: &str = "program";

/// Errors that can occur while compiling a spec.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("failed to parse JSON spec: {0}")]
    Json(#[from] serde_json::Error),

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("expected exactly one #main block, found {0}")]
    MainCommandCount(usize),

    #[error("line {line}: key '{key}' appears outside of an #arg or #flag section")]
    KeyOutsideContext { line: usize, key: String },

    #[error("line {line}: unknown directive '#{name}'")]
    UnknownDirective { line: usize, name: String },

    #[error("line {line}: unknown key '{key}' in #{section} section")]
    UnknownKey {
        line: usize,
        key: String,
        section: &'static str,
    },

    #[error("invalid flag name in '{scope}': {reason}")]
    InvalidFlagName { scope: String, reason: String },

    #[error("short flag name '{short}' in '{scope}' must be a single character")]
    ShortFlagNameTooLong { scope: String, short: String },

    #[error("short flag name '{short}' in '{scope}' must be an ASCII character other than '-'")]
    InvalidShortFlagName { scope: String, short: char },

    #[error("invalid type '{0}': expected bool, number, string, bools, numbers or strings")]
    InvalidTypeStringFound(String),

    #[error("invalid default for '{name}': {source}")]
    InvalidDefault {
        name: String,
        #[source]
        source: ValueError,
    },

    #[error("duplicate subcommand name: {0}")]
    SubcommandConflicted(String),

    #[error("short flag '-{short}' is already defined in '{scope}'")]
    ShortFlagNameAlreadyExists { scope: String, short: char },

    #[error("flag '{key}' is already defined in '{scope}'")]
    FlagNameAlreadyExists { scope: String, key: String },

    #[error("argument '{meta}' is already defined in '{scope}'")]
    ArgumentNameAlreadyExists { scope: String, meta: String },

    #[error("argument in '{scope}' has no metavariable")]
    MissingMetavariable { scope: String },

    #[error("subcommand block has no #name")]
    MissingSubcommandName,

    #[error("invalid {what} '{name}': must be non-empty and contain no whitespace")]
    InvalidName { what: &'static str, name: String },
}

/// A default literal as written in a spec.
///
/// JSON documents may spell it as a string, boolean or integer; it is kept
/// as text and interpreted against the declared type at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultLiteral(pub String);

impl<'de> Deserialize<'de> for DefaultLiteral {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct DefaultLiteralVisitor;

        impl<'de> Visitor<'de> for DefaultLiteralVisitor {
            type Value = DefaultLiteral;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a string, boolean or integer")
            }

            fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(DefaultLiteral(value.to_string()))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(DefaultLiteral(value.to_string()))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(DefaultLiteral(value.to_string()))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(DefaultLiteral(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(DefaultLiteral(value))
            }
        }

        deserializer.deserialize_any(DefaultLiteralVisitor)
    }
}

/// A positional argument as written in a spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArgDoc {
    /// Metavariable shown in usage and used as the lookup key
    pub meta: Option<String>,
    pub desc: Option<String>,
    /// Type string, `string` when omitted
    #[serde(rename = "type")]
    pub ty: Option<String>,
    pub default: Option<DefaultLiteral>,
}

/// A flag as written in a spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlagDoc {
    pub long: Option<String>,
    /// Kept as a string so over-long names can be reported
    pub short: Option<String>,
    pub desc: Option<String>,
    /// Type string, `bool` when omitted
    #[serde(rename = "type")]
    pub ty: Option<String>,
    pub default: Option<DefaultLiteral>,
}

/// A subcommand as written in a spec. Subcommands cannot nest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubcommandDoc {
    pub name: Option<String>,
    pub desc: Option<String>,
    #[serde(default)]
    pub args: Vec<ArgDoc>,
    #[serde(default)]
    pub flags: Vec<FlagDoc>,
}

/// Uncompiled spec shared by the text and JSON forms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecDocument {
    pub name: Option<String>,
    pub desc: Option<String>,
    #[serde(default)]
    pub args: Vec<ArgDoc>,
    #[serde(default)]
    pub flags: Vec<FlagDoc>,
    #[serde(default)]
    pub subcmds: Vec<SubcommandDoc>,
}

impl SpecDocument {
    /// Parse a JSON spec document.
    pub fn from_json(json: &str) -> Result<SpecDocument, SpecError> {
        let document: SpecDocument = serde_json::from_str(json)?;
        Ok(document)
    }
}

/// A compiled positional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDef {
    pub meta: String,
    pub desc: Option<String>,
    /// Starting value; its variant carries the declared type
    pub value: Value,
}

impl ArgumentDef {
    pub fn value_type(&self) -> ValueType {
        self.value.value_type()
    }
}

/// A compiled flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagDef {
    pub long: Option<String>,
    pub short: Option<char>,
    pub desc: Option<String>,
    pub value: Value,
}

impl FlagDef {
    /// The `--help`/`-h` flag every scope starts with.
    pub fn help() -> FlagDef {
        FlagDef {
            long: Some("help".to_string()),
            short: Some('h'),
            desc: Some("Print help".to_string()),
            value: Value::Bool(false),
        }
    }

    /// Key under which this flag is stored and looked up.
    ///
    /// The long name when there is one, otherwise `-` followed by the
    /// short character.
    pub fn effective_key(&self) -> String {
        match (&self.long, self.short) {
            (Some(long), _) => long.clone(),
            (None, Some(short)) => short_key(short),
            (None, None) => String::new(),
        }
    }

    pub fn value_type(&self) -> ValueType {
        self.value.value_type()
    }
}

/// Effective key of a flag declared with only a short name.
pub fn short_key(short: char) -> String {
    format!("-{}", short)
}

/// One compiled command scope: the main command or a subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    name: String,
    desc: Option<String>,
    arguments: Positionals,
    flags: FlagRegistry,
}

impl CommandSpec {
    fn build(
        name: String,
        desc: Option<String>,
        args: &[ArgDoc],
        flags: &[FlagDoc],
    ) -> Result<CommandSpec, SpecError> {
        let scope = if name.is_empty() {
            DEFAULT_PROGRAM_NAME.to_string()
        } else {
            name.clone()
        };

        let mut arguments = Positionals::default();
        for arg in args {
            arguments.push(&scope, compile_arg(&scope, arg)?)?;
        }

        let mut registry = FlagRegistry::with_help();
        for flag in flags {
            registry.insert(&scope, compile_flag(&scope, flag)?)?;
        }

        debug!(
            scope = %scope,
            arguments = arguments.len(),
            flags = registry.len(),
            "built command scope"
        );

        Ok(CommandSpec {
            name,
            desc,
            arguments,
            flags: registry,
        })
    }

    /// Declared name; empty for an unnamed main command.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn desc(&self) -> Option<&str> {
        self.desc.as_deref()
    }

    /// Positional arguments in declaration order.
    pub fn arguments(&self) -> &[ArgumentDef] {
        self.arguments.as_slice()
    }

    pub fn flags(&self) -> &FlagRegistry {
        &self.flags
    }
}

/// A compiled program: one main command and its subcommands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSpec {
    main: CommandSpec,
    subcommands: IndexMap<String, CommandSpec>,
}

impl ProgramSpec {
    /// Compile a block-structured spec text.
    pub fn from_text(src: &str) -> Result<ProgramSpec, SpecError> {
        Self::compile(text::parse_document(src)?)
    }

    /// Compile a JSON spec document.
    pub fn from_json(json: &str) -> Result<ProgramSpec, SpecError> {
        Self::compile(SpecDocument::from_json(json)?)
    }

    /// Validate a spec document and build its registries.
    pub fn compile(document: SpecDocument) -> Result<ProgramSpec, SpecError> {
        let name = document.name.unwrap_or_default();
        if !name.is_empty() {
            validate_name("command name", &name)?;
        }
        let main = CommandSpec::build(name, document.desc, &document.args, &document.flags)?;

        let mut subcommands = IndexMap::new();
        for subcmd in document.subcmds {
            let name = subcmd.name.ok_or(SpecError::MissingSubcommandName)?;
            validate_name("subcommand name", &name)?;
            if subcommands.contains_key(&name) {
                return Err(SpecError::SubcommandConflicted(name));
            }
            let spec = CommandSpec::build(name.clone(), subcmd.desc, &subcmd.args, &subcmd.flags)?;
            subcommands.insert(name, spec);
        }

        debug!(
            program = %main.name,
            subcommands = subcommands.len(),
            "compiled program spec"
        );

        Ok(ProgramSpec { main, subcommands })
    }

    /// Program name used in usage lines.
    pub fn name(&self) -> &str {
        if self.main.name.is_empty() {
            DEFAULT_PROGRAM_NAME
        } else {
            &self.main.name
        }
    }

    pub fn main(&self) -> &CommandSpec {
        &self.main
    }

    pub fn subcommand(&self, name: &str) -> Option<&CommandSpec> {
        self.subcommands.get(name)
    }

    /// Subcommands in declaration order.
    pub fn subcommands(&self) -> impl Iterator<Item = &CommandSpec> {
        self.subcommands.values()
    }

    pub fn has_subcommands(&self) -> bool {
        !self.subcommands.is_empty()
    }
}

fn compile_arg(scope: &str, arg: &ArgDoc) -> Result<ArgumentDef, SpecError> {
    let meta = arg
        .meta
        .clone()
        .ok_or_else(|| SpecError::MissingMetavariable {
            scope: scope.to_string(),
        })?;
    validate_name("metavariable", &meta)?;

    let ty = parse_type(arg.ty.as_deref(), ValueType::String)?;
    let value = synthesize(&meta, ty, arg.default.as_ref())?;

    Ok(ArgumentDef {
        meta,
        desc: arg.desc.clone(),
        value,
    })
}

fn compile_flag(scope: &str, flag: &FlagDoc) -> Result<FlagDef, SpecError> {
    if flag.long.is_none() && flag.short.is_none() {
        return Err(SpecError::InvalidFlagName {
            scope: scope.to_string(),
            reason: "a flag needs a long name, a short name, or both".to_string(),
        });
    }

    if let Some(ref long) = flag.long {
        validate_long(scope, long)?;
    }

    let short = match flag.short {
        Some(ref short) => Some(validate_short(scope, short)?),
        None => None,
    };

    let ty = parse_type(flag.ty.as_deref(), ValueType::Bool)?;
    let label = match (&flag.long, short) {
        (Some(long), _) => format!("--{}", long),
        (None, Some(c)) => format!("-{}", c),
        (None, None) => String::new(),
    };
    let value = synthesize(&label, ty, flag.default.as_ref())?;

    Ok(FlagDef {
        long: flag.long.clone(),
        short,
        desc: flag.desc.clone(),
        value,
    })
}

fn parse_type(ty: Option<&str>, fallback: ValueType) -> Result<ValueType, SpecError> {
    match ty {
        Some(text) => text
            .parse::<ValueType>()
            .map_err(SpecError::InvalidTypeStringFound),
        None => Ok(fallback),
    }
}

fn synthesize(
    name: &str,
    ty: ValueType,
    default: Option<&DefaultLiteral>,
) -> Result<Value, SpecError> {
    Value::with_default(ty, default.map(|d| d.0.as_str())).map_err(|source| {
        SpecError::InvalidDefault {
            name: name.to_string(),
            source,
        }
    })
}

fn validate_name(what: &'static str, name: &str) -> Result<(), SpecError> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(SpecError::InvalidName {
            what,
            name: name.to_string(),
        });
    }
    Ok(())
}

fn validate_long(scope: &str, long: &str) -> Result<(), SpecError> {
    let reason = if long.is_empty() {
        Some("long name is empty")
    } else if long.starts_with('-') {
        Some("long name must not start with '-'")
    } else if long.contains('=') || long.chars().any(char::is_whitespace) {
        Some("long name must not contain '=' or whitespace")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(SpecError::InvalidFlagName {
            scope: scope.to_string(),
            reason: format!("{} ('{}')", reason, long),
        }),
        None => Ok(()),
    }
}

fn validate_short(scope: &str, short: &str) -> Result<char, SpecError> {
    let mut chars = short.chars();
    let c = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        (None, _) => {
            return Err(SpecError::InvalidFlagName {
                scope: scope.to_string(),
                reason: "short name is empty".to_string(),
            })
        }
        (Some(_), Some(_)) => {
            return Err(SpecError::ShortFlagNameTooLong {
                scope: scope.to_string(),
                short: short.to_string(),
            })
        }
    };

    if !c.is_ascii_graphic() || c == '-' {
        return Err(SpecError::InvalidShortFlagName {
            scope: scope.to_string(),
            short: c,
        });
    }
    Ok(c)
}
