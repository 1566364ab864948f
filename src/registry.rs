//! Per-scope lookup tables for flags and positional arguments.

use crate::schema::{ArgumentDef, FlagDef, SpecError};
use indexmap::IndexMap;

/// Position of the auto-registered help flag in every registry.
pub const HELP_INDEX: usize = 0;

/// Flags of one scope, keyed by effective key in declaration order, plus a
/// direct table from short character to flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagRegistry {
    flags: IndexMap<String, FlagDef>,
    shorts: [Option<usize>; 256],
}

impl FlagRegistry {
    /// A registry holding only `--help`/`-h`.
    pub(crate) fn with_help() -> Self {
        let help = FlagDef::help();
        let mut shorts = [None; 256];
        if let Some(short) = help.short {
            shorts[short as usize] = Some(HELP_INDEX);
        }

        let mut flags = IndexMap::new();
        flags.insert(help.effective_key(), help);

        Self { flags, shorts }
    }

    /// Register a flag, rejecting duplicate keys and short characters.
    pub(crate) fn insert(&mut self, scope: &str, flag: FlagDef) -> Result<(), SpecError> {
        let key = flag.effective_key();
        if self.flags.contains_key(&key) {
            return Err(SpecError::FlagNameAlreadyExists {
                scope: scope.to_string(),
                key,
            });
        }

        if let Some(short) = flag.short {
            let slot = short_slot(short).ok_or_else(|| SpecError::InvalidShortFlagName {
                scope: scope.to_string(),
                short,
            })?;
            if self.shorts[slot].is_some() {
                return Err(SpecError::ShortFlagNameAlreadyExists {
                    scope: scope.to_string(),
                    short,
                });
            }
            self.shorts[slot] = Some(self.flags.len());
        }

        self.flags.insert(key, flag);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&FlagDef> {
        self.flags.get(key)
    }

    /// Index of the flag stored under `key`.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.flags.get_index_of(key)
    }

    /// Index of the flag whose long name is `long`.
    ///
    /// Unlike [`index_of`](Self::index_of) this never matches the synthesized
    /// key of a short-only flag.
    pub fn index_of_long(&self, long: &str) -> Option<usize> {
        self.flags
            .get_full(long)
            .filter(|(_, _, flag)| flag.long.as_deref() == Some(long))
            .map(|(index, _, _)| index)
    }

    /// Index of the flag registered for a short character.
    pub fn index_of_short(&self, short: char) -> Option<usize> {
        short_slot(short).and_then(|slot| self.shorts[slot])
    }

    /// Flags in registration order, help first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlagDef)> {
        self.flags.iter().map(|(key, flag)| (key.as_str(), flag))
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

fn short_slot(short: char) -> Option<usize> {
    let code = short as usize;
    (code < 256).then_some(code)
}

/// Positional arguments of one scope in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Positionals {
    args: Vec<ArgumentDef>,
}

impl Positionals {
    pub(crate) fn push(&mut self, scope: &str, arg: ArgumentDef) -> Result<(), SpecError> {
        if self.position(&arg.meta).is_some() {
            return Err(SpecError::ArgumentNameAlreadyExists {
                scope: scope.to_string(),
                meta: arg.meta,
            });
        }
        self.args.push(arg);
        Ok(())
    }

    pub fn position(&self, meta: &str) -> Option<usize> {
        self.args.iter().position(|a| a.meta == meta)
    }

    pub fn as_slice(&self) -> &[ArgumentDef] {
        &self.args
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}
