//! Help text generation for compiled specs.

use crate::schema::{CommandSpec, FlagDef, ProgramSpec};

/// Width of the `-s, --` prefix in option rows.
const FLAG_PREFIX_WIDTH: usize = 6;
/// Width reserved for the plural `...` marker.
const PLURAL_MARKER_WIDTH: usize = 3;
/// Minimum column width contributed by flags and subcommands.
const MIN_NAME_WIDTH: usize = 4;

/// Render help for the main command, or for `subcommand` when it names a
/// declared subcommand.
pub fn generate_help(program: &ProgramSpec, subcommand: Option<&str>) -> String {
    let active = subcommand.and_then(|name| program.subcommand(name).map(|spec| (name, spec)));
    let scope = match active {
        Some((_, spec)) => spec,
        None => program.main(),
    };
    let top_level = active.is_none();

    let cell = column_width(program, scope, top_level) + FLAG_PREFIX_WIDTH + PLURAL_MARKER_WIDTH;
    let mut out = String::new();

    if let Some(desc) = scope.desc().filter(|d| !d.is_empty()) {
        out.push_str(desc);
        out.push_str("\n\n");
    }

    out.push_str(&generate_usage(program, subcommand));

    if !scope.arguments().is_empty() {
        out.push_str("\nArguments:\n");
        for arg in scope.arguments() {
            let left = plural_suffixed(&arg.meta, arg.value_type().is_plural());
            push_row(&mut out, cell, &left, arg.desc.as_deref());
        }
    }

    out.push_str("\nOptions:\n");
    for (_, flag) in scope.flags().iter() {
        push_row(&mut out, cell, &flag_cell(flag), flag.desc.as_deref());
    }

    if top_level && program.has_subcommands() {
        out.push_str("\nSubcommands:\n");
        for sub in program.subcommands() {
            push_row(&mut out, cell, sub.name(), sub.desc());
        }
    }

    out
}

/// Render the `Usage:` line, newline-terminated.
pub fn generate_usage(program: &ProgramSpec, subcommand: Option<&str>) -> String {
    let active = subcommand.and_then(|name| program.subcommand(name).map(|spec| (name, spec)));
    let mut usage = format!("Usage: {}", program.name());

    let scope = match active {
        Some((name, spec)) => {
            usage.push(' ');
            usage.push_str(name);
            spec
        }
        None => {
            if program.has_subcommands() {
                usage.push_str(" [subcommands]");
            }
            program.main()
        }
    };

    for arg in scope.arguments() {
        usage.push(' ');
        usage.push_str(&plural_suffixed(&arg.meta, arg.value_type().is_plural()));
    }
    usage.push('\n');
    usage
}

fn column_width(program: &ProgramSpec, scope: &CommandSpec, top_level: bool) -> usize {
    let metas = scope.arguments().iter().map(|a| a.meta.len());
    let flags = scope
        .flags()
        .iter()
        .map(|(_, f)| f.long.as_ref().map_or(0, |l| l.len()).max(MIN_NAME_WIDTH));
    let mut width = metas.chain(flags).max().unwrap_or(MIN_NAME_WIDTH);

    if top_level {
        for sub in program.subcommands() {
            width = width.max(sub.name().len().max(MIN_NAME_WIDTH));
        }
    }
    width
}

fn flag_cell(flag: &FlagDef) -> String {
    let short = match flag.short {
        Some(c) => format!("-{}", c),
        None => "  ".to_string(),
    };
    let separator = if flag.short.is_some() && flag.long.is_some() {
        ", "
    } else {
        "  "
    };
    let long = flag
        .long
        .as_ref()
        .map(|l| format!("--{}", l))
        .unwrap_or_default();

    let cell = format!("{}{}{}", short, separator, long);
    plural_suffixed(&cell, flag.value_type().is_plural())
}

fn plural_suffixed(name: &str, plural: bool) -> String {
    if plural {
        format!("{}...", name)
    } else {
        name.to_string()
    }
}

fn push_row(out: &mut String, cell: usize, left: &str, desc: Option<&str>) {
    let row = format!("  {:cell$}  {}", left, desc.unwrap_or(""), cell = cell);
    out.push_str(row.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(json: &str) -> ProgramSpec {
        ProgramSpec::from_json(json).unwrap()
    }

    #[test]
    fn test_generate_help_layout() {
        let spec = program(
            r#"{
                "name": "greet",
                "desc": "Print a greeting",
                "args": [{"meta": "PRINT", "desc": "Message to print"}],
                "flags": [
                    {"long": "conti", "short": "c", "desc": "Keep going"},
                    {"long": "names", "type": "strings", "desc": "Names to greet"},
                    {"short": "q", "desc": "Quiet"}
                ]
            }"#,
        );

        let expected = "\
Print a greeting

Usage: greet PRINT

Arguments:
  PRINT           Message to print

Options:
  -h, --help      Print help
  -c, --conti     Keep going
      --names...  Names to greet
  -q              Quiet
";
        assert_eq!(generate_help(&spec, None), expected);
    }

    #[test]
    fn test_generate_help_lists_subcommands_at_top_level() {
        let spec = program(
            r#"{
                "name": "tool",
                "subcmds": [
                    {"name": "build", "desc": "Compile things"},
                    {"name": "run"}
                ]
            }"#,
        );

        let help = generate_help(&spec, None);
        assert!(help.starts_with("Usage: tool [subcommands]\n"), "{}", help);
        assert!(help.contains("\nSubcommands:\n"), "{}", help);
        assert!(help.contains("  build           Compile things\n"), "{}", help);
        assert!(help.contains("  run\n"), "{}", help);
    }

    #[test]
    fn test_generate_help_for_subcommand() {
        let spec = program(
            r#"{
                "name": "tool",
                "desc": "Top level",
                "subcmds": [
                    {"name": "copy", "desc": "Copy files",
                     "args": [{"meta": "SRC", "type": "strings"}, {"meta": "DST"}]}
                ]
            }"#,
        );

        let help = generate_help(&spec, Some("copy"));
        assert!(help.starts_with("Copy files\n\n"), "{}", help);
        assert!(help.contains("Usage: tool copy SRC... DST\n"), "{}", help);
        assert!(help.contains("  SRC..."), "{}", help);
        assert!(!help.contains("Subcommands:"), "{}", help);
        assert!(!help.contains("Top level"), "{}", help);
    }

    #[test]
    fn test_unknown_subcommand_falls_back_to_main() {
        let spec = program(r#"{"name":"tool","subcmds":[{"name":"a"}]}"#);
        assert_eq!(
            generate_help(&spec, Some("zzz")),
            generate_help(&spec, None)
        );
    }

    #[test]
    fn test_generate_help_minimal() {
        let spec = program("{}");
        let help = generate_help(&spec, None);
        assert_eq!(
            help,
            "Usage: program\n\nOptions:\n  -h, --help     Print help\n"
        );
    }

    #[test]
    fn test_column_width_follows_longest_name() {
        let spec = program(
            r#"{"name":"t","args":[{"meta":"A_VERY_LONG_META","desc":"x"}],
                "flags":[{"long":"v","desc":"y"}]}"#,
        );
        let help = generate_help(&spec, None);
        let width = "A_VERY_LONG_META".len() + FLAG_PREFIX_WIDTH + PLURAL_MARKER_WIDTH;
        assert!(help.contains(&format!("  {:width$}  x\n", "A_VERY_LONG_META", width = width)));
        assert!(help.contains(&format!("  {:width$}  y\n", "    --v", width = width)));
    }

    #[test]
    fn test_generate_usage() {
        let spec = program(r#"{"name":"cat","args":[{"meta":"FILES","type":"strings"}]}"#);
        assert_eq!(generate_usage(&spec, None), "Usage: cat FILES...\n");
    }
}
