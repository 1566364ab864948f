//! Rendering of parse results for callers outside of Rust.
//!
//! The JSON form is meant for tools; the shell form can be `eval`ed or
//! sourced by a script that delegates its argument parsing to `argspec`.

use crate::parser::Matches;
use crate::value::Value;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Heredoc delimiter for help output.
const HELP_DELIMITER: &str = "ARGSPEC_HELP";

#[derive(Serialize)]
struct MatchesView<'a> {
    subcommand: Option<&'a str>,
    help_requested: bool,
    positionals: &'a IndexMap<String, Value>,
    flags: &'a IndexMap<String, Value>,
}

/// Render parsed values as a pretty-printed JSON object.
pub fn render_json(matches: &Matches) -> Result<String, serde_json::Error> {
    let view = MatchesView {
        subcommand: matches.subcommand(),
        help_requested: matches.help_requested(),
        positionals: matches.positionals(),
        flags: matches.flags(),
    };
    serde_json::to_string_pretty(&view)
}

/// Errors that can occur while rendering shell exports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("'{first}' and '{second}' both map to shell variable {name}")]
    VariableCollision {
        name: String,
        first: String,
        second: String,
    },
}

/// Quote a string as a single shell word.
///
/// Single quotes keep every byte literal; an embedded `'` becomes `'\''`.
fn quote_shell_value(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

/// Convert a metavariable or flag key to a valid shell variable name.
///
/// Short-only keys (`-v`) become `SHORT_V` so they cannot clash with a long
/// flag named `v`.
fn to_shell_var_name(key: &str) -> String {
    let (prefix, name) = match key.strip_prefix('-') {
        Some(short) => ("SHORT_", short),
        None => ("", key),
    };

    let mut var = String::from(prefix);
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            var.push(c.to_ascii_uppercase());
        } else {
            var.push('_');
        }
    }
    var
}

/// Render parsed values as shell `export` statements.
///
/// Positionals are exported as `{prefix}ARG_NAME` and flags as
/// `{prefix}FLAG_NAME`; the selected subcommand, if any, as
/// `{prefix}SUBCOMMAND`. Lists are joined with single spaces. Two keys that
/// normalize to the same variable (`a-b` and `a_b`) are an error.
pub fn render_exports(matches: &Matches, prefix: &str) -> Result<String, RenderError> {
    let mut output = String::new();

    if let Some(subcommand) = matches.subcommand() {
        output.push_str(&format!(
            "export {}SUBCOMMAND={}\n",
            prefix,
            quote_shell_value(subcommand)
        ));
    }

    let groups = [("ARG_", matches.positionals()), ("FLAG_", matches.flags())];
    for (namespace, values) in groups {
        let mut seen: HashMap<String, &str> = HashMap::new();
        for (key, value) in values {
            let var_name = format!("{}{}{}", prefix, namespace, to_shell_var_name(key));
            if let Some(first) = seen.insert(var_name.clone(), key.as_str()) {
                return Err(RenderError::VariableCollision {
                    name: var_name,
                    first: first.to_string(),
                    second: key.to_string(),
                });
            }
            output.push_str(&format!(
                "export {}={}\n",
                var_name,
                quote_shell_value(&value.to_string())
            ));
        }
    }

    Ok(output)
}

/// Shell snippet that prints help text and exits 0.
pub fn render_help_script(help_text: &str) -> String {
    format!(
        "cat <<'{delimiter}'\n{text}{delimiter}\nexit 0\n",
        delimiter = HELP_DELIMITER,
        text = help_text
    )
}

/// Shell snippet that prints an error to stderr and exits 1.
pub fn render_error_script(message: &str) -> String {
    let quoted = quote_shell_value(&format!("argspec: {}", message));
    format!("printf '%s\\n' {} >&2\nexit 1\n", quoted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_args;
    use crate::schema::ProgramSpec;

    fn parse(json: &str, args: &[&str]) -> Matches {
        let program = ProgramSpec::from_json(json).unwrap();
        parse_args(&program, args).unwrap()
    }

    #[test]
    fn test_basic_exports() {
        let matches = parse(
            r#"{"args":[{"meta":"INPUT"}],"flags":[{"long":"verbose","short":"v"}]}"#,
            &["file.txt", "-v"],
        );
        let output = render_exports(&matches, "ARGSPEC_").unwrap();

        assert_eq!(
            output,
            "export ARGSPEC_ARG_INPUT='file.txt'\n\
             export ARGSPEC_FLAG_HELP='false'\n\
             export ARGSPEC_FLAG_VERBOSE='true'\n"
        );
    }

    #[test]
    fn test_exports_subcommand_and_lists() {
        let matches = parse(
            r#"{"subcmds":[{"name":"add","flags":[{"long":"tag-list","type":"strings"}]}]}"#,
            &["add", "--tag-list", "a", "b"],
        );
        let output = render_exports(&matches, "APP_").unwrap();

        assert!(output.starts_with("export APP_SUBCOMMAND='add'\n"));
        assert!(output.contains("export APP_FLAG_TAG_LIST='a b'\n"));
    }

    #[test]
    fn test_exports_short_only_key() {
        let matches = parse(r#"{"flags":[{"short":"q"}]}"#, &["-q"]);
        let output = render_exports(&matches, "X_").unwrap();
        assert!(output.contains("export X_FLAG_SHORT_Q='true'\n"));
    }

    #[test]
    fn test_positional_and_flag_with_same_name_both_exported() {
        let matches = parse(
            r#"{"args":[{"meta":"VERBOSE"},{"meta":"HELP"},{"meta":"SUBCOMMAND"}],
                "flags":[{"long":"verbose"}]}"#,
            &["yes", "me", "sub"],
        );
        let output = render_exports(&matches, "P_").unwrap();

        assert!(output.contains("export P_ARG_VERBOSE='yes'\n"));
        assert!(output.contains("export P_FLAG_VERBOSE='false'\n"));
        assert!(output.contains("export P_ARG_HELP='me'\n"));
        assert!(output.contains("export P_FLAG_HELP='false'\n"));
        assert!(output.contains("export P_ARG_SUBCOMMAND='sub'\n"));
        assert!(!output.contains("export P_SUBCOMMAND="));
    }

    #[test]
    fn test_exports_reject_colliding_flag_names() {
        let matches = parse(r#"{"flags":[{"long":"a-b"},{"long":"a_b"}]}"#, &[]);
        let result = render_exports(&matches, "P_");
        assert!(matches!(
            result,
            Err(RenderError::VariableCollision { name, first, second })
                if name == "P_FLAG_A_B" && first == "a-b" && second == "a_b"
        ));
    }

    #[test]
    fn test_exports_reject_colliding_positional_names() {
        let matches = parse(r#"{"args":[{"meta":"a.b"},{"meta":"A-B"}]}"#, &["x", "y"]);
        assert!(matches!(
            render_exports(&matches, ""),
            Err(RenderError::VariableCollision { .. })
        ));
    }

    #[test]
    fn test_exports_keep_special_characters_literal() {
        let matches = parse(
            r#"{"flags":[{"long":"msg","type":"string"}]}"#,
            &["--msg", "hi!\nthere $HOME `x` \\ \"q\""],
        );
        let output = render_exports(&matches, "P_").unwrap();
        assert!(output.contains("export P_FLAG_MSG='hi!\nthere $HOME `x` \\ \"q\"'\n"));
    }

    #[test]
    fn test_quote_plain_value() {
        assert_eq!(quote_shell_value("$HOME/path"), "'$HOME/path'");
        assert_eq!(quote_shell_value(""), "''");
    }

    #[test]
    fn test_quote_embedded_single_quote() {
        assert_eq!(quote_shell_value("it's"), r"'it'\''s'");
        assert_eq!(quote_shell_value("'"), r"''\'''");
    }

    #[test]
    fn test_shell_var_names() {
        assert_eq!(to_shell_var_name("my-option"), "MY_OPTION");
        assert_eq!(to_shell_var_name("PRINT"), "PRINT");
        assert_eq!(to_shell_var_name("-v"), "SHORT_V");
    }

    #[test]
    fn test_render_json() {
        let matches = parse(
            r#"{"args":[{"meta":"N","type":"number"}],"flags":[{"long":"names","type":"strings"}]}"#,
            &["4", "--names", "x", "y"],
        );
        let json: serde_json::Value = serde_json::from_str(&render_json(&matches).unwrap()).unwrap();

        assert_eq!(json["subcommand"], serde_json::Value::Null);
        assert_eq!(json["help_requested"], false);
        assert_eq!(json["positionals"]["N"], 4);
        assert_eq!(json["flags"]["names"], serde_json::json!(["x", "y"]));
        assert_eq!(json["flags"]["help"], false);
    }

    #[test]
    fn test_render_help_script() {
        let output = render_help_script("Usage: app\n");
        assert!(output.starts_with("cat <<'ARGSPEC_HELP'\n"));
        assert!(output.contains("Usage: app\n"));
        assert!(output.ends_with("ARGSPEC_HELP\nexit 0\n"));
    }

    #[test]
    fn test_render_error_script() {
        let output = render_error_script("bad value: $HOME `it's`");
        assert_eq!(
            output,
            "printf '%s\\n' 'argspec: bad value: $HOME `it'\\''s`' >&2\nexit 1\n"
        );
    }
}
