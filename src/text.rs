//! Parser for the block-structured spec text.
//!
//! ```text
//! {
//!     #main
//!     #name: greet;
//!     #desc: Print a greeting;
//!     #arg
//!     meta: PRINT;
//!     type: string;
//!     #flag
//!     long: conti;
//!     short: c;
//!     default: false;
//! }
//! ```
//!
//! Each `{ ... }` block is one command; exactly one carries `#main`. The
//! others are subcommands and need a `#name`. Values run to the next `;` on
//! the same line and may be double-quoted to keep surrounding whitespace.

use crate::schema::{ArgDoc, DefaultLiteral, FlagDoc, SpecDocument, SpecError, SubcommandDoc};

/// Parse spec text into a document ready for compilation.
pub fn parse_document(src: &str) -> Result<SpecDocument, SpecError> {
    let mut lexer = Lexer::new(src);
    let mut blocks = Vec::new();

    loop {
        lexer.skip_trivia();
        match lexer.peek() {
            None => break,
            Some('{') => {
                lexer.bump();
                blocks.push(parse_block(&mut lexer)?);
            }
            Some(c) => return Err(lexer.syntax(format!("expected '{{', found '{}'", c))),
        }
    }

    let main_count = blocks.iter().filter(|b| b.is_main).count();
    if main_count != 1 {
        return Err(SpecError::MainCommandCount(main_count));
    }

    let mut document = SpecDocument::default();
    for block in blocks {
        if block.is_main {
            document.name = block.name;
            document.desc = block.desc;
            document.args = block.args;
            document.flags = block.flags;
        } else {
            document.subcmds.push(SubcommandDoc {
                name: block.name,
                desc: block.desc,
                args: block.args,
                flags: block.flags,
            });
        }
    }

    Ok(document)
}

#[derive(Debug, Default)]
struct Block {
    is_main: bool,
    name: Option<String>,
    desc: Option<String>,
    args: Vec<ArgDoc>,
    flags: Vec<FlagDoc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Arg,
    Flag,
}

fn parse_block(lexer: &mut Lexer<'_>) -> Result<Block, SpecError> {
    let start = lexer.line;
    let mut block = Block::default();
    let mut section = Section::None;

    loop {
        lexer.skip_trivia();
        let line = lexer.line;
        match lexer.peek() {
            None => {
                return Err(SpecError::Syntax {
                    line: start,
                    message: "block is never closed with '}'".to_string(),
                })
            }
            Some('}') => {
                lexer.bump();
                return Ok(block);
            }
            Some('{') => return Err(lexer.syntax("blocks cannot be nested".to_string())),
            Some('#') => {
                lexer.bump();
                let name = lexer.ident();
                match name {
                    "main" => {
                        if block.is_main {
                            return Err(lexer.syntax("duplicate #main directive".to_string()));
                        }
                        block.is_main = true;
                        lexer.optional_semicolon();
                    }
                    "arg" => {
                        block.args.push(ArgDoc::default());
                        section = Section::Arg;
                        lexer.optional_semicolon();
                    }
                    "flag" => {
                        block.flags.push(FlagDoc::default());
                        section = Section::Flag;
                        lexer.optional_semicolon();
                    }
                    "name" => {
                        let value = lexer.value()?;
                        set_once(&mut block.name, value, "#name", line)?;
                    }
                    "desc" => {
                        let value = lexer.value()?;
                        set_once(&mut block.desc, value, "#desc", line)?;
                    }
                    _ => {
                        return Err(SpecError::UnknownDirective {
                            line,
                            name: name.to_string(),
                        })
                    }
                }
            }
            Some(c) => {
                let key = lexer.ident();
                if key.is_empty() {
                    return Err(lexer.syntax(format!("unexpected character '{}'", c)));
                }
                let value = lexer.value()?;
                match section {
                    Section::None => {
                        return Err(SpecError::KeyOutsideContext {
                            line,
                            key: key.to_string(),
                        })
                    }
                    Section::Arg => {
                        if let Some(arg) = block.args.last_mut() {
                            set_arg_key(arg, key, value, line)?;
                        }
                    }
                    Section::Flag => {
                        if let Some(flag) = block.flags.last_mut() {
                            set_flag_key(flag, key, value, line)?;
                        }
                    }
                }
            }
        }
    }
}

fn set_arg_key(arg: &mut ArgDoc, key: &str, value: String, line: usize) -> Result<(), SpecError> {
    match key {
        "meta" => set_once(&mut arg.meta, value, key, line),
        "desc" => set_once(&mut arg.desc, value, key, line),
        "type" => set_once(&mut arg.ty, value, key, line),
        "default" => set_default(&mut arg.default, value, line),
        _ => Err(SpecError::UnknownKey {
            line,
            key: key.to_string(),
            section: "arg",
        }),
    }
}

fn set_flag_key(flag: &mut FlagDoc, key: &str, value: String, line: usize) -> Result<(), SpecError> {
    match key {
        "long" => set_once(&mut flag.long, value, key, line),
        "short" => set_once(&mut flag.short, value, key, line),
        "desc" => set_once(&mut flag.desc, value, key, line),
        "type" => set_once(&mut flag.ty, value, key, line),
        "default" => set_default(&mut flag.default, value, line),
        _ => Err(SpecError::UnknownKey {
            line,
            key: key.to_string(),
            section: "flag",
        }),
    }
}

fn set_once(
    slot: &mut Option<String>,
    value: String,
    key: &str,
    line: usize,
) -> Result<(), SpecError> {
    if slot.is_some() {
        return Err(SpecError::Syntax {
            line,
            message: format!("'{}' is set more than once", key),
        });
    }
    *slot = Some(value);
    Ok(())
}

fn set_default(
    slot: &mut Option<DefaultLiteral>,
    value: String,
    line: usize,
) -> Result<(), SpecError> {
    if slot.is_some() {
        return Err(SpecError::Syntax {
            line,
            message: "'default' is set more than once".to_string(),
        });
    }
    *slot = Some(DefaultLiteral(value));
    Ok(())
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, line: 1 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn syntax(&self, message: String) -> SpecError {
        SpecError::Syntax {
            line: self.line,
            message,
        }
    }

    /// Skip whitespace and `//` comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.rest().starts_with("//") => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => return,
            }
        }
    }

    /// Skip spaces and tabs without crossing a line break.
    fn skip_inline_space(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
            self.bump();
        }
    }

    fn ident(&mut self) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn optional_semicolon(&mut self) {
        self.skip_inline_space();
        if self.peek() == Some(';') {
            self.bump();
        }
    }

    /// Read `: value;`, returning the trimmed or unquoted value.
    fn value(&mut self) -> Result<String, SpecError> {
        self.skip_inline_space();
        if self.bump() != Some(':') {
            return Err(self.syntax("expected ':' after key".to_string()));
        }
        self.skip_inline_space();

        if self.peek() == Some('"') {
            self.bump();
            let value = self.quoted()?;
            self.skip_inline_space();
            if self.bump() != Some(';') {
                return Err(self.syntax("expected ';' after quoted value".to_string()));
            }
            return Ok(value);
        }

        let start = self.pos;
        loop {
            match self.peek() {
                Some(';') => {
                    let value = self.src[start..self.pos].trim().to_string();
                    self.bump();
                    return Ok(value);
                }
                None | Some('\n') => {
                    return Err(self.syntax("value is not terminated with ';'".to_string()))
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn quoted(&mut self) -> Result<String, SpecError> {
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c @ ('"' | '\\')) => value.push(c),
                    Some(c) => {
                        return Err(self.syntax(format!("unknown escape sequence '\\{}'", c)))
                    }
                    None => break,
                },
                Some('\n') | None => break,
                Some(c) => value.push(c),
            }
        }
        Err(self.syntax("unterminated quoted value".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREET: &str = r#"
        // main command
        {
            #main
            #name: greet;
            #desc: Print a greeting;
            #arg
            meta: PRINT;
            type: string;
            desc: Message to print;
            #flag
            long: conti;
            short: c;
            type: bool;
            default: false;
        }
        {
            #name: loud;
            #desc: Shout it;
            #flag
            short: n;
            type: number;
            default: 3;
        }
    "#;

    #[test]
    fn test_parse_document() {
        let doc = parse_document(GREET).unwrap();
        assert_eq!(doc.name.as_deref(), Some("greet"));
        assert_eq!(doc.desc.as_deref(), Some("Print a greeting"));
        assert_eq!(doc.args.len(), 1);
        assert_eq!(doc.args[0].meta.as_deref(), Some("PRINT"));
        assert_eq!(doc.args[0].desc.as_deref(), Some("Message to print"));
        assert_eq!(doc.flags.len(), 1);
        assert_eq!(doc.flags[0].long.as_deref(), Some("conti"));
        assert_eq!(doc.flags[0].short.as_deref(), Some("c"));
        assert_eq!(
            doc.flags[0].default,
            Some(DefaultLiteral("false".to_string()))
        );

        assert_eq!(doc.subcmds.len(), 1);
        assert_eq!(doc.subcmds[0].name.as_deref(), Some("loud"));
        assert_eq!(doc.subcmds[0].flags[0].ty.as_deref(), Some("number"));
    }

    #[test]
    fn test_main_block_may_come_last() {
        let doc = parse_document("{ #name: sub; } { #main; #name: prog; }").unwrap();
        assert_eq!(doc.name.as_deref(), Some("prog"));
        assert_eq!(doc.subcmds[0].name.as_deref(), Some("sub"));
    }

    #[test]
    fn test_error_on_no_main_block() {
        let result = parse_document("{ #name: a; }");
        assert!(matches!(result, Err(SpecError::MainCommandCount(0))));

        let result = parse_document("");
        assert!(matches!(result, Err(SpecError::MainCommandCount(0))));
    }

    #[test]
    fn test_error_on_two_main_blocks() {
        let result = parse_document("{ #main } { #main }");
        assert!(matches!(result, Err(SpecError::MainCommandCount(2))));
    }

    #[test]
    fn test_error_on_key_outside_section() {
        let result = parse_document("{\n#main\nmeta: X;\n}");
        assert!(matches!(
            result,
            Err(SpecError::KeyOutsideContext { line: 3, key }) if key == "meta"
        ));
    }

    #[test]
    fn test_error_on_unknown_directive() {
        let result = parse_document("{ #main\n#version: 1; }");
        assert!(matches!(
            result,
            Err(SpecError::UnknownDirective { line: 2, name }) if name == "version"
        ));
    }

    #[test]
    fn test_error_on_unknown_key() {
        let result = parse_document("{ #main #arg long: x; }");
        assert!(matches!(
            result,
            Err(SpecError::UnknownKey { section: "arg", key, .. }) if key == "long"
        ));
    }

    #[test]
    fn test_error_on_unterminated_block() {
        let result = parse_document("{\n#main\n#flag\nlong: x;\n");
        assert!(matches!(result, Err(SpecError::Syntax { line: 1, .. })));
    }

    #[test]
    fn test_error_on_missing_semicolon() {
        let result = parse_document("{ #main #flag\nlong: x\n}");
        assert!(matches!(result, Err(SpecError::Syntax { line: 2, .. })));
    }

    #[test]
    fn test_error_on_nested_block() {
        let result = parse_document("{ #main { } }");
        assert!(matches!(result, Err(SpecError::Syntax { .. })));
    }

    #[test]
    fn test_error_on_duplicate_key() {
        let result = parse_document("{ #main #flag long: a; long: b; }");
        assert!(matches!(result, Err(SpecError::Syntax { .. })));
    }

    #[test]
    fn test_quoted_values_keep_whitespace() {
        let doc =
            parse_document(r#"{ #main #flag long: sep; type: string; default: " ; "; }"#).unwrap();
        assert_eq!(doc.flags[0].default, Some(DefaultLiteral(" ; ".to_string())));
    }

    #[test]
    fn test_values_may_contain_slashes() {
        let doc = parse_document("{ #main #desc: see http://example.com; }").unwrap();
        assert_eq!(doc.desc.as_deref(), Some("see http://example.com"));
    }

    #[test]
    fn test_text_and_json_compile_identically() {
        use crate::schema::ProgramSpec;

        let from_text = ProgramSpec::from_text(GREET).unwrap();
        let from_json = ProgramSpec::from_json(
            r#"{
                "name": "greet",
                "desc": "Print a greeting",
                "args": [{"meta": "PRINT", "type": "string", "desc": "Message to print"}],
                "flags": [{"long": "conti", "short": "c", "type": "bool", "default": false}],
                "subcmds": [
                    {"name": "loud", "desc": "Shout it",
                     "flags": [{"short": "n", "type": "number", "default": 3}]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(from_text, from_json);
    }
}
