//! Textual listings of method bodies
//!
//! ```text,ignore,no_run
//! method Foo.bar()V
//!   start:                        # labels end in `:`
//!     nop
//!     invokestatic Foo.baz()V
//!     @save_stack_before_try      # pseudo-instructions start with `@`
//!   end:
//!     return
//!   handler:
//!     astore 1
//!     return
//!   try start end handler java/lang/Exception   # `*` catches everything
//! end
//! ```
//!
//! Label names in the input are arbitrary identifiers, scoped to the method. They get mapped to
//! fresh labels in order of first mention, so rendering uses the `l<N>` names instead.

use super::{
    Code, ExceptionHandler, Instruction, InvokeType, OrdComparison, PseudoInsn, SynLabel,
};
use crate::jvm::model::Method;
use crate::jvm::{BinaryName, Error};
use std::collections::HashMap;
use std::fmt;

/// Parse all of the methods in a listing
pub fn parse_listing(source: &str) -> Result<Vec<Method>, Error> {
    let mut methods = vec![];
    let mut current: Option<MethodParser> = None;

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let parse_error = |message: String| Error::Parse {
            line: line_no,
            message,
        };

        let (keyword, rest) = split_word(line);
        if current.is_none() {
            if keyword == "method" && !rest.is_empty() {
                current = Some(MethodParser::new(rest));
                continue;
            }
            return Err(parse_error(format!(
                "expected `method <name>`, but found '{}'",
                line
            )));
        }
        match keyword {
            "method" => {
                return Err(parse_error(String::from(
                    "previous method is missing its `end`",
                )))
            }
            "end" if rest.is_empty() => {
                if let Some(parser) = current.take() {
                    methods.push(parser.finish().map_err(parse_error)?);
                }
            }
            _ => {
                if let Some(parser) = current.as_mut() {
                    parser.parse_line(line).map_err(parse_error)?;
                }
            }
        }
    }

    match current {
        Some(parser) => Err(Error::Parse {
            line: source.lines().count(),
            message: format!("method '{}' is missing its `end`", parser.method.name),
        }),
        None => Ok(methods),
    }
}

/// Render methods in the same format [`parse_listing`] accepts
pub fn render_listing(methods: &[Method]) -> String {
    methods
        .iter()
        .map(|method| method.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "method {}", self.name)?;
        for (_, node) in &self.code.instructions {
            let indent = if node.as_label().is_some() { "  " } else { "    " };
            writeln!(f, "{}{}", indent, node)?;
        }
        for entry in &self.code.exception_table {
            writeln!(f, "  {}", entry)?;
        }
        writeln!(f, "end")
    }
}

struct MethodParser {
    method: Method,

    /// Labels by name, along with whether they have been placed yet
    labels: HashMap<String, (SynLabel, bool)>,

    /// Names in order of first mention (for deterministic error messages)
    label_names: Vec<String>,
}

impl MethodParser {
    fn new(name: &str) -> MethodParser {
        MethodParser {
            method: Method::new(name),
            labels: HashMap::new(),
            label_names: vec![],
        }
    }

    fn code(&mut self) -> &mut Code {
        &mut self.method.code
    }

    fn label(&mut self, name: &str) -> Result<SynLabel, String> {
        if let Some((label, _)) = self.labels.get(name) {
            return Ok(*label);
        }
        if !is_label_name(name) {
            return Err(format!("'{}' is not a valid label name", name));
        }
        let label = self.method.code.instructions.fresh_label();
        self.labels.insert(name.to_owned(), (label, false));
        self.label_names.push(name.to_owned());
        Ok(label)
    }

    fn parse_line(&mut self, line: &str) -> Result<(), String> {
        if let Some(name) = line.strip_suffix(':') {
            let label = self.label(name.trim())?;
            if let Some(entry) = self.labels.get_mut(name.trim()) {
                entry.1 = true;
            }
            self.code()
                .instructions
                .place_label(label)
                .map_err(|err| err.to_string())?;
            return Ok(());
        }

        if let Some(name) = line.strip_prefix('@') {
            let pseudo = PseudoInsn::from_name(name.trim())
                .ok_or_else(|| format!("unknown pseudo-instruction '{}'", name))?;
            self.code()
                .instructions
                .push(pseudo)
                .map_err(|err| err.to_string())?;
            return Ok(());
        }

        let (mnemonic, operand) = split_word(line);
        if mnemonic == "try" {
            let entry = self.parse_try(operand)?;
            self.code().exception_table.push(entry);
            return Ok(());
        }

        let insn = self.parse_instruction(mnemonic, operand)?;
        self.code()
            .instructions
            .push(insn)
            .map_err(|err| err.to_string())?;
        Ok(())
    }

    fn parse_try(&mut self, operands: &str) -> Result<ExceptionHandler, String> {
        let parts: Vec<&str> = operands.split_whitespace().collect();
        let (start, end, handler, catch_type) = match parts.as_slice() {
            [start, end, handler, catch_type] => (start, end, handler, catch_type),
            _ => {
                return Err(format!(
                    "`try` expects `<start> <end> <handler> <type|*>`, found '{}'",
                    operands
                ))
            }
        };
        let catch_type = match *catch_type {
            "*" => None,
            class => Some(BinaryName::from_string(class.to_owned())?),
        };
        Ok(ExceptionHandler {
            start: self.label(start)?,
            end: self.label(end)?,
            handler: self.label(handler)?,
            catch_type,
        })
    }

    fn parse_instruction(&mut self, mnemonic: &str, operand: &str) -> Result<Instruction, String> {
        use Instruction::*;

        let no_operand = |insn: Instruction| -> Result<Instruction, String> {
            if operand.is_empty() {
                Ok(insn)
            } else {
                Err(format!("`{}` does not take an operand", mnemonic))
            }
        };
        let local = || -> Result<u16, String> {
            operand
                .parse::<u16>()
                .map_err(|_| format!("`{}` expects a local index, found '{}'", mnemonic, operand))
        };
        let member = || -> Result<String, String> {
            if operand.is_empty() || operand.contains(char::is_whitespace) {
                Err(format!("`{}` expects a member reference", mnemonic))
            } else {
                Ok(operand.to_owned())
            }
        };
        let class = || BinaryName::from_string(operand.to_owned());

        Ok(match mnemonic {
            "nop" => no_operand(Nop)?,
            "aconst_null" => no_operand(AConstNull)?,
            "iconst" | "bipush" | "sipush" => IConst(operand.parse::<i32>().map_err(|_| {
                format!("`{}` expects an integer, found '{}'", mnemonic, operand)
            })?),
            "ldc" => Ldc(unescape_string(operand)?),
            "iload" => ILoad(local()?),
            "lload" => LLoad(local()?),
            "aload" => ALoad(local()?),
            "istore" => IStore(local()?),
            "lstore" => LStore(local()?),
            "astore" => AStore(local()?),
            "pop" => no_operand(Pop)?,
            "pop2" => no_operand(Pop2)?,
            "dup" => no_operand(Dup)?,
            "dup_x1" => no_operand(DupX1)?,
            "swap" => no_operand(Swap)?,
            "iadd" => no_operand(IAdd)?,
            "isub" => no_operand(ISub)?,
            "imul" => no_operand(IMul)?,
            "idiv" => no_operand(IDiv)?,
            "ineg" => no_operand(INeg)?,
            "getstatic" => GetStatic(member()?),
            "putstatic" => PutStatic(member()?),
            "getfield" => GetField(member()?),
            "putfield" => PutField(member()?),
            "invokevirtual" => Invoke(InvokeType::Virtual, member()?),
            "invokespecial" => Invoke(InvokeType::Special, member()?),
            "invokestatic" => Invoke(InvokeType::Static, member()?),
            "invokeinterface" => Invoke(InvokeType::Interface, member()?),
            "new" => New(class()?),
            "checkcast" => CheckCast(class()?),
            "instanceof" => InstanceOf(class()?),
            "monitorenter" => no_operand(MonitorEnter)?,
            "monitorexit" => no_operand(MonitorExit)?,
            "athrow" => no_operand(AThrow)?,
            "return" => no_operand(Return)?,
            "ireturn" => no_operand(IReturn)?,
            "areturn" => no_operand(AReturn)?,
            "goto" => Goto(self.label(operand)?),
            "ifnull" => IfNull(self.label(operand)?),
            "ifnonnull" => IfNonNull(self.label(operand)?),
            _ => match mnemonic
                .strip_prefix("if")
                .and_then(OrdComparison::from_suffix)
            {
                Some(comparison) => If(comparison, self.label(operand)?),
                None => return Err(format!("unknown instruction `{}`", mnemonic)),
            },
        })
    }

    fn finish(self) -> Result<Method, String> {
        let unplaced: Vec<&str> = self
            .label_names
            .iter()
            .filter(|name| !self.labels[name.as_str()].1)
            .map(|name| name.as_str())
            .collect();
        if unplaced.is_empty() {
            Ok(self.method)
        } else {
            Err(format!(
                "method '{}' refers to labels that are never placed: {}",
                self.method.name,
                unplaced.join(", ")
            ))
        }
    }
}

/// Split off the first whitespace-delimited word
fn split_word(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    }
}

/// Drop a trailing `#` comment (but not a `#` inside a string literal)
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..idx],
            _ => (),
        }
    }
    line
}

/// Inverse of [`escape_string`](super::escape_string)
fn unescape_string(quoted: &str) -> Result<String, String> {
    let bad_literal = || format!("`ldc` expects a quoted string, found '{}'", quoted);
    let inner = quoted
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(bad_literal)?;

    let mut string = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => string.push(chars.next().ok_or_else(bad_literal)?),
            '"' => return Err(bad_literal()),
            c => string.push(c),
        }
    }
    Ok(string)
}

fn is_label_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.')
}
