//! Symbolic instructions
//!
//! The representation is deliberately small and symbolic: constant pool references are kept as
//! plain strings (eg. `java/io/PrintStream.println(I)V`) since nothing here needs to resolve
//! them, and several related opcodes get folded into one variant:
//!
//!   - `IConst` covers `iconst_<n>`, `bipush`, `sipush`, and integer `ldc`
//!   - the loads and stores cover their `<op>_<n>` and `wide` forms
//!   - `If` covers all of the single-operand integer comparisons against zero

use super::SynLabel;
use crate::jvm::BinaryName;
use std::fmt;

/// Type of method invocation
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InvokeType {
    Virtual,
    Special,
    Static,
    Interface,
}

/// Comparison against zero used by `if<cond>`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OrdComparison {
    EQ,
    NE,
    LT,
    GE,
    GT,
    LE,
}

impl OrdComparison {
    /// Suffix used in the mnemonic (eg. `eq` in `ifeq`)
    pub fn suffix(self) -> &'static str {
        match self {
            OrdComparison::EQ => "eq",
            OrdComparison::NE => "ne",
            OrdComparison::LT => "lt",
            OrdComparison::GE => "ge",
            OrdComparison::GT => "gt",
            OrdComparison::LE => "le",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<OrdComparison> {
        Some(match suffix {
            "eq" => OrdComparison::EQ,
            "ne" => OrdComparison::NE,
            "lt" => OrdComparison::LT,
            "ge" => OrdComparison::GE,
            "gt" => OrdComparison::GT,
            "le" => OrdComparison::LE,
            _ => return None,
        })
    }
}

/// JVM bytecode instruction
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    Nop,
    AConstNull,
    IConst(i32),
    Ldc(String), // string constants only
    ILoad(u16),
    LLoad(u16),
    ALoad(u16),
    IStore(u16),
    LStore(u16),
    AStore(u16),
    Pop,
    Pop2,
    Dup,
    DupX1,
    Swap,
    IAdd,
    ISub,
    IMul,
    IDiv,
    INeg,
    GetStatic(String),
    PutStatic(String),
    GetField(String),
    PutField(String),
    Invoke(InvokeType, String),
    New(BinaryName),
    CheckCast(BinaryName),
    InstanceOf(BinaryName),
    MonitorEnter,
    MonitorExit,
    AThrow,
    Return,
    IReturn,
    AReturn,
    Goto(SynLabel),
    If(OrdComparison, SynLabel),
    IfNull(SynLabel),
    IfNonNull(SynLabel),
}

impl Instruction {
    /// Opcode name, without operands
    pub fn mnemonic(&self) -> &'static str {
        use Instruction::*;
        match self {
            Nop => "nop",
            AConstNull => "aconst_null",
            IConst(_) => "iconst",
            Ldc(_) => "ldc",
            ILoad(_) => "iload",
            LLoad(_) => "lload",
            ALoad(_) => "aload",
            IStore(_) => "istore",
            LStore(_) => "lstore",
            AStore(_) => "astore",
            Pop => "pop",
            Pop2 => "pop2",
            Dup => "dup",
            DupX1 => "dup_x1",
            Swap => "swap",
            IAdd => "iadd",
            ISub => "isub",
            IMul => "imul",
            IDiv => "idiv",
            INeg => "ineg",
            GetStatic(_) => "getstatic",
            PutStatic(_) => "putstatic",
            GetField(_) => "getfield",
            PutField(_) => "putfield",
            Invoke(InvokeType::Virtual, _) => "invokevirtual",
            Invoke(InvokeType::Special, _) => "invokespecial",
            Invoke(InvokeType::Static, _) => "invokestatic",
            Invoke(InvokeType::Interface, _) => "invokeinterface",
            New(_) => "new",
            CheckCast(_) => "checkcast",
            InstanceOf(_) => "instanceof",
            MonitorEnter => "monitorenter",
            MonitorExit => "monitorexit",
            AThrow => "athrow",
            Return => "return",
            IReturn => "ireturn",
            AReturn => "areturn",
            Goto(_) => "goto",
            If(OrdComparison::EQ, _) => "ifeq",
            If(OrdComparison::NE, _) => "ifne",
            If(OrdComparison::LT, _) => "iflt",
            If(OrdComparison::GE, _) => "ifge",
            If(OrdComparison::GT, _) => "ifgt",
            If(OrdComparison::LE, _) => "ifle",
            IfNull(_) => "ifnull",
            IfNonNull(_) => "ifnonnull",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        f.write_str(self.mnemonic())?;
        match self {
            IConst(value) => write!(f, " {}", value),
            Ldc(string) => write!(f, " {}", escape_string(string)),
            ILoad(idx) | LLoad(idx) | ALoad(idx) | IStore(idx) | LStore(idx) | AStore(idx) => {
                write!(f, " {}", idx)
            }
            GetStatic(member) | PutStatic(member) | GetField(member) | PutField(member)
            | Invoke(_, member) => write!(f, " {}", member),
            New(class) | CheckCast(class) | InstanceOf(class) => write!(f, " {}", class),
            Goto(target) | If(_, target) | IfNull(target) | IfNonNull(target) => {
                write!(f, " {:?}", target)
            }
            _ => Ok(()),
        }
    }
}

/// Quote a string constant, escaping `"` and `\`
pub fn escape_string(string: &str) -> String {
    let mut quoted = String::with_capacity(string.len() + 2);
    quoted.push('"');
    for c in string.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Zero-operand instructions that exist only for later compiler passes
///
/// These never reach a class file: stack lowering replaces them with real spill and fill
/// sequences.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PseudoInsn {
    /// Spill whatever is on the operand stack before a protected region is entered
    SaveStackBeforeTry,

    /// Reload the spilled operand stack once inside a region or handler
    RestoreStackInHandler,
}

impl PseudoInsn {
    pub fn name(self) -> &'static str {
        match self {
            PseudoInsn::SaveStackBeforeTry => "save_stack_before_try",
            PseudoInsn::RestoreStackInHandler => "restore_stack_in_handler",
        }
    }

    pub fn from_name(name: &str) -> Option<PseudoInsn> {
        match name {
            "save_stack_before_try" => Some(PseudoInsn::SaveStackBeforeTry),
            "restore_stack_in_handler" => Some(PseudoInsn::RestoreStackInHandler),
            _ => None,
        }
    }
}

impl fmt::Display for PseudoInsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name())
    }
}

/// Element of an instruction stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Insn(Instruction),
    Label(SynLabel),
    Pseudo(PseudoInsn),
}

impl Node {
    pub fn as_label(&self) -> Option<SynLabel> {
        match self {
            Node::Label(label) => Some(*label),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Insn(insn) => fmt::Display::fmt(insn, f),
            Node::Label(label) => write!(f, "{:?}:", label),
            Node::Pseudo(pseudo) => fmt::Display::fmt(pseudo, f),
        }
    }
}

impl From<Instruction> for Node {
    fn from(insn: Instruction) -> Node {
        Node::Insn(insn)
    }
}

impl From<PseudoInsn> for Node {
    fn from(pseudo: PseudoInsn) -> Node {
        Node::Pseudo(pseudo)
    }
}
