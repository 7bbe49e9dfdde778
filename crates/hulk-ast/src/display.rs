//! `Display` impls for the AST, used by `hulk-driver`'s trace logging and by
//! test assertions that want a readable rendering rather than `{:#?}`.

use crate::{BinaryOpKind, CondBranch, Decl, Expr, ExprKind, Member, Program, TypeDecl, UnaryOpKind};
use std::fmt;

impl fmt::Display for UnaryOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOpKind::Neg => write!(f, "!"),
            UnaryOpKind::ArithNeg => write!(f, "-"),
        }
    }
}

impl fmt::Display for BinaryOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinaryOpKind::Logic => "logic",
            BinaryOpKind::Comparison => "cmp",
            BinaryOpKind::Arith => "arith",
            BinaryOpKind::Power => "pow",
            BinaryOpKind::Concat => "concat",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Number(n) => write!(f, "{n}"),
            ExprKind::Str(s) => write!(f, "{s:?}"),
            ExprKind::Boolean(b) => write!(f, "{b}"),
            ExprKind::Identifier { name, .. } => write!(f, "{name}"),
            ExprKind::TypeInstancing { type_name, args } => {
                write!(f, "new {type_name}(")?;
                write_comma_sep(f, args)?;
                write!(f, ")")
            }
            ExprKind::Vector { items } => {
                write!(f, "[")?;
                write_comma_sep(f, items)?;
                write!(f, "]")
            }
            ExprKind::MappedIterable { map_expr, item_id, iterable, .. } => {
                write!(f, "[{map_expr} || {item_id} in {iterable}]")
            }
            ExprKind::MemberAccessing { target, member } => write!(f, "{target}.{member}"),
            ExprKind::FunctionCall { target, args } => {
                write!(f, "{target}(")?;
                write_comma_sep(f, args)?;
                write!(f, ")")
            }
            ExprKind::Indexing { target, index } => write!(f, "{target}[{index}]"),
            ExprKind::Mutation { target, value } => write!(f, "{target} := {value}"),
            ExprKind::Downcasting { target, type_name } => write!(f, "{target} as {type_name}"),
            ExprKind::UnaryOp { kind, operand } => write!(f, "{kind}{operand}"),
            ExprKind::BinaryOp { operator, left, right, .. } => {
                write!(f, "({left} {operator} {right})")
            }
            ExprKind::TypeMatching { target, type_name } => write!(f, "{target} is {type_name}"),
            ExprKind::Block { exprs } => {
                write!(f, "{{ ")?;
                for e in exprs {
                    write!(f, "{e}; ")?;
                }
                write!(f, "}}")
            }
            ExprKind::Loop { condition, body, .. } => write!(f, "while ({condition}) {body}"),
            ExprKind::Iterator { item_id, iterable, body, .. } => {
                write!(f, "for ({item_id} in {iterable}) {body}")
            }
            ExprKind::Conditional { branches, fallback } => {
                write_conditional(f, branches, fallback)
            }
            ExprKind::LetExpr { name, value, body, .. } => {
                write!(f, "let {name} = {value} in {body}")
            }
            ExprKind::MultipleLetExpr { bindings, body } => {
                write!(f, "let ")?;
                for (i, b) in bindings.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", b.name, b.value)?;
                }
                write!(f, " in {body}")
            }
        }
    }
}

fn write_comma_sep(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_conditional(f: &mut fmt::Formatter<'_>, branches: &[CondBranch], fallback: &Expr) -> fmt::Result {
    for (i, branch) in branches.iter().enumerate() {
        let kw = if i == 0 { "if" } else { "elif" };
        write!(f, "{kw} ({}) {} ", branch.condition, branch.branch)?;
    }
    write!(f, "else {fallback}")
}

impl fmt::Display for TypeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type {}", self.name)?;
        if let Some(parent) = self.parent {
            write!(f, " inherits {parent}")?;
        }
        write!(f, " {{ ")?;
        for member in &self.members {
            match member {
                Member::Attribute { name, init, .. } => write!(f, "{name} = {init}; ")?,
                Member::Method(func) => write!(f, "{}(...); ", func.name)?,
            }
        }
        write!(f, "}}")
    }
}

impl fmt::Display for Decl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decl::Type(t) => write!(f, "{t}"),
            Decl::Protocol(p) => write!(f, "protocol {} {{ ... }}", p.name),
            Decl::Function(func) => write!(f, "function {}(...) {}", func.name, func.body),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for decl in &self.decls {
            writeln!(f, "{decl}")?;
        }
        write!(f, "{}", self.expr)
    }
}
