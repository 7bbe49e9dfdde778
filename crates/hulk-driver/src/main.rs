//! `hulk-sem-check` — loads a `hulk_ast::Program` serialized as JSON and runs
//! it through `hulk_sem::check`, printing every diagnostic it produces.
//!
//! There is no lexer or parser in this workspace (spec.md's Non-goals), so
//! JSON is the only way to hand this binary a program; it exists to drive
//! the semantic pipeline end-to-end, not as a user-facing compiler frontend.
//!
//! Usage: `hulk-sem-check <program.json> [--emit-context]`

use std::path::PathBuf;

use anyhow::{Context as _, Result};

struct Args {
    input: PathBuf,
    emit_context: bool,
}

fn parse_args() -> Result<Args> {
    let mut input = None;
    let mut emit_context = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--emit-context" => emit_context = true,
            other => input = Some(PathBuf::from(other)),
        }
    }
    let input = input.context("usage: hulk-sem-check <program.json> [--emit-context]")?;
    Ok(Args { input, emit_context })
}

fn real_main() -> Result<()> {
    let args = parse_args()?;

    let json = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let program: hulk_ast::Program = serde_json::from_str(&json)
        .with_context(|| format!("parsing {} as a hulk_ast::Program", args.input.display()))?;

    let (ctx, scope) = hulk_driver::seed();
    let (_program, ctx, _scope, errors) = hulk_sem::check(program, ctx, scope);

    if args.emit_context {
        for id in ctx.type_ids() {
            log::debug!("type: {:?}", ctx.type_(id));
        }
    }

    if errors.is_empty() {
        println!("ok: no diagnostics");
        return Ok(());
    }

    for line in &errors {
        eprintln!("{line}");
    }
    anyhow::bail!("{} diagnostic(s)", errors.len());
}

fn main() {
    env_logger::init();
    if let Err(e) = real_main() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
