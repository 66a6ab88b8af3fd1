//! Demo driver: compile one expression to assembly text.
//!
//! Trees normally arrive from an upstream parser, which is out of scope for
//! the core; the small prefix-notation reader here stands in for it so the
//! compiler can be exercised from a shell:
//!
//! ```text
//! etcc "(+ (def x 5) 1)"
//! ```
//!
//! Forms: integers, identifiers, `(+ a b)`, `(- a b)`, `(== a b)`,
//! `(!= a b)`, `(< a b)`, `(> a b)`, `(decl x)`, `(def x e)` for
//! declare-and-assign, `(set x e)` for assignment to an existing variable.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use etcc::{CodeGen, Expr, ExprArena, Operator};

#[derive(ClapParser)]
#[command(name = "etcc", about = "Compile a prefix-notation expression to x86 assembly text")]
struct Cli {
    /// Expression to compile; read from stdin when absent.
    expr: Option<String>,

    /// Read the expression from a file instead.
    #[arg(short, long, conflicts_with = "expr")]
    file: Option<PathBuf>,

    /// Print session statistics to stderr after compiling.
    #[arg(long)]
    stats: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let source = match read_source(&cli) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let arena = ExprArena::new();
    let expr = match parse(&arena, &source) {
        Ok(expr) => expr,
        Err(err) => {
            eprintln!("parse error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut gen = CodeGen::new();
    if let Err(err) = gen.eval(expr).and_then(|value| gen.release(value)) {
        eprintln!("compile error: {err}");
        return ExitCode::FAILURE;
    }

    if cli.stats {
        eprint!("{}", gen.stats());
    }
    print!("{}", gen.program());
    ExitCode::SUCCESS
}

fn read_source(cli: &Cli) -> io::Result<String> {
    match (&cli.expr, &cli.file) {
        (Some(expr), _) => Ok(expr.clone()),
        (None, Some(path)) => fs::read_to_string(path),
        (None, None) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn parse<'a>(arena: &'a ExprArena, source: &str) -> Result<&'a Expr<'a>, String> {
    let spaced = source.replace('(', " ( ").replace(')', " ) ");
    let tokens: Vec<&str> = spaced.split_whitespace().collect();
    let mut pos = 0;
    let expr = parse_expr(arena, &tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err(format!("trailing input after expression: `{}`", tokens[pos]));
    }
    Ok(expr)
}

fn parse_expr<'a>(
    arena: &'a ExprArena,
    tokens: &[&str],
    pos: &mut usize,
) -> Result<&'a Expr<'a>, String> {
    match next(tokens, pos)? {
        "(" => {
            let head = next(tokens, pos)?;
            let expr = match head {
                "decl" => {
                    let name = ident(next(tokens, pos)?)?;
                    arena.variable(true, false, name, None)
                }
                "def" | "set" => {
                    let name = ident(next(tokens, pos)?)?;
                    let sub = parse_expr(arena, tokens, pos)?;
                    arena.variable(head == "def", true, name, Some(sub))
                }
                op => {
                    let op = operator(op)?;
                    let lhs = parse_expr(arena, tokens, pos)?;
                    let rhs = parse_expr(arena, tokens, pos)?;
                    arena.binary(op, lhs, rhs)
                }
            };
            match next(tokens, pos)? {
                ")" => Ok(expr),
                tok => Err(format!("expected `)`, found `{tok}`")),
            }
        }
        ")" => Err("unexpected `)`".to_string()),
        tok => {
            if let Ok(value) = tok.parse::<i32>() {
                Ok(arena.literal(value))
            } else {
                Ok(arena.variable(false, false, ident(tok)?, None))
            }
        }
    }
}

fn next<'t>(tokens: &[&'t str], pos: &mut usize) -> Result<&'t str, String> {
    let tok = tokens
        .get(*pos)
        .copied()
        .ok_or_else(|| "unexpected end of input".to_string())?;
    *pos += 1;
    Ok(tok)
}

fn ident(tok: &str) -> Result<&str, String> {
    let mut chars = tok.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(tok)
    } else {
        Err(format!("`{tok}` is not a valid identifier"))
    }
}

fn operator(tok: &str) -> Result<Operator, String> {
    match tok {
        "+" => Ok(Operator::Add),
        "-" => Ok(Operator::Sub),
        "==" => Ok(Operator::Eq),
        "!=" => Ok(Operator::Neq),
        "<" => Ok(Operator::Lt),
        ">" => Ok(Operator::Gt),
        other => Err(format!("unknown operator `{other}`")),
    }
}
