//! Command-line front end (spec §6.5, "front-end example only" — no real
//! parser/compiler ships here; surface syntax and the bytecode format are
//! explicitly out of scope). This binary exists to demonstrate embedding
//! the runtime the way a host application would: build an `Engine`,
//! install the bundled native modules, and drive the call protocol.
//!
//! Grounded on the teacher's `bin/php.rs`: `clap::Parser` derive `Cli`,
//! `anyhow::Result` at the top level, a `rustyline` REPL, and an
//! `EngineBuilder` chain.

use std::path::PathBuf;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use pika_rt::binding::native::Binding;
use pika_rt::core::value::Value;
use pika_rt::engine::engine::{Engine, EngineBuilder};
use pika_rt::engine::error::PikaError;
use pika_rt::modules;
use pika_rt::object::package;
use pika_rt::vm::context::{self, Context};

#[derive(Parser)]
#[command(name = "pika")]
#[command(about = "Pika runtime front end", long_about = None)]
struct Cli {
    /// Script file to run
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,

    /// Argument(s) passed through to the running script
    #[arg(short = 'a', long = "arg")]
    args: Vec<String>,

    /// Additional module search path
    #[arg(short = 'p', long = "path")]
    path: Vec<PathBuf>,

    /// Print the runtime version and exit
    #[arg(short = 'v', long = "version")]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("pika {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut builder = EngineBuilder::new();
    for path in &cli.path {
        builder = builder.with_search_path(path.clone());
    }
    let mut engine = builder.build();
    install_bundled_modules(&mut engine);

    match cli.file {
        Some(path) => run_file(&mut engine, &path, &cli.args),
        None => run_repl(&mut engine),
    }
}

fn install_bundled_modules(engine: &mut Engine) {
    let world = engine.world;
    modules::date::install(engine, world);
    modules::random::install(engine, world);
    modules::regex::install(engine, world);
    modules::bytearray::install(engine, world);
}

/// Without a compiler, "running a file" means treating its contents as a
/// sequence of demo commands (see `eval_line`) rather than Pika source.
fn run_file(engine: &mut Engine, path: &PathBuf, script_args: &[String]) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(path)?;
    for (i, arg) in script_args.iter().enumerate() {
        let handle = engine.get_string(arg.as_bytes());
        engine.set_global(format!("arg{i}").as_bytes(), Value::Str(handle));
    }
    for line in contents.lines() {
        if let Err(e) = eval_line(engine, line) {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
    Ok(())
}

fn run_repl(engine: &mut Engine) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("pika> ") {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                match eval_line(engine, &line) {
                    Ok(Some(value)) => println!("{}", format_value(engine, value)),
                    Ok(None) => {}
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// A tiny demo command language: `print <int>` invokes the call protocol
/// against a native `print` function through a fresh Context, anything
/// else is reported as unrecognized (there is no compiler to fall back
/// to). This is enough to exercise the Engine/Context/call-protocol wiring
/// end to end without pretending to parse Pika source.
fn eval_line(engine: &mut Engine, line: &str) -> Result<Option<Value>, PikaError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let mut parts = line.splitn(2, ' ');
    let command = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").trim();

    match command {
        "print" => {
            let n: i64 = rest.parse().map_err(|_| PikaError::type_error("print expects an integer"))?;
            let func = demo_print_function(engine);
            let ctx_handle = context::create(engine);
            let mut ctx = Context::new(engine, ctx_handle);
            let result = ctx.call(func, &[Value::Int(n)], 1)?;
            Ok(result.into_iter().next())
        }
        _ => Err(PikaError::runtime(format!("unrecognized command: {command}"))),
    }
}

fn demo_print_function(engine: &mut Engine) -> pika_rt::core::value::Handle {
    if let Some(Value::Object(h)) = engine.get_global(b"__print") {
        return h;
    }
    let world = engine.world;
    pika_rt::binding::native::bind_package(
        engine,
        world,
        &[Binding::Method("__print", native_print)],
    );
    match package::get_own_slot(&engine.heap, world, engine.interner.find(b"__print").expect("just interned")) {
        Some(Value::Object(h)) => h,
        _ => unreachable!("just installed __print"),
    }
}

fn native_print(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let value = args.first().copied().unwrap_or(Value::Null);
    let text = match value {
        Value::Int(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => "<object>".to_string(),
    };
    ctx.engine.output.write(text.as_bytes())?;
    ctx.engine.output.write(b"\n")?;
    Ok(value)
}

fn format_value(engine: &Engine, value: Value) -> String {
    match value {
        Value::Int(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Str(h) => match engine.heap.get(h) {
            pika_rt::core::heap::HeapObj::Str(s) => String::from_utf8_lossy(&s.bytes).into_owned(),
            _ => String::new(),
        },
        _ => "<object>".to_string(),
    }
}
