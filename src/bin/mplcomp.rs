//! Compile MPL definitions into C, C++, CLI and documentation artifacts.
//!
//! Usage:
//!   mplcomp [-m MODE] [-o OUTDIR] [-I DIR]... [--dump] [--at-tags] FILE.mpl
//!
//! Nothing is written unless parsing, wrap-up, doc conversion and checking all succeed.
//! Set `RUST_LOG=mplc=debug` for a trace of the passes.

use anyhow::Context;
use clap::Parser;
use mplc::{backend, parse_file, AtCommandTags, CodegenMode, Compiler, LocalTagHandler, NoLocalTags};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mplcomp")]
#[command(about = "Compile MPL parameter sets and categories")]
#[command(version)]
struct Args {
    /// Output kind: mpl, cli, api, doxygen, latex or deja
    #[arg(short, long, default_value = "mpl")]
    mode: CodegenMode,

    /// Directory the artifacts are written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Additional include directory (repeatable)
    #[arg(short = 'I', value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Print the resolved object graph to stdout instead of emitting artifacts
    #[arg(long)]
    dump: bool,

    /// Accept `@at` documentation tags
    #[arg(long)]
    at_tags: bool,

    /// MPL source file
    file: PathBuf,
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut compiler = Compiler::new();
    compiler.mode = args.mode;
    parse_file(&mut compiler, &args.file, &args.include)?;
    let hooks: &dyn LocalTagHandler = if args.at_tags { &AtCommandTags } else { &NoLocalTags };
    compiler.finish(hooks)?;
    if args.dump {
        print!("{}", compiler.dump());
        return Ok(());
    }
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    let written = backend::write_all(&compiler, args.mode, &args.out_dir)?;
    log::info!("{} file(s) written for mode {}", written.len(), args.mode);
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
