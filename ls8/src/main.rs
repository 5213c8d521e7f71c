// Copyright (C) 2024 Ethan Uppal. All rights reserved.

use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use log::LevelFilter;
use ls8::{program::EncodedProgram, vm::VM};
use simple_logger::SimpleLogger;

/// Runs an LS-8 program listing
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Program listing with one binary byte per line
    path: PathBuf,

    /// Log the machine state before every instruction
    #[arg(long)]
    trace: bool,

    /// Fail if the program has not halted after this many instructions
    #[arg(long)]
    max_steps: Option<u64>,

    /// Print the decoded program instead of running it
    #[arg(long)]
    disassemble: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    SimpleLogger::new()
        .with_level(if args.trace {
            LevelFilter::Trace
        } else {
            LevelFilter::Warn
        })
        .init()?;

    let path = args.path.display();
    let source = fs::read_to_string(&args.path)
        .wrap_err_with(|| format!("failed to read `{}`", path))?;
    let program = EncodedProgram::parse(&source)
        .wrap_err_with(|| format!("failed to load `{}`", path))?;

    if args.disassemble {
        print!("{}", program.listing());
        return Ok(());
    }

    let mut vm = VM::from_image(&program.body, io::stdout().lock())?;
    vm.set_max_steps(args.max_steps);
    let result = vm.run();
    let pc = vm.pc();
    vm.into_output().flush()?;

    result.wrap_err_with(|| format!("`{}` stopped at address {:#04x}", path, pc))
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use crate::Args;

    #[test]
    fn command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_flags() {
        let args = Args::try_parse_from([
            "ls8",
            "--trace",
            "--max-steps",
            "50",
            "programs/mult.ls8",
        ])
        .expect("arguments should parse");

        assert!(args.trace);
        assert!(!args.disassemble);
        assert_eq!(Some(50), args.max_steps);
        assert_eq!("programs/mult.ls8", args.path.to_string_lossy());
    }

    #[test]
    fn rejects_bad_step_limits() {
        assert!(
            Args::try_parse_from(["ls8", "--max-steps", "lots", "a.ls8"])
                .is_err()
        );
        assert!(Args::try_parse_from(["ls8", "--disassemble"]).is_err());
    }
}
