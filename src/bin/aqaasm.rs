use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use judge_core::interpreter::{Machine, NUM_MEM};

/// Standalone register-machine evaluator, exposing the same CLI contract as
/// the AQA assembly interpreter bundled into AQAASM sandboxes.
#[derive(Parser, Debug)]
#[command(about)]
struct CliArgs {
    /// Path to the assembly program.
    program: PathBuf,

    /// Memory addresses to seed from successive stdin lines, in order.
    /// Falls back to seeding address 100 from a single stdin line when
    /// omitted.
    #[arg(short = 'i', num_args = 0..)]
    inputs: Vec<usize>,

    /// Memory addresses to print after halt, in order. Falls back to
    /// printing address 101 alone when omitted.
    #[arg(short = 'o', num_args = 0..)]
    outputs: Vec<usize>,
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    let code = std::fs::read_to_string(&args.program)
        .with_context(|| format!("reading {:?}", args.program))?;

    let mut machine = Machine::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    let seed_addrs: Vec<usize> = if args.inputs.is_empty() {
        vec![100]
    } else {
        args.inputs.clone()
    };
    for addr in seed_addrs {
        if addr >= NUM_MEM {
            bail!("memory address {addr} out of range");
        }
        let line = lines
            .next()
            .context("expected more lines of input on stdin")??;
        machine.memory[addr] = parse_byte(&line)?;
    }

    machine.run(&code)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let print_addrs: Vec<usize> = if args.outputs.is_empty() {
        vec![101]
    } else {
        args.outputs.clone()
    };
    for addr in print_addrs {
        if addr >= NUM_MEM {
            bail!("memory address {addr} out of range");
        }
        writeln!(out, "{}", machine.memory[addr])?;
    }
    Ok(())
}

fn parse_byte(line: &str) -> Result<u8> {
    let value: i64 = line
        .trim()
        .parse()
        .with_context(|| format!("parsing stdin line {line:?} as an integer"))?;
    Ok(value.rem_euclid(256) as u8)
}
