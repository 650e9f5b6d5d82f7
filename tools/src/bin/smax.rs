//! # `smax`
//!
//! Solves a MaxSAT instance given in DIMACS or WDIMACS format and prints the
//! result in the MaxSAT evaluation output format. A plain CNF input is solved
//! as a MaxSAT instance where every clause is soft with weight 1.
//!
//! Exit codes: 30 if a model was printed, 20 if the instance is unsatisfiable,
//! 1 on interruption or input errors and 0 otherwise.

use std::{
    io::{self, IsTerminal, Write},
    path::PathBuf,
    process, thread,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::Parser;
use cpu_time::ProcessTime;
use rlimit::Resource;
use smax::{
    instances::fio::dimacs::{self, Instance},
    session::{Options, Outcome, ReturnCode},
};
use termcolor::{Buffer, BufferWriter, Color, ColorSpec, WriteColor};

const EXIT_MODEL: i32 = 30;
const EXIT_UNSAT: i32 = 20;
const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The (W)DIMACS input file. Reads from `stdin` if not given or `-`. With
    /// feature `compression`, `.gz`, `.bz2` and `.xz` files are decompressed.
    in_path: Option<PathBuf>,
    /// Budget of SAT oracle search steps for the whole search, negative for
    /// no limit
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    max_steps: i64,
    /// Limit on the process CPU time in seconds
    #[arg(long)]
    cpu_lim: Option<u64>,
    /// Limit on the virtual memory of the process in megabytes
    #[arg(long)]
    mem_lim: Option<u64>,
    /// Raise the default log level (repeatable). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(flatten)]
    color: concolor_clap::Color,
}

struct Cli {
    in_path: Option<PathBuf>,
    max_steps: i64,
    cpu_lim: Option<Duration>,
    mem_lim: Option<u64>,
    stdout: BufferWriter,
    stderr: BufferWriter,
}

impl Cli {
    fn init() -> Self {
        let args = Args::parse();
        let level = match args.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
        Self {
            in_path: args.in_path.filter(|path| path.as_os_str() != "-"),
            max_steps: args.max_steps,
            cpu_lim: args.cpu_lim.map(Duration::from_secs),
            mem_lim: args.mem_lim,
            stdout: BufferWriter::stdout(color_choice(
                args.color.color,
                io::stdout().is_terminal(),
            )),
            stderr: BufferWriter::stderr(color_choice(
                args.color.color,
                io::stderr().is_terminal(),
            )),
        }
    }

    fn read_instance(&self) -> anyhow::Result<Instance> {
        match &self.in_path {
            Some(path) => dimacs::parse_wdimacs_path(path, Options::default())
                .with_context(|| format!("failed to read {}", path.display())),
            None => {
                self.comment("reading from standard input, use '--help' for help")?;
                dimacs::parse_wdimacs(io::stdin().lock(), Options::default())
                    .context("failed to read standard input")
            }
        }
    }

    fn comment(&self, msg: &str) -> io::Result<()> {
        let mut buffer = self.stdout.buffer();
        writeln!(&mut buffer, "c {msg}")?;
        self.stdout.print(&buffer)
    }

    fn warning(&self, msg: &str) -> io::Result<()> {
        let mut buffer = self.stderr.buffer();
        Self::tag(&mut buffer, "warning", Color::Yellow)?;
        writeln!(&mut buffer, "{msg}")?;
        self.stderr.print(&buffer)
    }

    fn error(&self, err: &anyhow::Error) -> io::Result<()> {
        let mut buffer = self.stderr.buffer();
        Self::tag(&mut buffer, "error", Color::Red)?;
        writeln!(&mut buffer, "{err:#}")?;
        self.stderr.print(&buffer)
    }

    fn tag(buffer: &mut Buffer, tag: &str, color: Color) -> io::Result<()> {
        buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(color)))?;
        write!(buffer, "{tag}")?;
        buffer.reset()?;
        buffer.set_color(ColorSpec::new().set_bold(true))?;
        write!(buffer, ": ")?;
        buffer.reset()
    }

    /// Prints the solution lines and returns the exit code
    fn print_outcome(&self, outcome: &Outcome) -> io::Result<i32> {
        let mut buffer = self.stdout.buffer();
        let code = match outcome.code {
            ReturnCode::Optimal | ReturnCode::Satisfiable => {
                writeln!(&mut buffer, "s {}", outcome.code)?;
                // the cost line certifies optimality
                if outcome.code == ReturnCode::Optimal {
                    writeln!(&mut buffer, "o {}", outcome.cost)?;
                }
                write!(&mut buffer, "v")?;
                for lit in outcome.model.iter().skip(1) {
                    write!(&mut buffer, " {lit}")?;
                }
                writeln!(&mut buffer, " 0")?;
                EXIT_MODEL
            }
            ReturnCode::Unsatisfiable => {
                writeln!(&mut buffer, "s {}", outcome.code)?;
                EXIT_UNSAT
            }
            ReturnCode::Unknown => {
                writeln!(&mut buffer, "s {}", outcome.code)?;
                0
            }
            ReturnCode::Error => {
                writeln!(&mut buffer, "s {}", outcome.code)?;
                writeln!(&mut buffer, "c some error occurred, abort")?;
                0
            }
        };
        self.stdout.print(&buffer)?;
        Ok(code)
    }
}

fn color_choice(choice: concolor_clap::ColorChoice, is_terminal: bool) -> termcolor::ColorChoice {
    match choice {
        concolor_clap::ColorChoice::Always => termcolor::ColorChoice::Always,
        concolor_clap::ColorChoice::Never => termcolor::ColorChoice::Never,
        concolor_clap::ColorChoice::Auto => {
            if is_terminal {
                termcolor::ColorChoice::Auto
            } else {
                termcolor::ColorChoice::Never
            }
        }
    }
}

fn interrupted() -> ! {
    println!("\n*** INTERRUPTED ***");
    let _ = io::stdout().flush();
    process::exit(EXIT_FAILURE)
}

fn setup_interrupts(cpu_lim: Option<Duration>) -> anyhow::Result<()> {
    let mut signals = signal_hook::iterator::Signals::new([
        signal_hook::consts::SIGTERM,
        signal_hook::consts::SIGINT,
        signal_hook::consts::SIGXCPU,
    ])?;
    // Thread for catching incoming signals
    thread::spawn(move || {
        if signals.forever().next().is_some() {
            interrupted();
        }
    });
    if let Some(limit) = cpu_lim {
        // Watchdog on the CPU time of the whole process
        thread::spawn(move || loop {
            if ProcessTime::now().as_duration() >= limit {
                interrupted();
            }
            thread::sleep(Duration::from_millis(100));
        });
    }
    Ok(())
}

/// Lowers the soft limit on the address space to `mem_lim` megabytes. A hard
/// limit below the requested one is kept as it is.
fn limit_memory(mem_lim: u64) -> io::Result<()> {
    let limit = mem_lim.saturating_mul(1024 * 1024);
    let (_, hard) = Resource::AS.get()?;
    if hard == rlimit::INFINITY || limit < hard {
        Resource::AS.set(limit, hard)?;
    }
    Ok(())
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    setup_interrupts(cli.cpu_lim)?;
    if let Some(mem_lim) = cli.mem_lim {
        if let Err(err) = limit_memory(mem_lim) {
            log::debug!("setrlimit failed: {err}");
            cli.comment("WARNING! Could not set resource limit: virtual memory")?;
        }
    }

    let start = Instant::now();
    let mut inst = cli.read_instance()?;
    cli.comment(inst.solver.solver_name())?;
    cli.comment(&format!("parse time: {:.2} s", start.elapsed().as_secs_f32()))?;
    if let Some(formula) = inst.solver.formula() {
        cli.comment(&format!(
            "variables: {}, hard clauses: {}, soft clauses: {}",
            formula.n_vars(),
            formula.n_hards(),
            formula.n_softs()
        ))?;
    }
    if inst.solver.errno() != 0 {
        cli.warning(&format!(
            "solver session is in error state {}",
            inst.solver.errno()
        ))?;
    }

    let outcome = inst.solver.compute(inst.max_cost(), None, cli.max_steps);
    let code = cli.print_outcome(&outcome)?;
    cli.comment(&format!(
        "Stats: CPU {:.2} s, wall clock {:.2} s",
        ProcessTime::now().as_duration().as_secs_f32(),
        start.elapsed().as_secs_f32()
    ))?;
    Ok(code)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::init();
    let code = match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            cli.error(&err)?;
            EXIT_FAILURE
        }
    };
    io::stdout().flush()?;
    process::exit(code)
}
