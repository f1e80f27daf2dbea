//! Intcode VM - CLI Entry Point
//!
//! Commands:
//! - `intcode run <program>` - Run a program, feeding it inputs
//! - `intcode disasm <program>` - Disassemble a program
//! - `intcode amplify <program> --phases ...` - Drive an amplifier chain or ring
//! - `intcode repair <program>` - Search for the noun/verb that yields a target
//! - `intcode test` - Built-in self test

use std::io::{BufRead, Write};

use clap::{ArgAction, Parser, Subcommand};
use intcode::{Vm, VmConfig, VmError, VmState, LogSink, PipelineError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "intcode")]
#[command(version = "0.1.0")]
#[command(about = "A resumable Intcode virtual machine")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the program file
        program: String,
        /// Input value (repeatable, consumed in order)
        #[arg(short, long = "input", allow_negative_numbers = true)]
        inputs: Vec<i64>,
        /// Maximum number of instructions to execute
        #[arg(short, long, default_value = "10000000")]
        max_steps: u64,
        /// Log every executed instruction
        #[arg(short, long)]
        trace: bool,
        /// Prompt on stdin whenever the program needs more input
        #[arg(long)]
        interactive: bool,
        /// Print the final machine state as JSON
        #[arg(long)]
        json: bool,
        /// Print final memory as program text
        #[arg(long)]
        dump: bool,
        /// Refuse to grow memory beyond this many cells
        #[arg(long)]
        memory_limit: Option<usize>,
    },
    /// Disassemble a program
    Disasm {
        /// Path to the program file
        program: String,
    },
    /// Run amplifiers wired in a chain or a feedback ring
    Amplify {
        /// Path to the program file
        program: String,
        /// Phase settings, one per amplifier
        #[arg(long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
        phases: Vec<i64>,
        /// Wire the last amplifier back into the first
        #[arg(long)]
        feedback: bool,
        /// Try every ordering of the phases and report the best signal
        #[arg(long)]
        search: bool,
        /// Log every executed instruction
        #[arg(short, long)]
        trace: bool,
    },
    /// Find the noun and verb that make the program leave `target` at address 0
    Repair {
        /// Path to the program file
        program: String,
        /// Value expected at address 0 after the run
        #[arg(long, default_value = "19690720", allow_negative_numbers = true)]
        target: i64,
    },
    /// Run the built-in self-test
    Test,
}

fn main() {
    let cli = Cli::parse();

    let trace = matches!(
        cli.command,
        Some(Commands::Run { trace: true, .. }) | Some(Commands::Amplify { trace: true, .. })
    );
    init_logging(cli.verbose, trace);

    match cli.command {
        Some(Commands::Run { program, inputs, max_steps, trace, interactive, json, dump, memory_limit }) => {
            let config = VmConfig { memory_limit };
            let options = RunOptions { max_steps, trace, interactive, json, dump };
            run_program(&program, inputs, config, options);
        }
        Some(Commands::Disasm { program }) => {
            disassemble_file(&program);
        }
        Some(Commands::Amplify { program, phases, feedback, search, trace }) => {
            amplify(&program, &phases, feedback, search, trace);
        }
        Some(Commands::Repair { program, target }) => {
            repair(&program, target);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("Intcode VM v0.1.0");
            println!("A resumable Intcode virtual machine");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn init_logging(verbose: u8, trace: bool) {
    let default = match verbose {
        _ if trace => "trace",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_or_exit(path: &str) -> Vec<i64> {
    match intcode::load_program(path) {
        Ok(program) => {
            tracing::info!(path, cells = program.len(), "loaded program");
            program
        }
        Err(e) => {
            eprintln!("❌ Failed to load program: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print the fault location and the memory around it, then exit.
fn report_fault(vm: &Vm, error: &VmError) -> ! {
    let ip = vm.ip();
    eprintln!("❌ VM fault at ip={}: {}", ip, error);
    eprintln!("   relative base: {}", vm.regs.relative_base);
    eprintln!("   steps executed: {}", vm.steps());
    for (addr, value) in vm.mem.dump(ip.saturating_sub(4), 12) {
        let marker = if addr == ip { ">" } else { " " };
        eprintln!("   {} {:04}: {}", marker, addr, value);
    }
    std::process::exit(1);
}

struct RunOptions {
    max_steps: u64,
    trace: bool,
    interactive: bool,
    json: bool,
    dump: bool,
}

fn run_program(path: &str, inputs: Vec<i64>, config: VmConfig, options: RunOptions) {
    let program = load_or_exit(path);

    let mut vm = Vm::with_config(&program, inputs, config);
    if options.trace {
        vm = vm.with_sink(Box::new(LogSink::new("vm")));
    }

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let budget = options.max_steps.saturating_sub(vm.steps());
        let state = match vm.resume_limited(budget) {
            Ok(state) => state,
            Err(e) => {
                for value in vm.drain_outputs() {
                    println!("{}", value);
                }
                report_fault(&vm, &e)
            }
        };

        for value in vm.drain_outputs() {
            println!("{}", value);
        }

        match state {
            VmState::Blocked if options.interactive => {
                print!("input> ");
                let _ = std::io::stdout().flush();
                match lines.next() {
                    Some(Ok(line)) => match line.trim().parse::<i64>() {
                        Ok(value) => vm.push_input([value]),
                        Err(_) => eprintln!("⚠️  Not an integer: {:?}", line.trim()),
                    },
                    _ => {
                        eprintln!("❌ Input closed while the program waits at ip={}", vm.ip());
                        std::process::exit(1);
                    }
                }
            }
            VmState::Blocked => {
                eprintln!(
                    "⚠️  Program is waiting for input at ip={}. Supply more with -i or use --interactive.",
                    vm.ip()
                );
                break;
            }
            VmState::Running => {
                eprintln!(
                    "⚠️  Reached max steps limit ({}). Use --max-steps to increase.",
                    options.max_steps
                );
                break;
            }
            VmState::Halted | VmState::Faulted => break,
        }
    }

    tracing::info!(steps = vm.steps(), state = ?vm.state(), "run finished");

    if options.dump {
        println!("{}", intcode::format_program(vm.mem.as_slice()));
    }

    if options.json {
        match serde_json::to_string_pretty(&vm.snapshot()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("❌ Failed to serialize state: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn disassemble_file(path: &str) {
    let program = load_or_exit(path);
    println!("{}", intcode::disassemble(&program));
}

fn run_amplifiers(
    program: &[i64],
    phases: &[i64],
    feedback: bool,
    trace: bool,
) -> Result<i64, PipelineError> {
    if !feedback {
        return intcode::run_chain(program, phases, intcode::pipeline::SEED_SIGNAL);
    }

    let engines = phases
        .iter()
        .enumerate()
        .map(|(i, &phase)| {
            let vm = Vm::new(program, [phase]);
            if trace {
                vm.with_sink(Box::new(LogSink::new(format!("amp{}", i))))
            } else {
                vm
            }
        })
        .collect();

    let mut ring = intcode::Ring::from_engines(engines)?;
    ring.push_seed(intcode::pipeline::SEED_SIGNAL);
    ring.run()
}

fn amplify(path: &str, phases: &[i64], feedback: bool, search: bool, trace: bool) {
    let program = load_or_exit(path);

    if !search {
        match run_amplifiers(&program, phases, feedback, trace) {
            Ok(signal) => println!("{}", signal),
            Err(e) => {
                eprintln!("❌ Amplifier error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let mut best: Option<(i64, Vec<i64>)> = None;
    for ordering in permutations(phases) {
        match run_amplifiers(&program, &ordering, feedback, trace) {
            Ok(signal) => {
                tracing::debug!(?ordering, signal, "candidate");
                if best.as_ref().map_or(true, |(b, _)| signal > *b) {
                    best = Some((signal, ordering));
                }
            }
            Err(e) => tracing::debug!(?ordering, error = %e, "candidate failed"),
        }
    }

    match best {
        Some((signal, ordering)) => {
            let ordering: Vec<String> = ordering.iter().map(i64::to_string).collect();
            println!("{} (phases {})", signal, ordering.join(","));
        }
        None => {
            eprintln!("❌ No phase ordering produced a signal");
            std::process::exit(1);
        }
    }
}

/// Every ordering of `items`.
fn permutations(items: &[i64]) -> Vec<Vec<i64>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }

    let mut result = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let first = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, first);
            result.push(tail);
        }
    }
    result
}

fn repair(path: &str, target: i64) {
    let program = load_or_exit(path);
    if program.len() < 3 {
        eprintln!("❌ Program needs at least 3 cells to patch noun and verb");
        std::process::exit(1);
    }

    for noun in 0..100 {
        for verb in 0..100 {
            let mut patched = program.clone();
            patched[1] = noun;
            patched[2] = verb;

            let mut vm = Vm::new(&patched, []);
            match vm.resume() {
                Ok(_) if vm.mem.as_slice()[0] == target => {
                    println!("noun={} verb={} answer={}", noun, verb, 100 * noun + verb);
                    return;
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(noun, verb, error = %e, "candidate faulted"),
            }
        }
    }

    eprintln!("❌ No noun/verb pair leaves {} at address 0", target);
    std::process::exit(1);
}

fn run_self_test() {
    use intcode::vm::decode::decode;
    use intcode::{Mode, Opcode, MemoryError};

    println!("━━━ Intcode Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;
    let mut check = |name: &str, ok: bool| {
        print!("{}... ", name);
        if ok {
            println!("✓");
            passed += 1;
        } else {
            println!("✗");
            failed += 1;
        }
    };

    // Test 1: Positional arithmetic
    let mut vm = Vm::new(&[1, 9, 10, 3, 2, 3, 11, 0, 99, 30, 40, 50], []);
    let ok = vm.resume() == Ok(VmState::Halted) && vm.mem.as_slice()[0] == 3500;
    check("Positional add/multiply", ok);

    // Test 2: Parameter modes
    let ok = decode(1002).map_or(false, |instr| {
        instr.opcode == Opcode::Mul
            && instr.operand_modes() == [Mode::Position, Mode::Immediate, Mode::Position]
    });
    check("Parameter mode decoding", ok);

    // Test 3: Relative mode quine
    let quine = [109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99];
    let mut vm = Vm::new(&quine, []);
    let ok = vm.resume().is_ok() && vm.drain_outputs() == quine;
    check("Relative mode self-reproduction", ok);

    // Test 4: Large numbers
    let mut vm = Vm::new(&[104, 1125899906842624, 99], []);
    let ok = vm.resume().is_ok() && vm.drain_outputs() == [1125899906842624];
    check("Large integer output", ok);

    // Test 5: Block and resume
    let mut vm = Vm::new(&[3, 5, 4, 5, 99, 0], []);
    let blocked = vm.resume() == Ok(VmState::Blocked) && vm.ip() == 0;
    vm.push_input([17]);
    let ok = blocked && vm.resume() == Ok(VmState::Halted) && vm.drain_outputs() == [17];
    check("Input block/resume", ok);

    // Test 6: Feedback loop
    let program = [
        3, 26, 1001, 26, -4, 26, 3, 27, 1002, 27, 2, 27, 1, 27, 26, 27, 4, 27, 1001, 28, -1, 28,
        1005, 28, 6, 99, 0, 0, 5,
    ];
    check(
        "Feedback loop (9,8,7,6,5)",
        intcode::run_feedback_loop(&program, &[9, 8, 7, 6, 5]) == Ok(139629729),
    );

    // Test 7: Memory growth
    let mut mem = intcode::Memory::new(&[]);
    let ok = mem.write(5000, 1).is_ok() && mem.read(4999) == Ok(0);
    check("Memory auto-growth", ok);

    // Test 8: Negative addresses
    let mut vm = Vm::new(&[204, -1, 99], []);
    let ok = vm.resume() == Err(VmError::Memory(MemoryError::InvalidAddress(-1)));
    check("Negative address rejected", ok);

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
