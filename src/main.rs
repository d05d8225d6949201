// Javelin: step-through Java VM emulator with reverse execution

use std::fs;
use std::path::Path;

use javelin::interpreter::state::VmStatus;
use javelin::Simulator;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        let program_name = args.first().map(|s| s.as_str()).unwrap_or("javelin");
        eprintln!("Error: No input file provided");
        eprintln!();
        eprintln!("Usage: {} <file.java>", program_name);
        eprintln!();
        eprintln!("Compiles the given Java source, runs it to completion under");
        eprintln!("the step cap, and prints the program's output.");
        std::process::exit(1);
    }

    let source_file = &args[1];
    if !Path::new(source_file).exists() {
        eprintln!("Error: File '{}' not found", source_file);
        std::process::exit(1);
    }

    let source = match fs::read_to_string(source_file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Error reading '{}': {}", source_file, err);
            std::process::exit(1);
        }
    };

    eprintln!("Compiling {}...", source_file);
    let program = match javelin::compile(&source) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };
    eprintln!(
        "Compiled {} class(es), {} instructions. Entry point: {}.main",
        program.classes.len(),
        program.instructions.len(),
        program.main_class
    );

    let mut simulator = Simulator::new(program);
    simulator.run();

    let state = simulator.get_state();
    for line in &state.output.lines {
        println!("{}", line);
    }

    match state.status {
        VmStatus::Completed => {
            eprintln!(
                "Completed after {} steps ({} thread(s)).",
                state.step_number,
                state.threads.len()
            );
        }
        VmStatus::Error => {
            eprintln!(
                "Runtime error after {} steps: {}",
                state.step_number,
                state.error.as_deref().unwrap_or("unknown")
            );
            std::process::exit(1);
        }
        _ => {
            eprintln!(
                "Stopped after {} steps (step cap or pause); status {:?}.",
                state.step_number, state.status
            );
        }
    }
}
