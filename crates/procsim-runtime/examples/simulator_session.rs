//! Scripted session against a simulated machine: boot, launch, minimize, resume, close,
//! shutdown. Prints a JSON snapshot after every step.
//!
//! Run with:
//!   cargo run -p procsim-runtime --example simulator_session
//!   cargo run -p procsim-runtime --example simulator_session -- 2048 100 4
//!   cargo run -p procsim-runtime --example simulator_session -- 2048 100 4 --exec
//!
//! With `--exec`, tasks are started from `PROCSIM_PROGRAM_DIR` (default `./build`);
//! otherwise every launch succeeds without spawning anything.

use std::thread;
use std::time::Duration;

use procsim_runtime::catalog::{boot_background_services, find_task};
use procsim_runtime::kernel::stubs::AlwaysLaunch;
use procsim_runtime::{Dispatcher, KernelError, Launcher, SystemConfig};

fn parse_args(args: &[String]) -> Result<(SystemConfig, bool), KernelError> {
    let exec = args.iter().any(|a| a == "--exec");
    let positional: Vec<String> = args.iter().filter(|a| *a != "--exec").cloned().collect();
    let config = if positional.is_empty() {
        SystemConfig::from_env()?
    } else {
        SystemConfig::from_arg_strings(&positional)?
    };
    Ok((config, exec))
}

fn print_snapshot(step: &str, dispatcher: &Dispatcher) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = dispatcher.snapshot();
    println!("== {step}");
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn settle() {
    thread::sleep(Duration::from_millis(250));
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config, exec) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("{err}");
            eprintln!("Usage: simulator_session [<ram_mb> <disk_gb> <cores>] [--exec]");
            std::process::exit(1);
        }
    };

    let launcher: Box<dyn Launcher> = if exec {
        Box::new(config.command_launcher()?)
    } else {
        Box::new(AlwaysLaunch)
    };
    let dispatcher = config.build_dispatcher(launcher)?;
    dispatcher.start()?;

    let services = boot_background_services(&dispatcher);
    settle();
    print_snapshot("boot", &dispatcher)?;

    let notepad = find_task("notepad").ok_or("notepad missing from catalog")?;
    let pid = notepad.launch(&dispatcher)?;
    settle();
    print_snapshot("launch notepad", &dispatcher)?;

    if dispatcher.minimize_process(pid).is_ok() {
        print_snapshot("minimize notepad", &dispatcher)?;
        dispatcher.resume_process(pid)?;
        settle();
        print_snapshot("resume notepad", &dispatcher)?;
    }

    if let Some(&clock) = services.first() {
        match dispatcher.terminate_process(clock) {
            Ok(()) => print_snapshot("close clock", &dispatcher)?,
            Err(err) => eprintln!("close clock: {err}"),
        }
    }

    dispatcher.toggle_mode();
    let report = dispatcher.shutdown();
    println!("== shutdown");
    println!("{}", serde_json::to_string_pretty(&report)?);
    println!(
        "{}",
        serde_json::to_string_pretty(&dispatcher.resource_snapshot())?
    );
    Ok(())
}
