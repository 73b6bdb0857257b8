use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, info};

use z16sim::config::{Cli, Command, SimConfig};
use z16sim::z16::{disassemble, Clock, ConsoleHost, Machine, MemoryImage, SharedMachine};

fn load(path: &Path) -> Result<Arc<MemoryImage>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let image = MemoryImage::from_bytes(&bytes).with_context(|| format!("loading {}", path.display()))?;
    info!(bytes = image.loaded_len(), "loaded {}", path.display());
    Ok(Arc::new(image))
}

fn print_output(machine: &SharedMachine<ConsoleHost>) -> Result<()> {
    let out = machine
        .lock()
        .map_err(|_| anyhow::anyhow!("machine state poisoned"))?
        .host_mut()
        .take_output();
    print!("{out}");
    Ok(())
}

fn print_summary(machine: &Machine<ConsoleHost>) {
    let state = machine.state();
    println!();
    for line in machine.registers().dump() {
        println!("{line}");
    }
    println!("pc = {}{}", state.pc, if state.halted { " (halted)" } else { "" });
}

async fn run_clocked(image: Arc<MemoryImage>, cfg: SimConfig) -> Result<()> {
    let mut machine = Machine::from_image(image, ConsoleHost::with_input(cfg.input.clone()));
    machine.resume();
    let machine: SharedMachine<ConsoleHost> = Arc::new(Mutex::new(machine));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut clock = Clock::start_limited(machine.clone(), cfg.frequency_hz, cfg.max_steps, move |tick| {
        let _ = tx.send(tick);
    })?;

    // the sender lives in the clock task, so this ends when the clock does
    while let Some(tick) = rx.recv().await {
        debug!(clock = tick.phase.level(), pc = tick.state.pc, "tick");
        print_output(&machine)?;
    }
    clock.stop().await;
    print_output(&machine)?;

    let m = machine.lock().map_err(|_| anyhow::anyhow!("machine state poisoned"))?;
    print_summary(&m);
    Ok(())
}

fn run_fast(image: Arc<MemoryImage>, cfg: SimConfig) {
    let mut machine = Machine::from_image(image, ConsoleHost::with_input(cfg.input));
    machine.resume();
    let steps = machine.run(cfg.max_steps.unwrap_or(usize::MAX));
    info!(steps, "run finished");
    print!("{}", machine.host_mut().take_output());
    print_summary(&machine);
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("Z16_LOG").unwrap_or_else(|_| "z16sim=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Disasm { file } => {
            let image = load(&file)?;
            print!("{}", disassemble(&image.program_words()));
        }
        Command::Run { file, sim } => {
            let image = load(&file)?;
            let cfg = SimConfig::from(sim);
            if cfg.fast {
                run_fast(image, cfg);
            } else {
                run_clocked(image, cfg).await?;
            }
        }
    }
    Ok(())
}
