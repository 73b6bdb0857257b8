use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::z16::clock::DEFAULT_FREQUENCY_HZ;

/// Z16 disassembler and simulator.
#[derive(Parser, Debug)]
#[command(name = "z16sim", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the disassembly listing of a binary.
    Disasm {
        file: PathBuf,
    },
    /// Execute a binary and print its console output and final registers.
    Run {
        file: PathBuf,
        #[command(flatten)]
        sim: SimArgs,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct SimArgs {
    /// Clock frequency in Hz.
    #[arg(long, env = "Z16_FREQUENCY", default_value_t = DEFAULT_FREQUENCY_HZ)]
    pub frequency: f64,

    /// Stop after this many executed instructions.
    #[arg(long, env = "Z16_MAX_STEPS")]
    pub max_steps: Option<usize>,

    /// Run without the clock, as fast as possible.
    #[arg(long)]
    pub fast: bool,

    /// Line queued for the read syscalls; repeatable.
    #[arg(long = "input", value_name = "LINE")]
    pub input: Vec<String>,
}

/// Simulator settings, independent of where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub frequency_hz: f64,
    pub max_steps: Option<usize>,
    pub fast: bool,
    pub input: Vec<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            max_steps: None,
            fast: false,
            input: Vec::new(),
        }
    }
}

impl From<SimArgs> for SimConfig {
    fn from(a: SimArgs) -> Self {
        Self {
            frequency_hz: a.frequency,
            max_steps: a.max_steps,
            fast: a.fast,
            input: a.input,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_map_onto_config() {
        let cli = Cli::try_parse_from([
            "z16sim", "run", "prog.bin", "--frequency", "8", "--max-steps", "100", "--input", "hi", "--input", "42",
        ])
        .unwrap();
        let Command::Run { file, sim } = cli.command else { panic!("expected run") };
        assert_eq!(file, PathBuf::from("prog.bin"));
        let cfg = SimConfig::from(sim);
        assert_eq!(cfg.frequency_hz, 8.0);
        assert_eq!(cfg.max_steps, Some(100));
        assert_eq!(cfg.input, vec!["hi".to_string(), "42".to_string()]);
        assert!(!cfg.fast);
    }

    #[test]
    fn bare_run_matches_defaults() {
        let cli = Cli::try_parse_from(["z16sim", "run", "prog.bin", "--frequency", "2"]).unwrap();
        let Command::Run { sim, .. } = cli.command else { panic!("expected run") };
        let cfg = SimConfig::from(sim);
        assert_eq!(cfg, SimConfig { max_steps: cfg.max_steps, ..SimConfig::default() });
        assert!(Cli::try_parse_from(["z16sim", "run", "prog.bin", "--paused"]).is_err());
    }

    #[test]
    fn disasm_takes_a_file() {
        let cli = Cli::try_parse_from(["z16sim", "disasm", "a.bin"]).unwrap();
        assert!(matches!(cli.command, Command::Disasm { .. }));
        assert!(Cli::try_parse_from(["z16sim", "disasm"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
