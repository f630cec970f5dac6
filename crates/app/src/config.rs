//! Configuration for the ofdm-sim application.
//!
//! Parses command-line arguments and resolves defaults, including a
//! time-based seed when none is given. The resolved seed is printed with
//! the configuration so any run can be reproduced.
//!
//! # Philosophy
//!
//! The tool should work with ZERO arguments: it then sends the demo
//! message through a default-noise channel and prints every layer.

use clap::{Args, Parser, Subcommand};
use ofdm_sim_core::{
    channel::DEFAULT_NOISE_STD, modem::DEFAULT_BLOCK_SIZE, SharedKey, StackConfig,
};

/// Message sent when `--message` is not given.
pub const DEFAULT_MESSAGE: &str = "Hello Bob! OFDM is cool.";

/// Seven-layer stack simulator with an OFDM physical layer
#[derive(Parser, Debug)]
#[command(name = "ofdm-sim")]
#[command(about = "Seven-layer stack simulator with an OFDM physical layer")]
#[command(version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Print resolved configuration
    #[arg(long, global = true)]
    pub print_config: bool,

    /// Don't print metrics summary
    #[arg(long, global = true)]
    pub no_metrics: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one message and show the payload at every layer
    Send(SendArgs),
    /// Measure bit-error rate across noise levels
    Sweep(SweepArgs),
}

/// Physical-layer options shared by both subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct LinkArgs {
    /// Subcarriers per OFDM block
    #[arg(long)]
    pub block_size: Option<usize>,

    /// Random seed for channel noise and generated messages
    #[arg(long)]
    pub seed: Option<u64>,

    /// Verify frame tags and mark framing failures
    #[arg(long)]
    pub strict_framing: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SendArgs {
    /// Plaintext to send
    #[arg(short, long)]
    pub message: Option<String>,

    /// Channel noise standard deviation
    #[arg(long)]
    pub noise_std: Option<f64>,

    /// Shared key as 64 hex characters (default: generate)
    #[arg(long)]
    pub key: Option<String>,

    /// Give the receiver a different key than the sender
    #[arg(long)]
    pub wrong_key: bool,

    #[command(flatten)]
    pub link: LinkArgs,
}

#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    /// Comma-separated noise levels
    #[arg(long, value_delimiter = ',', default_values_t = [0.0, 0.02, 0.05, 0.1, 0.2, 0.4])]
    pub levels: Vec<f64>,

    /// Messages per noise level
    #[arg(long, default_value_t = 50)]
    pub trials: usize,

    /// Characters per generated message
    #[arg(long, default_value_t = 64)]
    pub message_len: usize,

    #[command(flatten)]
    pub link: LinkArgs,
}

/// What the run does, with every default resolved.
#[derive(Debug, Clone)]
pub enum Mode {
    Send {
        message: String,
        key: Option<SharedKey>,
        wrong_key: bool,
    },
    Sweep {
        levels: Vec<f64>,
        trials: usize,
        message_len: usize,
    },
}

/// Complete configuration for a run.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,

    /// Stack settings (for a sweep, `noise_std` is replaced per level)
    pub stack: StackConfig,

    /// Resolved seed
    pub seed: u64,

    pub log_level: String,

    /// Whether to print detailed config
    pub print_config: bool,

    /// Whether to print detailed metrics summary
    pub print_metrics: bool,
}

impl Config {
    /// Resolve parsed arguments into a configuration.
    ///
    /// If no seed is provided, one is derived from the current time.
    pub fn from_cli(cli: Cli) -> Result<Self, String> {
        let command = cli
            .command
            .unwrap_or_else(|| Command::Send(SendArgs::default()));

        let (mode, link, noise_std) = match command {
            Command::Send(args) => {
                let key = args
                    .key
                    .as_deref()
                    .map(SharedKey::from_hex)
                    .transpose()
                    .map_err(|e| format!("--key: {e}"))?;
                let mode = Mode::Send {
                    message: args.message.unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
                    key,
                    wrong_key: args.wrong_key,
                };
                (mode, args.link, args.noise_std.unwrap_or(DEFAULT_NOISE_STD))
            }
            Command::Sweep(args) => {
                if args.levels.is_empty() {
                    return Err("--levels requires at least one noise level".to_string());
                }
                if args.trials == 0 {
                    return Err("--trials must be at least 1".to_string());
                }
                let first = args.levels[0];
                let mode = Mode::Sweep {
                    levels: args.levels,
                    trials: args.trials,
                    message_len: args.message_len,
                };
                (mode, args.link, first)
            }
        };

        // Determine seed (explicit or time-based)
        let seed = link.seed.unwrap_or_else(time_seed);

        let stack = StackConfig {
            block_size: link.block_size.unwrap_or(DEFAULT_BLOCK_SIZE),
            noise_std,
            seed: Some(seed),
            strict_framing: link.strict_framing,
        };
        stack.validate().map_err(|e| e.to_string())?;

        if let Mode::Sweep { levels, .. } = &mode {
            for &level in levels {
                StackConfig {
                    noise_std: level,
                    ..stack
                }
                .validate()
                .map_err(|e| e.to_string())?;
            }
        }

        Ok(Config {
            mode,
            stack,
            seed,
            log_level: cli.log_level,
            print_config: cli.print_config,
            print_metrics: !cli.no_metrics,
        })
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        match &self.mode {
            Mode::Send {
                message,
                key,
                wrong_key,
            } => {
                println!("Mode: send");
                println!("Message: {message:?} ({} bytes)", message.len());
                println!("Key: {}", if key.is_some() { "provided" } else { "generated" });
                println!("Receiver key: {}", if *wrong_key { "DIFFERENT" } else { "shared" });
                println!("Noise std: {}", self.stack.noise_std);
            }
            Mode::Sweep {
                levels,
                trials,
                message_len,
            } => {
                println!("Mode: sweep");
                println!("Noise levels: {levels:?}");
                println!("Trials per level: {trials}");
                println!("Message length: {message_len} chars");
            }
        }
        println!();
        println!("=== Physical Layer ===");
        println!("Seed: {}", self.seed);
        println!("Block size: {} subcarriers", self.stack.block_size);
        println!("Strict framing: {}", self.stack.strict_framing);
        println!();
    }
}

fn time_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, String> {
        let cli = Cli::try_parse_from(std::iter::once("ofdm-sim").chain(args.iter().copied()))
            .map_err(|e| e.to_string())?;
        Config::from_cli(cli)
    }

    #[test]
    fn test_zero_arguments() {
        let config = parse(&[]).unwrap();
        match config.mode {
            Mode::Send {
                message,
                key,
                wrong_key,
            } => {
                assert_eq!(message, DEFAULT_MESSAGE);
                assert!(key.is_none());
                assert!(!wrong_key);
            }
            Mode::Sweep { .. } => panic!("default mode should be send"),
        }
        assert_eq!(config.stack.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.stack.noise_std, DEFAULT_NOISE_STD);
        assert!(config.print_metrics);
    }

    #[test]
    fn test_send_options() {
        let config = parse(&[
            "send",
            "--message",
            "hi",
            "--noise-std",
            "0",
            "--seed",
            "42",
            "--block-size",
            "16",
            "--wrong-key",
        ])
        .unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.stack.seed, Some(42));
        assert_eq!(config.stack.block_size, 16);
        assert_eq!(config.stack.noise_std, 0.0);
        assert!(matches!(config.mode, Mode::Send { wrong_key: true, .. }));
    }

    #[test]
    fn test_sweep_levels() {
        let config = parse(&["sweep", "--levels", "0,0.1,0.3", "--trials", "5"]).unwrap();
        match config.mode {
            Mode::Sweep { levels, trials, .. } => {
                assert_eq!(levels, vec![0.0, 0.1, 0.3]);
                assert_eq!(trials, 5);
            }
            Mode::Send { .. } => panic!("expected sweep"),
        }
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(parse(&["send", "--block-size", "0"]).is_err());
        assert!(parse(&["send", "--noise-std", "-1"]).is_err());
        assert!(parse(&["send", "--key", "zz"]).is_err());
        assert!(parse(&["sweep", "--levels", "0.1,-0.2"]).is_err());
        assert!(parse(&["sweep", "--trials", "0"]).is_err());
    }

    #[test]
    fn test_key_option() {
        let key = SharedKey::generate();
        let config = parse(&["send", "--key", &key.to_hex()]).unwrap();
        match config.mode {
            Mode::Send { key: Some(parsed), .. } => assert_eq!(parsed, key),
            _ => panic!("key should be parsed"),
        }
    }
}
