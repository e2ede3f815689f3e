mod script;

use anyhow::{bail, Context, Result};
use clap::Parser;
use pokey_core::apu::registers::irq;
use pokey_core::logging::{LogCategory, LogConfig, LogLevel};
use pokey_core::{Pokey, PokeyConfig, TimingMode};
use script::Script;
use std::cell::RefCell;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Parser)]
#[command(about = "Render a POKEY register script to a WAV file")]
struct Args {
    /// Register script (JSON)
    script: PathBuf,

    /// Chip configuration (JSON); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Clock preset: "ntsc" or "pal"
    #[arg(long)]
    timing: Option<String>,

    /// Output sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Treat pure tones above the sample rate as a flat half level
    #[arg(long, default_value_t = false)]
    suppress_inaudible: bool,

    /// WAV file to write
    #[arg(long, default_value = "out.wav")]
    out: PathBuf,

    /// Dump the final save-state to this file as JSON
    #[arg(long)]
    save: Option<PathBuf>,

    /// Core log level for every category: off, error, warn, info, debug, trace
    #[arg(long, default_value = "off")]
    log_level: String,

    /// Per-category level, e.g. "timers=debug" or just "serial" (uses --log-level)
    #[arg(long)]
    log_category: Vec<String>,

    /// Suppress the summary line
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

fn load_config(args: &Args) -> Result<PokeyConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => PokeyConfig::default(),
    };

    if let Some(name) = &args.timing {
        let Some(timing) = TimingMode::from_str(name) else {
            bail!("unknown timing mode: {name}");
        };
        config.clock_hz = timing.clock_hz();
    }
    if let Some(rate) = args.sample_rate {
        config.sample_rate = rate;
    }
    if args.suppress_inaudible {
        config.suppress_inaudible = true;
    }
    Ok(config)
}

/// Map the logging flags onto the core's `LogConfig`. Returns the most
/// verbose level requested, for the `env_logger` default filter.
fn configure_logging(args: &Args) -> Result<LogLevel> {
    let Some(global) = LogLevel::from_str(&args.log_level) else {
        bail!("unknown log level: {}", args.log_level);
    };
    let config = LogConfig::global();
    config.set_global_level(global);

    let mut loudest = global;
    for spec in &args.log_category {
        let (name, level) = match spec.split_once('=') {
            Some((name, level)) => match LogLevel::from_str(level) {
                Some(level) => (name, level),
                None => bail!("unknown log level in {spec:?}"),
            },
            None => (spec.as_str(), global.max(LogLevel::Info)),
        };
        let Some(category) = LogCategory::from_str(name) else {
            bail!("unknown log category: {name}");
        };
        config.set_level(category, level);
        loudest = loudest.max(level);
    }
    Ok(loudest)
}

fn init_env_logger(level: LogLevel) {
    let default = match level {
        LogLevel::Off | LogLevel::Error | LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn write_wav(path: &Path, samples: &[i16], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = configure_logging(&args)?;
    init_env_logger(level);

    let config = load_config(&args)?;
    let script = Script::load(&args.script)?;
    let mut chip = Pokey::new(config)?;

    // Timer and serial IRQs are only counted; there is no CPU to take them
    let irqs = Rc::new(RefCell::new([0usize; 8]));
    let counter = Rc::clone(&irqs);
    chip.io_mut().set_interrupt_sink(move |mask: u8| {
        let mut counts = counter.borrow_mut();
        for (bit, count) in counts.iter_mut().enumerate() {
            if mask & (1 << bit) != 0 {
                *count += 1;
            }
        }
    });

    let samples = script::play(&mut chip, &script);
    write_wav(&args.out, &samples, chip.config().sample_rate)?;

    if let Some(path) = &args.save {
        let state = chip.save_state();
        let mut f = File::create(path)?;
        write!(f, "{}", serde_json::to_string_pretty(&state)?)?;
    }

    if !args.quiet {
        let counts = irqs.borrow();
        println!(
            "Rendered {} samples ({:.2}s) to {}; timer IRQs {}/{}/{}",
            samples.len(),
            samples.len() as f64 / chip.config().sample_rate as f64,
            args.out.display(),
            counts[irq::TIMER1.trailing_zeros() as usize],
            counts[irq::TIMER2.trailing_zeros() as usize],
            counts[irq::TIMER4.trailing_zeros() as usize],
        );
    }

    Ok(())
}
