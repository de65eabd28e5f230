/* Plays a test tone through the build-up engine on the default output device.
Build-up, presets and any other parameter can be changed from stdin while it runs.
*/

#[cfg(feature = "native")]
use std::io::{self, BufRead, Write};
#[cfg(feature = "native")]
use std::sync::Arc;

#[cfg(feature = "native")]
use buildup::engine::BuildUpEngine;
#[cfg(feature = "native")]
use buildup::params::{ParamId, ParameterSet};
#[cfg(feature = "native")]
use buildup::platform::{AudioOutput, CpalOutput, TestTone};
#[cfg(feature = "native")]
use buildup::presets;
#[cfg(feature = "native")]
use clap::Parser;

/// Real-time build-up effect demo
#[cfg(feature = "native")]
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Test tone frequency in Hz
    #[arg(long, default_value_t = 220.0)]
    tone: f32,

    /// Initial build-up in percent
    #[arg(long, default_value_t = 50.0)]
    build_up: f32,

    /// Factory preset to load at start (0-9)
    #[arg(long)]
    preset: Option<usize>,

    /// Host tempo in BPM for the delay
    #[arg(long, default_value_t = 120.0)]
    bpm: f32,
}

#[cfg(feature = "native")]
fn print_help() {
    println!("Commands:");
    println!("  b <0-100>      set build-up");
    println!("  p <index>      load a factory preset");
    println!("  s <key> <v>    set any parameter by key (e.g. s reverbMix 80)");
    println!("  l              list presets");
    println!("  q              quit");
}

#[cfg(feature = "native")]
fn handle_command(params: &ParameterSet, line: &str) -> anyhow::Result<bool> {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("b") => {
            let value: f32 = parts.next().unwrap_or("0").parse()?;
            params.set(ParamId::BuildUp, value);
            println!("Build-up: {:.0}%", params.get(ParamId::BuildUp));
        }
        Some("p") => {
            let index: usize = parts.next().unwrap_or("0").parse()?;
            let preset = presets::select(params, index)?;
            println!("Preset: {}", preset.name);
        }
        Some("s") => {
            let key = parts.next().unwrap_or_default();
            let id = ParamId::from_key(key)
                .ok_or_else(|| buildup::params::ParamError::UnknownParameter(key.to_string()))?;
            let value: f32 = parts.next().unwrap_or("0").parse()?;
            params.set(id, value);
            println!("{} = {}", id.key(), params.get(id));
        }
        Some("l") => {
            for (i, preset) in presets::FACTORY_PRESETS.iter().enumerate() {
                println!("  {}: {}", i, preset.name);
            }
        }
        Some("q") => return Ok(false),
        _ => print_help(),
    }
    Ok(true)
}

#[cfg(feature = "native")]
fn main() -> anyhow::Result<()> {
    buildup::utils::init_logger();
    let args = Args::parse();

    let params = Arc::new(ParameterSet::new());
    params.set(ParamId::BuildUp, args.build_up);
    if let Some(index) = args.preset {
        presets::select(&params, index)?;
    }

    let mut output = CpalOutput::new();
    output.initialize(44100.0)?;
    let sample_rate = output.sample_rate();

    let engine = BuildUpEngine::new(Arc::clone(&params));
    let tone = TestTone::new(sample_rate, args.tone, 0.3);
    output.create_stream(engine, tone, Some(args.bpm))?;
    output.start()?;

    print_help();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        match handle_command(&params, line.trim()) {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => println!("Error: {}", err),
        }
        io::stdout().flush()?;
    }

    output.stop()?;
    log::info!("Rendered {} frames", output.frames_rendered());
    Ok(())
}

#[cfg(not(feature = "native"))]
fn main() {
    println!("This binary is only available with the 'native' feature enabled.");
}
