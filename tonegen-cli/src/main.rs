//! tonegen CLI — play a timed sine tone on an output device, or render it to WAV.

use std::sync::mpsc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use tonegen_engine::{AudioDevice, CpalDevice, Frame, PullDevice, StreamRequest, ToneEngine, ToneState};

/// Frames per block when rendering offline.
const RENDER_BLOCK: usize = 1024;
/// How often the control loop wakes up while a tone plays.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

const USAGE: &str = "\
usage: tonegen [options]
  --list-devices          list output devices and exit
  --device=NAME           output device (default: system default)
  --frequency=HZ          tone frequency (default 440)
  --volume=FRACTION       0.0 ..= 1.0 (default 0.5)
  --duration=SECONDS      tone length (default 10)
  --sample-rate=HZ        preferred sample rate (default 44100)
  --sweep=HZ              glide to this frequency over the tone
  --render=PATH           render to a 16-bit stereo WAV instead of playing";

#[derive(Debug)]
struct Args {
    list_devices: bool,
    device_name: Option<String>,
    sample_rate: Option<u32>,
    frequency: f64,
    volume: f64,
    duration_sec: f64,
    sweep_to: Option<f64>,
    render: Option<String>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            list_devices: false,
            device_name: None,
            sample_rate: None,
            frequency: 440.0,
            volume: 0.5,
            duration_sec: 10.0,
            sweep_to: None,
            render: None,
        }
    }
}

fn parse_args() -> Result<Args> {
    let mut a = Args::default();
    for s in std::env::args().skip(1) {
        if s == "--list-devices" { a.list_devices = true; continue; }
        if s == "--help" || s == "-h" { println!("{USAGE}"); std::process::exit(0); }
        if let Some(rest) = s.strip_prefix("--device=")      { a.device_name = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--sample-rate=") { a.sample_rate = Some(parse(&s, rest)?);  continue; }
        if let Some(rest) = s.strip_prefix("--frequency=")   { a.frequency   = parse(&s, rest)?;        continue; }
        if let Some(rest) = s.strip_prefix("--volume=")      { a.volume      = parse(&s, rest)?;        continue; }
        if let Some(rest) = s.strip_prefix("--duration=")    { a.duration_sec= parse(&s, rest)?;        continue; }
        if let Some(rest) = s.strip_prefix("--sweep=")       { a.sweep_to    = Some(parse(&s, rest)?);  continue; }
        if let Some(rest) = s.strip_prefix("--render=")      { a.render      = Some(rest.to_string()); continue; }
        warn!("unknown arg: {s}");
    }
    Ok(a)
}

fn parse<T: std::str::FromStr>(arg: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().with_context(|| format!("invalid value in {arg}\n\n{USAGE}"))
}

fn list_output_devices() -> Result<()> {
    println!("Available output devices:");
    for name in CpalDevice::output_device_names()? {
        println!("- {name}");
    }
    Ok(())
}

fn pick_device(args: &Args) -> Result<CpalDevice> {
    let dev = match &args.device_name {
        Some(name) => CpalDevice::by_name(name)?,
        None => CpalDevice::default_output()?,
    };
    Ok(dev)
}

fn request(args: &Args) -> StreamRequest {
    let mut req = StreamRequest::default();
    if let Some(sr) = args.sample_rate {
        req.preferred_sample_rate = f64::from(sr);
    }
    req
}

/// Glide the frequency linearly from `from` to `to` as the countdown runs.
/// Phase is never touched, so the glide is click-free even though each step is
/// an abrupt frequency change.
fn apply_sweep<D: AudioDevice>(engine: &mut ToneEngine<D>, from: f64, to: Option<f64>, total: u64) {
    let Some(to) = to else { return };
    if total == 0 {
        return;
    }
    let done = 1.0 - engine.remaining_samples() as f64 / total as f64;
    engine.set_frequency(from + (to - from) * done.clamp(0.0, 1.0));
}

fn play(args: &Args) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let device = pick_device(args)?.with_events(tx);
    println!("Using device: {}", device.name());

    let mut engine = ToneEngine::with_request(device, request(args));
    engine.set_frequency(args.frequency);
    engine.set_volume(args.volume);
    engine.start_for_duration(args.duration_sec)?;

    let total = engine.remaining_samples();
    println!(
        "Playing {:.1} Hz at volume {:.2} for {:.2} s ({} samples @ {} Hz)",
        engine.frequency(),
        args.volume,
        args.duration_sec,
        total,
        engine.sample_rate(),
    );
    if let Some(to) = args.sweep_to { println!("Sweeping to {to:.1} Hz"); }
    println!("Press Ctrl+C to stop…\n");

    loop {
        std::thread::sleep(POLL_INTERVAL);
        engine.pump_events(&rx);
        match engine.state() {
            ToneState::Sounding => apply_sweep(&mut engine, args.frequency, args.sweep_to, total),
            ToneState::ArmedSilent => break,
            ToneState::Idle => {
                if engine.was_interrupted() {
                    bail!("output was interrupted with {} samples left", engine.remaining_samples());
                }
                break;
            }
        }
    }

    engine.stop()?;
    info!("tone finished");
    Ok(())
}

fn render(args: &Args, path: &str) -> Result<()> {
    let sr = args.sample_rate.unwrap_or(44_100);
    let mut engine = ToneEngine::with_request(PullDevice::new(f64::from(sr)), request(args));
    engine.set_frequency(args.frequency);
    engine.set_volume(args.volume);
    engine.start_for_duration(args.duration_sec)?;
    let total = engine.remaining_samples();

    let wav_spec = hound::WavSpec {
        channels: 2,
        sample_rate: sr,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, wav_spec).with_context(|| format!("creating {path}"))?;
    let mut block = vec![Frame::SILENCE; RENDER_BLOCK];
    let mut left = total;

    while left > 0 {
        apply_sweep(&mut engine, args.frequency, args.sweep_to, total);
        engine.device_mut().pull(&mut block);
        // the final block plays in full but only the countdown is written out
        let n = usize::try_from(left).unwrap_or(usize::MAX).min(RENDER_BLOCK);
        for f in &block[..n] {
            writer.write_sample(f.left)?;
            writer.write_sample(f.right)?;
        }
        left = engine.remaining_samples();
    }
    writer.finalize()?;
    engine.stop()?;

    println!("Rendered {total} frames @ {sr} Hz to {path}");
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;

    if args.list_devices {
        return list_output_devices();
    }

    println!("tonegen — sine tone generator\n");

    match args.render.as_deref() {
        Some(path) => render(&args, path),
        None => play(&args),
    }
}
