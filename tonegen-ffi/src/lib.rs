//! C ABI wrapper for the tonegen engine.
//!
//! The native host owns the audio hardware. It creates an engine at the rate
//! its hardware runs at, takes the renderer handle once and calls
//! `tonegen_render_interleaved_i16` from its realtime callback. Everything else
//! is called from the host's control thread.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Two opaque handle types: `TonegenEngine` (control thread) and
//!   `TonegenRenderer` (audio thread). Both are heap-allocated; you own/delete them.
//! - Output is interleaved 16-bit stereo, `L R L R ...`.
//!
//! Threading
//! - Engine functions must be serialized by the host (one control thread).
//! - The renderer may live on a different thread than the engine. The render
//!   call never blocks or allocates.

use tonegen_engine::{PullDevice, Renderer, ToneEngine, ToneState};

/// Opaque control-side handle.
pub struct TonegenEngine {
    inner: ToneEngine<PullDevice>,
}

/// Opaque render-side handle.
pub struct TonegenRenderer {
    inner: Renderer,
}

pub const TONEGEN_OK: i32 = 0;
pub const TONEGEN_IGNORED: i32 = 1;
pub const TONEGEN_ERR_NULL: i32 = -1;
pub const TONEGEN_ERR_DEVICE: i32 = -2;

pub const TONEGEN_STATE_IDLE: i32 = 0;
pub const TONEGEN_STATE_ARMED_SILENT: i32 = 1;
pub const TONEGEN_STATE_SOUNDING: i32 = 2;

fn engine_mut<'a>(engine: *mut TonegenEngine) -> Option<&'a mut TonegenEngine> {
    // SAFETY: callers pass either null or a pointer from `tonegen_create`.
    unsafe { engine.as_mut() }
}

// --- Creation / destruction -------------------------------------------------------

/// Create an engine that renders at `sample_rate` (the host's hardware rate).
/// Returns null if the rate is not positive.
#[no_mangle]
pub extern "C" fn tonegen_create(sample_rate: f64) -> *mut TonegenEngine {
    if sample_rate.is_nan() || sample_rate <= 0.0 {
        return std::ptr::null_mut();
    }
    let eng = TonegenEngine { inner: ToneEngine::new(PullDevice::new(sample_rate)) };
    Box::into_raw(Box::new(eng))
}

/// Destroy an engine previously returned by `tonegen_create`.
#[no_mangle]
pub extern "C" fn tonegen_destroy(engine: *mut TonegenEngine) {
    if !engine.is_null() {
        // SAFETY: pointer came from `Box::into_raw` in `tonegen_create`.
        unsafe { drop(Box::from_raw(engine)); }
    }
}

/// Activate the engine (if needed) and move its renderer out for the audio
/// thread. Returns null on failure or if the renderer was already taken.
#[no_mangle]
pub extern "C" fn tonegen_take_renderer(engine: *mut TonegenEngine) -> *mut TonegenRenderer {
    let Some(e) = engine_mut(engine) else { return std::ptr::null_mut() };
    if e.inner.activate().is_err() {
        return std::ptr::null_mut();
    }
    match e.inner.device_mut().take_renderer() {
        Some(r) => Box::into_raw(Box::new(TonegenRenderer { inner: r })),
        None => std::ptr::null_mut(),
    }
}

/// Destroy a renderer previously returned by `tonegen_take_renderer`.
#[no_mangle]
pub extern "C" fn tonegen_renderer_destroy(renderer: *mut TonegenRenderer) {
    if !renderer.is_null() {
        // SAFETY: pointer came from `Box::into_raw` in `tonegen_take_renderer`.
        unsafe { drop(Box::from_raw(renderer)); }
    }
}

// --- Rendering -------------------------------------------------------------------

/// Samples in `frames` stereo frames, or `None` if that overflows `usize`.
fn interleaved_len(frames: u32) -> Option<usize> {
    usize::try_from(frames).ok()?.checked_mul(2)
}

/// Render `frames` interleaved stereo i16 frames (`2 * frames` samples) into
/// `out_interleaved`. Always writes a full buffer.
///
/// Returns the number of frames rendered (0 on null arguments or a frame
/// count whose sample count does not fit in `usize`).
#[no_mangle]
pub extern "C" fn tonegen_render_interleaved_i16(
    renderer: *mut TonegenRenderer,
    out_interleaved: *mut i16,
    frames: u32,
) -> u32 {
    if renderer.is_null() || out_interleaved.is_null() || frames == 0 {
        return 0;
    }
    let Some(samples) = interleaved_len(frames) else {
        return 0;
    };
    // SAFETY: non-null pointer from `tonegen_take_renderer`.
    let r = unsafe { &mut *renderer };
    // SAFETY: the host guarantees room for `2 * frames` samples.
    let out = unsafe { std::slice::from_raw_parts_mut(out_interleaved, samples) };
    r.inner.fill_interleaved(out);
    frames
}

// --- Control ---------------------------------------------------------------------

/// Play for `seconds` unless a tone is already counting down.
/// Returns `TONEGEN_OK`, `TONEGEN_IGNORED` (tone still sounding) or an error code.
#[no_mangle]
pub extern "C" fn tonegen_start_for_duration(engine: *mut TonegenEngine, seconds: f64) -> i32 {
    let Some(e) = engine_mut(engine) else { return TONEGEN_ERR_NULL };
    match e.inner.start_for_duration(seconds) {
        Ok(true) => TONEGEN_OK,
        Ok(false) => TONEGEN_IGNORED,
        Err(_) => TONEGEN_ERR_DEVICE,
    }
}

#[no_mangle]
pub extern "C" fn tonegen_stop(engine: *mut TonegenEngine) -> i32 {
    let Some(e) = engine_mut(engine) else { return TONEGEN_ERR_NULL };
    match e.inner.stop() {
        Ok(()) => TONEGEN_OK,
        Err(_) => TONEGEN_ERR_DEVICE,
    }
}

/// Tone frequency in Hz; non-positive values are clamped.
#[no_mangle]
pub extern "C" fn tonegen_set_frequency(engine: *mut TonegenEngine, hz: f64) {
    if let Some(e) = engine_mut(engine) { e.inner.set_frequency(hz); }
}

/// Volume in [0, 1]; values outside are clamped.
#[no_mangle]
pub extern "C" fn tonegen_set_volume(engine: *mut TonegenEngine, volume: f64) {
    if let Some(e) = engine_mut(engine) { e.inner.set_volume(volume); }
}

/// Overwrite the remaining tone time, even while a tone is sounding.
#[no_mangle]
pub extern "C" fn tonegen_set_tone_time(engine: *mut TonegenEngine, seconds: f64) {
    if let Some(e) = engine_mut(engine) { e.inner.set_tone_time(seconds); }
}

/// Clear the countdown and return the oscillator phase to zero.
#[no_mangle]
pub extern "C" fn tonegen_reset(engine: *mut TonegenEngine) {
    if let Some(e) = engine_mut(engine) { e.inner.reset(); }
}

/// Forward an audio-session interruption. Only `began != 0` has an effect.
#[no_mangle]
pub extern "C" fn tonegen_interruption(engine: *mut TonegenEngine, began: i32) {
    if let Some(e) = engine_mut(engine) { e.inner.on_interruption(began != 0); }
}

// --- Queries ---------------------------------------------------------------------

/// One of the `TONEGEN_STATE_*` values, or `TONEGEN_ERR_NULL`.
#[no_mangle]
pub extern "C" fn tonegen_state(engine: *mut TonegenEngine) -> i32 {
    let Some(e) = engine_mut(engine) else { return TONEGEN_ERR_NULL };
    match e.inner.state() {
        ToneState::Idle => TONEGEN_STATE_IDLE,
        ToneState::ArmedSilent => TONEGEN_STATE_ARMED_SILENT,
        ToneState::Sounding => TONEGEN_STATE_SOUNDING,
    }
}

/// 1 if the last deactivation came from an interruption.
#[no_mangle]
pub extern "C" fn tonegen_was_interrupted(engine: *mut TonegenEngine) -> i32 {
    engine_mut(engine).map_or(0, |e| i32::from(e.inner.was_interrupted()))
}

#[no_mangle]
pub extern "C" fn tonegen_remaining_samples(engine: *mut TonegenEngine) -> u64 {
    engine_mut(engine).map_or(0, |e| e.inner.remaining_samples())
}

#[no_mangle]
pub extern "C" fn tonegen_sample_rate(engine: *mut TonegenEngine) -> f64 {
    engine_mut(engine).map_or(0.0, |e| e.inner.sample_rate())
}
