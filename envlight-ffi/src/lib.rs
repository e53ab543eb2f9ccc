//! envlight C FFI entry points.
//!
//! This crate is compiled as a cdylib and loaded by the host engine.
//! All public functions use `extern "C"` ABI with `#[no_mangle]`.
//! Status-returning functions give 0 on success and -1 on failure;
//! handle-returning functions give a handle (> 0) or 0 on failure. The
//! message of the most recent failure on the calling thread is available
//! from `el_last_error`.

mod handle;

use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

use envlight_bake::sh::PROBE_FLOAT_COUNT;
use envlight_bake::{
    blend_into_probe_coefficients, generate_brdf_lut, prefilter, procedural_sky, project_to_sh,
    to_shader_ready, BakeError, BakeResult, BrdfLutConfig, CubeFace, Cubemap, CubemapRead,
    CubemapWrite, PrefilterConfig, ShCoefficients, ShaderReadySh,
};
use envlight_shared::FaceBasisUniform;
use glam::Vec4;
use handle::HandleStore;

// Cubemaps owned on behalf of the host.
static CUBEMAPS: LazyLock<Mutex<HandleStore<Cubemap>>> =
    LazyLock::new(|| Mutex::new(HandleStore::new()));

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn cubemaps() -> MutexGuard<'static, HandleStore<Cubemap>> {
    CUBEMAPS.lock().unwrap_or_else(PoisonError::into_inner)
}

fn record_error(context: &str, err: &BakeError) {
    log::error!("{context} failed: {err}");
    let message = CString::new(format!("{context}: {err}")).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
}

fn status(context: &str, result: BakeResult<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            record_error(context, &e);
            -1
        }
    }
}

fn handle_or_zero(context: &str, result: BakeResult<u64>) -> u64 {
    match result {
        Ok(handle) => handle,
        Err(e) => {
            record_error(context, &e);
            0
        }
    }
}

/// # Safety
/// `ptr` must be null or valid for reads of `len` values.
unsafe fn input<'a, T>(ptr: *const T, len: usize, what: &str) -> BakeResult<&'a [T]> {
    if ptr.is_null() {
        return Err(BakeError::invalid(format!("{what} pointer is null")));
    }
    Ok(std::slice::from_raw_parts(ptr, len))
}

/// # Safety
/// `ptr` must be null or valid for writes of `len` values.
unsafe fn output<'a, T>(ptr: *mut T, len: usize, what: &str) -> BakeResult<&'a mut [T]> {
    if ptr.is_null() {
        return Err(BakeError::invalid(format!("{what} pointer is null")));
    }
    Ok(std::slice::from_raw_parts_mut(ptr, len))
}

fn face_from_index(face: u32) -> BakeResult<CubeFace> {
    CubeFace::from_index(face as usize)
        .ok_or_else(|| BakeError::invalid(format!("face index {face} is not in 0..6")))
}

fn with_cubemap<R>(handle: u64, f: impl FnOnce(&mut Cubemap) -> BakeResult<R>) -> BakeResult<R> {
    let mut store = cubemaps();
    let cubemap = store
        .get_mut(handle)
        .ok_or_else(|| BakeError::invalid(format!("unknown cubemap handle {handle}")))?;
    f(cubemap)
}

fn face_texel_count(cubemap: &Cubemap, mip: u32) -> BakeResult<usize> {
    let size = cubemap.face_size(mip).ok_or_else(|| {
        BakeError::invalid(format!(
            "mip {mip} is outside a chain of {} levels",
            cubemap.mip_count()
        ))
    })? as usize;
    Ok(size * size)
}

// ============================================================
// FFI: Setup
// ============================================================

/// Install the logger (configured through `RUST_LOG`). Safe to call repeatedly.
#[no_mangle]
pub extern "C" fn el_initialize() {
    let _ = env_logger::try_init();
    log::info!("envlight {} initialized", env!("CARGO_PKG_VERSION"));
}

// ============================================================
// FFI: Cubemap storage
// ============================================================

/// Create a black RGBA32F cubemap. Returns a cubemap handle (> 0) or 0 on failure.
#[no_mangle]
pub extern "C" fn el_cubemap_create(face_size: u32, mip_count: u32) -> u64 {
    let result = Cubemap::new(face_size, mip_count).map(|cubemap| cubemaps().insert(cubemap));
    handle_or_zero("el_cubemap_create", result)
}

/// Create the built-in gradient sky. Returns a cubemap handle (> 0) or 0 on failure.
#[no_mangle]
pub extern "C" fn el_cubemap_create_procedural_sky(face_size: u32) -> u64 {
    let result = procedural_sky(face_size).map(|cubemap| cubemaps().insert(cubemap));
    handle_or_zero("el_cubemap_create_procedural_sky", result)
}

#[no_mangle]
pub extern "C" fn el_cubemap_destroy(handle: u64) {
    let mut store = cubemaps();
    if store.remove(handle).is_some() {
        log::debug!("Destroyed cubemap {handle}, {} still alive", store.len());
    } else {
        log::warn!("el_cubemap_destroy: unknown cubemap handle {handle}");
    }
}

/// Replace one face of one mip level.
/// `texels` holds `len` floats: RGBA per texel, rows top to bottom.
/// Returns 0 on success, -1 on failure.
#[no_mangle]
pub extern "C" fn el_cubemap_set_face(
    handle: u64,
    mip: u32,
    face: u32,
    texels: *const f32,
    len: usize,
) -> i32 {
    let result = (|| -> BakeResult<()> {
        let face = face_from_index(face)?;
        let floats = unsafe { input(texels, len, "texels")? };
        with_cubemap(handle, |cubemap| {
            let expected = face_texel_count(cubemap, mip)? * 4;
            if floats.len() != expected {
                return Err(BakeError::invalid(format!(
                    "face of mip {mip} needs {expected} floats, got {}",
                    floats.len()
                )));
            }
            let texels: Vec<Vec4> = floats.chunks_exact(4).map(Vec4::from_slice).collect();
            cubemap.set_face(mip, face, &texels)
        })
    })();
    status("el_cubemap_set_face", result)
}

/// Copy one face of one mip level into `out` (`len` floats, RGBA per texel).
/// Returns 0 on success, -1 on failure.
#[no_mangle]
pub extern "C" fn el_cubemap_get_face(
    handle: u64,
    mip: u32,
    face: u32,
    out: *mut f32,
    len: usize,
) -> i32 {
    let result = (|| -> BakeResult<()> {
        let face = face_from_index(face)?;
        let out = unsafe { output(out, len, "out")? };
        with_cubemap(handle, |cubemap| {
            let expected = face_texel_count(cubemap, mip)? * 4;
            if out.len() != expected {
                return Err(BakeError::invalid(format!(
                    "face of mip {mip} holds {expected} floats, buffer has {}",
                    out.len()
                )));
            }
            let texels = cubemap
                .face(mip, face)
                .ok_or_else(|| BakeError::invalid(format!("mip {mip} does not exist")))?;
            out.copy_from_slice(bytemuck::cast_slice(texels));
            Ok(())
        })
    })();
    status("el_cubemap_get_face", result)
}

/// Face width of `mip`, or 0 for an unknown handle or level.
#[no_mangle]
pub extern "C" fn el_cubemap_face_size(handle: u64, mip: u32) -> u32 {
    cubemaps()
        .get(handle)
        .and_then(|cubemap| cubemap.face_size(mip))
        .unwrap_or(0)
}

/// Number of mip levels, or 0 for an unknown handle.
#[no_mangle]
pub extern "C" fn el_cubemap_mip_count(handle: u64) -> u32 {
    cubemaps().get(handle).map_or(0, |cubemap| cubemap.mip_count())
}

// ============================================================
// FFI: Spherical harmonics
// ============================================================

/// Project a cubemap to irradiance SH, writing 27 floats (`[i * 3 + channel]`).
/// Returns 0 on success, -1 on failure.
#[no_mangle]
pub extern "C" fn el_project_sh(handle: u64, out: *mut f32) -> i32 {
    let result = (|| -> BakeResult<()> {
        let out = unsafe { output(out, PROBE_FLOAT_COUNT, "out")? };
        let sh = with_cubemap(handle, |cubemap| project_to_sh(&*cubemap))?;
        out.copy_from_slice(&sh.to_array());
        Ok(())
    })();
    status("el_project_sh", result)
}

/// Pack 27 SH floats into the 28 shader constants cAr, cAg, cAb, cBr, cBg, cBb, cC.
/// Returns 0 on success, -1 on failure.
#[no_mangle]
pub extern "C" fn el_sh_to_shader_ready(sh: *const f32, out: *mut f32) -> i32 {
    let result = (|| -> BakeResult<()> {
        let sh = unsafe { input(sh, PROBE_FLOAT_COUNT, "sh")? };
        let out = unsafe { output(out, ShaderReadySh::FLOAT_COUNT, "out")? };
        let packed = to_shader_ready(&ShCoefficients::from_slice(sh)?);
        out.copy_from_slice(bytemuck::cast_slice(std::slice::from_ref(&packed)));
        Ok(())
    })();
    status("el_sh_to_shader_ready", result)
}

/// Blend 27 SH floats into `num_probes` probes of 27 floats each.
/// Returns 0 on success, -1 on failure.
#[no_mangle]
pub extern "C" fn el_blend_probe_coefficients(
    probes: *mut f32,
    num_probes: usize,
    sh: *const f32,
    strength: f32,
) -> i32 {
    let result = (|| -> BakeResult<()> {
        let sh = unsafe { input(sh, PROBE_FLOAT_COUNT, "sh")? };
        let len = num_probes.checked_mul(PROBE_FLOAT_COUNT).ok_or_else(|| {
            BakeError::invalid(format!("{num_probes} probes overflow the buffer length"))
        })?;
        let probes = unsafe { output(probes, len, "probes")? };
        blend_into_probe_coefficients(probes, &ShCoefficients::from_slice(sh)?, strength)?;
        Ok(())
    })();
    status("el_blend_probe_coefficients", result)
}

// ============================================================
// FFI: Specular
// ============================================================

/// GGX-prefilter a cubemap into a new cubemap with a full roughness mip chain.
/// The source is left untouched. Returns the new cubemap handle (> 0) or 0 on failure.
#[no_mangle]
pub extern "C" fn el_prefilter(handle: u64, sample_count: u32) -> u64 {
    let result = (|| -> BakeResult<u64> {
        // Filter a copy so the store is not locked for the whole bake.
        let source = with_cubemap(handle, |cubemap| Ok(cubemap.base_level()))?;
        let filtered = prefilter(&source, &PrefilterConfig { sample_count })?;
        Ok(cubemaps().insert(filtered))
    })();
    handle_or_zero("el_prefilter", result)
}

/// Write a `size x size` BRDF LUT as interleaved (scale, bias) pairs into
/// `out`, which must hold `size * size * 2` floats.
/// Returns 0 on success, -1 on failure.
#[no_mangle]
pub extern "C" fn el_generate_brdf_lut(size: u32, sample_count: u32, out: *mut f32) -> i32 {
    let result = (|| -> BakeResult<()> {
        let lut = generate_brdf_lut(&BrdfLutConfig { size, sample_count })?;
        let floats: &[f32] = bytemuck::cast_slice(&lut.texels);
        let out = unsafe { output(out, floats.len(), "out")? };
        out.copy_from_slice(floats);
        Ok(())
    })();
    status("el_generate_brdf_lut", result)
}

/// Write the cube face basis table (72 floats: per face u axis, v axis and
/// normal, each padded to vec4) for uploading to a compute kernel.
/// Returns 0 on success, -1 on failure.
#[no_mangle]
pub extern "C" fn el_face_basis(out: *mut f32) -> i32 {
    let result = (|| -> BakeResult<()> {
        let uniform = FaceBasisUniform::new();
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&uniform));
        let out = unsafe { output(out, floats.len(), "out")? };
        out.copy_from_slice(floats);
        Ok(())
    })();
    status("el_face_basis", result)
}

// ============================================================
// FFI: Error handling
// ============================================================

/// Message of the last failure on this thread, or null. The string stays
/// valid until the next failing call on the same thread.
#[no_mangle]
pub extern "C" fn el_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(std::ptr::null(), |message| message.as_ptr())
    })
}
