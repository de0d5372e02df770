//! Process DPI awareness, so captures and pointer coordinates use physical pixels.

#[cfg(windows)]
mod windows_impl {
    use std::sync::Once;

    use windows::Win32::UI::HiDpi::{
        SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
    };

    static INIT: Once = Once::new();

    /// Opts the process into Per-Monitor V2 DPI awareness (Windows 10 1703+).
    /// Without it, capture and cursor APIs report scaled logical coordinates.
    pub fn set_dpi_aware() {
        INIT.call_once(|| {
            match unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) } {
                Ok(()) => tracing::info!("set Per-Monitor V2 DPI awareness"),
                // Fails when awareness was already fixed by a manifest or an earlier call.
                Err(e) => tracing::warn!(error = %e, "could not set Per-Monitor V2 DPI awareness"),
            }
        });
    }
}

#[cfg(windows)]
pub use windows_impl::set_dpi_aware;

/// macOS and X11 captures are already in physical pixels.
#[cfg(not(windows))]
pub fn set_dpi_aware() {}
