//! WebGL GPU identities
//!
//! The unmasked vendor/renderer pair exposed through
//! `WEBGL_debug_renderer_info` is one of the strongest fingerprinting signals,
//! and it also betrays the operating system: Chrome reports Direct3D on
//! Windows, Metal or OpenGL 4.1 on macOS and Mesa/OpenGL on Linux. Every
//! profile here therefore belongs to exactly one [`Platform`].

use serde::{Deserialize, Serialize};

use crate::stealth::js_string;
use crate::stealth::tables::Platform;

/// Known GPU configurations, grouped by the platform that reports them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WebGLProfile {
    // Windows (ANGLE over Direct3D 11)
    NvidiaGtx1660,
    NvidiaRtx3060,
    NvidiaRtx3080,
    NvidiaRtx4070,
    AmdRx580,
    AmdRx6700Xt,
    IntelUhd630,
    IntelIrisXe,

    // macOS (ANGLE over Metal / OpenGL 4.1)
    AppleM1,
    AppleM2,
    AppleM3,
    MacIntelIrisPlus655,
    MacRadeonPro5500M,

    // Linux (ANGLE over Mesa / proprietary OpenGL)
    LinuxMesaUhd630,
    LinuxMesaIrisXe,
    LinuxNvidiaRtx3060,
    LinuxRadeonRx6700Xt,
}

impl WebGLProfile {
    /// Platform whose browsers report this vendor/renderer pair
    pub fn platform(&self) -> Platform {
        use WebGLProfile::*;
        match self {
            NvidiaGtx1660 | NvidiaRtx3060 | NvidiaRtx3080 | NvidiaRtx4070 | AmdRx580
            | AmdRx6700Xt | IntelUhd630 | IntelIrisXe => Platform::Windows,
            AppleM1 | AppleM2 | AppleM3 | MacIntelIrisPlus655 | MacRadeonPro5500M => {
                Platform::Mac
            }
            LinuxMesaUhd630 | LinuxMesaIrisXe | LinuxNvidiaRtx3060 | LinuxRadeonRx6700Xt => {
                Platform::Linux
            }
        }
    }

    /// `UNMASKED_VENDOR_WEBGL` (37445)
    pub fn vendor(&self) -> &'static str {
        use WebGLProfile::*;
        match self {
            NvidiaGtx1660 | NvidiaRtx3060 | NvidiaRtx3080 | NvidiaRtx4070 => {
                "Google Inc. (NVIDIA)"
            }
            AmdRx580 | AmdRx6700Xt => "Google Inc. (AMD)",
            IntelUhd630 | IntelIrisXe => "Google Inc. (Intel)",

            AppleM1 | AppleM2 | AppleM3 => "Google Inc. (Apple)",
            MacIntelIrisPlus655 => "Google Inc. (Intel Inc.)",
            MacRadeonPro5500M => "Google Inc. (ATI Technologies Inc.)",

            LinuxMesaUhd630 | LinuxMesaIrisXe => "Google Inc. (Intel)",
            LinuxNvidiaRtx3060 => "Google Inc. (NVIDIA Corporation)",
            LinuxRadeonRx6700Xt => "Google Inc. (AMD)",
        }
    }

    /// `UNMASKED_RENDERER_WEBGL` (37446)
    pub fn renderer(&self) -> &'static str {
        use WebGLProfile::*;
        match self {
            NvidiaGtx1660 => {
                "ANGLE (NVIDIA, NVIDIA GeForce GTX 1660 SUPER Direct3D11 vs_5_0 ps_5_0, D3D11)"
            }
            NvidiaRtx3060 => {
                "ANGLE (NVIDIA, NVIDIA GeForce RTX 3060 Direct3D11 vs_5_0 ps_5_0, D3D11)"
            }
            NvidiaRtx3080 => {
                "ANGLE (NVIDIA, NVIDIA GeForce RTX 3080 Direct3D11 vs_5_0 ps_5_0, D3D11)"
            }
            NvidiaRtx4070 => {
                "ANGLE (NVIDIA, NVIDIA GeForce RTX 4070 Direct3D11 vs_5_0 ps_5_0, D3D11)"
            }
            AmdRx580 => "ANGLE (AMD, AMD Radeon RX 580 Series Direct3D11 vs_5_0 ps_5_0, D3D11)",
            AmdRx6700Xt => "ANGLE (AMD, AMD Radeon RX 6700 XT Direct3D11 vs_5_0 ps_5_0, D3D11)",
            IntelUhd630 => {
                "ANGLE (Intel, Intel(R) UHD Graphics 630 Direct3D11 vs_5_0 ps_5_0, D3D11)"
            }
            IntelIrisXe => {
                "ANGLE (Intel, Intel(R) Iris(R) Xe Graphics Direct3D11 vs_5_0 ps_5_0, D3D11)"
            }

            AppleM1 => "ANGLE (Apple, ANGLE Metal Renderer: Apple M1, Unspecified Version)",
            AppleM2 => "ANGLE (Apple, ANGLE Metal Renderer: Apple M2, Unspecified Version)",
            AppleM3 => "ANGLE (Apple, ANGLE Metal Renderer: Apple M3, Unspecified Version)",
            MacIntelIrisPlus655 => {
                "ANGLE (Intel Inc., Intel(R) Iris(TM) Plus Graphics 655, OpenGL 4.1)"
            }
            MacRadeonPro5500M => {
                "ANGLE (ATI Technologies Inc., AMD Radeon Pro 5500M OpenGL Engine, OpenGL 4.1)"
            }

            LinuxMesaUhd630 => "ANGLE (Intel, Mesa Intel(R) UHD Graphics 630 (CFL GT2), OpenGL 4.6)",
            LinuxMesaIrisXe => "ANGLE (Intel, Mesa Intel(R) Xe Graphics (TGL GT2), OpenGL 4.6)",
            LinuxNvidiaRtx3060 => {
                "ANGLE (NVIDIA Corporation, NVIDIA GeForce RTX 3060/PCIe/SSE2, OpenGL 4.5.0)"
            }
            LinuxRadeonRx6700Xt => {
                "ANGLE (AMD, AMD Radeon RX 6700 XT (navi22, LLVM 15.0.7, DRM 3.49, 6.1.0), OpenGL 4.6)"
            }
        }
    }

    /// Find the profile reporting exactly this renderer string
    pub fn from_renderer(renderer: &str) -> Option<WebGLProfile> {
        Platform::ALL
            .iter()
            .flat_map(|p| p.bucket().gpus.iter())
            .copied()
            .find(|gpu| gpu.renderer() == renderer)
    }
}

/// Script fragment answering `getParameter` for the unmasked vendor and
/// renderer on both WebGL context types.
///
/// The fragment is meant to be spliced into the wrapper built by
/// [`crate::stealth::to_injection_script`].
pub fn webgl_override_script(vendor: &str, renderer: &str) -> String {
    format!(
        r#"
    const GL_VENDOR = {vendor};
    const GL_RENDERER = {renderer};
    const patchWebGL = function(target) {{
        if (typeof target === 'undefined') return;
        const originalGetParameter = target.prototype.getParameter;
        target.prototype.getParameter = function(parameter) {{
            // UNMASKED_VENDOR_WEBGL
            if (parameter === 37445) return GL_VENDOR;
            // UNMASKED_RENDERER_WEBGL
            if (parameter === 37446) return GL_RENDERER;
            return originalGetParameter.call(this, parameter);
        }};
        const originalGetExtension = target.prototype.getExtension;
        target.prototype.getExtension = function(name) {{
            if (name === 'WEBGL_debug_renderer_info') {{
                return {{ UNMASKED_VENDOR_WEBGL: 37445, UNMASKED_RENDERER_WEBGL: 37446 }};
            }}
            return originalGetExtension.call(this, name);
        }};
    }};
    patchWebGL(typeof WebGLRenderingContext !== 'undefined' ? WebGLRenderingContext : undefined);
    patchWebGL(typeof WebGL2RenderingContext !== 'undefined' ? WebGL2RenderingContext : undefined);
"#,
        vendor = js_string(vendor),
        renderer = js_string(renderer),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_gpus_use_direct3d() {
        for gpu in Platform::Windows.bucket().gpus {
            assert!(gpu.renderer().contains("Direct3D11"), "{:?}", gpu);
        }
    }

    #[test]
    fn test_non_windows_gpus_never_use_direct3d() {
        for platform in [Platform::Mac, Platform::Linux] {
            for gpu in platform.bucket().gpus {
                assert!(!gpu.renderer().contains("Direct3D"), "{:?}", gpu);
                assert!(!gpu.renderer().contains("D3D11"), "{:?}", gpu);
            }
        }
    }

    #[test]
    fn test_linux_gpus_report_opengl() {
        for gpu in Platform::Linux.bucket().gpus {
            assert!(gpu.renderer().contains("OpenGL"));
        }
    }

    #[test]
    fn test_from_renderer_round_trip() {
        let gpu = WebGLProfile::LinuxMesaUhd630;
        assert_eq!(WebGLProfile::from_renderer(gpu.renderer()), Some(gpu));
        assert_eq!(WebGLProfile::from_renderer("Unknown GPU"), None);
    }

    #[test]
    fn test_override_script_embeds_strings() {
        let gpu = WebGLProfile::AppleM2;
        let script = webgl_override_script(gpu.vendor(), gpu.renderer());
        assert!(script.contains("37445"));
        assert!(script.contains("37446"));
        assert!(script.contains("WEBGL_debug_renderer_info"));
        assert!(script.contains("\"Google Inc. (Apple)\""));
        assert!(script.contains("Apple M2"));
    }

    #[test]
    fn test_override_script_escapes_quotes() {
        let script = webgl_override_script("Evil\"Vendor", "Renderer");
        assert!(script.contains(r#""Evil\"Vendor""#));
    }
}
