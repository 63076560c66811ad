//! Command line flags: `--key=value` style, plus a bare model path.

use std::path::PathBuf;

use anyhow::{Result, bail};
use platform::RunConfig;
use renderer::SceneConfig;

pub const USAGE: &str = "\
usage: objscene [--model=]<file.obj>... [--assets=<dir>]... [--gpu-backend=auto|vulkan|dx12|metal|gl]
                [--size=WxH | --width=W --height=H] [--rotate=<rad/s>]";

fn parse_backend(val: &str) -> wgpu::Backends {
    match val.to_ascii_lowercase().as_str() {
        "auto" => wgpu::Backends::all(),
        "vulkan" | "vk" => wgpu::Backends::VULKAN,
        "dx12" | "d3d12" => wgpu::Backends::DX12,
        "metal" | "mtl" => wgpu::Backends::METAL,
        "gl" | "opengl" | "gles" => wgpu::Backends::GL,
        other => {
            log::warn!("Unknown backend '{}', falling back to auto.", other);
            wgpu::Backends::all()
        }
    }
}

fn parse_size(v: &str) -> Option<(u32, u32)> {
    let (sw, sh) = v.split_once('x').or_else(|| v.split_once('X'))?;
    Some((sw.parse().ok()?, sh.parse().ok()?))
}

/// Build the run configuration from `args` (without the program name).
pub fn parse_args<I, S>(args: I) -> Result<RunConfig>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut scene = SceneConfig::default();
    let mut w: Option<u32> = None;
    let mut h: Option<u32> = None;

    for arg in args {
        let arg = arg.as_ref();
        if let Some(v) = arg.strip_prefix("--model=") {
            scene.models.push(PathBuf::from(v));
        } else if let Some(v) = arg.strip_prefix("--assets=") {
            scene.asset_roots.push(PathBuf::from(v));
        } else if let Some(v) = arg.strip_prefix("--gpu-backend=") {
            scene.backends = parse_backend(v);
        } else if let Some(v) = arg.strip_prefix("--size=") {
            match parse_size(v) {
                Some((pw, ph)) => {
                    w = Some(pw);
                    h = Some(ph);
                }
                None => log::warn!("Ignoring malformed --size={}", v),
            }
        } else if let Some(v) = arg.strip_prefix("--width=") {
            w = v.parse().ok().or(w);
        } else if let Some(v) = arg.strip_prefix("--height=") {
            h = v.parse().ok().or(h);
        } else if let Some(v) = arg.strip_prefix("--rotate=") {
            match v.parse::<f32>() {
                Ok(speed) if speed.is_finite() => scene.rotate_speed = speed,
                _ => bail!("--rotate expects a number, got '{}'", v),
            }
        } else if arg.starts_with("--") {
            bail!("Unknown flag '{}'\n{}", arg, USAGE);
        } else {
            scene.models.push(PathBuf::from(arg));
        }
    }

    if scene.models.is_empty() {
        bail!("No model given\n{}", USAGE);
    }

    Ok(RunConfig {
        title: window_title(&scene.models),
        width: w.unwrap_or(1280).max(1),
        height: h.unwrap_or(720).max(1),
        scene,
    })
}

fn window_title(models: &[PathBuf]) -> String {
    let names: Vec<String> = models
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    format!("objscene - {}", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_path_and_flags() {
        let cfg = parse_args([
            "models/teapot.obj",
            "--assets=assets",
            "--assets=/opt/textures",
            "--gpu-backend=VK",
            "--size=800x600",
            "--rotate=0",
        ])
        .unwrap();
        assert_eq!(cfg.scene.models, vec![PathBuf::from("models/teapot.obj")]);
        assert_eq!(
            cfg.scene.asset_roots,
            vec![PathBuf::from("assets"), PathBuf::from("/opt/textures")]
        );
        assert_eq!(cfg.scene.backends, wgpu::Backends::VULKAN);
        assert_eq!((cfg.width, cfg.height), (800, 600));
        assert_eq!(cfg.scene.rotate_speed, 0.0);
        assert_eq!(cfg.title, "objscene - teapot.obj");
    }

    #[test]
    fn defaults_and_clamped_size() {
        let cfg = parse_args(["--model=a.obj", "--width=0", "--height=bogus"]).unwrap();
        assert_eq!((cfg.width, cfg.height), (1, 720));
        assert_eq!(cfg.scene.backends, wgpu::Backends::all());
    }

    #[test]
    fn unknown_backend_falls_back_to_auto() {
        let cfg = parse_args(["a.obj", "--gpu-backend=glide"]).unwrap();
        assert_eq!(cfg.scene.backends, wgpu::Backends::all());
    }

    #[test]
    fn model_is_required() {
        let err = parse_args(["--size=10x10"]).unwrap_err();
        assert!(err.to_string().starts_with("No model given"));
    }

    #[test]
    fn unknown_flag_is_an_error() {
        assert!(parse_args(["a.obj", "--fullscreen"]).is_err());
        assert!(parse_args(["a.obj", "--rotate=fast"]).is_err());
    }
}
