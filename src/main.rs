use clap::{ArgAction, Parser, Subcommand};
use imgroute::config::{Config, ConfigError};
use imgroute::imaging::{self, FileFormat};
use imgroute::output::{self, ImageInfo};
use imgroute::registry::{Registry, Router, Value};
use imgroute::{Image, config};
use log::{Level, info};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "imgroute")]
#[command(about = "Run image operations on whichever backend can perform them")]
#[command(long_about = "\
Run image operations on whichever backend can perform them

Every representation of an image (an encoded PNG, a decoded buffer, an AV1
frame) is a class. Each class declares the operations it can run and the
classes it can be converted into. When the current class can't run an
operation, imgroute converts the image along the cheapest path to a class
that can.

  imgroute convert photo.avif thumb.jpg --resize 320x240 --quality 70
  imgroute route AvifFile resize
  imgroute classes --disable RustImage

Run 'imgroute gen-config' to generate a documented imgroute.toml.")]
#[command(version)]
struct Cli {
    /// Config file (defaults are used when it doesn't exist)
    #[arg(long, default_value = "imgroute.toml", global = true)]
    config: PathBuf,

    /// Treat an image class as unavailable (repeatable)
    #[arg(long = "disable", value_name = "CLASS", global = true)]
    disable: Vec<String>,

    /// More logging: -v info, -vv debug, -vvv trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print format, class, size and alpha of an image as JSON
    Info {
        file: PathBuf,
    },
    /// Apply operations to an image and save it
    Convert(ConvertArgs),
    /// List registered classes, their availability and operations
    Classes,
    /// Show how an operation would be routed from a class
    Route {
        class: String,
        operation: String,
    },
    /// Print a stock imgroute.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct ConvertArgs {
    input: PathBuf,
    output: PathBuf,

    /// Output format (defaults to the output file extension)
    #[arg(long)]
    format: Option<String>,

    /// Apply the EXIF orientation before any other operation
    #[arg(long)]
    auto_orient: bool,

    /// Resize to exactly WIDTHxHEIGHT
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    resize: Option<(u32, u32)>,

    /// Crop to LEFT,TOP,RIGHT,BOTTOM
    #[arg(long, value_name = "L,T,R,B", value_parser = parse_rect)]
    crop: Option<(i64, i64, i64, i64)>,

    /// Rotate counter-clockwise by a multiple of 90 degrees
    #[arg(long, value_name = "DEGREES", allow_negative_numbers = true)]
    rotate: Option<i64>,

    /// Flatten transparency onto R,G,B
    #[arg(long, value_name = "R,G,B", value_parser = parse_rgb)]
    background: Option<[u8; 3]>,

    /// Encoder quality for jpeg and avif (1-100)
    #[arg(long)]
    quality: Option<i64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logger(cli.verbose)?;

    match cli.command {
        Command::Info { file } => {
            let backends = Backends::load(&cli.config, &cli.disable)?;
            let router = backends.router();
            let mut image = Image::open(&router, BufReader::new(File::open(&file)?))?;
            output::print_info(&describe(&mut image)?)?;
        }
        Command::Convert(args) => {
            let backends = Backends::load(&cli.config, &cli.disable)?;
            let router = backends.router();
            let trail = convert(&router, &args)?;
            println!("{}", output::format_trail(&trail));
        }
        Command::Classes => {
            let backends = Backends::load(&cli.config, &cli.disable)?;
            output::print_classes(&backends.registry, &backends.router().snapshot());
        }
        Command::Route { class, operation } => {
            let backends = Backends::load(&cli.config, &cli.disable)?;
            let router = backends.router();
            let start = backends
                .registry
                .class_named(&class)
                .ok_or_else(|| format!("Unknown image class '{class}'"))?;
            match router.resolve_operation(start, &operation) {
                Ok(resolution) => output::print_resolution(&operation, start, &resolution),
                Err(err) => {
                    eprintln!("{err}");
                    std::process::exit(1);
                }
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Validated config and the registry built from it.
struct Backends {
    config: Config,
    registry: Registry,
}

impl Backends {
    /// Load `path` (defaults if missing) and add `disable` to `probes.disabled`.
    fn load(path: &Path, disable: &[String]) -> Result<Self, ConfigError> {
        let mut config = config::load_config(path)?;
        config.probes.disabled.extend(disable.iter().cloned());
        config.validate()?;
        let registry = imaging::default_registry(&config);
        Ok(Self { config, registry })
    }

    fn router(&self) -> Router<'_> {
        Router::with_checker(&self.registry, self.config.probes.checker())
    }
}

/// Log level from the number of `-v` flags.
fn setup_logger(verbose: u8) -> Result<(), log::SetLoggerError> {
    let log_level = match verbose {
        0 => Level::Warn,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    };
    simple_logger::init_with_level(log_level)?;
    info!("Log level: {log_level}");
    Ok(())
}

fn describe(image: &mut Image<'_>) -> Result<ImageInfo, imgroute::ImageError> {
    let class = image.class().to_string();
    let text = |value: Value| value.as_text().unwrap_or_default().to_string();
    let format = text(image.invoke("get_format_name", &[])?);
    let mime_type = text(image.invoke("get_mime_type", &[])?);
    let (width, height) = image.invoke("get_size", &[])?.as_size().unwrap_or_default();
    let has_alpha = image.invoke("has_alpha", &[])?.as_bool().unwrap_or_default();
    let has_animation = image
        .invoke("has_animation", &[])?
        .as_bool()
        .unwrap_or_default();
    let frame_count = image.invoke("get_frame_count", &[])?.as_int().unwrap_or(1);
    Ok(ImageInfo {
        format,
        mime_type,
        class,
        width,
        height,
        has_alpha,
        has_animation,
        frame_count,
    })
}

fn convert(
    router: &Router<'_>,
    args: &ConvertArgs,
) -> Result<Vec<imgroute::registry::ClassId>, Box<dyn std::error::Error>> {
    let format = match &args.format {
        Some(format) => format.clone(),
        None => output_format(&args.output)
            .ok_or_else(|| format!("Cannot tell the format of {}", args.output.display()))?
            .name()
            .to_string(),
    };

    let mut image = Image::open(router, BufReader::new(File::open(&args.input)?))?;
    if args.auto_orient {
        image.invoke("auto_orient", &[])?;
    }
    if let Some((w, h)) = args.resize {
        image.invoke("resize", &[Value::Size(w, h)])?;
    }
    if let Some((l, t, r, b)) = args.crop {
        image.invoke("crop", &[Value::Rect(l, t, r, b)])?;
    }
    if let Some(angle) = args.rotate {
        image.invoke("rotate", &[Value::Int(angle)])?;
    }
    if let Some(rgb) = args.background {
        image.invoke("set_background_color_rgb", &[Value::Rgb(rgb)])?;
    }

    let save_args: Vec<Value> = args.quality.map(Value::Int).into_iter().collect();
    let mut writer = BufWriter::new(File::create(&args.output)?);
    image.save_with(&format, &mut writer, &save_args)?;
    writer.flush()?;
    Ok(image.trail().to_vec())
}

fn output_format(path: &Path) -> Option<FileFormat> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(FileFormat::from_name)
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let w = w.trim().parse().map_err(|e| format!("bad width '{w}': {e}"))?;
    let h = h.trim().parse().map_err(|e| format!("bad height '{h}': {e}"))?;
    Ok((w, h))
}

fn parse_rect(s: &str) -> Result<(i64, i64, i64, i64), String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<i64>().map_err(|e| format!("bad coordinate '{p}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    match parts[..] {
        [l, t, r, b] => Ok((l, t, r, b)),
        _ => Err(format!("expected LEFT,TOP,RIGHT,BOTTOM, got '{s}'")),
    }
}

fn parse_rgb(s: &str) -> Result<[u8; 3], String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<u8>().map_err(|e| format!("bad channel '{p}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    match parts[..] {
        [r, g, b] => Ok([r, g, b]),
        _ => Err(format!("expected R,G,B, got '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_size_accepts_wxh() {
        assert_eq!(parse_size("800x600"), Ok((800, 600)));
        assert_eq!(parse_size("32X16"), Ok((32, 16)));
        assert!(parse_size("800").is_err());
        assert!(parse_size("ax600").is_err());
    }

    #[test]
    fn parse_rect_needs_four_values() {
        assert_eq!(parse_rect("-10, 0, 50,60"), Ok((-10, 0, 50, 60)));
        assert!(parse_rect("1,2,3").is_err());
    }

    #[test]
    fn parse_rgb_needs_three_bytes() {
        assert_eq!(parse_rgb("255,128,0"), Ok([255, 128, 0]));
        assert!(parse_rgb("256,0,0").is_err());
        assert!(parse_rgb("1,2").is_err());
    }

    #[test]
    fn output_format_from_extension() {
        assert_eq!(output_format(Path::new("a/b.JPG")), Some(FileFormat::Jpeg));
        assert_eq!(output_format(Path::new("b.avif")), Some(FileFormat::Avif));
        assert_eq!(output_format(Path::new("b")), None);
    }

    #[test]
    fn backends_add_disabled_classes_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let backends =
            Backends::load(&dir.path().join("missing.toml"), &["RustImage".to_string()]).unwrap();
        assert_eq!(backends.config.probes.disabled, vec!["RustImage"]);
        let snapshot = backends.router().snapshot();
        assert!(!snapshot.is_available(imgroute::imaging::RUST_IMAGE));
        assert!(snapshot.is_available(imgroute::imaging::RGB_BUFFER));
    }

    #[test]
    fn backends_reject_blank_disabled_names() {
        let dir = tempfile::tempdir().unwrap();
        let result = Backends::load(&dir.path().join("missing.toml"), &["  ".to_string()]);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn cli_parses_gen_config() {
        let cli = Cli::try_parse_from(["imgroute", "gen-config"]).unwrap();
        assert!(matches!(cli.command, Command::GenConfig));
    }

    #[test]
    fn cli_parses_convert() {
        let cli = Cli::try_parse_from([
            "imgroute",
            "-vv",
            "--disable",
            "Av1Frame",
            "convert",
            "in.png",
            "out.jpg",
            "--resize",
            "10x20",
            "--rotate",
            "-90",
            "--auto-orient",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.disable, vec!["Av1Frame"]);
        let Command::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(args.resize, Some((10, 20)));
        assert_eq!(args.rotate, Some(-90));
        assert_eq!(args.format, None);
        assert!(args.auto_orient);
    }
}
