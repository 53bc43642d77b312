/*!
 * FilmFrame command-line front-end
 *
 * Frames one or more photos (or every photo of a folder) and writes the
 * results to `<folder>_watermark/<name>.watermark.jpg`.
 */

use anyhow::{bail, Context};
use clap::{Arg, ArgAction, Command};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use filmframe::compositor::{embedded_logo, load_logo};
use filmframe::pipeline::{collect_inputs, normalize_path};
use filmframe::{FontCatalog, FontPreference, Pipeline, WatermarkStyle};

fn cli() -> Command {
    Command::new("filmframe")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Frame photos in a white border with their camera, lens and exposure data")
        .arg(
            Arg::new("files")
                .help("Input image file(s) or folder(s)")
                .required(true)
                .num_args(1..)
                .value_parser(clap::value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("font_family")
                .short('F')
                .long("font-family")
                .help("Font family to render with; remembered for the next run")
                .value_name("FAMILY"),
        )
        .arg(
            Arg::new("font")
                .short('f')
                .long("font")
                .help("Font file to render with (TTF/OTF path), overrides the family lookup")
                .value_name("FONT_PATH")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("font_dir")
                .long("font-dir")
                .help("Directory searched for font families (repeatable)")
                .value_name("DIR")
                .action(ArgAction::Append)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("JSON style file")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("logo")
                .long("logo")
                .help("Logo image replacing the built-in one")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("quality")
                .short('q')
                .long("quality")
                .help("JPEG quality (1-100)")
                .value_name("N")
                .value_parser(clap::value_parser!(u8).range(1..=100)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Verbose output")
                .action(ArgAction::SetTrue),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let log_level = if matches.get_flag("verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let mut style = WatermarkStyle::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    if let Some(quality) = matches.get_one::<u8>("quality") {
        style.jpeg_quality = *quality;
    }
    if let Some(logo) = matches.get_one::<PathBuf>("logo") {
        style.logo = Some(logo.clone());
    }
    if let Some(dirs) = matches.get_many::<PathBuf>("font_dir") {
        style.font_dirs.extend(dirs.cloned());
    }

    // The last chosen family is the default for the next run
    let preference = FontPreference::default();
    let family = match matches.get_one::<String>("font_family") {
        Some(family) => {
            if let Err(e) = preference.save(family) {
                warn!("Could not remember font family: {}", e);
            }
            family.clone()
        }
        None => preference.load(),
    };

    let mut fonts = style.font_dirs.iter().fold(FontCatalog::new(), |catalog, dir| catalog.with_dir(dir));
    if let Some(path) = matches.get_one::<PathBuf>("font") {
        fonts = fonts.with_file(path);
    }

    let logo = match &style.logo {
        Some(path) => load_logo(path)?,
        None => embedded_logo()?,
    };

    let files: Vec<PathBuf> = matches
        .get_many::<PathBuf>("files")
        .map(|files| files.cloned().collect())
        .unwrap_or_default();
    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    let inputs: Vec<PathBuf> = collect_inputs(&files)?
        .into_iter()
        .map(|path| absolute(&cwd, path))
        .collect();
    if inputs.is_empty() {
        bail!("no images found");
    }

    let pipeline = Pipeline::new(Arc::new(fonts), logo, style)?;

    if let [input] = inputs.as_slice() {
        pipeline
            .render_one(input, &family)
            .with_context(|| format!("failed to process {}", input.display()))?;
        return Ok(());
    }

    let outcomes = pipeline.render_batch(inputs, &family).await?;
    let failed = outcomes.iter().filter(|o| !o.is_success()).count();

    info!("Processing complete:");
    info!("  Successfully processed: {} image(s)", outcomes.len() - failed);
    if failed > 0 {
        info!("  Errors encountered: {} image(s)", failed);
        for outcome in outcomes.iter().filter(|o| !o.is_success()) {
            if let Err(e) = &outcome.result {
                info!("  - [{}] {}: {}", e.kind(), outcome.input.display(), e);
            }
        }
        bail!("{} of {} image(s) failed", failed, outcomes.len());
    }

    Ok(())
}

fn absolute(cwd: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        normalize_path(&path)
    } else {
        normalize_path(&cwd.join(path))
    }
}
