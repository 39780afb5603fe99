use clap::{ App, Arg, ArgMatches, SubCommand };
use env_logger::Env;
use log::{ info, warn };

use std::error::Error;
use std::fs;
use std::path::{ Path, PathBuf };

use lpr_india::{ color, image_process, region, report, segment, utils, FullFrameDetector, LprError, PlateNormalizer, TextRegionExtractor };


fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let input_dir = || Arg::with_name("INPUT_DIR")
        .help("directory of images")
        .required(true)
        .index(1);
    let output_dir = || Arg::with_name("OUTPUT_DIR")
        .help("directory for the processed images")
        .required(true)
        .index(2);
    let output_csv = |default: &'static str| Arg::with_name("output")
        .short("o")
        .long("output")
        .takes_value(true)
        .default_value(default)
        .help("csv file to write");

    let matches = App::new("LPR")
                    .version("0.1.0")
                    .about("License plate color classification and OCR text correction")
                    .subcommand(SubCommand::with_name("enhance")
                        .about("denoise, equalize and sharpen vehicle images into grayscale")
                        .arg(input_dir())
                        .arg(output_dir()))
                    .subcommand(SubCommand::with_name("segment")
                        .about("cut plates out of vehicle images into grayscale and color crops")
                        .arg(Arg::with_name("RAW_DIR")
                            .help("directory of original vehicle images")
                            .required(true)
                            .index(1))
                        .arg(Arg::with_name("ENHANCED_DIR")
                            .help("enhanced images with the same file names, enhanced on the fly when missing")
                            .required(true)
                            .index(2))
                        .arg(Arg::with_name("gray_out")
                            .long("gray-out")
                            .takes_value(true)
                            .default_value("data/segmented")
                            .help("directory for the grayscale crops"))
                        .arg(Arg::with_name("color_out")
                            .long("color-out")
                            .takes_value(true)
                            .default_value("data/color_classified")
                            .help("directory for the color crops")))
                    .subcommand(SubCommand::with_name("color")
                        .about("classify the background color of plate crops")
                        .arg(input_dir())
                        .arg(output_csv("data/results/plate_color.csv")))
                    .subcommand(SubCommand::with_name("prepare")
                        .about("cut grayscale plate crops to their text and binarize them for OCR")
                        .arg(input_dir())
                        .arg(output_dir()))
                    .subcommand(SubCommand::with_name("text")
                        .about("normalize OCR fragments given as filename,text[,confidence] rows")
                        .arg(Arg::with_name("OCR_CSV")
                            .help("csv with one OCR fragment per row")
                            .required(true)
                            .index(1))
                        .arg(output_csv("data/results/recognize_text.csv")))
                    .subcommand(SubCommand::with_name("normalize")
                        .about("normalize plate strings given on the command line")
                        .arg(Arg::with_name("TEXT")
                            .required(true)
                            .multiple(true)
                            .index(1)))
                    .subcommand(SubCommand::with_name("merge")
                        .about("join color and text tables by filename")
                        .arg(Arg::with_name("COLOR_CSV").required(true).index(1))
                        .arg(Arg::with_name("TEXT_CSV").required(true).index(2))
                        .arg(output_csv("data/results/results.csv")))
                    .get_matches();

    match matches.subcommand() {
        ("enhance", Some(m)) => enhance(m),
        ("segment", Some(m)) => segment_plates(m),
        ("color", Some(m)) => classify_colors(m),
        ("prepare", Some(m)) => prepare(m),
        ("text", Some(m)) => recognize_text(m),
        ("normalize", Some(m)) => normalize(m),
        ("merge", Some(m)) => merge(m),
        _ => {
            eprintln!("{}", matches.usage());
            Err("a subcommand is required".into())
        }
    }
}

/// supported images of a directory, sorted by name
fn list_images(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && utils::is_supported_image(path))
        .collect();
    paths.sort();
    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn enhance(m: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let input = Path::new(m.value_of("INPUT_DIR").ok_or("input dir is required")?);
    let output = Path::new(m.value_of("OUTPUT_DIR").ok_or("output dir is required")?);
    fs::create_dir_all(output)?;
    for path in list_images(input)? {
        let img = match image::open(&path) {
            Ok(img) => img,
            Err(e) => {
                warn!("could not read {}: {}", path.display(), e);
                continue;
            }
        };
        let save_path = output.join(file_name(&path));
        image_process::enhance(&img).save(&save_path)?;
        info!("enhanced and saved: {}", save_path.display());
    }
    Ok(())
}

fn segment_plates(m: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let raw_dir = Path::new(m.value_of("RAW_DIR").ok_or("raw dir is required")?);
    let enhanced_dir = Path::new(m.value_of("ENHANCED_DIR").ok_or("enhanced dir is required")?);
    let gray_out = m.value_of("gray_out").ok_or("gray output dir is required")?;
    let color_out = m.value_of("color_out").ok_or("color output dir is required")?;
    // TODO: swap in a trained plate detector once one is wired behind PlateDetector
    let detector = FullFrameDetector;
    let mut total = 0;
    for path in list_images(raw_dir)? {
        let raw = match image::open(&path) {
            Ok(img) => img,
            Err(e) => {
                warn!("could not read {}: {}", path.display(), e);
                continue;
            }
        };
        let enhanced_path = enhanced_dir.join(file_name(&path));
        let enhanced = if enhanced_path.is_file() {
            match region::load_gray(&enhanced_path) {
                Ok(gray) => gray,
                Err(e) => {
                    warn!("skipping {}: {}", path.display(), e);
                    continue;
                }
            }
        } else {
            info!("no enhanced image at {}, enhancing now", enhanced_path.display());
            image_process::enhance(&raw)
        };
        let stem = path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let saved = segment::crop_plates(&detector, &raw, &enhanced)
            .and_then(|crops| segment::save_crops(&crops, &stem, gray_out, color_out));
        match saved {
            Ok(names) => {
                info!("{}: {} plates", file_name(&path), names.len());
                total += names.len();
            },
            Err(e) => warn!("skipping {}: {}", path.display(), e),
        }
    }
    info!("{} plate crops saved to {} and {}", total, gray_out, color_out);
    Ok(())
}

fn classify_colors(m: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let input = Path::new(m.value_of("INPUT_DIR").ok_or("input dir is required")?);
    let csv_path = m.value_of("output").ok_or("output is required")?;
    let mut rows = Vec::new();
    for path in list_images(input)? {
        let label = image::open(&path)
            .map_err(LprError::from)
            .and_then(|img| color::classify_image(&img.to_rgb8()));
        match label {
            Ok(label) => {
                let name = file_name(&path);
                println!("{} -> {}", name, label);
                rows.push((name, label));
            },
            Err(e) => warn!("skipping {}: {}", path.display(), e),
        }
    }
    report::write_colors(csv_path, &rows)?;
    info!("{} plate colors saved to {}", rows.len(), csv_path);
    Ok(())
}

fn prepare(m: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let input = Path::new(m.value_of("INPUT_DIR").ok_or("input dir is required")?);
    let output = Path::new(m.value_of("OUTPUT_DIR").ok_or("output dir is required")?);
    fs::create_dir_all(output)?;
    let extractor = TextRegionExtractor::default();
    for path in list_images(input)? {
        let prepared = region::load_gray(&path).and_then(|gray| extractor.extract(&gray));
        match prepared {
            Ok(prepared) => {
                let save_path = output.join(file_name(&path));
                prepared.save(&save_path)?;
                info!("prepared {} ({}x{})", save_path.display(), prepared.width(), prepared.height());
            },
            Err(e) => warn!("skipping {}: {}", path.display(), e),
        }
    }
    Ok(())
}

fn recognize_text(m: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let ocr_csv = m.value_of("OCR_CSV").ok_or("ocr csv is required")?;
    let csv_path = m.value_of("output").ok_or("output is required")?;
    let normalizer = PlateNormalizer::new()?;
    let rows: Vec<(String, String)> = report::read_ocr_fragments(ocr_csv)?
        .into_iter()
        .map(|(name, tokens)| {
            let text = normalizer.plate_text(&tokens);
            println!("{} -> {}", name, text);
            (name, text)
        })
        .collect();
    report::write_texts(csv_path, &rows)?;
    info!("{} plate texts saved to {}", rows.len(), csv_path);
    Ok(())
}

fn normalize(m: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let normalizer = PlateNormalizer::new()?;
    for text in m.values_of("TEXT").into_iter().flatten() {
        println!("{} -> {}", text, normalizer.normalize(text));
    }
    Ok(())
}

fn merge(m: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let colors = report::read_pairs(m.value_of("COLOR_CSV").ok_or("color csv is required")?)?;
    let texts = report::read_pairs(m.value_of("TEXT_CSV").ok_or("text csv is required")?)?;
    let csv_path = m.value_of("output").ok_or("output is required")?;
    let rows = report::merge(&colors, &texts);
    report::write_merged(csv_path, &rows)?;
    for row in &rows {
        println!("{},{},{}", row.filename, row.detected_text, row.plate_color);
    }
    info!("all results saved to {}", csv_path);
    Ok(())
}
