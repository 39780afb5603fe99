use std::collections::HashMap;
use std::error::Error;
use std::env::args;
use std::process;
use std::time::SystemTime;
use std::fs;

use lpr_india::{ color, utils, PlateColorLabel };

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = args();
    args.next();
    let path = args.next();
    let path = match path {
        Some(path) => path,
        None => {
            eprintln!("didn't get a directory from args");
            process::exit(1);
        }
    };
    let dir = fs::read_dir(path)?;

    let mut speeds = Vec::new();
    let mut counts: HashMap<PlateColorLabel, usize> = HashMap::new();
    let mut total_amount = 0;
    let mut failed = 0;
    for entry_result in dir {
        if let Ok(item) = entry_result {
            let path = item.path();
            if !utils::is_supported_image(&path) {
                continue;
            }
            total_amount += 1;
            let before_time = SystemTime::now();
            let img = match image::open(&path) {
                Ok(img) => img,
                Err(e) => {
                    println!("file: {:?}, unreadable: {}", path, e);
                    failed += 1;
                    continue;
                }
            };
            let label = match color::classify_image(&img.to_rgb8()) {
                Ok(label) => label,
                Err(e) => {
                    println!("file: {:?}, skipped: {}", path, e);
                    failed += 1;
                    continue;
                }
            };
            let duration = SystemTime::now().duration_since(before_time)?;
            let speed = duration.as_millis();
            speeds.push(speed);
            *counts.entry(label).or_insert(0) += 1;
            println!("file: {:?}, res: {}, speed: {}", path, label, speed);
        }
    }

    let total_speed: u128 = speeds.iter().sum();
    let average_speed = if speeds.is_empty() { 0 } else { total_speed / speeds.len() as u128 };
    println!("total_amount: {}, failed: {}, average_speed: {}", total_amount, failed, average_speed);
    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    for (label, count) in counts {
        println!("{:>28}: {}", label.as_str(), count);
    }
    Ok(())
}
