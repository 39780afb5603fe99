//! CSV result tables, one row per processed file.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::color::PlateColorLabel;
use crate::error::LprError;
use crate::text::RawOcrToken;

pub const MISSING: &str = "N/A";

/// Row of the combined table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRow {
    pub filename: String,
    pub detected_text: String,
    pub plate_color: String,
}

fn create_parent(path: &Path) -> Result<(), LprError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn write_pairs<'a>(path: &Path, header: [&str; 2], rows: impl Iterator<Item = (&'a str, &'a str)>) -> Result<(), LprError> {
    create_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(header)?;
    for (filename, value) in rows {
        wtr.write_record([filename, value])?;
    }
    wtr.flush()?;
    Ok(())
}

/// `filename,plate_color`
pub fn write_colors(path: impl AsRef<Path>, rows: &[(String, PlateColorLabel)]) -> Result<(), LprError> {
    write_pairs(path.as_ref(), ["filename", "plate_color"], rows.iter().map(|(f, l)| (f.as_str(), l.as_str())))
}

/// `filename,recognize_text`
pub fn write_texts(path: impl AsRef<Path>, rows: &[(String, String)]) -> Result<(), LprError> {
    write_pairs(path.as_ref(), ["filename", "recognize_text"], rows.iter().map(|(f, t)| (f.as_str(), t.as_str())))
}

/// Two column table with a header line, as written by `write_colors` or
/// `write_texts`.
pub fn read_pairs(path: impl AsRef<Path>) -> Result<Vec<(String, String)>, LprError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let filename = record.get(0).unwrap_or_default().trim().to_string();
        let value = record.get(1).unwrap_or_default().trim().to_string();
        rows.push((filename, value));
    }
    Ok(rows)
}

/// External OCR output: `filename,text[,confidence]`, one fragment per row in
/// reading order. Fragments are grouped per file, files keep their first
/// appearance order.
pub fn read_ocr_fragments(path: impl AsRef<Path>) -> Result<Vec<(String, Vec<RawOcrToken>)>, LprError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;
    let mut files: Vec<(String, Vec<RawOcrToken>)> = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let filename = record.get(0).unwrap_or_default().trim();
        if filename.is_empty() {
            continue;
        }
        let text = record.get(1).unwrap_or_default();
        let confidence = record.get(2)
            .and_then(|c| c.trim().parse::<f32>().ok())
            .unwrap_or(0.0);
        let index = match files.iter().position(|(name, _)| name == filename) {
            Some(i) => i,
            None => {
                files.push((filename.to_string(), Vec::new()));
                files.len() - 1
            }
        };
        // a row with an empty text cell only registers the file
        if !text.is_empty() {
            files[index].1.push(RawOcrToken::new(text, confidence));
        }
    }
    Ok(files)
}

/// Outer join on filename, sorted by filename. A side without a row is `N/A`.
pub fn merge(colors: &[(String, String)], texts: &[(String, String)]) -> Vec<MergedRow> {
    let mut joined: BTreeMap<&str, (Option<&str>, Option<&str>)> = BTreeMap::new();
    for (filename, color) in colors {
        joined.entry(filename.as_str()).or_default().1 = Some(color.as_str());
    }
    for (filename, text) in texts {
        joined.entry(filename.as_str()).or_default().0 = Some(text.as_str());
    }
    joined.into_iter().map(|(filename, (text, color))| MergedRow {
        filename: filename.to_string(),
        detected_text: text.unwrap_or(MISSING).to_string(),
        plate_color: color.unwrap_or(MISSING).to_string(),
    }).collect()
}

/// `filename,detected_text,plate_color`
pub fn write_merged(path: impl AsRef<Path>, rows: &[MergedRow]) -> Result<(), LprError> {
    let path = path.as_ref();
    create_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["filename", "detected_text", "plate_color"])?;
    for row in rows {
        wtr.write_record([&row.filename, &row.detected_text, &row.plate_color])?;
    }
    wtr.flush()?;
    Ok(())
}


#[cfg(test)]
mod test {

    use std::error::Error;
    use std::fs;

    use crate::color::PlateColorLabel;
    use super::{ merge, read_ocr_fragments, read_pairs, write_colors, write_merged, write_texts, MergedRow };

    #[test]
    fn color_table_round_trip() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("results").join("plate_color.csv");
        let rows = vec![
            ("car_1_plate_0.jpg".to_string(), PlateColorLabel::BlackCommercialRental),
            ("car_2_plate_0.jpg".to_string(), PlateColorLabel::UncertainOther),
        ];
        write_colors(&path, &rows)?;

        let content = fs::read_to_string(&path)?;
        assert!(content.starts_with("filename,plate_color\n"));
        assert_eq!(read_pairs(&path)?, vec![
            ("car_1_plate_0.jpg".to_string(), "Black - Commercial/Rental".to_string()),
            ("car_2_plate_0.jpg".to_string(), "Uncertain / Other".to_string()),
        ]);
        Ok(())
    }

    #[test]
    fn text_table_header() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("recognize_text.csv");
        write_texts(&path, &[("a.png".to_string(), "MH02DN8718".to_string())])?;
        assert_eq!(fs::read_to_string(&path)?, "filename,recognize_text\na.png,MH02DN8718\n");
        Ok(())
    }

    #[test]
    fn fragments_grouped_in_order() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("ocr.csv");
        fs::write(&path, "filename,text,confidence\nb.jpg,MH 02,0.9\na.jpg,KA01,0.5\nb.jpg,DN8718,0.7\nc.jpg,\n")?;

        let files = read_ocr_fragments(&path)?;
        let names: Vec<&str> = files.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["b.jpg", "a.jpg", "c.jpg"]);
        let texts: Vec<&str> = files[0].1.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["MH 02", "DN8718"]);
        assert_eq!(files[0].1[1].confidence, 0.7);
        assert!(files[2].1.is_empty());
        Ok(())
    }

    #[test]
    fn merge_fills_missing_sides() -> Result<(), Box<dyn Error>> {
        let colors = vec![("b.jpg".to_string(), "White - Private".to_string()), ("a.jpg".to_string(), "Red - Government".to_string())];
        let texts = vec![("a.jpg".to_string(), "KA01AB1234".to_string()), ("c.jpg".to_string(), "unreadable".to_string())];
        let rows = merge(&colors, &texts);
        assert_eq!(rows, vec![
            MergedRow { filename: "a.jpg".into(), detected_text: "KA01AB1234".into(), plate_color: "Red - Government".into() },
            MergedRow { filename: "b.jpg".into(), detected_text: "N/A".into(), plate_color: "White - Private".into() },
            MergedRow { filename: "c.jpg".into(), detected_text: "unreadable".into(), plate_color: "N/A".into() },
        ]);

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("results.csv");
        write_merged(&path, &rows)?;
        assert_eq!(fs::read_to_string(&path)?.lines().next(), Some("filename,detected_text,plate_color"));
        Ok(())
    }
}
