use image::ImageError;

use std::error::Error;
use std::fmt;
use std::io::Error as IOError;

#[derive(Debug)]
pub struct LprError(LprErrorKind);

#[derive(Debug)]
pub enum LprErrorKind {
    IOError(IOError),
    /// image buffer could not be decoded (or encoded back)
    UnreadableImage(ImageError),
    /// region with zero pixels handed to a stage that needs pixels
    InvalidRegion { width: u32, height: u32 },
    /// ocr returned no fragments at all
    NoTextDetected,
    RegexError(regex::Error),
    CsvError(csv::Error),
}

impl LprError {
    pub fn kind(&self) -> &LprErrorKind {
        &self.0
    }

    pub fn invalid_region(width: u32, height: u32) -> Self {
        Self(LprErrorKind::InvalidRegion { width, height })
    }

    pub fn no_text() -> Self {
        Self(LprErrorKind::NoTextDetected)
    }

    pub fn is_no_text(&self) -> bool {
        matches!(self.0, LprErrorKind::NoTextDetected)
    }
}

impl<T> From<T> for LprError
where T: Into<LprErrorKind>
{
    fn from(e: T) -> Self {
        Self(e.into())
    }
}

impl fmt::Display for LprError {

    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            LprErrorKind::IOError(e) => e.fmt(f),
            LprErrorKind::UnreadableImage(e) => write!(f, "unreadable image: {}", e),
            LprErrorKind::InvalidRegion { width, height } => {
                write!(f, "invalid region: {}x{} has no pixels", width, height)
            },
            LprErrorKind::NoTextDetected => write!(f, "no text detected"),
            LprErrorKind::RegexError(e) => e.fmt(f),
            LprErrorKind::CsvError(e) => e.fmt(f),
        }
    }
}

impl Error for LprError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self.kind() {
            LprErrorKind::IOError(e) => Some(e),
            LprErrorKind::UnreadableImage(e) => Some(e),
            LprErrorKind::RegexError(e) => Some(e),
            LprErrorKind::CsvError(e) => Some(e),
            LprErrorKind::InvalidRegion { .. } | LprErrorKind::NoTextDetected => None,
        }
    }
}

impl From<IOError> for LprErrorKind {
    fn from(e: IOError) -> Self {
        Self::IOError(e)
    }
}

impl From<ImageError> for LprErrorKind {
    fn from(e: ImageError) -> Self {
        Self::UnreadableImage(e)
    }
}

impl From<regex::Error> for LprErrorKind {
    fn from(e: regex::Error) -> Self {
        Self::RegexError(e)
    }
}

impl From<csv::Error> for LprErrorKind {
    fn from(e: csv::Error) -> Self {
        Self::CsvError(e)
    }
}
