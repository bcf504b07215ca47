use std::io::{Read, Seek, SeekFrom};

use crate::assets::{dib, jpeg, png};

/// Container formats the loaders understand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ImageFormat {
    /// PNG (signature match).
    Png,
    /// JPEG (the decoder accepted the header).
    Jpeg,
    /// Uncompressed Microsoft DIB / BMP.
    Dib,
    /// None of the above.
    Unknown,
}

/// Classify the image starting at the stream's current position.
///
/// Header checks run PNG, then JPEG, then DIB. The stream is rewound to where it started after
/// every check, whatever the outcome, so detection has no visible effect on the caller's stream.
pub fn detect_format<R: Read + Seek>(stream: &mut R) -> ImageFormat {
    let Ok(start) = stream.stream_position() else {
        return ImageFormat::Unknown;
    };

    let checks: [(ImageFormat, fn(&mut R) -> bool); 3] = [
        (ImageFormat::Png, |s| png::verify_header(s).is_ok()),
        (ImageFormat::Jpeg, |s| jpeg::verify_header(s).is_ok()),
        (ImageFormat::Dib, |s| dib::verify_header(s).is_ok()),
    ];

    let mut detected = ImageFormat::Unknown;
    for (format, check) in checks {
        let matched = check(stream);
        if let Err(err) = stream.seek(SeekFrom::Start(start)) {
            tracing::debug!(error = %err, "could not rewind stream after header check");
            return ImageFormat::Unknown;
        }
        if matched {
            detected = format;
            break;
        }
    }

    tracing::debug!(format = ?detected, "detected image format");
    detected
}

#[cfg(test)]
#[path = "../../tests/unit/assets/detect.rs"]
mod tests;
