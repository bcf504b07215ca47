use std::io::{self, Read};

use jpeg_decoder::{Decoder, PixelFormat};

use crate::assets::loader::LoadOpts;
use crate::foundation::core::{Argb32, Bitmap};
use crate::foundation::error::{TexprepError, TexprepResult};

const INPUT_BUF_SIZE: usize = 4096;
const EOI_MARKER: [u8; 2] = [0xff, 0xd9];

/// Buffered byte source handed to the JPEG decoder.
///
/// Reads the underlying stream in 4 KiB chunks. Hitting end-of-file before any byte arrived is an
/// error; hitting it later feeds the decoder an EOI marker so a truncated file terminates the
/// decode instead of stalling it.
pub(crate) struct JpegSource<'a, R> {
    inner: &'a mut R,
    buf: Box<[u8]>,
    pos: usize,
    len: usize,
    start_of_file: bool,
}

impl<'a, R: Read> JpegSource<'a, R> {
    pub(crate) fn new(inner: &'a mut R) -> Self {
        Self {
            inner,
            buf: vec![0u8; INPUT_BUF_SIZE].into_boxed_slice(),
            pos: 0,
            len: 0,
            start_of_file: true,
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        let mut n = loop {
            match self.inner.read(&mut self.buf) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        };

        if n == 0 {
            if self.start_of_file {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "JPEG input is empty",
                ));
            }
            tracing::warn!("premature end of JPEG data; inserting EOI marker");
            self.buf[..EOI_MARKER.len()].copy_from_slice(&EOI_MARKER);
            n = EOI_MARKER.len();
        }

        self.pos = 0;
        self.len = n;
        self.start_of_file = false;
        Ok(())
    }
}

impl<R: Read> Read for JpegSource<'_, R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        if self.pos == self.len {
            self.fill()?;
        }
        let n = out.len().min(self.len - self.pos);
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Single recovery point for decoder aborts: every decoder error becomes a loader error.
fn trap(err: jpeg_decoder::Error) -> TexprepError {
    TexprepError::Other(anyhow::Error::new(err).context("JPEG decoder aborted"))
}

/// Succeeds when the decoder accepts the stream's JPEG header.
pub(crate) fn verify_header<R: Read>(stream: &mut R) -> TexprepResult<()> {
    let mut decoder = Decoder::new(JpegSource::new(stream));
    decoder.read_info().map_err(trap)
}

/// Decode a baseline or progressive JPEG with one (gray) or three (RGB) output channels.
pub(crate) fn read_bitmap<R: Read>(stream: &mut R, opts: &LoadOpts) -> TexprepResult<Bitmap> {
    let mut decoder = Decoder::new(JpegSource::new(stream));
    decoder.set_max_decoding_buffer_size(opts.max_decode_bytes);
    decoder.read_info().map_err(trap)?;

    let info = decoder
        .info()
        .ok_or_else(|| TexprepError::decode("JPEG header has no frame"))?;
    let (width, height) = (u32::from(info.width), u32::from(info.height));
    opts.check_dimensions(width, height)?;

    let channels = match info.pixel_format {
        PixelFormat::L8 => 1,
        PixelFormat::RGB24 => 3,
        other => {
            return Err(TexprepError::unsupported(format!(
                "JPEG output with {} bytes per pixel",
                other.pixel_bytes()
            )));
        }
    };

    let data = decoder.decode().map_err(trap)?;
    let row_len = width as usize * channels;
    if data.len() < row_len * height as usize {
        return Err(TexprepError::decode("JPEG decoder returned a short image"));
    }

    let mut bitmap = Bitmap::with_size(width, height);
    for (y, src) in data.chunks_exact(row_len).take(height as usize).enumerate() {
        let dst = bitmap.row_mut(y as u32);
        if channels == 1 {
            for (d, &v) in dst.iter_mut().zip(src) {
                *d = Argb32::opaque(v, v, v);
            }
        } else {
            for (d, s) in dst.iter_mut().zip(src.chunks_exact(3)) {
                *d = Argb32::opaque(s[0], s[1], s[2]);
            }
        }
    }
    Ok(bitmap)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/jpeg.rs"]
mod tests;
