//! FrameDumper - writes delivered samples to disk with a folder per stream

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::{FrameSample, MotionSample, PixelFormat, Sample, StreamKind};
use tracing::{debug, instrument};

use crate::error::{CliError, Result};

/// Writes frames as `<base>/<stream>/<index>.png` and motion samples as
/// JSON lines in `<base>/motion.jsonl`
///
/// Formats without a PNG mapping are written raw as `<index>.bin`.
pub struct FrameDumper {
    base_path: PathBuf,
    created_dirs: HashSet<PathBuf>,
    motion: Option<BufWriter<File>>,
    written: u64,
}

impl FrameDumper {
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;

        Ok(Self {
            base_path,
            created_dirs: HashSet::new(),
            motion: None,
            written: 0,
        })
    }

    /// Samples written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn write(&mut self, sample: &Sample) -> Result<()> {
        match sample {
            Sample::Frame(frame) => self.write_frame(frame)?,
            Sample::Motion(motion) => self.write_motion(motion)?,
        }
        self.written += 1;
        Ok(())
    }

    /// Flush buffered motion lines
    pub fn finish(&mut self) -> Result<()> {
        if let Some(ref mut motion) = self.motion {
            motion.flush()?;
        }
        Ok(())
    }

    #[instrument(
        level = "trace",
        name = "dump_frame",
        skip(self, frame),
        fields(stream = %frame.stream, index = frame.index)
    )]
    fn write_frame(&mut self, frame: &FrameSample) -> Result<()> {
        let stream_dir = stream_dir(&self.base_path, frame.stream);
        if !self.created_dirs.contains(&stream_dir) {
            fs::create_dir_all(&stream_dir)?;
            self.created_dirs.insert(stream_dir.clone());
        }

        let Some((color, bytes_per_pixel)) = png_layout(frame.format) else {
            let path = stream_dir.join(format!("{:06}.bin", frame.index));
            fs::write(&path, &frame.data)?;
            debug!(path = %path.display(), format = %frame.format, "Raw frame written");
            return Ok(());
        };

        let path = stream_dir.join(format!("{:06}.png", frame.index));
        let pixels = pack_pixels(frame, bytes_per_pixel).map_err(|m| CliError::dump(&path, m))?;
        image::save_buffer(&path, &pixels, frame.width, frame.height, color)
            .map_err(|e| CliError::dump(&path, e))
    }

    fn write_motion(&mut self, motion: &MotionSample) -> Result<()> {
        let path = self.base_path.join("motion.jsonl");
        if self.motion.is_none() {
            self.motion = Some(BufWriter::new(File::create(&path)?));
        }
        let Some(ref mut writer) = self.motion else {
            return Ok(());
        };
        serde_json::to_writer(&mut *writer, motion).map_err(|e| CliError::dump(&path, e))?;
        writeln!(writer)?;
        Ok(())
    }
}

fn stream_dir(base: &Path, stream: StreamKind) -> PathBuf {
    base.join(stream.as_str())
}

/// PNG color type and bytes per pixel for a pixel format
fn png_layout(format: PixelFormat) -> Option<(image::ColorType, usize)> {
    match format {
        PixelFormat::Rgb8 | PixelFormat::Bgr8 => Some((image::ColorType::Rgb8, 3)),
        PixelFormat::Rgba8 | PixelFormat::Bgra8 => Some((image::ColorType::Rgba8, 4)),
        PixelFormat::Y8 | PixelFormat::Raw8 => Some((image::ColorType::L8, 1)),
        PixelFormat::Z16 | PixelFormat::Disparity16 | PixelFormat::Y16 | PixelFormat::Raw16 => {
            Some((image::ColorType::L16, 2))
        }
        _ => None,
    }
}

/// Strip row padding and convert to the byte order `image` expects
fn pack_pixels(frame: &FrameSample, bytes_per_pixel: usize) -> std::result::Result<Vec<u8>, String> {
    let row_bytes = frame.width as usize * bytes_per_pixel;
    let stride = frame.stride as usize;
    if stride < row_bytes {
        return Err(format!("stride {stride} shorter than a {row_bytes} byte row"));
    }
    let needed = stride * frame.height.saturating_sub(1) as usize + row_bytes;
    if frame.height > 0 && frame.data.len() < needed {
        return Err(format!(
            "{} bytes of pixel data, expected at least {needed}",
            frame.data.len()
        ));
    }

    let mut pixels = Vec::with_capacity(row_bytes * frame.height as usize);
    for row in 0..frame.height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&frame.data[start..start + row_bytes]);
    }

    match frame.format {
        PixelFormat::Bgr8 | PixelFormat::Bgra8 => {
            for px in pixels.chunks_exact_mut(bytes_per_pixel) {
                px.swap(0, 2);
            }
        }
        // recorded little-endian, `image` reads 16-bit samples in native order
        _ if bytes_per_pixel == 2 => {
            for px in pixels.chunks_exact_mut(2) {
                let value = u16::from_le_bytes([px[0], px[1]]);
                px.copy_from_slice(&value.to_ne_bytes());
            }
        }
        _ => {}
    }
    Ok(pixels)
}
