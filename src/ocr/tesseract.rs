// src/ocr/tesseract.rs

use anyhow::{bail, Context, Result};
use image::GenericImageView;
use std::{path::Path, process::Command};
use tracing::debug;

use super::TextSource;
use crate::config::CropBox;

/// OCR collaborator that shells out to the `tesseract` binary. Region
/// recognition crops the page with the `image` crate into a temporary PNG
/// first, since tesseract itself has no crop geometry.
pub struct TesseractSource {
    command: String,
}

impl TesseractSource {
    pub fn new() -> Self {
        Self {
            command: "tesseract".to_string(),
        }
    }

    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Whether the configured binary can be invoked at all.
    pub fn available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    fn run(&self, image: &Path) -> Result<String> {
        let output = Command::new(&self.command)
            .arg(image)
            .arg("stdout")
            .output()
            .with_context(|| format!("invoking {} on {}", self.command, image.display()))?;
        if !output.status.success() {
            bail!(
                "{} failed on {}: {}",
                self.command,
                image.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for TesseractSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TextSource for TesseractSource {
    fn page_text(&self, image: &Path) -> Result<String> {
        self.run(image)
    }

    fn region_text(&self, image: &Path, crop: &CropBox) -> Result<String> {
        let page = image::open(image)
            .with_context(|| format!("opening image {}", image.display()))?;
        let (width, height) = page.dimensions();

        // A right/bottom of 0 means the image edge.
        let right = if crop.right == 0 { width } else { crop.right.min(width) };
        let bottom = if crop.bottom == 0 { height } else { crop.bottom.min(height) };
        if crop.left >= right || crop.top >= bottom {
            bail!(
                "crop ({},{})-({},{}) is empty for {}x{} image {}",
                crop.left,
                crop.top,
                right,
                bottom,
                width,
                height,
                image.display()
            );
        }

        let region = image::imageops::crop_imm(
            &page,
            crop.left,
            crop.top,
            right - crop.left,
            bottom - crop.top,
        )
        .to_image();

        let tmp = tempfile::Builder::new()
            .prefix("crscraper-region-")
            .suffix(".png")
            .tempfile()
            .context("creating temp file for cropped region")?;
        region
            .save(tmp.path())
            .with_context(|| format!("saving cropped region of {}", image.display()))?;
        debug!(
            left = crop.left,
            top = crop.top,
            right,
            bottom,
            "cropped region for {}",
            image.display()
        );

        self.run(tmp.path())
    }
}
