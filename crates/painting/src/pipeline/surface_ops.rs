//! Whole-surface operations: clear and export

use tracing::info;

use crate::export::{EncodedImage, ExportError, ExportRegion, compute_bounding_box, encode, encode_full};
use crate::types::Rgba;

use super::Sketchpad;

impl Sketchpad {
    /// Fill the canvas with its background color, recording an undo snapshot first
    pub fn clear(&mut self) {
        let background = self.surface.background();
        self.clear_with(background);
    }

    /// Fill the canvas with `background`, which becomes the new eraser color
    pub fn clear_with(&mut self, background: Rgba) {
        if self.surface.is_stroking() {
            self.end_stroke();
        }
        self.history.push(self.surface.snapshot());
        self.surface.clear(background);
        info!("Canvas cleared ({} undo levels)", self.history.len());
    }

    /// Bounding box of the drawing with the session padding
    pub fn export_region(&self) -> Result<ExportRegion, ExportError> {
        compute_bounding_box(
            self.surface.read_pixels(),
            self.surface.width(),
            self.surface.height(),
            self.surface.background(),
            self.export_padding,
        )
    }

    /// Autocropped PNG of the drawing, as sent to the enhance service
    pub fn export_sketch(&self) -> Result<(ExportRegion, EncodedImage), ExportError> {
        let region = self.export_region()?;
        let image = encode(self.surface.read_pixels(), self.surface.width(), self.surface.height(), &region)?;
        info!(
            "Exported sketch region ({}, {})..({}, {})",
            region.min_x, region.min_y, region.max_x, region.max_y
        );
        Ok((region, image))
    }

    /// Full, uncropped PNG of the canvas for the user download
    pub fn download(&self) -> Result<EncodedImage, ExportError> {
        encode_full(self.surface.read_pixels(), self.surface.width(), self.surface.height())
    }
}

#[cfg(test)]
mod tests {
    use crate::constants::{BLACK, WHITE};
    use crate::pipeline::Sketchpad;

    #[test]
    fn test_clear_is_undoable() {
        let mut pad = Sketchpad::new(32, 32, WHITE, None).unwrap();
        pad.begin_stroke(0.0, 16.0);
        pad.stroke_to(32.0, 16.0);
        pad.end_stroke();
        let drawn = pad.surface().read_pixels().to_vec();

        pad.clear();
        assert!(pad.surface().read_pixels().iter().all(|&p| p == WHITE));
        assert_eq!(pad.undo_count(), 2);

        assert!(pad.undo());
        assert_eq!(pad.surface().read_pixels(), drawn.as_slice());
    }

    #[test]
    fn test_clear_with_changes_eraser_color() {
        let mut pad = Sketchpad::new(16, 16, WHITE, None).unwrap();
        pad.clear_with(BLACK);
        assert_eq!(pad.surface().background(), BLACK);
        // A blank black canvas exports whole
        assert!(pad.export_region().unwrap().is_blank());

        assert!(pad.undo());
        assert_eq!(pad.surface().background(), WHITE);
        assert!(pad.export_region().unwrap().is_blank());
    }

    #[test]
    fn test_download_is_full_canvas() {
        let mut pad = Sketchpad::new(40, 30, WHITE, None).unwrap();
        pad.begin_stroke(10.0, 10.0);
        pad.stroke_to(12.0, 12.0);
        pad.end_stroke();

        let full = pad.download().unwrap();
        assert_eq!((full.width, full.height), (40, 30));

        let (region, sketch) = pad.export_sketch().unwrap();
        assert!(!region.is_blank());
        assert!(sketch.width < 40 || sketch.height < 30);
    }
}
