//! Native GeoTIFF writing (without GDAL dependency)
//!
//! Uses the `tiff` crate. Data is written as 32-bit float grayscale with
//! the ModelPixelScale / ModelTiepoint tags carrying the georeferencing.

use std::fs::File;
use std::path::Path;

use ndarray::Array2;
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

use crate::error::{Error, Result};
use crate::raster::GeoTransform;

/// Write a 2D grid to a GeoTIFF file.
///
/// Invalid pixels should already be NaN; no nodata tag is written.
pub fn write_geotiff<P: AsRef<Path>>(
    data: &Array2<f64>,
    transform: &GeoTransform,
    path: P,
) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut encoder = TiffEncoder::new(file)
        .map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = data.dim();
    let samples: Vec<f32> = data.iter().map(|&v| v as f32).collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    // ModelPixelScaleTag
    let scale = vec![
        transform.pixel_width,
        transform.pixel_height.abs(),
        0.0,
    ];
    image
        .encoder()
        .write_tag(Tag::Unknown(33550), scale.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;

    // ModelTiepointTag
    let tiepoint = vec![0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(33922), tiepoint.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

    // GeoKeyDirectoryTag (34735), minimal entry so downstream GIS tools
    // recognize the file as a GeoTIFF. GTModelTypeGeoKey=1 (Projected),
    // GTRasterTypeGeoKey=1 (RasterPixelIsArea).
    let geokeys: Vec<u16> = vec![
        1, 1, 0, 2, // Version 1.1.0, 2 keys
        1024, 0, 1, 1, // GTModelTypeGeoKey = ModelTypeProjected
        1025, 0, 1, 1, // GTRasterTypeGeoKey = RasterPixelIsArea
    ];
    image
        .encoder()
        .write_tag(Tag::Unknown(34735), geokeys.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;

    image
        .write_data(&samples)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_geotiff_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tif");

        let data = Array2::from_shape_fn((4, 5), |(r, c)| (r * 5 + c) as f64);
        let gt = GeoTransform::new(600000.0, 5100000.0, 30.0, -30.0);

        write_geotiff(&data, &gt, &path).unwrap();
        let meta = std::fs::metadata(&path).unwrap();
        assert!(meta.len() > 0);
    }
}
