//! Native GeoTIFF reading and writing through the `tiff` crate.
//!
//! Georeferencing is carried in the ModelPixelScale / ModelTiepoint tags,
//! the CRS as an EPSG code in the GeoKey directory and the no-data value in
//! the GDAL_NODATA tag. Multi-band rasters are stored one band per page
//! with an optional free-text description on the first page.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::{ColorType, Gray32Float, Gray64Float, Gray8};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

const KEY_MODEL_TYPE: u16 = 1024;
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;

/// Sample type written to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelType {
    /// Categorical rasters: flow direction, water class
    UInt8,
    #[default]
    Float32,
    Float64,
}

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    pub pixel_type: PixelType,
}

impl GeoTiffOptions {
    pub fn uint8() -> Self {
        Self { pixel_type: PixelType::UInt8 }
    }
}

/// Bands of a multi-page GeoTIFF, in page order
#[derive(Debug, Clone)]
pub struct MultiBand<T: RasterElement> {
    pub bands: Vec<Raster<T>>,
    /// ImageDescription of the first page
    pub description: Option<String>,
}

/// Read one page of a GeoTIFF file into a Raster.
///
/// `band` is the zero-based page index; `None` reads the first page.
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = BufReader::new(File::open(path.as_ref())?);
    let mut decoder = open_decoder(file)?;
    let page = band.unwrap_or(0);

    for skipped in 0..page {
        if !decoder.more_images() {
            return Err(Error::InvalidParameter {
                name: "band",
                value: page.to_string(),
                reason: format!("file has only {} page(s)", skipped + 1),
            });
        }
        decoder.next_image()?;
    }

    decode_page(&mut decoder)
}

/// Read every page of a GeoTIFF file
pub fn read_geotiff_bands<T, P>(path: P) -> Result<MultiBand<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = BufReader::new(File::open(path.as_ref())?);
    let mut decoder = open_decoder(file)?;
    let description = decoder.get_tag_ascii_string(Tag::ImageDescription).ok();

    let mut bands = vec![decode_page(&mut decoder)?];
    while decoder.more_images() {
        decoder.next_image()?;
        bands.push(decode_page(&mut decoder)?);
    }

    Ok(MultiBand { bands, description })
}

fn open_decoder<R: Read + Seek>(reader: R) -> Result<Decoder<R>> {
    Ok(Decoder::new(reader)?.with_limits(Limits::unlimited()))
}

macro_rules! cast_buffer {
    ($buf:expr) => {
        $buf.iter()
            .map(|&v| num_traits::cast(v).unwrap_or(T::UNREPRESENTABLE))
            .collect()
    };
}

/// Decode the current page of `decoder`
fn decode_page<T, R>(decoder: &mut Decoder<R>) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;

    let data: Vec<T> = match decoder.read_image()? {
        DecodingResult::U8(buf) => cast_buffer!(buf),
        DecodingResult::U16(buf) => cast_buffer!(buf),
        DecodingResult::U32(buf) => cast_buffer!(buf),
        DecodingResult::U64(buf) => cast_buffer!(buf),
        DecodingResult::I8(buf) => cast_buffer!(buf),
        DecodingResult::I16(buf) => cast_buffer!(buf),
        DecodingResult::I32(buf) => cast_buffer!(buf),
        DecodingResult::I64(buf) => cast_buffer!(buf),
        DecodingResult::F32(buf) => cast_buffer!(buf),
        DecodingResult::F64(buf) => cast_buffer!(buf),
        #[allow(unreachable_patterns)]
        _ => return Err(Error::UnsupportedDataType("unsupported TIFF sample format".to_string())),
    };

    if data.len() != rows * cols {
        return Err(Error::UnsupportedDataType(format!(
            "expected {} single-channel samples, found {}",
            rows * cols,
            data.len()
        )));
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(decoder) {
        raster.set_transform(transform);
    }
    raster.set_crs(read_crs(decoder));
    raster.set_nodata(
        decoder
            .get_tag_ascii_string(Tag::from_u16_exhaustive(TAG_GDAL_NODATA))
            .ok()
            .and_then(|s| s.trim().trim_end_matches('\0').parse::<f64>().ok())
            .map(T::from_f64),
    );

    Ok(raster)
}

/// GeoTransform from ModelPixelScale + ModelTiepoint
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE)).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT)).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// EPSG code from the GeoKey directory
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u16_vec(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY)).ok()?;
    let count = *keys.get(3)? as usize;

    keys.get(4..4 + 4 * count)?
        .chunks_exact(4)
        .filter(|entry| entry[1] == 0)
        .find(|entry| entry[0] == KEY_PROJECTED_CS_TYPE || entry[0] == KEY_GEOGRAPHIC_TYPE)
        .map(|entry| CRS::from_epsg(entry[3] as u32))
}

/// Write a Raster to a single-page GeoTIFF file
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    write_geotiff_bands(&[raster], None, path, options)
}

/// Write rasters as consecutive pages of one GeoTIFF file.
///
/// All bands must share the first band's grid.
pub fn write_geotiff_bands<T, P>(
    bands: &[&Raster<T>],
    description: Option<&str>,
    path: P,
    options: Option<GeoTiffOptions>,
) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let first = bands.first().ok_or_else(|| Error::InvalidParameter {
        name: "bands",
        value: "0".to_string(),
        reason: "at least one band is required".to_string(),
    })?;
    for band in &bands[1..] {
        first.ensure_same_grid(*band)?;
    }

    let options = options.unwrap_or_default();
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    {
        let mut encoder = TiffEncoder::new(&mut writer)?;
        for (page, band) in bands.iter().enumerate() {
            let description = if page == 0 { description } else { None };
            match options.pixel_type {
                PixelType::UInt8 => {
                    let data: Vec<u8> = band
                        .data()
                        .iter()
                        .map(|&v| num_traits::cast(v).unwrap_or(0))
                        .collect();
                    encode_page::<Gray8, _, _>(&mut encoder, band, &data, description)?;
                }
                PixelType::Float32 => {
                    let data: Vec<f32> = band
                        .data()
                        .iter()
                        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
                        .collect();
                    encode_page::<Gray32Float, _, _>(&mut encoder, band, &data, description)?;
                }
                PixelType::Float64 => {
                    let data: Vec<f64> = band
                        .data()
                        .iter()
                        .map(|&v| num_traits::cast(v).unwrap_or(f64::NAN))
                        .collect();
                    encode_page::<Gray64Float, _, _>(&mut encoder, band, &data, description)?;
                }
            }
        }
    }
    writer.flush()?;
    Ok(())
}

fn encode_page<C, T, W>(
    encoder: &mut TiffEncoder<W>,
    raster: &Raster<T>,
    data: &[C::Inner],
    description: Option<&str>,
) -> Result<()>
where
    C: ColorType,
    [C::Inner]: TiffValue,
    T: RasterElement,
    W: Write + Seek,
{
    let (rows, cols) = raster.shape();
    let mut image = encoder.new_image::<C>(cols as u32, rows as u32)?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image.encoder().write_tag(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE), &scale[..])?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image.encoder().write_tag(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT), &tiepoint[..])?;

    let geokeys = geokey_directory(raster.crs());
    image.encoder().write_tag(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY), &geokeys[..])?;

    if let Some(nodata) = raster.nodata().and_then(num_traits::cast::<T, f64>) {
        image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(TAG_GDAL_NODATA), nodata.to_string().as_str())?;
    }
    if let Some(text) = description {
        image.encoder().write_tag(Tag::ImageDescription, text)?;
    }

    image.write_data(data)?;
    Ok(())
}

/// Minimal GeoKey directory: model type, pixel-is-area and the EPSG code
fn geokey_directory(crs: Option<&CRS>) -> Vec<u16> {
    let geographic = crs.is_some_and(CRS::is_geographic);
    let model_type = if geographic { 2 } else { 1 };
    let epsg = crs.and_then(CRS::epsg).and_then(|c| u16::try_from(c).ok());

    let mut keys: Vec<u16> = vec![1, 1, 0, 2, KEY_MODEL_TYPE, 0, 1, model_type, KEY_RASTER_TYPE, 0, 1, 1];
    if let Some(code) = epsg {
        let key = if geographic { KEY_GEOGRAPHIC_TYPE } else { KEY_PROJECTED_CS_TYPE };
        keys.extend_from_slice(&[key, 0, 1, code]);
        keys[3] = 3;
    }
    keys
}
