//! Cell types for the pipeline's rasters
//!
//! Water-class and flow-direction grids are `u8`; flow accumulation and
//! elevation are `f32`/`f64`. Wider integer types show up when reading
//! third-party GeoTIFFs.

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

pub trait RasterElement:
    Copy + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Stored when a value read from disk does not fit the cell type
    const UNREPRESENTABLE: Self;

    /// Whether `self` is missing data, given the raster's declared sentinel
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Cast from a decoded sample, saturating to [`Self::UNREPRESENTABLE`]
    fn from_f64(value: f64) -> Self {
        <Self as NumCast>::from(value).unwrap_or(Self::UNREPRESENTABLE)
    }
}

macro_rules! integer_cells {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            const UNREPRESENTABLE: Self = 0;

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }
        }
    )*};
}

macro_rules! float_cells {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            const UNREPRESENTABLE: Self = <$t>::NAN;

            // NaN is missing whatever the header says
            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                self.is_nan() || nodata.is_some_and(|nd| (self - nd).abs() < <$t>::EPSILON * 100.0)
            }
        }
    )*};
}

integer_cells!(u8, u16, u32, i16, i32, i64);
float_cells!(f32, f64);
