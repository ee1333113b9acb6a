//! Transect generation: perpendicular-to-flow segments drawn on an
//! operational grid and vectorized into polygons with centroid ids.

mod chunk;
mod generate;
mod half_length;
mod rasterize;
mod vectorize;

pub use chunk::{partition_points, PointChunk};
pub use generate::{generate_transects, TransectParams, TransectRasterizer, TransectReport, TransectSet};
pub use half_length::HalfLengthBuckets;
pub use rasterize::{
    directional_distance, draw_group, draw_transects, group_points, transect_grid, DrawGroup,
    DrawnTransects,
};
pub use vectorize::{
    find_duplicate_ids, label_components, transect_id, transects_to_features, vectorize_transects,
    Transect, VectorizeReport, PIXEL_COUNT_FIELD, TX_ID_FIELD,
};
