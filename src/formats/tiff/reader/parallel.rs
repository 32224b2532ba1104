//! Parallel block decoding

use rayon::prelude::*;
use tracing::trace;

use crate::error::Result;
use crate::types::RasterBuffer;
use super::blocks::BlockLayout;

/// Decodes every block concurrently
///
/// `decode` returns the clipped values of one block. Blocks cover disjoint
/// regions, so results are written back in index order once all are done.
/// Strip rasters, one block per block row, are spread across threads too.
pub fn decode_blocks<F>(layout: &BlockLayout, raster: &mut RasterBuffer, decode: F) -> Result<()>
where
    F: Fn(usize) -> Result<Vec<f64>> + Sync,
{
    let decoded: Vec<Vec<f64>> = (0..layout.block_count())
        .into_par_iter()
        .map(|index| decode(index))
        .collect::<Result<_>>()?;

    for (index, values) in decoded.into_iter().enumerate() {
        let rect = layout.rect(index);
        raster.write_region(rect.x, rect.y, rect.width, &values);
    }
    trace!(blocks = layout.block_count(), "decoded blocks in parallel");

    Ok(())
}

/// Decodes every block in row-major block order on the calling thread
pub fn decode_sequential<F>(layout: &BlockLayout, raster: &mut RasterBuffer, decode: F) -> Result<()>
where
    F: Fn(usize) -> Result<Vec<f64>>,
{
    for index in 0..layout.block_count() {
        let values = decode(index)?;
        let rect = layout.rect(index);
        raster.write_region(rect.x, rect.y, rect.width, &values);
    }
    Ok(())
}
