use crate::error;
use crate::util::Result;
use gdal::raster::{RasterizeOptions, rasterize};
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use gdal::vector::{Geometry, ToGdal};
use gdal::cpl::CslStringList;
use gdal::{Dataset, DatasetOptions, Driver, DriverManager, GdalOpenFlags};
use geo::MultiPolygon;
use hydrogrid_datatypes::error::Error as DataTypeError;
use hydrogrid_datatypes::operations::{CoordinateTransformEngine, WarpRequest, WarpedRaster};
use hydrogrid_datatypes::primitives::{CrsUnit, Envelope, UnitKind};
use hydrogrid_datatypes::raster::{GdalGeoTransform, GeoTransform, ResamplingMethod};
use hydrogrid_datatypes::spatial_reference::{Authority, CrsDefinition, SpatialReference};
use snafu::ResultExt;
use std::ffi::c_int;
use std::path::Path;
use tracing::{debug, trace};

/// Number of points per envelope edge that are transformed to find the target bounds
const ENVELOPE_DENSIFY_POINTS: i32 = 21;

/// # Errors
/// This function fails if the dataset cannot be opened.
pub fn gdal_open_dataset_ex(path: &Path, dataset_options: DatasetOptions) -> Result<Dataset> {
    #[cfg(debug_assertions)]
    let dataset_options = {
        let mut dataset_options = dataset_options;
        dataset_options.open_flags |= GdalOpenFlags::GDAL_OF_VERBOSE_ERROR;
        dataset_options
    };

    Dataset::open_ex(path, dataset_options).context(error::Gdal)
}

/// Opens a dataset with vector drivers only
///
/// # Errors
/// This function fails if the dataset cannot be opened.
pub fn gdal_open_vector_dataset(path: &Path) -> Result<Dataset> {
    gdal_open_dataset_ex(
        path,
        DatasetOptions {
            open_flags: GdalOpenFlags::GDAL_OF_VECTOR,
            ..DatasetOptions::default()
        },
    )
}

/// A [`CoordinateTransformEngine`] backed by GDAL/OGR and PROJ
#[derive(Debug, Clone, Copy, Default)]
pub struct GdalTransformEngine;

impl GdalTransformEngine {
    pub fn new() -> Self {
        Self
    }

    /// Resolves a descriptor with GDAL and pins the axis order to `x = easting/longitude`
    fn spatial_ref(
        crs: &SpatialReference,
    ) -> std::result::Result<SpatialRef, gdal::errors::GdalError> {
        let mut spatial_ref = SpatialRef::from_definition(crs.wkt())?;
        spatial_ref.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        Ok(spatial_ref)
    }

    fn coord_transform(
        from: &SpatialReference,
        to: &SpatialReference,
    ) -> hydrogrid_datatypes::util::Result<CoordTransform> {
        let from = Self::spatial_ref(from).map_err(coordinate_transform_error)?;
        let to = Self::spatial_ref(to).map_err(coordinate_transform_error)?;
        CoordTransform::new(&from, &to).map_err(coordinate_transform_error)
    }

    fn source_dataset(
        driver: &Driver,
        request: &WarpRequest<'_>,
    ) -> std::result::Result<Dataset, gdal::errors::GdalError> {
        let source_grid = request.source.grid();

        let mut source_dataset =
            driver.create_with_band_type::<f32, _>("", source_grid.nx(), source_grid.ny(), 1)?;
        let source_geo_transform: GdalGeoTransform = source_grid.geo_transform().into();
        source_dataset.set_geo_transform(&source_geo_transform)?;
        source_dataset.set_spatial_ref(&Self::spatial_ref(request.source_crs())?)?;
        {
            let mut band = source_dataset.rasterband(1)?;
            band.set_no_data_value(Some(f64::from(request.no_data())))?;
            let mut buffer = gdal::raster::Buffer::new(
                (source_grid.nx(), source_grid.ny()),
                request.source.data().to_vec(),
            );
            band.write((0, 0), (source_grid.nx(), source_grid.ny()), &mut buffer)?;
        }

        Ok(source_dataset)
    }

    fn warp_with_gdal(
        driver: &Driver,
        request: &WarpRequest<'_>,
        source_dataset: &Dataset,
        target_envelope: Envelope,
        cell_size: f64,
    ) -> std::result::Result<WarpedRaster, gdal::errors::GdalError> {
        let source_grid = request.source.grid();

        let nx = cells_along(target_envelope.width(), cell_size);
        let ny = cells_along(target_envelope.height(), cell_size);
        let geo_transform = GeoTransform::new_with_coordinate_x_y(
            target_envelope.min_x(),
            cell_size,
            target_envelope.max_y(),
            -cell_size,
        );

        let mut target_dataset = driver.create_with_band_type::<f32, _>("", nx, ny, 1)?;
        let target_geo_transform: GdalGeoTransform = geo_transform.into();
        target_dataset.set_geo_transform(&target_geo_transform)?;
        target_dataset.set_spatial_ref(&Self::spatial_ref(request.target_crs)?)?;
        {
            let mut band = target_dataset.rasterband(1)?;
            band.set_no_data_value(Some(f64::from(request.no_data())))?;
            band.fill(f64::from(request.no_data()), None)?;
        }

        debug!(
            "warping {}x{} cells onto {nx}x{ny} cells of size {cell_size} using {}",
            source_grid.nx(),
            source_grid.ny(),
            request.method
        );

        // projections are read from the datasets, the source no-data value from its band
        let result = unsafe {
            gdal_sys::GDALReprojectImage(
                source_dataset.c_dataset(),
                std::ptr::null(),
                target_dataset.c_dataset(),
                std::ptr::null(),
                gdal_resample_alg(request.method),
                0.0,
                0.0,
                None,
                std::ptr::null_mut(),
                std::ptr::null(),
            )
        };
        if result != gdal_sys::CPLErr::CE_None {
            return Err(last_cpl_error(result, "GDALReprojectImage"));
        }

        let mut data = vec![request.no_data(); nx * ny];
        target_dataset
            .rasterband(1)?
            .read_into_slice::<f32>((0, 0), (nx, ny), (nx, ny), &mut data, None)?;

        Ok(WarpedRaster {
            geo_transform,
            nx,
            ny,
            data,
        })
    }

    fn rasterize_with_gdal(
        geometry: &MultiPolygon<f64>,
        geo_transform: &GeoTransform,
        nx: usize,
        ny: usize,
    ) -> std::result::Result<Vec<bool>, gdal::errors::GdalError> {
        let driver = DriverManager::get_driver_by_name("MEM")?;
        let mut dataset = driver.create_with_band_type::<u8, _>("", nx, ny, 1)?;
        let gdal_geo_transform: GdalGeoTransform = (*geo_transform).into();
        dataset.set_geo_transform(&gdal_geo_transform)?;

        let geometry: Geometry = geometry.to_gdal()?;

        // only cells whose center lies inside the geometry are burned
        rasterize(
            &mut dataset,
            &[1],
            &[geometry],
            &[1.0],
            Some(RasterizeOptions {
                all_touched: false,
                ..RasterizeOptions::default()
            }),
        )?;

        let mut burned = vec![0u8; nx * ny];
        dataset
            .rasterband(1)?
            .read_into_slice::<u8>((0, 0), (nx, ny), (nx, ny), &mut burned, None)?;

        Ok(burned.into_iter().map(|value| value != 0).collect())
    }
}

impl CoordinateTransformEngine for GdalTransformEngine {
    fn parse_crs(
        &self,
        crs: &SpatialReference,
    ) -> hydrogrid_datatypes::util::Result<CrsDefinition> {
        let spatial_ref = Self::spatial_ref(crs).map_err(coordinate_transform_error)?;
        Ok(definition_of(&spatial_ref))
    }

    fn is_same_crs(&self, a: &SpatialReference, b: &SpatialReference) -> bool {
        if a.is_same_reference_system(b) {
            return true;
        }

        match (Self::spatial_ref(a), Self::spatial_ref(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    fn transform_envelope(
        &self,
        envelope: &Envelope,
        from: &SpatialReference,
        to: &SpatialReference,
    ) -> hydrogrid_datatypes::util::Result<Envelope> {
        let transform = Self::coord_transform(from, to)?;

        let [min_x, min_y, max_x, max_y] = transform
            .transform_bounds(
                &[
                    envelope.min_x(),
                    envelope.min_y(),
                    envelope.max_x(),
                    envelope.max_y(),
                ],
                ENVELOPE_DENSIFY_POINTS,
            )
            .map_err(coordinate_transform_error)?;

        trace!("transformed {envelope} to [{min_x}, {max_x}] x [{min_y}, {max_y}]");

        Envelope::new(min_x, max_x, min_y, max_y)
    }

    fn transform_geometry(
        &self,
        geometry: &MultiPolygon<f64>,
        from: &SpatialReference,
        to: &SpatialReference,
    ) -> hydrogrid_datatypes::util::Result<MultiPolygon<f64>> {
        let transform = Self::coord_transform(from, to)?;

        let transformed = geometry
            .to_gdal()
            .and_then(|geometry| geometry.transform(&transform))
            .and_then(|geometry| geometry.to_geo())
            .map_err(coordinate_transform_error)?;

        match transformed {
            geo::Geometry::MultiPolygon(multi_polygon) => Ok(multi_polygon),
            geo::Geometry::Polygon(polygon) => Ok(MultiPolygon::new(vec![polygon])),
            _ => Err(DataTypeError::CoordinateTransform {
                details: "the transformed geometry is no longer a polygon".to_string(),
            }),
        }
    }

    fn warp(&self, request: &WarpRequest<'_>) -> hydrogrid_datatypes::util::Result<WarpedRaster> {
        let driver = DriverManager::get_driver_by_name("MEM").map_err(warp_error)?;
        let source_dataset = Self::source_dataset(&driver, request).map_err(warp_error)?;

        let (target_envelope, cell_size) =
            match (request.target_envelope, request.target_cell_size) {
                (Some(envelope), Some(cell_size)) => (envelope, cell_size),
                (envelope, cell_size) => {
                    let target_srs = Self::spatial_ref(request.target_crs).map_err(warp_error)?;
                    let suggestion =
                        suggested_warp_output(&source_dataset, &target_srs).map_err(warp_error)?;
                    debug!(
                        "GDAL suggests cells of size {} within {:?}",
                        suggestion.cell_size, suggestion.extent
                    );

                    let envelope = match envelope {
                        Some(envelope) => envelope,
                        None => suggestion.envelope()?,
                    };
                    (envelope, cell_size.unwrap_or(suggestion.cell_size))
                }
            };

        if !(cell_size.is_finite() && cell_size > 0.) {
            return Err(DataTypeError::Warp {
                details: format!("cannot warp to a cell size of {cell_size}"),
            });
        }

        Self::warp_with_gdal(&driver, request, &source_dataset, target_envelope, cell_size)
            .map_err(warp_error)
    }

    fn rasterize_to_mask(
        &self,
        geometry: &MultiPolygon<f64>,
        geo_transform: &GeoTransform,
        nx: usize,
        ny: usize,
    ) -> hydrogrid_datatypes::util::Result<Vec<bool>> {
        if nx == 0 || ny == 0 {
            return Ok(Vec::new());
        }

        Self::rasterize_with_gdal(geometry, geo_transform, nx, ny).map_err(|error| {
            DataTypeError::Rasterization {
                details: error.to_string(),
            }
        })
    }
}

/// Reads the definition from the resolved reference system, so that GDAL does all the parsing
fn definition_of(spatial_ref: &SpatialRef) -> CrsDefinition {
    let geographic = spatial_ref.is_geographic();

    let unit = if geographic {
        spatial_ref.angular_units_name().ok().map(|name| {
            CrsUnit::new(name, UnitKind::Angular, spatial_ref.angular_units())
        })
    } else {
        spatial_ref
            .linear_units_name()
            .ok()
            .map(|name| CrsUnit::new(name, UnitKind::Linear, spatial_ref.linear_units()))
    };

    let authority = match (spatial_ref.auth_name(), spatial_ref.auth_code()) {
        (Ok(name), Ok(code)) => Some(Authority {
            name: name.to_ascii_uppercase(),
            code: code.to_string(),
        }),
        _ => None,
    };

    CrsDefinition {
        name: reference_system_name(spatial_ref),
        authority,
        geographic,
        unit: unit.filter(|unit| unit.to_base.is_finite() && unit.to_base > 0.),
    }
}

fn reference_system_name(spatial_ref: &SpatialRef) -> String {
    unsafe {
        let name = gdal_sys::OSRGetName(spatial_ref.to_c_hsrs());
        if name.is_null() {
            String::new()
        } else {
            std::ffi::CStr::from_ptr(name).to_string_lossy().into_owned()
        }
    }
}

/// The output layout GDAL's warper would choose for a whole dataset
#[derive(Debug, Clone, Copy)]
struct SuggestedWarpOutput {
    /// `[min_x, min_y, max_x, max_y]`
    extent: [f64; 4],
    cell_size: f64,
}

impl SuggestedWarpOutput {
    fn envelope(&self) -> hydrogrid_datatypes::util::Result<Envelope> {
        let [min_x, min_y, max_x, max_y] = self.extent;
        Envelope::new(min_x, max_x, min_y, max_y)
    }
}

/// Asks GDAL for the target extent and a square cell size that keep the source resolution
fn suggested_warp_output(
    source_dataset: &Dataset,
    target_srs: &SpatialRef,
) -> std::result::Result<SuggestedWarpOutput, gdal::errors::GdalError> {
    let mut options = CslStringList::new();
    options.set_name_value("DST_SRS", &target_srs.to_wkt()?)?;

    let mut geo_transform = [0.0; 6];
    let mut extent = [0.0; 4];
    let mut pixels: c_int = 0;
    let mut lines: c_int = 0;

    unsafe {
        let transformer = gdal_sys::GDALCreateGenImgProjTransformer2(
            source_dataset.c_dataset(),
            std::ptr::null_mut(),
            options.as_ptr(),
        );
        if transformer.is_null() {
            return Err(last_cpl_error(
                gdal_sys::CPLErr::CE_Failure,
                "GDALCreateGenImgProjTransformer2",
            ));
        }

        let result = gdal_sys::GDALSuggestedWarpOutput2(
            source_dataset.c_dataset(),
            Some(gdal_sys::GDALGenImgProjTransform),
            transformer,
            geo_transform.as_mut_ptr(),
            &mut pixels,
            &mut lines,
            extent.as_mut_ptr(),
            0,
        );
        gdal_sys::GDALDestroyGenImgProjTransformer(transformer);

        if result != gdal_sys::CPLErr::CE_None {
            return Err(last_cpl_error(result, "GDALSuggestedWarpOutput2"));
        }
    }

    trace!("suggested warp output has {pixels}x{lines} cells");

    Ok(SuggestedWarpOutput {
        extent,
        cell_size: geo_transform[1],
    })
}

fn warp_error(error: gdal::errors::GdalError) -> DataTypeError {
    DataTypeError::Warp {
        details: error.to_string(),
    }
}

fn coordinate_transform_error(error: gdal::errors::GdalError) -> DataTypeError {
    DataTypeError::CoordinateTransform {
        details: error.to_string(),
    }
}

fn gdal_resample_alg(method: ResamplingMethod) -> gdal_sys::GDALResampleAlg::Type {
    match method {
        ResamplingMethod::Nearest => gdal_sys::GDALResampleAlg::GRA_NearestNeighbour,
        ResamplingMethod::Bilinear => gdal_sys::GDALResampleAlg::GRA_Bilinear,
        ResamplingMethod::Average => gdal_sys::GDALResampleAlg::GRA_Average,
    }
}

/// At least one cell, so that degenerate envelopes still produce a raster
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn cells_along(extent: f64, cell_size: f64) -> usize {
    ((extent / cell_size).round() as usize).max(1)
}

fn last_cpl_error(
    class: gdal_sys::CPLErr::Type,
    method_name: &'static str,
) -> gdal::errors::GdalError {
    let msg = unsafe {
        let c_str = std::ffi::CStr::from_ptr(gdal_sys::CPLGetLastErrorMsg());
        let msg = c_str.to_string_lossy().into_owned();
        gdal_sys::CPLErrorReset();
        msg
    };

    gdal::errors::GdalError::CplError {
        class,
        number: 0,
        msg: format!("{method_name}: {msg}"),
    }
}
