//! # Scenario Views
//!
//! Everything the map renderer needs for the side-by-side comparison, as
//! plain serializable data: two column layers (baseline red, mitigated
//! blue), an optional green lot overlay on the mitigated side, the shared
//! camera, the summary line and any load warnings.
//!
//! ## Table of Contents
//! 1. Layer descriptors
//! 2. ScenarioViews — Both panels + camera
//! 3. ScenarioStatus — Warnings + info line
//! 4. GeoJSON export

use bevy::prelude::*;
use geo::{LineString, Polygon};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use soundview_geo::{LotIndex, MitigationPolygon};

use crate::config::DashboardConfig;
use crate::mitigation::DerivedDepths;
use crate::samples::SampleSet;
use crate::session::ScenarioFrame;

pub const BASELINE_HEADING: &str = "Baseline: Current Infrastructure";
pub const MITIGATED_HEADING: &str = "Proposed: Green Infrastructure";

// ============================================================================
// 1. Layer descriptors
// ============================================================================

/// One extruded column per sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnDatum {
    /// `[lon, lat]`
    pub position: [f64; 2],
    pub elevation: f64,
}

/// Extruded column layer over the sample set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnLayer {
    pub id: String,
    /// Depth column the elevations were taken from
    pub elevation_field: String,
    pub elevation_scale: f32,
    /// Meters
    pub radius: f32,
    pub fill_color: [u8; 4],
    pub data: Vec<ColumnDatum>,
}

/// Lot polygons drawn under the mitigated columns
#[derive(Debug, Clone, Serialize)]
pub struct LotOverlay {
    pub id: String,
    pub fill_color: [u8; 4],
    pub line_color: [u8; 3],
    pub data: FeatureCollection,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum LayerDescriptor {
    #[serde(rename = "ColumnLayer")]
    Column(ColumnLayer),
    #[serde(rename = "GeoJsonLayer")]
    Lots(LotOverlay),
}

// ============================================================================
// 2. ScenarioViews — Both panels + camera
// ============================================================================

/// Initial camera shared by both panels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewPanel {
    pub heading: String,
    /// Draw order: first is bottom
    pub layers: Vec<LayerDescriptor>,
}

#[derive(Resource, Debug, Clone, Serialize)]
pub struct ScenarioViews {
    pub baseline: ViewPanel,
    pub mitigated: ViewPanel,
    pub view_state: ViewState,
    pub summary: String,
}

/// Info line shown under the map panels
pub fn summary_text(time_step: u32) -> String {
    format!(
        "Visualizing T+{} minutes. Left shows current risk (Red). Right shows 3D flood reduction via green conversion (Blue).",
        time_step
    )
}

/// Build both panels for `frame`. The lot overlay only appears when lots
/// were actually loaded.
pub fn build_views(samples: &SampleSet, lots: &LotIndex, frame: &ScenarioFrame, config: &DashboardConfig) -> ScenarioViews {
    let style = &config.style;
    let columns = |id: &str, field: &str, color: [u8; 4], depth: fn(&DerivedDepths) -> f64| {
        ColumnLayer {
            id: id.to_string(),
            elevation_field: field.to_string(),
            elevation_scale: style.elevation_scale,
            radius: style.radius,
            fill_color: color,
            data: samples
                .points()
                .iter()
                .zip(&frame.depths)
                .map(|(point, derived)| ColumnDatum {
                    position: [point.longitude, point.latitude],
                    elevation: depth(derived),
                })
                .collect(),
        }
    };

    let baseline = columns("baseline-water", "baseline_depth", style.baseline_color, |d| d.baseline_depth);
    let mitigated = columns("mitigated-water", "mitigated_depth", style.mitigated_color, |d| d.mitigated_depth);

    let mut mitigated_layers = vec![LayerDescriptor::Column(mitigated)];
    if !lots.is_empty() {
        mitigated_layers.push(LayerDescriptor::Lots(LotOverlay {
            id: "mitigation-lots".to_string(),
            fill_color: style.lot_fill_color,
            line_color: style.lot_line_color,
            data: lots_to_geojson(lots.lots()),
        }));
    }

    ScenarioViews {
        baseline: ViewPanel {
            heading: BASELINE_HEADING.to_string(),
            layers: vec![LayerDescriptor::Column(baseline)],
        },
        mitigated: ViewPanel {
            heading: MITIGATED_HEADING.to_string(),
            layers: mitigated_layers,
        },
        view_state: ViewState {
            latitude: config.area.center_lat,
            longitude: config.area.center_lon,
            zoom: style.zoom,
            pitch: style.pitch,
        },
        summary: summary_text(frame.controls.time_step),
    }
}

// ============================================================================
// 3. ScenarioStatus — Warnings + info line
// ============================================================================

/// Recoverable problems and the latest info line
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStatus {
    pub warnings: Vec<String>,
    pub info: Option<String>,
}

// ============================================================================
// 4. GeoJSON export
// ============================================================================

/// One Point feature per sample with its depth columns as properties
pub fn frame_to_geojson(samples: &SampleSet, frame: &ScenarioFrame) -> FeatureCollection {
    let features = samples
        .points()
        .iter()
        .zip(&frame.depths)
        .map(|(point, derived)| {
            let mut properties = JsonObject::new();
            properties.insert("base_depth".to_string(), point.base_depth.into());
            properties.insert("baseline_depth".to_string(), derived.baseline_depth.into());
            properties.insert("mitigated_depth".to_string(), derived.mitigated_depth.into());
            properties.insert("in_lot".to_string(), derived.in_lot.into());
            feature(Value::Point(vec![point.longitude, point.latitude]), properties)
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Lot polygons as MultiPolygon features, keeping index and name
pub fn lots_to_geojson(lots: &[MitigationPolygon]) -> FeatureCollection {
    let features = lots
        .iter()
        .map(|lot| {
            let polygons = lot.geometry.iter().map(polygon_rings).collect();

            let mut properties = JsonObject::new();
            properties.insert("index".to_string(), lot.index.into());
            if let Some(name) = &lot.name {
                properties.insert("name".to_string(), name.clone().into());
            }
            feature(Value::MultiPolygon(polygons), properties)
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn polygon_rings(polygon: &Polygon<f64>) -> Vec<Vec<Vec<f64>>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring: &LineString<f64>| ring.coords().map(|c| vec![c.x, c.y]).collect())
        .collect()
}

fn feature(value: Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intensity::StormWindow;
    use crate::samples::{SampleParams, SamplePoint};
    use crate::session::ScenarioControls;
    use geo::MultiPolygon;

    fn fixture() -> (SampleSet, LotIndex) {
        let samples = SampleSet::from_points(
            SampleParams::default(),
            vec![
                SamplePoint { latitude: 0.5, longitude: 0.5, base_depth: 4.0 },
                SamplePoint { latitude: 2.0, longitude: 2.0, base_depth: 8.0 },
            ],
        );
        let ring = LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]);
        let mut lot = MitigationPolygon::new(3, MultiPolygon::new(vec![Polygon::new(ring, vec![])]));
        lot.name = Some("Lot A".to_string());
        (samples, LotIndex::bulk_load(vec![lot]))
    }

    fn column(layer: &LayerDescriptor) -> &ColumnLayer {
        match layer {
            LayerDescriptor::Column(c) => c,
            LayerDescriptor::Lots(_) => panic!("expected column layer"),
        }
    }

    #[test]
    fn summary_names_time_step() {
        assert_eq!(
            summary_text(30),
            "Visualizing T+30 minutes. Left shows current risk (Red). Right shows 3D flood reduction via green conversion (Blue)."
        );
    }

    #[test]
    fn panels_carry_depth_columns_and_styles() {
        let (samples, lots) = fixture();
        let controls = ScenarioControls { time_step: 30, reduction: 50 };
        let frame = ScenarioFrame::compute(&samples, &lots, controls, StormWindow::default());
        let views = build_views(&samples, &lots, &frame, &DashboardConfig::default());

        assert_eq!(views.baseline.heading, BASELINE_HEADING);
        assert_eq!(views.mitigated.heading, MITIGATED_HEADING);
        assert_eq!(views.view_state.zoom, 14.0);
        assert_eq!(views.view_state.pitch, 45.0);

        let base = column(&views.baseline.layers[0]);
        assert_eq!(base.fill_color, [231, 76, 60, 160]);
        assert_eq!(base.data[0].elevation, 4.0);
        assert_eq!(base.data[0].position, [0.5, 0.5]);

        let mitigated = column(&views.mitigated.layers[0]);
        assert_eq!(mitigated.fill_color, [52, 152, 219, 160]);
        assert_eq!(mitigated.data[0].elevation, 2.0);
        assert_eq!(mitigated.data[1].elevation, 8.0);

        assert!(matches!(views.mitigated.layers[1], LayerDescriptor::Lots(_)));
        assert!(views.summary.starts_with("Visualizing T+30 minutes."));
    }

    #[test]
    fn no_overlay_without_lots() {
        let (samples, _) = fixture();
        let lots = LotIndex::empty();
        let frame = ScenarioFrame::compute(&samples, &lots, ScenarioControls::default(), StormWindow::default());
        let views = build_views(&samples, &lots, &frame, &DashboardConfig::default());
        assert_eq!(views.mitigated.layers.len(), 1);
    }

    #[test]
    fn layers_serialize_with_renderer_type_tags() {
        let (samples, lots) = fixture();
        let frame = ScenarioFrame::compute(&samples, &lots, ScenarioControls::default(), StormWindow::default());
        let views = build_views(&samples, &lots, &frame, &DashboardConfig::default());

        let json = serde_json::to_value(&views).unwrap();
        assert_eq!(json["baseline"]["layers"][0]["type"], "ColumnLayer");
        assert_eq!(json["mitigated"]["layers"][1]["type"], "GeoJsonLayer");
        assert_eq!(json["mitigated"]["layers"][1]["line_color"], serde_json::json!([255, 255, 255]));
    }

    #[test]
    fn frame_export_has_one_point_per_sample() {
        let (samples, lots) = fixture();
        let controls = ScenarioControls { time_step: 30, reduction: 100 };
        let frame = ScenarioFrame::compute(&samples, &lots, controls, StormWindow::default());
        let fc = frame_to_geojson(&samples, &frame);

        assert_eq!(fc.features.len(), 2);
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["in_lot"], true);
        assert_eq!(props["mitigated_depth"], 0.0);
        assert_eq!(props["base_depth"], 4.0);
    }

    #[test]
    fn lot_export_keeps_rings_and_name() {
        let (_, lots) = fixture();
        let fc = lots_to_geojson(lots.lots());
        let feature = &fc.features[0];

        let props = feature.properties.as_ref().unwrap();
        assert_eq!(props["name"], "Lot A");
        assert_eq!(props["index"], 3);
        match &feature.geometry.as_ref().unwrap().value {
            Value::MultiPolygon(polys) => {
                assert_eq!(polys.len(), 1);
                assert_eq!(polys[0][0].len(), 5);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
    }
}
