//! Declarative description of the PCA scatter plot.
//!
//! `pca_scatter` turns a projection and the per-cell group labels into a `ScatterPlot`: filled
//! points at two chosen components, fill keyed by group, axis titles carrying the variance
//! explained and a fixed theme. The description is plain data; serialize it with `to_json`, or
//! render it with the `plotly` feature.

use crate::dim_red::ProjectionResult;
use crate::error::PcaError;
use crate::palette::{colors_for, Color};
use anyhow::Error;
use serde::{Deserialize, Serialize};
use splice_types::Categorical;

/// Rendering through plotly
#[cfg(feature = "plotly")]
pub mod plotly;

/// Filled circle with an outline
const POINT_SHAPE: u8 = 21;

/// Size, opacity and outline width of the points
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointStyle {
    /// point size
    pub size: f64,
    /// fill opacity in [0, 1]
    pub alpha: f64,
    /// outline width
    pub stroke: f64,
}

impl PointStyle {
    /// Default point style
    pub fn new() -> PointStyle {
        PointStyle {
            size: 1.0,
            alpha: 0.75,
            stroke: 0.1,
        }
    }

    /// Check that every parameter is in range.
    pub fn validate(&self) -> Result<(), PcaError> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(PcaError::InvalidStyle(format!("alpha {} is outside [0, 1]", self.alpha)));
        }
        if !(self.size.is_finite() && self.size >= 0.0) {
            return Err(PcaError::InvalidStyle(format!("size {} must be non-negative", self.size)));
        }
        if !(self.stroke.is_finite() && self.stroke >= 0.0) {
            return Err(PcaError::InvalidStyle(format!("stroke {} must be non-negative", self.stroke)));
        }
        Ok(())
    }
}

impl Default for PointStyle {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller-controlled plot settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlotParams {
    /// 1-based components on the x and y axes
    pub components: [usize; 2],
    /// explicit group colors; generated with `colors_for` when `None`
    pub group_colors: Option<Vec<Color>>,
    /// point appearance
    pub style: PointStyle,
    /// legend title; the group column name when `None`
    pub legend_title: Option<String>,
}

impl PlotParams {
    /// First two components, generated colors, default style
    pub fn new() -> PlotParams {
        PlotParams {
            components: [1, 2],
            group_colors: None,
            style: PointStyle::new(),
            legend_title: None,
        }
    }
}

impl Default for PlotParams {
    fn default() -> Self {
        Self::new()
    }
}

/// Point geometry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    /// marker shape code (21: filled circle with outline)
    pub shape: u8,
    /// outline color
    pub outline: Color,
    /// size, opacity and outline width
    pub style: PointStyle,
}

/// Binding of a plot axis to a principal component
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisBinding {
    /// 1-based component
    pub component: usize,
    /// axis title, e.g. `PC1 (23.4%)`
    pub title: String,
}

/// Discrete fill scale: one color per group level, in level order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FillScale {
    /// metadata column the levels come from
    pub column: String,
    /// group levels in display order
    pub levels: Vec<String>,
    /// color of each level
    pub colors: Vec<Color>,
}

impl FillScale {
    /// Color of `level`, if it is one of the levels
    pub fn color_of(&self, level: &str) -> Option<Color> {
        self.levels.iter().position(|l| l == level).map(|i| self.colors[i])
    }
}

/// Legend placement
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendPosition {
    /// right of the panel
    Right,
    /// below the panel
    Bottom,
    /// no legend
    None,
}

/// Legend configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    /// legend title
    pub title: String,
    /// placement
    pub position: LegendPosition,
}

/// Styling overrides applied on top of a blank theme
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    /// draw major/minor grid lines
    pub grid_lines: bool,
    /// panel background color, `None` for blank
    pub panel_background: Option<Color>,
    /// axis line color
    pub axis_line: Color,
    /// plot title font size
    pub title_size: f64,
    /// horizontal justification of the title (0.5 centers it)
    pub title_hjust: f64,
    /// axis tick label font size
    pub axis_text_size: f64,
    /// axis title font size
    pub axis_title_size: f64,
    /// legend title font size
    pub legend_title_size: f64,
    /// legend entry font size
    pub legend_text_size: f64,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            grid_lines: false,
            panel_background: None,
            axis_line: Color::BLACK,
            title_size: 12.0,
            title_hjust: 0.5,
            axis_text_size: 12.0,
            axis_title_size: 12.0,
            legend_title_size: 8.0,
            legend_text_size: 8.0,
        }
    }
}

/// One plotted cell
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlotPoint {
    /// cell id
    pub cell_id: String,
    /// coordinate on the x component
    pub x: f64,
    /// coordinate on the y component
    pub y: f64,
    /// group label
    pub group: String,
}

/// A 2-D scatter plot of two principal components
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScatterPlot {
    /// plot title, `<n> genes`
    pub title: String,
    /// x axis binding
    pub x: AxisBinding,
    /// y axis binding
    pub y: AxisBinding,
    /// fill by group
    pub fill: FillScale,
    /// point geometry
    pub geometry: PointGeometry,
    /// legend
    pub legend: Legend,
    /// theme overrides
    pub theme: Theme,
    /// one entry per cell, in cell order
    pub points: Vec<PlotPoint>,
}

impl ScatterPlot {
    /// Serialize the description as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Pick one color per surviving level.
///
/// Without supplied colors a hue-wheel palette is generated. Supplied colors are taken
/// positionally when there is one per surviving level, or mapped through `requested_order`
/// when there is one per requested group; any other count is an error.
pub fn resolve_colors(
    levels: &[String],
    requested_order: Option<&[String]>,
    supplied: Option<&[Color]>,
) -> Result<Vec<Color>, PcaError> {
    let Some(colors) = supplied.filter(|c| !c.is_empty()) else {
        return Ok(colors_for(levels.len()));
    };
    if colors.len() == levels.len() {
        return Ok(colors.to_vec());
    }
    if let Some(order) = requested_order.filter(|o| o.len() == colors.len()) {
        let mapped = levels
            .iter()
            .map(|l| order.iter().position(|o| o == l).map(|i| colors[i]))
            .collect::<Option<Vec<_>>>();
        if let Some(mapped) = mapped {
            return Ok(mapped);
        }
    }
    Err(PcaError::ColorCount {
        supplied: colors.len(),
        levels: levels.len(),
    })
}

fn axis_title(projection: &ProjectionResult, component: usize) -> Result<String, Error> {
    let pct = projection.percent_explained(component)?;
    Ok(format!("PC{component} ({pct:.1}%)"))
}

/// Build the scatter plot of `projection` with cells filled by `groups`.
///
/// `groups` must describe the projected cells in order. `requested_order` is the group order
/// the caller asked for, used to line up supplied colors.
pub fn pca_scatter(
    projection: &ProjectionResult,
    groups: &Categorical,
    group_column: &str,
    requested_order: Option<&[String]>,
    params: &PlotParams,
) -> Result<ScatterPlot, Error> {
    params.style.validate()?;
    let [cx, cy] = params.components;
    let x = AxisBinding {
        component: cx,
        title: axis_title(projection, cx)?,
    };
    let y = AxisBinding {
        component: cy,
        title: axis_title(projection, cy)?,
    };
    anyhow::ensure!(
        groups.len() == projection.cell_ids.len(),
        "{} group labels for {} projected cells",
        groups.len(),
        projection.cell_ids.len()
    );

    let colors = resolve_colors(&groups.levels, requested_order, params.group_colors.as_deref())?;
    let xs = projection.component(cx)?;
    let ys = projection.component(cy)?;
    let points = projection
        .cell_ids
        .iter()
        .enumerate()
        .map(|(i, cell)| PlotPoint {
            cell_id: cell.clone(),
            x: xs[i],
            y: ys[i],
            group: groups.label(i).to_string(),
        })
        .collect();

    Ok(ScatterPlot {
        title: format!("{} genes", projection.gene_ids.len()),
        x,
        y,
        fill: FillScale {
            column: group_column.to_string(),
            levels: groups.levels.clone(),
            colors,
        },
        geometry: PointGeometry {
            shape: POINT_SHAPE,
            outline: Color::BLACK,
            style: params.style,
        },
        legend: Legend {
            title: params.legend_title.clone().unwrap_or_else(|| group_column.to_string()),
            position: LegendPosition::Right,
        },
        theme: Theme::default(),
        points,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dim_red::ComponentVariance;
    use ndarray::{array, Array2};

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(std::string::ToString::to_string).collect()
    }

    fn toy_projection() -> ProjectionResult {
        let pct = [45.04, 30.06, 10.0];
        ProjectionResult {
            cell_ids: strings(&["c1", "c2", "c3"]),
            gene_ids: strings(&["g1", "g2", "g3", "g4"]),
            coordinates: array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]],
            loadings: Array2::zeros((4, 3)),
            variance: pct
                .iter()
                .enumerate()
                .map(|(i, &p)| ComponentVariance {
                    component: i + 1,
                    eigenvalue: p / 25.0,
                    percent: p,
                    cumulative_percent: pct[..=i].iter().sum(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_scatter_defaults() {
        let proj = toy_projection();
        let groups = Categorical::with_order(&["T", "B", "T"], &strings(&["B", "T"])).unwrap();
        let plot = pca_scatter(&proj, &groups, "cell.type", None, &PlotParams::new()).unwrap();

        assert_eq!(plot.title, "4 genes");
        assert_eq!(plot.x.title, "PC1 (45.0%)");
        assert_eq!(plot.y.title, "PC2 (30.1%)");
        assert_eq!(plot.fill.levels, strings(&["B", "T"]));
        assert_eq!(plot.fill.colors, colors_for(2));
        assert_eq!(plot.fill.color_of("T"), Some(colors_for(2)[1]));
        assert_eq!(plot.legend.title, "cell.type");
        assert_eq!(plot.geometry.shape, 21);
        assert!(!plot.theme.grid_lines);
        assert_eq!(plot.theme.axis_line, Color::BLACK);
        assert_eq!(
            plot.points[1],
            PlotPoint {
                cell_id: "c2".to_string(),
                x: 4.0,
                y: 5.0,
                group: "B".to_string()
            }
        );
    }

    #[test]
    fn test_scatter_other_components() {
        let proj = toy_projection();
        let groups = Categorical::first_encountered(&["a", "a", "b"]);
        let mut params = PlotParams::new();
        params.components = [3, 1];
        params.legend_title = Some("Cell group".to_string());
        let plot = pca_scatter(&proj, &groups, "cluster", None, &params).unwrap();
        assert_eq!(plot.x.title, "PC3 (10.0%)");
        assert_eq!(plot.y.title, "PC1 (45.0%)");
        assert_eq!((plot.points[2].x, plot.points[2].y), (9.0, 7.0));
        assert_eq!(plot.legend.title, "Cell group");

        params.components = [1, 4];
        let err = pca_scatter(&proj, &groups, "cluster", None, &params).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PcaError>(),
            Some(PcaError::InvalidComponent { component: 4, .. })
        ));
    }

    #[test]
    fn test_style_validation() {
        let proj = toy_projection();
        let groups = Categorical::first_encountered(&["a", "a", "b"]);
        let mut params = PlotParams::new();
        params.style.alpha = 1.5;
        let err = pca_scatter(&proj, &groups, "cluster", None, &params).unwrap_err();
        assert!(matches!(err.downcast_ref::<PcaError>(), Some(PcaError::InvalidStyle(_))));
        params.style.alpha = 0.0;
        params.style.stroke = -1.0;
        assert!(pca_scatter(&proj, &groups, "cluster", None, &params).is_err());
    }

    #[test]
    fn test_resolve_colors() {
        let red = Color::new(255, 0, 0);
        let green = Color::new(0, 255, 0);
        let blue = Color::new(0, 0, 255);
        let levels = strings(&["B", "A"]);

        // generated
        assert_eq!(resolve_colors(&levels, None, None).unwrap(), colors_for(2));
        assert_eq!(resolve_colors(&levels, None, Some(&[][..])).unwrap(), colors_for(2));
        // one per level
        assert_eq!(resolve_colors(&levels, None, Some(&[red, green][..])).unwrap(), vec![red, green]);
        // one per requested group, C absent
        let order = strings(&["B", "C", "A"]);
        assert_eq!(
            resolve_colors(&levels, Some(order.as_slice()), Some(&[red, green, blue][..])).unwrap(),
            vec![red, blue]
        );
        // neither
        assert_eq!(
            resolve_colors(&levels, None, Some(&[red, green, blue][..])),
            Err(PcaError::ColorCount { supplied: 3, levels: 2 })
        );
    }

    #[test]
    fn test_json() {
        let proj = toy_projection();
        let groups = Categorical::first_encountered(&["a", "b", "b"]);
        let plot = pca_scatter(&proj, &groups, "cluster", None, &PlotParams::new()).unwrap();
        let json = plot.to_json().unwrap();
        assert!(json.contains("\"title\": \"4 genes\""));
        assert!(json.contains("\"position\": \"right\""));
        let back: ScatterPlot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, plot);
    }
}
