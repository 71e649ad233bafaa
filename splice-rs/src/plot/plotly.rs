use super::{LegendPosition, ScatterPlot};
use plotly::{
    color::{Rgb, Rgba},
    common::{Line, Marker, Mode, Title},
    layout::Axis,
    Layout, Plot, Scatter,
};

/// Pixel size of a unit point size
const POINT_PX: f64 = 4.0;

impl ScatterPlot {
    /// Render with plotly, one trace per group level in level order.
    pub fn to_plotly(&self) -> Plot {
        let mut plot = Plot::new();
        let style = self.geometry.style;
        let outline = self.geometry.outline;

        for (level, color) in self.fill.levels.iter().zip(self.fill.colors.iter()) {
            let (xs, ys): (Vec<f64>, Vec<f64>) = self
                .points
                .iter()
                .filter(|p| &p.group == level)
                .map(|p| (p.x, p.y))
                .unzip();
            let marker = Marker::new()
                .color(Rgba::new(color.r, color.g, color.b, style.alpha))
                .size((style.size * POINT_PX).round().max(1.0) as usize)
                .line(Line::new().color(Rgb::new(outline.r, outline.g, outline.b)).width(style.stroke));
            let trace = Scatter::new(xs, ys).mode(Mode::Markers).name(level.as_str()).marker(marker);
            plot.add_trace(trace);
        }

        let axis_line = self.theme.axis_line;
        let axis = |title: &str| {
            Axis::new()
                .title(Title::from(title))
                .show_grid(self.theme.grid_lines)
                .zero_line(false)
                .show_line(true)
                .line_color(Rgb::new(axis_line.r, axis_line.g, axis_line.b))
        };
        let layout = Layout::new()
            .title(Title::from(self.title.as_str()))
            .x_axis(axis(&self.x.title))
            .y_axis(axis(&self.y.title))
            .show_legend(self.legend.position != LegendPosition::None);
        plot.set_layout(layout);
        plot
    }
}

#[cfg(test)]
mod test {
    use crate::dim_red::{ComponentVariance, ProjectionResult};
    use crate::plot::{pca_scatter, PlotParams};
    use ndarray::array;
    use splice_types::Categorical;

    #[test]
    fn test_one_trace_per_group() {
        let proj = ProjectionResult {
            cell_ids: vec!["c1".to_string(), "c2".to_string(), "c3".to_string()],
            gene_ids: vec!["g1".to_string(), "g2".to_string()],
            coordinates: array![[1.0, 0.5], [-1.0, 0.0], [0.0, -0.5]],
            loadings: array![[0.7, 0.7], [0.7, -0.7]],
            variance: vec![
                ComponentVariance {
                    component: 1,
                    eigenvalue: 1.5,
                    percent: 75.0,
                    cumulative_percent: 75.0,
                },
                ComponentVariance {
                    component: 2,
                    eigenvalue: 0.5,
                    percent: 25.0,
                    cumulative_percent: 100.0,
                },
            ],
        };
        let groups = Categorical::first_encountered(&["x", "y", "x"]);
        let plot = pca_scatter(&proj, &groups, "cluster", None, &PlotParams::new()).unwrap();
        let json = plot.to_plotly().to_json();
        assert_eq!(json.matches("\"type\":\"scatter\"").count(), 2);
        assert!(json.contains("PC1 (75.0%)"));
        assert!(json.contains("2 genes"));
    }
}
