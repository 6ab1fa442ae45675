use eframe::egui::{Color32, Ui};
use egui_plot::{Line, Plot, PlotPoints};

use spike_density::pyramid::ResolutionLevel;

use crate::state::AppState;

/// Vertical room taken by one unit's trace (units sit one per integer row).
const TRACE_HEIGHT: f64 = 0.9;

// ---------------------------------------------------------------------------
// Spike density plot (central panel)
// ---------------------------------------------------------------------------

/// Firing rate (Hz) of `unit` in each bin of `bins`.
fn rates(level: &ResolutionLevel, unit: usize, bins: std::ops::Range<usize>) -> Vec<f64> {
    let bin_size = level.bin_size_sec();
    bins.map(|b| level.matrix().get(b, unit) as f64 / bin_size)
        .collect()
}

/// Step outline of a trace: each bin is a flat segment at its value.
fn step_points(
    level: &ResolutionLevel,
    first_bin: usize,
    values: &[f64],
    row: f64,
    scale: f64,
) -> Vec<[f64; 2]> {
    values
        .iter()
        .enumerate()
        .flat_map(|(i, &v)| {
            let b = first_bin + i;
            let y = row + TRACE_HEIGHT * v / scale;
            [[level.bin_start_sec(b), y], [level.bin_start_sec(b + 1), y]]
        })
        .collect()
}

/// Render the spike density plot in the central panel.
pub fn density_plot(ui: &mut Ui, state: &mut AppState) {
    let series = match &state.series {
        Some(s) => s,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Open a spike density record  (File → Open…)");
            });
            return;
        }
    };

    let full = series.full_resolution();
    let (full_start, full_end) = (full.start_time_sec(), full.end_time_sec());
    let units: Vec<usize> = state.visible_units.iter().copied().collect();
    let color_map = &state.color_map;
    let normalize = state.normalize_per_unit;
    let max_visible_bins = state.max_visible_bins;

    let response = Plot::new("spike_density_plot")
        .legend(egui_plot::Legend::default())
        .x_axis_label("Time (s)")
        .y_axis_label("Unit")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            let bounds = plot_ui.plot_bounds();
            let (mut t0, mut t1) = (bounds.min()[0], bounds.max()[0]);
            if !bounds.is_valid() || !(t1 > t0) {
                t0 = full_start;
                t1 = full_end;
            }

            let level = series.select_level(t1 - t0, max_visible_bins);
            let bins = level.bin_range(t0, t1);

            let traces: Vec<(usize, Vec<f64>)> = units
                .iter()
                .map(|&u| (u, rates(level, u, bins.clone())))
                .collect();
            let shared_max = traces
                .iter()
                .flat_map(|(_, r)| r.iter().copied())
                .fold(0.0, f64::max);

            for (row, (unit, values)) in traces.iter().enumerate() {
                let scale = if normalize {
                    values.iter().copied().fold(0.0, f64::max)
                } else {
                    shared_max
                };
                let scale = if scale > 0.0 { scale } else { 1.0 };

                let color = color_map
                    .as_ref()
                    .map(|cm| cm.color_for(*unit))
                    .unwrap_or(Color32::LIGHT_BLUE);

                let points: PlotPoints =
                    step_points(level, bins.start, values, row as f64, scale).into();
                let line = Line::new(points)
                    .name(format!("unit {unit}"))
                    .color(color)
                    .width(1.5);

                plot_ui.line(line);
            }

            level.downsample_factor()
        });

    state.active_factor = Some(response.inner);
}
