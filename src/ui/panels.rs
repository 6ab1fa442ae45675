use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};
use spike_density::store::LocalStore;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – levels and unit visibility
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    let Some(series) = &state.series else {
        ui.heading("Units");
        ui.separator();
        ui.label("No artifact loaded.");
        return;
    };

    // ---- Pyramid levels ----
    ui.heading("Levels");
    ui.separator();

    let rows: Vec<(String, f64, usize, bool)> = series
        .levels()
        .iter()
        .map(|l| {
            (
                l.name(),
                l.bin_size_sec(),
                l.num_bins(),
                state.active_factor == Some(l.downsample_factor()),
            )
        })
        .collect();
    let num_units = series.num_units();

    TableBuilder::new(ui)
        .striped(true)
        .vscroll(false)
        .column(Column::auto())
        .column(Column::auto())
        .column(Column::remainder())
        .header(18.0, |mut header| {
            header.col(|ui| {
                ui.strong("Level");
            });
            header.col(|ui| {
                ui.strong("Bin (s)");
            });
            header.col(|ui| {
                ui.strong("Bins");
            });
        })
        .body(|mut body| {
            for (name, bin_size, num_bins, active) in &rows {
                body.row(18.0, |mut row| {
                    let text = |s: String| {
                        if *active {
                            RichText::new(s).strong().color(Color32::LIGHT_GREEN)
                        } else {
                            RichText::new(s)
                        }
                    };
                    row.col(|ui| {
                        ui.label(text(name.clone()));
                    });
                    row.col(|ui| {
                        ui.label(text(format!("{bin_size:.3}")));
                    });
                    row.col(|ui| {
                        ui.label(text(num_bins.to_string()));
                    });
                });
            }
        });

    ui.add_space(8.0);

    // ---- Unit visibility ----
    ui.heading(format!("Units  ({}/{num_units})", state.visible_units.len()));
    ui.separator();
    ui.horizontal(|ui: &mut Ui| {
        if ui.small_button("All").clicked() {
            state.select_all();
        }
        if ui.small_button("None").clicked() {
            state.select_none();
        }
    });

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for unit in 0..num_units {
                let mut text = RichText::new(format!("unit {unit}"));
                if let Some(cm) = &state.color_map {
                    text = text.color(cm.color_for(unit));
                }
                let mut checked = state.visible_units.contains(&unit);
                if ui.checkbox(&mut checked, text).changed() {
                    state.toggle_unit(unit);
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(series), Some(uri)) = (&state.series, &state.uri) {
            ui.label(format!(
                "{} units, {} levels  ·  {uri}",
                series.num_units(),
                series.len()
            ));
        }

        ui.separator();

        if ui
            .selectable_label(state.normalize_per_unit, "Per-unit scaling")
            .clicked()
        {
            state.normalize_per_unit = !state.normalize_per_unit;
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

/// Pick a record blob inside a store directory and load it.
pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open spike density record")
        .set_directory(state.store.root())
        .pick_file();

    if let Some(path) = file {
        match LocalStore::locate(&path) {
            Ok((store, uri)) => {
                state.store = store;
                state.open_uri(&uri);
            }
            Err(e) => {
                log::error!("Failed to open {}: {e}", path.display());
                state.status_message = Some(format!("Error: {e}"));
            }
        }
    }
}
