use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct SpikeDensityApp {
    pub state: AppState,
}

impl SpikeDensityApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for SpikeDensityApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: units and levels ----
        egui::SidePanel::left("unit_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: density plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::density_plot(ui, &mut self.state);
        });
    }
}
