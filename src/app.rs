use std::borrow::Cow;
use std::path::{Path, PathBuf};

use eframe::egui;
use image::{RgbImage, imageops};

use crate::canvas::{Extent, Point, ZoomStep};
use crate::error::SessionError;
use crate::session::{Command, Event, Progress, Session};

const PANEL_COLOR: egui::Color32 = egui::Color32::DARK_GRAY;
const CROP_STROKE: f32 = 2.0;
/// Pixel-precise scrolling (trackpads) that counts as one wheel notch.
const POINTS_PER_NOTCH: f32 = 50.0;

pub struct ImageRenamer {
    session: Session,
    texture: Option<egui::TextureHandle>,
    texture_for: Option<PathBuf>,
    crop_size: u32,
    dragging: bool,
    // Sub-pixel drag motion not yet handed to the canvas
    drag_residual: egui::Vec2,
    // Wheel travel short of a whole notch, in notches
    wheel_residual: f32,
    focus_color: bool,
    status: String,
}

impl ImageRenamer {
    pub fn new(cc: &eframe::CreationContext<'_>, session: Session) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        let mut app = Self {
            crop_size: session.canvas().base_crop_size(),
            session,
            texture: None,
            texture_for: None,
            dragging: false,
            drag_residual: egui::Vec2::ZERO,
            wheel_residual: 0.0,
            focus_color: true,
            status: String::new(),
        };
        app.run(&cc.egui_ctx, Command::Advance);
        app
    }

    fn run(&mut self, ctx: &egui::Context, command: Command) {
        match self.session.apply(command) {
            Ok(event) => self.on_event(ctx, event),
            Err(err) => self.report(&err),
        }
    }

    fn commit(&mut self, ctx: &egui::Context) {
        let form = self.session.form().clone();
        self.run(ctx, Command::Commit(form));
    }

    fn on_event(&mut self, ctx: &egui::Context, event: Event) {
        let next = match event {
            Event::ViewChanged => return,
            Event::Advanced(next) => next,
            Event::Committed {
                output,
                cleanup_error,
                next,
            } => {
                self.status = format!("Saved {}", output.display());
                if let Some(err) = cleanup_error {
                    self.report(&err);
                }
                next
            }
            Event::Discarded { removed, next } => {
                self.status = format!("Deleted {}", removed.display());
                next
            }
        };

        self.dragging = false;
        self.drag_residual = egui::Vec2::ZERO;
        self.wheel_residual = 0.0;
        self.focus_color = true;
        match next {
            Progress::Loaded(_) => {}
            Progress::Unreadable { path, error } => {
                show_dialog(
                    rfd::MessageLevel::Warning,
                    &format!("Cannot decode {}: {error}", path.display()),
                );
            }
            Progress::Finished => {
                show_dialog(rfd::MessageLevel::Info, "All images processed.");
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }
    }

    fn report(&mut self, err: &SessionError) {
        match err {
            SessionError::Validation(_) => log::warn!("{err}"),
            _ => log::error!("{err}"),
        }
        self.status = err.to_string();
        show_dialog(rfd::MessageLevel::Error, &self.status);
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
        if self.session.is_finished() {
            return;
        }

        let (commit, discard, flip) = ctx.input_mut(|i| {
            (
                i.consume_key(egui::Modifiers::CTRL, egui::Key::G),
                i.consume_key(egui::Modifiers::CTRL, egui::Key::D),
                i.consume_key(egui::Modifiers::CTRL, egui::Key::F),
            )
        });
        if flip {
            let form = self.session.form_mut();
            form.flipped = !form.flipped;
        }
        if commit {
            self.commit(ctx);
        } else if discard {
            self.run(ctx, Command::Discard);
        }
    }

    fn refresh_texture(&mut self, ctx: &egui::Context) {
        let current = self.session.current();
        if self.texture_for.as_deref() == current {
            return;
        }
        self.texture_for = current.map(Path::to_path_buf);

        let max_side = ctx.input(|i| i.max_texture_side);
        self.texture = self.session.canvas().image().map(|image| {
            let pixels = preview(image, max_side);
            let size = [pixels.width() as usize, pixels.height() as usize];
            let color_image = egui::ColorImage::from_rgb(size, pixels.as_raw());
            ctx.load_texture("image", color_image, egui::TextureOptions::LINEAR)
        });
    }

    fn controls(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.horizontal(|ui| {
            ui.spacing_mut().item_spacing.x = 10.0;

            ui.label("Color:");
            let color = ui.add(
                egui::TextEdit::singleline(&mut self.session.form_mut().color).desired_width(40.0),
            );
            if std::mem::take(&mut self.focus_color) {
                color.request_focus();
            }
            ui.label("Grain:");
            ui.add(
                egui::TextEdit::singleline(&mut self.session.form_mut().grain).desired_width(60.0),
            );
            ui.checkbox(&mut self.session.form_mut().flipped, "Flip?");

            if ui.button("Rename & Next").clicked() {
                self.commit(ctx);
            }
            if ui.button("Delete").clicked() {
                self.run(ctx, Command::Discard);
            }

            ui.label("Crop Size:");
            let range = self.session.config().crop_size_range.clone();
            if ui.add(egui::Slider::new(&mut self.crop_size, range)).changed() {
                self.run(ctx, Command::SetCropSize(self.crop_size));
            }
        });
    }

    fn status_line(&self) -> String {
        let name = self
            .session
            .current()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let canvas = self.session.canvas();
        let crop = canvas
            .crop_in_original_space()
            .map(|r| format!("crop {}px at {},{}", r.size, r.x, r.y))
            .unwrap_or_else(|| "no crop".to_owned());
        format!(
            "{name}  |  {} left  |  zoom {:.0}%  |  {crop}  |  {}",
            self.session.remaining(),
            canvas.view().zoom * 100.0,
            self.status
        )
    }

    fn canvas_ui(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::drag());
        if self.session.is_finished() {
            return;
        }
        self.run(
            ctx,
            Command::Resize(Extent::new(rect.width() as i32, rect.height() as i32)),
        );
        self.refresh_texture(ctx);

        let to_local =
            |pos: egui::Pos2| Point::new((pos.x - rect.min.x) as i32, (pos.y - rect.min.y) as i32);

        // Handle Input
        if response.drag_started() {
            self.dragging = response
                .interact_pointer_pos()
                .is_some_and(|pos| self.session.canvas().contains(to_local(pos)));
            self.drag_residual = egui::Vec2::ZERO;
        }
        if response.dragged() && self.dragging {
            self.drag_residual += response.drag_delta();
            let dx = self.drag_residual.x.trunc();
            let dy = self.drag_residual.y.trunc();
            self.drag_residual -= egui::vec2(dx, dy);
            if dx != 0.0 || dy != 0.0 {
                self.run(ctx, Command::DragCrop(Point::new(dx as i32, dy as i32)));
            }
        }
        if response.drag_stopped() {
            self.dragging = false;
        }
        if response.hovered() {
            let ticks = ui.input(|i| wheel_ticks(&i.events, &mut self.wheel_residual));
            let step = if ticks > 0 { ZoomStep::In } else { ZoomStep::Out };
            for _ in 0..ticks.unsigned_abs() {
                self.run(ctx, Command::SetZoom(step));
            }
        }

        let painter = ui.painter_at(rect);
        let Some(texture) = &self.texture else {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "Cannot decode this image",
                egui::FontId::proportional(18.0),
                egui::Color32::LIGHT_GRAY,
            );
            return;
        };

        let canvas = self.session.canvas();
        let view = canvas.view();
        let to_screen = |x: i32, y: i32| rect.min + egui::vec2(x as f32, y as f32);
        let image_rect = egui::Rect::from_min_size(
            to_screen(view.offset.x, view.offset.y),
            egui::vec2(view.display.width as f32, view.display.height as f32),
        );
        painter.image(
            texture.id(),
            image_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        if let Some(crop) = canvas.crop() {
            let crop_rect = egui::Rect::from_min_size(
                to_screen(crop.x, crop.y),
                egui::Vec2::splat(crop.size as f32),
            );
            shade_outside(&painter, image_rect, crop_rect);
            painter.rect_stroke(
                crop_rect,
                0.0,
                egui::Stroke::new(CROP_STROKE, egui::Color32::RED),
            );
        }
    }
}

impl eframe::App for ImageRenamer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_shortcuts(ctx);

        if self.session.is_finished() {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.centered_and_justified(|ui| ui.heading("All images processed."));
            });
            return;
        }

        egui::TopBottomPanel::top("controls")
            .frame(egui::Frame::default().fill(PANEL_COLOR).inner_margin(10.0))
            .show(ctx, |ui| self.controls(ui, ctx));
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.label(self.status_line());
        });
        egui::CentralPanel::default()
            .frame(egui::Frame::default().fill(egui::Color32::BLACK))
            .show(ctx, |ui| self.canvas_ui(ui, ctx));
    }
}

/// Dim the parts of the displayed image outside the crop.
fn shade_outside(painter: &egui::Painter, image_rect: egui::Rect, crop_rect: egui::Rect) {
    let overlay_color = egui::Color32::from_black_alpha(150);
    let bands = [
        // Top
        egui::Rect::from_min_max(image_rect.min, egui::pos2(image_rect.max.x, crop_rect.min.y)),
        // Bottom
        egui::Rect::from_min_max(egui::pos2(image_rect.min.x, crop_rect.max.y), image_rect.max),
        // Left
        egui::Rect::from_min_max(
            egui::pos2(image_rect.min.x, crop_rect.min.y),
            egui::pos2(crop_rect.min.x, crop_rect.max.y),
        ),
        // Right
        egui::Rect::from_min_max(
            egui::pos2(crop_rect.max.x, crop_rect.min.y),
            egui::pos2(image_rect.max.x, crop_rect.max.y),
        ),
    ];
    for band in bands {
        painter.rect_filled(band, 0.0, overlay_color);
    }
}

/// Whole wheel notches in this frame's events, positive when scrolling up.
/// Partial notches carry over in `residual`.
fn wheel_ticks(events: &[egui::Event], residual: &mut f32) -> i32 {
    for event in events {
        if let egui::Event::MouseWheel { unit, delta, .. } = event {
            *residual += match unit {
                egui::MouseWheelUnit::Point => delta.y / POINTS_PER_NOTCH,
                egui::MouseWheelUnit::Line | egui::MouseWheelUnit::Page => delta.y,
            };
        }
    }
    let whole = residual.trunc();
    *residual -= whole;
    whole as i32
}

fn show_dialog(level: rfd::MessageLevel, text: &str) {
    let _ = rfd::MessageDialog::new()
        .set_level(level)
        .set_title("Image Renamer")
        .set_description(text)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

/// Downscale `image` for the GPU when it exceeds the texture limit. Only the
/// on-screen copy is affected; crops are always cut from the full image.
fn preview(image: &RgbImage, max_side: usize) -> Cow<'_, RgbImage> {
    let longest = image.width().max(image.height()) as usize;
    if longest <= max_side {
        return Cow::Borrowed(image);
    }
    let ratio = max_side as f64 / longest as f64;
    let width = ((image.width() as f64 * ratio) as u32).max(1);
    let height = ((image.height() as f64 * ratio) as u32).max(1);
    Cow::Owned(imageops::thumbnail(image, width, height))
}
