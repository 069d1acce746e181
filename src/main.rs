#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use std::cell::RefCell;
use std::env;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use eframe::egui;
use image::DynamicImage;
use image_cropper::config::{CONFIG_ENV_VAR, PreviewPane};
use image_cropper::loader::ImageRequest;
use image_cropper::{
    CroppedRect, Cropper, CropperConfig, Direction, Error, GrabTarget, Point, PreviewTarget,
    PreviewTransform, Rect, Size,
};

const PADDING: f32 = 20.0;
const HANDLE_TOLERANCE: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq)]
enum AspectRatioMode {
    Free,
    Original,
    Square,
    // Landscape
    R3_2,
    R4_3,
    R16_9,
    R16_10,
    // Portrait
    R2_3,
    R3_4,
    R9_16,
    R10_16,
    Custom,
}

impl AspectRatioMode {
    const LANDSCAPE: [AspectRatioMode; 4] = [
        AspectRatioMode::R3_2,
        AspectRatioMode::R4_3,
        AspectRatioMode::R16_9,
        AspectRatioMode::R16_10,
    ];
    const PORTRAIT: [AspectRatioMode; 4] = [
        AspectRatioMode::R2_3,
        AspectRatioMode::R3_4,
        AspectRatioMode::R9_16,
        AspectRatioMode::R10_16,
    ];

    fn counterpart(&self) -> Self {
        match self {
            AspectRatioMode::R3_2 => AspectRatioMode::R2_3,
            AspectRatioMode::R4_3 => AspectRatioMode::R3_4,
            AspectRatioMode::R16_9 => AspectRatioMode::R9_16,
            AspectRatioMode::R16_10 => AspectRatioMode::R10_16,
            AspectRatioMode::R2_3 => AspectRatioMode::R3_2,
            AspectRatioMode::R3_4 => AspectRatioMode::R4_3,
            AspectRatioMode::R9_16 => AspectRatioMode::R16_9,
            AspectRatioMode::R10_16 => AspectRatioMode::R16_10,
            _ => *self,
        }
    }

    fn ratio(&self, natural: Size, custom: f64) -> Option<f64> {
        match self {
            AspectRatioMode::Free => None,
            AspectRatioMode::Original => (!natural.is_empty()).then(|| natural.aspect_ratio()),
            AspectRatioMode::Square => Some(1.0),
            AspectRatioMode::R3_2 => Some(3.0 / 2.0),
            AspectRatioMode::R4_3 => Some(4.0 / 3.0),
            AspectRatioMode::R16_9 => Some(16.0 / 9.0),
            AspectRatioMode::R16_10 => Some(16.0 / 10.0),
            AspectRatioMode::R2_3 => Some(2.0 / 3.0),
            AspectRatioMode::R3_4 => Some(3.0 / 4.0),
            AspectRatioMode::R9_16 => Some(9.0 / 16.0),
            AspectRatioMode::R10_16 => Some(10.0 / 16.0),
            AspectRatioMode::Custom => Some(custom),
        }
    }
}

impl std::fmt::Display for AspectRatioMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AspectRatioMode::Free => "Free",
            AspectRatioMode::Original => "Original",
            AspectRatioMode::Square => "1:1",
            AspectRatioMode::R3_2 => "3:2",
            AspectRatioMode::R4_3 => "4:3",
            AspectRatioMode::R16_9 => "16:9",
            AspectRatioMode::R16_10 => "16:10",
            AspectRatioMode::R2_3 => "2:3",
            AspectRatioMode::R3_4 => "3:4",
            AspectRatioMode::R9_16 => "9:16",
            AspectRatioMode::R10_16 => "10:16",
            AspectRatioMode::Custom => "Custom",
        };
        write!(f, "{}", s)
    }
}

/// A preview pane drawn in the side panel.
struct PreviewPanel {
    size: Size,
    wrapper: bool,
    transform: Option<PreviewTransform>,
}

impl PreviewPanel {
    fn new(pane: &PreviewPane) -> Self {
        Self {
            size: Size::new(pane.width, pane.height),
            wrapper: pane.wrapper,
            transform: None,
        }
    }

    fn show(&self, ui: &mut egui::Ui, texture: Option<&egui::TextureHandle>) {
        let (pane_rect, _) = ui.allocate_exact_size(to_vec2(self.size), egui::Sense::hover());
        let painter = ui.painter_at(pane_rect);
        painter.rect_filled(pane_rect, 0.0, egui::Color32::from_gray(30));

        let (Some(texture), Some(transform)) = (texture, &self.transform) else {
            return;
        };
        let view_rect = match &transform.wrapper {
            Some(wrapper) => to_egui_rect(pane_rect.min, wrapper),
            None => pane_rect,
        };
        ui.painter_at(view_rect).image(
            texture.id(),
            to_egui_rect(view_rect.min, &transform.image),
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );
    }
}

impl PreviewTarget for PreviewPanel {
    fn box_size(&self) -> Size {
        self.size
    }

    fn has_wrapper(&self) -> bool {
        self.wrapper
    }

    fn apply(&mut self, transform: &PreviewTransform) {
        self.transform = Some(*transform);
    }

    fn clear(&mut self) {
        self.transform = None;
    }
}

struct ImageCropper {
    cropper: Cropper,
    image: Option<DynamicImage>,
    texture: Option<egui::TextureHandle>,
    request: Option<ImageRequest>,
    previews: Vec<Rc<RefCell<PreviewPanel>>>,
    rendered: bool,
    aspect_ratio_mode: AspectRatioMode,
    custom_ratio: f64,
    is_portrait: bool,
    status: Option<String>,
}

impl ImageCropper {
    fn new(
        _cc: &eframe::CreationContext<'_>,
        config: CropperConfig,
        file: Option<PathBuf>,
    ) -> Self {
        let (aspect_ratio_mode, custom_ratio) = match config.effective_aspect_ratio() {
            None => (AspectRatioMode::Free, 1.0),
            Some(r) if r == 1.0 => (AspectRatioMode::Square, 1.0),
            Some(r) => (AspectRatioMode::Custom, r),
        };
        let panes = config.previews.clone();

        let mut cropper = Cropper::new(config).on_cropped_rect_change(|rect: CroppedRect| {
            log::info!(
                "crop: {}x{} at ({}, {})",
                rect.width,
                rect.height,
                rect.left,
                rect.top
            );
        });
        let previews: Vec<_> = panes
            .iter()
            .map(|pane| Rc::new(RefCell::new(PreviewPanel::new(pane))))
            .collect();
        for preview in &previews {
            cropper.add_preview(preview.clone());
        }

        let mut app = Self {
            cropper,
            image: None,
            texture: None,
            request: None,
            previews,
            rendered: false,
            aspect_ratio_mode,
            custom_ratio,
            is_portrait: false,
            status: None,
        };
        if let Some(path) = file {
            app.open(&path);
        }
        app
    }

    fn open(&mut self, path: &Path) {
        let source = path.to_string_lossy().into_owned();
        if let Some(ticket) = self.cropper.set_image(Some(&source)) {
            self.request = Some(ImageRequest::spawn(ticket, source));
            self.status = None;
        }
    }

    fn close(&mut self) {
        self.request = None;
        self.image = None;
        self.texture = None;
        self.cropper.set_image(None);
    }

    fn poll_request(&mut self, ctx: &egui::Context) {
        let Some(request) = &self.request else {
            return;
        };
        let Some(result) = request.poll() else {
            ctx.request_repaint();
            return;
        };
        let ticket = request.ticket();
        self.request = None;

        match result {
            Ok(loaded) => {
                let size = loaded.natural_size();
                self.load_texture(ctx, &loaded.image);
                self.image = Some(loaded.image);
                self.cropper.complete_image(ticket, Ok(size));
                if self.aspect_ratio_mode == AspectRatioMode::Original {
                    self.apply_aspect_ratio();
                }
            }
            Err(e) => {
                log::warn!("{e}");
                self.status = Some(e.to_string());
                self.image = None;
                self.texture = None;
                self.cropper.complete_image(ticket, Err(e));
            }
        }
    }

    fn load_texture(&mut self, ctx: &egui::Context, image: &DynamicImage) {
        let size = [image.width() as _, image.height() as _];
        let image_buffer = image.to_rgba8();
        let pixels = image_buffer.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
        self.texture = Some(ctx.load_texture("image", color_image, egui::TextureOptions::LINEAR));
    }

    fn apply_aspect_ratio(&mut self) {
        let ratio = self
            .aspect_ratio_mode
            .ratio(self.cropper.natural_size(), self.custom_ratio);
        self.cropper.set_aspect_ratio(ratio);
    }

    fn save_cropped(&self, path: &Path) -> image_cropper::Result<()> {
        let rect = self.cropper.cropped_rect();
        let Some(image) = self.image.as_ref().filter(|_| !rect.is_empty()) else {
            return Err(Error::NothingToSave);
        };

        // Ensure bounds
        let x = rect.left.min(image.width() - 1);
        let y = rect.top.min(image.height() - 1);
        let width = rect.width.min(image.width() - x).max(1);
        let height = rect.height.min(image.height() - y).max(1);

        image
            .crop_imm(x, y, width, height)
            .save(path)
            .map_err(|error| Error::Save {
                path: path.to_path_buf(),
                error,
            })
    }

    fn show_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Open Image").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Image", &["png", "jpg", "jpeg", "bmp"])
                    .pick_file()
                {
                    self.open(&path);
                }
            }
            if self.cropper.is_visible() && ui.button("Close").clicked() {
                self.close();
            }

            ui.separator();
            ui.label("Aspect Ratio:");
            let mut changed = false;
            egui::ComboBox::from_id_salt("params_aspect_ratio")
                .selected_text(format!("{}", self.aspect_ratio_mode))
                .show_ui(ui, |ui| {
                    for mode in [
                        AspectRatioMode::Free,
                        AspectRatioMode::Original,
                        AspectRatioMode::Square,
                    ] {
                        changed |= ui
                            .selectable_value(&mut self.aspect_ratio_mode, mode, mode.to_string())
                            .changed();
                    }

                    ui.separator();
                    let oriented = if self.is_portrait {
                        AspectRatioMode::PORTRAIT
                    } else {
                        AspectRatioMode::LANDSCAPE
                    };
                    for mode in oriented {
                        changed |= ui
                            .selectable_value(&mut self.aspect_ratio_mode, mode, mode.to_string())
                            .changed();
                    }

                    ui.separator();
                    changed |= ui
                        .selectable_value(
                            &mut self.aspect_ratio_mode,
                            AspectRatioMode::Custom,
                            "Custom",
                        )
                        .changed();
                });

            if ui.button("🔄").clicked() {
                self.is_portrait = !self.is_portrait;
                if self.aspect_ratio_mode == AspectRatioMode::Custom {
                    self.custom_ratio = 1.0 / self.custom_ratio;
                } else {
                    self.aspect_ratio_mode = self.aspect_ratio_mode.counterpart();
                }
                changed = true;
            }

            if self.aspect_ratio_mode == AspectRatioMode::Custom {
                changed |= ui
                    .add(
                        egui::DragValue::new(&mut self.custom_ratio)
                            .speed(0.01)
                            .range(0.1..=10.0),
                    )
                    .changed();
            }

            if changed {
                self.apply_aspect_ratio();
            }

            if ui.button("Save Cropped Image").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Image", &["png", "jpg", "jpeg", "bmp"])
                    .save_file()
                {
                    match self.save_cropped(&path) {
                        Ok(()) => log::info!("saved crop to {}", path.display()),
                        Err(e) => {
                            log::error!("{e}");
                            self.status = Some(e.to_string());
                        }
                    }
                }
            }
        });

        if let Some(status) = &self.status {
            ui.colored_label(egui::Color32::LIGHT_RED, status);
        }
        ui.separator();
    }

    fn show_canvas(&mut self, ui: &mut egui::Ui) {
        let available_size = ui.available_size();
        let container = available_size - egui::vec2(PADDING * 2.0, PADDING * 2.0);
        let container = Size::new(container.x.max(1.0) as f64, container.y.max(1.0) as f64);
        if self.rendered {
            self.cropper.resize_container(container);
        } else {
            self.cropper.render(container);
            self.rendered = true;
        }

        let target_rect = egui::Rect::from_min_size(ui.cursor().min, available_size);
        let response = ui.allocate_rect(target_rect, egui::Sense::drag());
        let painter = ui.painter_at(target_rect);

        let (Some(texture), true) = (&self.texture, self.cropper.is_visible()) else {
            if self.request.is_some() {
                painter.text(
                    target_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "Loading…",
                    egui::FontId::proportional(16.0),
                    egui::Color32::GRAY,
                );
            }
            return;
        };

        let origin = target_rect.min + egui::vec2(PADDING, PADDING);
        let image_rect = to_egui_rect(origin, &self.cropper.fitted_rect());
        let local = |pos: egui::Pos2| {
            Point::new((pos.x - image_rect.min.x) as f64, (pos.y - image_rect.min.y) as f64)
        };

        // Draw image
        painter.image(
            texture.id(),
            image_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        // Handle Input
        if let Some(pos) = response.hover_pos() {
            if let Some(target) = self.cropper.hit_test(local(pos), HANDLE_TOLERANCE) {
                ui.ctx().set_cursor_icon(cursor_for(target));
            }
        }
        if response.drag_started() {
            if let Some(pos) = response.interact_pointer_pos() {
                if let Some(target) = self.cropper.hit_test(local(pos), HANDLE_TOLERANCE) {
                    self.cropper.pointer_down(target, local(pos));
                }
            }
        }
        if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.cropper.pointer_move(local(pos));
            }
        }
        if response.drag_stopped() {
            let pos = ui.ctx().input(|i| i.pointer.latest_pos()).unwrap_or(image_rect.min);
            self.cropper.pointer_up(local(pos));
        }
        if self.cropper.is_dragging() && ui.ctx().input(|i| i.key_pressed(egui::Key::Escape)) {
            self.cropper.cancel_drag();
        }

        let screen_crop_rect = to_egui_rect(image_rect.min, &self.cropper.crop_box());

        // Draw overlay (dimmed area outside crop)
        let overlay_color = egui::Color32::from_black_alpha(150);
        let mask = [
            // Top
            egui::Rect::from_min_max(
                image_rect.min,
                egui::pos2(image_rect.max.x, screen_crop_rect.min.y),
            ),
            // Bottom
            egui::Rect::from_min_max(
                egui::pos2(image_rect.min.x, screen_crop_rect.max.y),
                image_rect.max,
            ),
            // Left
            egui::Rect::from_min_max(
                egui::pos2(image_rect.min.x, screen_crop_rect.min.y),
                egui::pos2(screen_crop_rect.min.x, screen_crop_rect.max.y),
            ),
            // Right
            egui::Rect::from_min_max(
                egui::pos2(screen_crop_rect.max.x, screen_crop_rect.min.y),
                egui::pos2(image_rect.max.x, screen_crop_rect.max.y),
            ),
        ];
        for rect in mask {
            painter.rect_filled(rect, 0.0, overlay_color);
        }

        // Draw crop border
        painter.rect_stroke(
            screen_crop_rect,
            0.0,
            egui::Stroke::new(1.0, egui::Color32::WHITE),
        );

        // Draw handles
        let handle_radius = 6.0;
        let handle_stroke = egui::Stroke::new(1.0, egui::Color32::BLACK);
        let handle_fill = egui::Color32::WHITE;

        let handles = [
            screen_crop_rect.min,
            screen_crop_rect.max,
            egui::pos2(screen_crop_rect.min.x, screen_crop_rect.max.y),
            egui::pos2(screen_crop_rect.max.x, screen_crop_rect.min.y),
            screen_crop_rect.center_top(),
            screen_crop_rect.center_bottom(),
            screen_crop_rect.left_center(),
            screen_crop_rect.right_center(),
        ];

        for pos in handles {
            painter.circle(pos, handle_radius, handle_fill, handle_stroke);
        }
    }

    fn show_previews(&self, ui: &mut egui::Ui) {
        ui.heading("Preview");
        for preview in &self.previews {
            preview.borrow().show(ui, self.texture.as_ref());
            ui.add_space(8.0);
        }

        ui.separator();
        let rect = self.cropper.cropped_rect();
        if rect.is_empty() {
            ui.label("No selection");
        } else {
            ui.label(format!("{} × {} px", rect.width, rect.height));
            ui.label(format!("at ({}, {})", rect.left, rect.top));
        }
    }
}

impl eframe::App for ImageCropper {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Handle dropped files, unless a crop drag owns the pointer
        if !ctx.input(|i| i.raw.dropped_files.is_empty()) {
            if self.cropper.selection_suppressed() {
                log::debug!("ignoring dropped files during a crop drag");
            } else {
                let dropped_files = ctx.input(|i| i.raw.dropped_files.clone());
                if let Some(path) = dropped_files.first().and_then(|file| file.path.clone()) {
                    self.open(&path);
                }
            }
        }
        self.poll_request(ctx);

        egui::SidePanel::right("previews")
            .resizable(false)
            .show(ctx, |ui| self.show_previews(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_toolbar(ui);
            self.show_canvas(ui);
        });
    }
}

fn cursor_for(target: GrabTarget) -> egui::CursorIcon {
    let GrabTarget::Handle(handle) = target else {
        return egui::CursorIcon::Move;
    };
    match handle.direction {
        Direction::N | Direction::S => egui::CursorIcon::ResizeVertical,
        Direction::W | Direction::E => egui::CursorIcon::ResizeHorizontal,
        Direction::NW | Direction::SE => egui::CursorIcon::ResizeNwSe,
        Direction::NE | Direction::SW => egui::CursorIcon::ResizeNeSw,
    }
}

fn to_vec2(size: Size) -> egui::Vec2 {
    egui::vec2(size.width as f32, size.height as f32)
}

fn to_egui_rect(origin: egui::Pos2, rect: &Rect) -> egui::Rect {
    egui::Rect::from_min_size(
        origin + egui::vec2(rect.left as f32, rect.top as f32),
        to_vec2(rect.size()),
    )
}

struct Flags {
    config: Option<PathBuf>,
    aspect_ratio: Option<f64>,
    file: Option<PathBuf>,
}

fn parse_flags() -> Result<Flags, pico_args::Error> {
    let mut args = pico_args::Arguments::from_env();
    let config = args.opt_value_from_str("--config")?;
    let aspect_ratio = args.opt_value_from_str("--aspect-ratio")?;
    let file = args.finish().into_iter().next().map(PathBuf::from);
    Ok(Flags {
        config,
        aspect_ratio,
        file,
    })
}

fn load_config(flags: &Flags) -> CropperConfig {
    let path = flags
        .config
        .clone()
        .or_else(|| env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));
    let mut config = match path {
        Some(path) => CropperConfig::load_from_path(&path).unwrap_or_else(|e| {
            log::warn!("{e}; using defaults");
            CropperConfig::default()
        }),
        None => CropperConfig::default(),
    };
    if let Some(ratio) = flags.aspect_ratio {
        config.aspect_ratio = ratio;
        config.lock_aspect_ratio = true;
    }
    config
}

fn main() -> eframe::Result {
    env_logger::init();

    let flags = match parse_flags() {
        Ok(flags) => flags,
        Err(e) => {
            log::error!("{e}");
            eprintln!("usage: image_cropper [IMAGE] [--config PATH] [--aspect-ratio R]");
            std::process::exit(2);
        }
    };
    let config = load_config(&flags);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1000.0, 640.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Image Cropper",
        options,
        Box::new(move |cc| Ok(Box::new(ImageCropper::new(cc, config, flags.file)))),
    )
}
