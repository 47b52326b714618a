//! Crop canvas: the mapping between what is on screen and the image pixels.
//!
//! Two coordinate spaces are kept apart:
//!
//! - **Display space**: viewport pixels after scale-to-fit, zoom and centering.
//!   The crop square lives here while the user drags and zooms.
//! - **Original space**: pixels of the decoded, rotated image. Only
//!   [`CropCanvas::crop_in_original_space`] produces rectangles in this space,
//!   and only those are ever used to cut pixels.
//!
//! [`CropCanvas::to_original`] and [`CropCanvas::to_display`] are the only
//! conversions between the two.

use image::RgbImage;

pub const MIN_ZOOM: f64 = 0.2;
pub const MAX_ZOOM: f64 = 5.0;
/// Zoom multiplier applied per wheel tick.
pub const ZOOM_STEP: f64 = 1.2;

/// Integer position in display space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Integer width/height in display space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent {
    pub width: i32,
    pub height: i32,
}

impl Extent {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Square crop selection in display space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayRect {
    pub x: i32,
    pub y: i32,
    pub size: i32,
}

impl DisplayRect {
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.x + self.size && p.y < self.y + self.size
    }

    pub fn translate(self, delta: Point) -> Self {
        Self {
            x: self.x.saturating_add(delta.x),
            y: self.y.saturating_add(delta.y),
            size: self.size,
        }
    }
}

/// Square region in original space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRect {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

impl ImageRect {
    /// Shift (and if needed shrink) the square so it lies inside a
    /// `width` x `height` image. Both dimensions must be non-zero.
    pub fn fit_within(self, width: u32, height: u32) -> Self {
        let size = self.size.min(width).min(height).max(1);
        Self {
            x: self.x.min(width - size),
            y: self.y.min(height - size),
            size,
        }
    }
}

/// One wheel tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomStep {
    In,
    Out,
}

impl ZoomStep {
    pub fn factor(self) -> f64 {
        match self {
            ZoomStep::In => ZOOM_STEP,
            ZoomStep::Out => 1.0 / ZOOM_STEP,
        }
    }
}

/// Zoom and placement of the displayed image inside the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub zoom: f64,
    /// Top-left of the displayed image; negative when zoomed past the viewport
    pub offset: Point,
    pub viewport: Extent,
    /// Size of the displayed image
    pub display: Extent,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            offset: Point::ORIGIN,
            viewport: Extent::default(),
            display: Extent::default(),
        }
    }
}

/// Scale `image` to fit `viewport`, apply `zoom`, and center the result.
///
/// Returns the display offset and display size. Pure, so repeated calls with
/// the same inputs agree.
pub fn fit_layout(image: Extent, viewport: Extent, zoom: f64) -> (Point, Extent) {
    if image.is_empty() || viewport.is_empty() {
        return (Point::ORIGIN, Extent::default());
    }
    let scale = (viewport.width as f64 / image.width as f64)
        .min(viewport.height as f64 / image.height as f64);
    let display = Extent::new(
        (image.width as f64 * scale * zoom).round() as i32,
        (image.height as f64 * scale * zoom).round() as i32,
    );
    let offset = Point::new(
        (viewport.width - display.width) / 2,
        (viewport.height - display.height) / 2,
    );
    (offset, display)
}

/// Crop square of side `base_size * zoom`, capped by the displayed image and
/// centered on it.
pub fn centered_crop(
    base_size: u32,
    zoom: f64,
    offset: Point,
    display: Extent,
) -> Option<DisplayRect> {
    if display.is_empty() {
        return None;
    }
    let size = ((base_size as f64 * zoom).round() as i32)
        .max(1)
        .min(display.width)
        .min(display.height);
    Some(DisplayRect {
        x: offset.x + (display.width - size) / 2,
        y: offset.y + (display.height - size) / 2,
        size,
    })
}

/// Keep `crop` inside the displayed image, each axis on its own.
pub fn clamp_crop(crop: DisplayRect, offset: Point, display: Extent) -> DisplayRect {
    let max_x = offset.x + display.width - crop.size;
    let max_y = offset.y + display.height - crop.size;
    DisplayRect {
        x: crop.x.min(max_x).max(offset.x),
        y: crop.y.min(max_y).max(offset.y),
        size: crop.size,
    }
}

/// Holds the active image together with its view and crop selection.
#[derive(Debug)]
pub struct CropCanvas {
    image: Option<RgbImage>,
    base_crop_size: u32,
    view: ViewState,
    crop: Option<DisplayRect>,
}

impl CropCanvas {
    pub fn new(base_crop_size: u32) -> Self {
        Self {
            image: None,
            base_crop_size,
            view: ViewState::default(),
            crop: None,
        }
    }

    /// Replace the active image. `None` means the file could not be decoded;
    /// every view operation is a no-op until the next successful load.
    pub fn load(&mut self, image: Option<RgbImage>) {
        self.image = image;
        self.view.zoom = 1.0;
        self.view.offset = Point::ORIGIN;
        self.view.display = Extent::default();
        self.crop = None;
        self.layout();
    }

    pub fn image(&self) -> Option<&RgbImage> {
        self.image.as_ref()
    }

    /// Size of the active image in original space.
    pub fn image_extent(&self) -> Option<Extent> {
        self.image
            .as_ref()
            .map(|img| Extent::new(img.width() as i32, img.height() as i32))
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn crop(&self) -> Option<DisplayRect> {
        self.crop
    }

    pub fn base_crop_size(&self) -> u32 {
        self.base_crop_size
    }

    /// Track a new viewport size; re-layouts only when it actually changed.
    pub fn resize(&mut self, viewport: Extent) {
        if viewport == self.view.viewport {
            return;
        }
        self.view.viewport = viewport;
        self.layout();
    }

    /// Recompute display size and offset, then re-center the crop.
    pub fn layout(&mut self) {
        let Some(image) = self.image_extent() else {
            return;
        };
        let (offset, display) = fit_layout(image, self.view.viewport, self.view.zoom);
        self.view.offset = offset;
        self.view.display = display;
        self.init_crop();
    }

    pub fn set_zoom(&mut self, step: ZoomStep) {
        if self.image.is_none() {
            return;
        }
        self.view.zoom = (self.view.zoom * step.factor()).clamp(MIN_ZOOM, MAX_ZOOM);
        log::debug!("zoom {:.3}", self.view.zoom);
        self.layout();
    }

    pub fn set_base_crop_size(&mut self, size: u32) {
        self.base_crop_size = size;
        self.init_crop();
    }

    pub fn init_crop(&mut self) {
        if self.image.is_none() {
            return;
        }
        self.crop = centered_crop(
            self.base_crop_size,
            self.view.zoom,
            self.view.offset,
            self.view.display,
        );
    }

    /// Move the crop by `delta`, then clamp it back inside the displayed image.
    pub fn drag_crop(&mut self, delta: Point) {
        if let Some(crop) = self.crop {
            self.crop = Some(clamp_crop(
                crop.translate(delta),
                self.view.offset,
                self.view.display,
            ));
        }
    }

    /// Whether a display-space point falls inside the crop.
    pub fn contains(&self, p: Point) -> bool {
        self.crop.is_some_and(|crop| crop.contains(p))
    }

    /// Original pixels per display pixel.
    fn scale(&self) -> Option<f64> {
        let image = self.image_extent()?;
        if self.view.display.width <= 0 {
            return None;
        }
        Some(image.width as f64 / self.view.display.width as f64)
    }

    pub fn to_original(&self, rect: DisplayRect) -> Option<ImageRect> {
        let scale = self.scale()?;
        let offset = self.view.offset;
        Some(ImageRect {
            x: ((rect.x - offset.x) as f64 * scale).round().max(0.0) as u32,
            y: ((rect.y - offset.y) as f64 * scale).round().max(0.0) as u32,
            size: (rect.size as f64 * scale).round().max(1.0) as u32,
        })
    }

    pub fn to_display(&self, rect: ImageRect) -> Option<DisplayRect> {
        let scale = self.scale()?;
        let offset = self.view.offset;
        Some(DisplayRect {
            x: offset.x + (rect.x as f64 / scale).round() as i32,
            y: offset.y + (rect.y as f64 / scale).round() as i32,
            size: (rect.size as f64 / scale).round() as i32,
        })
    }

    /// The crop mapped into original space, guaranteed to lie inside the image.
    pub fn crop_in_original_space(&self) -> Option<ImageRect> {
        let image = self.image.as_ref()?;
        let rect = self.to_original(self.crop?)?;
        Some(rect.fit_within(image.width(), image.height()))
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
