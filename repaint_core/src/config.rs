// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display configuration.

use crate::area::Area;
use crate::color::ColorFormat;
use crate::error::ConfigError;

/// How dirty areas are rendered into the render buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Dirty areas are rendered in row bands sized to a buffer that may be
    /// smaller than the screen.
    #[default]
    Partial,
    /// Every frame redraws the whole screen into a screen-sized buffer.
    Full,
    /// Dirty areas are rendered at their absolute position in a screen-sized
    /// buffer.
    Direct,
}

/// Display rotation, clockwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Rotation {
    /// No rotation.
    #[default]
    Deg0,
    /// 90 degrees.
    Deg90,
    /// 180 degrees.
    Deg180,
    /// 270 degrees.
    Deg270,
}

impl Rotation {
    /// Whether width and height trade places on the panel.
    #[inline]
    #[must_use]
    pub const fn swaps_axes(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Configuration of one display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Width in pixels, in the unrotated orientation the UI is laid out in.
    pub hor_res: u32,
    /// Height in pixels, in the unrotated orientation.
    pub ver_res: u32,
    /// Render mode.
    pub render_mode: RenderMode,
    /// Pixel format the panel expects.
    pub color_format: ColorFormat,
    /// Panel rotation.
    pub rotation: Rotation,
    /// Rotate in software before flushing instead of relying on the panel.
    pub sw_rotate: bool,
    /// Added to every flushed area, for panels whose visible region does
    /// not start at the origin.
    pub offset: (i32, i32),
    /// During a screen transition, draw the previous screen over the active
    /// one instead of below it.
    pub draw_prev_over_act: bool,
    /// Passed to layer composites.
    pub antialiasing: bool,
    /// Maximum number of stored dirty areas before falling back to a
    /// whole-screen refresh.
    pub dirty_capacity: usize,
    /// Refresh timer period in milliseconds.
    pub refresh_period_ms: u32,
    /// Memory budget of one band of a simple isolation layer.
    pub simple_layer_buf_bytes: usize,
    /// Scratch budget for 90 and 270 degree software rotation.
    pub rotation_scratch_bytes: usize,
}

impl DisplayConfig {
    /// Partial rendering with default budgets.
    #[must_use]
    pub const fn partial(hor_res: u32, ver_res: u32) -> Self {
        Self {
            hor_res,
            ver_res,
            render_mode: RenderMode::Partial,
            color_format: ColorFormat::Xrgb8888,
            rotation: Rotation::Deg0,
            sw_rotate: false,
            offset: (0, 0),
            draw_prev_over_act: false,
            antialiasing: true,
            dirty_capacity: 32,
            refresh_period_ms: 33,
            simple_layer_buf_bytes: 24 * 1024,
            rotation_scratch_bytes: 10 * 1024,
        }
    }

    /// Whole-screen rendering.
    #[must_use]
    pub const fn full(hor_res: u32, ver_res: u32) -> Self {
        Self {
            render_mode: RenderMode::Full,
            ..Self::partial(hor_res, ver_res)
        }
    }

    /// Direct rendering at absolute buffer positions.
    #[must_use]
    pub const fn direct(hor_res: u32, ver_res: u32) -> Self {
        Self {
            render_mode: RenderMode::Direct,
            ..Self::partial(hor_res, ver_res)
        }
    }

    /// Sets the panel color format.
    #[must_use]
    pub const fn with_color_format(mut self, format: ColorFormat) -> Self {
        self.color_format = format;
        self
    }

    /// Sets the rotation and whether it is done in software.
    #[must_use]
    pub const fn with_rotation(mut self, rotation: Rotation, sw_rotate: bool) -> Self {
        self.rotation = rotation;
        self.sw_rotate = sw_rotate;
        self
    }

    /// Sets the panel offset.
    #[must_use]
    pub const fn with_offset(mut self, x: i32, y: i32) -> Self {
        self.offset = (x, y);
        self
    }

    /// Sets the dirty-area capacity.
    #[must_use]
    pub const fn with_dirty_capacity(mut self, capacity: usize) -> Self {
        self.dirty_capacity = capacity;
        self
    }

    /// Sets the refresh period.
    #[must_use]
    pub const fn with_refresh_period_ms(mut self, period: u32) -> Self {
        self.refresh_period_ms = period;
        self
    }

    /// Sets the screen transition draw order.
    #[must_use]
    pub const fn with_prev_over_act(mut self, prev_over_act: bool) -> Self {
        self.draw_prev_over_act = prev_over_act;
        self
    }

    /// The whole screen as an area.
    ///
    /// # Panics
    ///
    /// Panics if either resolution is zero; [`validate`](Self::validate)
    /// rejects such configurations.
    #[must_use]
    pub const fn screen(&self) -> Area {
        Area::from_origin_size(0, 0, self.hor_res, self.ver_res)
    }

    /// Bytes a render buffer needs to hold the whole screen.
    #[must_use]
    pub const fn screen_bytes(&self) -> usize {
        self.hor_res as usize * self.ver_res as usize * self.render_px_bytes()
    }

    /// Bytes one pixel takes in the render buffer.
    #[must_use]
    pub const fn render_px_bytes(&self) -> usize {
        self.color_format.bytes_per_pixel() as usize
    }

    /// Checks the configuration against a render buffer size.
    pub fn validate(&self, buf_bytes: usize) -> Result<(), ConfigError> {
        if self.hor_res == 0 || self.ver_res == 0 {
            return Err(ConfigError::ZeroResolution {
                hor_res: self.hor_res,
                ver_res: self.ver_res,
            });
        }
        if self.dirty_capacity == 0 {
            return Err(ConfigError::ZeroDirtyCapacity);
        }
        let row_bytes = self.hor_res as usize * self.render_px_bytes();
        if buf_bytes < row_bytes {
            return Err(ConfigError::BufferTooSmallForRow {
                bytes: buf_bytes,
                row_bytes,
            });
        }
        if self.render_mode != RenderMode::Partial {
            if buf_bytes < self.screen_bytes() {
                return Err(ConfigError::BufferSmallerThanScreen {
                    mode: self.render_mode,
                    bytes: buf_bytes,
                    needed: self.screen_bytes(),
                });
            }
            if self.sw_rotate && self.rotation != Rotation::Deg0 {
                return Err(ConfigError::SoftwareRotationNeedsPartial(self.render_mode));
            }
        }
        if self.sw_rotate && self.rotation.swaps_axes() && self.rotation_scratch_bytes < row_bytes
        {
            return Err(ConfigError::RotationScratchTooSmall {
                bytes: self.rotation_scratch_bytes,
                row_bytes,
            });
        }
        Ok(())
    }
}
