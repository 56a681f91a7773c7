// Copyright 2026 the Repaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software rotation of rendered bands.
//!
//! Coordinates map from the UI's orientation (`W` by `H`) onto the panel:
//!
//! ```text
//!   Deg90:   (x, y) -> (y, W - 1 - x)          panel is H wide, W tall
//!   Deg180:  (x, y) -> (W - 1 - x, H - 1 - y)
//!   Deg270:  (x, y) -> (H - 1 - y, x)          panel is H wide, W tall
//! ```
//!
//! 180 degrees reverses the band in place. 90 and 270 transpose a few rows
//! at a time into a scratch buffer and flush each chunk on its own, waiting
//! for the panel in between, since the scratch is reused.

use crate::area::Area;
use crate::color::Color32;
use crate::config::Rotation;
use crate::flush::{FlushChunk, FlushHandle, FlushTarget, Panel, wait_idle};
use crate::pixbuf::PixelBuf;

/// Maps an area onto the panel for a rotation of a `screen`-sized UI.
#[must_use]
pub(crate) fn rotate_area(area: Area, rotation: Rotation, screen: Area) -> Area {
    let w = screen.width() as i32;
    let h = screen.height() as i32;
    match rotation {
        Rotation::Deg0 => area,
        Rotation::Deg90 => Area {
            x1: area.y1,
            y1: w - 1 - area.x2,
            x2: area.y2,
            y2: w - 1 - area.x1,
        },
        Rotation::Deg180 => Area {
            x1: w - 1 - area.x2,
            y1: h - 1 - area.y2,
            x2: w - 1 - area.x1,
            y2: h - 1 - area.y1,
        },
        Rotation::Deg270 => Area {
            x1: h - 1 - area.y2,
            y1: area.x1,
            x2: h - 1 - area.y1,
            y2: area.x2,
        },
    }
}

/// Rotates a contiguous block by 180 degrees.
pub(crate) fn reverse_in_place(pixels: &mut [Color32]) {
    pixels.reverse();
}

/// Transposes `rows` rows of `width` pixels from `src` (rows `stride`
/// apart) into `dst`, which ends up `rows` wide and `width` tall.
pub(crate) fn transpose_into(
    src: &[Color32],
    stride: usize,
    width: usize,
    rows: usize,
    rotation: Rotation,
    dst: &mut Vec<Color32>,
) {
    dst.clear();
    dst.resize(width * rows, Color32::TRANSPARENT);
    for r in 0..rows {
        let line = &src[r * stride..r * stride + width];
        for (c, px) in line.iter().enumerate() {
            let i = match rotation {
                Rotation::Deg270 => c * rows + (rows - 1 - r),
                _ => (width - 1 - c) * rows + r,
            };
            dst[i] = *px;
        }
    }
}

pub(crate) fn flush_transposed(
    panel: &mut dyn Panel,
    done: &FlushHandle,
    buf: &PixelBuf,
    area: Area,
    target: &FlushTarget,
    rotation: Rotation,
    scratch: &mut Vec<Color32>,
    last: bool,
) {
    let Some(start) = buf.index(area.x1, area.y1) else {
        log::error!("rotated {area:?} is outside the buffer at {:?}", buf.area());
        done.ready();
        return;
    };
    let stride = buf.stride();
    let width = area.width() as usize;
    let height = area.height() as usize;
    let chunk_rows = (target.scratch_px / width).clamp(1, height);
    let (dx, dy) = target.offset;
    let src = &buf.pixels()[start..];

    let mut row = 0;
    while row < height {
        let rows = chunk_rows.min(height - row);
        transpose_into(&src[row * stride..], stride, width, rows, rotation, scratch);

        #[expect(
            clippy::cast_possible_truncation,
            reason = "row offsets are bounded by the area height"
        )]
        let part = Area {
            y1: area.y1 + row as i32,
            y2: area.y1 + (row + rows) as i32 - 1,
            ..area
        };
        let final_chunk = row + rows == height;
        let chunk = FlushChunk::new(
            rotate_area(part, rotation, target.screen).translate(dx, dy),
            scratch,
            rows,
            target.format,
            last && final_chunk,
        );
        done.begin();
        panel.flush(&chunk, done);
        wait_idle(panel, done);
        row += rows;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorFormat;

    fn area(x1: i32, y1: i32, x2: i32, y2: i32) -> Area {
        Area::new(x1, y1, x2, y2).unwrap()
    }

    const SCREEN: Area = Area {
        x1: 0,
        y1: 0,
        x2: 3,
        y2: 1,
    };

    fn px(v: u8) -> Color32 {
        Color32::new(v, 0, 0, 255)
    }

    /// Writes the rotated pixels into a panel-sized grid.
    fn place(grid: &mut [[u8; 2]; 4], chunk_area: Area, data: &[Color32], stride: usize) {
        for y in chunk_area.y1..=chunk_area.y2 {
            for x in chunk_area.x1..=chunk_area.x2 {
                let i = (y - chunk_area.y1) as usize * stride + (x - chunk_area.x1) as usize;
                grid[y as usize][x as usize] = data[i].r;
            }
        }
    }

    #[test]
    fn transpose_matches_the_coordinate_mapping() {
        // A 4x2 UI: value = y * 4 + x.
        let src: Vec<Color32> = (0..8).map(px).collect();
        for rotation in [Rotation::Deg90, Rotation::Deg270] {
            let mut dst = Vec::new();
            transpose_into(&src, 4, 4, 2, rotation, &mut dst);
            let panel_area = rotate_area(SCREEN, rotation, SCREEN);
            assert_eq!(panel_area, area(0, 0, 1, 3));
            let mut grid = [[0_u8; 2]; 4];
            place(&mut grid, panel_area, &dst, 2);
            for y in 0..2 {
                for x in 0..4 {
                    let p = rotate_area(area(x, y, x, y), rotation, SCREEN);
                    assert_eq!(
                        grid[p.y1 as usize][p.x1 as usize],
                        (y * 4 + x) as u8,
                        "{rotation:?} ({x}, {y})"
                    );
                }
            }
        }
    }

    #[test]
    fn half_turn_mirrors_both_axes() {
        assert_eq!(
            rotate_area(area(0, 0, 1, 0), Rotation::Deg180, SCREEN),
            area(2, 1, 3, 1)
        );
        let mut pixels: Vec<Color32> = (0..4).map(px).collect();
        reverse_in_place(&mut pixels);
        assert_eq!(pixels[0], px(3));
    }

    struct Chunks {
        seen: Vec<(Area, bool)>,
    }

    impl Panel for Chunks {
        fn flush(&mut self, chunk: &FlushChunk<'_>, done: &FlushHandle) {
            _ = done;
            self.seen.push((chunk.area(), chunk.is_last()));
        }

        fn wait(&mut self, done: &FlushHandle) {
            done.ready();
        }
    }

    #[test]
    fn quarter_turn_flushes_in_scratch_sized_chunks() {
        let screen = area(0, 0, 9, 4);
        let mut buf = PixelBuf::try_new(screen, ColorFormat::Xrgb8888).unwrap();
        buf.clear(Color32::WHITE);
        let target = FlushTarget {
            screen,
            format: ColorFormat::Xrgb8888,
            offset: (0, 0),
            sw_rotation: Rotation::Deg90,
            scratch_px: 20,
        };
        let mut panel = Chunks { seen: Vec::new() };
        let done = FlushHandle::new();
        let mut scratch = Vec::new();
        flush_transposed(
            &mut panel,
            &done,
            &buf,
            screen,
            &target,
            Rotation::Deg90,
            &mut scratch,
            true,
        );
        // Two rows per chunk: rows 0-1, 2-3, 4.
        assert_eq!(
            panel.seen,
            [
                (area(0, 0, 1, 9), false),
                (area(2, 0, 3, 9), false),
                (area(4, 0, 4, 9), true),
            ]
        );
        assert!(!done.is_flushing());
    }
}
