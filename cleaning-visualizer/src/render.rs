use anyhow::Result;
use cleaning_common::{GridFrame, Portrayal, Shape};
use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use std::path::Path;

const GRID_LINE_COLOR: Rgba<u8> = Rgba([210, 210, 210, 255]);

pub fn load_frames(path: &Path) -> Result<Vec<GridFrame>> {
    crate::decode::load_export(path)
}

/// Pixel size of one grid cell so that the whole grid fits in `size` pixels.
pub fn cell_size_px(frame: &GridFrame, size: u32) -> u32 {
    (size / frame.width.max(frame.height).max(1)).max(1)
}

/// Draws one frame. Cell (0, 0) is the bottom-left corner of the image.
pub fn draw_frame(frame: &GridFrame, size: u32, bg_color: [u8; 4]) -> RgbaImage {
    let cell = cell_size_px(frame, size);
    let width_px = cell * frame.width;
    let height_px = cell * frame.height;
    let mut image = ImageBuffer::from_pixel(width_px, height_px, Rgba(bg_color));

    // Grid lines
    for x in 0..=frame.width {
        let px = (x * cell).min(width_px.saturating_sub(1)) as f32;
        draw_line_segment_mut(&mut image, (px, 0.0), (px, height_px as f32), GRID_LINE_COLOR);
    }
    for y in 0..=frame.height {
        let py = (y * cell).min(height_px.saturating_sub(1)) as f32;
        draw_line_segment_mut(&mut image, (0.0, py), (width_px as f32, py), GRID_LINE_COLOR);
    }

    // Lower layers first so vacuums sit on top of the dirt they share a cell with.
    let mut agents: Vec<_> = frame
        .agents
        .iter()
        .map(|agent| (Portrayal::for_kind(agent.kind), agent.pos))
        .collect();
    agents.sort_by_key(|(portrayal, _)| portrayal.layer);

    for (portrayal, pos) in agents {
        let center_x = (pos.x * cell + cell / 2) as i32;
        let center_y = ((frame.height - 1 - pos.y) * cell + cell / 2) as i32; // Flip Y
        draw_agent(&mut image, center_x, center_y, cell, &portrayal);
    }

    image
}

fn draw_agent(image: &mut RgbaImage, center_x: i32, center_y: i32, cell: u32, portrayal: &Portrayal) {
    let color = Rgba(portrayal.color);
    match portrayal.shape {
        Shape::Circle => {
            let radius = ((portrayal.radius * cell as f32) / 2.0).round().max(1.0) as i32;
            if portrayal.filled {
                draw_filled_circle_mut(image, (center_x, center_y), radius, color);
            } else {
                draw_hollow_circle_mut(image, (center_x, center_y), radius, color);
            }
        }
        Shape::Square => {
            // Leave a one pixel border so neighbouring vacuums stay distinguishable.
            let side = ((portrayal.radius * cell as f32).round() as u32).saturating_sub(2).max(1);
            let rect = Rect::at(center_x - side as i32 / 2, center_y - side as i32 / 2).of_size(side, side);
            if portrayal.filled {
                draw_filled_rect_mut(image, rect, color);
            } else {
                draw_hollow_rect_mut(image, rect, color);
            }
        }
    }
}
