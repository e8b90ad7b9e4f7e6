use crate::shared::frame::Frame;
use crate::shared::geometry::{CoordinateSpace, FrameSpace, Point, Rect};

pub type Rgb = [u8; 3];

/// Face colors, indexed by candidate position modulo the palette length.
pub const PALETTE: [Rgb; 8] = [
    [0, 0, 255],
    [0, 128, 255],
    [0, 255, 255],
    [0, 255, 0],
    [255, 128, 0],
    [255, 255, 0],
    [255, 0, 0],
    [255, 0, 255],
];

pub fn palette_color(index: usize) -> Rgb {
    PALETTE[index % PALETTE.len()]
}

/// Fills the inclusive box `(x0, y0)..=(x1, y1)`, clipped to the frame.
fn fill_box(frame: &mut Frame, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb) {
    let w = frame.width() as i64;
    let h = frame.height() as i64;
    let channels = frame.channels() as usize;
    if channels < 3 {
        return;
    }
    let (x0, x1) = (x0.max(0), x1.min(w - 1));
    let (y0, y1) = (y0.max(0), y1.min(h - 1));
    if x0 > x1 || y0 > y1 {
        return;
    }

    let stride = w as usize * channels;
    let data = frame.data_mut();
    for y in y0 as usize..=y1 as usize {
        let row = &mut data[y * stride..(y + 1) * stride];
        for x in x0 as usize..=x1 as usize {
            row[x * channels..x * channels + 3].copy_from_slice(&color);
        }
    }
}

/// Draws the outline of `rect` with the stroke centered on its border.
pub fn draw_rect(frame: &mut Frame, rect: Rect<FrameSpace>, color: Rgb, thickness: u32) {
    if rect.is_empty() || thickness == 0 {
        return;
    }
    let t = thickness as i64;
    let inner = (t - 1) / 2;
    let outer = t - 1 - inner;

    let left = rect.x as i64;
    let top = rect.y as i64;
    let right = rect.right() as i64 - 1;
    let bottom = rect.bottom() as i64 - 1;

    fill_box(frame, left - outer, top - outer, right + outer, top + inner, color);
    fill_box(frame, left - outer, bottom - inner, right + outer, bottom + outer, color);
    fill_box(frame, left - outer, top - outer, left + inner, bottom + outer, color);
    fill_box(frame, right - inner, top - outer, right + outer, bottom + outer, color);
}

/// Filled disk of `radius` around `center`.
pub fn fill_circle<S: CoordinateSpace>(frame: &mut Frame, center: Point<S>, radius: u32, color: Rgb) {
    let r = radius as i64;
    let (cx, cy) = (center.x as i64, center.y as i64);
    for dy in -r..=r {
        // Half-width of the chord at this row.
        let half = ((r * r - dy * dy) as f64).sqrt().floor() as i64;
        fill_box(frame, cx - half, cy + dy, cx + half, cy + dy, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = [255, 0, 0];

    fn pixel(frame: &Frame, x: usize, y: usize) -> Rgb {
        let i = (y * frame.width() as usize + x) * 3;
        [frame.data()[i], frame.data()[i + 1], frame.data()[i + 2]]
    }

    #[test]
    fn test_palette_wraps() {
        assert_eq!(palette_color(0), palette_color(8));
        assert_ne!(palette_color(0), palette_color(1));
    }

    #[test]
    fn test_single_pixel_outline_leaves_interior() {
        let mut frame = Frame::filled(10, 10, [0, 0, 0], 0);
        draw_rect(&mut frame, Rect::new(2, 2, 5, 5), RED, 1);
        assert_eq!(pixel(&frame, 2, 2), RED);
        assert_eq!(pixel(&frame, 6, 6), RED);
        assert_eq!(pixel(&frame, 4, 2), RED);
        assert_eq!(pixel(&frame, 4, 4), [0, 0, 0]);
        assert_eq!(pixel(&frame, 7, 7), [0, 0, 0]);
    }

    #[test]
    fn test_thick_outline_straddles_border() {
        let mut frame = Frame::filled(20, 20, [0, 0, 0], 0);
        draw_rect(&mut frame, Rect::new(5, 5, 10, 10), RED, 3);
        assert_eq!(pixel(&frame, 4, 10), RED);
        assert_eq!(pixel(&frame, 6, 10), RED);
        assert_eq!(pixel(&frame, 7, 10), [0, 0, 0]);
        assert_eq!(pixel(&frame, 3, 10), [0, 0, 0]);
    }

    #[test]
    fn test_drawing_is_clipped_to_frame() {
        let mut frame = Frame::filled(8, 8, [0, 0, 0], 0);
        draw_rect(&mut frame, Rect::new(-5, -5, 20, 20), RED, 3);
        fill_circle(&mut frame, Point::<FrameSpace>::new(7, 7), 4, RED);
        assert_eq!(frame.data().len(), 8 * 8 * 3);
        assert_eq!(pixel(&frame, 7, 7), RED);
    }

    #[test]
    fn test_fill_circle_covers_disk_only() {
        let mut frame = Frame::filled(11, 11, [0, 0, 0], 0);
        fill_circle(&mut frame, Point::<FrameSpace>::new(5, 5), 2, RED);
        assert_eq!(pixel(&frame, 5, 5), RED);
        assert_eq!(pixel(&frame, 7, 5), RED);
        assert_eq!(pixel(&frame, 5, 3), RED);
        assert_eq!(pixel(&frame, 7, 7), [0, 0, 0]);
        assert_eq!(pixel(&frame, 8, 5), [0, 0, 0]);
    }
}
