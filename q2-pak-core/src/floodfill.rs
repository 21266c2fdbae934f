//! Background fill for model skins.
//!
//! Skins store their unused area as one flat color. Filtering would bleed that
//! color into the visible texels, so the background reachable from the top-left
//! corner is repainted with the colors of the nearest real texels instead.

use std::collections::VecDeque;

use crate::palette::{Palette, TRANSPARENT_INDEX};

/// Flood the region connected to pixel (0, 0) in place.
///
/// Pixels of the seed color are marked with [`TRANSPARENT_INDEX`] while queued
/// and, once visited, take the last non-background color seen among their
/// 4-neighbours (opaque black if there is none). Nothing happens when the seed
/// already has the replacement color or is the marker itself.
pub fn flood_fill_skin(skin: &mut [u8], width: usize, height: usize, palette: &Palette) {
    if width == 0 || height == 0 || skin.len() < width * height {
        return;
    }

    let fill_color = skin[0];
    let filled_color = palette.opaque_black_index();
    if fill_color == filled_color || fill_color == TRANSPARENT_INDEX {
        return;
    }

    // every pixel is queued at most once
    let mut queue = VecDeque::with_capacity((width * height).min(4096));
    queue.push_back((0usize, 0usize));

    while let Some((x, y)) = queue.pop_front() {
        let mut fdc = filled_color;

        let left = (x > 0).then(|| (x - 1, y));
        let right = (x + 1 < width).then(|| (x + 1, y));
        let up = (y > 0).then(|| (x, y - 1));
        let down = (y + 1 < height).then(|| (x, y + 1));

        for (nx, ny) in [left, right, up, down].into_iter().flatten() {
            let pos = &mut skin[nx + width * ny];
            if *pos == fill_color {
                *pos = TRANSPARENT_INDEX;
                queue.push_back((nx, ny));
            } else if *pos != TRANSPARENT_INDEX {
                fdc = *pos;
            }
        }

        skin[x + width * y] = fdc;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::PALETTE_SIZE;

    /// Palette where index 3 is the first opaque black.
    fn palette() -> Palette {
        let mut raw = [0x80u8; PALETTE_SIZE];
        raw[3 * 3..3 * 3 + 3].fill(0);
        Palette::from_rgb(&raw)
    }

    #[test]
    fn test_uniform_background_becomes_black() {
        let mut skin = vec![9u8; 16];
        flood_fill_skin(&mut skin, 4, 4, &palette());
        assert_eq!(skin, vec![3u8; 16]);
    }

    #[test]
    fn test_background_takes_edge_colors() {
        #[rustfmt::skip]
        let mut skin = vec![
            9, 9, 9,
            9, 5, 9,
            9, 9, 9,
        ];
        flood_fill_skin(&mut skin, 3, 3, &palette());
        // the subject is untouched and nothing is left marked
        assert_eq!(skin[4], 5);
        assert!(!skin.contains(&9));
        assert!(!skin.contains(&TRANSPARENT_INDEX));
        // the last neighbour examined wins: (1, 0) ends on the subject below it
        assert_eq!(skin[1], 5);
        // (0, 1) sees the subject first, then the already repainted corner
        assert_eq!(skin[3], 3);
    }

    #[test]
    fn test_region_limited_to_connected_pixels() {
        #[rustfmt::skip]
        let mut skin = vec![
            9, 1, 9,
            1, 1, 9,
            9, 9, 9,
        ];
        flood_fill_skin(&mut skin, 3, 3, &palette());
        assert_eq!(skin[0], 1);
        // the bottom-right region is not connected to the seed
        assert_eq!(&skin[1..], &[1, 9, 1, 1, 9, 9, 9, 9]);
    }

    #[test]
    fn test_noop_seeds() {
        let mut skin = vec![3, 3, 7, 3];
        flood_fill_skin(&mut skin, 2, 2, &palette());
        assert_eq!(skin, vec![3, 3, 7, 3]);

        let mut skin = vec![255, 255, 7, 255];
        flood_fill_skin(&mut skin, 2, 2, &palette());
        assert_eq!(skin, vec![255, 255, 7, 255]);
    }

    #[test]
    fn test_existing_markers_untouched() {
        #[rustfmt::skip]
        let mut skin = vec![
            9, 9, 255, 9,
            9, 255, 9, 9,
            9, 9, 9, 255,
        ];
        let markers: Vec<usize> = (0..skin.len()).filter(|&i| skin[i] == 255).collect();
        flood_fill_skin(&mut skin, 4, 3, &palette());
        for i in markers {
            assert_eq!(skin[i], 255);
        }
        assert!(!skin.contains(&9));
    }

    #[test]
    fn test_second_pass_is_noop() {
        #[rustfmt::skip]
        let mut skin = vec![
            9, 9, 9, 9,
            9, 3, 3, 9,
            9, 3, 3, 9,
            9, 9, 9, 9,
        ];
        flood_fill_skin(&mut skin, 4, 4, &palette());
        let once = skin.clone();
        assert_eq!(once, vec![3u8; 16]);
        flood_fill_skin(&mut skin, 4, 4, &palette());
        assert_eq!(skin, once);
    }

    #[test]
    fn test_large_skin_does_not_overflow() {
        // the seed region is far larger than any fixed ring buffer
        let (width, height) = (640, 480);
        let mut skin = vec![9u8; width * height];
        skin[width * height - 1] = 7;
        flood_fill_skin(&mut skin, width, height, &palette());
        assert!(!skin.contains(&9));
        assert!(!skin.contains(&TRANSPARENT_INDEX));
    }
}
