//! 24-bit color quantization onto the IRC palette.

use super::PaletteColor;

/// Palette entries eligible as a quantization result.
///
/// White and Black are left out: on IRC they vanish against one of the two
/// common client backgrounds.
const USABLE: [PaletteColor; 14] = [
    PaletteColor::Blue,
    PaletteColor::Green,
    PaletteColor::BrightRed,
    PaletteColor::Red,
    PaletteColor::Magenta,
    PaletteColor::DarkYellow,
    PaletteColor::Yellow,
    PaletteColor::BrightGreen,
    PaletteColor::Cyan,
    PaletteColor::BrightCyan,
    PaletteColor::BrightBlue,
    PaletteColor::BrightMagenta,
    PaletteColor::Grey,
    PaletteColor::LightGrey,
];

fn channels(rgb: u32) -> [i32; 3] {
    [
        ((rgb >> 16) & 0xFF) as i32,
        ((rgb >> 8) & 0xFF) as i32,
        (rgb & 0xFF) as i32,
    ]
}

fn distance(a: u32, b: u32) -> i32 {
    channels(a)
        .iter()
        .zip(channels(b).iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

/// Closest usable palette color to `rgb` (`0xRRGGBB`, upper byte ignored).
///
/// Ties resolve to the entry listed first.
pub fn nearest(rgb: u32) -> PaletteColor {
    let mut best = USABLE[0];
    let mut best_distance = i32::MAX;

    for color in USABLE {
        let Some(candidate) = color.rgb() else {
            continue;
        };
        let d = distance(rgb, candidate);
        if d < best_distance {
            best = color;
            best_distance = d;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_palette_colors_map_to_themselves() {
        for color in USABLE {
            let rgb = color.rgb().unwrap();
            assert_eq!(nearest(rgb), color, "{:06x}", rgb);
        }
    }

    #[test]
    fn test_white_and_black_are_never_chosen() {
        assert_eq!(nearest(0xFFFFFF), PaletteColor::LightGrey);
        assert_eq!(nearest(0x000000), PaletteColor::Grey);
    }

    #[test]
    fn test_near_colors() {
        assert_eq!(nearest(0x5865F2), PaletteColor::BrightBlue);
        assert_eq!(nearest(0xED4245), PaletteColor::BrightRed);
        assert_eq!(nearest(0x57F287), PaletteColor::BrightGreen);
    }

    #[test]
    fn test_is_deterministic_and_ignores_alpha() {
        assert_eq!(nearest(0x123456), nearest(0x123456));
        assert_eq!(nearest(0xFF00AA00), PaletteColor::Green);
    }
}
