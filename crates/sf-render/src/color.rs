//! Deterministic distinguishable color assignment.
//!
//! Newly discovered variable columns need display colors that stay apart
//! from each other. Colors are sampled by stepping the hue by the golden
//! angle with an alternating lightness, which keeps consecutive colors far
//! apart in hue without any shared palette cursor; the function is pure, so
//! concurrent chains from different instruments never contend.

const GOLDEN_ANGLE_DEG: f64 = 137.507_764_05;

/// Return exactly `n` distinct `#RRGGBB` strings.
pub fn assign_colors(n: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(n);
    let mut i = 0usize;
    while out.len() < n {
        let hue = (i as f64 * GOLDEN_ANGLE_DEG) % 360.0;
        let lightness = match i % 3 {
            0 => 0.45,
            1 => 0.62,
            _ => 0.32,
        };
        let color = hsl_to_hex(hue, 0.65, lightness);
        // hue collisions only appear after hundreds of colors; skip and
        // resample rather than emit a duplicate string
        if !out.contains(&color) {
            out.push(color);
        }
        i += 1;
    }
    out
}

fn hsl_to_hex(h: f64, s: f64, l: f64) -> String {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    format!(
        "#{:02X}{:02X}{:02X}",
        to_byte(r1),
        to_byte(g1),
        to_byte(b1)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn is_hex_color(s: &str) -> bool {
        s.len() == 7
            && s.starts_with('#')
            && s[1..].chars().all(|c| c.is_ascii_hexdigit())
    }

    #[test]
    fn returns_exactly_n_well_formed_colors() {
        let colors = assign_colors(7);
        assert_eq!(colors.len(), 7);
        assert!(colors.iter().all(|c| is_hex_color(c)));
    }

    #[test]
    fn colors_are_distinct() {
        let colors = assign_colors(32);
        let unique: HashSet<&String> = colors.iter().collect();
        assert_eq!(unique.len(), 32);
    }

    #[test]
    fn assignment_is_deterministic() {
        assert_eq!(assign_colors(5), assign_colors(5));
    }

    #[test]
    fn zero_is_fine() {
        assert!(assign_colors(0).is_empty());
    }

    #[test]
    fn consecutive_colors_are_far_apart() {
        let colors = assign_colors(8);
        for pair in colors.windows(2) {
            let a = rgb(&pair[0]);
            let b = rgb(&pair[1]);
            let dist = ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2) + (a.2 - b.2).powi(2)).sqrt();
            assert!(dist > 60.0, "{} vs {} too close", pair[0], pair[1]);
        }
    }

    fn rgb(s: &str) -> (f64, f64, f64) {
        (
            u8::from_str_radix(&s[1..3], 16).unwrap() as f64,
            u8::from_str_radix(&s[3..5], 16).unwrap() as f64,
            u8::from_str_radix(&s[5..7], 16).unwrap() as f64,
        )
    }
}
