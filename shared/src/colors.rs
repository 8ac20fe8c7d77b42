use crate::hex::Terrain;

pub type Rgb = (u8, u8, u8);

/// Ownership colors, indexed by `(player_id - 1) % 8`.
pub const PLAYER_PALETTE: [Rgb; 8] = [
    (0xc9, 0xa2, 0x27), // gold
    (0x8b, 0x00, 0x00), // blood red
    (0x1a, 0x3a, 0x5c), // royal blue
    (0x4b, 0x00, 0x82), // purple
    (0x2d, 0x50, 0x16), // forest green
    (0xd4, 0xa5, 0x74), // sand
    (0x3a, 0x7c, 0xa5), // water blue
    (0x6b, 0x6b, 0x6b), // stone
];

/// Outline drawn around every hex.
pub const HEX_BORDER: Rgb = (0x5d, 0x2e, 0x0c);

/// `None` for unowned cells (id 0).
pub fn player_color(player_id: u32) -> Option<Rgb> {
    if player_id == 0 {
        return None;
    }
    let slot = (player_id - 1) as usize % PLAYER_PALETTE.len();
    Some(PLAYER_PALETTE[slot])
}

pub const fn terrain_color(terrain: Terrain) -> Rgb {
    match terrain {
        Terrain::Grass => (0x7c, 0xb3, 0x42),
        Terrain::Forest => (0x2d, 0x50, 0x16),
        Terrain::Mountain => (0x6b, 0x6b, 0x6b),
        Terrain::Water => (0x3a, 0x7c, 0xa5),
        Terrain::Desert => (0xd4, 0xa5, 0x74),
        Terrain::Swamp => (0x55, 0x6b, 0x2f),
    }
}

/// Owned land is drawn as cleared grass, slightly tinted toward the owner.
pub fn owned_tile_color(player_id: u32) -> Rgb {
    let grass = terrain_color(Terrain::Grass);
    match player_color(player_id) {
        Some(owner) => {
            let tinted = interpolate_hsl(rgb_to_hsl(grass), rgb_to_hsl(owner), 0.25);
            hsl_to_rgb(tinted)
        }
        None => grass,
    }
}

/// Darken or lighten by shifting lightness, staying inside [0, 1].
pub fn shade(color: Rgb, lightness_delta: f64) -> Rgb {
    let (h, s, l) = rgb_to_hsl(color);
    hsl_to_rgb((h, s, (l + lightness_delta).clamp(0.0, 1.0)))
}

/// `#rrggbb` CSS form.
pub fn to_hex((r, g, b): Rgb) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Convert RGB to HSL. Returns (h: 0..360, s: 0..1, l: 0..1).
pub fn rgb_to_hsl((r, g, b): Rgb) -> (f64, f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if (max - min).abs() < f64::EPSILON {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if (max - r).abs() < f64::EPSILON {
        let mut h = (g - b) / d;
        if g < b {
            h += 6.0;
        }
        h
    } else if (max - g).abs() < f64::EPSILON {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (h * 60.0, s, l)
}

pub fn hsl_to_rgb((h, s, l): (f64, f64, f64)) -> Rgb {
    if s.abs() < f64::EPSILON {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;
    let h = h / 360.0;

    let channel = |t: f64| (hue_to_rgb(p, q, t) * 255.0).round() as u8;
    (
        channel(h + 1.0 / 3.0),
        channel(h),
        channel(h - 1.0 / 3.0),
    )
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Interpolate between two HSL colors using shortest hue path.
pub fn interpolate_hsl(from: (f64, f64, f64), to: (f64, f64, f64), t: f64) -> (f64, f64, f64) {
    let mut dh = to.0 - from.0;
    if dh > 180.0 {
        dh -= 360.0;
    } else if dh < -180.0 {
        dh += 360.0;
    }

    let h = (from.0 + dh * t).rem_euclid(360.0);
    let s = from.1 + (to.1 - from.1) * t;
    let l = from.2 + (to.2 - from.2) * t;

    (h, s, l)
}
