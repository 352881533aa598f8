//! Built-in document themes.
//!
//! A template identifier selects one of a small closed set of immutable
//! style descriptors. Resolution is total: unknown, empty or missing
//! identifiers fall back to the classic theme.

/// RGB color, components in 0.0-1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    /// Build from 8-bit components.
    pub const fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// `RRGGBB` hex string, as used by WordprocessingML.
    pub fn to_hex(&self) -> String {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("{:02X}{:02X}{:02X}", c(self.0), c(self.1), c(self.2))
    }
}

/// Color tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThemeColors {
    /// Titles and section numbers
    pub primary: Rgb,
    /// Section header band
    pub accent: Rgb,
    /// Body text
    pub text: Rgb,
    /// Secondary text (footer, notes)
    pub muted: Rgb,
    /// Table header fill
    pub table_header: Rgb,
    /// Table header text
    pub table_header_text: Rgb,
    /// Alternate row fill
    pub table_stripe: Rgb,
    /// Table and signature rules
    pub border: Rgb,
}

/// Font sizes per role, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSizes {
    /// Document title
    pub title: f32,
    /// Section headers
    pub section: f32,
    /// Paragraphs
    pub body: f32,
    /// Table cells
    pub table: f32,
    /// Running footer
    pub footer: f32,
}

/// Spacing tokens, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spacing {
    /// Page margin on all sides
    pub page_margin: f32,
    /// Gap after a paragraph
    pub paragraph_gap: f32,
    /// Gap before a section header
    pub section_gap: f32,
    /// Padding inside table cells
    pub cell_padding: f32,
}

/// Corner radius tokens, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Radii {
    /// Section header band
    pub section: f32,
    /// Logo frame
    pub image: f32,
}

/// Immutable style descriptor for one template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThemeDescriptor {
    /// Canonical template name
    pub name: &'static str,
    /// Base-14 font family for body text
    pub font_family: &'static str,
    /// Color tokens
    pub colors: ThemeColors,
    /// Font sizes
    pub fonts: FontSizes,
    /// Spacing
    pub spacing: Spacing,
    /// Radii
    pub radii: Radii,
}

/// Name of the theme every miss resolves to.
pub const DEFAULT_THEME: &str = "classic";

static CLASSIC: ThemeDescriptor = ThemeDescriptor {
    name: "classic",
    font_family: "Helvetica",
    colors: ThemeColors {
        primary: Rgb::from_u8(0x1F, 0x3A, 0x5F),
        accent: Rgb::from_u8(0xE3, 0xEA, 0xF2),
        text: Rgb::from_u8(0x22, 0x22, 0x22),
        muted: Rgb::from_u8(0x6B, 0x72, 0x80),
        table_header: Rgb::from_u8(0x1F, 0x3A, 0x5F),
        table_header_text: Rgb::from_u8(0xFF, 0xFF, 0xFF),
        table_stripe: Rgb::from_u8(0xF4, 0xF6, 0xF9),
        border: Rgb::from_u8(0xC8, 0xCF, 0xD8),
    },
    fonts: FontSizes {
        title: 22.0,
        section: 14.0,
        body: 10.0,
        table: 8.5,
        footer: 8.0,
    },
    spacing: Spacing {
        page_margin: 50.0,
        paragraph_gap: 8.0,
        section_gap: 18.0,
        cell_padding: 4.0,
    },
    radii: Radii {
        section: 4.0,
        image: 0.0,
    },
};

static MODERN: ThemeDescriptor = ThemeDescriptor {
    name: "modern",
    font_family: "Helvetica",
    colors: ThemeColors {
        primary: Rgb::from_u8(0x0F, 0x76, 0x6E),
        accent: Rgb::from_u8(0xDD, 0xF4, 0xF1),
        text: Rgb::from_u8(0x1F, 0x29, 0x37),
        muted: Rgb::from_u8(0x64, 0x74, 0x8B),
        table_header: Rgb::from_u8(0x13, 0x4E, 0x4A),
        table_header_text: Rgb::from_u8(0xFF, 0xFF, 0xFF),
        table_stripe: Rgb::from_u8(0xF0, 0xFD, 0xFA),
        border: Rgb::from_u8(0xA7, 0xD8, 0xD0),
    },
    fonts: FontSizes {
        title: 24.0,
        section: 15.0,
        body: 10.0,
        table: 8.5,
        footer: 8.0,
    },
    spacing: Spacing {
        page_margin: 48.0,
        paragraph_gap: 9.0,
        section_gap: 20.0,
        cell_padding: 5.0,
    },
    radii: Radii {
        section: 8.0,
        image: 6.0,
    },
};

static MINIMAL: ThemeDescriptor = ThemeDescriptor {
    name: "minimal",
    font_family: "Helvetica",
    colors: ThemeColors {
        primary: Rgb::from_u8(0x11, 0x11, 0x11),
        accent: Rgb::from_u8(0xFF, 0xFF, 0xFF),
        text: Rgb::from_u8(0x11, 0x11, 0x11),
        muted: Rgb::from_u8(0x77, 0x77, 0x77),
        table_header: Rgb::from_u8(0xEE, 0xEE, 0xEE),
        table_header_text: Rgb::from_u8(0x11, 0x11, 0x11),
        table_stripe: Rgb::from_u8(0xFF, 0xFF, 0xFF),
        border: Rgb::from_u8(0xBB, 0xBB, 0xBB),
    },
    fonts: FontSizes {
        title: 20.0,
        section: 13.0,
        body: 10.0,
        table: 8.5,
        footer: 7.5,
    },
    spacing: Spacing {
        page_margin: 56.0,
        paragraph_gap: 7.0,
        section_gap: 16.0,
        cell_padding: 4.0,
    },
    radii: Radii {
        section: 0.0,
        image: 0.0,
    },
};

static CORPORATE: ThemeDescriptor = ThemeDescriptor {
    name: "corporate",
    font_family: "Times-Roman",
    colors: ThemeColors {
        primary: Rgb::from_u8(0x7A, 0x1F, 0x2B),
        accent: Rgb::from_u8(0xF5, 0xEC, 0xE6),
        text: Rgb::from_u8(0x1A, 0x1A, 0x1A),
        muted: Rgb::from_u8(0x5C, 0x5C, 0x5C),
        table_header: Rgb::from_u8(0x7A, 0x1F, 0x2B),
        table_header_text: Rgb::from_u8(0xFF, 0xFF, 0xFF),
        table_stripe: Rgb::from_u8(0xFA, 0xF6, 0xF3),
        border: Rgb::from_u8(0xD6, 0xC7, 0xBD),
    },
    fonts: FontSizes {
        title: 22.0,
        section: 14.0,
        body: 10.5,
        table: 9.0,
        footer: 8.0,
    },
    spacing: Spacing {
        page_margin: 54.0,
        paragraph_gap: 8.0,
        section_gap: 18.0,
        cell_padding: 4.0,
    },
    radii: Radii {
        section: 2.0,
        image: 0.0,
    },
};

static THEMES: [&ThemeDescriptor; 4] = [&CLASSIC, &MODERN, &MINIMAL, &CORPORATE];

/// Resolve a template identifier to its theme.
///
/// The identifier is trimmed, lowercased, and `_`/spaces become `-` before
/// an exact lookup. Never fails.
pub fn resolve_theme(template_id: Option<&str>) -> &'static ThemeDescriptor {
    let Some(raw) = template_id else {
        return &CLASSIC;
    };
    let key = normalize_template_id(raw);
    let key = match key.as_str() {
        "default" | "standard" => DEFAULT_THEME,
        other => other,
    };
    THEMES
        .iter()
        .copied()
        .find(|theme| theme.name == key)
        .unwrap_or(&CLASSIC)
}

/// Canonical form of a template identifier (also used in cache paths).
pub fn normalize_template_id(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '_' || c.is_whitespace() { '-' } else { c })
        .collect()
}

/// Names of all built-in themes.
pub fn theme_names() -> impl Iterator<Item = &'static str> {
    THEMES.iter().map(|t| t.name)
}
