//! Built-in edit instructions offered as one-click presets.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub name: &'static str,
    pub instruction: &'static str,
}

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "restore",
        instruction: "Convert this black and white image to full color. Restore fine details, repair any scratches, tears, or dust. Improve sharpness to high definition quality. Crop to 3:2 aspect ratio.",
    },
    Preset {
        name: "denoise",
        instruction: "Denoise the image to remove grain, sharpen fine details, and enhance clarity and contrast for a clean high-definition look.",
    },
    Preset {
        name: "vintage",
        instruction: "Make this image look like a vintage polaroid.",
    },
    Preset {
        name: "oil-painting",
        instruction: "Turn this into a professional oil painting.",
    },
];

pub fn find(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}
