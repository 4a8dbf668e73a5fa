use crate::model::{SoundCategory, SoundDef};

const SOUNDS: &[SoundDef] = &[
    SoundDef {
        id: "rain",
        name: "Rain",
        file: "rain.mp3",
        category: SoundCategory::Nature,
        subcategory: Some("rain"),
        premium: false,
    },
    SoundDef {
        id: "ocean",
        name: "Ocean",
        file: "ocean.mp3",
        category: SoundCategory::Nature,
        subcategory: Some("water"),
        premium: false,
    },
    SoundDef {
        id: "wind",
        name: "Wind",
        file: "wind.mp3",
        category: SoundCategory::Nature,
        subcategory: Some("wind"),
        premium: false,
    },
    SoundDef {
        id: "campfire",
        name: "Campfire",
        file: "campfire.mp3",
        category: SoundCategory::Nature,
        subcategory: None,
        premium: true,
    },
    SoundDef {
        id: "birds",
        name: "Birds",
        file: "birds.mp3",
        category: SoundCategory::Nature,
        subcategory: None,
        premium: false,
    },
    SoundDef {
        id: "thunder",
        name: "Thunder",
        file: "thunder.mp3",
        category: SoundCategory::Nature,
        subcategory: Some("rain"),
        premium: true,
    },
    SoundDef {
        id: "forest",
        name: "Forest",
        file: "forest-ambience.mp3",
        category: SoundCategory::Nature,
        subcategory: None,
        premium: false,
    },
    SoundDef {
        id: "stream",
        name: "Stream",
        file: "mountain-stream.mp3",
        category: SoundCategory::Nature,
        subcategory: Some("water"),
        premium: false,
    },
    SoundDef {
        id: "crickets",
        name: "Crickets",
        file: "night-crickets.mp3",
        category: SoundCategory::Nature,
        subcategory: None,
        premium: false,
    },
    SoundDef {
        id: "leaves",
        name: "Leaves",
        file: "rustling-leaves.mp3",
        category: SoundCategory::Nature,
        subcategory: Some("wind"),
        premium: false,
    },
    SoundDef {
        id: "waterfall",
        name: "Waterfall",
        file: "waterfall-sound.mp3",
        category: SoundCategory::Nature,
        subcategory: Some("water"),
        premium: true,
    },
    SoundDef {
        id: "city-traffic",
        name: "City Traffic",
        file: "city-traffic.mp3",
        category: SoundCategory::City,
        subcategory: None,
        premium: true,
    },
    SoundDef {
        id: "coffee-shop",
        name: "Coffee Shop",
        file: "coffee-shop.mp3",
        category: SoundCategory::City,
        subcategory: None,
        premium: true,
    },
    SoundDef {
        id: "singing-bowl",
        name: "Singing Bowl",
        file: "singing-bowl.mp3",
        category: SoundCategory::Meditation,
        subcategory: None,
        premium: true,
    },
    SoundDef {
        id: "piano",
        name: "Piano",
        file: "piano.mp3",
        category: SoundCategory::Instruments,
        subcategory: None,
        premium: true,
    },
    SoundDef {
        id: "whisper",
        name: "Whisper",
        file: "whisper.mp3",
        category: SoundCategory::Asmr,
        subcategory: None,
        premium: true,
    },
];

const CATEGORIES: &[SoundCategory] = &[
    SoundCategory::Nature,
    SoundCategory::City,
    SoundCategory::Meditation,
    SoundCategory::Instruments,
    SoundCategory::Asmr,
];

pub fn builtin_sounds() -> &'static [SoundDef] {
    SOUNDS
}

pub fn categories() -> &'static [SoundCategory] {
    CATEGORIES
}

pub fn find(id: &str) -> Option<&'static SoundDef> {
    SOUNDS.iter().find(|sound| sound.id == id)
}

pub fn sounds_in_category(category: SoundCategory) -> Vec<&'static SoundDef> {
    SOUNDS
        .iter()
        .filter(|sound| sound.category == category)
        .collect()
}
