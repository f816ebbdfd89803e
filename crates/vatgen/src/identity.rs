use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Family prefixes stripped from the start of a stem before identity
/// matching: static mesh, material instance, texture, base material.
/// Longer prefixes first so `MI_` never matches as `M_`.
const FAMILY_PREFIXES: [&str; 4] = ["SM", "MI", "T", "M"];

/// Which animation-token spelling the identity pattern accepts. The two
/// rules disagree on tokens carrying digits (`Walk01` matches only under
/// `Legacy`), so the choice is the caller's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimTokenRule {
    /// A capitalized alphabetic word (`Walk`, `ZombieWave`).
    #[default]
    Capitalized,
    /// An alphabetic run optionally followed by digits (`Walk01`).
    Legacy,
}

static CAPITALIZED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<character>.+)_(?P<anim>[A-Z][A-Za-z]*)_(?P<role>pos|rot|data)$")
        .expect("Failed to compile regex")
});

static LEGACY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<character>.+)_(?P<anim>[A-Za-z]+[0-9]*)_(?P<role>pos|rot|data)$")
        .expect("Failed to compile regex")
});

fn pattern(rule: AnimTokenRule) -> &'static Regex {
    match rule {
        AnimTokenRule::Capitalized => &CAPITALIZED_PATTERN,
        AnimTokenRule::Legacy => &LEGACY_PATTERN,
    }
}

fn stem_of(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

fn strip_family_prefix(stem: &str) -> &str {
    for prefix in FAMILY_PREFIXES {
        let matches = stem.len() > prefix.len() + 1
            && stem
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
            && stem.as_bytes()[prefix.len()] == b'_';
        if matches {
            return &stem[prefix.len() + 1..];
        }
    }
    stem
}

/// Derive the canonical character identity from any filename of the mesh,
/// texture or data family. Never fails: input that matches no pattern
/// degrades to the whole prefix-stripped stem, which is exactly right for
/// plain mesh filenames.
pub fn extract_character(filename: &str, rule: AnimTokenRule) -> String {
    let residual = strip_family_prefix(stem_of(filename));
    match pattern(rule).captures(residual) {
        Some(captures) => captures["character"].to_string(),
        None => residual.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureRole {
    Position,
    Rotation,
}

impl TextureRole {
    pub fn token(&self) -> &'static str {
        match self {
            TextureRole::Position => "pos",
            TextureRole::Rotation => "rot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureIdentity {
    pub character: String,
    pub animation: String,
    pub role: TextureRole,
}

/// Full identity of a texture filename, or `None` when the stem does not
/// follow the `<character>_<anim>_{pos,rot}` convention.
pub fn parse_texture_stem(filename: &str, rule: AnimTokenRule) -> Option<TextureIdentity> {
    let residual = strip_family_prefix(stem_of(filename));
    let captures = pattern(rule).captures(residual)?;
    let role = match &captures["role"] {
        "pos" => TextureRole::Position,
        "rot" => TextureRole::Rotation,
        _ => return None,
    };
    Some(TextureIdentity {
        character: captures["character"].to_string(),
        animation: captures["anim"].to_string(),
        role,
    })
}

/// Canonical store name of an imported bake texture.
pub fn texture_asset_name(character: &str, animation: &str, role: TextureRole) -> String {
    format!("T_{}_{}_{}", character, animation, role.token())
}

/// Canonical store name of one chain material instance.
pub fn instance_asset_name(character: &str, animation: &str) -> String {
    format!("MI_VAT_{}_{}", character, animation)
}

/// Name of the bounds sidecar belonging to one character/animation pair.
pub fn bounds_file_name(character: &str, animation: &str) -> String {
    format!("{}_{}_data.json", character, animation)
}

/// Recover `(character, animation)` from a data-file stem. Data filenames
/// are tokenized on `_` directly: the animation is the last segment before
/// the `_data` suffix, the character is everything before it. Stems with
/// too few segments yield `None`.
pub fn split_data_stem(filename: &str) -> Option<(String, String)> {
    let stem = stem_of(filename);
    let residual = stem.strip_suffix("_data")?;
    let (character, animation) = residual.rsplit_once('_')?;
    if character.is_empty() || animation.is_empty() {
        return None;
    }
    Some((character.to_string(), animation.to_string()))
}
