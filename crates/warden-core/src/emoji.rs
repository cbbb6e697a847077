//! Emoji-based risk scoring.
//!
//! Fixed emoji-to-weight table; weights are conservative and explainable.
//! ML is intentionally not used here.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static EMOJI_RISK: Lazy<HashMap<&'static str, f32>> = Lazy::new(|| {
    HashMap::from([
        // Suggestive
        ("\u{1F351}", 0.6),  // peach
        ("\u{1F346}", 0.7),  // eggplant
        ("\u{1F34C}", 0.6),  // banana
        ("\u{1F352}", 0.55), // cherries
        ("\u{1F4A6}", 0.65), // sweat droplets
        ("\u{1F445}", 0.55), // tongue
        ("\u{1F444}", 0.5),  // mouth
        ("\u{1FAE6}", 0.65), // biting lip
        ("\u{1F60F}", 0.45), // smirk
        ("\u{1F608}", 0.45), // smiling imp
        ("\u{1F975}", 0.5),  // hot face
        ("\u{1F924}", 0.4),  // drooling
        ("\u{1F525}", 0.4),  // fire
        ("\u{1F48B}", 0.35), // kiss mark
        ("\u{2764}\u{FE0F}\u{200D}\u{1F525}", 0.45), // heart on fire
        // Explicit / adult-only
        ("\u{1F51E}", 0.9), // no one under eighteen
        // Body-focused
        ("\u{1F9B6}", 0.5),  // foot
        ("\u{1F459}", 0.45), // bikini
        ("\u{1FA72}", 0.45), // briefs
        // Violence / gore
        ("\u{1F52A}", 0.85), // kitchen knife
        ("\u{1F4A3}", 0.9),  // bomb
        ("\u{1FA78}", 0.75), // drop of blood
        ("\u{1F9E8}", 0.85), // firecracker
        ("\u{2694}\u{FE0F}", 0.7), // crossed swords
        ("\u{1F52B}", 0.9),  // pistol
        ("\u{2620}\u{FE0F}", 0.8), // skull and crossbones
        ("\u{1F480}", 0.7),  // skull
        // Drugs / intoxication
        ("\u{1F37A}", 0.4),  // beer
        ("\u{1F37B}", 0.45), // clinking beers
        ("\u{1F489}", 0.55), // syringe
        ("\u{1F48A}", 0.5),  // pill
        ("\u{1F6AC}", 0.6),  // cigarette
    ])
});

/// Returns the maximum emoji risk present in the text, 0.0 if none.
pub fn score(text: &str) -> f32 {
    if text.is_empty() {
        return 0.0;
    }

    EMOJI_RISK
        .iter()
        .filter(|(emoji, _)| text.contains(**emoji))
        .map(|(_, weight)| *weight)
        .fold(0.0, f32::max)
}

/// Lists the risky emojis found, for explainability and logs.
pub fn risky_emojis(text: &str) -> Vec<&'static str> {
    if text.is_empty() {
        return Vec::new();
    }

    EMOJI_RISK
        .keys()
        .filter(|emoji| text.contains(**emoji))
        .copied()
        .collect()
}

/// Returns true if the text contains an emoji weighted 0.5 or above.
pub fn contains_risky_emoji(text: &str) -> bool {
    score(text) >= 0.5
}
