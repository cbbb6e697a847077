//! Context-aware text analysis without an ML model.
//!
//! Resolves a raw danger-keyword hit against the surrounding vocabulary:
//! "I want to kill this game boss" is gaming talk, "how to kill someone"
//! is not, and no amount of context rescues an explicit phrase.
//!
//! Evaluation order is strict:
//!
//! 1. Explicit-phrase table (non-overridable, confidence 0.95)
//! 2. Dynamic keyword list, then the static keyword table with synonyms
//! 3. Safe-context vocabulary counting; the highest qualifying count wins
//! 4. Qualifying context makes the keyword safe (0.85), otherwise risky (0.80)

use serde::{Deserialize, Serialize};

/// Context categories that can make dangerous words safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeContext {
    Gaming,
    Shopping,
    Hunting,
    Cooking,
    Medical,
    Educational,
    Sports,
    Movie,
    News,
    Music,
}

impl SafeContext {
    /// Returns the category name.
    pub fn name(&self) -> &'static str {
        match self {
            SafeContext::Gaming => "gaming",
            SafeContext::Shopping => "shopping",
            SafeContext::Hunting => "hunting",
            SafeContext::Cooking => "cooking",
            SafeContext::Medical => "medical",
            SafeContext::Educational => "educational",
            SafeContext::Sports => "sports",
            SafeContext::Movie => "movie",
            SafeContext::News => "news",
            SafeContext::Music => "music",
        }
    }
}

/// Analysis result with a context explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResult {
    /// Whether the text is judged risky.
    pub is_risky: bool,
    /// The keyword or phrase label that triggered, if any.
    pub trigger_word: Option<String>,
    /// The safe context that resolved the keyword, if any.
    pub context: Option<SafeContext>,
    /// Confidence in the judgment.
    pub confidence: f32,
    /// Plain-language explanation.
    pub reason: String,
}

impl ContextResult {
    /// True for a non-overridable explicit-phrase match. Nothing downstream
    /// may weaken this: no caching, fusion, or downgrade logic applies.
    pub fn is_explicit_match(&self) -> bool {
        self.is_risky && self.confidence >= EXPLICIT_CONFIDENCE
    }
}

/// Confidence assigned to explicit-phrase matches.
pub const EXPLICIT_CONFIDENCE: f32 = 0.95;

/// Phrases that are always dangerous, regardless of context.
const EXPLICIT_PHRASES: &[(&str, &str)] = &[
    // Direct violence instructions
    ("how to make a bomb", "bomb making"),
    ("how to kill someone", "murder instructions"),
    ("how to hurt", "harm instructions"),
    // Explicit solicitation
    ("send nudes", "soliciting explicit images"),
    ("show me naked", "requesting explicit content"),
    ("child porn", "child abuse material"),
    ("underage", "minor exploitation"),
    // Self-harm intent
    ("i want to die", "suicidal ideation"),
    ("how to commit suicide", "suicide instructions"),
    ("best way to kill myself", "suicide method"),
    // Drug procurement/manufacturing
    ("where to buy drugs", "drug procurement"),
    ("how to make meth", "drug manufacturing"),
];

/// Keywords that are dangerous without context, with their synonyms.
const DANGEROUS_KEYWORDS: &[(&str, &[&str])] = &[
    // Violence (context-sensitive)
    ("kill", &["murder", "assassinate", "stab", "shoot dead", "how to kill"]),
    ("murder", &["homicide"]),
    ("suicide", &["hang myself", "end my life", "self harm"]),
    // Weapons (context-sensitive)
    ("knife", &["blade", "dagger", "machete"]),
    ("gun", &["pistol", "rifle", "firearm"]),
    ("poison", &["cyanide", "arsenic"]),
    // Explicit
    ("porn", &["xxx", "pornography", "adult video"]),
    ("nude", &["naked", "nudes", "naked pics"]),
    ("sex", &["sexual", "intercourse"]),
    ("breast", &["boobs", "tits"]),
    // Drugs
    ("cocaine", &["coke", "crack"]),
    ("heroin", &["smack", "dope"]),
    ("meth", &["crystal meth", "methamphetamine"]),
    // Self-harm
    ("cut myself", &["cutting"]),
    ("eating disorder", &["anorexia", "bulimia"]),
];

const GAMING: &[&str] = &[
    "game", "boss", "level", "player", "score", "enemy", "weapon", "mission", "quest",
    "character", "minecraft", "fortnite", "roblox", "pubg", "fps", "rpg", "respawn", "spawn",
    "pvp", "npc", "health bar", "power up", "game over", "final boss", "mini boss", "dungeon",
    "raid", "loot", "headshot",
];

const SHOPPING: &[&str] = &[
    "buy", "shop", "store", "amazon", "ebay", "walmart", "cost", "cheap", "expensive", "sale",
    "discount", "online shopping", "purchase", "order", "delivery", "shipping", "cart",
    "checkout", "product",
];

const HUNTING: &[&str] = &[
    "hunt", "hunting", "deer", "duck", "wildlife", "safari", "outdoor", "camping", "gear",
    "season", "licence", "permit",
];

const COOKING: &[&str] = &[
    "recipe", "cook", "bake", "ingredient", "kitchen", "oven", "fry", "boil", "chop", "dice",
    "slice", "chicken", "beef", "meat", "vegetable", "sauce", "spice", "flour", "sugar",
    "butter", "pan", "stir", "blend", "chef", "restaurant", "food", "dinner", "lunch",
];

const MEDICAL: &[&str] = &[
    "doctor", "hospital", "patient", "treatment", "disease", "cancer", "diagnosis", "symptom",
    "medicine", "health", "medical", "surgery", "breast cancer", "tumor", "therapy",
    "clinical", "examination", "anatomy", "biology", "organ", "tissue",
];

const EDUCATIONAL: &[&str] = &[
    "learn", "study", "school", "class", "teacher", "student", "history", "science", "math",
    "literature", "essay", "exam", "homework", "research", "university", "college",
    "chemistry", "physics", "education",
];

const SPORTS: &[&str] = &[
    "match", "team", "score", "goal", "player", "coach", "championship", "tournament",
    "league", "cricket", "football", "basketball", "tennis", "olympics", "athlete", "race",
];

const MOVIE: &[&str] = &[
    "movie", "film", "actor", "scene", "director", "character", "plot", "story", "ending",
    "trailer", "review", "netflix", "series", "episode", "season", "thriller", "horror",
];

const NEWS: &[&str] = &[
    "news", "report", "journalist", "article", "headline", "breaking", "investigation",
    "sources", "according to", "officials said",
];

const MUSIC: &[&str] = &[
    "song", "lyrics", "music", "album", "singer", "band", "concert", "melody", "hip hop",
    "rock", "rap", "spotify",
];

/// (category, vocabulary, minimum count to qualify). The broader categories
/// overlap everyday language too easily and need a stronger signal.
const CONTEXTS: &[(SafeContext, &[&str], usize)] = &[
    (SafeContext::Gaming, GAMING, 1),
    (SafeContext::Shopping, SHOPPING, 1),
    (SafeContext::Hunting, HUNTING, 1),
    (SafeContext::Cooking, COOKING, 1),
    (SafeContext::Medical, MEDICAL, 1),
    (SafeContext::Educational, EDUCATIONAL, 2),
    (SafeContext::Sports, SPORTS, 2),
    (SafeContext::Movie, MOVIE, 2),
    (SafeContext::News, NEWS, 2),
    (SafeContext::Music, MUSIC, 2),
];

/// Rule-based text analyzer resolving keywords against surrounding context.
#[derive(Debug, Clone, Default)]
pub struct ContextTextAnalyzer {
    /// Externally supplied keywords, checked before the static table.
    dynamic_keywords: Vec<String>,
}

impl ContextTextAnalyzer {
    /// Creates an analyzer with no dynamic keywords.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an analyzer with an externally supplied keyword list.
    pub fn with_dynamic_keywords(keywords: Vec<String>) -> Self {
        Self {
            dynamic_keywords: keywords,
        }
    }

    /// Replaces the dynamic keyword list.
    pub fn set_dynamic_keywords(&mut self, keywords: Vec<String>) {
        self.dynamic_keywords = keywords;
    }

    /// Analyzes text with context understanding.
    pub fn analyze(&self, text: &str) -> ContextResult {
        let lower = text.to_lowercase();

        // 1. Explicit phrases: no context can save these.
        if let Some(label) = check_explicit(&lower) {
            tracing::warn!("Explicit phrase detected: {}", label);
            return ContextResult {
                is_risky: true,
                trigger_word: Some(label.to_string()),
                context: None,
                confidence: EXPLICIT_CONFIDENCE,
                reason: format!("Explicitly harmful content: {}", label),
            };
        }

        // 2. Keyword scan: dynamic list first, then the static table.
        let trigger = self
            .dynamic_keywords
            .iter()
            .find(|kw| lower.contains(&kw.to_lowercase()))
            .map(|kw| kw.as_str())
            .or_else(|| {
                DANGEROUS_KEYWORDS
                    .iter()
                    .find(|(kw, synonyms)| {
                        lower.contains(kw) || synonyms.iter().any(|s| lower.contains(s))
                    })
                    .map(|(kw, _)| *kw)
            });

        // 3. No dangerous keyword: text is safe.
        let Some(trigger) = trigger else {
            return ContextResult {
                is_risky: false,
                trigger_word: None,
                context: None,
                confidence: 0.9,
                reason: "No dangerous keywords detected".to_string(),
            };
        };

        // 4. A qualifying safe context resolves the keyword.
        if let Some(context) = detect_context(&lower) {
            return ContextResult {
                is_risky: false,
                trigger_word: Some(trigger.to_string()),
                context: Some(context),
                confidence: 0.85,
                reason: format!("Keyword '{}' is safe in {} context", trigger, context.name()),
            };
        }

        // 5. Dangerous keyword without safe context.
        ContextResult {
            is_risky: true,
            trigger_word: Some(trigger.to_string()),
            context: None,
            confidence: 0.80,
            reason: format!("Dangerous keyword '{}' without safe context", trigger),
        }
    }
}

fn check_explicit(lower: &str) -> Option<&'static str> {
    EXPLICIT_PHRASES
        .iter()
        .find(|(phrase, _)| lower.contains(phrase))
        .map(|(_, label)| *label)
}

/// Counts vocabulary hits per category and returns the qualifying category
/// with the highest count.
fn detect_context(lower: &str) -> Option<SafeContext> {
    let mut best: Option<(SafeContext, usize)> = None;

    for (context, vocabulary, min_count) in CONTEXTS {
        let count = vocabulary.iter().filter(|word| lower.contains(**word)).count();
        if count < *min_count {
            continue;
        }
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((*context, count)),
        }
    }

    best.map(|(context, _)| context)
}
