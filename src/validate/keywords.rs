//! Keyword layers of the validation funnel.
//!
//! Matching works on word starts over lowercased text: a stem like `drone`
//! covers "droner", "dronerne", "drones" without also matching unrelated
//! words ("dronning" does not start with "drone"). A handful of short stems
//! that would over-match are kept in exact-word lists instead.

/// Stems matched against word starts, any language.
const DRONE_STEMS: &[&str] = &[
    "drone",   // da/no/en/fr: drone, droner, dronerne, drones
    "drohne",  // de: drohne, drohnen
    "dronare", // sv (ascii-folded feeds)
    "drönare", // sv
    "lennokk", // fi: lennokki, lennokin
    "quadcopter",
    "multirotor",
];

/// Exact word forms for stems too short to prefix-match safely.
const DRONE_EXACT: &[&str] = &[
    "dron",  // pl
    "drony", // pl plural
    "uav", "uas",
];

/// Excluded-topic markers: policy announcements, exercises/drills, defense
/// procurement, product coverage. A hit rejects at layer 1.
const EXCLUDED_TOPIC_STEMS: &[&str] = &[
    // policy / regulation
    "droneforbud",
    "politik", // "politik(ken)" but never "politi"
    "lovforslag",
    "lovgivning",
    "regulering",
    "regulation",
    "legislation",
    // exercises and drills
    "øvelse",
    "ovelse",
    "övning",
    "ovning",
    "übung",
    "uebung",
    "exercise",
    "drill",
    // defense procurement / deployment programs
    "antidrone",
    "luftforsvar",
    "anskaffelse",
    "procurement",
    // product coverage
    "anmeldelse",
    "review",
    "tilbud",
    "bestseller",
];

/// Foreign-region stems. A hit anywhere in title or narrative rejects the
/// report even when its coordinates are inside the European bounds: context
/// mentions are a known false-positive source and the text wins.
const FOREIGN_REGION_STEMS: &[&str] = &[
    // Ukraine / Russia / Belarus theater
    "ukrain", "russisk", "russland", "rusland", "ryssland", "russia", "belarus",
    "hviderus", "moskva", "moscow", "kyiv", "kiev",
    // Middle East
    "gaza", "israel", "iran", "irak", "iraq", "syri", "libanon", "lebanon", "yemen",
    "saudi",
    // Asia
    "kina", "china", "indien", "india", "pakistan", "japan", "korea", "taiwan",
    // Americas
    "amerikansk", "chicago", "canada", "mexico", "brasil", "brazil", "venezuela",
    // Africa
    "afrika", "africa", "nigeria", "sudan", "libyen", "libya",
];

/// Exact foreign words that over-match as prefixes ("mali" would also hit
/// the Swedish given name Malin).
const FOREIGN_REGION_EXACT: &[&str] = &["usa", "mali"];

/// Words hinting at protected infrastructure; their presence raises keyword
/// confidence but never gates admission.
const ASSET_HINT_STEMS: &[&str] = &[
    "lufthavn", "airport", "flughafen", "flyplass", "flygplats", "lentoasema",
    "havn", "hamn", "harbor", "harbour", "hafen", "port",
    "militær", "militaer", "military", "kaserne", "base",
    "kraftværk", "kraftvaerk", "kraftverk", "kernkraft", "powerplant",
    "bro", "bridge",
];

/// Result of the drone-keyword layer.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordMatch {
    /// Confidence in [0, 1]
    pub confidence: f32,
    /// The word from the text that matched
    pub matched: String,
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

fn first_match(text: &str, stems: &[&str], exact: &[&str]) -> Option<String> {
    words(text).find(|w| {
        exact.contains(&w.as_str()) || stems.iter().any(|s| w.starts_with(s))
    })
}

/// Layer 1a: does the report mention drones at all?
///
/// `extra` is the per-source whitelist from the registry; it is matched as
/// additional exact words.
pub fn drone_keyword_match(title: &str, body: &str, extra: &[String]) -> Option<KeywordMatch> {
    let extra_refs: Vec<&str> = extra.iter().map(String::as_str).collect();

    let in_title = first_match(title, DRONE_STEMS, DRONE_EXACT)
        .or_else(|| words(title).find(|w| extra_refs.contains(&w.as_str())));
    let has_asset_hint = first_match(title, ASSET_HINT_STEMS, &[]).is_some()
        || first_match(body, ASSET_HINT_STEMS, &[]).is_some();

    if let Some(matched) = in_title {
        return Some(KeywordMatch {
            confidence: if has_asset_hint { 0.95 } else { 0.9 },
            matched,
        });
    }

    let in_body = first_match(body, DRONE_STEMS, DRONE_EXACT)
        .or_else(|| words(body).find(|w| extra_refs.contains(&w.as_str())));
    in_body.map(|matched| KeywordMatch {
        confidence: if has_asset_hint { 0.7 } else { 0.6 },
        matched,
    })
}

/// Layer 1b: excluded-topic markers. Returns the matched word.
pub fn excluded_topic_hit(title: &str, body: &str) -> Option<String> {
    first_match(title, EXCLUDED_TOPIC_STEMS, &[])
        .or_else(|| first_match(body, EXCLUDED_TOPIC_STEMS, &[]))
}

/// Layer 2: foreign-region markers. Returns the matched word so the reject
/// reason can carry it (`foreign_keyword:<token>`).
pub fn foreign_region_hit(text: &str) -> Option<String> {
    first_match(text, FOREIGN_REGION_STEMS, FOREIGN_REGION_EXACT)
}
