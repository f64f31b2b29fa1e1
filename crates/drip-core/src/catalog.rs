//! Known-service reference data and category signals
//!
//! The catalog is immutable, process-wide configuration: build it once
//! (usually via [`ServiceCatalog::builtin`]) and share a reference with every
//! detector. Nothing here mutates at runtime, so concurrent detection calls
//! need no locking.

use serde::{Deserialize, Serialize};

use crate::models::{Frequency, KnownServiceMatch};

/// Match strength for exact and substring hits
const STRONG_MATCH_CONFIDENCE: f64 = 0.95;
/// Match strength for the word-overlap heuristic
const OVERLAP_MATCH_CONFIDENCE: f64 = 0.9;
/// Share of the shorter word set that must find a containment partner
const WORD_OVERLAP_THRESHOLD: f64 = 0.7;
/// Substring matching is skipped below this length to avoid false hits
const MIN_SUBSTRING_LEN: usize = 3;

/// One curated recurring-billing service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    /// Lowercased alternate spellings seen in statements
    pub aliases: Vec<String>,
    pub category: String,
    pub typical_frequency: Frequency,
}

/// Static reference tables used by the detector: the known-service alias
/// table and the subscription-category keyword lists.
///
/// Table order is part of the contract: it is scanned deterministically, so
/// ties resolve to the earliest entry.
#[derive(Debug, Clone)]
pub struct ServiceCatalog {
    services: Vec<ServiceEntry>,
    exact_categories: Vec<String>,
    category_keywords: Vec<String>,
}

impl ServiceCatalog {
    /// Build a catalog from custom tables. Aliases and keywords are
    /// lowercased on the way in.
    pub fn new(
        services: Vec<ServiceEntry>,
        exact_categories: Vec<String>,
        category_keywords: Vec<String>,
    ) -> Self {
        let services = services
            .into_iter()
            .map(|mut s| {
                for alias in &mut s.aliases {
                    *alias = alias.trim().to_lowercase();
                }
                s
            })
            .collect();
        Self {
            services,
            exact_categories: exact_categories
                .into_iter()
                .map(|c| c.trim().to_lowercase())
                .collect(),
            category_keywords: category_keywords
                .into_iter()
                .map(|c| c.trim().to_lowercase())
                .collect(),
        }
    }

    /// The curated built-in table of common recurring-billing merchants
    pub fn builtin() -> Self {
        fn entry(
            name: &str,
            aliases: &[&str],
            category: &str,
            typical_frequency: Frequency,
        ) -> ServiceEntry {
            ServiceEntry {
                name: name.to_string(),
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
                category: category.to_string(),
                typical_frequency,
            }
        }

        use Frequency::{Annual, Monthly};

        let services = vec![
            entry("Netflix", &["netflix.com"], "streaming", Monthly),
            entry("Spotify", &["spotify usa", "spotify ab"], "music", Monthly),
            entry("Hulu", &["hulu.com"], "streaming", Monthly),
            entry(
                "Disney Plus",
                &["disney+", "disneyplus", "disney plus"],
                "streaming",
                Monthly,
            ),
            entry("HBO Max", &["hbomax", "max.com"], "streaming", Monthly),
            entry(
                "Amazon Prime",
                &["amazon prime video", "prime video", "amzn prime"],
                "streaming",
                Annual,
            ),
            entry(
                "YouTube Premium",
                &["youtube premium", "youtubepremium", "google youtube"],
                "streaming",
                Monthly,
            ),
            entry("Paramount Plus", &["paramount+"], "streaming", Monthly),
            entry("Peacock", &["peacock tv"], "streaming", Monthly),
            entry("Crunchyroll", &[], "streaming", Monthly),
            entry("Twitch", &["twitch interactive"], "streaming", Monthly),
            entry("Apple Music", &["apple music"], "music", Monthly),
            entry(
                "Apple",
                &["apple.com/bill", "apple.com bill", "itunes.com"],
                "software",
                Monthly,
            ),
            entry("iCloud", &["icloud storage", "icloud+"], "cloud storage", Monthly),
            entry("Google One", &["google storage", "google one"], "cloud storage", Monthly),
            entry("Dropbox", &["dropbox.com"], "cloud storage", Monthly),
            entry(
                "Adobe",
                &["adobe creative cloud", "adobe systems"],
                "software",
                Monthly,
            ),
            entry(
                "Microsoft 365",
                &["office 365", "msft office", "microsoft office"],
                "software",
                Annual,
            ),
            entry("GitHub", &["github.com"], "software", Monthly),
            entry("OpenAI", &["chatgpt", "chatgpt subscription"], "software", Monthly),
            entry("Notion", &["notion labs"], "software", Monthly),
            entry("Slack", &["slack technologies"], "software", Monthly),
            entry("Zoom", &["zoom.us", "zoom video"], "software", Monthly),
            entry("Canva", &[], "software", Monthly),
            entry("Grammarly", &[], "software", Annual),
            entry("1Password", &["agilebits"], "software", Annual),
            entry("NordVPN", &["nord vpn", "nordsec"], "software", Annual),
            entry("Audible", &["audible.com", "amazon audible"], "books", Monthly),
            entry("Kindle Unlimited", &["kindle unltd"], "books", Monthly),
            entry(
                "New York Times",
                &["nyt", "nytimes", "ny times digital"],
                "news",
                Monthly,
            ),
            entry(
                "Wall Street Journal",
                &["wsj", "wsj digital"],
                "news",
                Monthly,
            ),
            entry("Substack", &[], "news", Monthly),
            entry("Patreon", &["patreon membership"], "memberships", Monthly),
            entry(
                "Planet Fitness",
                &["planet fit", "pla fitness"],
                "fitness",
                Monthly,
            ),
            entry("Peloton", &["peloton interactive"], "fitness", Monthly),
            entry("Headspace", &[], "fitness", Annual),
            entry("Calm", &["calm.com"], "fitness", Annual),
            entry("Duolingo", &["duolingo super"], "education", Monthly),
            entry(
                "PlayStation Plus",
                &["playstation network", "sony playstation"],
                "gaming",
                Monthly,
            ),
            entry(
                "Xbox Game Pass",
                &["microsoft xbox", "xbox live"],
                "gaming",
                Monthly,
            ),
            entry(
                "Nintendo Switch Online",
                &["nintendo online"],
                "gaming",
                Annual,
            ),
        ];

        let exact_categories = [
            "subscription",
            "subscriptions",
            "recurring",
            "recurring payment",
            "recurring payments",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let category_keywords = [
            "subscription",
            "recurring",
            "membership",
            "premium",
            "service",
            "streaming",
            "software",
            "saas",
            "software as a service",
            "monthly service",
            "annual service",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self::new(services, exact_categories, category_keywords)
    }

    pub fn services(&self) -> &[ServiceEntry] {
        &self.services
    }

    /// Match free merchant text against the alias table.
    ///
    /// Strategies in order of strength: exact term equality, substring
    /// containment in either direction (both sides at least 3 chars), then
    /// the word-overlap heuristic. Within each strategy the table is scanned
    /// in order, so the earliest entry wins.
    pub fn match_known_service(&self, text: &str) -> Option<KnownServiceMatch> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        for svc in &self.services {
            if svc.terms().any(|term| needle == term) {
                return Some(svc.matched(STRONG_MATCH_CONFIDENCE));
            }
        }

        if needle.len() >= MIN_SUBSTRING_LEN {
            for svc in &self.services {
                if svc.terms().any(|term| {
                    term.len() >= MIN_SUBSTRING_LEN
                        && (needle.contains(&term) || term.contains(&needle))
                }) {
                    return Some(svc.matched(STRONG_MATCH_CONFIDENCE));
                }
            }
        }

        for svc in &self.services {
            if svc
                .terms()
                .any(|term| word_overlap(&needle, &term) >= WORD_OVERLAP_THRESHOLD)
            {
                return Some(svc.matched(OVERLAP_MATCH_CONFIDENCE));
            }
        }

        None
    }

    /// Whether a category label implies "subscription": exact allowlist
    /// first, then substring keywords.
    pub fn is_subscription_category(&self, category: &str) -> bool {
        let c = category.trim().to_lowercase();
        if c.is_empty() {
            return false;
        }
        if self.exact_categories.iter().any(|e| *e == c) {
            return true;
        }
        self.category_keywords.iter().any(|k| c.contains(k))
    }
}

impl ServiceEntry {
    /// All lowercased terms this service answers to
    fn terms(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(self.name.to_lowercase()).chain(self.aliases.iter().cloned())
    }

    fn matched(&self, confidence: f64) -> KnownServiceMatch {
        KnownServiceMatch {
            name: self.name.clone(),
            category: self.category.clone(),
            typical_frequency: self.typical_frequency,
            confidence,
        }
    }
}

/// Share of the shorter word set that has a containment partner in the other
fn word_overlap(a: &str, b: &str) -> f64 {
    let a_words: Vec<&str> = a.split_whitespace().collect();
    let b_words: Vec<&str> = b.split_whitespace().collect();
    if a_words.is_empty() || b_words.is_empty() {
        return 0.0;
    }
    let (shorter, longer) = if a_words.len() <= b_words.len() {
        (&a_words, &b_words)
    } else {
        (&b_words, &a_words)
    };
    let hits = shorter
        .iter()
        .filter(|w| longer.iter().any(|v| w.contains(v) || v.contains(*w)))
        .count();
    hits as f64 / shorter.len() as f64
}
