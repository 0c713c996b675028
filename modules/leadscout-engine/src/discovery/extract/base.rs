// Shared extraction helpers: person-name validation, email/phone mining,
// organization resolution, link harvesting. Every site extractor builds on
// these so the save-time validator sees uniform data.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};

use leadscout_common::extract_domain;

// --- Person-name validation ---

/// Credentials that trail a clinician's name ("Jane Smith, PhD, LCSW").
/// Stripped before validation; a bare credential is not a name.
const CREDENTIALS: &[&str] = &[
    "phd", "psyd", "md", "do", "rn", "np", "pa", "lcsw", "licsw", "lmft", "lpc", "lpcc", "lcpc",
    "msw", "ms", "ma", "med", "mba", "edd", "aprn", "cadc", "ladc", "bcba", "mph", "jd",
];

/// Honorific prefixes stripped before token checks.
const HONORIFICS: &[&str] = &["dr", "mr", "mrs", "ms", "prof", "rev"];

/// Tokens that mark navigation chrome, calls-to-action, and other non-names.
const BAD_TOKENS: &[&str] = &[
    "privacy", "policy", "terms", "cookie", "cookies", "contact", "about", "team", "staff",
    "services", "home", "search", "learn", "more", "click", "here", "login", "signup", "sign",
    "register", "subscribe", "menu", "directory", "profile", "profiles", "view", "find",
    "therapists", "doctors", "providers", "locations", "insurance", "appointment",
    "appointments", "copyright", "rights", "reserved", "page", "next", "previous", "results",
    "filter", "sort", "near", "read",
];

/// Leading words that signal a sentence or heading, not a personal name.
const PHRASE_STARTERS: &[&str] = &[
    "the", "our", "your", "we", "this", "these", "how", "why", "what", "when", "where", "who",
    "get", "getting", "finding", "meet", "welcome", "schedule", "request", "call", "book",
];

/// Street/area suffixes. A name ending in one of these is an address unless
/// the suffix doubles as a common surname.
const STREET_SUFFIXES: &[&str] = &[
    "street", "st", "ave", "avenue", "road", "rd", "blvd", "boulevard", "drive", "lane", "ln",
    "court", "ct", "place", "pl", "way", "highway", "hwy", "heights", "plaza", "suite",
];

/// Surnames that collide with place suffixes ("Rosa Parks", "Nathan Hill").
const SURNAME_ALLOWLIST: &[&str] = &["park", "parks", "hill", "hills", "brooks", "woods", "fields", "rivers", "lane"];

/// Validate a candidate person name per the extraction contract:
/// at least two capitalized words, no credentials standing alone, not an
/// address, not navigation text, not a sentence fragment.
pub fn validate_person_name(raw: &str) -> Option<String> {
    let cleaned = strip_credentials(raw);
    let cleaned = cleaned.trim().trim_matches(|c: char| !c.is_alphanumeric());
    if cleaned.is_empty() || cleaned.chars().any(|c| c.is_numeric()) {
        return None;
    }

    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    if tokens.len() < 2 || tokens.len() > 4 {
        return None;
    }

    let mut kept: Vec<&str> = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        let lower = token
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if i == 0 && HONORIFICS.contains(&lower.as_str()) {
            continue;
        }
        if i == 0 && PHRASE_STARTERS.contains(&lower.as_str()) {
            return None;
        }
        if BAD_TOKENS.contains(&lower.as_str()) || CREDENTIALS.contains(&lower.as_str()) {
            return None;
        }
        kept.push(token);
    }

    if kept.len() < 2 {
        return None;
    }

    // Every kept token must be capitalized (hyphenated surnames check the
    // first segment).
    for token in &kept {
        let first = token.chars().next()?;
        if !first.is_uppercase() {
            return None;
        }
    }

    // Address check on the final token.
    let last = kept.last()?.to_lowercase();
    if STREET_SUFFIXES.contains(&last.as_str()) && !SURNAME_ALLOWLIST.contains(&last.as_str()) {
        return None;
    }

    Some(kept.join(" "))
}

/// Drop trailing comma-separated credentials: "Jane Smith, PhD, LCSW" →
/// "Jane Smith".
fn strip_credentials(raw: &str) -> String {
    raw.split(',').next().unwrap_or("").trim().to_string()
}

// --- Email mining ---

/// Prefixes demoted to last-resort candidates: shared mailboxes say nothing
/// about the person.
const GENERIC_EMAIL_PREFIXES: &[&str] =
    &["info", "contact", "admin", "office", "hello", "support", "frontdesk", "intake", "help"];

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("valid regex")
    })
}

/// Mine email addresses from page text and mailto links. Handles common
/// obfuscations (`jane (at) example (dot) com`). Personal-looking addresses
/// sort ahead of generic mailboxes; a generic mailbox is returned only when
/// nothing better exists.
pub fn mine_emails(html: &str, text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut personal = Vec::new();
    let mut generic = Vec::new();

    let deobfuscated = deobfuscate(text);
    let mailto_re = Regex::new(r#"mailto:([^"'?\s>]+)"#).expect("valid regex");

    let candidates = email_regex()
        .find_iter(&deobfuscated)
        .map(|m| m.as_str().to_string())
        .chain(
            mailto_re
                .captures_iter(html)
                .filter_map(|c| c.get(1).map(|m| m.as_str().to_string())),
        );

    for candidate in candidates {
        let email = candidate.trim_end_matches('.').to_lowercase();
        if !email_regex().is_match(&email) || !seen.insert(email.clone()) {
            continue;
        }
        let prefix = email.split('@').next().unwrap_or("");
        if GENERIC_EMAIL_PREFIXES.contains(&prefix) {
            generic.push(email);
        } else {
            personal.push(email);
        }
    }

    personal.extend(generic);
    personal
}

fn deobfuscate(text: &str) -> String {
    let at_re = Regex::new(r"(?i)\s*[\(\[]\s*at\s*[\)\]]\s*").expect("valid regex");
    let dot_re = Regex::new(r"(?i)\s*[\(\[]\s*dot\s*[\)\]]\s*").expect("valid regex");
    let step = at_re.replace_all(text, "@");
    dot_re.replace_all(&step, ".").into_owned()
}

// --- Phone mining ---

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]\d{3}[-.\s]\d{4}").expect("valid regex")
    })
}

/// Mine phone numbers and normalize to a canonical `+1XXXXXXXXXX` form.
/// Ten-digit NANP numbers only - anything else is noise at this stage.
pub fn mine_phones(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut phones = Vec::new();
    for m in phone_regex().find_iter(text) {
        if let Some(normalized) = normalize_phone(m.as_str()) {
            if seen.insert(normalized.clone()) {
                phones.push(normalized);
            }
        }
    }
    phones
}

pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        10 => Some(format!("+1{digits}")),
        11 if digits.starts_with('1') => Some(format!("+{digits}")),
        _ => None,
    }
}

// --- Organization resolution ---

/// Directory brands that must never be stored as a prospect's organization.
const GENERIC_DIRECTORIES: &[&str] = &[
    "psychology today",
    "healthgrades",
    "zocdoc",
    "vitals",
    "webmd",
    "yelp",
    "google",
    "facebook",
    "linkedin",
    "docspot",
    "findatherapist",
];

/// Suffix patterns that mark a practice/center name in free text.
const ORG_SUFFIXES: &[&str] = &[
    "Group", "Center", "Centre", "Clinic", "Practice", "Associates", "Institute", "Academy",
    "School", "Counseling", "Psychology", "Psychiatry", "Therapy", "Wellness", "Health",
    "Hospital", "Partners", "Services",
];

/// Resolve the organization for a page, in priority order: `og:site_name` /
/// structured data → page title / h1 → breadcrumbs → practice-name patterns
/// in text → domain fallback. Generic directory brands are discarded at
/// every step.
pub fn resolve_organization(
    og_site_name: Option<&str>,
    html: &str,
    text: &str,
    url: &str,
) -> Option<String> {
    if let Some(site) = og_site_name {
        if let Some(org) = accept_org(site) {
            return Some(org);
        }
    }

    let doc = Html::parse_document(html);

    if let Some(meta) = select_first_attr(&doc, "meta[property=\"og:site_name\"]", "content") {
        if let Some(org) = accept_org(&meta) {
            return Some(org);
        }
    }

    for selector in ["title", "h1"] {
        if let Some(value) = select_first_text(&doc, selector) {
            // Titles routinely look like "Jane Smith — Acme Counseling Group";
            // take the segment that looks like an organization.
            for segment in value.split(['|', '—', '-', '–']) {
                let segment = segment.trim();
                if segment.split_whitespace().count() >= 2
                    && ORG_SUFFIXES.iter().any(|s| segment.contains(s))
                {
                    if let Some(org) = accept_org(segment) {
                        return Some(org);
                    }
                }
            }
        }
    }

    for selector in ["nav.breadcrumb a", ".breadcrumbs a", "[aria-label=\"breadcrumb\"] a"] {
        if let Ok(sel) = Selector::parse(selector) {
            let crumbs: Vec<String> = doc
                .select(&sel)
                .map(|e| e.text().collect::<String>().trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            // The deepest crumb before the leaf is usually the practice.
            if crumbs.len() >= 2 {
                if let Some(org) = accept_org(&crumbs[crumbs.len() - 2]) {
                    if org.split_whitespace().count() >= 2 {
                        return Some(org);
                    }
                }
            }
        }
    }

    if let Some(org) = find_org_pattern(text) {
        return Some(org);
    }

    domain_to_org(url)
}

fn accept_org(candidate: &str) -> Option<String> {
    let trimmed = candidate.trim();
    if trimmed.len() < 3 || trimmed.len() > 80 {
        return None;
    }
    let lower = trimmed.to_lowercase();
    if GENERIC_DIRECTORIES.iter().any(|d| lower.contains(d)) {
        return None;
    }
    Some(trimmed.to_string())
}

/// Suffixes that anchor a practice-name scan in free text. Narrower than
/// `ORG_SUFFIXES`: these rarely appear outside an actual organization name.
const ORG_ANCHOR_SUFFIXES: &[&str] = &[
    "Group", "Center", "Centre", "Clinic", "Practice", "Associates", "Institute", "Academy",
    "Hospital", "Partners",
];

/// Scan text for "<Capitalized words> <org suffix>" runs: find an anchor
/// suffix, then walk back over up to three capitalized words. Credentials
/// and sentence words stop the walk so "Jane Smith, PhD — Riverside Therapy
/// Group" yields the practice, not the clinician.
fn find_org_pattern(text: &str) -> Option<String> {
    let words: Vec<&str> = text.split_whitespace().collect();

    for (i, word) in words.iter().enumerate() {
        let clean = word.trim_matches(|c: char| !c.is_alphanumeric());
        if !ORG_ANCHOR_SUFFIXES.contains(&clean) || i == 0 {
            continue;
        }

        let mut start = i;
        while start > 0 && i - start < 3 {
            let prev = words[start - 1].trim_matches(|c: char| !c.is_alphanumeric());
            let capitalized = prev
                .chars()
                .next()
                .map(|c| c.is_uppercase())
                .unwrap_or(false);
            if !capitalized || CREDENTIALS.contains(&prev.to_lowercase().as_str()) {
                break;
            }
            start -= 1;
        }

        if start < i {
            let candidate: Vec<&str> = words[start..=i]
                .iter()
                .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '&' && c != '\''))
                .collect();
            if let Some(org) = accept_org(&candidate.join(" ")) {
                return Some(org);
            }
        }
    }

    None
}

/// Last resort: "acme-counseling.com" → "Acme Counseling".
pub fn domain_to_org(url: &str) -> Option<String> {
    let domain = extract_domain(url);
    let lower = domain.to_lowercase();
    if GENERIC_DIRECTORIES
        .iter()
        .any(|d| lower.contains(&d.replace(' ', "")))
    {
        return None;
    }
    let stem = domain.split('.').next()?;
    if stem.len() < 3 {
        return None;
    }
    let words: Vec<String> = stem
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    Some(words.join(" "))
}

// --- Name/role mining ---

/// Mine `(name, role)` pairs from page text. Two shapes are recognized:
/// "Jane Smith, Clinical Director" on one line, and a valid name line
/// followed by a role line. Only roles containing one of `role_keywords`
/// count - that's what separates a staff roster from prose.
pub fn mine_name_role_pairs(text: &str, role_keywords: &[&str]) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    let mut pairs = Vec::new();

    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let is_role = |candidate: &str| -> bool {
        let lower = candidate.to_lowercase();
        candidate.split_whitespace().count() <= 8
            && role_keywords.iter().any(|k| lower.contains(k))
    };

    for (i, line) in lines.iter().enumerate() {
        // "Jane Smith, Clinical Director" / "Jane Smith — Clinical Director"
        if let Some((head, tail)) = split_name_role_line(line) {
            if is_role(&tail) {
                if let Some(name) = validate_person_name(&head) {
                    if seen.insert(name.clone()) {
                        pairs.push((name, tail));
                    }
                    continue;
                }
            }
        }

        // Name line followed by a role line.
        if let Some(name) = validate_person_name(line) {
            if let Some(next) = lines.get(i + 1) {
                if is_role(next) && seen.insert(name.clone()) {
                    pairs.push((name, next.to_string()));
                }
            }
        }
    }

    pairs
}

fn split_name_role_line(line: &str) -> Option<(String, String)> {
    for sep in [" — ", " – ", " - ", ", ", " | "] {
        if let Some((head, tail)) = line.split_once(sep) {
            let head = head.trim();
            let tail = tail.trim();
            if !head.is_empty() && !tail.is_empty() {
                return Some((head.to_string(), tail.to_string()));
            }
        }
    }
    None
}

// --- HTML helpers ---

pub fn select_first_text(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .map(|e| e.text().collect::<String>().trim().to_string())
        .find(|t| !t.is_empty())
}

pub fn select_first_attr(doc: &Html, selector: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .filter_map(|e| e.value().attr(attr))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

pub fn select_texts(doc: &Html, selector: &str) -> Vec<String> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };
    doc.select(&sel)
        .map(|e| e.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Harvest anchors whose resolved href contains `pattern`. Relative links
/// resolve against `base_url`; duplicates and self-links are dropped.
pub fn extract_links(html: &str, base_url: &str, pattern: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let base = url::Url::parse(base_url).ok();

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in doc.select(&sel) {
        let Some(raw) = element.value().attr("href") else {
            continue;
        };
        let resolved = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else if let Some(ref b) = base {
            match b.join(raw) {
                Ok(u) => u.to_string(),
                Err(_) => continue,
            }
        } else {
            continue;
        };

        if resolved == base_url {
            continue;
        }
        if resolved.contains(pattern) && seen.insert(resolved.clone()) {
            links.push(resolved);
            if links.len() >= 50 {
                break;
            }
        }
    }

    links
}

/// Canonical form for URL dedup: lowercase host, no fragment, no trailing
/// slash, tracking params stripped.
pub fn canonical_url(raw: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(raw) else {
        return raw.trim().to_string();
    };
    parsed.set_fragment(None);
    let filtered: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !k.starts_with("utm_") && k != "ref" && k != "fbclid")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if filtered.is_empty() {
        parsed.set_query(None);
    } else {
        let query: String = filtered
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        parsed.set_query(Some(&query));
    }
    let mut out = parsed.to_string();
    if out.ends_with('/') && parsed.path() != "/" {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_two_token_names() {
        assert_eq!(
            validate_person_name("Jane Smith"),
            Some("Jane Smith".to_string())
        );
        assert_eq!(
            validate_person_name("Maria de la Cruz"),
            None,
            "lowercase particles fail the capitalization rule"
        );
        assert_eq!(
            validate_person_name("John Paul Jones"),
            Some("John Paul Jones".to_string())
        );
    }

    #[test]
    fn strips_honorifics_and_credentials() {
        assert_eq!(
            validate_person_name("Dr. Jane Smith"),
            Some("Jane Smith".to_string())
        );
        assert_eq!(
            validate_person_name("Jane Smith, PhD, LCSW"),
            Some("Jane Smith".to_string())
        );
    }

    #[test]
    fn rejects_credentials_and_chrome() {
        assert_eq!(validate_person_name("PhD LCSW"), None);
        assert_eq!(validate_person_name("Privacy Policy"), None);
        assert_eq!(validate_person_name("Our Team"), None);
        assert_eq!(validate_person_name("View Profile"), None);
        assert_eq!(validate_person_name("Jane"), None);
    }

    #[test]
    fn rejects_addresses_but_allows_place_surnames() {
        assert_eq!(validate_person_name("Main Street"), None);
        assert_eq!(validate_person_name("Connecticut Avenue"), None);
        assert_eq!(
            validate_person_name("Rosa Parks"),
            Some("Rosa Parks".to_string())
        );
        assert_eq!(
            validate_person_name("Nathan Hill"),
            Some("Nathan Hill".to_string())
        );
    }

    #[test]
    fn rejects_sentences_and_numbers() {
        assert_eq!(validate_person_name("Meet Our Therapists"), None);
        assert_eq!(validate_person_name("The Best Choice"), None);
        assert_eq!(validate_person_name("Suite 204 B"), None);
    }

    #[test]
    fn mines_and_deobfuscates_emails() {
        let text = "Reach me at jane.smith (at) example (dot) com or call.";
        let emails = mine_emails("", text);
        assert_eq!(emails, vec!["jane.smith@example.com"]);
    }

    #[test]
    fn mailto_links_are_mined() {
        let html = r#"<a href="mailto:jsmith@practice.org?subject=hi">Email</a>"#;
        let emails = mine_emails(html, "");
        assert_eq!(emails, vec!["jsmith@practice.org"]);
    }

    #[test]
    fn generic_prefixes_sort_last() {
        let text = "info@clinic.com and jane@clinic.com";
        let emails = mine_emails("", text);
        assert_eq!(emails[0], "jane@clinic.com");
        assert_eq!(emails[1], "info@clinic.com");
    }

    #[test]
    fn phones_normalize_to_e164() {
        assert_eq!(
            normalize_phone("(202) 555-0182"),
            Some("+12025550182".to_string())
        );
        assert_eq!(
            normalize_phone("1-202-555-0182"),
            Some("+12025550182".to_string())
        );
        assert_eq!(normalize_phone("555-0182"), None);

        let phones = mine_phones("Call (202) 555-0182 or 202.555.0199 today");
        assert_eq!(phones, vec!["+12025550182", "+12025550199"]);
    }

    #[test]
    fn org_resolution_prefers_og_site_name() {
        let org = resolve_organization(
            Some("Capital Wellness Group"),
            "<html></html>",
            "",
            "https://capitalwellness.com/team/jane",
        );
        assert_eq!(org, Some("Capital Wellness Group".to_string()));
    }

    #[test]
    fn org_resolution_discards_directories() {
        let org = resolve_organization(
            Some("Psychology Today"),
            "<html><title>Jane Smith | Acme Counseling Group</title></html>",
            "",
            "https://www.psychologytoday.com/us/therapists/jane",
        );
        assert_eq!(org, Some("Acme Counseling Group".to_string()));
    }

    #[test]
    fn org_falls_back_to_domain() {
        let org = resolve_organization(
            None,
            "<html></html>",
            "nothing org-shaped here",
            "https://acme-counseling.com/staff",
        );
        assert_eq!(org, Some("Acme Counseling".to_string()));
    }

    #[test]
    fn org_pattern_found_in_text() {
        let org = find_org_pattern("Jane practices at Riverside Therapy Group in DC.");
        assert_eq!(org, Some("Riverside Therapy Group".to_string()));
    }

    #[test]
    fn name_role_pairs_from_roster_text() {
        let text = "Our Leadership\n\
                    Jane Smith, Clinical Director\n\
                    Bob Jones\n\
                    Director of Admissions\n\
                    Privacy Policy\n\
                    Read about our programs and the people behind them.";
        let pairs = mine_name_role_pairs(text, &["director", "admissions"]);
        assert_eq!(
            pairs,
            vec![
                ("Jane Smith".to_string(), "Clinical Director".to_string()),
                ("Bob Jones".to_string(), "Director of Admissions".to_string()),
            ]
        );
    }

    #[test]
    fn links_resolve_and_dedup() {
        let html = r#"
            <a href="/us/therapists/jane-1">Jane</a>
            <a href="/us/therapists/jane-1">Jane again</a>
            <a href="https://other.com/us/therapists/bob-2">Bob</a>
            <a href="/about">About</a>
        "#;
        let links = extract_links(html, "https://example.com/us/therapists/dc", "/us/therapists/");
        assert_eq!(
            links,
            vec![
                "https://example.com/us/therapists/jane-1",
                "https://other.com/us/therapists/bob-2",
            ]
        );
    }

    #[test]
    fn canonical_urls_strip_tracking_and_fragments() {
        assert_eq!(
            canonical_url("https://Example.com/path/?utm_source=x&id=2#frag"),
            "https://example.com/path/?id=2"
        );
        assert_eq!(
            canonical_url("https://example.com/path/"),
            "https://example.com/path"
        );
    }
}
