//! URL → profile resolution.
//!
//! Priority, first match in list order within a tier:
//! 1. literal URL equality (fragment ignored)
//! 2. domain and path glob, among profiles that declare a path
//! 3. domain alone, among profiles that declare no path
//!
//! Disabled profiles never match.

use regex::Regex;
use tracing::debug;
use url::Url;

use crate::glob;
use crate::model::Profile;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchTier {
    ExactUrl,
    DomainAndPath,
    Domain,
}

impl MatchTier {
    pub fn name(&self) -> &'static str {
        match self {
            MatchTier::ExactUrl => "exact_url",
            MatchTier::DomainAndPath => "domain_and_path",
            MatchTier::Domain => "domain",
        }
    }
}

/// `example.com` matches the host itself and its subdomains; `*.example.com`
/// matches the same set. Comparison ignores case and a trailing dot.
pub fn domain_matches(pattern: &str, host: &str) -> bool {
    let pattern = pattern.trim().trim_end_matches('.').to_ascii_lowercase();
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    let base = pattern.strip_prefix("*.").unwrap_or(&pattern);
    if base.is_empty() || host.is_empty() {
        return false;
    }
    host == base || host.ends_with(&format!(".{base}"))
}

fn without_fragment(raw: &str) -> Option<Url> {
    let mut parsed = Url::parse(raw.trim()).ok()?;
    parsed.set_fragment(None);
    Some(parsed)
}

fn url_equals(profile_url: &str, page: &Url) -> bool {
    match without_fragment(profile_url) {
        Some(candidate) => candidate == *page,
        None => profile_url.trim() == page.as_str(),
    }
}

/// Pre-compiled matcher over a fixed profile list.
pub struct ProfileMatcher<'a> {
    entries: Vec<(&'a Profile, Option<Regex>)>,
}

impl<'a> ProfileMatcher<'a> {
    pub fn new(profiles: &'a [Profile]) -> Self {
        Self::with_compiler(profiles, glob::compile)
    }

    /// A profile whose path glob fails to compile keeps its exact-URL entry
    /// but takes no part in the path or domain tiers.
    fn with_compiler<F>(profiles: &'a [Profile], compile: F) -> Self
    where
        F: Fn(&str) -> Result<Regex, regex::Error>,
    {
        let entries = profiles
            .iter()
            .filter(|profile| profile.enabled)
            .map(|profile| match &profile.path_pattern {
                None => (profile, None),
                Some(pattern) => match compile(pattern) {
                    Ok(regex) => (profile, Some(regex)),
                    Err(err) => {
                        debug!(
                            target: "dockwright::profiles",
                            profile = %profile.id,
                            pattern = %pattern,
                            error = %err,
                            "invalid path glob; profile limited to exact url"
                        );
                        (profile, None)
                    }
                },
            })
            .collect();
        Self { entries }
    }

    pub fn match_url(&self, url: &str) -> Option<(MatchTier, &'a Profile)> {
        let page = match without_fragment(url) {
            Some(page) => page,
            None => {
                debug!(target: "dockwright::profiles", url, "unparseable page url");
                return None;
            }
        };

        if let Some((profile, _)) = self.entries.iter().find(|(profile, _)| {
            profile
                .url
                .as_deref()
                .map_or(false, |literal| url_equals(literal, &page))
        }) {
            return Some((MatchTier::ExactUrl, *profile));
        }

        let host = page.host_str()?;
        let path = page.path();

        if let Some((profile, _)) = self.entries.iter().find(|(profile, regex)| {
            regex.as_ref().map_or(false, |regex| {
                domain_matches(&profile.domain_pattern, host) && regex.is_match(path)
            })
        }) {
            return Some((MatchTier::DomainAndPath, *profile));
        }

        self.entries
            .iter()
            .find(|(profile, _)| {
                profile.path_pattern.is_none() && domain_matches(&profile.domain_pattern, host)
            })
            .map(|(profile, _)| (MatchTier::Domain, *profile))
    }
}

pub fn match_profile_with_tier<'a>(
    url: &str,
    profiles: &'a [Profile],
) -> Option<(MatchTier, &'a Profile)> {
    ProfileMatcher::new(profiles).match_url(url)
}

/// Profile for `url`, or `None` to fall back to heuristic detection.
pub fn match_profile<'a>(url: &str, profiles: &'a [Profile]) -> Option<&'a Profile> {
    match_profile_with_tier(url, profiles).map(|(_, profile)| profile)
}
