//! Matching reverse-geocoded addresses onto the known hierarchy
//!
//! Names are compared after folding: Unicode transliterated to ASCII,
//! lowercased, punctuation collapsed to single spaces. That lets
//! "Тернопіль" and "Ternopil" meet in the middle.
//!
//! Substring containment is deliberately loose and can match short or
//! common names by accident. See DESIGN.md before tightening it.

use crate::geo::RawAddress;
use crate::hierarchy::{Community, Country, Named, Region};
use serde::Serialize;

/// Generic words for administrative divisions, ignored when comparing
/// region and community names ("Ternopil Oblast" vs "Ternopilska")
const DIVISION_WORDS: &[&str] = &[
    "oblast",
    "region",
    "province",
    "state",
    "county",
    "raion",
    "rayon",
    "district",
    "municipality",
    "community",
    "hromada",
    "gromada",
    "miska",
    "silska",
    "selyshchna",
    "teritorialna",
    "terytorialna",
    "voivodeship",
    "wojewodztwo",
];

/// Best-effort guess of where an address sits in the hierarchy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressMatch {
    pub country: Country,
    pub region_name: Option<String>,
    pub community_name: Option<String>,
    pub settlement_name: Option<String>,
}

/// Fold a name for comparison
pub fn fold(s: &str) -> String {
    deunicode::deunicode(s)
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fold and drop generic division words, unless nothing would be left
fn fold_division(s: &str) -> String {
    let folded = fold(s);
    let stripped = folded
        .split(' ')
        .filter(|word| !DIVISION_WORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ");
    if stripped.is_empty() {
        folded
    } else {
        stripped
    }
}

/// Match an address against the country list
///
/// Returns `None` when no country clears the bar; callers fall back to
/// asking the user.
pub fn match_address(raw: &RawAddress, countries: &[Country]) -> Option<AddressMatch> {
    let country = match_country(raw, countries)?;
    Some(AddressMatch {
        country: country.clone(),
        region_name: raw.region_name().map(str::to_string),
        community_name: raw.community_name().map(str::to_string),
        settlement_name: raw.settlement_name().map(str::to_string),
    })
}

/// Find the country an address belongs to
///
/// An ISO code match wins over a name match; within each kind the first
/// candidate in list order wins. A name matches when the candidate's folded
/// name is contained in the address's folded country name.
pub fn match_country<'a>(raw: &RawAddress, countries: &'a [Country]) -> Option<&'a Country> {
    let code = raw
        .country_code
        .as_deref()
        .map(fold)
        .filter(|c| !c.is_empty());

    if let Some(code) = &code {
        if let Some(country) = countries.iter().find(|c| fold(&c.iso_code) == *code) {
            return Some(country);
        }
    }

    let name = raw.country.as_deref().map(fold).filter(|n| !n.is_empty())?;
    countries.iter().find(|c| {
        let candidate = fold(&c.name);
        !candidate.is_empty() && name.contains(&candidate)
    })
}

/// Find the region named in an address
pub fn match_region<'a>(name: &str, regions: &'a [Region]) -> Option<&'a Region> {
    match_division(name, regions)
}

/// Find the community named in an address
pub fn match_community<'a>(name: &str, communities: &'a [Community]) -> Option<&'a Community> {
    match_division(name, communities)
}

/// Exact folded match, then candidate-in-name, then name-in-candidate;
/// first in list order within each tier
pub fn match_division<'a, T: Named>(name: &str, candidates: &'a [T]) -> Option<&'a T> {
    let wanted = fold_division(name);
    if wanted.is_empty() {
        return None;
    }

    let folded: Vec<String> = candidates.iter().map(|c| fold_division(c.name())).collect();
    let pick = |pred: &dyn Fn(&str) -> bool| {
        folded
            .iter()
            .position(|c| !c.is_empty() && pred(c.as_str()))
            .map(|i| &candidates[i])
    };

    pick(&|c: &str| c == wanted)
        .or_else(|| pick(&|c: &str| wanted.contains(c)))
        .or_else(|| pick(&|c: &str| c.contains(wanted.as_str())))
}
