//! Variant selection.
//!
//! Components in a component set are named by their property values, e.g. `"state=on,size=*"`.
//! Given the properties the app wants, pick the variant that fits best.

use std::collections::BTreeMap;

/// A variant property value that matches any requested value.
pub const WILDCARD: &str = "*";

/// Property name -> value, ordered so that equal sets compare equal.
pub type VariantProperties = BTreeMap<String, String>;

/// Parses `"a=1, b=2"` into properties. Segments without `=` are ignored.
pub fn parse_variant_name(name: &str) -> VariantProperties {
    name.split(',')
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Formats properties as the canonical `"a=1,b=2"` form.
pub fn canonical_name(properties: &VariantProperties) -> String {
    properties
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Finds the variant that best matches `target`.
///
/// An exact match wins outright. Otherwise a variant matches if every requested property is
/// declared with the same value or with [`WILDCARD`]; properties the caller did not ask for keep
/// the variant's own value. Among those, the one needing the fewest wildcards and then the fewest
/// unrequested properties wins, ties going to the earliest in iteration order.
///
/// Returns `None` for an empty target.
pub fn find_variant<'a, I>(target: &VariantProperties, variant_names: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    if target.is_empty() {
        return None;
    }

    let mut best: Option<((usize, usize), &'a str)> = None;
    for name in variant_names {
        let properties = parse_variant_name(name);
        if &properties == target {
            return Some(name);
        }

        let mut wildcards = 0;
        let matches = target.iter().all(|(key, value)| match properties.get(key) {
            Some(v) if v == value => true,
            Some(v) if v == WILDCARD => {
                wildcards += 1;
                true
            }
            _ => false,
        });
        if !matches {
            continue;
        }

        let score = (wildcards, properties.len() - target.len());
        if best.map_or(true, |(best_score, _)| score < best_score) {
            best = Some((score, name));
        }
    }

    best.map(|(_, name)| name)
}

/// Like [`find_variant`], with the target given as a variant name.
pub fn find_variant_by_name<'a, I>(target_name: &str, variant_names: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    if target_name.trim().is_empty() {
        return None;
    }
    find_variant(&parse_variant_name(target_name), variant_names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(name: &str) -> VariantProperties {
        parse_variant_name(name)
    }

    #[test]
    fn parses_and_canonicalizes() {
        let p = props(" size = large, state=on ,junk");
        assert_eq!(p.len(), 2);
        assert_eq!(canonical_name(&p), "size=large,state=on");
    }

    #[test]
    fn empty_target_never_matches() {
        let names = ["a=1", ""];
        assert_eq!(find_variant(&VariantProperties::new(), names.iter().copied()), None);
        assert_eq!(find_variant_by_name("", names.iter().copied()), None);
    }

    #[test]
    fn exact_match_beats_wildcard() {
        let names = ["a=1,b=*", "b=2, a=1"];
        assert_eq!(find_variant(&props("a=1,b=2"), names.iter().copied()), Some("b=2, a=1"));
    }

    #[test]
    fn wildcard_matches_any_value() {
        let names = ["a=1,b=*", "a=2,b=2"];
        assert_eq!(
            find_variant(&props("a=1,b=anything"), names.iter().copied()),
            Some("a=1,b=*")
        );
        assert_eq!(find_variant(&props("a=3,b=2"), names.iter().copied()), None);
    }

    #[test]
    fn partial_target_uses_variant_values() {
        let names = ["a=1,b=2,c=3", "a=2,b=2,c=3"];
        assert_eq!(find_variant(&props("a=2"), names.iter().copied()), Some("a=2,b=2,c=3"));
        // requesting a property the component doesn't declare never matches
        assert_eq!(find_variant(&props("a=1,z=9"), names.iter().copied()), None);
    }

    #[test]
    fn fewer_wildcards_win() {
        let names = ["a=*,b=*", "a=1,b=*"];
        assert_eq!(find_variant(&props("a=1,b=5"), names.iter().copied()), Some("a=1,b=*"));
    }
}
