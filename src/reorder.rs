//! Fallback reordering by traffic source.
//!
//! When no reorder rule fired, blocks that link to the platform the visitor
//! came from are moved to the top. A TikTok visitor sees the TikTok link
//! first.

use crate::block::Block;
use crate::source::CustomTrafficSource;
use crate::TrafficSource;

/// Domains that identify links to `source`.
///
/// A custom source with the same (case-insensitive) name replaces the
/// built-in domains; if several share a name the last one wins.
pub fn source_domains<'a>(
    source: &TrafficSource,
    custom: &'a [CustomTrafficSource],
) -> Vec<&'a str> {
    if let Some(def) = custom.iter().rev().find(|c| c.source() == *source) {
        return def
            .domains
            .iter()
            .map(String::as_str)
            .filter(|d| !d.is_empty())
            .collect();
    }
    source.link_domains().to_vec()
}

/// Move blocks whose URL points at `source` to the front.
///
/// Both partitions keep their relative order. Sources with no known
/// domains (Direct, Google, unmapped custom names) leave the list as is.
pub fn auto_reorder<B: Block + Clone>(
    blocks: &[B],
    source: &TrafficSource,
    custom: &[CustomTrafficSource],
) -> Vec<B> {
    let domains: Vec<String> = source_domains(source, custom)
        .into_iter()
        .map(str::to_lowercase)
        .collect();
    if domains.is_empty() {
        return blocks.to_vec();
    }

    let (matching, others): (Vec<B>, Vec<B>) = blocks.iter().cloned().partition(|b| {
        b.url()
            .map(|u| {
                let u = u.to_lowercase();
                domains.iter().any(|d| u.contains(d.as_str()))
            })
            .unwrap_or(false)
    });

    let mut result = matching;
    result.extend(others);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::LinkBlock;

    fn ids(blocks: &[LinkBlock]) -> Vec<&str> {
        blocks.iter().map(|b| b.id.as_str()).collect()
    }

    fn sample() -> Vec<LinkBlock> {
        vec![
            LinkBlock::with_url("site", "https://example.com"),
            LinkBlock::with_url("yt", "https://youtube.com/@me"),
            LinkBlock::new("text", None),
            LinkBlock::with_url("tt", "https://www.TikTok.com/@me"),
            LinkBlock::with_url("short", "https://youtu.be/abc"),
        ]
    }

    #[test]
    fn test_promotes_matching_block() {
        let blocks = vec![
            LinkBlock::with_url("1", "https://other.com"),
            LinkBlock::with_url("2", "https://tiktok.com/x"),
        ];
        let out = auto_reorder(&blocks, &TrafficSource::TikTok, &[]);
        assert_eq!(ids(&out), ["2", "1"]);
    }

    #[test]
    fn test_already_first_unchanged() {
        let blocks = vec![
            LinkBlock::with_url("1", "https://tiktok.com/x"),
            LinkBlock::with_url("2", "https://other.com"),
        ];
        let out = auto_reorder(&blocks, &TrafficSource::TikTok, &[]);
        assert_eq!(ids(&out), ["1", "2"]);
    }

    #[test]
    fn test_stable_partitions() {
        let out = auto_reorder(&sample(), &TrafficSource::YouTube, &[]);
        assert_eq!(ids(&out), ["yt", "short", "site", "text", "tt"]);
    }

    #[test]
    fn test_case_insensitive_url() {
        let out = auto_reorder(&sample(), &TrafficSource::TikTok, &[]);
        assert_eq!(ids(&out), ["tt", "site", "yt", "text", "short"]);
    }

    #[test]
    fn test_unmapped_sources_unchanged() {
        let blocks = sample();
        assert_eq!(auto_reorder(&blocks, &TrafficSource::Direct, &[]), blocks);
        assert_eq!(auto_reorder(&blocks, &TrafficSource::Google, &[]), blocks);
        assert_eq!(
            auto_reorder(&blocks, &TrafficSource::Custom("nobody".into()), &[]),
            blocks
        );
    }

    #[test]
    fn test_facebook_short_domain() {
        let blocks = vec![
            LinkBlock::with_url("a", "https://example.com"),
            LinkBlock::with_url("b", "https://fb.com/me"),
        ];
        let out = auto_reorder(&blocks, &TrafficSource::Facebook, &[]);
        assert_eq!(ids(&out), ["b", "a"]);
    }

    #[test]
    fn test_custom_source_domains() {
        let custom = vec![CustomTrafficSource::new("Newsletter", ["substack.com"])];
        let blocks = vec![
            LinkBlock::with_url("a", "https://example.com"),
            LinkBlock::with_url("b", "https://me.substack.com"),
        ];
        let out = auto_reorder(&blocks, &TrafficSource::Custom("newsletter".into()), &custom);
        assert_eq!(ids(&out), ["b", "a"]);
    }

    #[test]
    fn test_custom_overrides_builtin() {
        let custom = vec![CustomTrafficSource::new("TikTok", ["tiktok.shop"])];
        assert_eq!(source_domains(&TrafficSource::TikTok, &custom), ["tiktok.shop"]);
        assert_eq!(source_domains(&TrafficSource::TikTok, &[]), ["tiktok.com"]);
    }
}
