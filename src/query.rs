//! Search query construction.
//!
//! Every keyword phrase is paired with every site filter, phrases outer and
//! sites inner, so quota usage is reproducible from run to run. With no
//! sites configured each phrase yields a single unrestricted query.

use crate::config::Config;
use itertools::iproduct;
use std::fmt::Write;

/// A keyword phrase optionally scoped to one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub phrase: String,
    pub site: Option<String>,
}

/// Turns phrases and sites into full query strings.
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    phrases: &'a [String],
    sites: &'a [String],
    funding_keywords: &'a [String],
    negative_terms: &'a [String],
}

impl<'a> QueryBuilder<'a> {
    pub fn new(
        phrases: &'a [String],
        sites: &'a [String],
        funding_keywords: &'a [String],
        negative_terms: &'a [String],
    ) -> Self {
        Self {
            phrases,
            sites,
            funding_keywords,
            negative_terms,
        }
    }

    pub fn from_config(config: &'a Config) -> Self {
        Self::new(
            &config.phrases,
            &config.sites,
            &config.funding_keywords,
            &config.negative_terms,
        )
    }

    /// Lazily yields one [`Query`] per (phrase, site) pair.
    pub fn queries(&self) -> impl Iterator<Item = Query> + 'a {
        let sites: Vec<Option<&'a String>> = if self.sites.is_empty() {
            vec![None]
        } else {
            self.sites.iter().map(Some).collect()
        };
        iproduct!(self.phrases.iter(), sites).map(|(phrase, site)| Query {
            phrase: phrase.clone(),
            site: site.cloned(),
        })
    }

    /// Render the search string for one query:
    /// `(<phrase>) AND ("kw1" OR "kw2") site:<site> -"neg"`.
    pub fn render(&self, query: &Query) -> String {
        let mut q = format!("({})", query.phrase);

        if !self.funding_keywords.is_empty() {
            let vocabulary = self
                .funding_keywords
                .iter()
                .map(|k| format!("\"{}\"", k))
                .collect::<Vec<_>>()
                .join(" OR ");
            write!(q, " AND ({})", vocabulary).unwrap();
        }

        if let Some(site) = &query.site {
            write!(q, " site:{}", site).unwrap();
        }

        for term in self.negative_terms {
            write!(q, " -\"{}\"", term).unwrap();
        }
        q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_one_query_per_phrase_site_pair() {
        let phrases = strings(&["restaurant robotics", "kitchen automation", "food robots"]);
        let sites = strings(&["techcrunch.com", "thespoon.tech"]);
        let builder = QueryBuilder::new(&phrases, &sites, &[], &[]);

        let queries: Vec<Query> = builder.queries().collect();
        assert_eq!(queries.len(), 6);
        assert_eq!(
            queries[0],
            Query {
                phrase: "restaurant robotics".to_string(),
                site: Some("techcrunch.com".to_string())
            }
        );
        assert_eq!(queries[1].site.as_deref(), Some("thespoon.tech"));
        assert_eq!(queries[2].phrase, "kitchen automation");
    }

    #[test]
    fn test_no_sites_means_unrestricted() {
        let phrases = strings(&["restaurant robotics", "kitchen automation"]);
        let builder = QueryBuilder::new(&phrases, &[], &[], &[]);

        let rendered: Vec<String> = builder.queries().map(|q| builder.render(&q)).collect();
        assert_eq!(rendered, vec!["(restaurant robotics)", "(kitchen automation)"]);
    }

    #[test]
    fn test_building_is_deterministic() {
        let phrases = strings(&["a", "b"]);
        let sites = strings(&["x.com", "y.com", "z.com"]);
        let keywords = strings(&["raises"]);
        let builder = QueryBuilder::new(&phrases, &sites, &keywords, &[]);

        let first: Vec<String> = builder.queries().map(|q| builder.render(&q)).collect();
        let second: Vec<String> = builder.queries().map(|q| builder.render(&q)).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 6);
    }

    #[test]
    fn test_render_full_query() {
        let phrases = strings(&["restaurant robotics"]);
        let sites = strings(&["techcrunch.com"]);
        let keywords = strings(&["raises", "series A"]);
        let negative = strings(&["job", "hiring"]);
        let builder = QueryBuilder::new(&phrases, &sites, &keywords, &negative);

        let query = builder.queries().next().unwrap();
        assert_eq!(
            builder.render(&query),
            r#"(restaurant robotics) AND ("raises" OR "series A") site:techcrunch.com -"job" -"hiring""#
        );
    }

    #[test]
    fn test_empty_phrases_yield_nothing() {
        let sites = strings(&["techcrunch.com"]);
        let builder = QueryBuilder::new(&[], &sites, &[], &[]);
        assert_eq!(builder.queries().count(), 0);
    }
}
