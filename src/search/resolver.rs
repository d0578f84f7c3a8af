use std::collections::HashSet;

use crate::graph_utils::graph::{ElementId, Graph};

use super::index::SearchIndex;

/// Which step of the cascade produced a token's matches.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MatchStrategy {
    Id,
    Label,
    Species,
    Department,
    Substring,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TokenResolution {
    pub token: String,
    pub strategy: Option<MatchStrategy>,
    pub matched: Vec<ElementId>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resolution {
    /// Deduplicated by id, first-encountered order.
    pub nodes: Vec<ElementId>,
    pub not_found: Vec<String>,
    pub tokens: Vec<TokenResolution>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }
}

pub fn split_tokens(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect()
}

pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub struct QueryResolver<'a> {
    index: &'a SearchIndex,
    graph: &'a Graph,
}

impl<'a> QueryResolver<'a> {
    pub fn new(index: &'a SearchIndex, graph: &'a Graph) -> Self {
        QueryResolver { index, graph }
    }

    pub fn resolve(&self, raw: &str) -> Resolution {
        let mut out = Resolution::default();
        let mut seen: HashSet<ElementId> = HashSet::new();
        for token in split_tokens(raw) {
            let res = self.resolve_token(&token);
            if res.strategy.is_none() {
                out.not_found.push(token);
            } else {
                for id in &res.matched {
                    if seen.insert(id.clone()) {
                        out.nodes.push(id.clone());
                    }
                }
            }
            out.tokens.push(res);
        }
        out
    }

    /// Run the cascade for one trimmed token, stopping at the first step with a match.
    pub fn resolve_token(&self, token: &str) -> TokenResolution {
        let found = |strategy, matched: Vec<ElementId>| TokenResolution {
            token: token.to_string(),
            strategy: Some(strategy),
            matched,
        };

        if self.graph.contains(token) {
            return found(MatchStrategy::Id, vec![token.to_string()]);
        }

        let lowered = token.to_lowercase();
        let by_label = self.collect(|_, label| label.to_lowercase() == lowered);
        if !by_label.is_empty() {
            return found(MatchStrategy::Label, by_label);
        }

        let species = self.group_lookup(token, |key| self.index.species_group(key));
        if !species.is_empty() {
            return found(MatchStrategy::Species, species);
        }

        let departments = self.group_lookup(token, |key| self.index.department_group(key));
        if !departments.is_empty() {
            return found(MatchStrategy::Department, departments);
        }

        let partial = self.collect(|id, label| id.to_lowercase().contains(&lowered) || label.to_lowercase().contains(&lowered));
        if !partial.is_empty() {
            return found(MatchStrategy::Substring, partial);
        }

        TokenResolution { token: token.to_string(), strategy: None, matched: Vec::new() }
    }

    fn collect(&self, pred: impl Fn(&str, &str) -> bool) -> Vec<ElementId> {
        self.graph.nodes().iter().filter(|n| pred(&n.id, &n.label)).map(|n| n.id.clone()).collect()
    }

    // Verbatim key first, then with the first letter capitalized. Group members
    // missing from the live graph do not count as a match.
    fn group_lookup<'g>(&self, token: &str, lookup: impl Fn(&str) -> Option<&'g [ElementId]>) -> Vec<ElementId> {
        let live = |ids: &[ElementId]| -> Vec<ElementId> {
            ids.iter().filter(|id| self.graph.contains(id)).cloned().collect()
        };
        let verbatim = lookup(token).map(live).unwrap_or_default();
        if !verbatim.is_empty() {
            return verbatim;
        }
        let capitalized = capitalize_first(token);
        if capitalized == token {
            return Vec::new();
        }
        lookup(&capitalized).map(live).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_utils::graph::{Node, NodeType};

    fn graph() -> Graph {
        let mut p = Node::new("P1", "Plantación 1", NodeType::Plantacion);
        p.attrs.species = vec!["Eucalyptus".into()];
        p.attrs.departments = vec!["Cusco".into()];
        Graph::new(
            vec![
                Node::new("A", "B", NodeType::Titular),
                Node::new("B", "Especie X", NodeType::Especie),
                p,
            ],
            vec![],
        )
    }

    #[test]
    fn tokens_are_trimmed_and_empties_dropped() {
        assert_eq!(split_tokens(" a, ,b ,, "), vec!["a".to_string(), "b".to_string()]);
        assert!(split_tokens("  ").is_empty());
    }

    #[test]
    fn capitalize_handles_unicode_and_empty() {
        assert_eq!(capitalize_first("ñandú"), "Ñandú");
        assert_eq!(capitalize_first(""), "");
    }

    #[test]
    fn exact_id_wins_over_label_of_another_node() {
        let g = graph();
        let idx = SearchIndex::build(&g);
        let r = QueryResolver::new(&idx, &g).resolve_token("B");
        assert_eq!(r.strategy, Some(MatchStrategy::Id));
        assert_eq!(r.matched, vec!["B".to_string()]);
    }

    #[test]
    fn cascade_order_label_species_department_substring() {
        let g = graph();
        let idx = SearchIndex::build(&g);
        let resolver = QueryResolver::new(&idx, &g);
        assert_eq!(resolver.resolve_token("especie x").strategy, Some(MatchStrategy::Label));
        assert_eq!(resolver.resolve_token("eucalyptus").strategy, Some(MatchStrategy::Species));
        assert_eq!(resolver.resolve_token("cusco").strategy, Some(MatchStrategy::Department));
        let sub = resolver.resolve_token("plantación");
        assert_eq!(sub.strategy, Some(MatchStrategy::Substring));
        assert_eq!(sub.matched, vec!["P1".to_string()]);
    }

    #[test]
    fn unmatched_tokens_do_not_abort_the_batch() {
        let g = graph();
        let idx = SearchIndex::build(&g);
        let r = QueryResolver::new(&idx, &g).resolve("zzz, A, P1, A");
        assert_eq!(r.nodes, vec!["A".to_string(), "P1".to_string()]);
        assert_eq!(r.not_found, vec!["zzz".to_string()]);
        assert_eq!(r.tokens.len(), 4);
    }
}
