// DepSleuth - core/adapter.rs
//
// The source adapter contract: raw evidence text plus an optional format tag
// in, claims out. Concrete adapters live in core::adapters and only supply
// their grammars plus small platform-specific hooks; line iteration,
// timestamp fallback, and claim construction are shared here.

use crate::core::grammar::{GrammarSet, LineGrammar};
use crate::core::model::{Claim, ConfidenceScore, Edge, ParsedEvent, SourceType};
use crate::core::timestamp;
use crate::util::constants;
use crate::util::logging::preview;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Turns raw evidence text from one origin into claims.
///
/// Parsing is best-effort and line-independent: a line that no grammar
/// accepts is skipped, never reported as an error.
pub trait SourceAdapter: Send + Sync {
    /// Category stamped on every claim this adapter produces.
    fn source_type(&self) -> SourceType;

    /// Prefix of generated claim ids (`<prefix>_<uuid>`).
    fn id_prefix(&self) -> &'static str;

    /// Grammars in auto-detect priority order.
    fn grammars(&self) -> &GrammarSet;

    /// Platform-specific post-processing of a matched line. Returning `None`
    /// drops the line.
    fn refine(&self, event: ParsedEvent) -> Option<ParsedEvent> {
        Some(event)
    }

    /// Confidence the adapter can judge from the record alone. Superseded by
    /// the processing engine's score.
    fn seed_confidence(&self, _event: &ParsedEvent) -> Option<ConfidenceScore> {
        None
    }

    /// Parse `raw` into claims.
    ///
    /// With `format = Some(tag)` only that grammar is used; an unknown tag
    /// yields no claims. With `None` every grammar is tried in priority
    /// order and the first match wins.
    fn parse(&self, raw: &str, format: Option<&str>) -> Vec<Claim> {
        if raw.trim().is_empty() {
            return Vec::new();
        }

        let grammar: Option<&dyn LineGrammar> = match format {
            Some(tag) => match self.grammars().get(tag) {
                Some(g) => Some(&**g),
                None => {
                    tracing::warn!(
                        source = %self.source_type(),
                        format = tag,
                        known = ?self.grammars().ids(),
                        "Unsupported format tag, no claims produced"
                    );
                    return Vec::new();
                }
            },
            None => None,
        };

        // One ingest time per batch, so lines without timestamps agree.
        let ingest_at = Utc::now();
        let mut claims = Vec::new();
        let mut skipped = 0usize;

        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            match self
                .parse_line(line, grammar)
                .and_then(|event| self.to_claim(event, ingest_at))
            {
                Some(claim) => claims.push(claim),
                None => {
                    skipped += 1;
                    tracing::trace!(
                        source = %self.source_type(),
                        line = preview(line),
                        "Line skipped"
                    );
                }
            }
        }

        tracing::debug!(
            source = %self.source_type(),
            format = format.unwrap_or("auto"),
            claims = claims.len(),
            skipped,
            "Parsed evidence"
        );
        claims
    }

    /// Match one line with `grammar`, or auto-detect when `None`, then refine.
    fn parse_line(&self, line: &str, grammar: Option<&dyn LineGrammar>) -> Option<ParsedEvent> {
        if line.len() > constants::MAX_LINE_LENGTH {
            return None;
        }
        let event = match grammar {
            Some(g) => g.try_parse(line),
            None => self.grammars().detect(line),
        }?;
        self.refine(event)
    }

    /// Convert a refined event into an unscored claim. Events without a
    /// usable downstream are dropped.
    fn to_claim(&self, event: ParsedEvent, ingest_at: DateTime<Utc>) -> Option<Claim> {
        let upstream = normalize_entity(&event.upstream)?;
        let downstream = event.downstream.as_deref().and_then(normalize_entity)?;
        let timestamp = event
            .timestamp
            .or_else(|| timestamp::sniff_timestamp(&event.raw_line))
            .unwrap_or(ingest_at);
        let id = format!("{}_{}", self.id_prefix(), Uuid::new_v4().simple());

        let claim = match Claim::new(
            id,
            self.source_type(),
            event.raw_line.as_str(),
            Edge::new(upstream, downstream).key(),
            timestamp,
        ) {
            Ok(claim) => claim,
            Err(e) => {
                tracing::debug!(error = %e, "Event could not form a claim");
                return None;
            }
        };

        Some(match self.seed_confidence(&event) {
            Some(score) => claim.with_confidence(score),
            None => claim,
        })
    }
}

/// Canonical application name: trimmed, unquoted, without `:port` or
/// `/instance` suffixes, lowercase. `None` when nothing is left or the name
/// contains an arrow, which would make the edge key ambiguous.
pub fn normalize_entity(raw: &str) -> Option<String> {
    if raw.contains("->") {
        return None;
    }
    let mut name = raw.trim().trim_matches(|c: char| c == '"' || c == '\'').trim();
    if let Some((head, _instance)) = name.split_once('/') {
        name = head;
    }
    if let Some((head, port)) = name.rsplit_once(':') {
        if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) {
            name = head;
        }
    }
    let name = name.trim().to_lowercase();
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_entity() {
        assert_eq!(normalize_entity("Orders-Service").as_deref(), Some("orders-service"));
        assert_eq!(normalize_entity(" \"web\" ").as_deref(), Some("web"));
        assert_eq!(normalize_entity("db:5432").as_deref(), Some("db"));
        assert_eq!(normalize_entity("orders/srv1").as_deref(), Some("orders"));
        assert_eq!(
            normalize_entity("com.acme:billing").as_deref(),
            Some("com.acme:billing")
        );
        assert_eq!(normalize_entity("  "), None);
        assert_eq!(normalize_entity(":8080"), None);
    }

    #[test]
    fn test_normalize_entity_rejects_arrows() {
        assert_eq!(normalize_entity("a -> b"), None);
        assert_eq!(normalize_entity("a->b"), None);
        assert_eq!(normalize_entity("a-b").as_deref(), Some("a-b"));
    }
}
