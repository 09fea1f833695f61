//! Data-driven inference rules for forward-chaining reasoning.
//!
//! Rules are structs, not code. They are loaded from the extended text format
//! or JSON, or taken from the bundled compliance rule set, and validated once
//! at load time so a malformed rule stops the process before any request runs.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::vocab::{self, Prefixes};

use super::error::{RuleEngineError, RulesResult};

/// The rule set bundled with the binary.
pub const BUNDLED_RULES: &str = include_str!("../../data/rules/compliance.rules");

// ---------------------------------------------------------------------------
// Rule term
// ---------------------------------------------------------------------------

/// A term in a rule pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleTerm {
    /// A variable binding (e.g., `?S`).
    Variable(String),
    /// An expanded IRI.
    Iri(String),
    /// A literal value, written `"..."`.
    Literal(String),
}

impl RuleTerm {
    /// Parse a term from a token. Variables start with `?`, literals are
    /// double-quoted, `a` is `rdf:type`, `<...>` is an absolute IRI and
    /// everything else must be a CURIE with a declared prefix.
    pub fn parse(token: &str, prefixes: &Prefixes) -> Result<Self, String> {
        let token = token.trim();
        if let Some(var) = token.strip_prefix('?') {
            if var.is_empty() {
                return Err("empty variable name".into());
            }
            return Ok(Self::Variable(var.to_string()));
        }
        if let Some(literal) = token.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
            return Ok(Self::Literal(literal.to_string()));
        }
        if token == "a" {
            return Ok(Self::Iri(vocab::RDF_TYPE.to_string()));
        }
        if let Some(iri) = token.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
            return Ok(Self::Iri(iri.to_string()));
        }
        prefixes
            .expand(token)
            .map(Self::Iri)
            .ok_or_else(|| format!("unknown prefix or unprefixed term '{token}'"))
    }
}

// ---------------------------------------------------------------------------
// Triple pattern
// ---------------------------------------------------------------------------

/// A triple pattern in a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: RuleTerm,
    pub predicate: RuleTerm,
    pub object: RuleTerm,
}

impl TriplePattern {
    /// Parse a triple pattern from `(?S ai:hasPurpose ?P)` syntax.
    pub fn parse(s: &str, prefixes: &Prefixes) -> Result<Self, String> {
        let s = s.trim();
        let inner = s
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .unwrap_or(s);
        let parts = tokenize(inner)?;
        if parts.len() != 3 {
            return Err(format!(
                "triple pattern must have exactly 3 terms, got {}: '{s}'",
                parts.len()
            ));
        }
        Ok(Self {
            subject: RuleTerm::parse(&parts[0], prefixes)?,
            predicate: RuleTerm::parse(&parts[1], prefixes)?,
            object: RuleTerm::parse(&parts[2], prefixes)?,
        })
    }

    /// Variable names appearing in this pattern.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        [&self.subject, &self.predicate, &self.object]
            .into_iter()
            .filter_map(|t| match t {
                RuleTerm::Variable(name) => Some(name.as_str()),
                _ => None,
            })
    }
}

/// Split pattern contents on whitespace, keeping quoted literals whole.
fn tokenize(s: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in s.chars() {
        match ch {
            '"' => {
                current.push(ch);
                in_quotes = !in_quotes;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if in_quotes {
        return Err(format!("unterminated literal in '{s}'"));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Rule kind
// ---------------------------------------------------------------------------

/// Classification of the inference a rule performs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    TransitiveClosure,
    Subsumption,
    CriterionDerivation,
    RequirementDerivation,
    Custom { name: String },
}

impl RuleKind {
    /// Parse a rule kind from a string.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "transitiveclosure" | "transitive" => Self::TransitiveClosure,
            "subsumption" | "subclass" => Self::Subsumption,
            "criterionderivation" | "criterion" => Self::CriterionDerivation,
            "requirementderivation" | "requirement" => Self::RequirementDerivation,
            other => Self::Custom {
                name: other.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Inference rule
// ---------------------------------------------------------------------------

/// A single inference rule: match antecedents, produce consequents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRule {
    pub name: String,
    pub kind: RuleKind,
    pub antecedents: Vec<TriplePattern>,
    pub consequents: Vec<TriplePattern>,
    pub enabled: bool,
}

impl InferenceRule {
    /// Create a new, enabled rule with no patterns.
    pub fn new(name: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            name: name.into(),
            kind,
            antecedents: Vec::new(),
            consequents: Vec::new(),
            enabled: true,
        }
    }

    pub fn with_antecedents(mut self, antecedents: Vec<TriplePattern>) -> Self {
        self.antecedents = antecedents;
        self
    }

    pub fn with_consequents(mut self, consequents: Vec<TriplePattern>) -> Self {
        self.consequents = consequents;
        self
    }

    /// Structural checks applied to every rule at load time.
    pub fn validate(&self) -> RulesResult<()> {
        let fail = |message: String| Err(RuleEngineError::parse(&self.name, message));

        if self.antecedents.is_empty() {
            return fail("rule has no `match:` patterns".into());
        }
        if self.consequents.is_empty() {
            return fail("rule has no `produce:` patterns".into());
        }
        for pattern in self.antecedents.iter().chain(&self.consequents) {
            if matches!(pattern.predicate, RuleTerm::Literal(_)) {
                return fail("a literal cannot be used as a predicate".into());
            }
        }
        let bound: HashSet<&str> = self
            .antecedents
            .iter()
            .flat_map(TriplePattern::variables)
            .collect();
        for pattern in &self.consequents {
            if matches!(pattern.subject, RuleTerm::Literal(_)) {
                return fail("a literal cannot be the subject of a produced fact".into());
            }
            if let Some(unbound) = pattern.variables().find(|v| !bound.contains(v)) {
                return fail(format!(
                    "variable ?{unbound} in `produce:` is not bound by `match:`"
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rule set
// ---------------------------------------------------------------------------

/// A validated collection of rules with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    pub name: String,
    pub rules: Vec<InferenceRule>,
    pub source: String,
}

#[derive(Debug, Deserialize)]
struct RuleSetJson {
    #[serde(default)]
    prefixes: BTreeMap<String, String>,
    rules: Vec<RuleJson>,
}

#[derive(Debug, Deserialize)]
struct RuleJson {
    name: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(rename = "match")]
    antecedents: Vec<String>,
    #[serde(rename = "produce")]
    consequents: Vec<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl RuleSet {
    /// Build a rule set from already-constructed rules, validating each.
    pub fn new(
        name: impl Into<String>,
        rules: Vec<InferenceRule>,
        source: impl Into<String>,
    ) -> RulesResult<Self> {
        let set = Self {
            name: name.into(),
            rules,
            source: source.into(),
        };
        set.validate()?;
        Ok(set)
    }

    /// The compliance rule set bundled into the binary.
    pub fn bundled() -> RulesResult<Self> {
        Self::parse_from_text(BUNDLED_RULES, "bundled")
    }

    /// Load a rule file: `.json` files are parsed as JSON, anything else as
    /// the text format.
    pub fn from_file(path: &Path) -> RulesResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| RuleEngineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let source = path.display().to_string();
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json(&text, &source)
        } else {
            Self::parse_from_text(&text, &source)
        }
    }

    /// Parse a rule set from JSON:
    ///
    /// ```json
    /// { "prefixes": { "ex": "https://example.org/" },
    ///   "rules": [ { "name": "r", "kind": "criterion",
    ///                "match": ["(?S ai:hasPurpose ex:P)"],
    ///                "produce": ["(?S ai:hasNormativeCriterion ex:C)"] } ] }
    /// ```
    pub fn from_json(json: &str, source: &str) -> RulesResult<Self> {
        let parsed: RuleSetJson = serde_json::from_str(json)
            .map_err(|e| RuleEngineError::parse("", format!("JSON parse error: {e}")))?;

        let mut prefixes = Prefixes::standard();
        for (prefix, ns) in parsed.prefixes {
            prefixes.insert(prefix, ns);
        }

        let mut rules = Vec::with_capacity(parsed.rules.len());
        for rule in parsed.rules {
            let parse_all = |patterns: &[String]| -> RulesResult<Vec<TriplePattern>> {
                patterns
                    .iter()
                    .map(|p| {
                        TriplePattern::parse(p, &prefixes)
                            .map_err(|message| RuleEngineError::parse(&rule.name, message))
                    })
                    .collect()
            };
            let antecedents = parse_all(&rule.antecedents)?;
            let consequents = parse_all(&rule.consequents)?;
            let kind = RuleKind::parse(rule.kind.as_deref().unwrap_or("custom"));
            let mut parsed_rule = InferenceRule::new(rule.name, kind)
                .with_antecedents(antecedents)
                .with_consequents(consequents);
            parsed_rule.enabled = rule.enabled;
            rules.push(parsed_rule);
        }

        Self::new(source, rules, source)
    }

    /// Parse rules from the extended text format.
    ///
    /// Format:
    /// ```text
    /// @prefix ai: <https://w3id.org/ai-compliance#>
    ///
    /// @rule recruitment-non-discrimination criterion
    ///   match: (?S ai:hasPurpose ai:RecruitmentOrEmployment)
    ///   produce: (?S ai:hasNormativeCriterion ai:NonDiscrimination)
    ///   enabled: true
    /// ```
    ///
    /// `#` starts a comment line. The `ai`, `rdf` and `rdfs` prefixes are
    /// predeclared.
    pub fn parse_from_text(text: &str, source: &str) -> RulesResult<Self> {
        let mut prefixes = Prefixes::standard();
        let mut rules = Vec::new();
        let mut lines = text.lines().peekable();

        while let Some(line) = lines.next() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("@prefix") {
                let (prefix, ns) = parse_prefix(rest)
                    .ok_or_else(|| RuleEngineError::parse("", format!("bad @prefix: '{trimmed}'")))?;
                prefixes.insert(prefix, ns);
                continue;
            }

            let Some(rest) = trimmed.strip_prefix("@rule") else {
                return Err(RuleEngineError::parse(
                    "",
                    format!("unexpected line outside a rule: '{trimmed}'"),
                ));
            };
            let parts: Vec<&str> = rest.split_whitespace().collect();
            if parts.len() != 2 {
                return Err(RuleEngineError::parse(
                    rest.trim(),
                    "@rule requires a name and a kind",
                ));
            }
            let name = parts[0].to_string();
            let mut rule = InferenceRule::new(name.clone(), RuleKind::parse(parts[1]));

            // Indented continuation lines up to the next blank line or directive.
            while let Some(next) = lines.next_if(|l| {
                let t = l.trim();
                !t.is_empty() && !t.starts_with('@')
            }) {
                let next = next.trim();
                if next.starts_with('#') {
                    continue;
                }
                let (key, value) = next
                    .split_once(':')
                    .ok_or_else(|| RuleEngineError::parse(&name, format!("expected `key: value`, got '{next}'")))?;
                match key.trim() {
                    "match" => {
                        for pat in split_patterns(value) {
                            let pattern = TriplePattern::parse(pat, &prefixes)
                                .map_err(|message| RuleEngineError::parse(&name, message))?;
                            rule.antecedents.push(pattern);
                        }
                    }
                    "produce" => {
                        for pat in split_patterns(value) {
                            let pattern = TriplePattern::parse(pat, &prefixes)
                                .map_err(|message| RuleEngineError::parse(&name, message))?;
                            rule.consequents.push(pattern);
                        }
                    }
                    "enabled" => {
                        rule.enabled = value.trim().parse::<bool>().map_err(|e| {
                            RuleEngineError::parse(&name, format!("invalid enabled flag: {e}"))
                        })?;
                    }
                    other => {
                        return Err(RuleEngineError::parse(
                            &name,
                            format!("unknown rule key '{other}'"),
                        ));
                    }
                }
            }

            rules.push(rule);
        }

        Self::new(source, rules, source)
    }

    /// Validate every rule and reject duplicate names.
    pub fn validate(&self) -> RulesResult<()> {
        let mut names = HashSet::new();
        for rule in &self.rules {
            if !names.insert(rule.name.as_str()) {
                return Err(RuleEngineError::parse(&rule.name, "duplicate rule name"));
            }
            rule.validate()?;
        }
        Ok(())
    }

    /// Enabled rules in load order.
    pub fn enabled(&self) -> impl Iterator<Item = &InferenceRule> {
        self.rules.iter().filter(|r| r.enabled)
    }

    /// Return the total number of enabled rules.
    pub fn enabled_count(&self) -> usize {
        self.enabled().count()
    }
}

/// Parse `name: <namespace>` with an optional trailing `.`.
fn parse_prefix(rest: &str) -> Option<(String, String)> {
    let rest = rest.trim().trim_end_matches('.').trim();
    let (prefix, ns) = rest.split_once(':')?;
    let ns = ns.trim().strip_prefix('<')?.strip_suffix('>')?;
    let prefix = prefix.trim();
    if prefix.is_empty() || prefix.contains(char::is_whitespace) {
        return None;
    }
    Some((prefix.to_string(), ns.to_string()))
}

/// Split a comma-separated list of `(...)` patterns.
fn split_patterns(s: &str) -> Vec<&str> {
    let s = s.trim();
    let mut results = Vec::new();
    let mut depth = 0;
    let mut start = 0;
    let mut in_quotes = false;

    for (i, ch) in s.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            ')' if !in_quotes => {
                depth -= 1;
                if depth == 0 {
                    results.push(&s[start..=i]);
                }
            }
            _ => {}
        }
    }

    // If no parentheses were found, treat the whole string as a single pattern.
    if results.is_empty() && !s.is_empty() {
        results.push(s);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::ai;

    #[test]
    fn bundled_rules_load() {
        let rs = RuleSet::bundled().unwrap();
        assert_eq!(rs.rules.len(), 9);
        assert_eq!(rs.enabled_count(), 9);
        let names: Vec<&str> = rs.rules.iter().map(|r| r.name.as_str()).collect();
        assert!(names.contains(&"technical-criterion"));
        assert!(names.contains(&"normative-requirement"));
    }

    #[test]
    fn bundled_criterion_rule_structure() {
        let rs = RuleSet::bundled().unwrap();
        let rule = rs
            .rules
            .iter()
            .find(|r| r.name == "normative-criterion")
            .unwrap();
        assert_eq!(rule.kind, RuleKind::CriterionDerivation);
        assert_eq!(rule.antecedents.len(), 4);
        assert_eq!(rule.consequents.len(), 1);
        assert_eq!(
            rule.antecedents[0].predicate,
            RuleTerm::Iri(vocab::RDF_TYPE.to_string())
        );
        assert_eq!(
            rule.consequents[0].predicate,
            RuleTerm::Iri(ai("hasNormativeCriterion"))
        );
    }

    #[test]
    fn triple_pattern_parse() {
        let pat = TriplePattern::parse("(?S ai:hasPurpose ?P)", &Prefixes::standard()).unwrap();
        assert!(matches!(pat.subject, RuleTerm::Variable(ref v) if v == "S"));
        assert_eq!(pat.predicate, RuleTerm::Iri(ai("hasPurpose")));
        assert!(matches!(pat.object, RuleTerm::Variable(ref v) if v == "P"));
    }

    #[test]
    fn triple_pattern_with_quoted_literal() {
        let pat =
            TriplePattern::parse(r#"(?S ai:hasName "Healthcare AI")"#, &Prefixes::standard())
                .unwrap();
        assert_eq!(pat.object, RuleTerm::Literal("Healthcare AI".into()));
    }

    #[test]
    fn triple_pattern_bad_arity() {
        assert!(TriplePattern::parse("(?X ai:hasPurpose)", &Prefixes::standard()).is_err());
    }

    #[test]
    fn unknown_prefix_is_rejected() {
        assert!(RuleTerm::parse("owl:Thing", &Prefixes::standard()).is_err());
        assert!(RuleTerm::parse("bare", &Prefixes::standard()).is_err());
    }

    #[test]
    fn rule_kind_parse() {
        assert_eq!(RuleKind::parse("transitive"), RuleKind::TransitiveClosure);
        assert_eq!(RuleKind::parse("Criterion"), RuleKind::CriterionDerivation);
        assert_eq!(RuleKind::parse("requirement"), RuleKind::RequirementDerivation);
        assert!(matches!(RuleKind::parse("weird"), RuleKind::Custom { .. }));
    }

    #[test]
    fn text_format_with_custom_prefix() {
        let text = r#"
@prefix ex: <https://example.org/> .

# a comment
@rule ex-rule criterion
  match: (?S ex:uses ?T), (?T a ex:Risky)
  produce: (?S ai:hasNormativeCriterion ex:Caution)
  enabled: false
"#;
        let rs = RuleSet::parse_from_text(text, "test").unwrap();
        assert_eq!(rs.rules.len(), 1);
        assert!(!rs.rules[0].enabled);
        assert_eq!(rs.enabled_count(), 0);
        assert_eq!(
            rs.rules[0].antecedents[0].predicate,
            RuleTerm::Iri("https://example.org/uses".into())
        );
    }

    #[test]
    fn unbound_consequent_variable_is_fatal() {
        let text = "@rule broken custom\n  match: (?S ai:hasPurpose ?P)\n  produce: (?S ai:hasRequirement ?R)\n";
        let err = RuleSet::parse_from_text(text, "test").unwrap_err();
        assert!(matches!(err, RuleEngineError::RuleParse { ref rule_name, .. } if rule_name == "broken"));
    }

    #[test]
    fn rule_without_antecedents_is_fatal() {
        let text = "@rule empty custom\n  produce: (ai:A ai:b ai:C)\n";
        assert!(RuleSet::parse_from_text(text, "test").is_err());
    }

    #[test]
    fn unknown_key_and_stray_lines_are_fatal() {
        let unknown = "@rule r custom\n  match: (?S ai:p ?O)\n  produce: (?O ai:q ?S)\n  weight: 3\n";
        assert!(RuleSet::parse_from_text(unknown, "test").is_err());
        assert!(RuleSet::parse_from_text("(?S ai:p ?O) => (?O ai:q ?S)", "test").is_err());
    }

    #[test]
    fn duplicate_rule_names_are_fatal() {
        let text = "@rule r custom\n  match: (?S ai:p ?O)\n  produce: (?O ai:q ?S)\n\n@rule r custom\n  match: (?S ai:p ?O)\n  produce: (?O ai:q ?S)\n";
        assert!(RuleSet::parse_from_text(text, "test").is_err());
    }

    #[test]
    fn json_parsing() {
        let json = r#"{
            "prefixes": { "ex": "https://example.org/" },
            "rules": [
                { "name": "ex-rule", "kind": "requirement",
                  "match": ["(?S ai:hasNormativeCriterion ex:C)"],
                  "produce": ["(?S ai:hasRequirement ex:R)"] }
            ]
        }"#;
        let rs = RuleSet::from_json(json, "test.json").unwrap();
        assert_eq!(rs.rules.len(), 1);
        assert_eq!(rs.rules[0].kind, RuleKind::RequirementDerivation);
        assert_eq!(
            rs.rules[0].consequents[0].object,
            RuleTerm::Iri("https://example.org/R".into())
        );
    }

    #[test]
    fn json_syntax_error_is_a_parse_error() {
        assert!(matches!(
            RuleSet::from_json("{ not json", "x").unwrap_err(),
            RuleEngineError::RuleParse { .. }
        ));
    }

    #[test]
    fn from_file_dispatches_on_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        let json_path = dir.path().join("rules.json");
        std::fs::write(
            &json_path,
            r#"{"rules": [{"name": "j", "match": ["(?S ai:p ?O)"], "produce": ["(?O ai:q ?S)"]}]}"#,
        )
        .unwrap();
        assert_eq!(RuleSet::from_file(&json_path).unwrap().rules.len(), 1);

        let text_path = dir.path().join("rules.rules");
        std::fs::write(&text_path, BUNDLED_RULES).unwrap();
        assert_eq!(RuleSet::from_file(&text_path).unwrap().rules.len(), 9);

        assert!(matches!(
            RuleSet::from_file(&dir.path().join("missing.rules")).unwrap_err(),
            RuleEngineError::Io { .. }
        ));
    }
}
