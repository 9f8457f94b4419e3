//! The include/exclude predicate: maps a (kind, candidate) pair to a
//! decision, combining node-name, property-name and compatible-string
//! rules (spec.md §4.1).

use crate::data::stringlist_contains;
use crate::error::Error;

/// What a filter rule or classification request is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Node,
    Prop,
    Compat,
    /// Matches regardless of kind (`-g`/`-G`, bare positional literals).
    Any,
}

impl Kind {
    /// Whether a rule declared with `self` as its kind should be
    /// considered when classifying a candidate of kind `target`.
    fn applies_to(self, target: Kind) -> bool {
        self == Kind::Any || self == target
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Include,
    Exclude,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub kind: Kind,
    pub polarity: Polarity,
    pub literal: String,
}

impl Rule {
    pub fn new(kind: Kind, polarity: Polarity, literal: impl Into<String>) -> Self {
        Self {
            kind,
            polarity,
            literal: literal.into(),
        }
    }
}

/// The result of classifying one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Include,
    Exclude,
    /// No rule in the set mentions this candidate's kind at all.
    DontKnow,
}

/// An immutable, validated set of filter rules plus the global invert
/// flag, built once before the walk begins.
#[derive(Debug, Clone)]
pub struct FilterSet {
    rules: Vec<Rule>,
    invert: bool,
}

impl FilterSet {
    /// Validates the rule set (no same-kind Include/Exclude conflict;
    /// `invert` never combined with an Exclude rule) and builds a
    /// `FilterSet`.
    pub fn new(rules: Vec<Rule>, invert: bool) -> Result<Self, Error> {
        for kind in [Kind::Node, Kind::Prop, Kind::Compat] {
            let has_include = rules
                .iter()
                .any(|r| r.kind.applies_to(kind) && r.polarity == Polarity::Include);
            let has_exclude = rules
                .iter()
                .any(|r| r.kind.applies_to(kind) && r.polarity == Polarity::Exclude);
            if has_include && has_exclude {
                return Err(Error::ConflictingFilter(kind));
            }
        }

        if invert && rules.iter().any(|r| r.polarity == Polarity::Exclude) {
            return Err(Error::InvertWithExclusion);
        }

        Ok(Self { rules, invert })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn classify_raw(&self, kind: Kind, candidate: &[u8]) -> Decision {
        let mut kind_mentioned = false;
        let mut has_exclude_rule = false;
        let mut exclude_matched = false;

        for rule in &self.rules {
            if !rule.kind.applies_to(kind) {
                continue;
            }
            kind_mentioned = true;
            let matched = stringlist_contains(candidate, &rule.literal);
            match rule.polarity {
                Polarity::Include if matched => return Decision::Include,
                Polarity::Include => {}
                Polarity::Exclude => {
                    has_exclude_rule = true;
                    exclude_matched |= matched;
                }
            }
        }

        if !kind_mentioned {
            return Decision::DontKnow;
        }
        if has_exclude_rule && !exclude_matched {
            return Decision::Include;
        }
        Decision::Exclude
    }

    fn apply_invert(&self, decision: Decision) -> Decision {
        if !self.invert {
            return decision;
        }
        match decision {
            Decision::Include => Decision::Exclude,
            Decision::Exclude => Decision::Include,
            Decision::DontKnow => Decision::DontKnow,
        }
    }

    /// Classifies a candidate of the given kind. `candidate` is
    /// matched as a nul-separated string list, so a single plain name
    /// or path works the same as a multi-valued `compatible` value.
    pub fn classify(&self, kind: Kind, candidate: &[u8]) -> Decision {
        self.apply_invert(self.classify_raw(kind, candidate))
    }

    /// Classifies a node by path, falling back to its `compatible`
    /// value (if any) when no node-path rule resolves the question.
    pub fn classify_node(&self, path: &str, compatible: Option<&[u8]>) -> Decision {
        let decision = self.classify(Kind::Node, path.as_bytes());
        if decision != Decision::DontKnow {
            return decision;
        }
        match compatible {
            Some(value) => self.classify(Kind::Compat, value),
            None => Decision::DontKnow,
        }
    }

    /// Classifies a property (or Nop, treated identically) by name.
    pub fn classify_prop(&self, name: &str) -> Decision {
        self.classify(Kind::Prop, name.as_bytes())
    }
}
