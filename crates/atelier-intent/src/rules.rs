//! Ordered phrase rules

use atelier_core::{AtelierError, Result};
use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::intent::{Classification, RollbackIntent, RollbackKind};

/// Strategy for turning chat text into a rollback directive
pub trait IntentClassifier: Send + Sync {
    /// `None` means the text is not a rollback request
    fn classify(&self, text: &str) -> Option<RollbackIntent>;

    /// Wire-shaped result of [`classify`](Self::classify)
    fn classification(&self, text: &str) -> Classification {
        Classification::from(self.classify(text))
    }
}

/// One named pattern producing one kind of rollback
///
/// Patterns are matched case-insensitively against whitespace-normalised
/// text. Named groups feed the directive: `count` for
/// [`RollbackKind::Multiple`], `target` for [`RollbackKind::ToBatch`] and
/// `keep` for [`RollbackKind::Partial`].
#[derive(Debug, Clone)]
pub struct RollbackRule {
    name: String,
    pattern: Regex,
    kind: RollbackKind,
}

impl RollbackRule {
    pub fn new(name: impl Into<String>, pattern: &str, kind: RollbackKind) -> Result<Self> {
        let name = name.into();
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| AtelierError::Config(format!("Invalid rollback rule '{}': {}", name, e)))?;

        Ok(Self {
            name,
            pattern,
            kind,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RollbackKind {
        self.kind
    }

    /// Apply this rule to already-normalised text
    pub fn matches(&self, text: &str) -> Option<RollbackIntent> {
        let caps = self.pattern.captures(text)?;
        let group = |name: &str| {
            caps.name(name)
                .map(|m| m.as_str().trim().trim_end_matches(['.', '!', '?']).to_string())
                .filter(|s| !s.is_empty())
        };

        match self.kind {
            RollbackKind::Last => Some(RollbackIntent::last()),
            RollbackKind::Multiple => match parse_count(&group("count")?)? {
                0 => None,
                1 => Some(RollbackIntent::last()),
                n => Some(RollbackIntent::multiple(n)),
            },
            RollbackKind::ToBatch => Some(RollbackIntent::to_batch(group("target")?)),
            RollbackKind::Reset => Some(RollbackIntent::reset()),
            RollbackKind::Partial => Some(RollbackIntent::partial(group("keep")?)),
        }
    }
}

/// First-match-wins rule table
#[derive(Debug, Clone)]
pub struct RuleClassifier {
    rules: Vec<RollbackRule>,
}

impl RuleClassifier {
    pub fn new(rules: Vec<RollbackRule>) -> Self {
        Self { rules }
    }

    /// Classifier with the built-in French and English phrases
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(builtin_rules()?))
    }

    /// Insert a rule ahead of all existing ones
    pub fn prepend(&mut self, rule: RollbackRule) {
        self.rules.insert(0, rule);
    }

    pub fn push(&mut self, rule: RollbackRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[RollbackRule] {
        &self.rules
    }
}

impl IntentClassifier for RuleClassifier {
    fn classify(&self, text: &str) -> Option<RollbackIntent> {
        let text = normalize(text);
        if text.is_empty() {
            return None;
        }

        self.rules.iter().find_map(|rule| {
            let intent = rule.matches(&text)?;
            debug!("Rollback rule '{}' matched: {:?}", rule.name(), intent);
            Some(intent)
        })
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

const NUMBER: &str = r"\d+|une|un|deux|trois|quatre|cinq|six|sept|huit|neuf|dix|one|two|three|four|five|seven|eight|nine|ten";

fn parse_count(raw: &str) -> Option<usize> {
    if let Ok(n) = raw.parse::<usize>() {
        return Some(n);
    }

    let n = match raw.to_lowercase().as_str() {
        "un" | "une" | "one" => 1,
        "deux" | "two" => 2,
        "trois" | "three" => 3,
        "quatre" | "four" => 4,
        "cinq" | "five" => 5,
        "six" => 6,
        "sept" | "seven" => 7,
        "huit" | "eight" => 8,
        "neuf" | "nine" => 9,
        "dix" | "ten" => 10,
        _ => return None,
    };
    Some(n)
}

/// The built-in rule table, most specific first
pub fn builtin_rules() -> Result<Vec<RollbackRule>> {
    use RollbackKind::*;

    let undo_fr = r"(?:annule|annuler|annulez|d[ée]fais|d[ée]faire)";
    let undo_en = r"(?:undo|revert|roll\s*back)";
    let end = r"\s*[.!]*$";

    // What an undo verb may be followed by before "except"/"sauf"
    let scope_fr = format!(
        r"(?:tout|[çc]a|cela|tous\s+les\s+changements|toutes\s+les\s+modifications|le\s+changement|la\s+modification|(?:les\s+|le\s+|la\s+)?(?:(?:{NUMBER})\s+)?derni[eè]re?s?(?:\s+(?:{NUMBER}))?(?:\s+(?:changements?|modifications?|actions?))?)"
    );
    let scope_en = format!(
        r"(?:everything|all(?:\s+(?:the\s+)?(?:changes|edits))?|it|that|this|the\s+changes?|(?:the\s+|my\s+)?(?:last|previous)(?:\s+(?:{NUMBER}))?\s+(?:changes?|edits?|actions?|steps?|one))"
    );
    let rest_fr = r"(?:le\s+reste|tout\s+le\s+reste|les\s+autres(?:\s+(?:changements|modifications))?|tout)";
    let rest_en = r"(?:the\s+rest|everything\s+else|all\s+else|the\s+others?|the\s+other\s+changes)";
    let unit_fr = r"(?:changements?|modifications?|actions?|[ée]tapes?)";
    let unit_en = r"(?:changes?|edits?|actions?|steps?|ones?)";

    let table: Vec<(&str, String, RollbackKind)> = vec![
        // partial: undo but keep something
        (
            "partial_fr",
            format!(
                r"^{undo_fr}(?:\s+{scope_fr})?\s+(?:sauf|except[ée]e?s?|mais\s+garde|mais\s+conserve|en\s+gardant|en\s+conservant)\s+(?P<keep>.+?){end}"
            ),
            Partial,
        ),
        (
            "partial_fr_keep_first",
            format!(
                r"^(?:garde|conserve)\s+(?P<keep>.+?)\s+(?:et|mais)\s+{undo_fr}(?:\s+{rest_fr})?{end}"
            ),
            Partial,
        ),
        (
            "partial_en",
            format!(
                r"^{undo_en}(?:\s+{scope_en})?\s+(?:except(?:\s+for)?|but\s+keep|keeping|apart\s+from)\s+(?P<keep>.+?){end}"
            ),
            Partial,
        ),
        (
            "partial_en_keep_first",
            format!(r"^keep\s+(?P<keep>.+?)\s+(?:and|but)\s+{undo_en}(?:\s+{rest_en})?{end}"),
            Partial,
        ),
        // multiple: an explicit count
        (
            "multiple_fr",
            format!(
                r"^{undo_fr}\s+(?:les\s+)?(?P<count>{NUMBER})\s+(?:derni[eè]re?s?|pr[ée]c[ée]dente?s?)(?:\s+{unit_fr})?{end}"
            ),
            Multiple,
        ),
        (
            "multiple_fr_count_last",
            format!(
                r"^{undo_fr}\s+(?:les\s+)?derni[eè]re?s?\s+(?P<count>{NUMBER})(?:\s+{unit_fr})?{end}"
            ),
            Multiple,
        ),
        (
            "multiple_fr_steps",
            format!(
                r"^(?:reviens|revenir|retourne|recule)\s+(?:de\s+)?(?P<count>{NUMBER})\s+(?:[ée]tapes?|fois|changements?|modifications?|actions?|versions?)(?:\s+en\s+arri[eè]re)?{end}"
            ),
            Multiple,
        ),
        (
            "multiple_en",
            format!(
                r"^{undo_en}\s+(?:the\s+)?(?:last|previous|past)\s+(?P<count>{NUMBER})(?:\s+{unit_en})?{end}"
            ),
            Multiple,
        ),
        (
            "multiple_en_steps",
            format!(
                r"^(?:{undo_en}|go\s+back)\s+(?P<count>{NUMBER})\s+(?:changes?|steps?|edits?|actions?|times)(?:\s+back)?{end}"
            ),
            Multiple,
        ),
        // reset: back to the start
        (
            "reset_fr_all",
            format!(
                r"^{undo_fr}\s+(?:tout|toutes\s+les\s+(?:modifications|changements)|tous\s+les\s+changements)(?:\s+ce\s+que\s+tu\s+as\s+fait)?{end}"
            ),
            Reset,
        ),
        (
            "reset_fr_origin",
            format!(
                r"^(?:reviens|revenir|retourne|retour|repars|remets?)\s+(?:tout\s+)?(?:au|à\s+la|a\s+la|à\s+l'|a\s+l'|à|a)?\s*(?:d[ée]but|d[ée]part|version\s+(?:originale|initiale|d'origine)|site\s+(?:original|d'origine)|design\s+(?:original|d'origine)|[ée]tat\s+(?:initial|d'origine)|z[ée]ro){end}"
            ),
            Reset,
        ),
        (
            "reset_fr_reinit",
            format!(
                r"^(?:r[ée]initialise(?:r|z)?|remise\s+[àa]\s+z[ée]ro|recommence(?:r|z)?\s+(?:[àa]\s+z[ée]ro|depuis\s+le\s+d[ée]but))(?:\s+(?:tout|le\s+site))?{end}"
            ),
            Reset,
        ),
        (
            "reset_en_all",
            format!(r"^{undo_en}\s+(?:everything|all(?:\s+(?:the\s+)?(?:changes|edits))?){end}"),
            Reset,
        ),
        (
            "reset_en_origin",
            format!(
                r"^(?:go\s+back|revert|return|restore)\s+(?:everything\s+)?to\s+(?:the\s+)?(?:original(?:\s+(?:version|site|design))?|beginning|start){end}"
            ),
            Reset,
        ),
        (
            "reset_en_start",
            format!(
                r"^(?:reset(?:\s+(?:everything|all|it|the\s+site|all\s+changes))?|start\s+over|start\s+from\s+scratch){end}"
            ),
            Reset,
        ),
        // toBatch: a named batch or version, with only linking words between
        (
            "to_batch_fr",
            format!(
                r"^(?:{undo_fr}|reviens|revenir|retourne|restaure)(?:\s+(?:tout|jusqu'au|jusqu'à|jusqu'a|au|à|a|la|le|avant))*\s+(?:lot|batch|version)\s+#?(?P<target>[a-z0-9][a-z0-9_-]*){end}"
            ),
            ToBatch,
        ),
        (
            "to_batch_en",
            format!(
                r"^(?:{undo_en}|go\s+back|restore)(?:\s+(?:everything|all|back|to|until|the))*\s+(?:batch|version)\s+#?(?P<target>[a-z0-9][a-z0-9_-]*){end}"
            ),
            ToBatch,
        ),
        // last: bare undo phrases
        (
            "last_fr",
            format!(
                r"^{undo_fr}(?:\s+(?:[çc]a|cela|ceci|stp|svp|s'il\s+te\s+pla[iî]t|s'il\s+vous\s+pla[iî]t|le\s+dernier\s+(?:changement|ajout)|la\s+derni[eè]re\s+(?:modification|action|[ée]tape)|ce\s+changement|cette\s+modification|ce\s+que\s+tu\s+viens\s+de\s+faire|la\s+modification|le\s+changement|tout\s+de\s+suite))*{end}"
            ),
            Last,
        ),
        (
            "last_fr_back",
            format!(
                r"^(?:reviens|revenir|retourne|retour|recule[rz]?)\s+(?:en\s+)?arri[eè]re(?:\s+(?:d'une\s+[ée]tape|stp|svp))?{end}"
            ),
            Last,
        ),
        (
            "last_fr_restore",
            format!(r"^(?:remets?|remettez)\s+(?:[çc]a\s+|le\s+tout\s+|tout\s+)?comme\s+(?:avant|c'[ée]tait){end}"),
            Last,
        ),
        (
            "last_en",
            format!(
                r"^{undo_en}(?:\s+(?:that|this|it|please|the\s+(?:last|previous)\s+(?:change|edit|action|step|one)|(?:last|previous)\s+(?:change|edit|action|step)|my\s+last\s+(?:change|edit)|what\s+you\s+(?:just\s+)?did))*{end}"
            ),
            Last,
        ),
        (
            "last_en_back",
            format!(
                r"^(?:go\s+back(?:\s+one\s+step)?|step\s+back|put\s+it\s+back(?:\s+the\s+way\s+it\s+was)?|change\s+it\s+back|cancel\s+(?:that|the\s+last\s+change)){end}"
            ),
            Last,
        ),
        ("last_ctrl_z", format!(r"^ctrl\s*\+?\s*z{end}"), Last),
    ];

    table
        .into_iter()
        .map(|(name, pattern, kind)| RollbackRule::new(name, &pattern, kind))
        .collect()
}
