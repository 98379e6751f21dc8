use regex::Regex;
use reviewforge_core::{dimension, Complexity, TaskProfile, TaskType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;
use tracing::debug;

/// Optional context accompanying a task description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskContext {
    /// Paths touched by the change.
    #[serde(default)]
    pub files: Vec<String>,
    /// Size of the diff in lines, when known.
    #[serde(default)]
    pub diff_lines: Option<usize>,
}

impl TaskContext {
    pub fn with_files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            diff_lines: None,
        }
    }

    pub fn with_diff_lines(mut self, lines: usize) -> Self {
        self.diff_lines = Some(lines);
        self
    }
}

/// Diffs above this size push complexity up one step.
const LARGE_DIFF_LINES: usize = 1_000;

const EXTENSION_LANGUAGES: &[(&str, &str)] = &[
    ("py", "python"),
    ("pyi", "python"),
    ("rs", "rust"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("mjs", "javascript"),
    ("go", "go"),
    ("java", "java"),
    ("kt", "kotlin"),
    ("rb", "ruby"),
    ("cs", "csharp"),
    ("cpp", "cpp"),
    ("cc", "cpp"),
    ("h", "cpp"),
    ("hpp", "cpp"),
    ("c", "c"),
    ("sql", "sql"),
    ("tf", "hcl"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("sh", "shell"),
];

const LANGUAGE_KEYWORDS: &[(&str, &[&str])] = &[
    ("python", &["python", "pip", "pytest"]),
    ("rust", &["rust", "cargo", "crate"]),
    ("typescript", &["typescript"]),
    ("javascript", &["javascript", "node", "nodejs", "npm"]),
    ("go", &["golang", "goroutine*"]),
    ("java", &["java", "maven", "gradle", "jvm"]),
    ("ruby", &["ruby", "gem"]),
    ("sql", &["sql", "postgres*", "mysql", "sqlite"]),
];

/// Framework keyword, framework tag, implied language.
const FRAMEWORKS: &[(&str, &str, Option<&str>)] = &[
    ("django", "django", Some("python")),
    ("flask", "flask", Some("python")),
    ("fastapi", "fastapi", Some("python")),
    ("react", "react", Some("javascript")),
    ("vue", "vue", Some("javascript")),
    ("angular", "angular", Some("typescript")),
    ("express", "express", Some("javascript")),
    ("spring", "spring", Some("java")),
    ("rails", "rails", Some("ruby")),
    ("tokio", "tokio", Some("rust")),
    ("axum", "axum", Some("rust")),
    ("actix", "actix", Some("rust")),
    ("terraform", "terraform", Some("hcl")),
    ("kubernetes", "kubernetes", None),
    ("k8s", "kubernetes", None),
];

const DOMAIN_KEYWORDS: &[(&str, &[&str])] = &[
    ("web", &["web", "frontend", "html", "css", "browser", "ui"]),
    ("api", &["api", "endpoint*", "rest", "graphql", "grpc", "webhook*"]),
    ("database", &["database", "db", "sql", "query", "queries", "migration*", "schema"]),
    ("infrastructure", &["infrastructure", "docker*", "kubernetes", "k8s", "terraform", "deploy*", "ci", "pipeline*"]),
    ("payments", &["payment*", "billing", "invoice*", "checkout", "stripe", "pci"]),
    ("healthcare", &["healthcare", "hipaa", "patient*", "medical", "phi"]),
    ("auth", &["auth", "authentication", "authorization", "login", "oauth", "jwt", "session*", "password*"]),
    ("ml", &["ml", "machine learning", "model training", "inference", "embedding*"]),
    ("mobile", &["mobile", "ios", "android"]),
];

/// Dimension, base weight when matched, keywords. Each extra hit adds 0.05.
const DIMENSION_RULES: &[(&str, f64, &[&str])] = &[
    (
        dimension::SECURITY,
        0.8,
        &[
            "sql injection", "injection", "vulnerab*", "exploit*", "xss", "csrf", "cve",
            "auth", "authentication", "authorization", "security", "secret*", "credential*",
            "encrypt*", "pentest", "owasp", "privilege*",
        ],
    ),
    (
        dimension::TESTING,
        0.7,
        &[
            "test coverage", "unit test*", "integration test*", "test*", "flaky",
            "coverage", "regression test*", "assert*",
        ],
    ),
    (
        dimension::PERFORMANCE,
        0.7,
        &[
            "performance", "slow", "latency", "memory leak", "optimi*", "throughput",
            "n+1", "cache", "caching", "bottleneck*",
        ],
    ),
    (
        dimension::DOCUMENTATION,
        0.6,
        &["document*", "docs", "readme", "docstring*", "comment*", "changelog"],
    ),
    (
        dimension::CODE_QUALITY,
        0.5,
        &[
            "refactor*", "cleanup", "clean up", "readab*", "maintainab*", "lint*",
            "code smell*", "duplicat*", "simplif*",
        ],
    ),
    (
        dimension::COMPLIANCE,
        0.7,
        &["compliance", "gdpr", "hipaa", "pci", "soc2", "iso 27001", "audit trail", "regulat*"],
    ),
    (
        dimension::ARCHITECTURE,
        0.6,
        &["architecture", "redesign", "design", "module*", "coupling", "interface*", "microservice*"],
    ),
    (
        dimension::OPERATIONS,
        0.6,
        &["deploy*", "monitoring", "observability", "logging", "alert*", "ci", "pipeline*", "rollback"],
    ),
];

/// Precedence tier of a task-type family; a lower tier with any hit beats
/// every higher tier regardless of hit counts.
const TIER_SECURITY: u8 = 0;
const TIER_SPECIFIC: u8 = 1;
const TIER_FEATURE: u8 = 2;

/// Task-type families: precedence tier, weight within the tier, keywords.
const TASK_TYPE_RULES: &[(TaskType, u8, f64, &[&str])] = &[
    (
        TaskType::SecurityAudit,
        TIER_SECURITY,
        1.0,
        &[
            "security audit", "security review", "audit", "vulnerab*", "sql injection",
            "xss", "csrf", "cve", "pentest", "exploit*", "owasp",
        ],
    ),
    (
        TaskType::BugFix,
        TIER_SPECIFIC,
        1.5,
        &["fix*", "bug*", "crash*", "broken", "regression", "defect*", "error*", "fail*"],
    ),
    (
        TaskType::Testing,
        TIER_SPECIFIC,
        1.5,
        &["test coverage", "unit test*", "add tests", "write tests", "integration test*", "testing"],
    ),
    (
        TaskType::Refactoring,
        TIER_SPECIFIC,
        1.5,
        &["refactor*", "restructur*", "cleanup", "clean up", "simplif*", "rename", "extract"],
    ),
    (
        TaskType::Documentation,
        TIER_SPECIFIC,
        1.5,
        &["document*", "docs", "readme", "docstring*", "changelog"],
    ),
    (
        TaskType::FeatureDevelopment,
        TIER_FEATURE,
        1.0,
        &["add", "implement*", "feature*", "support", "create", "build", "introduce"],
    ),
];

/// Keywords that indicate structural change.
const STRUCTURAL_KEYWORDS: &[&str] = &[
    "refactor*", "restructur*", "migrat*", "schema", "multiple modules", "api change*",
    "breaking change*",
];

/// Keywords that indicate a redesign.
const REDESIGN_KEYWORDS: &[&str] = &[
    "redesign*", "rewrite", "re-architect*", "rearchitect*", "overhaul*", "architecture change*",
];

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "into", "are", "was", "were", "has",
    "have", "not", "but", "all", "any", "can", "our", "its", "should", "when", "then", "than",
    "also", "which", "what", "there", "their", "been", "will", "would", "could",
];

/// Compiled keyword group: counts whole-word (or `stem*` prefix) matches.
struct KeywordSet {
    pattern: Regex,
}

impl KeywordSet {
    fn new(words: &[&str]) -> Self {
        let alternatives: Vec<String> = words
            .iter()
            .map(|w| match w.strip_suffix('*') {
                Some(stem) => format!(r"{}\w*", regex::escape(stem)),
                None => regex::escape(w),
            })
            .collect();
        let source = format!(r"(?i)(?:^|[^\w])(?:{})(?:$|[^\w])", alternatives.join("|"));
        #[allow(clippy::expect_used)]
        let pattern = Regex::new(&source).expect("static classifier pattern");
        Self { pattern }
    }

    /// Number of non-overlapping matches in `text`.
    fn hits(&self, text: &str) -> usize {
        // Match boundaries consume a delimiter, so step through manually to
        // let adjacent keywords both count.
        let mut count = 0;
        let mut start = 0;
        while let Some(m) = self.pattern.find_at(text, start) {
            count += 1;
            let matched = m.as_str();
            let trailing = matched
                .chars()
                .last()
                .map(|c| if c.is_alphanumeric() || c == '_' { 0 } else { c.len_utf8() })
                .unwrap_or(0);
            start = m.end() - trailing;
            if start <= m.start() {
                start = m.end();
            }
        }
        count
    }

    fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

struct Rules {
    languages: Vec<(&'static str, KeywordSet)>,
    frameworks: Vec<(&'static str, Option<&'static str>, KeywordSet)>,
    domains: Vec<(&'static str, KeywordSet)>,
    dimensions: Vec<(&'static str, f64, KeywordSet)>,
    task_types: Vec<(TaskType, u8, f64, KeywordSet)>,
    structural: KeywordSet,
    redesign: KeywordSet,
}

static RULES: LazyLock<Rules> = LazyLock::new(|| Rules {
    languages: LANGUAGE_KEYWORDS
        .iter()
        .map(|(lang, words)| (*lang, KeywordSet::new(words)))
        .collect(),
    frameworks: FRAMEWORKS
        .iter()
        .map(|(kw, tag, lang)| (*tag, *lang, KeywordSet::new(&[*kw])))
        .collect(),
    domains: DOMAIN_KEYWORDS
        .iter()
        .map(|(domain, words)| (*domain, KeywordSet::new(words)))
        .collect(),
    dimensions: DIMENSION_RULES
        .iter()
        .map(|(dim, base, words)| (*dim, *base, KeywordSet::new(words)))
        .collect(),
    task_types: TASK_TYPE_RULES
        .iter()
        .map(|(task_type, tier, weight, words)| {
            (*task_type, *tier, *weight, KeywordSet::new(words))
        })
        .collect(),
    structural: KeywordSet::new(STRUCTURAL_KEYWORDS),
    redesign: KeywordSet::new(REDESIGN_KEYWORDS),
});

/// Derives a [`TaskProfile`] from free text and file hints.
///
/// Classification never fails: empty or unrecognisable input produces
/// [`TaskProfile::unknown`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskClassifier;

impl TaskClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, description: &str, context: &TaskContext) -> TaskProfile {
        let text = description.trim();
        if text.is_empty() && context.files.is_empty() {
            return TaskProfile::unknown();
        }
        let rules = &*RULES;

        let mut languages = languages_from_files(&context.files);
        let mut frameworks = BTreeSet::new();
        let mut domains = BTreeSet::new();

        for (lang, set) in &rules.languages {
            if set.matches(text) {
                languages.insert((*lang).to_string());
            }
        }
        for (tag, implied, set) in &rules.frameworks {
            if set.matches(text) {
                frameworks.insert((*tag).to_string());
                if let Some(lang) = implied {
                    languages.insert((*lang).to_string());
                }
            }
        }
        // Paths often name the domain (`payments/`, `auth/`), so scan them too.
        let haystack = format!("{text} {}", context.files.join(" "));
        for (domain, set) in &rules.domains {
            if set.matches(&haystack) {
                domains.insert((*domain).to_string());
            }
        }

        let mut review_dimensions = BTreeMap::new();
        let mut dimension_hits = 0;
        for (dim, base, set) in &rules.dimensions {
            let hits = set.hits(text);
            if hits > 0 {
                dimension_hits += hits;
                let weight = (base + 0.05 * (hits - 1) as f64).min(1.0);
                review_dimensions.insert((*dim).to_string(), weight);
            }
        }

        let task_type = pick_task_type(text, rules);
        apply_task_type_floor(task_type, &mut review_dimensions);

        let complexity = estimate_complexity(text, context, dimension_hits, rules);

        let profile = TaskProfile {
            task_type,
            languages,
            frameworks,
            domains,
            review_dimensions,
            complexity,
            keywords: extract_keywords(text),
        };

        debug!(
            task_type = %profile.task_type,
            complexity = %profile.complexity,
            languages = ?profile.languages,
            domains = ?profile.domains,
            "Classified task"
        );
        profile
    }
}

fn languages_from_files(files: &[String]) -> BTreeSet<String> {
    files
        .iter()
        .filter_map(|f| {
            let ext = std::path::Path::new(f).extension()?.to_str()?.to_lowercase();
            EXTENSION_LANGUAGES
                .iter()
                .find(|(e, _)| *e == ext)
                .map(|(_, lang)| (*lang).to_string())
        })
        .collect()
}

/// The lowest tier with any hit decides: security audit, then the specific
/// families (bug fix, testing, refactoring, documentation), then feature
/// work. Within that tier the highest weighted hit count wins and a tie
/// falls back to `BugFix`. No hits at all leave the task `Unknown`.
fn pick_task_type(text: &str, rules: &Rules) -> TaskType {
    let scored: Vec<(TaskType, u8, f64)> = rules
        .task_types
        .iter()
        .map(|(task_type, tier, weight, set)| (*task_type, *tier, set.hits(text) as f64 * weight))
        .filter(|(_, _, score)| *score > 0.0)
        .collect();

    let Some(tier) = scored.iter().map(|(_, tier, _)| *tier).min() else {
        return TaskType::Unknown;
    };
    let in_tier: Vec<(TaskType, f64)> = scored
        .iter()
        .filter(|(_, t, _)| *t == tier)
        .map(|(task_type, _, score)| (*task_type, *score))
        .collect();

    let best = in_tier.iter().map(|(_, s)| *s).fold(0.0_f64, f64::max);
    let mut leaders = in_tier.iter().filter(|(_, s)| (*s - best).abs() < f64::EPSILON);
    match (leaders.next(), leaders.next()) {
        (Some((task_type, _)), None) => *task_type,
        _ => TaskType::BugFix,
    }
}

/// Every task type implies a minimum interest in some dimensions.
fn apply_task_type_floor(task_type: TaskType, dims: &mut BTreeMap<String, f64>) {
    let floors: &[(&str, f64)] = match task_type {
        TaskType::SecurityAudit => &[(dimension::SECURITY, 0.8)],
        TaskType::Testing => &[(dimension::TESTING, 0.7)],
        TaskType::Documentation => &[(dimension::DOCUMENTATION, 0.7)],
        TaskType::Refactoring => &[(dimension::CODE_QUALITY, 0.6), (dimension::ARCHITECTURE, 0.4)],
        TaskType::BugFix => &[(dimension::TESTING, 0.4), (dimension::CODE_QUALITY, 0.4)],
        TaskType::FeatureDevelopment => &[(dimension::CODE_QUALITY, 0.4), (dimension::TESTING, 0.4)],
        TaskType::Unknown => &[],
    };
    for (dim, floor) in floors {
        let weight = dims.entry((*dim).to_string()).or_insert(0.0);
        if *weight < *floor {
            *weight = *floor;
        }
    }
}

fn estimate_complexity(
    text: &str,
    context: &TaskContext,
    dimension_hits: usize,
    rules: &Rules,
) -> Complexity {
    let files = context.files.len();
    let structural = rules.structural.matches(text);

    let base = if rules.redesign.matches(text) || files >= 10 {
        Complexity::Critical
    } else if files >= 6 {
        Complexity::High
    } else if files >= 3 || structural {
        Complexity::Medium
    } else if files == 2 || dimension_hits >= 3 {
        Complexity::Low
    } else {
        Complexity::Trivial
    };

    match context.diff_lines {
        Some(lines) if lines > LARGE_DIFF_LINES => base.raise(),
        _ => base,
    }
}

fn extract_keywords(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= 3 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}
